//! Game configuration.
//!
//! All tuning constants live in [`GameConfig`], grouped by the system that
//! consumes them. Every section is `#[serde(default)]`, so a TOML file only
//! needs to mention the values it overrides:
//!
//! ```
//! use realm_core::config::GameConfig;
//!
//! let config = GameConfig::from_toml_str(
//!     r#"
//!     [tick]
//!     period_ms = 100
//!
//!     [combat]
//!     attack_range = 80.0
//!     "#,
//! )
//! .unwrap();
//!
//! assert_eq!(config.tick.period_ms, 100);
//! assert_eq!(config.combat.attack_range, 80.0);
//! assert_eq!(config.ai.aggro_radius, 300.0);
//! ```

use std::path::Path;
use std::time::Duration;

use realm_geo::MapGeometry;
use serde::{Deserialize, Serialize};

use crate::entity::{Stats, Tier};
use crate::error::ConfigError;

/// Complete configuration for one world.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Scheduler timing and housekeeping.
    pub tick: TickConfig,
    /// Movement and obstacle avoidance.
    pub movement: MovementConfig,
    /// Attack resolution and PvP rating.
    pub combat: CombatConfig,
    /// Monster and NPC AI.
    pub ai: AiConfig,
    /// Default player behavior, regeneration and fleeing.
    pub behavior: BehaviorConfig,
    /// World event timers and wave sizes.
    pub events: EventConfig,
    /// Experience curve and level-up gains.
    pub progression: ProgressionConfig,
    /// Per-tier monster profiles.
    pub monsters: MonsterConfig,
    /// Map geometry.
    pub map: MapGeometry,
}

impl GameConfig {
    /// Parse a TOML document and validate it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML and any error from
    /// [`GameConfig::validate`].
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`GameConfig::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Check ranges that the systems rely on.
    ///
    /// # Errors
    ///
    /// Returns the first out-of-range value found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure(self.tick.period_ms > 0, "tick.period_ms", "must be positive")?;
        ensure(self.tick.prune_every > 0, "tick.prune_every", "must be positive")?;
        ensure(
            self.movement.entity_radius >= 0.0,
            "movement.entity_radius",
            "must not be negative",
        )?;
        ensure(
            self.movement.base_speed > 0.0,
            "movement.base_speed",
            "must be positive",
        )?;
        ensure(
            self.combat.attack_range > 0.0,
            "combat.attack_range",
            "must be positive",
        )?;
        ensure(
            self.combat.min_cooldown > 0,
            "combat.min_cooldown",
            "must be at least one tick",
        )?;
        ensure(
            self.combat.crit_multiplier >= 1.0,
            "combat.crit_multiplier",
            "must be at least 1.0",
        )?;
        ensure(
            self.ai.max_chase_distance >= self.ai.aggro_radius,
            "ai.max_chase_distance",
            "must not be shorter than ai.aggro_radius",
        )?;
        ensure(
            self.behavior.flee_hp_fraction < self.behavior.flee_recover_fraction,
            "behavior.flee_hp_fraction",
            "must be below behavior.flee_recover_fraction",
        )?;
        ensure(
            self.behavior.regen_interval > 0,
            "behavior.regen_interval",
            "must be positive",
        )?;
        for (field, wave) in [
            ("events.bug_wave", &self.events.bug_wave),
            ("events.intermediate_wave", &self.events.intermediate_wave),
            ("events.special_wave", &self.events.special_wave),
        ] {
            ensure(
                wave.min_per_player >= 1 && wave.min_per_player <= wave.max_per_player,
                field,
                "needs 1 <= min_per_player <= max_per_player",
            )?;
        }
        ensure(
            self.events.boss_hour_utc < 24,
            "events.boss_hour_utc",
            "must be an hour of the day",
        )?;
        ensure(
            self.events.spawn_min_distance <= self.events.spawn_max_distance,
            "events.spawn_min_distance",
            "must not exceed events.spawn_max_distance",
        )?;
        ensure(
            self.progression.scaling >= 1.0,
            "progression.scaling",
            "must be at least 1.0",
        )?;
        ensure(
            self.progression.max_level >= 1,
            "progression.max_level",
            "must be at least 1",
        )?;
        self.map.validate()?;
        Ok(())
    }
}

fn ensure(ok: bool, field: &'static str, reason: &str) -> Result<(), ConfigError> {
    if ok {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: reason.to_string(),
        })
    }
}

// =============================================================================
// Sections
// =============================================================================

/// Scheduler timing and periodic housekeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TickConfig {
    /// Tick period in milliseconds.
    pub period_ms: u64,
    /// Prune the combat log every this many ticks.
    pub prune_every: u64,
    /// Combat log entries older than this many ticks are pruned.
    pub combat_log_max_age: u64,
    /// Ticks a dead player or ambient entity waits before respawning.
    pub respawn_delay: u64,
}

impl TickConfig {
    /// Tick period.
    #[must_use]
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }

    /// Tick period in seconds.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn seconds(&self) -> f32 {
        self.period_ms as f32 / 1000.0
    }
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            period_ms: 50,
            prune_every: 200,
            combat_log_max_age: 600,
            respawn_delay: 100,
        }
    }
}

/// Movement speeds, body size and obstacle avoidance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    /// Base speed in units per second.
    pub base_speed: f32,
    /// Body radius used for every collision test.
    pub entity_radius: f32,
    /// Neighbours closer than this push each other apart.
    pub separation_radius: f32,
    /// Strength of the separation push, in units per tick at full overlap.
    pub separation_push: f32,
    /// Clearance kept from zone corners when detouring.
    pub detour_margin: f32,
    /// Cost added per radian of deviation from the direct heading.
    pub angle_penalty: f32,
    /// Detours allowed before the move is abandoned.
    pub max_detours: u32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            base_speed: 100.0,
            entity_radius: 16.0,
            separation_radius: 40.0,
            separation_push: 2.0,
            detour_margin: 12.0,
            angle_penalty: 40.0,
            max_detours: 8,
        }
    }
}

/// Attack resolution and PvP rating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// Maximum distance at which an attack lands.
    pub attack_range: f32,
    /// Cooldown before attack speed is subtracted, in ticks.
    pub base_cooldown: u64,
    /// Shortest possible cooldown, in ticks.
    pub min_cooldown: u64,
    /// Damage multiplier on a critical hit.
    pub crit_multiplier: f32,
    /// Floor for a hit that was not evaded.
    pub min_damage: u32,
    /// A player may not start a fight with someone rated this far below.
    pub rating_protection_gap: i32,
    /// Rating gained for any PvP kill.
    pub pvp_base_gain: i32,
    /// Cap on the upset bonus.
    pub pvp_max_bonus: i32,
    /// Rating difference worth one point of upset bonus.
    pub pvp_rating_divisor: i32,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            attack_range: 60.0,
            base_cooldown: 30,
            min_cooldown: 2,
            crit_multiplier: 1.5,
            min_damage: 1,
            rating_protection_gap: 300,
            pvp_base_gain: 10,
            pvp_max_bonus: 20,
            pvp_rating_divisor: 20,
        }
    }
}

/// Monster and NPC AI radii.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// Aggressive monsters notice players within this distance.
    pub aggro_radius: f32,
    /// Passive entities give up a chase this far from their spawn point.
    pub max_chase_distance: f32,
    /// Distance from spawn at which a returning entity is home.
    pub return_radius: f32,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            aggro_radius: 300.0,
            max_chase_distance: 500.0,
            return_radius: 10.0,
        }
    }
}

/// Default player behavior, regeneration and fleeing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Idle players look for targets within this distance.
    pub engage_radius: f32,
    /// During an event players head for event monsters this far away.
    pub event_hunt_radius: f32,
    /// Regenerate every this many ticks.
    pub regen_interval: u64,
    /// Fraction of max HP restored per regeneration step.
    pub regen_fraction: f32,
    /// Start fleeing below this fraction of max HP.
    pub flee_hp_fraction: f32,
    /// Stop fleeing at this fraction of max HP.
    pub flee_recover_fraction: f32,
    /// How far to run from the nearest threat.
    pub flee_distance: f32,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            engage_radius: 300.0,
            event_hunt_radius: 1200.0,
            regen_interval: 20,
            regen_fraction: 0.02,
            flee_hp_fraction: 0.2,
            flee_recover_fraction: 0.6,
            flee_distance: 250.0,
        }
    }
}

/// Monsters spawned per living player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaveSize {
    /// Lower bound per player.
    pub min_per_player: u32,
    /// Upper bound per player.
    pub max_per_player: u32,
}

impl WaveSize {
    /// A wave size.
    #[must_use]
    pub const fn new(min_per_player: u32, max_per_player: u32) -> Self {
        Self {
            min_per_player,
            max_per_player,
        }
    }
}

/// World event timers, wave sizes and spawn placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventConfig {
    /// Ticks between bug swarms (5 minutes at the default tick).
    pub bug_wave_interval: u64,
    /// Ticks between intermediate waves (15 minutes).
    pub intermediate_interval: u64,
    /// Ticks between unexplained-bug events (one hour).
    pub special_interval: u64,
    /// UTC hour from which the daily boss may appear.
    pub boss_hour_utc: u32,
    /// Bug swarm size.
    pub bug_wave: WaveSize,
    /// Intermediate wave size.
    pub intermediate_wave: WaveSize,
    /// Unexplained-bug wave size.
    pub special_wave: WaveSize,
    /// Bosses per daily event, independent of player count.
    pub boss_count: u32,
    /// Closest a wave monster spawns to its anchor player.
    pub spawn_min_distance: f32,
    /// Furthest a wave monster spawns from its anchor player.
    pub spawn_max_distance: f32,
    /// Placement attempts before falling back to the safe region.
    pub spawn_retries: usize,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            bug_wave_interval: 6_000,
            intermediate_interval: 18_000,
            special_interval: 72_000,
            boss_hour_utc: 20,
            bug_wave: WaveSize::new(2, 4),
            intermediate_wave: WaveSize::new(1, 2),
            special_wave: WaveSize::new(1, 1),
            boss_count: 1,
            spawn_min_distance: 200.0,
            spawn_max_distance: 500.0,
            spawn_retries: 10,
        }
    }
}

/// Experience and gold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardPool {
    /// Experience.
    pub exp: u64,
    /// Gold.
    pub gold: u64,
}

impl RewardPool {
    /// A reward pool.
    #[must_use]
    pub const fn new(exp: u64, gold: u64) -> Self {
        Self { exp, gold }
    }
}

/// Experience curve and level-up gains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressionConfig {
    /// Experience from level 1 to level 2.
    pub base_exp: u64,
    /// Growth factor of the per-level requirement.
    pub scaling: f64,
    /// Level cap.
    pub max_level: u32,
    /// Max HP gained per level.
    pub hp_per_level: u32,
    /// Damage gained per level.
    pub damage_per_level: u32,
    /// Armor gained on every second level.
    pub armor_per_two_levels: u32,
    /// Flat reward for a PvP kill at victim level 1.
    pub pvp_pool: RewardPool,
    /// Extra fraction of the PvP pool per victim level above 1.
    pub pvp_level_bonus: f64,
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            base_exp: 100,
            scaling: 1.5,
            max_level: 50,
            hp_per_level: 20,
            damage_per_level: 3,
            armor_per_two_levels: 1,
            pvp_pool: RewardPool::new(50, 25),
            pvp_level_bonus: 0.1,
        }
    }
}

/// Stats, kill reward and rating bounty of one monster tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierProfile {
    /// Base stats.
    pub stats: Stats,
    /// Reward split among contributors on death.
    pub pool: RewardPool,
    /// Rating granted to the player landing the killing blow.
    pub bounty: i32,
}

/// Per-tier monster profiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonsterConfig {
    /// Ambient bugs and swarm monsters.
    pub swarm: TierProfile,
    /// Intermediate wave monsters.
    pub elite: TierProfile,
    /// Unexplained-bug monsters.
    pub special: TierProfile,
    /// Daily boss.
    pub boss: TierProfile,
}

impl MonsterConfig {
    /// Profile of a tier.
    #[must_use]
    pub fn profile(&self, tier: Tier) -> &TierProfile {
        match tier {
            Tier::Swarm => &self.swarm,
            Tier::Elite => &self.elite,
            Tier::Special => &self.special,
            Tier::Boss => &self.boss,
        }
    }
}

impl Default for MonsterConfig {
    fn default() -> Self {
        Self {
            swarm: TierProfile {
                stats: Stats {
                    max_hp: 60,
                    damage: 6,
                    attack_speed: 8,
                    move_speed: 5,
                    crit_chance: 2,
                    evasion: 2,
                    armor: 1,
                },
                pool: RewardPool::new(20, 10),
                bounty: 5,
            },
            elite: TierProfile {
                stats: Stats {
                    max_hp: 250,
                    damage: 14,
                    attack_speed: 10,
                    move_speed: 8,
                    crit_chance: 5,
                    evasion: 5,
                    armor: 4,
                },
                pool: RewardPool::new(60, 30),
                bounty: 15,
            },
            special: TierProfile {
                stats: Stats {
                    max_hp: 600,
                    damage: 22,
                    attack_speed: 14,
                    move_speed: 15,
                    crit_chance: 10,
                    evasion: 25,
                    armor: 6,
                },
                pool: RewardPool::new(120, 60),
                bounty: 30,
            },
            boss: TierProfile {
                stats: Stats {
                    max_hp: 5_000,
                    damage: 40,
                    attack_speed: 6,
                    move_speed: 4,
                    crit_chance: 10,
                    evasion: 0,
                    armor: 12,
                },
                pool: RewardPool::new(400, 200),
                bounty: 100,
            },
        }
    }
}
