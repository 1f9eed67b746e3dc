//! Component structs carried by every entity.
//!
//! Most components are plain data mutated directly by the systems. The one
//! exception is [`CombatState`], which keeps its fields private so that the
//! coupling between hit points, the life state and the combat target can only
//! change through methods that preserve it:
//!
//! - `state == Dead` exactly when `hp == 0`
//! - `state == Attacking` implies a target is set

use std::collections::HashMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::EntityId;

// =============================================================================
// Transform
// =============================================================================

/// Largest change of destination still treated as the same move.
pub const RETARGET_SLACK: f32 = 64.0;

/// Position and movement intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Current position.
    pub position: Vec2,
    /// Where the entity wants to go, if anywhere.
    pub move_target: Option<Vec2>,
    /// Intermediate corner used to walk around an obstacle.
    pub waypoint: Option<Vec2>,
    /// Detours taken towards the current move target.
    pub detours: u32,
    /// Anchor used for respawning and AI leashing.
    pub spawn_point: Vec2,
}

impl Transform {
    /// Create a transform at rest at `position`, which also becomes the
    /// spawn point.
    #[must_use]
    pub fn at(position: Vec2) -> Self {
        Self {
            position,
            move_target: None,
            waypoint: None,
            detours: 0,
            spawn_point: position,
        }
    }

    /// Set a destination.
    ///
    /// A pending detour survives when the destination only drifts by up to
    /// [`RETARGET_SLACK`], as it does while chasing a walking target. A
    /// destination further away discards it.
    pub fn move_to(&mut self, target: Vec2) {
        let drifted = self
            .move_target
            .is_some_and(|old| old != target && old.distance(target) <= RETARGET_SLACK);
        if self.move_target != Some(target) && !(drifted && self.waypoint.is_some()) {
            self.waypoint = None;
            self.detours = 0;
        }
        self.move_target = Some(target);
    }

    /// Drop the destination and any detour.
    pub fn stop(&mut self) {
        self.move_target = None;
        self.waypoint = None;
        self.detours = 0;
    }

    /// Returns true if a destination is set.
    #[must_use]
    pub fn is_moving(&self) -> bool {
        self.move_target.is_some()
    }
}

// =============================================================================
// Stats
// =============================================================================

/// Base combat and movement stats.
///
/// Percentages (`crit_chance`, `evasion`) are integers in `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Stats {
    /// Maximum hit points.
    pub max_hp: u32,
    /// Damage per hit before armor.
    pub damage: u32,
    /// Attack speed; higher means shorter cooldown.
    pub attack_speed: u32,
    /// Movement speed bonus.
    pub move_speed: u32,
    /// Critical hit chance in percent.
    pub crit_chance: u32,
    /// Chance to evade an incoming hit in percent.
    pub evasion: u32,
    /// Flat damage reduction.
    pub armor: u32,
}

impl Default for Stats {
    fn default() -> Self {
        Self {
            max_hp: 100,
            damage: 10,
            attack_speed: 10,
            move_speed: 10,
            crit_chance: 5,
            evasion: 5,
            armor: 2,
        }
    }
}

// =============================================================================
// Combat state
// =============================================================================

/// Coarse activity state of an entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifeState {
    /// Standing still.
    #[default]
    Idle,
    /// Walking towards a destination.
    Moving,
    /// Engaged with a combat target.
    Attacking,
    /// Zero hit points, waiting to respawn or be removed.
    Dead,
}

/// Hit points, life state and the current combat target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatState {
    hp: u32,
    max_hp: u32,
    state: LifeState,
    target: Option<EntityId>,
    last_attack_tick: Option<u64>,
    respawn_at: Option<u64>,
    fleeing: bool,
}

impl CombatState {
    /// Full health, idle, no target.
    #[must_use]
    pub fn new(max_hp: u32) -> Self {
        let max_hp = max_hp.max(1);
        Self {
            hp: max_hp,
            max_hp,
            state: LifeState::Idle,
            target: None,
            last_attack_tick: None,
            respawn_at: None,
            fleeing: false,
        }
    }

    /// Current hit points.
    #[must_use]
    pub fn hp(&self) -> u32 {
        self.hp
    }

    /// Maximum hit points.
    #[must_use]
    pub fn max_hp(&self) -> u32 {
        self.max_hp
    }

    /// Fraction of health remaining, in `0.0..=1.0`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn hp_fraction(&self) -> f32 {
        self.hp as f32 / self.max_hp as f32
    }

    /// Current life state.
    #[must_use]
    pub fn state(&self) -> LifeState {
        self.state
    }

    /// Current combat target.
    #[must_use]
    pub fn target(&self) -> Option<EntityId> {
        self.target
    }

    /// Tick of the last attack attempt.
    #[must_use]
    pub fn last_attack_tick(&self) -> Option<u64> {
        self.last_attack_tick
    }

    /// Tick at which a dead entity comes back.
    #[must_use]
    pub fn respawn_at(&self) -> Option<u64> {
        self.respawn_at
    }

    /// Returns true while the entity has hit points left.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.state != LifeState::Dead
    }

    /// Returns true while the entity is running away to recover.
    #[must_use]
    pub fn is_fleeing(&self) -> bool {
        self.fleeing
    }

    /// Returns true if attacking `target` specifically.
    #[must_use]
    pub fn is_attacking(&self, target: EntityId) -> bool {
        self.state == LifeState::Attacking && self.target == Some(target)
    }

    /// Engage `target`. The target is written before the state flips so
    /// an attacking entity never lacks a target.
    pub fn engage(&mut self, target: EntityId) {
        if !self.is_alive() {
            return;
        }
        self.target = Some(target);
        self.state = LifeState::Attacking;
    }

    /// Leave combat. The state leaves `Attacking` before the target is
    /// cleared. Dead entities stay dead.
    pub fn disengage(&mut self) {
        if self.state == LifeState::Attacking {
            self.state = LifeState::Idle;
        }
        self.target = None;
    }

    /// Mark the entity as walking, unless it is fighting or dead.
    pub fn set_moving(&mut self) {
        if self.state == LifeState::Idle {
            self.state = LifeState::Moving;
        }
    }

    /// Mark the entity as standing still, unless it is fighting or dead.
    pub fn set_idle(&mut self) {
        if self.state == LifeState::Moving {
            self.state = LifeState::Idle;
        }
    }

    /// Record an attack attempt.
    pub fn record_attack(&mut self, tick: u64) {
        self.last_attack_tick = Some(tick);
    }

    /// Set or clear the fleeing flag.
    pub fn set_fleeing(&mut self, fleeing: bool) {
        self.fleeing = fleeing;
    }

    /// Subtract `amount` hit points, clamping at zero.
    ///
    /// Returns true if this hit killed the entity. Hits on an already dead
    /// entity are ignored.
    pub fn apply_damage(&mut self, amount: u32) -> bool {
        if !self.is_alive() {
            return false;
        }
        self.hp = self.hp.saturating_sub(amount);
        if self.hp == 0 {
            self.state = LifeState::Dead;
            self.target = None;
            self.fleeing = false;
            true
        } else {
            false
        }
    }

    /// Restore up to `amount` hit points on a living entity.
    pub fn heal(&mut self, amount: u32) {
        if self.is_alive() {
            self.hp = self.hp.saturating_add(amount).min(self.max_hp);
        }
    }

    /// Raise maximum hit points and refill a living entity to full.
    pub fn raise_max_hp(&mut self, max_hp: u32) {
        self.max_hp = max_hp.max(1);
        if self.is_alive() {
            self.hp = self.max_hp;
        } else {
            self.hp = 0;
        }
    }

    /// Schedule the respawn of a dead entity.
    pub fn schedule_respawn(&mut self, tick: u64) {
        if !self.is_alive() {
            self.respawn_at = Some(tick);
        }
    }

    /// Bring a dead entity back at full health.
    pub fn revive(&mut self) {
        self.hp = self.max_hp;
        self.state = LifeState::Idle;
        self.target = None;
        self.respawn_at = None;
        self.last_attack_tick = None;
        self.fleeing = false;
    }
}

// =============================================================================
// Ranking and progress
// =============================================================================

/// Player-versus-player rating and record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ranking {
    /// Rating, starts at 1000.
    pub rating: i32,
    /// PvP kills.
    pub wins: u32,
    /// PvP deaths.
    pub losses: u32,
}

impl Default for Ranking {
    fn default() -> Self {
        Self {
            rating: 1000,
            wins: 0,
            losses: 0,
        }
    }
}

/// Level, experience and gold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// Current level, starting at 1.
    pub level: u32,
    /// Total experience earned.
    pub exp: u64,
    /// Gold carried.
    pub gold: u64,
}

impl Default for Progress {
    fn default() -> Self {
        Self {
            level: 1,
            exp: 0,
            gold: 0,
        }
    }
}

// =============================================================================
// Damage contributions
// =============================================================================

/// Damage dealt to this entity, per attacker, since it last spawned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contributions {
    damage: HashMap<EntityId, u64>,
}

impl Contributions {
    /// Add `amount` to the attacker's tally.
    pub fn record(&mut self, attacker: EntityId, amount: u32) {
        *self.damage.entry(attacker).or_insert(0) += u64::from(amount);
    }

    /// Damage dealt by one attacker.
    #[must_use]
    pub fn of(&self, attacker: EntityId) -> u64 {
        self.damage.get(&attacker).copied().unwrap_or(0)
    }

    /// Total damage recorded.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.damage.values().sum()
    }

    /// Contributors in id order, with their damage.
    #[must_use]
    pub fn sorted(&self) -> Vec<(EntityId, u64)> {
        let mut entries: Vec<_> = self.damage.iter().map(|(id, dmg)| (*id, *dmg)).collect();
        entries.sort_unstable_by_key(|(id, _)| *id);
        entries
    }

    /// Returns true if nobody has hit this entity.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.damage.is_empty()
    }

    /// Forget all contributions.
    pub fn clear(&mut self) {
        self.damage.clear();
    }
}

// =============================================================================
// AI memory and scripting
// =============================================================================

/// State of the passive AI machine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AiState {
    /// Waiting at the spawn point.
    #[default]
    Idle,
    /// Pursuing whoever hit it.
    Chasing,
    /// In range and fighting.
    Attacking,
    /// Walking back to the spawn point.
    Returning,
}

/// Memory kept by passive AI entities between ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiMemory {
    /// Current state.
    pub state: AiState,
    /// Whoever provoked it.
    pub aggro: Option<EntityId>,
}

impl AiMemory {
    /// Forget the aggressor and go idle.
    pub fn reset(&mut self) {
        self.state = AiState::Idle;
        self.aggro = None;
    }
}

/// A player-authored behavior script attached to an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptBinding {
    /// Identifier understood by the installed script host.
    pub script_id: String,
    /// Disabled scripts are skipped.
    pub enabled: bool,
}

impl ScriptBinding {
    /// An enabled binding.
    #[must_use]
    pub fn new(script_id: impl Into<String>) -> Self {
        Self {
            script_id: script_id.into(),
            enabled: true,
        }
    }
}
