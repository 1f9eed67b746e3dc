//! World events: timed monster waves.
//!
//! # Timers
//!
//! Four independent timers can start an event, checked in priority order
//! while no event is running:
//!
//! | event            | trigger                                         |
//! |------------------|-------------------------------------------------|
//! | `Boss`           | once per UTC day, from `boss_hour_utc` onwards  |
//! | `UnexplainedBug` | every `special_interval` ticks                  |
//! | `Intermediate`   | every `intermediate_interval` ticks             |
//! | `BugSwarm`       | every `bug_wave_interval` ticks                 |
//!
//! At most one event starts per tick. A due timer with no living players
//! simply waits; it fires on the first tick someone is around.
//!
//! # Lifecycle
//!
//! Spawned monsters are tracked by id. Each tick, tracked monsters that died
//! or vanished are removed from the world; once none remain the event ends.
//! The daily boss check is the only place gameplay reads the wall clock,
//! through the [`WallClock`] trait so tests can pin the time.

use std::collections::BTreeSet;
use std::f32::consts::TAU;
use std::time::{SystemTime, UNIX_EPOCH};

use glam::Vec2;
use rand::seq::SliceRandom;
use rand::Rng;
use realm_geo::Bounds;
use serde::{Deserialize, Serialize};

use crate::config::{EventConfig, MonsterConfig, WaveSize};
use crate::entity::{EntityId, EntityKind, MonsterKind};
use crate::world::World;

// =============================================================================
// Wall clock
// =============================================================================

/// A point in UTC wall-clock time, at day/hour resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WallTime {
    /// Days since the Unix epoch.
    pub day: u64,
    /// Hour of the day, `0..24`.
    pub hour: u32,
}

/// Source of wall-clock time for the daily boss.
pub trait WallClock: Send + Sync {
    /// Current UTC time.
    fn now(&self) -> WallTime;
}

/// The system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl WallClock for SystemClock {
    fn now(&self) -> WallTime {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        #[allow(clippy::cast_possible_truncation)]
        let hour = ((secs / 3_600) % 24) as u32;
        WallTime {
            day: secs / 86_400,
            hour,
        }
    }
}

/// A clock pinned to a fixed time.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub WallTime);

impl WallClock for FixedClock {
    fn now(&self) -> WallTime {
        self.0
    }
}

// =============================================================================
// Event state
// =============================================================================

/// Kind of world event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Nothing running.
    #[default]
    None,
    /// A swarm of error-family monsters.
    BugSwarm,
    /// A wave of regressions.
    Intermediate,
    /// The daily boss.
    Boss,
    /// The hourly heisenbug.
    UnexplainedBug,
}

impl EventKind {
    /// Monster kind spawned by this event.
    fn pick_monster<R: Rng + ?Sized>(self, rng: &mut R) -> Option<MonsterKind> {
        match self {
            Self::None => None,
            Self::BugSwarm => MonsterKind::ERROR_FAMILY.choose(rng).copied(),
            Self::Intermediate => Some(MonsterKind::Regression),
            Self::UnexplainedBug => Some(MonsterKind::Heisenbug),
            Self::Boss => Some(MonsterKind::TechDebt),
        }
    }
}

/// Summary of the current event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventInfo {
    /// Running event, or `None`.
    pub kind: EventKind,
    /// Tracked monsters still alive.
    pub remaining: usize,
    /// Tick the event started on.
    pub start_tick: u64,
}

impl EventInfo {
    /// Returns true if an event is running.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.kind != EventKind::None
    }
}

/// What behavior controllers know about the running event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventContext {
    /// Event summary.
    pub info: EventInfo,
    /// Tracked monsters, in id order.
    pub monsters: Vec<EntityId>,
}

impl EventContext {
    /// Returns true if `id` is a tracked event monster.
    #[must_use]
    pub fn is_event_monster(&self, id: EntityId) -> bool {
        self.monsters.binary_search(&id).is_ok()
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Timers {
    last_bug_wave: u64,
    last_intermediate: u64,
    last_special: u64,
    last_boss_day: Option<u64>,
}

// =============================================================================
// Event system
// =============================================================================

/// Schedules, spawns and retires world events.
#[derive(Debug, Clone)]
pub struct EventSystem {
    config: EventConfig,
    monsters: MonsterConfig,
    entity_radius: f32,
    timers: Timers,
    tracked: BTreeSet<EntityId>,
    info: EventInfo,
}

impl EventSystem {
    /// Creates the system with all timers starting at tick 0.
    #[must_use]
    pub fn new(config: EventConfig, monsters: MonsterConfig, entity_radius: f32) -> Self {
        Self {
            config,
            monsters,
            entity_radius,
            timers: Timers::default(),
            tracked: BTreeSet::new(),
            info: EventInfo::default(),
        }
    }

    /// Current event summary.
    #[must_use]
    pub fn info(&self) -> EventInfo {
        self.info
    }

    /// Returns true if an event is running.
    #[must_use]
    pub fn is_event_active(&self) -> bool {
        self.info.is_active()
    }

    /// Snapshot handed to behavior controllers.
    #[must_use]
    pub fn context(&self) -> EventContext {
        EventContext {
            info: self.info,
            monsters: self.tracked.iter().copied().collect(),
        }
    }

    /// Returns true if `id` was spawned by the running event.
    #[must_use]
    pub fn is_tracked(&self, id: EntityId) -> bool {
        self.tracked.contains(&id)
    }

    /// Rating bounty for landing the killing blow on `kind`.
    #[must_use]
    pub fn elo_reward_for(&self, kind: MonsterKind) -> i32 {
        self.monsters.profile(kind.tier()).bounty
    }

    /// Advance event bookkeeping and maybe start an event. Returns the kind
    /// started this tick, if any.
    pub fn update<R: Rng + ?Sized>(
        &mut self,
        world: &mut World,
        tick: u64,
        clock: &dyn WallClock,
        rng: &mut R,
    ) -> Option<EventKind> {
        self.prune(world);
        if self.info.is_active() && self.tracked.is_empty() {
            tracing::info!(kind = ?self.info.kind, tick, "world event cleared");
            self.info = EventInfo::default();
        }
        self.unstick(world, rng);

        if self.info.is_active() {
            return None;
        }
        let due = self.due_event(tick, clock)?;
        if world.living_players().is_empty() {
            return None;
        }
        self.mark_fired(due, tick, clock);
        self.start_event(world, due, tick, rng);
        Some(due)
    }

    /// Start `kind` right now, replacing any running event. Returns the
    /// number of monsters spawned.
    pub fn force_start<R: Rng + ?Sized>(
        &mut self,
        world: &mut World,
        kind: EventKind,
        tick: u64,
        rng: &mut R,
    ) -> usize {
        if self.info.is_active() {
            self.end_event(world);
        }
        self.start_event(world, kind, tick, rng)
    }

    /// End the running event, removing its monsters from the world.
    pub fn end_event(&mut self, world: &mut World) {
        for id in std::mem::take(&mut self.tracked) {
            world.despawn(id);
        }
        if self.info.is_active() {
            tracing::info!(kind = ?self.info.kind, "world event ended");
        }
        self.info = EventInfo::default();
    }

    fn due_event(&self, tick: u64, clock: &dyn WallClock) -> Option<EventKind> {
        let now = clock.now();
        let t = &self.timers;
        let elapsed = |last: u64, interval: u64| interval > 0 && tick.saturating_sub(last) >= interval;

        if now.hour >= self.config.boss_hour_utc && t.last_boss_day != Some(now.day) {
            Some(EventKind::Boss)
        } else if elapsed(t.last_special, self.config.special_interval) {
            Some(EventKind::UnexplainedBug)
        } else if elapsed(t.last_intermediate, self.config.intermediate_interval) {
            Some(EventKind::Intermediate)
        } else if elapsed(t.last_bug_wave, self.config.bug_wave_interval) {
            Some(EventKind::BugSwarm)
        } else {
            None
        }
    }

    fn mark_fired(&mut self, kind: EventKind, tick: u64, clock: &dyn WallClock) {
        match kind {
            EventKind::Boss => self.timers.last_boss_day = Some(clock.now().day),
            EventKind::UnexplainedBug => self.timers.last_special = tick,
            EventKind::Intermediate => self.timers.last_intermediate = tick,
            EventKind::BugSwarm => self.timers.last_bug_wave = tick,
            EventKind::None => {}
        }
    }

    fn wave_size<R: Rng + ?Sized>(&self, kind: EventKind, players: u32, rng: &mut R) -> u32 {
        let wave = |size: WaveSize, rng: &mut R| {
            let lo = size.min_per_player * players;
            let hi = (size.max_per_player * players).max(lo);
            rng.gen_range(lo..=hi)
        };
        match kind {
            EventKind::None => 0,
            EventKind::BugSwarm => wave(self.config.bug_wave, rng),
            EventKind::Intermediate => wave(self.config.intermediate_wave, rng),
            EventKind::UnexplainedBug => wave(self.config.special_wave, rng),
            EventKind::Boss => self.config.boss_count,
        }
    }

    fn start_event<R: Rng + ?Sized>(
        &mut self,
        world: &mut World,
        kind: EventKind,
        tick: u64,
        rng: &mut R,
    ) -> usize {
        let players = u32::try_from(world.living_players().len()).unwrap_or(u32::MAX).max(1);
        let count = self.wave_size(kind, players, rng);
        for _ in 0..count {
            let Some(monster) = kind.pick_monster(rng) else { break };
            let position = self.spawn_position(world, rng);
            let stats = self.monsters.profile(monster.tier()).stats;
            let id = world.spawn(EntityKind::Monster(monster), monster.label(), "bugs", stats, position);
            self.tracked.insert(id);
        }
        if self.tracked.is_empty() {
            return 0;
        }
        self.info = EventInfo {
            kind,
            remaining: self.tracked.len(),
            start_tick: tick,
        };
        tracing::info!(?kind, monsters = self.tracked.len(), tick, "world event started");
        self.tracked.len()
    }

    /// A walkable point 200-500 units from a random living player, falling
    /// back to the safe spawn region.
    fn spawn_position<R: Rng + ?Sized>(&self, world: &World, rng: &mut R) -> Vec2 {
        let players = world.living_players();
        let map = world.map();
        if let Some(anchor) = players.choose(rng).and_then(|id| world.position(*id)) {
            for _ in 0..self.config.spawn_retries {
                let angle = rng.gen_range(0.0..TAU);
                let dist = rng.gen_range(self.config.spawn_min_distance..=self.config.spawn_max_distance);
                let p = map.clamp(anchor + Vec2::from_angle(angle) * dist);
                if map.is_walkable(p, self.entity_radius) {
                    return p;
                }
            }
        }
        map.sample_safe(self.entity_radius, rng)
    }

    /// Drop tracked monsters that died or vanished, removing the dead ones
    /// from the world.
    fn prune(&mut self, world: &mut World) {
        let gone: Vec<EntityId> = self
            .tracked
            .iter()
            .copied()
            .filter(|id| !world.get(*id).is_some_and(|e| e.is_alive()))
            .collect();
        for id in gone {
            self.tracked.remove(&id);
            world.despawn(id);
        }
        self.info.remaining = self.tracked.len();
    }

    /// Move tracked monsters that ended up inside a collision zone back onto
    /// walkable ground.
    fn unstick<R: Rng + ?Sized>(&self, world: &mut World, rng: &mut R) {
        for id in &self.tracked {
            let Some(pos) = world.position(*id) else { continue };
            let map = world.map();
            if map.zones().zone_at(pos).is_none() {
                continue;
            }
            let region = Bounds::around(pos, self.config.spawn_max_distance);
            let fixed = map
                .sample_walkable(&region, self.entity_radius, self.config.spawn_retries, rng)
                .unwrap_or_else(|| map.sample_safe(self.entity_radius, rng));
            if let Some(e) = world.get_mut(*id) {
                tracing::debug!(%id, from = ?pos, to = ?fixed, "unstuck event monster");
                e.transform.position = fixed;
                e.transform.stop();
            }
        }
    }
}
