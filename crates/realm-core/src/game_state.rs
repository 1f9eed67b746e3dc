//! `GameState`: the world plus every system, advanced one tick at a time.
//!
//! # Tick pass
//!
//! [`GameState::tick`] runs, in order:
//!
//! 1. The event system (pruning, unsticking, maybe starting an event).
//! 2. Combat log pruning, every `prune_every` ticks.
//! 3. Each entity, in id order:
//!    - dead: respawn handling, then on to the next entity;
//!    - AI, then regeneration and fleeing;
//!    - player target selection (script first, then the default behavior),
//!      skipped while fleeing;
//!    - movement, auto-combat validation, combat;
//!    - notices raised during the turn are routed to the AI, progression and
//!      observers before the next entity moves.
//! 4. A snapshot is captured and handed to observers.
//!
//! A panic anywhere in the pass is caught and reported as a [`TickError`].
//! The world keeps whatever state the pass had reached and the tick counter
//! still advances.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use glam::Vec2;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::behavior::{apply_action, Controller, DefaultBehavior, ScriptController, ScriptHost};
use crate::combat_log::{CombatEvent, CombatEventKind, CombatLog};
use crate::config::GameConfig;
use crate::entity::{Entity, EntityId, EntityKind, KindTraits, MonsterKind, ScriptBinding, Stats};
use crate::error::{CoreError, Result, TickError};
use crate::observer::{Observer, ObserverSet};
use crate::snapshot::{TickReport, WorldSnapshot};
use crate::systems::{
    AiSystem, CombatSystem, EventContext, EventInfo, EventKind, EventSystem, LevelUp, MovementSystem, Notice,
    Outbox, ProgressionSystem, Reward, SystemClock, VitalsSystem, WallClock,
};
use crate::world::World;
use crate::world_view::WorldView;

/// Faction given to monsters spawned outside of events.
const WILD_FACTION: &str = "bugs";

/// Authoritative game state.
pub struct GameState {
    config: GameConfig,
    world: World,
    tick: u64,
    rng: ChaCha8Rng,
    log: CombatLog,
    outbox: Outbox,
    movement: MovementSystem,
    combat: CombatSystem,
    ai: AiSystem,
    vitals: VitalsSystem,
    events: EventSystem,
    progression: ProgressionSystem,
    default_behavior: DefaultBehavior,
    scripts: Option<ScriptController>,
    clock: Box<dyn WallClock>,
    observers: ObserverSet,
    latest: Arc<WorldSnapshot>,
}

impl std::fmt::Debug for GameState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameState")
            .field("tick", &self.tick)
            .field("entities", &self.world.entity_count())
            .field("event", &self.events.info())
            .field("observers", &self.observers)
            .field("scripts", &self.scripts.is_some())
            .finish_non_exhaustive()
    }
}

impl GameState {
    /// Creates an empty world at tick 0 with all rolls drawn from `seed`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Config`] if `config` fails validation.
    pub fn new(config: GameConfig, seed: u64) -> Result<Self> {
        config.validate()?;
        let combat = CombatSystem::new(config.combat.clone(), config.tick.respawn_delay);
        let world = World::new(config.map.clone());
        let latest = Arc::new(WorldSnapshot::capture(&world, 0, EventInfo::default()));
        tracing::info!(seed, period_ms = config.tick.period_ms, "game state created");
        Ok(Self {
            movement: MovementSystem::new(
                config.movement.clone(),
                config.tick.seconds(),
                config.combat.attack_range,
            ),
            ai: AiSystem::new(config.ai.clone()),
            vitals: VitalsSystem::new(config.behavior.clone()),
            events: EventSystem::new(
                config.events.clone(),
                config.monsters.clone(),
                config.movement.entity_radius,
            ),
            progression: ProgressionSystem::new(config.progression.clone(), config.monsters.clone()),
            default_behavior: DefaultBehavior::new(config.behavior.clone(), combat.clone()),
            combat,
            world,
            tick: 0,
            rng: ChaCha8Rng::seed_from_u64(seed),
            log: CombatLog::new(),
            outbox: Outbox::new(),
            scripts: None,
            clock: Box::new(SystemClock),
            observers: ObserverSet::default(),
            latest,
            config,
        })
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Number of ticks run so far.
    #[must_use]
    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Configuration in force.
    #[must_use]
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// The live world.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// The live world, mutably.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Read-only view of the live world.
    #[must_use]
    pub fn view(&self) -> WorldView<'_> {
        WorldView::new(&self.world, self.tick)
    }

    /// Looks up an entity.
    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.world.get(id)
    }

    /// Current world event.
    #[must_use]
    pub fn event_info(&self) -> EventInfo {
        self.events.info()
    }

    /// Returns true while a world event runs.
    #[must_use]
    pub fn is_event_active(&self) -> bool {
        self.events.is_event_active()
    }

    /// Snapshot taken at the end of the last tick.
    #[must_use]
    pub fn latest_snapshot(&self) -> Arc<WorldSnapshot> {
        Arc::clone(&self.latest)
    }

    /// Capture the world as it is right now.
    #[must_use]
    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot::capture(&self.world, self.tick, self.events.info())
    }

    // =========================================================================
    // Administration
    // =========================================================================

    /// Admit a player into their faction's territory.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::DuplicateHandle`] if the handle is taken.
    pub fn join_player(&mut self, handle: &str, faction: &str, stats: Stats) -> Result<EntityId> {
        let radius = self.config.movement.entity_radius;
        self.world.join_player(handle, faction, stats, radius, &mut self.rng)
    }

    /// Remove a player from the world.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::EntityNotFound`] if `id` is not a player in the
    /// world.
    pub fn leave(&mut self, id: EntityId) -> Result<Entity> {
        if !self.world.get(id).is_some_and(Entity::is_player) {
            return Err(CoreError::EntityNotFound(id));
        }
        let entity = self.world.despawn(id).ok_or(CoreError::EntityNotFound(id))?;
        tracing::info!(%id, handle = entity.name(), "player left");
        Ok(entity)
    }

    /// Spawn a townsperson.
    pub fn spawn_npc(&mut self, name: &str, faction: &str, stats: Stats, position: Vec2) -> EntityId {
        self.world.spawn(EntityKind::Npc, name, faction, stats, position)
    }

    /// Spawn a monster outside of any event, with its tier's stats.
    pub fn spawn_monster(&mut self, kind: MonsterKind, position: Vec2) -> EntityId {
        let stats = self.config.monsters.profile(kind.tier()).stats;
        self.world
            .spawn(EntityKind::Monster(kind), kind.label(), WILD_FACTION, stats, position)
    }

    /// Attach, replace or remove a player's script.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::EntityNotFound`] if `id` does not exist.
    pub fn set_script(&mut self, id: EntityId, script: Option<ScriptBinding>) -> Result<()> {
        let e = self.world.get_mut(id).ok_or(CoreError::EntityNotFound(id))?;
        e.script = script;
        Ok(())
    }

    /// Start `kind` now, replacing any running event. Returns the number of
    /// monsters spawned.
    pub fn force_event(&mut self, kind: EventKind) -> usize {
        tracing::info!(?kind, tick = self.tick, "event forced");
        self.events.force_start(&mut self.world, kind, self.tick, &mut self.rng)
    }

    /// End the running event and remove its monsters.
    pub fn end_event(&mut self) {
        self.events.end_event(&mut self.world);
    }

    /// Install the script host used for players with an enabled script.
    pub fn set_script_host(&mut self, host: Box<dyn ScriptHost>) {
        self.scripts = Some(ScriptController::new(host));
    }

    /// Replace the wall clock used for the daily boss.
    pub fn set_clock(&mut self, clock: Box<dyn WallClock>) {
        self.clock = clock;
    }

    /// Register an observer.
    pub fn add_observer(&mut self, observer: Box<dyn Observer>) {
        self.observers.add(observer);
    }

    // =========================================================================
    // Pull API
    // =========================================================================

    /// Combat log entries from `tick` onwards. Does not consume them.
    #[must_use]
    pub fn combat_events_since(&self, tick: u64) -> Vec<CombatEvent> {
        self.log.since(tick)
    }

    /// Take pending rewards.
    pub fn drain_rewards(&mut self) -> Vec<Reward> {
        self.progression.drain_rewards()
    }

    /// Take pending level-ups.
    pub fn drain_level_ups(&mut self) -> Vec<LevelUp> {
        self.progression.drain_level_ups()
    }

    // =========================================================================
    // Ticking
    // =========================================================================

    /// Run one tick.
    ///
    /// # Errors
    ///
    /// Returns [`TickError::Panicked`] if a system panicked. The tick counter
    /// advances either way.
    pub fn tick(&mut self) -> std::result::Result<(), TickError> {
        let tick = self.tick;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.run_tick(tick)));
        self.tick = tick + 1;

        let result = outcome.map_err(|payload| {
            let message = panic_message(payload.as_ref());
            tracing::error!(tick, %message, "tick panicked");
            self.outbox.drain();
            TickError::Panicked { tick, message }
        });

        self.latest = Arc::new(self.snapshot());
        let latest = Arc::clone(&self.latest);
        self.observers.tick(self.tick, &latest);
        result
    }

    /// Run one tick and collect everything it produced: the snapshot, the
    /// drained rewards and level-ups, and the combat log entries it wrote.
    pub fn step(&mut self) -> TickReport {
        let from = self.tick;
        let error = self.tick().err();
        TickReport {
            snapshot: self.latest_snapshot(),
            rewards: self.drain_rewards(),
            level_ups: self.drain_level_ups(),
            combat_events: self.combat_events_since(from),
            error,
        }
    }

    fn run_tick(&mut self, tick: u64) {
        if let Some(kind) = self.events.update(&mut self.world, tick, self.clock.as_ref(), &mut self.rng) {
            tracing::debug!(?kind, tick, "event timer fired");
        }

        let housekeeping = &self.config.tick;
        if tick > 0 && tick % housekeeping.prune_every == 0 {
            let dropped = self.log.prune(tick, housekeeping.combat_log_max_age);
            tracing::trace!(tick, dropped, "combat log pruned");
        }

        let event = self.events.context();
        let ids: Vec<EntityId> = self.world.entity_ids_sorted().collect();
        for id in ids {
            let Some(entity) = self.world.get(id) else { continue };
            if !entity.is_alive() {
                self.handle_death(id, tick);
                continue;
            }

            self.ai.update(&mut self.world, &self.combat, id);
            let fleeing = self.vitals.update(&mut self.world, id, tick);
            if !fleeing {
                self.select_target(id, tick, &event);
            }
            self.movement.update(&mut self.world, id);
            self.combat.process_player_auto_combat(&mut self.world, id);
            self.combat
                .update(&mut self.world, id, tick, &mut self.rng, &mut self.log, &mut self.outbox);
            self.dispatch_notices();
        }
    }

    /// Respawn a dead entity once its delay has passed. Dead monsters that
    /// neither respawn nor belong to the running event are removed.
    fn handle_death(&mut self, id: EntityId, tick: u64) {
        let tracked = self.events.is_tracked(id);
        let delay = self.config.tick.respawn_delay;
        let Some(e) = self.world.get_mut(id) else { return };
        let respawns = e.is_player() || e.traits().contains(KindTraits::RESPAWNS);
        if !respawns {
            if !tracked {
                self.world.despawn(id);
            }
            return;
        }
        match e.combat.respawn_at() {
            Some(at) if at <= tick => {}
            Some(_) => return,
            None => {
                e.combat.schedule_respawn(tick + delay);
                return;
            }
        }

        e.combat.revive();
        let spawn = e.transform.spawn_point;
        e.transform.position = spawn;
        e.transform.stop();
        e.contributions.clear();
        if let Some(memory) = e.ai.as_mut() {
            memory.reset();
        }
        let name = e.name().to_string();
        self.log
            .push(CombatEvent::about(tick, CombatEventKind::Respawn, id, &name));
        tracing::debug!(%id, %name, tick, "respawned");
    }

    fn select_target(&mut self, id: EntityId, tick: u64, event: &EventContext) {
        let Some(me) = self.world.get(id) else { return };
        if !me.is_player() {
            return;
        }
        let view = WorldView::new(&self.world, tick);
        let scripted = self
            .scripts
            .as_mut()
            .and_then(|scripts| scripts.decide(me, &view, event));
        let action = scripted.or_else(|| self.default_behavior.decide(me, &view, event));
        if let Some(action) = action {
            apply_action(
                &mut self.world,
                &self.combat,
                &self.vitals,
                &self.config.behavior,
                id,
                action,
            );
        }
    }

    fn dispatch_notices(&mut self) {
        for notice in self.outbox.drain() {
            match notice {
                Notice::Damaged {
                    attacker,
                    target,
                    amount,
                } => {
                    self.ai.on_damaged(&mut self.world, target, attacker);
                    self.observers.damage(attacker, target, amount);
                }
                Notice::PlayerKilled { killer, victim } => {
                    self.progression.award_player_kill(&mut self.world, killer, victim);
                    self.observers.player_kill(killer, victim);
                }
                Notice::MonsterKilled { monster, last_hitter } => {
                    self.award_bounty(monster, last_hitter);
                    self.progression.distribute_monster_kill(&mut self.world, monster);
                    self.observers.monster_kill(monster, last_hitter);
                }
            }
        }
    }

    /// Rating bounty for the player who finished a monster.
    fn award_bounty(&mut self, monster: EntityId, last_hitter: EntityId) {
        let Some(kind) = self.world.get(monster).and_then(|m| m.kind().monster()) else {
            return;
        };
        let bounty = self.events.elo_reward_for(kind).max(0);
        if let Some(p) = self.world.get_mut(last_hitter).filter(|p| p.is_player()) {
            p.ranking.rating += bounty;
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
