//! Observers: callbacks fired as the tick pass runs.
//!
//! Combat callbacks fire after the mutation that caused them and before the
//! next entity takes its turn. [`Observer::on_tick`] fires once the whole
//! pass has finished. Observers run inside the tick; anything slow (network,
//! storage) should be handed off to a channel or background task.

use crate::entity::EntityId;
use crate::snapshot::WorldSnapshot;

/// Receives gameplay notifications. Every method defaults to a no-op.
pub trait Observer: Send {
    /// `attacker` hit `target` for `amount`.
    fn on_damage(&mut self, attacker: EntityId, target: EntityId, amount: u32) {
        let _ = (attacker, target, amount);
    }

    /// A player killed another player.
    fn on_player_kill(&mut self, killer: EntityId, victim: EntityId) {
        let _ = (killer, victim);
    }

    /// A monster died; `last_hitter` landed the final blow.
    fn on_monster_kill(&mut self, monster: EntityId, last_hitter: EntityId) {
        let _ = (monster, last_hitter);
    }

    /// A tick finished.
    fn on_tick(&mut self, tick: u64, snapshot: &WorldSnapshot) {
        let _ = (tick, snapshot);
    }
}

/// Registered observers, called in registration order.
#[derive(Default)]
pub struct ObserverSet {
    observers: Vec<Box<dyn Observer>>,
}

impl std::fmt::Debug for ObserverSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverSet")
            .field("observers", &format!("[{} observers]", self.observers.len()))
            .finish()
    }
}

impl ObserverSet {
    /// Register an observer.
    pub fn add(&mut self, observer: Box<dyn Observer>) {
        self.observers.push(observer);
    }

    /// Number of observers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Returns true if none are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    pub(crate) fn damage(&mut self, attacker: EntityId, target: EntityId, amount: u32) {
        for o in &mut self.observers {
            o.on_damage(attacker, target, amount);
        }
    }

    pub(crate) fn player_kill(&mut self, killer: EntityId, victim: EntityId) {
        for o in &mut self.observers {
            o.on_player_kill(killer, victim);
        }
    }

    pub(crate) fn monster_kill(&mut self, monster: EntityId, last_hitter: EntityId) {
        for o in &mut self.observers {
            o.on_monster_kill(monster, last_hitter);
        }
    }

    pub(crate) fn tick(&mut self, tick: u64, snapshot: &WorldSnapshot) {
        for o in &mut self.observers {
            o.on_tick(tick, snapshot);
        }
    }
}
