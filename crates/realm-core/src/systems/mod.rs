//! Systems: the rules that advance the world each tick.
//!
//! Each system owns its slice of configuration and mutates the [`World`]
//! directly when the game loop calls it for an entity:
//!
//! - [`MovementSystem`]: steering, separation and obstacle avoidance
//! - [`CombatSystem`]: attack resolution, kills and PvP rating
//! - [`AiSystem`]: passive and aggressive monster/NPC behavior
//! - [`EventSystem`]: timed monster waves
//! - [`ProgressionSystem`]: experience, gold and levels
//! - [`VitalsSystem`]: health regeneration and fleeing
//!
//! # Notices
//!
//! Systems never call each other's reactions directly. Combat outcomes that
//! other parts of the game care about are pushed as [`Notice`]s into an
//! [`Outbox`], which the game loop drains after each entity's turn and routes
//! to the AI, progression and registered observers.
//!
//! [`World`]: crate::world::World

pub mod ai;
pub mod combat;
pub mod movement;
pub mod progression;
pub mod vitals;
pub mod world_event;

pub use ai::AiSystem;
pub use combat::{AttackRoll, CombatSystem};
pub use movement::MovementSystem;
pub use progression::{LevelUp, ProgressionSystem, Reward, RewardReason};
pub use vitals::VitalsSystem;
pub use world_event::{EventContext, EventInfo, EventKind, EventSystem, FixedClock, SystemClock, WallClock, WallTime};

use crate::entity::EntityId;

/// A combat outcome routed to interested parties after an entity's turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    /// `attacker` hit `target` for `amount`.
    Damaged {
        /// Who hit.
        attacker: EntityId,
        /// Who was hit.
        target: EntityId,
        /// Damage dealt after armor.
        amount: u32,
    },
    /// A player killed another player.
    PlayerKilled {
        /// Winner.
        killer: EntityId,
        /// Loser.
        victim: EntityId,
    },
    /// A monster died.
    MonsterKilled {
        /// The dead monster.
        monster: EntityId,
        /// Whoever landed the final blow.
        last_hitter: EntityId,
    },
}

/// Pending notices, in the order they were raised.
#[derive(Debug, Clone, Default)]
pub struct Outbox {
    notices: Vec<Notice>,
}

impl Outbox {
    /// Creates an empty outbox.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a notice.
    pub fn push(&mut self, notice: Notice) {
        self.notices.push(notice);
    }

    /// Take every queued notice.
    pub fn drain(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Returns true if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.notices.is_empty()
    }

    /// Queued notices.
    #[must_use]
    pub fn as_slice(&self) -> &[Notice] {
        &self.notices
    }
}
