//! Entity module: the records stored in the [`World`](crate::world::World).
//!
//! - [`EntityId`]: unique, never reused identifier
//! - [`EntityKind`]: player, NPC or a monster kind
//! - [`Entity`]: identity plus a fixed set of component structs
//!
//! # Architecture
//!
//! Every entity carries the same components (transform, stats, combat state,
//! ranking, progress, damage contributions). Kind-specific behavior is driven
//! by [`KindTraits`] rather than by optional storage, so systems can treat all
//! entities uniformly and branch on traits where the rules differ.
//!
//! # Example
//!
//! ```
//! use realm_core::entity::{Entity, EntityId, EntityKind, Stats};
//! use glam::Vec2;
//!
//! let hero = Entity::new(
//!     EntityId::new(1),
//!     EntityKind::Player,
//!     "octocat",
//!     "github",
//!     Stats::default(),
//!     Vec2::ZERO,
//! );
//! assert!(hero.is_player());
//! assert!(hero.is_alive());
//! ```

pub mod components;
pub mod kind;

use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};

pub use components::{
    AiMemory, AiState, CombatState, Contributions, LifeState, Progress, Ranking, ScriptBinding,
    Stats, Transform,
};
pub use kind::{EntityKind, KindTraits, MonsterKind, Tier};

/// Unique identifier for an entity.
///
/// Ids are assigned monotonically by the world and never reused, so a stale id
/// simply stops resolving once its entity is removed.
///
/// ```
/// use realm_core::entity::EntityId;
///
/// assert!(EntityId::new(1) < EntityId::new(2));
/// assert_eq!(EntityId::new(9).as_u64(), 9);
/// ```
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(u64);

impl EntityId {
    /// Creates an `EntityId` from a raw value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for EntityId {
    fn from(id: u64) -> Self {
        Self::new(id)
    }
}

/// A simulated actor.
///
/// Identity (`id`, `kind`, `name`, `faction`) is fixed at spawn; everything
/// else is component state mutated by the systems during a tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    id: EntityId,
    kind: EntityKind,
    name: String,
    faction: String,
    /// Position and movement intent.
    pub transform: Transform,
    /// Base stats.
    pub stats: Stats,
    /// Hit points, life state and combat target.
    pub combat: CombatState,
    /// PvP rating.
    pub ranking: Ranking,
    /// Level, experience and gold.
    pub progress: Progress,
    /// Damage taken per attacker.
    pub contributions: Contributions,
    /// Passive AI memory; present for NPCs and passive monsters.
    pub ai: Option<AiMemory>,
    /// Attached behavior script, for players.
    pub script: Option<ScriptBinding>,
}

impl Entity {
    /// Creates a fresh entity at rest with full health.
    #[must_use]
    pub fn new(
        id: EntityId,
        kind: EntityKind,
        name: impl Into<String>,
        faction: impl Into<String>,
        stats: Stats,
        position: Vec2,
    ) -> Self {
        let traits = kind.traits();
        let ai = (traits.contains(KindTraits::AI_DRIVEN) && !traits.contains(KindTraits::AGGRESSIVE))
            .then(AiMemory::default);
        Self {
            id,
            kind,
            name: name.into(),
            faction: faction.into(),
            transform: Transform::at(position),
            stats,
            combat: CombatState::new(stats.max_hp),
            ranking: Ranking::default(),
            progress: Progress::default(),
            contributions: Contributions::default(),
            ai,
            script: None,
        }
    }

    /// Returns the entity's id.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Returns what this entity is.
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Returns the behavioral traits of the entity's kind.
    #[must_use]
    pub fn traits(&self) -> KindTraits {
        self.kind.traits()
    }

    /// Display name (the handle, for players).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Faction tag.
    #[must_use]
    pub fn faction(&self) -> &str {
        &self.faction
    }

    /// Current position.
    #[must_use]
    pub fn position(&self) -> Vec2 {
        self.transform.position
    }

    /// Returns true if the entity is a player.
    #[must_use]
    pub fn is_player(&self) -> bool {
        self.kind == EntityKind::Player
    }

    /// Returns true if the entity is a monster.
    #[must_use]
    pub fn is_monster(&self) -> bool {
        matches!(self.kind, EntityKind::Monster(_))
    }

    /// Returns true if the entity was spawned by a world event.
    #[must_use]
    pub fn is_event_monster(&self) -> bool {
        self.traits().contains(KindTraits::EVENT)
    }

    /// Returns true if the entity still has hit points.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.combat.is_alive()
    }

    /// Distance to another entity.
    #[must_use]
    pub fn distance_to(&self, other: &Entity) -> f32 {
        self.position().distance(other.position())
    }

    /// Leave combat and drop any chase destination.
    pub fn clear_combat(&mut self) {
        self.combat.disengage();
        self.transform.stop();
    }
}
