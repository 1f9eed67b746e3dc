//! Immutable copies of world state published after each tick.
//!
//! External readers (broadcasters, persistence, HTTP handlers) only ever see
//! these copies, never the live world, so they cannot observe an entity
//! halfway through a system update.

use std::sync::Arc;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::combat_log::CombatEvent;
use crate::entity::{Entity, EntityId, EntityKind, LifeState, Progress, Ranking, Stats};
use crate::error::TickError;
use crate::systems::{EventInfo, LevelUp, Reward};
use crate::world::World;

/// Public state of one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    /// Entity id.
    pub id: EntityId,
    /// What it is.
    pub kind: EntityKind,
    /// Display name.
    pub name: String,
    /// Faction tag.
    pub faction: String,
    /// Position.
    pub position: Vec2,
    /// Where it is heading, if anywhere.
    pub move_target: Option<Vec2>,
    /// Current hit points.
    pub hp: u32,
    /// Maximum hit points.
    pub max_hp: u32,
    /// Lifecycle state.
    pub state: LifeState,
    /// Combat target.
    pub target: Option<EntityId>,
    /// Running away.
    pub fleeing: bool,
    /// Stats.
    pub stats: Stats,
    /// PvP rating and record.
    pub ranking: Ranking,
    /// Level, experience and gold.
    pub progress: Progress,
    /// Attached script id, if enabled.
    pub script: Option<String>,
}

impl From<&Entity> for EntitySnapshot {
    fn from(e: &Entity) -> Self {
        Self {
            id: e.id(),
            kind: e.kind(),
            name: e.name().to_string(),
            faction: e.faction().to_string(),
            position: e.position(),
            move_target: e.transform.move_target,
            hp: e.combat.hp(),
            max_hp: e.combat.max_hp(),
            state: e.combat.state(),
            target: e.combat.target(),
            fleeing: e.combat.is_fleeing(),
            stats: e.stats,
            ranking: e.ranking,
            progress: e.progress,
            script: e
                .script
                .as_ref()
                .filter(|s| s.enabled)
                .map(|s| s.script_id.clone()),
        }
    }
}

impl EntitySnapshot {
    /// Returns true if the entity was alive when captured.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.state != LifeState::Dead
    }
}

/// The whole world at the end of a tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    /// Number of ticks completed.
    pub tick: u64,
    /// Every entity, in id order.
    pub entities: Vec<EntitySnapshot>,
    /// World event summary.
    pub event: EventInfo,
}

impl WorldSnapshot {
    /// Capture `world`.
    #[must_use]
    pub fn capture(world: &World, tick: u64, event: EventInfo) -> Self {
        Self {
            tick,
            entities: world.entities_sorted().map(EntitySnapshot::from).collect(),
            event,
        }
    }

    /// Looks up an entity by id.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&EntitySnapshot> {
        self.entities
            .binary_search_by_key(&id, |e| e.id)
            .ok()
            .map(|i| &self.entities[i])
    }

    /// Entities within `radius` of `point`.
    pub fn within(&self, point: Vec2, radius: f32) -> impl Iterator<Item = &EntitySnapshot> + '_ {
        self.entities
            .iter()
            .filter(move |e| e.position.distance(point) <= radius)
    }
}

/// Everything a tick produced, published once per tick.
#[derive(Debug, Clone)]
pub struct TickReport {
    /// World state after the tick.
    pub snapshot: Arc<WorldSnapshot>,
    /// Rewards paid during the tick.
    pub rewards: Vec<Reward>,
    /// Levels gained during the tick.
    pub level_ups: Vec<LevelUp>,
    /// Combat log entries written during the tick.
    pub combat_events: Vec<CombatEvent>,
    /// Set if the tick panicked part way through.
    pub error: Option<TickError>,
}

impl TickReport {
    /// Tick number of the snapshot.
    #[must_use]
    pub fn tick(&self) -> u64 {
        self.snapshot.tick
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{ScriptBinding, Stats};

    fn world() -> World {
        let mut world = World::default();
        world.spawn(EntityKind::Player, "ada", "github", Stats::default(), Vec2::new(1.0, 2.0));
        world.spawn(EntityKind::Npc, "guard", "town", Stats::default(), Vec2::new(300.0, 0.0));
        world
    }

    #[test]
    fn capture_copies_entities_in_order() {
        let mut world = world();
        let snap = WorldSnapshot::capture(&world, 12, EventInfo::default());
        assert_eq!(snap.tick, 12);
        assert_eq!(snap.entities.len(), 2);
        assert_eq!(snap.entities[0].name, "ada");

        // Later mutation does not leak into the snapshot.
        world.get_mut(EntityId::new(1)).unwrap().combat.apply_damage(30);
        assert_eq!(snap.get(EntityId::new(1)).unwrap().hp, 100);
    }

    #[test]
    fn spatial_filter() {
        let snap = WorldSnapshot::capture(&world(), 0, EventInfo::default());
        let near: Vec<&str> = snap.within(Vec2::ZERO, 50.0).map(|e| e.name.as_str()).collect();
        assert_eq!(near, vec!["ada"]);
    }

    #[test]
    fn disabled_scripts_are_hidden() {
        let mut world = world();
        let e = world.get_mut(EntityId::new(1)).unwrap();
        e.script = Some(ScriptBinding {
            script_id: "kite".into(),
            enabled: false,
        });
        let snap = EntitySnapshot::from(world.get(EntityId::new(1)).unwrap());
        assert_eq!(snap.script, None);
    }

    #[test]
    fn serializes_to_json() {
        let snap = WorldSnapshot::capture(&world(), 3, EventInfo::default());
        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["tick"], 3);
        assert_eq!(json["entities"][0]["kind"]["type"], "player");
        assert_eq!(json["entities"][1]["state"], "idle");
        assert_eq!(json["event"]["kind"], "none");
    }
}
