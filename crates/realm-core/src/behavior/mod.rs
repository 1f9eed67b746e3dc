//! Behavior controllers: per-player target selection.
//!
//! A [`Controller`] looks at one player and a read-only [`WorldView`] and
//! returns an [`Action`], or `None` to leave the player as it is. The game
//! loop applies the action with [`apply_action`]; controllers never write to
//! the world themselves.
//!
//! Two controllers ship with the core:
//!
//! - [`DefaultBehavior`] hunts event monsters while a world event runs, and
//!   otherwise attacks the nearest monster or rival-faction player it may
//!   engage.
//! - [`ScriptController`] hands players with an enabled
//!   [`ScriptBinding`](crate::entity::ScriptBinding) to an embedder-supplied
//!   [`ScriptHost`]. When the host returns `None` the default behavior runs
//!   instead.

mod script;

pub use script::{ScriptController, ScriptHost};

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::config::BehaviorConfig;
use crate::entity::{Entity, EntityId, LifeState};
use crate::systems::{CombatSystem, EventContext, VitalsSystem};
use crate::world::World;
use crate::world_view::WorldView;

// =============================================================================
// Actions
// =============================================================================

/// What a controller wants its player to do.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Walk to a point.
    MoveTo {
        /// Destination; clamped to the map.
        target: Vec2,
    },
    /// Walk to where an entity stands.
    MoveToEntity {
        /// Entity to approach.
        entity: EntityId,
    },
    /// Fight an entity, walking to it first if out of range.
    Attack {
        /// Entity to fight.
        entity: EntityId,
    },
    /// Fight the nearest entity that may be engaged.
    AttackNearest,
    /// Leave combat and run.
    Flee,
    /// Stop moving and fighting.
    Stop,
}

/// Decides what a player does this tick.
pub trait Controller: Send {
    /// Choose an action for `me`, or `None` to change nothing.
    fn decide(&mut self, me: &Entity, view: &WorldView<'_>, event: &EventContext) -> Option<Action>;
}

// =============================================================================
// Default behavior
// =============================================================================

/// Built-in target selection for players without a script.
#[derive(Debug, Clone)]
pub struct DefaultBehavior {
    config: BehaviorConfig,
    combat: CombatSystem,
}

impl DefaultBehavior {
    /// Creates the controller. `combat` supplies the engagement rule.
    #[must_use]
    pub fn new(config: BehaviorConfig, combat: CombatSystem) -> Self {
        Self { config, combat }
    }

    fn busy(me: &Entity, view: &WorldView<'_>) -> bool {
        me.combat.state() == LifeState::Attacking
            && me
                .combat
                .target()
                .and_then(|t| view.get_entity(t))
                .is_some_and(Entity::is_alive)
    }
}

impl Controller for DefaultBehavior {
    fn decide(&mut self, me: &Entity, view: &WorldView<'_>, event: &EventContext) -> Option<Action> {
        if !me.is_alive() || Self::busy(me, view) {
            return None;
        }
        if event.info.is_active() {
            let hunt = view.nearest_living(me.position(), self.config.event_hunt_radius, |e| {
                event.is_event_monster(e.id())
            });
            if let Some((entity, _)) = hunt {
                return Some(Action::Attack { entity });
            }
        }
        nearest_engageable(view, &self.combat, me, self.config.engage_radius)
            .map(|entity| Action::Attack { entity })
    }
}

/// Nearest monster or rival-faction player within `radius` that `me` may
/// engage. Townsfolk are never picked.
#[must_use]
pub fn nearest_engageable(
    view: &WorldView<'_>,
    combat: &CombatSystem,
    me: &Entity,
    radius: f32,
) -> Option<EntityId> {
    view.nearest_living(me.position(), radius, |other| {
        other.id() != me.id()
            && (other.is_monster() || (other.is_player() && other.faction() != me.faction()))
            && combat.may_engage(me, other)
    })
    .map(|(id, _)| id)
}

// =============================================================================
// Applying actions
// =============================================================================

/// Carry out `action` for player `id`.
///
/// Actions naming a missing or dead entity are ignored. An attack on a target
/// out of range becomes a walk towards it.
pub fn apply_action(
    world: &mut World,
    combat: &CombatSystem,
    vitals: &VitalsSystem,
    config: &BehaviorConfig,
    id: EntityId,
    action: Action,
) {
    if !world.get(id).is_some_and(Entity::is_alive) {
        return;
    }
    match action {
        Action::MoveTo { target } => {
            let goal = world.map().clamp(target);
            walk(world, id, goal);
        }
        Action::MoveToEntity { entity } => {
            if entity == id {
                return;
            }
            if let Some(goal) = world.position(entity) {
                walk(world, id, goal);
            }
        }
        Action::Attack { entity } => attack(world, combat, id, entity),
        Action::AttackNearest => {
            let Some(me) = world.get(id) else { return };
            let view = WorldView::new(world, 0);
            if let Some(entity) = nearest_engageable(&view, combat, me, config.engage_radius) {
                attack(world, combat, id, entity);
            }
        }
        Action::Flee => vitals.start_flee(world, id),
        Action::Stop => {
            if let Some(e) = world.get_mut(id) {
                e.clear_combat();
                e.combat.set_idle();
            }
        }
    }
}

fn walk(world: &mut World, id: EntityId, goal: Vec2) {
    let Some(e) = world.get_mut(id) else { return };
    e.clear_combat();
    e.transform.move_to(goal);
    e.combat.set_moving();
}

fn attack(world: &mut World, combat: &CombatSystem, id: EntityId, target: EntityId) {
    let (Some(me), Some(t)) = (world.get(id), world.get(target)) else {
        return;
    };
    if target == id || !t.is_alive() || !combat.may_engage(me, t) {
        return;
    }
    if me.combat.is_attacking(target) {
        return;
    }
    if combat.in_range(me, t) {
        combat.try_start_combat(world, id, target);
    } else {
        let goal = t.position();
        walk(world, id, goal);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CombatConfig;
    use crate::entity::{EntityKind, MonsterKind, Stats};
    use crate::systems::EventInfo;
    use crate::systems::EventKind;

    fn combat() -> CombatSystem {
        CombatSystem::new(CombatConfig::default(), 100)
    }

    fn behavior() -> DefaultBehavior {
        DefaultBehavior::new(BehaviorConfig::default(), combat())
    }

    fn spawn(world: &mut World, kind: EntityKind, faction: &str, at: Vec2) -> EntityId {
        world.spawn(kind, "e", faction, Stats::default(), at)
    }

    fn decide(world: &World, id: EntityId, event: &EventContext) -> Option<Action> {
        let view = WorldView::new(world, 0);
        behavior().decide(world.get(id).unwrap(), &view, event)
    }

    mod selection_tests {
        use super::*;

        #[test]
        fn picks_nearest_monster() {
            let mut world = World::default();
            let me = spawn(&mut world, EntityKind::Player, "github", Vec2::ZERO);
            spawn(&mut world, EntityKind::Monster(MonsterKind::Bug), "bugs", Vec2::new(200.0, 0.0));
            let near = spawn(&mut world, EntityKind::Monster(MonsterKind::Bug), "bugs", Vec2::new(100.0, 0.0));
            assert_eq!(
                decide(&world, me, &EventContext::default()),
                Some(Action::Attack { entity: near })
            );
        }

        #[test]
        fn ignores_allies_and_townsfolk() {
            let mut world = World::default();
            let me = spawn(&mut world, EntityKind::Player, "github", Vec2::ZERO);
            spawn(&mut world, EntityKind::Player, "github", Vec2::new(50.0, 0.0));
            spawn(&mut world, EntityKind::Npc, "town", Vec2::new(60.0, 0.0));
            assert_eq!(decide(&world, me, &EventContext::default()), None);

            let rival = spawn(&mut world, EntityKind::Player, "gitlab", Vec2::new(250.0, 0.0));
            assert_eq!(
                decide(&world, me, &EventContext::default()),
                Some(Action::Attack { entity: rival })
            );
        }

        #[test]
        fn rating_protection_hides_weak_rivals() {
            let mut world = World::default();
            let me = spawn(&mut world, EntityKind::Player, "github", Vec2::ZERO);
            let weak = spawn(&mut world, EntityKind::Player, "gitlab", Vec2::new(100.0, 0.0));
            world.get_mut(me).unwrap().ranking.rating = 1_500;
            assert_eq!(decide(&world, me, &EventContext::default()), None);

            // Unless they started it.
            world.get_mut(weak).unwrap().combat.engage(me);
            assert_eq!(
                decide(&world, me, &EventContext::default()),
                Some(Action::Attack { entity: weak })
            );
        }

        #[test]
        fn event_monsters_take_priority() {
            let mut world = World::default();
            let me = spawn(&mut world, EntityKind::Player, "github", Vec2::ZERO);
            spawn(&mut world, EntityKind::Monster(MonsterKind::Bug), "bugs", Vec2::new(50.0, 0.0));
            let boss = spawn(&mut world, EntityKind::Monster(MonsterKind::TechDebt), "bugs", Vec2::new(900.0, 0.0));
            let event = EventContext {
                info: EventInfo {
                    kind: EventKind::Boss,
                    remaining: 1,
                    start_tick: 0,
                },
                monsters: vec![boss],
            };
            assert_eq!(decide(&world, me, &event), Some(Action::Attack { entity: boss }));
        }

        #[test]
        fn keeps_current_fight() {
            let mut world = World::default();
            let me = spawn(&mut world, EntityKind::Player, "github", Vec2::ZERO);
            let foe = spawn(&mut world, EntityKind::Monster(MonsterKind::Bug), "bugs", Vec2::new(200.0, 0.0));
            spawn(&mut world, EntityKind::Monster(MonsterKind::Bug), "bugs", Vec2::new(20.0, 0.0));
            world.get_mut(me).unwrap().combat.engage(foe);
            assert_eq!(decide(&world, me, &EventContext::default()), None);
        }
    }

    mod apply_tests {
        use super::*;

        fn apply(world: &mut World, id: EntityId, action: Action) {
            let vitals = VitalsSystem::new(BehaviorConfig::default());
            apply_action(world, &combat(), &vitals, &BehaviorConfig::default(), id, action);
        }

        #[test]
        fn attack_in_range_engages() {
            let mut world = World::default();
            let me = spawn(&mut world, EntityKind::Player, "github", Vec2::ZERO);
            let foe = spawn(&mut world, EntityKind::Monster(MonsterKind::Bug), "bugs", Vec2::new(40.0, 0.0));
            apply(&mut world, me, Action::Attack { entity: foe });
            let e = world.get(me).unwrap();
            assert_eq!(e.combat.state(), LifeState::Attacking);
            assert_eq!(e.combat.target(), Some(foe));
        }

        #[test]
        fn attack_out_of_range_walks() {
            let mut world = World::default();
            let me = spawn(&mut world, EntityKind::Player, "github", Vec2::ZERO);
            let foe = spawn(&mut world, EntityKind::Monster(MonsterKind::Bug), "bugs", Vec2::new(400.0, 0.0));
            apply(&mut world, me, Action::Attack { entity: foe });
            let e = world.get(me).unwrap();
            assert_eq!(e.combat.state(), LifeState::Moving);
            assert_eq!(e.combat.target(), None);
            assert_eq!(e.transform.move_target, Some(Vec2::new(400.0, 0.0)));
        }

        #[test]
        fn invalid_targets_are_ignored() {
            let mut world = World::default();
            let me = spawn(&mut world, EntityKind::Player, "github", Vec2::ZERO);
            let dead = spawn(&mut world, EntityKind::Monster(MonsterKind::Bug), "bugs", Vec2::new(30.0, 0.0));
            world.get_mut(dead).unwrap().combat.apply_damage(u32::MAX);
            let before = world.get(me).unwrap().clone();

            apply(&mut world, me, Action::Attack { entity: dead });
            apply(&mut world, me, Action::Attack { entity: EntityId::new(404) });
            apply(&mut world, me, Action::MoveToEntity { entity: EntityId::new(404) });
            apply(&mut world, me, Action::Attack { entity: me });
            assert_eq!(*world.get(me).unwrap(), before);
        }

        #[test]
        fn move_to_is_clamped_and_stop_halts() {
            let mut world = World::default();
            let me = spawn(&mut world, EntityKind::Player, "github", Vec2::ZERO);
            apply(&mut world, me, Action::MoveTo { target: Vec2::new(0.0, 9_000.0) });
            assert_eq!(
                world.get(me).unwrap().transform.move_target,
                Some(Vec2::new(0.0, 2_000.0))
            );
            apply(&mut world, me, Action::Stop);
            let e = world.get(me).unwrap();
            assert_eq!(e.transform.move_target, None);
            assert_eq!(e.combat.state(), LifeState::Idle);
        }

        #[test]
        fn attack_nearest_uses_engagement_rule() {
            let mut world = World::default();
            let me = spawn(&mut world, EntityKind::Player, "github", Vec2::ZERO);
            let foe = spawn(&mut world, EntityKind::Monster(MonsterKind::Bug), "bugs", Vec2::new(30.0, 0.0));
            apply(&mut world, me, Action::AttackNearest);
            assert!(world.get(me).unwrap().combat.is_attacking(foe));
        }

        #[test]
        fn flee_leaves_combat() {
            let mut world = World::default();
            let me = spawn(&mut world, EntityKind::Player, "github", Vec2::ZERO);
            let foe = spawn(&mut world, EntityKind::Monster(MonsterKind::Bug), "bugs", Vec2::new(30.0, 0.0));
            apply(&mut world, me, Action::Attack { entity: foe });
            apply(&mut world, me, Action::Flee);
            let e = world.get(me).unwrap();
            assert!(e.combat.is_fleeing());
            assert_eq!(e.combat.target(), None);
        }
    }
}
