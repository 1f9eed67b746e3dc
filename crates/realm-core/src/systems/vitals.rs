//! Health regeneration and fleeing.
//!
//! Every `regen_interval` ticks, living entities that are not fighting regain
//! `regen_fraction` of their max HP (at least one point).
//!
//! Players without an active script flee when they drop below
//! `flee_hp_fraction` mid-fight: they leave combat and run `flee_distance`
//! away from the threat. They keep fleeing, and skip target selection, until
//! regeneration brings them back above `flee_recover_fraction`.

use glam::Vec2;

use crate::config::BehaviorConfig;
use crate::entity::{Entity, EntityId, LifeState};
use crate::world::World;

/// Regenerates health and runs the flee reflex.
#[derive(Debug, Clone)]
pub struct VitalsSystem {
    config: BehaviorConfig,
}

impl VitalsSystem {
    /// Creates the system.
    #[must_use]
    pub fn new(config: BehaviorConfig) -> Self {
        Self { config }
    }

    /// Run regeneration and the flee reflex for `id`. Returns true if the
    /// entity is fleeing after this step.
    pub fn update(&self, world: &mut World, id: EntityId, tick: u64) -> bool {
        self.regenerate(world, id, tick);

        let Some(e) = world.get(id) else { return false };
        if !e.is_player() || !e.is_alive() {
            return false;
        }
        let scripted = e.script.as_ref().is_some_and(|s| s.enabled);
        let hp = e.combat.hp_fraction();

        if e.combat.is_fleeing() {
            if hp >= self.config.flee_recover_fraction {
                if let Some(e) = world.get_mut(id) {
                    e.combat.set_fleeing(false);
                }
                tracing::debug!(%id, "recovered, no longer fleeing");
                return false;
            }
            return true;
        }

        if !scripted && e.combat.state() == LifeState::Attacking && hp < self.config.flee_hp_fraction {
            self.start_flee(world, id);
            return true;
        }
        false
    }

    /// Leave combat and run away from the most pressing threat. Used by the
    /// reflex and by scripts issuing a flee action.
    pub fn start_flee(&self, world: &mut World, id: EntityId) {
        let Some(e) = world.get(id) else { return };
        if !e.is_alive() {
            return;
        }
        let pos = e.position();
        let threat = e
            .combat
            .target()
            .and_then(|t| world.position(t))
            .or_else(|| Self::nearest_attacker(world, e));
        let destination = match threat {
            Some(threat) => {
                let away = (pos - threat).normalize_or_zero();
                let away = if away == Vec2::ZERO { Vec2::X } else { away };
                world.map().clamp(pos + away * self.config.flee_distance)
            }
            None => e.transform.spawn_point,
        };
        let Some(e) = world.get_mut(id) else { return };
        e.clear_combat();
        e.transform.move_to(destination);
        e.combat.set_moving();
        e.combat.set_fleeing(true);
        tracing::debug!(%id, ?destination, "fleeing");
    }

    fn nearest_attacker(world: &World, me: &Entity) -> Option<Vec2> {
        let pos = me.position();
        world
            .entities_sorted()
            .filter(|other| other.is_alive() && other.combat.is_attacking(me.id()))
            .map(Entity::position)
            .min_by(|a, b| a.distance(pos).total_cmp(&b.distance(pos)))
    }

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    fn regenerate(&self, world: &mut World, id: EntityId, tick: u64) {
        if tick % self.config.regen_interval.max(1) != 0 {
            return;
        }
        let Some(e) = world.get_mut(id) else { return };
        if !e.is_alive() || e.combat.state() == LifeState::Attacking {
            return;
        }
        if e.combat.hp() >= e.combat.max_hp() {
            return;
        }
        let amount = ((e.combat.max_hp() as f32 * self.config.regen_fraction).floor() as u32).max(1);
        e.combat.heal(amount);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{EntityKind, ScriptBinding, Stats};

    fn system() -> VitalsSystem {
        VitalsSystem::new(BehaviorConfig::default())
    }

    fn player(world: &mut World, at: Vec2) -> EntityId {
        world.spawn(EntityKind::Player, "p", "github", Stats::default(), at)
    }

    mod regen_tests {
        use super::*;

        #[test]
        fn heals_on_interval_only() {
            let sys = system();
            let mut world = World::default();
            let id = player(&mut world, Vec2::ZERO);
            world.get_mut(id).unwrap().combat.apply_damage(50);
            sys.update(&mut world, id, 19);
            assert_eq!(world.get(id).unwrap().combat.hp(), 50);
            sys.update(&mut world, id, 20);
            // 2% of 100.
            assert_eq!(world.get(id).unwrap().combat.hp(), 52);
        }

        #[test]
        fn no_regen_while_fighting() {
            let sys = system();
            let mut world = World::default();
            let id = player(&mut world, Vec2::ZERO);
            let e = world.get_mut(id).unwrap();
            e.combat.apply_damage(10);
            e.combat.engage(EntityId::new(77));
            sys.update(&mut world, id, 40);
            assert_eq!(world.get(id).unwrap().combat.hp(), 90);
        }

        #[test]
        fn small_pools_regen_at_least_one() {
            let sys = system();
            let mut world = World::default();
            let id = world.spawn(
                EntityKind::Npc,
                "n",
                "town",
                Stats {
                    max_hp: 10,
                    ..Stats::default()
                },
                Vec2::ZERO,
            );
            world.get_mut(id).unwrap().combat.apply_damage(5);
            sys.update(&mut world, id, 0);
            assert_eq!(world.get(id).unwrap().combat.hp(), 6);
        }
    }

    mod flee_tests {
        use super::*;

        fn wounded_fighter(world: &mut World) -> (EntityId, EntityId) {
            let foe = world.spawn(EntityKind::Npc, "foe", "town", Stats::default(), Vec2::new(40.0, 0.0));
            let id = player(world, Vec2::ZERO);
            let e = world.get_mut(id).unwrap();
            e.combat.engage(foe);
            e.combat.apply_damage(85);
            (id, foe)
        }

        #[test]
        fn low_health_in_combat_triggers_flee() {
            let sys = system();
            let mut world = World::default();
            let (id, _) = wounded_fighter(&mut world);
            assert!(sys.update(&mut world, id, 1));
            let e = world.get(id).unwrap();
            assert!(e.combat.is_fleeing());
            assert_eq!(e.combat.state(), LifeState::Moving);
            assert!(e.combat.target().is_none());
            assert_eq!(e.transform.move_target, Some(Vec2::new(-250.0, 0.0)));
        }

        #[test]
        fn fleeing_persists_until_recovered() {
            let sys = system();
            let mut world = World::default();
            let (id, _) = wounded_fighter(&mut world);
            sys.update(&mut world, id, 1);
            assert!(sys.update(&mut world, id, 2));
            world.get_mut(id).unwrap().combat.heal(60);
            assert!(!sys.update(&mut world, id, 3));
            assert!(!world.get(id).unwrap().combat.is_fleeing());
        }

        #[test]
        fn scripted_players_do_not_flee_on_their_own() {
            let sys = system();
            let mut world = World::default();
            let (id, _) = wounded_fighter(&mut world);
            world.get_mut(id).unwrap().script = Some(ScriptBinding::new("brave"));
            assert!(!sys.update(&mut world, id, 1));
            assert_eq!(world.get(id).unwrap().combat.state(), LifeState::Attacking);
        }

        #[test]
        fn flee_without_threat_heads_home() {
            let sys = system();
            let mut world = World::default();
            let id = player(&mut world, Vec2::new(100.0, 100.0));
            world.get_mut(id).unwrap().transform.position = Vec2::new(300.0, 100.0);
            sys.start_flee(&mut world, id);
            assert_eq!(
                world.get(id).unwrap().transform.move_target,
                Some(Vec2::new(100.0, 100.0))
            );
        }
    }
}
