//! AI system for NPCs and monsters.
//!
//! Two temperaments:
//!
//! - **Aggressive** monsters are stateless. Every tick they pick the nearest
//!   living player: out of aggro range they idle, in aggro range they chase,
//!   in attack range they fight.
//! - **Passive** entities (NPCs, ambient bugs) run a small state machine kept
//!   in [`AiMemory`]: `Idle` until damaged, then `Chasing` the aggressor,
//!   `Attacking` once in range, and `Returning` to their spawn point when the
//!   aggressor is gone or they strayed past `max_chase_distance`.
//!
//! Rating protection only applies between players, so AI never consults it.
//!
//! [`AiMemory`]: crate::entity::AiMemory

use crate::config::AiConfig;
use crate::entity::{AiState, Entity, EntityId, KindTraits, LifeState};
use crate::systems::CombatSystem;
use crate::world::World;

/// Drives non-player entities.
#[derive(Debug, Clone)]
pub struct AiSystem {
    config: AiConfig,
}

impl AiSystem {
    /// Creates the system.
    #[must_use]
    pub fn new(config: AiConfig) -> Self {
        Self { config }
    }

    /// Run one AI step for entity `id`. Players and dead entities are
    /// ignored.
    pub fn update(&self, world: &mut World, combat: &CombatSystem, id: EntityId) {
        let Some(entity) = world.get(id) else { return };
        if !entity.is_alive() {
            return;
        }
        let traits = entity.traits();
        if !traits.contains(KindTraits::AI_DRIVEN) {
            return;
        }
        if traits.contains(KindTraits::AGGRESSIVE) {
            self.update_aggressive(world, combat, id);
        } else {
            self.update_passive(world, combat, id);
        }
    }

    /// React to `target` being hit by `attacker`: a passive entity at rest
    /// (or walking home) turns on its aggressor.
    pub fn on_damaged(&self, world: &mut World, target: EntityId, attacker: EntityId) {
        if !world.get(attacker).is_some_and(Entity::is_alive) {
            return;
        }
        let Some(entity) = world.get_mut(target) else { return };
        if !entity.is_alive() {
            return;
        }
        let Some(memory) = entity.ai.as_mut() else { return };
        if matches!(memory.state, AiState::Idle | AiState::Returning) {
            memory.state = AiState::Chasing;
            memory.aggro = Some(attacker);
            tracing::trace!(%target, %attacker, "provoked");
        }
    }

    fn update_aggressive(&self, world: &mut World, combat: &CombatSystem, id: EntityId) {
        let Some(me) = world.get(id) else { return };
        let pos = me.position();
        let current = me.combat.target().filter(|_| me.combat.state() == LifeState::Attacking);
        let nearest = world.nearest_living(pos, self.config.aggro_radius, Entity::is_player);

        match nearest {
            None => {
                if let Some(e) = world.get_mut(id) {
                    e.clear_combat();
                    e.combat.set_idle();
                }
            }
            Some((player, distance)) if distance <= combat.config().attack_range => {
                if current != Some(player) {
                    combat.try_start_combat(world, id, player);
                }
            }
            Some((player, _)) => {
                let Some(goal) = world.position(player) else { return };
                if let Some(e) = world.get_mut(id) {
                    if current.is_some() {
                        e.combat.disengage();
                    }
                    e.transform.move_to(goal);
                }
            }
        }
    }

    fn update_passive(&self, world: &mut World, combat: &CombatSystem, id: EntityId) {
        let Some(me) = world.get(id) else { return };
        let Some(memory) = me.ai else { return };
        let pos = me.position();
        let spawn = me.transform.spawn_point;

        match memory.state {
            AiState::Idle => {}
            AiState::Chasing | AiState::Attacking => {
                let aggressor = memory
                    .aggro
                    .and_then(|a| world.get(a))
                    .filter(|a| a.is_alive())
                    .map(|a| (a.id(), a.position()));
                let Some((aggressor, goal)) = aggressor else {
                    self.start_return(world, id);
                    return;
                };
                if pos.distance(spawn) > self.config.max_chase_distance {
                    self.start_return(world, id);
                    return;
                }
                if pos.distance(goal) <= combat.config().attack_range {
                    let engaged = me.combat.is_attacking(aggressor);
                    if engaged || combat.try_start_combat(world, id, aggressor) {
                        Self::set_state(world, id, AiState::Attacking);
                    }
                } else if let Some(e) = world.get_mut(id) {
                    e.combat.disengage();
                    e.transform.move_to(goal);
                    if let Some(m) = e.ai.as_mut() {
                        m.state = AiState::Chasing;
                    }
                }
            }
            AiState::Returning => {
                let home = pos.distance(spawn) <= self.config.return_radius;
                let Some(e) = world.get_mut(id) else { return };
                // Movement clears the target on arrival or when the way home
                // is blocked; either way the trip is over.
                if home || !e.transform.is_moving() {
                    e.transform.stop();
                    e.combat.set_idle();
                    if let Some(m) = e.ai.as_mut() {
                        m.reset();
                    }
                }
            }
        }
    }

    fn start_return(&self, world: &mut World, id: EntityId) {
        let Some(e) = world.get_mut(id) else { return };
        e.combat.disengage();
        let spawn = e.transform.spawn_point;
        e.transform.move_to(spawn);
        e.combat.set_moving();
        if let Some(m) = e.ai.as_mut() {
            m.state = AiState::Returning;
            m.aggro = None;
        }
        tracing::trace!(%id, "returning to spawn");
    }

    fn set_state(world: &mut World, id: EntityId, state: AiState) {
        if let Some(m) = world.get_mut(id).and_then(|e| e.ai.as_mut()) {
            m.state = state;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CombatConfig;
    use crate::entity::{EntityKind, MonsterKind, Stats};
    use glam::Vec2;

    fn systems() -> (AiSystem, CombatSystem) {
        (
            AiSystem::new(AiConfig::default()),
            CombatSystem::new(CombatConfig::default(), 100),
        )
    }

    fn spawn(world: &mut World, kind: EntityKind, at: Vec2) -> EntityId {
        world.spawn(kind, "e", "wild", Stats::default(), at)
    }

    fn ai_state(world: &World, id: EntityId) -> AiState {
        world.get(id).and_then(|e| e.ai).map(|m| m.state).unwrap()
    }

    mod aggressive_tests {
        use super::*;

        #[test]
        fn idles_without_players_in_aggro_radius() {
            let (ai, combat) = systems();
            let mut world = World::default();
            let m = spawn(&mut world, EntityKind::Monster(MonsterKind::SegFault), Vec2::ZERO);
            spawn(&mut world, EntityKind::Player, Vec2::new(301.0, 0.0));
            ai.update(&mut world, &combat, m);
            let e = world.get(m).unwrap();
            assert_eq!(e.combat.state(), LifeState::Idle);
            assert!(e.transform.move_target.is_none());
        }

        #[test]
        fn chases_player_in_aggro_radius() {
            let (ai, combat) = systems();
            let mut world = World::default();
            let m = spawn(&mut world, EntityKind::Monster(MonsterKind::SegFault), Vec2::ZERO);
            spawn(&mut world, EntityKind::Player, Vec2::new(200.0, 0.0));
            ai.update(&mut world, &combat, m);
            assert_eq!(
                world.get(m).unwrap().transform.move_target,
                Some(Vec2::new(200.0, 0.0))
            );
        }

        #[test]
        fn attacks_player_in_range() {
            let (ai, combat) = systems();
            let mut world = World::default();
            let m = spawn(&mut world, EntityKind::Monster(MonsterKind::SegFault), Vec2::ZERO);
            let p = spawn(&mut world, EntityKind::Player, Vec2::new(40.0, 0.0));
            ai.update(&mut world, &combat, m);
            assert!(world.get(m).unwrap().combat.is_attacking(p));
        }

        #[test]
        fn switches_to_nearer_player() {
            let (ai, combat) = systems();
            let mut world = World::default();
            let m = spawn(&mut world, EntityKind::Monster(MonsterKind::Deadlock), Vec2::ZERO);
            let far = spawn(&mut world, EntityKind::Player, Vec2::new(55.0, 0.0));
            let near = spawn(&mut world, EntityKind::Player, Vec2::new(0.0, 20.0));
            combat.try_start_combat(&mut world, m, far);
            ai.update(&mut world, &combat, m);
            assert!(world.get(m).unwrap().combat.is_attacking(near));
        }

        #[test]
        fn ignores_npcs_and_monsters() {
            let (ai, combat) = systems();
            let mut world = World::default();
            let m = spawn(&mut world, EntityKind::Monster(MonsterKind::SegFault), Vec2::ZERO);
            spawn(&mut world, EntityKind::Npc, Vec2::new(10.0, 0.0));
            spawn(&mut world, EntityKind::Monster(MonsterKind::Bug), Vec2::new(0.0, 10.0));
            ai.update(&mut world, &combat, m);
            assert_eq!(world.get(m).unwrap().combat.state(), LifeState::Idle);
        }
    }

    mod passive_tests {
        use super::*;

        #[test]
        fn idle_until_provoked() {
            let (ai, combat) = systems();
            let mut world = World::default();
            let npc = spawn(&mut world, EntityKind::Npc, Vec2::ZERO);
            spawn(&mut world, EntityKind::Player, Vec2::new(20.0, 0.0));
            ai.update(&mut world, &combat, npc);
            assert_eq!(ai_state(&world, npc), AiState::Idle);
            assert_eq!(world.get(npc).unwrap().combat.state(), LifeState::Idle);
        }

        #[test]
        fn damage_triggers_chase_then_attack() {
            let (ai, combat) = systems();
            let mut world = World::default();
            let npc = spawn(&mut world, EntityKind::Npc, Vec2::ZERO);
            let p = spawn(&mut world, EntityKind::Player, Vec2::new(100.0, 0.0));
            ai.on_damaged(&mut world, npc, p);
            assert_eq!(ai_state(&world, npc), AiState::Chasing);

            ai.update(&mut world, &combat, npc);
            assert_eq!(ai_state(&world, npc), AiState::Chasing);
            assert_eq!(
                world.get(npc).unwrap().transform.move_target,
                Some(Vec2::new(100.0, 0.0))
            );

            world.get_mut(npc).unwrap().transform.position = Vec2::new(60.0, 0.0);
            ai.update(&mut world, &combat, npc);
            assert_eq!(ai_state(&world, npc), AiState::Attacking);
            assert!(world.get(npc).unwrap().combat.is_attacking(p));
        }

        #[test]
        fn returns_when_aggressor_dies() {
            let (ai, combat) = systems();
            let mut world = World::default();
            let npc = spawn(&mut world, EntityKind::Npc, Vec2::ZERO);
            let p = spawn(&mut world, EntityKind::Player, Vec2::new(30.0, 0.0));
            ai.on_damaged(&mut world, npc, p);
            ai.update(&mut world, &combat, npc);
            world.get_mut(p).unwrap().combat.apply_damage(10_000);
            world.get_mut(npc).unwrap().transform.position = Vec2::new(50.0, 0.0);
            ai.update(&mut world, &combat, npc);

            let e = world.get(npc).unwrap();
            assert_eq!(ai_state(&world, npc), AiState::Returning);
            assert_eq!(e.combat.state(), LifeState::Moving);
            assert!(e.combat.target().is_none());
            assert_eq!(e.transform.move_target, Some(Vec2::ZERO));
        }

        #[test]
        fn leash_breaks_long_chase() {
            let (ai, combat) = systems();
            let mut world = World::default();
            let npc = spawn(&mut world, EntityKind::Npc, Vec2::ZERO);
            let p = spawn(&mut world, EntityKind::Player, Vec2::new(700.0, 0.0));
            ai.on_damaged(&mut world, npc, p);
            world.get_mut(npc).unwrap().transform.position = Vec2::new(510.0, 0.0);
            ai.update(&mut world, &combat, npc);
            assert_eq!(ai_state(&world, npc), AiState::Returning);
        }

        #[test]
        fn home_again_goes_idle() {
            let (ai, combat) = systems();
            let mut world = World::default();
            let npc = spawn(&mut world, EntityKind::Npc, Vec2::ZERO);
            let p = spawn(&mut world, EntityKind::Player, Vec2::new(30.0, 0.0));
            ai.on_damaged(&mut world, npc, p);
            world.despawn(p);
            ai.update(&mut world, &combat, npc);
            assert_eq!(ai_state(&world, npc), AiState::Returning);
            world.get_mut(npc).unwrap().transform.position = Vec2::new(5.0, 0.0);
            ai.update(&mut world, &combat, npc);
            assert_eq!(ai_state(&world, npc), AiState::Idle);
            assert!(world.get(npc).unwrap().ai.unwrap().aggro.is_none());
        }

        #[test]
        fn provocation_ignored_while_fighting() {
            let (ai, _) = systems();
            let mut world = World::default();
            let npc = spawn(&mut world, EntityKind::Npc, Vec2::ZERO);
            let first = spawn(&mut world, EntityKind::Player, Vec2::new(30.0, 0.0));
            let second = spawn(&mut world, EntityKind::Player, Vec2::new(0.0, 30.0));
            ai.on_damaged(&mut world, npc, first);
            ai.on_damaged(&mut world, npc, second);
            assert_eq!(world.get(npc).unwrap().ai.unwrap().aggro, Some(first));
        }
    }
}
