//! Invariants that must hold for any seed and any crowd.

use std::collections::HashMap;

use glam::Vec2;
use proptest::prelude::*;

use crate::combat_log::CombatEventKind;
use crate::config::{GameConfig, MonsterConfig, ProgressionConfig};
use crate::entity::{EntityId, EntityKind, MonsterKind, Stats};
use crate::game_state::GameState;
use crate::systems::ProgressionSystem;
use crate::world::World;

use super::helpers::{assert_life_consistent, new_state, place_player};

const FACTIONS: [&str; 3] = ["github", "gitlab", "huggingface"];

fn crowd(seed: u64, players: usize, bugs: usize) -> GameState {
    let mut state = new_state(seed);
    for i in 0..players {
        let at = Vec2::new(-150.0 + (i % 4) as f32 * 100.0, -150.0 + (i / 4) as f32 * 100.0);
        place_player(&mut state, &format!("dev{i}"), FACTIONS[i % FACTIONS.len()], Stats::default(), at);
    }
    for i in 0..bugs {
        let kind = if i % 3 == 0 { MonsterKind::Regression } else { MonsterKind::Bug };
        state.spawn_monster(kind, Vec2::new(-100.0 + i as f32 * 40.0, 250.0));
    }
    state
}

fn ratings(state: &GameState) -> HashMap<EntityId, i32> {
    state
        .world()
        .entities_sorted()
        .filter(|e| e.is_player())
        .map(|e| (e.id(), e.ranking.rating))
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn life_state_stays_consistent(seed in any::<u64>(), players in 1usize..8, bugs in 0usize..6, ticks in 50usize..250) {
        let mut state = crowd(seed, players, bugs);
        for _ in 0..ticks {
            prop_assert!(state.tick().is_ok());
            assert_life_consistent(state.world());
        }
    }

    #[test]
    fn pvp_rating_never_drops(seed in any::<u64>(), players in 2usize..8, ticks in 100usize..300) {
        let mut state = crowd(seed, players, 0);
        let mut before = ratings(&state);
        for _ in 0..ticks {
            state.tick().unwrap();
            let after = ratings(&state);
            for (id, rating) in &after {
                prop_assert!(rating >= &before[id], "rating of {} fell", id);
            }
            before = after;
        }
    }

    #[test]
    fn hits_respect_floor_and_cooldown(seed in any::<u64>(), players in 2usize..8, bugs in 0usize..6) {
        let mut state = crowd(seed, players, bugs);
        for _ in 0..300 {
            state.tick().unwrap();
        }

        let min_damage = state.config().combat.min_damage;
        let mut swings: HashMap<EntityId, Vec<u64>> = HashMap::new();
        for event in state.combat_events_since(0) {
            match event.kind {
                CombatEventKind::Damage | CombatEventKind::Critical => {
                    prop_assert!(event.damage.unwrap_or(0) >= min_damage);
                }
                CombatEventKind::Miss => {}
                _ => continue,
            }
            if let Some(attacker) = event.attacker {
                swings.entry(attacker).or_default().push(event.tick);
            }
        }

        let base = state.config().combat.base_cooldown;
        let floor = state.config().combat.min_cooldown;
        for (attacker, ticks) in swings {
            // Despawned monsters no longer report their speed.
            let Some(e) = state.entity(attacker) else { continue };
            let cooldown = base.saturating_sub(u64::from(e.stats.attack_speed)).max(floor);
            for pair in ticks.windows(2) {
                prop_assert!(pair[1] - pair[0] >= cooldown, "{} swung after {} ticks", attacker, pair[1] - pair[0]);
            }
        }
    }

    #[test]
    fn kill_rewards_follow_damage_share(damage in prop::collection::vec(1u32..2_000, 1..6)) {
        let monsters = MonsterConfig::default();
        let pool = monsters.swarm.pool;
        let mut progression = ProgressionSystem::new(ProgressionConfig::default(), monsters);
        let mut world = World::new(GameConfig::default().map);

        let bug = world.spawn(EntityKind::Monster(MonsterKind::Bug), "bug", "bugs", Stats::default(), Vec2::ZERO);
        let mut hitters = Vec::new();
        for (i, amount) in damage.iter().enumerate() {
            let id = world.spawn(EntityKind::Player, &format!("dev{i}"), "github", Stats::default(), Vec2::new(i as f32 * 50.0, 0.0));
            world.get_mut(bug).unwrap().contributions.record(id, *amount);
            hitters.push((id, *amount));
        }

        progression.distribute_monster_kill(&mut world, bug);

        let mut total = 0;
        for (id, _) in &hitters {
            let exp = world.get(*id).unwrap().progress.exp;
            prop_assert!(exp >= 1);
            total += exp;
        }
        prop_assert!(total <= pool.exp + hitters.len() as u64);

        for (a, da) in &hitters {
            for (b, db) in &hitters {
                if da > db {
                    prop_assert!(world.get(*a).unwrap().progress.exp >= world.get(*b).unwrap().progress.exp);
                }
            }
        }
    }
}
