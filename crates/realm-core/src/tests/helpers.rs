//! Test setup shared by the scenario and property tests.

use glam::Vec2;

use crate::config::GameConfig;
use crate::entity::{EntityId, EntityKind, LifeState, Stats};
use crate::game_state::GameState;
use crate::systems::{FixedClock, WallTime};
use crate::world::World;

/// Clock pinned to early morning, well before the daily boss.
pub const MORNING: FixedClock = FixedClock(WallTime { day: 10, hour: 6 });

/// A game state with the default config and a pinned clock.
pub fn new_state(seed: u64) -> GameState {
    let mut state = GameState::new(GameConfig::default(), seed).expect("default config is valid");
    state.set_clock(Box::new(MORNING));
    state
}

/// Stats that always hit and never crit.
pub fn sure_hit(damage: u32, armor: u32) -> Stats {
    Stats {
        max_hp: 500,
        damage,
        attack_speed: 10,
        move_speed: 10,
        crit_chance: 0,
        evasion: 0,
        armor,
    }
}

/// Spawn a player directly at `at`, bypassing territory placement.
pub fn place_player(state: &mut GameState, name: &str, faction: &str, stats: Stats, at: Vec2) -> EntityId {
    state
        .world_mut()
        .spawn(EntityKind::Player, name, faction, stats, at)
}

/// Checks that life state and hit points agree for every entity.
pub fn assert_life_consistent(world: &World) {
    for e in world.entities_sorted() {
        let dead = e.combat.state() == LifeState::Dead;
        assert_eq!(dead, e.combat.hp() == 0, "entity {} hp {} state {:?}", e.id(), e.combat.hp(), e.combat.state());
        assert!(e.combat.hp() <= e.combat.max_hp());
        if e.combat.target().is_some() {
            assert_ne!(e.combat.state(), LifeState::Idle, "entity {} idle with a target", e.id());
        }
    }
}
