//! Demo population, a patrol script host and a kill feed.

use glam::Vec2;
use realm_core::behavior::{Action, ScriptHost};
use realm_core::entity::{EntityId, LifeState, MonsterKind, ScriptBinding, Stats};
use realm_core::observer::Observer;
use realm_core::snapshot::{EntitySnapshot, WorldSnapshot};
use realm_core::systems::EventContext;
use realm_core::world_view::WorldView;
use realm_core::GameState;

/// Script id understood by [`Patrol`].
pub const PATROL: &str = "patrol";

const PLAYERS: [(&str, &str); 6] = [
    ("octocat", "github"),
    ("hubot", "github"),
    ("tanuki", "gitlab"),
    ("runner", "gitlab"),
    ("hugs", "huggingface"),
    ("transformer", "huggingface"),
];

/// Seed the world with players, a few town NPCs and ambient bugs.
///
/// # Errors
///
/// Fails if a demo handle is already taken.
pub fn populate(state: &mut GameState) -> realm_core::error::Result<()> {
    let mut ids = Vec::with_capacity(PLAYERS.len());
    for (handle, faction) in PLAYERS {
        ids.push(state.join_player(handle, faction, Stats::default())?);
    }
    // The first player walks a patrol route
    if let Some(&first) = ids.first() {
        state.set_script(first, Some(ScriptBinding::new(PATROL)))?;
    }

    for (i, x) in [-150.0, 0.0, 150.0].into_iter().enumerate() {
        state.spawn_npc(&format!("merchant-{i}"), "town", Stats::default(), Vec2::new(x, -100.0));
    }
    for i in 0..12 {
        let angle = i as f32 * std::f32::consts::TAU / 12.0;
        let at = Vec2::from_angle(angle) * 700.0;
        let kind = if i % 4 == 0 { MonsterKind::Regression } else { MonsterKind::Bug };
        state.spawn_monster(kind, at);
    }
    tracing::info!(entities = state.world().entity_count(), "demo world populated");
    Ok(())
}

/// Walks scripted players back and forth between two points, leaving fights
/// to the default behavior.
#[derive(Debug)]
pub struct Patrol {
    route: [Vec2; 2],
    leg_ticks: u64,
}

impl Patrol {
    /// Patrol between `a` and `b`, switching ends every `leg_ticks`.
    pub fn new(a: Vec2, b: Vec2, leg_ticks: u64) -> Self {
        Self {
            route: [a, b],
            leg_ticks: leg_ticks.max(1),
        }
    }
}

impl ScriptHost for Patrol {
    fn run(
        &mut self,
        script: &ScriptBinding,
        me: &EntitySnapshot,
        view: &WorldView<'_>,
        _event: &EventContext,
    ) -> Option<Action> {
        if script.script_id != PATROL || me.state == LifeState::Attacking {
            return None;
        }
        let leg = usize::from((view.tick() / self.leg_ticks) % 2 == 1);
        let target = self.route[leg];
        if me.move_target == Some(target) || me.position.distance(target) < 1.0 {
            return None;
        }
        Some(Action::MoveTo { target })
    }
}

/// Logs kills as they happen and a short census every `every` ticks.
#[derive(Debug)]
pub struct KillFeed {
    every: u64,
    player_kills: u64,
    monster_kills: u64,
}

impl KillFeed {
    /// A feed printing a census every `every` ticks.
    pub fn new(every: u64) -> Self {
        Self {
            every: every.max(1),
            player_kills: 0,
            monster_kills: 0,
        }
    }
}

impl Observer for KillFeed {
    fn on_player_kill(&mut self, killer: EntityId, victim: EntityId) {
        self.player_kills += 1;
        tracing::info!(%killer, %victim, "player down");
    }

    fn on_monster_kill(&mut self, monster: EntityId, last_hitter: EntityId) {
        self.monster_kills += 1;
        tracing::debug!(%monster, %last_hitter, "monster down");
    }

    fn on_tick(&mut self, tick: u64, snapshot: &WorldSnapshot) {
        if tick % self.every != 0 {
            return;
        }
        let alive = snapshot.entities.iter().filter(|e| e.is_alive()).count();
        tracing::info!(
            tick,
            alive,
            total = snapshot.entities.len(),
            event = ?snapshot.event.kind,
            player_kills = self.player_kills,
            monster_kills = self.monster_kills,
            "census"
        );
    }
}
