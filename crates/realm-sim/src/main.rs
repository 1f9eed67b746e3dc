//! Headless gitrealm runner.
//!
//! Environment:
//! - `REALM_CONFIG`: path to a TOML [`GameConfig`]; defaults apply when unset
//! - `REALM_SEED`: RNG seed (default 0)
//! - `RUST_LOG`: tracing filter (default `info`)
//! - `LOG_FORMAT=json`: structured log output

mod demo;

use anyhow::Context;
use glam::Vec2;
use realm_core::{GameConfig, GameLoop, GameState, TickReport};
use tokio::sync::broadcast::error::RecvError;

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

fn load_config() -> anyhow::Result<GameConfig> {
    match std::env::var("REALM_CONFIG") {
        Ok(path) => {
            let config = GameConfig::load(&path).with_context(|| format!("loading config from {path}"))?;
            tracing::info!(%path, "config loaded");
            Ok(config)
        }
        Err(_) => Ok(GameConfig::default()),
    }
}

fn seed() -> anyhow::Result<u64> {
    match std::env::var("REALM_SEED") {
        Ok(raw) => raw.parse().with_context(|| format!("REALM_SEED is not a number: {raw:?}")),
        Err(_) => Ok(0),
    }
}

fn log_report(report: &TickReport) {
    if let Some(err) = &report.error {
        tracing::error!(tick = report.tick(), %err, "tick failed");
    }
    for reward in &report.rewards {
        tracing::debug!(who = %reward.name, exp = reward.exp, gold = reward.gold, "reward");
    }
    for up in &report.level_ups {
        tracing::info!(who = %up.name, level = up.level, max_hp = up.max_hp, "level up");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env locally; safe to ignore when not present.
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = load_config()?;
    let seed = seed()?;
    let mut state = GameState::new(config, seed).context("building game state")?;
    demo::populate(&mut state)?;
    state.set_script_host(Box::new(demo::Patrol::new(
        Vec2::new(-300.0, 0.0),
        Vec2::new(300.0, 0.0),
        200,
    )));
    state.add_observer(Box::new(demo::KillFeed::new(200)));

    let mut game = GameLoop::new(state);
    let mut reports = game.subscribe();
    game.start();
    tracing::info!(seed, "realm running, ctrl-c to stop");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            report = reports.recv() => match report {
                Ok(report) => log_report(&report),
                Err(RecvError::Lagged(missed)) => tracing::warn!(missed, "report consumer lagging"),
                Err(RecvError::Closed) => break,
            },
        }
    }

    game.shutdown().await;
    let tick = game.with_state(|s| s.current_tick());
    tracing::info!(tick, "realm stopped");
    Ok(())
}
