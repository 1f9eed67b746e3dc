//! # Realm Core
//!
//! Authoritative tick engine for gitrealm, a persistent multiplayer world
//! where developers fight bugs and each other.
//!
//! ## Architecture
//!
//! - **World**: every entity plus the map it lives on ([`world`], [`entity`])
//! - **Systems**: movement, combat, AI, events, progression and vitals, each
//!   applied to one entity at a time ([`systems`])
//! - **Behavior**: per-player controllers that pick targets ([`behavior`])
//! - **GameState**: one tick pass over all of the above ([`game_state`])
//! - **GameLoop**: fixed-rate scheduler publishing snapshots ([`game_loop`])
//!
//! Only the tick pass mutates the world. Everything outside it reads
//! immutable [`snapshot`]s or registers an [`observer`].
//!
//! ## Usage
//!
//! ```
//! use realm_core::config::GameConfig;
//! use realm_core::entity::Stats;
//! use realm_core::game_state::GameState;
//!
//! let mut state = GameState::new(GameConfig::default(), 42).unwrap();
//! let hero = state.join_player("octocat", "github", Stats::default()).unwrap();
//!
//! for _ in 0..20 {
//!     state.tick().unwrap();
//! }
//!
//! assert_eq!(state.current_tick(), 20);
//! assert!(state.entity(hero).unwrap().is_alive());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod behavior;
pub mod combat_log;
pub mod config;
pub mod entity;
pub mod error;
pub mod game_loop;
pub mod game_state;
pub mod observer;
pub mod snapshot;
pub mod systems;
pub mod world;
pub mod world_view;

#[cfg(test)]
mod tests;

pub use config::GameConfig;
pub use entity::{Entity, EntityId, EntityKind, MonsterKind, Stats};
pub use error::{ConfigError, CoreError, TickError};
pub use game_loop::GameLoop;
pub use game_state::GameState;
pub use snapshot::{TickReport, WorldSnapshot};
pub use world::World;

// Geometry types appear throughout the public API.
pub use realm_geo;
