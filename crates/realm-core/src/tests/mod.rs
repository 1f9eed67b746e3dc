//! Crate-level tests that drive the whole tick pass.
//!
//! - `scenarios.rs`: worked examples of combat, rewards, levelling, events
//!   and movement run through [`GameState`](crate::game_state::GameState)
//! - `properties.rs`: property tests of the invariants that must hold after
//!   any number of ticks
//! - `helpers.rs`: world setup shared by both

mod helpers;
mod properties;
