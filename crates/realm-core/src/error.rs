//! Error types for the simulation core.
//!
//! Gameplay never fails: invalid commands are ignored and dangling references
//! decay into neutral state transitions. The errors below cover the edges of
//! the core instead: loading configuration, admitting players, and ticks that
//! panicked and were contained by the scheduler.

use realm_geo::GeoError;
use thiserror::Error;

use crate::entity::EntityId;

/// Errors raised by world administration (joins, spawns, lookups).
#[derive(Debug, Error)]
pub enum CoreError {
    /// A player with this handle is already in the world.
    #[error("player handle {0:?} is already in the world")]
    DuplicateHandle(String),

    /// The entity does not exist (never spawned, or already despawned).
    #[error("entity {0} not found")]
    EntityNotFound(EntityId),

    /// Invalid game configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors raised while loading or validating [`GameConfig`](crate::config::GameConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// Path that was read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML for this schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is outside its allowed range.
    #[error("invalid value for {field}: {reason}")]
    Invalid {
        /// Dotted path of the offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// The map geometry is malformed.
    #[error("invalid map: {0}")]
    Map(#[from] GeoError),
}

/// A tick that did not complete.
///
/// The tick counter still advances and the world keeps whatever partial state
/// the failed pass left behind.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TickError {
    /// A system panicked during the pass.
    #[error("tick {tick} panicked: {message}")]
    Panicked {
        /// Tick number that failed.
        tick: u64,
        /// Panic payload, if it was a string.
        message: String,
    },
}

/// Convenience alias for results carrying a [`CoreError`].
pub type Result<T> = std::result::Result<T, CoreError>;
