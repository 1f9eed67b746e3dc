//! Territories: regions of the map owned by a faction.
//!
//! Players belong to a faction (their code host, e.g. `github`), and each
//! faction owns one or more rectangular territories used as home spawns.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::Bounds;

/// A named region owned by a faction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Territory {
    /// Territory name.
    pub name: String,
    /// Owning faction tag.
    pub faction: String,
    /// Covered area.
    pub area: Bounds,
}

impl Territory {
    /// Create a territory.
    #[must_use]
    pub fn new(name: impl Into<String>, faction: impl Into<String>, area: Bounds) -> Self {
        Self {
            name: name.into(),
            faction: faction.into(),
            area,
        }
    }
}

/// Territory lookup table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TerritoryMap {
    territories: Vec<Territory>,
}

impl TerritoryMap {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a territory. Earlier territories win where areas overlap.
    pub fn push(&mut self, territory: Territory) {
        self.territories.push(territory);
    }

    /// Iterate over all territories.
    pub fn iter(&self) -> impl Iterator<Item = &Territory> + '_ {
        self.territories.iter()
    }

    /// The territory under `point`, if any.
    #[must_use]
    pub fn territory_at(&self, point: Vec2) -> Option<&Territory> {
        self.territories.iter().find(|t| t.area.contains(point))
    }

    /// Faction owning the ground under `point`, if any.
    #[must_use]
    pub fn faction_at(&self, point: Vec2) -> Option<&str> {
        self.territory_at(point).map(|t| t.faction.as_str())
    }

    /// Returns true if `point` lies in a territory owned by `faction`.
    #[must_use]
    pub fn is_in_faction_territory(&self, point: Vec2, faction: &str) -> bool {
        self.territories
            .iter()
            .any(|t| t.faction == faction && t.area.contains(point))
    }

    /// First territory owned by `faction`.
    #[must_use]
    pub fn home_of(&self, faction: &str) -> Option<&Territory> {
        self.territories.iter().find(|t| t.faction == faction)
    }
}
