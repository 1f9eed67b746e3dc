//! Static collision zones.
//!
//! Collision zones are axis-aligned rectangles nothing may enter. Bodies are
//! modelled as circles, so every test takes the body radius and works against
//! the zone grown by that radius (a Minkowski sum, good enough for circles
//! against rectangles away from the rounded corners).

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::Bounds;

/// A named, impassable rectangle on the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollisionZone {
    /// Human readable name, used in logs and validation errors.
    pub name: String,
    /// Area covered by the zone.
    pub area: Bounds,
}

impl CollisionZone {
    /// Create a new collision zone.
    #[must_use]
    pub fn new(name: impl Into<String>, area: Bounds) -> Self {
        Self {
            name: name.into(),
            area,
        }
    }
}

/// The full set of collision zones on a map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneSet {
    zones: Vec<CollisionZone>,
}

impl ZoneSet {
    /// Create an empty zone set.
    #[must_use]
    pub fn new() -> Self {
        Self { zones: Vec::new() }
    }

    /// Add a zone.
    pub fn push(&mut self, zone: CollisionZone) {
        self.zones.push(zone);
    }

    /// Iterate over all zones.
    pub fn iter(&self) -> impl Iterator<Item = &CollisionZone> + '_ {
        self.zones.iter()
    }

    /// Number of zones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.zones.len()
    }

    /// Returns true if there are no zones.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// The zone whose area contains `point`, if any.
    #[must_use]
    pub fn zone_at(&self, point: Vec2) -> Option<&CollisionZone> {
        self.zones.iter().find(|z| z.area.contains(point))
    }

    /// Returns true if a body of `radius` centred on `point` overlaps a zone.
    #[must_use]
    pub fn is_blocked(&self, point: Vec2, radius: f32) -> bool {
        self.zones
            .iter()
            .any(|z| z.area.expand(radius).contains(point))
    }

    /// Returns true if a body of `radius` sweeping from `from` to `to` would
    /// clip any zone.
    #[must_use]
    pub fn is_segment_blocked(&self, from: Vec2, to: Vec2, radius: f32) -> bool {
        self.blocking(from, to, radius).next().is_some()
    }

    /// Zones that block the straight sweep `from -> to`.
    pub fn blocking(
        &self,
        from: Vec2,
        to: Vec2,
        radius: f32,
    ) -> impl Iterator<Item = &CollisionZone> + '_ {
        self.zones
            .iter()
            .filter(move |z| z.area.expand(radius).intersects_segment(from, to))
    }

    /// Candidate corners for walking around the zones blocking `from -> to`.
    ///
    /// Each blocking zone contributes its four corners grown by
    /// `radius + margin`, so a body standing on a corner clears the zone by
    /// `margin`. When nothing blocks the segment every zone contributes,
    /// which lets callers recover from a start point wedged against a wall.
    #[must_use]
    pub fn detour_corners(&self, from: Vec2, to: Vec2, radius: f32, margin: f32) -> Vec<Vec2> {
        let grow = radius + margin;
        let mut corners: Vec<Vec2> = self
            .blocking(from, to, radius)
            .flat_map(|z| z.area.expand(grow).corners())
            .collect();
        if corners.is_empty() {
            corners = self
                .zones
                .iter()
                .flat_map(|z| z.area.expand(grow).corners())
                .collect();
        }
        corners
    }
}

impl FromIterator<CollisionZone> for ZoneSet {
    fn from_iter<I: IntoIterator<Item = CollisionZone>>(iter: I) -> Self {
        Self {
            zones: iter.into_iter().collect(),
        }
    }
}
