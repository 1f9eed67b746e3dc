//! Complete map geometry: bounds, collision zones, territories and the safe
//! spawn region.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::territory::{Territory, TerritoryMap};
use crate::zone::{CollisionZone, ZoneSet};
use crate::{Bounds, GeoError};

/// Static geometry of the world map.
///
/// # Example
///
/// ```
/// use realm_geo::{Bounds, MapGeometry};
/// use glam::Vec2;
///
/// let map = MapGeometry::default_layout();
/// assert!(map.validate().is_ok());
/// assert_eq!(map.clamp(Vec2::new(1.0e6, 0.0)).x, map.bounds().max.x);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapGeometry {
    bounds: Bounds,
    #[serde(default)]
    zones: ZoneSet,
    #[serde(default)]
    territories: TerritoryMap,
    safe_spawn: Bounds,
}

impl MapGeometry {
    /// Create an empty map. The safe spawn region defaults to a 200x200
    /// square at the map centre.
    #[must_use]
    pub fn new(bounds: Bounds) -> Self {
        Self {
            bounds,
            zones: ZoneSet::new(),
            territories: TerritoryMap::new(),
            safe_spawn: Bounds::around(bounds.center(), 100.0),
        }
    }

    /// The stock world: three faction territories around a central plaza
    /// with a handful of buildings.
    #[must_use]
    pub fn default_layout() -> Self {
        let mut map = Self::new(Bounds::new(4000.0, 4000.0));
        map.add_territory(Territory::new(
            "octoland",
            "github",
            Bounds::from_min_max(Vec2::new(-2000.0, -2000.0), Vec2::new(-400.0, 2000.0)),
        ));
        map.add_territory(Territory::new(
            "tanuki-hills",
            "gitlab",
            Bounds::from_min_max(Vec2::new(400.0, -2000.0), Vec2::new(2000.0, 0.0)),
        ));
        map.add_territory(Territory::new(
            "hugging-coast",
            "huggingface",
            Bounds::from_min_max(Vec2::new(400.0, 0.0), Vec2::new(2000.0, 2000.0)),
        ));
        map.add_zone(CollisionZone::new(
            "server-farm",
            Bounds::from_min_max(Vec2::new(-1200.0, -300.0), Vec2::new(-900.0, 300.0)),
        ));
        map.add_zone(CollisionZone::new(
            "ci-tower",
            Bounds::from_min_max(Vec2::new(900.0, -900.0), Vec2::new(1100.0, -600.0)),
        ));
        map.add_zone(CollisionZone::new(
            "model-vault",
            Bounds::from_min_max(Vec2::new(900.0, 600.0), Vec2::new(1200.0, 800.0)),
        ));
        map.add_zone(CollisionZone::new(
            "north-wall",
            Bounds::from_min_max(Vec2::new(-300.0, 1200.0), Vec2::new(300.0, 1260.0)),
        ));
        map
    }

    /// Replace the safe spawn region.
    #[must_use]
    pub fn with_safe_spawn(mut self, region: Bounds) -> Self {
        self.safe_spawn = region;
        self
    }

    /// Add a collision zone.
    pub fn add_zone(&mut self, zone: CollisionZone) {
        self.zones.push(zone);
    }

    /// Add a territory.
    pub fn add_territory(&mut self, territory: Territory) {
        self.territories.push(territory);
    }

    /// Map bounds.
    #[must_use]
    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    /// Collision zones.
    #[must_use]
    pub fn zones(&self) -> &ZoneSet {
        &self.zones
    }

    /// Territories.
    #[must_use]
    pub fn territories(&self) -> &TerritoryMap {
        &self.territories
    }

    /// Region known to be free of collision zones.
    #[must_use]
    pub fn safe_spawn(&self) -> &Bounds {
        &self.safe_spawn
    }

    /// Clamp a point to the map bounds.
    #[must_use]
    pub fn clamp(&self, point: Vec2) -> Vec2 {
        self.bounds.clamp(point)
    }

    /// Returns true if a body of `radius` can stand at `point`.
    #[must_use]
    pub fn is_walkable(&self, point: Vec2, radius: f32) -> bool {
        self.bounds.contains(point) && !self.zones.is_blocked(point, radius)
    }

    /// Sample a walkable point inside `region`, trying at most `attempts`
    /// times.
    pub fn sample_walkable<R: Rng + ?Sized>(
        &self,
        region: &Bounds,
        radius: f32,
        attempts: usize,
        rng: &mut R,
    ) -> Option<Vec2> {
        (0..attempts)
            .map(|_| self.clamp(region.sample(rng)))
            .find(|p| self.is_walkable(*p, radius))
    }

    /// A point in the safe spawn region. Falls back to the region centre,
    /// which validation guarantees is unblocked.
    pub fn sample_safe<R: Rng + ?Sized>(&self, radius: f32, rng: &mut R) -> Vec2 {
        self.sample_walkable(&self.safe_spawn, radius, 8, rng)
            .unwrap_or_else(|| self.safe_spawn.center())
    }

    /// Check that every shape is well formed and inside the map, and that the
    /// safe spawn region centre is not covered by a zone.
    ///
    /// # Errors
    ///
    /// Returns the first [`GeoError`] found.
    pub fn validate(&self) -> Result<(), GeoError> {
        self.bounds.check("map bounds")?;
        self.safe_spawn.check("safe spawn region")?;
        if !self.bounds.contains_bounds(&self.safe_spawn) {
            return Err(GeoError::OutOfBounds {
                name: "safe spawn region".to_string(),
            });
        }
        for zone in self.zones.iter() {
            zone.area.check(&zone.name)?;
            if !self.bounds.contains_bounds(&zone.area) {
                return Err(GeoError::OutOfBounds {
                    name: zone.name.clone(),
                });
            }
        }
        for territory in self.territories.iter() {
            territory.area.check(&territory.name)?;
        }
        if let Some(zone) = self.zones.zone_at(self.safe_spawn.center()) {
            return Err(GeoError::SafeRegionBlocked {
                zone: zone.name.clone(),
            });
        }
        Ok(())
    }
}

impl Default for MapGeometry {
    fn default() -> Self {
        Self::default_layout()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn default_layout_is_valid() {
        assert_eq!(MapGeometry::default_layout().validate(), Ok(()));
    }

    #[test]
    fn zone_outside_bounds_rejected() {
        let mut map = MapGeometry::new(Bounds::new(100.0, 100.0));
        map.add_zone(CollisionZone::new(
            "far",
            Bounds::from_min_max(Vec2::new(40.0, 40.0), Vec2::new(80.0, 80.0)),
        ));
        assert_eq!(
            map.validate(),
            Err(GeoError::OutOfBounds {
                name: "far".to_string()
            })
        );
    }

    #[test]
    fn blocked_safe_region_rejected() {
        let mut map = MapGeometry::new(Bounds::new(1000.0, 1000.0));
        map.add_zone(CollisionZone::new("plaza-statue", Bounds::around(Vec2::ZERO, 10.0)));
        assert!(matches!(
            map.validate(),
            Err(GeoError::SafeRegionBlocked { .. })
        ));
    }

    #[test]
    fn walkable_respects_bounds_and_zones() {
        let map = MapGeometry::default_layout();
        assert!(map.is_walkable(Vec2::ZERO, 16.0));
        assert!(!map.is_walkable(Vec2::new(-1000.0, 0.0), 16.0));
        assert!(!map.is_walkable(Vec2::new(5000.0, 0.0), 16.0));
    }

    #[test]
    fn sample_safe_is_walkable() {
        let map = MapGeometry::default_layout();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..50 {
            let p = map.sample_safe(16.0, &mut rng);
            assert!(map.is_walkable(p, 16.0));
        }
    }

    #[test]
    fn map_round_trips_through_json() {
        let map = MapGeometry::default_layout();
        let json = serde_json::to_string(&map).unwrap();
        let back: MapGeometry = serde_json::from_str(&json).unwrap();
        assert_eq!(map, back);
    }
}
