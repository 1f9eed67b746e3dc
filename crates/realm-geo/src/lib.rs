//! # Realm Geo
//!
//! Flat 2D map geometry for the gitrealm simulation core.
//!
//! The world is a rectangular map containing static, axis-aligned collision
//! zones (buildings, walls, water) and named territories owned by factions.
//! This crate owns the geometric questions the simulation asks every tick:
//!
//! - **Bounds**: clamp a point into the map, test containment
//! - **Collision zones**: is a point (with a body radius) blocked, does a
//!   straight segment cross an obstacle, which corners can be used to walk
//!   around it
//! - **Territories**: which faction owns the ground under a point
//! - **Spawn sampling**: pick a random point inside a region
//!
//! ## Quick Start
//!
//! ```
//! use realm_geo::{Bounds, CollisionZone, MapGeometry};
//! use glam::Vec2;
//!
//! let mut map = MapGeometry::new(Bounds::new(2000.0, 2000.0));
//! map.add_zone(CollisionZone::new("hq", Bounds::from_min_max(
//!     Vec2::new(-100.0, -100.0),
//!     Vec2::new(100.0, 100.0),
//! )));
//!
//! assert!(map.zones().is_blocked(Vec2::ZERO, 0.0));
//! assert!(!map.zones().is_blocked(Vec2::new(300.0, 0.0), 16.0));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod map;
pub mod territory;
pub mod zone;

pub use map::MapGeometry;
pub use territory::{Territory, TerritoryMap};
pub use zone::{CollisionZone, ZoneSet};

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while building or validating map geometry.
#[derive(Debug, Error, PartialEq)]
pub enum GeoError {
    /// A rectangle whose min corner is not strictly below its max corner.
    #[error("degenerate rectangle {name}: min {min:?} is not below max {max:?}")]
    Degenerate {
        /// Name of the offending shape.
        name: String,
        /// Minimum corner as given.
        min: Vec2,
        /// Maximum corner as given.
        max: Vec2,
    },
    /// A shape that lies (partly) outside the map bounds.
    #[error("{name} is not inside the map bounds")]
    OutOfBounds {
        /// Name of the offending shape.
        name: String,
    },
    /// The safe spawn region is entirely covered by collision zones.
    #[error("safe spawn region is blocked by collision zone {zone}")]
    SafeRegionBlocked {
        /// Zone covering the safe region.
        zone: String,
    },
}

/// Axis-aligned rectangle.
///
/// Used for the map bounds, collision zones, territories and spawn regions.
/// All containment tests are inclusive of the edges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Minimum corner
    pub min: Vec2,
    /// Maximum corner
    pub max: Vec2,
}

impl Bounds {
    /// Create bounds from dimensions (centered at origin).
    #[must_use]
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            min: Vec2::new(-width / 2.0, -height / 2.0),
            max: Vec2::new(width / 2.0, height / 2.0),
        }
    }

    /// Create bounds from min/max corners.
    #[must_use]
    pub fn from_min_max(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Create a square region of half-extent `half` around `center`.
    #[must_use]
    pub fn around(center: Vec2, half: f32) -> Self {
        Self {
            min: center - Vec2::splat(half),
            max: center + Vec2::splat(half),
        }
    }

    /// Get the center of the bounds.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    /// Get the size of the bounds.
    #[must_use]
    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    /// Returns `true` when min is strictly below max on both axes.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.min.x < self.max.x && self.min.y < self.max.y
    }

    /// Check if a point is inside the bounds.
    #[must_use]
    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
    }

    /// Check if another rectangle lies entirely inside these bounds.
    #[must_use]
    pub fn contains_bounds(&self, other: &Bounds) -> bool {
        self.contains(other.min) && self.contains(other.max)
    }

    /// Clamp a point into the bounds.
    #[must_use]
    pub fn clamp(&self, point: Vec2) -> Vec2 {
        point.clamp(self.min, self.max)
    }

    /// Grow (or shrink, for negative `by`) the rectangle on every side.
    #[must_use]
    pub fn expand(&self, by: f32) -> Self {
        Self {
            min: self.min - Vec2::splat(by),
            max: self.max + Vec2::splat(by),
        }
    }

    /// The four corners, counter-clockwise from `min`.
    #[must_use]
    pub fn corners(&self) -> [Vec2; 4] {
        [
            self.min,
            Vec2::new(self.max.x, self.min.y),
            self.max,
            Vec2::new(self.min.x, self.max.y),
        ]
    }

    /// Check if this bounds intersects a circle.
    #[must_use]
    pub fn intersects_circle(&self, center: Vec2, radius: f32) -> bool {
        let closest = center.clamp(self.min, self.max);
        center.distance_squared(closest) <= radius * radius
    }

    /// Check if the segment `a -> b` touches the rectangle.
    ///
    /// Liang-Barsky clipping: the segment is parameterised as `a + t * (b - a)`
    /// and clipped against each slab; it intersects when a non-empty `t`
    /// interval inside `[0, 1]` survives.
    #[must_use]
    pub fn intersects_segment(&self, a: Vec2, b: Vec2) -> bool {
        let d = b - a;
        let mut t_enter = 0.0_f32;
        let mut t_exit = 1.0_f32;

        let slabs = [
            (-d.x, a.x - self.min.x),
            (d.x, self.max.x - a.x),
            (-d.y, a.y - self.min.y),
            (d.y, self.max.y - a.y),
        ];

        for (p, q) in slabs {
            if p.abs() < f32::EPSILON {
                // Parallel to this slab: outside means no hit at all.
                if q < 0.0 {
                    return false;
                }
                continue;
            }
            let r = q / p;
            if p < 0.0 {
                if r > t_exit {
                    return false;
                }
                t_enter = t_enter.max(r);
            } else {
                if r < t_enter {
                    return false;
                }
                t_exit = t_exit.min(r);
            }
        }
        t_enter <= t_exit
    }

    /// Sample a uniformly distributed point inside the bounds.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec2 {
        Vec2::new(
            rng.gen_range(self.min.x..=self.max.x),
            rng.gen_range(self.min.y..=self.max.y),
        )
    }

    pub(crate) fn check(&self, name: &str) -> Result<(), GeoError> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(GeoError::Degenerate {
                name: name.to_string(),
                min: self.min,
                max: self.max,
            })
        }
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::new(4000.0, 4000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_bounds_contains() {
        let bounds = Bounds::new(10.0, 10.0);
        assert!(bounds.contains(Vec2::ZERO));
        assert!(bounds.contains(Vec2::new(5.0, 5.0)));
        assert!(!bounds.contains(Vec2::new(10.0, 0.0)));
    }

    #[test]
    fn test_clamp() {
        let bounds = Bounds::new(100.0, 100.0);
        assert_eq!(bounds.clamp(Vec2::new(80.0, -80.0)), Vec2::new(50.0, -50.0));
        assert_eq!(bounds.clamp(Vec2::new(10.0, 20.0)), Vec2::new(10.0, 20.0));
    }

    #[test]
    fn test_expand_and_corners() {
        let bounds = Bounds::from_min_max(Vec2::ZERO, Vec2::new(10.0, 10.0)).expand(2.0);
        assert_eq!(bounds.min, Vec2::new(-2.0, -2.0));
        assert_eq!(bounds.corners()[2], Vec2::new(12.0, 12.0));
    }

    #[test]
    fn test_segment_crossing_rect() {
        let rect = Bounds::from_min_max(Vec2::new(-10.0, -10.0), Vec2::new(10.0, 10.0));
        assert!(rect.intersects_segment(Vec2::new(-50.0, 0.0), Vec2::new(50.0, 0.0)));
        assert!(!rect.intersects_segment(Vec2::new(-50.0, 20.0), Vec2::new(50.0, 20.0)));
        // Ends short of the rectangle.
        assert!(!rect.intersects_segment(Vec2::new(-50.0, 0.0), Vec2::new(-20.0, 0.0)));
        // Starts inside.
        assert!(rect.intersects_segment(Vec2::ZERO, Vec2::new(100.0, 100.0)));
    }

    #[test]
    fn test_vertical_segment_parallel_slab() {
        let rect = Bounds::from_min_max(Vec2::new(-10.0, -10.0), Vec2::new(10.0, 10.0));
        assert!(rect.intersects_segment(Vec2::new(0.0, -50.0), Vec2::new(0.0, 50.0)));
        assert!(!rect.intersects_segment(Vec2::new(30.0, -50.0), Vec2::new(30.0, 50.0)));
    }

    #[test]
    fn test_intersects_circle() {
        let rect = Bounds::from_min_max(Vec2::ZERO, Vec2::new(10.0, 10.0));
        assert!(rect.intersects_circle(Vec2::new(15.0, 5.0), 5.0));
        assert!(!rect.intersects_circle(Vec2::new(16.0, 5.0), 5.0));
    }

    #[test]
    fn test_sample_stays_inside() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let rect = Bounds::around(Vec2::new(100.0, -50.0), 25.0);
        for _ in 0..100 {
            assert!(rect.contains(rect.sample(&mut rng)));
        }
    }

    #[test]
    fn test_degenerate_rejected() {
        let rect = Bounds::from_min_max(Vec2::new(5.0, 0.0), Vec2::new(5.0, 10.0));
        assert!(matches!(rect.check("wall"), Err(GeoError::Degenerate { .. })));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn coord() -> impl Strategy<Value = f32> {
            -5_000.0f32..5_000.0
        }

        proptest! {
            #[test]
            fn clamp_lands_on_the_map(x in coord(), y in coord()) {
                let bounds = Bounds::new(4000.0, 4000.0);
                let p = bounds.clamp(Vec2::new(x, y));
                prop_assert!(p.cmpge(bounds.min).all() && p.cmple(bounds.max).all());
            }

            #[test]
            fn segment_from_inside_always_hits(ox in -9.0f32..9.0, oy in -9.0f32..9.0, x in coord(), y in coord()) {
                let rect = Bounds::from_min_max(Vec2::new(-10.0, -10.0), Vec2::new(10.0, 10.0));
                prop_assert!(rect.intersects_segment(Vec2::new(ox, oy), Vec2::new(x, y)));
            }

            #[test]
            fn expanded_corners_lie_outside(half in 1.0f32..500.0, margin in 0.5f32..50.0) {
                let rect = Bounds::around(Vec2::ZERO, half);
                for corner in rect.expand(margin).corners() {
                    prop_assert!(!rect.contains(corner));
                }
            }
        }
    }
}
