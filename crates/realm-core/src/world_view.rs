//! `WorldView` provides read-only access to the world for behavior
//! controllers.
//!
//! Controllers decide intent; they never mutate the world. The game loop
//! builds a view for each decision and applies the returned
//! [`Action`](crate::behavior::Action) itself.
//!
//! # Example
//!
//! ```
//! use glam::Vec2;
//! use realm_core::entity::{EntityKind, Stats};
//! use realm_core::world::World;
//! use realm_core::world_view::WorldView;
//!
//! let mut world = World::default();
//! let id = world.spawn(EntityKind::Npc, "guard", "town", Stats::default(), Vec2::new(10.0, 0.0));
//!
//! let view = WorldView::new(&world, 7);
//! assert_eq!(view.tick(), 7);
//! assert_eq!(view.query_in_radius(Vec2::ZERO, 20.0), vec![id]);
//! ```

use glam::Vec2;
use realm_geo::MapGeometry;

use crate::entity::{Entity, EntityId};
use crate::world::World;

// =============================================================================
// WorldView
// =============================================================================

/// Read-only view of the world at a given tick.
#[derive(Debug, Clone, Copy)]
pub struct WorldView<'a> {
    world: &'a World,
    tick: u64,
}

impl<'a> WorldView<'a> {
    /// Creates a view of `world` at `tick`.
    #[must_use]
    pub fn new(world: &'a World, tick: u64) -> Self {
        Self { world, tick }
    }

    /// Tick the view was taken at.
    #[must_use]
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Looks up an entity.
    #[must_use]
    pub fn get_entity(&self, id: EntityId) -> Option<&'a Entity> {
        self.world.get(id)
    }

    /// Position of an entity.
    #[must_use]
    pub fn position(&self, id: EntityId) -> Option<Vec2> {
        self.world.position(id)
    }

    /// All entities in id order.
    pub fn entities(&self) -> impl Iterator<Item = &'a Entity> + 'a {
        self.world.entities_sorted()
    }

    /// Ids of entities within `radius` of `center`, in id order.
    #[must_use]
    pub fn query_in_radius(&self, center: Vec2, radius: f32) -> Vec<EntityId> {
        self.world.entities_within(center, radius)
    }

    /// Nearest living entity within `radius` of `center` accepted by
    /// `filter`, with its distance.
    pub fn nearest_living<F>(&self, center: Vec2, radius: f32, filter: F) -> Option<(EntityId, f32)>
    where
        F: FnMut(&Entity) -> bool,
    {
        self.world.nearest_living(center, radius, filter)
    }

    /// Map geometry.
    #[must_use]
    pub fn map(&self) -> &'a MapGeometry {
        self.world.map()
    }

    /// Clamp a point to the map bounds.
    #[must_use]
    pub fn clamp(&self, point: Vec2) -> Vec2 {
        self.world.map().clamp(point)
    }

    /// Returns true if `point` lies in territory held by `faction`.
    #[must_use]
    pub fn in_territory_of(&self, point: Vec2, faction: &str) -> bool {
        self.world.map().territories().is_in_faction_territory(point, faction)
    }
}
