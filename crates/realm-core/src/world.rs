//! The world: entity storage, the handle index and the map.
//!
//! # Architecture
//!
//! Entities live in a `BTreeMap` keyed by a monotonically increasing
//! [`EntityId`], so iteration always visits them in spawn order and ids are
//! never reused. Players are additionally indexed by handle.
//!
//! Range queries are linear scans over the map. Worlds hold a few hundred
//! entities at most, which keeps this well inside the tick budget.
//!
//! # Example
//!
//! ```
//! use realm_core::world::World;
//! use realm_core::entity::{EntityKind, Stats};
//! use realm_geo::MapGeometry;
//! use glam::Vec2;
//!
//! let mut world = World::new(MapGeometry::default_layout());
//! let a = world.spawn(EntityKind::Npc, "baker", "town", Stats::default(), Vec2::ZERO);
//! let b = world.spawn(EntityKind::Npc, "smith", "town", Stats::default(), Vec2::new(30.0, 0.0));
//!
//! assert_eq!(world.entities_near(a, 50.0), vec![b]);
//! assert!(world.entity_ids_sorted().eq([a, b]));
//! ```

use std::collections::{BTreeMap, HashMap};

use glam::Vec2;
use rand::Rng;
use realm_geo::MapGeometry;

use crate::entity::{Entity, EntityId, EntityKind, Stats};
use crate::error::{CoreError, Result};

/// Container for every entity in a running world.
#[derive(Debug, Clone)]
pub struct World {
    next_id: u64,
    entities: BTreeMap<EntityId, Entity>,
    handles: HashMap<String, EntityId>,
    map: MapGeometry,
}

impl World {
    /// Creates an empty world on the given map. Ids start at 1.
    #[must_use]
    pub fn new(map: MapGeometry) -> Self {
        Self {
            next_id: 1,
            entities: BTreeMap::new(),
            handles: HashMap::new(),
            map,
        }
    }

    /// Map geometry.
    #[must_use]
    pub fn map(&self) -> &MapGeometry {
        &self.map
    }

    /// Adds an entity and returns its new id. Players are indexed by name;
    /// use [`World::join_player`] to reject duplicate handles.
    pub fn spawn(
        &mut self,
        kind: EntityKind,
        name: impl Into<String>,
        faction: impl Into<String>,
        stats: Stats,
        position: Vec2,
    ) -> EntityId {
        let id = EntityId::new(self.next_id);
        self.next_id += 1;
        let entity = Entity::new(id, kind, name, faction, stats, self.map.clamp(position));
        if entity.is_player() {
            self.handles.insert(entity.name().to_string(), id);
        }
        self.entities.insert(id, entity);
        id
    }

    /// Admits a player. They spawn at a walkable point of their faction's
    /// home territory, or in the safe region if the faction has none.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::DuplicateHandle`] if the handle is taken.
    pub fn join_player<R: Rng + ?Sized>(
        &mut self,
        handle: &str,
        faction: &str,
        stats: Stats,
        radius: f32,
        rng: &mut R,
    ) -> Result<EntityId> {
        if self.handles.contains_key(handle) {
            return Err(CoreError::DuplicateHandle(handle.to_string()));
        }
        let position = self
            .map
            .territories()
            .home_of(faction)
            .and_then(|home| self.map.sample_walkable(&home.area, radius, 16, rng))
            .unwrap_or_else(|| self.map.sample_safe(radius, rng));
        let id = self.spawn(EntityKind::Player, handle, faction, stats, position);
        tracing::info!(%id, handle, faction, "player joined");
        Ok(id)
    }

    /// Removes an entity, returning it if it existed.
    pub fn despawn(&mut self, id: EntityId) -> Option<Entity> {
        let entity = self.entities.remove(&id)?;
        if entity.is_player() {
            self.handles.remove(entity.name());
        }
        Some(entity)
    }

    /// Looks up an entity.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Looks up an entity mutably.
    #[must_use]
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    /// Looks up an entity, failing if it is gone.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::EntityNotFound`].
    pub fn try_get(&self, id: EntityId) -> Result<&Entity> {
        self.get(id).ok_or(CoreError::EntityNotFound(id))
    }

    /// Returns true if the entity exists.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Finds a player by handle.
    #[must_use]
    pub fn find_by_handle(&self, handle: &str) -> Option<EntityId> {
        self.handles.get(handle).copied()
    }

    /// Entity ids in ascending order.
    pub fn entity_ids_sorted(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities.keys().copied()
    }

    /// Entities in ascending id order.
    pub fn entities_sorted(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.entities.values()
    }

    /// Entities in ascending id order, mutably.
    pub fn entities_sorted_mut(&mut self) -> impl Iterator<Item = &mut Entity> + '_ {
        self.entities.values_mut()
    }

    /// Number of entities.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Returns true if the world has no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Position of an entity.
    #[must_use]
    pub fn position(&self, id: EntityId) -> Option<Vec2> {
        self.get(id).map(Entity::position)
    }

    /// Distance between two entities, if both exist.
    #[must_use]
    pub fn distance(&self, a: EntityId, b: EntityId) -> Option<f32> {
        Some(self.position(a)?.distance(self.position(b)?))
    }

    /// Ids of entities within `radius` of `point`, in id order.
    #[must_use]
    pub fn entities_within(&self, point: Vec2, radius: f32) -> Vec<EntityId> {
        let radius_sq = radius * radius;
        self.entities
            .values()
            .filter(|e| e.position().distance_squared(point) <= radius_sq)
            .map(Entity::id)
            .collect()
    }

    /// Ids of other entities within `radius` of entity `id`.
    #[must_use]
    pub fn entities_near(&self, id: EntityId, radius: f32) -> Vec<EntityId> {
        let Some(center) = self.position(id) else {
            return Vec::new();
        };
        let mut ids = self.entities_within(center, radius);
        ids.retain(|other| *other != id);
        ids
    }

    /// Nearest living entity within `radius` of `point` accepted by
    /// `filter`, with its distance. Ties go to the lower id.
    pub fn nearest_living<F>(&self, point: Vec2, radius: f32, mut filter: F) -> Option<(EntityId, f32)>
    where
        F: FnMut(&Entity) -> bool,
    {
        let mut best: Option<(EntityId, f32)> = None;
        for entity in self.entities.values() {
            if !entity.is_alive() || !filter(entity) {
                continue;
            }
            let d = entity.position().distance(point);
            if d > radius {
                continue;
            }
            if best.map_or(true, |(_, bd)| d < bd) {
                best = Some((entity.id(), d));
            }
        }
        best
    }

    /// Ids of living players, in id order.
    #[must_use]
    pub fn living_players(&self) -> Vec<EntityId> {
        self.entities
            .values()
            .filter(|e| e.is_player() && e.is_alive())
            .map(Entity::id)
            .collect()
    }

    /// Faction owning the ground under `point`.
    #[must_use]
    pub fn faction_at(&self, point: Vec2) -> Option<&str> {
        self.map.territories().faction_at(point)
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new(MapGeometry::default_layout())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::MonsterKind;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    mod spawn_tests {
        use super::*;

        #[test]
        fn ids_are_monotonic_and_never_reused() {
            let mut world = World::default();
            let a = world.spawn(EntityKind::Npc, "a", "town", Stats::default(), Vec2::ZERO);
            let b = world.spawn(EntityKind::Npc, "b", "town", Stats::default(), Vec2::ZERO);
            world.despawn(b);
            let c = world.spawn(EntityKind::Npc, "c", "town", Stats::default(), Vec2::ZERO);
            assert!(a < b && b < c);
            assert!(world.get(b).is_none());
        }

        #[test]
        fn spawn_clamps_into_bounds() {
            let mut world = World::default();
            let id = world.spawn(
                EntityKind::Npc,
                "far",
                "town",
                Stats::default(),
                Vec2::new(1.0e6, 0.0),
            );
            assert_eq!(world.position(id).unwrap().x, world.map().bounds().max.x);
        }

        #[test]
        fn despawn_unknown_is_none() {
            let mut world = World::default();
            assert!(world.despawn(EntityId::new(99)).is_none());
        }
    }

    mod handle_tests {
        use super::*;

        #[test]
        fn join_indexes_handle() {
            let mut world = World::default();
            let mut rng = ChaCha8Rng::seed_from_u64(1);
            let id = world
                .join_player("octocat", "github", Stats::default(), 16.0, &mut rng)
                .unwrap();
            assert_eq!(world.find_by_handle("octocat"), Some(id));
        }

        #[test]
        fn duplicate_handle_rejected() {
            let mut world = World::default();
            let mut rng = ChaCha8Rng::seed_from_u64(1);
            world
                .join_player("octocat", "github", Stats::default(), 16.0, &mut rng)
                .unwrap();
            let err = world
                .join_player("octocat", "gitlab", Stats::default(), 16.0, &mut rng)
                .unwrap_err();
            assert!(matches!(err, CoreError::DuplicateHandle(h) if h == "octocat"));
        }

        #[test]
        fn join_spawns_in_home_territory() {
            let mut world = World::default();
            let mut rng = ChaCha8Rng::seed_from_u64(5);
            let id = world
                .join_player("tanuki", "gitlab", Stats::default(), 16.0, &mut rng)
                .unwrap();
            let pos = world.position(id).unwrap();
            assert_eq!(world.faction_at(pos), Some("gitlab"));
            assert!(world.map().is_walkable(pos, 16.0));
        }

        #[test]
        fn despawn_frees_handle() {
            let mut world = World::default();
            let mut rng = ChaCha8Rng::seed_from_u64(1);
            let id = world
                .join_player("octocat", "github", Stats::default(), 16.0, &mut rng)
                .unwrap();
            world.despawn(id);
            assert!(world.find_by_handle("octocat").is_none());
        }
    }

    mod query_tests {
        use super::*;

        #[test]
        fn within_radius_is_inclusive_and_sorted() {
            let mut world = World::default();
            let a = world.spawn(EntityKind::Npc, "a", "t", Stats::default(), Vec2::new(10.0, 0.0));
            let b = world.spawn(EntityKind::Npc, "b", "t", Stats::default(), Vec2::ZERO);
            world.spawn(EntityKind::Npc, "c", "t", Stats::default(), Vec2::new(11.0, 0.0));
            assert_eq!(world.entities_within(Vec2::ZERO, 10.0), vec![a, b]);
        }

        #[test]
        fn nearest_living_skips_dead_and_filtered() {
            let mut world = World::default();
            let dead = world.spawn(
                EntityKind::Monster(MonsterKind::Bug),
                "bug",
                "wild",
                Stats::default(),
                Vec2::new(5.0, 0.0),
            );
            world.get_mut(dead).unwrap().combat.apply_damage(1_000);
            let npc = world.spawn(EntityKind::Npc, "n", "t", Stats::default(), Vec2::new(8.0, 0.0));
            let far = world.spawn(EntityKind::Player, "p", "t", Stats::default(), Vec2::new(50.0, 0.0));

            assert_eq!(world.nearest_living(Vec2::ZERO, 100.0, |_| true).map(|n| n.0), Some(npc));
            assert_eq!(
                world.nearest_living(Vec2::ZERO, 100.0, Entity::is_player).map(|n| n.0),
                Some(far)
            );
            assert!(world.nearest_living(Vec2::ZERO, 20.0, Entity::is_player).is_none());
        }

        #[test]
        fn distance_requires_both() {
            let mut world = World::default();
            let a = world.spawn(EntityKind::Npc, "a", "t", Stats::default(), Vec2::ZERO);
            let b = world.spawn(EntityKind::Npc, "b", "t", Stats::default(), Vec2::new(3.0, 4.0));
            assert_eq!(world.distance(a, b), Some(5.0));
            assert_eq!(world.distance(a, EntityId::new(77)), None);
        }
    }
}
