//! Movement system: steering towards move targets around static obstacles.
//!
//! Each call moves one entity at most one step, where the step length is
//! `(base_speed + move_speed / 5) * tick_seconds`. In order:
//!
//! 1. **Separation**: living neighbours inside `separation_radius` push the
//!    entity away, weighted by overlap. A push that would land inside a zone
//!    is discarded.
//! 2. **Arrival**: within one step of the goal the entity snaps onto it. When
//!    another body already occupies the target point, the entity stops at
//!    `0.9 * attack_range` from it instead. That is inside attack range, not
//!    just outside it: a chaser must end up able to swing, since combat keeps
//!    re-issuing the move while its target is out of reach.
//! 3. **Stepping**: a straight step that stays walkable is taken as is.
//! 4. **Detouring**: otherwise the best corner of the blocking zones becomes
//!    a waypoint, and the entity starts towards it in the same tick. A
//!    corner qualifies when it is walkable and reachable in a straight line;
//!    the cheapest by `|from - c| + |c - target| + penalty * heading
//!    deviation` wins. After `max_detours`, or with no usable corner, the
//!    move is abandoned. A waypoint is kept while it stays in straight reach
//!    and the target stays hidden, including when a chased target drifts
//!    (see [`Transform::move_to`]).
//!
//! Arriving at (or abandoning) the final target clears it and, unless the
//! entity is fighting, returns it to idle.
//!
//! [`Transform::move_to`]: crate::entity::Transform::move_to

use glam::Vec2;

use crate::config::MovementConfig;
use crate::entity::{EntityId, LifeState};
use crate::world::World;

const EPSILON: f32 = 1e-4;

/// Fraction of attack range at which a mover stops short of an occupied
/// target point.
const STOP_SHORT_FRACTION: f32 = 0.9;

/// Moves entities towards their move targets.
#[derive(Debug, Clone)]
pub struct MovementSystem {
    config: MovementConfig,
    tick_seconds: f32,
    attack_range: f32,
}

impl MovementSystem {
    /// Creates the system.
    #[must_use]
    pub fn new(config: MovementConfig, tick_seconds: f32, attack_range: f32) -> Self {
        Self {
            config,
            tick_seconds,
            attack_range,
        }
    }

    /// Distance covered in one tick at `move_speed`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn step_length(&self, move_speed: u32) -> f32 {
        (self.config.base_speed + move_speed as f32 / 5.0) * self.tick_seconds
    }

    /// Advance entity `id` by one tick.
    pub fn update(&self, world: &mut World, id: EntityId) {
        let Some(entity) = world.get(id) else { return };
        if !entity.is_alive() {
            return;
        }
        let radius = self.config.entity_radius;
        let step = self.step_length(entity.stats.move_speed);
        let mut pos = entity.transform.position;
        let move_target = entity.transform.move_target;
        let waypoint = entity.transform.waypoint;
        let detours = entity.transform.detours;

        let push = self.separation(world, id, pos);
        if push.length_squared() > EPSILON {
            let candidate = world.map().clamp(pos + push);
            if world.map().is_walkable(candidate, radius) {
                pos = candidate;
            }
        }

        let Some(target) = move_target else {
            Self::commit(world, id, pos);
            return;
        };

        // A detour is dropped once its corner is out of straight reach or the
        // target has come into plain sight.
        let kept = waypoint.filter(|w| {
            let zones = world.map().zones();
            !zones.is_segment_blocked(pos, *w, radius) && zones.is_segment_blocked(pos, target, radius)
        });
        if kept.is_none() && waypoint.is_some() {
            if let Some(e) = world.get_mut(id) {
                e.transform.waypoint = None;
            }
        }

        let occupied = self.is_occupied(world, id, target);
        let (goal, on_waypoint) = match kept {
            Some(w) => (w, true),
            None => (target, false),
        };
        let dist = pos.distance(goal);
        let arrive_radius = if !on_waypoint && occupied {
            (self.attack_range * STOP_SHORT_FRACTION).max(step)
        } else {
            step
        };

        if dist <= arrive_radius {
            let map = world.map();
            let snap = !(occupied && !on_waypoint)
                && map.is_walkable(goal, radius)
                && !map.zones().is_segment_blocked(pos, goal, radius);
            if snap {
                pos = goal;
            }
            if on_waypoint {
                Self::commit(world, id, pos);
                if let Some(e) = world.get_mut(id) {
                    e.transform.waypoint = None;
                    e.combat.set_moving();
                }
            } else {
                Self::arrive(world, id, pos);
            }
            return;
        }

        if self.try_step(world, id, pos, goal, step) {
            return;
        }

        if detours >= self.config.max_detours {
            tracing::warn!(%id, detours, "move abandoned after too many detours");
            Self::abandon(world, id, pos);
            return;
        }
        match self.find_detour(world, pos, target) {
            Some(corner) => {
                tracing::trace!(%id, ?corner, "detouring around obstacle");
                Self::commit(world, id, pos);
                if let Some(e) = world.get_mut(id) {
                    e.transform.waypoint = Some(corner);
                    e.transform.detours += 1;
                    e.combat.set_moving();
                }
                // Corners are in straight reach, so start walking now.
                let leg = step.min(pos.distance(corner));
                self.try_step(world, id, pos, corner, leg);
            }
            None => {
                tracing::warn!(%id, ?target, "no detour around obstacle, move abandoned");
                Self::abandon(world, id, pos);
            }
        }
    }

    /// Take a straight step of `step` from `pos` towards `goal` if it stays
    /// walkable. Returns false, leaving the entity where it was, otherwise.
    fn try_step(&self, world: &mut World, id: EntityId, pos: Vec2, goal: Vec2, step: f32) -> bool {
        let next = pos + (goal - pos).normalize_or_zero() * step;
        let radius = self.config.entity_radius;
        let map = world.map();
        if !map.is_walkable(next, radius) || map.zones().is_segment_blocked(pos, next, radius) {
            return false;
        }
        Self::commit(world, id, next);
        if let Some(e) = world.get_mut(id) {
            e.combat.set_moving();
        }
        true
    }

    /// Combined push from neighbours inside the separation radius.
    fn separation(&self, world: &World, id: EntityId, pos: Vec2) -> Vec2 {
        let r = self.config.separation_radius;
        if r <= 0.0 {
            return Vec2::ZERO;
        }
        let mut push = Vec2::ZERO;
        for other_id in world.entities_near(id, r) {
            let Some(other) = world.get(other_id) else { continue };
            if !other.is_alive() {
                continue;
            }
            let offset = pos - other.position();
            let d = offset.length();
            let dir = if d < EPSILON {
                // Stacked exactly: split deterministically by id.
                if id < other_id {
                    Vec2::X
                } else {
                    Vec2::NEG_X
                }
            } else {
                offset / d
            };
            push += dir * ((r - d) / r);
        }
        push * self.config.separation_push
    }

    /// Returns true if another living body stands on `point`.
    fn is_occupied(&self, world: &World, id: EntityId, point: Vec2) -> bool {
        let body = self.config.entity_radius * 2.0;
        world
            .entities_within(point, body)
            .into_iter()
            .filter(|other| *other != id)
            .any(|other| world.get(other).is_some_and(|e| e.is_alive()))
    }

    /// Cheapest usable corner for walking from `from` around the obstacles
    /// towards `target`.
    fn find_detour(&self, world: &World, from: Vec2, target: Vec2) -> Option<Vec2> {
        let map = world.map();
        let radius = self.config.entity_radius;
        let heading = (target - from).normalize_or_zero();
        map.zones()
            .detour_corners(from, target, radius, self.config.detour_margin)
            .into_iter()
            .filter(|c| c.distance_squared(from) > EPSILON)
            .filter(|c| map.is_walkable(*c, radius))
            .filter(|c| !map.zones().is_segment_blocked(from, *c, radius))
            .map(|c| {
                let turn = heading
                    .dot((c - from).normalize_or_zero())
                    .clamp(-1.0, 1.0)
                    .acos();
                let cost = from.distance(c) + c.distance(target) + self.config.angle_penalty * turn;
                (c, cost)
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(c, _)| c)
    }

    fn commit(world: &mut World, id: EntityId, pos: Vec2) {
        if let Some(e) = world.get_mut(id) {
            e.transform.position = pos;
        }
    }

    fn arrive(world: &mut World, id: EntityId, pos: Vec2) {
        if let Some(e) = world.get_mut(id) {
            e.transform.position = pos;
            e.transform.stop();
            e.combat.set_idle();
        }
    }

    fn abandon(world: &mut World, id: EntityId, pos: Vec2) {
        Self::arrive(world, id, pos);
    }
}

/// Returns true if the entity is standing still.
#[must_use]
pub fn is_settled(world: &World, id: EntityId) -> bool {
    world
        .get(id)
        .is_some_and(|e| e.transform.move_target.is_none() && e.combat.state() != LifeState::Moving)
}
