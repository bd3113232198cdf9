//! Movement along a rail.
//!
//! A rail is a polyline of nodes. Denizens advance along it at a playback
//! speed and write their position into their transform each frame.

use rail_ecs::{Component, Entity, EntityError, EntityManager, WorldTime};
use rail_math::Vec3;
use serde::{Deserialize, Serialize};

use super::transform::Transform;

/// Rail geometry and progress along it.
///
/// `velocity` is derived each update and is neither serialised nor part of
/// equality: two records are equal when they describe the same rail and
/// progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RailDenizenData {
    /// Rail nodes, in travel order.
    pub nodes: Vec<Vec3>,
    /// Travel speed in units per second.
    pub speed: f32,
    /// Distance travelled from the first node.
    pub distance: f32,
    /// Wrap back to the first node at the end of the rail.
    pub looping: bool,
    /// Whether the denizen advances.
    pub enabled: bool,
    /// World-space velocity as of the last update. Not persisted.
    #[serde(skip)]
    pub velocity: Vec3,
}

impl Default for RailDenizenData {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            speed: 1.0,
            distance: 0.0,
            looping: false,
            enabled: true,
            velocity: Vec3::ZERO,
        }
    }
}

impl PartialEq for RailDenizenData {
    fn eq(&self, other: &Self) -> bool {
        self.nodes == other.nodes
            && self.speed == other.speed
            && self.distance == other.distance
            && self.looping == other.looping
            && self.enabled == other.enabled
    }
}

impl RailDenizenData {
    /// Total length of the rail. For looping rails this includes the closing
    /// segment back to the first node.
    #[must_use]
    pub fn rail_length(&self) -> f32 {
        self.segments().map(|(a, b)| a.distance(b)).sum()
    }

    /// Position and unit direction at `distance` along the rail.
    ///
    /// `None` for an empty rail. Past the end of a non-looping rail the last
    /// node is returned with a zero direction.
    #[must_use]
    pub fn sample(&self, distance: f32) -> Option<(Vec3, Vec3)> {
        let first = *self.nodes.first()?;
        let mut remaining = distance.max(0.0);
        let mut end = first;
        for (a, b) in self.segments() {
            let length = a.distance(b);
            if remaining <= length && length > 0.0 {
                let direction = (b - a) / length;
                return Some((a + direction * remaining, direction));
            }
            remaining -= length;
            end = b;
        }
        Some((end, Vec3::ZERO))
    }

    /// The current world-space velocity.
    #[must_use]
    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    fn segments(&self) -> impl Iterator<Item = (Vec3, Vec3)> + '_ {
        let closing = match (self.looping, self.nodes.first(), self.nodes.last()) {
            (true, Some(&first), Some(&last)) if self.nodes.len() > 1 => Some((last, first)),
            _ => None,
        };
        self.nodes
            .windows(2)
            .map(|w| (w[0], w[1]))
            .chain(closing)
    }

    /// Advance by `dt` seconds, returning the new position.
    fn advance(&mut self, dt: f32) -> Option<Vec3> {
        if self.enabled {
            self.distance += self.speed * dt;
        }
        let length = self.rail_length();
        if self.looping && length > 0.0 {
            self.distance = self.distance.rem_euclid(length);
        } else {
            self.distance = self.distance.clamp(0.0, length);
        }

        let (position, direction) = self.sample(self.distance)?;
        let at_end = !self.looping && self.distance >= length;
        self.velocity = if self.enabled && !at_end {
            direction * self.speed
        } else {
            Vec3::ZERO
        };
        Some(position)
    }
}

/// Moves entities along their rails.
#[derive(Debug, Default)]
pub struct RailDenizen;

impl RailDenizen {
    fn step(manager: &mut EntityManager, entity: Entity, dt: f32) -> Result<(), EntityError> {
        let Some(position) = manager.require_mut::<Self>(entity)?.advance(dt) else {
            return Ok(());
        };
        manager.require_mut::<Transform>(entity)?.position = position;
        Ok(())
    }
}

impl Component for RailDenizen {
    type Data = RailDenizenData;

    fn type_name() -> &'static str {
        "RailDenizen"
    }

    fn init_entity(manager: &mut EntityManager, entity: Entity) -> Result<(), EntityError> {
        manager.ensure::<Transform>(entity)?;
        Ok(())
    }

    fn update(&mut self, manager: &mut EntityManager, delta_time: WorldTime) {
        let dt = delta_time as f32;
        manager.each::<Self>(|manager, entity| Self::step(manager, entity, dt));
    }
}
