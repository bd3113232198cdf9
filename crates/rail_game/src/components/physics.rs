//! Kinematic integration of transforms.
//!
//! No collision. Each frame the transform moves by `velocity * dt` and spins
//! by `angular_velocity * dt`; `gravity_scale` pulls along -Z.

use rail_ecs::{Component, Entity, EntityError, EntityManager, WorldTime};
use rail_math::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::transform::Transform;

/// Linear and angular velocity of one entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsData {
    /// Units per second, world space.
    pub velocity: Vec3,
    /// Radians per second about each world axis.
    pub angular_velocity: Vec3,
    /// Multiplier on [`Physics::GRAVITY`].
    pub gravity_scale: f32,
}

impl PhysicsData {
    /// Moving at `velocity`, no spin, no gravity.
    #[must_use]
    pub fn moving(velocity: Vec3) -> Self {
        Self {
            velocity,
            ..Self::default()
        }
    }
}

/// Integrates [`PhysicsData`] into [`Transform`](super::transform::Transform).
#[derive(Debug, Default)]
pub struct Physics;

impl Physics {
    /// Gravitational acceleration.
    pub const GRAVITY: Vec3 = Vec3::new(0.0, 0.0, -9.8);

    fn step(manager: &mut EntityManager, entity: Entity, dt: f32) -> Result<(), EntityError> {
        let physics = manager.require_mut::<Self>(entity)?;
        physics.velocity += Self::GRAVITY * physics.gravity_scale * dt;
        let PhysicsData {
            velocity,
            angular_velocity,
            ..
        } = *physics;

        let transform = manager.require_mut::<Transform>(entity)?;
        transform.position += velocity * dt;
        let spin = Quat::from_scaled_axis(angular_velocity * dt);
        transform.orientation = (spin * transform.orientation).normalize();
        Ok(())
    }
}

impl Component for Physics {
    type Data = PhysicsData;

    fn type_name() -> &'static str {
        "Physics"
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
