//! # rail_math
//!
//! Math types for the rail-shooter runtime. Re-exports [`glam`] for linear
//! algebra and defines the [`Pose`] used by the transform component plus the
//! small helpers gameplay components need.

pub mod pose;
pub mod random;

// Re-export glam types for convenience.
pub use glam::{EulerRot, Mat3, Mat4, Quat, Vec2, Vec3, Vec4};

pub use pose::{Pose, rotate_from_to};
pub use random::{random_between, random_sign, random_signed_between};
