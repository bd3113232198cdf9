//! Spatial pose.
//!
//! [`Pose`] is position, orientation and scale in 3D. The game treats +Z as
//! up and +Y as forward.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// A position, rotation and per-axis scale.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Pose {
    /// Position, relative to the parent if there is one.
    pub position: Vec3,
    /// Rotation as a unit quaternion.
    pub orientation: Quat,
    /// Per-axis scale.
    pub scale: Vec3,
}

impl Pose {
    /// The identity pose: origin, no rotation, unit scale.
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        orientation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    /// World up.
    pub const UP: Vec3 = Vec3::Z;

    /// Forward for an unrotated pose.
    pub const FORWARD: Vec3 = Vec3::Y;

    /// A pose at `position` with default rotation and scale.
    #[must_use]
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    /// The 4×4 model matrix.
    #[must_use]
    pub fn to_matrix(&self) -> glam::Mat4 {
        glam::Mat4::from_scale_rotation_translation(self.scale, self.orientation, self.position)
    }

    /// Map a point from this pose's local space into its parent's space.
    #[must_use]
    pub fn transform_point(&self, local: Vec3) -> Vec3 {
        self.position + self.orientation * (self.scale * local)
    }

    /// Express `child`, given relative to `self`, in `self`'s parent space.
    #[must_use]
    pub fn compose(&self, child: &Pose) -> Pose {
        Pose {
            position: self.transform_point(child.position),
            orientation: (self.orientation * child.orientation).normalize(),
            scale: self.scale * child.scale,
        }
    }

    /// Translate the pose.
    #[must_use]
    pub fn translated(mut self, offset: Vec3) -> Self {
        self.position += offset;
        self
    }

    /// Rotate the pose.
    #[must_use]
    pub fn rotated(mut self, rotation: Quat) -> Self {
        self.orientation = rotation * self.orientation;
        self
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// The shortest rotation taking direction `from` onto direction `to`.
///
/// Inputs need not be normalised. A zero-length input yields the identity.
#[must_use]
pub fn rotate_from_to(from: Vec3, to: Vec3) -> Quat {
    match (from.try_normalize(), to.try_normalize()) {
        (Some(from), Some(to)) => Quat::from_rotation_arc(from, to),
        _ => Quat::IDENTITY,
    }
}
