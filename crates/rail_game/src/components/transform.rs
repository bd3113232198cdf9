//! Spatial transform with optional parenting.

use rail_ecs::{Component, Entity, EntityError, EntityManager};
use rail_math::{Pose, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Deepest parent chain walked before giving up; guards against cycles.
const MAX_PARENT_DEPTH: usize = 64;

/// Position, orientation and scale, relative to `parent` when set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformData {
    /// Local position.
    pub position: Vec3,
    /// Local orientation.
    pub orientation: Quat,
    /// Local per-axis scale.
    pub scale: Vec3,
    /// Entity this transform is relative to.
    pub parent: Option<Entity>,
}

impl TransformData {
    /// An unparented transform at `position`.
    #[must_use]
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// The local pose.
    #[must_use]
    pub fn pose(&self) -> Pose {
        Pose {
            position: self.position,
            orientation: self.orientation,
            scale: self.scale,
        }
    }
}

impl Default for TransformData {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            scale: Vec3::ONE,
            parent: None,
        }
    }
}

/// Places entities in the world.
///
/// World-space queries are associated functions so other components can call
/// them at any point of the frame.
#[derive(Debug, Default)]
pub struct Transform;

impl Transform {
    /// `entity`'s pose in world space, composed up its parent chain.
    ///
    /// # Errors
    ///
    /// [`EntityError::InvalidEntity`] if `entity` or any parent is stale,
    /// [`EntityError::MissingComponent`] if one of them has no transform and
    /// [`EntityError::ReferenceCycle`] if the chain loops or is deeper than
    /// the walk allows.
    pub fn world_pose(manager: &EntityManager, entity: Entity) -> Result<Pose, EntityError> {
        let data = manager.require::<Self>(entity)?;
        let mut pose = data.pose();
        let mut parent = data.parent;
        let mut depth = 0;

        while let Some(p) = parent {
            depth += 1;
            if depth > MAX_PARENT_DEPTH {
                return Err(EntityError::ReferenceCycle(p));
            }
            let parent_data = manager.require::<Self>(p)?;
            pose = parent_data.pose().compose(&pose);
            parent = parent_data.parent;
        }
        Ok(pose)
    }

    /// `entity`'s position in world space.
    ///
    /// # Errors
    ///
    /// See [`world_pose`](Self::world_pose).
    pub fn world_position(manager: &EntityManager, entity: Entity) -> Result<Vec3, EntityError> {
        Ok(Self::world_pose(manager, entity)?.position)
    }

    /// `entity`'s orientation in world space.
    ///
    /// # Errors
    ///
    /// See [`world_pose`](Self::world_pose).
    pub fn world_orientation(manager: &EntityManager, entity: Entity) -> Result<Quat, EntityError> {
        Ok(Self::world_pose(manager, entity)?.orientation)
    }

    /// Attach `child` to `parent`, or detach it with `None`.
    ///
    /// # Errors
    ///
    /// [`EntityError::InvalidEntity`] if either handle is stale,
    /// [`EntityError::ReferenceCycle`] if the link would make `child` its own
    /// ancestor or `parent`'s chain already loops,
    /// [`EntityError::MissingComponent`] if either lacks a transform.
    pub fn set_parent(
        manager: &mut EntityManager,
        child: Entity,
        parent: Option<Entity>,
    ) -> Result<(), EntityError> {
        if let Some(p) = parent {
            let mut cursor = Some(p);
            let mut depth = 0;
            while let Some(ancestor) = cursor {
                depth += 1;
                if ancestor == child || depth > MAX_PARENT_DEPTH {
                    return Err(EntityError::ReferenceCycle(ancestor));
                }
                cursor = manager.require::<Self>(ancestor)?.parent;
            }
        }
        manager.require_mut::<Self>(child)?.parent = parent;
        Ok(())
    }
}

impl Component for Transform {
    type Data = TransformData;

    fn type_name() -> &'static str {
        "Transform"
    }
}
