//! Projectiles thrown by a player.

use rail_ecs::{Component, Entity, EntityError, EntityManager};
use serde::{Deserialize, Serialize};

/// Who threw the projectile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerProjectileData {
    /// The throwing player. May outlive that entity.
    pub owner: Option<Entity>,
}

/// Marks projectiles and remembers their owner.
#[derive(Debug, Default)]
pub struct PlayerProjectile;

impl PlayerProjectile {
    /// The live owner of `projectile`, or `None` if it has none.
    ///
    /// # Errors
    ///
    /// [`EntityError::InvalidEntity`] if `projectile` is stale or its owner
    /// has been destroyed, [`EntityError::MissingComponent`] if it is not a
    /// projectile.
    pub fn owner_of(manager: &EntityManager, projectile: Entity) -> Result<Option<Entity>, EntityError> {
        let Some(owner) = manager.require::<Self>(projectile)?.owner else {
            return Ok(None);
        };
        if !manager.is_valid(owner) {
            return Err(EntityError::InvalidEntity(owner));
        }
        Ok(Some(owner))
    }
}

impl Component for PlayerProjectile {
    type Data = PlayerProjectileData;

    fn type_name() -> &'static str {
        "PlayerProjectile"
    }
}
