//! The player: aiming, firing and spawning projectiles.
//!
//! Each frame the player's input controller is polled (unless the player is
//! disabled) and the transform is turned to face where the controller looks.
//! A fresh press of the fire button while active throws the configured
//! projectile prototype:
//!
//! ```text
//! position = world_position(player) + up * height_offset
//! velocity = speed * forward + upkick * up
//! position += normalize(velocity) * forward_offset
//! velocity += raft rail velocity
//! spin     = random in [min, max] per axis, random sign
//! ```
//!
//! `forward` is the facing direction, bent toward the last touch position
//! through the camera viewport unless the game is in cardboard mode.

use std::f32::consts::PI;
use std::fmt;
use std::rc::{Rc, Weak};

use rail_ecs::{Component, Entity, EntityError, EntityManager, WorldTime};
use rail_math::{Pose, Vec2, Vec3, random_signed_between, rotate_from_to};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::graph::{GameEvent, Graph};
use super::physics::Physics;
use super::player_projectile::PlayerProjectile;
use super::rail_denizen::{RailDenizen, RailDenizenData};
use super::transform::Transform;
use crate::config::GameConfig;
use crate::services::{ControllerHandle, GameServices};

/// What the player may do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerState {
    /// Aiming and firing.
    #[default]
    Active,
    /// Aiming only.
    NoProjectiles,
    /// Input is not polled.
    Disabled,
}

/// Per-player data. The controller is attached at runtime and never
/// serialised.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerData {
    /// The device driving this player.
    #[serde(skip)]
    pub controller: Option<ControllerHandle>,
}

impl fmt::Debug for PlayerData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlayerData")
            .field("controller", &self.controller.is_some())
            .finish()
    }
}

/// Drives players from their controllers.
pub struct Player {
    state: PlayerState,
    config: Option<Rc<GameConfig>>,
    game: Option<Weak<GameServices>>,
    rng: StdRng,
}

impl Default for Player {
    fn default() -> Self {
        Self {
            state: PlayerState::Active,
            config: None,
            game: None,
            rng: StdRng::from_entropy(),
        }
    }
}

impl fmt::Debug for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Player")
            .field("state", &self.state)
            .field("config", &self.config.is_some())
            .finish_non_exhaustive()
    }
}

impl Player {
    /// Current state.
    #[must_use]
    pub fn state(&self) -> PlayerState {
        self.state
    }

    /// Change state.
    pub fn set_state(&mut self, state: PlayerState) {
        self.state = state;
    }

    /// Attach `controller` to `player`.
    ///
    /// # Errors
    ///
    /// [`EntityError::InvalidEntity`] or [`EntityError::MissingComponent`] if
    /// `player` is not a live player.
    pub fn set_controller(
        manager: &mut EntityManager,
        player: Entity,
        controller: ControllerHandle,
    ) -> Result<(), EntityError> {
        manager.require_mut::<Self>(player)?.controller = Some(controller);
        Ok(())
    }

    fn update_entity(&mut self, manager: &mut EntityManager, entity: Entity) -> Result<(), EntityError> {
        let Some(controller) = manager.require::<Self>(entity)?.controller.clone() else {
            return Ok(());
        };
        if self.state != PlayerState::Disabled {
            controller.borrow_mut().update();
        }
        let (facing, fire) = {
            let controller = controller.borrow();
            (controller.facing(), controller.fire_button())
        };

        manager.require_mut::<Transform>(entity)?.orientation = rotate_from_to(Pose::FORWARD, facing);

        if self.state == PlayerState::Active && fire.went_down() {
            self.spawn_projectile(manager, entity)?;
            if let Some(graph) = manager.lookup_mut::<Graph>(entity) {
                graph.broadcast(GameEvent::OnFire);
            }
        }
        Ok(())
    }

    /// Throw a projectile from `source`.
    ///
    /// # Errors
    ///
    /// [`EntityError::MissingService`] before `init`, failures resolving
    /// `source`'s world transform, and spawn failures. Nothing is spawned on
    /// error.
    pub fn spawn_projectile(
        &mut self,
        manager: &mut EntityManager,
        source: Entity,
    ) -> Result<Entity, EntityError> {
        let config = self
            .config
            .clone()
            .ok_or(EntityError::MissingService("GameConfig"))?;

        let forward = self.projectile_direction(manager, source)?;
        let mut position =
            Transform::world_position(manager, source)? + Pose::UP * config.projectile_height_offset;
        let mut velocity = config.projectile_speed * forward + config.projectile_upkick * Pose::UP;
        position += velocity.normalize_or_zero() * config.projectile_forward_offset;
        velocity += self.raft_velocity(manager);

        let spin = random_signed_between(
            &mut self.rng,
            config.projectile_min_angular_velocity,
            config.projectile_max_angular_velocity,
        ) * (PI / 180.0);

        let projectile = manager.spawn_prototype(&config.projectile_prototype)?;
        manager.ensure::<Transform>(projectile)?.position = position;
        let physics = manager.ensure::<Physics>(projectile)?;
        physics.velocity = velocity;
        physics.angular_velocity = spin;
        manager.ensure::<PlayerProjectile>(projectile)?.owner = Some(source);

        debug!(%source, %projectile, %position, %velocity, "spawned projectile");
        Ok(projectile)
    }

    /// Unit launch direction for a projectile thrown by `source`.
    ///
    /// # Errors
    ///
    /// Failures resolving `source`'s world transform or player data.
    pub fn projectile_direction(&self, manager: &EntityManager, source: Entity) -> Result<Vec3, EntityError> {
        let forward = Transform::world_orientation(manager, source)? * Pose::FORWARD;

        let Some(game) = self.game.as_ref().and_then(Weak::upgrade) else {
            return Ok(forward);
        };
        let Some(controller) = manager.require::<Self>(source)?.controller.as_ref() else {
            return Ok(forward);
        };
        let touch = controller.borrow().last_position();
        if touch.x < 0.0 || game.is_in_cardboard() {
            return Ok(forward);
        }
        let (Some(camera), Some(renderer)) = (game.camera(), game.renderer()) else {
            return Ok(forward);
        };

        let screen = renderer.window_size();
        let resolution = camera.viewport_resolution();
        if screen.cmple(Vec2::ZERO).any() || resolution.y <= 0.0 {
            return Ok(forward);
        }

        // Project the touch onto a plane in front of the camera.
        let fov_y_tan = 2.0 * (camera.viewport_angle() * 0.5).tan();
        let fov_x_tan = fov_y_tan * resolution.x / resolution.y;
        let fov_tan = Vec2::new(fov_x_tan, -fov_y_tan);
        let offset = fov_tan * (touch / screen - 0.5);

        let far = camera.up() * offset.y + camera.right() * offset.x;
        Ok((forward + far).try_normalize().unwrap_or(forward))
    }

    fn raft_velocity(&self, manager: &EntityManager) -> Vec3 {
        self.game
            .as_ref()
            .and_then(Weak::upgrade)
            .and_then(|game| game.raft_entity())
            .and_then(|raft| manager.lookup::<RailDenizen>(raft))
            .map_or(Vec3::ZERO, RailDenizenData::velocity)
    }
}

impl Component for Player {
    type Data = PlayerData;

    fn type_name() -> &'static str {
        "Player"
    }

    fn init(&mut self, manager: &EntityManager) -> Result<(), EntityError> {
        let config = manager.services().require::<GameConfig>()?;
        if let Some(seed) = config.rng_seed {
            self.rng = StdRng::seed_from_u64(seed);
        }
        self.config = Some(config);
        self.game = manager.services().weak::<GameServices>();
        Ok(())
    }

    fn init_entity(manager: &mut EntityManager, entity: Entity) -> Result<(), EntityError> {
        manager.ensure::<Transform>(entity)?;
        Ok(())
    }

    fn update(&mut self, manager: &mut EntityManager, _delta_time: WorldTime) {
        manager.each::<Self>(|manager, entity| self.update_entity(manager, entity));
    }
}
