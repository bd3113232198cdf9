//! Gameplay for the rail-shooter runtime.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | JSON game configuration |
//! | [`services`] | Camera, renderer and input capability traits |
//! | [`components`] | Transform, rail movement, player, projectiles, physics |
//! | [`world`] | Registers everything and loads entity lists |

pub mod components;
pub mod config;
pub mod services;
pub mod world;

pub use config::{ConfigError, GameConfig};
pub use services::{
    ButtonState, Camera, ControllerHandle, FixedCamera, GameServices, HeadlessRenderer,
    InputController, Renderer, ScriptedController,
};
pub use world::{EntityEntry, EntityList, EntityRole, LoadError, LoadReport, World};
