//! Gameplay components.
//!
//! Registration order matters: updates and imports run in the order the
//! world registers these, which is
//! Transform, RailDenizen, Player, PlayerProjectile, Physics, TimeLimit, Graph.

pub mod graph;
pub mod physics;
pub mod player;
pub mod player_projectile;
pub mod rail_denizen;
pub mod time_limit;
pub mod transform;

pub use graph::{GameEvent, Graph, GraphData};
pub use physics::{Physics, PhysicsData};
pub use player::{Player, PlayerData, PlayerState};
pub use player_projectile::{PlayerProjectile, PlayerProjectileData};
pub use rail_denizen::{RailDenizen, RailDenizenData};
pub use time_limit::{TimeLimit, TimeLimitData};
pub use transform::{Transform, TransformData};
