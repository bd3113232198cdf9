//! # rail_ecs
//!
//! The entity/component runtime underneath the rail-shooter game loop.
//!
//! Entities are generation-checked handles. All state lives in per-kind
//! [`DataTable`]s owned by the [`EntityManager`], and each registered
//! [`Component`] kind runs one update pass per frame, in registration order.
//! Entities are built from named [`Template`]s by the [`EntityFactory`], which
//! imports each component's MessagePack record through the same path used for
//! level loading and for spawning mid-frame.
//!
//! ## Crate layout
//!
//! | Module | Purpose |
//! |---|---|
//! | [`entity`] | The [`Entity`] handle |
//! | [`registry`] | Allocation, recycling and membership tracking |
//! | [`table`] | Insertion-ordered per-kind storage |
//! | [`component`] | The [`Component`] contract and its metadata |
//! | [`manager`] | Registration, frame dispatch and typed access |
//! | [`factory`] | Building entities from templates |
//! | [`prototype`] | [`Template`] and [`PrototypeStore`]s |
//! | [`codec`] | Record encoding |
//! | [`services`] | Shared services context |
//! | [`error`] | [`EntityError`] |

pub mod codec;
pub mod component;
pub mod entity;
pub mod error;
pub mod factory;
pub mod manager;
pub mod prototype;
pub mod registry;
pub mod services;
pub mod table;

pub use component::{Component, ComponentData, ComponentMeta, ComponentTypeId};
pub use entity::Entity;
pub use error::EntityError;
pub use factory::{Construction, EntityFactory};
pub use manager::{EntityManager, WorldTime};
pub use prototype::{DirectoryPrototypes, MemoryPrototypes, PrototypeStore, Template, TemplateComponent};
pub use registry::EntityRegistry;
pub use services::Services;
pub use table::DataTable;
