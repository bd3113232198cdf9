//! The [`Component`] contract and its type-erased metadata.
//!
//! A component kind is a behaviour object (one instance per session, holding
//! whatever it resolved at [`init`](Component::init)) plus a record type
//! ([`Component::Data`]) stored per entity in a [`DataTable`](crate::DataTable)
//! owned by the [`EntityManager`].
//!
//! ## Type identity
//!
//! [`ComponentTypeId`] is the FNV-1a 64-bit hash of the component's name. The
//! name is what templates store, so the ID is stable across builds and can be
//! recomputed from template data alone.

use std::any::Any;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::codec;
use crate::entity::Entity;
use crate::error::EntityError;
use crate::manager::{EntityManager, WorldTime};
use crate::table::{DataTable, ErasedTable};

/// A unique identifier for a component kind, derived from its name with
/// FNV-1a 64-bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentTypeId(pub u64);

impl ComponentTypeId {
    /// FNV-1a 64-bit offset basis.
    const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;

    /// FNV-1a 64-bit prime.
    const FNV_PRIME: u64 = 0x0100_0000_01b3;

    /// Hash a component name.
    ///
    /// ```text
    /// hash = 0xcbf29ce484222325
    /// for each byte in name.as_bytes():
    ///     hash = (hash XOR byte) * 0x00000100000001b3
    /// ```
    #[must_use]
    pub const fn from_name(name: &str) -> Self {
        let bytes = name.as_bytes();
        let mut hash = Self::FNV_OFFSET_BASIS;
        let mut i = 0;
        while i < bytes.len() {
            hash ^= bytes[i] as u64;
            hash = hash.wrapping_mul(Self::FNV_PRIME);
            i += 1;
        }
        Self(hash)
    }

    /// The ID of component kind `C`.
    #[must_use]
    pub fn of<C: Component>() -> Self {
        Self::from_name(C::type_name())
    }
}

/// Bounds every per-entity record must satisfy.
///
/// `Default` supplies the record when a dependency is added implicitly and the
/// values of fields missing from serialised data.
pub trait ComponentData: Default + Serialize + DeserializeOwned + 'static {}

impl<T> ComponentData for T where T: Default + Serialize + DeserializeOwned + 'static {}

/// The polymorphic contract every component kind implements.
///
/// Per-entity hooks ([`init_entity`](Component::init_entity),
/// [`import`](Component::import), [`export`](Component::export)) are associated
/// functions rather than methods: they only touch tables, so the factory can
/// run them even while the component's own [`update`](Component::update) is on
/// the stack.
///
/// # Examples
///
/// ```rust
/// use rail_ecs::{Component, EntityManager, WorldTime};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Default, Serialize, Deserialize)]
/// #[serde(default)]
/// struct HealthData {
///     current: f32,
/// }
///
/// struct Health;
///
/// impl Component for Health {
///     type Data = HealthData;
///
///     fn type_name() -> &'static str {
///         "Health"
///     }
///
///     fn update(&mut self, manager: &mut EntityManager, _dt: WorldTime) {
///         manager.each::<Self>(|manager, entity| {
///             manager.require_mut::<Self>(entity)?.current += 1.0;
///             Ok(())
///         });
///     }
/// }
/// ```
pub trait Component: Sized + 'static {
    /// The per-entity record type.
    type Data: ComponentData;

    /// Human-readable, stable name of this component kind.
    fn type_name() -> &'static str;

    /// The [`ComponentTypeId`] of this component kind.
    fn component_type_id() -> ComponentTypeId {
        ComponentTypeId::from_name(Self::type_name())
    }

    /// One-time setup, run after every component has been registered.
    ///
    /// Other components exist at this point, but no per-entity data should
    /// be assumed.
    ///
    /// # Errors
    ///
    /// Implementations report missing services or config here.
    fn init(&mut self, _manager: &EntityManager) -> Result<(), EntityError> {
        Ok(())
    }

    /// Called after `entity` gains this component.
    ///
    /// This is where hard dependencies are declared, usually with
    /// [`EntityManager::ensure`].
    ///
    /// # Errors
    ///
    /// Propagates failures of dependency insertion.
    fn init_entity(_manager: &mut EntityManager, _entity: Entity) -> Result<(), EntityError> {
        Ok(())
    }

    /// One pass over this component's entities.
    fn update(&mut self, _manager: &mut EntityManager, _delta_time: WorldTime) {}

    /// Decode `raw` and install it as `entity`'s record, replacing any record
    /// already present.
    ///
    /// # Errors
    ///
    /// Returns [`EntityError::Decode`] for malformed input; the entity is left
    /// without a new record.
    fn import(manager: &mut EntityManager, entity: Entity, raw: &[u8]) -> Result<(), EntityError> {
        let data: Self::Data = codec::decode(Self::type_name(), raw)?;
        manager.set_entity_data::<Self>(entity, data)?;
        Ok(())
    }

    /// Encode `entity`'s record, or `None` if it has none.
    ///
    /// # Errors
    ///
    /// Returns [`EntityError::Encode`] if serialisation fails.
    fn export(manager: &EntityManager, entity: Entity) -> Result<Option<Vec<u8>>, EntityError> {
        manager
            .lookup::<Self>(entity)
            .map(|data| codec::encode(Self::type_name(), data))
            .transpose()
    }
}

/// Per-entity hook, type-erased.
pub type InitEntityFn = fn(&mut EntityManager, Entity) -> Result<(), EntityError>;
/// Import hook, type-erased.
pub type ImportFn = fn(&mut EntityManager, Entity, &[u8]) -> Result<(), EntityError>;
/// Export hook, type-erased.
pub type ExportFn = fn(&EntityManager, Entity) -> Result<Option<Vec<u8>>, EntityError>;

/// Metadata about a registered component kind.
#[derive(Debug, Clone, Copy)]
pub struct ComponentMeta {
    /// The unique type identifier.
    pub type_id: ComponentTypeId,
    /// The component's name (e.g. `"Transform"`).
    pub name: &'static str,
    /// Runs [`Component::init_entity`].
    pub init_entity_fn: InitEntityFn,
    /// Runs [`Component::import`].
    pub import_fn: ImportFn,
    /// Runs [`Component::export`].
    pub export_fn: ExportFn,
}

impl ComponentMeta {
    /// Metadata for component kind `C`.
    #[must_use]
    pub fn of<C: Component>() -> Self {
        Self {
            type_id: C::component_type_id(),
            name: C::type_name(),
            init_entity_fn: C::init_entity,
            import_fn: C::import,
            export_fn: C::export,
        }
    }

    pub(crate) fn new_table<C: Component>() -> Box<dyn ErasedTable> {
        Box::new(DataTable::<C::Data>::new(C::type_name()))
    }
}

/// Behaviour half of a component, type-erased so the manager can hold every
/// kind in one ordered list.
pub(crate) trait ErasedComponent: Any {
    fn init(&mut self, manager: &EntityManager) -> Result<(), EntityError>;
    fn update(&mut self, manager: &mut EntityManager, delta_time: WorldTime);
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<C: Component> ErasedComponent for C {
    fn init(&mut self, manager: &EntityManager) -> Result<(), EntityError> {
        Component::init(self, manager)
    }

    fn update(&mut self, manager: &mut EntityManager, delta_time: WorldTime) {
        Component::update(self, manager, delta_time);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
