//! Error types for the entity/component runtime.

use crate::entity::Entity;

/// Errors raised by the registry, tables, manager, codec and factory.
///
/// `InvalidEntity` and `MissingComponent` are local conditions: most lookups
/// report them as `None` and only the `require*` accessors surface them as
/// errors. Nothing in this enum is fatal to a running simulation.
#[derive(Debug, thiserror::Error)]
pub enum EntityError {
    /// A stale or destroyed handle was dereferenced.
    #[error("{0} is not a live entity")]
    InvalidEntity(Entity),

    /// A record was added for an entity that already has one in this table.
    #[error("{entity} already has a {component} record")]
    DuplicateEntity {
        /// Name of the component kind.
        component: &'static str,
        /// The entity that was added twice.
        entity: Entity,
    },

    /// Component data was requested for an entity that never gained it.
    #[error("{entity} has no {component} record")]
    MissingComponent {
        /// Name of the component kind.
        component: &'static str,
        /// The entity lacking the record.
        entity: Entity,
    },

    /// A serialised record could not be decoded.
    #[error("failed to decode {component} record: {source}")]
    Decode {
        /// Name of the component kind (or `"Template"`).
        component: &'static str,
        /// Underlying MessagePack error.
        #[source]
        source: rmp_serde::decode::Error,
    },

    /// A record could not be encoded.
    #[error("failed to encode {component} record: {source}")]
    Encode {
        /// Name of the component kind (or `"Template"`).
        component: &'static str,
        /// Underlying MessagePack error.
        #[source]
        source: rmp_serde::encode::Error,
    },

    /// No prototype is stored under the requested name.
    #[error("prototype not found: {0}")]
    PrototypeNotFound(String),

    /// The prototype store failed to read an existing prototype.
    #[error("failed to read prototype {name}: {source}")]
    PrototypeIo {
        /// Prototype name.
        name: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A chain of entity references loops back on itself or is deeper than
    /// the walk allows. Carries the entity at which the walk stopped.
    #[error("reference chain through {0} is cyclic or too deep")]
    ReferenceCycle(Entity),

    /// A component kind is not registered with the manager.
    #[error("component is not registered: {0}")]
    UnknownComponent(String),

    /// A component kind was registered twice.
    #[error("component registered twice: {0}")]
    AlreadyRegistered(&'static str),

    /// Registration was attempted after components were initialised.
    #[error("cannot register {0}: components are already initialised")]
    RegistrationClosed(&'static str),

    /// A shared service expected in the context is absent.
    #[error("service not available: {0}")]
    MissingService(&'static str),
}
