//! Entity handles.
//!
//! An [`Entity`] is a slot index paired with a generation counter. The slot is
//! recycled once the entity is destroyed, but its generation is bumped first,
//! so a handle kept from before the destruction no longer matches and is
//! reported as invalid instead of resolving to the new occupant.

use serde::{Deserialize, Serialize};

/// A generation-checked entity identifier.
///
/// Entities carry no data of their own. Component tables map them to records,
/// and the [`EntityRegistry`](crate::registry::EntityRegistry) decides whether a
/// handle is still live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Entity {
    index: u32,
    generation: u32,
}

impl Entity {
    /// Build a handle from its raw parts.
    ///
    /// Mostly useful for diagnostics and tests; live handles come from the
    /// registry.
    #[must_use]
    pub const fn from_raw_parts(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Returns the slot index.
    #[must_use]
    pub const fn index(self) -> u32 {
        self.index
    }

    /// Returns the generation of the slot when this handle was issued.
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Entity({}v{})", self.index, self.generation)
    }
}
