//! Shared services context.
//!
//! Replaces global service singletons. The host inserts each service once as
//! an `Rc`; components resolve them in `init` and keep a [`Weak`] handle that
//! they upgrade every frame, so a service torn down by the host is observed as
//! absent instead of dangling.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::error::EntityError;

/// A type-keyed map of shared services.
#[derive(Default)]
pub struct Services {
    entries: HashMap<TypeId, Rc<dyn Any>>,
}

impl Services {
    /// Create an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a service, returning the one it replaces.
    pub fn insert<T: 'static>(&mut self, service: Rc<T>) -> Option<Rc<T>> {
        self.entries
            .insert(TypeId::of::<T>(), service)
            .and_then(|old| old.downcast::<T>().ok())
    }

    /// Remove a service.
    pub fn remove<T: 'static>(&mut self) -> Option<Rc<T>> {
        self.entries
            .remove(&TypeId::of::<T>())
            .and_then(|old| old.downcast::<T>().ok())
    }

    /// A strong handle to the service of type `T`.
    #[must_use]
    pub fn get<T: 'static>(&self) -> Option<Rc<T>> {
        self.entries
            .get(&TypeId::of::<T>())
            .and_then(|entry| Rc::clone(entry).downcast::<T>().ok())
    }

    /// A weak handle to the service of type `T`, for components to keep
    /// across frames.
    #[must_use]
    pub fn weak<T: 'static>(&self) -> Option<Weak<T>> {
        self.get::<T>().map(|service| Rc::downgrade(&service))
    }

    /// Like [`get`](Self::get), but as a `Result`.
    ///
    /// # Errors
    ///
    /// Returns [`EntityError::MissingService`] if no `T` was inserted.
    pub fn require<T: 'static>(&self) -> Result<Rc<T>, EntityError> {
        self.get::<T>()
            .ok_or(EntityError::MissingService(std::any::type_name::<T>()))
    }

    /// Returns `true` if a `T` is present.
    #[must_use]
    pub fn contains<T: 'static>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<T>())
    }

    /// Number of services.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no service is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Services {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Services")
            .field("len", &self.entries.len())
            .finish()
    }
}
