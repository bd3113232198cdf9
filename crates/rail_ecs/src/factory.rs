//! Building live entities from templates.
//!
//! The factory resolves a prototype name through its [`PrototypeStore`],
//! decodes the template once and caches it, then allocates an entity and
//! imports each component's record. Imports always run in the manager's
//! registration order, whatever order the template lists them in, so a
//! component's `import` can read the records of every component registered
//! before it.
//!
//! Level loading uses the same path through
//! [`create_from_template`](EntityFactory::create_from_template).

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::component::ComponentMeta;
use crate::entity::Entity;
use crate::error::EntityError;
use crate::manager::EntityManager;
use crate::prototype::{PrototypeStore, Template};

/// Outcome of building one entity.
///
/// The entity is alive even when some imports failed; such an entity is
/// degraded and callers should not retry the failed imports automatically.
#[derive(Debug)]
pub struct Construction {
    /// The new entity.
    pub entity: Entity,
    /// Component name and error for every import that failed.
    pub failures: Vec<(String, EntityError)>,
}

impl Construction {
    /// Returns `true` if any import failed.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Builds entities from named prototypes.
pub struct EntityFactory {
    store: Box<dyn PrototypeStore>,
    cache: RefCell<HashMap<String, Rc<Template>>>,
}

impl EntityFactory {
    /// A factory reading from `store`.
    pub fn new(store: impl PrototypeStore + 'static) -> Self {
        Self {
            store: Box::new(store),
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// The decoded template for `name`, loading it on first use.
    ///
    /// # Errors
    ///
    /// [`EntityError::PrototypeNotFound`], store read errors and
    /// [`EntityError::Decode`] for a corrupt blob.
    pub fn template(&self, name: &str) -> Result<Rc<Template>, EntityError> {
        if let Some(template) = self.cache.borrow().get(name) {
            return Ok(Rc::clone(template));
        }

        let blob = self.store.load(name)?;
        let template = Rc::new(Template::decode(&blob)?);
        self.cache
            .borrow_mut()
            .insert(name.to_string(), Rc::clone(&template));
        debug!(prototype = name, components = template.components.len(), "loaded prototype");
        Ok(template)
    }

    /// Drop every cached template.
    pub fn clear_cache(&self) {
        self.cache.borrow_mut().clear();
    }

    /// Build an entity from the prototype `name`.
    ///
    /// Import failures are logged and leave the entity degraded; use
    /// [`instantiate`](Self::instantiate) to inspect them.
    ///
    /// # Errors
    ///
    /// Fails only if the template cannot be obtained, in which case no entity
    /// is allocated.
    pub fn create_from_prototype(
        &self,
        name: &str,
        manager: &mut EntityManager,
    ) -> Result<Entity, EntityError> {
        Ok(self.instantiate(name, manager)?.entity)
    }

    /// Build an entity from the prototype `name`, reporting import failures.
    ///
    /// # Errors
    ///
    /// See [`create_from_prototype`](Self::create_from_prototype).
    pub fn instantiate(
        &self,
        name: &str,
        manager: &mut EntityManager,
    ) -> Result<Construction, EntityError> {
        let template = self.template(name)?;
        Ok(self.create_from_template(&template, manager))
    }

    /// Build an entity from an already decoded template.
    pub fn create_from_template(
        &self,
        template: &Template,
        manager: &mut EntityManager,
    ) -> Construction {
        let entity = manager.create_entity();
        let failures = Self::apply_template(template, entity, manager);
        debug!(
            prototype = %template.name,
            %entity,
            failures = failures.len(),
            "constructed entity"
        );
        Construction { entity, failures }
    }

    /// Import every record in `template` onto an existing `entity`, in
    /// registration order. Records the entity already holds are replaced.
    ///
    /// Returns the component name and error of every import that failed,
    /// including template entries naming unregistered components.
    pub fn apply_template(
        template: &Template,
        entity: Entity,
        manager: &mut EntityManager,
    ) -> Vec<(String, EntityError)> {
        let mut failures = Vec::new();

        let metas: Vec<ComponentMeta> = manager.component_metas().copied().collect();
        for meta in &metas {
            let Some(raw) = template.data_for(meta.name) else {
                continue;
            };
            if let Err(err) = manager.import_raw(meta.type_id, entity, raw) {
                warn!(
                    prototype = %template.name,
                    component = meta.name,
                    %entity,
                    error = %err,
                    "component import failed"
                );
                failures.push((meta.name.to_string(), err));
            }
        }

        for entry in &template.components {
            if manager.component_meta_by_name(&entry.component).is_none() {
                warn!(
                    prototype = %template.name,
                    component = %entry.component,
                    %entity,
                    "template names an unregistered component"
                );
                failures.push((
                    entry.component.clone(),
                    EntityError::UnknownComponent(entry.component.clone()),
                ));
            }
        }
        failures
    }
}

impl fmt::Debug for EntityFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityFactory")
            .field("cached", &self.cache.borrow().len())
            .finish_non_exhaustive()
    }
}
