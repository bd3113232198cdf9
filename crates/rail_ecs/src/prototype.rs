//! Templates and the stores they are loaded from.
//!
//! A [`Template`] is a named bundle of encoded component records, keyed by
//! component name. On the wire it is itself a MessagePack map:
//!
//! ```text
//! { "name": "Projectile",
//!   "components": [ { "component": "Transform", "data": <bytes> },
//!                   { "component": "Physics",   "data": <bytes> } ] }
//! ```

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::codec;
use crate::component::Component;
use crate::error::EntityError;

/// Label used for template codec errors.
const TEMPLATE: &str = "Template";

/// One component's encoded record inside a [`Template`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateComponent {
    /// Component name, as returned by [`Component::type_name`].
    pub component: String,
    /// The record, encoded with [`codec::encode`].
    pub data: Vec<u8>,
}

/// A named, serialised bundle of per-component records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Template {
    /// Prototype name.
    pub name: String,
    /// Encoded records. Order is irrelevant; the factory imports in
    /// registration order.
    pub components: Vec<TemplateComponent>,
}

impl Template {
    /// An empty template.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            components: Vec::new(),
        }
    }

    /// Add `C`'s record, encoded.
    ///
    /// # Errors
    ///
    /// Returns [`EntityError::Encode`] if the record cannot be encoded.
    pub fn with<C: Component>(mut self, data: &C::Data) -> Result<Self, EntityError> {
        let bytes = codec::encode(C::type_name(), data)?;
        self.push_raw(C::type_name(), bytes);
        Ok(self)
    }

    /// Add an already encoded record.
    pub fn push_raw(&mut self, component: impl Into<String>, data: Vec<u8>) {
        self.components.push(TemplateComponent {
            component: component.into(),
            data,
        });
    }

    /// The encoded record for `component`, if present.
    #[must_use]
    pub fn data_for(&self, component: &str) -> Option<&[u8]> {
        self.components
            .iter()
            .find(|entry| entry.component == component)
            .map(|entry| entry.data.as_slice())
    }

    /// Serialise the whole template.
    ///
    /// # Errors
    ///
    /// Returns [`EntityError::Encode`] on failure.
    pub fn encode(&self) -> Result<Vec<u8>, EntityError> {
        codec::encode(TEMPLATE, self)
    }

    /// Deserialise a template blob.
    ///
    /// # Errors
    ///
    /// Returns [`EntityError::Decode`] on malformed input.
    pub fn decode(bytes: &[u8]) -> Result<Self, EntityError> {
        codec::decode(TEMPLATE, bytes)
    }
}

/// Source of serialised templates, keyed by prototype name.
pub trait PrototypeStore {
    /// Read the template blob stored under `name`.
    ///
    /// # Errors
    ///
    /// [`EntityError::PrototypeNotFound`] if nothing is stored under `name`,
    /// or a store-specific error if reading fails.
    fn load(&self, name: &str) -> Result<Vec<u8>, EntityError>;
}

/// Templates held in memory. Used by tests and by hosts that build
/// prototypes in code.
#[derive(Debug, Clone, Default)]
pub struct MemoryPrototypes {
    entries: HashMap<String, Vec<u8>>,
}

impl MemoryPrototypes {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a raw blob.
    pub fn insert(&mut self, name: impl Into<String>, blob: Vec<u8>) {
        self.entries.insert(name.into(), blob);
    }

    /// Encode and store a template under its own name.
    ///
    /// # Errors
    ///
    /// Returns [`EntityError::Encode`] if the template cannot be encoded.
    pub fn insert_template(&mut self, template: &Template) -> Result<(), EntityError> {
        let blob = template.encode()?;
        self.insert(template.name.clone(), blob);
        Ok(())
    }

    /// Number of stored prototypes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PrototypeStore for MemoryPrototypes {
    fn load(&self, name: &str) -> Result<Vec<u8>, EntityError> {
        self.entries
            .get(name)
            .cloned()
            .ok_or_else(|| EntityError::PrototypeNotFound(name.to_string()))
    }
}

/// Templates stored as `<root>/<name>.proto` files.
#[derive(Debug, Clone)]
pub struct DirectoryPrototypes {
    root: PathBuf,
}

impl DirectoryPrototypes {
    /// File extension of prototype files.
    pub const EXTENSION: &'static str = "proto";

    /// A store rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The directory prototypes are read from.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file holding `name`. The extension is appended, so dots in
    /// `name` are kept.
    #[must_use]
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.{}", Self::EXTENSION))
    }

    /// Encode `template` and write it to its file.
    ///
    /// # Errors
    ///
    /// [`EntityError::Encode`] or [`EntityError::PrototypeIo`].
    pub fn save(&self, template: &Template) -> Result<(), EntityError> {
        let blob = template.encode()?;
        std::fs::write(self.path_for(&template.name), blob).map_err(|source| {
            EntityError::PrototypeIo {
                name: template.name.clone(),
                source,
            }
        })
    }
}

impl PrototypeStore for DirectoryPrototypes {
    fn load(&self, name: &str) -> Result<Vec<u8>, EntityError> {
        std::fs::read(self.path_for(name)).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => EntityError::PrototypeNotFound(name.to_string()),
            _ => EntityError::PrototypeIo {
                name: name.to_string(),
                source,
            },
        })
    }
}
