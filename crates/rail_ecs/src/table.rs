//! Per-component data tables.
//!
//! A [`DataTable`] maps entities to records in insertion order. Rows are stored
//! densely; removing a row leaves a tombstone so positions stay stable while a
//! pass is walking the table. Tombstones are dropped by [`DataTable::compact`],
//! which the manager only calls once no pass is in flight.
//!
//! ```text
//! rows:  [A, B, -, D, E]      '-' = tombstone left by remove(C)
//! index: {A:0, B:1, D:3, E:4}
//! ```
//!
//! A pass snapshots [`extent`](DataTable::extent) before it starts. Rows
//! appended while it runs land at or beyond that bound and are not visited.

use std::any::Any;
use std::collections::HashMap;

use crate::entity::Entity;
use crate::error::EntityError;

#[derive(Debug, Clone)]
struct Row<T> {
    entity: Entity,
    data: T,
}

/// Insertion-ordered storage of one component kind's records.
#[derive(Debug, Clone)]
pub struct DataTable<T> {
    component: &'static str,
    rows: Vec<Option<Row<T>>>,
    index: HashMap<Entity, usize>,
}

impl<T> DataTable<T> {
    /// Create an empty table for the named component kind.
    #[must_use]
    pub fn new(component: &'static str) -> Self {
        Self {
            component,
            rows: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Name of the component kind this table stores.
    #[must_use]
    pub fn component(&self) -> &'static str {
        self.component
    }

    /// Append a record for `entity`.
    ///
    /// # Errors
    ///
    /// Returns [`EntityError::DuplicateEntity`] if the entity already has a row.
    pub fn add(&mut self, entity: Entity, data: T) -> Result<&mut T, EntityError> {
        if self.index.contains_key(&entity) {
            return Err(EntityError::DuplicateEntity {
                component: self.component,
                entity,
            });
        }
        let pos = self.rows.len();
        self.rows.push(Some(Row { entity, data }));
        self.index.insert(entity, pos);
        match &mut self.rows[pos] {
            Some(row) => Ok(&mut row.data),
            None => unreachable!("row was just pushed"),
        }
    }

    /// Remove the record for `entity`, if any.
    pub fn remove(&mut self, entity: Entity) -> Option<T> {
        let pos = self.index.remove(&entity)?;
        self.rows[pos].take().map(|row| row.data)
    }

    /// Returns the record for `entity`.
    #[must_use]
    pub fn get(&self, entity: Entity) -> Option<&T> {
        let pos = *self.index.get(&entity)?;
        self.rows[pos].as_ref().map(|row| &row.data)
    }

    /// Returns the record for `entity`, mutably.
    #[must_use]
    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        let pos = *self.index.get(&entity)?;
        self.rows[pos].as_mut().map(|row| &mut row.data)
    }

    /// Returns `true` if `entity` has a record.
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.index.contains_key(&entity)
    }

    /// Number of live records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns `true` if the table holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Number of row positions, tombstones included.
    ///
    /// This is the traversal bound a pass snapshots before it starts.
    #[must_use]
    pub fn extent(&self) -> usize {
        self.rows.len()
    }

    /// Entity stored at row position `pos`; `None` for tombstones and
    /// out-of-range positions.
    #[must_use]
    pub fn entity_at(&self, pos: usize) -> Option<Entity> {
        self.rows.get(pos)?.as_ref().map(|row| row.entity)
    }

    /// Iterate over `(entity, record)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (Entity, &T)> {
        self.rows
            .iter()
            .filter_map(|row| row.as_ref().map(|r| (r.entity, &r.data)))
    }

    /// Iterate mutably over `(entity, record)` pairs in insertion order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Entity, &mut T)> {
        self.rows
            .iter_mut()
            .filter_map(|row| row.as_mut().map(|r| (r.entity, &mut r.data)))
    }

    /// Entities with a record, in insertion order.
    #[must_use]
    pub fn entities(&self) -> Vec<Entity> {
        self.iter().map(|(e, _)| e).collect()
    }

    /// Drop tombstones, keeping the remaining rows in insertion order.
    pub fn compact(&mut self) {
        if self.rows.len() == self.index.len() {
            return;
        }
        self.rows.retain(Option::is_some);
        for (pos, row) in self.rows.iter().enumerate() {
            if let Some(row) = row {
                self.index.insert(row.entity, pos);
            }
        }
    }

    /// Remove every record.
    pub fn clear(&mut self) {
        self.rows.clear();
        self.index.clear();
    }
}

/// Type-erased view of a [`DataTable`], used by the manager to purge and
/// traverse tables without knowing their record type.
pub(crate) trait ErasedTable: Any {
    fn remove_entity(&mut self, entity: Entity) -> bool;
    fn extent(&self) -> usize;
    fn entity_at(&self, pos: usize) -> Option<Entity>;
    fn compact(&mut self);
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: 'static> ErasedTable for DataTable<T> {
    fn remove_entity(&mut self, entity: Entity) -> bool {
        self.remove(entity).is_some()
    }

    fn extent(&self) -> usize {
        DataTable::extent(self)
    }

    fn entity_at(&self, pos: usize) -> Option<Entity> {
        DataTable::entity_at(self, pos)
    }

    fn compact(&mut self) {
        DataTable::compact(self);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
