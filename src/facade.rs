//! facade
//!
//! The concurrency-safe entry point.
//!
//! # Architecture
//!
//! A [`Storage`] holds the current [`StorageState`] behind a single
//! writer lock. Every mutating call acquires the lock, computes the new
//! state functionally from the old one, swaps the published reference,
//! and releases. Because states are immutable and replacement is a single
//! reference swap, readers never tear: a snapshot is the state before or
//! after a mutation, never between.
//!
//! # Invariants
//!
//! - Mutations are strictly serialized per storage instance
//! - No partial commits: on error the published reference is unchanged
//! - Snapshots stay valid forever (they are just `Arc`s into history)
//!
//! # Example
//!
//! ```
//! use stowage::catalog::{Capacity, LocationId, Resource, ResourceUnit, UnitOfMeasure};
//! use stowage::content::Content;
//! use stowage::facade::Storage;
//! use stowage::location::Location;
//!
//! let each = UnitOfMeasure::new("EACH").unwrap();
//! let storage = Storage::new([Location::new(LocationId::new("A-01").unwrap())
//!     .with_capacity(Capacity::new(each.clone(), 10.0).unwrap())])
//! .unwrap();
//!
//! let ru = ResourceUnit::new(Resource::new("sku_a", "widget").unwrap(), each);
//! storage
//!     .add_content(Content::new(ru.clone(), 4.0).unwrap(), None, None)
//!     .unwrap();
//!
//! let snapshot = storage.snapshot();
//! assert_eq!(snapshot.quantity_of_resource_units(None)[&ru], 4.0);
//! ```

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, warn};

use crate::catalog::LocationId;
use crate::content::Content;
use crate::layout::Layout;
use crate::location::Location;
use crate::state::mutations::{self, LocationAdjustment};
use crate::state::{Prioritizer, StateError, StorageState};

/// Thread-safe owner of the current storage state.
#[derive(Debug)]
pub struct Storage {
    state: RwLock<Arc<StorageState>>,
}

impl Storage {
    /// Create a storage over an initial set of locations.
    ///
    /// # Errors
    ///
    /// `LocationAlreadyExists` on duplicate location ids.
    pub fn new(locations: impl IntoIterator<Item = Location>) -> Result<Self, StateError> {
        Ok(Self {
            state: RwLock::new(Arc::new(StorageState::new(locations)?)),
        })
    }

    /// Create a storage from a validated layout.
    ///
    /// # Errors
    ///
    /// `LocationAlreadyExists` on duplicate location ids (layouts validate
    /// their own ids, so this only fires for hand-built layouts).
    pub fn from_layout(layout: &Layout) -> Result<Self, StateError> {
        Self::new(layout.locations().iter().cloned())
    }

    // A poisoned lock only means a panic elsewhere while holding it; the
    // guarded value is an immutable snapshot and always consistent.
    fn read_state(&self) -> RwLockReadGuard<'_, Arc<StorageState>> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, Arc<StorageState>> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// The latest published snapshot.
    pub fn snapshot(&self) -> Arc<StorageState> {
        Arc::clone(&self.read_state())
    }

    /// The location entity with `id` in the latest snapshot, if any.
    pub fn location_by_id(&self, id: &LocationId) -> Option<Location> {
        self.read_state().location_by_id(id).cloned()
    }

    /// Serialized application of one mutation; the reference only moves on
    /// success.
    fn commit<T>(
        &self,
        mutate: impl FnOnce(&StorageState) -> Result<(T, StorageState), StateError>,
    ) -> Result<(T, Arc<StorageState>), StateError> {
        let mut guard = self.write_state();
        match mutate(&guard) {
            Ok((output, next)) => {
                let next = Arc::new(next);
                *guard = Arc::clone(&next);
                Ok((output, next))
            }
            Err(err) => {
                warn!(error = %err, "mutation rejected");
                Err(err)
            }
        }
    }

    /// Add content, allocating a destination when none is given.
    ///
    /// Returns the new snapshot.
    ///
    /// # Errors
    ///
    /// See [`mutations::add_content`]; the published state is unchanged on
    /// error.
    pub fn add_content(
        &self,
        content: Content,
        location: Option<&LocationId>,
        prioritizer: Option<Prioritizer<'_>>,
    ) -> Result<Arc<StorageState>, StateError> {
        let (_, next) = self.commit(|state| {
            mutations::add_content(state, content, location, prioritizer).map(|s| ((), s))
        })?;
        debug!(state = %next, "content added");
        Ok(next)
    }

    /// Remove content, returning the removed lot and the new snapshot.
    ///
    /// # Errors
    ///
    /// See [`mutations::remove_content`]; the published state is unchanged
    /// on error.
    pub fn remove_content(
        &self,
        content: &Content,
        location: Option<&LocationId>,
        prioritizer: Option<Prioritizer<'_>>,
    ) -> Result<(Content, Arc<StorageState>), StateError> {
        let (removed, next) =
            self.commit(|state| mutations::remove_content(state, content, location, prioritizer))?;
        debug!(state = %next, "content removed");
        Ok((removed, next))
    }

    /// Add locations to the storage.
    pub fn add_locations(
        &self,
        locations: impl IntoIterator<Item = Location>,
    ) -> Result<Arc<StorageState>, StateError> {
        let (_, next) =
            self.commit(|state| mutations::add_locations(state, locations).map(|s| ((), s)))?;
        Ok(next)
    }

    /// Remove empty locations from the storage.
    pub fn remove_locations(
        &self,
        location_ids: &[LocationId],
    ) -> Result<Arc<StorageState>, StateError> {
        let (_, next) = self
            .commit(|state| mutations::remove_locations(state, location_ids).map(|s| ((), s)))?;
        Ok(next)
    }

    /// Adjust a location's capacities and whitelist.
    pub fn adjust_location(
        &self,
        location_id: &LocationId,
        adjustment: &LocationAdjustment,
    ) -> Result<Arc<StorageState>, StateError> {
        let (_, next) = self.commit(|state| {
            mutations::adjust_location(state, location_id, adjustment).map(|s| ((), s))
        })?;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Capacity, Resource, ResourceUnit, UnitOfMeasure};

    fn each() -> UnitOfMeasure {
        UnitOfMeasure::new("EACH").unwrap()
    }

    fn ru(name: &str) -> ResourceUnit {
        ResourceUnit::new(Resource::new(name, "test resource").unwrap(), each())
    }

    fn storage(ids: &[&str], capacity: f64) -> Storage {
        Storage::new(ids.iter().map(|id| {
            Location::new(LocationId::new(*id).unwrap())
                .with_capacity(Capacity::new(each(), capacity).unwrap())
        }))
        .unwrap()
    }

    #[test]
    fn snapshot_is_stable_across_mutations() {
        let storage = storage(&["A-01"], 10.0);
        let before = storage.snapshot();

        storage
            .add_content(Content::new(ru("sku_a"), 4.0).unwrap(), None, None)
            .unwrap();

        // the old snapshot still reads as it did
        assert_eq!(before.occupied_locations().len(), 0);
        assert_eq!(storage.snapshot().occupied_locations().len(), 1);
    }

    #[test]
    fn rejected_mutation_leaves_reference_unchanged() {
        let storage = storage(&["A-01"], 10.0);
        storage
            .add_content(Content::new(ru("sku_a"), 8.0).unwrap(), None, None)
            .unwrap();
        let published = storage.snapshot();

        let err = storage.add_content(Content::new(ru("sku_a"), 8.0).unwrap(), None, None);
        assert!(err.is_err());
        assert!(Arc::ptr_eq(&published, &storage.snapshot()));
    }

    #[test]
    fn location_lookup_reads_latest() {
        let storage = storage(&["A-01"], 10.0);
        let a01 = LocationId::new("A-01").unwrap();
        assert!(storage.location_by_id(&a01).is_some());

        storage.remove_locations(&[a01.clone()]).unwrap();
        assert!(storage.location_by_id(&a01).is_none());
    }

    #[test]
    fn concurrent_adds_all_land() {
        use std::thread;

        let storage = std::sync::Arc::new(storage(&["A-01", "A-02", "A-03", "A-04"], 100.0));
        let mut handles = Vec::new();

        for _ in 0..4 {
            let storage = std::sync::Arc::clone(&storage);
            handles.push(thread::spawn(move || {
                for _ in 0..10 {
                    storage
                        .add_content(Content::new(ru("sku_a"), 1.0).unwrap(), None, None)
                        .unwrap();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let total = storage.snapshot().quantity_of_resource_units(Some(&[ru("sku_a")]))
            [&ru("sku_a")];
        assert_eq!(total, 40.0);
    }
}
