//! state
//!
//! The immutable storage-state aggregate.
//!
//! # Architecture
//!
//! A [`StorageState`] is the root snapshot: every location's inventory,
//! keyed by location id. States never mutate. The mutation layer
//! ([`mutations`]) computes a new state from the old one, sharing every
//! untouched [`LocationInventory`] by reference and replacing only the
//! touched entries (structural sharing). A reader holding a snapshot
//! observes it forever.
//!
//! Iteration follows location-id order, so searches without a prioritizer
//! resolve deterministically.
//!
//! # Example
//!
//! ```
//! use stowage::catalog::{Capacity, LocationId, Resource, ResourceUnit, UnitOfMeasure};
//! use stowage::content::Content;
//! use stowage::location::Location;
//! use stowage::state::{mutations, StorageState};
//!
//! let each = UnitOfMeasure::new("EACH").unwrap();
//! let loc = Location::new(LocationId::new("A-01").unwrap())
//!     .with_capacity(Capacity::new(each.clone(), 10.0).unwrap());
//! let state = StorageState::new([loc]).unwrap();
//!
//! let ru = ResourceUnit::new(Resource::new("sku_a", "widget").unwrap(), each);
//! let content = Content::new(ru.clone(), 4.0).unwrap();
//! let state = mutations::add_content(&state, content, None, None).unwrap();
//!
//! assert_eq!(state.quantity_of_resource_units(None)[&ru], 4.0);
//! ```

pub mod filter;
pub mod mutations;

pub use filter::LocationFilter;

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::catalog::{LocationId, ResourceUnit, StateId, UnitOfMeasure};
use crate::content::Content;
use crate::inventory::{InventoryError, LocationInventory};
use crate::location::Location;

/// A total order over candidate location inventories, used to pick the
/// preferred allocation target. See [`crate::prioritizers`] for stock
/// comparators.
pub type Prioritizer<'a> = &'a dyn Fn(&LocationInventory, &LocationInventory) -> Ordering;

/// Errors from state-level searches and mutations.
#[derive(Debug, Error, Clone)]
pub enum StateError {
    /// The allocation search matched no location at all (unit-of-measure
    /// and whitelist filters left nothing).
    #[error("no location matches the allocation request for {content}")]
    NoLocationFound { content: Content, state_id: StateId },

    /// Locations matched, but none has enough free space.
    #[error(
        "no location with capacity for {content}: {resource_unit_space} total space available"
    )]
    NoLocationWithCapacity {
        content: Content,
        /// Aggregate free space for the content's resource-unit.
        resource_unit_space: f64,
        /// Free space per candidate location.
        location_space: BTreeMap<LocationId, f64>,
        /// The full state, for diagnostics.
        state: Arc<StorageState>,
    },

    /// No location holds enough of the resource-unit to remove.
    #[error("no location to remove {content} from")]
    NoLocationToRemoveContent {
        content: Content,
        state: Arc<StorageState>,
    },

    /// The named location is not part of the state.
    #[error("location {location_id} not found")]
    LocationNotFound { location_id: LocationId },

    /// A location with that id already exists.
    #[error("location {location_id} already exists")]
    LocationAlreadyExists { location_id: LocationId },

    /// Removal of a location that still holds content.
    #[error("location {location_id} is not empty: {quantities:?}")]
    LocationNotEmpty {
        location_id: LocationId,
        quantities: BTreeMap<ResourceUnit, f64>,
    },

    /// An adjustment would shrink a capacity below the held quantity.
    #[error(
        "cannot shrink {uom} capacity of {location_id} to {new_capacity}: {held} currently held"
    )]
    CapacityExceeded {
        location_id: LocationId,
        uom: UnitOfMeasure,
        held: f64,
        new_capacity: f64,
    },

    /// An inventory-level rejection, forwarded with its payload.
    #[error(transparent)]
    Inventory(#[from] InventoryError),
}

/// A stable hash over the stock held in a state, for cheap divergence
/// detection between snapshots.
///
/// Two states holding identical stock (same locations, containers, and
/// lot quantities) fingerprint identically regardless of their snapshot
/// ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    fn compute(state: &StorageState) -> Self {
        let mut hasher = Sha256::new();
        for (location_id, inventory) in &state.inventories {
            hasher.update(location_id.as_str().as_bytes());
            hasher.update(b"\0");
            for (resource_unit, qty) in inventory.quantities() {
                hasher.update(resource_unit.resource().name().as_bytes());
                hasher.update(b"/");
                hasher.update(resource_unit.uom().name().as_bytes());
                hasher.update(b"=");
                hasher.update(qty.to_bits().to_be_bytes());
                hasher.update(b";");
            }
            for container in inventory.containers() {
                hasher.update(container.id().as_str().as_bytes());
                hasher.update(b",");
            }
            hasher.update(b"\n");
        }
        Self(hex::encode(hasher.finalize()))
    }

    /// The fingerprint as a hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The immutable root aggregate: all location inventories in one snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageState {
    state_id: StateId,
    inventories: BTreeMap<LocationId, Arc<LocationInventory>>,
}

impl StorageState {
    /// Create a state of empty inventories for `locations`.
    ///
    /// # Errors
    ///
    /// `LocationAlreadyExists` on duplicate location ids.
    pub fn new(locations: impl IntoIterator<Item = Location>) -> Result<Self, StateError> {
        let mut inventories = BTreeMap::new();
        for location in locations {
            let id = location.id().clone();
            let inventory = Arc::new(LocationInventory::for_location(location));
            if inventories.insert(id.clone(), inventory).is_some() {
                return Err(StateError::LocationAlreadyExists { location_id: id });
            }
        }
        Ok(Self {
            state_id: StateId::generate(),
            inventories,
        })
    }

    /// Create a state from pre-built inventories.
    ///
    /// # Errors
    ///
    /// `LocationAlreadyExists` on duplicate location ids.
    pub fn from_inventories(
        inventories: impl IntoIterator<Item = LocationInventory>,
    ) -> Result<Self, StateError> {
        let mut map = BTreeMap::new();
        for inventory in inventories {
            let id = inventory.location().id().clone();
            if map.insert(id.clone(), Arc::new(inventory)).is_some() {
                return Err(StateError::LocationAlreadyExists { location_id: id });
            }
        }
        Ok(Self {
            state_id: StateId::generate(),
            inventories: map,
        })
    }

    /// The snapshot identity.
    pub fn state_id(&self) -> &StateId {
        &self.state_id
    }

    /// The inventory at `location_id`, if present.
    pub fn inventory(&self, location_id: &LocationId) -> Option<&Arc<LocationInventory>> {
        self.inventories.get(location_id)
    }

    /// The location entity at `location_id`, if present.
    pub fn location_by_id(&self, location_id: &LocationId) -> Option<&Location> {
        self.inventories.get(location_id).map(|inv| inv.location())
    }

    /// All inventories, in location-id order.
    pub fn inventories(&self) -> impl Iterator<Item = &Arc<LocationInventory>> {
        self.inventories.values()
    }

    /// All location ids, in order.
    pub fn location_ids(&self) -> impl Iterator<Item = &LocationId> {
        self.inventories.keys()
    }

    /// Number of locations.
    pub fn len(&self) -> usize {
        self.inventories.len()
    }

    /// Whether the state tracks no locations.
    pub fn is_empty(&self) -> bool {
        self.inventories.is_empty()
    }

    /// Locations currently holding content, in order.
    pub fn occupied_locations(&self) -> Vec<&LocationId> {
        self.inventories
            .iter()
            .filter(|(_, inv)| inv.occupied())
            .map(|(id, _)| id)
            .collect()
    }

    /// Locations currently empty, in order.
    pub fn empty_locations(&self) -> Vec<&LocationId> {
        self.inventories
            .iter()
            .filter(|(_, inv)| !inv.occupied())
            .map(|(id, _)| id)
            .collect()
    }

    /// Inventories matching `filter`, in location-id order.
    pub fn filter_locations(&self, filter: &LocationFilter) -> Vec<&Arc<LocationInventory>> {
        self.inventories
            .values()
            .filter(|inv| filter.matches(inv))
            .collect()
    }

    /// Find a destination for `content`: a location whose capacities
    /// include the content's unit, whose whitelist accepts the resource,
    /// and whose free space covers the quantity.
    ///
    /// With a prioritizer the minimal candidate under that order wins;
    /// otherwise the first match in location-id order.
    ///
    /// # Errors
    ///
    /// `NoLocationFound` when no location passes the unit/whitelist
    /// filters, `NoLocationWithCapacity` (carrying the per-location space
    /// map and the state) when none has room.
    pub fn find_location_for_content(
        &self,
        content: &Content,
        prioritizer: Option<Prioritizer<'_>>,
    ) -> Result<LocationId, StateError> {
        let matches: Vec<&Arc<LocationInventory>> = self
            .inventories
            .values()
            .filter(|inv| {
                inv.location().handles_uom(content.uom())
                    && inv.location().accepts_resource(content.resource())
            })
            .collect();

        if matches.is_empty() {
            return Err(StateError::NoLocationFound {
                content: content.clone(),
                state_id: self.state_id.clone(),
            });
        }

        let location_space: BTreeMap<LocationId, f64> = matches
            .iter()
            .map(|inv| {
                (
                    inv.location().id().clone(),
                    inv.space_for(content.resource_unit()),
                )
            })
            .collect();

        let with_room: Vec<&Arc<LocationInventory>> = matches
            .iter()
            .filter(|inv| location_space[inv.location().id()] >= content.quantity())
            .copied()
            .collect();

        if with_room.is_empty() {
            return Err(StateError::NoLocationWithCapacity {
                content: content.clone(),
                resource_unit_space: location_space.values().sum(),
                location_space,
                state: Arc::new(self.clone()),
            });
        }

        Ok(Self::prioritized(&with_room, prioritizer).id().clone())
    }

    /// Find a source holding at least the content's quantity of its
    /// resource-unit.
    ///
    /// # Errors
    ///
    /// `NoLocationToRemoveContent` when no location holds enough.
    pub fn find_location_with_content(
        &self,
        content: &Content,
        prioritizer: Option<Prioritizer<'_>>,
    ) -> Result<LocationId, StateError> {
        let candidates: Vec<&Arc<LocationInventory>> = self
            .inventories
            .values()
            .filter(|inv| inv.quantity_of(content.resource_unit()) >= content.quantity())
            .collect();

        if candidates.is_empty() {
            return Err(StateError::NoLocationToRemoveContent {
                content: content.clone(),
                state: Arc::new(self.clone()),
            });
        }

        Ok(Self::prioritized(&candidates, prioritizer).id().clone())
    }

    fn prioritized<'a>(
        candidates: &[&'a Arc<LocationInventory>],
        prioritizer: Option<Prioritizer<'_>>,
    ) -> &'a Location {
        match prioritizer {
            Some(cmp) => candidates
                .iter()
                .min_by(|a, b| cmp(a, b))
                .expect("candidate set is non-empty")
                .location(),
            None => candidates
                .first()
                .expect("candidate set is non-empty")
                .location(),
        }
    }

    /// Held quantity per resource-unit, over the whole state.
    ///
    /// When `resource_units` is given, the result contains exactly those
    /// keys (zero-filled where absent); otherwise every present
    /// resource-unit appears.
    pub fn quantity_of_resource_units(
        &self,
        resource_units: Option<&[ResourceUnit]>,
    ) -> BTreeMap<ResourceUnit, f64> {
        let mut totals: BTreeMap<ResourceUnit, f64> = match resource_units {
            Some(rus) => rus.iter().map(|ru| (ru.clone(), 0.0)).collect(),
            None => BTreeMap::new(),
        };

        for inventory in self.inventories.values() {
            for (ru, qty) in inventory.quantities() {
                if let Some(rus) = resource_units {
                    if !rus.contains(&ru) {
                        continue;
                    }
                }
                *totals.entry(ru).or_insert(0.0) += qty;
            }
        }
        totals
    }

    /// Free space per resource-unit, summed over locations whose whitelist
    /// accepts the resource.
    pub fn space_for_resource_units(
        &self,
        resource_units: &[ResourceUnit],
    ) -> BTreeMap<ResourceUnit, f64> {
        resource_units
            .iter()
            .map(|ru| {
                let space = self
                    .inventories
                    .values()
                    .filter(|inv| inv.location().accepts_resource(ru.resource()))
                    .map(|inv| inv.space_for(ru))
                    .sum();
                (ru.clone(), space)
            })
            .collect()
    }

    /// Configured capacity per resource-unit, summed over locations whose
    /// whitelist accepts the resource.
    pub fn capacity_for_resource_units(
        &self,
        resource_units: &[ResourceUnit],
    ) -> BTreeMap<ResourceUnit, f64> {
        resource_units
            .iter()
            .map(|ru| {
                let capacity = self
                    .inventories
                    .values()
                    .filter(|inv| inv.location().accepts_resource(ru.resource()))
                    .filter_map(|inv| inv.location().capacity_for(ru.uom()))
                    .sum();
                (ru.clone(), capacity)
            })
            .collect()
    }

    /// Merged content per location, in location-id order.
    pub fn content_by_location(&self) -> BTreeMap<LocationId, Vec<Content>> {
        self.inventories
            .iter()
            .map(|(id, inv)| {
                let merged =
                    crate::content::merge_lots(inv.lots().cloned().collect::<Vec<_>>());
                (id.clone(), merged)
            })
            .collect()
    }

    /// Stock fingerprint for divergence detection.
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::compute(self)
    }

    /// New state with `inventory` replacing its location's entry (fresh
    /// snapshot id, all other inventories shared by reference).
    pub(crate) fn replacing(&self, inventory: LocationInventory) -> Self {
        let mut inventories = self.inventories.clone();
        inventories.insert(
            inventory.location().id().clone(),
            Arc::new(inventory),
        );
        Self {
            state_id: StateId::generate(),
            inventories,
        }
    }

    pub(crate) fn with_inventories(
        &self,
        inventories: BTreeMap<LocationId, Arc<LocationInventory>>,
    ) -> Self {
        Self {
            state_id: StateId::generate(),
            inventories,
        }
    }

    pub(crate) fn inventories_map(&self) -> &BTreeMap<LocationId, Arc<LocationInventory>> {
        &self.inventories
    }
}

impl fmt::Display for StorageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "StorageState(locs: {}, occupied: {}, empty: {})",
            self.len(),
            self.occupied_locations().len(),
            self.empty_locations().len()
        )
    }
}
