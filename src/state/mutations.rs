//! state::mutations
//!
//! The functional mutation layer over [`StorageState`].
//!
//! Every function here computes `new state = f(old state, request)`: the
//! old state is never modified, untouched inventories are shared by
//! reference, and on error the caller still holds the old state whole.
//! The facade serializes calls into this layer; the functions themselves
//! are pure apart from tracing.

use std::collections::BTreeSet;

use tracing::debug;

use crate::catalog::{Capacity, LocationId, Resource, UnitOfMeasure};
use crate::content::Content;
use crate::location::Location;

use super::{Prioritizer, StateError, StorageState};

/// Capacity and whitelist deltas for [`adjust_location`].
#[derive(Debug, Clone, Default)]
pub struct LocationAdjustment {
    /// Capacities to add, replacing any existing bound of the same unit.
    pub add_capacities: Vec<Capacity>,
    /// Units whose capacity bounds are removed.
    pub remove_capacity_uoms: Vec<UnitOfMeasure>,
    /// Resources added to the whitelist.
    pub add_whitelist: Vec<Resource>,
    /// Resources removed from the whitelist.
    pub remove_whitelist: Vec<Resource>,
}

/// Add empty-inventory locations to the state.
///
/// # Errors
///
/// `LocationAlreadyExists` when an id collides with a tracked location.
pub fn add_locations(
    state: &StorageState,
    locations: impl IntoIterator<Item = Location>,
) -> Result<StorageState, StateError> {
    let mut inventories = state.inventories_map().clone();
    for location in locations {
        let id = location.id().clone();
        if inventories.contains_key(&id) {
            return Err(StateError::LocationAlreadyExists { location_id: id });
        }
        debug!(location = %id, "location added");
        inventories.insert(
            id,
            std::sync::Arc::new(crate::inventory::LocationInventory::for_location(location)),
        );
    }
    Ok(state.with_inventories(inventories))
}

/// Remove locations from the state.
///
/// Removal never destroys stock: a location still holding content is
/// rejected.
///
/// # Errors
///
/// `LocationNotFound` for unknown ids, `LocationNotEmpty` (carrying the
/// held quantities) for occupied locations.
pub fn remove_locations(
    state: &StorageState,
    location_ids: &[LocationId],
) -> Result<StorageState, StateError> {
    let mut inventories = state.inventories_map().clone();
    for id in location_ids {
        let inventory = inventories
            .get(id)
            .ok_or_else(|| StateError::LocationNotFound {
                location_id: id.clone(),
            })?;
        if inventory.occupied() {
            return Err(StateError::LocationNotEmpty {
                location_id: id.clone(),
                quantities: inventory.quantities(),
            });
        }
        inventories.remove(id);
        debug!(location = %id, "location removed");
    }
    Ok(state.with_inventories(inventories))
}

/// Add content to the state.
///
/// Without an explicit location the allocation search picks one
/// ([`StorageState::find_location_for_content`]); the optional prioritizer
/// orders the candidates.
///
/// # Errors
///
/// Search errors (`NoLocationFound`, `NoLocationWithCapacity`),
/// `LocationNotFound` for an unknown explicit location, or the
/// inventory-level rejection from the chosen location.
pub fn add_content(
    state: &StorageState,
    content: Content,
    location: Option<&LocationId>,
    prioritizer: Option<Prioritizer<'_>>,
) -> Result<StorageState, StateError> {
    let location_id = match location {
        Some(id) => {
            if state.inventory(id).is_none() {
                return Err(StateError::LocationNotFound {
                    location_id: id.clone(),
                });
            }
            id.clone()
        }
        None => state.find_location_for_content(&content, prioritizer)?,
    };

    let inventory = state
        .inventory(&location_id)
        .expect("allocation search returns tracked locations");

    debug!(
        location = %location_id,
        resource_unit = %content.resource_unit(),
        quantity = content.quantity(),
        "adding content"
    );
    let next_inventory = inventory.add_content(content)?;
    Ok(state.replacing(next_inventory))
}

/// Remove content from the state, returning the removed lot and the new
/// state.
///
/// Without an explicit location the removal search picks a source holding
/// at least the requested quantity. The removed content's quantity equals
/// the request exactly (reconciliation invariant).
///
/// # Errors
///
/// `NoLocationToRemoveContent` when no location holds enough,
/// `LocationNotFound` for an unknown explicit location, or the
/// inventory-level rejection (`MissingContent`, `NotExtractable`,
/// `ReconciliationMismatch`).
pub fn remove_content(
    state: &StorageState,
    content: &Content,
    location: Option<&LocationId>,
    prioritizer: Option<Prioritizer<'_>>,
) -> Result<(Content, StorageState), StateError> {
    let location_id = match location {
        Some(id) => {
            if state.inventory(id).is_none() {
                return Err(StateError::LocationNotFound {
                    location_id: id.clone(),
                });
            }
            id.clone()
        }
        None => state.find_location_with_content(content, prioritizer)?,
    };

    let inventory = state
        .inventory(&location_id)
        .expect("removal search returns tracked locations");

    debug!(
        location = %location_id,
        resource_unit = %content.resource_unit(),
        quantity = content.quantity(),
        "removing content"
    );
    let (next_inventory, removed) =
        inventory.remove_content(content.resource_unit(), content.quantity())?;
    Ok((removed, state.replacing(next_inventory)))
}

/// Adjust a location's capacities and whitelist, by replacement.
///
/// The adjusted payload must stay consistent with the held stock:
/// shrinking (or removing) a capacity below the consumed quantity and
/// delisting a resource that is currently present are both rejected.
///
/// # Errors
///
/// `LocationNotFound`, `CapacityExceeded`, or a designation rejection
/// forwarded as an inventory error.
pub fn adjust_location(
    state: &StorageState,
    location_id: &LocationId,
    adjustment: &LocationAdjustment,
) -> Result<StorageState, StateError> {
    let inventory = state
        .inventory(location_id)
        .ok_or_else(|| StateError::LocationNotFound {
            location_id: location_id.clone(),
        })?;

    let adjusted = inventory
        .location()
        .add_capacities(adjustment.add_capacities.iter().cloned())
        .remove_capacities(&adjustment.remove_capacity_uoms)
        .add_whitelist(adjustment.add_whitelist.iter().cloned())
        .remove_whitelist(&adjustment.remove_whitelist);

    // every unit consumed at the location must still fit its (possibly
    // removed or shrunken) bound
    let mut touched_uoms: BTreeSet<UnitOfMeasure> = adjustment
        .remove_capacity_uoms
        .iter()
        .cloned()
        .collect();
    touched_uoms.extend(adjustment.add_capacities.iter().map(|c| c.uom().clone()));

    for uom in &touched_uoms {
        let held = inventory.consumed_of_uom(uom);
        let new_capacity = adjusted.capacity_for(uom).unwrap_or(0.0);
        if held > new_capacity + crate::content::QTY_EPS {
            return Err(StateError::CapacityExceeded {
                location_id: location_id.clone(),
                uom: uom.clone(),
                held,
                new_capacity,
            });
        }
    }

    // a narrowed whitelist must still admit every resource present
    if !adjusted.resource_whitelist().is_empty() {
        for resource_unit in inventory.resource_units_present() {
            if !adjusted.accepts_resource(resource_unit.resource()) {
                return Err(crate::inventory::InventoryError::DesignationMismatch {
                    location_id: location_id.clone(),
                    resource_unit: resource_unit.clone(),
                    reason: "whitelist adjustment delists a resource currently held".into(),
                }
                .into());
            }
        }
    }

    debug!(location = %location_id, "location adjusted");
    Ok(state.replacing(inventory.with_location(adjusted)))
}
