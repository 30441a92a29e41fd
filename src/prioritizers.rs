//! prioritizers
//!
//! Stock comparators for the allocation search.
//!
//! A prioritizer is a total order over candidate location inventories; the
//! search picks the minimal candidate. These factories capture a
//! resource-unit and a direction and return a comparator suitable for
//! [`crate::state::Prioritizer`].
//!
//! # Example
//!
//! ```
//! use stowage::catalog::{Resource, ResourceUnit, UnitOfMeasure};
//! use stowage::prioritizers;
//!
//! let each = UnitOfMeasure::new("EACH").unwrap();
//! let ru = ResourceUnit::new(Resource::new("sku_a", "widget").unwrap(), each);
//!
//! // prefer the tightest fit
//! let tightest = prioritizers::by_space_available(ru, true);
//! ```

use std::cmp::Ordering;

use crate::catalog::ResourceUnit;
use crate::inventory::LocationInventory;

fn directed(ordering: Ordering, smallest_first: bool) -> Ordering {
    if smallest_first {
        ordering
    } else {
        ordering.reverse()
    }
}

/// Order candidates by free space for `resource_unit`.
///
/// `smallest_first` prefers the tightest fit (consolidation);
/// `false` prefers the roomiest location (spreading).
pub fn by_space_available(
    resource_unit: ResourceUnit,
    smallest_first: bool,
) -> impl Fn(&LocationInventory, &LocationInventory) -> Ordering {
    move |a, b| {
        let ordering = a
            .space_for(&resource_unit)
            .partial_cmp(&b.space_for(&resource_unit))
            .unwrap_or(Ordering::Equal);
        directed(ordering, smallest_first)
    }
}

/// Order candidates by held quantity of `resource_unit`.
///
/// `smallest_first` prefers nearly-empty sources (clean-up picking);
/// `false` prefers the fullest source.
pub fn by_quantity_present(
    resource_unit: ResourceUnit,
    smallest_first: bool,
) -> impl Fn(&LocationInventory, &LocationInventory) -> Ordering {
    move |a, b| {
        let ordering = a
            .quantity_of(&resource_unit)
            .partial_cmp(&b.quantity_of(&resource_unit))
            .unwrap_or(Ordering::Equal);
        directed(ordering, smallest_first)
    }
}

/// Order candidates by location id, for a fully deterministic walk.
pub fn by_location_id() -> impl Fn(&LocationInventory, &LocationInventory) -> Ordering {
    |a, b| a.location().id().cmp(b.location().id())
}
