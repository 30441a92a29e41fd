//! state::filter
//!
//! Composable location predicates for state searches.
//!
//! A [`LocationFilter`] is a set of optional predicates that AND together;
//! an absent predicate filters nothing. Filters are value objects built
//! with a fluent API and evaluated against a [`LocationInventory`].
//!
//! # Example
//!
//! ```
//! use stowage::catalog::UnitOfMeasure;
//! use stowage::state::LocationFilter;
//!
//! let each = UnitOfMeasure::new("EACH").unwrap();
//! let filter = LocationFilter::new()
//!     .requiring_capacity_uom(each)
//!     .occupied(false);
//! ```

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::catalog::{ContainerId, LocationId, Resource, ResourceUnit, UnitOfMeasure};
use crate::inventory::LocationInventory;
use crate::location::ChannelDiscipline;

/// A conjunction of optional location predicates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    location_range: Option<BTreeSet<LocationId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    disciplines: Option<Vec<ChannelDiscipline>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    required_capacity_uoms: Vec<UnitOfMeasure>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    required_resources: Vec<Resource>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    forbidden_resources: Vec<Resource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    min_quantity: Option<(ResourceUnit, f64)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    min_space: Option<(ResourceUnit, f64)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    contains_container: Option<ContainerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    occupied: Option<bool>,
}

impl LocationFilter {
    /// The no-op filter: matches every location.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to an explicit set of location ids.
    pub fn within_locations(mut self, ids: impl IntoIterator<Item = LocationId>) -> Self {
        self.location_range = Some(ids.into_iter().collect());
        self
    }

    /// Restrict to locations using one of the given disciplines.
    pub fn with_disciplines(
        mut self,
        disciplines: impl IntoIterator<Item = ChannelDiscipline>,
    ) -> Self {
        self.disciplines = Some(disciplines.into_iter().collect());
        self
    }

    /// Require a declared capacity for `uom`.
    pub fn requiring_capacity_uom(mut self, uom: UnitOfMeasure) -> Self {
        self.required_capacity_uoms.push(uom);
        self
    }

    /// Require the whitelist to accept `resource`.
    pub fn accepting_resource(mut self, resource: Resource) -> Self {
        self.required_resources.push(resource);
        self
    }

    /// Require the whitelist to reject `resource`.
    pub fn rejecting_resource(mut self, resource: Resource) -> Self {
        self.forbidden_resources.push(resource);
        self
    }

    /// Require at least `quantity` of `resource_unit` on hand.
    pub fn with_min_quantity(mut self, resource_unit: ResourceUnit, quantity: f64) -> Self {
        self.min_quantity = Some((resource_unit, quantity));
        self
    }

    /// Require at least `space` free for `resource_unit`.
    pub fn with_min_space(mut self, resource_unit: ResourceUnit, space: f64) -> Self {
        self.min_space = Some((resource_unit, space));
        self
    }

    /// Require the location to hold this exact container.
    pub fn containing_container(mut self, container_id: ContainerId) -> Self {
        self.contains_container = Some(container_id);
        self
    }

    /// Require the location to be occupied (or empty).
    pub fn occupied(mut self, occupied: bool) -> Self {
        self.occupied = Some(occupied);
        self
    }

    /// Evaluate all present predicates against `inventory`.
    pub fn matches(&self, inventory: &LocationInventory) -> bool {
        let location = inventory.location();

        if let Some(range) = &self.location_range {
            if !range.contains(location.id()) {
                return false;
            }
        }

        if let Some(disciplines) = &self.disciplines {
            if !disciplines.contains(&location.channel_discipline()) {
                return false;
            }
        }

        if !self
            .required_capacity_uoms
            .iter()
            .all(|uom| location.handles_uom(uom))
        {
            return false;
        }

        if !self
            .required_resources
            .iter()
            .all(|resource| location.accepts_resource(resource))
        {
            return false;
        }

        if self
            .forbidden_resources
            .iter()
            .any(|resource| location.accepts_resource(resource))
        {
            return false;
        }

        if let Some((resource_unit, quantity)) = &self.min_quantity {
            if inventory.quantity_of(resource_unit) < *quantity {
                return false;
            }
        }

        if let Some((resource_unit, space)) = &self.min_space {
            if inventory.space_for(resource_unit) < *space {
                return false;
            }
        }

        if let Some(container_id) = &self.contains_container {
            if !inventory
                .containers()
                .iter()
                .any(|container| container.id() == container_id)
            {
                return false;
            }
        }

        if let Some(occupied) = self.occupied {
            if inventory.occupied() != occupied {
                return false;
            }
        }

        true
    }
}
