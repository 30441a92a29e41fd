//! inventory::container
//!
//! Containers: identified carriers of content lots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use std::collections::BTreeMap;
use std::fmt;

use crate::catalog::{Capacity, ContainerId, ResourceUnit, UnitOfMeasure};
use crate::content::{merge_lots, qty_eq, qty_ge, Content, QTY_EPS};

use super::InventoryError;

/// Reserved unit-of-measure name for internal lot carriers.
///
/// Loose content added to a location is wrapped in a carrier container so
/// lots and real containers share one ordering model. Carriers are
/// invisible to capacity accounting and are dropped once emptied.
pub const CARRIER_UOM_NAME: &str = "LOT-CARRIER";

/// An identified container holding content lots.
///
/// A container's own capacities bound the aggregate quantity of each unit
/// of measure it may hold. Containers are immutable: adding or removing
/// content produces a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Container {
    id: ContainerId,
    uom: UnitOfMeasure,
    #[serde(default)]
    capacities: Vec<Capacity>,
    #[serde(default)]
    lots: Vec<Content>,
    created_at: DateTime<Utc>,
}

impl Container {
    /// Create an empty container of the given handling unit.
    pub fn new(id: ContainerId, uom: UnitOfMeasure, capacities: Vec<Capacity>) -> Self {
        Self {
            id,
            uom,
            capacities,
            lots: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Create an internal lot carrier.
    pub fn carrier(id: ContainerId, capacities: Vec<Capacity>) -> Self {
        let uom = UnitOfMeasure::new(CARRIER_UOM_NAME)
            .expect("carrier unit-of-measure name is a valid name");
        Self::new(id, uom, capacities)
    }

    /// New container value with the capacity bounds replaced.
    ///
    /// Used when a carrier's owning location is adjusted: carriers mirror
    /// the location's capacities.
    pub fn with_capacities(&self, capacities: Vec<Capacity>) -> Self {
        let mut next = self.clone();
        next.capacities = capacities;
        next
    }

    /// The container identity (license plate number).
    pub fn id(&self) -> &ContainerId {
        &self.id
    }

    /// The container's own handling unit.
    pub fn uom(&self) -> &UnitOfMeasure {
        &self.uom
    }

    /// Whether this is an internal lot carrier.
    pub fn is_carrier(&self) -> bool {
        self.uom.name() == CARRIER_UOM_NAME
    }

    /// The declared per-unit capacity bounds.
    pub fn capacities(&self) -> &[Capacity] {
        &self.capacities
    }

    /// The held lots, in insertion order.
    pub fn lots(&self) -> &[Content] {
        &self.lots
    }

    /// Whether the container holds no content.
    pub fn is_empty(&self) -> bool {
        self.lots.is_empty()
    }

    /// Creation timestamp.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// The capacity bound for `uom`, if declared.
    pub fn capacity_for(&self, uom: &UnitOfMeasure) -> Option<f64> {
        self.capacities
            .iter()
            .find(|c| c.uom() == uom)
            .map(Capacity::max_qty)
    }

    /// Total held quantity of one resource-unit.
    pub fn quantity_of(&self, resource_unit: &ResourceUnit) -> f64 {
        self.lots
            .iter()
            .filter(|lot| lot.matches_resource_unit(resource_unit))
            .map(Content::quantity)
            .sum()
    }

    /// Total held quantity of one unit of measure, across resources.
    pub fn quantity_of_uom(&self, uom: &UnitOfMeasure) -> f64 {
        self.lots
            .iter()
            .filter(|lot| lot.uom() == uom)
            .map(Content::quantity)
            .sum()
    }

    /// Held quantities by resource-unit.
    pub fn quantities(&self) -> BTreeMap<ResourceUnit, f64> {
        let mut quantities = BTreeMap::new();
        for lot in &self.lots {
            *quantities.entry(lot.resource_unit().clone()).or_insert(0.0) += lot.quantity();
        }
        quantities
    }

    /// Remaining space for `uom`, 0 when the unit is not declared.
    pub fn space_for_uom(&self, uom: &UnitOfMeasure) -> f64 {
        self.capacity_for(uom)
            .map(|cap| (cap - self.quantity_of_uom(uom)).max(0.0))
            .unwrap_or(0.0)
    }

    /// Add a lot, merging with any existing lot of the same resource-unit.
    ///
    /// Merging happens before the capacity check, so a merge that would
    /// overflow is rejected whole.
    ///
    /// # Errors
    ///
    /// `ContainerUomMismatch` when the lot's unit is not among the declared
    /// capacities, `ContainerCapacityExceeded` when the merged quantity
    /// would exceed the bound.
    pub fn add_lot(&self, content: Content) -> Result<Self, InventoryError> {
        let uom = content.uom().clone();
        let Some(capacity) = self.capacity_for(&uom) else {
            return Err(InventoryError::ContainerUomMismatch {
                container_id: self.id.clone(),
                uom,
            });
        };

        let next_qty = self.quantity_of_uom(&uom) + content.quantity();
        if next_qty > capacity + QTY_EPS {
            return Err(InventoryError::ContainerCapacityExceeded {
                container_id: self.id.clone(),
                uom,
                requested: content.quantity(),
                available: (capacity - self.quantity_of_uom(content.uom())).max(0.0),
            });
        }

        let mut next = self.clone();
        next.lots.push(content);
        next.lots = merge_lots(next.lots);
        Ok(next)
    }

    /// Remove one specific lot by identity.
    ///
    /// # Errors
    ///
    /// `LotNotFound` when no lot carries that identity.
    pub fn remove_lot(&self, lot_id: &crate::catalog::LotId) -> Result<(Self, Content), InventoryError> {
        let index = self
            .lots
            .iter()
            .position(|lot| lot.lot_id() == lot_id)
            .ok_or_else(|| InventoryError::LotNotFound {
                container_id: self.id.clone(),
                lot_id: lot_id.clone(),
            })?;

        let mut next = self.clone();
        let removed = next.lots.remove(index);
        Ok((next, removed))
    }

    /// Remove an exact quantity of one resource-unit, reconciling whole
    /// lots by splitting the final one when needed.
    ///
    /// Every lot in the container is reachable, so this is the
    /// pool-granularity reconciliation: walk lots in insertion order,
    /// remove whole lots until the requested quantity is covered, then
    /// split the overshoot back in.
    ///
    /// Returns the new container and the removed content, whose quantity
    /// equals the request exactly.
    ///
    /// # Errors
    ///
    /// `ContainerMissingContent` when the container holds less than
    /// requested; `ContainerReconciliationMismatch` when the exactness
    /// post-condition fails (an engine defect, not bad input).
    pub fn remove_quantity(
        &self,
        resource_unit: &ResourceUnit,
        quantity: f64,
    ) -> Result<(Self, Content), InventoryError> {
        let available = self.quantity_of(resource_unit);
        if !qty_ge(available, quantity) {
            return Err(InventoryError::ContainerMissingContent {
                container_id: self.id.clone(),
                resource_unit: resource_unit.clone(),
                requested: quantity,
                available,
            });
        }

        let mut current = self.clone();
        let mut removed: Vec<Content> = Vec::new();
        let mut accumulated = 0.0;

        while !qty_ge(accumulated, quantity) {
            let lot = current
                .lots
                .iter()
                .find(|lot| lot.matches_resource_unit(resource_unit))
                .cloned()
                .expect("presence was checked: lots of the resource-unit remain");
            let (next, lot) = current.remove_lot(lot.lot_id())?;
            current = next;
            accumulated += lot.quantity();
            removed.push(lot);
        }

        let overshoot = accumulated - quantity;
        if overshoot > QTY_EPS {
            let last = removed.pop().expect("at least one lot was removed");
            if qty_eq(last.quantity(), overshoot) {
                current = current.add_lot(last)?;
            } else {
                let split_at = last.quantity() - overshoot;
                let (kept_out, put_back) = last.split(split_at)?;
                removed.push(kept_out);
                current = current.add_lot(put_back)?;
            }
        }

        let delta = self.quantity_of(resource_unit) - current.quantity_of(resource_unit);
        if !qty_eq(delta, quantity) {
            return Err(InventoryError::ContainerReconciliationMismatch {
                container_id: self.id.clone(),
                resource_unit: resource_unit.clone(),
                requested: quantity,
                actual: delta,
            });
        }

        let content = merge_lots(removed)
            .into_iter()
            .next()
            .expect("removed lots merge to one lot of the requested resource-unit");
        Ok((current, content))
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {} lots)", self.id, self.uom, self.lots.len())
    }
}
