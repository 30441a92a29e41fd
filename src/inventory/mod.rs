//! inventory
//!
//! Per-location inventory: held containers or a merged pool, derived
//! quantity/space queries, and the add/remove transitions that enforce
//! capacity, designation, and channel-discipline invariants.
//!
//! # Architecture
//!
//! A [`LocationInventory`] pairs a [`Location`] with its stock. Depending
//! on the location's [`ChannelDiscipline`] exactly one holding model is
//! active:
//!
//! - **Discrete containers**: an ordered sequence of [`Container`]s. The
//!   channel engine decides which containers are extractable and admits
//!   new ones; loose content rides in internal carrier containers so lots
//!   and real containers share one ordering model.
//! - **Merged pool**: a single pool container into which all loose content
//!   is merged; whole-container operations are forbidden.
//!
//! Inventories are immutable. Every transition returns a new value, and
//! the caller keeps the original on error.
//!
//! # Designation
//!
//! A non-empty location is designated: additions of a different
//! unit-of-measure are rejected unless it is already present, and a new
//! resource-unit is rejected once the distinct-resource-unit cap would be
//! exceeded. Designation derives from the lots present; it clears when the
//! last lot leaves.

mod container;

pub use container::{Container, CARRIER_UOM_NAME};

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::catalog::{ContainerId, LocationId, LotId, ResourceUnit, UnitOfMeasure};
use crate::channel::{Channel, ChannelError};
use crate::content::{merge_lots, qty_eq, qty_ge, Content, ContentError, QTY_EPS};
use crate::location::{ChannelDiscipline, Location};

/// Errors from inventory transitions.
///
/// All variants are caller-recoverable business errors, except the
/// reconciliation-mismatch kinds, which indicate an engine defect. Every
/// variant carries the offending identifiers and quantities so a caller
/// can publish or log the diagnostic without re-deriving it.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InventoryError {
    /// The content's unit of measure is not among the location's capacities.
    #[error("location {location_id} has no capacity for unit {uom}")]
    UnitOfMeasureMismatch {
        location_id: LocationId,
        uom: UnitOfMeasure,
    },

    /// The addition would exceed the location's capacity for the unit.
    #[error("no room at {location_id}: {requested} {uom} requested, {available} available")]
    NoRoomAtLocation {
        location_id: LocationId,
        uom: UnitOfMeasure,
        requested: f64,
        available: f64,
    },

    /// The content conflicts with the location's current designation.
    #[error("designation mismatch at {location_id} for {resource_unit}: {reason}")]
    DesignationMismatch {
        location_id: LocationId,
        resource_unit: ResourceUnit,
        reason: String,
    },

    /// The location holds less of the resource-unit than requested.
    #[error("{location_id} holds {available} of {resource_unit}, cannot remove {requested}")]
    MissingContent {
        location_id: LocationId,
        resource_unit: ResourceUnit,
        requested: f64,
        available: f64,
    },

    /// No container with that identity at the location.
    #[error("container {container_id} not found at {location_id}")]
    ContainerNotFound {
        location_id: LocationId,
        container_id: ContainerId,
    },

    /// The target exists but is not in a removable position.
    #[error("{target} at {location_id} is not in an extractable position")]
    NotExtractable {
        location_id: LocationId,
        target: String,
        extractable: Vec<ContainerId>,
    },

    /// The location's channel discipline forbids the operation outright.
    #[error("discipline {discipline} at {location_id} forbids {operation}")]
    DisciplineForbidsOperation {
        location_id: LocationId,
        discipline: ChannelDiscipline,
        operation: String,
    },

    /// The exact-quantity reconciliation post-condition failed. A defect
    /// in the engine, never bad input; the operation must be aborted.
    #[error(
        "reconciliation mismatch at {location_id}: removed {actual} of {resource_unit}, requested {requested}"
    )]
    ReconciliationMismatch {
        location_id: LocationId,
        resource_unit: ResourceUnit,
        requested: f64,
        actual: f64,
    },

    /// A channel transition failed in a way not covered above.
    #[error("channel rejected transition at {location_id}: {source}")]
    Channel {
        location_id: LocationId,
        #[source]
        source: ChannelError,
    },

    /// The lot's unit is not among the container's declared capacities.
    #[error("container {container_id} has no capacity for unit {uom}")]
    ContainerUomMismatch {
        container_id: ContainerId,
        uom: UnitOfMeasure,
    },

    /// The addition would exceed the container's capacity for the unit.
    #[error("container {container_id} full: {requested} {uom} requested, {available} available")]
    ContainerCapacityExceeded {
        container_id: ContainerId,
        uom: UnitOfMeasure,
        requested: f64,
        available: f64,
    },

    /// No lot with that identity in the container.
    #[error("lot {lot_id} not found in container {container_id}")]
    LotNotFound {
        container_id: ContainerId,
        lot_id: LotId,
    },

    /// The container holds less of the resource-unit than requested.
    #[error("container {container_id} holds {available} of {resource_unit}, cannot remove {requested}")]
    ContainerMissingContent {
        container_id: ContainerId,
        resource_unit: ResourceUnit,
        requested: f64,
        available: f64,
    },

    /// Container-granularity reconciliation exactness failure.
    #[error(
        "reconciliation mismatch in container {container_id}: removed {actual} of {resource_unit}, requested {requested}"
    )]
    ContainerReconciliationMismatch {
        container_id: ContainerId,
        resource_unit: ResourceUnit,
        requested: f64,
        actual: f64,
    },

    /// Invalid content arithmetic (non-positive quantities, bad splits).
    #[error(transparent)]
    Content(#[from] ContentError),
}

/// A location together with its held stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationInventory {
    location: Location,
    #[serde(default)]
    containers: Vec<Container>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    merged_pool: Option<Container>,
}

impl LocationInventory {
    /// Create an empty inventory for `location`.
    pub fn for_location(location: Location) -> Self {
        let merged_pool = location.channel_discipline().is_merged().then(|| {
            let pool_id = ContainerId::new(format!("{}-POOL", location.id()))
                .expect("location ids are valid identifier text");
            Container::carrier(pool_id, location.capacities().to_vec())
        });
        Self {
            location,
            containers: Vec::new(),
            merged_pool,
        }
    }

    /// Create an inventory holding `lots`, each admitted separately.
    ///
    /// At discrete-container locations every lot rides in its own carrier,
    /// preserving lot boundaries (and hence discipline ordering); at
    /// merged-content locations the lots merge into the pool.
    ///
    /// # Errors
    ///
    /// Fails exactly where admitting each lot would fail.
    pub fn with_lots(
        location: Location,
        lots: impl IntoIterator<Item = Content>,
    ) -> Result<Self, InventoryError> {
        let mut inventory = Self::for_location(location);
        for lot in lots {
            inventory = if inventory.location.channel_discipline().is_merged() {
                inventory.add_content(lot)?
            } else {
                inventory.admit_content_checks(&lot)?;
                inventory.place_in_new_carrier(lot)?
            };
        }
        Ok(inventory)
    }

    /// Create an inventory holding `containers`, admitted oldest-first.
    ///
    /// # Errors
    ///
    /// Fails exactly where [`Self::add_container`] would fail.
    pub fn with_containers(
        location: Location,
        containers: impl IntoIterator<Item = Container>,
    ) -> Result<Self, InventoryError> {
        let mut inventory = Self::for_location(location);
        for container in containers {
            inventory = inventory.add_container(container)?;
        }
        Ok(inventory)
    }

    /// The location this inventory belongs to.
    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Replace the location payload (entity update by replacement).
    ///
    /// Carriers and the merged pool mirror the location's capacities, so
    /// they are refreshed alongside. The caller is responsible for
    /// re-validating invariants against the new payload; see the
    /// state-level adjustment operation.
    pub fn with_location(&self, location: Location) -> Self {
        let mut next = self.clone();
        let capacities = location.capacities().to_vec();
        if let Some(pool) = next.merged_pool.take() {
            next.merged_pool = Some(pool.with_capacities(capacities.clone()));
        }
        for container in &mut next.containers {
            if container.is_carrier() {
                *container = container.with_capacities(capacities.clone());
            }
        }
        next.location = location;
        next
    }

    /// The held containers, oldest first. Empty for merged-content
    /// locations.
    pub fn containers(&self) -> &[Container] {
        &self.containers
    }

    /// The merged pool, when the discipline is merged-content.
    pub fn merged_pool(&self) -> Option<&Container> {
        self.merged_pool.as_ref()
    }

    fn holding_containers(&self) -> impl Iterator<Item = &Container> {
        self.merged_pool.iter().chain(self.containers.iter())
    }

    /// All lots at the location, in holding order.
    pub fn lots(&self) -> impl Iterator<Item = &Content> {
        self.holding_containers().flat_map(|c| c.lots().iter())
    }

    /// Total quantity of one resource-unit.
    pub fn quantity_of(&self, resource_unit: &ResourceUnit) -> f64 {
        self.lots()
            .filter(|lot| lot.matches_resource_unit(resource_unit))
            .map(Content::quantity)
            .sum()
    }

    /// Total quantity of one unit of measure, across resources.
    pub fn quantity_of_uom(&self, uom: &UnitOfMeasure) -> f64 {
        self.lots()
            .filter(|lot| lot.uom() == uom)
            .map(Content::quantity)
            .sum()
    }

    /// Held quantities by resource-unit.
    pub fn quantities(&self) -> BTreeMap<ResourceUnit, f64> {
        let mut quantities = BTreeMap::new();
        for lot in self.lots() {
            *quantities.entry(lot.resource_unit().clone()).or_insert(0.0) += lot.quantity();
        }
        quantities
    }

    /// The distinct resource-units present.
    pub fn resource_units_present(&self) -> BTreeSet<ResourceUnit> {
        self.lots().map(|lot| lot.resource_unit().clone()).collect()
    }

    /// The units of measure currently designating the location.
    pub fn uoms_present(&self) -> BTreeSet<UnitOfMeasure> {
        self.lots().map(|lot| lot.uom().clone()).collect()
    }

    /// Whether any content is present.
    pub fn occupied(&self) -> bool {
        self.lots().next().is_some()
    }

    /// Quantity of `uom` consumed against the location capacity: held lot
    /// quantity plus one per explicit container of that handling unit.
    /// Carriers consume nothing themselves.
    pub(crate) fn consumed_of_uom(&self, uom: &UnitOfMeasure) -> f64 {
        let container_count = self
            .containers
            .iter()
            .filter(|c| !c.is_carrier() && c.uom() == uom)
            .count();
        self.quantity_of_uom(uom) + container_count as f64
    }

    /// Free space for one resource-unit, honoring the designation rule.
    ///
    /// Returns 0 when the unit of measure has no declared capacity, when
    /// admitting the resource-unit would exceed the distinct cap, or when
    /// the location is designated to other units of measure.
    pub fn space_for(&self, resource_unit: &ResourceUnit) -> f64 {
        let present = self.resource_units_present();
        if !present.contains(resource_unit)
            && present.len() + 1 > self.location.max_distinct_resource_units()
        {
            return 0.0;
        }

        let uoms = self.uoms_present();
        if !uoms.is_empty() && !uoms.contains(resource_unit.uom()) {
            return 0.0;
        }

        match self.location.capacity_for(resource_unit.uom()) {
            None => 0.0,
            Some(capacity) => (capacity - self.consumed_of_uom(resource_unit.uom())).max(0.0),
        }
    }

    /// The containers currently extractable under the channel discipline,
    /// in removal-priority order. Empty for merged-content locations,
    /// where content rather than containers is extractable.
    pub fn extractable_containers(&self) -> Vec<&Container> {
        let Some(discipline) = self.location.channel_discipline().discipline() else {
            return Vec::new();
        };
        if self.containers.is_empty() {
            return Vec::new();
        }

        let channel = Channel::with_items(
            discipline,
            self.containers.len(),
            self.containers.iter().map(|c| c.id().clone()),
        )
        .expect("held containers replay through their own discipline");

        channel
            .removable_items()
            .into_iter()
            .filter_map(|id| self.containers.iter().find(|c| c.id() == id))
            .collect()
    }

    /// The lots currently reachable for removal: every pool lot at a
    /// merged-content location, the lots of extractable containers
    /// elsewhere.
    pub fn extractable_lots(&self) -> Vec<&Content> {
        match &self.merged_pool {
            Some(pool) => pool.lots().iter().collect(),
            None => self
                .extractable_containers()
                .into_iter()
                .flat_map(|c| c.lots().iter())
                .collect(),
        }
    }

    /// Add a whole container.
    ///
    /// Validates the handling unit against the location capacities, the
    /// contained lots against whitelist/designation/capacity, and admits
    /// the container through the channel engine.
    ///
    /// # Errors
    ///
    /// `DisciplineForbidsOperation` at merged-content locations,
    /// `UnitOfMeasureMismatch`, `DesignationMismatch`, `NoRoomAtLocation`,
    /// or a channel rejection.
    pub fn add_container(&self, container: Container) -> Result<Self, InventoryError> {
        let location_id = self.location.id().clone();
        if self.location.channel_discipline().is_merged() {
            return Err(InventoryError::DisciplineForbidsOperation {
                location_id,
                discipline: self.location.channel_discipline(),
                operation: "adding whole containers".into(),
            });
        }

        let uom = container.uom().clone();
        let Some(capacity) = self.location.capacity_for(&uom) else {
            return Err(InventoryError::UnitOfMeasureMismatch { location_id, uom });
        };

        for lot in container.lots() {
            if !self.location.accepts_resource(lot.resource()) {
                return Err(InventoryError::DesignationMismatch {
                    location_id,
                    resource_unit: lot.resource_unit().clone(),
                    reason: "resource not in location whitelist".into(),
                });
            }
        }
        self.check_designation(container.lots().iter().map(Content::resource_unit))?;

        // lots inside the container consume location capacity where declared
        for (ru, qty) in container.quantities() {
            if let Some(lot_capacity) = self.location.capacity_for(ru.uom()) {
                let consumed = self.consumed_of_uom(ru.uom());
                if consumed + qty > lot_capacity + QTY_EPS {
                    return Err(InventoryError::NoRoomAtLocation {
                        location_id,
                        uom: ru.uom().clone(),
                        requested: qty,
                        available: (lot_capacity - consumed).max(0.0),
                    });
                }
            }
        }

        let slot_capacity = self.slot_capacity_for(&uom, capacity);
        let mut channel = self.container_channel(slot_capacity)?;
        channel
            .store([container.id().clone()])
            .map_err(|err| self.map_container_channel_error(err, &uom))?;

        let mut next = self.clone();
        next.containers.push(container);
        Ok(next)
    }

    /// Remove a whole container.
    ///
    /// # Errors
    ///
    /// `DisciplineForbidsOperation` at merged-content locations,
    /// `ContainerNotFound` for unknown identities, `NotExtractable` when
    /// the discipline does not currently release the container's position.
    pub fn remove_container(
        &self,
        container_id: &ContainerId,
    ) -> Result<(Self, Container), InventoryError> {
        let location_id = self.location.id().clone();
        if self.location.channel_discipline().is_merged() {
            return Err(InventoryError::DisciplineForbidsOperation {
                location_id,
                discipline: self.location.channel_discipline(),
                operation: "removing whole containers".into(),
            });
        }

        let index = self
            .containers
            .iter()
            .position(|c| c.id() == container_id)
            .ok_or_else(|| InventoryError::ContainerNotFound {
                location_id: location_id.clone(),
                container_id: container_id.clone(),
            })?;

        let mut channel = self.container_channel(self.containers.len())?;
        channel.remove([container_id.clone()]).map_err(|err| match err {
            ChannelError::ItemNotAccessible { .. } => InventoryError::NotExtractable {
                location_id: location_id.clone(),
                target: format!("container {container_id}"),
                extractable: self
                    .extractable_containers()
                    .into_iter()
                    .map(|c| c.id().clone())
                    .collect(),
            },
            other => InventoryError::Channel {
                location_id: location_id.clone(),
                source: other,
            },
        })?;

        let mut next = self.clone();
        let removed = next.containers.remove(index);
        Ok((next, removed))
    }

    /// Add loose content.
    ///
    /// Validates whitelist, unit-of-measure, designation, and capacity,
    /// then merges the lot into the pool (merged-content), into an
    /// existing carrier of the same resource-unit, or into a fresh carrier
    /// admitted through the channel engine.
    pub fn add_content(&self, content: Content) -> Result<Self, InventoryError> {
        self.admit_content_checks(&content)?;
        self.place_content(content)
    }

    /// Remove an exact quantity of one resource-unit, reconciling whole
    /// lots and honoring the channel discipline.
    ///
    /// Returns the new inventory and the removed content, whose quantity
    /// equals the request exactly.
    ///
    /// # Errors
    ///
    /// `MissingContent` when the location holds less than requested,
    /// `NotExtractable` when enough stock exists but the discipline does
    /// not release it, `ReconciliationMismatch` when the exactness
    /// post-condition fails (engine defect).
    pub fn remove_content(
        &self,
        resource_unit: &ResourceUnit,
        quantity: f64,
    ) -> Result<(Self, Content), InventoryError> {
        if !quantity.is_finite() || quantity <= 0.0 {
            return Err(ContentError::InvalidQuantity { qty: quantity }.into());
        }

        let location_id = self.location.id().clone();
        let available = self.quantity_of(resource_unit);
        if !qty_ge(available, quantity) {
            return Err(InventoryError::MissingContent {
                location_id,
                resource_unit: resource_unit.clone(),
                requested: quantity,
                available,
            });
        }

        let mut current = self.clone();
        let mut removed: Vec<Content> = Vec::new();
        let mut accumulated = 0.0;

        while !qty_ge(accumulated, quantity) {
            let Some((next, lot)) = current.take_extractable_lot(resource_unit)? else {
                return Err(InventoryError::NotExtractable {
                    location_id,
                    target: format!("{quantity} of {resource_unit}"),
                    extractable: current
                        .extractable_containers()
                        .into_iter()
                        .map(|c| c.id().clone())
                        .collect(),
                });
            };
            current = next;
            accumulated += lot.quantity();
            removed.push(lot);
        }

        let overshoot = accumulated - quantity;
        if overshoot > QTY_EPS {
            // the most-recently-removed lot always covers the overshoot
            let last = removed.pop().expect("at least one lot was removed");
            if qty_eq(last.quantity(), overshoot) {
                current = current.place_content(last)?;
            } else {
                let split_at = last.quantity() - overshoot;
                let (kept_out, put_back) = last.split(split_at)?;
                removed.push(kept_out);
                current = current.place_content(put_back)?;
            }
        }

        let delta = self.quantity_of(resource_unit) - current.quantity_of(resource_unit);
        if !qty_eq(delta, quantity) {
            tracing::error!(
                location = %location_id,
                resource_unit = %resource_unit,
                requested = quantity,
                actual = delta,
                "reconciliation exactness violated"
            );
            return Err(InventoryError::ReconciliationMismatch {
                location_id,
                resource_unit: resource_unit.clone(),
                requested: quantity,
                actual: delta,
            });
        }

        let content = merge_lots(removed)
            .into_iter()
            .next()
            .expect("removed lots merge to one lot of the requested resource-unit");

        debug!(
            location = %self.location.id(),
            resource_unit = %resource_unit,
            quantity,
            "content removed"
        );
        Ok((current, content))
    }

    /// Remove and return the first extractable lot of `resource_unit`,
    /// or `None` when the discipline releases no such lot.
    fn take_extractable_lot(
        &self,
        resource_unit: &ResourceUnit,
    ) -> Result<Option<(Self, Content)>, InventoryError> {
        if let Some(pool) = &self.merged_pool {
            let Some(lot) = pool
                .lots()
                .iter()
                .find(|lot| lot.matches_resource_unit(resource_unit))
                .cloned()
            else {
                return Ok(None);
            };
            let (next_pool, lot) = pool.remove_lot(lot.lot_id())?;
            let mut next = self.clone();
            next.merged_pool = Some(next_pool);
            return Ok(Some((next, lot)));
        }

        let candidate = self.extractable_containers().into_iter().find_map(|c| {
            c.lots()
                .iter()
                .find(|lot| lot.matches_resource_unit(resource_unit))
                .map(|lot| (c.id().clone(), lot.lot_id().clone(), c.lots().len(), c.is_carrier()))
        });
        let Some((container_id, lot_id, lot_count, is_carrier)) = candidate else {
            return Ok(None);
        };

        if is_carrier && lot_count == 1 {
            // emptied carriers leave through the engine so the lane flows
            let (next, carrier) = self.remove_container(&container_id)?;
            let lot = carrier.lots()[0].clone();
            Ok(Some((next, lot)))
        } else {
            let index = self
                .containers
                .iter()
                .position(|c| c.id() == &container_id)
                .expect("candidate came from the container sequence");
            let (next_container, lot) = self.containers[index].remove_lot(&lot_id)?;
            let mut next = self.clone();
            next.containers[index] = next_container;
            Ok(Some((next, lot)))
        }
    }

    /// Shared admission checks for loose content: whitelist, unit of
    /// measure, designation, and capacity headroom.
    fn admit_content_checks(&self, content: &Content) -> Result<(), InventoryError> {
        let location_id = self.location.id().clone();

        if !self.location.accepts_resource(content.resource()) {
            return Err(InventoryError::DesignationMismatch {
                location_id,
                resource_unit: content.resource_unit().clone(),
                reason: "resource not in location whitelist".into(),
            });
        }

        let uom = content.uom();
        let Some(capacity) = self.location.capacity_for(uom) else {
            return Err(InventoryError::UnitOfMeasureMismatch {
                location_id,
                uom: uom.clone(),
            });
        };

        self.check_designation([content.resource_unit()])?;

        let consumed = self.consumed_of_uom(uom);
        if consumed + content.quantity() > capacity + QTY_EPS {
            return Err(InventoryError::NoRoomAtLocation {
                location_id,
                uom: uom.clone(),
                requested: content.quantity(),
                available: (capacity - consumed).max(0.0),
            });
        }

        Ok(())
    }

    /// The designation rule: a non-empty location only accepts units of
    /// measure already present, and distinct resource-units up to the cap.
    fn check_designation<'a>(
        &self,
        incoming: impl IntoIterator<Item = &'a ResourceUnit>,
    ) -> Result<(), InventoryError> {
        let present_rus = self.resource_units_present();
        let present_uoms = self.uoms_present();
        let mut distinct = present_rus.clone();

        for resource_unit in incoming {
            if !present_uoms.is_empty() && !present_uoms.contains(resource_unit.uom()) {
                return Err(InventoryError::DesignationMismatch {
                    location_id: self.location.id().clone(),
                    resource_unit: resource_unit.clone(),
                    reason: format!(
                        "location is designated to units {:?}",
                        present_uoms.iter().map(UnitOfMeasure::name).collect::<Vec<_>>()
                    ),
                });
            }

            distinct.insert(resource_unit.clone());
            if distinct.len() > self.location.max_distinct_resource_units() {
                return Err(InventoryError::DesignationMismatch {
                    location_id: self.location.id().clone(),
                    resource_unit: resource_unit.clone(),
                    reason: format!(
                        "distinct resource-unit cap of {} reached",
                        self.location.max_distinct_resource_units()
                    ),
                });
            }
        }

        Ok(())
    }

    /// Physical placement of admitted content, without re-running the
    /// admission checks. Reconciliation put-backs use this directly: a
    /// put-back restores prior state and must not trip the designation
    /// rule when its resource-unit was just drained.
    fn place_content(&self, content: Content) -> Result<Self, InventoryError> {
        if let Some(pool) = &self.merged_pool {
            let next_pool = pool.add_lot(content)?;
            let mut next = self.clone();
            next.merged_pool = Some(next_pool);
            return Ok(next);
        }

        let existing = self.containers.iter().position(|c| {
            c.is_carrier()
                && c.lots()
                    .iter()
                    .any(|lot| lot.resource_unit() == content.resource_unit())
        });

        match existing {
            Some(index) => {
                let next_container = self.containers[index].add_lot(content)?;
                let mut next = self.clone();
                next.containers[index] = next_container;
                Ok(next)
            }
            None => self.place_in_new_carrier(content),
        }
    }

    /// Wrap `content` in a fresh carrier and admit it through the engine.
    fn place_in_new_carrier(&self, content: Content) -> Result<Self, InventoryError> {
        let discipline = self
            .location
            .channel_discipline()
            .discipline()
            .expect("discrete-container locations carry an engine discipline");

        let carrier = Container::carrier(
            ContainerId::generate(),
            self.location.capacities().to_vec(),
        )
        .add_lot(content)?;

        // carriers consume no unit capacity; the lane only needs one more slot
        let mut channel = Channel::with_items(
            discipline,
            self.containers.len() + 1,
            self.containers.iter().map(|c| c.id().clone()),
        )
        .expect("held containers replay through their own discipline");
        channel
            .store([carrier.id().clone()])
            .map_err(|err| InventoryError::Channel {
                location_id: self.location.id().clone(),
                source: err,
            })?;

        let mut next = self.clone();
        next.containers.push(carrier);
        Ok(next)
    }

    /// The slot-array capacity for admitting a container of `uom`: the
    /// unit's declared capacity plus every held container of another
    /// handling unit (those occupy lane slots without consuming this
    /// unit's capacity).
    fn slot_capacity_for(&self, uom: &UnitOfMeasure, capacity: f64) -> usize {
        let other_uom_containers = self
            .containers
            .iter()
            .filter(|c| c.uom() != uom)
            .count();
        capacity.floor() as usize + other_uom_containers
    }

    fn container_channel(&self, capacity: usize) -> Result<Channel<ContainerId>, InventoryError> {
        Channel::with_items(
            self.location
                .channel_discipline()
                .discipline()
                .expect("discrete-container locations carry an engine discipline"),
            // replaying the held containers themselves can never be the
            // failure: a full lane rejects at the subsequent store
            capacity.max(self.containers.len()),
            self.containers.iter().map(|c| c.id().clone()),
        )
        .map_err(|err| InventoryError::Channel {
            location_id: self.location.id().clone(),
            source: err,
        })
    }

    fn map_container_channel_error(&self, err: ChannelError, uom: &UnitOfMeasure) -> InventoryError {
        match err {
            ChannelError::NoRoom { .. } => InventoryError::NoRoomAtLocation {
                location_id: self.location.id().clone(),
                uom: uom.clone(),
                requested: 1.0,
                available: 0.0,
            },
            other => InventoryError::Channel {
                location_id: self.location.id().clone(),
                source: other,
            },
        }
    }
}

impl fmt::Display for LocationInventory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let quantities = self.quantities();
        write!(f, "{}: {{", self.location.id())?;
        for (i, (ru, qty)) in quantities.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{ru}: {qty}")?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Capacity, Resource};
    use crate::channel::Discipline;

    fn each() -> UnitOfMeasure {
        UnitOfMeasure::new("EACH").unwrap()
    }

    fn pallet() -> UnitOfMeasure {
        UnitOfMeasure::new("PALLET").unwrap()
    }

    fn ru(name: &str) -> ResourceUnit {
        ResourceUnit::new(Resource::new(name, "test resource").unwrap(), each())
    }

    fn lot(name: &str, qty: f64) -> Content {
        Content::new(ru(name), qty).unwrap()
    }

    fn each_location(id: &str, capacity: f64) -> Location {
        Location::new(LocationId::new(id).unwrap())
            .with_capacity(Capacity::new(each(), capacity).unwrap())
    }

    mod construction {
        use super::*;

        #[test]
        fn empty_inventory_is_undesignated() {
            let inv = LocationInventory::for_location(each_location("A-01", 10.0));
            assert!(!inv.occupied());
            assert!(inv.uoms_present().is_empty());
            assert!(inv.containers().is_empty());
            assert!(inv.merged_pool().is_none());
        }

        #[test]
        fn merged_location_gets_a_pool() {
            let location = each_location("A-01", 10.0)
                .with_discipline(ChannelDiscipline::MergedContent);
            let inv = LocationInventory::for_location(location);
            assert!(inv.merged_pool().is_some());
            assert!(inv.containers().is_empty());
        }

        #[test]
        fn with_lots_keeps_lot_boundaries() {
            let inv = LocationInventory::with_lots(
                each_location("A-01", 10.0).with_max_distinct_resource_units(2),
                [lot("sku_a", 1.0), lot("sku_a", 1.0)],
            )
            .unwrap();
            assert_eq!(inv.containers().len(), 2);
            assert_eq!(inv.quantity_of(&ru("sku_a")), 2.0);
        }
    }

    mod add_content {
        use super::*;

        #[test]
        fn same_resource_unit_merges_into_carrier() {
            let inv = LocationInventory::for_location(each_location("A-01", 20.0))
                .add_content(lot("sku_a", 10.0))
                .unwrap();
            let next = inv.add_content(lot("sku_a", 10.0)).unwrap();

            assert_eq!(next.containers().len(), inv.containers().len());
            assert_eq!(next.quantity_of(&ru("sku_a")), 20.0);
        }

        #[test]
        fn same_resource_unit_over_capacity_rejected() {
            let inv = LocationInventory::for_location(each_location("A-01", 20.0))
                .add_content(lot("sku_a", 10.0))
                .unwrap();
            let err = inv.add_content(lot("sku_a", 20.0)).unwrap_err();
            assert!(matches!(err, InventoryError::NoRoomAtLocation { .. }));
            // unchanged on error
            assert_eq!(inv.quantity_of(&ru("sku_a")), 10.0);
        }

        #[test]
        fn different_resource_unit_gets_its_own_carrier() {
            let location = each_location("A-01", 20.0).with_max_distinct_resource_units(2);
            let inv = LocationInventory::for_location(location)
                .add_content(lot("sku_a", 10.0))
                .unwrap();
            let next = inv.add_content(lot("sku_b", 10.0)).unwrap();

            assert_eq!(next.containers().len(), inv.containers().len() + 1);
            assert_eq!(next.quantity_of(&ru("sku_b")), 10.0);
        }

        #[test]
        fn different_resource_unit_over_capacity_rejected() {
            let location = each_location("A-01", 20.0).with_max_distinct_resource_units(2);
            let inv = LocationInventory::for_location(location)
                .add_content(lot("sku_a", 10.0))
                .unwrap();
            let err = inv.add_content(lot("sku_b", 20.0)).unwrap_err();
            assert!(matches!(err, InventoryError::NoRoomAtLocation { .. }));
        }

        #[test]
        fn undeclared_uom_rejected() {
            let inv = LocationInventory::for_location(each_location("A-01", 20.0));
            let bottle = UnitOfMeasure::new("BOTTLE").unwrap();
            let content = Content::new(
                ResourceUnit::new(Resource::new("sku_a", "x").unwrap(), bottle),
                1.0,
            )
            .unwrap();
            let err = inv.add_content(content).unwrap_err();
            assert!(matches!(err, InventoryError::UnitOfMeasureMismatch { .. }));
        }

        #[test]
        fn whitelist_rejects_foreign_resource() {
            let location = each_location("A-01", 20.0)
                .with_whitelist([Resource::new("sku_a", "allowed").unwrap()]);
            let inv = LocationInventory::for_location(location);
            let err = inv.add_content(lot("sku_b", 1.0)).unwrap_err();
            assert!(matches!(err, InventoryError::DesignationMismatch { .. }));
        }
    }

    mod designation {
        use super::*;

        #[test]
        fn single_designation_scenario() {
            // capacity-10 each location, designated by first add
            let inv = LocationInventory::for_location(each_location("A-01", 10.0));

            let inv = inv.add_content(lot("sku_a", 4.0)).unwrap();
            assert_eq!(inv.quantity_of(&ru("sku_a")), 4.0);

            let inv = inv.add_content(lot("sku_a", 4.0)).unwrap();
            assert_eq!(inv.quantity_of(&ru("sku_a")), 8.0);

            let err = inv.add_content(lot("sku_b", 3.0)).unwrap_err();
            assert!(matches!(err, InventoryError::DesignationMismatch { .. }));

            let (inv, removed) = inv.remove_content(&ru("sku_a"), 3.0).unwrap();
            assert_eq!(removed.quantity(), 3.0);
            assert_eq!(inv.quantity_of(&ru("sku_a")), 5.0);
        }

        #[test]
        fn designation_clears_when_emptied() {
            let inv = LocationInventory::for_location(each_location("A-01", 10.0))
                .add_content(lot("sku_a", 4.0))
                .unwrap();
            let (inv, _) = inv.remove_content(&ru("sku_a"), 4.0).unwrap();
            assert!(!inv.occupied());

            // undesignated again: a different resource-unit is welcome
            assert!(inv.add_content(lot("sku_b", 2.0)).is_ok());
        }

        #[test]
        fn foreign_uom_rejected_even_within_cap() {
            let box_ = UnitOfMeasure::new("BOX").unwrap();
            let location = each_location("A-01", 10.0)
                .with_capacity(Capacity::new(box_.clone(), 5.0).unwrap())
                .with_max_distinct_resource_units(3);
            let inv = LocationInventory::for_location(location)
                .add_content(lot("sku_a", 2.0))
                .unwrap();

            let boxed = Content::new(
                ResourceUnit::new(Resource::new("sku_b", "x").unwrap(), box_),
                1.0,
            )
            .unwrap();
            let err = inv.add_content(boxed).unwrap_err();
            assert!(matches!(err, InventoryError::DesignationMismatch { .. }));
        }

        #[test]
        fn space_for_respects_distinct_cap() {
            let inv = LocationInventory::for_location(each_location("A-01", 10.0))
                .add_content(lot("sku_a", 4.0))
                .unwrap();
            assert_eq!(inv.space_for(&ru("sku_a")), 6.0);
            assert_eq!(inv.space_for(&ru("sku_b")), 0.0);
        }
    }

    mod reconciliation {
        use super::*;

        #[test]
        fn splits_across_lot_boundary() {
            let inv = LocationInventory::with_lots(
                each_location("A-01", 20.0),
                [lot("sku_a", 4.0), lot("sku_a", 4.0)],
            )
            .unwrap();

            let (next, removed) = inv.remove_content(&ru("sku_a"), 5.0).unwrap();
            assert_eq!(removed.quantity(), 5.0);
            assert_eq!(next.quantity_of(&ru("sku_a")), 3.0);
        }

        #[test]
        fn whole_lot_removed_without_split() {
            let inv = LocationInventory::with_lots(
                each_location("A-01", 20.0),
                [lot("sku_a", 4.0), lot("sku_a", 4.0)],
            )
            .unwrap();

            let (next, removed) = inv.remove_content(&ru("sku_a"), 4.0).unwrap();
            assert_eq!(removed.quantity(), 4.0);
            assert_eq!(next.quantity_of(&ru("sku_a")), 4.0);
            // one carrier left untouched
            assert_eq!(next.containers().len(), 1);
        }

        #[test]
        fn more_than_held_rejected() {
            let inv = LocationInventory::with_lots(each_location("A-01", 20.0), [lot("sku_a", 4.0)])
                .unwrap();
            let err = inv.remove_content(&ru("sku_a"), 5.0).unwrap_err();
            assert!(matches!(err, InventoryError::MissingContent { .. }));
        }

        #[test]
        fn fifo_releases_oldest_lot_first() {
            let location = each_location("A-01", 20.0)
                .with_discipline(ChannelDiscipline::Containers(Discipline::Fifo))
                .with_max_distinct_resource_units(2);
            let inv = LocationInventory::with_lots(
                location,
                [lot("sku_a", 2.0), lot("sku_b", 3.0)],
            )
            .unwrap();

            // sku_b sits behind sku_a in the lane
            let err = inv.remove_content(&ru("sku_b"), 1.0).unwrap_err();
            assert!(matches!(err, InventoryError::NotExtractable { .. }));

            let (next, _) = inv.remove_content(&ru("sku_a"), 2.0).unwrap();
            assert!(next.remove_content(&ru("sku_b"), 1.0).is_ok());
        }

        #[test]
        fn round_trip_restores_quantities() {
            let inv = LocationInventory::for_location(each_location("A-01", 10.0));
            let with = inv.add_content(lot("sku_a", 7.0)).unwrap();
            let (after, _) = with.remove_content(&ru("sku_a"), 7.0).unwrap();
            assert_eq!(after.quantity_of(&ru("sku_a")), inv.quantity_of(&ru("sku_a")));
            assert!(!after.occupied());
        }
    }

    mod merged_pool {
        use super::*;

        fn merged_location(id: &str, capacity: f64) -> Location {
            each_location(id, capacity).with_discipline(ChannelDiscipline::MergedContent)
        }

        #[test]
        fn content_merges_into_pool() {
            let inv = LocationInventory::for_location(merged_location("A-01", 20.0))
                .add_content(lot("sku_a", 4.0))
                .unwrap()
                .add_content(lot("sku_a", 6.0))
                .unwrap();
            assert_eq!(inv.merged_pool().unwrap().lots().len(), 1);
            assert_eq!(inv.quantity_of(&ru("sku_a")), 10.0);
        }

        #[test]
        fn removal_reconciles_from_pool() {
            let inv = LocationInventory::for_location(merged_location("A-01", 20.0))
                .add_content(lot("sku_a", 10.0))
                .unwrap();
            let (next, removed) = inv.remove_content(&ru("sku_a"), 3.5).unwrap();
            assert_eq!(removed.quantity(), 3.5);
            assert_eq!(next.quantity_of(&ru("sku_a")), 6.5);
        }

        #[test]
        fn container_operations_forbidden() {
            let inv = LocationInventory::for_location(merged_location("A-01", 20.0));
            let tote = Container::new(
                ContainerId::new("TOTE-1").unwrap(),
                each(),
                vec![],
            );
            let err = inv.add_container(tote).unwrap_err();
            assert!(matches!(
                err,
                InventoryError::DisciplineForbidsOperation { .. }
            ));

            let err = inv
                .remove_container(&ContainerId::new("TOTE-1").unwrap())
                .unwrap_err();
            assert!(matches!(
                err,
                InventoryError::DisciplineForbidsOperation { .. }
            ));
        }
    }

    mod containers {
        use super::*;

        fn pallet_location(id: &str, slots: f64) -> Location {
            Location::new(LocationId::new(id).unwrap())
                .with_capacity(Capacity::new(pallet(), slots).unwrap())
                .with_discipline(ChannelDiscipline::Containers(Discipline::Fifo))
        }

        fn pallet_container(id: &str) -> Container {
            Container::new(
                ContainerId::new(id).unwrap(),
                pallet(),
                vec![Capacity::new(each(), 50.0).unwrap()],
            )
        }

        #[test]
        fn fifo_flow_scenario() {
            let inv = LocationInventory::with_containers(
                pallet_location("L-01", 3.0),
                [pallet_container("c1"), pallet_container("c2")],
            )
            .unwrap();

            let c2 = ContainerId::new("c2").unwrap();
            let err = inv.remove_container(&c2).unwrap_err();
            assert!(matches!(err, InventoryError::NotExtractable { .. }));

            let c1 = ContainerId::new("c1").unwrap();
            let (next, removed) = inv.remove_container(&c1).unwrap();
            assert_eq!(removed.id(), &c1);
            assert_eq!(next.containers().len(), 1);
            assert_eq!(next.containers()[0].id(), &c2);
            // c2 flowed forward: now extractable
            assert!(next.remove_container(&c2).is_ok());
        }

        #[test]
        fn container_capacity_is_count_based() {
            let inv = LocationInventory::with_containers(
                pallet_location("L-01", 2.0),
                [pallet_container("c1"), pallet_container("c2")],
            )
            .unwrap();

            let err = inv.add_container(pallet_container("c3")).unwrap_err();
            assert!(matches!(err, InventoryError::NoRoomAtLocation { .. }));
        }

        #[test]
        fn unknown_container_not_found() {
            let inv = LocationInventory::for_location(pallet_location("L-01", 2.0));
            let err = inv
                .remove_container(&ContainerId::new("ghost").unwrap())
                .unwrap_err();
            assert!(matches!(err, InventoryError::ContainerNotFound { .. }));
        }

        #[test]
        fn undeclared_container_uom_rejected() {
            let inv = LocationInventory::for_location(each_location("A-01", 10.0));
            let tote = Container::new(
                ContainerId::new("TOTE-1").unwrap(),
                UnitOfMeasure::new("TOTE").unwrap(),
                vec![],
            );
            let err = inv.add_container(tote).unwrap_err();
            assert!(matches!(err, InventoryError::UnitOfMeasureMismatch { .. }));
        }

        #[test]
        fn contained_lots_designate_the_location() {
            let location = pallet_location("L-01", 3.0)
                .with_capacity(Capacity::new(each(), 100.0).unwrap());
            let loaded = pallet_container("c1").add_lot(lot("sku_a", 5.0)).unwrap();
            let inv = LocationInventory::with_containers(location, [loaded]).unwrap();

            assert_eq!(inv.quantity_of(&ru("sku_a")), 5.0);
            let also_loaded = pallet_container("c2").add_lot(lot("sku_b", 5.0)).unwrap();
            let err = inv.add_container(also_loaded).unwrap_err();
            assert!(matches!(err, InventoryError::DesignationMismatch { .. }));
        }
    }
}
