//! location
//!
//! The storage location entity.
//!
//! # Identity and payload
//!
//! A [`Location`] is an entity: a stable [`LocationId`] plus a value
//! payload (capacities, whitelist, discipline, coordinates) that is only
//! ever replaced wholesale. The adjustment helpers return a new value;
//! nothing is mutated in place. Locations live in id-keyed maps and are
//! updated by replacement.
//!
//! # Channel discipline
//!
//! [`ChannelDiscipline`] selects how the location holds stock: discrete
//! containers ordered by a [`Discipline`] from the channel engine, or a
//! single merged content pool. The engine's strategies are the only place
//! discipline-specific branching lives; a location just names which one
//! applies.
//!
//! # Example
//!
//! ```
//! use stowage::catalog::{Capacity, LocationId, UnitOfMeasure};
//! use stowage::channel::Discipline;
//! use stowage::location::{ChannelDiscipline, Location};
//!
//! let each = UnitOfMeasure::new("EACH").unwrap();
//! let loc = Location::new(LocationId::new("A-01").unwrap())
//!     .with_capacity(Capacity::new(each.clone(), 100.0).unwrap())
//!     .with_discipline(ChannelDiscipline::Containers(Discipline::Fifo));
//!
//! assert_eq!(loc.capacity_for(&each), Some(100.0));
//! assert_eq!(loc.max_distinct_resource_units(), 1);
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::{Capacity, LocationId, Resource, UnitOfMeasure};
use crate::channel::Discipline;

/// Errors from location construction.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LocationError {
    /// A channel-discipline string did not match any known discipline.
    #[error("unknown channel discipline: {0}")]
    UnknownDiscipline(String),
}

/// How a location holds and releases stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ChannelDiscipline {
    /// Discrete whole containers, ordered by the channel engine.
    Containers(Discipline),
    /// A single undifferentiated pool of merged lots.
    MergedContent,
}

impl ChannelDiscipline {
    /// The engine discipline for container ordering, if applicable.
    pub fn discipline(&self) -> Option<Discipline> {
        match self {
            Self::Containers(discipline) => Some(*discipline),
            Self::MergedContent => None,
        }
    }

    /// Whether this location merges loose content into one pool.
    pub fn is_merged(&self) -> bool {
        matches!(self, Self::MergedContent)
    }
}

impl Default for ChannelDiscipline {
    fn default() -> Self {
        Self::Containers(Discipline::AllAccessible)
    }
}

impl FromStr for ChannelDiscipline {
    type Err = LocationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "merged-content" => Ok(Self::MergedContent),
            "all-accessible" => Ok(Self::Containers(Discipline::AllAccessible)),
            "all-accessible-flow" => Ok(Self::Containers(Discipline::AllAccessibleFlow)),
            "all-accessible-flow-backward" => {
                Ok(Self::Containers(Discipline::AllAccessibleFlowBackward))
            }
            "fifo" => Ok(Self::Containers(Discipline::Fifo)),
            "fifo-backward" => Ok(Self::Containers(Discipline::FifoBackward)),
            "lifo" => Ok(Self::Containers(Discipline::Lifo)),
            "lifo-backward" => Ok(Self::Containers(Discipline::LifoBackward)),
            "omni" => Ok(Self::Containers(Discipline::Omni)),
            other => Err(LocationError::UnknownDiscipline(other.to_string())),
        }
    }
}

impl TryFrom<String> for ChannelDiscipline {
    type Error = LocationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ChannelDiscipline> for String {
    fn from(discipline: ChannelDiscipline) -> Self {
        discipline.to_string()
    }
}

impl fmt::Display for ChannelDiscipline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MergedContent => write!(f, "merged-content"),
            Self::Containers(discipline) => write!(f, "{discipline}"),
        }
    }
}

/// A storage location.
///
/// Capacities bound the aggregate quantity of each unit of measure the
/// location may hold. An empty whitelist accepts every resource. The
/// distinct-resource-unit cap drives the designation rule: a non-empty
/// location only accepts resource-units already present, up to the cap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    id: LocationId,
    #[serde(default)]
    capacities: Vec<Capacity>,
    #[serde(default)]
    resource_whitelist: BTreeSet<Resource>,
    #[serde(default)]
    channel_discipline: ChannelDiscipline,
    #[serde(default = "default_max_distinct")]
    max_distinct_resource_units: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    coordinates: Option<[f64; 3]>,
}

fn default_max_distinct() -> usize {
    1
}

impl Location {
    /// Create a location with no capacities, an open whitelist, the
    /// default all-accessible discipline, and a distinct-resource-unit cap
    /// of 1.
    pub fn new(id: LocationId) -> Self {
        Self {
            id,
            capacities: Vec::new(),
            resource_whitelist: BTreeSet::new(),
            channel_discipline: ChannelDiscipline::default(),
            max_distinct_resource_units: default_max_distinct(),
            coordinates: None,
        }
    }

    /// Add or replace the capacity for one unit of measure.
    pub fn with_capacity(mut self, capacity: Capacity) -> Self {
        self.capacities.retain(|c| c.uom() != capacity.uom());
        self.capacities.push(capacity);
        self
    }

    /// Restrict the location to a set of resources.
    pub fn with_whitelist(mut self, resources: impl IntoIterator<Item = Resource>) -> Self {
        self.resource_whitelist = resources.into_iter().collect();
        self
    }

    /// Set the channel discipline.
    pub fn with_discipline(mut self, discipline: ChannelDiscipline) -> Self {
        self.channel_discipline = discipline;
        self
    }

    /// Set the distinct-resource-unit cap.
    pub fn with_max_distinct_resource_units(mut self, cap: usize) -> Self {
        self.max_distinct_resource_units = cap;
        self
    }

    /// Set physical coordinates.
    pub fn with_coordinates(mut self, coordinates: [f64; 3]) -> Self {
        self.coordinates = Some(coordinates);
        self
    }

    /// The stable identity.
    pub fn id(&self) -> &LocationId {
        &self.id
    }

    /// The declared capacities.
    pub fn capacities(&self) -> &[Capacity] {
        &self.capacities
    }

    /// The capacity bound for `uom`, if declared.
    pub fn capacity_for(&self, uom: &UnitOfMeasure) -> Option<f64> {
        self.capacities
            .iter()
            .find(|c| c.uom() == uom)
            .map(Capacity::max_qty)
    }

    /// Whether `uom` is among the declared capacities.
    pub fn handles_uom(&self, uom: &UnitOfMeasure) -> bool {
        self.capacity_for(uom).is_some()
    }

    /// The resource whitelist. Empty means unrestricted.
    pub fn resource_whitelist(&self) -> &BTreeSet<Resource> {
        &self.resource_whitelist
    }

    /// Whether `resource` is admitted by the whitelist.
    pub fn accepts_resource(&self, resource: &Resource) -> bool {
        self.resource_whitelist.is_empty() || self.resource_whitelist.contains(resource)
    }

    /// The channel discipline.
    pub fn channel_discipline(&self) -> ChannelDiscipline {
        self.channel_discipline
    }

    /// The distinct-resource-unit cap.
    pub fn max_distinct_resource_units(&self) -> usize {
        self.max_distinct_resource_units
    }

    /// Physical coordinates, if set.
    pub fn coordinates(&self) -> Option<[f64; 3]> {
        self.coordinates
    }

    /// New location value with `new_capacities` added, replacing any
    /// existing capacity of the same unit of measure.
    pub fn add_capacities(&self, new_capacities: impl IntoIterator<Item = Capacity>) -> Self {
        new_capacities
            .into_iter()
            .fold(self.clone(), |loc, cap| loc.with_capacity(cap))
    }

    /// New location value with the capacities for `uoms` removed.
    pub fn remove_capacities(&self, uoms: &[UnitOfMeasure]) -> Self {
        let mut next = self.clone();
        next.capacities.retain(|c| !uoms.contains(c.uom()));
        next
    }

    /// New location value with `resources` added to the whitelist.
    pub fn add_whitelist(&self, resources: impl IntoIterator<Item = Resource>) -> Self {
        let mut next = self.clone();
        next.resource_whitelist.extend(resources);
        next
    }

    /// New location value with `resources` removed from the whitelist.
    pub fn remove_whitelist(&self, resources: &[Resource]) -> Self {
        let mut next = self.clone();
        for resource in resources {
            next.resource_whitelist.remove(resource);
        }
        next
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.id, self.channel_discipline)
    }
}
