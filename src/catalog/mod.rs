//! catalog
//!
//! Strong types for the storage catalog.
//!
//! # Types
//!
//! - [`UnitOfMeasure`] - A handling unit (each, box, pallet, ...)
//! - [`Resource`] - A stock-keeping resource
//! - [`ResourceUnit`] - The (resource, unit-of-measure) pair tracked everywhere
//! - [`Capacity`] - A per-unit-of-measure quantity bound
//! - [`LocationId`], [`ContainerId`], [`LotId`], [`StateId`] - Validated identifiers
//!
//! # Identity
//!
//! Catalog values carry descriptive payload next to their identity fields.
//! Equality, hashing, and ordering are defined over identity only:
//! a [`UnitOfMeasure`] is its name, a [`Resource`] is its (name, category)
//! pair. This keeps them usable as map keys while the payload fields stay
//! replaceable.
//!
//! # Validation
//!
//! Construction rejects invalid values up-front, so invalid catalog entries
//! cannot be represented downstream.
//!
//! # Examples
//!
//! ```
//! use stowage::catalog::{Capacity, Resource, ResourceUnit, UnitOfMeasure};
//!
//! let each = UnitOfMeasure::new("EACH").unwrap().with_each_qty(1.0);
//! let sku = Resource::new("sku_a", "a widget").unwrap();
//! let ru = ResourceUnit::new(sku, each.clone());
//! let cap = Capacity::new(each, 100.0).unwrap();
//!
//! assert_eq!(ru.uom().name(), "EACH");
//! assert_eq!(cap.max_qty(), 100.0);
//!
//! // Invalid constructions fail at creation time
//! assert!(UnitOfMeasure::new("").is_err());
//! assert!(Capacity::new(ru.uom().clone(), -1.0).is_err());
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from catalog type validation.
#[derive(Debug, Error, PartialEq)]
pub enum CatalogError {
    #[error("invalid name: {0}")]
    InvalidName(String),

    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("invalid quantity {qty}: {reason}")]
    InvalidQuantity { qty: f64, reason: String },
}

/// Validate a human-assigned name or identifier.
///
/// Names must be non-empty and free of ASCII control characters.
fn validate_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("cannot be empty".into());
    }
    if name.chars().any(|c| c.is_ascii_control()) {
        return Err("cannot contain control characters".into());
    }
    Ok(())
}

macro_rules! identifier_type {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Create a new validated identifier.
            ///
            /// # Errors
            ///
            /// Returns `CatalogError::InvalidId` if the value is empty or
            /// contains control characters.
            pub fn new(id: impl Into<String>) -> Result<Self, CatalogError> {
                let id = id.into();
                validate_name(&id).map_err(CatalogError::InvalidId)?;
                Ok(Self(id))
            }

            /// Generate a fresh UUID-backed identifier.
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            /// Get the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = CatalogError;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                Self::new(s)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

identifier_type! {
    /// A validated storage location identifier.
    LocationId
}

identifier_type! {
    /// A validated container identifier (license plate number).
    ContainerId
}

identifier_type! {
    /// The unique identity of a content lot.
    ///
    /// Lot identity exists for bookkeeping only; business comparisons are
    /// keyed on [`ResourceUnit`], never on lot identity.
    LotId
}

identifier_type! {
    /// The identity of a [`crate::state::StorageState`] snapshot.
    StateId
}

/// A handling unit of measure.
///
/// Identity is the `name`; the remaining fields are descriptive payload
/// used by callers that reason about physical handling (each-quantity,
/// dimensions, nesting, stacking) and do not participate in equality.
///
/// # Example
///
/// ```
/// use stowage::catalog::UnitOfMeasure;
///
/// let pallet = UnitOfMeasure::new("PALLET")
///     .unwrap()
///     .with_dimensions([1.2, 1.0, 1.5])
///     .with_max_stack(2);
///
/// assert_eq!(pallet.name(), "PALLET");
/// assert_eq!(pallet.max_stack(), Some(2));
///
/// // Identity ignores payload
/// let bare = UnitOfMeasure::new("PALLET").unwrap();
/// assert_eq!(pallet, bare);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitOfMeasure {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    each_qty: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    dimensions: Option<[f64; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    nesting_factor: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_stack: Option<u32>,
}

impl UnitOfMeasure {
    /// Create a new unit of measure.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::InvalidName` for empty names or names with
    /// control characters.
    pub fn new(name: impl Into<String>) -> Result<Self, CatalogError> {
        let name = name.into();
        validate_name(&name).map_err(CatalogError::InvalidName)?;
        Ok(Self {
            name,
            each_qty: None,
            dimensions: None,
            nesting_factor: None,
            max_stack: None,
        })
    }

    /// Set the eaches-per-unit conversion quantity.
    pub fn with_each_qty(mut self, each_qty: f64) -> Self {
        self.each_qty = Some(each_qty);
        self
    }

    /// Set the physical dimensions (x, y, z).
    pub fn with_dimensions(mut self, dimensions: [f64; 3]) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    /// Set the nesting factor for empty-unit storage.
    pub fn with_nesting_factor(mut self, nesting_factor: f64) -> Self {
        self.nesting_factor = Some(nesting_factor);
        self
    }

    /// Set the maximum stacking count.
    pub fn with_max_stack(mut self, max_stack: u32) -> Self {
        self.max_stack = Some(max_stack);
        self
    }

    /// The unit name (identity).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The eaches-per-unit conversion quantity, if declared.
    pub fn each_qty(&self) -> Option<f64> {
        self.each_qty
    }

    /// The physical dimensions, if declared.
    pub fn dimensions(&self) -> Option<[f64; 3]> {
        self.dimensions
    }

    /// The nesting factor, if declared.
    pub fn nesting_factor(&self) -> Option<f64> {
        self.nesting_factor
    }

    /// The maximum stacking count, if declared.
    pub fn max_stack(&self) -> Option<u32> {
        self.max_stack
    }
}

impl PartialEq for UnitOfMeasure {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for UnitOfMeasure {}

impl Hash for UnitOfMeasure {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl PartialOrd for UnitOfMeasure {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for UnitOfMeasure {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name.cmp(&other.name)
    }
}

impl fmt::Display for UnitOfMeasure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Broad resource classification.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceCategory {
    #[default]
    Default,
    Raw,
    Finished,
}

/// A stock-keeping resource.
///
/// Identity is the `(name, category)` pair; the description is payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    name: String,
    description: String,
    #[serde(default)]
    category: ResourceCategory,
}

impl Resource {
    /// Create a resource in the default category.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::InvalidName` for invalid names.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Result<Self, CatalogError> {
        Self::with_category(name, description, ResourceCategory::Default)
    }

    /// Create a resource in an explicit category.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::InvalidName` for invalid names.
    pub fn with_category(
        name: impl Into<String>,
        description: impl Into<String>,
        category: ResourceCategory,
    ) -> Result<Self, CatalogError> {
        let name = name.into();
        validate_name(&name).map_err(CatalogError::InvalidName)?;
        Ok(Self {
            name,
            description: description.into(),
            category,
        })
    }

    /// The resource name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The free-form description (payload, not identity).
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The resource category.
    pub fn category(&self) -> ResourceCategory {
        self.category
    }
}

impl PartialEq for Resource {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.category == other.category
    }
}

impl Eq for Resource {}

impl Hash for Resource {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.category.hash(state);
    }
}

impl PartialOrd for Resource {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Resource {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name
            .cmp(&other.name)
            .then_with(|| self.category.cmp(&other.category))
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// The stock-keeping granularity: a resource in a unit of measure.
///
/// Everything downstream (quantities, designations, allocation searches)
/// is keyed on this pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceUnit {
    resource: Resource,
    uom: UnitOfMeasure,
}

impl ResourceUnit {
    /// Pair a resource with a unit of measure.
    pub fn new(resource: Resource, uom: UnitOfMeasure) -> Self {
        Self { resource, uom }
    }

    /// The resource half of the pair.
    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    /// The unit-of-measure half of the pair.
    pub fn uom(&self) -> &UnitOfMeasure {
        &self.uom
    }
}

impl fmt::Display for ResourceUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.resource, self.uom)
    }
}

/// A quantity bound for one unit of measure.
///
/// # Example
///
/// ```
/// use stowage::catalog::{Capacity, UnitOfMeasure};
///
/// let each = UnitOfMeasure::new("EACH").unwrap();
/// let cap = Capacity::new(each, 100.0).unwrap();
/// assert_eq!(cap.uom().name(), "EACH");
///
/// // Negative and non-finite bounds are rejected
/// let each = cap.uom().clone();
/// assert!(Capacity::new(each.clone(), -5.0).is_err());
/// assert!(Capacity::new(each, f64::NAN).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Capacity {
    uom: UnitOfMeasure,
    max_qty: f64,
}

impl Capacity {
    /// Create a capacity bound.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::InvalidQuantity` if `max_qty` is negative or
    /// not finite.
    pub fn new(uom: UnitOfMeasure, max_qty: f64) -> Result<Self, CatalogError> {
        if !max_qty.is_finite() {
            return Err(CatalogError::InvalidQuantity {
                qty: max_qty,
                reason: "capacity must be finite".into(),
            });
        }
        if max_qty < 0.0 {
            return Err(CatalogError::InvalidQuantity {
                qty: max_qty,
                reason: "capacity cannot be negative".into(),
            });
        }
        Ok(Self { uom, max_qty })
    }

    /// The bounded unit of measure.
    pub fn uom(&self) -> &UnitOfMeasure {
        &self.uom
    }

    /// The maximum quantity of that unit.
    pub fn max_qty(&self) -> f64 {
        self.max_qty
    }
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}<={}", self.uom, self.max_qty)
    }
}
