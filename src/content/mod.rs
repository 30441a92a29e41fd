//! content
//!
//! Immutable content lots and lot arithmetic.
//!
//! A [`Content`] is a discrete quantity of one resource-unit with a unique
//! lot identity. Lots never mutate: merging and splitting produce new lots
//! with fresh identities, and a lot with zero quantity cannot exist.
//!
//! Business comparisons (filtering, aggregation) are keyed on the
//! resource-unit, never on lot identity - lot identity exists so a specific
//! physical lot can be tracked through add/remove bookkeeping.
//!
//! # Example
//!
//! ```
//! use stowage::catalog::{Resource, ResourceUnit, UnitOfMeasure};
//! use stowage::content::{merge_lots, Content};
//!
//! let each = UnitOfMeasure::new("EACH").unwrap();
//! let ru = ResourceUnit::new(Resource::new("sku_a", "widget").unwrap(), each);
//!
//! let a = Content::new(ru.clone(), 4.0).unwrap();
//! let b = Content::new(ru.clone(), 6.0).unwrap();
//!
//! let merged = merge_lots([a, b]);
//! assert_eq!(merged.len(), 1);
//! assert_eq!(merged[0].quantity(), 10.0);
//!
//! let (kept, put_back) = merged[0].clone().split(7.0).unwrap();
//! assert_eq!(kept.quantity(), 7.0);
//! assert_eq!(put_back.quantity(), 3.0);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::{LotId, Resource, ResourceUnit, UnitOfMeasure};

/// Tolerance for quantity comparisons.
///
/// Quantities are f64 and flow through split/merge arithmetic; exactness
/// checks compare within this tolerance so the reconciliation invariant is
/// about stock, not floating-point residue.
pub const QTY_EPS: f64 = 1e-9;

/// Compare two quantities for equality within [`QTY_EPS`].
pub fn qty_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= QTY_EPS
}

/// True when `a` is greater than or equal to `b` within [`QTY_EPS`].
pub fn qty_ge(a: f64, b: f64) -> bool {
    a + QTY_EPS >= b
}

/// Errors from lot construction and arithmetic.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ContentError {
    /// Lots must hold a strictly positive, finite quantity.
    #[error("lot quantity must be positive and finite, got {qty}")]
    InvalidQuantity { qty: f64 },

    /// A split point must fall strictly inside the lot's quantity.
    #[error("cannot split {keep_out} out of a lot of {qty}")]
    InvalidSplit { qty: f64, keep_out: f64 },
}

/// An immutable lot: a quantity of one resource-unit with its own identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    lot_id: LotId,
    resource_unit: ResourceUnit,
    quantity: f64,
}

impl Content {
    /// Create a lot with a generated identity.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::InvalidQuantity` unless the quantity is
    /// strictly positive and finite. A zero-quantity lot must not exist;
    /// remove the lot instead.
    pub fn new(resource_unit: ResourceUnit, quantity: f64) -> Result<Self, ContentError> {
        if !quantity.is_finite() || quantity <= 0.0 {
            return Err(ContentError::InvalidQuantity { qty: quantity });
        }
        Ok(Self {
            lot_id: LotId::generate(),
            resource_unit,
            quantity,
        })
    }

    /// The lot identity.
    pub fn lot_id(&self) -> &LotId {
        &self.lot_id
    }

    /// The resource-unit this lot holds.
    pub fn resource_unit(&self) -> &ResourceUnit {
        &self.resource_unit
    }

    /// The resource half of the resource-unit.
    pub fn resource(&self) -> &Resource {
        self.resource_unit.resource()
    }

    /// The unit-of-measure half of the resource-unit.
    pub fn uom(&self) -> &UnitOfMeasure {
        self.resource_unit.uom()
    }

    /// The lot quantity. Always strictly positive.
    pub fn quantity(&self) -> f64 {
        self.quantity
    }

    /// Whether this lot and `other` hold the same resource-unit.
    pub fn matches_resource_unit(&self, other: &ResourceUnit) -> bool {
        &self.resource_unit == other
    }

    /// Produce a new lot of the same resource-unit with a different quantity.
    ///
    /// The result has a fresh lot identity; the original is consumed
    /// conceptually (the caller drops it).
    ///
    /// # Errors
    ///
    /// Returns `ContentError::InvalidQuantity` for non-positive quantities.
    pub fn with_quantity(&self, quantity: f64) -> Result<Self, ContentError> {
        Self::new(self.resource_unit.clone(), quantity)
    }

    /// Split this lot into `(kept_out, put_back)` lots.
    ///
    /// `keep_out` becomes the kept-out lot's quantity; the remainder becomes
    /// the put-back lot. Both receive fresh identities.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::InvalidSplit` unless
    /// `0 < keep_out < quantity`.
    pub fn split(self, keep_out: f64) -> Result<(Self, Self), ContentError> {
        if keep_out <= 0.0 || !qty_ge(self.quantity, keep_out) || qty_eq(self.quantity, keep_out) {
            return Err(ContentError::InvalidSplit {
                qty: self.quantity,
                keep_out,
            });
        }
        let kept = Self::new(self.resource_unit.clone(), keep_out)?;
        let put_back = Self::new(self.resource_unit, self.quantity - keep_out)?;
        Ok((kept, put_back))
    }
}

impl fmt::Display for Content {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "C({}, {}, {}) [{}]",
            self.resource().name(),
            self.uom().name(),
            self.quantity,
            self.lot_id
        )
    }
}

/// Merge lots by resource-unit.
///
/// Lots of the same resource-unit are collapsed into a single lot holding
/// the summed quantity, with a fresh identity (the old identities are
/// discarded). Groups come out in first-seen order, so merging is
/// deterministic for a given input order.
pub fn merge_lots(lots: impl IntoIterator<Item = Content>) -> Vec<Content> {
    let mut groups: Vec<(ResourceUnit, f64)> = Vec::new();

    for lot in lots {
        match groups
            .iter_mut()
            .find(|(ru, _)| ru == lot.resource_unit())
        {
            Some((_, qty)) => *qty += lot.quantity(),
            None => groups.push((lot.resource_unit().clone(), lot.quantity())),
        }
    }

    groups
        .into_iter()
        .map(|(ru, qty)| {
            Content::new(ru, qty).expect("merged quantity is positive: summed from positive lots")
        })
        .collect()
}
