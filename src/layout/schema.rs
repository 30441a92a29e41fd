//! layout::schema
//!
//! Raw TOML schema for layout manifests.
//!
//! The schema is deliberately permissive about omissions (serde defaults)
//! and strict about typos (`deny_unknown_fields`); semantic validation
//! happens in [`super::Layout`] after parsing.

use serde::{Deserialize, Serialize};

/// A whole layout manifest.
///
/// # Example
///
/// ```toml
/// [[uom]]
/// name = "EACH"
/// each_qty = 1.0
///
/// [[location]]
/// id_prefix = "A"
/// count = 4
/// discipline = "all-accessible"
///
/// [[location.capacity]]
/// uom = "EACH"
/// max_qty = 100.0
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LayoutDoc {
    /// Declared units of measure.
    #[serde(rename = "uom")]
    pub uoms: Vec<UomEntry>,

    /// Location templates.
    #[serde(rename = "location")]
    pub locations: Vec<LocationEntry>,
}

/// One unit-of-measure declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UomEntry {
    pub name: String,
    #[serde(default)]
    pub each_qty: Option<f64>,
    #[serde(default)]
    pub dimensions: Option<[f64; 3]>,
    #[serde(default)]
    pub nesting_factor: Option<f64>,
    #[serde(default)]
    pub max_stack: Option<u32>,
}

/// One location template.
///
/// Either `id` names a single location, or `id_prefix` + `count` expand
/// into a numbered run (`A-01`, `A-02`, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LocationEntry {
    pub id: Option<String>,
    pub id_prefix: Option<String>,
    pub count: Option<usize>,
    pub discipline: Option<String>,
    pub max_distinct_resource_units: Option<usize>,
    #[serde(rename = "capacity")]
    pub capacities: Vec<CapacityEntry>,
    pub whitelist: Vec<ResourceEntry>,
    pub coordinates: Option<[f64; 3]>,
}

/// One capacity bound inside a location template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CapacityEntry {
    pub uom: String,
    pub max_qty: f64,
}

/// One whitelist entry inside a location template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceEntry {
    pub name: String,
    #[serde(default)]
    pub description: String,
}
