//! layout
//!
//! Layout manifests: the declarative description of a storage facility.
//!
//! # Overview
//!
//! A layout manifest is a TOML document declaring units of measure and
//! location templates. Templates expand into concrete [`Location`] values
//! (a template with `id_prefix` and `count` becomes a numbered run), which
//! seed the initial [`crate::state::StorageState`].
//!
//! # Validation
//!
//! Parsing is schema-checked ([`schema`]); the semantic pass here rejects
//! duplicate unit names, duplicate location ids, capacity references to
//! undeclared units, and unknown discipline names, so a loaded [`Layout`]
//! only ever yields valid locations.
//!
//! # Example
//!
//! ```
//! use stowage::layout::Layout;
//!
//! let layout = Layout::from_toml_str(
//!     r#"
//!     [[uom]]
//!     name = "EACH"
//!
//!     [[location]]
//!     id_prefix = "A"
//!     count = 2
//!
//!     [[location.capacity]]
//!     uom = "EACH"
//!     max_qty = 100.0
//!     "#,
//! )
//! .unwrap();
//!
//! assert_eq!(layout.locations().len(), 2);
//! assert_eq!(layout.locations()[0].id().as_str(), "A-01");
//! ```

pub mod schema;

pub use schema::LayoutDoc;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::catalog::{Capacity, CatalogError, LocationId, Resource, UnitOfMeasure};
use crate::location::{ChannelDiscipline, Location, LocationError};

/// Errors from layout loading and validation.
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("failed to read layout file '{}': {source}", path.display())]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse layout: {message}")]
    ParseError { message: String },

    #[error("duplicate unit of measure: {0}")]
    DuplicateUom(String),

    #[error("duplicate location id: {0}")]
    DuplicateLocation(String),

    #[error("location entry needs either 'id' or 'id_prefix'")]
    MissingId,

    #[error("location {location} references undeclared unit of measure {uom}")]
    UnknownUom { location: String, uom: String },

    #[error("invalid layout value: {0}")]
    InvalidValue(String),
}

impl From<CatalogError> for LayoutError {
    fn from(err: CatalogError) -> Self {
        Self::InvalidValue(err.to_string())
    }
}

impl From<LocationError> for LayoutError {
    fn from(err: LocationError) -> Self {
        Self::InvalidValue(err.to_string())
    }
}

/// A validated layout: declared units and expanded locations.
#[derive(Debug, Clone)]
pub struct Layout {
    uoms: BTreeMap<String, UnitOfMeasure>,
    locations: Vec<Location>,
}

impl Layout {
    /// Parse and validate a layout from TOML text.
    ///
    /// # Errors
    ///
    /// Schema violations surface as `ParseError`; semantic problems as
    /// the specific `LayoutError` variants.
    pub fn from_toml_str(text: &str) -> Result<Self, LayoutError> {
        let doc: LayoutDoc = toml::from_str(text).map_err(|err| LayoutError::ParseError {
            message: err.to_string(),
        })?;
        Self::from_doc(doc)
    }

    /// Load and validate a layout from a TOML file.
    ///
    /// # Errors
    ///
    /// `ReadError` for I/O failures, then as [`Self::from_toml_str`].
    pub fn load(path: &Path) -> Result<Self, LayoutError> {
        let text = fs::read_to_string(path).map_err(|source| LayoutError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "layout loaded");
        Self::from_toml_str(&text)
    }

    /// Validate a parsed document.
    pub fn from_doc(doc: LayoutDoc) -> Result<Self, LayoutError> {
        let mut uoms: BTreeMap<String, UnitOfMeasure> = BTreeMap::new();
        for entry in &doc.uoms {
            if uoms.contains_key(&entry.name) {
                return Err(LayoutError::DuplicateUom(entry.name.clone()));
            }
            let mut uom = UnitOfMeasure::new(&entry.name)?;
            if let Some(each_qty) = entry.each_qty {
                uom = uom.with_each_qty(each_qty);
            }
            if let Some(dimensions) = entry.dimensions {
                uom = uom.with_dimensions(dimensions);
            }
            if let Some(nesting_factor) = entry.nesting_factor {
                uom = uom.with_nesting_factor(nesting_factor);
            }
            if let Some(max_stack) = entry.max_stack {
                uom = uom.with_max_stack(max_stack);
            }
            uoms.insert(entry.name.clone(), uom);
        }

        let mut locations: Vec<Location> = Vec::new();
        for entry in &doc.locations {
            let ids = Self::expand_ids(entry)?;
            for id in ids {
                if locations.iter().any(|loc| loc.id().as_str() == id) {
                    return Err(LayoutError::DuplicateLocation(id));
                }
                locations.push(Self::build_location(&id, entry, &uoms)?);
            }
        }

        Ok(Self { uoms, locations })
    }

    fn expand_ids(entry: &schema::LocationEntry) -> Result<Vec<String>, LayoutError> {
        match (&entry.id, &entry.id_prefix) {
            (Some(id), None) => Ok(vec![id.clone()]),
            (None, Some(prefix)) => {
                let count = entry.count.unwrap_or(1);
                Ok((1..=count).map(|i| format!("{prefix}-{i:02}")).collect())
            }
            _ => Err(LayoutError::MissingId),
        }
    }

    fn build_location(
        id: &str,
        entry: &schema::LocationEntry,
        uoms: &BTreeMap<String, UnitOfMeasure>,
    ) -> Result<Location, LayoutError> {
        let mut location = Location::new(LocationId::new(id)?);

        for capacity in &entry.capacities {
            let uom = uoms
                .get(&capacity.uom)
                .cloned()
                .ok_or_else(|| LayoutError::UnknownUom {
                    location: id.to_string(),
                    uom: capacity.uom.clone(),
                })?;
            location = location.with_capacity(Capacity::new(uom, capacity.max_qty)?);
        }

        if !entry.whitelist.is_empty() {
            let resources: Result<Vec<Resource>, CatalogError> = entry
                .whitelist
                .iter()
                .map(|r| Resource::new(&r.name, &r.description))
                .collect();
            location = location.with_whitelist(resources?);
        }

        if let Some(discipline) = &entry.discipline {
            location = location.with_discipline(discipline.parse::<ChannelDiscipline>()?);
        }

        if let Some(cap) = entry.max_distinct_resource_units {
            location = location.with_max_distinct_resource_units(cap);
        }

        if let Some(coordinates) = entry.coordinates {
            location = location.with_coordinates(coordinates);
        }

        Ok(location)
    }

    /// The declared unit of measure named `name`, if any.
    pub fn uom(&self, name: &str) -> Option<&UnitOfMeasure> {
        self.uoms.get(name)
    }

    /// All declared units of measure.
    pub fn uoms(&self) -> impl Iterator<Item = &UnitOfMeasure> {
        self.uoms.values()
    }

    /// The expanded, validated locations.
    pub fn locations(&self) -> &[Location] {
        &self.locations
    }
}
