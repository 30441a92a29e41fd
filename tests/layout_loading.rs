//! Integration tests for layout manifests feeding the facade.

use std::io::Write;

use anyhow::Result;

use stowage::catalog::{LocationId, Resource, ResourceUnit};
use stowage::content::Content;
use stowage::facade::Storage;
use stowage::layout::{Layout, LayoutError};

const FACILITY: &str = r#"
[[uom]]
name = "EACH"
each_qty = 1.0

[[uom]]
name = "PALLET"
dimensions = [1.2, 1.0, 1.5]
max_stack = 2

[[location]]
id_prefix = "PICK"
count = 4
discipline = "all-accessible"

[[location.capacity]]
uom = "EACH"
max_qty = 10.0

[[location]]
id = "LANE-1"
discipline = "fifo"

[[location.capacity]]
uom = "PALLET"
max_qty = 3.0

[[location]]
id = "BULK-1"
discipline = "merged-content"
max_distinct_resource_units = 20

[[location.capacity]]
uom = "EACH"
max_qty = 5000.0
"#;

#[test]
fn layout_loads_from_file() -> Result<()> {
    let mut file = tempfile::NamedTempFile::new()?;
    file.write_all(FACILITY.as_bytes())?;

    let layout = Layout::load(file.path())?;
    assert_eq!(layout.locations().len(), 6);
    assert_eq!(layout.uom("PALLET").unwrap().max_stack(), Some(2));
    Ok(())
}

#[test]
fn missing_file_is_a_read_error() {
    let err = Layout::load(std::path::Path::new("/nonexistent/facility.toml")).unwrap_err();
    assert!(matches!(err, LayoutError::ReadError { .. }));
}

#[test]
fn malformed_toml_is_a_parse_error() {
    let err = Layout::from_toml_str("[[location").unwrap_err();
    assert!(matches!(err, LayoutError::ParseError { .. }));
}

#[test]
fn storage_boots_from_layout() -> Result<()> {
    let layout = Layout::from_toml_str(FACILITY)?;
    let storage = Storage::from_layout(&layout)?;

    let snapshot = storage.snapshot();
    assert_eq!(snapshot.len(), 6);
    assert!(storage
        .location_by_id(&LocationId::new("PICK-01")?)
        .is_some());
    assert!(storage.location_by_id(&LocationId::new("BULK-1")?).is_some());

    // the declared units flow into live allocations
    let each = layout.uom("EACH").unwrap().clone();
    let ru = ResourceUnit::new(Resource::new("sku_a", "a widget")?, each);
    storage.add_content(Content::new(ru.clone(), 8.0)?, None, None)?;

    let snapshot = storage.snapshot();
    assert_eq!(snapshot.quantity_of_resource_units(Some(&[ru.clone()]))[&ru], 8.0);
    Ok(())
}

#[test]
fn oversized_lots_fall_through_to_bulk() -> Result<()> {
    let layout = Layout::from_toml_str(FACILITY)?;
    let storage = Storage::from_layout(&layout)?;

    let each = layout.uom("EACH").unwrap().clone();
    let ru = ResourceUnit::new(Resource::new("sku_a", "a widget")?, each);

    // 80 eaches fit no PICK face (capacity 10) but land in BULK-1
    storage.add_content(Content::new(ru.clone(), 80.0)?, None, None)?;

    let bulk = LocationId::new("BULK-1")?;
    let snapshot = storage.snapshot();
    assert_eq!(snapshot.inventory(&bulk).unwrap().quantity_of(&ru), 80.0);
    Ok(())
}
