//! Integration tests for state-level storage mutations.
//!
//! These mirror the end-to-end behaviors of the mutation layer: allocation
//! search, capacity enforcement, designation, and reconciled removal.

use stowage::catalog::{Capacity, LocationId, Resource, ResourceUnit, UnitOfMeasure};
use stowage::content::Content;
use stowage::location::{ChannelDiscipline, Location};
use stowage::state::{mutations, StateError, StorageState};

fn each() -> UnitOfMeasure {
    UnitOfMeasure::new("EACH").unwrap().with_each_qty(1.0)
}

fn sku(name: &str) -> Resource {
    Resource::new(name, format!("{name} test resource")).unwrap()
}

fn ru(name: &str) -> ResourceUnit {
    ResourceUnit::new(sku(name), each())
}

fn lot(name: &str, qty: f64) -> Content {
    Content::new(ru(name), qty).unwrap()
}

fn each_locations(count: usize, capacity: f64) -> Vec<Location> {
    (1..=count)
        .map(|i| {
            Location::new(LocationId::new(format!("L-{i:02}")).unwrap())
                .with_capacity(Capacity::new(each(), capacity).unwrap())
        })
        .collect()
}

#[test]
fn fresh_state_is_all_empty() {
    let state = StorageState::new(each_locations(5, 10.0)).unwrap();

    assert_eq!(state.len(), 5);
    assert_eq!(state.occupied_locations().len(), 0);
    assert_eq!(state.empty_locations().len(), 5);
    insta::assert_snapshot!(state.to_string(), @"StorageState(locs: 5, occupied: 0, empty: 5)");
}

#[test]
fn add_content_lands_somewhere() {
    let state = StorageState::new(each_locations(5, 10.0)).unwrap();
    let next = mutations::add_content(&state, lot("sku_a", 1.0), None, None).unwrap();

    assert_eq!(
        next.quantity_of_resource_units(Some(&[ru("sku_a")]))[&ru("sku_a")],
        1.0
    );
    assert_eq!(next.occupied_locations().len(), 1);
}

#[test]
fn add_content_that_fits_nowhere_fails() {
    // five capacity-10 locations; a 15-unit lot fits in none of them
    let state = StorageState::new(each_locations(5, 10.0)).unwrap();
    let err = mutations::add_content(&state, lot("sku_a", 15.0), None, None).unwrap_err();

    match err {
        StateError::NoLocationWithCapacity {
            resource_unit_space,
            location_space,
            state: diagnostic_state,
            ..
        } => {
            assert_eq!(resource_unit_space, 50.0);
            assert_eq!(location_space.len(), 5);
            assert_eq!(diagnostic_state.len(), 5);
        }
        other => panic!("expected NoLocationWithCapacity, got {other:?}"),
    }
}

#[test]
fn repeated_adds_accumulate() {
    let state = StorageState::new(each_locations(5, 10.0)).unwrap();
    let state = mutations::add_content(&state, lot("sku_a", 7.0), None, None).unwrap();
    let state = mutations::add_content(&state, lot("sku_a", 7.0), None, None).unwrap();

    assert_eq!(
        state.quantity_of_resource_units(Some(&[ru("sku_a")]))[&ru("sku_a")],
        14.0
    );
    // 7 + 7 does not fit one capacity-10 location, so two are occupied
    assert_eq!(state.occupied_locations().len(), 2);
}

#[test]
fn remove_content_takes_exactly_what_was_asked() {
    let state = StorageState::new(each_locations(5, 10.0)).unwrap();
    let state = mutations::add_content(&state, lot("sku_a", 7.0), None, None).unwrap();
    let state = mutations::add_content(&state, lot("sku_a", 7.0), None, None).unwrap();

    let (removed, state) =
        mutations::remove_content(&state, &lot("sku_a", 3.0), None, None).unwrap();

    assert_eq!(removed.quantity(), 3.0);
    assert_eq!(removed.resource_unit(), &ru("sku_a"));
    assert_eq!(
        state.quantity_of_resource_units(Some(&[ru("sku_a")]))[&ru("sku_a")],
        11.0
    );
}

#[test]
fn remove_content_needs_one_location_with_enough() {
    let state = StorageState::new(each_locations(5, 10.0)).unwrap();
    let state = mutations::add_content(&state, lot("sku_a", 7.0), None, None).unwrap();
    let state = mutations::add_content(&state, lot("sku_a", 7.0), None, None).unwrap();

    // 14 on hand, split 7/7: no location can satisfy 8 alone
    let err = mutations::remove_content(&state, &lot("sku_a", 8.0), None, None).unwrap_err();
    assert!(matches!(err, StateError::NoLocationToRemoveContent { .. }));
}

#[test]
fn designation_scenario() {
    // one capacity-10 each location, max one distinct resource-unit
    let state = StorageState::new(each_locations(1, 10.0)).unwrap();
    let id = LocationId::new("L-01").unwrap();

    let state = mutations::add_content(&state, lot("sku_a", 4.0), None, None).unwrap();
    assert_eq!(state.inventory(&id).unwrap().quantity_of(&ru("sku_a")), 4.0);

    let state = mutations::add_content(&state, lot("sku_a", 4.0), None, None).unwrap();
    assert_eq!(state.inventory(&id).unwrap().quantity_of(&ru("sku_a")), 8.0);

    // the location is designated to sku_a now
    let err = mutations::add_content(&state, lot("sku_b", 3.0), None, None).unwrap_err();
    match err {
        StateError::NoLocationWithCapacity { .. } => {}
        StateError::Inventory(inner) => panic!("search should reject first: {inner:?}"),
        other => panic!("unexpected error {other:?}"),
    }

    // forced at the designated location, the rejection is explicit
    let err =
        mutations::add_content(&state, lot("sku_b", 3.0), Some(&id), None).unwrap_err();
    assert!(matches!(
        err,
        StateError::Inventory(stowage::inventory::InventoryError::DesignationMismatch { .. })
    ));

    let (removed, state) =
        mutations::remove_content(&state, &lot("sku_a", 3.0), None, None).unwrap();
    assert_eq!(removed.quantity(), 3.0);
    assert_eq!(state.inventory(&id).unwrap().quantity_of(&ru("sku_a")), 5.0);
    insta::assert_snapshot!(
        state.inventory(&id).unwrap().to_string(),
        @"L-01: {sku_a/EACH: 5}"
    );
}

#[test]
fn round_trip_returns_to_baseline() {
    let state = StorageState::new(each_locations(3, 10.0)).unwrap();
    let baseline = state.quantity_of_resource_units(Some(&[ru("sku_a")]));

    let content = lot("sku_a", 6.0);
    let state = mutations::add_content(&state, content.clone(), None, None).unwrap();
    let (_, state) = mutations::remove_content(&state, &content, None, None).unwrap();

    assert_eq!(state.quantity_of_resource_units(Some(&[ru("sku_a")])), baseline);
    assert_eq!(state.occupied_locations().len(), 0);
}

#[test]
fn merged_content_location_pools_lots() {
    let bulk = Location::new(LocationId::new("BULK-1").unwrap())
        .with_capacity(Capacity::new(each(), 1000.0).unwrap())
        .with_discipline(ChannelDiscipline::MergedContent)
        .with_max_distinct_resource_units(10);
    let state = StorageState::new([bulk]).unwrap();
    let id = LocationId::new("BULK-1").unwrap();

    let state = mutations::add_content(&state, lot("sku_a", 100.0), None, None).unwrap();
    let state = mutations::add_content(&state, lot("sku_b", 50.0), None, None).unwrap();
    let state = mutations::add_content(&state, lot("sku_a", 25.0), None, None).unwrap();

    let inventory = state.inventory(&id).unwrap();
    assert_eq!(inventory.merged_pool().unwrap().lots().len(), 2);
    assert_eq!(inventory.quantity_of(&ru("sku_a")), 125.0);

    let (removed, state) =
        mutations::remove_content(&state, &lot("sku_a", 110.0), None, None).unwrap();
    assert_eq!(removed.quantity(), 110.0);
    assert_eq!(state.inventory(&id).unwrap().quantity_of(&ru("sku_a")), 15.0);
}

#[test]
fn whitelisted_location_only_takes_listed_resources() {
    let open = Location::new(LocationId::new("L-01").unwrap())
        .with_capacity(Capacity::new(each(), 10.0).unwrap());
    let reserved = Location::new(LocationId::new("L-00").unwrap())
        .with_capacity(Capacity::new(each(), 10.0).unwrap())
        .with_whitelist([sku("sku_special")]);
    let state = StorageState::new([open, reserved]).unwrap();

    // the reserved location sorts first but only admits sku_special
    let state = mutations::add_content(&state, lot("sku_a", 5.0), None, None).unwrap();
    let l00 = LocationId::new("L-00").unwrap();
    let l01 = LocationId::new("L-01").unwrap();
    assert!(!state.inventory(&l00).unwrap().occupied());
    assert!(state.inventory(&l01).unwrap().occupied());

    let state =
        mutations::add_content(&state, lot("sku_special", 5.0), None, None).unwrap();
    assert_eq!(
        state.inventory(&l00).unwrap().quantity_of(&ru("sku_special")),
        5.0
    );
}

#[test]
fn prioritizer_steers_allocation() {
    let small = Location::new(LocationId::new("SMALL").unwrap())
        .with_capacity(Capacity::new(each(), 4.0).unwrap());
    let big = Location::new(LocationId::new("BIG").unwrap())
        .with_capacity(Capacity::new(each(), 100.0).unwrap());
    let state = StorageState::new([small, big]).unwrap();

    let tightest = stowage::prioritizers::by_space_available(ru("sku_a"), true);
    let state =
        mutations::add_content(&state, lot("sku_a", 2.0), None, Some(&tightest)).unwrap();

    let small_id = LocationId::new("SMALL").unwrap();
    assert_eq!(state.inventory(&small_id).unwrap().quantity_of(&ru("sku_a")), 2.0);
}

#[test]
fn serde_round_trips_a_live_state() {
    let state = StorageState::new(each_locations(2, 10.0)).unwrap();
    let state = mutations::add_content(&state, lot("sku_a", 4.0), None, None).unwrap();

    let json = serde_json::to_string(&state).unwrap();
    let parsed: StorageState = serde_json::from_str(&json).unwrap();

    assert_eq!(parsed.state_id(), state.state_id());
    assert_eq!(
        parsed.quantity_of_resource_units(Some(&[ru("sku_a")])),
        state.quantity_of_resource_units(Some(&[ru("sku_a")]))
    );
    assert_eq!(parsed.fingerprint(), state.fingerprint());
}
