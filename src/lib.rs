//! Stowage - a physical-storage allocation engine
//!
//! Stowage decides where quantities of a resource are placed or taken from
//! across a set of storage locations, enforcing capacity and designation
//! invariants, and exposing the current state as an immutable snapshot.
//!
//! # Architecture
//!
//! The codebase follows a strict layered architecture, leaf to root:
//!
//! - [`catalog`] - Validated value types: units of measure, resources,
//!   resource-units, capacities, identifiers
//! - [`content`] - Immutable content lots and lot merge/split helpers
//! - [`channel`] - Generic fixed-capacity slot array with pluggable access
//!   disciplines (all-accessible, FIFO, LIFO, push variants, OMNI)
//! - [`location`] - The location entity and its copy-on-write adjustments
//! - [`inventory`] - Containers and per-location inventory: quantity/space
//!   queries, the designation rule, lot reconciliation
//! - [`state`] - The immutable [`state::StorageState`] aggregate: search,
//!   filtering, allocation, and the functional mutation layer
//! - [`prioritizers`] - Stock comparators for the allocation search
//! - [`layout`] - TOML layout manifests expanded into initial locations
//! - [`facade`] - The concurrency-safe [`facade::Storage`] entry point
//!
//! # Correctness Invariants
//!
//! Stowage maintains the following invariants across every state transition:
//!
//! 1. Per-location occupied quantity never exceeds configured capacity
//! 2. A non-empty location only accepts resource-units within its designation
//! 3. Reconciled removals satisfy the requested quantity exactly
//! 4. Containers and lots leave a location only through removable positions
//! 5. States are immutable; mutations replace, never modify

pub mod catalog;
pub mod channel;
pub mod content;
pub mod facade;
pub mod inventory;
pub mod layout;
pub mod location;
pub mod prioritizers;
pub mod state;
