//! channel::slots
//!
//! The fixed-size ordered slot array underlying a channel.

use std::fmt;

/// A fixed-capacity array of optional slot contents.
///
/// Index 0 is the loading face. The array's size never changes after
/// construction; occupancy changes only through slot writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slots<T> {
    slots: Vec<Option<T>>,
}

impl<T: Clone + PartialEq + fmt::Debug> Slots<T> {
    /// Create an empty array of `capacity` slots.
    pub fn empty(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| None).collect(),
        }
    }

    /// Wrap an explicit slot vector.
    pub fn from_slots(slots: Vec<Option<T>>) -> Self {
        Self { slots }
    }

    /// Total slot count.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots.
    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Whether every slot is occupied.
    pub fn is_full(&self) -> bool {
        self.slots.iter().all(|s| s.is_some())
    }

    /// The item at `index`, if any.
    pub fn get(&self, index: usize) -> Option<&T> {
        self.slots.get(index).and_then(|s| s.as_ref())
    }

    /// The index holding `item`, if present.
    pub fn position_of(&self, item: &T) -> Option<usize> {
        self.slots
            .iter()
            .position(|s| s.as_ref() == Some(item))
    }

    /// The shallowest occupied index (nearest the loading face).
    pub fn first_occupied(&self) -> Option<usize> {
        self.slots.iter().position(|s| s.is_some())
    }

    /// The deepest occupied index (furthest from the loading face).
    pub fn last_occupied(&self) -> Option<usize> {
        self.slots.iter().rposition(|s| s.is_some())
    }

    /// Indexes of empty slots, ascending.
    pub fn empty_positions(&self) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.is_none().then_some(i))
            .collect()
    }

    /// Indexes of occupied slots, ascending.
    pub fn occupied_positions(&self) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.is_some().then_some(i))
            .collect()
    }

    /// Occupied items in index order.
    pub fn items(&self) -> impl Iterator<Item = &T> {
        self.slots.iter().filter_map(|s| s.as_ref())
    }

    /// The raw slot vector.
    pub fn as_slice(&self) -> &[Option<T>] {
        &self.slots
    }

    /// Overwrite the slot at `index`.
    pub(crate) fn set(&mut self, index: usize, value: Option<T>) {
        self.slots[index] = value;
    }

    /// Insert at `index`, displacing items toward the tail.
    ///
    /// The caller must have verified the array is not full: the trailing
    /// slot dropped by the shift is always empty then.
    pub(crate) fn insert_shifting(&mut self, index: usize, item: T) {
        debug_assert!(!self.is_full());
        self.slots.insert(index, Some(item));
        self.slots.pop();
    }

    /// Compact occupied slots toward the tail (forward flow) or toward the
    /// loading face (backward flow), preserving relative order.
    pub(crate) fn flowed(self, backwards: bool) -> Self {
        let capacity = self.slots.len();
        let items: Vec<T> = self.slots.into_iter().flatten().collect();
        let gap = capacity - items.len();

        let slots = if backwards {
            items
                .into_iter()
                .map(Some)
                .chain((0..gap).map(|_| None))
                .collect()
        } else {
            (0..gap)
                .map(|_| None)
                .chain(items.into_iter().map(Some))
                .collect()
        };

        Self { slots }
    }

    /// Debug rendering of each slot, used by error payloads.
    pub(crate) fn render(&self) -> Vec<Option<String>> {
        self.slots
            .iter()
            .map(|s| s.as_ref().map(|item| format!("{item:?}")))
            .collect()
    }
}
