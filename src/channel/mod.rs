//! channel
//!
//! Generic fixed-capacity slot array with pluggable access disciplines.
//!
//! # Architecture
//!
//! A physical storage lane (gravity-flow lane, push-back rack, pick face)
//! is modeled as a fixed-size ordered array of optional slot contents.
//! Which positions may be loaded or unloaded, and how the array is
//! rewritten after a change, is decided by a [`Discipline`]: a pure
//! strategy exposing addable positions, removable positions, and a
//! post-processing (flow/compaction) step.
//!
//! Index 0 is the loading face. Forward flow compacts occupied slots
//! toward the high-index end of the lane; backward flow compacts toward
//! the loading face. Push disciplines insert at the face and displace
//! existing items rearward.
//!
//! All transitions are applied one item at a time, so disciplines with
//! push or flow semantics observe a consistent array between items.
//!
//! # Example
//!
//! ```
//! use stowage::channel::{Channel, Discipline};
//!
//! let mut lane: Channel<&str> = Channel::new(Discipline::Fifo, 3);
//! lane.store(["a"]).unwrap();
//! lane.store(["b"]).unwrap();
//!
//! // Only the oldest item is removable in a FIFO lane
//! assert_eq!(lane.removable_items(), vec![&"a"]);
//! assert!(lane.remove(["b"]).is_err());
//! lane.remove(["a"]).unwrap();
//! assert_eq!(lane.removable_items(), vec![&"b"]);
//! ```

mod discipline;
mod slots;

pub use discipline::Discipline;
pub use slots::Slots;

use std::fmt;

use thiserror::Error;

/// Errors from channel transitions.
///
/// Each variant carries the offending item and a rendering of the slot
/// array at the point of failure, so callers can log or publish the
/// diagnostic without re-deriving it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// The channel has no free slot for the item.
    #[error("no room to add {item}: channel of capacity {capacity} is full")]
    NoRoom {
        item: String,
        capacity: usize,
        state: Vec<Option<String>>,
    },

    /// A non-push discipline found its insertion slot occupied.
    #[error("{blocking} is blocking position {position}, cannot add {item}")]
    ItemBlocking {
        item: String,
        position: usize,
        blocking: String,
        state: Vec<Option<String>>,
    },

    /// The item requested for removal is not in the channel.
    #[error("{item} not found in channel")]
    ItemNotFound {
        item: String,
        state: Vec<Option<String>>,
    },

    /// The item exists but its position is not currently removable.
    #[error("{item} at position {position} is not removable (removable positions: {removable:?})")]
    ItemNotAccessible {
        item: String,
        position: usize,
        removable: Vec<usize>,
        state: Vec<Option<String>>,
    },
}

/// A slot array bound to a discipline.
///
/// Pairs the pure [`Discipline`] strategy with a current [`Slots`] state
/// and applies transitions through it.
#[derive(Debug, Clone)]
pub struct Channel<T> {
    discipline: Discipline,
    slots: Slots<T>,
}

impl<T: Clone + PartialEq + fmt::Debug> Channel<T> {
    /// Create an empty channel.
    pub fn new(discipline: Discipline, capacity: usize) -> Self {
        Self {
            discipline,
            slots: Slots::empty(capacity),
        }
    }

    /// Create a channel holding `items`, replayed oldest-first through the
    /// discipline's insertion path.
    ///
    /// # Errors
    ///
    /// Fails exactly where replaying the stores would fail, e.g. `NoRoom`
    /// when more items are given than the capacity admits.
    pub fn with_items(
        discipline: Discipline,
        capacity: usize,
        items: impl IntoIterator<Item = T>,
    ) -> Result<Self, ChannelError> {
        let mut channel = Self::new(discipline, capacity);
        channel.store(items)?;
        Ok(channel)
    }

    /// The channel's discipline.
    pub fn discipline(&self) -> Discipline {
        self.discipline
    }

    /// The current slot state.
    pub fn slots(&self) -> &Slots<T> {
        &self.slots
    }

    /// Store items, one at a time, through the discipline.
    ///
    /// # Errors
    ///
    /// `NoRoom` when the channel is full, `ItemBlocking` when a non-push
    /// discipline finds its insertion slot occupied. The channel is left
    /// unchanged on error.
    pub fn store(&mut self, items: impl IntoIterator<Item = T>) -> Result<(), ChannelError> {
        let added: Vec<T> = items.into_iter().collect();
        let next = self.discipline.process(&self.slots, &added, &[])?;
        self.slots = next;
        Ok(())
    }

    /// Remove items, one at a time, through the discipline.
    ///
    /// # Errors
    ///
    /// `ItemNotFound` for unknown items, `ItemNotAccessible` when an item's
    /// position is not removable. The channel is left unchanged on error.
    pub fn remove(&mut self, items: impl IntoIterator<Item = T>) -> Result<(), ChannelError> {
        let removed: Vec<T> = items.into_iter().collect();
        let next = self.discipline.process(&self.slots, &[], &removed)?;
        self.slots = next;
        Ok(())
    }

    /// The items at currently removable positions, in priority order.
    pub fn removable_items(&self) -> Vec<&T> {
        self.discipline
            .removable_positions(&self.slots)
            .into_iter()
            .filter_map(|idx| self.slots.get(idx))
            .collect()
    }

    /// Whether `item` is at a removable position.
    pub fn is_removable(&self, item: &T) -> bool {
        self.removable_items().into_iter().any(|x| x == item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod fifo_lane {
        use super::*;

        #[test]
        fn fills_and_drains_in_order() {
            let mut lane = Channel::new(Discipline::Fifo, 3);
            lane.store(["a", "b", "c"]).unwrap();

            assert_eq!(lane.removable_items(), vec![&"a"]);
            lane.remove(["a"]).unwrap();
            assert_eq!(lane.removable_items(), vec![&"b"]);
            lane.remove(["b"]).unwrap();
            lane.remove(["c"]).unwrap();
            assert_eq!(lane.slots().occupied(), 0);
        }

        #[test]
        fn rejects_out_of_order_removal() {
            let mut lane = Channel::new(Discipline::Fifo, 3);
            lane.store(["a", "b"]).unwrap();

            let err = lane.remove(["b"]).unwrap_err();
            assert!(matches!(err, ChannelError::ItemNotAccessible { .. }));
            // unchanged on error
            assert_eq!(lane.slots().occupied(), 2);
        }

        #[test]
        fn rejects_overfill() {
            let mut lane = Channel::new(Discipline::Fifo, 2);
            lane.store(["a", "b"]).unwrap();
            let err = lane.store(["c"]).unwrap_err();
            assert!(matches!(err, ChannelError::NoRoom { capacity: 2, .. }));
        }

        #[test]
        fn reuses_slot_after_drain() {
            let mut lane = Channel::new(Discipline::Fifo, 3);
            lane.store(["a", "b", "c"]).unwrap();
            lane.remove(["a"]).unwrap();
            lane.store(["d"]).unwrap();
            assert_eq!(lane.removable_items(), vec![&"b"]);
        }
    }

    mod lifo_lane {
        use super::*;

        #[test]
        fn newest_out_first() {
            let mut lane = Channel::new(Discipline::Lifo, 3);
            lane.store(["a", "b", "c"]).unwrap();

            assert_eq!(lane.removable_items(), vec![&"c"]);
            assert!(lane.remove(["a"]).is_err());
            lane.remove(["c"]).unwrap();
            assert_eq!(lane.removable_items(), vec![&"b"]);
        }
    }

    mod push_lane {
        use super::*;

        #[test]
        fn fifo_backward_pushes_items_rearward() {
            let mut lane = Channel::new(Discipline::FifoBackward, 3);
            lane.store(["a", "b", "c"]).unwrap();

            // newest sits at the loading face, oldest removable at the rear
            assert_eq!(lane.slots().get(0), Some(&"c"));
            assert_eq!(lane.removable_items(), vec![&"a"]);
        }

        #[test]
        fn push_past_capacity_rejected_up_front() {
            let mut lane = Channel::new(Discipline::FifoBackward, 2);
            lane.store(["a", "b"]).unwrap();
            let err = lane.store(["c"]).unwrap_err();
            assert!(matches!(err, ChannelError::NoRoom { .. }));
            // nothing was silently dropped
            assert!(lane.is_removable(&"a"));
            assert_eq!(lane.slots().occupied(), 2);
        }
    }

    mod omni_lane {
        use super::*;

        #[test]
        fn both_ends_removable() {
            let mut lane = Channel::new(Discipline::Omni, 3);
            // single-end insertion with no compaction: load, then observe
            lane.store(["a"]).unwrap();
            assert_eq!(lane.removable_items(), vec![&"a"]);

            let err = lane.store(["b"]).unwrap_err();
            assert!(matches!(err, ChannelError::ItemBlocking { position: 0, .. }));
        }
    }

    mod unknown_items {
        use super::*;

        #[test]
        fn remove_unknown_is_not_found() {
            let mut lane = Channel::new(Discipline::AllAccessible, 3);
            lane.store(["a"]).unwrap();
            let err = lane.remove(["zz"]).unwrap_err();
            assert!(matches!(err, ChannelError::ItemNotFound { .. }));
        }
    }

    mod replay {
        use super::*;

        #[test]
        fn with_items_matches_sequential_store() {
            let mut a = Channel::new(Discipline::Fifo, 4);
            a.store(["x"]).unwrap();
            a.store(["y"]).unwrap();

            let b = Channel::with_items(Discipline::Fifo, 4, ["x", "y"]).unwrap();
            assert_eq!(a.slots().as_slice(), b.slots().as_slice());
        }

        #[test]
        fn with_items_over_capacity_fails() {
            assert!(Channel::with_items(Discipline::Fifo, 1, ["x", "y"]).is_err());
        }
    }
}
