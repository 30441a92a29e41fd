//! channel::discipline
//!
//! The pluggable access-discipline strategies.
//!
//! A discipline answers three questions about a slot array: where may the
//! next item go (in priority order), which positions may be unloaded right
//! now, and how the array rewrites itself after a single change. The
//! [`Discipline::process`] transition applies removals then additions, one
//! item at a time, consulting those answers at every step - all
//! discipline-specific branching in the crate lives here.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::slots::Slots;
use super::ChannelError;

/// The access discipline of a channel.
///
/// Orientation: index 0 is the loading face. "Flow" compacts occupied
/// slots toward the high-index end after every change (a gravity lane);
/// "backward" flow compacts toward the face. Push variants always accept
/// at the face and displace existing items rearward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Discipline {
    /// Every empty slot is addable, every occupied slot removable, no
    /// compaction.
    AllAccessible,
    /// As [`Discipline::AllAccessible`], with forward flow after changes.
    AllAccessibleFlow,
    /// As [`Discipline::AllAccessible`], with backward flow after changes.
    AllAccessibleFlowBackward,
    /// Insert at an empty face slot only; only the oldest item (deepest
    /// occupied slot) is removable; forward flow.
    Fifo,
    /// Push variant of FIFO: insertion always permitted at the face,
    /// displacing items rearward; full channel rejects up-front.
    FifoBackward,
    /// Insert at an empty face slot only; only the newest item is
    /// removable; forward flow.
    Lifo,
    /// Push variant of LIFO.
    LifoBackward,
    /// Both the shallowest and deepest occupied slots are removable;
    /// single-end insertion; no compaction.
    Omni,
}

impl Discipline {
    /// Whether insertion displaces existing items instead of requiring an
    /// empty target slot.
    pub fn allows_push(&self) -> bool {
        matches!(self, Self::FifoBackward | Self::LifoBackward)
    }

    /// Candidate insertion positions, in priority order.
    pub fn addable_positions<T: Clone + PartialEq + fmt::Debug>(
        &self,
        slots: &Slots<T>,
    ) -> Vec<usize> {
        match self {
            Self::AllAccessible | Self::AllAccessibleFlow | Self::AllAccessibleFlowBackward => {
                slots.empty_positions()
            }
            Self::Fifo | Self::Lifo | Self::Omni => {
                if slots.get(0).is_none() && slots.capacity() > 0 {
                    vec![0]
                } else {
                    vec![]
                }
            }
            Self::FifoBackward | Self::LifoBackward => vec![0],
        }
    }

    /// Positions currently extractable.
    pub fn removable_positions<T: Clone + PartialEq + fmt::Debug>(
        &self,
        slots: &Slots<T>,
    ) -> Vec<usize> {
        match self {
            Self::AllAccessible | Self::AllAccessibleFlow | Self::AllAccessibleFlowBackward => {
                slots.occupied_positions()
            }
            // oldest item: deepest occupied slot
            Self::Fifo | Self::FifoBackward => slots.last_occupied().into_iter().collect(),
            // newest item: shallowest occupied slot
            Self::Lifo | Self::LifoBackward => slots.first_occupied().into_iter().collect(),
            Self::Omni => {
                let mut positions: Vec<usize> = slots
                    .first_occupied()
                    .into_iter()
                    .chain(slots.last_occupied())
                    .collect();
                positions.dedup();
                positions
            }
        }
    }

    /// Rewrite the array after a single add or remove.
    pub fn post_process<T: Clone + PartialEq + fmt::Debug>(&self, slots: Slots<T>) -> Slots<T> {
        match self {
            Self::AllAccessible | Self::Omni => slots,
            Self::AllAccessibleFlow | Self::Fifo | Self::Lifo => slots.flowed(false),
            Self::AllAccessibleFlowBackward | Self::FifoBackward | Self::LifoBackward => {
                slots.flowed(true)
            }
        }
    }

    /// Apply removals then additions to `slots`, returning the new array.
    ///
    /// Removals are validated against [`Self::removable_positions`]
    /// (`ItemNotFound` / `ItemNotAccessible`), additions against capacity
    /// and [`Self::addable_positions`] (`NoRoom` / `ItemBlocking`). Each
    /// single-item step is followed by [`Self::post_process`].
    ///
    /// # Errors
    ///
    /// The input array is never partially rewritten: the caller keeps the
    /// original on error.
    pub fn process<T: Clone + PartialEq + fmt::Debug>(
        &self,
        slots: &Slots<T>,
        added: &[T],
        removed: &[T],
    ) -> Result<Slots<T>, ChannelError> {
        let mut current = slots.clone();

        for item in removed {
            let position = current.position_of(item).ok_or_else(|| {
                ChannelError::ItemNotFound {
                    item: format!("{item:?}"),
                    state: current.render(),
                }
            })?;

            let removable = self.removable_positions(&current);
            if !removable.contains(&position) {
                return Err(ChannelError::ItemNotAccessible {
                    item: format!("{item:?}"),
                    position,
                    removable,
                    state: current.render(),
                });
            }

            current.set(position, None);
            current = self.post_process(current);
        }

        for item in added {
            if current.is_full() {
                return Err(ChannelError::NoRoom {
                    item: format!("{item:?}"),
                    capacity: current.capacity(),
                    state: current.render(),
                });
            }

            if self.allows_push() {
                current.insert_shifting(0, item.clone());
            } else {
                match self.addable_positions(&current).first().copied() {
                    Some(position) => current.set(position, Some(item.clone())),
                    None => {
                        // the insertion face is occupied and this
                        // discipline does not displace
                        return Err(ChannelError::ItemBlocking {
                            item: format!("{item:?}"),
                            position: 0,
                            blocking: current
                                .get(0)
                                .map(|x| format!("{x:?}"))
                                .unwrap_or_default(),
                            state: current.render(),
                        });
                    }
                }
            }

            current = self.post_process(current);
        }

        Ok(current)
    }
}

impl fmt::Display for Discipline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AllAccessible => "all-accessible",
            Self::AllAccessibleFlow => "all-accessible-flow",
            Self::AllAccessibleFlowBackward => "all-accessible-flow-backward",
            Self::Fifo => "fifo",
            Self::FifoBackward => "fifo-backward",
            Self::Lifo => "lifo",
            Self::LifoBackward => "lifo-backward",
            Self::Omni => "omni",
        };
        write!(f, "{name}")
    }
}
