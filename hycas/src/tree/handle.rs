//! Generational handles that survive byte shifts inside the arena.
use smallvec::SmallVec;

use crate::error::{CalcError, CalcResult};
use crate::tree::node::NodeOffset;

/// Durable, position-independent reference to a tree in an [`Arena`](crate::tree::arena::Arena).
///
/// A handle is a slot index plus the generation the slot had when it was registered. Slots
/// are recycled, but generations are never reused, so a stale handle cannot resolve to an
/// unrelated tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle {
    slot: u16,
    generation: u32,
}

impl Handle {
    #[inline]
    pub fn slot(&self) -> usize {
        self.slot as usize
    }

    #[inline]
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotState {
    Free,
    Live(NodeOffset),
    /// The referenced tree was removed. The slot stays reserved until released.
    Uninitialized,
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    generation: u32,
    state: SlotState,
}

/// Saved table state, restored on rollback.
#[derive(Debug, Clone)]
pub(crate) struct TableSnapshot {
    entries: Vec<Entry>,
    free: Vec<u16>,
}

/// Fixed-capacity table mapping handles to buffer offsets.
#[derive(Debug, Clone)]
pub struct HandleTable {
    entries: Vec<Entry>,
    free: Vec<u16>,
    capacity: usize,
    next_generation: u32,
}

impl HandleTable {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.min(u16::MAX as usize + 1);
        Self {
            entries: Vec::with_capacity(capacity),
            free: Vec::new(),
            capacity,
            next_generation: 1,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of handles that currently resolve to a tree.
    pub fn live_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.state, SlotState::Live(_)))
            .count()
    }

    pub fn register(&mut self, offset: NodeOffset) -> CalcResult<Handle> {
        let slot = match self.free.pop() {
            Some(slot) => slot,
            None if self.entries.len() < self.capacity => {
                self.entries.push(Entry {
                    generation: 0,
                    state: SlotState::Free,
                });
                (self.entries.len() - 1) as u16
            }
            None => self.reclaim_uninitialized().ok_or(CalcError::TableFull {
                capacity: self.capacity,
            })?,
        };
        let generation = self.next_generation;
        self.next_generation = self.next_generation.wrapping_add(1).max(1);
        self.entries[slot as usize] = Entry {
            generation,
            state: SlotState::Live(offset),
        };
        Ok(Handle { slot, generation })
    }

    /// Steal a slot whose tree has been removed. Its handle keeps reporting `Uninitialized`
    /// because the new registration bumps the generation.
    fn reclaim_uninitialized(&mut self) -> Option<u16> {
        let slot = self
            .entries
            .iter()
            .position(|e| e.state == SlotState::Uninitialized)?;
        log::trace!("reclaiming uninitialized handle slot {slot}");
        Some(slot as u16)
    }

    pub fn resolve(&self, handle: Handle) -> CalcResult<NodeOffset> {
        match self.entries.get(handle.slot()) {
            Some(Entry {
                generation,
                state: SlotState::Live(offset),
            }) if *generation == handle.generation => Ok(*offset),
            _ => Err(CalcError::Uninitialized),
        }
    }

    #[inline]
    pub fn is_live(&self, handle: Handle) -> bool {
        self.resolve(handle).is_ok()
    }

    /// Give the slot back. Releasing a stale handle is a no-op.
    pub fn release(&mut self, handle: Handle) {
        if let Some(entry) = self.entries.get_mut(handle.slot()) {
            if entry.generation == handle.generation && entry.state != SlotState::Free {
                entry.state = SlotState::Free;
                self.free.push(handle.slot);
            }
        }
    }

    /// Point a handle at a new offset, reviving it if the edit that produced the new content
    /// marked it uninitialized. Released or stale handles are left alone.
    pub(crate) fn redirect(&mut self, handle: Handle, offset: NodeOffset) {
        if let Some(entry) = self.entries.get_mut(handle.slot()) {
            if entry.generation == handle.generation && entry.state != SlotState::Free {
                entry.state = SlotState::Live(offset);
            }
        }
    }

    /// Handles currently resolving exactly to `offset`.
    pub(crate) fn handles_at(&self, offset: NodeOffset) -> SmallVec<[Handle; 4]> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.state == SlotState::Live(offset))
            .map(|(slot, e)| Handle {
                slot: slot as u16,
                generation: e.generation,
            })
            .collect()
    }

    /// Bytes were inserted at `at`: everything at or after it moves forward.
    pub(crate) fn on_insert(&mut self, at: NodeOffset, len: usize) {
        for entry in &mut self.entries {
            if let SlotState::Live(offset) = &mut entry.state {
                if *offset >= at {
                    *offset += len;
                }
            }
        }
    }

    /// Bytes `[at, at + len)` were erased: handles inside become uninitialized, handles after
    /// move back.
    pub(crate) fn on_remove(&mut self, at: NodeOffset, len: usize) {
        let end = at + len;
        for entry in &mut self.entries {
            if let SlotState::Live(offset) = entry.state {
                if offset >= end {
                    entry.state = SlotState::Live(offset - len);
                } else if offset >= at {
                    entry.state = SlotState::Uninitialized;
                }
            }
        }
    }

    /// Bytes `[src, src + len)` were moved so they now start where `dst` was (offsets before
    /// the move). Handles inside the range follow it; handles in between shift to make room.
    pub(crate) fn on_move(&mut self, dst: NodeOffset, src: NodeOffset, len: usize) {
        let remap = |offset: usize| -> usize {
            if dst <= src {
                if offset >= src && offset < src + len {
                    dst + (offset - src)
                } else if offset >= dst && offset < src {
                    offset + len
                } else {
                    offset
                }
            } else if offset >= src && offset < src + len {
                dst - len + (offset - src)
            } else if offset >= src + len && offset < dst {
                offset - len
            } else {
                offset
            }
        };
        for entry in &mut self.entries {
            if let SlotState::Live(offset) = &mut entry.state {
                *offset = remap(*offset);
            }
        }
    }

    /// Every live handle becomes uninitialized.
    pub(crate) fn invalidate_all(&mut self) {
        for entry in &mut self.entries {
            if let SlotState::Live(_) = entry.state {
                entry.state = SlotState::Uninitialized;
            }
        }
    }

    pub(crate) fn snapshot(&self) -> TableSnapshot {
        TableSnapshot {
            entries: self.entries.clone(),
            free: self.free.clone(),
        }
    }

    /// Restore slots and offsets. The generation counter is left alone so handles issued
    /// after the snapshot stay dead.
    pub(crate) fn restore(&mut self, snapshot: TableSnapshot) {
        self.entries = snapshot.entries;
        self.free = snapshot.free;
    }

    /// Offsets of every live handle, for consistency checks.
    pub(crate) fn live_offsets(&self) -> impl Iterator<Item = NodeOffset> + '_ {
        self.entries.iter().filter_map(|e| match e.state {
            SlotState::Live(offset) => Some(offset),
            _ => None,
        })
    }
}
