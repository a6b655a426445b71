//=========================================================================
// Task Pool
//=========================================================================
//
// Fixed arena of deferred-task slots addressed by generational handles.
//
// Architecture:
//   slots: Vec<Slot>   (generation + optional entry)
//   free:  Vec<usize>  (indices available for allocation)
//
// Releasing a slot bumps its generation, so a `TaskId` held by a task
// that fires late (after release or `reset`) resolves to nothing.
// Both vectors are sized at construction; allocation never grows them.
//
//=========================================================================

//=== Internal Dependencies ===============================================

use super::deferred::TaskKind;
use super::ScreenHandle;

//=== TaskId ==============================================================

/// Generational handle to a task slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct TaskId {
    index: usize,
    generation: u32,
}

//=== TaskEntry ===========================================================

/// The work a slot currently holds.
#[derive(Debug, Clone)]
pub(crate) struct TaskEntry {
    pub(crate) kind: TaskKind,
    pub(crate) screen: ScreenHandle,
}

struct Slot {
    generation: u32,
    entry: Option<TaskEntry>,
}

//=== TaskPool ============================================================

pub(crate) struct TaskPool {
    slots: Vec<Slot>,
    free: Vec<usize>,
}

impl TaskPool {
    pub(crate) fn new(capacity: usize) -> Self {
        let slots = (0..capacity)
            .map(|_| Slot { generation: 0, entry: None })
            .collect();

        // Reversed so allocation hands out low indices first
        let free = (0..capacity).rev().collect();

        Self { slots, free }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn in_use(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Claims a free slot for `screen`. Returns `None` if the pool is exhausted.
    pub(crate) fn allocate(&mut self, kind: TaskKind, screen: ScreenHandle) -> Option<TaskId> {
        let index = self.free.pop()?;
        let slot = &mut self.slots[index];
        slot.entry = Some(TaskEntry { kind, screen });

        Some(TaskId { index, generation: slot.generation })
    }

    /// Returns the live entry for `id`, or `None` if the handle is stale.
    pub(crate) fn get(&self, id: TaskId) -> Option<&TaskEntry> {
        self.slots
            .get(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.entry.as_ref())
    }

    /// Whether a live slot already holds `kind` work for `screen`.
    pub(crate) fn holds(&self, kind: TaskKind, screen: &ScreenHandle) -> bool {
        self.slots
            .iter()
            .filter_map(|slot| slot.entry.as_ref())
            .any(|entry| entry.kind == kind && entry.screen == *screen)
    }

    /// Frees the slot and returns its entry. Stale handles release nothing.
    pub(crate) fn release(&mut self, id: TaskId) -> Option<TaskEntry> {
        let slot = self.slots.get_mut(id.index)?;
        if slot.generation != id.generation {
            return None;
        }

        let entry = slot.entry.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        Some(entry)
    }

    /// Invalidates every outstanding handle and frees all slots.
    pub(crate) fn reset(&mut self) {
        self.free.clear();
        for (index, slot) in self.slots.iter_mut().enumerate().rev() {
            slot.entry = None;
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(index);
        }
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
