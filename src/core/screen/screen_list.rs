//=========================================================================
// Screen List
//=========================================================================
//
// Ordered, fixed-capacity collection of screen handles.
//
// Backs the stack and every pending collection. Storage is reserved once
// at construction and never grows; pushes beyond capacity are refused.
//
//=========================================================================

//=== Internal Dependencies ===============================================

use super::{ScreenHandle, ScreenId};

//=== ScreenList ==========================================================

/// Bounded ordered list of screens (front = oldest, back = newest).
pub(crate) struct ScreenList {
    items: Vec<ScreenHandle>,
    capacity: usize,
}

impl ScreenList {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub(crate) fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    pub(crate) fn contains(&self, screen: &ScreenHandle) -> bool {
        self.items.iter().any(|s| s == screen)
    }

    pub(crate) fn first(&self) -> Option<&ScreenHandle> {
        self.items.first()
    }

    pub(crate) fn iter(&self) -> impl DoubleEndedIterator<Item = &ScreenHandle> {
        self.items.iter()
    }

    /// Appends at the back. Returns `false` (and drops nothing) when full.
    pub(crate) fn try_push(&mut self, screen: ScreenHandle) -> bool {
        if self.is_full() {
            return false;
        }
        self.items.push(screen);
        true
    }

    /// Removes `screen`, preserving the order of the rest.
    pub(crate) fn remove(&mut self, screen: &ScreenHandle) -> bool {
        match self.items.iter().position(|s| s == screen) {
            Some(pos) => {
                self.items.remove(pos);
                true
            }
            None => false,
        }
    }

    pub(crate) fn clear(&mut self) {
        self.items.clear();
    }

    pub(crate) fn ids(&self) -> Vec<ScreenId> {
        self.items.iter().map(ScreenHandle::id).collect()
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
