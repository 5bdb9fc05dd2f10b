//! In-memory undo snapshots for save_undo / restore_undo

use crate::interpreter::quetzal::save_bytes::PortableGameState;
use log::debug;
use std::collections::VecDeque;

/// Fixed-capacity ring of snapshots; the oldest is dropped when full
#[derive(Debug, Default)]
pub struct UndoRing {
    capacity: usize,
    snapshots: VecDeque<PortableGameState>,
}

impl UndoRing {
    pub fn new(capacity: usize) -> Self {
        UndoRing {
            capacity,
            snapshots: VecDeque::with_capacity(capacity),
        }
    }

    /// Undo is unavailable when configured with no slots
    pub fn is_enabled(&self) -> bool {
        self.capacity > 0
    }

    pub fn push(&mut self, state: PortableGameState) -> bool {
        if !self.is_enabled() {
            return false;
        }
        if self.snapshots.len() == self.capacity {
            self.snapshots.pop_front();
            debug!("Undo ring full, dropped oldest snapshot");
        }
        self.snapshots.push_back(state);
        true
    }

    /// Most recent snapshot
    pub fn pop(&mut self) -> Option<PortableGameState> {
        self.snapshots.pop_back()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
    }
}
