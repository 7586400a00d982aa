use std::collections::VecDeque;

use crate::document::frame::Frame;
use crate::document::layer::Layer;

/// Whole-document state captured for undo.
///
/// Cells are `Arc`-shared, so a snapshot costs one pointer per layer per frame rather than a copy
/// of every pixel.
#[derive(Clone, Debug)]
pub struct Snapshot {
    pub(crate) layers: Vec<Layer>,
    pub(crate) frames: Vec<Frame>,
}

impl Snapshot {
    /// Layer list at capture time.
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Frame sequence at capture time.
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }
}

/// Bounded linear undo history.
///
/// `entries[cursor]` is the current state. Recording after an undo truncates the redo branch;
/// once more than `capacity` entries exist the oldest is dropped, so undo can never go back
/// past the oldest retained state.
#[derive(Debug)]
pub struct History {
    entries: VecDeque<Snapshot>,
    cursor: usize,
    capacity: usize,
}

impl History {
    /// History seeded with the initial state.
    pub fn new(initial: Snapshot, capacity: usize) -> Self {
        let mut entries = VecDeque::with_capacity(capacity.max(1));
        entries.push_back(initial);
        Self {
            entries,
            cursor: 0,
            capacity: capacity.max(1),
        }
    }

    /// Record a new current state.
    pub fn record(&mut self, snapshot: Snapshot) {
        self.entries.truncate(self.cursor + 1);
        self.entries.push_back(snapshot);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
        self.cursor = self.entries.len() - 1;
    }

    /// Step back; returns the state to restore, or `None` at the oldest entry.
    pub fn undo(&mut self) -> Option<&Snapshot> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        self.entries.get(self.cursor)
    }

    /// Step forward; returns the state to restore, or `None` at the newest entry.
    pub fn redo(&mut self) -> Option<&Snapshot> {
        if self.cursor + 1 >= self.entries.len() {
            return None;
        }
        self.cursor += 1;
        self.entries.get(self.cursor)
    }

    /// Whether [`History::undo`] would do something.
    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    /// Whether [`History::redo`] would do something.
    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    /// Number of retained entries, current state included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Never true; the current state is always retained.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Configured cap.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop everything except `snapshot`, e.g. after loading a project.
    pub fn reset(&mut self, snapshot: Snapshot) {
        self.entries.clear();
        self.entries.push_back(snapshot);
        self.cursor = 0;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/document/history.rs"]
mod tests;
