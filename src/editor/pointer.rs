use std::collections::BTreeMap;

use crate::foundation::core::{Point, Vec2};

/// Platform pointer id (mouse, pen or touch contact).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PointerId(pub u64);

/// Which button started the contact.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PointerButton {
    /// Left mouse button, pen tip, touch.
    #[default]
    Primary,
    /// Right mouse button.
    Secondary,
    /// Wheel button.
    Middle,
}

/// One pointer sample in screen coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerEvent {
    /// Stable id for the pointer's lifetime.
    pub id: PointerId,
    /// Screen position.
    pub position: Point,
    /// Button that started the contact.
    pub button: PointerButton,
}

impl PointerEvent {
    /// Primary-button event.
    pub fn primary(id: u64, x: f64, y: f64) -> Self {
        Self {
            id: PointerId(id),
            position: Point::new(x, y),
            button: PointerButton::Primary,
        }
    }

    /// Same event with another button.
    pub fn with_button(self, button: PointerButton) -> Self {
        Self { button, ..self }
    }
}

/// Live pointers, keyed by id, at their latest screen positions.
#[derive(Clone, Debug, Default)]
pub struct PointerTable {
    live: BTreeMap<PointerId, Point>,
}

impl PointerTable {
    /// Track a new contact (or update an existing one).
    pub fn insert(&mut self, id: PointerId, at: Point) {
        self.live.insert(id, at);
    }

    /// Update a tracked contact. Unknown ids are ignored.
    pub fn update(&mut self, id: PointerId, at: Point) -> bool {
        match self.live.get_mut(&id) {
            Some(p) => {
                *p = at;
                true
            }
            None => false,
        }
    }

    /// Stop tracking a contact.
    pub fn remove(&mut self, id: PointerId) -> Option<Point> {
        self.live.remove(&id)
    }

    /// Whether `id` is tracked.
    pub fn contains(&self, id: PointerId) -> bool {
        self.live.contains_key(&id)
    }

    /// Number of live contacts.
    pub fn len(&self) -> usize {
        self.live.len()
    }

    /// No live contacts.
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Forget every contact.
    pub fn clear(&mut self) {
        self.live.clear();
    }

    /// Mean position of all contacts.
    pub fn centroid(&self) -> Option<Point> {
        if self.live.is_empty() {
            return None;
        }
        let sum = self
            .live
            .values()
            .fold(Vec2::ZERO, |acc, p| acc + p.to_vec2());
        Some((sum / self.live.len() as f64).to_point())
    }

    /// Distance between the two lowest-id contacts; `None` with fewer than two.
    pub fn spread(&self) -> Option<f64> {
        let mut it = self.live.values();
        let a = it.next()?;
        let b = it.next()?;
        Some(a.distance(*b))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/editor/pointer.rs"]
mod tests;
