//! Front-to-back ordering of mapped views
//!
//! Views are stored back to front (render order); the last entry is the front
//! of the list, i.e. the most recently focused view and the first candidate for
//! hit-testing.

use super::ViewId;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct ViewStack {
    /// Views ordered from back to front
    views: Vec<ViewId>,

    /// Fast lookup: view ID → position in stack
    positions: HashMap<ViewId, usize>,
}

impl ViewStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a view at the front. Returns `false` if it was already present.
    pub fn push(&mut self, id: ViewId) -> bool {
        if self.positions.contains_key(&id) {
            return false;
        }

        self.positions.insert(id, self.views.len());
        self.views.push(id);
        true
    }

    /// Removes a view, returning its previous position
    pub fn remove(&mut self, id: ViewId) -> Option<usize> {
        let pos = self.positions.remove(&id)?;
        self.views.remove(pos);
        self.rebuild_positions();
        Some(pos)
    }

    /// Moves a view to the front. No-op for views not in the stack.
    pub fn raise_to_front(&mut self, id: ViewId) -> bool {
        if self.front() == Some(id) {
            return true;
        }
        if self.remove(id).is_some() {
            self.push(id);
            true
        } else {
            false
        }
    }

    /// Back-to-front order, the order views are drawn in
    pub fn render_order(&self) -> &[ViewId] {
        &self.views
    }

    /// Front-to-back order, the order views are hit-tested in
    pub fn front_to_back(&self) -> impl Iterator<Item = ViewId> + '_ {
        self.views.iter().rev().copied()
    }

    pub fn front(&self) -> Option<ViewId> {
        self.views.last().copied()
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    pub fn contains(&self, id: ViewId) -> bool {
        self.positions.contains_key(&id)
    }

    pub fn clear(&mut self) {
        self.views.clear();
        self.positions.clear();
    }

    fn rebuild_positions(&mut self) {
        self.positions.clear();
        for (i, &id) in self.views.iter().enumerate() {
            self.positions.insert(id, i);
        }
    }
}
