//! Owner of every view and output
//!
//! Other subsystems only hold [`ViewId`]s and output names and borrow the
//! registry when they need the real thing.

use super::CompositorEvent;
use crate::backend::{RenderTarget, Seat, Surface, SurfaceHit, SurfaceId};
use crate::geometry::{Point, Rect};
use crate::output::OutputSet;
use crate::renderer::{self, damage};
use crate::window::{View, ViewId, ViewKind, ViewStack};
use log::debug;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct Registry {
    views: HashMap<ViewId, View>,
    surfaces: HashMap<SurfaceId, ViewId>,
    /// Visible views, back to front
    stack: ViewStack,
    pub outputs: OutputSet,
    focused: Option<ViewId>,
    next_id: u64,
    events: Vec<CompositorEvent>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an unmapped view for a new toplevel surface
    pub fn add_view(
        &mut self,
        surface: Box<dyn Surface>,
        kind: ViewKind,
        app_id: String,
        title: String,
        parent: Option<ViewId>,
        fallback_min_size: (i32, i32),
    ) -> ViewId {
        self.next_id += 1;
        let id = ViewId(self.next_id);
        let surface_id = surface.id();
        let view = View::new(id, surface, kind, app_id, title, parent, fallback_min_size);
        debug!("🪟 Created {} for surface {} ({:?})", id, surface_id, kind);
        self.surfaces.insert(surface_id, id);
        self.views.insert(id, view);
        id
    }

    /// Drops a view and every index that points at it
    pub fn remove_view(&mut self, id: ViewId) -> Option<View> {
        let view = self.views.remove(&id)?;
        self.surfaces.remove(&view.surface_id());
        self.stack.remove(id);
        if self.focused == Some(id) {
            self.focused = None;
        }
        Some(view)
    }

    pub fn view(&self, id: ViewId) -> Option<&View> {
        self.views.get(&id)
    }

    pub fn view_mut(&mut self, id: ViewId) -> Option<&mut View> {
        self.views.get_mut(&id)
    }

    pub fn view_for_surface(&self, surface: SurfaceId) -> Option<ViewId> {
        self.surfaces.get(&surface).copied()
    }

    pub fn views(&self) -> impl Iterator<Item = &View> {
        self.views.values()
    }

    pub fn children_of(&self, parent: ViewId) -> Vec<ViewId> {
        self.views
            .values()
            .filter(|v| v.parent() == Some(parent))
            .map(View::id)
            .collect()
    }

    pub fn stack(&self) -> &ViewStack {
        &self.stack
    }

    /// Puts a visible view on top without focusing it
    pub fn show(&mut self, id: ViewId) {
        if self.views.get(&id).is_some_and(View::is_visible) {
            self.stack.push(id);
        }
    }

    /// Takes a view out of the stack (unmapped or minimized)
    pub fn hide(&mut self, id: ViewId) {
        self.stack.remove(id);
    }

    pub fn focused(&self) -> Option<ViewId> {
        self.focused
    }

    /// Raises and activates `id`, sending it keyboard focus
    ///
    /// Returns `true` if focus moved. Views outside the stack (unmapped,
    /// minimized) are never focused.
    pub fn focus(&mut self, id: ViewId, seat: &mut dyn Seat) -> bool {
        if !self.stack.contains(id) || !self.views.get(&id).is_some_and(View::is_visible) {
            return false;
        }

        self.stack.raise_to_front(id);
        self.damage_view(id);
        if self.focused == Some(id) {
            return false;
        }

        if let Some(previous) = self.focused.take() {
            if let Some(view) = self.views.get_mut(&previous) {
                view.set_activated(false);
            }
        }

        let Some(view) = self.views.get_mut(&id) else {
            return false;
        };
        view.set_activated(true);
        seat.keyboard_enter(view.surface_id());
        self.focused = Some(id);
        debug!("🎯 Focused {} ({})", id, view.app_id);
        self.emit(CompositorEvent::FocusChanged(Some(id)));
        true
    }

    /// Hands focus to the front-most visible view, or clears it
    pub fn focus_next(&mut self, seat: &mut dyn Seat) {
        let next = self
            .stack
            .front_to_back()
            .find(|id| Some(*id) != self.focused);
        match next {
            Some(id) => {
                self.focus(id, seat);
            }
            None => {
                if let Some(previous) = self.focused.take() {
                    if let Some(view) = self.views.get_mut(&previous) {
                        view.set_activated(false);
                    }
                }
                seat.clear_keyboard_focus();
                self.emit(CompositorEvent::FocusChanged(None));
            }
        }
    }

    /// Front-most visible view with a surface under `(lx, ly)`
    pub fn view_at(&self, lx: f64, ly: f64) -> Option<(ViewId, SurfaceHit)> {
        self.stack.front_to_back().find_map(|id| {
            let view = self.views.get(&id)?;
            view.hit_test(lx, ly).map(|hit| (id, hit))
        })
    }

    /// Logical box of the output under `point`
    pub fn output_area_at(&self, point: Point) -> Option<Rect> {
        self.outputs
            .output_at(point.x, point.y)
            .map(|o| o.layout_box())
    }

    pub fn output_scale_at(&self, point: Point) -> Option<f64> {
        self.outputs.output_at(point.x, point.y).map(|o| o.scale)
    }

    pub fn damage_all(&mut self) {
        for output in self.outputs.iter_mut() {
            damage::mark_whole(output);
        }
    }

    /// Damages a layout rectangle on every output it touches
    pub fn damage_rect(&mut self, rect: Rect) {
        for output in self.outputs.iter_mut() {
            damage::mark_layout_rect(output, rect);
        }
    }

    /// Damages the full extents of a view
    pub fn damage_view(&mut self, id: ViewId) {
        if let Some(rect) = self.views.get(&id).map(View::extents) {
            self.damage_rect(rect);
        }
    }

    /// Damages what the view's client reported dirty in its last commit
    pub fn damage_view_commit(&mut self, id: ViewId) {
        let Some(view) = self.views.get(&id) else {
            return;
        };
        for output in self.outputs.iter_mut() {
            damage::mark_view(output, view);
        }
    }

    /// Repaints one output from its pending damage
    pub fn render_output(&mut self, name: &str, target: &mut dyn RenderTarget) -> bool {
        let views: Vec<&View> = self
            .stack
            .render_order()
            .iter()
            .filter_map(|id| self.views.get(id))
            .filter(|v| v.is_visible())
            .collect();
        match self.outputs.get_mut(name) {
            Some(output) if output.enabled => renderer::render_output(output, &views, target),
            Some(output) => {
                damage::consume(output);
                false
            }
            None => false,
        }
    }

    pub fn emit(&mut self, event: CompositorEvent) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<CompositorEvent> {
        std::mem::take(&mut self.events)
    }

    /// Mapped root views
    pub fn app_count(&self) -> usize {
        self.views
            .values()
            .filter(|v| v.is_mapped() && v.is_root())
            .count()
    }
}
