//! Pointer routing and interactive move/resize
//!
//! The [`CursorGrab`] owns the cursor position and decides where pointer
//! events go: to the surface under the cursor (`Passthrough`) or into a
//! move/resize transform of the grabbed view. It never owns views; the
//! registry is passed in for every call and the grab is told when a view it
//! references goes away.

use crate::backend::{AxisOrientation, ButtonState, Seat, SurfaceId};
use crate::compositor::registry::Registry;
use crate::compositor::CompositorEvent;
use crate::geometry::Point;
use crate::window::{ViewId, ViewState};
use bitflags::bitflags;
use log::{debug, trace};

bitflags! {
    /// Edges a resize grab follows; corners combine two edges
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Edges: u32 {
        const TOP = 1 << 0;
        const BOTTOM = 1 << 1;
        const LEFT = 1 << 2;
        const RIGHT = 1 << 3;
    }
}

impl Edges {
    /// Drops the second of two opposing edges
    ///
    /// `TOP` wins over `BOTTOM` and `LEFT` wins over `RIGHT`, so every axis has
    /// at most one active edge.
    pub fn exclusive(self) -> Edges {
        let mut edges = self;
        if edges.contains(Edges::TOP | Edges::BOTTOM) {
            edges.remove(Edges::BOTTOM);
        }
        if edges.contains(Edges::LEFT | Edges::RIGHT) {
            edges.remove(Edges::RIGHT);
        }
        edges
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrabMode {
    Passthrough,
    Move,
    Resize,
}

/// Window box captured when a resize starts, layout coordinates
#[derive(Debug, Clone, Copy, Default)]
struct GrabBox {
    x: f64,
    y: f64,
    width: i32,
    height: i32,
}

#[derive(Debug)]
pub struct CursorGrab {
    mode: GrabMode,
    target: Option<ViewId>,
    edges: Edges,

    /// Cursor position in layout coordinates
    position: Point,

    /// Move: pointer minus view origin
    anchor: Point,
    /// Resize: pointer position and window box at grab start
    grab_pointer: Point,
    grab_box: GrabBox,

    /// View and surface currently holding pointer focus
    pointer_view: Option<ViewId>,
    pointer_surface: Option<SurfaceId>,

    default_cursor: String,
    default_cursor_shown: bool,
}

impl CursorGrab {
    pub fn new(default_cursor: impl Into<String>) -> Self {
        Self {
            mode: GrabMode::Passthrough,
            target: None,
            edges: Edges::empty(),
            position: Point::default(),
            anchor: Point::default(),
            grab_pointer: Point::default(),
            grab_box: GrabBox::default(),
            pointer_view: None,
            pointer_surface: None,
            default_cursor: default_cursor.into(),
            default_cursor_shown: false,
        }
    }

    pub fn mode(&self) -> GrabMode {
        self.mode
    }

    pub fn target(&self) -> Option<ViewId> {
        self.target
    }

    pub fn edges(&self) -> Edges {
        self.edges
    }

    pub fn position(&self) -> Point {
        self.position
    }

    /// Places the cursor without routing anything
    pub fn warp(&mut self, position: Point) {
        self.position = position;
    }

    /// View whose surface currently has pointer focus
    pub fn pointer_focus(&self) -> Option<ViewId> {
        self.pointer_view
    }

    pub fn pointer_surface(&self) -> Option<SurfaceId> {
        self.pointer_surface
    }

    /// Starts a move or resize of `view`
    ///
    /// Ignored unless `view` holds pointer focus, so unfocused clients cannot
    /// start grabs. Returns `true` when the grab started. A resize of a
    /// maximized or tiled view first turns it back into a window of the same
    /// size.
    pub fn begin_interactive(
        &mut self,
        registry: &mut Registry,
        view: ViewId,
        mode: GrabMode,
        edges: Edges,
    ) -> bool {
        if mode == GrabMode::Passthrough || self.pointer_view != Some(view) {
            debug!("Ignoring {:?} request from {} without pointer focus", mode, view);
            return false;
        }
        let Some(v) = registry.view_mut(view).filter(|v| v.is_visible()) else {
            return false;
        };

        let mut unmaximized = false;
        match mode {
            GrabMode::Move => {
                self.anchor = Point::new(self.position.x - v.x, self.position.y - v.y);
            }
            GrabMode::Resize => {
                unmaximized = v.state() == ViewState::Maximized;
                v.float();
                let geometry = v.geometry();
                self.grab_pointer = self.position;
                self.grab_box = GrabBox {
                    x: v.x + geometry.x as f64,
                    y: v.y + geometry.y as f64,
                    width: v.width(),
                    height: v.height(),
                };
            }
            GrabMode::Passthrough => {}
        }

        if unmaximized {
            registry.emit(CompositorEvent::ViewMaximized {
                view,
                maximized: false,
            });
        }

        self.mode = mode;
        self.target = Some(view);
        self.edges = edges.exclusive();
        debug!("🖱️ {:?} grab on {} edges={:?}", mode, view, self.edges);
        true
    }

    /// Relative motion, clamped to the output layout
    pub fn motion_relative(
        &mut self,
        registry: &mut Registry,
        seat: &mut dyn Seat,
        time: u32,
        dx: f64,
        dy: f64,
    ) {
        let target = Point::new(self.position.x + dx, self.position.y + dy);
        self.position = registry.outputs.clamp(target);
        self.on_pointer_motion(registry, seat, time);
    }

    /// Absolute motion normalised to `0.0..=1.0` over the layout extents
    pub fn motion_absolute(
        &mut self,
        registry: &mut Registry,
        seat: &mut dyn Seat,
        time: u32,
        x: f64,
        y: f64,
    ) {
        let extents = registry.outputs.extents();
        let target = Point::new(
            extents.x as f64 + x * extents.width as f64,
            extents.y as f64 + y * extents.height as f64,
        );
        self.position = registry.outputs.clamp(target);
        self.on_pointer_motion(registry, seat, time);
    }

    /// Routes the current cursor position according to the grab mode
    pub fn on_pointer_motion(&mut self, registry: &mut Registry, seat: &mut dyn Seat, time: u32) {
        match self.mode {
            GrabMode::Move => self.process_move(registry),
            GrabMode::Resize => self.process_resize(registry),
            GrabMode::Passthrough => self.process_passthrough(registry, seat, time),
        }
    }

    fn process_move(&mut self, registry: &mut Registry) {
        let Some(view) = self.target.and_then(|id| registry.view_mut(id)) else {
            self.reset();
            return;
        };

        if matches!(view.state(), ViewState::Maximized | ViewState::Tiled) {
            view.restore(false, self.position);
            self.anchor = Point::new(self.position.x - view.x, self.position.y - view.y);
        }
        view.move_to(self.position.x - self.anchor.x, self.position.y - self.anchor.y);
        trace!("Moved {} to ({:.1}, {:.1})", view.id(), view.x, view.y);

        // A move may cross output boundaries
        registry.damage_all();
    }

    fn process_resize(&mut self, registry: &mut Registry) {
        let Some(view) = self.target.and_then(|id| registry.view_mut(id)) else {
            self.reset();
            return;
        };

        let dx = self.position.x - self.grab_pointer.x;
        let dy = self.position.y - self.grab_pointer.y;
        let start = self.grab_box;

        let mut x = start.x;
        let mut y = start.y;
        let mut width = start.width as f64;
        let mut height = start.height as f64;

        if self.edges.contains(Edges::TOP) {
            y = start.y + dy;
            height -= dy;
        } else if self.edges.contains(Edges::BOTTOM) {
            height += dy;
        }
        if self.edges.contains(Edges::LEFT) {
            x = start.x + dx;
            width -= dx;
        } else if self.edges.contains(Edges::RIGHT) {
            width += dx;
        }

        let old = view.extents();
        let geometry = view.geometry();
        let min_width = view.min_width();
        let min_height = view.min_height();

        let mut width = width.round() as i32;
        let mut height = height.round() as i32;
        if width < min_width {
            width = min_width;
        } else {
            view.x = x - geometry.x as f64;
        }
        if height < min_height {
            height = min_height;
        } else {
            view.y = y - geometry.y as f64;
        }
        view.resize(width, height);
        let new = view.extents();
        trace!("Resized {} to {}x{}", view.id(), width, height);

        registry.damage_rect(old);
        registry.damage_rect(new);
    }

    fn process_passthrough(&mut self, registry: &Registry, seat: &mut dyn Seat, time: u32) {
        match registry.view_at(self.position.x, self.position.y) {
            Some((id, hit)) => {
                if self.pointer_surface == Some(hit.surface) {
                    seat.pointer_motion(time, hit.sx, hit.sy);
                } else {
                    seat.pointer_enter(hit.surface, hit.sx, hit.sy);
                    self.pointer_surface = Some(hit.surface);
                }
                self.pointer_view = Some(id);
                self.default_cursor_shown = false;
            }
            None => {
                self.pointer_view = None;
                if self.pointer_surface.take().is_some() || !self.default_cursor_shown {
                    seat.clear_pointer_focus();
                    seat.set_default_cursor(&self.default_cursor);
                    self.default_cursor_shown = true;
                }
            }
        }
    }

    /// Release always ends the grab; press focuses the view under the cursor
    pub fn on_pointer_button(
        &mut self,
        registry: &mut Registry,
        seat: &mut dyn Seat,
        time: u32,
        button: u32,
        state: ButtonState,
    ) {
        match state {
            ButtonState::Released => {
                if self.mode != GrabMode::Passthrough {
                    debug!("🖱️ {:?} grab on {:?} released", self.mode, self.target);
                }
                self.reset();
            }
            ButtonState::Pressed => {
                if let Some((id, _)) = registry.view_at(self.position.x, self.position.y) {
                    registry.focus(id, seat);
                }
            }
        }

        if self.pointer_surface.is_some() {
            seat.pointer_button(time, button, state);
        }
    }

    pub fn on_pointer_axis(
        &mut self,
        seat: &mut dyn Seat,
        time: u32,
        orientation: AxisOrientation,
        delta: f64,
    ) {
        if self.mode == GrabMode::Passthrough && self.pointer_surface.is_some() {
            seat.pointer_axis(time, orientation, delta);
        }
    }

    /// Drops every reference to `view`; cancels the grab if it was the target
    pub fn view_removed(&mut self, view: ViewId, seat: &mut dyn Seat) {
        if self.target == Some(view) {
            debug!("🖱️ Cancelling {:?} grab, {} went away", self.mode, view);
            self.reset();
        }
        if self.pointer_view == Some(view) {
            self.pointer_view = None;
            self.pointer_surface = None;
            seat.clear_pointer_focus();
        }
    }

    fn reset(&mut self) {
        self.mode = GrabMode::Passthrough;
        self.target = None;
        self.edges = Edges::empty();
    }
}

#[cfg(test)]
mod tests;
