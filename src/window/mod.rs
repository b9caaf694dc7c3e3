//! Views and their state machine
//!
//! A [`View`] is one managed application window, independent of the client
//! protocol that created it. Views live in the compositor's registry, keyed by
//! [`ViewId`]; parents are stored as ids so popups and dialogs never own (or
//! are owned by) the view they belong to.
//!
//! Every state operation is a no-op on an unmapped view or on a view already in
//! the target state. Operations return `true` when they changed something.

use crate::backend::{Surface, SurfaceHit, SurfaceId, SurfaceNode};
use crate::geometry::{Point, Rect};
use crate::input::Edges;
use log::debug;

pub mod stack;

pub use stack::ViewStack;

/// Stable identity of a view inside the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewId(pub u64);

impl std::fmt::Display for ViewId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "view#{}", self.0)
    }
}

/// Mutually exclusive placement states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    Windowed,
    Tiled,
    Maximized,
    Fullscreen,
    Minimized,
}

/// Which protocol created the view
///
/// The only behavioural difference is the coordinate scale: native clients
/// work in logical units and are scaled by the output, XWayland clients work
/// in unscaled pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    Native,
    XWayland,
}

pub struct View {
    id: ViewId,
    pub app_id: String,
    pub title: String,
    kind: ViewKind,
    surface: Box<dyn Surface>,

    /// Surface origin in layout coordinates
    pub x: f64,
    pub y: f64,
    width: i32,
    height: i32,

    /// Last windowed geometry, restored when returning to `Windowed`
    old_x: f64,
    old_y: f64,
    old_width: i32,
    old_height: i32,

    state: ViewState,
    /// State to return to when un-minimizing
    pre_minimize_state: ViewState,

    parent: Option<ViewId>,
    mapped: bool,
    activated: bool,

    /// Scale of the output the view sits on (used by XWayland views)
    output_scale: f64,
    fallback_min_size: (i32, i32),
}

impl std::fmt::Debug for View {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("View")
            .field("id", &self.id)
            .field("app_id", &self.app_id)
            .field("kind", &self.kind)
            .field("state", &self.state)
            .field("x", &self.x)
            .field("y", &self.y)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("mapped", &self.mapped)
            .finish_non_exhaustive()
    }
}

impl View {
    pub fn new(
        id: ViewId,
        surface: Box<dyn Surface>,
        kind: ViewKind,
        app_id: String,
        title: String,
        parent: Option<ViewId>,
        fallback_min_size: (i32, i32),
    ) -> Self {
        let mut view = Self {
            id,
            app_id,
            title,
            kind,
            surface,
            x: 0.0,
            y: 0.0,
            width: 0,
            height: 0,
            old_x: 0.0,
            old_y: 0.0,
            old_width: 0,
            old_height: 0,
            state: ViewState::Windowed,
            pre_minimize_state: ViewState::Windowed,
            parent,
            mapped: false,
            activated: false,
            output_scale: 1.0,
            fallback_min_size,
        };
        view.sync_geometry();
        view
    }

    pub fn id(&self) -> ViewId {
        self.id
    }

    pub fn kind(&self) -> ViewKind {
        self.kind
    }

    pub fn state(&self) -> ViewState {
        self.state
    }

    pub fn surface_id(&self) -> SurfaceId {
        self.surface.id()
    }

    pub fn parent(&self) -> Option<ViewId> {
        self.parent
    }

    pub fn set_parent(&mut self, parent: Option<ViewId>) {
        self.parent = parent;
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn is_mapped(&self) -> bool {
        self.mapped
    }

    /// Mapped and not minimized: drawn and hit-testable
    pub fn is_visible(&self) -> bool {
        self.mapped && self.state != ViewState::Minimized
    }

    pub fn is_activated(&self) -> bool {
        self.activated
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// Saved windowed geometry as `(x, y, width, height)`
    pub fn saved_geometry(&self) -> (f64, f64, i32, i32) {
        (self.old_x, self.old_y, self.old_width, self.old_height)
    }

    /// Factor from layout units to surface units
    pub fn coordinate_scale(&self) -> f64 {
        match self.kind {
            ViewKind::Native => 1.0,
            ViewKind::XWayland => self.output_scale,
        }
    }

    pub fn set_output_scale(&mut self, scale: f64) {
        if scale > 0.0 {
            self.output_scale = scale;
        }
    }

    pub fn min_width(&self) -> i32 {
        self.surface
            .min_size()
            .map(|(w, _)| (w as f64 / self.coordinate_scale()).ceil() as i32)
            .filter(|w| *w > 0)
            .unwrap_or(self.fallback_min_size.0)
            .max(1)
    }

    pub fn min_height(&self) -> i32 {
        self.surface
            .min_size()
            .map(|(_, h)| (h as f64 / self.coordinate_scale()).ceil() as i32)
            .filter(|h| *h > 0)
            .unwrap_or(self.fallback_min_size.1)
            .max(1)
    }

    /// Window geometry relative to the surface origin, in layout units
    ///
    /// Falls back to the full surface extents when the client never set a
    /// geometry hint.
    pub fn geometry(&self) -> Rect {
        let raw = self
            .surface
            .geometry()
            .filter(|g| !g.is_empty())
            .unwrap_or_else(|| self.surface.extents());
        let scale = self.coordinate_scale();
        if scale == 1.0 {
            raw
        } else {
            Rect::covering(
                raw.x as f64 / scale,
                raw.y as f64 / scale,
                raw.width as f64 / scale,
                raw.height as f64 / scale,
            )
        }
    }

    /// Window box in layout coordinates
    pub fn bounds(&self) -> Rect {
        let geometry = self.geometry();
        Rect::covering(
            self.x + geometry.x as f64,
            self.y + geometry.y as f64,
            self.width as f64,
            self.height as f64,
        )
    }

    /// Full surface tree extents in layout coordinates
    pub fn extents(&self) -> Rect {
        let scale = self.coordinate_scale();
        let e = self.surface.extents();
        Rect::covering(
            self.x + e.x as f64 / scale,
            self.y + e.y as f64 / scale,
            e.width as f64 / scale,
            e.height as f64 / scale,
        )
    }

    /// Re-reads width and height from the surface. Returns `true` if they changed.
    pub fn sync_geometry(&mut self) -> bool {
        let geometry = self.geometry();
        let changed = geometry.width != self.width || geometry.height != self.height;
        self.width = geometry.width;
        self.height = geometry.height;
        changed
    }

    pub fn surface_tree(&self) -> Vec<SurfaceNode> {
        self.surface.surface_tree()
    }

    pub(crate) fn map(&mut self) -> bool {
        if self.mapped {
            return false;
        }
        self.mapped = true;
        self.sync_geometry();
        true
    }

    pub(crate) fn unmap(&mut self) -> bool {
        if !self.mapped {
            return false;
        }
        self.mapped = false;
        self.activated = false;
        true
    }

    pub fn set_activated(&mut self, activated: bool) {
        if self.activated != activated {
            self.activated = activated;
            self.surface.set_activated(activated);
        }
    }

    pub fn close(&mut self) {
        self.surface.close();
    }

    pub fn move_to(&mut self, x: f64, y: f64) {
        self.x = x;
        self.y = y;
    }

    /// Requests a new size from the client and adopts it immediately
    pub fn resize(&mut self, width: i32, height: i32) {
        let width = width.max(1);
        let height = height.max(1);
        self.width = width;
        self.height = height;
        let scale = self.coordinate_scale();
        self.surface.set_size(
            (width as f64 * scale).round() as i32,
            (height as f64 * scale).round() as i32,
        );
    }

    /// Places the window box at `area`'s origin with `area`'s size
    fn fill(&mut self, area: Rect) {
        let geometry = self.geometry();
        self.x = (area.x - geometry.x) as f64;
        self.y = (area.y - geometry.y) as f64;
        self.resize(area.width, area.height);
    }

    fn snapshot_if_windowed(&mut self) {
        if self.state == ViewState::Windowed {
            self.old_x = self.x;
            self.old_y = self.y;
            self.old_width = self.width;
            self.old_height = self.height;
        }
    }

    fn leave_state(&mut self) {
        match self.state {
            ViewState::Maximized => self.surface.set_maximized(false),
            ViewState::Fullscreen => self.surface.set_fullscreen(false),
            _ => {}
        }
    }

    /// Covers `area` (the logical box of the output under the pointer)
    pub fn maximize(&mut self, area: Rect) -> bool {
        if !self.mapped || self.state == ViewState::Maximized {
            return false;
        }

        self.snapshot_if_windowed();
        self.leave_state();
        self.fill(area);
        self.surface.set_maximized(true);
        self.state = ViewState::Maximized;
        debug!("{} maximized to {:?}", self.id, area);
        true
    }

    /// Returns from `Maximized` or `Tiled` to the saved windowed size
    ///
    /// With `restore_position` the saved origin comes back too; otherwise `x`
    /// is recomputed so `pointer` keeps its relative horizontal offset inside
    /// the window.
    pub fn restore(&mut self, restore_position: bool, pointer: Point) -> bool {
        if !self.mapped || !matches!(self.state, ViewState::Maximized | ViewState::Tiled) {
            return false;
        }

        if restore_position {
            self.x = self.old_x;
            self.y = self.old_y;
        } else if self.width > 0 {
            let ratio = (pointer.x - self.x) / self.width as f64;
            self.x = pointer.x - ratio * self.old_width as f64;
        }

        self.leave_state();
        self.resize(self.old_width, self.old_height);
        self.state = ViewState::Windowed;
        debug!(
            "{} restored to {}x{} at ({:.1}, {:.1})",
            self.id, self.width, self.height, self.x, self.y
        );
        true
    }

    /// Leaves `Maximized` or `Tiled` for `Windowed` at the current geometry
    ///
    /// Used when an interactive resize takes over; the saved size is kept
    /// but not applied.
    pub fn float(&mut self) -> bool {
        if !self.mapped || !matches!(self.state, ViewState::Maximized | ViewState::Tiled) {
            return false;
        }
        self.leave_state();
        self.state = ViewState::Windowed;
        debug!("{} floated at {}x{}", self.id, self.width, self.height);
        true
    }

    /// Half of `area`'s width, full height, flush to the requested edge
    ///
    /// `LEFT` is checked before `RIGHT`; a mask with neither is ignored.
    pub fn tile(&mut self, edges: Edges, area: Rect) -> bool {
        if !self.mapped || !matches!(self.state, ViewState::Windowed | ViewState::Tiled) {
            return false;
        }

        let half = area.width / 2;
        let x = if edges.contains(Edges::LEFT) {
            area.x
        } else if edges.contains(Edges::RIGHT) {
            area.x + area.width - half
        } else {
            return false;
        };

        let target = Rect::new(x, area.y, half, area.height);
        if self.state == ViewState::Tiled && self.bounds() == target {
            return false;
        }

        self.snapshot_if_windowed();
        self.fill(target);
        self.state = ViewState::Tiled;
        debug!("{} tiled to {:?}", self.id, target);
        true
    }

    /// `restore(true)` when maximized, otherwise `maximize(area)`
    ///
    /// Without an output (`area == None`) only the restore half can happen.
    pub fn toggle_maximize(&mut self, area: Option<Rect>) -> bool {
        if self.state == ViewState::Maximized {
            self.restore(true, Point::default())
        } else if let Some(area) = area {
            self.maximize(area)
        } else {
            false
        }
    }

    pub fn set_fullscreen(&mut self, fullscreen: bool, area: Option<Rect>) -> bool {
        if !self.mapped {
            return false;
        }

        if fullscreen {
            let Some(area) = area else {
                return false;
            };
            if self.state == ViewState::Fullscreen {
                return false;
            }
            self.snapshot_if_windowed();
            self.leave_state();
            self.fill(area);
            self.surface.set_fullscreen(true);
            self.state = ViewState::Fullscreen;
        } else {
            if self.state != ViewState::Fullscreen {
                return false;
            }
            self.leave_state();
            self.x = self.old_x;
            self.y = self.old_y;
            self.resize(self.old_width, self.old_height);
            self.state = ViewState::Windowed;
        }
        debug!("{} fullscreen={}", self.id, fullscreen);
        true
    }

    pub fn minimize(&mut self) -> bool {
        if !self.mapped || self.state == ViewState::Minimized {
            return false;
        }
        self.snapshot_if_windowed();
        self.pre_minimize_state = self.state;
        self.state = ViewState::Minimized;
        self.set_activated(false);
        true
    }

    pub fn unminimize(&mut self) -> bool {
        if self.state != ViewState::Minimized {
            return false;
        }
        self.state = self.pre_minimize_state;
        true
    }

    /// Which surface of this view lies under the layout point `(lx, ly)`
    pub fn hit_test(&self, lx: f64, ly: f64) -> Option<SurfaceHit> {
        if !self.is_visible() {
            return None;
        }
        let scale = self.coordinate_scale();
        let sx = (lx - self.x) * scale;
        let sy = (ly - self.y) * scale;
        self.surface.surface_at(sx, sy)
    }
}
