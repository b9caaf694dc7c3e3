//! In-memory backend used by the `meridian` binary and the test suites
//!
//! Surfaces apply configure requests immediately, the seat and render target
//! record what they were asked to do. State is shared through `Rc<RefCell<_>>`
//! handles so a driver can inspect it after handing the boxed trait object to
//! the compositor; everything runs on one thread.

use super::{
    AxisOrientation, ButtonState, KeyState, Modifiers, RenderTarget, Seat, Surface, SurfaceHit,
    SurfaceId, SurfaceNode,
};
use crate::geometry::Rect;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone, Default)]
pub struct HeadlessSurfaceState {
    pub width: i32,
    pub height: i32,
    /// Client-side geometry hint; `None` means "never set"
    pub geometry: Option<Rect>,
    pub min_size: Option<(i32, i32)>,
    pub maximized: bool,
    pub fullscreen: bool,
    pub activated: bool,
    pub closed: bool,
    /// Subsurfaces as (id, box relative to the toplevel), back to front
    pub subsurfaces: Vec<(SurfaceId, Rect)>,
    /// Damage of the latest commit, toplevel-local
    pub damage: Vec<Rect>,
    /// Every size requested through `set_size`, oldest first
    pub configures: Vec<(i32, i32)>,
}

#[derive(Debug, Clone)]
pub struct HeadlessSurface {
    id: SurfaceId,
    state: Rc<RefCell<HeadlessSurfaceState>>,
}

impl HeadlessSurface {
    pub fn new(id: SurfaceId, width: i32, height: i32) -> Self {
        Self {
            id,
            state: Rc::new(RefCell::new(HeadlessSurfaceState {
                width,
                height,
                ..Default::default()
            })),
        }
    }

    pub fn with_min_size(self, width: i32, height: i32) -> Self {
        self.state.borrow_mut().min_size = Some((width, height));
        self
    }

    pub fn with_geometry(self, geometry: Rect) -> Self {
        self.state.borrow_mut().geometry = Some(geometry);
        self
    }

    pub fn with_subsurface(self, id: SurfaceId, rect: Rect) -> Self {
        self.state.borrow_mut().subsurfaces.push((id, rect));
        self
    }

    /// Shared view of the surface state for inspection after boxing
    pub fn handle(&self) -> Rc<RefCell<HeadlessSurfaceState>> {
        Rc::clone(&self.state)
    }

    /// Simulates a client commit with the given damage
    pub fn commit(&self, damage: Vec<Rect>) {
        self.state.borrow_mut().damage = damage;
    }
}

impl Surface for HeadlessSurface {
    fn id(&self) -> SurfaceId {
        self.id
    }

    fn geometry(&self) -> Option<Rect> {
        self.state.borrow().geometry
    }

    fn extents(&self) -> Rect {
        let state = self.state.borrow();
        state
            .subsurfaces
            .iter()
            .fold(Rect::new(0, 0, state.width, state.height), |acc, (_, r)| {
                acc.union(r)
            })
    }

    fn min_size(&self) -> Option<(i32, i32)> {
        self.state.borrow().min_size
    }

    fn set_size(&mut self, width: i32, height: i32) {
        let mut state = self.state.borrow_mut();
        state.width = width;
        state.height = height;
        if let Some(geometry) = state.geometry.as_mut() {
            geometry.width = width;
            geometry.height = height;
        }
        state.configures.push((width, height));
    }

    fn set_maximized(&mut self, maximized: bool) {
        self.state.borrow_mut().maximized = maximized;
    }

    fn set_fullscreen(&mut self, fullscreen: bool) {
        self.state.borrow_mut().fullscreen = fullscreen;
    }

    fn set_activated(&mut self, activated: bool) {
        self.state.borrow_mut().activated = activated;
    }

    fn close(&mut self) {
        self.state.borrow_mut().closed = true;
    }

    fn surface_at(&self, sx: f64, sy: f64) -> Option<SurfaceHit> {
        let state = self.state.borrow();
        for (id, rect) in state.subsurfaces.iter().rev() {
            if rect.contains_point(sx, sy) {
                return Some(SurfaceHit {
                    surface: *id,
                    sx: sx - rect.x as f64,
                    sy: sy - rect.y as f64,
                });
            }
        }
        if Rect::new(0, 0, state.width, state.height).contains_point(sx, sy) {
            return Some(SurfaceHit {
                surface: self.id,
                sx,
                sy,
            });
        }
        None
    }

    fn surface_tree(&self) -> Vec<SurfaceNode> {
        let state = self.state.borrow();
        let mut nodes = vec![SurfaceNode {
            surface: self.id,
            x: 0,
            y: 0,
            width: state.width,
            height: state.height,
            damage: state.damage.clone(),
        }];
        nodes.extend(state.subsurfaces.iter().map(|(id, r)| SurfaceNode {
            surface: *id,
            x: r.x,
            y: r.y,
            width: r.width,
            height: r.height,
            damage: Vec::new(),
        }));
        nodes
    }
}

/// Everything a [`HeadlessSeat`] was asked to deliver
#[derive(Debug, Clone, PartialEq)]
pub enum SeatEvent {
    PointerEnter(SurfaceId, f64, f64),
    PointerMotion(f64, f64),
    PointerButton(u32, ButtonState),
    PointerAxis(AxisOrientation, f64),
    ClearPointerFocus,
    DefaultCursor(String),
    KeyboardEnter(SurfaceId),
    ClearKeyboardFocus,
    Key(u32, KeyState),
    Modifiers(Modifiers),
}

#[derive(Debug, Clone, Default)]
pub struct HeadlessSeat {
    events: Rc<RefCell<Vec<SeatEvent>>>,
}

impl HeadlessSeat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Rc<RefCell<Vec<SeatEvent>>> {
        Rc::clone(&self.events)
    }

    fn record(&mut self, event: SeatEvent) {
        self.events.borrow_mut().push(event);
    }
}

impl Seat for HeadlessSeat {
    fn pointer_enter(&mut self, surface: SurfaceId, sx: f64, sy: f64) {
        self.record(SeatEvent::PointerEnter(surface, sx, sy));
    }

    fn pointer_motion(&mut self, _time: u32, sx: f64, sy: f64) {
        self.record(SeatEvent::PointerMotion(sx, sy));
    }

    fn pointer_button(&mut self, _time: u32, button: u32, state: ButtonState) {
        self.record(SeatEvent::PointerButton(button, state));
    }

    fn pointer_axis(&mut self, _time: u32, orientation: AxisOrientation, delta: f64) {
        self.record(SeatEvent::PointerAxis(orientation, delta));
    }

    fn clear_pointer_focus(&mut self) {
        self.record(SeatEvent::ClearPointerFocus);
    }

    fn set_default_cursor(&mut self, image: &str) {
        self.record(SeatEvent::DefaultCursor(image.to_string()));
    }

    fn keyboard_enter(&mut self, surface: SurfaceId) {
        self.record(SeatEvent::KeyboardEnter(surface));
    }

    fn clear_keyboard_focus(&mut self) {
        self.record(SeatEvent::ClearKeyboardFocus);
    }

    fn keyboard_key(&mut self, _time: u32, key: u32, state: KeyState) {
        self.record(SeatEvent::Key(key, state));
    }

    fn keyboard_modifiers(&mut self, modifiers: Modifiers) {
        self.record(SeatEvent::Modifiers(modifiers));
    }
}

/// One primitive issued to a [`HeadlessRenderer`]
#[derive(Debug, Clone, PartialEq)]
pub enum RenderOp {
    Scissor(Rect),
    Clear([f32; 4]),
    Surface {
        surface: SurfaceId,
        dst: Rect,
        clip: Rect,
    },
    Commit,
}

#[derive(Debug, Clone, Default)]
pub struct HeadlessRenderer {
    pub ops: Vec<RenderOp>,
}

impl HeadlessRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commits(&self) -> usize {
        self.ops.iter().filter(|op| **op == RenderOp::Commit).count()
    }

    pub fn drawn_surfaces(&self) -> Vec<SurfaceId> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                RenderOp::Surface { surface, .. } => Some(*surface),
                _ => None,
            })
            .collect()
    }
}

impl RenderTarget for HeadlessRenderer {
    fn scissor(&mut self, rect: Rect) {
        self.ops.push(RenderOp::Scissor(rect));
    }

    fn clear(&mut self, color: [f32; 4]) {
        self.ops.push(RenderOp::Clear(color));
    }

    fn render_surface(&mut self, surface: SurfaceId, dst: Rect, clip: Rect) {
        self.ops.push(RenderOp::Surface { surface, dst, clip });
    }

    fn commit(&mut self) {
        self.ops.push(RenderOp::Commit);
    }
}
