//! Contracts consumed from the windowing toolkit
//!
//! Meridian never talks to buffers, input devices or the GPU directly. The
//! toolkit hands us surface handles, a seat and a render target through the
//! traits below, and delivers everything else as [`BackendEvent`]s.

use crate::geometry::Rect;
use crate::window::ViewKind;

pub mod headless;

/// Toolkit-assigned identity of a surface (toplevel or subsurface)
pub type SurfaceId = u64;

/// Result of asking a surface tree which surface occupies a point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceHit {
    pub surface: SurfaceId,
    /// Coordinates local to the hit surface
    pub sx: f64,
    pub sy: f64,
}

/// One surface of a view's surface tree
///
/// `x`/`y` are relative to the view's surface origin. `damage` holds the
/// rectangles the client reported dirty in its latest commit, local to this
/// surface.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceNode {
    pub surface: SurfaceId,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub damage: Vec<Rect>,
}

impl SurfaceNode {
    /// Box of this surface relative to the view's surface origin
    pub fn bounds(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

/// Capability set of a toplevel surface handle
///
/// Sizes and coordinates are in the surface's own units. For native clients
/// these are logical units; XWayland clients report unscaled pixels.
pub trait Surface {
    fn id(&self) -> SurfaceId;

    /// Window geometry hint set by the client, if any
    fn geometry(&self) -> Option<Rect>;

    /// Full extents of the surface tree
    fn extents(&self) -> Rect;

    /// Minimum size hint, if the client provided one
    fn min_size(&self) -> Option<(i32, i32)>;

    fn set_size(&mut self, width: i32, height: i32);
    fn set_maximized(&mut self, maximized: bool);
    fn set_fullscreen(&mut self, fullscreen: bool);
    fn set_activated(&mut self, activated: bool);
    fn close(&mut self);

    /// Which surface of the tree occupies the given surface-local point
    fn surface_at(&self, sx: f64, sy: f64) -> Option<SurfaceHit>;

    /// Surfaces of the tree in back-to-front order
    fn surface_tree(&self) -> Vec<SurfaceNode>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonState {
    Pressed,
    Released,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    Pressed,
    Released,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisOrientation {
    Vertical,
    Horizontal,
}

/// Serialized keyboard modifier state as delivered by the toolkit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub depressed: u32,
    pub latched: u32,
    pub locked: u32,
    pub group: u32,
}

/// Seat abstraction used to deliver input to client surfaces
pub trait Seat {
    fn pointer_enter(&mut self, surface: SurfaceId, sx: f64, sy: f64);
    fn pointer_motion(&mut self, time: u32, sx: f64, sy: f64);
    fn pointer_button(&mut self, time: u32, button: u32, state: ButtonState);
    fn pointer_axis(&mut self, time: u32, orientation: AxisOrientation, delta: f64);
    fn clear_pointer_focus(&mut self);
    fn set_default_cursor(&mut self, image: &str);
    fn keyboard_enter(&mut self, surface: SurfaceId);
    fn clear_keyboard_focus(&mut self);
    fn keyboard_key(&mut self, time: u32, key: u32, state: KeyState);
    fn keyboard_modifiers(&mut self, modifiers: Modifiers);
}

/// Drawing primitives of one output's render pass
///
/// All rectangles are output-local pixels.
pub trait RenderTarget {
    fn scissor(&mut self, rect: Rect);
    fn clear(&mut self, color: [f32; 4]);
    /// Draw `surface` scaled into `dst`, touching only pixels inside `clip`
    fn render_surface(&mut self, surface: SurfaceId, dst: Rect, clip: Rect);
    fn commit(&mut self);
}

/// Kind of input device reported by the toolkit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Keyboard,
    Pointer,
    Touch,
    Other,
}

/// Everything the toolkit reports to the core
pub enum BackendEvent {
    SurfaceCreated {
        surface: Box<dyn Surface>,
        kind: ViewKind,
        app_id: String,
        title: String,
        parent: Option<SurfaceId>,
    },
    SurfaceMapped(SurfaceId),
    SurfaceUnmapped(SurfaceId),
    SurfaceDestroyed(SurfaceId),
    SurfaceCommitted(SurfaceId),
    SurfaceGeometryChanged(SurfaceId),
    TitleChanged {
        surface: SurfaceId,
        title: String,
    },
    /// Client asked for an interactive move (e.g. title bar drag)
    MoveRequested(SurfaceId),
    /// Client asked for an interactive resize along `edges`
    ResizeRequested {
        surface: SurfaceId,
        edges: crate::input::Edges,
    },
    MaximizeRequested {
        surface: SurfaceId,
        maximized: bool,
    },
    FullscreenRequested {
        surface: SurfaceId,
        fullscreen: bool,
    },
    MinimizeRequested(SurfaceId),
    PointerMotion {
        time: u32,
        dx: f64,
        dy: f64,
    },
    /// Absolute motion normalised to `0.0..=1.0` over the layout extents
    PointerMotionAbsolute {
        time: u32,
        x: f64,
        y: f64,
    },
    PointerButton {
        time: u32,
        button: u32,
        state: ButtonState,
    },
    PointerAxis {
        time: u32,
        orientation: AxisOrientation,
        delta: f64,
    },
    KeyboardKey {
        time: u32,
        key: u32,
        state: KeyState,
    },
    KeyboardModifiers(Modifiers),
    DeviceAdded {
        name: String,
        kind: DeviceKind,
    },
    OutputConnected {
        name: String,
        width: i32,
        height: i32,
    },
    OutputDisconnected(String),
}

impl std::fmt::Debug for BackendEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendEvent::SurfaceCreated {
                surface,
                kind,
                app_id,
                ..
            } => f
                .debug_struct("SurfaceCreated")
                .field("surface", &surface.id())
                .field("kind", kind)
                .field("app_id", app_id)
                .finish_non_exhaustive(),
            BackendEvent::SurfaceMapped(id) => write!(f, "SurfaceMapped({id})"),
            BackendEvent::SurfaceUnmapped(id) => write!(f, "SurfaceUnmapped({id})"),
            BackendEvent::SurfaceDestroyed(id) => write!(f, "SurfaceDestroyed({id})"),
            BackendEvent::SurfaceCommitted(id) => write!(f, "SurfaceCommitted({id})"),
            BackendEvent::SurfaceGeometryChanged(id) => {
                write!(f, "SurfaceGeometryChanged({id})")
            }
            BackendEvent::TitleChanged { surface, title } => {
                write!(f, "TitleChanged({surface}, {title:?})")
            }
            BackendEvent::MoveRequested(id) => write!(f, "MoveRequested({id})"),
            BackendEvent::ResizeRequested { surface, edges } => {
                write!(f, "ResizeRequested({surface}, {edges:?})")
            }
            BackendEvent::MaximizeRequested { surface, maximized } => {
                write!(f, "MaximizeRequested({surface}, {maximized})")
            }
            BackendEvent::FullscreenRequested {
                surface,
                fullscreen,
            } => write!(f, "FullscreenRequested({surface}, {fullscreen})"),
            BackendEvent::MinimizeRequested(id) => write!(f, "MinimizeRequested({id})"),
            BackendEvent::PointerMotion { dx, dy, .. } => {
                write!(f, "PointerMotion({dx:.1}, {dy:.1})")
            }
            BackendEvent::PointerMotionAbsolute { x, y, .. } => {
                write!(f, "PointerMotionAbsolute({x:.3}, {y:.3})")
            }
            BackendEvent::PointerButton { button, state, .. } => {
                write!(f, "PointerButton({button}, {state:?})")
            }
            BackendEvent::PointerAxis {
                orientation, delta, ..
            } => write!(f, "PointerAxis({orientation:?}, {delta:.1})"),
            BackendEvent::KeyboardKey { key, state, .. } => {
                write!(f, "KeyboardKey({key}, {state:?})")
            }
            BackendEvent::KeyboardModifiers(m) => write!(f, "KeyboardModifiers({m:?})"),
            BackendEvent::DeviceAdded { name, kind } => {
                write!(f, "DeviceAdded({name:?}, {kind:?})")
            }
            BackendEvent::OutputConnected {
                name,
                width,
                height,
            } => write!(f, "OutputConnected({name:?}, {width}x{height})"),
            BackendEvent::OutputDisconnected(name) => write!(f, "OutputDisconnected({name:?})"),
        }
    }
}
