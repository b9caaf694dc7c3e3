//! Core compositor implementation
//!
//! [`Compositor`] receives every [`BackendEvent`], routes it to the view state
//! machine, the cursor grab or the output set, and repaints outputs on frame
//! ticks. It is the sole owner of views and outputs (through its
//! [`Registry`]); everything else borrows them for the duration of a call.

use crate::backend::{BackendEvent, RenderTarget, Seat, Surface, SurfaceId};
use crate::config::MeridianConfig;
use crate::geometry::Point;
use crate::input::{CursorGrab, Edges, GrabMode};
use crate::output::layout::{resolve_layout, OutputLayoutConfig};
use crate::output::{Output, OutputSet};
use crate::window::{View, ViewId, ViewKind, ViewState};
use log::{debug, info, warn};

pub mod registry;

pub use registry::Registry;

/// Notifications for switchers, panels and display settings
#[derive(Debug, Clone, PartialEq)]
pub enum CompositorEvent {
    ViewMapped(ViewId),
    ViewUnmapped(ViewId),
    ViewMaximized { view: ViewId, maximized: bool },
    FocusChanged(Option<ViewId>),
    OutputConnected(String),
    OutputDisconnected(String),
}

pub type Listener = Box<dyn FnMut(&CompositorEvent)>;

/// Main compositor struct that orchestrates all subsystems
pub struct Compositor {
    config: MeridianConfig,
    layout_config: Option<OutputLayoutConfig>,
    registry: Registry,
    grab: CursorGrab,
    seat: Box<dyn Seat>,
    listeners: Vec<Listener>,
    should_exit: bool,
}

impl Compositor {
    pub fn new(
        config: MeridianConfig,
        layout_config: Option<OutputLayoutConfig>,
        seat: Box<dyn Seat>,
    ) -> Self {
        info!("🏗️ Initializing Meridian compositor core");
        let grab = CursorGrab::new(config.cursor.default_image.clone());
        Self {
            config,
            layout_config,
            registry: Registry::new(),
            grab,
            seat,
            listeners: Vec::new(),
            should_exit: false,
        }
    }

    pub fn config(&self) -> &MeridianConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn outputs(&self) -> &OutputSet {
        &self.registry.outputs
    }

    pub fn view(&self, id: ViewId) -> Option<&View> {
        self.registry.view(id)
    }

    pub fn view_for_surface(&self, surface: SurfaceId) -> Option<ViewId> {
        self.registry.view_for_surface(surface)
    }

    pub fn focused(&self) -> Option<ViewId> {
        self.registry.focused()
    }

    pub fn grab(&self) -> &CursorGrab {
        &self.grab
    }

    pub fn cursor_position(&self) -> Point {
        self.grab.position()
    }

    /// Number of mapped top-level views
    pub fn app_count(&self) -> usize {
        self.registry.app_count()
    }

    /// Set once the last output went away
    pub fn should_exit(&self) -> bool {
        self.should_exit
    }

    pub fn add_listener(&mut self, listener: impl FnMut(&CompositorEvent) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Moves the cursor and routes the motion as if the pointer moved there
    pub fn warp_pointer(&mut self, position: Point) {
        let position = self.registry.outputs.clamp(position);
        self.grab.warp(position);
        self.grab
            .on_pointer_motion(&mut self.registry, self.seat.as_mut(), 0);
        self.dispatch();
    }

    pub fn handle_event(&mut self, event: BackendEvent) {
        debug!("📥 {:?}", event);
        match event {
            BackendEvent::SurfaceCreated {
                surface,
                kind,
                app_id,
                title,
                parent,
            } => {
                self.create_view(surface, kind, app_id, title, parent);
            }
            BackendEvent::SurfaceMapped(surface) => {
                if let Some(id) = self.registry.view_for_surface(surface) {
                    self.map_view(id);
                }
            }
            BackendEvent::SurfaceUnmapped(surface) => {
                if let Some(id) = self.registry.view_for_surface(surface) {
                    self.unmap_view(id);
                }
            }
            BackendEvent::SurfaceDestroyed(surface) => {
                if let Some(id) = self.registry.view_for_surface(surface) {
                    self.destroy_view(id);
                }
            }
            BackendEvent::SurfaceCommitted(surface) => {
                if let Some(id) = self.registry.view_for_surface(surface) {
                    self.commit_view(id, false);
                }
            }
            BackendEvent::SurfaceGeometryChanged(surface) => {
                if let Some(id) = self.registry.view_for_surface(surface) {
                    self.commit_view(id, true);
                }
            }
            BackendEvent::TitleChanged { surface, title } => {
                if let Some(view) = self
                    .registry
                    .view_for_surface(surface)
                    .and_then(|id| self.registry.view_mut(id))
                {
                    view.title = title;
                }
            }
            BackendEvent::MoveRequested(surface) => {
                if let Some(id) = self.registry.view_for_surface(surface) {
                    self.begin_interactive(id, GrabMode::Move, Edges::empty());
                }
            }
            BackendEvent::ResizeRequested { surface, edges } => {
                if let Some(id) = self.registry.view_for_surface(surface) {
                    self.begin_interactive(id, GrabMode::Resize, edges);
                }
            }
            BackendEvent::MaximizeRequested { surface, maximized } => {
                if let Some(id) = self.registry.view_for_surface(surface) {
                    if maximized {
                        self.maximize(id);
                    } else {
                        self.restore(id, true);
                    }
                }
            }
            BackendEvent::FullscreenRequested {
                surface,
                fullscreen,
            } => {
                if let Some(id) = self.registry.view_for_surface(surface) {
                    self.set_fullscreen(id, fullscreen);
                }
            }
            BackendEvent::MinimizeRequested(surface) => {
                if let Some(id) = self.registry.view_for_surface(surface) {
                    self.minimize(id);
                }
            }
            BackendEvent::PointerMotion { time, dx, dy } => {
                self.grab
                    .motion_relative(&mut self.registry, self.seat.as_mut(), time, dx, dy);
            }
            BackendEvent::PointerMotionAbsolute { time, x, y } => {
                self.grab
                    .motion_absolute(&mut self.registry, self.seat.as_mut(), time, x, y);
            }
            BackendEvent::PointerButton {
                time,
                button,
                state,
            } => {
                self.grab.on_pointer_button(
                    &mut self.registry,
                    self.seat.as_mut(),
                    time,
                    button,
                    state,
                );
            }
            BackendEvent::PointerAxis {
                time,
                orientation,
                delta,
            } => {
                self.grab
                    .on_pointer_axis(self.seat.as_mut(), time, orientation, delta);
            }
            BackendEvent::KeyboardKey { time, key, state } => {
                if self.registry.focused().is_some() {
                    self.seat.keyboard_key(time, key, state);
                }
            }
            BackendEvent::KeyboardModifiers(modifiers) => {
                self.seat.keyboard_modifiers(modifiers);
            }
            BackendEvent::DeviceAdded { name, kind } => {
                info!("🔌 Input device added: {} ({:?})", name, kind);
            }
            BackendEvent::OutputConnected {
                name,
                width,
                height,
            } => self.connect_output(name, width, height),
            BackendEvent::OutputDisconnected(name) => self.disconnect_output(&name),
        }
        self.dispatch();
    }

    /// Frame tick for one output; returns `false` when nothing was drawn
    pub fn frame(&mut self, output: &str, target: &mut dyn RenderTarget) -> bool {
        self.registry.render_output(output, target)
    }

    /// Starts an interactive move or resize, see [`CursorGrab::begin_interactive`]
    pub fn begin_interactive(&mut self, id: ViewId, mode: GrabMode, edges: Edges) -> bool {
        let started = self.grab.begin_interactive(&mut self.registry, id, mode, edges);
        self.dispatch();
        started
    }

    pub fn focus(&mut self, id: ViewId) -> bool {
        let changed = self.registry.focus(id, self.seat.as_mut());
        self.dispatch();
        changed
    }

    /// Maximizes onto the output under the cursor
    pub fn maximize(&mut self, id: ViewId) -> bool {
        let Some(area) = self.registry.output_area_at(self.grab.position()) else {
            debug!("No output under the cursor, not maximizing {}", id);
            return false;
        };
        let was_minimized = self.is_minimized(id);
        let changed = self.update_view(id, |view| view.maximize(area));
        if changed {
            if was_minimized {
                self.reveal(id);
            }
            self.registry.emit(CompositorEvent::ViewMaximized {
                view: id,
                maximized: true,
            });
        }
        self.dispatch();
        changed
    }

    pub fn restore(&mut self, id: ViewId, restore_position: bool) -> bool {
        let pointer = self.grab.position();
        let was_maximized = self
            .registry
            .view(id)
            .is_some_and(|v| v.state() == ViewState::Maximized);
        let changed = self.update_view(id, |view| view.restore(restore_position, pointer));
        if changed && was_maximized {
            self.registry.emit(CompositorEvent::ViewMaximized {
                view: id,
                maximized: false,
            });
        }
        self.dispatch();
        changed
    }

    /// Tiles onto the output under the cursor
    pub fn tile(&mut self, id: ViewId, edges: Edges) -> bool {
        let Some(area) = self.registry.output_area_at(self.grab.position()) else {
            debug!("No output under the cursor, not tiling {}", id);
            return false;
        };
        self.update_view(id, |view| view.tile(edges, area))
    }

    pub fn toggle_maximize(&mut self, id: ViewId) -> bool {
        match self.registry.view(id).map(View::state) {
            Some(ViewState::Maximized) => self.restore(id, true),
            Some(_) => self.maximize(id),
            None => false,
        }
    }

    pub fn set_fullscreen(&mut self, id: ViewId, fullscreen: bool) -> bool {
        let area = self.registry.output_area_at(self.grab.position());
        let was_minimized = self.is_minimized(id);
        let changed = self.update_view(id, |view| view.set_fullscreen(fullscreen, area));
        if changed && was_minimized {
            self.reveal(id);
            self.dispatch();
        }
        changed
    }

    pub fn minimize(&mut self, id: ViewId) -> bool {
        if !self.update_view(id, View::minimize) {
            return false;
        }
        self.registry.hide(id);
        self.grab.view_removed(id, self.seat.as_mut());
        if self.registry.focused() == Some(id) {
            self.registry.focus_next(self.seat.as_mut());
        }
        self.dispatch();
        true
    }

    pub fn unminimize(&mut self, id: ViewId) -> bool {
        if !self.update_view(id, View::unminimize) {
            return false;
        }
        self.reveal(id);
        self.dispatch();
        true
    }

    fn is_minimized(&self, id: ViewId) -> bool {
        self.registry
            .view(id)
            .is_some_and(|v| v.state() == ViewState::Minimized)
    }

    /// Puts a view that left the minimized state back on top with focus
    fn reveal(&mut self, id: ViewId) {
        self.registry.show(id);
        self.registry.focus(id, self.seat.as_mut());
    }

    /// Asks the client to close the view
    pub fn close(&mut self, id: ViewId) {
        if let Some(view) = self.registry.view_mut(id) {
            view.close();
        }
    }

    /// Runs a view operation and damages the old and new extents if it changed
    fn update_view(&mut self, id: ViewId, op: impl FnOnce(&mut View) -> bool) -> bool {
        let Some(view) = self.registry.view_mut(id) else {
            return false;
        };
        let old = view.extents();
        if !op(view) {
            return false;
        }
        let new = view.extents();
        self.registry.damage_rect(old);
        self.registry.damage_rect(new);
        true
    }

    fn create_view(
        &mut self,
        surface: Box<dyn Surface>,
        kind: ViewKind,
        app_id: String,
        title: String,
        parent: Option<SurfaceId>,
    ) {
        let parent = parent.and_then(|s| self.registry.view_for_surface(s));
        let id = self.registry.add_view(
            surface,
            kind,
            app_id,
            title,
            parent,
            self.config.fallback_min_size(),
        );
        info!("🪟 New view {} (parent: {:?})", id, parent);
    }

    fn map_view(&mut self, id: ViewId) {
        let pointer = self.grab.position();
        let area = self
            .registry
            .output_area_at(pointer)
            .or_else(|| self.registry.outputs.primary().map(Output::layout_box));
        let scale = self
            .registry
            .output_scale_at(pointer)
            .or_else(|| self.registry.outputs.primary().map(|o| o.scale))
            .unwrap_or(1.0);
        let parent_box = self
            .registry
            .view(id)
            .and_then(View::parent)
            .and_then(|p| self.registry.view(p))
            .filter(|p| p.is_visible())
            .map(View::bounds);

        let Some(view) = self.registry.view_mut(id) else {
            return;
        };
        if !view.map() {
            return;
        }
        view.set_output_scale(scale);
        view.sync_geometry();

        if let Some(anchor) = parent_box.or(area) {
            let geometry = view.geometry();
            let x = anchor.x + (anchor.width - view.width()) / 2 - geometry.x;
            let y = anchor.y + (anchor.height - view.height()) / 2 - geometry.y;
            view.move_to(x as f64, y as f64);
        }
        info!(
            "🗺️ Mapped {} ({}) {}x{} at ({:.0}, {:.0})",
            id,
            view.app_id,
            view.width(),
            view.height(),
            view.x,
            view.y
        );

        self.registry.show(id);
        self.registry.damage_view(id);
        self.registry.emit(CompositorEvent::ViewMapped(id));
        if self.config.view.focus_on_map {
            self.registry.focus(id, self.seat.as_mut());
        }
    }

    fn unmap_view(&mut self, id: ViewId) {
        let Some(view) = self.registry.view_mut(id) else {
            return;
        };
        let old = view.extents();
        if !view.unmap() {
            return;
        }
        info!("🙈 Unmapped {}", id);

        self.registry.hide(id);
        self.registry.damage_rect(old);
        self.grab.view_removed(id, self.seat.as_mut());
        self.registry.emit(CompositorEvent::ViewUnmapped(id));
        if self.registry.focused() == Some(id) {
            self.registry.focus_next(self.seat.as_mut());
        }
    }

    fn destroy_view(&mut self, id: ViewId) {
        self.unmap_view(id);

        // Children move up to the destroyed view's parent
        let grandparent = self.registry.view(id).and_then(View::parent);
        for child in self.registry.children_of(id) {
            if let Some(view) = self.registry.view_mut(child) {
                view.set_parent(grandparent);
            }
        }

        self.grab.view_removed(id, self.seat.as_mut());
        if self.registry.remove_view(id).is_some() {
            info!("🗑️ Destroyed {}", id);
        }
    }

    fn commit_view(&mut self, id: ViewId, geometry_changed: bool) {
        let Some(view) = self.registry.view_mut(id) else {
            return;
        };
        if !view.is_visible() {
            view.sync_geometry();
            return;
        }

        let old = view.bounds();
        let resized = view.sync_geometry();
        if resized || geometry_changed {
            let new = view.extents();
            self.registry.damage_rect(old);
            self.registry.damage_rect(new);
        } else {
            self.registry.damage_view_commit(id);
        }
    }

    fn connect_output(&mut self, name: String, width: i32, height: i32) {
        info!("🖥️ Output connected: {} ({}x{})", name, width, height);
        let first = self.registry.outputs.is_empty();
        self.registry.outputs.add(Output::new(name.clone(), width, height));
        self.relayout();

        if first {
            if let Some(center) = self.registry.outputs.primary().map(|o| o.layout_box().center()) {
                self.grab.warp(center);
            }
        }
        self.registry.emit(CompositorEvent::OutputConnected(name));
    }

    fn disconnect_output(&mut self, name: &str) {
        if self.registry.outputs.remove(name).is_none() {
            return;
        }
        info!("🔌 Output disconnected: {}", name);
        self.registry
            .emit(CompositorEvent::OutputDisconnected(name.to_string()));

        if self.registry.outputs.is_empty() {
            warn!("⚠️ Last output disconnected, shutting down");
            self.should_exit = true;
            return;
        }

        self.relayout();
        let clamped = self.registry.outputs.clamp(self.grab.position());
        self.grab.warp(clamped);
    }

    /// Re-resolves placement of every connected output
    fn relayout(&mut self) {
        let placements = resolve_layout(&self.registry.outputs.infos(), self.layout_config.as_ref());
        self.registry.outputs.apply_layout(&placements);
        self.registry.damage_all();

        // XWayland views follow the scale of the output they sit on
        let updates: Vec<(ViewId, f64)> = self
            .registry
            .views()
            .filter(|v| v.kind() == ViewKind::XWayland)
            .filter_map(|v| {
                let center = v.bounds().center();
                self.registry.output_scale_at(center).map(|s| (v.id(), s))
            })
            .collect();
        for (id, scale) in updates {
            if let Some(view) = self.registry.view_mut(id) {
                view.set_output_scale(scale);
                view.sync_geometry();
            }
        }
    }

    /// One line per output describing its placement
    pub fn describe_layout(&self) -> Vec<String> {
        self.registry
            .outputs
            .iter()
            .map(|o| {
                let b = o.layout_box();
                format!(
                    "{} {}x{}+{}+{} scale {}{}{}",
                    o.name,
                    b.width,
                    b.height,
                    b.x,
                    b.y,
                    o.scale,
                    if o.primary { " primary" } else { "" },
                    if o.enabled { "" } else { " disabled" }
                )
            })
            .collect()
    }

    /// Delivers queued notifications to listeners
    fn dispatch(&mut self) {
        for event in self.registry.take_events() {
            debug!("📣 {:?}", event);
            for listener in self.listeners.iter_mut() {
                listener(&event);
            }
        }
    }
}
