//! Connected displays and their placement in layout space
//!
//! Each [`Output`] carries its own pending damage; the set of outputs is owned
//! by the compositor registry and re-arranged whenever the connected set
//! changes (see [`layout::resolve_layout`]).

use crate::geometry::{Point, Rect};
use crate::renderer::damage::OutputDamage;
use log::debug;

pub mod layout;

pub use layout::{OutputInfo, OutputLayoutConfig, OutputPlacement};

#[derive(Debug)]
pub struct Output {
    pub name: String,
    /// Position in layout space (logical units)
    pub x: i32,
    pub y: i32,
    /// Mode size in pixels
    pub pixel_width: i32,
    pub pixel_height: i32,
    pub scale: f64,
    pub primary: bool,
    pub enabled: bool,
    pub damage: OutputDamage,
}

impl Output {
    pub fn new(name: impl Into<String>, pixel_width: i32, pixel_height: i32) -> Self {
        Self {
            name: name.into(),
            x: 0,
            y: 0,
            pixel_width,
            pixel_height,
            scale: 1.0,
            primary: false,
            enabled: true,
            damage: OutputDamage::new(),
        }
    }

    pub fn logical_width(&self) -> i32 {
        (self.pixel_width as f64 / self.scale).round() as i32
    }

    pub fn logical_height(&self) -> i32 {
        (self.pixel_height as f64 / self.scale).round() as i32
    }

    /// Output box in layout space
    pub fn layout_box(&self) -> Rect {
        Rect::new(self.x, self.y, self.logical_width(), self.logical_height())
    }

    /// Output box in its own pixel space (origin at 0,0)
    pub fn pixel_box(&self) -> Rect {
        Rect::new(0, 0, self.pixel_width, self.pixel_height)
    }

    pub fn info(&self) -> OutputInfo {
        OutputInfo {
            name: self.name.clone(),
            pixel_width: self.pixel_width,
            pixel_height: self.pixel_height,
            connected: true,
        }
    }

    fn apply(&mut self, placement: &OutputPlacement) {
        self.x = placement.x;
        self.y = placement.y;
        self.scale = if placement.scale > 0.0 {
            placement.scale
        } else {
            1.0
        };
        self.primary = placement.primary;
        self.enabled = placement.enabled;
    }
}

/// All connected outputs in connection order
#[derive(Debug, Default)]
pub struct OutputSet {
    outputs: Vec<Output>,
}

impl OutputSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, output: Output) {
        self.outputs.retain(|o| o.name != output.name);
        self.outputs.push(output);
    }

    pub fn remove(&mut self, name: &str) -> Option<Output> {
        let pos = self.outputs.iter().position(|o| o.name == name)?;
        Some(self.outputs.remove(pos))
    }

    pub fn get(&self, name: &str) -> Option<&Output> {
        self.outputs.iter().find(|o| o.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Output> {
        self.outputs.iter_mut().find(|o| o.name == name)
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Output> {
        self.outputs.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Output> {
        self.outputs.iter_mut()
    }

    /// Enabled outputs only
    pub fn active(&self) -> impl Iterator<Item = &Output> {
        self.outputs.iter().filter(|o| o.enabled)
    }

    /// The enabled output whose layout box contains `(x, y)`
    pub fn output_at(&self, x: f64, y: f64) -> Option<&Output> {
        self.active().find(|o| o.layout_box().contains_point(x, y))
    }

    pub fn primary(&self) -> Option<&Output> {
        self.active()
            .find(|o| o.primary)
            .or_else(|| self.active().next())
    }

    /// Bounding box of all enabled outputs
    pub fn extents(&self) -> Rect {
        self.active()
            .fold(Rect::default(), |acc, o| acc.union(&o.layout_box()))
    }

    /// Clamps a layout point into the nearest enabled output
    pub fn clamp(&self, point: Point) -> Point {
        if self.output_at(point.x, point.y).is_some() {
            return point;
        }

        let mut best: Option<(f64, Point)> = None;
        for output in self.active() {
            let b = output.layout_box();
            let cx = point.x.clamp(b.x as f64, (b.right() - 1).max(b.x) as f64);
            let cy = point.y.clamp(b.y as f64, (b.bottom() - 1).max(b.y) as f64);
            let dist = (cx - point.x).powi(2) + (cy - point.y).powi(2);
            if best.map_or(true, |(d, _)| dist < d) {
                best = Some((dist, Point::new(cx, cy)));
            }
        }
        best.map(|(_, p)| p).unwrap_or(point)
    }

    /// Connected outputs as resolver input, in connection order
    pub fn infos(&self) -> Vec<OutputInfo> {
        self.outputs.iter().map(Output::info).collect()
    }

    /// Applies resolved placements. Outputs missing from `placements` keep
    /// their current settings.
    pub fn apply_layout(&mut self, placements: &[OutputPlacement]) {
        for placement in placements {
            if let Some(output) = self.get_mut(&placement.name) {
                output.apply(placement);
                debug!(
                    "🖥️ {} at ({}, {}) scale {} primary={} enabled={}",
                    output.name, output.x, output.y, output.scale, output.primary, output.enabled
                );
            }
        }
    }
}
