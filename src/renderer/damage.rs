//! Per-output damage tracking
//!
//! Every [`Output`] owns an [`OutputDamage`]: the set of output-local pixel
//! rectangles that must be repainted on its next frame. Producers mark damage
//! in layout coordinates (a moved view, a committed surface, a whole output);
//! the render pass drains it with [`consume`]. An empty drained region means
//! the frame is skipped entirely.
//!
//! # Example
//!
//! ```
//! use meridian::geometry::Rect;
//! use meridian::output::Output;
//! use meridian::renderer::damage;
//!
//! let mut output = Output::new("HDMI-1", 1920, 1080);
//! damage::mark_layout_rect(&mut output, Rect::new(10, 10, 50, 50));
//!
//! let region = damage::consume(&mut output);
//! assert_eq!(region.rects(), &[Rect::new(10, 10, 50, 50)]);
//! assert!(damage::consume(&mut output).is_empty());
//! ```

use crate::geometry::Rect;
use crate::output::Output;
use crate::window::View;
use log::trace;

/// Number of rectangles a region holds before collapsing to its extents
pub const MAX_DAMAGE_RECTS: usize = 16;

/// A set of rectangles needing repaint
///
/// Empty rectangles are dropped, rectangles already covered by another are
/// dropped, and once more than [`MAX_DAMAGE_RECTS`] accumulate the region
/// becomes a single bounding box.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DamageRegion {
    rects: Vec<Rect>,
}

impl DamageRegion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rect(rect: Rect) -> Self {
        let mut region = Self::new();
        region.add(rect);
        region
    }

    pub fn add(&mut self, rect: Rect) {
        if rect.is_empty() || self.rects.iter().any(|r| r.contains_rect(&rect)) {
            return;
        }

        self.rects.retain(|r| !rect.contains_rect(r));
        self.rects.push(rect);

        if self.rects.len() > MAX_DAMAGE_RECTS {
            let extents = self.extents();
            self.rects.clear();
            self.rects.push(extents);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rects.len()
    }

    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rect> {
        self.rects.iter()
    }

    /// Bounding box of every rectangle (empty for an empty region)
    pub fn extents(&self) -> Rect {
        self.rects
            .iter()
            .fold(Rect::default(), |acc, r| acc.union(r))
    }

    pub fn intersects(&self, rect: &Rect) -> bool {
        self.rects.iter().any(|r| r.intersects(rect))
    }

    /// Upper bound of the damaged pixel count (overlaps are counted twice)
    pub fn total_area(&self) -> i64 {
        self.rects.iter().map(Rect::area).sum()
    }

    pub fn clear(&mut self) {
        self.rects.clear();
    }
}

/// Damage accumulated for one output between two frames
#[derive(Debug, Clone, Default)]
pub struct OutputDamage {
    pending: DamageRegion,
    /// Frames drained with non-empty damage
    frames: u64,
}

impl OutputDamage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an output-local rectangle, clipped to `bounds`
    pub fn add(&mut self, rect: Rect, bounds: Rect) {
        if let Some(clipped) = rect.intersection(&bounds) {
            self.pending.add(clipped);
        }
    }

    /// Replaces whatever is pending with the whole of `bounds`
    pub fn add_whole(&mut self, bounds: Rect) {
        self.pending.clear();
        self.pending.add(bounds);
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn pending(&self) -> &DamageRegion {
        &self.pending
    }

    /// Drains the pending region
    pub fn take(&mut self) -> DamageRegion {
        let region = std::mem::take(&mut self.pending);
        if !region.is_empty() {
            self.frames += 1;
        }
        region
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

/// Converts a layout rectangle into `output`'s pixel space
pub fn layout_to_output(output: &Output, rect: Rect) -> Rect {
    rect.translate(-output.x, -output.y).scale(output.scale)
}

/// Marks the entire output for repaint
pub fn mark_whole(output: &mut Output) {
    let bounds = output.pixel_box();
    output.damage.add_whole(bounds);
}

/// Marks an arbitrary layout rectangle (e.g. a view's old bounds)
pub fn mark_layout_rect(output: &mut Output, rect: Rect) {
    if !output.enabled {
        return;
    }
    let local = layout_to_output(output, rect);
    let bounds = output.pixel_box();
    output.damage.add(local, bounds);
}

/// Marks the client-reported damage of every surface in `view`'s tree
///
/// Surface-local damage is converted to layout units with the view's
/// coordinate scale, then to output pixels with the output scale.
pub fn mark_view(output: &mut Output, view: &View) {
    if !output.enabled || !view.is_visible() {
        return;
    }

    let scale = view.coordinate_scale();
    let bounds = output.pixel_box();
    for node in view.surface_tree() {
        for d in &node.damage {
            let layout = Rect::covering(
                view.x + (node.x + d.x) as f64 / scale,
                view.y + (node.y + d.y) as f64 / scale,
                d.width as f64 / scale,
                d.height as f64 / scale,
            );
            let local = layout_to_output(output, layout);
            trace!("{} damage {:?} -> {} {:?}", view.id(), d, output.name, local);
            output.damage.add(local, bounds);
        }
    }
}

/// Drains `output`'s pending damage
pub fn consume(output: &mut Output) -> DamageRegion {
    output.damage.take()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::headless::HeadlessSurface;
    use crate::window::{ViewId, ViewKind};

    fn mapped_view(surface: HeadlessSurface, kind: ViewKind) -> View {
        let mut view = View::new(
            ViewId(1),
            Box::new(surface),
            kind,
            "app".into(),
            "title".into(),
            None,
            (64, 48),
        );
        view.map();
        view
    }

    #[test]
    fn test_region_drops_empty_and_covered_rects() {
        let mut region = DamageRegion::new();
        region.add(Rect::new(0, 0, 0, 10));
        assert!(region.is_empty());

        region.add(Rect::new(10, 10, 100, 100));
        region.add(Rect::new(20, 20, 10, 10));
        assert_eq!(region.len(), 1);

        region.add(Rect::new(0, 0, 200, 200));
        assert_eq!(region.rects(), &[Rect::new(0, 0, 200, 200)]);
    }

    #[test]
    fn test_region_coalesces_to_extents() {
        let mut region = DamageRegion::new();
        for i in 0..=MAX_DAMAGE_RECTS as i32 {
            region.add(Rect::new(i * 20, 0, 10, 10));
        }

        assert_eq!(region.len(), 1);
        assert_eq!(
            region.rects()[0],
            Rect::new(0, 0, MAX_DAMAGE_RECTS as i32 * 20 + 10, 10)
        );
    }

    #[test]
    fn test_consume_drains() {
        let mut output = Output::new("HDMI-1", 1920, 1080);
        mark_layout_rect(&mut output, Rect::new(0, 0, 10, 10));

        assert_eq!(consume(&mut output).len(), 1);
        assert!(consume(&mut output).is_empty());
        assert_eq!(output.damage.frames(), 1);
    }

    #[test]
    fn test_mark_whole_replaces_pending() {
        let mut output = Output::new("HDMI-1", 1920, 1080);
        mark_layout_rect(&mut output, Rect::new(0, 0, 10, 10));
        mark_layout_rect(&mut output, Rect::new(500, 500, 10, 10));
        mark_whole(&mut output);

        assert_eq!(consume(&mut output).rects(), &[Rect::new(0, 0, 1920, 1080)]);
    }

    #[test]
    fn test_layout_rect_is_output_local_and_clipped() {
        let mut output = Output::new("HDMI-1", 2560, 1440);
        output.x = 1920;

        mark_layout_rect(&mut output, Rect::new(1900, 100, 100, 50));
        assert_eq!(consume(&mut output).rects(), &[Rect::new(0, 100, 80, 50)]);

        mark_layout_rect(&mut output, Rect::new(0, 0, 100, 100));
        assert!(consume(&mut output).is_empty());
    }

    #[test]
    fn test_layout_rect_is_scaled() {
        let mut output = Output::new("eDP-1", 2880, 1800);
        output.scale = 2.0;

        mark_layout_rect(&mut output, Rect::new(10, 20, 30, 40));
        assert_eq!(consume(&mut output).rects(), &[Rect::new(20, 40, 60, 80)]);
    }

    #[test]
    fn test_disabled_output_collects_nothing() {
        let mut output = Output::new("HDMI-1", 1920, 1080);
        output.enabled = false;

        mark_layout_rect(&mut output, Rect::new(0, 0, 10, 10));
        assert!(consume(&mut output).is_empty());
    }

    #[test]
    fn test_mark_view_uses_client_damage() {
        let surface = HeadlessSurface::new(1, 400, 300);
        surface.commit(vec![Rect::new(5, 5, 10, 10)]);
        let mut view = mapped_view(surface, ViewKind::Native);
        view.move_to(100.0, 200.0);

        let mut output = Output::new("HDMI-1", 1920, 1080);
        output.scale = 2.0;
        mark_view(&mut output, &view);

        assert_eq!(consume(&mut output).rects(), &[Rect::new(210, 410, 20, 20)]);
    }

    #[test]
    fn test_mark_view_divides_xwayland_damage() {
        let surface = HeadlessSurface::new(1, 800, 600);
        surface.commit(vec![Rect::new(20, 20, 40, 40)]);
        let mut view = mapped_view(surface, ViewKind::XWayland);
        view.set_output_scale(2.0);

        let mut output = Output::new("eDP-1", 2880, 1800);
        output.scale = 2.0;
        mark_view(&mut output, &view);

        // 40x40 pixels are 20x20 layout units, drawn back at 40x40 pixels
        assert_eq!(consume(&mut output).rects(), &[Rect::new(20, 20, 40, 40)]);
    }

    #[test]
    fn test_mark_view_skips_unmapped() {
        let surface = HeadlessSurface::new(1, 400, 300);
        surface.commit(vec![Rect::new(0, 0, 10, 10)]);
        let mut view = mapped_view(surface, ViewKind::Native);
        view.unmap();

        let mut output = Output::new("HDMI-1", 1920, 1080);
        mark_view(&mut output, &view);
        assert!(consume(&mut output).is_empty());
    }
}
