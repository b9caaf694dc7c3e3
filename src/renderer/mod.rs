//! Damage-driven redraw of a single output
//!
//! The renderer never touches GPU state itself. It drains the output's damage
//! and issues scissor / clear / draw primitives through a
//! [`RenderTarget`](crate::backend::RenderTarget), repainting only what
//! changed.

use crate::backend::RenderTarget;
use crate::geometry::Rect;
use crate::output::Output;
use crate::window::View;
use log::trace;

pub mod damage;

pub use damage::{DamageRegion, OutputDamage, MAX_DAMAGE_RECTS};

/// Color the damaged area is cleared to before views are drawn
pub const BACKGROUND: [f32; 4] = [0.1, 0.1, 0.12, 1.0];

/// Repaints `output`
///
/// `views` must be in back-to-front order. For every damaged rectangle the
/// target is scissored and cleared, then each visible view whose box touches
/// the rectangle draws the parts of its surfaces that fall inside it.
///
/// Returns `false`, issuing nothing, when there was no damage.
pub fn render_output(output: &mut Output, views: &[&View], target: &mut dyn RenderTarget) -> bool {
    let region = damage::consume(output);
    if region.is_empty() {
        return false;
    }

    trace!(
        "🎨 {} repainting {} rect(s), {} px",
        output.name,
        region.len(),
        region.total_area()
    );

    for rect in region.iter() {
        target.scissor(*rect);
        target.clear(BACKGROUND);

        for view in views.iter().filter(|v| v.is_visible()) {
            let view_box = damage::layout_to_output(output, view.extents());
            if !view_box.intersects(rect) {
                continue;
            }

            let scale = view.coordinate_scale();
            for node in view.surface_tree() {
                let layout = Rect::covering(
                    view.x + node.x as f64 / scale,
                    view.y + node.y as f64 / scale,
                    node.width as f64 / scale,
                    node.height as f64 / scale,
                );
                let dst = damage::layout_to_output(output, layout);
                // The rect was just cleared, so the whole surface box inside
                // it is redrawn rather than only the surface's own damage.
                if let Some(clip) = dst.intersection(rect) {
                    target.render_surface(node.surface, dst, clip);
                }
            }
        }
    }

    target.commit();
    true
}
