//! Built-in reference layouts.
//!
//! Both work per sibling group in canonical coordinates starting at the
//! origin and route links as straight segments; a host wanting orthogonal
//! routing or constraint solving brings its own
//! [`LayoutAlgorithm`](crate::LayoutAlgorithm).

mod grid;
mod layered;

pub use grid::GridLayout;
pub use layered::LayeredLayout;

use crate::context::LayoutContext;

/// Routes links as straight two-point segments between endpoint centers.
///
/// Promoted slots are skipped (their geometry is derived at capture time),
/// as are links in untouched regions of an incremental context.
fn route_straight(ctx: &mut LayoutContext) {
    for li in 0..ctx.link_count() {
        let endpoints = {
            let link = ctx.link_at(li);
            if link.is_promoted() {
                continue;
            }
            (ctx.index_of(link.start()), ctx.index_of(link.end()))
        };
        let (Some(start), Some(end)) = endpoints else {
            continue;
        };
        let touched =
            ctx.node_at(start).is_dirty() || ctx.node_at(end).is_dirty() || !ctx.is_incremental();
        if !touched {
            continue;
        }
        let a = ctx.global_center(start);
        let b = ctx.global_center(end);
        ctx.link_at_mut(li).set_points(vec![a, b]);
    }
}
