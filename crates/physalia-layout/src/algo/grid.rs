use futures::FutureExt;
use futures::future::LocalBoxFuture;
use physalia_graph::geom::point;

use crate::context::LayoutContext;
use crate::{LayoutAlgorithm, Result};

/// Packs each sibling group into a near-square grid.
///
/// Cells are sized to the group's largest decorated bounds and fill row by
/// row in context order. Container slots keep their build-time size during
/// the pass; the commit re-measures them from their moved children.
#[derive(Debug, Clone)]
pub struct GridLayout {
    pub gap: f64,
}

impl Default for GridLayout {
    fn default() -> Self {
        Self { gap: 24.0 }
    }
}

impl GridLayout {
    pub fn new(gap: f64) -> Self {
        Self { gap }
    }

    fn run_sync(&self, ctx: &mut LayoutContext) -> Result<()> {
        for (_, members) in ctx.layout_groups() {
            let movable: Vec<usize> = members
                .into_iter()
                .filter(|&idx| !ctx.node_at(idx).is_read_only())
                .collect();
            if movable.is_empty() {
                continue;
            }
            let cols = (movable.len() as f64).sqrt().ceil().max(1.0) as usize;
            let mut cell_w: f64 = 0.0;
            let mut cell_h: f64 = 0.0;
            for &idx in &movable {
                let b = ctx.node_at(idx).decorated_bounds();
                cell_w = cell_w.max(b.size.width);
                cell_h = cell_h.max(b.size.height);
            }
            for (slot, &idx) in movable.iter().enumerate() {
                let row = (slot / cols) as f64;
                let col = (slot % cols) as f64;
                let decor = ctx.node_at(idx).decor();
                ctx.node_at_mut(idx).set_position(point(
                    col * (cell_w + self.gap) + decor.left,
                    row * (cell_h + self.gap) + decor.top,
                ));
            }
        }
        super::route_straight(ctx);
        Ok(())
    }
}

impl LayoutAlgorithm for GridLayout {
    fn run<'a>(&'a self, ctx: &'a mut LayoutContext) -> LocalBoxFuture<'a, Result<()>> {
        futures::future::ready(self.run_sync(ctx)).boxed_local()
    }
}
