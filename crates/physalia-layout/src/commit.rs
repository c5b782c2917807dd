//! Folds a finished layout context back into the store: origin
//! normalization, geometry write-back, then bottom-up re-measurement.

use physalia_graph::geom::{Point, Vector};
use physalia_graph::store::GraphStore;
use rustc_hash::FxBuildHasher;

use crate::Result;
use crate::context::LayoutContext;
use crate::measure::{Measurer, ensure_measured};

type HashMap<K, V> = hashbrown::HashMap<K, V, FxBuildHasher>;

/// Normalization offsets keyed by coordinate space (container id; `None`
/// for the top level).
///
/// Cached across passes: a full commit records the translation that pulled
/// each space's minimum to the origin, and later incremental commits apply
/// the same translation to freshly moved nodes so they land in the frame
/// their frozen siblings already occupy.
#[derive(Debug, Clone, Default)]
pub struct LayoutOffsets {
    offsets: HashMap<Option<String>, Vector>,
}

impl LayoutOffsets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, space: Option<&str>) -> Option<Vector> {
        self.offsets.get(&space.map(String::from)).copied()
    }

    pub fn set(&mut self, space: Option<&str>, offset: Vector) {
        self.offsets.insert(space.map(String::from), offset);
    }

    /// Drops all cached offsets; the next full commit rebuilds them.
    pub fn clear(&mut self) {
        self.offsets.clear();
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }
}

/// What a commit touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitStats {
    pub nodes_committed: usize,
    pub links_committed: usize,
    pub nodes_measured: usize,
}

/// Commits a laid-out context: normalizes every sibling group to a stable
/// origin, writes moved nodes and routed links back into the store, then
/// re-derives stale container sizes through the measurer.
///
/// Promoted link slots are never persisted; their geometry is derived from
/// endpoint bounds at capture time.
pub fn apply_results(
    store: &mut GraphStore,
    ctx: &mut LayoutContext,
    offsets: &mut LayoutOffsets,
    measurer: &dyn Measurer,
) -> Result<CommitStats> {
    let mut stats = CommitStats::default();

    normalize(ctx, offsets);
    write_back_nodes(store, ctx, &mut stats);
    write_back_links(store, ctx, &mut stats);

    let roots: Vec<String> = store.root_ids().into_iter().map(str::to_string).collect();
    for id in &roots {
        stats.nodes_measured += ensure_measured(store, id, measurer);
    }

    tracing::debug!(
        nodes = stats.nodes_committed,
        links = stats.links_committed,
        measured = stats.nodes_measured,
        "committed layout results"
    );
    Ok(stats)
}

/// Translates each sibling group so its minimum extent sits at the origin.
///
/// Full commits recompute the offset from the group's decorated bounds,
/// labels and freshly routed top-level link points. Incremental commits
/// reuse the cached offset and apply it only to dirty slots; the frozen
/// rest already carries it.
fn normalize(ctx: &mut LayoutContext, offsets: &mut LayoutOffsets) {
    for (container, members) in ctx.layout_groups() {
        if members.is_empty() {
            continue;
        }
        let space: Option<String> = match container {
            None => ctx.scope().map(String::from),
            Some(idx) => Some(ctx.node_at(idx).id().to_string()),
        };
        let is_top = container.is_none();

        let offset = if ctx.is_incremental() {
            match offsets.get(space.as_deref()) {
                Some(off) => off,
                None => {
                    // The space was never fully laid out; leave it anchored
                    // where the algorithm put it.
                    offsets.set(space.as_deref(), Vector::zero());
                    Vector::zero()
                }
            }
        } else {
            let Some(min) = group_min(ctx, &members, is_top) else {
                continue;
            };
            let off = Point::zero() - min;
            offsets.set(space.as_deref(), off);
            off
        };

        if offset == Vector::zero() {
            continue;
        }
        for &idx in &members {
            if ctx.is_incremental() && !ctx.node_at(idx).is_dirty() {
                continue;
            }
            ctx.node_at_mut(idx).shift(offset);
        }
        if is_top {
            for li in 0..ctx.link_count() {
                let link = ctx.link_at(li);
                if link.is_promoted() || !link.is_dirty() {
                    continue;
                }
                ctx.link_at_mut(li).shift(offset);
            }
        }
    }
}

/// Minimum corner across the group's decorated bounds, node labels, and
/// (for the top level) dirty link geometry.
fn group_min(ctx: &LayoutContext, members: &[usize], is_top: bool) -> Option<Point> {
    let mut min: Option<Point> = None;
    let mut fold = |p: Point| {
        min = Some(match min {
            Some(m) => m.min(p),
            None => p,
        });
    };
    for &idx in members {
        let node = ctx.node_at(idx);
        fold(node.decorated_bounds().origin);
        if let Some(label) = node.label() {
            fold(node.position() + label.position().to_vector());
        }
    }
    if is_top {
        for link in ctx.links() {
            if link.is_promoted() || !link.is_dirty() {
                continue;
            }
            for p in link.points() {
                fold(*p);
            }
            if let Some(r) = link.label() {
                fold(r.origin);
            }
        }
    }
    min
}

fn write_back_nodes(store: &mut GraphStore, ctx: &LayoutContext, stats: &mut CommitStats) {
    for idx in 0..ctx.node_count() {
        let node = ctx.node_at(idx);
        if node.is_read_only() {
            continue;
        }
        let Some(stored) = store.node(node.id()) else {
            continue;
        };
        let moved = node.is_dirty() || stored.visual.position != node.position();
        let label_changed = match (&stored.visual.label, node.label()) {
            (Some(a), Some(b)) => a.position != b.position() || a.rotation != b.rotation(),
            _ => false,
        };
        if !moved && !label_changed {
            continue;
        }
        if let Some(data) = store.node_mut(node.id()) {
            data.visual.position = node.position();
            if let (Some(stored_label), Some(ctx_label)) = (&mut data.visual.label, node.label()) {
                stored_label.position = ctx_label.position();
                stored_label.rotation = ctx_label.rotation();
            }
        }
        store.invalidate_bounds_upward(node.id());
        stats.nodes_committed += 1;
    }
}

/// Persists routed links, translating points from the scope's space into
/// each link's home space using post-commit node positions.
fn write_back_links(store: &mut GraphStore, ctx: &LayoutContext, stats: &mut CommitStats) {
    let scope_origin = LayoutContext::inner_origin_global(store, ctx.scope());
    for li in 0..ctx.link_count() {
        let link = ctx.link_at(li);
        if link.is_promoted() || !link.is_dirty() {
            continue;
        }
        let space_origin = LayoutContext::inner_origin_global(store, link.space());
        let delta = scope_origin - space_origin;
        let points: Vec<Point> = link.points().iter().map(|p| *p + delta).collect();
        let label = link.label().map(|r| r.translate(delta));
        if let Some(data) = store.link_mut(link.id()) {
            data.route = points;
            data.label = label;
            stats.links_committed += 1;
        }
    }
}
