use futures::FutureExt;
use futures::future::LocalBoxFuture;
use physalia_graph::geom::point;
use rustc_hash::FxBuildHasher;

use crate::context::LayoutContext;
use crate::{LayoutAlgorithm, Result};

type HashMap<K, V> = hashbrown::HashMap<K, V, FxBuildHasher>;
type HashSet<T> = hashbrown::HashSet<T, FxBuildHasher>;

/// Rank-based left-to-right layout.
///
/// Each sibling group is ranked independently by longest path over the
/// links whose endpoints are both direct members, promoted slots included
/// (so collapsed containers order like the bundles they stand for). Ranks
/// become columns; members of a rank stack vertically in context order.
/// Back-edges found during the walk are ignored, so cycles flatten instead
/// of failing.
#[derive(Debug, Clone)]
pub struct LayeredLayout {
    pub rank_gap: f64,
    pub node_gap: f64,
}

impl Default for LayeredLayout {
    fn default() -> Self {
        Self {
            rank_gap: 64.0,
            node_gap: 24.0,
        }
    }
}

impl LayeredLayout {
    pub fn new(rank_gap: f64, node_gap: f64) -> Self {
        Self { rank_gap, node_gap }
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
            self.place_group(ctx, &movable);
        }
        super::route_straight(ctx);
        Ok(())
    }

    fn place_group(&self, ctx: &mut LayoutContext, movable: &[usize]) {
        let member_set: HashSet<usize> = movable.iter().copied().collect();
        let mut preds: HashMap<usize, Vec<usize>> = HashMap::default();
        for link in ctx.links() {
            let (Some(s), Some(e)) = (ctx.index_of(link.start()), ctx.index_of(link.end()))
            else {
                continue;
            };
            if member_set.contains(&s) && member_set.contains(&e) {
                preds.entry(e).or_default().push(s);
            }
        }

        let mut memo: HashMap<usize, usize> = HashMap::default();
        let mut stack: HashSet<usize> = HashSet::default();
        let mut max_rank = 0;
        for &idx in movable {
            max_rank = max_rank.max(longest_path(idx, &preds, &mut memo, &mut stack));
        }

        let mut columns: Vec<Vec<usize>> = vec![Vec::new(); max_rank + 1];
        for &idx in movable {
            let rank = memo.get(&idx).copied().unwrap_or(0);
            columns[rank].push(idx);
        }

        let mut x = 0.0;
        for column in &columns {
            let mut width: f64 = 0.0;
            for &idx in column {
                width = width.max(ctx.node_at(idx).decorated_bounds().size.width);
            }
            let mut y = 0.0;
            for &idx in column {
                let bounds = ctx.node_at(idx).decorated_bounds();
                let decor = ctx.node_at(idx).decor();
                ctx.node_at_mut(idx)
                    .set_position(point(x + decor.left, y + decor.top));
                y += bounds.size.height + self.node_gap;
            }
            x += width + self.rank_gap;
        }
    }
}

impl LayoutAlgorithm for LayeredLayout {
    fn run<'a>(&'a self, ctx: &'a mut LayoutContext) -> LocalBoxFuture<'a, Result<()>> {
        futures::future::ready(self.run_sync(ctx)).boxed_local()
    }
}

/// Longest predecessor chain ending at `v`; back-edges contribute zero.
fn longest_path(
    v: usize,
    preds: &HashMap<usize, Vec<usize>>,
    memo: &mut HashMap<usize, usize>,
    stack: &mut HashSet<usize>,
) -> usize {
    if let Some(&rank) = memo.get(&v) {
        return rank;
    }
    if !stack.insert(v) {
        return 0;
    }
    let mut rank = 0;
    if let Some(ps) = preds.get(&v) {
        for &p in ps {
            rank = rank.max(longest_path(p, preds, memo, stack) + 1);
        }
    }
    stack.remove(&v);
    memo.insert(v, rank);
    rank
}
