//! Size derivation: leaves come from a host-supplied [`Measurer`], container
//! sizes are unions over their children, computed lazily bottom-up.

use physalia_graph::geom::{Point, Size, size};
use physalia_graph::store::{GraphStore, NodeData};

/// Host seam for sizing leaf-like nodes.
///
/// Called for leaves, for collapsed containers (which render as plain
/// boxes), and for disclosed containers with no children yet. Hosts that
/// render text supply a measurer backed by their font metrics; headless
/// callers can use [`BoxMeasurer`].
pub trait Measurer {
    fn node_size(&self, node: &NodeData) -> Size;
}

/// Fixed-size measurer for tests and headless use.
#[derive(Debug, Clone, Copy)]
pub struct BoxMeasurer {
    pub size: Size,
}

impl BoxMeasurer {
    pub fn new(s: Size) -> Self {
        Self { size: s }
    }
}

impl Default for BoxMeasurer {
    fn default() -> Self {
        Self {
            size: size(120.0, 48.0),
        }
    }
}

impl Measurer for BoxMeasurer {
    fn node_size(&self, _node: &NodeData) -> Size {
        self.size
    }
}

/// Recomputes stale sizes in the subtree rooted at `id` and returns how
/// many nodes were re-measured.
///
/// Nodes whose size is already valid are skipped, so repeated calls are
/// cheap. A disclosed container's size is the union of its children's
/// decorated bounds plus its padding; everything else goes through the
/// measurer.
pub fn ensure_measured(store: &mut GraphStore, id: &str, measurer: &dyn Measurer) -> usize {
    let Some(node) = store.node(id) else {
        return 0;
    };
    if node.visual.measured {
        return 0;
    }
    if !node.is_disclosed() || store.child_ids(id).is_empty() {
        let s = measurer.node_size(node);
        store.set_measured(id, s);
        return 1;
    }

    let child_ids = store.child_ids(id).to_vec();
    let mut measured = 0;
    for child in &child_ids {
        measured += ensure_measured(store, child, measurer);
    }
    let mut extent = Point::zero();
    for child in &child_ids {
        if let Some(bounds) = store.decorated_bounds(child) {
            extent = extent.max(bounds.max());
        }
    }
    let Some(node) = store.node(id) else {
        return measured;
    };
    let pad = node.padding;
    let s = size(
        pad.left + extent.x + pad.right,
        pad.top + extent.y + pad.bottom,
    );
    store.set_measured(id, s);
    measured + 1
}
