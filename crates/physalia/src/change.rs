//! Incremental mutation events.
//!
//! Changes go through [`Diagram::apply`](crate::Diagram::apply) rather than
//! the store directly so the engine can capture the pre-mutation state,
//! track what a re-layout must touch and spot deferred containers that need
//! a data fetch.

use physalia_graph::{DirtySet, GraphStore, LinkPatch, LinkSpec, NodePatch, NodeSpec};

use crate::Result;

/// One incremental mutation of the graph.
#[derive(Debug, Clone)]
pub enum GraphChange {
    AddNodes {
        parent: Option<String>,
        specs: Vec<NodeSpec>,
    },
    RemoveNodes {
        parent: Option<String>,
        ids: Vec<String>,
    },
    UpdateNode {
        id: String,
        patch: NodePatch,
    },
    SetDisclosed {
        id: String,
        disclosed: bool,
    },
    AddLink {
        spec: LinkSpec,
    },
    RemoveLink {
        id: String,
    },
    UpdateLink {
        id: String,
        patch: LinkPatch,
    },
    /// Several changes folded into a single render cycle. Applied in order;
    /// an error mid-batch leaves the earlier changes in place.
    Batch(Vec<GraphChange>),
}

/// Applies `change` to the store.
///
/// Records the node/link ids an incremental re-layout must treat as moved
/// in `dirty`, and pushes the id of any deferred container that was just
/// disclosed onto `fetches`.
pub(crate) fn apply_change(
    store: &mut GraphStore,
    change: GraphChange,
    dirty: &mut DirtySet,
    fetches: &mut Vec<String>,
) -> Result<()> {
    match change {
        GraphChange::AddNodes { parent, specs } => {
            let ids = store.add_nodes(parent.as_deref(), specs)?;
            for id in &ids {
                store.invalidate_bounds_upward(id);
                dirty.insert_node(id.as_str());
            }
        }
        GraphChange::RemoveNodes { parent, ids } => {
            let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
            for id in &ids {
                store.invalidate_bounds_upward(id);
            }
            let removed = store.remove_nodes(parent.as_deref(), &ids);
            if !removed.is_empty() {
                // The surviving siblings repack around the gap.
                match parent.as_deref() {
                    Some(p) => {
                        for child in store.child_ids(p) {
                            dirty.insert_node(child.as_str());
                        }
                        if store.child_ids(p).is_empty() {
                            dirty.insert_node(p);
                        }
                    }
                    None => {
                        for root in store.root_ids() {
                            dirty.insert_node(root);
                        }
                    }
                }
            }
        }
        GraphChange::UpdateNode { id, patch } => {
            store.update_node(&id, patch)?;
            store.invalidate_bounds_upward(&id);
            dirty.insert_node(id);
        }
        GraphChange::SetDisclosed { id, disclosed } => {
            if store.set_disclosed(&id, disclosed) {
                if disclosed {
                    // Revealed content is laid out afresh; collapsing only
                    // resizes the container's own box.
                    for child in store.child_ids(&id) {
                        dirty.insert_node(child.as_str());
                    }
                    if store.node(&id).is_some_and(|n| n.is_deferred()) {
                        fetches.push(id.clone());
                    }
                }
                dirty.insert_node(id);
            }
        }
        GraphChange::AddLink { spec } => {
            let id = store.add_link(spec)?;
            dirty.insert_link(id);
        }
        GraphChange::RemoveLink { id } => {
            if let Some(link) = store.link(&id) {
                let start = link.start().to_string();
                let end = link.end().to_string();
                store.remove_link(&id);
                // Endpoint levels may re-rank without the edge.
                dirty.insert_node(start);
                dirty.insert_node(end);
            }
        }
        GraphChange::UpdateLink { id, patch } => {
            store.update_link(&id, patch)?;
            dirty.insert_link(id);
        }
        GraphChange::Batch(changes) => {
            for change in changes {
                apply_change(store, change, dirty, fetches)?;
            }
        }
    }
    Ok(())
}
