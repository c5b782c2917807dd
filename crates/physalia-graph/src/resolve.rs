//! Promoted-link resolution.
//!
//! Links whose endpoints are hidden inside collapsed containers are not
//! rendered as themselves; they are aggregated into *promoted links* between
//! the nearest visible ancestors of their endpoints. Resolution is a pure
//! function of the store: it is recomputed from scratch on every call and
//! never patched, so re-running it on an unchanged store yields identical
//! promoted ids and identical constituent ordering.

use rustc_hash::FxBuildHasher;
use tracing::debug;

use crate::store::{DescendantsConnectivity, GraphStore};

type HashMap<K, V> = hashbrown::HashMap<K, V, FxBuildHasher>;

/// Id prefix reserved for promoted links; [`GraphStore::add_link`] rejects
/// caller-supplied ids that use it.
pub const PROMOTED_PREFIX: &str = "_pl:";

/// Deterministic id of the promoted link from `start` to `end`.
pub fn promoted_link_id(start: &str, end: &str) -> String {
    format!("{PROMOTED_PREFIX}{start}->{end}")
}

/// Synthetic link standing in for one or more original links whose true
/// endpoints are hidden. Owned by the resolution result, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromotedLink {
    pub id: String,
    /// Orientation follows the first contributing link; later links merging
    /// into the same unordered endpoint pair keep it.
    pub start: String,
    pub end: String,
    /// Original link ids, in first-contribution order.
    pub aggregated: Vec<String>,
}

/// How an original link is represented after resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkRendering {
    /// Both endpoints visible; the link renders as itself.
    Direct,
    /// Folded into the promoted link with this id.
    Promoted { promoted_id: String },
    /// Not rendered: missing endpoint, fold into a single ancestor, or a
    /// crossing out of a `Disjoint` container.
    Hidden,
}

#[derive(Debug, Clone, Default)]
pub struct ResolvedLinks {
    /// Ids of links rendered as themselves, in insertion order.
    pub direct: Vec<String>,
    /// Promoted links, in first-contribution order.
    pub promoted: Vec<PromotedLink>,
    entries: HashMap<String, LinkRendering>,
}

impl ResolvedLinks {
    /// Expands an original link id to its rendered representation. Unknown
    /// ids report [`LinkRendering::Hidden`].
    pub fn expanded_entry(&self, original_link_id: &str) -> LinkRendering {
        self.entries
            .get(original_link_id)
            .cloned()
            .unwrap_or(LinkRendering::Hidden)
    }

    pub fn promoted_by_id(&self, id: &str) -> Option<&PromotedLink> {
        self.promoted.iter().find(|p| p.id == id)
    }
}

/// On-screen representative of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Rep {
    /// The node is visible and represents itself.
    Visible,
    /// Hidden; represented by this visible collapsed ancestor.
    Folded(String),
    /// Hidden beneath a `Disjoint` container; contributes nothing.
    Dropped,
}

fn rep_of(store: &GraphStore, memo: &HashMap<String, Rep>, id: &str) -> Rep {
    let Some(parent_id) = store.parent_id(id) else {
        return Rep::Visible;
    };
    let Some(parent) = store.node(parent_id) else {
        return Rep::Visible;
    };
    let parent_rep = memo.get(parent_id).cloned().unwrap_or(Rep::Visible);
    match parent_rep {
        Rep::Dropped => Rep::Dropped,
        Rep::Visible if parent.is_disclosed() => Rep::Visible,
        Rep::Visible | Rep::Folded(_)
            if parent.connectivity == DescendantsConnectivity::Disjoint =>
        {
            Rep::Dropped
        }
        Rep::Visible => Rep::Folded(parent_id.to_string()),
        Rep::Folded(r) => Rep::Folded(r),
    }
}

/// Memoized representative table for every node, built once per resolve call
/// so repeated per-link queries are O(1).
fn representatives(store: &GraphStore) -> HashMap<String, Rep> {
    let mut memo: HashMap<String, Rep> =
        HashMap::with_capacity_and_hasher(store.node_count(), FxBuildHasher);
    for node in store.nodes() {
        if memo.contains_key(node.id()) {
            continue;
        }
        // Collect the unresolved tail of the ancestor chain, then fold the
        // representatives back down from the root side.
        let mut chain: Vec<String> = Vec::new();
        let mut cur = node.id().to_string();
        loop {
            if memo.contains_key(cur.as_str()) {
                break;
            }
            chain.push(cur.clone());
            match store.parent_id(&cur) {
                Some(p) => cur = p.to_string(),
                None => break,
            }
        }
        for id in chain.into_iter().rev() {
            let rep = rep_of(store, &memo, &id);
            memo.insert(id, rep);
        }
    }
    memo
}

/// Resolves the store's link set against its current disclosure state.
pub fn resolve(store: &GraphStore) -> ResolvedLinks {
    let reps = representatives(store);

    let mut direct: Vec<String> = Vec::new();
    let mut promoted: Vec<PromotedLink> = Vec::new();
    // Unordered visible-ancestor pair -> index into `promoted`.
    let mut groups: HashMap<(String, String), usize> = HashMap::default();
    let mut entries: HashMap<String, LinkRendering> = HashMap::default();
    let mut hidden = 0usize;

    for link in store.links() {
        let id = link.id();
        if !store.link_endpoints_present(link) {
            entries.insert(id.to_string(), LinkRendering::Hidden);
            hidden += 1;
            continue;
        }
        let (Some(start_rep), Some(end_rep)) = (reps.get(link.start()), reps.get(link.end()))
        else {
            entries.insert(id.to_string(), LinkRendering::Hidden);
            hidden += 1;
            continue;
        };
        if matches!(start_rep, Rep::Dropped) || matches!(end_rep, Rep::Dropped) {
            entries.insert(id.to_string(), LinkRendering::Hidden);
            hidden += 1;
            continue;
        }
        if matches!(start_rep, Rep::Visible) && matches!(end_rep, Rep::Visible) {
            direct.push(id.to_string());
            entries.insert(id.to_string(), LinkRendering::Direct);
            continue;
        }

        let s = match start_rep {
            Rep::Visible => link.start(),
            Rep::Folded(r) => r.as_str(),
            Rep::Dropped => continue,
        };
        let e = match end_rep {
            Rep::Visible => link.end(),
            Rep::Folded(r) => r.as_str(),
            Rep::Dropped => continue,
        };
        if s == e {
            // Both endpoints fold into the same container; the link is not
            // independently observable there.
            entries.insert(id.to_string(), LinkRendering::Hidden);
            hidden += 1;
            continue;
        }

        let key = if s <= e {
            (s.to_string(), e.to_string())
        } else {
            (e.to_string(), s.to_string())
        };
        let slot = *groups.entry(key).or_insert_with(|| {
            promoted.push(PromotedLink {
                id: promoted_link_id(s, e),
                start: s.to_string(),
                end: e.to_string(),
                aggregated: Vec::new(),
            });
            promoted.len() - 1
        });
        let p = &mut promoted[slot];
        p.aggregated.push(id.to_string());
        entries.insert(
            id.to_string(),
            LinkRendering::Promoted {
                promoted_id: p.id.clone(),
            },
        );
    }

    debug!(
        direct = direct.len(),
        promoted = promoted.len(),
        hidden,
        "resolved links"
    );
    ResolvedLinks {
        direct,
        promoted,
        entries,
    }
}
