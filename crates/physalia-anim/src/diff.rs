//! Two captures in, one animation timeline out.
//!
//! Every id rendered on either side resolves to exactly one instruction,
//! with two exceptions: nodes riding inside a deleted ancestor or inside an
//! ancestor whose disclosure flipped are folded into that ancestor's
//! detached subtree, and original link ids are represented through the
//! rendered entity (direct link or promoted bundle) that carries them. Id
//! matching always wins over positional heuristics, so an id never deletes
//! and inserts in one cycle.

use std::collections::{BTreeMap, BTreeSet};

use physalia_graph::geom::{Point, Size};
use physalia_graph::store::LabelVisual;
use physalia_graph::style::LinkStroke;

use crate::snapshot::{DiagramState, LinkSnapshot, NodeSnapshot};

/// Property deltas for a surviving node; only fields that differ are set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeChanges {
    pub position: Option<(Point, Point)>,
    pub size: Option<(Size, Size)>,
    pub fill: Option<(Option<String>, Option<String>)>,
    pub label: Option<(Option<LabelVisual>, Option<LabelVisual>)>,
}

impl NodeChanges {
    fn between(old: &NodeSnapshot, new: &NodeSnapshot) -> NodeChanges {
        NodeChanges {
            position: (old.position != new.position).then_some((old.position, new.position)),
            size: (old.size != new.size).then_some((old.size, new.size)),
            fill: (old.fill != new.fill).then(|| (old.fill.clone(), new.fill.clone())),
            label: (old.label != new.label).then(|| (old.label.clone(), new.label.clone())),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.position.is_none() && self.size.is_none() && self.fill.is_none() && self.label.is_none()
    }
}

/// Per-node animation step.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeInstruction {
    Insert {
        id: String,
        to: NodeSnapshot,
    },
    /// The subtree is a detached clone of the pre-mutation descendants so
    /// they keep animating after removal from the store.
    Delete {
        id: String,
        from: NodeSnapshot,
        subtree: Vec<(String, NodeSnapshot)>,
    },
    Update {
        id: String,
        changes: NodeChanges,
    },
    Unchanged {
        id: String,
    },
    /// Collapsed/expanded flip: scale-and-crossfade pivoted about the
    /// center. The subtree holds whichever side has visible content (old
    /// when collapsing, new when expanding); those nodes get no
    /// instructions of their own.
    Disclosure {
        id: String,
        from: NodeSnapshot,
        to: NodeSnapshot,
        subtree: Vec<(String, NodeSnapshot)>,
    },
}

impl NodeInstruction {
    pub fn id(&self) -> &str {
        match self {
            NodeInstruction::Insert { id, .. }
            | NodeInstruction::Delete { id, .. }
            | NodeInstruction::Update { id, .. }
            | NodeInstruction::Unchanged { id }
            | NodeInstruction::Disclosure { id, .. } => id,
        }
    }
}

/// Property deltas for a surviving link entity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkChanges {
    pub route: Option<(Vec<Point>, Vec<Point>)>,
    pub stroke: Option<(LinkStroke, LinkStroke)>,
}

impl LinkChanges {
    fn between(old: &LinkSnapshot, new: &LinkSnapshot) -> LinkChanges {
        LinkChanges {
            route: (old.route != new.route).then(|| (old.route.clone(), new.route.clone())),
            stroke: (old.stroke != new.stroke).then(|| (old.stroke.clone(), new.stroke.clone())),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.route.is_none() && self.stroke.is_none()
    }
}

/// A synthesized link instance backing one leg of an expand/collapse
/// composite; the host animates `from` to `to`, then destroys it.
#[derive(Debug, Clone, PartialEq)]
pub struct TempLink {
    pub id: String,
    pub from: LinkSnapshot,
    pub to: LinkSnapshot,
}

/// Per-link animation step, at rendered-entity granularity.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkInstruction {
    Insert {
        id: String,
        to: LinkSnapshot,
    },
    Delete {
        id: String,
        from: LinkSnapshot,
    },
    /// `id` and `to_id` differ when a bundle was re-keyed (its
    /// representatives changed) but still renders the same constituents.
    Update {
        id: String,
        to_id: String,
        changes: LinkChanges,
    },
    Unchanged {
        id: String,
    },
    /// One old entity whose constituents spread over several new ones. The
    /// entity itself animates toward `targets[0]`; each temporary covers
    /// one further target.
    Expand {
        id: String,
        from: LinkSnapshot,
        targets: Vec<String>,
        temporaries: Vec<TempLink>,
    },
    /// Several old entities folding into one new bundle. `sources[0]`
    /// animates into place; each temporary covers one further source.
    Collapse {
        id: String,
        to: LinkSnapshot,
        sources: Vec<String>,
        temporaries: Vec<TempLink>,
    },
}

/// Ordered animation program: deletions first, then updates, disclosures
/// and composites, then insertions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Timeline {
    pub nodes: Vec<NodeInstruction>,
    pub links: Vec<LinkInstruction>,
}

impl Timeline {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.links.is_empty()
    }

    /// True when nothing would move: every instruction is an explicit
    /// `Unchanged`. The engine skips the animating phase for still
    /// timelines.
    pub fn is_still(&self) -> bool {
        self.nodes
            .iter()
            .all(|i| matches!(i, NodeInstruction::Unchanged { .. }))
            && self
                .links
                .iter()
                .all(|i| matches!(i, LinkInstruction::Unchanged { .. }))
    }
}

/// Diffs two captures into an animation timeline.
pub fn diff(old: &DiagramState, new: &DiagramState) -> Timeline {
    let mut timeline = Timeline::default();
    diff_nodes(old, new, &mut timeline);
    diff_links(old, new, &mut timeline);
    tracing::debug!(
        nodes = timeline.nodes.len(),
        links = timeline.links.len(),
        still = timeline.is_still(),
        "computed timeline"
    );
    timeline
}

fn diff_nodes(old: &DiagramState, new: &DiagramState, timeline: &mut Timeline) {
    let mut deletes: Vec<NodeInstruction> = Vec::new();
    let mut middles: Vec<NodeInstruction> = Vec::new();
    let mut inserts: Vec<NodeInstruction> = Vec::new();

    for (id, old_snap) in &old.nodes {
        if rides_in_ancestor_subtree(old, new, id) {
            continue;
        }
        match new.nodes.get(id) {
            None => deletes.push(NodeInstruction::Delete {
                id: id.clone(),
                from: old_snap.clone(),
                subtree: detached_subtree(old, id),
            }),
            Some(new_snap) if old_snap.disclosed != new_snap.disclosed => {
                let side = if old_snap.disclosed { old } else { new };
                middles.push(NodeInstruction::Disclosure {
                    id: id.clone(),
                    from: old_snap.clone(),
                    to: new_snap.clone(),
                    subtree: detached_subtree(side, id),
                });
            }
            Some(new_snap) => {
                let changes = NodeChanges::between(old_snap, new_snap);
                if changes.is_empty() {
                    middles.push(NodeInstruction::Unchanged { id: id.clone() });
                } else {
                    middles.push(NodeInstruction::Update {
                        id: id.clone(),
                        changes,
                    });
                }
            }
        }
    }
    for (id, new_snap) in &new.nodes {
        if old.nodes.contains_key(id) || rides_in_revealed_subtree(old, new, id) {
            continue;
        }
        inserts.push(NodeInstruction::Insert {
            id: id.clone(),
            to: new_snap.clone(),
        });
    }

    timeline.nodes.extend(deletes);
    timeline.nodes.extend(middles);
    timeline.nodes.extend(inserts);
}

/// Whether an old-side node is covered by an ancestor's instruction: some
/// ancestor was deleted outright, or flipped to collapsed and keeps its
/// old content as a detached subtree.
fn rides_in_ancestor_subtree(old: &DiagramState, new: &DiagramState, id: &str) -> bool {
    let mut cur = old.nodes.get(id).and_then(|s| s.parent.as_deref());
    while let Some(parent) = cur {
        let Some(old_parent) = old.nodes.get(parent) else {
            return false;
        };
        match new.nodes.get(parent) {
            None => return true,
            Some(new_parent) if old_parent.disclosed && !new_parent.disclosed => return true,
            Some(_) => {}
        }
        cur = old_parent.parent.as_deref();
    }
    false
}

/// Whether a new-side node was revealed by an ancestor expanding, in which
/// case it enters through that ancestor's disclosure subtree instead of an
/// insert of its own.
fn rides_in_revealed_subtree(old: &DiagramState, new: &DiagramState, id: &str) -> bool {
    let mut cur = new.nodes.get(id).and_then(|s| s.parent.as_deref());
    while let Some(parent) = cur {
        let Some(new_parent) = new.nodes.get(parent) else {
            return false;
        };
        if let Some(old_parent) = old.nodes.get(parent) {
            if !old_parent.disclosed && new_parent.disclosed {
                return true;
            }
        }
        cur = new_parent.parent.as_deref();
    }
    false
}

/// Clones every old descendant of `root`, in id order.
fn detached_subtree(state: &DiagramState, root: &str) -> Vec<(String, NodeSnapshot)> {
    let mut out = Vec::new();
    for (id, snap) in &state.nodes {
        if id == root {
            continue;
        }
        let mut cur = snap.parent.as_deref();
        while let Some(parent) = cur {
            if parent == root {
                out.push((id.clone(), snap.clone()));
                break;
            }
            cur = state.nodes.get(parent).and_then(|s| s.parent.as_deref());
        }
    }
    out
}

fn diff_links(old: &DiagramState, new: &DiagramState, timeline: &mut Timeline) {
    // Constituent id -> rendered entity id, per side.
    let mut old_exp: BTreeMap<&str, &str> = BTreeMap::new();
    for (eid, snap) in &old.links {
        for member in &snap.members {
            old_exp.insert(member.as_str(), eid.as_str());
        }
    }
    let mut new_exp: BTreeMap<&str, &str> = BTreeMap::new();
    for (eid, snap) in &new.links {
        for member in &snap.members {
            new_exp.insert(member.as_str(), eid.as_str());
        }
    }

    let entity_targets = |snap: &LinkSnapshot| -> BTreeSet<&str> {
        snap.members
            .iter()
            .filter_map(|m| new_exp.get(m.as_str()).copied())
            .collect()
    };
    let entity_sources = |snap: &LinkSnapshot| -> BTreeSet<&str> {
        snap.members
            .iter()
            .filter_map(|m| old_exp.get(m.as_str()).copied())
            .collect()
    };

    let mut handled_old: BTreeSet<String> = BTreeSet::new();
    let mut consumed_new: BTreeSet<String> = BTreeSet::new();
    let mut deletes: Vec<LinkInstruction> = Vec::new();
    let mut middles: Vec<LinkInstruction> = Vec::new();
    let mut inserts: Vec<LinkInstruction> = Vec::new();

    // Entities whose constituents all stopped rendering.
    for (eid, snap) in &old.links {
        if entity_targets(snap).is_empty() {
            deletes.push(LinkInstruction::Delete {
                id: eid.clone(),
                from: snap.clone(),
            });
            handled_old.insert(eid.clone());
        }
    }

    // 1 -> N: one old entity spreading over several new ones.
    for (eid, snap) in &old.links {
        if handled_old.contains(eid.as_str()) {
            continue;
        }
        let targets = entity_targets(snap);
        if targets.len() < 2 {
            continue;
        }
        let temporaries: Vec<TempLink> = targets
            .iter()
            .skip(1)
            .enumerate()
            .filter_map(|(i, tid)| {
                new.links.get(*tid).map(|to| TempLink {
                    id: format!("{eid}#tmp{}", i + 1),
                    from: snap.clone(),
                    to: to.clone(),
                })
            })
            .collect();
        for tid in &targets {
            consumed_new.insert((*tid).to_string());
        }
        middles.push(LinkInstruction::Expand {
            id: eid.clone(),
            from: snap.clone(),
            targets: targets.iter().map(|t| (*t).to_string()).collect(),
            temporaries,
        });
        handled_old.insert(eid.clone());
    }

    // N -> 1: several old entities folding into one new bundle.
    for (eid, snap) in &new.links {
        if consumed_new.contains(eid.as_str()) {
            continue;
        }
        let live: Vec<&str> = entity_sources(snap)
            .into_iter()
            .filter(|o| !handled_old.contains(*o))
            .collect();
        if live.len() < 2 {
            continue;
        }
        let temporaries: Vec<TempLink> = live
            .iter()
            .skip(1)
            .enumerate()
            .filter_map(|(i, oid)| {
                old.links.get(*oid).map(|from| TempLink {
                    id: format!("{eid}#tmp{}", i + 1),
                    from: from.clone(),
                    to: snap.clone(),
                })
            })
            .collect();
        for oid in &live {
            handled_old.insert((*oid).to_string());
        }
        middles.push(LinkInstruction::Collapse {
            id: eid.clone(),
            to: snap.clone(),
            sources: live.iter().map(|s| (*s).to_string()).collect(),
            temporaries,
        });
        consumed_new.insert(eid.clone());
    }

    // Remaining 1:1 matches, plus old entities whose only target was
    // already claimed by a composite.
    for (eid, snap) in &old.links {
        if handled_old.contains(eid.as_str()) {
            continue;
        }
        let targets = entity_targets(snap);
        let Some(tid) = targets.iter().next().copied() else {
            continue;
        };
        handled_old.insert(eid.clone());
        if consumed_new.contains(tid) {
            deletes.push(LinkInstruction::Delete {
                id: eid.clone(),
                from: snap.clone(),
            });
            continue;
        }
        let Some(to) = new.links.get(tid) else {
            continue;
        };
        consumed_new.insert(tid.to_string());
        let changes = LinkChanges::between(snap, to);
        if eid.as_str() == tid && changes.is_empty() {
            middles.push(LinkInstruction::Unchanged { id: eid.clone() });
        } else {
            middles.push(LinkInstruction::Update {
                id: eid.clone(),
                to_id: tid.to_string(),
                changes,
            });
        }
    }

    for (eid, snap) in &new.links {
        if !consumed_new.contains(eid.as_str()) {
            inserts.push(LinkInstruction::Insert {
                id: eid.clone(),
                to: snap.clone(),
            });
        }
    }

    timeline.links.extend(deletes);
    timeline.links.extend(middles);
    timeline.links.extend(inserts);
}
