//! Insertion-ordered node/link store with nested collapsible containers.
//!
//! Nodes live in an arena (`Vec` plus id→index map) so iteration follows
//! insertion order and lookups stay O(1). Containment is held in side maps
//! (`parent`, `children`) rather than on the nodes themselves; the parent chain
//! is acyclic by construction because nodes are created under their parent and
//! never reparented.
//!
//! Links are tolerant of dangling endpoints: a link whose `start` or `end`
//! names a missing node is *hidden* (skipped by visibility queries, the
//! resolver, layout contexts and diffing) instead of being an error, because
//! diagrams are commonly fed from live, partially-available data.

use std::cell::RefCell;

use rustc_hash::FxBuildHasher;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::geom::{Point, Rect, SideOffsets, Size, vector};
use crate::resolve::PROMOTED_PREFIX;
use crate::style::{LinkStroke, Presentation};

type HashMap<K, V> = hashbrown::HashMap<K, V, FxBuildHasher>;
type HashSet<T> = hashbrown::HashSet<T, FxBuildHasher>;

/// Externally supplied hint about a container's subtree.
///
/// `Disjoint` promises that descendants never link outside the container;
/// links that break the promise while the container is collapsed are dropped
/// by the resolver instead of being promoted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DescendantsConnectivity {
    #[default]
    Connected,
    Disjoint,
}

/// Label visual state, positioned relative to the node's content origin.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelVisual {
    pub size: Size,
    pub position: Point,
    pub rotation: f64,
}

impl Default for LabelVisual {
    fn default() -> Self {
        Self {
            size: Size::zero(),
            position: Point::zero(),
            rotation: 0.0,
        }
    }
}

/// Committed visual state of a node.
///
/// `position` is the top-left of the content bounds, relative to the parent
/// container's inner (padded) origin; root nodes are positioned in the global
/// space directly. Decorated bounds are the content bounds inflated by
/// `decor`; decoration never shifts child coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeVisual {
    pub position: Point,
    pub size: Size,
    pub decor: SideOffsets,
    pub label: Option<LabelVisual>,
    /// Cleared by upward invalidation, set once bounds are known.
    pub measured: bool,
}

impl Default for NodeVisual {
    fn default() -> Self {
        Self {
            position: Point::zero(),
            size: Size::zero(),
            decor: SideOffsets::zero(),
            label: None,
            measured: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NodeData {
    id: String,
    disclosed: bool,
    deferred: bool,
    pub connectivity: DescendantsConnectivity,
    /// Content inset reserved by a container around its children.
    pub padding: SideOffsets,
    pub payload: Value,
    /// Opaque presentation color; diffed, never interpreted.
    pub fill: Option<String>,
    pub presentation: Presentation,
    pub visual: NodeVisual,
}

impl NodeData {
    fn from_spec(spec: NodeSpec) -> Self {
        let mut visual = NodeVisual {
            decor: spec.decor,
            ..NodeVisual::default()
        };
        if let Some(size) = spec.size {
            visual.size = size;
            visual.measured = true;
        }
        if let Some(size) = spec.label_size {
            visual.label = Some(LabelVisual {
                size,
                ..LabelVisual::default()
            });
        }
        Self {
            id: spec.id,
            disclosed: spec.disclosed,
            deferred: spec.deferred,
            connectivity: spec.connectivity,
            padding: spec.padding,
            payload: spec.payload,
            fill: spec.fill,
            presentation: spec.presentation,
            visual,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Whether the container is expanded. Meaningful only for nodes with
    /// children or the `deferred` flag; leaves report their stored value but
    /// it never affects visibility.
    pub fn is_disclosed(&self) -> bool {
        self.disclosed
    }

    /// Children are known to exist but have not been fetched yet.
    pub fn is_deferred(&self) -> bool {
        self.deferred
    }

    /// Content bounds in the parent's inner coordinate space.
    pub fn content_bounds(&self) -> Rect {
        Rect::new(self.visual.position, self.visual.size)
    }
}

#[derive(Debug, Clone)]
pub struct LinkData {
    id: String,
    start: String,
    end: String,
    group_id: Option<String>,
    pub stroke: LinkStroke,
    pub payload: Value,
    pub presentation: Presentation,
    /// Committed route points, expressed in the coordinate space of the
    /// `group_id` container (global space when `None`).
    pub route: Vec<Point>,
    pub label: Option<Rect>,
}

impl LinkData {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn start(&self) -> &str {
        &self.start
    }

    pub fn end(&self) -> &str {
        &self.end
    }

    /// Nearest common ancestor container of the endpoints; `None` when the
    /// link lives in the top-level space or an endpoint is missing.
    pub fn group_id(&self) -> Option<&str> {
        self.group_id.as_deref()
    }
}

/// Construction spec for a node, consumed by [`GraphStore::add_nodes`].
#[derive(Debug, Clone)]
pub struct NodeSpec {
    pub id: String,
    pub size: Option<Size>,
    pub label_size: Option<Size>,
    pub payload: Value,
    pub fill: Option<String>,
    pub padding: SideOffsets,
    pub decor: SideOffsets,
    pub connectivity: DescendantsConnectivity,
    pub presentation: Presentation,
    pub disclosed: bool,
    pub deferred: bool,
}

impl NodeSpec {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            size: None,
            label_size: None,
            payload: Value::Null,
            fill: None,
            padding: SideOffsets::zero(),
            decor: SideOffsets::zero(),
            connectivity: DescendantsConnectivity::Connected,
            presentation: Presentation::Default,
            disclosed: true,
            deferred: false,
        }
    }

    pub fn with_size(mut self, size: Size) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_label_size(mut self, size: Size) -> Self {
        self.label_size = Some(size);
        self
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_fill(mut self, fill: impl Into<String>) -> Self {
        self.fill = Some(fill.into());
        self
    }

    pub fn with_padding(mut self, padding: SideOffsets) -> Self {
        self.padding = padding;
        self
    }

    pub fn with_decor(mut self, decor: SideOffsets) -> Self {
        self.decor = decor;
        self
    }

    pub fn with_connectivity(mut self, connectivity: DescendantsConnectivity) -> Self {
        self.connectivity = connectivity;
        self
    }

    pub fn with_presentation(mut self, presentation: Presentation) -> Self {
        self.presentation = presentation;
        self
    }

    /// Start the node collapsed.
    pub fn collapsed(mut self) -> Self {
        self.disclosed = false;
        self
    }

    /// Mark the node as having children that are fetched on first disclosure.
    pub fn defer_children(mut self) -> Self {
        self.deferred = true;
        self
    }
}

/// Construction spec for a link, consumed by [`GraphStore::add_link`].
#[derive(Debug, Clone)]
pub struct LinkSpec {
    pub id: String,
    pub start: String,
    pub end: String,
    pub stroke: LinkStroke,
    pub payload: Value,
    pub presentation: Presentation,
}

impl LinkSpec {
    pub fn new(id: impl Into<String>, start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            start: start.into(),
            end: end.into(),
            stroke: LinkStroke::Solid,
            payload: Value::Null,
            presentation: Presentation::Default,
        }
    }

    pub fn with_stroke(mut self, stroke: LinkStroke) -> Self {
        self.stroke = stroke;
        self
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_presentation(mut self, presentation: Presentation) -> Self {
        self.presentation = presentation;
        self
    }
}

/// Partial update for [`GraphStore::update_node`]; `None` fields are left
/// untouched. An explicit `size` marks the node measured.
#[derive(Debug, Clone, Default)]
pub struct NodePatch {
    pub payload: Option<Value>,
    pub fill: Option<Option<String>>,
    pub size: Option<Size>,
    pub position: Option<Point>,
    pub label: Option<Option<LabelVisual>>,
    pub padding: Option<SideOffsets>,
    pub connectivity: Option<DescendantsConnectivity>,
}

impl NodePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn with_fill(mut self, fill: Option<String>) -> Self {
        self.fill = Some(fill);
        self
    }

    pub fn with_size(mut self, size: Size) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_position(mut self, position: Point) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_label(mut self, label: Option<LabelVisual>) -> Self {
        self.label = Some(label);
        self
    }

    pub fn with_padding(mut self, padding: SideOffsets) -> Self {
        self.padding = Some(padding);
        self
    }

    pub fn with_connectivity(mut self, connectivity: DescendantsConnectivity) -> Self {
        self.connectivity = Some(connectivity);
        self
    }
}

/// Partial update for [`GraphStore::update_link`]. Changing an endpoint
/// recomputes the link's `group_id`.
#[derive(Debug, Clone, Default)]
pub struct LinkPatch {
    pub start: Option<String>,
    pub end: Option<String>,
    pub stroke: Option<LinkStroke>,
    pub payload: Option<Value>,
}

impl LinkPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_start(mut self, start: impl Into<String>) -> Self {
        self.start = Some(start.into());
        self
    }

    pub fn with_end(mut self, end: impl Into<String>) -> Self {
        self.end = Some(end.into());
        self
    }

    pub fn with_stroke(mut self, stroke: LinkStroke) -> Self {
        self.stroke = Some(stroke);
        self
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }
}

#[derive(Debug, Clone)]
struct AdjCache {
    generation: u64,
    out: Vec<Vec<usize>>,
    in_: Vec<Vec<usize>>,
}

#[derive(Debug, Default)]
pub struct GraphStore {
    nodes: Vec<NodeData>,
    node_index: HashMap<String, usize>,

    links: Vec<LinkData>,
    link_index: HashMap<String, usize>,

    parent: HashMap<String, String>,
    children: HashMap<String, Vec<String>>,

    // Visibility resolution and diff capture query incident links repeatedly.
    // Scanning `self.links` each time is O(L) per query, so we keep a lazily
    // rebuilt adjacency cache over the arenas.
    //
    // Note: this uses interior mutability to keep query APIs on `&self`.
    adj_gen: u64,
    adj_cache: RefCell<Option<AdjCache>>,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn invalidate_adj(&mut self) {
        self.adj_gen = self.adj_gen.wrapping_add(1);
        *self.adj_cache.get_mut() = None;
    }

    fn ensure_adj(&self) -> std::cell::RefMut<'_, AdjCache> {
        let generation = self.adj_gen;
        let mut cache = self.adj_cache.borrow_mut();
        let stale = cache
            .as_ref()
            .map(|c| c.generation != generation)
            .unwrap_or(true);
        if stale {
            let mut out: Vec<Vec<usize>> = vec![Vec::new(); self.nodes.len()];
            let mut in_: Vec<Vec<usize>> = vec![Vec::new(); self.nodes.len()];
            for (link_idx, l) in self.links.iter().enumerate() {
                // Hidden links (missing endpoint) are not part of adjacency.
                let Some(&s_idx) = self.node_index.get(l.start.as_str()) else {
                    continue;
                };
                let Some(&e_idx) = self.node_index.get(l.end.as_str()) else {
                    continue;
                };
                out[s_idx].push(link_idx);
                in_[e_idx].push(link_idx);
            }
            *cache = Some(AdjCache {
                generation,
                out,
                in_,
            });
        }
        std::cell::RefMut::map(cache, |c| {
            c.as_mut()
                .expect("adjacency cache should be present after ensure")
        })
    }

    // ---- nodes ----------------------------------------------------------

    /// Adds a batch of nodes under `parent` (top level when `None`).
    ///
    /// The whole batch is validated before anything is inserted, so a
    /// duplicate id leaves the store unchanged. Returns the new ids in
    /// insertion order.
    pub fn add_nodes(&mut self, parent: Option<&str>, specs: Vec<NodeSpec>) -> Result<Vec<String>> {
        if let Some(p) = parent {
            if !self.node_index.contains_key(p) {
                return Err(Error::NodeNotFound { id: p.to_string() });
            }
        }
        {
            let mut batch: HashSet<&str> = HashSet::default();
            for spec in &specs {
                if self.node_index.contains_key(spec.id.as_str())
                    || !batch.insert(spec.id.as_str())
                {
                    return Err(Error::DuplicateNode {
                        id: spec.id.clone(),
                    });
                }
            }
        }

        self.invalidate_adj();
        let mut ids: Vec<String> = Vec::with_capacity(specs.len());
        for spec in specs {
            let id = spec.id.clone();
            let idx = self.nodes.len();
            self.nodes.push(NodeData::from_spec(spec));
            self.node_index.insert(id.clone(), idx);
            if let Some(p) = parent {
                self.parent.insert(id.clone(), p.to_string());
                self.children.entry(p.to_string()).or_default().push(id.clone());
            }
            ids.push(id);
        }
        self.refresh_group_ids(&ids);
        Ok(ids)
    }

    pub fn add_node(&mut self, parent: Option<&str>, spec: NodeSpec) -> Result<String> {
        let mut ids = self.add_nodes(parent, vec![spec])?;
        Ok(ids.remove(0))
    }

    /// Removes the given direct children of `parent` together with their
    /// entire subtrees and every link touching a removed node.
    ///
    /// Skipped without error: unknown ids, ids that are not direct children
    /// of `parent`, and ids hidden inside a collapsed container (collapsed
    /// subtrees are not individually mutable; removing the collapsed
    /// container itself is allowed). Returns every node id actually removed,
    /// cascade included, in traversal order.
    pub fn remove_nodes(&mut self, parent: Option<&str>, ids: &[&str]) -> Vec<String> {
        let mut removed: Vec<String> = Vec::new();
        let mut removed_set: HashSet<String> = HashSet::default();
        for &id in ids {
            if removed_set.contains(id) {
                continue;
            }
            if !self.node_index.contains_key(id) {
                continue;
            }
            if self.parent_id(id) != parent {
                continue;
            }
            if !self.is_visible(id) {
                continue;
            }
            self.collect_subtree(id, &mut removed, &mut removed_set);
        }
        if removed.is_empty() {
            return removed;
        }

        self.invalidate_adj();
        for id in &removed {
            if let Some(p) = self.parent.remove(id) {
                if !removed_set.contains(p.as_str()) {
                    if let Some(ch) = self.children.get_mut(&p) {
                        ch.retain(|c| c != id);
                    }
                }
            }
            self.children.remove(id);
        }

        self.nodes.retain(|n| !removed_set.contains(n.id.as_str()));
        self.node_index.clear();
        for (i, n) in self.nodes.iter().enumerate() {
            self.node_index.insert(n.id.clone(), i);
        }

        let before = self.links.len();
        self.links.retain(|l| {
            !removed_set.contains(l.start.as_str()) && !removed_set.contains(l.end.as_str())
        });
        if self.links.len() != before {
            self.link_index.clear();
            for (i, l) in self.links.iter().enumerate() {
                self.link_index.insert(l.id.clone(), i);
            }
        }

        removed
    }

    fn collect_subtree(&self, id: &str, out: &mut Vec<String>, seen: &mut HashSet<String>) {
        if !seen.insert(id.to_string()) {
            return;
        }
        out.push(id.to_string());
        if let Some(children) = self.children.get(id) {
            for c in children {
                self.collect_subtree(c, out, seen);
            }
        }
    }

    pub fn update_node(&mut self, id: &str, patch: NodePatch) -> Result<()> {
        let Some(&idx) = self.node_index.get(id) else {
            return Err(Error::NodeNotFound { id: id.to_string() });
        };
        let node = &mut self.nodes[idx];
        if let Some(payload) = patch.payload {
            node.payload = payload;
        }
        if let Some(fill) = patch.fill {
            node.fill = fill;
        }
        if let Some(padding) = patch.padding {
            node.padding = padding;
        }
        if let Some(connectivity) = patch.connectivity {
            node.connectivity = connectivity;
        }
        if let Some(position) = patch.position {
            node.visual.position = position;
        }
        if let Some(label) = patch.label {
            node.visual.label = label;
        }
        if let Some(size) = patch.size {
            node.visual.size = size;
            node.visual.measured = true;
        }
        Ok(())
    }

    /// Toggles a container's disclosure.
    ///
    /// No-op (returns `false`) when the node is unknown, already in the
    /// requested state, or has neither children nor the `deferred` flag.
    /// A successful flip invalidates the node's size (a collapsed box and
    /// an expanded container measure differently) and its ancestors'.
    pub fn set_disclosed(&mut self, id: &str, disclosed: bool) -> bool {
        let Some(&idx) = self.node_index.get(id) else {
            return false;
        };
        let has_children = self.children.get(id).is_some_and(|c| !c.is_empty());
        let node = &mut self.nodes[idx];
        if node.disclosed == disclosed {
            return false;
        }
        if !has_children && !node.deferred {
            return false;
        }
        node.disclosed = disclosed;
        node.visual.measured = false;
        self.invalidate_bounds_upward(id);
        true
    }

    pub fn has_node(&self, id: &str) -> bool {
        self.node_index.contains_key(id)
    }

    pub fn node(&self, id: &str) -> Option<&NodeData> {
        self.node_index.get(id).map(|&idx| &self.nodes[idx])
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut NodeData> {
        self.node_index
            .get(id)
            .copied()
            .map(move |idx| &mut self.nodes[idx])
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &NodeData> {
        self.nodes.iter()
    }

    pub fn node_ids(&self) -> Vec<String> {
        self.nodes.iter().map(|n| n.id.clone()).collect()
    }

    // ---- links ----------------------------------------------------------

    /// Adds a link. Endpoints may name nodes that do not exist (yet); such a
    /// link is hidden until both endpoints are present.
    pub fn add_link(&mut self, spec: LinkSpec) -> Result<String> {
        if spec.id.starts_with(PROMOTED_PREFIX) {
            return Err(Error::ReservedLinkId { id: spec.id });
        }
        if self.link_index.contains_key(spec.id.as_str()) {
            return Err(Error::DuplicateLink { id: spec.id });
        }
        self.invalidate_adj();
        let group_id = self.compute_group_id(&spec.start, &spec.end);
        let id = spec.id.clone();
        let idx = self.links.len();
        self.links.push(LinkData {
            id: spec.id,
            start: spec.start,
            end: spec.end,
            group_id,
            stroke: spec.stroke,
            payload: spec.payload,
            presentation: spec.presentation,
            route: Vec::new(),
            label: None,
        });
        self.link_index.insert(id.clone(), idx);
        Ok(id)
    }

    pub fn remove_link(&mut self, id: &str) -> bool {
        let Some(idx) = self.link_index.remove(id) else {
            return false;
        };
        self.invalidate_adj();
        self.links.remove(idx);
        for i in idx..self.links.len() {
            let lid = self.links[i].id.as_str();
            if let Some(v) = self.link_index.get_mut(lid) {
                *v = i;
            }
        }
        true
    }

    pub fn update_link(&mut self, id: &str, patch: LinkPatch) -> Result<()> {
        let Some(&idx) = self.link_index.get(id) else {
            return Err(Error::LinkNotFound { id: id.to_string() });
        };
        let endpoints_changed = patch.start.is_some() || patch.end.is_some();
        let link = &mut self.links[idx];
        if let Some(start) = patch.start {
            link.start = start;
        }
        if let Some(end) = patch.end {
            link.end = end;
        }
        if let Some(stroke) = patch.stroke {
            link.stroke = stroke;
        }
        if let Some(payload) = patch.payload {
            link.payload = payload;
        }
        if endpoints_changed {
            self.invalidate_adj();
            let start = self.links[idx].start.clone();
            let end = self.links[idx].end.clone();
            self.links[idx].group_id = self.compute_group_id(&start, &end);
        }
        Ok(())
    }

    pub fn has_link(&self, id: &str) -> bool {
        self.link_index.contains_key(id)
    }

    pub fn link(&self, id: &str) -> Option<&LinkData> {
        self.link_index.get(id).map(|&idx| &self.links[idx])
    }

    pub fn link_mut(&mut self, id: &str) -> Option<&mut LinkData> {
        self.link_index
            .get(id)
            .copied()
            .map(move |idx| &mut self.links[idx])
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Links in insertion order.
    pub fn links(&self) -> impl Iterator<Item = &LinkData> {
        self.links.iter()
    }

    pub fn link_ids(&self) -> Vec<String> {
        self.links.iter().map(|l| l.id.clone()).collect()
    }

    /// Both endpoints of the link exist in the store.
    pub fn link_endpoints_present(&self, link: &LinkData) -> bool {
        self.node_index.contains_key(link.start.as_str())
            && self.node_index.contains_key(link.end.as_str())
    }

    /// Ids of links leaving `id`, hidden links excluded.
    pub fn outgoing(&self, id: &str) -> Vec<&str> {
        let Some(&idx) = self.node_index.get(id) else {
            return Vec::new();
        };
        let cache = self.ensure_adj();
        let out_links = &cache.out[idx];
        let mut out: Vec<&str> = Vec::with_capacity(out_links.len());
        for &link_idx in out_links {
            out.push(self.links[link_idx].id.as_str());
        }
        out
    }

    /// Ids of links arriving at `id`, hidden links excluded.
    pub fn incoming(&self, id: &str) -> Vec<&str> {
        let Some(&idx) = self.node_index.get(id) else {
            return Vec::new();
        };
        let cache = self.ensure_adj();
        let in_links = &cache.in_[idx];
        let mut out: Vec<&str> = Vec::with_capacity(in_links.len());
        for &link_idx in in_links {
            out.push(self.links[link_idx].id.as_str());
        }
        out
    }

    fn compute_group_id(&self, start: &str, end: &str) -> Option<String> {
        if !self.node_index.contains_key(start) || !self.node_index.contains_key(end) {
            return None;
        }
        self.nearest_common_ancestor(start, end)
    }

    /// Recomputes `group_id` for links whose endpoints were just created.
    fn refresh_group_ids(&mut self, new_ids: &[String]) {
        if new_ids.is_empty() || self.links.is_empty() {
            return;
        }
        let added: HashSet<&str> = new_ids.iter().map(|s| s.as_str()).collect();
        for i in 0..self.links.len() {
            let touches = added.contains(self.links[i].start.as_str())
                || added.contains(self.links[i].end.as_str());
            if touches {
                let start = self.links[i].start.clone();
                let end = self.links[i].end.clone();
                self.links[i].group_id = self.compute_group_id(&start, &end);
            }
        }
    }

    // ---- containment ----------------------------------------------------

    pub fn parent_id(&self, id: &str) -> Option<&str> {
        self.parent.get(id).map(|s| s.as_str())
    }

    /// Direct children of `id`, in insertion order.
    pub fn child_ids(&self, id: &str) -> &[String] {
        self.children.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Parent-less nodes, in insertion order.
    pub fn root_ids(&self) -> Vec<&str> {
        self.nodes
            .iter()
            .filter(|n| !self.parent.contains_key(n.id.as_str()))
            .map(|n| n.id.as_str())
            .collect()
    }

    /// Strict ancestors of `id`, nearest first. Empty for roots and unknown
    /// ids.
    pub fn ancestor_path(&self, id: &str) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        let mut cur = id;
        while let Some(p) = self.parent.get(cur) {
            out.push(p.clone());
            cur = p;
        }
        out
    }

    /// Innermost container that strictly contains both `a` and `b`; `None`
    /// when the two meet only at the top level. For `a == b` this is the
    /// node's own parent.
    pub fn nearest_common_ancestor(&self, a: &str, b: &str) -> Option<String> {
        let mut seen: HashSet<&str> = HashSet::default();
        let mut cur = a;
        while let Some(p) = self.parent.get(cur) {
            seen.insert(p.as_str());
            cur = p;
        }
        let mut cur = b;
        while let Some(p) = self.parent.get(cur) {
            if seen.contains(p.as_str()) {
                return Some(p.clone());
            }
            cur = p;
        }
        None
    }

    // ---- visibility -----------------------------------------------------

    /// A node is visible iff no strict ancestor is collapsed.
    pub fn is_visible(&self, id: &str) -> bool {
        if !self.node_index.contains_key(id) {
            return false;
        }
        let mut cur = id;
        while let Some(p) = self.parent.get(cur) {
            let Some(&idx) = self.node_index.get(p.as_str()) else {
                return false;
            };
            if !self.nodes[idx].disclosed {
                return false;
            }
            cur = p;
        }
        true
    }

    /// The node standing in for `id` on screen: `id` itself when visible,
    /// otherwise the outermost collapsed ancestor that is itself visible.
    pub fn nearest_visible_ancestor<'a>(&'a self, id: &'a str) -> Option<&'a str> {
        if !self.node_index.contains_key(id) {
            return None;
        }
        let mut chain: Vec<&str> = Vec::new();
        let mut cur = id;
        while let Some(p) = self.parent.get(cur) {
            chain.push(p.as_str());
            cur = p;
        }
        // Walk from the root side down; the first collapsed ancestor hides
        // everything beneath it and is visible itself.
        for &anc in chain.iter().rev() {
            let Some(&idx) = self.node_index.get(anc) else {
                continue;
            };
            if !self.nodes[idx].disclosed {
                return Some(anc);
            }
        }
        Some(id)
    }

    // ---- bounds ---------------------------------------------------------

    /// Content bounds inflated by the decoration margins, in the parent's
    /// inner coordinate space.
    pub fn decorated_bounds(&self, id: &str) -> Option<Rect> {
        let node = self.node(id)?;
        Some(node.content_bounds().outer_rect(node.visual.decor))
    }

    /// Top-left of the node's content bounds in global coordinates,
    /// accumulated over the ancestor chain's positions and padding.
    pub fn global_position(&self, id: &str) -> Option<Point> {
        let node = self.node(id)?;
        let mut pos = node.visual.position;
        let mut cur = id;
        while let Some(p) = self.parent.get(cur) {
            let parent = self.node(p.as_str())?;
            pos += parent.visual.position.to_vector()
                + vector(parent.padding.left, parent.padding.top);
            cur = p;
        }
        Some(pos)
    }

    /// Marks every ancestor of `id` as not measured. Walks the whole chain:
    /// a moved or resized node changes its container's union bounds, which
    /// changes *its* container's bounds. The node's own size stays valid.
    pub fn invalidate_bounds_upward(&mut self, id: &str) {
        if !self.node_index.contains_key(id) {
            return;
        }
        let mut cur = id.to_string();
        while let Some(p) = self.parent.get(&cur).cloned() {
            if let Some(&pi) = self.node_index.get(p.as_str()) {
                self.nodes[pi].visual.measured = false;
            }
            cur = p;
        }
    }

    /// Records a measured content size for `id`.
    pub fn set_measured(&mut self, id: &str, size: Size) -> bool {
        let Some(&idx) = self.node_index.get(id) else {
            return false;
        };
        let visual = &mut self.nodes[idx].visual;
        visual.size = size;
        visual.measured = true;
        true
    }

    /// Clears the `deferred` flag once a container's children have been
    /// fetched from the data provider.
    pub fn mark_fetched(&mut self, id: &str) -> bool {
        let Some(&idx) = self.node_index.get(id) else {
            return false;
        };
        self.nodes[idx].deferred = false;
        true
    }
}
