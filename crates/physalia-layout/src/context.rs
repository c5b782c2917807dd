//! Transient layout context: the flattened view of one visible region of the
//! graph that gets handed to a [`LayoutAlgorithm`](crate::LayoutAlgorithm).
//!
//! A context is built from the store plus a resolved link set, scoped either
//! to the whole diagram or to one disclosed container, and optionally
//! restricted by a dirty set so untouched regions ride along as frozen
//! boxes. Node coordinates follow the store convention (positions relative
//! to the parent's padded origin); link points are expressed in the scope's
//! coordinate space and translated to each link's home container on commit.

use physalia_graph::dirty::DirtySet;
use physalia_graph::geom::{Point, Rect, SideOffsets, Size, Vector, vector};
use physalia_graph::resolve::ResolvedLinks;
use physalia_graph::store::GraphStore;
use rustc_hash::FxBuildHasher;

type HashMap<K, V> = hashbrown::HashMap<K, V, FxBuildHasher>;
type HashSet<T> = hashbrown::HashSet<T, FxBuildHasher>;

/// Label geometry attached to a context node.
///
/// The size is fixed by measurement; algorithms may move and rotate the
/// label through the owning [`CtxNode`] setters.
#[derive(Debug, Clone, PartialEq)]
pub struct CtxLabel {
    size: Size,
    position: Point,
    rotation: f64,
}

impl CtxLabel {
    pub fn size(&self) -> Size {
        self.size
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn rotation(&self) -> f64 {
        self.rotation
    }
}

/// One node slot in the context arena.
///
/// Geometry writes go through the setters, which refuse to touch read-only
/// slots and flag the slot dirty otherwise; the commit path only persists
/// dirty slots (plus any that normalization shifted).
#[derive(Debug, Clone)]
pub struct CtxNode {
    id: String,
    parent: Option<usize>,
    children: Vec<usize>,
    position: Point,
    size: Size,
    decor: SideOffsets,
    /// `Some` only when the container is expanded in this context; frozen
    /// and collapsed containers present as opaque boxes.
    padding: Option<SideOffsets>,
    label: Option<CtxLabel>,
    read_only: bool,
    dirty: bool,
}

impl CtxNode {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn parent_index(&self) -> Option<usize> {
        self.parent
    }

    pub fn child_indices(&self) -> &[usize] {
        &self.children
    }

    /// Position of the content box, relative to the parent's padded origin
    /// (scope-relative for top-level slots).
    pub fn position(&self) -> Point {
        self.position
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn content_bounds(&self) -> Rect {
        Rect::new(self.position, self.size)
    }

    /// Content bounds inflated by the decoration band.
    pub fn decorated_bounds(&self) -> Rect {
        self.content_bounds().outer_rect(self.decor)
    }

    pub fn decor(&self) -> SideOffsets {
        self.decor
    }

    /// Inner padding, present only for containers expanded in this context.
    pub fn padding(&self) -> Option<SideOffsets> {
        self.padding
    }

    /// Whether this slot is an expanded container whose children are part
    /// of the context.
    pub fn is_container(&self) -> bool {
        self.padding.is_some()
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn label(&self) -> Option<&CtxLabel> {
        self.label.as_ref()
    }

    /// Moves the node. No-op on read-only slots.
    pub fn set_position(&mut self, position: Point) {
        if self.read_only {
            return;
        }
        self.position = position;
        self.dirty = true;
    }

    /// Moves the label relative to the node's content origin. No-op on
    /// read-only slots or nodes without a label.
    pub fn set_label_position(&mut self, position: Point) {
        if self.read_only {
            return;
        }
        if let Some(label) = &mut self.label {
            label.position = position;
            self.dirty = true;
        }
    }

    /// Rotates the label (radians). No-op on read-only slots or nodes
    /// without a label.
    pub fn set_label_rotation(&mut self, rotation: f64) {
        if self.read_only {
            return;
        }
        if let Some(label) = &mut self.label {
            label.rotation = rotation;
            self.dirty = true;
        }
    }

    /// Normalization shift; bypasses the read-only guard on purpose since
    /// the commit path controls which slots it applies to.
    pub(crate) fn shift(&mut self, delta: Vector) {
        self.position += delta;
    }
}

/// One link slot in the context arena.
///
/// `points` are expressed in the scope's coordinate space while the context
/// is alive; `space` names the container whose coordinate system the
/// committed route is stored in (the link's group container).
#[derive(Debug, Clone)]
pub struct CtxLink {
    id: String,
    start: String,
    end: String,
    space: Option<String>,
    points: Vec<Point>,
    label: Option<Rect>,
    promoted: bool,
    dirty: bool,
}

impl CtxLink {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn start(&self) -> &str {
        &self.start
    }

    pub fn end(&self) -> &str {
        &self.end
    }

    /// Home container whose coordinate space the committed route uses;
    /// `None` for top-level links.
    pub fn space(&self) -> Option<&str> {
        self.space.as_deref()
    }

    /// Route points, scope-relative.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Label box, scope-relative.
    pub fn label(&self) -> Option<Rect> {
        self.label
    }

    /// Whether this slot stands in for a bundle of links into collapsed
    /// containers. Promoted routes are derived at capture time, so writes
    /// here inform the algorithm's own bookkeeping only.
    pub fn is_promoted(&self) -> bool {
        self.promoted
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn set_points(&mut self, points: Vec<Point>) {
        self.points = points;
        self.dirty = true;
    }

    pub fn set_label(&mut self, label: Option<Rect>) {
        self.label = label;
        self.dirty = true;
    }

    pub(crate) fn shift(&mut self, delta: Vector) {
        for p in &mut self.points {
            *p += delta;
        }
        if let Some(label) = &mut self.label {
            *label = label.translate(delta);
        }
    }
}

/// Where a dirty set touches the tree.
struct DirtyPaths {
    /// Directly touched ids: dirty nodes plus dirty-link endpoints. A
    /// sibling level repacks only when one of its members is in here.
    direct: HashSet<String>,
    /// Touched ids plus every ancestor; containers expand only when on one
    /// of these paths.
    live: HashSet<String>,
}

impl DirtyPaths {
    fn collect(store: &GraphStore, dirty: &DirtySet) -> DirtyPaths {
        let mut direct: HashSet<String> = HashSet::default();
        let mut live: HashSet<String> = HashSet::default();
        let mut mark = |id: &str| {
            if !store.has_node(id) {
                return;
            }
            direct.insert(id.to_string());
            live.insert(id.to_string());
            for ancestor in store.ancestor_path(id) {
                live.insert(ancestor);
            }
        };
        for id in &dirty.nodes {
            mark(id);
        }
        for id in &dirty.links {
            if let Some(link) = store.link(id) {
                let (start, end) = (link.start().to_string(), link.end().to_string());
                mark(&start);
                mark(&end);
            }
        }
        DirtyPaths { direct, live }
    }
}

/// Flattened node/link view for one layout pass.
pub struct LayoutContext {
    scope: Option<String>,
    /// Global position of the scope's padded origin; `(0,0)` for the
    /// diagram scope.
    scope_origin: Point,
    incremental: bool,
    nodes: Vec<CtxNode>,
    index: HashMap<String, usize>,
    /// Scope-level slots in insertion order, externals excluded.
    roots: Vec<usize>,
    links: Vec<CtxLink>,
    link_index: HashMap<String, usize>,
}

impl LayoutContext {
    /// Builds a context over `scope` (a disclosed container id, or `None`
    /// for the whole diagram).
    ///
    /// With `dirty = None` every visible node in scope is included and
    /// writable. With a dirty set, containers expand only when their
    /// subtree intersects it, and a sibling level is writable only when one
    /// of its members was touched directly; everything else rides along
    /// read-only (boxes included) so the algorithm sees true occupancy.
    /// Endpoints of in-scope links that live outside the scope are included
    /// as read-only slots at scope-relative positions.
    pub fn build(
        store: &GraphStore,
        resolved: &ResolvedLinks,
        scope: Option<&str>,
        dirty: Option<&DirtySet>,
    ) -> LayoutContext {
        let paths = dirty.map(|d| DirtyPaths::collect(store, d));

        let mut ctx = LayoutContext {
            scope: scope.map(str::to_string),
            scope_origin: Self::inner_origin_global(store, scope),
            incremental: paths.is_some(),
            nodes: Vec::new(),
            index: HashMap::default(),
            roots: Vec::new(),
            links: Vec::new(),
            link_index: HashMap::default(),
        };

        let top_ids: Vec<String> = match scope {
            Some(s) => store.child_ids(s).to_vec(),
            None => store.root_ids().into_iter().map(str::to_string).collect(),
        };
        let top_writable = paths
            .as_ref()
            .is_none_or(|p| top_ids.iter().any(|id| p.direct.contains(id)));
        for id in &top_ids {
            if let Some(idx) =
                Self::push_subtree(store, &mut ctx, paths.as_ref(), id, None, top_writable)
            {
                ctx.roots.push(idx);
            }
        }

        for link_id in &resolved.direct {
            let Some(link) = store.link(link_id) else {
                continue;
            };
            Self::push_link(
                store,
                &mut ctx,
                link_id,
                link.start(),
                link.end(),
                link.group_id().map(str::to_string),
                false,
                link.route.clone(),
                link.label,
            );
        }
        for promoted in &resolved.promoted {
            let space = store.nearest_common_ancestor(&promoted.start, &promoted.end);
            Self::push_link(
                store,
                &mut ctx,
                &promoted.id,
                &promoted.start,
                &promoted.end,
                space,
                true,
                Vec::new(),
                None,
            );
        }

        tracing::debug!(
            scope = scope.unwrap_or("<diagram>"),
            nodes = ctx.nodes.len(),
            links = ctx.links.len(),
            incremental = ctx.incremental,
            "built layout context"
        );
        ctx
    }

    fn push_subtree(
        store: &GraphStore,
        ctx: &mut LayoutContext,
        paths: Option<&DirtyPaths>,
        id: &str,
        parent: Option<usize>,
        level_writable: bool,
    ) -> Option<usize> {
        let node = store.node(id)?;
        let on_dirty_path = paths.is_none_or(|p| p.live.contains(id));
        let child_ids = store.child_ids(id);
        let expand = node.is_disclosed() && !child_ids.is_empty() && on_dirty_path;

        let idx = ctx.nodes.len();
        ctx.nodes.push(CtxNode {
            id: id.to_string(),
            parent,
            children: Vec::new(),
            position: node.visual.position,
            size: node.visual.size,
            decor: node.visual.decor,
            padding: expand.then_some(node.padding),
            label: node.visual.label.as_ref().map(|l| CtxLabel {
                size: l.size,
                position: l.position,
                rotation: l.rotation,
            }),
            read_only: !level_writable,
            dirty: false,
        });
        ctx.index.insert(id.to_string(), idx);
        if let Some(p) = parent {
            ctx.nodes[p].children.push(idx);
        }

        if expand {
            let child_ids = child_ids.to_vec();
            let child_writable = paths
                .is_none_or(|p| child_ids.iter().any(|c| p.direct.contains(c)));
            for child in &child_ids {
                Self::push_subtree(store, ctx, paths, child, Some(idx), child_writable);
            }
        }
        Some(idx)
    }

    #[allow(clippy::too_many_arguments)]
    fn push_link(
        store: &GraphStore,
        ctx: &mut LayoutContext,
        id: &str,
        start: &str,
        end: &str,
        space: Option<String>,
        promoted: bool,
        route: Vec<Point>,
        label: Option<Rect>,
    ) {
        if ctx.link_index.contains_key(id) {
            return;
        }
        let start_in = ctx.index.contains_key(start);
        let end_in = ctx.index.contains_key(end);
        if !start_in && !end_in {
            return;
        }
        if !start_in && !Self::push_external(store, ctx, start) {
            return;
        }
        if !end_in && !Self::push_external(store, ctx, end) {
            return;
        }

        // Stored routes live in the link's home space; re-anchor to scope.
        let delta = Self::inner_origin_global(store, space.as_deref()) - ctx.scope_origin;
        let idx = ctx.links.len();
        ctx.links.push(CtxLink {
            id: id.to_string(),
            start: start.to_string(),
            end: end.to_string(),
            space,
            points: route.iter().map(|p| *p + delta).collect(),
            label: label.map(|r| r.translate(delta)),
            promoted,
            dirty: false,
        });
        ctx.link_index.insert(id.to_string(), idx);
    }

    /// Adds a read-only anchor slot for a link endpoint that lives outside
    /// the scope, positioned scope-relative.
    fn push_external(store: &GraphStore, ctx: &mut LayoutContext, id: &str) -> bool {
        if ctx.index.contains_key(id) {
            return true;
        }
        let Some(node) = store.node(id) else {
            return false;
        };
        if !store.is_visible(id) {
            return false;
        }
        let Some(global) = store.global_position(id) else {
            return false;
        };
        let idx = ctx.nodes.len();
        ctx.nodes.push(CtxNode {
            id: id.to_string(),
            parent: None,
            children: Vec::new(),
            position: global - ctx.scope_origin.to_vector(),
            size: node.visual.size,
            decor: node.visual.decor,
            padding: None,
            label: None,
            read_only: true,
            dirty: false,
        });
        ctx.index.insert(id.to_string(), idx);
        true
    }

    /// Global position of a container's padded origin (`(0,0)` for `None`).
    pub(crate) fn inner_origin_global(store: &GraphStore, container: Option<&str>) -> Point {
        let Some(id) = container else {
            return Point::zero();
        };
        let Some(global) = store.global_position(id) else {
            return Point::zero();
        };
        let Some(node) = store.node(id) else {
            return Point::zero();
        };
        global + vector(node.padding.left, node.padding.top)
    }

    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    /// Whether this context was built against a dirty set.
    pub fn is_incremental(&self) -> bool {
        self.incremental
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn nodes(&self) -> &[CtxNode] {
        &self.nodes
    }

    pub fn links(&self) -> &[CtxLink] {
        &self.links
    }

    pub fn node_at(&self, idx: usize) -> &CtxNode {
        &self.nodes[idx]
    }

    pub fn node_at_mut(&mut self, idx: usize) -> &mut CtxNode {
        &mut self.nodes[idx]
    }

    pub fn link_at(&self, idx: usize) -> &CtxLink {
        &self.links[idx]
    }

    pub fn link_at_mut(&mut self, idx: usize) -> &mut CtxLink {
        &mut self.links[idx]
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn link_index_of(&self, id: &str) -> Option<usize> {
        self.link_index.get(id).copied()
    }

    /// Scope-level slots in insertion order, externals excluded.
    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    /// Scope-relative position of a slot: its own position plus every
    /// ancestor's padded origin.
    pub fn global_position(&self, idx: usize) -> Point {
        let mut pos = self.nodes[idx].position;
        let mut cur = self.nodes[idx].parent;
        while let Some(pi) = cur {
            let parent = &self.nodes[pi];
            let pad = parent.padding.unwrap_or(SideOffsets::zero());
            pos += parent.position.to_vector() + vector(pad.left, pad.top);
            cur = parent.parent;
        }
        pos
    }

    /// Scope-relative center of a slot's content box.
    pub fn global_center(&self, idx: usize) -> Point {
        let pos = self.global_position(idx);
        let size = self.nodes[idx].size;
        pos + vector(size.width / 2.0, size.height / 2.0)
    }

    /// Sibling groups an algorithm lays out independently: the scope level
    /// first, then each expanded container's children, in arena order. The
    /// container's own slot index accompanies each inner group.
    pub fn layout_groups(&self) -> Vec<(Option<usize>, Vec<usize>)> {
        let mut groups = vec![(None, self.roots.clone())];
        for (idx, node) in self.nodes.iter().enumerate() {
            if node.padding.is_some() && !node.children.is_empty() {
                groups.push((Some(idx), node.children.clone()));
            }
        }
        groups
    }
}
