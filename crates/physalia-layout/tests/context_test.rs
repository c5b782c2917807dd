use physalia_graph::geom::{SideOffsets, point, size};
use physalia_graph::{DirtySet, GraphStore, LinkSpec, NodePatch, NodeSpec, resolve};
use physalia_layout::LayoutContext;

/// Container `p` (padding top=1 right=2 bottom=3 left=4) at (5,7) holding
/// `a` and `b`, top-level leaf `x`, one inner link and one crossing link.
fn nested_store() -> GraphStore {
    let mut store = GraphStore::new();
    store
        .add_node(
            None,
            NodeSpec::new("p").with_padding(SideOffsets::new(1.0, 2.0, 3.0, 4.0)),
        )
        .unwrap();
    store
        .add_nodes(
            Some("p"),
            vec![
                NodeSpec::new("a").with_size(size(10.0, 10.0)),
                NodeSpec::new("b").with_size(size(10.0, 10.0)),
            ],
        )
        .unwrap();
    store
        .add_node(None, NodeSpec::new("x").with_size(size(8.0, 8.0)))
        .unwrap();
    store.add_link(LinkSpec::new("l_ab", "a", "b")).unwrap();
    store.add_link(LinkSpec::new("l_xa", "x", "a")).unwrap();
    store
        .update_node("p", NodePatch::new().with_position(point(5.0, 7.0)))
        .unwrap();
    store
        .update_node("a", NodePatch::new().with_position(point(2.0, 3.0)))
        .unwrap();
    store
        .update_node("b", NodePatch::new().with_position(point(30.0, 0.0)))
        .unwrap();
    store
        .update_node("x", NodePatch::new().with_position(point(50.0, 60.0)))
        .unwrap();
    store
}

#[test]
fn full_build_flattens_the_visible_tree() {
    let store = nested_store();
    let resolved = resolve(&store);
    let ctx = LayoutContext::build(&store, &resolved, None, None);

    assert_eq!(ctx.node_count(), 4);
    assert_eq!(ctx.link_count(), 2);
    assert!(!ctx.is_incremental());

    let roots: Vec<&str> = ctx.roots().iter().map(|&i| ctx.node_at(i).id()).collect();
    assert_eq!(roots, ["p", "x"]);

    let p = ctx.node_at(ctx.index_of("p").unwrap());
    assert!(p.is_container());
    assert_eq!(p.padding(), Some(SideOffsets::new(1.0, 2.0, 3.0, 4.0)));
    let children: Vec<&str> = p
        .child_indices()
        .iter()
        .map(|&i| ctx.node_at(i).id())
        .collect();
    assert_eq!(children, ["a", "b"]);

    for node in ctx.nodes() {
        assert!(!node.is_read_only());
        assert!(!node.is_dirty());
    }

    let l_ab = ctx.link_at(ctx.link_index_of("l_ab").unwrap());
    assert_eq!(l_ab.space(), Some("p"));
    assert!(!l_ab.is_promoted());
    let l_xa = ctx.link_at(ctx.link_index_of("l_xa").unwrap());
    assert_eq!(l_xa.space(), None);
}

#[test]
fn collapsed_container_presents_as_opaque_box() {
    let mut store = nested_store();
    assert!(store.set_disclosed("p", false));
    let resolved = resolve(&store);
    let ctx = LayoutContext::build(&store, &resolved, None, None);

    assert_eq!(ctx.node_count(), 2);
    let p = ctx.node_at(ctx.index_of("p").unwrap());
    assert!(!p.is_container());
    assert_eq!(p.padding(), None);
    assert!(ctx.index_of("a").is_none());

    assert_eq!(ctx.link_count(), 1);
    let promoted = ctx.link_at(0);
    assert!(promoted.is_promoted());
    assert_eq!(promoted.start(), "x");
    assert_eq!(promoted.end(), "p");
    assert_eq!(promoted.space(), None);
    assert!(promoted.points().is_empty());
}

#[test]
fn scoped_build_anchors_external_endpoints() {
    let store = nested_store();
    let resolved = resolve(&store);
    let ctx = LayoutContext::build(&store, &resolved, Some("p"), None);

    let roots: Vec<&str> = ctx.roots().iter().map(|&i| ctx.node_at(i).id()).collect();
    assert_eq!(roots, ["a", "b"]);

    // `x` rides along read-only, re-anchored to p's padded origin (9,8).
    let x = ctx.node_at(ctx.index_of("x").unwrap());
    assert!(x.is_read_only());
    assert_eq!(x.position(), point(41.0, 52.0));

    let a = ctx.node_at(ctx.index_of("a").unwrap());
    assert_eq!(a.position(), point(2.0, 3.0));
    assert_eq!(ctx.link_count(), 2);
}

#[test]
fn read_only_slots_ignore_setters() {
    let store = nested_store();
    let resolved = resolve(&store);
    let mut ctx = LayoutContext::build(&store, &resolved, Some("p"), None);

    let x = ctx.index_of("x").unwrap();
    ctx.node_at_mut(x).set_position(point(1.0, 1.0));
    assert_eq!(ctx.node_at(x).position(), point(41.0, 52.0));
    assert!(!ctx.node_at(x).is_dirty());
}

#[test]
fn setters_mark_slots_dirty() {
    let store = nested_store();
    let resolved = resolve(&store);
    let mut ctx = LayoutContext::build(&store, &resolved, None, None);

    let a = ctx.index_of("a").unwrap();
    ctx.node_at_mut(a).set_position(point(50.0, 50.0));
    assert!(ctx.node_at(a).is_dirty());
    assert_eq!(ctx.node_at(a).position(), point(50.0, 50.0));

    let l = ctx.link_index_of("l_ab").unwrap();
    ctx.link_at_mut(l).set_points(vec![point(0.0, 0.0)]);
    assert!(ctx.link_at(l).is_dirty());
}

#[test]
fn incremental_build_freezes_untouched_containers() {
    let mut store = nested_store();
    store
        .add_node(
            None,
            NodeSpec::new("q").with_padding(SideOffsets::new(1.0, 1.0, 1.0, 1.0)),
        )
        .unwrap();
    store
        .add_node(Some("q"), NodeSpec::new("c").with_size(size(10.0, 10.0)))
        .unwrap();
    let resolved = resolve(&store);

    let mut dirty = DirtySet::new();
    dirty.insert_node("a");
    let ctx = LayoutContext::build(&store, &resolved, None, Some(&dirty));

    assert!(ctx.is_incremental());
    // p is on the dirty path: it expands, and its whole child level is the
    // repacked region.
    let p = ctx.node_at(ctx.index_of("p").unwrap());
    assert!(p.is_container());
    assert!(p.is_read_only());
    assert!(!ctx.node_at(ctx.index_of("a").unwrap()).is_read_only());
    assert!(!ctx.node_at(ctx.index_of("b").unwrap()).is_read_only());
    // q rides along as a frozen box; nothing at the top level was touched.
    let q = ctx.node_at(ctx.index_of("q").unwrap());
    assert!(!q.is_container());
    assert!(q.is_read_only());
    assert!(ctx.index_of("c").is_none());
    assert!(ctx.node_at(ctx.index_of("x").unwrap()).is_read_only());
}

#[test]
fn incremental_build_marks_top_level_read_only_when_untouched() {
    let mut store = nested_store();
    store
        .add_node(
            None,
            NodeSpec::new("q").with_padding(SideOffsets::new(1.0, 1.0, 1.0, 1.0)),
        )
        .unwrap();
    store
        .add_node(Some("q"), NodeSpec::new("c").with_size(size(10.0, 10.0)))
        .unwrap();
    let resolved = resolve(&store);

    // Dirty inside q only: q expands, everything at the top level freezes.
    let mut dirty = DirtySet::new();
    dirty.insert_node("c");
    let ctx = LayoutContext::build(&store, &resolved, None, Some(&dirty));

    let q_idx = ctx.index_of("q").unwrap();
    assert!(ctx.node_at(q_idx).is_container());
    assert!(ctx.node_at(q_idx).is_read_only());
    let c_idx = ctx.index_of("c").unwrap();
    assert!(!ctx.node_at(c_idx).is_read_only());
    let p_idx = ctx.index_of("p").unwrap();
    assert!(ctx.node_at(p_idx).is_read_only());
    assert!(!ctx.node_at(p_idx).is_container());
}

#[test]
fn scope_relative_positions_round_trip() {
    let mut store = GraphStore::new();
    store
        .add_node(
            None,
            NodeSpec::new("o").with_padding(SideOffsets::new(1.0, 2.0, 3.0, 4.0)),
        )
        .unwrap();
    store
        .add_node(
            Some("o"),
            NodeSpec::new("i").with_padding(SideOffsets::new(2.0, 2.0, 2.0, 2.0)),
        )
        .unwrap();
    store
        .add_node(Some("i"), NodeSpec::new("z").with_size(size(6.0, 6.0)))
        .unwrap();
    store
        .update_node("o", NodePatch::new().with_position(point(5.0, 7.0)))
        .unwrap();
    store
        .update_node("i", NodePatch::new().with_position(point(3.0, 4.0)))
        .unwrap();
    store
        .update_node("z", NodePatch::new().with_position(point(10.0, 20.0)))
        .unwrap();
    let resolved = resolve(&store);

    let ctx = LayoutContext::build(&store, &resolved, None, None);
    let z = ctx.index_of("z").unwrap();
    assert_eq!(ctx.global_position(z), point(24.0, 34.0));
    assert_eq!(ctx.global_position(z), store.global_position("z").unwrap());

    let scoped = LayoutContext::build(&store, &resolved, Some("o"), None);
    let z = scoped.index_of("z").unwrap();
    assert_eq!(scoped.global_position(z), point(15.0, 26.0));
}

#[test]
fn stored_routes_are_reanchored_to_the_scope() {
    let mut store = nested_store();
    store.link_mut("l_ab").unwrap().route = vec![point(0.0, 0.0), point(10.0, 10.0)];
    let resolved = resolve(&store);

    // Diagram scope: inner-space points shift by p's padded origin (9,8).
    let ctx = LayoutContext::build(&store, &resolved, None, None);
    let l = ctx.link_at(ctx.link_index_of("l_ab").unwrap());
    assert_eq!(l.points(), [point(9.0, 8.0), point(19.0, 18.0)]);

    // Scoped to p the route is already home.
    let scoped = LayoutContext::build(&store, &resolved, Some("p"), None);
    let l = scoped.link_at(scoped.link_index_of("l_ab").unwrap());
    assert_eq!(l.points(), [point(0.0, 0.0), point(10.0, 10.0)]);
}

#[test]
fn unknown_scope_yields_an_empty_context() {
    let store = nested_store();
    let resolved = resolve(&store);
    let ctx = LayoutContext::build(&store, &resolved, Some("nope"), None);
    assert_eq!(ctx.node_count(), 0);
    assert_eq!(ctx.link_count(), 0);
}
