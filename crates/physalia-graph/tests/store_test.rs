use physalia_graph::geom::{point, size};
use physalia_graph::{
    Error, GraphStore, LinkPatch, LinkSpec, NodePatch, NodeSpec, geom::SideOffsets,
};

fn store_with_container() -> GraphStore {
    // a
    // g { b, c }
    let mut store = GraphStore::new();
    store
        .add_nodes(
            None,
            vec![NodeSpec::new("a"), NodeSpec::new("g")],
        )
        .unwrap();
    store
        .add_nodes(Some("g"), vec![NodeSpec::new("b"), NodeSpec::new("c")])
        .unwrap();
    store
}

#[test]
fn add_nodes_returns_ids_in_insertion_order() {
    let mut store = GraphStore::new();
    let ids = store
        .add_nodes(
            None,
            vec![NodeSpec::new("x"), NodeSpec::new("y"), NodeSpec::new("z")],
        )
        .unwrap();
    assert_eq!(ids, vec!["x", "y", "z"]);
    assert_eq!(store.node_ids(), vec!["x", "y", "z"]);
    assert_eq!(store.root_ids(), vec!["x", "y", "z"]);
}

#[test]
fn duplicate_node_id_rejects_the_whole_batch() {
    let mut store = GraphStore::new();
    store.add_nodes(None, vec![NodeSpec::new("x")]).unwrap();

    let err = store
        .add_nodes(None, vec![NodeSpec::new("y"), NodeSpec::new("x")])
        .unwrap_err();
    assert!(matches!(err, Error::DuplicateNode { id } if id == "x"));
    // Nothing from the failed batch landed.
    assert!(!store.has_node("y"));
    assert_eq!(store.node_count(), 1);
}

#[test]
fn duplicate_id_within_one_batch_is_rejected() {
    let mut store = GraphStore::new();
    let err = store
        .add_nodes(None, vec![NodeSpec::new("x"), NodeSpec::new("x")])
        .unwrap_err();
    assert!(matches!(err, Error::DuplicateNode { id } if id == "x"));
    assert_eq!(store.node_count(), 0);
}

#[test]
fn validated_batch_inserts_every_spec() {
    let mut store = GraphStore::new();
    store.add_nodes(None, vec![NodeSpec::new("seen")]).unwrap();

    let ids = store
        .add_nodes(
            None,
            vec![
                NodeSpec::new("p").with_size(size(30.0, 10.0)),
                NodeSpec::new("q").with_fill("accent"),
            ],
        )
        .unwrap();
    assert_eq!(ids, vec!["p", "q"]);
    assert_eq!(store.node("p").unwrap().visual.size, size(30.0, 10.0));
    assert_eq!(store.node("q").unwrap().fill.as_deref(), Some("accent"));
    assert_eq!(store.node_count(), 3);
}

#[test]
fn adding_under_unknown_parent_is_an_error() {
    let mut store = GraphStore::new();
    let err = store
        .add_nodes(Some("missing"), vec![NodeSpec::new("x")])
        .unwrap_err();
    assert!(matches!(err, Error::NodeNotFound { id } if id == "missing"));
}

#[test]
fn children_are_tracked_in_insertion_order() {
    let store = store_with_container();
    assert_eq!(store.child_ids("g"), ["b", "c"]);
    assert_eq!(store.parent_id("b"), Some("g"));
    assert_eq!(store.parent_id("a"), None);
    assert_eq!(store.root_ids(), vec!["a", "g"]);
}

#[test]
fn ancestor_path_lists_nearest_first() {
    let mut store = GraphStore::new();
    store.add_nodes(None, vec![NodeSpec::new("outer")]).unwrap();
    store
        .add_nodes(Some("outer"), vec![NodeSpec::new("inner")])
        .unwrap();
    store
        .add_nodes(Some("inner"), vec![NodeSpec::new("leaf")])
        .unwrap();

    assert_eq!(store.ancestor_path("leaf"), vec!["inner", "outer"]);
    assert_eq!(store.ancestor_path("outer"), Vec::<String>::new());
}

#[test]
fn nearest_common_ancestor_finds_the_innermost_container() {
    let mut store = GraphStore::new();
    store.add_nodes(None, vec![NodeSpec::new("p")]).unwrap();
    store
        .add_nodes(Some("p"), vec![NodeSpec::new("q"), NodeSpec::new("r")])
        .unwrap();
    store
        .add_nodes(Some("q"), vec![NodeSpec::new("q1")])
        .unwrap();

    assert_eq!(store.nearest_common_ancestor("q1", "r"), Some("p".into()));
    assert_eq!(store.nearest_common_ancestor("q1", "q"), Some("p".into()));
    assert_eq!(store.nearest_common_ancestor("q1", "q1"), Some("q".into()));
    assert_eq!(store.nearest_common_ancestor("p", "q1"), None);
}

#[test]
fn link_group_id_is_the_nearest_common_ancestor() {
    let mut store = store_with_container();
    let inside = store.add_link(LinkSpec::new("l1", "b", "c")).unwrap();
    let crossing = store.add_link(LinkSpec::new("l2", "a", "b")).unwrap();

    assert_eq!(store.link(&inside).unwrap().group_id(), Some("g"));
    assert_eq!(store.link(&crossing).unwrap().group_id(), None);
}

#[test]
fn group_id_is_refreshed_when_missing_endpoints_appear() {
    let mut store = GraphStore::new();
    store.add_nodes(None, vec![NodeSpec::new("g")]).unwrap();
    store
        .add_nodes(Some("g"), vec![NodeSpec::new("b")])
        .unwrap();
    store.add_link(LinkSpec::new("l", "b", "c")).unwrap();
    assert_eq!(store.link("l").unwrap().group_id(), None);

    store
        .add_nodes(Some("g"), vec![NodeSpec::new("c")])
        .unwrap();
    assert_eq!(store.link("l").unwrap().group_id(), Some("g"));
}

#[test]
fn updating_link_endpoints_recomputes_group_id() {
    let mut store = store_with_container();
    store.add_link(LinkSpec::new("l", "a", "b")).unwrap();
    assert_eq!(store.link("l").unwrap().group_id(), None);

    store
        .update_link("l", LinkPatch::new().with_start("c"))
        .unwrap();
    assert_eq!(store.link("l").unwrap().start(), "c");
    assert_eq!(store.link("l").unwrap().group_id(), Some("g"));
}

#[test]
fn reserved_link_id_prefix_is_rejected() {
    let mut store = store_with_container();
    let err = store
        .add_link(LinkSpec::new("_pl:a->g", "a", "g"))
        .unwrap_err();
    assert!(matches!(err, Error::ReservedLinkId { .. }));
    assert_eq!(store.link_count(), 0);
}

#[test]
fn links_may_reference_missing_nodes() {
    let mut store = GraphStore::new();
    store.add_nodes(None, vec![NodeSpec::new("a")]).unwrap();
    store.add_link(LinkSpec::new("l", "a", "ghost")).unwrap();

    let link = store.link("l").unwrap();
    assert!(!store.link_endpoints_present(link));
    // Hidden links are not part of adjacency.
    assert_eq!(store.outgoing("a"), Vec::<&str>::new());
}

#[test]
fn adjacency_reflects_link_insertion_order() {
    let mut store = GraphStore::new();
    store
        .add_nodes(
            None,
            vec![NodeSpec::new("a"), NodeSpec::new("b"), NodeSpec::new("c")],
        )
        .unwrap();
    store.add_link(LinkSpec::new("ab", "a", "b")).unwrap();
    store.add_link(LinkSpec::new("ac", "a", "c")).unwrap();
    store.add_link(LinkSpec::new("ca", "c", "a")).unwrap();

    assert_eq!(store.outgoing("a"), vec!["ab", "ac"]);
    assert_eq!(store.incoming("a"), vec!["ca"]);
    assert_eq!(store.incoming("b"), vec!["ab"]);

    store.remove_link("ab");
    assert_eq!(store.outgoing("a"), vec!["ac"]);
}

#[test]
fn remove_link_on_unknown_id_returns_false() {
    let mut store = GraphStore::new();
    assert!(!store.remove_link("nope"));
}

#[test]
fn removing_a_middle_link_keeps_lookups_consistent() {
    let mut store = GraphStore::new();
    store
        .add_nodes(None, vec![NodeSpec::new("a"), NodeSpec::new("b")])
        .unwrap();
    store.add_link(LinkSpec::new("l1", "a", "b")).unwrap();
    store.add_link(LinkSpec::new("l2", "b", "a")).unwrap();
    store.add_link(LinkSpec::new("l3", "a", "b")).unwrap();

    assert!(store.remove_link("l2"));
    assert_eq!(store.link_ids(), vec!["l1", "l3"]);
    assert_eq!(store.link("l3").unwrap().id(), "l3");
}

#[test]
fn remove_nodes_cascades_to_descendants_and_links() {
    let mut store = GraphStore::new();
    store
        .add_nodes(None, vec![NodeSpec::new("a"), NodeSpec::new("g")])
        .unwrap();
    store
        .add_nodes(Some("g"), vec![NodeSpec::new("b"), NodeSpec::new("c")])
        .unwrap();
    store
        .add_nodes(Some("c"), vec![NodeSpec::new("c1")])
        .unwrap();
    store.add_link(LinkSpec::new("ab", "a", "b")).unwrap();
    store.add_link(LinkSpec::new("ac1", "a", "c1")).unwrap();
    store.add_link(LinkSpec::new("aa", "a", "a")).unwrap();

    let removed = store.remove_nodes(None, &["g"]);
    assert_eq!(removed, vec!["g", "b", "c", "c1"]);
    assert_eq!(store.node_ids(), vec!["a"]);
    // Links touching any removed node are gone; the self-link survives.
    assert_eq!(store.link_ids(), vec!["aa"]);
}

#[test]
fn remove_nodes_skips_ids_under_other_parents() {
    let mut store = store_with_container();
    let removed = store.remove_nodes(None, &["b"]);
    assert!(removed.is_empty());
    assert!(store.has_node("b"));
}

#[test]
fn children_of_a_collapsed_container_cannot_be_removed() {
    let mut store = store_with_container();
    assert!(store.set_disclosed("g", false));

    let removed = store.remove_nodes(Some("g"), &["b"]);
    assert!(removed.is_empty());
    assert!(store.has_node("b"));

    // The collapsed container itself is still removable.
    let removed = store.remove_nodes(None, &["g"]);
    assert_eq!(removed, vec!["g", "b", "c"]);
}

#[test]
fn unknown_ids_are_skipped_by_remove_nodes() {
    let mut store = store_with_container();
    let removed = store.remove_nodes(None, &["nope", "a"]);
    assert_eq!(removed, vec!["a"]);
}

#[test]
fn set_disclosed_is_a_no_op_for_plain_leaves() {
    let mut store = store_with_container();
    assert!(!store.set_disclosed("b", false));
    assert!(store.node("b").unwrap().is_disclosed());
}

#[test]
fn set_disclosed_honors_the_deferred_flag() {
    let mut store = GraphStore::new();
    store
        .add_nodes(None, vec![NodeSpec::new("d").defer_children().collapsed()])
        .unwrap();

    assert!(store.set_disclosed("d", true));
    assert!(store.node("d").unwrap().is_disclosed());
    // Same value again changes nothing.
    assert!(!store.set_disclosed("d", true));
}

#[test]
fn mark_fetched_clears_the_deferred_flag() {
    let mut store = GraphStore::new();
    store
        .add_nodes(None, vec![NodeSpec::new("d").defer_children()])
        .unwrap();
    assert!(store.node("d").unwrap().is_deferred());
    assert!(store.mark_fetched("d"));
    assert!(!store.node("d").unwrap().is_deferred());
}

#[test]
fn visibility_follows_the_ancestor_chain() {
    let mut store = GraphStore::new();
    store.add_nodes(None, vec![NodeSpec::new("outer")]).unwrap();
    store
        .add_nodes(Some("outer"), vec![NodeSpec::new("inner")])
        .unwrap();
    store
        .add_nodes(Some("inner"), vec![NodeSpec::new("leaf")])
        .unwrap();

    assert!(store.is_visible("leaf"));
    assert_eq!(store.nearest_visible_ancestor("leaf"), Some("leaf"));

    store.set_disclosed("inner", false);
    assert!(!store.is_visible("leaf"));
    assert!(store.is_visible("inner"));
    assert_eq!(store.nearest_visible_ancestor("leaf"), Some("inner"));

    store.set_disclosed("outer", false);
    // The outermost collapsed ancestor wins.
    assert_eq!(store.nearest_visible_ancestor("leaf"), Some("outer"));
    assert_eq!(store.nearest_visible_ancestor("inner"), Some("outer"));
    assert!(store.is_visible("outer"));
}

#[test]
fn global_position_accumulates_positions_and_padding() {
    let mut store = GraphStore::new();
    store
        .add_nodes(
            None,
            vec![NodeSpec::new("outer").with_padding(SideOffsets::new(5.0, 0.0, 0.0, 10.0))],
        )
        .unwrap();
    store
        .add_nodes(
            Some("outer"),
            vec![NodeSpec::new("inner").with_padding(SideOffsets::new(2.0, 0.0, 0.0, 3.0))],
        )
        .unwrap();
    store
        .add_nodes(Some("inner"), vec![NodeSpec::new("leaf")])
        .unwrap();

    store
        .update_node("outer", NodePatch::new().with_position(point(100.0, 200.0)))
        .unwrap();
    store
        .update_node("inner", NodePatch::new().with_position(point(7.0, 8.0)))
        .unwrap();
    store
        .update_node("leaf", NodePatch::new().with_position(point(1.0, 1.0)))
        .unwrap();

    // outer(100,200) + pad(l10,t5) + inner(7,8) + pad(l3,t2) + leaf(1,1)
    assert_eq!(store.global_position("leaf"), Some(point(121.0, 216.0)));
}

#[test]
fn decorated_bounds_inflate_the_content_bounds() {
    let mut store = GraphStore::new();
    store
        .add_nodes(
            None,
            vec![
                NodeSpec::new("n")
                    .with_size(size(40.0, 20.0))
                    .with_decor(SideOffsets::new(1.0, 2.0, 3.0, 4.0)),
            ],
        )
        .unwrap();
    store
        .update_node("n", NodePatch::new().with_position(point(10.0, 10.0)))
        .unwrap();

    let bounds = store.decorated_bounds("n").unwrap();
    assert_eq!(bounds.origin, point(6.0, 9.0));
    assert_eq!(bounds.size, size(46.0, 24.0));
}

#[test]
fn explicit_sizes_mark_nodes_measured() {
    let mut store = GraphStore::new();
    store
        .add_nodes(
            None,
            vec![
                NodeSpec::new("sized").with_size(size(10.0, 10.0)),
                NodeSpec::new("unsized"),
            ],
        )
        .unwrap();
    assert!(store.node("sized").unwrap().visual.measured);
    assert!(!store.node("unsized").unwrap().visual.measured);

    store
        .update_node("unsized", NodePatch::new().with_size(size(4.0, 4.0)))
        .unwrap();
    assert!(store.node("unsized").unwrap().visual.measured);
}

#[test]
fn invalidation_walks_every_ancestor() {
    let mut store = GraphStore::new();
    store
        .add_nodes(None, vec![NodeSpec::new("outer").with_size(size(50.0, 50.0))])
        .unwrap();
    store
        .add_nodes(
            Some("outer"),
            vec![NodeSpec::new("inner").with_size(size(30.0, 30.0))],
        )
        .unwrap();
    store
        .add_nodes(
            Some("inner"),
            vec![NodeSpec::new("leaf").with_size(size(10.0, 10.0))],
        )
        .unwrap();

    store.invalidate_bounds_upward("leaf");
    // The node's own explicit size stays valid; only container unions go stale.
    assert!(store.node("leaf").unwrap().visual.measured);
    assert!(!store.node("inner").unwrap().visual.measured);
    assert!(!store.node("outer").unwrap().visual.measured);

    assert!(store.set_measured("leaf", size(12.0, 12.0)));
    assert!(store.node("leaf").unwrap().visual.measured);
    assert_eq!(store.node("leaf").unwrap().visual.size, size(12.0, 12.0));
}

#[test]
fn update_unknown_ids_is_an_error() {
    let mut store = GraphStore::new();
    let err = store.update_node("nope", NodePatch::new()).unwrap_err();
    assert!(matches!(err, Error::NodeNotFound { .. }));
    let err = store.update_link("nope", LinkPatch::new()).unwrap_err();
    assert!(matches!(err, Error::LinkNotFound { .. }));
}
