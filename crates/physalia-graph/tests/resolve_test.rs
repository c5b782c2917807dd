use physalia_graph::{
    DescendantsConnectivity, GraphStore, LinkRendering, LinkSpec, NodeSpec, resolve,
};

fn ids(direct: &[String]) -> Vec<&str> {
    direct.iter().map(String::as_str).collect()
}

#[test]
fn link_inside_collapsed_container_is_not_renderable() {
    let mut store = GraphStore::new();
    store.add_nodes(None, vec![NodeSpec::new("a")]).unwrap();
    store
        .add_nodes(Some("a"), vec![NodeSpec::new("b"), NodeSpec::new("c")])
        .unwrap();
    store.add_link(LinkSpec::new("bc", "b", "c")).unwrap();
    store.set_disclosed("a", false);

    let resolved = resolve(&store);
    assert!(resolved.direct.is_empty());
    assert!(resolved.promoted.is_empty());
    assert_eq!(resolved.expanded_entry("bc"), LinkRendering::Hidden);

    // Expanding the container makes the link direct again.
    store.set_disclosed("a", true);
    let resolved = resolve(&store);
    assert_eq!(ids(&resolved.direct), vec!["bc"]);
    assert_eq!(resolved.expanded_entry("bc"), LinkRendering::Direct);
}

#[test]
fn links_into_a_collapsed_container_merge_into_one_promoted_link() {
    let mut store = GraphStore::new();
    store
        .add_nodes(None, vec![NodeSpec::new("x"), NodeSpec::new("g")])
        .unwrap();
    store
        .add_nodes(Some("g"), vec![NodeSpec::new("y1"), NodeSpec::new("y2")])
        .unwrap();
    store.add_link(LinkSpec::new("l1", "x", "y1")).unwrap();
    store.add_link(LinkSpec::new("l2", "x", "y2")).unwrap();
    store.set_disclosed("g", false);

    let resolved = resolve(&store);
    assert!(resolved.direct.is_empty());
    assert_eq!(resolved.promoted.len(), 1);

    let p = &resolved.promoted[0];
    assert_eq!(p.id, "_pl:x->g");
    assert_eq!(p.start, "x");
    assert_eq!(p.end, "g");
    assert_eq!(p.aggregated, vec!["l1", "l2"]);

    assert_eq!(
        resolved.expanded_entry("l1"),
        LinkRendering::Promoted {
            promoted_id: "_pl:x->g".into()
        }
    );
}

#[test]
fn opposite_directions_share_one_promoted_link() {
    let mut store = GraphStore::new();
    store
        .add_nodes(None, vec![NodeSpec::new("x"), NodeSpec::new("g")])
        .unwrap();
    store
        .add_nodes(Some("g"), vec![NodeSpec::new("y")])
        .unwrap();
    // First contributor runs x -> y, second runs y -> x.
    store.add_link(LinkSpec::new("fwd", "x", "y")).unwrap();
    store.add_link(LinkSpec::new("rev", "y", "x")).unwrap();
    store.set_disclosed("g", false);

    let resolved = resolve(&store);
    assert_eq!(resolved.promoted.len(), 1);
    let p = &resolved.promoted[0];
    // Orientation follows the first contributing link.
    assert_eq!((p.start.as_str(), p.end.as_str()), ("x", "g"));
    assert_eq!(p.id, "_pl:x->g");
    assert_eq!(p.aggregated, vec!["fwd", "rev"]);
}

#[test]
fn promoted_endpoints_are_visible_and_distinct() {
    let mut store = GraphStore::new();
    store
        .add_nodes(None, vec![NodeSpec::new("g1"), NodeSpec::new("g2")])
        .unwrap();
    store
        .add_nodes(Some("g1"), vec![NodeSpec::new("a")])
        .unwrap();
    store
        .add_nodes(Some("g2"), vec![NodeSpec::new("b")])
        .unwrap();
    store.add_link(LinkSpec::new("ab", "a", "b")).unwrap();
    store.set_disclosed("g1", false);
    store.set_disclosed("g2", false);

    let resolved = resolve(&store);
    for link_id in &resolved.direct {
        let link = store.link(link_id).unwrap();
        assert!(store.is_visible(link.start()));
        assert!(store.is_visible(link.end()));
    }
    for p in &resolved.promoted {
        assert!(store.is_visible(&p.start));
        assert!(store.is_visible(&p.end));
        assert_ne!(p.start, p.end);
    }
    assert_eq!(resolved.promoted[0].id, "_pl:g1->g2");
}

#[test]
fn nested_collapse_promotes_to_the_outermost_collapsed_ancestor() {
    let mut store = GraphStore::new();
    store
        .add_nodes(None, vec![NodeSpec::new("outer"), NodeSpec::new("x")])
        .unwrap();
    store
        .add_nodes(Some("outer"), vec![NodeSpec::new("inner")])
        .unwrap();
    store
        .add_nodes(Some("inner"), vec![NodeSpec::new("leaf")])
        .unwrap();
    store.add_link(LinkSpec::new("xl", "x", "leaf")).unwrap();

    store.set_disclosed("inner", false);
    let resolved = resolve(&store);
    assert_eq!(resolved.promoted[0].end, "inner");

    store.set_disclosed("outer", false);
    let resolved = resolve(&store);
    assert_eq!(resolved.promoted[0].end, "outer");
    assert_eq!(resolved.promoted[0].id, "_pl:x->outer");
}

#[test]
fn resolution_is_idempotent() {
    let mut store = GraphStore::new();
    store
        .add_nodes(None, vec![NodeSpec::new("x"), NodeSpec::new("g")])
        .unwrap();
    store
        .add_nodes(
            Some("g"),
            vec![NodeSpec::new("a"), NodeSpec::new("b"), NodeSpec::new("c")],
        )
        .unwrap();
    for (i, target) in ["a", "b", "c"].iter().enumerate() {
        store
            .add_link(LinkSpec::new(format!("l{i}"), "x", *target))
            .unwrap();
    }
    store.set_disclosed("g", false);

    let first = resolve(&store);
    let second = resolve(&store);
    assert_eq!(first.direct, second.direct);
    assert_eq!(first.promoted, second.promoted);
    assert_eq!(first.promoted[0].aggregated, vec!["l0", "l1", "l2"]);
}

#[test]
fn disjoint_containers_drop_crossing_links_entirely() {
    let mut store = GraphStore::new();
    store
        .add_nodes(
            None,
            vec![
                NodeSpec::new("x"),
                NodeSpec::new("g").with_connectivity(DescendantsConnectivity::Disjoint),
            ],
        )
        .unwrap();
    store
        .add_nodes(Some("g"), vec![NodeSpec::new("a"), NodeSpec::new("b")])
        .unwrap();
    store.add_link(LinkSpec::new("xa", "x", "a")).unwrap();
    store.add_link(LinkSpec::new("ab", "a", "b")).unwrap();
    store.set_disclosed("g", false);

    let resolved = resolve(&store);
    // The crossing link contributes nothing, not even a promoted link.
    assert!(resolved.direct.is_empty());
    assert!(resolved.promoted.is_empty());
    assert_eq!(resolved.expanded_entry("xa"), LinkRendering::Hidden);

    // Expanded, the same links render normally.
    store.set_disclosed("g", true);
    let resolved = resolve(&store);
    assert_eq!(ids(&resolved.direct), vec!["xa", "ab"]);
}

#[test]
fn hidden_links_stay_out_of_resolution() {
    let mut store = GraphStore::new();
    store.add_nodes(None, vec![NodeSpec::new("a")]).unwrap();
    store.add_link(LinkSpec::new("l", "a", "ghost")).unwrap();

    let resolved = resolve(&store);
    assert!(resolved.direct.is_empty());
    assert!(resolved.promoted.is_empty());
    assert_eq!(resolved.expanded_entry("l"), LinkRendering::Hidden);
}

#[test]
fn expanded_entry_reports_unknown_ids_as_hidden() {
    let store = GraphStore::new();
    let resolved = resolve(&store);
    assert_eq!(resolved.expanded_entry("nope"), LinkRendering::Hidden);
}

#[test]
fn promoted_lookup_by_id() {
    let mut store = GraphStore::new();
    store
        .add_nodes(None, vec![NodeSpec::new("x"), NodeSpec::new("g")])
        .unwrap();
    store
        .add_nodes(Some("g"), vec![NodeSpec::new("y")])
        .unwrap();
    store.add_link(LinkSpec::new("l", "x", "y")).unwrap();
    store.set_disclosed("g", false);

    let resolved = resolve(&store);
    let p = resolved.promoted_by_id("_pl:x->g").unwrap();
    assert_eq!(p.aggregated, vec!["l"]);
    assert!(resolved.promoted_by_id("_pl:g->x").is_none());
}
