//! Immutable captures of the rendered diagram.

use std::collections::BTreeMap;

use physalia_graph::geom::{Point, Rect, Size, Vector, vector};
use physalia_graph::resolve::ResolvedLinks;
use physalia_graph::store::{GraphStore, LabelVisual};
use physalia_graph::style::LinkStroke;

/// View transform at capture time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    pub zoom: f64,
    pub center: Point,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            center: Point::zero(),
        }
    }
}

/// Minimap feed: where the content sits and what slice of it the view shows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverviewSnapshot {
    pub content_bounds: Rect,
    pub view_rect: Rect,
}

/// One visible node, in global coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSnapshot {
    pub position: Point,
    pub size: Size,
    pub fill: Option<String>,
    pub label: Option<LabelVisual>,
    pub disclosed: bool,
    pub parent: Option<String>,
}

impl NodeSnapshot {
    /// Center of the content box; disclosure crossfades pivot here.
    pub fn center(&self) -> Point {
        self.position + vector(self.size.width / 2.0, self.size.height / 2.0)
    }
}

/// One rendered link, direct or promoted, in global coordinates.
///
/// `members` lists the original link ids this entity renders: itself for a
/// direct link, the aggregated bundle for a promoted one. The diff matches
/// entities across captures through these.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkSnapshot {
    pub start: String,
    pub end: String,
    pub route: Vec<Point>,
    pub stroke: LinkStroke,
    pub promoted: bool,
    pub members: Vec<String>,
}

/// Frozen rendered state, keyed by id for deterministic diffing.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagramState {
    pub nodes: BTreeMap<String, NodeSnapshot>,
    pub links: BTreeMap<String, LinkSnapshot>,
    pub viewport: ViewTransform,
    pub overview: Option<OverviewSnapshot>,
}

/// Snapshots every visible node and every rendered link.
///
/// Direct links keep their committed route translated to global
/// coordinates (straight center-to-center when never routed); promoted
/// links always derive a straight route from their representative bounds,
/// so bundle geometry follows the endpoints without being stored anywhere.
pub fn capture(
    store: &GraphStore,
    resolved: &ResolvedLinks,
    viewport: ViewTransform,
) -> DiagramState {
    let mut nodes: BTreeMap<String, NodeSnapshot> = BTreeMap::new();
    for node in store.nodes() {
        if !store.is_visible(node.id()) {
            continue;
        }
        let Some(position) = store.global_position(node.id()) else {
            continue;
        };
        nodes.insert(
            node.id().to_string(),
            NodeSnapshot {
                position,
                size: node.visual.size,
                fill: node.fill.clone(),
                label: node.visual.label.clone(),
                disclosed: node.is_disclosed(),
                parent: store.parent_id(node.id()).map(str::to_string),
            },
        );
    }

    let mut links: BTreeMap<String, LinkSnapshot> = BTreeMap::new();
    for id in &resolved.direct {
        let Some(link) = store.link(id) else {
            continue;
        };
        let route = if link.route.is_empty() {
            straight_route(&nodes, link.start(), link.end())
        } else {
            let delta = space_origin(store, link.group_id());
            link.route.iter().map(|p| *p + delta).collect()
        };
        links.insert(
            id.clone(),
            LinkSnapshot {
                start: link.start().to_string(),
                end: link.end().to_string(),
                route,
                stroke: link.stroke.clone(),
                promoted: false,
                members: vec![id.clone()],
            },
        );
    }
    for promoted in &resolved.promoted {
        let stroke = promoted
            .aggregated
            .first()
            .and_then(|m| store.link(m))
            .map(|l| l.stroke.clone())
            .unwrap_or_default();
        links.insert(
            promoted.id.clone(),
            LinkSnapshot {
                start: promoted.start.clone(),
                end: promoted.end.clone(),
                route: straight_route(&nodes, &promoted.start, &promoted.end),
                stroke,
                promoted: true,
                members: promoted.aggregated.clone(),
            },
        );
    }

    DiagramState {
        nodes,
        links,
        viewport,
        overview: None,
    }
}

/// Global position of a container's padded origin, as a translation.
fn space_origin(store: &GraphStore, space: Option<&str>) -> Vector {
    let Some(id) = space else {
        return Vector::zero();
    };
    let (Some(global), Some(node)) = (store.global_position(id), store.node(id)) else {
        return Vector::zero();
    };
    (global + vector(node.padding.left, node.padding.top)).to_vector()
}

fn straight_route(
    nodes: &BTreeMap<String, NodeSnapshot>,
    start: &str,
    end: &str,
) -> Vec<Point> {
    match (nodes.get(start), nodes.get(end)) {
        (Some(a), Some(b)) => vec![a.center(), b.center()],
        _ => Vec::new(),
    }
}
