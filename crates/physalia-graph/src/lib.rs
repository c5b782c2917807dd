#![forbid(unsafe_code)]

//! Graph data model for `physalia`.
//!
//! The store holds nodes (possibly nested, collapsible containers) and links
//! in insertion order; the resolver derives the renderable link set for the
//! current disclosure state, aggregating links that cross collapsed
//! containers into promoted links between nearest visible ancestors.

pub mod dirty;
pub mod error;
pub mod geom;
pub mod resolve;
pub mod store;
pub mod style;

pub use dirty::DirtySet;
pub use error::{Error, Result};
pub use resolve::{
    LinkRendering, PROMOTED_PREFIX, PromotedLink, ResolvedLinks, promoted_link_id, resolve,
};
pub use store::{
    DescendantsConnectivity, GraphStore, LabelVisual, LinkData, LinkPatch, LinkSpec, NodeData,
    NodePatch, NodeSpec, NodeVisual,
};
pub use style::{DashPattern, LinkStroke, Presentation};
