#![forbid(unsafe_code)]

//! `physalia` is a headless, runtime-agnostic engine for interactive
//! node-link diagrams: nested collapsible containers, promoted links that
//! stand in for links into collapsed subtrees, a pluggable (possibly
//! asynchronous) layout seam, and animated transitions derived by diffing
//! rendered states.
//!
//! The facade ties the member crates together around a render cycle with
//! last-generation-wins cancellation: [`Diagram::apply`] a change, run a
//! layout algorithm on the returned pass, [`Diagram::commit`] the pass.
//! [`Diagram::update`] chains the three for hosts that do not need to
//! interleave, and is also where deferred child data is fetched from the
//! host's [`DataProvider`].

pub mod change;
pub mod engine;
pub mod provider;
pub mod viewport;

pub use physalia_anim::{
    DiagramState, LinkChanges, LinkInstruction, LinkSnapshot, NodeChanges, NodeInstruction,
    NodeSnapshot, OverviewSnapshot, TempLink, Timeline, ViewTransform,
};
pub use physalia_graph::geom;
pub use physalia_graph::{
    DashPattern, DescendantsConnectivity, DirtySet, GraphStore, LinkPatch, LinkRendering,
    LinkSpec, LinkStroke, NodePatch, NodeSpec, Presentation, PromotedLink, ResolvedLinks,
    promoted_link_id, resolve,
};
pub use physalia_layout::{
    BoxMeasurer, CommitStats, FnLayout, GridLayout, LayeredLayout, LayoutAlgorithm,
    LayoutContext, Measurer,
};

pub use change::GraphChange;
pub use engine::{Diagram, RenderGeneration, RenderPhase, RenderUpdate, UpdatePass};
pub use provider::{DataProvider, FetchPayload, FetchRequest, ProviderError};
pub use viewport::{PersistedState, Viewport};

/// Facade error; graph and layout faults pass through transparently.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Graph(#[from] physalia_graph::Error),
    #[error(transparent)]
    Layout(#[from] physalia_layout::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
