//! Deferred child data.
//!
//! Containers flagged [`NodeSpec::defer_children`](physalia_graph::NodeSpec)
//! declare children that exist but have not been loaded. When such a
//! container is disclosed through [`Diagram::update`](crate::Diagram::update)
//! the engine asks the host's provider for them; a failing provider is
//! treated as "no additional data" and disclosure proceeds with what is
//! known.

use futures::future::LocalBoxFuture;
use physalia_graph::{LinkSpec, NodeSpec};

/// Request for a deferred container's children.
///
/// `known` lists the ids of children already present so a provider can
/// return only what is missing.
#[derive(Debug)]
pub struct FetchRequest<'a> {
    pub container: &'a str,
    pub known: &'a [String],
}

/// Child data handed back by a provider. Nodes are inserted under the
/// requested container; links may reference nodes anywhere.
#[derive(Debug, Default)]
pub struct FetchPayload {
    pub nodes: Vec<NodeSpec>,
    pub links: Vec<LinkSpec>,
}

/// Provider-side failure.
#[derive(Debug, thiserror::Error)]
#[error("data provider rejected the request: {message}")]
pub struct ProviderError {
    pub message: String,
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Host-supplied source for deferred children.
///
/// The future is local; the engine drives it on the caller's thread while
/// the render pass is suspended.
pub trait DataProvider {
    fn fetch<'a>(
        &'a self,
        req: FetchRequest<'a>,
    ) -> LocalBoxFuture<'a, Result<FetchPayload, ProviderError>>;
}
