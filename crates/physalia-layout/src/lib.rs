//! Layout-context protocol: a flattened, writable view of the visible graph
//! that layout algorithms mutate, plus the commit path that folds their
//! results back into the [`GraphStore`](physalia_graph::GraphStore).
//!
//! The flow per pass is: build a [`LayoutContext`] for a scope, hand it to a
//! [`LayoutAlgorithm`], then [`apply_results`] to normalize, write back and
//! re-measure. Algorithms are async so out-of-process engines (a worker, a
//! subprocess, a solver service) plug in behind the same trait; the built-in
//! ones resolve immediately.

#![forbid(unsafe_code)]

pub mod algo;
pub mod commit;
pub mod context;
pub mod measure;

use futures::FutureExt;
use futures::future::LocalBoxFuture;

pub use algo::{GridLayout, LayeredLayout};
pub use commit::{CommitStats, LayoutOffsets, apply_results};
pub use context::{CtxLabel, CtxLink, CtxNode, LayoutContext};
pub use measure::{BoxMeasurer, Measurer, ensure_measured};

/// Result alias for layout operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by layout algorithms.
///
/// The context and commit paths themselves degrade instead of failing;
/// `Algorithm` exists so external engines can report their own faults
/// (solver divergence, transport errors) through the trait seam.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A layout algorithm could not produce a result.
    #[error("layout algorithm failed: {message}")]
    Algorithm { message: String },
}

impl Error {
    /// Convenience constructor for algorithm-side failures.
    pub fn algorithm(message: impl Into<String>) -> Self {
        Error::Algorithm {
            message: message.into(),
        }
    }
}

/// A pluggable layout pass.
///
/// Implementations receive a mutable [`LayoutContext`] and reposition its
/// nodes (and optionally route its links) through the setter API. The future
/// is local; engines drive it on the caller's thread.
pub trait LayoutAlgorithm {
    fn run<'a>(&'a self, ctx: &'a mut LayoutContext) -> LocalBoxFuture<'a, Result<()>>;
}

/// Adapts a plain closure into a [`LayoutAlgorithm`].
///
/// Useful for tests and for callers whose layout is synchronous.
pub struct FnLayout<F> {
    f: F,
}

impl<F> FnLayout<F>
where
    F: Fn(&mut LayoutContext) -> Result<()>,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> LayoutAlgorithm for FnLayout<F>
where
    F: Fn(&mut LayoutContext) -> Result<()>,
{
    fn run<'a>(&'a self, ctx: &'a mut LayoutContext) -> LocalBoxFuture<'a, Result<()>> {
        futures::future::ready((self.f)(ctx)).boxed_local()
    }
}
