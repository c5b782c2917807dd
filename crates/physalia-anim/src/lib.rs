//! Snapshot + diff layer: freezes the rendered diagram into immutable
//! [`DiagramState`] captures and turns a pair of captures into an animation
//! [`Timeline`].
//!
//! Captures are taken immediately before a mutation and live only until the
//! host reports the corresponding animation settled; nothing here mutates
//! the store.

#![forbid(unsafe_code)]

pub mod diff;
pub mod snapshot;

pub use diff::{
    LinkChanges, LinkInstruction, NodeChanges, NodeInstruction, TempLink, Timeline, diff,
};
pub use snapshot::{
    DiagramState, LinkSnapshot, NodeSnapshot, OverviewSnapshot, ViewTransform, capture,
};
