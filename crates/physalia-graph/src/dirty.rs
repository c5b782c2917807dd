//! Tracking of which entities a mutation touched.

use std::collections::BTreeSet;

/// Ids touched since the last committed render pass.
///
/// Kept ordered so incremental layout and logging see a deterministic view.
/// The store never holds one of these; the engine owns the instance and hands
/// it to the layout context build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirtySet {
    pub nodes: BTreeSet<String>,
    pub links: BTreeSet<String>,
}

impl DirtySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_node(&mut self, id: impl Into<String>) {
        self.nodes.insert(id.into());
    }

    pub fn insert_link(&mut self, id: impl Into<String>) {
        self.links.insert(id.into());
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.contains(id)
    }

    pub fn contains_link(&self, id: &str) -> bool {
        self.links.contains(id)
    }

    pub fn merge(&mut self, other: &DirtySet) {
        self.nodes.extend(other.nodes.iter().cloned());
        self.links.extend(other.links.iter().cloned());
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.links.is_empty()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.links.clear();
    }
}
