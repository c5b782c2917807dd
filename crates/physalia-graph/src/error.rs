pub type Result<T> = std::result::Result<T, Error>;

/// Programmer-misuse errors surfaced by the store.
///
/// Everything else degrades gracefully: links referencing missing nodes are
/// hidden rather than rejected, removals of unknown ids are skipped, and
/// aggregation self-folds are silently dropped.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Duplicate node id: {id}")]
    DuplicateNode { id: String },

    #[error("Duplicate link id: {id}")]
    DuplicateLink { id: String },

    #[error("Unknown node id: {id}")]
    NodeNotFound { id: String },

    #[error("Unknown link id: {id}")]
    LinkNotFound { id: String },

    #[error("Link id {id} uses the reserved `_pl:` promoted-link prefix")]
    ReservedLinkId { id: String },
}
