//! DOM errors

use crate::NodeId;

/// Result type for DOM operations
pub type DomResult<T> = Result<T, DomError>;

/// DOM operation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    /// Node not found
    #[error("Node not found: {0:?}")]
    NotFound(NodeId),
    /// Hierarchy error (e.g., inserting an ancestor into its descendant)
    #[error("Hierarchy request error")]
    HierarchyRequest,
    /// Node is not a child of the given parent
    #[error("Node is not a child")]
    NotAChild,
    /// Operation needs an element
    #[error("Invalid node type")]
    InvalidNodeType,
}

/// Selector parse errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectorError {
    #[error("Empty selector")]
    Empty,
    #[error("Unexpected '{found}' at offset {offset} in selector `{selector}`")]
    Unexpected {
        selector: String,
        found: char,
        offset: usize,
    },
    #[error("Unterminated {what} in selector `{selector}`")]
    Unterminated {
        selector: String,
        what: &'static str,
    },
}
