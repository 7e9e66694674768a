//! Engine errors

use lazyact_dom::{DomError, SelectorError};

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Engine errors
///
/// These signal caller configuration bugs. Malformed page data (JSON in
/// data attributes, unknown margins on elements) is handled locally instead.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Invalid selector: {0}")]
    Selector(#[from] SelectorError),

    #[error("DOM error: {0}")]
    Dom(#[from] DomError),

    #[error("Invalid root margin `{0}`")]
    RootMargin(String),

    #[error("Invalid engine configuration: {0}")]
    Config(#[from] serde_json::Error),
}
