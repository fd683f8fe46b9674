//! Error types shared by the document backends and the dialog.

use crate::dom::ElementRef;

/// Result type for document operations
pub type DomResult<T> = std::result::Result<T, DomError>;

/// Result type for dialog operations
pub type DialogResult<T> = std::result::Result<T, DialogError>;

/// Failures reported by a [`Document`](crate::dom::Document) backend.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DomError {
    #[error("Element {0} is not known to this document")]
    UnknownElement(ElementRef),

    #[error("DOM operation failed: {0}")]
    Operation(String),
}

/// Dialog-specific error types
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DialogError {
    #[error("You must provide one of 'content' or 'templateId'")]
    MissingContentSource,

    #[error("Template '{0}' does not exist")]
    UnresolvedTemplate(String),

    #[error("Document error: {0}")]
    Dom(#[from] DomError),
}
