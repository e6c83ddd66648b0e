//! Error types for the editor

use clonup_dom::DomError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Parse error: {0}")]
    Parse(#[from] DomError),

    #[error("Invalid {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },

    #[error("The document root cannot be removed")]
    RootRemoval,
}

impl EditorError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        EditorError::InvalidInput {
            field,
            reason: reason.into(),
        }
    }
}
