//! Error types for the document tree

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomError {
    #[error("IO error while decoding markup: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parsed document has no <body> element")]
    MissingBody,
}
