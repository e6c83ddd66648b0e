use clonup_dom::DomError;
use thiserror::Error;

/// Errors that can occur while producing a snapshot
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Failed to reparse live markup: {0}")]
    Reparse(#[from] DomError),

    #[error("Live document has no root element")]
    MissingRoot,
}
