use clonup_editor::EditorError;
use clonup_scripts::ScriptError;
use clonup_snapshot::SnapshotError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Hosting API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error(transparent)]
    Editor(#[from] EditorError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error(transparent)]
    Script(#[from] ScriptError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Hosting API rejected the request: {0}")]
    Rejected(String),

    #[error("A save is already in progress")]
    SaveInProgress,

    #[error("An active subscription is required to add a custom domain")]
    SubscriptionRequired,

    #[error("Invalid domain: {0}")]
    InvalidDomain(String),

    #[error("No domain has been submitted")]
    NoPendingDomain,

    #[error("No element matches {0}")]
    TargetNotFound(String),

    #[error("{0} cannot be moved into its own subtree")]
    InvalidMove(String),

    #[error("Edit step {step}: {reason}")]
    EditStep { step: usize, reason: String },
}

impl WorkspaceError {
    /// Transport failures can be retried; nothing was persisted
    pub fn is_retryable(&self) -> bool {
        match self {
            WorkspaceError::Http(err) => err.is_timeout() || err.is_connect() || err.is_request(),
            WorkspaceError::Api { status, .. } => *status >= 500 || *status == 429,
            WorkspaceError::SaveInProgress => true,
            _ => false,
        }
    }

    /// Short text suitable for showing to the site owner
    pub fn user_message(&self) -> String {
        match self {
            WorkspaceError::Http(err) if err.is_timeout() => {
                "The server took too long to respond. Please try again.".to_string()
            }
            WorkspaceError::Http(_) => {
                "Could not reach the server. Check your connection and try again.".to_string()
            }
            WorkspaceError::Api { status: 401 | 403, .. } => {
                "You are not allowed to do that. Please sign in again.".to_string()
            }
            WorkspaceError::Api { status: 404, .. } => "That clone no longer exists.".to_string(),
            WorkspaceError::Api { .. } if self.is_retryable() => {
                "The server had a problem. Please try again.".to_string()
            }
            WorkspaceError::Rejected(message) => message.clone(),
            WorkspaceError::Editor(EditorError::InvalidInput { reason, .. }) => reason.clone(),
            other => other.to_string(),
        }
    }
}
