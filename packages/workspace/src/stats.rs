use crate::hosting::HostingApi;
use serde::Serialize;
use tracing::warn;

/// Auxiliary numbers shown next to a clone. Never blocks the main flow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CloneStats {
    pub clone_count: u64,
}

impl CloneStats {
    /// Load the counters, showing zero when the request fails
    pub async fn load<A: HostingApi>(api: &A, subdomain: &str) -> Self {
        match api.clone_count(subdomain).await {
            Ok(clone_count) => Self { clone_count },
            Err(err) => {
                warn!(subdomain, error = %err, "Clone count unavailable");
                Self::default()
            }
        }
    }
}
