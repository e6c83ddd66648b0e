//! # Clonup Workspace
//!
//! Ties the editing engine to the hosting layer: loading configuration,
//! opening a clone for editing, replaying scripted edits, saving, and the
//! custom domain workflow.
//!
//! ```text
//! Config ──▶ HttpHostingClient ──fetch──▶ EditSession ──save──▶ HttpHostingClient
//!                    │
//!                    └──────▶ DomainWorkflow (submit → poll → verified)
//! ```

pub mod config;
pub mod domain;
pub mod edit_script;
mod errors;
pub mod hosting;
pub mod session;
pub mod stats;

pub use config::{Config, DEFAULT_CONFIG_NAME, TOKEN_ENV};
pub use domain::{normalize_domain, DomainState, DomainWorkflow};
pub use edit_script::{EditScript, EditStep, ElementTarget};
pub use errors::WorkspaceError;
pub use hosting::{
    DnsInstructions, DnsRecord, DomainStatus, HostingApi, HttpHostingClient, SaveRequest,
    SaveResponse,
};
pub use session::EditSession;
pub use stats::CloneStats;
