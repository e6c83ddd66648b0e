//! # Clonup Snapshot
//!
//! Serialization of a live editing session into the HTML that gets saved.
//!
//! The live tree carries editor instrumentation (address markers, drag
//! handles, selection classes, the editor's own style and script) and may
//! hold attribute values that a plain serialization would not faithfully
//! reproduce. [`SnapshotPipeline`] reconciles a clean working copy against
//! the live tree, removes every trace of the editor and makes URLs on the
//! clone's managed domains root-relative.
//!
//! ```text
//! let pipeline = SnapshotPipeline::new(ManagedDomainSet::new("shop", &["clonup.site"]));
//! let snapshot = pipeline.serialize_document(&document)?;
//! host.save(&snapshot.html).await?;
//! ```

mod errors;
mod pipeline;
mod urls;

pub use errors::SnapshotError;
pub use pipeline::{Snapshot, SnapshotPipeline, SyncStats};
pub use urls::{rewrite_srcset, rewrite_style_urls, ManagedDomainSet, DEFAULT_MANAGED_ROOT};
