//! # Clonup Scripts
//!
//! Script manager for captured pages: exposes the tracking and navigation
//! scripts a site owner cares about as plain editable text, and writes the
//! edited text back without duplicating anything already installed.
//!
//! ```text
//! extract(tree) ─▶ ScriptSet ─▶ editable_text(Head | Body)
//!                                      │ user edits
//!                                      ▼
//!                       reinsert(tree, location, text) ─▶ ReinsertReport
//! ```
//!
//! Blocks are identified by content ([`ScriptIdentity`]), never by position,
//! so reinserting the same text any number of times converges on one copy.

mod errors;
mod extract;
mod identity;
mod reinsert;

pub use errors::ScriptError;
pub use extract::{
    extract, AdjacentComment, CommentPosition, ScriptEntry, ScriptLocation, ScriptSet,
    DYNAMIC_FLAG_ATTR,
};
pub use identity::{normalize_source, ScriptIdentity};
pub use reinsert::{reinsert, split_blocks, ReinsertReport};
