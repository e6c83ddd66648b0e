//! # Clonup DOM
//!
//! Arena document tree used by every stage of the edit-and-resave engine.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ parser: HTML text → html5ever RcDom → tree  │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ tree: arena of nodes, stable NodeIds        │
//! │  - attribute / class helpers                │
//! │  - subtree clone + cross-tree import        │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ serialize: tree → HTML5 text                │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! The live editing tree and the clean working copy built at save time are
//! both [`DomTree`]s; nothing here knows which one it is looking at.

mod entities;
mod errors;
pub mod markers;
mod parser;
mod serialize;
mod style;
mod tree;

pub use entities::collapse_double_escapes;
pub use errors::DomError;
pub use parser::{parse_document, parse_fragment};
pub use serialize::{
    doctype_declaration, is_raw_text_element, is_void_element, serialize_children, serialize_document,
    serialize_document_without, serialize_node, SkipFn,
};
pub use style::StyleDeclarations;
pub use tree::{DomTree, Node, NodeData, NodeId};
