//! # Clonup Editor
//!
//! Live-document editing for captured pages.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ dom: HTML text → DomTree                    │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: live document + interaction         │
//! │  - EditableDocument (tree, styles, assets)  │
//! │  - RenderingSurface (instrumentation,       │
//! │    events → controller)                     │
//! │  - ElementAddresser (opaque element ids)    │
//! │  - SelectionController (field editors)      │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ snapshot: live tree → clean HTML            │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Edits land on the live tree**: no draft state diverges from what is
//!    rendered
//! 2. **Addresses are instrumentation**: assigned lazily, never persisted
//! 3. **Missing elements are not errors**: stale selections become no-ops
//! 4. **Explicit wiring**: the controller receives its surface handle at
//!    construction
//!
//! ## Usage
//!
//! ```rust,ignore
//! use clonup_editor::{EditableDocument, ElementAddresser, RenderingSurface,
//!     SelectionController, SurfaceHandle, EditCommand};
//!
//! let doc = EditableDocument::open(&html, "shop")?;
//! let (mut surface, events) = RenderingSurface::new(doc, ElementAddresser::new("shop"));
//! surface.initialize();
//! let surface = SurfaceHandle::new(surface);
//! let mut controller = SelectionController::new(surface.clone(), events);
//!
//! let img = surface.borrow().tree().elements_by_tag("img")[0];
//! surface.borrow_mut().click(img);
//! controller.handle_events();
//! controller.apply(EditCommand::Src("/new.jpg".into()))?;
//! ```

pub mod addressing;
mod commands;
mod controller;
mod document;
mod errors;
mod surface;

pub use addressing::{ElementAddress, ElementAddresser};
pub use commands::{
    handler_for, is_self_aligned, is_stylable, validate_href, validate_src, Alignment,
    CommandKind, EditCommand, Handler, HandlerTable,
};
pub use controller::{FieldValues, SelectionController, SelectionState};
pub use document::{AssetKind, EditableDocument};
pub use errors::EditorError;
pub use surface::{ensure_editor_blocks, RenderingSurface, SurfaceEvent, SurfaceHandle};
