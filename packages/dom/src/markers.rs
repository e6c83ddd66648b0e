//! Instrumentation vocabulary.
//!
//! Everything the editor adds to a live document for interaction purposes
//! is named here so the serializer can strip exactly that set and nothing
//! else.

use crate::{DomTree, NodeId};

/// Prefix shared by every editor-only attribute
pub const ATTR_PREFIX: &str = "data-clonup-";

/// Opaque element address
pub const ADDRESS_ATTR: &str = "data-clonup-id";

/// Marks elements the surface made draggable
pub const DRAGGABLE_ATTR: &str = "data-clonup-draggable";

/// Marks drag-handle elements injected by the surface
pub const HANDLE_ATTR: &str = "data-clonup-handle";

pub const SELECTED_CLASS: &str = "clonup-selected";
pub const HOVER_CLASS: &str = "clonup-hover";
pub const DRAG_HANDLE_CLASS: &str = "clonup-drag-handle";

/// Every class the editor may add to page elements
pub const INSTRUMENTATION_CLASSES: &[&str] = &[SELECTED_CLASS, HOVER_CLASS, DRAG_HANDLE_CLASS];

/// Editor stylesheet injected into `<head>`
pub const EDITOR_STYLE_ID: &str = "clonup-editor-style";

/// Editor interaction script injected at the end of `<body>`
pub const EDITOR_SCRIPT_ID: &str = "clonup-editor-script";

/// Marks script/noscript blocks added through the script manager.
///
/// Unlike the instrumentation markers this one is persisted: it is how the
/// next editing session recognises user-managed blocks.
pub const MANAGED_SCRIPT_ATTR: &str = "data-managed-script";

pub fn is_instrumentation_attr(name: &str) -> bool {
    name.starts_with(ATTR_PREFIX)
}

pub fn is_instrumentation_class(class: &str) -> bool {
    INSTRUMENTATION_CLASSES.contains(&class)
}

/// One of the two essential editor elements (style or script block)
pub fn is_editor_block(tree: &DomTree, node: NodeId) -> bool {
    matches!(tree.attr(node, "id"), Some(EDITOR_STYLE_ID | EDITOR_SCRIPT_ID))
}

/// Editor-injected element that must never reach saved output
pub fn is_editor_element(tree: &DomTree, node: NodeId) -> bool {
    is_editor_block(tree, node)
        || tree.has_attr(node, HANDLE_ATTR)
        || tree.has_class(node, DRAG_HANDLE_CLASS)
}
