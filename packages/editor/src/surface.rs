//! # Rendering Surface
//!
//! Hosts the live document, injects interaction instrumentation and relays
//! interaction events to the controller.
//!
//! Events travel over an unbounded channel: delivered in the order posted,
//! never acknowledged. The controller therefore has to cope with an event
//! naming an element that no longer exists.

use crate::addressing::{self, ElementAddress, ElementAddresser};
use crate::{EditableDocument, EditorError};
use clonup_dom::markers::{
    DRAGGABLE_ATTR, DRAG_HANDLE_CLASS, EDITOR_SCRIPT_ID, EDITOR_STYLE_ID, HANDLE_ATTR,
    SELECTED_CLASS,
};
use clonup_dom::{is_void_element, parse_fragment, DomTree, NodeId};
use serde::{Deserialize, Serialize};
use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info};

const EDITOR_CSS: &str = "\
.clonup-selected { outline: 2px solid #2563eb !important; outline-offset: 2px; }
.clonup-hover { outline: 1px dashed #60a5fa !important; }
.clonup-drag-handle { position: absolute; width: 14px; height: 14px; cursor: grab; background: #2563eb; border-radius: 3px; z-index: 2147483647; }
";

const EDITOR_JS: &str = "\
(function () {
  document.addEventListener('click', function (event) {
    var el = event.target.closest('[data-clonup-id]') || event.target;
    event.preventDefault();
    window.parent.postMessage({ type: 'selected', tag: el.tagName.toLowerCase(), id: el.getAttribute('data-clonup-id') }, '*');
  }, true);
})();
";

/// Interaction event posted by the surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SurfaceEvent {
    /// An element was clicked
    Selected { tag: String, id: ElementAddress },

    /// An element was dropped at a new position
    #[serde(rename_all = "camelCase")]
    Dragged {
        id: ElementAddress,
        parent_id: ElementAddress,
        index: usize,
    },

    /// New elements were inserted (drag-and-drop from a palette)
    Inserted { ids: Vec<ElementAddress> },

    /// Selection was cleared from within the surface
    Cleared,
}

/// Live rendering of the editable document
pub struct RenderingSurface {
    document: EditableDocument,
    addresser: ElementAddresser,
    events: UnboundedSender<SurfaceEvent>,
    initialized: bool,
}

impl RenderingSurface {
    /// Create a surface and the receiving end of its event channel
    pub fn new(
        document: EditableDocument,
        addresser: ElementAddresser,
    ) -> (Self, UnboundedReceiver<SurfaceEvent>) {
        let (events, receiver) = unbounded_channel();
        let surface = Self {
            document,
            addresser,
            events,
            initialized: false,
        };
        (surface, receiver)
    }

    pub fn document(&self) -> &EditableDocument {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut EditableDocument {
        &mut self.document
    }

    pub fn tree(&self) -> &DomTree {
        self.document.tree()
    }

    pub fn tree_mut(&mut self) -> &mut DomTree {
        self.document.tree_mut()
    }

    /// Whether [`initialize`](Self::initialize) already ran for this document
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Inject the editor stylesheet, interaction script and drag handles.
    ///
    /// Calling it again on an initialized surface is a no-op.
    pub fn initialize(&mut self) {
        if self.initialized {
            return;
        }

        let tree = self.document.tree_mut();
        ensure_editor_blocks(tree);
        let handles = instrument_sections(tree);

        self.initialized = true;
        info!(
            subdomain = %self.document.subdomain,
            handles,
            "Rendering surface initialized"
        );
    }

    /// Swap in another clone. Instrumentation is re-applied.
    pub fn replace_document(&mut self, document: EditableDocument) {
        self.document = document;
        self.initialized = false;
        self.initialize();
    }

    /// Stable id of an element, assigning one if needed
    pub fn ensure_id(&mut self, node: NodeId) -> ElementAddress {
        self.addresser.ensure_id(self.document.tree_mut(), node)
    }

    /// Resolve an id in the live tree
    pub fn resolve(&self, id: &ElementAddress) -> Option<NodeId> {
        addressing::lookup(self.document.tree(), id)
    }

    /// Move the selection outline to `node` (or clear it with `None`)
    pub fn mark_selected(&mut self, node: Option<NodeId>) {
        let tree = self.document.tree_mut();
        for element in tree.elements() {
            tree.remove_class(element, SELECTED_CLASS);
        }
        if let Some(node) = node {
            tree.add_class(node, SELECTED_CLASS);
        }
    }

    /// User clicked an element
    pub fn click(&mut self, node: NodeId) -> Option<ElementAddress> {
        let tag = self.tree().tag(node)?.to_string();
        let id = self.ensure_id(node);
        self.mark_selected(Some(node));
        self.post(SurfaceEvent::Selected {
            tag,
            id: id.clone(),
        });
        Some(id)
    }

    /// User dropped `node` into `new_parent` at `index`
    pub fn drag(&mut self, node: NodeId, new_parent: NodeId, index: usize) -> Option<ElementAddress> {
        let tree = self.tree();
        if !tree.is_element(node) || !tree.is_element(new_parent) || node == new_parent {
            return None;
        }
        if tree.is_ancestor(node, new_parent) {
            debug!("Ignoring drop into own subtree");
            return None;
        }

        let id = self.ensure_id(node);
        let parent_id = self.ensure_id(new_parent);
        self.document.tree_mut().insert_at(new_parent, index, node);
        self.document.touch();
        self.post(SurfaceEvent::Dragged {
            id: id.clone(),
            parent_id,
            index,
        });
        Some(id)
    }

    /// Insert markup under `parent` at `index` (palette drag-and-drop).
    ///
    /// Returns the ids of the inserted top-level elements.
    pub fn insert_html(
        &mut self,
        parent: NodeId,
        index: usize,
        html: &str,
    ) -> Result<Vec<ElementAddress>, EditorError> {
        let (fragment, roots) = parse_fragment(html)?;

        let mut inserted = Vec::new();
        for (offset, root) in roots.into_iter().enumerate() {
            let tree = self.document.tree_mut();
            let node = tree.import(&fragment, root);
            tree.insert_at(parent, index + offset, node);
            if tree.is_element(node) {
                inserted.push(node);
            }
        }

        instrument_sections(self.document.tree_mut());
        let ids: Vec<_> = inserted.into_iter().map(|node| self.ensure_id(node)).collect();
        self.document.touch();
        self.document.refresh();

        debug!(count = ids.len(), "Inserted elements");
        self.post(SurfaceEvent::Inserted { ids: ids.clone() });
        Ok(ids)
    }

    /// Clear the selection outline and tell the controller
    pub fn clear_selection(&mut self) {
        self.mark_selected(None);
        self.post(SurfaceEvent::Cleared);
    }

    fn post(&self, event: SurfaceEvent) {
        if self.events.send(event).is_err() {
            debug!("Surface event dropped: controller is gone");
        }
    }
}

/// Add the editor `<style>` / `<script>` blocks if missing
pub fn ensure_editor_blocks(tree: &mut DomTree) {
    if tree.find_by_attr("id", EDITOR_STYLE_ID).is_none() {
        if let Some(head) = tree.head() {
            let style = tree.create_element_with_attrs(
                "style",
                vec![("id".to_string(), EDITOR_STYLE_ID.to_string())],
            );
            tree.set_text(style, EDITOR_CSS);
            tree.append_child(head, style);
        }
    }

    if tree.find_by_attr("id", EDITOR_SCRIPT_ID).is_none() {
        if let Some(body) = tree.body() {
            let script = tree.create_element_with_attrs(
                "script",
                vec![("id".to_string(), EDITOR_SCRIPT_ID.to_string())],
            );
            tree.set_text(script, EDITOR_JS);
            tree.append_child(body, script);
        }
    }
}

/// Give every top-level body section a drag handle. Returns handles added.
fn instrument_sections(tree: &mut DomTree) -> usize {
    let Some(body) = tree.body() else {
        return 0;
    };

    let mut added = 0;
    for section in tree.child_elements(body) {
        let skip = tree.has_attr(section, DRAGGABLE_ATTR)
            || tree.has_attr(section, HANDLE_ATTR)
            || matches!(tree.tag(section), Some("script" | "noscript" | "style" | "template"))
            || tree.tag(section).is_some_and(is_void_element);
        if skip {
            continue;
        }

        // phrasing content, so it is valid as the first child of any section
        let handle = tree.create_element_with_attrs(
            "span",
            vec![
                ("class".to_string(), DRAG_HANDLE_CLASS.to_string()),
                (HANDLE_ATTR.to_string(), "true".to_string()),
            ],
        );
        tree.insert_at(section, 0, handle);
        tree.set_attr(section, DRAGGABLE_ATTR, "true");
        added += 1;
    }
    added
}

/// Shared handle to the surface, injected into the controller and session
#[derive(Clone)]
pub struct SurfaceHandle(Rc<RefCell<RenderingSurface>>);

impl SurfaceHandle {
    pub fn new(surface: RenderingSurface) -> Self {
        Self(Rc::new(RefCell::new(surface)))
    }

    pub fn borrow(&self) -> Ref<'_, RenderingSurface> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, RenderingSurface> {
        self.0.borrow_mut()
    }
}
