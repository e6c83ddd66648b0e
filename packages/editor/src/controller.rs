//! # Selection & Attribute Synchronization
//!
//! Owns the "currently selected element" and applies every field edit
//! straight to the live element. There is no draft state: what the surface
//! shows is what the serializer will capture.
//!
//! ## Selection Semantics
//!
//! - Anchors are edited as a unit: selecting anything inside a link selects
//!   the link.
//! - Resolution failures (element removed meanwhile) are silent no-ops.
//!
//! ## Link Wrapping
//! - Non-anchor targets are moved into a fresh `<a>` which takes over the
//!   selection
//! - Wrapping an anchor (or something already inside one) only updates
//!   `href`, so wrapping twice never nests anchors

use crate::addressing::ElementAddress;
use crate::commands::{is_self_aligned, is_stylable, validate_href, Alignment, EditCommand, HandlerTable};
use crate::surface::{SurfaceEvent, SurfaceHandle};
use crate::EditorError;
use clonup_dom::markers::is_instrumentation_class;
use clonup_dom::{DomTree, NodeId, StyleDeclarations};
use serde::Serialize;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info};

/// Values shown in the property editors
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldValues {
    pub text: String,
    pub element_id: String,
    pub class: String,
    pub href: String,
    pub src: String,
    pub alt: String,
    pub background_color: String,
    pub color: String,
    pub border_radius: String,
    pub padding: String,
    pub margin: String,
    pub align: Option<Alignment>,
    pub width: String,
    pub height: String,
    pub font_family: String,
    pub font_size: String,
    pub font_weight: String,
    pub font_style: String,
}

/// Current selection plus the cached field values of the selected element
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionState {
    pub selected_tag: Option<String>,
    pub selected_id: Option<ElementAddress>,
    pub fields: FieldValues,
}

impl SelectionState {
    pub fn is_empty(&self) -> bool {
        self.selected_id.is_none()
    }
}

pub struct SelectionController {
    surface: SurfaceHandle,
    events: UnboundedReceiver<SurfaceEvent>,
    handlers: HandlerTable,
    state: SelectionState,
}

impl SelectionController {
    pub fn new(surface: SurfaceHandle, events: UnboundedReceiver<SurfaceEvent>) -> Self {
        Self {
            surface,
            events,
            handlers: HandlerTable::new(),
            state: SelectionState::default(),
        }
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn surface(&self) -> &SurfaceHandle {
        &self.surface
    }

    /// Drain and handle every pending surface event. Returns how many ran.
    pub fn handle_events(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events.try_recv() {
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    pub fn handle_event(&mut self, event: SurfaceEvent) {
        match event {
            SurfaceEvent::Selected { tag, id } => self.select(&tag, &id),
            SurfaceEvent::Dragged { id, .. } => {
                if self.state.selected_id.as_ref() == Some(&id) {
                    self.hydrate();
                }
            }
            SurfaceEvent::Inserted { ids } => {
                debug!(count = ids.len(), "Surface inserted elements");
            }
            SurfaceEvent::Cleared => self.state = SelectionState::default(),
        }
    }

    /// Select the element addressed by `id`
    pub fn select(&mut self, tag: &str, id: &ElementAddress) {
        let Some(node) = self.surface.borrow().resolve(id) else {
            debug!(%id, tag, "Selected element no longer exists");
            self.state = SelectionState::default();
            return;
        };

        let anchor = self.surface.borrow().tree().closest(node, "a");
        let target = anchor.unwrap_or(node);

        let mut surface = self.surface.borrow_mut();
        let target_id = surface.ensure_id(target);
        surface.mark_selected(Some(target));
        let selected_tag = surface.tree().tag(target).map(str::to_string);
        drop(surface);

        debug!(id = %target_id, tag = ?selected_tag, retargeted = anchor.is_some_and(|a| a != node), "Selection changed");
        self.state.selected_tag = selected_tag;
        self.state.selected_id = Some(target_id);
        self.hydrate();
    }

    pub fn clear_selection(&mut self) {
        self.surface.borrow_mut().mark_selected(None);
        self.state = SelectionState::default();
    }

    fn selected_node(&self) -> Option<NodeId> {
        let id = self.state.selected_id.as_ref()?;
        self.surface.borrow().resolve(id)
    }

    /// Refresh the field cache from the live element
    pub fn hydrate(&mut self) {
        let fields = match self.selected_node() {
            Some(node) => read_fields(self.surface.borrow().tree(), node),
            None => FieldValues::default(),
        };
        self.state.fields = fields;
    }

    /// Apply one field edit to the selected element.
    ///
    /// Invalid input is rejected before the document is touched. A missing
    /// selection or a vanished element makes this a no-op.
    pub fn apply(&mut self, command: EditCommand) -> Result<(), EditorError> {
        command.validate()?;

        if let EditCommand::Href(href) = &command {
            return self.wrap_link(href);
        }

        let Some(node) = self.selected_node() else {
            debug!(kind = ?command.kind(), "No live selection, edit dropped");
            return Ok(());
        };

        {
            let mut surface = self.surface.borrow_mut();
            let tag = surface.tree().tag(node).unwrap_or_default().to_string();
            if command.kind().is_style() && !is_stylable(&tag) {
                debug!(tag, kind = ?command.kind(), "Style edit skipped on non-stylable tag");
                return Ok(());
            }

            self.handlers.dispatch(surface.tree_mut(), node, &command);
            surface.document_mut().touch();
        }

        self.hydrate();
        Ok(())
    }

    /// Link the selected element to `href`.
    ///
    /// An element inside an anchor only updates that anchor. Elements that
    /// contain a link, and the document structure itself, are refused.
    pub fn wrap_link(&mut self, href: &str) -> Result<(), EditorError> {
        validate_href(href)?;
        let href = href.trim();

        let Some(node) = self.selected_node() else {
            debug!("No live selection, link dropped");
            return Ok(());
        };

        let mut surface = self.surface.borrow_mut();
        let existing = surface.tree().closest(node, "a");
        let anchor = match existing {
            Some(anchor) => {
                surface.tree_mut().set_attr(anchor, "href", href);
                anchor
            }
            None => {
                let tree = surface.tree_mut();
                // anchors cannot nest
                if matches!(tree.tag(node), Some("html" | "head" | "body")) {
                    return Err(EditorError::invalid(
                        "link",
                        "the page itself cannot be linked",
                    ));
                }
                let has_inner_link = tree
                    .descendants(node)
                    .into_iter()
                    .any(|inner| tree.tag(inner) == Some("a"));
                if has_inner_link {
                    return Err(EditorError::invalid(
                        "link",
                        "this element already contains a link",
                    ));
                }
                let Some(parent) = tree.parent(node) else {
                    return Ok(());
                };
                let anchor = tree.create_element_with_attrs("a", vec![("href".to_string(), href.to_string())]);
                tree.insert_before(parent, anchor, Some(node));
                tree.append_child(anchor, node);
                info!(href, "Wrapped element in link");
                anchor
            }
        };

        let anchor_id = surface.ensure_id(anchor);
        surface.mark_selected(Some(anchor));
        surface.document_mut().touch();
        drop(surface);

        self.state.selected_tag = Some("a".to_string());
        self.state.selected_id = Some(anchor_id);
        self.hydrate();
        Ok(())
    }

    /// Delete the selected element and clear the selection.
    ///
    /// The document root is never removed.
    pub fn remove_selected(&mut self) -> Result<(), EditorError> {
        let Some(node) = self.selected_node() else {
            self.state = SelectionState::default();
            return Ok(());
        };

        let mut surface = self.surface.borrow_mut();
        let tree = surface.tree_mut();
        if Some(node) == tree.document_element() || node == tree.document() {
            return Err(EditorError::RootRemoval);
        }

        tree.remove(node);
        surface.document_mut().touch();
        surface.document_mut().refresh();
        drop(surface);

        info!(id = ?self.state.selected_id, "Removed element");
        self.state = SelectionState::default();
        Ok(())
    }
}

fn read_fields(tree: &DomTree, node: NodeId) -> FieldValues {
    let tag = tree.tag(node).unwrap_or_default();
    let attr = |name: &str| tree.attr(node, name).unwrap_or_default().to_string();

    let text = if tree.child_elements(node).is_empty() {
        tree.text_content(node)
    } else {
        tree.children(node)
            .iter()
            .filter(|c| !tree.is_element(**c))
            .map(|c| tree.text_content(*c))
            .collect::<String>()
    };

    let mut fields = FieldValues {
        text: text.trim().to_string(),
        element_id: attr("id"),
        class: tree
            .classes(node)
            .into_iter()
            .filter(|c| !is_instrumentation_class(c))
            .collect::<Vec<_>>()
            .join(" "),
        href: attr("href"),
        src: attr("src"),
        alt: attr("alt"),
        ..FieldValues::default()
    };

    if !is_stylable(tag) {
        return fields;
    }

    let style = StyleDeclarations::parse(tree.attr(node, "style").unwrap_or_default());
    let css = |property: &str| style.get(property).unwrap_or_default().to_string();

    fields.background_color = style
        .get("background-color")
        .or_else(|| style.get("background"))
        .or_else(|| tree.attr(node, "bgcolor"))
        .unwrap_or_default()
        .to_string();
    fields.color = css("color");
    fields.border_radius = css("border-radius");
    fields.padding = css("padding");
    fields.margin = css("margin");
    fields.width = style.get("width").or_else(|| tree.attr(node, "width")).unwrap_or_default().to_string();
    fields.height = style.get("height").or_else(|| tree.attr(node, "height")).unwrap_or_default().to_string();
    fields.font_family = css("font-family");
    fields.font_size = css("font-size");
    fields.font_weight = css("font-weight");
    fields.font_style = css("font-style");
    fields.align = read_alignment(tag, &style, tree.attr(node, "align"));
    fields
}

fn read_alignment(tag: &str, style: &StyleDeclarations, align_attr: Option<&str>) -> Option<Alignment> {
    let parse = |value: &str| match value.trim() {
        "left" | "start" => Some(Alignment::Left),
        "center" => Some(Alignment::Center),
        "right" | "end" => Some(Alignment::Right),
        _ => None,
    };

    if is_self_aligned(tag) {
        let left = style.get("margin-left").unwrap_or_default();
        let right = style.get("margin-right").unwrap_or_default();
        return match (left, right) {
            ("auto", "auto") => Some(Alignment::Center),
            ("auto", _) => Some(Alignment::Right),
            (_, "auto") => Some(Alignment::Left),
            _ => align_attr.and_then(parse),
        };
    }

    style.get("text-align").and_then(parse).or_else(|| align_attr.and_then(parse))
}
