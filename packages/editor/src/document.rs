//! # Editable Document
//!
//! The rendered tree currently open for editing. It is created when a clone
//! is opened and replaced wholesale when another clone is opened; only a
//! derived serialization is ever persisted.
//!
//! ## Lifecycle
//!
//! ```text
//! Fetch → Parse → Instrument → Edit → Snapshot → Save
//!   ↓       ↓         ↓          ↓        ↓        ↓
//! HTML   DomTree   Surface   Controller  HTML    Host
//! ```

use crate::EditorError;
use clonup_dom::markers::is_editor_block;
use clonup_dom::{doctype_declaration, parse_document, DomTree};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What kind of element references an asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AssetKind {
    Image,
    Video,
    Audio,
    Script,
    Stylesheet,
    Frame,
    Other,
}

impl AssetKind {
    fn for_tag(tag: &str) -> Self {
        match tag {
            "img" | "picture" => AssetKind::Image,
            "video" | "source" | "track" => AssetKind::Video,
            "audio" => AssetKind::Audio,
            "script" => AssetKind::Script,
            "link" => AssetKind::Stylesheet,
            "iframe" | "frame" => AssetKind::Frame,
            _ => AssetKind::Other,
        }
    }
}

/// Editable clone
#[derive(Debug, Clone)]
pub struct EditableDocument {
    /// Subdomain the clone is hosted under
    pub subdomain: String,

    /// Incremented on every applied edit
    pub version: u64,

    tree: DomTree,
    doctype: Option<String>,
    style_text: String,
    assets: BTreeMap<String, AssetKind>,
}

impl EditableDocument {
    /// Parse a clone's HTML into an editable document
    pub fn open(html: &str, subdomain: impl Into<String>) -> Result<Self, EditorError> {
        let tree = parse_document(html)?;
        let doctype = doctype_declaration(&tree);

        let mut document = Self {
            subdomain: subdomain.into(),
            version: 0,
            tree,
            doctype,
            style_text: String::new(),
            assets: BTreeMap::new(),
        };
        document.refresh();
        Ok(document)
    }

    pub fn tree(&self) -> &DomTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut DomTree {
        &mut self.tree
    }

    /// Doctype declaration of the document as originally opened
    pub fn doctype(&self) -> Option<&str> {
        self.doctype.as_deref()
    }

    /// Concatenated text of the page's own `<style>` blocks
    pub fn style_text(&self) -> &str {
        &self.style_text
    }

    /// Asset URL → referencing element kind
    pub fn assets(&self) -> &BTreeMap<String, AssetKind> {
        &self.assets
    }

    /// Record an applied edit
    pub fn touch(&mut self) {
        self.version += 1;
    }

    /// Recompute the style text and asset map from the current tree
    pub fn refresh(&mut self) {
        let tree = &self.tree;

        self.style_text = tree
            .elements_by_tag("style")
            .into_iter()
            .filter(|style| !is_editor_block(tree, *style))
            .map(|style| tree.text_content(style))
            .collect::<Vec<_>>()
            .join("\n");

        self.assets.clear();
        for element in tree.elements() {
            let Some(tag) = tree.tag(element) else {
                continue;
            };
            for attribute in ["src", "href", "poster"] {
                if tag == "a" && attribute == "href" {
                    continue;
                }
                if let Some(url) = tree.attr(element, attribute) {
                    if !url.is_empty() && !url.starts_with('#') {
                        self.assets.insert(url.to_string(), AssetKind::for_tag(tag));
                    }
                }
            }
        }
    }
}
