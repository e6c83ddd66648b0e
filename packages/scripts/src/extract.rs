//! Collecting the user-editable script blocks of a document.

use crate::identity::ScriptIdentity;
use clonup_dom::markers::{is_editor_block, MANAGED_SCRIPT_ATTR};
use clonup_dom::{serialize_node, DomTree, NodeData, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// Substrings that make a script worth showing in the editor
const RELEVANT_KEYWORDS: &[&str] = &[
    "pixel",
    "fbq",
    "facebook",
    "gtag",
    "googletagmanager",
    "google-analytics",
    "datalayer",
    "analytics",
    "ttq",
    "tiktok",
    "snaptr",
    "hotjar",
    "clarity",
    "localstorage",
    "sessionstorage",
    "window.location",
    "location.href",
    "location.replace",
    "history.pushstate",
    "fetch(",
    "xmlhttprequest",
    "axios",
    "utm_",
];

/// Loader URLs a tracking SDK injects by itself at runtime
const DYNAMIC_SOURCE_PATTERNS: &[&str] = &[
    "/signals/config/",
    "/config.js",
    "/events.js",
    "/gtag/destination",
];

/// Attribute some SDKs set on the scripts they inject
pub const DYNAMIC_FLAG_ATTR: &str = "data-dynamic";

/// Comment texts worth carrying along with their script
const COMMENT_KEYWORDS: &[&str] = &["pixel", "facebook", "meta", "analytics", "end"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScriptLocation {
    Head,
    Body,
}

impl ScriptLocation {
    pub fn container(self, tree: &DomTree) -> Option<NodeId> {
        match self {
            ScriptLocation::Head => tree.head(),
            ScriptLocation::Body => tree.body(),
        }
    }
}

/// Where an attached comment sits relative to its script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CommentPosition {
    Before,
    After,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjacentComment {
    pub text: String,
    pub position: CommentPosition,
}

/// One editable `<script>` or `<noscript>` block
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptEntry {
    pub location: ScriptLocation,
    pub identity: ScriptIdentity,
    pub raw_markup: String,
    pub adjacent_comment: Option<AdjacentComment>,
}

impl ScriptEntry {
    /// Markup as shown in the editor, comment included
    pub fn render(&self) -> String {
        match &self.adjacent_comment {
            Some(AdjacentComment {
                text,
                position: CommentPosition::Before,
            }) => format!("<!--{text}-->\n{}", self.raw_markup),
            Some(AdjacentComment {
                text,
                position: CommentPosition::After,
            }) => format!("{}\n<!--{text}-->", self.raw_markup),
            None => self.raw_markup.clone(),
        }
    }
}

/// Deduplicated editable blocks of a document
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScriptSet {
    entries: Vec<ScriptEntry>,
}

impl ScriptSet {
    pub fn entries(&self) -> &[ScriptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn at(&self, location: ScriptLocation) -> impl Iterator<Item = &ScriptEntry> {
        self.entries
            .iter()
            .filter(move |entry| entry.location == location)
    }

    /// Blocks for one location separated by a blank line
    pub fn editable_text(&self, location: ScriptLocation) -> String {
        self.at(location)
            .map(ScriptEntry::render)
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// A relevant block still in the tree, with its attached comment node
pub(crate) struct Collected {
    pub node: NodeId,
    pub comment: Option<NodeId>,
    pub entry: ScriptEntry,
}

/// Every editable block of both locations, duplicates collapsed
pub fn extract(tree: &DomTree) -> ScriptSet {
    let mut seen = HashSet::new();
    let mut entries = Vec::new();
    for location in [ScriptLocation::Head, ScriptLocation::Body] {
        for collected in collect(tree, location) {
            if seen.insert(collected.entry.identity.clone()) {
                entries.push(collected.entry);
            }
        }
    }
    debug!(count = entries.len(), "Extracted script blocks");
    ScriptSet { entries }
}

/// Relevant blocks at `location` in document order, duplicates included
pub(crate) fn collect(tree: &DomTree, location: ScriptLocation) -> Vec<Collected> {
    let Some(container) = location.container(tree) else {
        return Vec::new();
    };

    script_blocks(tree, container)
        .into_iter()
        .filter(|node| is_relevant(tree, *node) && !is_dynamic(tree, *node))
        .map(|node| {
            let comment = adjacent_comment(tree, node);
            let adjacent_comment = comment.map(|(comment, position)| AdjacentComment {
                text: match tree.data(comment) {
                    NodeData::Comment(text) => text.clone(),
                    _ => String::new(),
                },
                position,
            });
            Collected {
                node,
                comment: comment.map(|(comment, _)| comment),
                entry: ScriptEntry {
                    location,
                    identity: ScriptIdentity::of(tree, node),
                    raw_markup: serialize_node(tree, node),
                    adjacent_comment,
                },
            }
        })
        .collect()
}

/// `<script>`/`<noscript>` elements under `container`, editor blocks excluded
pub(crate) fn script_blocks(tree: &DomTree, container: NodeId) -> Vec<NodeId> {
    tree.descendants(container)
        .into_iter()
        .filter(|node| matches!(tree.tag(*node), Some("script" | "noscript")))
        .filter(|node| !is_editor_block(tree, *node))
        .collect()
}

fn is_relevant(tree: &DomTree, node: NodeId) -> bool {
    if tree.has_attr(node, MANAGED_SCRIPT_ATTR) {
        return true;
    }
    let haystack = format!(
        "{} {}",
        tree.attr(node, "src").unwrap_or_default(),
        tree.text_content(node)
    )
    .to_lowercase();
    RELEVANT_KEYWORDS
        .iter()
        .any(|keyword| haystack.contains(keyword))
}

fn is_dynamic(tree: &DomTree, node: NodeId) -> bool {
    if tree.has_attr(node, DYNAMIC_FLAG_ATTR) {
        return true;
    }
    let Some(src) = tree.attr(node, "src") else {
        return false;
    };
    let src = src.to_lowercase();
    tree.text_content(node).trim().is_empty()
        && DYNAMIC_SOURCE_PATTERNS
            .iter()
            .any(|pattern| src.contains(pattern))
}

/// The allowlisted comment right before the block, or an end marker right
/// after it.
fn adjacent_comment(tree: &DomTree, node: NodeId) -> Option<(NodeId, CommentPosition)> {
    if let Some(before) = sibling_skipping_whitespace(tree, node, Direction::Previous) {
        if let NodeData::Comment(text) = tree.data(before) {
            let words = comment_words(text);
            let allowlisted = words
                .iter()
                .any(|word| COMMENT_KEYWORDS.contains(&word.as_str()));
            if !is_end_marker(&words) && allowlisted {
                return Some((before, CommentPosition::Before));
            }
        }
    }

    let after = sibling_skipping_whitespace(tree, node, Direction::Next)?;
    match tree.data(after) {
        NodeData::Comment(text) if is_end_marker(&comment_words(text)) => {
            Some((after, CommentPosition::After))
        }
        _ => None,
    }
}

/// Lowercased alphanumeric words of a comment
fn comment_words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn is_end_marker(words: &[String]) -> bool {
    words.first().is_some_and(|word| word == "end")
}

enum Direction {
    Previous,
    Next,
}

fn sibling_skipping_whitespace(tree: &DomTree, node: NodeId, direction: Direction) -> Option<NodeId> {
    let mut current = node;
    loop {
        current = match direction {
            Direction::Previous => tree.previous_sibling(current)?,
            Direction::Next => tree.next_sibling(current)?,
        };
        match tree.data(current) {
            NodeData::Text(text) if text.trim().is_empty() => continue,
            _ => return Some(current),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clonup_dom::parse_document;

    const PIXEL_PAGE: &str = r#"<!DOCTYPE html><html><head>
<!-- Meta Pixel Code -->
<script>fbq('init', '123');</script>
<!-- End Meta Pixel Code -->
<script src="https://connect.facebook.net/signals/config/123?v=2"></script>
<script>console.log('theme');</script>
<style id="clonup-editor-style">.x{}</style>
</head><body>
<script>fbq('init', '123');</script>
<noscript><img src="https://www.facebook.com/tr?id=123"></noscript>
<script id="clonup-editor-script">window.parent.postMessage('pixel')</script>
</body></html>"#;

    #[test]
    fn test_extract_filters_and_dedups() {
        let tree = parse_document(PIXEL_PAGE).unwrap();
        let set = extract(&tree);

        // head pixel, body noscript; the body duplicate collapses
        assert_eq!(set.len(), 2);
        assert_eq!(set.at(ScriptLocation::Head).count(), 1);
        assert_eq!(set.at(ScriptLocation::Body).count(), 1);
    }

    #[test]
    fn test_comments_attach_to_their_script() {
        let tree = parse_document(PIXEL_PAGE).unwrap();
        let set = extract(&tree);
        let head = set.editable_text(ScriptLocation::Head);

        assert_eq!(
            head,
            "<!-- Meta Pixel Code -->\n<script>fbq('init', '123');</script>"
        );
    }

    #[test]
    fn test_comments_match_whole_words_only() {
        let tree = parse_document(
            r#"<html><head>
<!-- metadata recommended by the theme -->
<script>fbq('init', '1');</script>
<!-- endpoint list -->
</head></html>"#,
        )
        .unwrap();
        let set = extract(&tree);

        assert_eq!(set.len(), 1);
        assert_eq!(set.entries()[0].adjacent_comment, None);
    }

    #[test]
    fn test_dynamic_loader_is_excluded() {
        let tree = parse_document(PIXEL_PAGE).unwrap();
        let set = extract(&tree);
        assert!(set
            .entries()
            .iter()
            .all(|entry| !entry.raw_markup.contains("signals/config")));
    }

    #[test]
    fn test_managed_marker_makes_any_script_relevant() {
        let tree = parse_document(
            r#"<html><head><script data-managed-script="true">console.log(1)</script></head></html>"#,
        )
        .unwrap();
        assert_eq!(extract(&tree).len(), 1);
    }
}
