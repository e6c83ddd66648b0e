//! # Snapshot Pipeline
//!
//! Turns the live, instrumented editing tree into the clean HTML that gets
//! persisted. The live tree is never mutated; everything happens on a
//! freshly parsed working copy.
//!
//! ```text
//! live tree ──serialize (no editor elements)──▶ text ──collapse &amp;──▶ reparse ──▶ working copy
//!                                                                  │
//!   identity sync ◀──────────────────────────────────────────────┘
//!        ↓
//!   positional sync (img / video / a without an address)
//!        ↓
//!   strip instrumentation ─▶ rewrite managed URLs ─▶ reconcile media/links
//!        ↓
//!   doctype + text cleanup + collapse &amp; ─▶ Snapshot
//! ```
//!
//! Each pass exists because one before it can lose information: the
//! reparse may normalise attributes, stripping may take an `id`-less
//! element's only handle, and URL rewriting must not undo a fresh edit.

use crate::urls::{rewrite_srcset, rewrite_style_urls, ManagedDomainSet};
use crate::SnapshotError;
use clonup_dom::markers::{
    is_editor_element, is_instrumentation_attr, is_instrumentation_class, ADDRESS_ATTR,
    ATTR_PREFIX,
};
use clonup_dom::{
    collapse_double_escapes, doctype_declaration, is_raw_text_element, parse_document,
    serialize_document, serialize_document_without, DomTree, NodeId,
};
use clonup_editor::EditableDocument;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, instrument};

/// Attributes carried over from the live element during identity sync
const IDENTITY_SYNC_ATTRS: &[&str] = &["src", "href", "alt", "style", "class", "srcset"];

/// Attributes carried over during the positional fallback
const POSITIONAL_SYNC_ATTRS: &[&str] = &["src", "href", "alt", "style"];

/// Tags the positional fallback and final reconciliation look at
const MEDIA_AND_LINK_TAGS: &[&str] = &["img", "video", "a"];

/// Attributes holding a single URL
const URL_ATTRS: &[&str] = &["src", "href", "poster", "action", "data-src"];

static RESIDUAL_ATTR: Lazy<Regex> = Lazy::new(|| {
    let pattern = format!(
        r#"\s+{}[A-Za-z0-9_-]+(?:="[^"]*")?"#,
        regex::escape(ATTR_PREFIX)
    );
    Regex::new(&pattern).expect("residual attribute pattern")
});

/// A comment opener, or a start tag with quoted attribute values
static START_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<!--|<([A-Za-z][A-Za-z0-9-]*)(?:[^>"']|"[^"]*"|'[^']*')*>"#)
        .expect("start tag pattern")
});

static CLASS_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\sclass="([^"]*)""#).expect("class attribute pattern"));

static EMPTY_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\s+(?:class|style)="\s*""#).expect("empty attribute pattern"));

/// What the passes did, for logging and tests
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStats {
    /// Elements matched by address or `id`
    pub identity_synced: usize,
    /// Elements matched by tag and document order
    pub positional_synced: usize,
    /// Positional pairs skipped because their tags disagreed
    pub positional_skipped: usize,
    /// Instrumentation attributes, classes and elements removed
    pub stripped: usize,
    /// Managed URLs made root-relative
    pub urls_rewritten: usize,
    /// Attributes corrected by the final reconciliation
    pub reconciled: usize,
}

/// Persistable HTML of one editing session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub html: String,
    pub stats: SyncStats,
}

/// Live-to-working-copy element pairing built by the sync passes
type Pairs = Vec<(NodeId, NodeId)>;

#[derive(Debug, Clone)]
pub struct SnapshotPipeline {
    domains: ManagedDomainSet,
}

impl SnapshotPipeline {
    pub fn new(domains: ManagedDomainSet) -> Self {
        Self { domains }
    }

    pub fn domains(&self) -> &ManagedDomainSet {
        &self.domains
    }

    /// Serialize an open document, keeping the doctype it was opened with
    pub fn serialize_document(
        &self,
        document: &EditableDocument,
    ) -> Result<Snapshot, SnapshotError> {
        self.serialize(document.tree(), document.doctype())
    }

    /// Produce clean, persistable HTML from the live tree.
    ///
    /// `doctype` overrides the live tree's own doctype node when given.
    #[instrument(skip_all, fields(nodes = live.len()))]
    pub fn serialize(
        &self,
        live: &DomTree,
        doctype: Option<&str>,
    ) -> Result<Snapshot, SnapshotError> {
        if live.document_element().is_none() {
            return Err(SnapshotError::MissingRoot);
        }
        let mut stats = SyncStats::default();

        // 1. Snapshot the live markup and reparse it into a working copy.
        // Injected elements stay out so the parser cannot re-nest page content.
        let markup = serialize_document_without(live, &is_editor_element);
        let mut copy = parse_document(&collapse_double_escapes(&markup))?;
        // re-attached as text in step 7
        if let Some(node) = copy.doctype() {
            copy.remove(node);
        }

        // 2-3. Carry current attribute values across
        let mut pairs = self.identity_sync(live, &mut copy, &mut stats);
        pairs.extend(self.positional_sync(live, &mut copy, &mut stats));
        debug!(
            identity = stats.identity_synced,
            positional = stats.positional_synced,
            skipped = stats.positional_skipped,
            "Synced working copy"
        );

        // 4. Strip instrumentation
        self.strip_instrumentation(&mut copy, &mut stats);

        // 5. Managed URLs become root-relative
        self.rewrite_urls(&mut copy, &mut stats);

        // 6. Edits to media and links win over anything the passes above did
        self.reconcile(live, &mut copy, &pairs, &mut stats);

        // 7. Doctype
        let doctype = doctype
            .map(str::to_string)
            .or_else(|| doctype_declaration(live));
        let body = serialize_document(&copy);
        let html = match doctype {
            Some(doctype) => format!("{doctype}\n{body}"),
            None => body,
        };

        // 8. Text-level cleanup for anything the tree passes missed
        let html = self.remove_residual_markers(&html, &mut stats);

        // 9. Collapse escapes introduced along the way
        let html = collapse_double_escapes(&html);

        info!(
            bytes = html.len(),
            stripped = stats.stripped,
            urls = stats.urls_rewritten,
            "Serialized snapshot"
        );
        Ok(Snapshot { html, stats })
    }

    /// Match live elements to copy elements by address marker, then by
    /// occurrence of their `id` attribute.
    fn identity_sync(&self, live: &DomTree, copy: &mut DomTree, stats: &mut SyncStats) -> Pairs {
        let mut by_marker: HashMap<String, NodeId> = HashMap::new();
        let mut by_id: HashMap<String, Vec<NodeId>> = HashMap::new();
        for element in copy.elements() {
            if let Some(marker) = copy.attr(element, ADDRESS_ATTR) {
                by_marker.entry(marker.to_string()).or_insert(element);
            }
            if let Some(id) = copy.attr(element, "id") {
                by_id.entry(id.to_string()).or_default().push(element);
            }
        }

        let mut pairs = Vec::new();
        let mut id_seen: HashMap<&str, usize> = HashMap::new();
        for element in live.elements() {
            let occurrence = live.attr(element, "id").map(|id| {
                let seen = id_seen.entry(id).or_insert(0);
                *seen += 1;
                (id, *seen - 1)
            });

            if is_editor_element(live, element) {
                continue;
            }
            let exposes = IDENTITY_SYNC_ATTRS
                .iter()
                .any(|attr| live.has_attr(element, attr));
            if !exposes {
                continue;
            }

            let target = live
                .attr(element, ADDRESS_ATTR)
                .and_then(|marker| by_marker.get(marker).copied())
                .or_else(|| {
                    let (id, index) = occurrence?;
                    by_id.get(id)?.get(index).copied()
                });
            let Some(target) = target else {
                continue;
            };
            if copy.tag(target) != live.tag(element) {
                debug!(tag = ?live.tag(element), "Identity match changed tag, skipping");
                continue;
            }

            for attr in IDENTITY_SYNC_ATTRS {
                match live.attr(element, attr) {
                    Some(value) if copy.attr(target, attr) != Some(value) => {
                        copy.set_attr(target, attr, value);
                    }
                    Some(_) => {}
                    None => {
                        copy.remove_attr(target, attr);
                    }
                }
            }
            stats.identity_synced += 1;
            if is_media_or_link(live, element) {
                pairs.push((element, target));
            }
        }
        pairs
    }

    /// Pair unaddressed media and links by document order.
    ///
    /// A pair whose tags disagree is skipped rather than guessed at.
    fn positional_sync(&self, live: &DomTree, copy: &mut DomTree, stats: &mut SyncStats) -> Pairs {
        let live_nodes = unaddressed_media_and_links(live);
        let copy_nodes = unaddressed_media_and_links(copy);

        let mut pairs = Vec::new();
        for (element, target) in live_nodes.into_iter().zip(copy_nodes) {
            if live.tag(element) != copy.tag(target) {
                stats.positional_skipped += 1;
                continue;
            }
            for attr in POSITIONAL_SYNC_ATTRS {
                if let Some(value) = live.attr(element, attr) {
                    copy.set_attr(target, attr, value);
                }
            }
            stats.positional_synced += 1;
            pairs.push((element, target));
        }
        pairs
    }

    fn strip_instrumentation(&self, copy: &mut DomTree, stats: &mut SyncStats) {
        for element in copy.elements() {
            if !copy.is_attached(element) {
                continue;
            }
            if is_editor_element(copy, element) {
                copy.remove(element);
                stats.stripped += 1;
                continue;
            }

            stats.stripped += copy.retain_attrs(element, |name, _| !is_instrumentation_attr(name));

            let instrumentation: Vec<String> = copy
                .classes(element)
                .into_iter()
                .filter(|class| is_instrumentation_class(class))
                .map(str::to_string)
                .collect();
            for class in instrumentation {
                copy.remove_class(element, &class);
                stats.stripped += 1;
            }
        }
    }

    fn rewrite_urls(&self, copy: &mut DomTree, stats: &mut SyncStats) {
        for element in copy.elements() {
            for attr in URL_ATTRS {
                let Some(value) = copy.attr(element, attr) else {
                    continue;
                };
                if let Some(relative) = self.domains.strip(value) {
                    copy.set_attr(element, attr, relative);
                    stats.urls_rewritten += 1;
                }
            }

            if let Some(srcset) = copy.attr(element, "srcset") {
                let (rewritten, changed) = rewrite_srcset(srcset, &self.domains);
                if changed > 0 {
                    copy.set_attr(element, "srcset", rewritten);
                    stats.urls_rewritten += changed;
                }
            }

            if let Some(style) = copy.attr(element, "style") {
                let (rewritten, changed) = rewrite_style_urls(style, &self.domains);
                if changed > 0 {
                    copy.set_attr(element, "style", rewritten);
                    stats.urls_rewritten += changed;
                }
            }

            if copy.tag(element) == Some("style") {
                let (rewritten, changed) =
                    rewrite_style_urls(&copy.text_content(element), &self.domains);
                if changed > 0 {
                    copy.set_text(element, rewritten);
                    stats.urls_rewritten += changed;
                }
            }
        }
    }

    /// Re-apply live `src`/`href`/`alt` to every paired media element and
    /// link, in their rewritten form.
    fn reconcile(
        &self,
        live: &DomTree,
        copy: &mut DomTree,
        pairs: &[(NodeId, NodeId)],
        stats: &mut SyncStats,
    ) {
        for (element, target) in pairs {
            if !copy.is_attached(*target) {
                continue;
            }
            for attr in ["src", "href", "alt"] {
                let Some(value) = live.attr(*element, attr) else {
                    continue;
                };
                let value = if attr == "alt" {
                    value.to_string()
                } else {
                    self.domains.rewrite(value)
                };
                if copy.attr(*target, attr) != Some(value.as_str()) {
                    copy.set_attr(*target, attr, value);
                    stats.reconciled += 1;
                }
            }
        }
    }

    /// Text-level cleanup, applied inside start tags only so comments and
    /// script or style bodies keep their exact text.
    fn remove_residual_markers(&self, html: &str, stats: &mut SyncStats) -> String {
        let mut removed = 0;
        let html = edit_start_tags(html, |tag| {
            removed += RESIDUAL_ATTR.find_iter(tag).count();
            let tag = RESIDUAL_ATTR.replace_all(tag, "");

            let tag = CLASS_ATTR.replace_all(&tag, |caps: &Captures| {
                let classes: Vec<&str> = caps[1].split_ascii_whitespace().collect();
                let kept: Vec<&str> = classes
                    .iter()
                    .copied()
                    .filter(|class| !is_instrumentation_class(class))
                    .collect();
                if kept.len() == classes.len() {
                    return caps[0].to_string();
                }
                removed += classes.len() - kept.len();
                format!(" class=\"{}\"", kept.join(" "))
            });

            EMPTY_ATTR.replace_all(&tag, "").into_owned()
        });
        if removed > 0 {
            debug!(removed, "Removed residual instrumentation from text");
        }
        stats.stripped += removed;
        html
    }
}

/// Rewrite every start tag of serialized HTML through `edit`.
///
/// Comments and the content of raw-text elements are copied unchanged.
fn edit_start_tags(html: &str, mut edit: impl FnMut(&str) -> String) -> String {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;
    while let Some(caps) = START_TAG.captures(rest) {
        let Some(found) = caps.get(0) else {
            break;
        };
        out.push_str(&rest[..found.start()]);
        let after = &rest[found.end()..];

        let Some(name) = caps.get(1) else {
            // comment: copy through its end
            let end = after.find("-->").map_or(after.len(), |end| end + 3);
            out.push_str(found.as_str());
            out.push_str(&after[..end]);
            rest = &after[end..];
            continue;
        };

        out.push_str(&edit(found.as_str()));
        rest = after;

        let name = name.as_str().to_ascii_lowercase();
        if is_raw_text_element(&name) {
            let end = rest.find(&format!("</{name}")).unwrap_or(rest.len());
            out.push_str(&rest[..end]);
            rest = &rest[end..];
        }
    }
    out.push_str(rest);
    out
}

fn is_media_or_link(tree: &DomTree, node: NodeId) -> bool {
    tree.tag(node)
        .is_some_and(|tag| MEDIA_AND_LINK_TAGS.contains(&tag))
}

fn unaddressed_media_and_links(tree: &DomTree) -> Vec<NodeId> {
    tree.elements()
        .into_iter()
        .filter(|node| is_media_or_link(tree, *node))
        .filter(|node| !tree.has_attr(*node, ADDRESS_ATTR) && !tree.has_attr(*node, "id"))
        .filter(|node| !is_editor_element(tree, *node))
        .collect()
}
