//! Writing edited script text back into the document.
//!
//! The editable blocks of a location are cleared and the edited text is
//! parsed block by block and appended again. A block whose identity is
//! already present (a script the editor does not show, or an earlier block
//! of the same text) is skipped, so saving unchanged text is a no-op.

use crate::extract::{collect, script_blocks, ScriptLocation};
use crate::identity::ScriptIdentity;
use crate::ScriptError;
use clonup_dom::markers::{EDITOR_SCRIPT_ID, EDITOR_STYLE_ID, MANAGED_SCRIPT_ATTR};
use clonup_dom::{parse_fragment, DomTree, NodeData, NodeId};
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReinsertReport {
    pub removed: usize,
    pub inserted: usize,
    pub duplicates: usize,
    pub malformed: usize,
    pub restored: usize,
}

/// Replace the editable blocks at `location` with those in `text`.
#[instrument(skip(tree, text), fields(bytes = text.len()))]
pub fn reinsert(
    tree: &mut DomTree,
    location: ScriptLocation,
    text: &str,
) -> Result<ReinsertReport, ScriptError> {
    let container = location
        .container(tree)
        .ok_or(ScriptError::MissingContainer(location))?;
    let essentials = essential_elements(tree);
    let mut report = ReinsertReport::default();

    // clear
    for collected in collect(tree, location) {
        if let Some(comment) = collected.comment {
            tree.remove(comment);
        }
        if tree.remove(collected.node) {
            report.removed += 1;
        }
    }

    let mut present: HashSet<ScriptIdentity> = script_blocks(tree, container)
        .into_iter()
        .map(|node| ScriptIdentity::of(tree, node))
        .collect();

    // reinsert
    let anchor = match location {
        ScriptLocation::Body => tree
            .find_by_attr("id", EDITOR_SCRIPT_ID)
            .filter(|node| tree.parent(*node) == Some(container)),
        ScriptLocation::Head => None,
    };
    for (index, block) in split_blocks(text).into_iter().enumerate() {
        match parse_block(&block) {
            Ok((fragment, roots)) => {
                let fresh: Vec<NodeId> = roots
                    .iter()
                    .copied()
                    .filter(|root| is_script_block(&fragment, *root))
                    .filter(|root| present.insert(ScriptIdentity::of(&fragment, *root)))
                    .collect();
                let blocks = roots
                    .iter()
                    .filter(|root| is_script_block(&fragment, **root))
                    .count();
                report.duplicates += blocks - fresh.len();
                if fresh.is_empty() {
                    continue;
                }

                for root in roots {
                    let keep = fresh.contains(&root)
                        || matches!(fragment.data(root), NodeData::Comment(_));
                    if !keep {
                        continue;
                    }
                    let node = tree.import(&fragment, root);
                    if tree.is_element(node) {
                        tree.set_attr(node, MANAGED_SCRIPT_ATTR, "true");
                        report.inserted += 1;
                    }
                    tree.insert_before(container, node, anchor);
                }
            }
            Err(reason) => {
                warn!(block = index, %reason, "Skipping malformed script block");
                report.malformed += 1;
            }
        }
    }

    report.restored = restore_essentials(tree, essentials);
    if report.restored > 0 {
        debug!(restored = report.restored, "Re-attached editor elements");
    }

    info!(
        ?location,
        removed = report.removed,
        inserted = report.inserted,
        duplicates = report.duplicates,
        "Reinserted scripts"
    );
    Ok(report)
}

/// Split edited text on blank lines that are not inside a script body
pub fn split_blocks(text: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut depth: isize = 0;

    for line in text.lines() {
        if line.trim().is_empty() && depth <= 0 {
            if !current.is_empty() {
                blocks.push(current.join("\n"));
                current.clear();
            }
            depth = 0;
            continue;
        }
        depth += open_tag_delta(line);
        current.push(line);
    }
    if !current.is_empty() {
        blocks.push(current.join("\n"));
    }
    blocks
}

fn open_tag_delta(line: &str) -> isize {
    let lower = line.to_ascii_lowercase();
    let mut delta = 0;
    for tag in ["script", "noscript"] {
        let opens = lower.matches(&format!("<{tag}")).count();
        let closes = lower.matches(&format!("</{tag}")).count();
        delta += opens as isize - closes as isize;
    }
    delta
}

fn parse_block(block: &str) -> Result<(DomTree, Vec<NodeId>), String> {
    if open_tag_delta(block) != 0 {
        return Err("unbalanced script tags".to_string());
    }
    let (fragment, roots) = parse_fragment(block).map_err(|e| e.to_string())?;

    let stray: Vec<&str> = roots
        .iter()
        .filter(|root| fragment.is_element(**root) && !is_script_block(&fragment, **root))
        .filter_map(|root| fragment.tag(*root))
        .collect();
    if !stray.is_empty() {
        return Err(format!("unexpected elements: {}", stray.join(", ")));
    }
    if !roots.iter().any(|root| is_script_block(&fragment, *root)) {
        return Err("no script or noscript element".to_string());
    }
    Ok((fragment, roots))
}

fn is_script_block(tree: &DomTree, node: NodeId) -> bool {
    matches!(tree.tag(node), Some("script" | "noscript"))
}

/// The editor's own style and script, with where they belong
fn essential_elements(tree: &DomTree) -> Vec<(NodeId, ScriptLocation)> {
    [
        (EDITOR_STYLE_ID, ScriptLocation::Head),
        (EDITOR_SCRIPT_ID, ScriptLocation::Body),
    ]
    .into_iter()
    .filter_map(|(id, location)| tree.find_by_attr("id", id).map(|node| (node, location)))
    .collect()
}

fn restore_essentials(tree: &mut DomTree, essentials: Vec<(NodeId, ScriptLocation)>) -> usize {
    let mut restored = 0;
    for (node, location) in essentials {
        if tree.is_attached(node) {
            continue;
        }
        if let Some(container) = location.container(tree) {
            tree.detach(node);
            tree.append_child(container, node);
            restored += 1;
        }
    }
    restored
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_on_blank_lines() {
        let blocks = split_blocks("<script>a()</script>\n\n\n<noscript>b</noscript>\n");
        assert_eq!(blocks, vec!["<script>a()</script>", "<noscript>b</noscript>"]);
    }

    #[test]
    fn test_blank_line_inside_script_does_not_split() {
        let text = "<script>\nfunction a() {}\n\nfunction b() {}\n</script>\n\n<script>c()</script>";
        let blocks = split_blocks(text);
        assert_eq!(blocks.len(), 2);
        assert!(blocks[0].contains("function b"));
    }

    #[test]
    fn test_noscript_counts_once() {
        assert_eq!(open_tag_delta("<noscript><img src=x></noscript>"), 0);
        assert_eq!(open_tag_delta("<script>"), 1);
        assert_eq!(open_tag_delta("<noscript>"), 1);
    }

    #[test]
    fn test_malformed_blocks_are_rejected() {
        assert!(parse_block("<script>never closed").is_err());
        assert!(parse_block("<div>not a script</div>").is_err());
        assert!(parse_block("just text").is_err());
        assert!(parse_block("<!-- c -->\n<script>ok()</script>").is_ok());
    }

    #[test]
    fn test_detached_essentials_are_reattached() {
        let mut tree = clonup_dom::parse_document(
            r#"<html><head><style id="clonup-editor-style"></style></head><body><script id="clonup-editor-script"></script></body></html>"#,
        )
        .unwrap();
        let essentials = essential_elements(&tree);
        assert_eq!(essentials.len(), 2);
        let (script, _) = essentials[1];
        tree.detach(script);

        assert_eq!(restore_essentials(&mut tree, essentials), 1);
        assert_eq!(tree.parent(script), tree.body());
    }
}
