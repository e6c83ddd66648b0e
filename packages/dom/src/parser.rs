//! HTML5 parsing using html5ever.
//!
//! html5ever builds an `RcDom`; we walk it once and copy everything into
//! the arena [`DomTree`]. Whitespace text is kept so serialization stays
//! faithful to the captured page.

use crate::{DomError, DomTree, NodeId};
use html5ever::tendril::TendrilSink;
use html5ever::{parse_document as html5ever_parse, ParseOpts};
use markup5ever_rcdom::{Handle, NodeData as RcNodeData, RcDom};
use tracing::debug;

/// Parse a complete HTML document
pub fn parse_document(html: &str) -> Result<DomTree, DomError> {
    let dom: RcDom = html5ever_parse(RcDom::default(), ParseOpts::default())
        .from_utf8()
        .read_from(&mut html.as_bytes())?;

    let mut tree = DomTree::new();
    let root = tree.document();
    convert_node(&mut tree, &dom.document, root);

    debug!(nodes = tree.len(), bytes = html.len(), "Parsed document");
    Ok(tree)
}

/// Parse markup as if it appeared inside `<body>`.
///
/// Returns the scratch tree together with the top-level fragment nodes, which
/// are still children of the scratch body. Use [`DomTree::import`] to move
/// them into another tree.
pub fn parse_fragment(html: &str) -> Result<(DomTree, Vec<NodeId>), DomError> {
    let tree = parse_document(&format!("<!DOCTYPE html><html><head></head><body>{}", html))?;
    let body = tree.body().ok_or(DomError::MissingBody)?;
    let roots = tree.children(body).to_vec();
    Ok((tree, roots))
}

/// Copy an html5ever node (and its subtree) under `parent`
fn convert_node(tree: &mut DomTree, rc_node: &Handle, parent: NodeId) {
    match &rc_node.data {
        RcNodeData::Document => {
            for child in rc_node.children.borrow().iter() {
                convert_node(tree, child, parent);
            }
        }

        RcNodeData::Doctype {
            name,
            public_id,
            system_id,
        } => {
            let node = tree.create_doctype(name.to_string(), public_id.to_string(), system_id.to_string());
            tree.append_child(parent, node);
        }

        RcNodeData::Text { contents } => {
            let node = tree.create_text(contents.borrow().to_string());
            tree.append_child(parent, node);
        }

        RcNodeData::Comment { contents } => {
            let node = tree.create_comment(contents.to_string());
            tree.append_child(parent, node);
        }

        RcNodeData::Element {
            name,
            attrs,
            template_contents,
            ..
        } => {
            let attrs = attrs
                .borrow()
                .iter()
                .map(|attr| (attr.name.local.to_string(), attr.value.to_string()))
                .collect();
            let node = tree.create_element_with_attrs(name.local.to_string(), attrs);
            tree.append_child(parent, node);

            // <template> keeps its children in a separate fragment
            if let Some(contents) = template_contents.borrow().as_ref() {
                for child in contents.children.borrow().iter() {
                    convert_node(tree, child, node);
                }
            }

            for child in rc_node.children.borrow().iter() {
                convert_node(tree, child, node);
            }
        }

        RcNodeData::ProcessingInstruction { .. } => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NodeData;

    #[test]
    fn test_parse_keeps_doctype_and_structure() {
        let tree = parse_document("<!DOCTYPE html><html><head><title>T</title></head><body><p id=\"x\">Hi</p></body></html>").unwrap();

        let doctype = tree.doctype().expect("doctype");
        assert!(matches!(tree.data(doctype), NodeData::Doctype { name, .. } if name == "html"));

        let p = tree.find_by_attr("id", "x").expect("p");
        assert_eq!(tree.tag(p), Some("p"));
        assert_eq!(tree.text_content(p), "Hi");
    }

    #[test]
    fn test_parse_decodes_entities_in_attributes() {
        let tree = parse_document("<a href=\"/a?x=1&amp;y=2\">A &amp; B</a>").unwrap();
        let a = tree.elements_by_tag("a")[0];
        assert_eq!(tree.attr(a, "href"), Some("/a?x=1&y=2"));
        assert_eq!(tree.text_content(a), "A & B");
    }

    #[test]
    fn test_parse_synthesizes_head_and_body() {
        let tree = parse_document("<img src=\"a.png\">").unwrap();
        assert!(tree.head().is_some());
        assert!(tree.body().is_some());
        assert!(tree.doctype().is_none());
    }

    #[test]
    fn test_parse_fragment_roots() {
        let (tree, roots) = parse_fragment("<!-- pixel --><script src=\"/a.js\"></script>\n<noscript><img src=\"p.gif\"></noscript>").unwrap();
        let tags: Vec<_> = roots.iter().filter_map(|r| tree.tag(*r)).collect();
        assert_eq!(tags, vec!["script", "noscript"]);
        assert!(matches!(tree.data(roots[0]), NodeData::Comment(c) if c.trim() == "pixel"));
    }
}
