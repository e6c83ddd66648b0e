//! HTML5 serialization of a [`DomTree`].

use crate::{DomTree, NodeData, NodeId};

/// Elements that never have an end tag
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "basefont", "bgsound", "br", "col", "embed", "frame", "hr", "img", "input",
    "keygen", "link", "meta", "param", "source", "track", "wbr",
];

/// Elements whose text children are emitted verbatim.
///
/// `noscript` is included because documents are parsed with scripting
/// enabled, which makes its content raw text.
const RAW_TEXT_ELEMENTS: &[&str] = &[
    "script", "style", "noscript", "xmp", "iframe", "noembed", "noframes", "plaintext",
];

pub fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

pub fn is_raw_text_element(tag: &str) -> bool {
    RAW_TEXT_ELEMENTS.contains(&tag)
}

/// Decides which subtrees a serialization leaves out
pub type SkipFn<'a> = &'a dyn Fn(&DomTree, NodeId) -> bool;

struct Context<'a> {
    buffer: String,
    skip: Option<SkipFn<'a>>,
}

impl<'a> Context<'a> {
    fn new() -> Self {
        Self {
            buffer: String::new(),
            skip: None,
        }
    }

    fn skipping(skip: SkipFn<'a>) -> Self {
        Self {
            buffer: String::new(),
            skip: Some(skip),
        }
    }

    fn skips(&self, tree: &DomTree, node: NodeId) -> bool {
        self.skip.is_some_and(|skip| skip(tree, node))
    }

    fn add(&mut self, text: &str) {
        self.buffer.push_str(text);
    }

    fn add_escaped(&mut self, text: &str, attribute: bool) {
        for c in text.chars() {
            match c {
                '&' => self.add("&amp;"),
                '\u{a0}' => self.add("&nbsp;"),
                '"' if attribute => self.add("&quot;"),
                '<' if !attribute => self.add("&lt;"),
                '>' if !attribute => self.add("&gt;"),
                c => self.buffer.push(c),
            }
        }
    }

    fn get_output(self) -> String {
        self.buffer
    }
}

/// Outer HTML of one node
pub fn serialize_node(tree: &DomTree, node: NodeId) -> String {
    let mut ctx = Context::new();
    write_node(tree, node, &mut ctx);
    ctx.get_output()
}

/// Inner HTML of one node
pub fn serialize_children(tree: &DomTree, node: NodeId) -> String {
    let mut ctx = Context::new();
    for child in tree.children(node) {
        write_node(tree, *child, &mut ctx);
    }
    ctx.get_output()
}

/// Whole document, doctype included when the tree has one
pub fn serialize_document(tree: &DomTree) -> String {
    serialize_children(tree, tree.document())
}

/// Whole document with every subtree `skip` accepts left out
pub fn serialize_document_without(tree: &DomTree, skip: SkipFn<'_>) -> String {
    let mut ctx = Context::skipping(skip);
    write_node(tree, tree.document(), &mut ctx);
    ctx.get_output()
}

/// `<!DOCTYPE ...>` text for the tree's doctype node, public and system
/// identifiers included.
pub fn doctype_declaration(tree: &DomTree) -> Option<String> {
    let node = tree.doctype()?;
    let mut ctx = Context::new();
    write_node(tree, node, &mut ctx);
    Some(ctx.get_output())
}

fn write_node(tree: &DomTree, node: NodeId, ctx: &mut Context<'_>) {
    if ctx.skips(tree, node) {
        return;
    }
    match tree.data(node) {
        NodeData::Document => {
            for child in tree.children(node) {
                write_node(tree, *child, ctx);
            }
        }

        NodeData::Doctype {
            name,
            public_id,
            system_id,
        } => {
            ctx.add("<!DOCTYPE ");
            ctx.add(name);
            if !public_id.is_empty() {
                ctx.add(&format!(" PUBLIC \"{}\"", public_id));
                if !system_id.is_empty() {
                    ctx.add(&format!(" \"{}\"", system_id));
                }
            } else if !system_id.is_empty() {
                ctx.add(&format!(" SYSTEM \"{}\"", system_id));
            }
            ctx.add(">");
        }

        NodeData::Text(text) => {
            let raw = tree
                .parent(node)
                .and_then(|p| tree.tag(p))
                .is_some_and(is_raw_text_element);
            if raw {
                ctx.add(text);
            } else {
                ctx.add_escaped(text, false);
            }
        }

        NodeData::Comment(text) => {
            ctx.add("<!--");
            ctx.add(text);
            ctx.add("-->");
        }

        NodeData::Element { tag, attrs } => {
            ctx.add("<");
            ctx.add(tag);
            for (name, value) in attrs {
                ctx.add(" ");
                ctx.add(name);
                ctx.add("=\"");
                ctx.add_escaped(value, true);
                ctx.add("\"");
            }
            ctx.add(">");

            if is_void_element(tag) {
                return;
            }

            for child in tree.children(node) {
                write_node(tree, *child, ctx);
            }

            ctx.add("</");
            ctx.add(tag);
            ctx.add(">");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_document;

    #[test]
    fn test_void_elements_have_no_end_tag() {
        let tree = parse_document("<body><img src=\"a.png\"><br></body>").unwrap();
        let body = tree.body().unwrap();
        assert_eq!(serialize_children(&tree, body), "<img src=\"a.png\"><br>");
    }

    #[test]
    fn test_script_content_is_raw() {
        let tree = parse_document("<body><script>if (a < b && c) {}</script></body>").unwrap();
        let body = tree.body().unwrap();
        assert_eq!(
            serialize_children(&tree, body),
            "<script>if (a < b && c) {}</script>"
        );
    }

    #[test]
    fn test_text_and_attributes_are_escaped() {
        let tree = parse_document("<body><p title='say \"hi\" &amp; go'>a &lt; b</p></body>").unwrap();
        let body = tree.body().unwrap();
        assert_eq!(
            serialize_children(&tree, body),
            "<p title=\"say &quot;hi&quot; &amp; go\">a &lt; b</p>"
        );
    }

    #[test]
    fn test_doctype_with_identifiers() {
        let tree = parse_document(
            "<!DOCTYPE html PUBLIC \"-//W3C//DTD XHTML 1.0 Strict//EN\" \"http://www.w3.org/TR/xhtml1/DTD/xhtml1-strict.dtd\"><html></html>",
        )
        .unwrap();
        assert_eq!(
            doctype_declaration(&tree).unwrap(),
            "<!DOCTYPE html PUBLIC \"-//W3C//DTD XHTML 1.0 Strict//EN\" \"http://www.w3.org/TR/xhtml1/DTD/xhtml1-strict.dtd\">"
        );
    }

    #[test]
    fn test_document_round_trip() {
        let source = "<!DOCTYPE html><html><head><title>x</title></head><body><div class=\"a\">t</div></body></html>";
        let tree = parse_document(source).unwrap();
        assert_eq!(serialize_document(&tree), source);
    }

    #[test]
    fn test_document_without_skipped_subtrees() {
        let tree =
            parse_document("<body><p>Hello <span class=\"x\">there</span> world</p></body>").unwrap();
        let skip = |tree: &DomTree, node: NodeId| tree.has_class(node, "x");
        let html = serialize_document_without(&tree, &skip);
        assert!(html.contains("<p>Hello  world</p>"), "{html}");
    }
}
