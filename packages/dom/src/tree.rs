//! # Document Tree
//!
//! Arena-backed DOM. Nodes are never freed: detaching a node only unlinks it
//! from its parent, so a stale [`NodeId`] always resolves to *something* and
//! callers check [`DomTree::is_attached`] when it matters.

/// Index of a node inside one [`DomTree`].
///
/// Ids are only meaningful for the tree that created them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Payload of a node
#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    /// Root of every tree (always `NodeId(0)`)
    Document,

    Doctype {
        name: String,
        public_id: String,
        system_id: String,
    },

    /// Element with attributes in source order
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
    },

    Text(String),

    Comment(String),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub data: NodeData,
}

/// Arena document tree
#[derive(Debug, Clone)]
pub struct DomTree {
    nodes: Vec<Node>,
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DomTree {
    /// Create an empty tree holding only the document node
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                data: NodeData::Document,
            }],
        }
    }

    pub fn document(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0].data
    }

    /// Number of nodes ever allocated (attached or not)
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes[0].children.is_empty()
    }

    // ---------------------------------------------------------------------
    // Creation
    // ---------------------------------------------------------------------

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            data,
        });
        id
    }

    pub fn create_element(&mut self, tag: impl Into<String>) -> NodeId {
        self.push(NodeData::Element {
            tag: tag.into().to_ascii_lowercase(),
            attrs: Vec::new(),
        })
    }

    pub fn create_element_with_attrs(
        &mut self,
        tag: impl Into<String>,
        attrs: Vec<(String, String)>,
    ) -> NodeId {
        self.push(NodeData::Element {
            tag: tag.into().to_ascii_lowercase(),
            attrs,
        })
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeData::Text(text.into()))
    }

    pub fn create_comment(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeData::Comment(text.into()))
    }

    pub fn create_doctype(
        &mut self,
        name: impl Into<String>,
        public_id: impl Into<String>,
        system_id: impl Into<String>,
    ) -> NodeId {
        self.push(NodeData::Doctype {
            name: name.into(),
            public_id: public_id.into(),
            system_id: system_id.into(),
        })
    }

    // ---------------------------------------------------------------------
    // Structure
    // ---------------------------------------------------------------------

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Element children only
    pub fn child_elements(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|c| self.is_element(*c))
            .collect()
    }

    /// Unlink a node from its parent. No-op for unparented nodes.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|c| *c != id);
        }
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Insert `child` into `parent` at `index` (clamped to the child count)
    pub fn insert_at(&mut self, parent: NodeId, index: usize, child: NodeId) {
        self.detach(child);
        let children = &mut self.nodes[parent.0].children;
        let index = index.min(children.len());
        children.insert(index, child);
        self.nodes[child.0].parent = Some(parent);
    }

    /// Insert `child` before `reference`, or append when `reference` is `None`
    /// or not a child of `parent`.
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
        self.detach(child);
        let position = reference.and_then(|r| self.children(parent).iter().position(|c| *c == r));
        match position {
            Some(index) => self.insert_at(parent, index, child),
            None => self.append_child(parent, child),
        }
    }

    /// Remove a node and its subtree from the document.
    ///
    /// Returns `false` (and does nothing) for the document node itself or an
    /// already detached node.
    pub fn remove(&mut self, id: NodeId) -> bool {
        if id == self.document() || self.nodes[id.0].parent.is_none() {
            return false;
        }
        self.detach(id);
        true
    }

    /// Replace every child of `id` with `children`
    pub fn replace_children(&mut self, id: NodeId, children: Vec<NodeId>) {
        for old in self.nodes[id.0].children.clone() {
            self.nodes[old.0].parent = None;
        }
        self.nodes[id.0].children.clear();
        for child in children {
            self.append_child(id, child);
        }
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|c| *c == id)
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        index.checked_sub(1).map(|i| self.children(parent)[i])
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        self.children(parent).get(index + 1).copied()
    }

    /// Whether `id` is reachable from the document node
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == self.document() {
                return true;
            }
            match self.parent(current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    pub fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = self.parent(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// Nearest inclusive ancestor element with the given tag
    pub fn closest(&self, id: NodeId, tag: &str) -> Option<NodeId> {
        let mut current = Some(id);
        while let Some(node) = current {
            if self.tag(node) == Some(tag) {
                return Some(node);
            }
            current = self.parent(node);
        }
        None
    }

    /// All nodes below `root` in document order (excluding `root`)
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(root).iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        out
    }

    /// Attached elements in document order
    pub fn elements(&self) -> Vec<NodeId> {
        self.descendants(self.document())
            .into_iter()
            .filter(|id| self.is_element(*id))
            .collect()
    }

    pub fn elements_by_tag(&self, tag: &str) -> Vec<NodeId> {
        self.descendants(self.document())
            .into_iter()
            .filter(|id| self.tag(*id) == Some(tag))
            .collect()
    }

    /// First attached element carrying `name="value"`
    pub fn find_by_attr(&self, name: &str, value: &str) -> Option<NodeId> {
        self.descendants(self.document())
            .into_iter()
            .find(|id| self.attr(*id, name) == Some(value))
    }

    pub fn document_element(&self) -> Option<NodeId> {
        self.children(self.document())
            .iter()
            .copied()
            .find(|id| self.is_element(*id))
    }

    pub fn head(&self) -> Option<NodeId> {
        let html = self.document_element()?;
        self.children(html)
            .iter()
            .copied()
            .find(|id| self.tag(*id) == Some("head"))
    }

    pub fn body(&self) -> Option<NodeId> {
        let html = self.document_element()?;
        self.children(html)
            .iter()
            .copied()
            .find(|id| self.tag(*id) == Some("body"))
    }

    pub fn doctype(&self) -> Option<NodeId> {
        self.children(self.document())
            .iter()
            .copied()
            .find(|id| matches!(self.data(*id), NodeData::Doctype { .. }))
    }

    // ---------------------------------------------------------------------
    // Elements and attributes
    // ---------------------------------------------------------------------

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.data(id), NodeData::Element { .. })
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match self.data(id) {
            NodeData::Element { tag, .. } => Some(tag.as_str()),
            _ => None,
        }
    }

    pub fn attrs(&self, id: NodeId) -> &[(String, String)] {
        match self.data(id) {
            NodeData::Element { attrs, .. } => attrs,
            _ => &[],
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attrs(id)
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.attr(id, name).is_some()
    }

    /// Set (or overwrite in place) an attribute. Ignored on non-elements.
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        if let NodeData::Element { attrs, .. } = &mut self.nodes[id.0].data {
            let value = value.into();
            match attrs.iter_mut().find(|(n, _)| n == name) {
                Some((_, existing)) => *existing = value,
                None => attrs.push((name.to_string(), value)),
            }
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> Option<String> {
        if let NodeData::Element { attrs, .. } = &mut self.nodes[id.0].data {
            let index = attrs.iter().position(|(n, _)| n == name)?;
            return Some(attrs.remove(index).1);
        }
        None
    }

    /// Drop every attribute matching `predicate`, returning how many went
    pub fn retain_attrs(&mut self, id: NodeId, mut keep: impl FnMut(&str, &str) -> bool) -> usize {
        if let NodeData::Element { attrs, .. } = &mut self.nodes[id.0].data {
            let before = attrs.len();
            attrs.retain(|(n, v)| keep(n, v));
            return before - attrs.len();
        }
        0
    }

    pub fn classes(&self, id: NodeId) -> Vec<&str> {
        self.attr(id, "class")
            .map(|c| c.split_ascii_whitespace().collect())
            .unwrap_or_default()
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.classes(id).contains(&class)
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if self.has_class(id, class) {
            return;
        }
        let mut classes: Vec<String> = self.classes(id).into_iter().map(str::to_string).collect();
        classes.push(class.to_string());
        self.set_attr(id, "class", classes.join(" "));
    }

    /// Remove a class; the `class` attribute itself goes when it empties
    pub fn remove_class(&mut self, id: NodeId, class: &str) -> bool {
        if !self.has_class(id, class) {
            return false;
        }
        let classes: Vec<String> = self
            .classes(id)
            .into_iter()
            .filter(|c| *c != class)
            .map(str::to_string)
            .collect();
        if classes.is_empty() {
            self.remove_attr(id, "class");
        } else {
            self.set_attr(id, "class", classes.join(" "));
        }
        true
    }

    // ---------------------------------------------------------------------
    // Text
    // ---------------------------------------------------------------------

    /// Concatenated text of every descendant text node
    pub fn text_content(&self, id: NodeId) -> String {
        if let NodeData::Text(text) = self.data(id) {
            return text.clone();
        }
        self.descendants(id)
            .into_iter()
            .filter_map(|n| match self.data(n) {
                NodeData::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Replace all children with a single text node
    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) {
        let node = self.create_text(text);
        self.replace_children(id, vec![node]);
    }

    pub fn set_text_data(&mut self, id: NodeId, text: impl Into<String>) {
        if let NodeData::Text(existing) = &mut self.nodes[id.0].data {
            *existing = text.into();
        }
    }

    // ---------------------------------------------------------------------
    // Copying
    // ---------------------------------------------------------------------

    /// Detached deep copy of a subtree within this tree
    pub fn deep_clone(&mut self, id: NodeId) -> NodeId {
        let data = self.data(id).clone();
        let copy = self.push(data);
        for child in self.children(id).to_vec() {
            let child_copy = self.deep_clone(child);
            self.append_child(copy, child_copy);
        }
        copy
    }

    /// Detached deep copy of a subtree from another tree
    pub fn import(&mut self, source: &DomTree, id: NodeId) -> NodeId {
        let copy = self.push(source.data(id).clone());
        for child in source.children(id) {
            let child_copy = self.import(source, *child);
            self.append_child(copy, child_copy);
        }
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (DomTree, NodeId, NodeId, NodeId) {
        let mut tree = DomTree::new();
        let html = tree.create_element("html");
        let body = tree.create_element("BODY");
        let p = tree.create_element("p");
        let text = tree.create_text("hello");
        tree.append_child(tree.document(), html);
        tree.append_child(html, body);
        tree.append_child(body, p);
        tree.append_child(p, text);
        (tree, html, body, p)
    }

    #[test]
    fn test_tags_are_lowercased() {
        let (tree, _, body, _) = sample();
        assert_eq!(tree.tag(body), Some("body"));
        assert_eq!(tree.body(), Some(body));
    }

    #[test]
    fn test_document_cannot_be_removed() {
        let (mut tree, _, _, p) = sample();
        let doc = tree.document();
        assert!(!tree.remove(doc));
        assert!(tree.remove(p));
        assert!(!tree.is_attached(p));
        // second removal is a no-op
        assert!(!tree.remove(p));
    }

    #[test]
    fn test_set_attr_preserves_order() {
        let (mut tree, _, _, p) = sample();
        tree.set_attr(p, "id", "a");
        tree.set_attr(p, "class", "b");
        tree.set_attr(p, "id", "c");
        assert_eq!(
            tree.attrs(p),
            &[("id".to_string(), "c".to_string()), ("class".to_string(), "b".to_string())]
        );
    }

    #[test]
    fn test_class_helpers() {
        let (mut tree, _, _, p) = sample();
        tree.add_class(p, "one");
        tree.add_class(p, "two");
        tree.add_class(p, "one");
        assert_eq!(tree.attr(p, "class"), Some("one two"));
        assert!(tree.remove_class(p, "one"));
        assert!(tree.remove_class(p, "two"));
        assert_eq!(tree.attr(p, "class"), None);
    }

    #[test]
    fn test_descendants_in_document_order() {
        let (mut tree, html, body, p) = sample();
        let span = tree.create_element("span");
        tree.append_child(body, span);
        let order: Vec<_> = tree.elements();
        assert_eq!(order, vec![html, body, p, span]);
    }

    #[test]
    fn test_insert_before_and_siblings() {
        let (mut tree, _, body, p) = sample();
        let h1 = tree.create_element("h1");
        tree.insert_before(body, h1, Some(p));
        assert_eq!(tree.children(body), &[h1, p]);
        assert_eq!(tree.next_sibling(h1), Some(p));
        assert_eq!(tree.previous_sibling(p), Some(h1));
    }

    #[test]
    fn test_import_copies_subtree() {
        let (source, _, body, _) = sample();
        let mut target = DomTree::new();
        let copy = target.import(&source, body);
        target.append_child(target.document(), copy);
        assert_eq!(target.text_content(copy), "hello");
        assert_eq!(target.elements_by_tag("p").len(), 1);
    }

    #[test]
    fn test_closest_is_inclusive() {
        let (mut tree, _, body, p) = sample();
        let a = tree.create_element("a");
        tree.append_child(body, a);
        tree.append_child(a, p);
        assert_eq!(tree.closest(p, "a"), Some(a));
        assert_eq!(tree.closest(a, "a"), Some(a));
        assert!(tree.is_ancestor(a, p));
    }
}
