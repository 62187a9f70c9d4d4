//! Arena-backed document tree
//!
//! Nodes are stored in a flat arena and addressed by [`NodeId`] handles, so
//! parent links never form ownership cycles and identity comparison is a
//! plain handle comparison. A tree is either the parsed template, the output
//! document under construction, or a small detached fragment (e.g. a
//! generated `w:drawing` subtree) living inside one of the former.

use std::collections::BTreeMap;

/// Tag names with walker-level semantics.
pub mod tags {
    pub const T: &str = "w:t";
    pub const R: &str = "w:r";
    pub const P: &str = "w:p";
    pub const RPR: &str = "w:rPr";
    pub const TBL: &str = "w:tbl";
    pub const TR: &str = "w:tr";
    pub const TC: &str = "w:tc";
    pub const DOCPR: &str = "wp:docPr";
    pub const VSHAPE: &str = "v:shape";
    pub const ALTCHUNK: &str = "w:altChunk";
}

/// Handle to a node inside a [`Tree`].
///
/// Handles are only meaningful for the tree that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// Payload of a node: an element with tag and attributes, or raw text.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Element {
        tag: String,
        attrs: BTreeMap<String, String>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct NodeData {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind,
    /// Label assigned to IF / END-IF command nodes so the closing command can
    /// find its opener across loop iterations.
    name: Option<String>,
}

/// An ordered tree of element and text nodes.
#[derive(Debug, Clone, Default)]
pub struct Tree {
    nodes: Vec<NodeData>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            parent: None,
            children: Vec::new(),
            kind,
            name: None,
        });
        id
    }

    /// Create a detached element node.
    pub fn element<S: Into<String>>(&mut self, tag: S, attrs: BTreeMap<String, String>) -> NodeId {
        self.push(NodeKind::Element {
            tag: tag.into(),
            attrs,
        })
    }

    /// Create a detached text node.
    pub fn text_node<S: Into<String>>(&mut self, text: S) -> NodeId {
        self.push(NodeKind::Text(text.into()))
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    /// Element tag, or `None` for text nodes.
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].kind {
            NodeKind::Element { tag, .. } => Some(tag),
            NodeKind::Text(_) => None,
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.nodes[id.0].kind, NodeKind::Element { .. })
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.nodes[id.0].kind, NodeKind::Text(_))
    }

    /// Text content, or `None` for elements.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].kind {
            NodeKind::Text(text) => Some(text),
            NodeKind::Element { .. } => None,
        }
    }

    pub fn set_text(&mut self, id: NodeId, text: String) {
        if let NodeKind::Text(t) = &mut self.nodes[id.0].kind {
            *t = text;
        }
    }

    pub fn attrs(&self, id: NodeId) -> Option<&BTreeMap<String, String>> {
        match &self.nodes[id.0].kind {
            NodeKind::Element { attrs, .. } => Some(attrs),
            NodeKind::Text(_) => None,
        }
    }

    pub fn attr(&self, id: NodeId, key: &str) -> Option<&str> {
        self.attrs(id).and_then(|a| a.get(key)).map(String::as_str)
    }

    pub fn set_attr(&mut self, id: NodeId, key: &str, value: String) {
        if let NodeKind::Element { attrs, .. } = &mut self.nodes[id.0].kind {
            attrs.insert(key.to_string(), value);
        }
    }

    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.nodes[id.0].name.as_deref()
    }

    pub fn set_name(&mut self, id: NodeId, name: String) {
        self.nodes[id.0].name = Some(name);
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].children.first().copied()
    }

    /// Append `child` to `parent`, re-parenting the child.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Insert `child` into `parent`'s children at `index`.
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.insert(index, child);
    }

    /// Remove and return the last child of `parent`.
    ///
    /// The removed node stays in the arena with its parent link intact, so a
    /// cursor standing on it can still navigate upward.
    pub fn pop_child(&mut self, parent: NodeId) -> Option<NodeId> {
        self.nodes[parent.0].children.pop()
    }

    /// The sibling that follows `id` under its parent, located by handle
    /// identity.
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let siblings = self.children(parent);
        let idx = siblings.iter().position(|&s| s == id)?;
        siblings.get(idx + 1).copied()
    }

    /// Position of `id` within its parent's children.
    pub fn child_index(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&s| s == id)
    }

    /// Copy a single node from `src` into this tree: tag and attributes (or
    /// text) are preserved, children are dropped, parent is none.
    pub fn adopt_shallow(&mut self, src: &Tree, id: NodeId) -> NodeId {
        self.push(src.nodes[id.0].kind.clone())
    }

    /// Copy a single node within this tree, children dropped, detached.
    pub fn clone_shallow(&mut self, id: NodeId) -> NodeId {
        self.push(self.nodes[id.0].kind.clone())
    }

    /// Deep-copy the subtree rooted at `id` within this tree; the copy is
    /// detached.
    pub fn clone_deep(&mut self, id: NodeId) -> NodeId {
        let copy = self.push(self.nodes[id.0].kind.clone());
        let children: Vec<NodeId> = self.nodes[id.0].children.clone();
        for child in children {
            let child_copy = self.clone_deep(child);
            self.append_child(copy, child_copy);
        }
        copy
    }

    /// Nodes of the subtree rooted at `id` in document order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            order.push(node);
            for &child in self.children(node).iter().rev() {
                stack.push(child);
            }
        }
        order
    }
}

/// Convenience constructor for attribute maps.
pub fn attrs<const N: usize>(pairs: [(&str, &str); N]) -> BTreeMap<String, String> {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Tree, NodeId, NodeId, NodeId) {
        let mut tree = Tree::new();
        let root = tree.element("w:body", BTreeMap::new());
        let p1 = tree.element("w:p", BTreeMap::new());
        let p2 = tree.element("w:p", BTreeMap::new());
        tree.append_child(root, p1);
        tree.append_child(root, p2);
        (tree, root, p1, p2)
    }

    #[test]
    fn test_next_sibling_by_identity() {
        let (tree, _root, p1, p2) = sample();
        assert_eq!(tree.next_sibling(p1), Some(p2));
        assert_eq!(tree.next_sibling(p2), None);
    }

    #[test]
    fn test_pop_child_keeps_parent_link() {
        let (mut tree, root, _p1, p2) = sample();
        assert_eq!(tree.pop_child(root), Some(p2));
        assert_eq!(tree.children(root).len(), 1);
        // The popped node can still navigate upward.
        assert_eq!(tree.parent(p2), Some(root));
    }

    #[test]
    fn test_adopt_shallow_drops_children() {
        let (tree, root, _p1, _p2) = sample();
        let mut out = Tree::new();
        let copy = out.adopt_shallow(&tree, root);
        assert_eq!(out.tag(copy), Some("w:body"));
        assert!(out.children(copy).is_empty());
        assert_eq!(out.parent(copy), None);
    }

    #[test]
    fn test_clone_deep() {
        let mut tree = Tree::new();
        let rpr = tree.element("w:rPr", BTreeMap::new());
        let bold = tree.element("w:b", attrs([("w:val", "1")]));
        tree.append_child(rpr, bold);

        let copy = tree.clone_deep(rpr);
        assert_ne!(copy, rpr);
        assert_eq!(tree.children(copy).len(), 1);
        let copied_bold = tree.children(copy)[0];
        assert_eq!(tree.attr(copied_bold, "w:val"), Some("1"));
    }

    #[test]
    fn test_descendants_document_order() {
        let (mut tree, root, p1, p2) = sample();
        let r = tree.element("w:r", BTreeMap::new());
        tree.append_child(p1, r);
        assert_eq!(tree.descendants(root), vec![root, p1, r, p2]);
    }
}
