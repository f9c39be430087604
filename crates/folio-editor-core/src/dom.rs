//! Arena-backed document tree for the visual editing surface.
//!
//! Nodes live in a [`SlotMap`] and refer to each other by [`NodeId`], so
//! parent/child links are plain keys rather than pointers. A removed node's
//! key goes stale instead of dangling: lookups on it return `None`.
//!
//! Text offsets inside text nodes are counted in chars (Unicode scalar
//! values), not bytes or UTF-16 units.

use slotmap::{SlotMap, new_key_type};
use smol_str::SmolStr;

new_key_type! {
    /// Handle to a node in a [`VisualTree`].
    pub struct NodeId;
}

/// Elements that never have children and serialize without a closing tag.
pub const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Phrasing elements that may sit inside a paragraph.
pub const INLINE_TAGS: &[&str] = &[
    "a", "abbr", "b", "bdi", "bdo", "br", "cite", "code", "del", "dfn", "em", "font", "i", "img",
    "ins", "kbd", "mark", "q", "s", "samp", "small", "span", "strike", "strong", "sub", "sup",
    "time", "u", "var", "wbr",
];

pub fn is_void_tag(tag: &str) -> bool {
    VOID_TAGS.contains(&tag)
}

pub fn is_inline_tag(tag: &str) -> bool {
    INLINE_TAGS.contains(&tag)
}

/// Number of chars in a string.
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Byte index of the given char offset, clamped to the end of the string.
pub fn byte_index(s: &str, char_offset: usize) -> usize {
    s.char_indices()
        .nth(char_offset)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Iterate `property: value` pairs of an inline style attribute.
pub fn style_declarations(style: &str) -> impl Iterator<Item = (&str, &str)> {
    style.split(';').filter_map(|decl| {
        let (prop, value) = decl.split_once(':')?;
        let prop = prop.trim();
        if prop.is_empty() {
            None
        } else {
            Some((prop, value.trim()))
        }
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: SmolStr,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub tag: SmolStr,
    pub attrs: Vec<Attribute>,
}

impl Element {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: SmolStr::new(tag.to_ascii_lowercase()),
            attrs: Vec::new(),
        }
    }

    pub fn with_attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
            .map(|a| a.value.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }

    /// Set an attribute, keeping its position if it already exists.
    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self
            .attrs
            .iter_mut()
            .find(|a| a.name.eq_ignore_ascii_case(name))
        {
            Some(existing) => existing.value = value,
            None => self.attrs.push(Attribute {
                name: SmolStr::new(name.to_ascii_lowercase()),
                value,
            }),
        }
    }

    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let idx = self
            .attrs
            .iter()
            .position(|a| a.name.eq_ignore_ascii_case(name))?;
        Some(self.attrs.remove(idx).value)
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or("").split_ascii_whitespace()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }

    /// Value of a declaration in the inline `style` attribute.
    pub fn style(&self, property: &str) -> Option<&str> {
        style_declarations(self.attr("style")?)
            .find(|(prop, _)| prop.eq_ignore_ascii_case(property))
            .map(|(_, value)| value)
    }

    pub fn is_void(&self) -> bool {
        is_void_tag(&self.tag)
    }

    pub fn is_inline(&self) -> bool {
        is_inline_tag(&self.tag)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Element(Element),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// The visual document: an editable root element and everything below it.
#[derive(Debug, Clone)]
pub struct VisualTree {
    nodes: SlotMap<NodeId, NodeData>,
    root: NodeId,
}

impl Default for VisualTree {
    fn default() -> Self {
        Self::new()
    }
}

impl VisualTree {
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(NodeData {
            kind: NodeKind::Element(Element::new("body")),
            parent: None,
            children: Vec::new(),
        });
        Self { nodes, root }
    }

    /// The editable root. It is never serialized itself, only its children.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Whether the node still exists (it may be detached).
    pub fn is_alive(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Whether the node exists and is reachable from the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        self.is_alive(id) && self.is_inclusive_ancestor(self.root, id)
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.nodes.get(id).map(|n| &n.kind)
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match self.kind(id)? {
            NodeKind::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes.get_mut(id)?.kind {
            NodeKind::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|el| el.tag.as_str())
    }

    pub fn is_tag(&self, id: NodeId, tag: &str) -> bool {
        self.tag(id) == Some(tag)
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.kind(id)? {
            NodeKind::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn text_mut(&mut self, id: NodeId) -> Option<&mut String> {
        match &mut self.nodes.get_mut(id)?.kind {
            NodeKind::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        self.text(id).is_some()
    }

    /// Length of a node for boundary-point purposes: chars for text and
    /// comments, child count for elements.
    pub fn node_len(&self, id: NodeId) -> usize {
        match self.kind(id) {
            Some(NodeKind::Text(s)) | Some(NodeKind::Comment(s)) => char_len(s),
            Some(NodeKind::Element(_)) => self.children(id).len(),
            None => 0,
        }
    }

    // === Structure queries ===

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id)?.parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).first().copied()
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).last().copied()
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let idx = self.index_in_parent(id)?;
        self.children(parent).get(idx + 1).copied()
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let idx = self.index_in_parent(id)?;
        idx.checked_sub(1)
            .and_then(|i| self.children(parent).get(i).copied())
    }

    /// The node itself followed by each of its ancestors, up to and
    /// including the top of whatever subtree it sits in.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.is_alive(id).then_some(id), move |&n| self.parent(n))
    }

    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.ancestors(node).any(|n| n == ancestor)
    }

    /// All nodes of a subtree in document order, the subtree root first.
    pub fn preorder(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            if !self.is_alive(n) {
                continue;
            }
            out.push(n);
            stack.extend(self.children(n).iter().rev().copied());
        }
        out
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self, id: NodeId) -> String {
        self.preorder(id)
            .into_iter()
            .filter_map(|n| self.text(n))
            .collect()
    }

    // === Creation ===

    pub fn create(&mut self, kind: NodeKind) -> NodeId {
        self.nodes.insert(NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        })
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.create(NodeKind::Element(Element::new(tag)))
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.create(NodeKind::Text(text.into()))
    }

    /// Copy of the node without its children.
    pub fn shallow_clone(&mut self, id: NodeId) -> Option<NodeId> {
        let kind = self.kind(id)?.clone();
        Some(self.create(kind))
    }

    /// Copy a subtree of another tree into this one, returning the detached
    /// copy of each child of `from_parent`.
    pub fn import_children(&mut self, other: &VisualTree, from_parent: NodeId) -> Vec<NodeId> {
        other
            .children(from_parent)
            .iter()
            .filter_map(|&child| self.import_subtree(other, child))
            .collect()
    }

    fn import_subtree(&mut self, other: &VisualTree, node: NodeId) -> Option<NodeId> {
        let copy = self.create(other.kind(node)?.clone());
        for &child in other.children(node) {
            if let Some(child_copy) = self.import_subtree(other, child) {
                self.append_child(copy, child_copy);
            }
        }
        Some(copy)
    }

    // === Mutation ===

    /// Remove a node from its parent, keeping it (and its subtree) alive.
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.retain(|&c| c != id);
        }
        if let Some(n) = self.nodes.get_mut(id) {
            n.parent = None;
        }
    }

    /// Detach a node and free it together with its whole subtree.
    pub fn remove(&mut self, id: NodeId) {
        if id == self.root {
            return;
        }
        self.detach(id);
        for n in self.preorder(id) {
            self.nodes.remove(n);
        }
    }

    /// Insert `child` into `parent` at `index` (clamped), detaching it from
    /// wherever it was first.
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        if child == self.root || self.is_inclusive_ancestor(child, parent) {
            return;
        }
        self.detach(child);
        let Some(p) = self.nodes.get_mut(parent) else {
            return;
        };
        let index = index.min(p.children.len());
        p.children.insert(index, child);
        if let Some(c) = self.nodes.get_mut(child) {
            c.parent = Some(parent);
        }
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        let len = self.children(parent).len();
        self.insert_child(parent, len, child);
    }

    pub fn insert_after(&mut self, reference: NodeId, new_node: NodeId) {
        let (Some(parent), Some(idx)) = (self.parent(reference), self.index_in_parent(reference))
        else {
            return;
        };
        self.insert_child(parent, idx + 1, new_node);
    }

    pub fn insert_before(&mut self, reference: NodeId, new_node: NodeId) {
        let (Some(parent), Some(idx)) = (self.parent(reference), self.index_in_parent(reference))
        else {
            return;
        };
        self.insert_child(parent, idx, new_node);
    }

    /// Put `new_node` where `old` is and free `old`.
    pub fn replace(&mut self, old: NodeId, new_node: NodeId) {
        self.insert_before(old, new_node);
        self.remove(old);
    }

    /// Move every child of `from` to the end of `to`.
    pub fn move_children(&mut self, from: NodeId, to: NodeId) {
        let children = self.children(from).to_vec();
        for child in children {
            self.append_child(to, child);
        }
    }

    /// Wrap `node` in a fresh element, which takes its place.
    pub fn wrap(&mut self, node: NodeId, tag: &str) -> NodeId {
        let wrapper = self.create_element(tag);
        self.insert_before(node, wrapper);
        self.append_child(wrapper, node);
        wrapper
    }

    /// Replace an element by its children.
    pub fn unwrap(&mut self, id: NodeId) {
        let children = self.children(id).to_vec();
        for child in children {
            self.insert_before(id, child);
        }
        self.remove(id);
    }

    /// Change an element's tag in place, keeping its id, attributes and
    /// children.
    pub fn retag(&mut self, id: NodeId, tag: &str) {
        if let Some(el) = self.element_mut(id) {
            el.tag = SmolStr::new(tag.to_ascii_lowercase());
        }
    }

    /// Split a text node at a char offset. The tail moves into a new text
    /// node inserted right after it, which is returned.
    pub fn split_text(&mut self, id: NodeId, offset: usize) -> Option<NodeId> {
        let text = self.text_mut(id)?;
        let at = byte_index(text, offset);
        let tail = text.split_off(at);
        let tail_node = self.create_text(tail);
        if self.parent(id).is_some() {
            self.insert_after(id, tail_node);
        }
        Some(tail_node)
    }

    /// Whether a node has no visible content: only `<br>`s, whitespace text
    /// and empty inline wrappers below it.
    pub fn is_blank(&self, id: NodeId) -> bool {
        self.preorder(id).into_iter().all(|n| match self.kind(n) {
            Some(NodeKind::Text(s)) => s.trim().is_empty(),
            Some(NodeKind::Comment(_)) => true,
            Some(NodeKind::Element(el)) => {
                n == id || el.tag == "br" || (el.is_inline() && !el.is_void())
            }
            None => true,
        })
    }
}

/// A DOM boundary point: a char offset inside a text node, or a child index
/// inside an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub node: NodeId,
    pub offset: usize,
}

impl Position {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }

    /// Boundary point just before `node` in its parent.
    pub fn before(tree: &VisualTree, node: NodeId) -> Option<Self> {
        Some(Self::new(tree.parent(node)?, tree.index_in_parent(node)?))
    }

    /// Boundary point just after `node` in its parent.
    pub fn after(tree: &VisualTree, node: NodeId) -> Option<Self> {
        Some(Self::new(tree.parent(node)?, tree.index_in_parent(node)? + 1))
    }

    /// The point is still usable: its node is attached under the root and
    /// the offset is in bounds.
    pub fn is_valid(&self, tree: &VisualTree) -> bool {
        tree.is_attached(self.node) && self.offset <= tree.node_len(self.node)
    }
}

/// A start/end pair of boundary points. `start` doubles as the selection
/// anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomRange {
    pub start: Position,
    pub end: Position,
}

impl DomRange {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    pub fn collapsed(at: Position) -> Self {
        Self { start: at, end: at }
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }

    pub fn is_valid(&self, tree: &VisualTree) -> bool {
        self.start.is_valid(tree) && self.end.is_valid(tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removed_node_key_goes_stale() {
        let mut tree = VisualTree::new();
        let p = tree.create_element("p");
        let text = tree.create_text("hello");
        tree.append_child(tree.root(), p);
        tree.append_child(p, text);

        tree.remove(p);
        assert!(!tree.is_alive(p));
        assert!(!tree.is_alive(text));
        assert!(tree.children(tree.root()).is_empty());
        assert_eq!(tree.text(text), None);
    }

    #[test]
    fn test_split_text_by_chars() {
        let mut tree = VisualTree::new();
        let text = tree.create_text("詳しくはこちら");
        tree.append_child(tree.root(), text);

        let tail = tree.split_text(text, 4).unwrap();
        assert_eq!(tree.text(text), Some("詳しくは"));
        assert_eq!(tree.text(tail), Some("こちら"));
        assert_eq!(tree.next_sibling(text), Some(tail));
    }

    #[test]
    fn test_insert_child_refuses_cycles() {
        let mut tree = VisualTree::new();
        let outer = tree.create_element("div");
        let inner = tree.create_element("div");
        tree.append_child(tree.root(), outer);
        tree.append_child(outer, inner);

        tree.append_child(inner, outer);
        assert_eq!(tree.parent(outer), Some(tree.root()));
        assert_eq!(tree.parent(inner), Some(outer));
    }

    #[test]
    fn test_wrap_and_unwrap() {
        let mut tree = VisualTree::new();
        let text = tree.create_text("x");
        tree.append_child(tree.root(), text);

        let p = tree.wrap(text, "p");
        assert_eq!(tree.children(tree.root()), &[p]);
        assert_eq!(tree.parent(text), Some(p));

        tree.unwrap(p);
        assert_eq!(tree.children(tree.root()), &[text]);
        assert!(!tree.is_alive(p));
    }

    #[test]
    fn test_style_lookup() {
        let el = Element::new("DIV").with_attr("style", "background:#eff6ff; Border-Left: 4px solid #3b82f6;");
        assert_eq!(el.tag, "div");
        assert_eq!(el.style("border-left"), Some("4px solid #3b82f6"));
        assert_eq!(el.style("color"), None);
    }

    #[test]
    fn test_blank_detection() {
        let mut tree = VisualTree::new();
        let p = tree.create_element("p");
        let br = tree.create_element("br");
        let ws = tree.create_text("  ");
        tree.append_child(tree.root(), p);
        tree.append_child(p, br);
        tree.append_child(p, ws);
        assert!(tree.is_blank(p));

        let img = tree.create_element("img");
        tree.append_child(p, img);
        assert!(!tree.is_blank(p));
    }
}
