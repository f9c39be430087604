//! Structured edit operations on the visual tree.
//!
//! These stand in for the host's rich-text editing primitive: every change
//! the editor makes to the tree in visual mode goes through
//! [`StructuredEdit`]. Operations take boundary points, return where the
//! cursor should go, and never fail. A position that no longer fits the
//! tree degrades to a no-op.

use std::collections::HashMap;

use crate::actions::{BlockFormat, EditCommand, InlineStyle, ListKind};
use crate::dom::{DomRange, NodeId, Position, VisualTree, byte_index, char_len};

/// Inline presentation applied to a range by wrapping it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextStyle {
    Color(String),
    Highlight(String),
    /// Font size step, clamped to 1..=5.
    FontSize(u8),
}

pub trait StructuredEdit {
    /// Insert plain text, returning the point right after it.
    fn insert_text(&mut self, at: Position, text: &str) -> Position;

    /// Insert a `<br>`.
    fn insert_line_break(&mut self, at: Position) -> Position;

    /// Split the enclosing block in two, returning the start of the second
    /// half.
    fn split_paragraph(&mut self, at: Position) -> Position;

    /// Remove everything between the two boundary points, merging the
    /// blocks at either end.
    fn delete_range(&mut self, range: DomRange) -> Position;

    /// Insert detached nodes at a point. If any of them is a block, the
    /// enclosing paragraph is split around them. Returns the point right
    /// after the last inserted node.
    fn insert_nodes(&mut self, at: Position, nodes: &[NodeId]) -> Position;

    /// Wrap the selected inline content in links. A collapsed range gets a
    /// new link whose text is the URL. Returns the anchors created.
    fn wrap_in_link(&mut self, range: DomRange, href: &str) -> Vec<NodeId>;

    fn toggle_inline(&mut self, range: DomRange, style: InlineStyle) -> Option<DomRange>;

    fn apply_text_style(&mut self, range: DomRange, style: &TextStyle) -> Option<DomRange>;

    /// Change the block around a point into a paragraph or heading.
    fn format_block(&mut self, at: Position, format: BlockFormat) -> bool;

    /// Turn the block around a point into a list item, or back out of a
    /// list of the same kind.
    fn toggle_list(&mut self, at: Position, kind: ListKind) -> bool;
}

/// Apply a toolbar command to a selection. Returns the selection to show
/// afterwards, or `None` if nothing changed.
pub fn execute<E: StructuredEdit>(doc: &mut E, command: &EditCommand, range: DomRange) -> Option<DomRange> {
    match command {
        EditCommand::ToggleInline(style) => doc.toggle_inline(range, *style),
        EditCommand::ForeColor(color) => doc.apply_text_style(range, &TextStyle::Color(color.clone())),
        EditCommand::HiliteColor(color) => {
            doc.apply_text_style(range, &TextStyle::Highlight(color.clone()))
        }
        EditCommand::FontSize(size) => doc.apply_text_style(range, &TextStyle::FontSize(*size)),
        EditCommand::FormatBlock(format) => doc.format_block(range.start, *format).then_some(range),
        EditCommand::ToggleList(kind) => doc.toggle_list(range.start, *kind).then_some(range),
    }
}

// === Tree helpers ===

/// Text, comments and phrasing elements.
pub fn is_inline_node(tree: &VisualTree, node: NodeId) -> bool {
    tree.element(node).is_none_or(|el| el.is_inline())
}

/// Nearest block-level element containing `node`, below the root.
pub fn enclosing_block(tree: &VisualTree, node: NodeId) -> Option<NodeId> {
    tree.ancestors(node)
        .take_while(|&n| n != tree.root())
        .find(|&n| tree.element(n).is_some_and(|el| !el.is_inline() && !el.is_void()))
}

fn is_paragraph_like(tree: &VisualTree, node: NodeId) -> bool {
    match tree.element(node) {
        Some(el) => {
            matches!(el.tag.as_str(), "p" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "pre")
                || (el.tag == "div" && el.attrs.is_empty())
        }
        None => false,
    }
}

/// Wrap the run of inline siblings around `node` in a new element.
pub fn wrap_inline_run(tree: &mut VisualTree, node: NodeId, tag: &str) -> NodeId {
    let mut first = node;
    while let Some(prev) = tree.prev_sibling(first).filter(|&p| is_inline_node(tree, p)) {
        first = prev;
    }
    let mut run = vec![first];
    let mut current = first;
    while let Some(next) = tree.next_sibling(current).filter(|&n| is_inline_node(tree, n)) {
        run.push(next);
        current = next;
    }
    let wrapper = tree.create_element(tag);
    tree.insert_before(first, wrapper);
    for n in run {
        tree.append_child(wrapper, n);
    }
    wrapper
}

/// Give an empty block a `<br>` so it keeps its height.
fn ensure_filler(tree: &mut VisualTree, block: NodeId) {
    if !tree.is_alive(block) || tree.element(block).is_none_or(|el| el.is_void()) {
        return;
    }
    let has_br = tree.preorder(block).into_iter().any(|n| tree.is_tag(n, "br"));
    if tree.is_blank(block) && !has_br {
        let br = tree.create_element("br");
        tree.append_child(block, br);
    }
}

/// First caret position inside a node.
pub fn start_of(tree: &VisualTree, node: NodeId) -> Position {
    let mut current = node;
    while let Some(first) = tree.first_child(current) {
        if tree.is_text(first) {
            return Position::new(first, 0);
        }
        match tree.element(first) {
            Some(el) if !el.is_void() => current = first,
            _ => break,
        }
    }
    Position::new(current, 0)
}

/// A point between children, stable while siblings come and go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Boundary {
    Before(NodeId),
    End(NodeId),
}

impl Boundary {
    fn container(self, tree: &VisualTree) -> Option<NodeId> {
        match self {
            Self::Before(n) => tree.parent(n),
            Self::End(p) => Some(p),
        }
    }
}

/// Turn a position into a child boundary, splitting a text node when the
/// point falls inside one.
fn boundary_at(tree: &mut VisualTree, pos: Position) -> Boundary {
    if tree.element(pos.node).is_none() {
        if pos.offset == 0 {
            return Boundary::Before(pos.node);
        }
        if pos.offset < tree.node_len(pos.node) {
            if let Some(tail) = tree.split_text(pos.node, pos.offset) {
                return Boundary::Before(tail);
            }
        }
        return match tree.next_sibling(pos.node) {
            Some(next) => Boundary::Before(next),
            None => Boundary::End(tree.parent(pos.node).unwrap_or(pos.node)),
        };
    }
    match tree.children(pos.node).get(pos.offset) {
        Some(&child) => Boundary::Before(child),
        None => Boundary::End(pos.node),
    }
}

/// Document order keys. A node spans `[start_key, end_key]`; a boundary
/// before a node shares its start key.
struct DocOrder {
    index: HashMap<NodeId, usize>,
}

impl DocOrder {
    fn new(tree: &VisualTree) -> Self {
        let index = tree
            .preorder(tree.root())
            .into_iter()
            .enumerate()
            .map(|(i, n)| (n, i))
            .collect();
        Self { index }
    }

    fn pre(&self, node: NodeId) -> usize {
        self.index.get(&node).copied().unwrap_or(0)
    }

    fn start_key(&self, node: NodeId) -> usize {
        2 * self.pre(node)
    }

    fn end_key(&self, tree: &VisualTree, node: NodeId) -> usize {
        let mut last = node;
        while let Some(child) = tree.last_child(last) {
            last = child;
        }
        2 * self.pre(last) + 1
    }

    fn boundary_key(&self, tree: &VisualTree, boundary: Boundary) -> usize {
        match boundary {
            Boundary::Before(n) => self.start_key(n),
            Boundary::End(p) => self.end_key(tree, p),
        }
    }

    fn position_key(&self, tree: &VisualTree, pos: Position) -> (usize, usize) {
        if tree.element(pos.node).is_none() {
            return (self.start_key(pos.node), pos.offset);
        }
        let key = match tree.children(pos.node).get(pos.offset) {
            Some(&child) => self.start_key(child),
            None => self.end_key(tree, pos.node),
        };
        (key, 0)
    }
}

/// Order the range's ends and turn both into stable boundaries.
fn prepare_range(tree: &mut VisualTree, range: DomRange) -> Option<(Boundary, Boundary)> {
    if !range.is_valid(tree) {
        return None;
    }
    let order = DocOrder::new(tree);
    let (start, end) = if order.position_key(tree, range.start) <= order.position_key(tree, range.end) {
        (range.start, range.end)
    } else {
        (range.end, range.start)
    };
    // The end is split first so the start's offset still holds.
    let end = boundary_at(tree, end);
    let start = boundary_at(tree, start);
    Some((start, end))
}

/// The largest subtrees lying entirely between two boundaries, in document
/// order.
fn contained_nodes(tree: &VisualTree, start: Boundary, end: Boundary) -> Vec<NodeId> {
    let order = DocOrder::new(tree);
    let (s, e) = (order.boundary_key(tree, start), order.boundary_key(tree, end));
    let mut out = Vec::new();
    let mut stack: Vec<NodeId> = tree.children(tree.root()).iter().rev().copied().collect();
    while let Some(n) = stack.pop() {
        let (a, b) = (order.start_key(n), order.end_key(tree, n));
        if a >= s && b <= e {
            out.push(n);
        } else if a < e && b > s {
            stack.extend(tree.children(n).iter().rev().copied());
        }
    }
    out
}

/// Inline leaves of a set of subtrees: block elements are opened up,
/// whitespace between blocks is skipped.
fn inline_nodes(tree: &VisualTree, nodes: &[NodeId]) -> Vec<NodeId> {
    let mut out = Vec::new();
    for &n in nodes {
        if let Some(text) = tree.text(n) {
            let between_blocks = tree
                .parent(n)
                .is_some_and(|p| p == tree.root() || matches!(tree.tag(p), Some("ul" | "ol")));
            if !(between_blocks && text.trim().is_empty()) {
                out.push(n);
            }
        } else if let Some(el) = tree.element(n) {
            if el.is_inline() {
                out.push(n);
            } else if !el.is_void() {
                let children = tree.children(n).to_vec();
                out.extend(inline_nodes(tree, &children));
            }
        }
    }
    out
}

fn selected_inline_nodes(tree: &mut VisualTree, range: DomRange) -> Vec<NodeId> {
    match prepare_range(tree, range) {
        Some((start, end)) => {
            let contained = contained_nodes(tree, start, end);
            inline_nodes(tree, &contained)
        }
        None => Vec::new(),
    }
}

/// Wrap nodes in elements made by `make`, sharing one wrapper across
/// adjacent siblings.
fn wrap_nodes(
    tree: &mut VisualTree,
    nodes: &[NodeId],
    mut make: impl FnMut(&mut VisualTree) -> NodeId,
) -> Vec<NodeId> {
    let mut wrappers: Vec<NodeId> = Vec::new();
    for &n in nodes {
        match wrappers.last() {
            Some(&w) if tree.next_sibling(w) == Some(n) => tree.append_child(w, n),
            _ => {
                let w = make(tree);
                tree.insert_before(n, w);
                tree.append_child(w, n);
                wrappers.push(w);
            }
        }
    }
    wrappers
}

/// Text nodes below a set of nodes.
fn text_leaves(tree: &VisualTree, nodes: &[NodeId]) -> Vec<NodeId> {
    nodes
        .iter()
        .flat_map(|&n| tree.preorder(n))
        .filter(|&n| tree.is_text(n))
        .collect()
}

fn span_of_texts(tree: &VisualTree, texts: &[NodeId]) -> Option<DomRange> {
    let first = *texts.first()?;
    let last = *texts.last()?;
    Some(DomRange::new(
        Position::new(first, 0),
        Position::new(last, tree.node_len(last)),
    ))
}

/// Split `top` at a point: everything after the point moves into a copy of
/// `top` (and copies of the elements in between) inserted right after it.
/// Returns the copy.
pub fn split_subtree(tree: &mut VisualTree, pos: Position, top: NodeId) -> Option<NodeId> {
    if top == tree.root() || !tree.is_inclusive_ancestor(top, pos.node) || tree.is_text(top) {
        return None;
    }
    let boundary = boundary_at(tree, pos);
    let (mut node, mut index) = match boundary {
        Boundary::Before(child) => (tree.parent(child)?, tree.index_in_parent(child)?),
        Boundary::End(parent) => (parent, tree.children(parent).len()),
    };
    loop {
        let copy = tree.shallow_clone(node)?;
        let moved = tree.children(node).get(index..).unwrap_or(&[]).to_vec();
        for child in moved {
            tree.append_child(copy, child);
        }
        tree.insert_after(node, copy);
        if node == top {
            return Some(copy);
        }
        index = tree.index_in_parent(copy)?;
        node = tree.parent(copy)?;
    }
}

fn is_safe_css_value(value: &str) -> bool {
    !value.trim().is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "#(),.% -".contains(c))
}

impl VisualTree {
    /// A caret sitting directly in the root gets an empty paragraph to
    /// type into.
    fn ensure_in_block(&mut self, at: Position) -> Position {
        if at.node != self.root() {
            return at;
        }
        let p = self.create_element("p");
        self.insert_child(at.node, at.offset, p);
        Position::new(p, 0)
    }

    /// Leave a list from an empty item: the item becomes a paragraph after
    /// the list, splitting it if needed.
    fn exit_list_item(&mut self, li: NodeId) -> Option<Position> {
        let list = self.parent(li).filter(|&l| matches!(self.tag(l), Some("ul" | "ol")))?;
        let after_li = Position::after(self, li)?;
        let tail = split_subtree(self, after_li, list)?;
        self.remove(li);
        let p = self.create_element("p");
        let br = self.create_element("br");
        self.append_child(p, br);
        self.insert_after(list, p);
        if self.children(tail).is_empty() {
            self.remove(tail);
        }
        if self.children(list).is_empty() {
            self.remove(list);
        }
        Some(Position::new(p, 0))
    }

    fn remove_style_around(&mut self, text: NodeId, style: InlineStyle) {
        let Some(styled) = self
            .ancestors(text)
            .take_while(|&n| n != self.root())
            .find(|&n| self.tag(n).is_some_and(|t| style.matches_tag(t)))
        else {
            return;
        };
        let Some(before) = Position::before(self, text) else {
            return;
        };
        let Some(middle) = split_subtree(self, before, styled) else {
            return;
        };
        let Some(after) = Position::after(self, text) else {
            return;
        };
        let rest = split_subtree(self, after, middle);
        self.unwrap(middle);
        for n in [Some(styled), rest].into_iter().flatten() {
            if self.children(n).is_empty() {
                self.remove(n);
            }
        }
    }
}

impl StructuredEdit for VisualTree {
    fn insert_text(&mut self, at: Position, text: &str) -> Position {
        let at = self.ensure_in_block(at);
        if let Some(existing) = self.text_mut(at.node) {
            let i = byte_index(existing, at.offset);
            existing.insert_str(i, text);
            return Position::new(at.node, at.offset + char_len(text));
        }
        let node = self.create_text(text);
        self.insert_child(at.node, at.offset, node);
        // Typing into an empty block replaces its filler break.
        if let Some(next) = self.next_sibling(node) {
            if self.is_tag(next, "br") && self.next_sibling(next).is_none() && self.prev_sibling(node).is_none() {
                self.remove(next);
            }
        }
        Position::new(node, char_len(text))
    }

    fn insert_line_break(&mut self, at: Position) -> Position {
        let at = self.ensure_in_block(at);
        let br = self.create_element("br");
        match boundary_at(self, at) {
            Boundary::Before(next) => self.insert_before(next, br),
            Boundary::End(parent) => self.append_child(parent, br),
        }
        let in_block = self.parent(br).is_some_and(|p| !is_inline_node(self, p));
        if in_block && self.next_sibling(br).is_none() {
            // A final break does not show; a second one makes the new line.
            let filler = self.create_element("br");
            self.insert_after(br, filler);
        }
        Position::after(self, br).unwrap_or(at)
    }

    fn split_paragraph(&mut self, at: Position) -> Position {
        let at = self.ensure_in_block(at);
        let block = match enclosing_block(self, at.node) {
            Some(block) => block,
            None => {
                let Some(top) = self.ancestors(at.node).find(|&n| self.parent(n) == Some(self.root())) else {
                    return at;
                };
                wrap_inline_run(self, top, "p")
            }
        };
        if self.is_tag(block, "li") && self.is_blank(block) {
            if let Some(pos) = self.exit_list_item(block) {
                return pos;
            }
        }
        let Some(tail) = split_subtree(self, at, block) else {
            return at;
        };
        let heading = matches!(self.tag(tail), Some("h1" | "h2" | "h3" | "h4" | "h5" | "h6"));
        if heading && self.is_blank(tail) {
            self.retag(tail, "p");
        }
        if self.element(tail).is_some_and(|el| el.tag == "div" && el.attrs.is_empty()) {
            self.retag(tail, "p");
        }
        ensure_filler(self, block);
        ensure_filler(self, tail);
        tracing::trace!(target: "folio::commands", tag = ?self.tag(tail), "split block");
        start_of(self, tail)
    }

    fn delete_range(&mut self, range: DomRange) -> Position {
        if range.is_collapsed() {
            return range.start;
        }
        let Some((start, end)) = prepare_range(self, range) else {
            return range.start;
        };
        let (Some(start_container), Some(end_container)) =
            (start.container(self), end.container(self))
        else {
            return range.start;
        };
        let start_prev = match start {
            Boundary::Before(n) => self.prev_sibling(n),
            Boundary::End(p) => self.last_child(p),
        };
        for victim in contained_nodes(self, start, end) {
            self.remove(victim);
        }

        let start_block = enclosing_block(self, start_container);
        let end_block = enclosing_block(self, end_container);
        if let (Some(sb), Some(eb)) = (start_block, end_block) {
            let nested = self.is_inclusive_ancestor(sb, eb) || self.is_inclusive_ancestor(eb, sb);
            if !nested && self.is_alive(eb) {
                let mut parent = self.parent(eb);
                self.move_children(eb, sb);
                self.remove(eb);
                while let Some(p) = parent {
                    if p == self.root()
                        || !self.children(p).is_empty()
                        || self.is_inclusive_ancestor(p, start_container)
                    {
                        break;
                    }
                    parent = self.parent(p);
                    self.remove(p);
                }
            }
        }
        if let Some(block) = start_block {
            ensure_filler(self, block);
        }
        match start_prev.filter(|&p| self.is_alive(p)) {
            Some(prev) => Position::after(self, prev).unwrap_or(Position::new(start_container, 0)),
            None => Position::new(start_container, 0),
        }
    }

    fn insert_nodes(&mut self, at: Position, nodes: &[NodeId]) -> Position {
        let Some(&last) = nodes.last() else {
            return at;
        };
        let has_block = nodes
            .iter()
            .any(|&n| self.element(n).is_some_and(|el| !el.is_inline()));
        let paragraph = has_block
            .then(|| {
                self.ancestors(at.node)
                    .take_while(|&n| n != self.root())
                    .find(|&n| !is_inline_node(self, n))
            })
            .flatten()
            .filter(|&b| is_paragraph_like(self, b));

        match paragraph {
            Some(block) => {
                let tail = split_subtree(self, at, block);
                let mut anchor = block;
                for &n in nodes {
                    self.insert_after(anchor, n);
                    anchor = n;
                }
                for half in [Some(block), tail].into_iter().flatten() {
                    if self.is_blank(half) {
                        self.remove(half);
                    }
                }
            }
            None => match boundary_at(self, at) {
                Boundary::Before(next) => {
                    for &n in nodes {
                        self.insert_before(next, n);
                    }
                }
                Boundary::End(parent) => {
                    for &n in nodes {
                        self.append_child(parent, n);
                    }
                }
            },
        }
        Position::after(self, last).unwrap_or(at)
    }

    fn wrap_in_link(&mut self, range: DomRange, href: &str) -> Vec<NodeId> {
        let make = |tree: &mut VisualTree| {
            let a = tree.create_element("a");
            if let Some(el) = tree.element_mut(a) {
                el.set_attr("href", href);
            }
            a
        };
        if range.is_collapsed() {
            if !range.start.is_valid(self) {
                return Vec::new();
            }
            let a = make(self);
            let text = self.create_text(href);
            self.append_child(a, text);
            self.insert_nodes(range.start, &[a]);
            return vec![a];
        }
        let nodes = selected_inline_nodes(self, range);
        let mut anchors = Vec::new();
        let mut to_wrap = Vec::new();
        for n in nodes {
            if self.is_tag(n, "a") {
                if let Some(el) = self.element_mut(n) {
                    el.set_attr("href", href);
                }
                anchors.push(n);
            } else {
                to_wrap.push(n);
            }
        }
        anchors.extend(wrap_nodes(self, &to_wrap, make));
        anchors
    }

    fn toggle_inline(&mut self, range: DomRange, style: InlineStyle) -> Option<DomRange> {
        let nodes = selected_inline_nodes(self, range);
        let texts = text_leaves(self, &nodes);
        let visible: Vec<NodeId> = texts
            .iter()
            .copied()
            .filter(|&t| self.text(t).is_some_and(|s| !s.trim().is_empty()))
            .collect();
        if visible.is_empty() {
            return None;
        }
        let active = visible.iter().all(|&t| {
            self.ancestors(t)
                .any(|n| self.tag(n).is_some_and(|tag| style.matches_tag(tag)))
        });
        if active {
            for &t in &texts {
                self.remove_style_around(t, style);
            }
        } else {
            wrap_nodes(self, &nodes, |tree| tree.create_element(style.tag()));
        }
        span_of_texts(self, &texts)
    }

    fn apply_text_style(&mut self, range: DomRange, style: &TextStyle) -> Option<DomRange> {
        let (tag, attr, value) = match style {
            TextStyle::Color(c) if is_safe_css_value(c) => ("span", "style", format!("color: {};", c.trim())),
            TextStyle::Highlight(c) if is_safe_css_value(c) => {
                ("span", "style", format!("background-color: {};", c.trim()))
            }
            TextStyle::FontSize(size) => ("font", "size", (*size).clamp(1, 5).to_string()),
            _ => {
                tracing::debug!(target: "folio::commands", ?style, "rejected style value");
                return None;
            }
        };
        let nodes = selected_inline_nodes(self, range);
        let texts = text_leaves(self, &nodes);
        wrap_nodes(self, &nodes, |tree| {
            let el = tree.create_element(tag);
            if let Some(e) = tree.element_mut(el) {
                e.set_attr(attr, value.clone());
            }
            el
        });
        span_of_texts(self, &texts)
    }

    fn format_block(&mut self, at: Position, format: BlockFormat) -> bool {
        if !at.is_valid(self) || at.node == self.root() {
            return false;
        }
        match enclosing_block(self, at.node) {
            Some(block) if is_paragraph_like(self, block) => {
                self.retag(block, format.tag());
            }
            Some(block) => {
                let inner = self.create_element(format.tag());
                self.move_children(block, inner);
                self.append_child(block, inner);
            }
            None => {
                let Some(top) = self.ancestors(at.node).find(|&n| self.parent(n) == Some(self.root())) else {
                    return false;
                };
                wrap_inline_run(self, top, format.tag());
            }
        }
        true
    }

    fn toggle_list(&mut self, at: Position, kind: ListKind) -> bool {
        if !at.is_valid(self) || at.node == self.root() {
            return false;
        }
        let li = self
            .ancestors(at.node)
            .take_while(|&n| n != self.root())
            .find(|&n| self.is_tag(n, "li"));
        if let Some(list) = li.and_then(|li| self.parent(li)).filter(|&l| matches!(self.tag(l), Some("ul" | "ol"))) {
            if self.is_tag(list, kind.tag()) {
                for item in self.children(list).to_vec() {
                    if self.is_tag(item, "li") {
                        let p = self.create_element("p");
                        self.move_children(item, p);
                        ensure_filler(self, p);
                        self.insert_before(list, p);
                        self.remove(item);
                    } else if self.text(item).is_some_and(|t| t.trim().is_empty()) {
                        self.remove(item);
                    } else {
                        self.insert_before(list, item);
                    }
                }
                self.remove(list);
            } else {
                self.retag(list, kind.tag());
            }
            return true;
        }

        let block = match enclosing_block(self, at.node) {
            Some(block) => block,
            None => {
                let Some(top) = self.ancestors(at.node).find(|&n| self.parent(n) == Some(self.root())) else {
                    return false;
                };
                wrap_inline_run(self, top, "p")
            }
        };
        let item = self.create_element("li");
        if is_paragraph_like(self, block) {
            self.move_children(block, item);
            match self.prev_sibling(block).filter(|&prev| self.is_tag(prev, kind.tag())) {
                Some(list) => self.append_child(list, item),
                None => {
                    let list = self.create_element(kind.tag());
                    self.insert_before(block, list);
                    self.append_child(list, item);
                }
            }
            self.remove(block);
        } else {
            let list = self.create_element(kind.tag());
            self.move_children(block, item);
            self.append_child(list, item);
            self.append_child(block, list);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html::{parse_fragment, serialize_children};

    fn html(tree: &VisualTree) -> String {
        serialize_children(tree, tree.root())
    }

    /// Text node reached by following child indices from the root.
    fn node_at(tree: &VisualTree, path: &[usize]) -> NodeId {
        path.iter()
            .fold(tree.root(), |n, &i| tree.children(n)[i])
    }

    #[test]
    fn test_insert_text_into_empty_paragraph() {
        let mut tree = parse_fragment("<p><br></p>");
        let p = node_at(&tree, &[0]);
        let cursor = tree.insert_text(Position::new(p, 0), "hi");
        assert_eq!(html(&tree), "<p>hi</p>");
        assert_eq!(cursor.offset, 2);
    }

    #[test]
    fn test_line_break_mid_text() {
        let mut tree = parse_fragment("<p>abcd</p>");
        let text = node_at(&tree, &[0, 0]);
        let cursor = tree.insert_line_break(Position::new(text, 2));
        assert_eq!(html(&tree), "<p>ab<br>cd</p>");
        assert_eq!(tree.children(cursor.node)[cursor.offset - 1], node_at(&tree, &[0, 1]));
    }

    #[test]
    fn test_line_break_at_end_adds_filler() {
        let mut tree = parse_fragment("<p>ab</p>");
        let text = node_at(&tree, &[0, 0]);
        tree.insert_line_break(Position::new(text, 2));
        assert_eq!(html(&tree), "<p>ab<br><br></p>");
    }

    #[test]
    fn test_split_paragraph() {
        let mut tree = parse_fragment("<p>Hello <strong>big</strong> world</p>");
        let strong_text = node_at(&tree, &[0, 1, 0]);
        let cursor = tree.split_paragraph(Position::new(strong_text, 1));
        assert_eq!(
            html(&tree),
            "<p>Hello <strong>b</strong></p><p><strong>ig</strong> world</p>"
        );
        assert_eq!(tree.text(cursor.node), Some("ig"));
        assert_eq!(cursor.offset, 0);
    }

    #[test]
    fn test_split_at_end_fills_new_paragraph() {
        let mut tree = parse_fragment("<p>abc</p>");
        let text = node_at(&tree, &[0, 0]);
        tree.split_paragraph(Position::new(text, 3));
        assert_eq!(html(&tree), "<p>abc</p><p><br></p>");
    }

    #[test]
    fn test_split_normalizes_plain_div() {
        let mut tree = parse_fragment("<div>abc</div>");
        let text = node_at(&tree, &[0, 0]);
        tree.split_paragraph(Position::new(text, 1));
        assert_eq!(html(&tree), "<div>a</div><p>bc</p>");
    }

    #[test]
    fn test_split_heading_end_gives_paragraph() {
        let mut tree = parse_fragment("<h2>Title</h2>");
        let text = node_at(&tree, &[0, 0]);
        tree.split_paragraph(Position::new(text, 5));
        assert_eq!(html(&tree), "<h2>Title</h2><p><br></p>");
    }

    #[test]
    fn test_split_wraps_bare_inline_run() {
        let mut tree = parse_fragment("loose <em>text</em><p>x</p>");
        let text = node_at(&tree, &[0]);
        tree.split_paragraph(Position::new(text, 5));
        assert_eq!(html(&tree), "<p>loose</p><p> <em>text</em></p><p>x</p>");
    }

    #[test]
    fn test_empty_list_item_exits_list() {
        let mut tree = parse_fragment("<ul><li>a</li><li><br></li></ul>");
        let li = node_at(&tree, &[0, 1]);
        let cursor = tree.split_paragraph(Position::new(li, 0));
        assert_eq!(html(&tree), "<ul><li>a</li></ul><p><br></p>");
        assert!(tree.is_tag(cursor.node, "p"));
    }

    #[test]
    fn test_delete_within_text() {
        let mut tree = parse_fragment("<p>abcdef</p>");
        let text = node_at(&tree, &[0, 0]);
        tree.delete_range(DomRange::new(Position::new(text, 4), Position::new(text, 1)));
        assert_eq!(html(&tree), "<p>aef</p>");
    }

    #[test]
    fn test_delete_across_blocks_merges() {
        let mut tree = parse_fragment("<p>one</p><h2>two</h2><p>three</p>");
        let one = node_at(&tree, &[0, 0]);
        let three = node_at(&tree, &[2, 0]);
        let cursor = tree.delete_range(DomRange::new(Position::new(one, 2), Position::new(three, 2)));
        assert_eq!(html(&tree), "<p>onree</p>");
        assert_eq!(tree.index_in_parent(node_at(&tree, &[0, 0])), Some(0));
        assert_eq!(cursor, Position::new(node_at(&tree, &[0]), 1));
    }

    #[test]
    fn test_delete_whole_paragraph_content() {
        let mut tree = parse_fragment("<p>gone</p>");
        let p = node_at(&tree, &[0]);
        tree.delete_range(DomRange::new(Position::new(p, 0), Position::new(p, 1)));
        assert_eq!(html(&tree), "<p><br></p>");
    }

    #[test]
    fn test_insert_block_splits_paragraph() {
        let mut tree = parse_fragment("<p>beforeafter</p>");
        let text = node_at(&tree, &[0, 0]);
        let fragment = parse_fragment(r#"<div class="note note--blue">n</div>"#);
        let nodes = tree.import_children(&fragment, fragment.root());
        let cursor = tree.insert_nodes(Position::new(text, 6), &nodes);
        assert_eq!(
            html(&tree),
            r#"<p>before</p><div class="note note--blue">n</div><p>after</p>"#
        );
        assert_eq!(cursor, Position::new(tree.root(), 2));
    }

    #[test]
    fn test_insert_block_into_empty_paragraph_replaces_it() {
        let mut tree = parse_fragment("<p>a</p><p><br></p>");
        let empty = node_at(&tree, &[1]);
        let fragment = parse_fragment("<blockquote>q</blockquote>");
        let nodes = tree.import_children(&fragment, fragment.root());
        tree.insert_nodes(Position::new(empty, 0), &nodes);
        assert_eq!(html(&tree), "<p>a</p><blockquote>q</blockquote>");
    }

    #[test]
    fn test_insert_inline_nodes() {
        let mut tree = parse_fragment("<p>ab</p>");
        let text = node_at(&tree, &[0, 0]);
        let img = tree.create_element("img");
        let cursor = tree.insert_nodes(Position::new(text, 1), &[img]);
        assert_eq!(html(&tree), "<p>a<img>b</p>");
        assert_eq!(cursor, Position::new(node_at(&tree, &[0]), 2));
    }

    #[test]
    fn test_wrap_selection_in_link() {
        let mut tree = parse_fragment("<p>see this page</p>");
        let text = node_at(&tree, &[0, 0]);
        let anchors = tree.wrap_in_link(
            DomRange::new(Position::new(text, 4), Position::new(text, 8)),
            "https://example.com/?a=1&b=2",
        );
        assert_eq!(anchors.len(), 1);
        assert_eq!(
            html(&tree),
            r#"<p>see <a href="https://example.com/?a=1&amp;b=2">this</a> page</p>"#
        );
    }

    #[test]
    fn test_collapsed_link_uses_url_as_text() {
        let mut tree = parse_fragment("<p>x</p>");
        let text = node_at(&tree, &[0, 0]);
        tree.wrap_in_link(DomRange::collapsed(Position::new(text, 1)), "/about");
        assert_eq!(html(&tree), r#"<p>x<a href="/about">/about</a></p>"#);
    }

    #[test]
    fn test_toggle_bold_on_and_off() {
        let mut tree = parse_fragment("<p>make bold here</p>");
        let text = node_at(&tree, &[0, 0]);
        let range = tree
            .toggle_inline(
                DomRange::new(Position::new(text, 5), Position::new(text, 9)),
                InlineStyle::Bold,
            )
            .unwrap();
        assert_eq!(html(&tree), "<p>make <strong>bold</strong> here</p>");

        tree.toggle_inline(range, InlineStyle::Bold);
        assert_eq!(html(&tree), "<p>make bold here</p>");
    }

    #[test]
    fn test_unbold_part_of_bold_run() {
        let mut tree = parse_fragment("<p><b>abc</b></p>");
        let text = node_at(&tree, &[0, 0, 0]);
        tree.toggle_inline(
            DomRange::new(Position::new(text, 1), Position::new(text, 2)),
            InlineStyle::Bold,
        );
        assert_eq!(html(&tree), "<p><b>a</b>b<b>c</b></p>");
    }

    #[test]
    fn test_text_styles() {
        let mut tree = parse_fragment("<p>abc</p>");
        let text = node_at(&tree, &[0, 0]);
        let range = DomRange::new(Position::new(text, 0), Position::new(text, 3));
        let range = tree
            .apply_text_style(range, &TextStyle::Color("#ef4444".into()))
            .unwrap();
        tree.apply_text_style(range, &TextStyle::FontSize(9));
        assert_eq!(
            html(&tree),
            r##"<p><span style="color: #ef4444;"><font size="5">abc</font></span></p>"##
        );
        assert_eq!(
            tree.apply_text_style(range, &TextStyle::Highlight("red;position:fixed".into())),
            None
        );
    }

    #[test]
    fn test_format_block_and_list_toggle() {
        let mut tree = parse_fragment("<p>one</p><p>two</p>");
        let one = node_at(&tree, &[0, 0]);
        let two = node_at(&tree, &[1, 0]);
        assert!(tree.format_block(Position::new(one, 0), BlockFormat::Heading(3)));
        assert_eq!(html(&tree), "<h3>one</h3><p>two</p>");

        assert!(tree.toggle_list(Position::new(two, 0), ListKind::Bullet));
        assert_eq!(html(&tree), "<h3>one</h3><ul><li>two</li></ul>");

        assert!(tree.toggle_list(Position::new(two, 0), ListKind::Numbered));
        assert_eq!(html(&tree), "<h3>one</h3><ol><li>two</li></ol>");

        assert!(tree.toggle_list(Position::new(two, 0), ListKind::Numbered));
        assert_eq!(html(&tree), "<h3>one</h3><p>two</p>");
    }

    #[test]
    fn test_consecutive_list_items_join() {
        let mut tree = parse_fragment("<ul><li>a</li></ul><p>b</p>");
        let b = node_at(&tree, &[1, 0]);
        tree.toggle_list(Position::new(b, 0), ListKind::Bullet);
        assert_eq!(html(&tree), "<ul><li>a</li><li>b</li></ul>");
    }

    #[test]
    fn test_execute_dispatch() {
        let mut tree = parse_fragment("<p>abc</p>");
        let text = node_at(&tree, &[0, 0]);
        let range = DomRange::new(Position::new(text, 0), Position::new(text, 3));
        assert!(execute(&mut tree, &EditCommand::ToggleInline(InlineStyle::Italic), range).is_some());
        assert_eq!(html(&tree), "<p><em>abc</em></p>");
    }
}
