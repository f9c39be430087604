//! Block classification.
//!
//! Two markup schemes coexist in stored posts: the older editor wrote inline
//! styles (`border-left: 4px solid #3b82f6` on a `div`, inline-block anchors
//! with a background, padded iframe wrappers), the current one writes
//! classes (`note note--blue`, `btn-wrap`, `youtube-wrap`). Classification
//! accepts both.

use crate::dom::{Element, NodeId, VisualTree};
use crate::palette::BlockColor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    Paragraph,
    Heading(u8),
    List,
    Quote,
    Note,
    ButtonWrap,
    EmbedWrap,
    /// A block-level element with no special meaning, kept as-is.
    PlainBlock,
    /// Text, comments and inline elements.
    Unknown,
}

impl BlockKind {
    pub fn is_quote_or_note(self) -> bool {
        matches!(self, Self::Quote | Self::Note)
    }
}

pub fn classify(tree: &VisualTree, node: NodeId) -> BlockKind {
    let Some(el) = tree.element(node) else {
        return BlockKind::Unknown;
    };
    match el.tag.as_str() {
        "p" => BlockKind::Paragraph,
        "ul" | "ol" => BlockKind::List,
        "blockquote" => BlockKind::Quote,
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            BlockKind::Heading(el.tag.as_bytes()[1] - b'0')
        }
        "div" => classify_div(tree, node, el),
        _ if is_quote_class(el) => BlockKind::Quote,
        _ if el.is_inline() => BlockKind::Unknown,
        _ => BlockKind::PlainBlock,
    }
}

fn classify_div(tree: &VisualTree, node: NodeId, el: &Element) -> BlockKind {
    if is_note_class(el) {
        BlockKind::Note
    } else if is_quote_class(el) {
        BlockKind::Quote
    } else if el.has_class("btn-wrap") {
        BlockKind::ButtonWrap
    } else if el.has_class("youtube-wrap") {
        BlockKind::EmbedWrap
    } else if el.style("border-left").is_some() {
        BlockKind::Note
    } else if legacy_button_anchor(tree, node).is_some() {
        BlockKind::ButtonWrap
    } else if youtube_iframe(tree, node).is_some() {
        BlockKind::EmbedWrap
    } else {
        BlockKind::PlainBlock
    }
}

fn is_note_class(el: &Element) -> bool {
    el.classes().any(|c| c == "note" || c.starts_with("note--"))
}

fn is_quote_class(el: &Element) -> bool {
    el.classes().any(|c| c == "quote" || c.starts_with("quote--"))
}

/// Nearest quote or note block containing `node` (the node itself
/// included). The walk stops at the editor root, which never counts.
pub fn enclosing_quote_or_note(tree: &VisualTree, node: NodeId) -> Option<NodeId> {
    if !tree.is_attached(node) {
        return None;
    }
    tree.ancestors(node)
        .take_while(|&n| n != tree.root())
        .find(|&n| classify(tree, n).is_quote_or_note())
}

/// Palette entry named by a `note--<color>` / `quote--<color>` class.
pub fn class_color(el: &Element) -> Option<BlockColor> {
    el.classes().find_map(|c| {
        c.strip_prefix("note--")
            .or_else(|| c.strip_prefix("quote--"))
            .and_then(BlockColor::from_name)
    })
}

/// Color of a legacy `border-left: 4px solid <color>` declaration.
pub fn legacy_border_color(el: &Element) -> Option<&str> {
    el.style("border-left")?
        .split_ascii_whitespace()
        .find(|token| token.starts_with('#') || token.starts_with("rgb"))
}

/// Element children of a node, skipping whitespace-only text. `None` if
/// there is any non-whitespace text.
fn element_children(tree: &VisualTree, node: NodeId) -> Option<Vec<NodeId>> {
    let mut out = Vec::new();
    for &child in tree.children(node) {
        if let Some(text) = tree.text(child) {
            if !text.trim().is_empty() {
                return None;
            }
        } else if tree.element(child).is_some() {
            out.push(child);
        }
    }
    Some(out)
}

/// The anchor of a legacy button wrapper: a `div` holding a single `a`
/// styled as an inline-block with a background.
pub fn legacy_button_anchor(tree: &VisualTree, div: NodeId) -> Option<NodeId> {
    let [anchor] = element_children(tree, div)?[..] else {
        return None;
    };
    let a = tree.element(anchor).filter(|el| el.tag == "a")?;
    let inline_block = a
        .style("display")
        .is_some_and(|d| d.eq_ignore_ascii_case("inline-block"));
    let has_background = a.style("background").is_some() || a.style("background-color").is_some();
    (inline_block && has_background).then_some(anchor)
}

/// The iframe of an embed wrapper, if it is the wrapper's only element and
/// points at a YouTube embed.
pub fn youtube_iframe(tree: &VisualTree, div: NodeId) -> Option<NodeId> {
    let [iframe] = element_children(tree, div)?[..] else {
        return None;
    };
    let src = tree
        .element(iframe)
        .filter(|el| el.tag == "iframe")?
        .attr("src")?;
    (src.contains("youtube.com/embed/") || src.contains("youtube-nocookie.com/embed/"))
        .then_some(iframe)
}
