//! Moving content between the visual tree and the source buffer.
//!
//! Both directions are idempotent: converting the result of a conversion
//! again gives the same thing back.

use std::sync::LazyLock;

use regex::Regex;

use crate::classify::{self, BlockKind};
use crate::commands::{is_inline_node, wrap_inline_run};
use crate::dom::{Element, NodeId, VisualTree};
use crate::html::{parse_fragment, serialize_children};
use crate::palette::{BlockColor, ButtonColor};

static SELF_CLOSING_BR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").unwrap());

static BREAK_POINT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)</(?:p|div|blockquote|h[1-6]|li)>|<br>").unwrap()
});

static EXCESS_NEWLINES_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// Whether the whitespace right after `at` already contains a newline.
fn newline_follows(html: &str, at: usize) -> bool {
    html[at..]
        .chars()
        .take_while(|c| c.is_whitespace())
        .any(|c| c == '\n')
}

/// Lay serialized HTML out for the source view: a blank line after each
/// closing block tag and a newline after each `<br>`, unless one is already
/// there.
pub fn pretty_print(html: &str) -> String {
    if html.trim().is_empty() {
        return html.to_owned();
    }
    let html = html.replace("\r\n", "\n");
    let html = SELF_CLOSING_BR_RE.replace_all(&html, "<br>");

    let mut out = String::with_capacity(html.len() + html.len() / 8);
    let mut last = 0;
    for m in BREAK_POINT_RE.find_iter(&html) {
        out.push_str(&html[last..m.end()]);
        last = m.end();
        if newline_follows(&html, m.end()) {
            continue;
        }
        if m.as_str().eq_ignore_ascii_case("<br>") {
            out.push('\n');
        } else {
            out.push_str("\n\n");
        }
    }
    out.push_str(&html[last..]);

    EXCESS_NEWLINES_RE
        .replace_all(&out, "\n\n")
        .trim()
        .to_owned()
}

/// Source text for the current tree.
pub fn visual_to_source(tree: &VisualTree) -> String {
    pretty_print(&serialize_children(tree, tree.root()))
}

/// Build the visual tree from source text. Never fails: whatever does not
/// parse as markup is kept as text.
pub fn source_to_visual(source: &str) -> VisualTree {
    let mut tree = parse_fragment(source);
    let canonicalized = canonicalize_legacy(&mut tree);
    tidy_top_level(&mut tree);
    tracing::debug!(
        target: "folio::sync",
        canonicalized,
        blocks = tree.children(tree.root()).len(),
        "built visual tree from source"
    );
    tree
}

/// Rewrite inline-styled notes, quotes, buttons and embeds into the
/// class-based markup. Blocks whose colors are not in the palette are left
/// alone. Returns how many blocks were rewritten.
pub fn canonicalize_legacy(tree: &mut VisualTree) -> usize {
    let mut rewritten = 0;
    for node in tree.preorder(tree.root()) {
        if !tree.is_alive(node) || node == tree.root() {
            continue;
        }
        let done = match classify::classify(tree, node) {
            BlockKind::Note => canonicalize_note(tree, node),
            BlockKind::Quote => canonicalize_quote(tree, node),
            BlockKind::ButtonWrap => canonicalize_button(tree, node),
            BlockKind::EmbedWrap => canonicalize_embed(tree, node),
            _ => false,
        };
        if done {
            rewritten += 1;
        }
    }
    rewritten
}

/// Keep only the listed attributes, in the listed order, then the rest
/// minus `style`.
fn reorder_attrs(el: &mut Element, leading: &[(&str, Option<String>)]) {
    let mut rest = std::mem::take(&mut el.attrs);
    for (name, value) in leading {
        let existing = rest
            .iter()
            .position(|a| a.name.eq_ignore_ascii_case(name))
            .map(|i| rest.remove(i).value);
        if let Some(value) = value.clone().or(existing) {
            el.set_attr(name, value);
        }
    }
    for attr in rest {
        if !attr.name.eq_ignore_ascii_case("style") {
            el.attrs.push(attr);
        }
    }
}

fn legacy_block_color(tree: &VisualTree, node: NodeId) -> Option<BlockColor> {
    let el = tree.element(node)?;
    if classify::class_color(el).is_some() || el.style("border-left").is_none() {
        return None;
    }
    classify::legacy_border_color(el).and_then(BlockColor::from_border)
}

fn canonicalize_note(tree: &mut VisualTree, node: NodeId) -> bool {
    let Some(color) = legacy_block_color(tree, node) else {
        return false;
    };
    if let Some(el) = tree.element_mut(node) {
        el.attrs.clear();
        el.set_attr("class", format!("note note--{}", color.name()));
    }
    true
}

fn canonicalize_quote(tree: &mut VisualTree, node: NodeId) -> bool {
    let Some(color) = legacy_block_color(tree, node) else {
        return false;
    };
    if let Some(el) = tree.element_mut(node) {
        el.attrs.clear();
        el.set_attr("class", format!("quote quote--{}", color.name()));
    }
    let cites: Vec<NodeId> = tree
        .children(node)
        .iter()
        .copied()
        .filter(|&c| tree.is_tag(c, "cite"))
        .collect();
    for cite in cites {
        if let Some(el) = tree.element_mut(cite) {
            el.remove_attr("style");
        }
    }
    true
}

fn canonicalize_button(tree: &mut VisualTree, node: NodeId) -> bool {
    if tree.element(node).is_some_and(|el| el.has_class("btn-wrap")) {
        return false;
    }
    let Some(anchor) = classify::legacy_button_anchor(tree, node) else {
        return false;
    };
    let color = tree.element(anchor).and_then(|a| {
        a.style("background")
            .or_else(|| a.style("background-color"))
            .and_then(ButtonColor::from_background)
    });
    let Some(color) = color else {
        return false;
    };
    if let Some(el) = tree.element_mut(node) {
        el.attrs.clear();
        el.set_attr("class", "btn-wrap");
    }
    if let Some(a) = tree.element_mut(anchor) {
        a.remove_attr("class");
        reorder_attrs(
            a,
            &[
                ("href", None),
                ("class", Some(format!("btn {}", color.class_name()))),
                ("target", None),
                ("rel", None),
            ],
        );
    }
    true
}

fn canonicalize_embed(tree: &mut VisualTree, node: NodeId) -> bool {
    if tree.element(node).is_some_and(|el| el.has_class("youtube-wrap")) {
        return false;
    }
    let Some(iframe) = classify::youtube_iframe(tree, node) else {
        return false;
    };
    if let Some(el) = tree.element_mut(node) {
        el.attrs.clear();
        el.set_attr("class", "youtube-wrap");
    }
    if let Some(el) = tree.element_mut(iframe) {
        el.remove_attr("frameborder");
        reorder_attrs(el, &[("src", None), ("allowfullscreen", None)]);
    }
    true
}

/// Inline run that would render as visible content.
fn has_visible_content(tree: &VisualTree, run: &[NodeId]) -> bool {
    run.iter().any(|&n| match tree.text(n) {
        Some(text) => !text.trim().is_empty(),
        None => tree
            .element(n)
            .is_some_and(|el| el.tag != "br" || !tree.children(n).is_empty()),
    })
}

/// Enforce the top-level layout of a committed document: no whitespace
/// between blocks, visible inline runs wrapped in paragraphs, and no bare
/// breaks at the very end.
///
/// Whitespace between two inline siblings renders as a space, so it is kept
/// (collapsed to one) and ends up inside the wrapping paragraph.
pub fn tidy_top_level(tree: &mut VisualTree) {
    let root = tree.root();
    let children = tree.children(root).to_vec();
    let blank: Vec<bool> = children
        .iter()
        .map(|&n| tree.text(n).is_some_and(|t| t.trim().is_empty()))
        .collect();
    let mut kept_spaces = Vec::new();
    let mut dropped = Vec::new();
    for (i, &n) in children.iter().enumerate() {
        if !blank[i] {
            continue;
        }
        let prev = (0..i).rev().find(|&j| !blank[j]).map(|j| children[j]);
        let next = (i + 1..children.len()).find(|&j| !blank[j]).map(|j| children[j]);
        let between_inlines = matches!(
            (prev, next),
            (Some(p), Some(q)) if is_inline_node(tree, p) && is_inline_node(tree, q)
        );
        if between_inlines && (i == 0 || !blank[i - 1]) {
            kept_spaces.push(n);
        } else {
            dropped.push(n);
        }
    }
    for n in kept_spaces {
        if let Some(text) = tree.text_mut(n) {
            *text = " ".to_owned();
        }
    }
    for n in dropped {
        tree.remove(n);
    }

    let mut index = 0;
    while let Some(&node) = tree.children(root).get(index) {
        if is_inline_node(tree, node) {
            let run: Vec<NodeId> = tree.children(root)[index..]
                .iter()
                .copied()
                .take_while(|&n| is_inline_node(tree, n))
                .collect();
            if has_visible_content(tree, &run) {
                wrap_inline_run(tree, node, "p");
                index += 1;
            } else {
                index += run.len();
            }
        } else {
            index += 1;
        }
    }

    while let Some(last) = tree.last_child(root) {
        if tree.is_tag(last, "br") {
            tree.remove(last);
        } else {
            break;
        }
    }
}
