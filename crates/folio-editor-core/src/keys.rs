//! Enter-key interpretation.
//!
//! [`interpret_enter`] is a pure function of the key press and the memory of
//! the previous press. The tree work it asks for lives in [`escape_block`]
//! and the paragraph commands in [`crate::commands`].

use web_time::{Duration, Instant};

use crate::actions::Modifiers;
use crate::dom::{NodeId, Position, VisualTree};
use folio_common::LinebreakModifier;

/// Two presses inside the same quote or note closer together than this
/// leave the block.
pub const DEFAULT_ESCAPE_WINDOW: Duration = Duration::from_millis(1200);

/// The last Enter pressed inside a quote or note, if it still matters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnterKeyMemory {
    last: Option<(Instant, NodeId)>,
}

impl EnterKeyMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pressed(at: Instant, block: NodeId) -> Self {
        Self {
            last: Some((at, block)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.last.is_none()
    }

    pub fn block(&self) -> Option<NodeId> {
        self.last.map(|(_, block)| block)
    }

    fn is_repeat(&self, block: NodeId, now: Instant, window: Duration) -> bool {
        self.last.is_some_and(|(at, previous)| {
            previous == block && now.saturating_duration_since(at) < window
        })
    }
}

/// What the interpreter needs to know about one Enter press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnterInput {
    pub shift: bool,
    /// The configured line-break modifier is held.
    pub linebreak_modifier: bool,
    /// Quote or note enclosing the cursor.
    pub block: Option<NodeId>,
    pub now: Instant,
}

impl EnterInput {
    pub fn new(
        modifiers: Modifiers,
        linebreak: LinebreakModifier,
        block: Option<NodeId>,
        now: Instant,
    ) -> Self {
        let linebreak_modifier = match linebreak {
            LinebreakModifier::Meta => modifiers.meta,
            LinebreakModifier::Ctrl => modifiers.ctrl,
        };
        Self {
            shift: modifiers.shift,
            linebreak_modifier,
            block,
            now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnterAction {
    /// Leave the key to the host.
    PassThrough,
    /// Insert a single `<br>` at the cursor.
    InsertLineBreak,
    /// Second press inside the block: leave it for a new paragraph.
    EscapeBlock { block: NodeId },
    /// First press inside the block: remember it and do nothing else.
    RecordPress { block: NodeId },
    /// Ordinary paragraph split at the cursor.
    SplitParagraph,
}

impl EnterAction {
    /// Whether the host's default handling must be suppressed.
    pub fn is_handled(self) -> bool {
        !matches!(self, Self::PassThrough)
    }
}

pub fn interpret_enter(
    input: &EnterInput,
    memory: EnterKeyMemory,
    window: Duration,
) -> (EnterAction, EnterKeyMemory) {
    if input.shift {
        return (EnterAction::PassThrough, memory);
    }
    if input.linebreak_modifier {
        return (EnterAction::InsertLineBreak, EnterKeyMemory::new());
    }
    match input.block {
        Some(block) if memory.is_repeat(block, input.now, window) => {
            (EnterAction::EscapeBlock { block }, EnterKeyMemory::new())
        }
        Some(block) => (
            EnterAction::RecordPress { block },
            EnterKeyMemory::pressed(input.now, block),
        ),
        None => (EnterAction::SplitParagraph, EnterKeyMemory::new()),
    }
}

/// A child block that holds nothing but `<br>`s and whitespace.
fn is_break_only(tree: &VisualTree, node: NodeId) -> bool {
    if !matches!(tree.tag(node), Some("p" | "div" | "blockquote")) {
        return false;
    }
    tree.preorder(node).into_iter().skip(1).all(|n| {
        tree.is_tag(n, "br") || tree.text(n).is_some_and(|t| t.trim().is_empty())
    })
}

/// Remove the run of empty trailing children from a block: `<br>`s,
/// whitespace text and break-only child blocks, until real content or
/// nothing is left.
pub fn strip_trailing_empty(tree: &mut VisualTree, block: NodeId) -> usize {
    let mut removed = 0;
    while let Some(last) = tree.last_child(block) {
        let empty = tree.is_tag(last, "br")
            || tree.text(last).is_some_and(|t| t.trim().is_empty())
            || is_break_only(tree, last);
        if !empty {
            break;
        }
        tree.remove(last);
        removed += 1;
    }
    removed
}

/// Leave a quote or note: strip its empty tail and open `<p><br></p>` right
/// after it. Returns the cursor position inside the new paragraph.
pub fn escape_block(tree: &mut VisualTree, block: NodeId) -> Option<Position> {
    if !tree.is_attached(block) || block == tree.root() {
        return None;
    }
    let stripped = strip_trailing_empty(tree, block);
    let p = tree.create_element("p");
    let br = tree.create_element("br");
    tree.append_child(p, br);
    tree.insert_after(block, p);
    tracing::debug!(target: "folio::keys", stripped, "escaped block");
    Some(Position::new(p, 0))
}
