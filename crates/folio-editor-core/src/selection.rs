//! Live selection and the snapshot kept across dialogs.
//!
//! Opening a prompt moves focus out of the editable region, which on the web
//! drops the selection. The insertion point is captured before the dialog
//! opens and put back when it is confirmed.

use crate::dom::{DomRange, Position, VisualTree};

/// The selection as the host currently reports it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LiveSelection {
    range: Option<DomRange>,
    focused: bool,
}

impl LiveSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn range(&self) -> Option<DomRange> {
        self.range
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    /// Select a range and focus the editable region.
    pub fn set(&mut self, range: DomRange) {
        self.range = Some(range);
        self.focused = true;
    }

    pub fn collapse(&mut self, at: Position) {
        self.set(DomRange::collapsed(at));
    }

    pub fn focus(&mut self) {
        self.focused = true;
    }

    /// Focus left the editable region; the selection goes with it.
    pub fn blur(&mut self) {
        self.focused = false;
        self.range = None;
    }

    /// Range still pointing at live, attached nodes.
    pub fn valid_range(&self, tree: &VisualTree) -> Option<DomRange> {
        self.range.filter(|r| r.is_valid(tree))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Snapshot {
    Range(DomRange),
    /// Captured while the selection was outside the editor.
    Empty,
}

/// Holds at most one captured selection, consumed by the next restore.
#[derive(Debug, Clone, Default)]
pub struct SelectionManager {
    snapshot: Option<Snapshot>,
}

impl SelectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember the live selection. A selection whose anchor is not inside
    /// the editor is recorded as empty, replacing whatever was held before.
    pub fn capture(&mut self, tree: &VisualTree, live: &LiveSelection) {
        let snapshot = match live.range() {
            Some(range) if range.start.is_valid(tree) => Snapshot::Range(range),
            _ => Snapshot::Empty,
        };
        tracing::trace!(target: "folio::selection", ?snapshot, "captured selection");
        self.snapshot = Some(snapshot);
    }

    /// Put the captured selection back. Returns `false` and leaves `live`
    /// alone when nothing usable was captured. Either way the snapshot is
    /// spent.
    pub fn restore(&mut self, tree: &VisualTree, live: &mut LiveSelection) -> bool {
        match self.snapshot.take() {
            Some(Snapshot::Range(range)) if range.is_valid(tree) => {
                live.focus();
                live.set(range);
                tracing::trace!(target: "folio::selection", ?range, "restored selection");
                true
            }
            Some(Snapshot::Range(range)) => {
                tracing::debug!(target: "folio::selection", ?range, "captured selection went stale");
                false
            }
            Some(Snapshot::Empty) | None => false,
        }
    }

    /// Drop a pending snapshot without restoring it.
    pub fn invalidate(&mut self) {
        if self.snapshot.take().is_some() {
            tracing::trace!(target: "folio::selection", "discarded pending selection");
        }
    }

    /// A capture happened and has not been consumed yet.
    pub fn is_pending(&self) -> bool {
        self.snapshot.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html::parse_fragment;

    fn hello_tree() -> (VisualTree, crate::dom::NodeId) {
        let tree = parse_fragment("<p>Hello world</p>");
        let p = tree.children(tree.root())[0];
        let text = tree.children(p)[0];
        (tree, text)
    }

    #[test]
    fn test_round_trip_after_focus_loss() {
        let (tree, text) = hello_tree();
        let mut live = LiveSelection::new();
        live.collapse(Position::new(text, 3));

        let mut manager = SelectionManager::new();
        manager.capture(&tree, &live);
        live.blur();
        assert_eq!(live.range(), None);

        assert!(manager.restore(&tree, &mut live));
        assert!(live.is_focused());
        assert_eq!(live.range(), Some(DomRange::collapsed(Position::new(text, 3))));

        let before = live;
        assert!(!manager.restore(&tree, &mut live));
        assert_eq!(live, before);
    }

    #[test]
    fn test_capture_outside_editor_is_empty() {
        let (mut tree, text) = hello_tree();
        let stray = tree.create_text("elsewhere");
        let mut live = LiveSelection::new();
        live.collapse(Position::new(text, 1));

        let mut manager = SelectionManager::new();
        manager.capture(&tree, &live);
        live.collapse(Position::new(stray, 0));
        manager.capture(&tree, &live);
        assert!(manager.is_pending());

        live.blur();
        assert!(!manager.restore(&tree, &mut live));
        assert_eq!(live.range(), None);
        assert!(!manager.is_pending());
    }

    #[test]
    fn test_stale_snapshot_fails_soft() {
        let (mut tree, text) = hello_tree();
        let mut live = LiveSelection::new();
        live.collapse(Position::new(text, 2));

        let mut manager = SelectionManager::new();
        manager.capture(&tree, &live);
        let p = tree.parent(text).unwrap();
        tree.remove(p);

        live.blur();
        assert!(!manager.restore(&tree, &mut live));
        assert_eq!(live.range(), None);
    }

    #[test]
    fn test_invalidate() {
        let (tree, text) = hello_tree();
        let mut live = LiveSelection::new();
        live.collapse(Position::new(text, 0));
        let mut manager = SelectionManager::new();
        manager.capture(&tree, &live);
        manager.invalidate();
        assert!(!manager.is_pending());
        assert!(!manager.restore(&tree, &mut live));
    }
}
