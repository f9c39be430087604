//! The editing session: one visual tree and one source buffer kept in step.
//!
//! Every mutation enters through [`Editor`]. Hosts forward key presses,
//! selection changes and dialog results, and read back the tree or the
//! source text to render.

use folio_common::{
    CustomEditorDefinition, EditorConfig, ImageUploader, PostStore, TemplateStore, UploadFile,
};
use web_time::{Duration, Instant};

use crate::actions::{EditCommand, Key, KeyCombo, KeydownResult};
use crate::classify::enclosing_quote_or_note;
use crate::commands::{StructuredEdit, execute};
use crate::dom::{DomRange, Position, VisualTree};
use crate::error::{EditorError, ValidationError};
use crate::fragment::{Fragment, Snippet};
use crate::html::parse_fragment;
use crate::keys::{EnterAction, EnterInput, EnterKeyMemory, escape_block, interpret_enter};
use crate::palette::BlockColor;
use crate::selection::{LiveSelection, SelectionManager};
use crate::sync::{source_to_visual, tidy_top_level, visual_to_source};
use crate::text::{SourceBuffer, TextBuffer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditorMode {
    #[default]
    Visual,
    Source,
}

impl EditorMode {
    pub fn other(self) -> Self {
        match self {
            Self::Visual => Self::Source,
            Self::Source => Self::Visual,
        }
    }
}

/// Host dialog currently collecting input for an insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialog {
    Link,
    Button,
    YouTube,
    Note,
    Quote,
    Template,
    Image,
}

#[derive(Debug)]
pub struct Editor {
    mode: EditorMode,
    tree: VisualTree,
    source: SourceBuffer,
    live: LiveSelection,
    selection: SelectionManager,
    enter_memory: EnterKeyMemory,
    dialog: Option<Dialog>,
    templates: Vec<CustomEditorDefinition>,
    config: EditorConfig,
    syncs: u64,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl Editor {
    pub fn new(config: EditorConfig) -> Self {
        Self {
            mode: EditorMode::Visual,
            tree: VisualTree::new(),
            source: SourceBuffer::new(),
            live: LiveSelection::new(),
            selection: SelectionManager::new(),
            enter_memory: EnterKeyMemory::new(),
            dialog: None,
            templates: Vec::new(),
            config,
            syncs: 0,
        }
    }

    pub fn with_content(config: EditorConfig, html: &str) -> Self {
        let mut editor = Self::new(config);
        editor.load(html);
        editor
    }

    /// Replace the document with stored content. Malformed markup never
    /// fails to load.
    pub fn load(&mut self, html: &str) {
        self.source.set(html);
        self.tree = source_to_visual(html);
        self.live = LiveSelection::new();
        self.selection.invalidate();
        self.enter_memory = EnterKeyMemory::new();
        self.dialog = None;
        tracing::debug!(
            target: "folio::editor",
            len = html.len(),
            blocks = self.tree.children(self.tree.root()).len(),
            "loaded content"
        );
    }

    // === Accessors ===

    pub fn mode(&self) -> EditorMode {
        self.mode
    }

    pub fn tree(&self) -> &VisualTree {
        &self.tree
    }

    pub fn source(&self) -> String {
        self.source.to_string()
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn templates(&self) -> &[CustomEditorDefinition] {
        &self.templates
    }

    pub fn dialog(&self) -> Option<Dialog> {
        self.dialog
    }

    pub fn live_selection(&self) -> &LiveSelection {
        &self.live
    }

    pub fn enter_memory(&self) -> EnterKeyMemory {
        self.enter_memory
    }

    /// How many times the two representations have been brought in step.
    pub fn sync_count(&self) -> u64 {
        self.syncs
    }

    fn escape_window(&self) -> Duration {
        Duration::from_millis(self.config.escape_window_ms)
    }

    fn end_of_document(&self) -> Position {
        let root = self.tree.root();
        Position::new(root, self.tree.children(root).len())
    }

    // === Selection ===

    /// The host moved the selection inside the editable region.
    pub fn set_selection(&mut self, range: DomRange) {
        self.live.set(range);
    }

    pub fn set_cursor(&mut self, at: Position) {
        self.live.collapse(at);
    }

    /// Focus left the editable region.
    pub fn blur(&mut self) {
        self.live.blur();
    }

    // === Mode synchronization ===

    /// Bring the inactive representation up to date with the active one.
    pub fn resync(&mut self) {
        match self.mode {
            EditorMode::Visual => self.source.set(&visual_to_source(&self.tree)),
            EditorMode::Source => self.tree = source_to_visual(&self.source.to_string()),
        }
        self.syncs += 1;
        tracing::trace!(target: "folio::sync", mode = ?self.mode, syncs = self.syncs, "resynced");
    }

    /// Switch between visual and source editing. Pending dialogs and the
    /// Enter memory do not survive the switch.
    pub fn toggle_mode(&mut self) -> EditorMode {
        self.resync();
        self.mode = self.mode.other();
        self.selection.invalidate();
        self.enter_memory = EnterKeyMemory::new();
        self.dialog = None;
        self.live = LiveSelection::new();
        tracing::debug!(target: "folio::editor", mode = ?self.mode, "switched mode");
        self.mode
    }

    /// Replace the source text, as typed into the source view.
    pub fn set_source(&mut self, text: &str) {
        self.source.set(text);
    }

    /// Content as it will be stored.
    pub fn content_for_save(&mut self) -> String {
        if self.mode == EditorMode::Visual {
            self.resync();
        }
        self.source.to_string()
    }

    pub async fn save(&mut self, store: &impl PostStore) -> Result<(), EditorError> {
        let content = self.content_for_save();
        let len = content.len();
        store
            .save_content(content)
            .await
            .map_err(|e| EditorError::Storage(e.to_string()))?;
        tracing::info!(target: "folio::editor", len, "saved content");
        Ok(())
    }

    // === Keys ===

    pub fn handle_key(&mut self, combo: &KeyCombo) -> KeydownResult {
        self.handle_key_at(combo, Instant::now())
    }

    /// Handle a keydown that happened at `now`.
    pub fn handle_key_at(&mut self, combo: &KeyCombo, now: Instant) -> KeydownResult {
        if self.mode == EditorMode::Source {
            return KeydownResult::NotHandled;
        }
        if combo.key != Key::Enter {
            return match EditCommand::for_combo(combo) {
                Some(command) if self.exec(&command) => KeydownResult::Handled,
                _ => KeydownResult::NotHandled,
            };
        }

        let range = self.live.valid_range(&self.tree);
        let block = range.and_then(|r| enclosing_quote_or_note(&self.tree, r.start.node));
        let input = EnterInput::new(
            combo.modifiers,
            self.config.linebreak_modifier,
            block,
            now,
        );
        let (action, memory) = interpret_enter(&input, self.enter_memory, self.escape_window());
        self.enter_memory = memory;
        tracing::debug!(target: "folio::keys", ?action, "enter");

        match action {
            EnterAction::PassThrough => return KeydownResult::PassThrough,
            EnterAction::RecordPress { .. } => {}
            EnterAction::EscapeBlock { block } => {
                if let Some(at) = escape_block(&mut self.tree, block) {
                    self.live.collapse(at);
                }
            }
            EnterAction::InsertLineBreak => {
                let at = self.cursor_for_edit(range);
                let end = self.tree.insert_line_break(at);
                self.live.collapse(end);
            }
            EnterAction::SplitParagraph => {
                let at = self.cursor_for_edit(range);
                let end = self.tree.split_paragraph(at);
                self.live.collapse(end);
            }
        }
        self.resync();
        KeydownResult::Handled
    }

    /// Collapse a selection by deleting it, or fall back to the end of the
    /// document when there is no cursor.
    fn cursor_for_edit(&mut self, range: Option<DomRange>) -> Position {
        match range {
            Some(range) if range.is_collapsed() => range.start,
            Some(range) => self.tree.delete_range(range),
            None => self.end_of_document(),
        }
    }

    /// Type text at the cursor, replacing any selection.
    pub fn insert_text(&mut self, text: &str) {
        if self.mode == EditorMode::Source {
            self.source.push(text);
            return;
        }
        let range = self.live.valid_range(&self.tree);
        let at = self.cursor_for_edit(range);
        let end = self.tree.insert_text(at, text);
        self.live.collapse(end);
        self.resync();
    }

    /// Apply a toolbar command to the live selection. Returns whether
    /// anything changed.
    pub fn exec(&mut self, command: &EditCommand) -> bool {
        if self.mode == EditorMode::Source {
            return false;
        }
        let Some(range) = self.live.valid_range(&self.tree) else {
            return false;
        };
        match execute(&mut self.tree, command, range) {
            Some(range) => {
                self.live.set(range);
                self.resync();
                true
            }
            None => false,
        }
    }

    // === Dialogs ===

    /// A dialog is about to take focus. Whatever an earlier dialog left
    /// behind is discarded and the current selection captured.
    pub fn begin_dialog(&mut self, dialog: Dialog) {
        self.selection.invalidate();
        if self.mode == EditorMode::Visual {
            self.selection.capture(&self.tree, &self.live);
        }
        self.dialog = Some(dialog);
    }

    pub fn cancel_dialog(&mut self) {
        self.selection.invalidate();
        self.dialog = None;
    }

    /// Selection to insert at: the restored snapshot while a dialog is
    /// pending, otherwise the live selection.
    fn target_range(&mut self) -> Option<DomRange> {
        if !self.selection.is_pending() {
            return self.live.valid_range(&self.tree);
        }
        if self.selection.restore(&self.tree, &mut self.live) {
            self.live.range()
        } else {
            tracing::debug!(
                target: "folio::editor",
                "selection could not be restored, inserting at end of document"
            );
            None
        }
    }

    fn insertion_point(&mut self) -> Position {
        let range = self.target_range();
        self.cursor_for_edit(range)
    }

    // === Insertion ===

    /// Commit a validated fragment at the insertion point (visual) or at
    /// the end of the buffer (source).
    pub fn insert_fragment(&mut self, fragment: &Fragment) {
        let html = fragment.to_html();
        match self.mode {
            EditorMode::Source => self.source.append_block(&html),
            EditorMode::Visual => self.commit_html(&html),
        }
        self.finish_commit();
    }

    fn commit_html(&mut self, html: &str) {
        let at = self.insertion_point();
        let parsed = parse_fragment(html);
        let nodes = self.tree.import_children(&parsed, parsed.root());
        let mut end = self.tree.insert_nodes(at, &nodes);
        if at.node == self.tree.root() {
            tidy_top_level(&mut self.tree);
            end = nodes
                .last()
                .and_then(|&last| Position::after(&self.tree, last))
                .unwrap_or_else(|| self.end_of_document());
        }
        self.live.collapse(end);
    }

    fn finish_commit(&mut self) {
        self.selection.invalidate();
        self.dialog = None;
        self.resync();
    }

    /// Turn the selection into a link, or insert the URL as link text when
    /// nothing is selected.
    pub fn submit_link(&mut self, url: &str, new_tab: bool) -> Result<(), EditorError> {
        let fragment = Fragment::link(url, &self.config.default_link_label, new_tab)?;
        if self.mode == EditorMode::Source {
            self.insert_fragment(&fragment);
            return Ok(());
        }
        let url = url.trim();
        match self.target_range() {
            Some(range) => {
                let mut anchors = self.tree.wrap_in_link(range, url);
                if anchors.is_empty() {
                    anchors.extend(
                        self.tree
                            .ancestors(range.start.node)
                            .find(|&n| self.tree.is_tag(n, "a")),
                    );
                }
                if new_tab {
                    for &a in &anchors {
                        if let Some(el) = self.tree.element_mut(a) {
                            el.set_attr("target", "_blank");
                            el.set_attr("rel", "noopener noreferrer");
                        }
                    }
                }
                if let Some(end) = anchors.last().and_then(|&a| Position::after(&self.tree, a)) {
                    self.live.collapse(end);
                }
            }
            None => {
                let fallback = Fragment::link(url, url, new_tab)?;
                self.commit_html(&fallback.to_html());
            }
        }
        self.finish_commit();
        Ok(())
    }

    pub fn submit_button(
        &mut self,
        text: &str,
        url: &str,
        color: &str,
        new_tab: bool,
    ) -> Result<(), EditorError> {
        let fragment = Fragment::button(text, url, color, new_tab, self.config.button_delimiter)?;
        self.insert_fragment(&fragment);
        Ok(())
    }

    pub fn insert_youtube(&mut self, url: &str) -> Result<(), EditorError> {
        let fragment = Fragment::youtube(url)?;
        self.insert_fragment(&fragment);
        Ok(())
    }

    pub fn insert_note(&mut self, text: &str, color: &str) -> Result<(), EditorError> {
        let fragment = Fragment::note(text, BlockColor::from_input(color))?;
        self.insert_fragment(&fragment);
        Ok(())
    }

    pub fn insert_quote(
        &mut self,
        text: &str,
        cite: Option<&str>,
        color: &str,
    ) -> Result<(), EditorError> {
        let fragment = Fragment::quote(text, cite, BlockColor::from_input(color))?;
        self.insert_fragment(&fragment);
        Ok(())
    }

    pub fn insert_snippet(&mut self, snippet: Snippet) {
        self.insert_fragment(&Fragment::Snippet(snippet));
    }

    pub fn insert_image(&mut self, src: &str, alt: &str) -> Result<(), EditorError> {
        let fragment = Fragment::image(src, alt)?;
        self.insert_fragment(&fragment);
        Ok(())
    }

    /// Insert a stored template by id.
    pub fn insert_custom(&mut self, id: i64) -> Result<(), EditorError> {
        let html = self
            .templates
            .iter()
            .find(|t| t.id == id)
            .map(|t| t.html_template.clone())
            .ok_or(ValidationError::UnknownTemplate(id))?;
        self.insert_fragment(&Fragment::custom(html));
        Ok(())
    }

    // === Collaborators ===

    pub fn set_templates(&mut self, mut templates: Vec<CustomEditorDefinition>) {
        templates.sort_by_key(|t| t.order);
        self.templates = templates;
    }

    /// Fetch the custom templates, ordered for the toolbar.
    pub async fn load_templates(&mut self, store: &impl TemplateStore) -> Result<usize, EditorError> {
        let templates = store
            .list_templates()
            .await
            .map_err(|e| EditorError::Templates(e.to_string()))?;
        self.set_templates(templates);
        tracing::debug!(target: "folio::editor", count = self.templates.len(), "loaded templates");
        Ok(self.templates.len())
    }

    /// Upload a picked image and insert it at the cursor current when the
    /// upload finishes.
    pub async fn upload_and_insert(
        &mut self,
        uploader: &impl ImageUploader,
        file: UploadFile,
    ) -> Result<(), EditorError> {
        let name = file.name.clone();
        let url = upload(uploader, file).await?;
        self.insert_image(&url, &name)
    }

    /// Upload a dropped image and insert it where it was dropped, or at the
    /// end when the drop position no longer exists.
    pub async fn drop_image(
        &mut self,
        uploader: &impl ImageUploader,
        file: UploadFile,
        at: Option<Position>,
    ) -> Result<(), EditorError> {
        if !file.is_image() {
            return Err(ValidationError::NotAnImage(file.name).into());
        }
        let name = file.name.clone();
        let url = upload(uploader, file).await?;
        self.selection.invalidate();
        if self.mode == EditorMode::Visual {
            let at = at
                .filter(|p| p.is_valid(&self.tree))
                .unwrap_or_else(|| self.end_of_document());
            self.live.collapse(at);
        }
        self.insert_image(&url, &name)
    }
}

async fn upload(uploader: &impl ImageUploader, file: UploadFile) -> Result<String, EditorError> {
    let name = file.name.clone();
    match uploader.upload(file).await {
        Ok(url) => {
            tracing::info!(target: "folio::editor", %name, %url, "uploaded image");
            Ok(url)
        }
        Err(e) => {
            tracing::warn!(target: "folio::editor", %name, error = %e, "image upload failed");
            Err(EditorError::Upload(e.to_string()))
        }
    }
}
