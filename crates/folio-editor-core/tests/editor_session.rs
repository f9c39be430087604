// End-to-end behavior of an editing session: key handling, dialogs,
// collaborator round trips and mode synchronization.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use folio_common::{
    CollabError, CustomEditorDefinition, EditorConfig, ImageUploader, LinebreakModifier,
    PostStore, TemplateStore, UploadFile,
};
use folio_editor_core::{
    BlockKind, Dialog, DomRange, Editor, EditorError, EditorMode, Key, KeyCombo, KeydownResult,
    Position, SelectionManager, LiveSelection, ValidationError, classify, serialize_children,
    source_to_visual, visual_to_source,
};
use web_time::{Duration, Instant};

fn html(editor: &Editor) -> String {
    serialize_children(editor.tree(), editor.tree().root())
}

fn first_text(editor: &Editor) -> folio_editor_core::NodeId {
    let tree = editor.tree();
    tree.preorder(tree.root())
        .into_iter()
        .find(|&n| tree.is_text(n))
        .unwrap()
}

fn enter() -> KeyCombo {
    KeyCombo::new(Key::Enter)
}

struct FakeUploader {
    result: Result<String, String>,
    calls: AtomicUsize,
}

impl FakeUploader {
    fn ok(url: &str) -> Self {
        Self {
            result: Ok(url.to_owned()),
            calls: AtomicUsize::new(0),
        }
    }

    fn failing(message: &str) -> Self {
        Self {
            result: Err(message.to_owned()),
            calls: AtomicUsize::new(0),
        }
    }
}

impl ImageUploader for FakeUploader {
    async fn upload(&self, _file: UploadFile) -> Result<String, CollabError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone().map_err(CollabError)
    }
}

#[derive(Default)]
struct RecordingStore {
    saved: Mutex<Vec<String>>,
}

impl PostStore for RecordingStore {
    async fn save_content(&self, content: String) -> Result<(), CollabError> {
        self.saved.lock().unwrap().push(content);
        Ok(())
    }
}

struct BrokenStore;

impl PostStore for BrokenStore {
    async fn save_content(&self, _content: String) -> Result<(), CollabError> {
        Err("database is read-only".into())
    }
}

struct FixedTemplates(Vec<CustomEditorDefinition>);

impl TemplateStore for FixedTemplates {
    async fn list_templates(&self) -> Result<Vec<CustomEditorDefinition>, CollabError> {
        Ok(self.0.clone())
    }
}

fn png(name: &str) -> UploadFile {
    UploadFile::new(name, "image/png", vec![0x89, b'P', b'N', b'G'])
}

// === Mode synchronization ===

#[test]
fn test_conversion_is_idempotent() {
    let inputs = [
        "",
        "plain words",
        "<p>a</p><p>b<br>c</p>",
        "<h2>t</h2>\n\n\n\n<ul><li>x</li><li>y</li></ul>",
        "<p>unclosed <b>bold",
        r#"<div style="border-left:4px solid #a855f7"><strong>📝 注釈:</strong> legacy</div>"#,
        r#"<blockquote class="quote quote--red">q<br><cite>― c</cite></blockquote><table><tr><td>1</td></tr></table>"#,
        "<p>a</p>\r\n<br>\r\n<p>b</p>",
        "<strong>Hello</strong> <em>world</em>\n<p>after</p>",
    ];
    for input in inputs {
        let source = visual_to_source(&source_to_visual(input));
        assert_eq!(visual_to_source(&source_to_visual(&source)), source, "input: {input}");

        let once = source_to_visual(&visual_to_source(&source_to_visual(input)));
        let twice = source_to_visual(&visual_to_source(&once));
        assert_eq!(
            serialize_children(&twice, twice.root()),
            serialize_children(&once, once.root()),
            "input: {input}"
        );
    }
}

#[test]
fn test_legacy_and_modern_markup_behave_alike() {
    let legacy = r#"<div style="background:#f9731610;border-left:4px solid #f97316;padding:1rem 1.25rem;"><strong>📝 注釈:</strong> memo</div>"#;
    let modern = r#"<div class="note note--orange"><strong>📝 注釈:</strong> memo</div>"#;

    let legacy_raw = folio_editor_core::parse_fragment(legacy);
    let modern_raw = folio_editor_core::parse_fragment(modern);
    let kind = |tree: &folio_editor_core::VisualTree| {
        classify(tree, tree.first_child(tree.root()).unwrap())
    };
    assert_eq!(kind(&legacy_raw), BlockKind::Note);
    assert_eq!(kind(&modern_raw), BlockKind::Note);

    let mut a = Editor::with_content(EditorConfig::default(), legacy);
    let mut b = Editor::with_content(EditorConfig::default(), modern);
    assert_eq!(a.content_for_save(), b.content_for_save());
    assert_eq!(a.content_for_save(), modern);
}

#[test]
fn test_source_edits_show_up_in_visual_mode() {
    let mut ed = Editor::with_content(EditorConfig::default(), "<p>a</p>");
    assert_eq!(ed.toggle_mode(), EditorMode::Source);
    ed.set_source("<p>a</p>\n<h3>b</h3>");
    ed.insert_youtube("https://www.youtube.com/shorts/abcdefghijk").unwrap();
    assert_eq!(ed.toggle_mode(), EditorMode::Visual);
    assert_eq!(
        html(&ed),
        concat!(
            "<p>a</p><h3>b</h3>",
            r#"<div class="youtube-wrap"><iframe src="https://www.youtube.com/embed/abcdefghijk" allowfullscreen=""></iframe></div>"#,
        )
    );
}

#[test]
fn test_space_between_inline_siblings_survives_conversion() {
    let tree = source_to_visual("<strong>Hello</strong> <em>world</em>");
    assert_eq!(tree.text_content(tree.root()), "Hello world");
    assert_eq!(
        visual_to_source(&tree),
        "<p><strong>Hello</strong> <em>world</em></p>"
    );
}

#[test]
fn test_links_added_in_source_mode_stay_apart() {
    let mut ed = Editor::with_content(EditorConfig::default(), "");
    assert_eq!(ed.toggle_mode(), EditorMode::Source);
    ed.submit_link("/a", false).unwrap();
    ed.submit_link("/b", false).unwrap();
    assert_eq!(ed.toggle_mode(), EditorMode::Visual);
    assert_eq!(
        ed.content_for_save(),
        r#"<p><a href="/a">リンク</a> <a href="/b">リンク</a></p>"#
    );
}

// === Escape gesture ===

#[test]
fn test_double_enter_leaves_quote() {
    let mut ed = Editor::with_content(
        EditorConfig::default(),
        r#"<blockquote class="quote quote--blue">引用文<br></blockquote>"#,
    );
    let text = first_text(&ed);
    ed.set_cursor(Position::new(text, 3));

    let t0 = Instant::now();
    assert_eq!(ed.handle_key_at(&enter(), t0), KeydownResult::Handled);
    assert_eq!(
        html(&ed),
        r#"<blockquote class="quote quote--blue">引用文<br></blockquote>"#
    );
    assert!(!ed.enter_memory().is_empty());

    let t1 = t0 + Duration::from_millis(500);
    assert_eq!(ed.handle_key_at(&enter(), t1), KeydownResult::Handled);
    assert_eq!(
        html(&ed),
        r#"<blockquote class="quote quote--blue">引用文</blockquote><p><br></p>"#
    );
    assert!(ed.enter_memory().is_empty());

    let cursor = ed.live_selection().range().unwrap().start;
    assert_eq!(ed.tree().tag(cursor.node), Some("p"));
    assert_eq!(cursor.offset, 0);
    assert_eq!(ed.sync_count(), 2);
}

#[test]
fn test_slow_enters_stay_in_note() {
    let mut ed = Editor::with_content(
        EditorConfig::default(),
        r#"<div class="note note--gray"><strong>📝 注釈:</strong> text</div>"#,
    );
    let tree = ed.tree();
    let note = tree.first_child(tree.root()).unwrap();
    let tail = tree.last_child(note).unwrap();
    ed.set_cursor(Position::new(tail, 5));

    let t0 = Instant::now();
    ed.handle_key_at(&enter(), t0);
    ed.handle_key_at(&enter(), t0 + Duration::from_millis(1500));
    assert_eq!(
        html(&ed),
        r#"<div class="note note--gray"><strong>📝 注釈:</strong> text</div>"#
    );

    ed.handle_key_at(&enter(), t0 + Duration::from_millis(2000));
    assert_eq!(
        html(&ed),
        r#"<div class="note note--gray"><strong>📝 注釈:</strong> text</div><p><br></p>"#
    );
}

#[test]
fn test_escape_window_and_modifier_are_configurable() {
    let config = EditorConfig {
        escape_window_ms: 100,
        linebreak_modifier: LinebreakModifier::Ctrl,
        ..EditorConfig::default()
    };
    let mut ed = Editor::with_content(config, "<blockquote>q</blockquote>");
    let text = first_text(&ed);
    ed.set_cursor(Position::new(text, 1));

    let t0 = Instant::now();
    ed.handle_key_at(&enter(), t0);
    ed.handle_key_at(&enter(), t0 + Duration::from_millis(300));
    assert_eq!(html(&ed), "<blockquote>q</blockquote>");

    ed.handle_key_at(&KeyCombo::ctrl(Key::Enter), t0 + Duration::from_millis(350));
    assert_eq!(html(&ed), "<blockquote>q<br><br></blockquote>");
    assert!(ed.enter_memory().is_empty());
}

// === Dialogs and fragments ===

#[test]
fn test_youtube_validation() {
    let mut ed = Editor::with_content(EditorConfig::default(), "<p>x</p>");
    for bad in ["", "https://vimeo.com/12345", "https://youtu.be/short"] {
        assert!(matches!(
            ed.insert_youtube(bad),
            Err(EditorError::Validation(
                ValidationError::EmptyUrl | ValidationError::InvalidYouTubeUrl(_)
            ))
        ));
    }
    assert_eq!(html(&ed), "<p>x</p>");

    ed.insert_youtube("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=10")
        .unwrap();
    assert!(html(&ed).ends_with(
        r#"<div class="youtube-wrap"><iframe src="https://www.youtube.com/embed/dQw4w9WgXcQ" allowfullscreen=""></iframe></div>"#
    ));
}

#[test]
fn test_selection_survives_dialog() {
    let mut ed = Editor::with_content(EditorConfig::default(), "<p>Hello world</p>");
    let text = first_text(&ed);
    ed.set_cursor(Position::new(text, 3));

    ed.begin_dialog(Dialog::Quote);
    ed.blur();
    assert_eq!(ed.live_selection().range(), None);
    ed.insert_quote("words", Some("someone"), "purple").unwrap();

    insta::assert_snapshot!(ed.content_for_save(), @r#"
    <p>Hel</p>

    <blockquote class="quote quote--purple">words<br>
    <cite>― someone</cite></blockquote>

    <p>lo world</p>
    "#);
}

#[test]
fn test_snapshot_round_trip_is_exact() {
    let tree = folio_editor_core::parse_fragment("<p>Hello</p>");
    let p = tree.first_child(tree.root()).unwrap();
    let text = tree.first_child(p).unwrap();
    let range = DomRange::new(Position::new(text, 1), Position::new(text, 4));

    let mut live = LiveSelection::new();
    live.set(range);
    let mut manager = SelectionManager::new();
    manager.capture(&tree, &live);
    live.blur();
    assert!(manager.restore(&tree, &mut live));
    assert_eq!(live.range(), Some(range));
}

#[test]
fn test_dialog_opened_without_selection_appends() {
    let mut ed = Editor::with_content(EditorConfig::default(), "<p>one</p><p>two</p>");
    let text = first_text(&ed);
    ed.set_cursor(Position::new(text, 1));
    ed.blur();
    ed.begin_dialog(Dialog::Note);

    // Focus comes back before the dialog is confirmed; the empty capture wins.
    ed.set_cursor(Position::new(text, 1));
    ed.insert_note("late", "blue").unwrap();
    assert_eq!(
        html(&ed),
        r#"<p>one</p><p>two</p><div class="note note--blue"><strong>📝 注釈:</strong> late</div>"#
    );
}

#[test]
fn test_stale_snapshot_falls_back_to_end() {
    let mut ed = Editor::with_content(EditorConfig::default(), "<p>one</p><p>two</p>");
    let text = first_text(&ed);
    ed.set_selection(DomRange::new(Position::new(text, 0), Position::new(text, 3)));
    ed.begin_dialog(Dialog::Link);

    // Typing over the selection removes the node the capture points into.
    ed.insert_text("1");
    ed.submit_link("/x", false).unwrap();
    assert_eq!(html(&ed), r#"<p>1</p><p>two</p><p><a href="/x">/x</a></p>"#);
}

#[test]
fn test_button_delimiter_and_defaults() {
    let config = EditorConfig::default();
    assert!(config.button_new_tab);
    let mut ed = Editor::with_content(config, "");
    ed.submit_button("今すぐ|登録|する", "https://example.com/?a=1&b=2", "", true)
        .unwrap();
    insta::assert_snapshot!(html(&ed), @r#"<div class="btn-wrap"><a href="https://example.com/?a=1&amp;b=2" class="btn btn-c" target="_blank" rel="noopener noreferrer">今すぐ<br class="sp-only">登録<br class="sp-only">する</a></div>"#);

    assert!(matches!(
        ed.submit_button("||", "/x", "", true),
        Err(EditorError::Validation(ValidationError::EmptyButtonText))
    ));
}

#[test]
fn test_custom_delimiter() {
    let config = EditorConfig {
        button_delimiter: '/',
        ..EditorConfig::default()
    };
    let mut ed = Editor::with_content(config, "");
    ed.submit_button("a/b|c", "/x", "btn-k", false).unwrap();
    assert_eq!(
        html(&ed),
        r#"<div class="btn-wrap"><a href="/x" class="btn btn-k">a<br class="sp-only">b|c</a></div>"#
    );
}

// === Collaborators ===

#[tokio::test]
async fn test_upload_inserts_at_cursor() {
    let mut ed = Editor::with_content(EditorConfig::default(), "<p>one</p><p>two</p>");
    let tree = ed.tree();
    let second = tree.children(tree.root())[1];
    let text = tree.first_child(second).unwrap();
    ed.set_cursor(Position::new(text, 3));

    let uploader = FakeUploader::ok("https://cdn.example.com/cat.png");
    ed.upload_and_insert(&uploader, png("cat.png")).await.unwrap();
    assert_eq!(
        html(&ed),
        r#"<p>one</p><p>two<img src="https://cdn.example.com/cat.png" alt="cat.png"></p>"#
    );
}

#[tokio::test]
async fn test_upload_failure_inserts_nothing() {
    let mut ed = Editor::with_content(EditorConfig::default(), "<p>one</p>");
    let uploader = FakeUploader::failing("quota exceeded");
    let err = ed.upload_and_insert(&uploader, png("a.png")).await.unwrap_err();
    assert!(matches!(&err, EditorError::Upload(msg) if msg == "quota exceeded"));
    assert_eq!(err.to_string(), "image upload failed: quota exceeded");
    assert_eq!(html(&ed), "<p>one</p>");
}

#[tokio::test]
async fn test_drop_lands_at_drop_position() {
    let mut ed = Editor::with_content(EditorConfig::default(), "<p>one</p><p>two</p>");
    let root = ed.tree().root();
    let uploader = FakeUploader::ok("/img/b.png");

    ed.drop_image(&uploader, png("b.png"), Some(Position::new(root, 1)))
        .await
        .unwrap();
    assert_eq!(
        html(&ed),
        r#"<p>one</p><p><img src="/img/b.png" alt="b.png"></p><p>two</p>"#
    );

    let err = ed
        .drop_image(&uploader, UploadFile::new("notes.txt", "text/plain", vec![]), None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EditorError::Validation(ValidationError::NotAnImage(name)) if name == "notes.txt"
    ));
    assert_eq!(uploader.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_templates_load_in_order() {
    let store = FixedTemplates(
        serde_json::from_str(
            r#"[
                {"id": 7, "name": "CTA", "icon": "", "html": "<div class=\"cta\">buy</div>", "order": 3},
                {"id": 3, "name": "Divider", "icon": "➖", "html_template": "<hr>", "order": 1}
            ]"#,
        )
        .unwrap(),
    );
    let mut ed = Editor::with_content(EditorConfig::default(), "<p>x</p>");
    assert_eq!(ed.load_templates(&store).await.unwrap(), 2);
    let names: Vec<_> = ed.templates().iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, ["Divider", "CTA"]);
    assert_eq!(ed.templates()[1].display_icon(), "⚡");

    ed.insert_custom(7).unwrap();
    assert_eq!(html(&ed), r#"<p>x</p><div class="cta">buy</div>"#);
}

#[tokio::test]
async fn test_save_hands_off_synced_source() {
    let mut ed = Editor::with_content(EditorConfig::default(), "<p>draft</p>");
    let text = first_text(&ed);
    ed.set_cursor(Position::new(text, 5));
    ed.insert_text("!");

    let store = RecordingStore::default();
    ed.save(&store).await.unwrap();
    assert_eq!(*store.saved.lock().unwrap(), ["<p>draft!</p>"]);

    let err = ed.save(&BrokenStore).await.unwrap_err();
    assert!(matches!(err, EditorError::Storage(msg) if msg == "database is read-only"));
}
