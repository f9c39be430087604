//! folio-editor-core: block editor logic for post bodies, free of any UI
//! framework.
//!
//! This crate provides:
//! - `VisualTree` - arena DOM with a lenient HTML parser and serializer
//! - `classify` - recognizes notes, quotes, buttons and embeds, legacy or not
//! - `StructuredEdit` - the native edit operations on the tree
//! - Enter-key interpretation with the quote/note escape gesture
//! - `Fragment` builders for links, buttons, embeds, notes and quotes
//! - `Editor` - the session keeping the tree and the HTML source in step

pub mod actions;
pub mod classify;
pub mod commands;
pub mod dom;
pub mod editor;
pub mod error;
pub mod fragment;
pub mod html;
pub mod keys;
pub mod palette;
pub mod selection;
pub mod sync;
pub mod text;

pub use actions::{
    BlockFormat, EditCommand, InlineStyle, Key, KeyCombo, KeydownResult, ListKind, Modifiers,
};
pub use classify::{BlockKind, classify, enclosing_quote_or_note};
pub use commands::{StructuredEdit, TextStyle, execute};
pub use dom::{DomRange, Element, NodeId, NodeKind, Position, VisualTree};
pub use editor::{Dialog, Editor, EditorMode};
pub use error::{EditorError, ValidationError};
pub use fragment::{Fragment, Snippet, youtube_id};
pub use html::{parse_fragment, serialize_children, serialize_node};
pub use keys::{
    DEFAULT_ESCAPE_WINDOW, EnterAction, EnterInput, EnterKeyMemory, escape_block, interpret_enter,
};
pub use palette::{BlockColor, ButtonColor};
pub use selection::{LiveSelection, SelectionManager};
pub use smol_str::SmolStr;
pub use sync::{pretty_print, source_to_visual, visual_to_source};
pub use text::{SourceBuffer, TextBuffer};
