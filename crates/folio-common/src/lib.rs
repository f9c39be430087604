//! folio-common: configuration, errors and collaborator contracts shared by
//! the folio editor crates.

pub mod collab;
pub mod config;
pub mod error;
#[cfg(feature = "telemetry")]
pub mod telemetry;

pub use crate::collab::{
    CustomEditorDefinition, ImageUploader, PostStore, TemplateStore, UploadFile,
};
pub use crate::config::{EditorConfig, FileStore, LinebreakModifier, Loader, Saver};
pub use crate::error::{CollabError, FolioError, SerDeError};
