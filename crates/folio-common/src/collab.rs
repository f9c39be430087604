//! Contracts for the collaborators the editor core talks to.
//!
//! Image hosting, the custom template store and post storage all live
//! outside the editor. The core only ever sees a final URL, a list of
//! templates, or hands off one HTML string.

use serde::{Deserialize, Serialize};

use crate::error::CollabError;

/// A file picked or dropped by the user, handed to the upload service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Only image files are accepted from drag-and-drop.
    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }
}

/// A pre-authored HTML template managed outside the editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomEditorDefinition {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub icon: String,
    #[serde(alias = "html")]
    pub html_template: String,
    #[serde(default)]
    pub order: i32,
}

impl CustomEditorDefinition {
    /// Icon shown on the toolbar button, with a fallback for templates
    /// saved without one.
    pub fn display_icon(&self) -> &str {
        if self.icon.trim().is_empty() {
            "⚡"
        } else {
            &self.icon
        }
    }
}

/// Uploads an image and returns the public URL to embed.
#[trait_variant::make(Send)]
pub trait ImageUploader {
    async fn upload(&self, file: UploadFile) -> Result<String, CollabError>;
}

/// Read-only source of custom editor templates, polled once at editor load.
#[trait_variant::make(Send)]
pub trait TemplateStore {
    async fn list_templates(&self) -> Result<Vec<CustomEditorDefinition>, CollabError>;
}

/// Receives the synchronized document content on save.
#[trait_variant::make(Send)]
pub trait PostStore {
    async fn save_content(&self, content: String) -> Result<(), CollabError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definition_accepts_store_field_names() {
        let json = r#"[{"id": 3, "name": "CTA", "icon": "", "html": "<p>hi</p>", "order": 1}]"#;
        let defs: Vec<CustomEditorDefinition> = serde_json::from_str(json).unwrap();
        assert_eq!(defs[0].html_template, "<p>hi</p>");
        assert_eq!(defs[0].display_icon(), "⚡");
    }

    #[test]
    fn test_upload_file_image_check() {
        assert!(UploadFile::new("a.png", "image/png", vec![]).is_image());
        assert!(!UploadFile::new("a.pdf", "application/pdf", vec![]).is_image());
    }
}
