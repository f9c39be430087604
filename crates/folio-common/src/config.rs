use serde::{Deserialize, Serialize};

use std::future::Future;
use std::path::Path;
use std::path::PathBuf;

use crate::error::FolioError;

/// Modifier that turns Enter into a plain line break instead of a new
/// paragraph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinebreakModifier {
    /// Cmd on macOS, the Windows key elsewhere.
    #[default]
    Meta,
    Ctrl,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Two Enter presses in the same quote/note block within this window
    /// exit the block.
    pub escape_window_ms: u64,
    /// Modifier that inserts a `<br>` on Enter.
    pub linebreak_modifier: LinebreakModifier,
    /// Character that splits button text into mobile-only line segments.
    pub button_delimiter: char,
    /// Label prefilled in the button dialog.
    pub default_button_label: String,
    /// Anchor text used when a link is appended in source mode.
    pub default_link_label: String,
    /// Whether the button dialog starts with "open in new tab" checked.
    pub button_new_tab: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            escape_window_ms: 1200,
            linebreak_modifier: LinebreakModifier::Meta,
            button_delimiter: '|',
            default_button_label: "詳しくはこちら".to_owned(),
            default_link_label: "リンク".to_owned(),
            button_new_tab: true,
        }
    }
}

impl EditorConfig {
    /// Loads the configuration from the provided loader.
    pub async fn load(loader: &impl Loader) -> Result<Self, FolioError> {
        loader.load().await
    }

    /// Saves the configuration using the provided saver.
    pub async fn save(&self, saver: &impl Saver) -> Result<(), FolioError> {
        saver.save(self).await
    }
}

/// The trait for loading configuration data.
pub trait Loader {
    /// Loads the configuration data.
    fn load(&self) -> impl Future<Output = Result<EditorConfig, FolioError>> + Send;
}

/// The trait for saving configuration data.
pub trait Saver {
    /// Saves the configuration data.
    fn save(&self, config: &EditorConfig) -> impl Future<Output = Result<(), FolioError>> + Send;
}

/// An implementation of [`Loader`] and [`Saver`] that reads and writes a configuration file.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Create a new [`FileStore`] with the given path.
    ///
    /// [`EditorConfig`] data is serialized according to the file extension,
    /// either `.json` or `.toml`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn extension(&self) -> Option<&str> {
        self.path.extension().and_then(|ext| ext.to_str())
    }
}

impl Loader for FileStore {
    async fn load(&self) -> Result<EditorConfig, FolioError> {
        match self.extension() {
            Some("json") => Ok(serde_json::from_str(&std::fs::read_to_string(&self.path)?)?),
            Some("toml") => Ok(toml::from_str(&std::fs::read_to_string(&self.path)?)?),
            other => Err(FolioError::Config(format!(
                "unsupported file format: {}",
                other.unwrap_or("<none>")
            ))),
        }
    }
}

impl Saver for FileStore {
    async fn save(&self, config: &EditorConfig) -> Result<(), FolioError> {
        match self.extension() {
            Some("json") => Ok(std::fs::write(
                &self.path,
                serde_json::to_string_pretty(config)?,
            )?),
            Some("toml") => Ok(std::fs::write(&self.path, toml::to_string_pretty(config)?)?),
            other => Err(FolioError::Config(format!(
                "unsupported file format: {}",
                other.unwrap_or("<none>")
            ))),
        }
    }
}
