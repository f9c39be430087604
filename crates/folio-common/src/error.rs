//! Error types shared across folio crates.

use miette::Diagnostic;

/// Main error type for folio configuration and I/O.
#[derive(thiserror::Error, Debug, Diagnostic)]
pub enum FolioError {
    /// Configuration could not be loaded or saved
    #[error("configuration error: {0}")]
    #[diagnostic(
        code(folio::config),
        help("supported configuration formats are `.json` and `.toml`")
    )]
    Config(String),

    /// IO error
    #[error(transparent)]
    #[diagnostic(code(folio::io))]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error(transparent)]
    #[diagnostic_source]
    Serde(#[from] SerDeError),
}

/// Serialization/deserialization errors
#[derive(thiserror::Error, Debug, Diagnostic)]
#[non_exhaustive]
pub enum SerDeError {
    #[error(transparent)]
    #[diagnostic(code(folio::serde::json))]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    #[diagnostic(code(folio::serde::toml))]
    TomlDe(#[from] toml::de::Error),

    #[error(transparent)]
    #[diagnostic(code(folio::serde::toml))]
    TomlSer(#[from] toml::ser::Error),
}

impl From<serde_json::Error> for FolioError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde(SerDeError::Json(err))
    }
}

impl From<toml::de::Error> for FolioError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serde(SerDeError::TomlDe(err))
    }
}

impl From<toml::ser::Error> for FolioError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serde(SerDeError::TomlSer(err))
    }
}

/// Error reported by an external collaborator (upload service, template
/// store, post storage).
///
/// The message is user-facing: the editor shows it as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollabError(pub String);

impl std::fmt::Display for CollabError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for CollabError {}

impl From<&str> for CollabError {
    fn from(s: &str) -> Self {
        CollabError(s.to_string())
    }
}

impl From<String> for CollabError {
    fn from(s: String) -> Self {
        CollabError(s)
    }
}
