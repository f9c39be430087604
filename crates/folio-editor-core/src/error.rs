//! Errors surfaced to whoever drives the editor.

use miette::Diagnostic;

/// Rejected user input. Nothing in the document changes when one of these
/// comes back.
#[derive(thiserror::Error, Debug, Diagnostic, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("a URL is required")]
    #[diagnostic(code(folio::validation::empty_url))]
    EmptyUrl,

    #[error("text is required")]
    #[diagnostic(code(folio::validation::empty_text))]
    EmptyText,

    #[error("button text is required")]
    #[diagnostic(code(folio::validation::empty_button_text))]
    EmptyButtonText,

    #[error("not a YouTube video URL: {0}")]
    #[diagnostic(
        code(folio::validation::youtube_url),
        help("use a youtu.be link or a youtube.com watch, embed or shorts link")
    )]
    InvalidYouTubeUrl(String),

    #[error("no template with id {0}")]
    #[diagnostic(code(folio::validation::unknown_template))]
    UnknownTemplate(i64),

    #[error("{0} is not an image")]
    #[diagnostic(code(folio::validation::not_an_image))]
    NotAnImage(String),
}

#[derive(thiserror::Error, Debug, Diagnostic)]
pub enum EditorError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Validation(#[from] ValidationError),

    /// The upload service refused the file. The message is the service's own.
    #[error("image upload failed: {0}")]
    #[diagnostic(code(folio::editor::upload))]
    Upload(String),

    #[error("could not save the post: {0}")]
    #[diagnostic(code(folio::editor::storage))]
    Storage(String),

    #[error("could not load templates: {0}")]
    #[diagnostic(code(folio::editor::templates))]
    Templates(String),
}
