//! Insertable fragments.
//!
//! Each builder validates user input and returns a [`Fragment`]; nothing
//! touches the document until the editor commits one. User text and URLs
//! are always escaped, and the only class names written are the palette's.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::ValidationError;
use crate::html::{escape_attr, escape_html};
use crate::palette::{BlockColor, ButtonColor};

static YOUTUBE_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:youtu\.be/|youtube\.com/(?:watch\?v=|embed/|shorts/))([a-zA-Z0-9_-]{11})")
        .unwrap()
});

const NEW_TAB_ATTRS: &str = r#" target="_blank" rel="noopener noreferrer""#;

/// Marker for a line break that only shows on narrow screens.
pub const MOBILE_BREAK: &str = r#"<br class="sp-only">"#;

pub const NOTE_PREFIX: &str = "📝 注釈:";

/// Extract the 11-character video id from a YouTube URL.
pub fn youtube_id(url: &str) -> Option<&str> {
    YOUTUBE_ID_RE
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Fixed markup shortcuts from the toolbar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Snippet {
    EmptyParagraph,
    BulletList,
    NumberedList,
    ListItem,
    Heading(u8),
    MobileBreak,
}

impl Snippet {
    pub fn html(self) -> &'static str {
        match self {
            Self::EmptyParagraph => "<p><br></p>",
            Self::BulletList => "<ul>\n<li>項目</li>\n</ul>",
            Self::NumberedList => "<ol>\n<li>項目</li>\n</ol>",
            Self::ListItem => "<li></li>",
            Self::Heading(2) => "<h2></h2>",
            Self::Heading(3) => "<h3></h3>",
            Self::Heading(_) => "<h4></h4>",
            Self::MobileBreak => MOBILE_BREAK,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    Link {
        url: String,
        label: String,
        new_tab: bool,
    },
    Button {
        url: String,
        /// Text pieces, joined by mobile-only breaks.
        segments: Vec<String>,
        color: ButtonColor,
        new_tab: bool,
    },
    YouTube {
        video_id: String,
    },
    Note {
        text: String,
        color: BlockColor,
    },
    Quote {
        text: String,
        cite: Option<String>,
        color: BlockColor,
    },
    Image {
        src: String,
        alt: String,
    },
    /// Trusted template markup, inserted as-is.
    Custom {
        html: String,
    },
    Snippet(Snippet),
}

fn required(value: &str, err: ValidationError) -> Result<String, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        Err(err)
    } else {
        Ok(value.to_owned())
    }
}

impl Fragment {
    pub fn link(url: &str, label: &str, new_tab: bool) -> Result<Self, ValidationError> {
        Ok(Self::Link {
            url: required(url, ValidationError::EmptyUrl)?,
            label: label.trim().to_owned(),
            new_tab,
        })
    }

    /// `text` is split on `delimiter`; empty pieces are dropped. `color` may
    /// be a JSON color spec, a class name or a plain color, with anything
    /// unrecognized giving the default button.
    pub fn button(
        text: &str,
        url: &str,
        color: &str,
        new_tab: bool,
        delimiter: char,
    ) -> Result<Self, ValidationError> {
        let segments: Vec<String> = text
            .split(delimiter)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect();
        if segments.is_empty() {
            return Err(ValidationError::EmptyButtonText);
        }
        Ok(Self::Button {
            url: required(url, ValidationError::EmptyUrl)?,
            segments,
            color: ButtonColor::from_input(color),
            new_tab,
        })
    }

    pub fn youtube(url: &str) -> Result<Self, ValidationError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(ValidationError::EmptyUrl);
        }
        let video_id = youtube_id(url)
            .ok_or_else(|| ValidationError::InvalidYouTubeUrl(url.to_owned()))?;
        Ok(Self::YouTube {
            video_id: video_id.to_owned(),
        })
    }

    pub fn note(text: &str, color: BlockColor) -> Result<Self, ValidationError> {
        Ok(Self::Note {
            text: required(text, ValidationError::EmptyText)?,
            color,
        })
    }

    pub fn quote(text: &str, cite: Option<&str>, color: BlockColor) -> Result<Self, ValidationError> {
        Ok(Self::Quote {
            text: required(text, ValidationError::EmptyText)?,
            cite: cite.map(str::trim).filter(|c| !c.is_empty()).map(str::to_owned),
            color,
        })
    }

    pub fn image(src: &str, alt: &str) -> Result<Self, ValidationError> {
        Ok(Self::Image {
            src: required(src, ValidationError::EmptyUrl)?,
            alt: alt.to_owned(),
        })
    }

    pub fn custom(html: impl Into<String>) -> Self {
        Self::Custom { html: html.into() }
    }

    pub fn to_html(&self) -> String {
        let mut html = String::new();
        match self {
            Self::Link {
                url,
                label,
                new_tab,
            } => {
                html.push_str("<a href=\"");
                html.push_str(&escape_attr(url));
                html.push('"');
                if *new_tab {
                    html.push_str(NEW_TAB_ATTRS);
                }
                html.push('>');
                html.push_str(&escape_html(label));
                html.push_str("</a>");
            }
            Self::Button {
                url,
                segments,
                color,
                new_tab,
            } => render_button(&mut html, url, segments, *color, *new_tab),
            Self::YouTube { video_id } => {
                html.push_str("<div class=\"youtube-wrap\"><iframe src=\"https://www.youtube.com/embed/");
                html.push_str(&escape_attr(video_id));
                html.push_str("\" allowfullscreen=\"\"></iframe></div>");
            }
            Self::Note { text, color } => {
                html.push_str("<div class=\"note note--");
                html.push_str(color.name());
                html.push_str("\"><strong>");
                html.push_str(NOTE_PREFIX);
                html.push_str("</strong> ");
                html.push_str(&escape_html(text));
                html.push_str("</div>");
            }
            Self::Quote { text, cite, color } => {
                html.push_str("<blockquote class=\"quote quote--");
                html.push_str(color.name());
                html.push_str("\">");
                html.push_str(&escape_html(text));
                if let Some(cite) = cite {
                    html.push_str("<br><cite>― ");
                    html.push_str(&escape_html(cite));
                    html.push_str("</cite>");
                }
                html.push_str("</blockquote>");
            }
            Self::Image { src, alt } => {
                html.push_str("<img src=\"");
                html.push_str(&escape_attr(src));
                html.push_str("\" alt=\"");
                html.push_str(&escape_attr(alt));
                html.push_str("\">");
            }
            Self::Custom { html: template } => html.push_str(template),
            Self::Snippet(snippet) => html.push_str(snippet.html()),
        }
        html
    }
}

fn render_button(html: &mut String, url: &str, segments: &[String], color: ButtonColor, new_tab: bool) {
    html.push_str("<div class=\"btn-wrap\"><a href=\"");
    html.push_str(&escape_attr(url));
    html.push_str("\" class=\"btn ");
    html.push_str(color.class_name());
    html.push('"');
    if new_tab {
        html.push_str(NEW_TAB_ATTRS);
    }
    html.push('>');
    for (i, segment) in segments.iter().enumerate() {
        if i > 0 {
            html.push_str(MOBILE_BREAK);
        }
        html.push_str(&escape_html(segment));
    }
    html.push_str("</a></div>");
}
