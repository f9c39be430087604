//! Fixed color palettes for generated blocks and buttons.
//!
//! Generated markup only ever carries the palette's class names. The hex
//! values are kept so legacy inline-styled content can be mapped back onto
//! a palette entry.

use serde::{Deserialize, Serialize};

/// Palette for note and quote blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlockColor {
    #[default]
    Blue,
    Green,
    Red,
    Orange,
    Purple,
    Gray,
}

#[derive(Deserialize)]
struct BlockColorJson {
    #[serde(default)]
    name: Option<String>,
    #[serde(default, alias = "border_color")]
    border: Option<String>,
}

impl BlockColor {
    pub const ALL: [BlockColor; 6] = [
        Self::Blue,
        Self::Green,
        Self::Red,
        Self::Orange,
        Self::Purple,
        Self::Gray,
    ];

    /// Suffix used in `note--<name>` / `quote--<name>` classes.
    pub fn name(self) -> &'static str {
        match self {
            Self::Blue => "blue",
            Self::Green => "green",
            Self::Red => "red",
            Self::Orange => "orange",
            Self::Purple => "purple",
            Self::Gray => "gray",
        }
    }

    /// Toolbar label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Blue => "ブルー",
            Self::Green => "グリーン",
            Self::Red => "レッド",
            Self::Orange => "オレンジ",
            Self::Purple => "パープル",
            Self::Gray => "グレー",
        }
    }

    /// Left border color of the legacy inline-styled block.
    pub fn border_color(self) -> &'static str {
        match self {
            Self::Blue => "#3b82f6",
            Self::Green => "#22c55e",
            Self::Red => "#ef4444",
            Self::Orange => "#f97316",
            Self::Purple => "#a855f7",
            Self::Gray => "#6b7280",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(name) || c.label() == name)
    }

    pub fn from_border(color: &str) -> Option<Self> {
        let color = color.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.border_color().eq_ignore_ascii_case(color))
    }

    /// Recognize a palette name, a border hex value, or a JSON object with
    /// either.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if input.starts_with('{') {
            let json: BlockColorJson = serde_json::from_str(input).ok()?;
            return json
                .name
                .as_deref()
                .and_then(Self::from_name)
                .or_else(|| json.border.as_deref().and_then(Self::from_border));
        }
        Self::from_name(input).or_else(|| Self::from_border(input))
    }

    /// Like [`BlockColor::parse`], falling back to the default entry.
    pub fn from_input(input: &str) -> Self {
        Self::parse(input).unwrap_or_else(|| {
            tracing::debug!(target: "folio::palette", input, "unrecognized block color, using default");
            Self::default()
        })
    }
}

/// Palette for button links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ButtonColor {
    #[default]
    Blue,
    Black,
    Green,
    Red,
    Orange,
    Purple,
}

/// Serializes to the `{"bg", "gradient", "cls"}` shape the toolbar hands
/// to the button dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ButtonColorSpec {
    #[serde(rename = "bg")]
    pub background_color: &'static str,
    pub gradient: &'static str,
    #[serde(rename = "cls")]
    pub css_class_name: &'static str,
}

#[derive(Deserialize)]
struct ButtonColorJson {
    #[serde(default)]
    bg: Option<String>,
    #[serde(default)]
    cls: Option<String>,
}

impl ButtonColor {
    pub const ALL: [ButtonColor; 6] = [
        Self::Blue,
        Self::Black,
        Self::Green,
        Self::Red,
        Self::Orange,
        Self::Purple,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Blue => "ブルー",
            Self::Black => "ブラック",
            Self::Green => "グリーン",
            Self::Red => "レッド",
            Self::Orange => "オレンジ",
            Self::Purple => "パープル",
        }
    }

    pub fn spec(self) -> ButtonColorSpec {
        let (background_color, gradient, css_class_name) = match self {
            Self::Blue => (
                "#1e40af",
                "linear-gradient(to right, #007adf, #00ecbc)",
                "btn-c",
            ),
            Self::Black => (
                "#111827",
                "linear-gradient(to right, #1f2937, #374151, #1f2937)",
                "btn-k",
            ),
            Self::Green => (
                "#16a34a",
                "linear-gradient(to right, #38a169, #48bb78, #68d391)",
                "btn-g",
            ),
            Self::Red => (
                "#dc2626",
                "linear-gradient(to right, #e53e3e, #f56565, #fc8181)",
                "btn-r",
            ),
            Self::Orange => (
                "#ea580c",
                "linear-gradient(to right, #dd6b20, #ed8936, #f6ad55)",
                "btn-o",
            ),
            Self::Purple => (
                "#7c3aed",
                "linear-gradient(to right, #805ad5, #9f7aea, #b794f4)",
                "btn-p",
            ),
        };
        ButtonColorSpec {
            background_color,
            gradient,
            css_class_name,
        }
    }

    pub fn class_name(self) -> &'static str {
        self.spec().css_class_name
    }

    pub fn from_class(class: &str) -> Option<Self> {
        let class = class.trim();
        Self::ALL.into_iter().find(|c| c.class_name() == class)
    }

    pub fn from_background(color: &str) -> Option<Self> {
        let color = color.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.spec().background_color.eq_ignore_ascii_case(color))
    }

    /// JSON-encoded spec for toolbar entries.
    pub fn to_json(self) -> String {
        serde_json::to_string(&self.spec()).unwrap_or_default()
    }

    /// Recognize a JSON spec (class first, then background), a class name or
    /// a plain background color.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if input.starts_with('{') {
            let json: ButtonColorJson = serde_json::from_str(input).ok()?;
            return json
                .cls
                .as_deref()
                .and_then(Self::from_class)
                .or_else(|| json.bg.as_deref().and_then(Self::from_background));
        }
        Self::from_class(input).or_else(|| Self::from_background(input))
    }

    /// Like [`ButtonColor::parse`]; legacy or unknown values produce the
    /// default button rather than an error.
    pub fn from_input(input: &str) -> Self {
        Self::parse(input).unwrap_or_else(|| {
            tracing::debug!(target: "folio::palette", input, "unrecognized button color, using default");
            Self::default()
        })
    }
}
