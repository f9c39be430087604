//! Text storage for source mode.
//!
//! All offsets are in Unicode scalar values (chars), not bytes or UTF-16.

use smol_str::{SmolStr, ToSmolStr};
use std::ops::Range;

/// A text buffer that supports editing by char offset.
pub trait TextBuffer {
    fn len_chars(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len_chars() == 0
    }

    /// Insert text at char offset.
    fn insert(&mut self, char_offset: usize, text: &str);

    /// Append text at end.
    fn push(&mut self, text: &str) {
        self.insert(self.len_chars(), text);
    }

    /// Delete char range.
    fn delete(&mut self, char_range: Range<usize>);

    /// Replace char range with text.
    fn replace(&mut self, char_range: Range<usize>, text: &str) {
        self.delete(char_range.clone());
        self.insert(char_range.start, text);
    }

    /// Get a slice. Returns None if range is invalid.
    fn slice(&self, char_range: Range<usize>) -> Option<SmolStr>;

    fn to_string(&self) -> String;
}

/// Rope-backed HTML source, the form posts are stored in.
#[derive(Clone, Default)]
pub struct SourceBuffer {
    rope: ropey::Rope,
}

impl std::fmt::Debug for SourceBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceBuffer")
            .field("len_chars", &self.rope.len_chars())
            .finish()
    }
}

impl SourceBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole content.
    pub fn set(&mut self, text: &str) {
        self.rope = ropey::Rope::from_str(text);
    }

    /// Whether the content is empty or only whitespace.
    pub fn is_blank(&self) -> bool {
        self.rope.chars().all(char::is_whitespace)
    }

    /// Append a block of markup on its own, separated from existing content
    /// by one blank line and followed by one.
    pub fn append_block(&mut self, html: &str) {
        if self.is_blank() {
            self.rope = ropey::Rope::new();
        } else {
            let len = self.rope.len_chars();
            let trailing = self
                .rope
                .chars_at(len)
                .reversed()
                .take_while(|c| c.is_whitespace())
                .count();
            self.rope.remove(len - trailing..len);
            self.push("\n\n");
        }
        self.push(html);
        self.push("\n\n");
    }
}

impl TextBuffer for SourceBuffer {
    fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    fn insert(&mut self, char_offset: usize, text: &str) {
        let at = char_offset.min(self.rope.len_chars());
        self.rope.insert(at, text);
    }

    fn delete(&mut self, char_range: Range<usize>) {
        let len = self.rope.len_chars();
        let end = char_range.end.min(len);
        let start = char_range.start.min(end);
        self.rope.remove(start..end);
    }

    fn slice(&self, char_range: Range<usize>) -> Option<SmolStr> {
        if char_range.start > char_range.end || char_range.end > self.len_chars() {
            return None;
        }
        Some(self.rope.slice(char_range).to_smolstr())
    }

    fn to_string(&self) -> String {
        self.rope.to_string()
    }
}

impl From<&str> for SourceBuffer {
    fn from(s: &str) -> Self {
        Self {
            rope: ropey::Rope::from_str(s),
        }
    }
}

impl From<String> for SourceBuffer {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_operations() {
        let mut buf = SourceBuffer::from("<p>hello</p>");
        buf.insert(8, " world");
        assert_eq!(buf.to_string(), "<p>hello world</p>");
        buf.delete(8..14);
        assert_eq!(buf.to_string(), "<p>hello</p>");
        buf.replace(3..8, "見出し");
        assert_eq!(buf.to_string(), "<p>見出し</p>");
        assert_eq!(buf.slice(3..6).as_deref(), Some("見出し"));
        assert_eq!(buf.slice(0..100), None);
    }

    #[test]
    fn test_append_block_to_empty() {
        let mut buf = SourceBuffer::from(" \n ");
        buf.append_block("<p>a</p>");
        assert_eq!(buf.to_string(), "<p>a</p>\n\n");
    }

    #[test]
    fn test_append_block_separates_with_blank_line() {
        let mut buf = SourceBuffer::from("<p>a</p>\n\n\n  ");
        buf.append_block("<p>b</p>");
        buf.append_block("<p>c</p>");
        assert_eq!(buf.to_string(), "<p>a</p>\n\n<p>b</p>\n\n<p>c</p>\n\n");
    }

    #[test]
    fn test_out_of_range_edits_clamp() {
        let mut buf = SourceBuffer::from(String::from("abc"));
        buf.insert(10, "d");
        buf.delete(2..99);
        assert_eq!(buf.to_string(), "ab");
    }
}
