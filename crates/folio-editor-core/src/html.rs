//! Lenient HTML reading and writing for the visual tree.
//!
//! Parsing never fails. Content that does not fit the handful of tree
//! building rules below (stray end tags, unterminated tags, unknown elements)
//! is kept as text or as opaque elements rather than dropped, so whatever an
//! author typed in source mode survives a trip through the visual tree.
//!
//! Serialization follows the browser's `innerHTML` conventions: void elements
//! have no closing tag or slash, attributes are always double-quoted, and
//! `&`, `<`, `>` and non-breaking spaces are escaped in text.

use crate::dom::{Element, NodeId, NodeKind, VisualTree};

/// Elements whose content is kept verbatim up to the matching end tag.
const RAW_TEXT_TAGS: &[&str] = &["script", "style", "textarea", "title", "xmp"];

/// Start tags that implicitly close an open `<p>`.
const CLOSES_PARAGRAPH: &[&str] = &[
    "address",
    "article",
    "aside",
    "blockquote",
    "div",
    "dl",
    "fieldset",
    "figure",
    "footer",
    "form",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "header",
    "hr",
    "main",
    "nav",
    "ol",
    "p",
    "pre",
    "section",
    "table",
    "ul",
];

/// Escape text content.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    // Writes into a String never fail.
    let _ = pulldown_cmark_escape::escape_html_body_text(&mut out, text);
    with_named_nbsp(out)
}

/// Escape a double-quoted attribute value.
pub fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let _ = pulldown_cmark_escape::escape_html(&mut out, value);
    with_named_nbsp(out)
}

/// Browsers write U+00A0 back out as `&nbsp;`.
fn with_named_nbsp(escaped: String) -> String {
    if escaped.contains('\u{a0}') {
        escaped.replace('\u{a0}', "&nbsp;")
    } else {
        escaped
    }
}

/// Decode the character references that show up in editor content. Unknown
/// named references are left as written.
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_owned();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest.find(';').filter(|&semi| semi <= 10).and_then(|semi| {
            let decoded = decode_reference(&rest[1..semi])?;
            Some((decoded, semi + 1))
        });
        match decoded {
            Some((c, consumed)) => {
                out.push(c);
                rest = &rest[consumed..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_reference(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let num = name.strip_prefix('#')?;
            let code = match num.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

/// Parse an HTML fragment into a fresh tree, the fragment's top-level nodes
/// becoming children of the root.
pub fn parse_fragment(html: &str) -> VisualTree {
    let mut tree = VisualTree::new();
    let root = tree.root();
    parse_into(&mut tree, root, html);
    tree
}

/// Parse an HTML fragment and append its nodes to `parent`.
pub fn parse_into(tree: &mut VisualTree, parent: NodeId, html: &str) {
    TreeBuilder {
        tree,
        base: parent,
        stack: vec![parent],
    }
    .run(html);
}

struct TreeBuilder<'t> {
    tree: &'t mut VisualTree,
    base: NodeId,
    stack: Vec<NodeId>,
}

enum Token<'a> {
    Text(&'a str),
    Comment(&'a str),
    StartTag {
        name: String,
        attrs: Vec<(String, String)>,
    },
    EndTag(String),
}

impl<'t> TreeBuilder<'t> {
    fn current(&self) -> NodeId {
        self.stack.last().copied().unwrap_or(self.base)
    }

    fn run(mut self, html: &str) {
        let mut pos = 0;
        while pos < html.len() {
            let (token, next) = next_token(html, pos);
            pos = next;
            match token {
                Token::Text(text) => self.text(&decode_entities(text)),
                Token::Comment(text) => {
                    let node = self.tree.create(NodeKind::Comment(text.to_owned()));
                    let parent = self.current();
                    self.tree.append_child(parent, node);
                }
                Token::StartTag { name, attrs } => {
                    if RAW_TEXT_TAGS.contains(&name.as_str()) {
                        let (raw, next) = raw_text(html, pos, &name);
                        pos = next;
                        self.start_tag(&name, attrs);
                        let content = if name == "script" || name == "style" {
                            raw.to_owned()
                        } else {
                            decode_entities(raw)
                        };
                        if !content.is_empty() {
                            self.text(&content);
                        }
                        self.end_tag(&name);
                    } else {
                        self.start_tag(&name, attrs);
                    }
                }
                Token::EndTag(name) => self.end_tag(&name),
            }
        }
    }

    fn text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let parent = self.current();
        if let Some(last) = self.tree.last_child(parent) {
            if let Some(existing) = self.tree.text_mut(last) {
                existing.push_str(text);
                return;
            }
        }
        let node = self.tree.create_text(text);
        self.tree.append_child(parent, node);
    }

    fn open_index(&self, tag: &str) -> Option<usize> {
        // Index 0 is the base node, which never closes.
        self.stack
            .iter()
            .enumerate()
            .skip(1)
            .rev()
            .find(|(_, id)| self.tree.is_tag(**id, tag))
            .map(|(i, _)| i)
    }

    fn start_tag(&mut self, name: &str, attrs: Vec<(String, String)>) {
        if CLOSES_PARAGRAPH.contains(&name) {
            if let Some(idx) = self.open_index("p") {
                self.stack.truncate(idx);
            }
        }
        if name == "li" {
            let list = self.stack.iter().rposition(|&id| {
                self.tree.is_tag(id, "ul") || self.tree.is_tag(id, "ol")
            });
            if let Some(idx) = self.open_index("li") {
                if list.is_none_or(|l| idx > l) {
                    self.stack.truncate(idx);
                }
            }
        }

        let mut element = Element::new(name);
        for (attr, value) in attrs {
            if !element.has_attr(&attr) {
                element.set_attr(&attr, value);
            }
        }
        let is_void = element.is_void();
        let node = self.tree.create(NodeKind::Element(element));
        let parent = self.current();
        self.tree.append_child(parent, node);
        if !is_void {
            self.stack.push(node);
        }
    }

    fn end_tag(&mut self, name: &str) {
        if name == "br" {
            // `</br>` is treated as `<br>`, as browsers do.
            self.start_tag("br", Vec::new());
            return;
        }
        match self.open_index(name) {
            Some(idx) => self.stack.truncate(idx),
            None => tracing::trace!(target: "folio::html", tag = name, "ignoring stray end tag"),
        }
    }
}

fn is_tag_name_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b':' || b == b'_'
}

fn next_token(html: &str, pos: usize) -> (Token<'_>, usize) {
    let bytes = html.as_bytes();
    let rest = &html[pos..];

    if rest.starts_with("<!--") {
        return match rest[4..].find("-->") {
            Some(end) => (Token::Comment(&rest[4..4 + end]), pos + 4 + end + 3),
            None => (Token::Comment(&rest[4..]), html.len()),
        };
    }

    if rest.starts_with("<!") || rest.starts_with("<?") {
        // Doctypes and processing instructions carry nothing for a fragment.
        return match rest.find('>') {
            Some(end) => (Token::Text(""), pos + end + 1),
            None => (Token::Text(rest), html.len()),
        };
    }

    if rest.starts_with("</") && bytes.get(pos + 2).is_some_and(u8::is_ascii_alphabetic) {
        let name_end = rest[2..]
            .bytes()
            .position(|b| !is_tag_name_char(b))
            .map(|i| 2 + i)
            .unwrap_or(rest.len());
        let name = rest[2..name_end].to_ascii_lowercase();
        return match rest.find('>') {
            Some(end) => (Token::EndTag(name), pos + end + 1),
            None => (Token::Text(rest), html.len()),
        };
    }

    if rest.starts_with('<') && bytes.get(pos + 1).is_some_and(u8::is_ascii_alphabetic) {
        if let Some((name, attrs, consumed)) = start_tag(rest) {
            return (Token::StartTag { name, attrs }, pos + consumed);
        }
        // Unterminated tag: keep what the author wrote.
        return (Token::Text(rest), html.len());
    }

    // Plain text up to the next tag opener. A lone `<` that does not open a
    // tag is text too.
    let search_from = if rest.starts_with('<') { 1 } else { 0 };
    let end = rest[search_from..]
        .find('<')
        .map(|i| i + search_from)
        .unwrap_or(rest.len());
    (Token::Text(&rest[..end]), pos + end)
}

/// Parse `<name attr=value ...>` at the start of `s`. Returns the lowercase
/// tag name, attributes and the number of bytes consumed.
fn start_tag(s: &str) -> Option<(String, Vec<(String, String)>, usize)> {
    let bytes = s.as_bytes();
    let mut i = 1;
    while i < bytes.len() && is_tag_name_char(bytes[i]) {
        i += 1;
    }
    let name = s[1..i].to_ascii_lowercase();
    let mut attrs = Vec::new();

    loop {
        while i < bytes.len() && (bytes[i].is_ascii_whitespace() || bytes[i] == b'/') {
            i += 1;
        }
        match bytes.get(i) {
            None => return None,
            Some(b'>') => return Some((name, attrs, i + 1)),
            Some(_) => {}
        }

        let attr_start = i;
        while i < bytes.len()
            && !bytes[i].is_ascii_whitespace()
            && !matches!(bytes[i], b'=' | b'>' | b'/')
        {
            i += 1;
        }
        let attr_name = s[attr_start..i].to_ascii_lowercase();

        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        let mut value = String::new();
        if bytes.get(i) == Some(&b'=') {
            i += 1;
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            match bytes.get(i) {
                Some(&quote @ (b'"' | b'\'')) => {
                    let close = s[i + 1..].find(quote as char)? + i + 1;
                    value = decode_entities(&s[i + 1..close]);
                    i = close + 1;
                }
                Some(_) => {
                    let value_start = i;
                    while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' {
                        i += 1;
                    }
                    value = decode_entities(&s[value_start..i]);
                }
                None => return None,
            }
        }
        if !attr_name.is_empty() {
            attrs.push((attr_name, value));
        }
    }
}

/// Content of a raw text element up to its end tag, and the position after
/// that end tag.
fn raw_text<'a>(html: &'a str, pos: usize, tag: &str) -> (&'a str, usize) {
    let rest = &html[pos..];
    let lower = rest.to_ascii_lowercase();
    let closing = format!("</{tag}");
    match lower.find(&closing) {
        Some(start) => {
            let after = rest[start..]
                .find('>')
                .map(|i| start + i + 1)
                .unwrap_or(rest.len());
            (&rest[..start], pos + after)
        }
        None => (rest, html.len()),
    }
}

/// Serialize the children of a node, the way `innerHTML` reads.
pub fn serialize_children(tree: &VisualTree, id: NodeId) -> String {
    let mut out = String::new();
    for &child in tree.children(id) {
        write_node(tree, child, &mut out);
    }
    out
}

/// Serialize a node and its subtree, the way `outerHTML` reads.
pub fn serialize_node(tree: &VisualTree, id: NodeId) -> String {
    let mut out = String::new();
    write_node(tree, id, &mut out);
    out
}

fn write_node(tree: &VisualTree, id: NodeId, out: &mut String) {
    match tree.kind(id) {
        Some(NodeKind::Element(el)) => {
            out.push('<');
            out.push_str(&el.tag);
            for attr in &el.attrs {
                out.push(' ');
                out.push_str(&attr.name);
                out.push_str("=\"");
                out.push_str(&escape_attr(&attr.value));
                out.push('"');
            }
            out.push('>');
            if el.is_void() {
                return;
            }
            for &child in tree.children(id) {
                write_node(tree, child, out);
            }
            out.push_str("</");
            out.push_str(&el.tag);
            out.push('>');
        }
        Some(NodeKind::Text(text)) => {
            let raw_parent = tree
                .parent(id)
                .and_then(|p| tree.tag(p))
                .is_some_and(|t| t == "script" || t == "style");
            if raw_parent {
                out.push_str(text);
            } else {
                out.push_str(&escape_html(text));
            }
        }
        Some(NodeKind::Comment(text)) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        None => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(html: &str) -> String {
        let tree = parse_fragment(html);
        serialize_children(&tree, tree.root())
    }

    #[test]
    fn test_canonical_markup_round_trips() {
        let html = r#"<p>Hello <strong>world</strong><br>again</p><ul><li>one</li><li>two</li></ul>"#;
        assert_eq!(round_trip(html), html);
    }

    #[test]
    fn test_void_and_self_closing_forms() {
        assert_eq!(round_trip("<p>a<br/>b<br />c</p>"), "<p>a<br>b<br>c</p>");
        assert_eq!(
            round_trip(r#"<img src="x.png" alt="x" />"#),
            r#"<img src="x.png" alt="x">"#
        );
    }

    #[test]
    fn test_bare_and_unquoted_attributes() {
        assert_eq!(
            round_trip("<iframe src=https://x.test/e allowfullscreen></iframe>"),
            r#"<iframe src="https://x.test/e" allowfullscreen=""></iframe>"#
        );
    }

    #[test]
    fn test_entities_are_decoded_and_reescaped() {
        let tree = parse_fragment("<p>a &amp; b &lt;c&gt; &#x41;&#66;&nbsp;&copy;</p>");
        let p = tree.first_child(tree.root()).unwrap();
        assert_eq!(tree.text_content(p), "a & b <c> AB\u{a0}&copy;");
        assert_eq!(
            serialize_children(&tree, tree.root()),
            "<p>a &amp; b &lt;c&gt; AB&nbsp;&amp;copy;</p>"
        );
    }

    #[test]
    fn test_escaping_text_and_attributes() {
        assert_eq!(escape_html("a \"b\" & <c>\u{a0}"), "a \"b\" &amp; &lt;c&gt;&nbsp;");
        assert_eq!(
            escape_attr("/a?x=1&y=\"2\"\u{a0}"),
            "/a?x=1&amp;y=&quot;2&quot;&nbsp;"
        );
    }

    #[test]
    fn test_block_start_closes_open_paragraph() {
        assert_eq!(
            round_trip("<p>one<div>two</div>"),
            "<p>one</p><div>two</div>"
        );
    }

    #[test]
    fn test_list_items_close_each_other() {
        assert_eq!(
            round_trip("<ul><li>a<li>b</ul>"),
            "<ul><li>a</li><li>b</li></ul>"
        );
    }

    #[test]
    fn test_stray_end_tags_are_ignored() {
        assert_eq!(round_trip("<p>a</span>b</p></div>"), "<p>ab</p>");
    }

    #[test]
    fn test_malformed_input_is_kept_as_text() {
        let tree = parse_fragment("a < b <div class=\"x");
        assert_eq!(tree.text_content(tree.root()), "a < b <div class=\"x");
    }

    #[test]
    fn test_comments_and_raw_text() {
        assert_eq!(
            round_trip("<!-- keep --><style>p > a { color: red; }</style>"),
            "<!-- keep --><style>p > a { color: red; }</style>"
        );
    }

    #[test]
    fn test_unknown_elements_pass_through() {
        let html = r#"<x-card data-id="7"><section>body</section></x-card>"#;
        assert_eq!(round_trip(html), html);
    }
}
