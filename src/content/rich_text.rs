//! Rich text rendering
//!
//! Converts Prismic structured text (an array of typed blocks with styled
//! spans) into HTML. The output is wrapped in [`TrustedHtml`], the only
//! value the templates emit without escaping.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::helpers::html_escape;

/// HTML that is embedded verbatim into pages
///
/// Only the rich text renderer can construct one, so unescaped markup
/// cannot reach a template from anywhere else.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TrustedHtml(String);

impl TrustedHtml {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for TrustedHtml {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A block of structured text
///
/// `type` defaults to a paragraph and `spans` to none, so `{ "text": ".." }`
/// is a valid block on its own.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RichTextBlock {
    #[serde(rename = "type", default)]
    pub kind: BlockKind,

    #[serde(default)]
    pub text: String,

    #[serde(default)]
    pub spans: Vec<Span>,

    /// Image source, for `image` blocks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Image alt text, for `image` blocks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,

    /// oEmbed payload, for `embed` blocks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oembed: Option<Embed>,
}

impl RichTextBlock {
    /// A plain paragraph
    pub fn paragraph(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockKind {
    #[default]
    #[serde(rename = "paragraph")]
    Paragraph,
    #[serde(rename = "heading1")]
    Heading1,
    #[serde(rename = "heading2")]
    Heading2,
    #[serde(rename = "heading3")]
    Heading3,
    #[serde(rename = "heading4")]
    Heading4,
    #[serde(rename = "heading5")]
    Heading5,
    #[serde(rename = "heading6")]
    Heading6,
    #[serde(rename = "preformatted")]
    Preformatted,
    #[serde(rename = "list-item")]
    ListItem,
    #[serde(rename = "o-list-item")]
    OrderedListItem,
    #[serde(rename = "image")]
    Image,
    #[serde(rename = "embed")]
    Embed,
    #[serde(other)]
    Unknown,
}

impl BlockKind {
    fn heading_level(self) -> Option<u8> {
        match self {
            BlockKind::Heading1 => Some(1),
            BlockKind::Heading2 => Some(2),
            BlockKind::Heading3 => Some(3),
            BlockKind::Heading4 => Some(4),
            BlockKind::Heading5 => Some(5),
            BlockKind::Heading6 => Some(6),
            _ => None,
        }
    }

    fn list_tag(self) -> Option<&'static str> {
        match self {
            BlockKind::ListItem => Some("ul"),
            BlockKind::OrderedListItem => Some("ol"),
            _ => None,
        }
    }
}

/// A styled range of a block's text
///
/// `start` and `end` are UTF-16 offsets, as produced by the CMS editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    #[serde(rename = "type")]
    pub kind: SpanKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<SpanData>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanKind {
    Strong,
    Em,
    Hyperlink,
    Label,
    #[serde(other)]
    Unknown,
}

/// Link or label payload of a span
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpanData {
    pub url: Option<String>,
    /// Set on links to other documents
    pub uid: Option<String>,
    pub target: Option<String>,
    pub label: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Embed {
    pub html: Option<String>,
    pub embed_url: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub provider_name: Option<String>,
}

/// Rich text to HTML renderer
pub struct RichTextRenderer {
    /// Prefix for links to other documents, e.g. `/post/`
    document_root: String,
}

impl Default for RichTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl RichTextRenderer {
    /// Create a renderer linking documents under `/post/`
    pub fn new() -> Self {
        Self::with_document_root("/post/")
    }

    /// Create a renderer linking documents under a custom route
    pub fn with_document_root(root: &str) -> Self {
        Self {
            document_root: format!("{}/", root.trim_end_matches('/')),
        }
    }

    /// Render blocks to HTML, grouping consecutive list items
    pub fn render(&self, blocks: &[RichTextBlock]) -> TrustedHtml {
        let mut html = String::new();
        let mut open_list: Option<&'static str> = None;

        for block in blocks {
            let list = block.kind.list_tag();
            if list != open_list {
                if let Some(tag) = open_list {
                    html.push_str(&format!("</{}>", tag));
                }
                if let Some(tag) = list {
                    html.push_str(&format!("<{}>", tag));
                }
                open_list = list;
            }
            self.render_block(block, &mut html);
        }

        if let Some(tag) = open_list {
            html.push_str(&format!("</{}>", tag));
        }

        TrustedHtml(html)
    }

    fn render_block(&self, block: &RichTextBlock, html: &mut String) {
        if let Some(level) = block.kind.heading_level() {
            let text = self.render_text(&block.text, &block.spans);
            html.push_str(&format!("<h{level}>{text}</h{level}>"));
            return;
        }

        match block.kind {
            BlockKind::Paragraph => {
                html.push_str("<p>");
                html.push_str(&self.render_text(&block.text, &block.spans));
                html.push_str("</p>");
            }
            BlockKind::Preformatted => {
                html.push_str("<pre>");
                html.push_str(&self.render_text(&block.text, &block.spans));
                html.push_str("</pre>");
            }
            BlockKind::ListItem | BlockKind::OrderedListItem => {
                html.push_str("<li>");
                html.push_str(&self.render_text(&block.text, &block.spans));
                html.push_str("</li>");
            }
            BlockKind::Image => {
                html.push_str(&format!(
                    r#"<p class="block-img"><img src="{}" alt="{}" /></p>"#,
                    html_escape(block.url.as_deref().unwrap_or("")),
                    html_escape(block.alt.as_deref().unwrap_or(""))
                ));
            }
            BlockKind::Embed => {
                let Some(embed) = &block.oembed else {
                    return;
                };
                html.push_str(&format!(
                    r#"<div data-oembed="{}" data-oembed-type="{}" data-oembed-provider="{}">{}</div>"#,
                    html_escape(embed.embed_url.as_deref().unwrap_or("")),
                    html_escape(embed.kind.as_deref().unwrap_or("")),
                    html_escape(embed.provider_name.as_deref().unwrap_or("")),
                    embed.html.as_deref().unwrap_or("")
                ));
            }
            _ => {
                tracing::debug!("Skipping unsupported rich text block {:?}", block.kind);
            }
        }
    }

    /// Render a block's text with its spans as properly nested tags
    fn render_text(&self, text: &str, spans: &[Span]) -> String {
        let index = Utf16Index::new(text);
        let len = index.len();

        // Outer spans first: earliest start, then longest
        let mut spans: Vec<&Span> = spans.iter().filter(|s| s.start < s.end).collect();
        spans.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

        let mut bounds = vec![0, len];
        for span in &spans {
            bounds.push(span.start.min(len));
            bounds.push(span.end.min(len));
        }
        bounds.sort_unstable();
        bounds.dedup();

        let mut out = String::with_capacity(text.len());
        let mut open: Vec<&Span> = Vec::new();

        for pair in bounds.windows(2) {
            let (from, to) = (pair[0], pair[1]);
            let active: Vec<&Span> = spans
                .iter()
                .copied()
                .filter(|s| s.start <= from && s.end >= to)
                .collect();

            let keep = open
                .iter()
                .zip(&active)
                .take_while(|(a, b)| std::ptr::eq(**a, **b))
                .count();
            for span in open.drain(keep..).rev() {
                out.push_str(close_tag(span.kind));
            }
            for span in &active[keep..] {
                out.push_str(&self.open_tag(span));
                open.push(*span);
            }

            out.push_str(&escape_text(&text[index.byte(from)..index.byte(to)]));
        }

        for span in open.into_iter().rev() {
            out.push_str(close_tag(span.kind));
        }

        out
    }

    fn open_tag(&self, span: &Span) -> String {
        let data = span.data.clone().unwrap_or_default();
        match span.kind {
            SpanKind::Strong => "<strong>".to_string(),
            SpanKind::Em => "<em>".to_string(),
            SpanKind::Hyperlink => {
                let href = match (data.url, data.uid) {
                    (Some(url), _) => url,
                    (None, Some(uid)) => format!("{}{}", self.document_root, uid),
                    (None, None) => String::new(),
                };
                let target = match data.target {
                    Some(target) => format!(
                        r#" target="{}" rel="noopener""#,
                        html_escape(&target)
                    ),
                    None => String::new(),
                };
                format!(r#"<a href="{}"{}>"#, html_escape(&href), target)
            }
            SpanKind::Label => match data.label {
                Some(label) => format!(r#"<span class="{}">"#, html_escape(&label)),
                None => "<span>".to_string(),
            },
            SpanKind::Unknown => "<span>".to_string(),
        }
    }
}

fn close_tag(kind: SpanKind) -> &'static str {
    match kind {
        SpanKind::Strong => "</strong>",
        SpanKind::Em => "</em>",
        SpanKind::Hyperlink => "</a>",
        SpanKind::Label | SpanKind::Unknown => "</span>",
    }
}

fn escape_text(text: &str) -> String {
    html_escape(text).replace('\n', "<br />")
}

/// Render blocks with the default renderer
pub fn render(blocks: &[RichTextBlock]) -> TrustedHtml {
    RichTextRenderer::new().render(blocks)
}

/// Flatten blocks to plain text, one block per line
pub fn as_text(blocks: &[RichTextBlock]) -> String {
    blocks
        .iter()
        .map(|b| b.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Maps UTF-16 offsets to byte offsets of a string
struct Utf16Index {
    byte_at: Vec<usize>,
}

impl Utf16Index {
    fn new(text: &str) -> Self {
        let mut byte_at = Vec::with_capacity(text.len() + 1);
        for (i, c) in text.char_indices() {
            for _ in 0..c.len_utf16() {
                byte_at.push(i);
            }
        }
        byte_at.push(text.len());
        Self { byte_at }
    }

    fn len(&self) -> usize {
        self.byte_at.len() - 1
    }

    fn byte(&self, offset: usize) -> usize {
        self.byte_at[offset.min(self.len())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blocks(json: &str) -> Vec<RichTextBlock> {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_bare_text_blocks_are_paragraphs() {
        let html = render(&blocks(r#"[{"text": "hello"}, {"text": "world"}]"#));
        assert_eq!(html.as_str(), "<p>hello</p><p>world</p>");
    }

    #[test]
    fn test_text_is_escaped() {
        let html = render(&[RichTextBlock::paragraph("a < b & \"c\"\nd")]);
        assert_eq!(
            html.as_str(),
            "<p>a &lt; b &amp; &quot;c&quot;<br />d</p>"
        );
    }

    #[test]
    fn test_headings_and_preformatted() {
        let html = render(&blocks(
            r#"[
                {"type": "heading2", "text": "Title", "spans": []},
                {"type": "preformatted", "text": "let x = 1;", "spans": []}
            ]"#,
        ));
        assert_eq!(html.as_str(), "<h2>Title</h2><pre>let x = 1;</pre>");
    }

    #[test]
    fn test_lists_are_grouped() {
        let html = render(&blocks(
            r#"[
                {"type": "list-item", "text": "one"},
                {"type": "list-item", "text": "two"},
                {"type": "o-list-item", "text": "first"},
                {"type": "paragraph", "text": "after"}
            ]"#,
        ));
        assert_eq!(
            html.as_str(),
            "<ul><li>one</li><li>two</li></ul><ol><li>first</li></ol><p>after</p>"
        );
    }

    #[test]
    fn test_spans() {
        let html = render(&blocks(
            r#"[{
                "type": "paragraph",
                "text": "Leia a documentação oficial",
                "spans": [
                    {"start": 0, "end": 4, "type": "strong"},
                    {"start": 7, "end": 27, "type": "hyperlink",
                     "data": {"link_type": "Web", "url": "https://reactjs.org", "target": "_blank"}},
                    {"start": 20, "end": 27, "type": "em"}
                ]
            }]"#,
        ));
        assert_eq!(
            html.as_str(),
            r#"<p><strong>Leia</strong> a <a href="https://reactjs.org" target="_blank" rel="noopener">documentação <em>oficial</em></a></p>"#
        );
    }

    #[test]
    fn test_overlapping_spans_stay_nested() {
        let html = render(&blocks(
            r#"[{
                "text": "abcdef",
                "spans": [
                    {"start": 0, "end": 4, "type": "strong"},
                    {"start": 2, "end": 6, "type": "em"}
                ]
            }]"#,
        ));
        assert_eq!(
            html.as_str(),
            "<p><strong>ab<em>cd</em></strong><em>ef</em></p>"
        );
    }

    #[test]
    fn test_spans_use_utf16_offsets() {
        // The rocket takes two UTF-16 code units
        let html = render(&blocks(
            r#"[{"text": "🚀 go", "spans": [{"start": 3, "end": 5, "type": "strong"}]}]"#,
        ));
        assert_eq!(html.as_str(), "<p>🚀 <strong>go</strong></p>");
    }

    #[test]
    fn test_document_links_and_labels() {
        let renderer = RichTextRenderer::with_document_root("/post");
        let html = renderer.render(&blocks(
            r#"[{
                "text": "see other",
                "spans": [
                    {"start": 0, "end": 3, "type": "label", "data": {"label": "codespan"}},
                    {"start": 4, "end": 9, "type": "hyperlink",
                     "data": {"link_type": "Document", "uid": "other-post", "type": "posts"}}
                ]
            }]"#,
        ));
        assert_eq!(
            html.as_str(),
            r#"<p><span class="codespan">see</span> <a href="/post/other-post">other</a></p>"#
        );
    }

    #[test]
    fn test_image_and_embed() {
        let html = render(&blocks(
            r#"[
                {"type": "image", "url": "https://images.prismic.io/a.png", "alt": "a \"b\""},
                {"type": "embed", "oembed": {
                    "embed_url": "https://youtu.be/x", "type": "video",
                    "provider_name": "YouTube", "html": "<iframe></iframe>"}}
            ]"#,
        ));
        assert_eq!(
            html.as_str(),
            concat!(
                r#"<p class="block-img"><img src="https://images.prismic.io/a.png" alt="a &quot;b&quot;" /></p>"#,
                r#"<div data-oembed="https://youtu.be/x" data-oembed-type="video" data-oembed-provider="YouTube"><iframe></iframe></div>"#
            )
        );
    }

    #[test]
    fn test_unknown_blocks_are_skipped() {
        let html = render(&blocks(
            r#"[{"type": "table", "text": "x"}, {"text": "kept"}]"#,
        ));
        assert_eq!(html.as_str(), "<p>kept</p>");
    }

    #[test]
    fn test_as_text() {
        let text = as_text(&blocks(r#"[{"text": "hello"}, {"text": "world"}]"#));
        assert_eq!(text, "hello\nworld");
    }
}
