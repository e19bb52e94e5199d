//! Text normalizer: document content to canonical plain text
//!
//! Every annotation offset is measured against the output of
//! [`to_plain_text`], so this function must stay deterministic: the same
//! content always yields the same characters in the same positions.

use once_cell::sync::Lazy;
use pulldown_cmark::{Event, Parser, TagEnd};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

/// How document content is encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentFormat {
    /// Detect HTML by the presence of a tag, else plain.
    #[default]
    Auto,
    Plain,
    Html,
    Markdown,
}

impl ContentFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Plain => "plain",
            Self::Html => "html",
            Self::Markdown => "markdown",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Some(Self::Auto),
            "plain" | "text" | "txt" => Some(Self::Plain),
            "html" | "htm" => Some(Self::Html),
            "markdown" | "md" => Some(Self::Markdown),
            _ => None,
        }
    }
}

static SCRIPT_STYLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<(script|style)\b[^>]*>.*?</(script|style)\s*>").expect("valid regex"));
static BR: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<br\s*/?>").expect("valid regex"));
static P_CLOSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)</p\s*>").expect("valid regex"));
static BLOCK_CLOSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)</(div|li|h[1-6]|tr)\s*>").expect("valid regex"));
static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));
static TAG_SHAPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[a-zA-Z/!][^<>]*>").expect("valid regex"));
static ENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[a-zA-Z]+);").expect("valid regex"));
static HSPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+").expect("valid regex"));
static LINE_EDGE_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^[ \t]+|[ \t]+$").expect("valid regex"));
static EXTRA_NEWLINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

/// Content is HTML when it contains something shaped like a tag: `<`
/// followed by an ASCII letter, `/` or `!`. Bare angle brackets and
/// classical title marks such as `<史記>` stay plain.
pub fn detect_format(content: &str) -> ContentFormat {
    if TAG_SHAPE.is_match(content) {
        ContentFormat::Html
    } else {
        ContentFormat::Plain
    }
}

/// Canonical plain text for `content`, detecting its format.
pub fn to_plain_text(content: &str) -> String {
    to_plain_text_as(content, ContentFormat::Auto)
}

/// Canonical plain text for `content` in a known format.
pub fn to_plain_text_as(content: &str, format: ContentFormat) -> String {
    let format = match format {
        ContentFormat::Auto => detect_format(content),
        other => other,
    };
    match format {
        ContentFormat::Html => normalize_whitespace(trim_newlines(&html_to_text(content))),
        ContentFormat::Markdown => normalize_whitespace(trim_newlines(&markdown_to_text(content))),
        ContentFormat::Plain | ContentFormat::Auto => normalize_whitespace(content),
    }
}

/// CR and CRLF become LF; three or more consecutive newlines become two.
pub fn normalize_whitespace(text: &str) -> String {
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");
    EXTRA_NEWLINES.replace_all(&unified, "\n\n").into_owned()
}

fn trim_newlines(text: &str) -> &str {
    text.trim_matches(|c| c == '\n' || c == '\r')
}

fn html_to_text(html: &str) -> String {
    let text = SCRIPT_STYLE.replace_all(html, "");
    let text = BR.replace_all(&text, "\n");
    let text = P_CLOSE.replace_all(&text, "\n\n");
    let text = BLOCK_CLOSE.replace_all(&text, "\n");
    let text = TAG.replace_all(&text, "");
    let text = decode_entities(&text);
    let text = text.replace("\r\n", "\n").replace('\r', "\n");
    let text = HSPACE.replace_all(&text, " ");
    LINE_EDGE_SPACE.replace_all(&text, "").into_owned()
}

fn decode_entities(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &Captures| {
            let body = &caps[1];
            let decoded = if let Some(hex) = body.strip_prefix("#x").or_else(|| body.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = body.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                match body {
                    "nbsp" => Some(' '),
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    _ => None,
                }
            };
            match decoded {
                Some(c) => c.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

fn markdown_to_text(markdown: &str) -> String {
    let mut out = String::new();
    for event in Parser::new(markdown) {
        match event {
            Event::Text(text) | Event::Code(text) => out.push_str(&text),
            Event::SoftBreak | Event::HardBreak => out.push('\n'),
            Event::End(TagEnd::Paragraph)
            | Event::End(TagEnd::Heading(_))
            | Event::End(TagEnd::CodeBlock)
            | Event::End(TagEnd::BlockQuote) => out.push_str("\n\n"),
            Event::End(TagEnd::Item) => out.push('\n'),
            _ => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_passes_through() {
        let text = "學而時習之，不亦說乎？\n有朋自遠方來，不亦樂乎？";
        assert_eq!(to_plain_text(text), text);
    }

    #[test]
    fn plain_text_is_idempotent() {
        let messy = "甲\r\n乙\r丙\n\n\n\n丁";
        let once = to_plain_text(messy);
        assert_eq!(once, "甲\n乙\n丙\n\n丁");
        assert_eq!(to_plain_text(&once), once);
    }

    #[test]
    fn html_block_structure_becomes_newlines() {
        let html = "<p>孔子曰</p><p>學而<br>時習之</p><div>不亦說乎</div>";
        assert_eq!(to_plain_text(html), "孔子曰\n\n學而\n時習之\n\n不亦說乎");
    }

    #[test]
    fn html_entities_decoded_once() {
        let html = "<span>甲&nbsp;乙 &amp;lt; &#20025; &#x4E39; &bogus;</span>";
        assert_eq!(to_plain_text(html), "甲 乙 &lt; 丹 丹 &bogus;");
    }

    #[test]
    fn html_indentation_collapsed() {
        let html = "<div>\n    <p>  天下  大勢  </p>\n</div>";
        assert_eq!(to_plain_text(html), "天下 大勢");
    }

    #[test]
    fn script_and_style_removed() {
        let html = "<style>p { color: red; }</style><p>正文</p><script>var x = 1;</script>";
        assert_eq!(to_plain_text(html), "正文");
    }

    #[test]
    fn markdown_rendered_to_text() {
        let md = "# 論語\n\n學而時習之，\n不亦說乎？\n\n- 有朋\n- 自遠方來";
        let plain = to_plain_text_as(md, ContentFormat::Markdown);
        assert_eq!(plain, "論語\n\n學而時習之，\n不亦說乎？\n\n有朋\n自遠方來");
    }

    #[test]
    fn detect_format_requires_tag_shape() {
        assert_eq!(detect_format("a < b"), ContentFormat::Plain);
        assert_eq!(detect_format("甲 < 乙 > 丙"), ContentFormat::Plain);
        assert_eq!(detect_format("<史記> 卷一"), ContentFormat::Plain);
        assert_eq!(detect_format("<b>a</b>"), ContentFormat::Html);
        assert_eq!(detect_format("a<br/>b"), ContentFormat::Html);
        assert_eq!(detect_format("<!-- 注 -->正文"), ContentFormat::Html);
    }

    #[test]
    fn bare_angle_brackets_are_kept() {
        assert_eq!(to_plain_text("甲 < 乙 > 丙"), "甲 < 乙 > 丙");
    }

    #[test]
    fn html_output_is_stable_when_normalized_again() {
        let html = "<p>&lt;史記&gt; 卷一</p>";
        let once = to_plain_text(html);
        assert_eq!(once, "<史記> 卷一");
        assert_eq!(to_plain_text(&once), once);
        assert_eq!(to_plain_text_as(&once, ContentFormat::Plain), once);

        let nested = "<div>\n  <p>孔子曰 &lt;b&gt;</p>\n</div>";
        let once = to_plain_text_as(nested, ContentFormat::Html);
        assert_eq!(once, "孔子曰 <b>");
        assert_eq!(to_plain_text_as(&once, ContentFormat::Plain), once);
    }

    #[test]
    fn format_parse_accepts_extensions() {
        assert_eq!(ContentFormat::parse("md"), Some(ContentFormat::Markdown));
        assert_eq!(ContentFormat::parse("HTML"), Some(ContentFormat::Html));
        assert_eq!(ContentFormat::parse("docx"), None);
    }
}
