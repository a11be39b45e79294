//! Inline-style / custom-CSS sanitizer.
//!
//! This is not a CSS parser. The text is cut into top-level segments at
//! `;`, `{` and `}` (quotes, parentheses and comments respected), each
//! segment is checked against a short list of script-executing constructs,
//! and the segments that pass are emitted byte-for-byte.

use std::sync::LazyLock;

use regex::Regex;

use super::{Sanitizer, UrlSanitizer};

static DANGEROUS_PROPERTY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(behavior|-ms-behavior|-moz-binding)\s*:").expect("valid regex")
});

static URL_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"url\(\s*([^)]*)").expect("valid regex"));

const SCRIPT_SCHEMES: &[&str] = &["javascript:", "vbscript:", "livescript:"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SegmentKind {
    /// `prop: value;` or trailing text without a terminator.
    Declaration,
    /// A rule or at-rule prelude ending in `{`.
    BlockOpen,
    /// Text ending in `}`; may hold a final unterminated declaration.
    BlockClose,
}

#[derive(Debug)]
struct Segment<'a> {
    text: &'a str,
    kind: SegmentKind,
}

impl Segment<'_> {
    /// The segment without its terminator.
    fn body(&self) -> &str {
        match self.kind {
            SegmentKind::Declaration => self.text.strip_suffix(';').unwrap_or(self.text),
            SegmentKind::BlockOpen | SegmentKind::BlockClose => {
                &self.text[..self.text.len() - 1]
            }
        }
    }
}

/// Sanitizer that surgically removes script-executing CSS.
///
/// Removes `@import`, `expression(...)`, `behavior`/`-moz-binding`
/// declarations, script-scheme tokens and any `url(...)` whose reference
/// fails the [`UrlSanitizer`]. Sibling declarations are left untouched.
///
/// # Example
///
/// ```
/// use paste_guard::{CssSanitizer, Sanitizer};
///
/// let css = CssSanitizer::default();
/// let out = css.sanitize("color: red; background: url(javascript:alert(1))");
/// assert_eq!(out, "color: red;");
/// ```
#[derive(Clone, Debug, Default)]
pub struct CssSanitizer {
    urls: UrlSanitizer,
}

impl CssSanitizer {
    /// Create a CSS sanitizer that checks `url(...)` references with `urls`.
    pub fn new(urls: UrlSanitizer) -> Self {
        Self { urls }
    }

    fn is_dangerous(&self, body: &str) -> bool {
        let normalized = normalize(body);
        if normalized.contains('<') {
            return true;
        }
        if DANGEROUS_PROPERTY.is_match(&normalized) {
            return true;
        }

        let compact: String = normalized
            .chars()
            .filter(|c| !c.is_whitespace() && !c.is_control())
            .collect();
        if compact.starts_with("@import") || compact.contains("expression(") {
            return true;
        }
        if SCRIPT_SCHEMES.iter().any(|s| compact.contains(s)) {
            return true;
        }

        URL_REF.captures_iter(&normalized).any(|caps| {
            let reference = caps[1].trim().trim_matches(['"', '\'']).trim();
            !reference.is_empty() && !self.urls.is_safe(reference)
        })
    }
}

impl Sanitizer for CssSanitizer {
    fn sanitize(&self, input: &str) -> String {
        let mut out = String::with_capacity(input.len());
        let mut removed = 0usize;
        // Nesting depth inside a block whose prelude was removed.
        let mut skipping = 0usize;

        for segment in split_segments(input) {
            if skipping > 0 {
                match segment.kind {
                    SegmentKind::BlockOpen => skipping += 1,
                    SegmentKind::BlockClose => skipping -= 1,
                    SegmentKind::Declaration => {}
                }
                continue;
            }

            if !self.is_dangerous(segment.body()) {
                out.push_str(segment.text);
                continue;
            }

            removed += 1;
            match segment.kind {
                SegmentKind::Declaration => {}
                SegmentKind::BlockOpen => skipping = 1,
                SegmentKind::BlockClose => out.push('}'),
            }
        }

        if removed == 0 {
            return out;
        }
        tracing::debug!("Removed {removed} unsafe CSS segment(s)");
        if out.trim().is_empty() {
            String::new()
        } else {
            out
        }
    }
}

fn split_segments(css: &str) -> Vec<Segment<'_>> {
    let bytes = css.as_bytes();
    let mut segments = Vec::new();
    let mut start = 0;
    let mut i = 0;
    let mut parens = 0usize;
    let mut quote: Option<u8> = None;

    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            match b {
                b'\\' => {
                    i += 2;
                    continue;
                }
                // An unescaped newline ends a bad string token.
                _ if b == q || b == b'\n' => quote = None,
                _ => {}
            }
            i += 1;
            continue;
        }

        match b {
            b'\\' => {
                i += 2;
                continue;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = css[i + 2..]
                    .find("*/")
                    .map_or(bytes.len(), |end| i + 2 + end + 2);
                continue;
            }
            b'"' | b'\'' => quote = Some(b),
            b'(' => parens += 1,
            b')' => parens = parens.saturating_sub(1),
            b';' | b'{' | b'}' if parens == 0 => {
                let kind = match b {
                    b';' => SegmentKind::Declaration,
                    b'{' => SegmentKind::BlockOpen,
                    _ => SegmentKind::BlockClose,
                };
                segments.push(Segment {
                    text: &css[start..=i],
                    kind,
                });
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }

    if start < bytes.len() {
        segments.push(Segment {
            text: &css[start..],
            kind: SegmentKind::Declaration,
        });
    }
    segments
}

/// Strip comments, decode CSS escapes and ASCII-lowercase, so that
/// `e\78 pression(`, `expr/**/ession(` and `EXPRESSION(` all look alike.
fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for c in chars.by_ref() {
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
            }
            '\\' => {
                let mut hex = String::new();
                while hex.len() < 6 {
                    match chars.peek() {
                        Some(h) if h.is_ascii_hexdigit() => {
                            hex.push(*h);
                            chars.next();
                        }
                        _ => break,
                    }
                }
                if hex.is_empty() {
                    match chars.next() {
                        Some('\n') | None => {}
                        Some(other) => out.push(other),
                    }
                    continue;
                }
                if matches!(chars.peek(), Some(' ' | '\t' | '\n' | '\r' | '\x0c')) {
                    chars.next();
                }
                let decoded = u32::from_str_radix(&hex, 16)
                    .ok()
                    .and_then(char::from_u32)
                    .filter(|c| *c != '\0')
                    .unwrap_or('\u{FFFD}');
                out.push(decoded);
            }
            _ => out.push(c),
        }
    }
    out.make_ascii_lowercase();
    out
}
