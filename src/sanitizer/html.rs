//! Whitelist-based HTML fragment sanitizer.

use ego_tree::NodeRef;
use ego_tree::iter::Edge;
use scraper::{Html, node::Node};

use super::{CssSanitizer, Sanitizer, UrlSanitizer};

/// Elements removed together with everything inside them.
pub(crate) const DROP_WITH_CONTENT: &[&str] = &[
    "script", "style", "iframe", "frame", "frameset", "object", "embed", "applet", "link", "meta",
    "base", "noscript", "template", "svg", "math",
];

/// Elements kept with no tag-specific attributes. Tags with their own
/// attribute lists live in [`tag_attributes`].
const PLAIN_TAGS: &[&str] = &[
    "abbr", "address", "article", "aside", "b", "bdi", "bdo", "br", "caption", "code", "dd", "dfn",
    "div", "dl", "dt", "em", "figcaption", "figure", "footer", "h1", "h2", "h3", "h4", "h5", "h6",
    "header", "hr", "i", "kbd", "main", "mark", "nav", "p", "picture", "pre", "s", "samp",
    "section", "small", "span", "strong", "sub", "summary", "sup", "tbody", "tfoot", "thead",
    "tr", "u", "ul", "var", "wbr",
];

const GLOBAL_ATTRIBUTES: &[&str] = &["class", "id", "title", "style", "dir", "lang", "role"];

const URL_ATTRIBUTES: &[&str] = &["href", "src", "cite", "poster"];

/// HTML5 void elements that must not have a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

fn tag_attributes(tag: &str) -> Option<&'static [&'static str]> {
    let attrs: &'static [&'static str] = match tag {
        "a" => &["href", "target", "rel", "hreflang"],
        "img" => &["src", "alt", "width", "height", "loading"],
        "video" => &[
            "src", "poster", "width", "height", "controls", "autoplay", "loop", "muted",
            "playsinline", "preload",
        ],
        "audio" => &["src", "controls", "autoplay", "loop", "muted", "preload"],
        "source" => &["src", "type", "media"],
        "td" | "th" => &["colspan", "rowspan", "headers", "scope"],
        "col" | "colgroup" => &["span"],
        "ol" => &["start", "reversed", "type"],
        "li" => &["value"],
        "blockquote" | "q" | "del" | "ins" => &["cite"],
        "time" => &["datetime"],
        "details" => &["open"],
        "table" | "cite" => &[],
        _ if PLAIN_TAGS.contains(&tag) => &[],
        _ => return None,
    };
    Some(attrs)
}

fn is_aria_attribute(name: &str) -> bool {
    name.strip_prefix("aria-").is_some_and(|rest| {
        !rest.is_empty() && rest.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    })
}

/// Sanitizer that reduces an HTML fragment to a whitelist of tags and
/// attributes.
///
/// - Unknown tags are unwrapped: the tag goes, its content stays in place.
/// - `script`, `style`, `iframe`, `object`, `embed`, `link`, `meta` and a
///   few other side-effect containers are removed with their content.
/// - `on*` attributes are always removed. `href`/`src`/`cite`/`poster` go
///   through the [`UrlSanitizer`], `style` through the [`CssSanitizer`].
/// - Comments and doctypes are removed.
///
/// If nothing had to be removed the input is returned unchanged, byte for
/// byte. Otherwise the cleaned tree is serialized with escaped text and
/// double-quoted attributes.
///
/// # Example
///
/// ```
/// use paste_guard::{HtmlSanitizer, Sanitizer};
///
/// let html = HtmlSanitizer::default();
/// let out = html.sanitize("Hello<script>alert(1)</script> <b onclick=\"x()\">World</b>");
/// assert_eq!(out, "Hello <b>World</b>");
/// ```
#[derive(Clone, Debug, Default)]
pub struct HtmlSanitizer {
    urls: UrlSanitizer,
    css: CssSanitizer,
}

impl HtmlSanitizer {
    /// Create an HTML sanitizer using the given URL and CSS sanitizers for
    /// attribute values.
    pub fn new(urls: UrlSanitizer, css: CssSanitizer) -> Self {
        Self { urls, css }
    }

    /// Returns the cleaned value of an attribute, or `None` if it must go.
    fn clean_attribute(&self, tag: &str, allowed: &[&str], name: &str, value: &str) -> Option<String> {
        if name.starts_with("on") {
            tracing::debug!("Removed event handler attribute {name} on <{tag}>");
            return None;
        }
        if !allowed.contains(&name) && !GLOBAL_ATTRIBUTES.contains(&name) && !is_aria_attribute(name)
        {
            tracing::debug!("Removed attribute {name} on <{tag}>");
            return None;
        }

        if URL_ATTRIBUTES.contains(&name) {
            let url = self.urls.sanitize(value);
            return (url == value).then_some(url);
        }
        if name == "style" {
            let css = self.css.sanitize(value);
            return (!css.is_empty() || value.is_empty()).then_some(css);
        }
        Some(value.to_string())
    }
}

/// Elements whose first newline the parser swallows. Serialized without
/// it, `<pre>\n\nx` would lose a line.
const LEADING_NEWLINE_ELEMENTS: &[&str] = &["pre", "listing", "textarea"];

/// Serializes the whitelisted part of a parsed fragment.
///
/// The tree is walked with [`NodeRef::traverse`], never by recursion, so
/// arbitrarily deep markup cannot exhaust the stack.
struct Cleaner<'a> {
    policy: &'a HtmlSanitizer,
    out: String,
    changed: bool,
}

impl Cleaner<'_> {
    fn visit(&mut self, root: NodeRef<'_, Node>) {
        // Open nodes inside a subtree removed with its content.
        let mut skipping = 0usize;
        for edge in root.traverse() {
            match edge {
                Edge::Open(_) if skipping > 0 => skipping += 1,
                Edge::Close(_) if skipping > 0 => skipping -= 1,
                Edge::Open(node) => {
                    if !self.open(node) {
                        skipping = 1;
                    }
                }
                Edge::Close(node) => self.close(node),
            }
        }
    }

    /// Returns `false` if the node's subtree must be skipped.
    fn open(&mut self, node: NodeRef<'_, Node>) -> bool {
        match node.value() {
            Node::Document | Node::Fragment => {}
            Node::Element(el) => {
                let tag = el.name();

                if DROP_WITH_CONTENT.contains(&tag) {
                    tracing::debug!("Removed <{tag}> and its content");
                    self.changed = true;
                    return false;
                }

                let Some(allowed) = tag_attributes(tag) else {
                    tracing::debug!("Unwrapped <{tag}>");
                    self.changed = true;
                    return true;
                };

                self.out.push('<');
                self.out.push_str(tag);
                for (name, value) in el.attrs() {
                    match self.policy.clean_attribute(tag, allowed, name, value) {
                        Some(cleaned) => {
                            self.changed |= cleaned != value;
                            self.out.push(' ');
                            self.out.push_str(name);
                            self.out.push_str("=\"");
                            escape_attribute(&cleaned, &mut self.out);
                            self.out.push('"');
                        }
                        None => self.changed = true,
                    }
                }
                self.out.push('>');
            }
            Node::Text(text) => {
                if text.starts_with('\n') && follows_swallowed_newline(node) {
                    self.out.push('\n');
                }
                escape_text(text.as_ref(), &mut self.out);
            }
            _ => self.changed = true,
        }
        true
    }

    fn close(&mut self, node: NodeRef<'_, Node>) {
        let Node::Element(el) = node.value() else {
            return;
        };
        let tag = el.name();
        if tag_attributes(tag).is_some() && !VOID_ELEMENTS.contains(&tag) {
            self.out.push_str("</");
            self.out.push_str(tag);
            self.out.push('>');
        }
    }
}

/// `true` for the first child of a kept `<pre>`-like element.
fn follows_swallowed_newline(text: NodeRef<'_, Node>) -> bool {
    text.prev_sibling().is_none()
        && text.parent().is_some_and(|parent| match parent.value() {
            Node::Element(el) => {
                LEADING_NEWLINE_ELEMENTS.contains(&el.name()) && tag_attributes(el.name()).is_some()
            }
            _ => false,
        })
}

/// The children of the fragment root, looking through the synthetic `<html>`
/// element the fragment parser wraps content in.
///
/// Returns `true` if the wrapper picked up attributes (from a stray
/// `<html ...>` tag in the input), which never make it to the output.
pub(crate) fn fragment_content<'a>(
    fragment: &'a Html,
    mut visit: impl FnMut(NodeRef<'a, Node>),
) -> bool {
    let mut wrapper_attrs = false;
    for child in fragment.tree.root().children() {
        match child.value() {
            Node::Element(el) if el.name() == "html" => {
                wrapper_attrs |= el.attrs().next().is_some();
                child.children().for_each(&mut visit);
            }
            _ => visit(child),
        }
    }
    wrapper_attrs
}

pub(crate) fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

fn escape_attribute(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}

impl Sanitizer for HtmlSanitizer {
    fn sanitize(&self, input: &str) -> String {
        let fragment = Html::parse_fragment(input);
        let mut cleaner = Cleaner {
            policy: self,
            out: String::with_capacity(input.len()),
            changed: false,
        };

        let wrapper_attrs = fragment_content(&fragment, |node| cleaner.visit(node));

        if cleaner.changed || wrapper_attrs {
            cleaner.out
        } else {
            input.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn safe_markup_is_returned_byte_for_byte() {
        let s = HtmlSanitizer::default();
        for html in [
            "Hello <strong>World</strong>",
            "<p class='lead'>Intro &amp; more&nbsp;text</p>\n<ul><li>One<li>Two</ul>",
            r#"<a href="https://example.com" target="_blank" rel="noopener">Link</a>"#,
            r#"<img src="/wp-content/uploads/a.jpg" alt="A">"#,
            r#"<p style="color: red; text-align:center">x</p>"#,
            "<table><tr><td colspan=2>cell</td></tr></table>",
            "plain text, no markup",
            "",
        ] {
            assert_eq!(s.sanitize(html), html);
        }
    }

    #[test]
    fn script_blocks_are_removed_with_content() {
        let s = HtmlSanitizer::default();
        let out = s.sanitize("<p>Hello</p><script>alert(1)</script><p>World</p>");
        assert_eq!(out, "<p>Hello</p><p>World</p>");

        let out = s.sanitize("Hello<SCRIPT type=\"text/javascript\">alert(1)</SCRIPT>World");
        assert_eq!(out, "HelloWorld");
        assert!(!out.to_ascii_lowercase().contains("<script"));
    }

    #[test]
    fn side_effect_containers_are_removed_with_content() {
        let s = HtmlSanitizer::default();
        let html = concat!(
            r#"<div>a<iframe src="https://evil.com">fallback</iframe>b"#,
            r#"<object data="x.swf"><param name="a"></object>"#,
            r#"<embed src="x.swf"><style>body{display:none}</style>"#,
            r#"<svg><script>alert(1)</script></svg>c</div>"#,
        );
        assert_eq!(s.sanitize(html), "<div>abc</div>");
    }

    #[test]
    fn unknown_tags_are_unwrapped() {
        let s = HtmlSanitizer::default();
        assert_eq!(
            s.sanitize("<form action=\"/x\"><blink>Hi</blink> <custom-el>there</custom-el></form>"),
            "Hi there"
        );
        assert_eq!(
            s.sanitize("<textarea>&lt;b&gt;</textarea>"),
            "&lt;b&gt;"
        );
    }

    #[test]
    fn event_handlers_are_always_stripped() {
        let s = HtmlSanitizer::default();
        let out = s.sanitize(r#"<img src="a.png" onerror="alert(1)" ONLOAD="x()"><p onmouseover=y>t</p>"#);
        assert_eq!(out, r#"<img src="a.png"><p>t</p>"#);
        assert!(!out.contains(" on"));
    }

    #[test]
    fn unsafe_urls_remove_the_attribute() {
        let s = HtmlSanitizer::default();
        assert_eq!(
            s.sanitize(r#"<a href="jav&#x09;ascript:alert(1)">x</a>"#),
            "<a>x</a>"
        );
        assert_eq!(
            s.sanitize(r#"<a href="&#106;avascript:alert(1)" title="t">x</a>"#),
            r#"<a title="t">x</a>"#
        );
        assert_eq!(s.sanitize(r#"<img src="data:text/html,x" alt="a">"#), r#"<img alt="a">"#);
    }

    #[test]
    fn style_attributes_are_cleaned_surgically() {
        let s = HtmlSanitizer::default();
        assert_eq!(
            s.sanitize(r#"<span style="color: red; background: url(javascript:alert(1))">x</span>"#),
            r#"<span style="color: red;">x</span>"#
        );
        assert_eq!(
            s.sanitize(r#"<span style="width: expression(alert(1))">x</span>"#),
            "<span>x</span>"
        );
    }

    #[test]
    fn non_whitelisted_attributes_are_removed() {
        let s = HtmlSanitizer::default();
        assert_eq!(
            s.sanitize(r#"<div data-settings="{}" aria-label="box" formaction="x">y</div>"#),
            r#"<div aria-label="box">y</div>"#
        );
    }

    #[test]
    fn comments_and_stray_html_attributes_are_removed() {
        let s = HtmlSanitizer::default();
        assert_eq!(s.sanitize("a<!--[if IE]><script>x</script><![endif]-->b"), "ab");
        assert_eq!(s.sanitize("<html onload=\"x()\">t"), "t");
    }

    #[test]
    fn rewritten_output_escapes_text_and_attributes() {
        let s = HtmlSanitizer::default();
        let out = s.sanitize("<x-y>a &lt;b&gt; &amp; c</x-y><p title='say \"hi\"'>t</p>");
        assert_eq!(out, r#"a &lt;b&gt; &amp; c<p title="say &quot;hi&quot;">t</p>"#);
    }

    #[test]
    fn sanitizing_twice_changes_nothing() {
        let s = HtmlSanitizer::default();
        for html in [
            "<p>Hello</p><script>alert(1)</script><p>World</p>",
            "<b><i>mis</b>nested</i><blink>x</blink>",
            r#"<a href="javascript:x" onclick="y">z</a><img src=x onerror=alert(1)>"#,
            "<table><div>foster</div><tr><td>c</td></tr></table>",
        ] {
            let once = s.sanitize(html);
            assert_eq!(s.sanitize(&once), once, "{html}");
        }
    }

    #[test]
    fn deeply_nested_markup_is_walked_without_recursion() {
        let s = HtmlSanitizer::default();
        let depth = 50_000;
        let input = format!("{}x<script>alert(1)</script>", "<span>".repeat(depth));
        let out = s.sanitize(&input);
        assert_eq!(
            out,
            format!("{}x{}", "<span>".repeat(depth), "</span>".repeat(depth))
        );

        let unknown = format!("{}y", "<x-wrap>".repeat(depth));
        assert_eq!(s.sanitize(&unknown), "y");
    }

    #[test]
    fn rewritten_pre_keeps_its_leading_newlines() {
        let s = HtmlSanitizer::default();
        assert_eq!(
            s.sanitize("<pre>\n\nx</pre><script>a</script>"),
            "<pre>\n\nx</pre>"
        );
        assert_eq!(s.sanitize("<pre>\nx</pre><script>a</script>"), "<pre>x</pre>");
        assert_eq!(
            s.sanitize("<pre><b>\nb</b></pre><script>a</script>"),
            "<pre><b>\nb</b></pre>"
        );
        let once = s.sanitize("<pre>\n\n\ncode</pre><!-- c -->");
        assert_eq!(once, "<pre>\n\n\ncode</pre>");
        assert_eq!(s.sanitize(&once), once);
    }

    #[test]
    fn non_string_values_become_empty() {
        let s = HtmlSanitizer::default();
        assert_eq!(s.sanitize_value(&json!(null)), "");
        assert_eq!(s.sanitize_value(&json!(true)), "");
    }
}
