//! Plain-text sanitizer: no markup survives.

use ego_tree::NodeRef;
use ego_tree::iter::Edge;
use scraper::{Html, node::Node};

use super::Sanitizer;
use super::html::{DROP_WITH_CONTENT, escape_text, fragment_content};

/// Sanitizer for fields that must never carry markup.
///
/// A value that parses to text only is returned unchanged (`5 > 3`,
/// `Fish &amp; Chips`). Anything else is reduced to its text content,
/// minus the content of script-like containers, and escaped so it stays
/// text when inserted as HTML.
///
/// # Example
///
/// ```
/// use paste_guard::{PlainTextSanitizer, Sanitizer};
///
/// let text = PlainTextSanitizer;
/// assert_eq!(text.sanitize("Our <em>best</em> offer"), "Our best offer");
/// assert_eq!(text.sanitize("5 > 3"), "5 > 3");
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct PlainTextSanitizer;

struct TextCollector {
    out: String,
    markup: bool,
}

impl TextCollector {
    fn visit(&mut self, root: NodeRef<'_, Node>) {
        // Open nodes inside a script-like container.
        let mut skipping = 0usize;
        for edge in root.traverse() {
            let node = match edge {
                Edge::Open(_) if skipping > 0 => {
                    skipping += 1;
                    continue;
                }
                Edge::Close(_) if skipping > 0 => {
                    skipping -= 1;
                    continue;
                }
                Edge::Open(node) => node,
                Edge::Close(_) => continue,
            };
            match node.value() {
                Node::Text(text) => escape_text(text.as_ref(), &mut self.out),
                Node::Element(el) => {
                    self.markup = true;
                    if DROP_WITH_CONTENT.contains(&el.name()) {
                        skipping = 1;
                    }
                }
                Node::Document | Node::Fragment => {}
                _ => self.markup = true,
            }
        }
    }
}

impl Sanitizer for PlainTextSanitizer {
    fn sanitize(&self, input: &str) -> String {
        // Fast path: nothing that could open a tag or a comment.
        if !input.contains('<') {
            return input.to_string();
        }

        let fragment = Html::parse_fragment(input);
        let mut collector = TextCollector {
            out: String::with_capacity(input.len()),
            markup: false,
        };
        let wrapper_attrs = fragment_content(&fragment, |node| collector.visit(node));

        if collector.markup || wrapper_attrs {
            tracing::debug!("Stripped markup from plain-text value");
            collector.out
        } else {
            input.to_string()
        }
    }
}
