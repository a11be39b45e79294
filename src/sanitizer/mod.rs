//! String sanitizers for the injection surfaces of a settings value.
//!
//! Every sanitizer implements the [`Sanitizer`] trait and is a pure
//! function of its input and its (immutable) policy.
//!
//! Built-in sanitizers:
//!
//! - [`UrlSanitizer`] -- blanks URLs with executable or unknown schemes.
//! - [`CssSanitizer`] -- removes script-executing CSS declarations.
//! - [`HtmlSanitizer`] -- reduces markup to a tag/attribute whitelist.
//! - [`PlainTextSanitizer`] -- strips all markup.

mod color;
mod css;
mod html;
mod text;
mod url;

pub use color::is_color_literal;
pub use css::CssSanitizer;
pub use html::HtmlSanitizer;
pub use text::PlainTextSanitizer;
pub use url::{UrlPolicy, UrlSanitizer};

use serde_json::Value;

/// Trait for string sanitizers.
///
/// Each sanitizer receives a string and returns a safe version of it. A
/// sanitizer never fails: input it cannot make safe becomes `""`.
/// Implementations must be `Send + Sync` so they can be shared with the
/// background worker.
pub trait Sanitizer: Send + Sync {
    /// Transform the given input, returning the sanitized result.
    fn sanitize(&self, input: &str) -> String;

    /// Sanitize an untyped JSON value. Anything but a string becomes `""`.
    fn sanitize_value(&self, value: &Value) -> String {
        value
            .as_str()
            .map(|input| self.sanitize(input))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sanitizers_work_as_trait_objects() {
        let all: Vec<Box<dyn Sanitizer>> = vec![
            Box::new(UrlSanitizer::default()),
            Box::new(CssSanitizer::default()),
            Box::new(HtmlSanitizer::default()),
            Box::new(PlainTextSanitizer),
        ];
        for s in &all {
            assert_eq!(s.sanitize_value(&json!(null)), "");
            assert_eq!(s.sanitize(""), "");
        }
    }

    #[test]
    fn layered_sanitizers_share_one_url_policy() {
        let urls = UrlSanitizer::new(UrlPolicy::new().allow_image_data(true));
        let html = HtmlSanitizer::new(urls.clone(), CssSanitizer::new(urls));
        let input = concat!(
            r#"<img src="data:image/png;base64,AAAA">"#,
            r#"<p style="background: url(data:image/gif;base64,R0lG)">x</p>"#,
        );
        assert_eq!(html.sanitize(input), input);

        let strict = HtmlSanitizer::default();
        assert_eq!(strict.sanitize(input), "<img><p>x</p>");
    }
}
