//! The synchronous entry point bundling every sanitizer behind one policy.

use serde_json::{Map, Value};

use crate::config::EngineBuilder;
use crate::element::{ElementNode, TreeWalker, WalkLimits};
use crate::sanitizer::Sanitizer;
use crate::settings::SettingsValidator;

/// A configured sanitization engine.
///
/// Immutable once built and safe to share between threads. Every method is a
/// pure function of its input and the engine's configuration.
///
/// ```rust
/// use paste_guard::Engine;
/// use serde_json::json;
///
/// let engine = Engine::default();
/// let node = engine
///     .sanitize_element_data(&json!({
///         "id": "w1",
///         "elType": "widget",
///         "widgetType": "html",
///         "settings": { "html": "<p>hi</p><script>alert(1)</script>" },
///     }))
///     .unwrap();
/// assert_eq!(node.settings["html"], json!("<p>hi</p>"));
/// ```
#[derive(Clone, Debug, Default)]
pub struct Engine {
    walker: TreeWalker,
}

impl Engine {
    pub fn new(validator: SettingsValidator, limits: WalkLimits) -> Self {
        Self {
            walker: TreeWalker::new(validator, limits),
        }
    }

    /// Start configuring an engine.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    pub fn walker(&self) -> &TreeWalker {
        &self.walker
    }

    pub fn validator(&self) -> &SettingsValidator {
        self.walker.validator()
    }

    pub fn sanitize_url(&self, url: &str) -> String {
        self.validator().url_sanitizer().sanitize(url)
    }

    pub fn sanitize_css(&self, css: &str) -> String {
        self.validator().css_sanitizer().sanitize(css)
    }

    pub fn sanitize_html(&self, html: &str) -> String {
        self.validator().html_sanitizer().sanitize(html)
    }

    pub fn sanitize_plain_text(&self, text: &str) -> String {
        self.validator().plain_text_sanitizer().sanitize(text)
    }

    pub fn validate_settings(
        &self,
        settings: &Map<String, Value>,
        widget_type: Option<&str>,
    ) -> Map<String, Value> {
        self.validator().validate(settings, widget_type)
    }

    pub fn sanitize_element_data(&self, node: &Value) -> Option<ElementNode> {
        self.walker.sanitize_element_data(node)
    }

    pub fn sanitize_elements(&self, nodes: &Value) -> Vec<ElementNode> {
        self.walker.sanitize_elements(nodes)
    }

    /// Parse and sanitize a serialized element. Malformed JSON yields `None`.
    pub fn sanitize_json(&self, json: &str) -> Option<ElementNode> {
        match serde_json::from_str::<Value>(json) {
            Ok(node) => self.sanitize_element_data(&node),
            Err(e) => {
                tracing::warn!("Rejected element payload: {e}");
                None
            }
        }
    }
}
