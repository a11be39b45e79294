//! # paste_guard
//!
//! Sanitization for untrusted page-builder element trees, such as content
//! pasted from another site or imported from a template file.
//!
//! ## Overview
//!
//! A pasted element is a JSON tree of sections, columns, containers and
//! widgets. Every string in its `settings` may end up in an HTML body, an
//! attribute, a `<style>` block or a link, so each one is routed to the
//! sanitizer for the surface its widget schema says it lands in:
//!
//! - [`UrlSanitizer`] blanks URLs with executable or unknown schemes.
//! - [`CssSanitizer`] removes script-executing declarations and blocks.
//! - [`HtmlSanitizer`] reduces markup to a tag and attribute whitelist.
//! - [`PlainTextSanitizer`] strips all markup.
//!
//! Fields the schema does not know about are treated as plain text. The
//! [`TreeWalker`] validates the structure of every node, bounds depth and
//! size, and drops nodes it cannot make safe.
//!
//! ## Quick start
//!
//! ```rust
//! use serde_json::json;
//!
//! let pasted = json!({
//!     "id": "a1b2c3",
//!     "elType": "widget",
//!     "widgetType": "button",
//!     "settings": {
//!         "text": "Click <b>me</b>",
//!         "link": { "url": "javascript:alert(document.cookie)" },
//!     },
//! });
//!
//! let node = paste_guard::sanitize_element_data(&pasted).unwrap();
//! assert_eq!(node.settings["text"], json!("Click me"));
//! assert_eq!(node.settings["link"], json!({ "url": "" }));
//! ```
//!
//! For heavy traffic, [`EngineBuilder::spawn`] runs the engine behind a
//! bounded queue with a per-payload deadline.

pub mod config;
pub mod element;
pub mod engine;
pub mod error;
pub mod handle;
pub mod sanitizer;
pub mod schema;
pub mod settings;
mod worker;

pub use config::EngineBuilder;
pub use element::{ElementNode, TreeWalker, WalkLimits};
pub use engine::Engine;
pub use error::{PasteGuardError, Result};
pub use handle::{EngineHandle, EngineSender, Pending};
pub use sanitizer::{
    CssSanitizer, HtmlSanitizer, PlainTextSanitizer, Sanitizer, UrlPolicy, UrlSanitizer,
    is_color_literal,
};
pub use schema::{FieldKind, FieldSchema, WidgetSchemaRegistry};
pub use settings::SettingsValidator;

use std::sync::OnceLock;

use serde_json::{Map, Value};

// Global engine behind the free functions below
static GLOBAL: OnceLock<Engine> = OnceLock::new();

/// Install the engine used by the crate-level functions.
///
/// Call once at application startup, before the first sanitization. Returns
/// [`PasteGuardError::Config`] if a global engine is already in place.
pub fn init(engine: Engine) -> Result<()> {
    GLOBAL
        .set(engine)
        .map_err(|_| PasteGuardError::Config("global engine already initialized".into()))
}

/// The global engine. Falls back to [`Engine::default`] if [`init()`] was
/// never called.
pub fn global() -> &'static Engine {
    GLOBAL.get_or_init(Engine::default)
}

/// Sanitize a URL with the global engine.
pub fn sanitize_url(url: &str) -> String {
    global().sanitize_url(url)
}

/// Sanitize a CSS fragment with the global engine.
pub fn sanitize_css(css: &str) -> String {
    global().sanitize_css(css)
}

/// Sanitize an HTML fragment with the global engine.
pub fn sanitize_html(html: &str) -> String {
    global().sanitize_html(html)
}

/// Strip all markup from `text` with the global engine.
pub fn sanitize_plain_text(text: &str) -> String {
    global().sanitize_plain_text(text)
}

/// Validate a settings map against the schema of `widget_type`.
pub fn validate_settings(
    settings: &Map<String, Value>,
    widget_type: Option<&str>,
) -> Map<String, Value> {
    global().validate_settings(settings, widget_type)
}

/// Sanitize an untrusted element tree with the global engine.
pub fn sanitize_element_data(node: &Value) -> Option<ElementNode> {
    global().sanitize_element_data(node)
}
