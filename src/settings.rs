//! Settings validation: route every field to the sanitizer its schema names.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::sanitizer::{
    CssSanitizer, HtmlSanitizer, PlainTextSanitizer, Sanitizer, UrlPolicy, UrlSanitizer,
    is_color_literal,
};
use crate::schema::{FieldKind, ResolvedSchema, WidgetSchemaRegistry};

/// Nesting limit for structured settings values. Deeper values become `null`.
const MAX_VALUE_DEPTH: usize = 16;

static FIELD_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_$@.:\-]{1,128}$").expect("valid regex"));

/// Keys a JavaScript host would treat as object-prototype access.
const PROTOTYPE_KEYS: &[&str] = &["__proto__", "constructor", "prototype"];

static CUSTOM_ATTRIBUTE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z_:][a-z0-9_:.\-]*$").expect("valid regex"));

/// Attribute names a link's custom attributes may not set.
const CUSTOM_ATTRIBUTE_BLOCKLIST: &[&str] = &[
    "href", "src", "srcset", "style", "action", "formaction", "xlink:href", "id", "class",
    "data-settings", "data-id", "data-element_type", "data-widget_type",
];

fn is_field_name(name: &str) -> bool {
    FIELD_NAME.is_match(name) && !PROTOTYPE_KEYS.contains(&name)
}

/// Validates a settings mapping against the [`WidgetSchemaRegistry`].
///
/// Each field is classified by the registry and sent through the matching
/// sanitizer; unknown fields take the plain-text path. The input is never
/// modified; a new mapping is returned.
#[derive(Clone, Debug)]
pub struct SettingsValidator {
    registry: WidgetSchemaRegistry,
    urls: UrlSanitizer,
    css: CssSanitizer,
    html: HtmlSanitizer,
    text: PlainTextSanitizer,
}

impl SettingsValidator {
    /// Create a validator for `registry`, checking URLs with `policy`.
    pub fn new(registry: WidgetSchemaRegistry, policy: UrlPolicy) -> Self {
        let urls = UrlSanitizer::new(policy);
        let css = CssSanitizer::new(urls.clone());
        let html = HtmlSanitizer::new(urls.clone(), css.clone());
        Self {
            registry,
            urls,
            css,
            html,
            text: PlainTextSanitizer,
        }
    }

    pub fn registry(&self) -> &WidgetSchemaRegistry {
        &self.registry
    }

    pub fn url_sanitizer(&self) -> &UrlSanitizer {
        &self.urls
    }

    pub fn css_sanitizer(&self) -> &CssSanitizer {
        &self.css
    }

    pub fn html_sanitizer(&self) -> &HtmlSanitizer {
        &self.html
    }

    pub fn plain_text_sanitizer(&self) -> &PlainTextSanitizer {
        &self.text
    }

    /// Validate the settings of a node of type `widget_type`.
    pub fn validate(
        &self,
        settings: &Map<String, Value>,
        widget_type: Option<&str>,
    ) -> Map<String, Value> {
        self.validate_resolved(settings, self.registry.resolve(widget_type), 0)
    }

    /// Validate settings against an already resolved schema.
    pub fn validate_resolved(
        &self,
        settings: &Map<String, Value>,
        schema: ResolvedSchema<'_>,
        depth: usize,
    ) -> Map<String, Value> {
        settings
            .iter()
            .filter(|(name, _)| self.keep_name(name))
            .map(|(name, value)| {
                let kind = schema.kind_of(name);
                (name.clone(), self.clean_field(kind, value, depth))
            })
            .collect()
    }

    fn keep_name(&self, name: &str) -> bool {
        let keep = is_field_name(name);
        if !keep {
            tracing::debug!("Dropped settings entry with malformed key ({} bytes)", name.len());
        }
        keep
    }

    fn clean_field(&self, kind: &FieldKind, value: &Value, depth: usize) -> Value {
        match (kind, value) {
            (FieldKind::Html, Value::String(s)) => Value::String(self.html.sanitize(s)),
            (FieldKind::Css, Value::String(s)) => Value::String(self.css.sanitize(s)),
            (FieldKind::Url, Value::String(s)) => Value::String(self.urls.sanitize(s)),
            (FieldKind::Url, Value::Object(link)) => Value::Object(self.clean_link(link, depth)),
            (FieldKind::Color, Value::String(s)) if is_color_literal(s) => value.clone(),
            (FieldKind::Number, Value::Number(_)) | (FieldKind::Boolean, Value::Bool(_)) => {
                value.clone()
            }
            (FieldKind::Repeater(items), Value::Array(rows)) if depth < MAX_VALUE_DEPTH => {
                let schema = ResolvedSchema::of(items);
                Value::Array(
                    rows.iter()
                        .map(|row| match row {
                            Value::Object(row) => {
                                Value::Object(self.validate_resolved(row, schema, depth + 1))
                            }
                            other => self.plain(other, depth + 1),
                        })
                        .collect(),
                )
            }
            _ => self.plain(value, depth),
        }
    }

    /// Link and media objects: `{ "url": ..., "is_external": ..., ... }`.
    fn clean_link(&self, link: &Map<String, Value>, depth: usize) -> Map<String, Value> {
        link.iter()
            .filter(|(name, _)| self.keep_name(name))
            .map(|(name, value)| {
                let cleaned = match (name.as_str(), value) {
                    ("url", Value::String(s)) => Value::String(self.urls.sanitize(s)),
                    ("custom_attributes", Value::String(s)) => {
                        Value::String(self.clean_custom_attributes(s))
                    }
                    _ => self.plain(value, depth + 1),
                };
                (name.clone(), cleaned)
            })
            .collect()
    }

    /// `key|value` pairs separated by commas. Pairs that would set an event
    /// handler, a URL-bearing or structural attribute, or carry markup are
    /// dropped; the rest are kept verbatim.
    fn clean_custom_attributes(&self, attributes: &str) -> String {
        let kept: Vec<&str> = attributes
            .split(',')
            .filter(|pair| {
                let key = pair.split('|').next().unwrap_or_default().trim().to_ascii_lowercase();
                let allowed = key.is_empty()
                    || (CUSTOM_ATTRIBUTE_NAME.is_match(&key)
                        && !key.starts_with("on")
                        && !CUSTOM_ATTRIBUTE_BLOCKLIST.contains(&key.as_str())
                        && self.text.sanitize(pair) == *pair);
                if !allowed {
                    tracing::debug!("Dropped custom attribute {key:?}");
                }
                allowed
            })
            .collect();
        kept.join(",")
    }

    /// The plain-text path: strings lose their markup, scalars are kept,
    /// containers are walked.
    fn plain(&self, value: &Value, depth: usize) -> Value {
        if depth >= MAX_VALUE_DEPTH {
            tracing::debug!("Settings value nested {depth} levels deep, replaced with null");
            return Value::Null;
        }
        match value {
            Value::String(s) => Value::String(self.text.sanitize(s)),
            Value::Array(items) => {
                Value::Array(items.iter().map(|v| self.plain(v, depth + 1)).collect())
            }
            Value::Object(map) => Value::Object(
                map.iter()
                    .filter(|(name, _)| self.keep_name(name))
                    .map(|(name, v)| (name.clone(), self.plain(v, depth + 1)))
                    .collect(),
            ),
            Value::Null | Value::Bool(_) | Value::Number(_) => value.clone(),
        }
    }
}

impl Default for SettingsValidator {
    fn default() -> Self {
        Self::new(WidgetSchemaRegistry::builtin(), UrlPolicy::default())
    }
}
