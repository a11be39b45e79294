//! Widget Schema Registry: which sanitizer each settings field goes through.
//!
//! A [`FieldSchema`] is an ordered table of field descriptors for one widget
//! or element type. The [`WidgetSchemaRegistry`] maps widget types to
//! schemas and also carries a *common* schema for fields every element
//! shares. Fields found in neither are [`FieldKind::PlainText`].

use std::collections::HashMap;
use std::fmt;

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;

use crate::error::Result;

/// Semantic classification of a settings field.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldKind {
    /// Markup fragment, filtered by the HTML sanitizer.
    Html,
    /// A URL string, or a link/media object with a `url` member.
    Url,
    /// Inline style or custom CSS text.
    Css,
    /// A color literal; anything else is treated as plain text.
    Color,
    /// Literal text. No markup survives.
    PlainText,
    Number,
    Boolean,
    /// Structured value (dimensions, icons, dynamic tags). Strings nested
    /// anywhere inside are treated as plain text.
    Opaque,
    /// An array of items, each validated against the nested schema.
    Repeater(FieldSchema),
}

static PLAIN_TEXT: FieldKind = FieldKind::PlainText;

/// One entry of a [`FieldSchema`].
#[derive(Clone, Debug, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: FieldKind,
}

/// Ordered field descriptors for one widget type, indexed by name.
///
/// # Example
///
/// ```
/// use paste_guard::{FieldKind, FieldSchema};
///
/// let schema = FieldSchema::new()
///     .field("title", FieldKind::PlainText)
///     .field("link", FieldKind::Url);
/// assert_eq!(schema.get("link"), Some(&FieldKind::Url));
/// assert_eq!(schema.get("missing"), None);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FieldSchema {
    fields: Vec<FieldDescriptor>,
    index: HashMap<String, usize>,
}

impl FieldSchema {
    /// Create an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or reclassify) a field.
    pub fn field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.insert(name.into(), kind);
        self
    }

    fn insert(&mut self, name: String, kind: FieldKind) {
        match self.index.get(&name) {
            Some(&i) => self.fields[i].kind = kind,
            None => {
                self.index.insert(name.clone(), self.fields.len());
                self.fields.push(FieldDescriptor { name, kind });
            }
        }
    }

    /// The classification of `name`, if this schema knows the field.
    pub fn get(&self, name: &str) -> Option<&FieldKind> {
        self.index.get(name).map(|&i| &self.fields[i].kind)
    }

    /// Field descriptors in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

// Deserialized from a JSON object, keeping declaration order.
impl<'de> Deserialize<'de> for FieldSchema {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct SchemaVisitor;

        impl<'de> Visitor<'de> for SchemaVisitor {
            type Value = FieldSchema;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of field name to field kind")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut map: A,
            ) -> std::result::Result<FieldSchema, A::Error> {
                let mut schema = FieldSchema::new();
                while let Some((name, kind)) = map.next_entry::<String, FieldKind>()? {
                    schema.insert(name, kind);
                }
                Ok(schema)
            }
        }

        deserializer.deserialize_map(SchemaVisitor)
    }
}

/// The schema(s) applying to one node, resolved once before its fields are
/// visited.
#[derive(Clone, Copy, Debug)]
pub struct ResolvedSchema<'a> {
    primary: Option<&'a FieldSchema>,
    common: Option<&'a FieldSchema>,
}

impl<'a> ResolvedSchema<'a> {
    /// A resolution consisting of a single schema (used for repeater items).
    pub fn of(schema: &'a FieldSchema) -> Self {
        Self {
            primary: Some(schema),
            common: None,
        }
    }

    /// The classification of `field`, defaulting to [`FieldKind::PlainText`].
    pub fn kind_of(&self, field: &str) -> &'a FieldKind {
        self.primary
            .and_then(|s| s.get(field))
            .or_else(|| self.common.and_then(|s| s.get(field)))
            .unwrap_or(&PLAIN_TEXT)
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RegistryFile {
    #[serde(default)]
    common: FieldSchema,
    #[serde(default)]
    widgets: HashMap<String, FieldSchema>,
}

/// Mapping from widget (or element) type to its [`FieldSchema`].
///
/// The registry is static configuration: it is built once and shared by
/// every sanitization call.
///
/// # Example
///
/// ```
/// use paste_guard::{FieldKind, FieldSchema, WidgetSchemaRegistry};
///
/// let registry = WidgetSchemaRegistry::new()
///     .common(FieldSchema::new().field("custom_css", FieldKind::Css))
///     .register("heading", FieldSchema::new().field("title", FieldKind::PlainText));
///
/// let heading = registry.resolve(Some("heading"));
/// assert_eq!(heading.kind_of("custom_css"), &FieldKind::Css);
/// assert_eq!(heading.kind_of("unknown"), &FieldKind::PlainText);
/// ```
#[derive(Clone, Debug, Default)]
pub struct WidgetSchemaRegistry {
    widgets: HashMap<String, FieldSchema>,
    common: FieldSchema,
}

impl WidgetSchemaRegistry {
    /// An empty registry: every field is plain text.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the schema for a widget type.
    pub fn register(mut self, widget_type: impl Into<String>, schema: FieldSchema) -> Self {
        self.widgets.insert(widget_type.into(), schema);
        self
    }

    /// Set the schema consulted for fields the widget schema does not name.
    pub fn common(mut self, schema: FieldSchema) -> Self {
        self.common = schema;
        self
    }

    /// Resolve the schemas for a node of the given type.
    pub fn resolve(&self, widget_type: Option<&str>) -> ResolvedSchema<'_> {
        ResolvedSchema {
            primary: widget_type.and_then(|t| self.widgets.get(t)),
            common: Some(&self.common),
        }
    }

    /// Returns `true` if a schema is registered for `widget_type`.
    pub fn contains(&self, widget_type: &str) -> bool {
        self.widgets.contains_key(widget_type)
    }

    /// Load a registry from JSON:
    ///
    /// ```json
    /// {
    ///   "common": { "custom_css": "css" },
    ///   "widgets": {
    ///     "heading": { "title": "plainText", "link": "url" },
    ///     "tabs": { "tabs": { "repeater": { "tab_content": "html" } } }
    ///   }
    /// }
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        let file: RegistryFile = serde_json::from_str(json)?;
        Ok(Self {
            widgets: file.widgets,
            common: file.common,
        })
    }

    /// Schemas for the stock page-builder elements and widgets.
    pub fn builtin() -> Self {
        use FieldKind::*;

        let common = FieldSchema::new()
            .field("_element_id", PlainText)
            .field("_css_classes", PlainText)
            .field("custom_css", Css)
            .field("_background_color", Color)
            .field("_background_image", Url)
            .field("_border_color", Color)
            .field("_margin", Opaque)
            .field("_padding", Opaque)
            .field("_z_index", Number)
            .field("background_color", Color)
            .field("background_image", Url)
            .field("background_video_link", Url)
            .field("background_overlay_color", Color)
            .field("border_color", Color)
            .field("margin", Opaque)
            .field("padding", Opaque)
            .field("__globals__", Opaque)
            .field("__dynamic__", Opaque);

        let items = |fields: &[(&str, FieldKind)]| {
            fields
                .iter()
                .cloned()
                .fold(FieldSchema::new(), |schema, (name, kind)| schema.field(name, kind))
        };

        let tab_items = items(&[("tab_title", PlainText), ("tab_content", Html)]);

        Self::new()
            .common(common)
            .register(
                "section",
                items(&[
                    ("content_width", Opaque),
                    ("custom_height", Opaque),
                    ("html_tag", PlainText),
                ]),
            )
            .register(
                "column",
                items(&[("_column_size", Number), ("_inline_size", Number)]),
            )
            .register(
                "container",
                items(&[
                    ("link", Url),
                    ("html_tag", PlainText),
                    ("boxed_width", Opaque),
                    ("min_height", Opaque),
                    ("flex_gap", Opaque),
                ]),
            )
            .register(
                "heading",
                items(&[
                    ("title", PlainText),
                    ("link", Url),
                    ("header_size", PlainText),
                    ("title_color", Color),
                    ("typography_font_size", Opaque),
                ]),
            )
            .register(
                "text-editor",
                items(&[("editor", Html), ("text_color", Color)]),
            )
            .register(
                "button",
                items(&[
                    ("text", PlainText),
                    ("link", Url),
                    ("button_text_color", Color),
                    ("selected_icon", Opaque),
                ]),
            )
            .register(
                "image",
                items(&[
                    ("image", Url),
                    ("caption", PlainText),
                    ("link", Url),
                    ("width", Opaque),
                ]),
            )
            .register("html", items(&[("html", Html)]))
            .register(
                "video",
                items(&[
                    ("youtube_url", Url),
                    ("vimeo_url", Url),
                    ("dailymotion_url", Url),
                    ("hosted_url", Url),
                    ("external_url", Url),
                    ("image_overlay", Url),
                    ("start", Number),
                    ("end", Number),
                ]),
            )
            .register(
                "icon-box",
                items(&[
                    ("title_text", PlainText),
                    ("description_text", Html),
                    ("link", Url),
                    ("primary_color", Color),
                    ("selected_icon", Opaque),
                ]),
            )
            .register(
                "image-box",
                items(&[
                    ("image", Url),
                    ("title_text", PlainText),
                    ("description_text", Html),
                    ("link", Url),
                ]),
            )
            .register("tabs", items(&[("tabs", Repeater(tab_items.clone()))]))
            .register("accordion", items(&[("tabs", Repeater(tab_items))]))
            .register(
                "icon-list",
                items(&[
                    (
                        "icon_list",
                        Repeater(items(&[
                            ("text", PlainText),
                            ("link", Url),
                            ("selected_icon", Opaque),
                        ])),
                    ),
                    ("icon_color", Color),
                    ("text_color", Color),
                ]),
            )
    }
}
