//! Page-builder element trees and the recursive walker that sanitizes them.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::settings::SettingsValidator;

/// Element types the page builder defines. Other well-shaped types are kept.
pub const KNOWN_ELEMENT_TYPES: &[&str] = &["section", "column", "container", "widget"];

static TYPE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_-]{0,63}$").expect("valid regex"));

static ELEMENT_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,64}$").expect("valid regex"));

/// One page-builder component instance.
///
/// Serializes to the builder's own JSON shape (`elType`, `widgetType`,
/// `isInner`, ...), so a sanitized tree can be handed straight to the host.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementNode {
    /// Absent ids stay absent; uniqueness is the host's concern.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub el_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub widget_type: Option<String>,
    #[serde(default)]
    pub settings: Map<String, Value>,
    /// Children in rendering order.
    #[serde(default)]
    pub elements: Vec<ElementNode>,
    #[serde(default)]
    pub is_inner: bool,
}

impl ElementNode {
    /// The node as an untyped JSON value.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_default()
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn node_count(&self) -> usize {
        1 + self.elements.iter().map(ElementNode::node_count).sum::<usize>()
    }

    /// The type used to look up the settings schema: the widget type for
    /// widgets, the element type otherwise.
    pub fn schema_type(&self) -> &str {
        self.widget_type.as_deref().unwrap_or(&self.el_type)
    }
}

/// Resource bounds for one top-level sanitization call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WalkLimits {
    /// Deepest accepted nesting level; the root is level 0.
    pub max_depth: usize,
    /// Nodes visited per call. Nodes past the budget are rejected.
    pub max_nodes: usize,
}

impl Default for WalkLimits {
    fn default() -> Self {
        Self {
            max_depth: 64,
            max_nodes: 10_000,
        }
    }
}

/// Depth-first sanitizer for element trees.
///
/// Structural problems reject a node (and with it its subtree); a rejected
/// child is dropped from its parent's `elements` and never fails the parent.
#[derive(Clone, Debug, Default)]
pub struct TreeWalker {
    validator: SettingsValidator,
    limits: WalkLimits,
}

impl TreeWalker {
    pub fn new(validator: SettingsValidator, limits: WalkLimits) -> Self {
        Self { validator, limits }
    }

    pub fn validator(&self) -> &SettingsValidator {
        &self.validator
    }

    pub fn limits(&self) -> WalkLimits {
        self.limits
    }

    /// Sanitize a single untrusted element. Returns `None` if the root itself
    /// is structurally invalid.
    pub fn sanitize_element_data(&self, node: &Value) -> Option<ElementNode> {
        let mut walk = Walk::new(self.limits.max_nodes);
        let tree = self.walk(node, 0, &mut walk);
        walk.report();
        tree
    }

    /// Sanitize a top-level list of elements, as carried by clipboard
    /// payloads. Invalid entries are dropped; the node budget is shared.
    pub fn sanitize_elements(&self, nodes: &Value) -> Vec<ElementNode> {
        let Value::Array(nodes) = nodes else {
            tracing::warn!("Rejected element list: not an array");
            return Vec::new();
        };
        let mut walk = Walk::new(self.limits.max_nodes);
        let elements = nodes
            .iter()
            .filter_map(|node| self.walk(node, 0, &mut walk))
            .collect();
        walk.report();
        elements
    }

    fn walk(&self, node: &Value, depth: usize, walk: &mut Walk) -> Option<ElementNode> {
        if depth > self.limits.max_depth {
            return walk.reject(format_args!("nested deeper than {}", self.limits.max_depth));
        }
        if walk.budget == 0 {
            return walk.reject(format_args!("past the {}-node budget", self.limits.max_nodes));
        }
        walk.budget -= 1;

        let Value::Object(node) = node else {
            return walk.reject(format_args!("not an object"));
        };

        let el_type = match node.get("elType") {
            Some(Value::String(t)) if TYPE_NAME.is_match(t) => t.clone(),
            _ => return walk.malformed("elType"),
        };
        if !KNOWN_ELEMENT_TYPES.contains(&el_type.as_str()) {
            tracing::debug!("Keeping element of unknown type {el_type:?}");
        }

        let widget_type = match node.get("widgetType") {
            None | Some(Value::Null) => None,
            Some(Value::String(t)) if TYPE_NAME.is_match(t) => Some(t.clone()),
            _ => return walk.malformed("widgetType"),
        };

        let id = match node.get("id") {
            None | Some(Value::Null) => None,
            Some(Value::String(id)) if ELEMENT_ID.is_match(id) => Some(id.clone()),
            _ => return walk.malformed("id"),
        };

        let settings = match node.get("settings") {
            None | Some(Value::Null) => None,
            // An empty settings object is serialized as `[]` by some hosts.
            Some(Value::Array(items)) if items.is_empty() => None,
            Some(Value::Object(settings)) => Some(settings),
            _ => return walk.malformed("settings"),
        };

        let children: &[Value] = match node.get("elements") {
            None | Some(Value::Null) => &[],
            Some(Value::Array(children)) => children.as_slice(),
            _ => return walk.malformed("elements"),
        };

        let schema_type = widget_type.as_deref().unwrap_or(&el_type);
        let settings = settings
            .map(|s| self.validator.validate(s, Some(schema_type)))
            .unwrap_or_default();

        let elements = children
            .iter()
            .filter_map(|child| self.walk(child, depth + 1, walk))
            .collect();

        Some(ElementNode {
            id,
            el_type,
            widget_type,
            settings,
            elements,
            is_inner: node.get("isInner").and_then(Value::as_bool).unwrap_or(false),
        })
    }
}

/// Per-call state: the remaining node budget and the rejection count.
struct Walk {
    budget: usize,
    rejected: usize,
}

impl Walk {
    fn new(budget: usize) -> Self {
        Self {
            budget,
            rejected: 0,
        }
    }

    fn reject(&mut self, reason: std::fmt::Arguments<'_>) -> Option<ElementNode> {
        tracing::debug!("Rejected element: {reason}");
        self.rejected += 1;
        None
    }

    fn malformed(&mut self, field: &str) -> Option<ElementNode> {
        self.reject(format_args!("malformed {field}"))
    }

    /// One summary line per call, however many nodes were dropped.
    fn report(&self) {
        if self.rejected > 0 {
            tracing::warn!("Rejected {} element(s) while sanitizing", self.rejected);
        }
    }
}
