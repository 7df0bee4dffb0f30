//! Contact payloads and the blend (merge) rule used by propagation.

use serde::{Deserialize, Serialize};

/// Opaque value payload carried by a contact.
///
/// The propagation engine only requires `PartialEq` (to detect a no-op
/// update) and `Clone`; the variants below are the concrete shapes the core
/// ships so bridges and storage drivers have something to serialize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    /// Absence of a meaningful value, distinct from "no content yet".
    Null,
    /// A boolean flag.
    Bool(bool),
    /// A numeric value. `merge` blending treats this as totally ordered.
    Number(f64),
    /// A text value. `merge` blending treats this as append-only.
    Text(String),
    /// An escape hatch for arbitrary structured payloads crossing a bridge.
    Json(serde_json::Value),
}

impl Value {
    /// Name of the content type, used to look up a blend combiner.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::Text(_) => "text",
            Self::Json(_) => "json",
        }
    }
}

/// The blend mode declared on a contact (spec §3, §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlendMode {
    /// Replace the current content with the new value outright.
    AcceptLast,
    /// Combine old and new content via the blend function registered for
    /// the contact's content type. Falls back to `accept-last` semantics
    /// when no combiner is registered for that type (spec §4.1 step 2).
    Merge,
}

impl Default for BlendMode {
    fn default() -> Self {
        Self::AcceptLast
    }
}

/// Built-in monotone combiners for [`BlendMode::Merge`].
///
/// The spec leaves the merge registry open ("the source does not enumerate
/// them"); these are the "at minimum" combiners this implementation ships.
fn merge_combine(old: &Value, new: &Value) -> Option<Value> {
    match (old, new) {
        (Value::Number(a), Value::Number(b)) => Some(Value::Number(a.max(*b))),
        (Value::Text(a), Value::Text(b)) => {
            if b.starts_with(a.as_str()) {
                Some(Value::Text(b.clone()))
            } else {
                let mut combined = a.clone();
                combined.push_str(b);
                Some(Value::Text(combined))
            }
        },
        _ => None,
    }
}

/// Blend a new value into a contact's existing content under the given mode.
///
/// `old` is `None` when the contact has no content yet, in which case the
/// new value is always accepted regardless of mode.
#[must_use]
pub fn blend(old: Option<&Value>, new: &Value, mode: BlendMode) -> Value {
    let Some(old) = old else {
        return new.clone();
    };

    match mode {
        BlendMode::AcceptLast => new.clone(),
        BlendMode::Merge => merge_combine(old, new).unwrap_or_else(|| new.clone()),
    }
}
