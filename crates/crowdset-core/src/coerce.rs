//! Lenient `deserialize_with` helpers for archive fields.
//!
//! Database dumps encode booleans as `"t"`, numbers as strings, and missing
//! values as either `null` or `""`. These helpers fold all of that into
//! plain Rust types at the serde boundary.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Interpret a source flag: `true`, `"t"` and `"true"` are true; anything
/// else, including a missing value, is false.
pub fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
  Ok(match Option::<Value>::deserialize(d)? {
    Some(Value::Bool(b)) => b,
    Some(Value::String(s)) => is_true_str(&s),
    _ => false,
  })
}

/// The string spellings of `true` used by the source exports.
pub fn is_true_str(s: &str) -> bool { matches!(s, "t" | "true") }

/// An optional float given as a number or a numeric string. Empty and
/// non-numeric strings become `None`.
pub fn lenient_f64<'de, D: Deserializer<'de>>(
  d: D,
) -> Result<Option<f64>, D::Error> {
  Ok(match Option::<Value>::deserialize(d)? {
    Some(Value::Number(n)) => n.as_f64(),
    Some(Value::String(s)) => s.trim().parse().ok(),
    _ => None,
  })
}

/// An optional scalar kept in its textual form. Numbers are rendered with
/// their JSON spelling; empty strings become `None`.
pub fn lenient_text<'de, D: Deserializer<'de>>(
  d: D,
) -> Result<Option<String>, D::Error> {
  Ok(verbatim_text(d)?.filter(|s| !s.is_empty()))
}

/// Like [`lenient_text`], but an empty string stays `Some("")`. Only `null`
/// and non-scalar values become `None`.
pub fn verbatim_text<'de, D: Deserializer<'de>>(
  d: D,
) -> Result<Option<String>, D::Error> {
  Ok(match Option::<Value>::deserialize(d)? {
    Some(Value::String(s)) => Some(s),
    Some(Value::Number(n)) => Some(n.to_string()),
    Some(Value::Bool(b)) => Some(b.to_string()),
    _ => None,
  })
}

/// A text field where `null` reads as the empty string.
pub fn text_or_empty<'de, D: Deserializer<'de>>(
  d: D,
) -> Result<String, D::Error> {
  Ok(verbatim_text(d)?.unwrap_or_default())
}
