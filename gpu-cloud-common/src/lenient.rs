//! Forgiving field decoders for client-supplied request bodies.
//!
//! A field of the wrong JSON type reads as absent instead of failing the
//! whole body, so the caller's default applies.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::chat::ChatMessage;

pub(crate) fn string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

pub(crate) fn float<'de, D>(deserializer: D) -> Result<Option<f32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64().map(|f| f as f32),
        _ => None,
    })
}

/// Numbers are truncated toward zero and clamped into `u32`.
pub(crate) fn count<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_f64()
            .filter(|f| f.is_finite())
            .map(|f| f.trunc().clamp(0.0, u32::MAX as f64) as u32),
        _ => None,
    })
}

/// JSON truthiness: `false`, `null`, `0` and `""` are false.
pub(crate) fn truthy<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Some(match Value::deserialize(deserializer)? {
        Value::Null => false,
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }))
}

/// Anything but an array reads as no messages. Entries keep a string
/// `role` and `content`; other values drop to empty.
pub(crate) fn messages<'de, D>(deserializer: D) -> Result<Vec<ChatMessage>, D::Error>
where
    D: Deserializer<'de>,
{
    let Value::Array(items) = Value::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };

    Ok(items
        .into_iter()
        .map(|item| {
            let field = |name: &str| item.get(name).and_then(Value::as_str).map(str::to_string);
            ChatMessage {
                role: field("role").unwrap_or_default(),
                content: field("content"),
            }
        })
        .collect())
}
