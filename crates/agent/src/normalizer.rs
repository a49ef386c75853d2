//! Tool-call normalization.
//!
//! Models report tool calls in several shapes:
//!
//! - `tool_calls` at the top level of the reply, or under `message`
//! - a single call object instead of a list
//! - the name under `function.name` or directly under `name`
//! - arguments as an object or as a JSON-encoded string
//! - no structured field at all, with the call written into the text as a
//!   fenced ```` ```json ```` block, sometimes with single-quoted keys
//!
//! Everything funnels into one constructor producing [`ToolCall`]. Input
//! shape is treated permissively; a call without a `name` is never accepted.

use serde_json::{Map, Value};
use sitewright_core::tool::ToolCall;

const FENCE_OPEN: &str = "```json";
const FENCE_CLOSE: &str = "```";

/// Where a turn's calls came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallSource {
    Structured,
    Embedded,
}

/// One model turn, normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTurn {
    /// The assistant's free text, possibly empty
    pub content: String,
    /// Calls in the order the model listed them
    pub calls: Vec<ToolCall>,
    /// `None` when the turn requested nothing
    pub source: Option<CallSource>,
}

impl NormalizedTurn {
    pub fn found(&self) -> bool {
        !self.calls.is_empty()
    }
}

/// Normalize one raw reply. Structured calls win; embedded calls are only
/// looked for when there are none.
pub fn normalize(raw: &Value) -> NormalizedTurn {
    let content = assistant_content(raw);

    let structured = structured_calls(raw);
    if !structured.is_empty() {
        return NormalizedTurn {
            content,
            calls: structured,
            source: Some(CallSource::Structured),
        };
    }

    let embedded = embedded_calls(&content);
    let source = (!embedded.is_empty()).then_some(CallSource::Embedded);
    NormalizedTurn {
        content,
        calls: embedded,
        source,
    }
}

/// The assistant text, from `message.content` or a top-level `content`.
pub fn assistant_content(raw: &Value) -> String {
    raw.get("message")
        .and_then(|m| m.get("content"))
        .and_then(Value::as_str)
        .or_else(|| raw.get("content").and_then(Value::as_str))
        .unwrap_or_default()
        .to_string()
}

/// Calls from an explicit `tool_calls` field, top-level first.
pub fn structured_calls(raw: &Value) -> Vec<ToolCall> {
    let field = [raw.get("tool_calls"), raw.get("message").and_then(|m| m.get("tool_calls"))]
        .into_iter()
        .flatten()
        .find(|v| is_present(v));

    let entries: Vec<&Value> = match field {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(single @ Value::Object(_)) => vec![single],
        _ => Vec::new(),
    };

    entries.into_iter().filter_map(call_from_value).collect()
}

/// Calls written into the text as fenced JSON blocks.
///
/// Each fragment after a ```` ```json ```` marker runs to the next fence or
/// to the end of the text. Fragments that don't mention a `name` key, don't
/// decode (even after turning single quotes into double quotes), aren't an
/// object, or lack a top-level `name` are skipped.
pub fn embedded_calls(text: &str) -> Vec<ToolCall> {
    text.split(FENCE_OPEN)
        .skip(1)
        .filter_map(|fragment| {
            let body = fragment
                .split_once(FENCE_CLOSE)
                .map_or(fragment, |(inside, _)| inside)
                .trim();
            if body.is_empty() || !mentions_name_key(body) {
                return None;
            }
            let parsed = decode_lenient(body)?;
            if !parsed.get("name").is_some_and(Value::is_string) {
                return None;
            }
            call_from_value(&parsed)
        })
        .collect()
}

/// Build one call from any accepted shape; `None` without a usable name.
fn call_from_value(value: &Value) -> Option<ToolCall> {
    let obj = value.as_object()?;
    let function = obj.get("function").and_then(Value::as_object);

    let name = function
        .and_then(|f| f.get("name"))
        .and_then(Value::as_str)
        .or_else(|| obj.get("name").and_then(Value::as_str))
        .map(str::trim)
        .filter(|n| !n.is_empty())?
        .to_string();

    let raw_args = match function {
        Some(f) => f.get("arguments"),
        None => obj.get("arguments"),
    };

    let id = obj
        .get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .unwrap_or_else(synthesize_call_id);

    Some(ToolCall {
        id,
        name,
        arguments: Value::Object(parse_arguments(raw_args)),
    })
}

/// Arguments as a map; anything that isn't (or doesn't decode to) an
/// object becomes `{}`.
fn parse_arguments(raw: Option<&Value>) -> Map<String, Value> {
    match raw {
        Some(Value::Object(map)) => map.clone(),
        Some(Value::String(s)) => match serde_json::from_str::<Value>(s) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        },
        _ => Map::new(),
    }
}

fn decode_lenient(body: &str) -> Option<Value> {
    serde_json::from_str(body)
        .or_else(|_| serde_json::from_str(&body.replace('\'', "\"")))
        .ok()
}

fn mentions_name_key(body: &str) -> bool {
    body.contains("\"name\"") || body.contains("'name'")
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        _ => true,
    }
}

pub fn synthesize_call_id() -> String {
    format!("call_{}", uuid::Uuid::new_v4().simple())
}
