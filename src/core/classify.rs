//! Classification of decoded stream frames.
//!
//! The backend multiplexes several incompatible payload shapes over one frame
//! stream: search-result metadata, plain content deltas, chat-completion style
//! choice deltas, reasoning-channel fragments, and a handful of end-of-stream
//! spellings. `classify` maps each frame payload to exactly one [`Payload`]
//! variant. The match order is a deliberate tie-break, since a single payload
//! can satisfy more than one shape; earlier rules win.
//!
//! Classification never fails: malformed input becomes
//! [`Payload::Unrecognized`], which callers drop without interrupting the
//! stream.

use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::Value;
use tracing::debug;

use crate::api::SearchResult;

static DROPPED_FRAMES: AtomicU64 = AtomicU64::new(0);

/// Number of frames classified as [`Payload::Unrecognized`] since startup.
/// Diagnostics only; dropping stays silent on the control-flow path.
pub fn dropped_frame_count() -> u64 {
    DROPPED_FRAMES.load(Ordering::Relaxed)
}

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    SearchResults {
        items: Vec<SearchResult>,
        question_type: Option<String>,
    },
    ContentDelta(String),
    ChoiceDelta(String),
    ReasoningDelta(String),
    GenericDelta(String),
    EndOfStream,
    Unrecognized,
}

/// Canonical end-of-stream predicate. The backend has emitted several textual
/// spellings over time; all of them funnel through here.
pub fn is_end_of_stream(data: &str) -> bool {
    let data = data.trim();
    data.contains("[DONE]") || data.contains("\"done\": true") || data.contains("\"done\":true")
}

/// Replace bare JSON `null`/`NULL` value tokens with `""` so they do not
/// corrupt parsing. Tokens inside string literals are left intact; they are
/// the Sanitizer's problem, not ours.
fn mask_bare_nulls(data: &str) -> String {
    let bytes = data.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(data.len() + 8);
    let mut in_string = false;
    let mut escaped = false;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if in_string {
            out.push(b);
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            i += 1;
            continue;
        }
        if b == b'"' {
            in_string = true;
            out.push(b);
            i += 1;
            continue;
        }
        if bytes[i..].len() >= 4 && bytes[i..i + 4].eq_ignore_ascii_case(b"null") {
            let before_ok = i == 0 || !(bytes[i - 1].is_ascii_alphanumeric() || bytes[i - 1] == b'_');
            let after_ok = i + 4 >= bytes.len()
                || !(bytes[i + 4].is_ascii_alphanumeric() || bytes[i + 4] == b'_');
            if before_ok && after_ok {
                out.extend_from_slice(b"\"\"");
                i += 4;
                continue;
            }
        }
        out.push(b);
        i += 1;
    }
    // The input was a &str and we only copied its bytes or inserted ASCII.
    String::from_utf8(out).unwrap_or_else(|_| data.to_string())
}

fn truthy(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => !s.is_empty() && s != "false",
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        _ => false,
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn lookup_path<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut current = value;
    for key in path {
        current = current.get(key)?;
    }
    Some(current)
}

// Known provider shapes, tried in order. This replaces an unbounded recursive
// field search whose visit order over unordered objects was non-deterministic.
const GENERIC_CONTENT_PATHS: &[&[&str]] = &[
    &["text"],
    &["message", "content"],
    &["delta", "content"],
    &["data", "content"],
    &["response"],
];

const GENERIC_SEARCH_MAX_DEPTH: usize = 4;

/// Depth-first scan for any string field whose key names content. serde_json
/// maps iterate in sorted key order, so the scan is deterministic.
fn find_content_like(value: &Value, depth: usize) -> Option<String> {
    let object = value.as_object()?;
    for (key, child) in object {
        if let Value::String(s) = child {
            if key.to_lowercase().contains("content") {
                return Some(s.clone());
            }
        }
    }
    if depth == 0 {
        return None;
    }
    for child in object.values() {
        if child.is_object() {
            if let Some(found) = find_content_like(child, depth - 1) {
                return Some(found);
            }
        }
    }
    None
}

fn parse_search_results(items: &[Value]) -> Vec<SearchResult> {
    items
        .iter()
        .map(|item| SearchResult {
            title: item
                .get("title")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            url: item
                .get("url")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            snippet: item
                .get("snippet")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        })
        .collect()
}

fn unrecognized(data: &str, reason: &str) -> Payload {
    DROPPED_FRAMES.fetch_add(1, Ordering::Relaxed);
    debug!("dropping frame ({reason}): {data}");
    Payload::Unrecognized
}

/// Classify one decoded frame payload. First match wins.
pub fn classify(data: &str) -> Payload {
    if is_end_of_stream(data) {
        return Payload::EndOfStream;
    }

    let mut clean = mask_bare_nulls(data);
    // Some backends double-wrap frames; peel one redundant marker.
    if let Some(rest) = clean.strip_prefix("data:") {
        clean = rest.trim_start().to_string();
    }

    let value: Value = match serde_json::from_str(&clean) {
        Ok(value) => value,
        Err(err) => return unrecognized(data, &format!("not JSON: {err}")),
    };

    let Some(object) = value.as_object() else {
        return unrecognized(data, "not a JSON object");
    };

    if let Some(results) = object.get("search_results").and_then(Value::as_array) {
        return Payload::SearchResults {
            items: parse_search_results(results),
            question_type: object
                .get("question_type")
                .and_then(Value::as_str)
                .map(str::to_string),
        };
    }

    let reasoning = truthy(object.get("is_reasoning"));

    if !reasoning {
        if let Some(content) = object.get("content") {
            if let Some(text) = scalar_text(content) {
                return Payload::ContentDelta(text);
            }
        }
    }

    if let Some(text) = object
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .and_then(|choice| lookup_path(choice, &["delta", "content"]))
        .and_then(Value::as_str)
    {
        return Payload::ChoiceDelta(text.to_string());
    }

    if reasoning {
        return match object.get("content") {
            Some(Value::Null) | None => unrecognized(data, "reasoning frame without content"),
            Some(content) => match scalar_text(content) {
                Some(text) if text.trim() == "null" => {
                    unrecognized(data, "reasoning frame with sentinel content")
                }
                Some(text) => Payload::ReasoningDelta(text),
                None => unrecognized(data, "reasoning frame with non-scalar content"),
            },
        };
    }

    for path in GENERIC_CONTENT_PATHS {
        if let Some(text) = lookup_path(&value, path).and_then(scalar_text) {
            return Payload::GenericDelta(text);
        }
    }
    if let Some(text) = find_content_like(&value, GENERIC_SEARCH_MAX_DEPTH) {
        return Payload::GenericDelta(text);
    }

    unrecognized(data, "no recognized shape")
}
