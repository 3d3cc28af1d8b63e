//! Lenient decode for LLM answers that should be a single JSON object.
//!
//! This is bounded string surgery for the truncation patterns seen from
//! chat models, not a general JSON repair tool. Stages run in order, each
//! only when the previous one failed:
//!
//! 1. strip markdown fences and slice from the first `{` to the last `}`
//! 2. strict parse
//! 3. pad truncated coordinates, drop a dangling comma, close open
//!    strings/arrays/objects, parse again
//! 4. cut the document before `"restaurants"` and close it with an empty
//!    restaurants array, parse again
//! 5. give up with an excerpt of the repaired text

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::Value;
use thiserror::Error;

/// Characters of the malformed text kept in the error for diagnostics.
const EXCERPT_CHARS: usize = 500;
const COORDINATE_DECIMALS: usize = 6;

static FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```(?:json)?\s*").expect("static regex"));

static SHORT_COORDINATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""(latitude|longitude)"\s*:\s*(-?\d+)\.(\d{1,5})(\s*(?:[,\]}]|$))"#)
        .expect("static regex")
});

static RESTAURANTS_ARRAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""restaurants"\s*:\s*\["#).expect("static regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryStage {
    /// Parsed as-is after fence stripping.
    Strict,
    /// Parsed after coordinate padding and bracket balancing.
    Repaired,
    /// Only parsed after discarding the restaurants array.
    RestaurantsDropped,
}

#[derive(Debug)]
pub struct Recovered {
    pub value: Value,
    pub stage: RecoveryStage,
}

#[derive(Debug, Error)]
#[error(
    "Failed to parse AI response. The response may be incomplete. Error: {cause}. Response preview: {excerpt}"
)]
pub struct RecoveryError {
    pub cause: String,
    /// Tail of the repaired text, where truncation damage usually sits.
    pub excerpt: String,
}

/// Runs the recovery stages over `raw` and returns the first successful parse.
pub fn recover_json(raw: &str) -> Result<Recovered, RecoveryError> {
    let candidate = extract_object(raw);

    if let Ok(value) = serde_json::from_str::<Value>(&candidate) {
        return Ok(Recovered {
            value,
            stage: RecoveryStage::Strict,
        });
    }

    let padded = pad_coordinates(&candidate);
    let repaired = balance_brackets(&padded);
    let second_error = match serde_json::from_str::<Value>(&repaired) {
        Ok(value) => {
            return Ok(Recovered {
                value,
                stage: RecoveryStage::Repaired,
            })
        }
        Err(e) => e,
    };

    if let Some(truncated) = drop_restaurants(&padded) {
        if let Ok(mut value) = serde_json::from_str::<Value>(&truncated) {
            if let Some(obj) = value.as_object_mut() {
                obj.insert("restaurants".to_string(), Value::Array(Vec::new()));
            }
            return Ok(Recovered {
                value,
                stage: RecoveryStage::RestaurantsDropped,
            });
        }
    }

    Err(RecoveryError {
        cause: second_error.to_string(),
        excerpt: tail(&repaired, EXCERPT_CHARS).to_string(),
    })
}

/// Removes code fences and keeps the outermost `{ ... }` span, if any.
pub fn extract_object(raw: &str) -> String {
    let unfenced = FENCE.replace_all(raw.trim(), "");
    let text = unfenced.trim();

    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => text[start..=end].to_string(),
        _ => text.to_string(),
    }
}

/// Pads `"latitude"` / `"longitude"` values with 1–5 decimals to six
/// decimals: `"latitude": 34.7` becomes `"latitude": 34.700000`.
pub fn pad_coordinates(text: &str) -> String {
    SHORT_COORDINATE
        .replace_all(text, |caps: &Captures| {
            let frac = &caps[3];
            format!(
                "\"{}\": {}.{}{}{}",
                &caps[1],
                &caps[2],
                frac,
                "0".repeat(COORDINATE_DECIMALS - frac.len()),
                &caps[4]
            )
        })
        .into_owned()
}

/// Appends the closers a truncated document is missing, innermost first.
/// Brackets inside string literals are ignored; an unterminated string is
/// closed before anything else, and a trailing comma is dropped.
pub fn balance_brackets(text: &str) -> String {
    let mut open: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for c in text.chars() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => open.push('}'),
            '[' => open.push(']'),
            '}' | ']' => {
                if open.last() == Some(&c) {
                    open.pop();
                }
            }
            _ => {}
        }
    }

    let mut repaired = text.trim_end().to_string();
    if in_string {
        if escaped {
            repaired.pop();
        }
        repaired.push('"');
    }
    if repaired.ends_with(',') {
        repaired.pop();
    }
    repaired.extend(open.iter().rev());
    repaired
}

/// Cuts the document just before the `"restaurants"` key and closes it
/// with an empty restaurants array.
fn drop_restaurants(text: &str) -> Option<String> {
    let found = RESTAURANTS_ARRAY.find(text)?;
    let before = &text[..found.start()];
    Some(format!("{before}\"restaurants\": []}}"))
}

/// Last `max_chars` characters of `text`, respecting char boundaries.
fn tail(text: &str, max_chars: usize) -> &str {
    let count = text.chars().count();
    if count <= max_chars {
        return text;
    }
    let skip = count - max_chars;
    let start = text
        .char_indices()
        .nth(skip)
        .map(|(i, _)| i)
        .unwrap_or(0);
    &text[start..]
}
