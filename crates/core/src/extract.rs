//! Best-effort recovery of a JSON array embedded in free-form text.
//!
//! Tool output frequently wraps a JSON array in prose, truncates it, or
//! appends trailing text that itself contains brackets. A greedy
//! "first `[` to last `]`" match breaks on all of those, so the array end is
//! located with a string-aware bracket-depth scan instead.

use serde_json::Value;
use thiserror::Error;

/// Reasons an array could not be recovered from a text blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("no '[' found in text")]
    NoArrayFound,
    #[error("array is truncated or malformed")]
    IncompleteArray,
}

/// Recover the first JSON array contained in `text`.
///
/// The whole text is tried first; if that is not an array, the first `[` is
/// located and the scan stops at the bracket that closes it. Brackets and
/// quotes inside string literals (including `\"` and `\\` escapes) do not
/// affect depth tracking.
pub fn extract_json_array(text: &str) -> Result<Value, ExtractError> {
    if let Ok(value @ Value::Array(_)) = serde_json::from_str::<Value>(text) {
        return Ok(value);
    }

    let start = text.find('[').ok_or(ExtractError::NoArrayFound)?;
    let end = find_array_end(&text[start..]).ok_or(ExtractError::IncompleteArray)?;
    let candidate = &text[start..start + end + 1];

    match serde_json::from_str::<Value>(candidate) {
        Ok(value @ Value::Array(_)) => Ok(value),
        _ => Err(ExtractError::IncompleteArray),
    }
}

/// Byte index of the `]` that balances the `[` at index 0, if any.
fn find_array_end(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    // All structural characters are ASCII, so byte indices are char boundaries.
    for (idx, byte) in text.bytes().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match byte {
            b'\\' if in_string => escaped = true,
            b'"' => in_string = !in_string,
            b'[' if !in_string => depth += 1,
            b']' if !in_string => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}
