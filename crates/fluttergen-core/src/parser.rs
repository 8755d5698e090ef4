//! Response parsing
//!
//! The model is asked to answer with a short explanation, then the code
//! between two literal marker lines. This module splits a raw reply along
//! those markers and cleans up any markdown fence the model wrapped the
//! code in anyway.

use crate::state::GeneratedResult;

/// Marker line that opens the code section of a reply
pub const CODE_START: &str = "---CODE_START---";

/// Marker line that closes the code section of a reply
pub const CODE_END: &str = "---CODE_END---";

/// Explanation used when the reply does not follow the marker format
pub const FALLBACK_EXPLANATION: &str = "Generated Code:";

/// Language label shown next to generated code
pub const DEFAULT_LANGUAGE: &str = "dart";

const LANGUAGE_FENCE: &str = "```dart";
const FENCE: &str = "```";

/// Split a raw model reply into explanation and code.
///
/// Only the first occurrence of each marker is considered. When either
/// marker is missing, or the first end marker starts before the first start
/// marker has finished, the whole reply is returned untouched as code.
pub fn parse_response(text: &str) -> GeneratedResult {
    match marker_bounds(text) {
        Some((start, end)) => GeneratedResult {
            explanation: text[..start].trim().to_string(),
            code: strip_fences(&text[start + CODE_START.len()..end]),
        },
        None => GeneratedResult {
            explanation: FALLBACK_EXPLANATION.to_string(),
            code: text.to_string(),
        },
    }
}

/// Byte offsets of the first start marker and the first end marker, if both
/// exist and the end marker lies entirely after the start marker.
fn marker_bounds(text: &str) -> Option<(usize, usize)> {
    let start = text.find(CODE_START)?;
    let end = text.find(CODE_END)?;

    if end < start + CODE_START.len() {
        return None;
    }

    Some((start, end))
}

/// Remove at most one leading fence (language-tagged first, then generic)
/// and at most one trailing fence.
fn strip_fences(segment: &str) -> String {
    let code = segment.trim();
    let code = code.strip_prefix(LANGUAGE_FENCE).unwrap_or(code);
    let code = code.strip_prefix(FENCE).unwrap_or(code);
    let code = code.strip_suffix(FENCE).unwrap_or(code);
    code.trim().to_string()
}
