use std::sync::OnceLock;

use regex::Regex;

use ideaflow_core::error::ParseError;

/// Pull a single JSON object out of arbitrary LLM output.
///
/// Models wrap JSON in prose, code fences, or cut it off mid-object.
/// Attempts, in order:
/// 1. the content of the first ```json fence pair,
/// 2. the span from the first `{` to the last `}` (greedy: favors one
///    large object over many small ones, which matches the one-object-
///    per-stage contract),
/// 3. the whole trimmed text,
/// each with a bracket-balancing retry for truncated objects. Returns
/// `ParseError::Unparseable` if nothing parses; never panics.
pub fn extract(text: &str) -> Result<serde_json::Value, ParseError> {
    let trimmed = text.trim();
    let candidate = strip_json_fence(trimmed);

    if let Some(span) = json_span(candidate) {
        if let Some(value) = parse_candidate(span) {
            return Ok(value);
        }
    }

    parse_candidate(candidate).ok_or(ParseError::Unparseable)
}

/// Parse a candidate substring, retrying with balanced brackets if the
/// object looks truncated.
fn parse_candidate(text: &str) -> Option<serde_json::Value> {
    let text = text.trim();
    if let Ok(value) = serde_json::from_str(text) {
        return Some(value);
    }
    if text.starts_with('{') || text.starts_with('[') {
        let balanced = balance_brackets(text);
        if balanced != text {
            return serde_json::from_str(&balanced).ok();
        }
    }
    None
}

/// The first `{` through the last `}` of the text, if any.
fn json_span(text: &str) -> Option<&str> {
    static SPAN: OnceLock<Regex> = OnceLock::new();
    SPAN.get_or_init(|| Regex::new(r"(?s)\{.*\}").unwrap())
        .find(text)
        .map(|m| m.as_str())
}

/// Take the content of the first ```json fence pair, if present.
fn strip_json_fence(text: &str) -> &str {
    if let Some(start) = text.find("```json") {
        let after = &text[start + 7..];
        if let Some(end) = after.find("```") {
            return after[..end].trim();
        }
        // Unterminated fence: everything after the marker.
        return after.trim();
    }
    text
}

/// Append missing closing brackets/braces to a truncated JSON candidate.
/// Brackets inside strings don't count.
fn balance_brackets(text: &str) -> String {
    let mut brace_depth: i32 = 0;
    let mut bracket_depth: i32 = 0;
    let mut in_string = false;
    let mut escape_next = false;

    for ch in text.chars() {
        if escape_next {
            escape_next = false;
            continue;
        }
        if ch == '\\' && in_string {
            escape_next = true;
            continue;
        }
        if ch == '"' {
            in_string = !in_string;
            continue;
        }
        if in_string {
            continue;
        }
        match ch {
            '{' => brace_depth += 1,
            '}' => brace_depth -= 1,
            '[' => bracket_depth += 1,
            ']' => bracket_depth -= 1,
            _ => {}
        }
    }

    let mut result = text.to_string();
    for _ in 0..bracket_depth {
        result.push(']');
    }
    for _ in 0..brace_depth {
        result.push('}');
    }
    result
}
