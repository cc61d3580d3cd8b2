//! Two-stage parsing of structured model output.
//!
//! Stage one is a strict JSON parse of the whole completion. Stage two is a
//! bounded best-effort extraction: a fenced code block, or failing that the
//! first balanced `[...]` / `{...}` span that parses. Each stage reports a typed result so
//! callers can see which path produced the value, or why both failed.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

/// Maximum number of bytes scanned when looking for a balanced span.
pub const MAX_SCAN_BYTES: usize = 64 * 1024;

/// Where an extracted value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionSource {
    /// A ```json (or bare ```) fenced block.
    FencedBlock,
    /// The first balanced array or object in the text that parses.
    BalancedSpan,
}

/// Successful parse of a completion.
#[derive(Debug, Clone, PartialEq)]
pub enum Parsed {
    Strict(Value),
    Extracted {
        value: Value,
        source: ExtractionSource,
    },
}

impl Parsed {
    pub fn value(&self) -> &Value {
        match self {
            Parsed::Strict(value) | Parsed::Extracted { value, .. } => value,
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            Parsed::Strict(value) | Parsed::Extracted { value, .. } => value,
        }
    }
}

/// Why stage two produced nothing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractionError {
    #[error("no JSON array or object found")]
    NoCandidate,

    #[error("no balanced span within the first {0} bytes")]
    Unbalanced(usize),

    #[error("extracted span is not valid JSON: {0}")]
    Invalid(String),
}

/// Both stages failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("completion is not JSON ({strict}); extraction failed: {extraction}")]
pub struct ParseError {
    pub strict: String,
    pub extraction: ExtractionError,
}

/// Stage one: the whole (trimmed) completion must be JSON.
pub fn parse_strict(text: &str) -> Result<Value, serde_json::Error> {
    serde_json::from_str(text.trim())
}

fn fence_regex() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        Regex::new(r"(?s)```(?:json|JSON)?[ \t]*\r?\n?(.*?)```").expect("fence pattern is valid")
    })
}

/// Upper bound on candidate openers tried during the balanced-span scan.
pub const MAX_CANDIDATES: usize = 64;

/// The balanced span opened at `start`, string and escape aware. `None` when
/// a closer does not match or the span runs past the scanned prefix.
fn balanced_from<'a>(text: &'a str, bytes: &[u8], start: usize) -> Option<&'a str> {
    let mut stack: Vec<u8> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &b) in bytes[start..].iter().enumerate() {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'[' => stack.push(b']'),
            b'{' => stack.push(b'}'),
            b']' | b'}' => {
                if stack.pop() != Some(b) {
                    return None;
                }
                if stack.is_empty() {
                    // Brackets are ASCII so both ends are char boundaries.
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// The first balanced `[...]` / `{...}` span that is valid JSON.
///
/// A candidate that does not balance or does not parse moves the scan to the
/// next opener. The error describes the last candidate tried.
fn first_valid_span(text: &str) -> Result<Value, ExtractionError> {
    let limit = text.len().min(MAX_SCAN_BYTES);
    let bytes = &text.as_bytes()[..limit];

    let mut last = ExtractionError::NoCandidate;
    let mut from = 0;
    for _ in 0..MAX_CANDIDATES {
        let Some(pos) = bytes[from..].iter().position(|&b| b == b'[' || b == b'{') else {
            break;
        };
        let start = from + pos;
        match balanced_from(text, bytes, start) {
            Some(span) => match serde_json::from_str::<Value>(span) {
                Ok(value) => return Ok(value),
                Err(e) => last = ExtractionError::Invalid(e.to_string()),
            },
            None => last = ExtractionError::Unbalanced(limit),
        }
        from = start + 1;
    }
    Err(last)
}

/// The body of the first non-empty fenced code block, if any.
fn fenced_block(text: &str) -> Option<&str> {
    fence_regex()
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|body| body.as_str().trim())
        .find(|body| !body.is_empty())
}

/// Run both stages. A fenced block that does not parse falls through to
/// the balanced-span scan.
pub fn parse_structured(text: &str) -> Result<Parsed, ParseError> {
    let strict = match parse_strict(text) {
        Ok(value) => return Ok(Parsed::Strict(value)),
        Err(e) => e.to_string(),
    };

    let mut extraction = ExtractionError::NoCandidate;

    if let Some(body) = fenced_block(text) {
        match serde_json::from_str::<Value>(body) {
            Ok(value) => {
                return Ok(Parsed::Extracted {
                    value,
                    source: ExtractionSource::FencedBlock,
                })
            }
            Err(e) => extraction = ExtractionError::Invalid(e.to_string()),
        }
    }

    match first_valid_span(text) {
        Ok(value) => {
            return Ok(Parsed::Extracted {
                value,
                source: ExtractionSource::BalancedSpan,
            })
        }
        Err(e) if extraction == ExtractionError::NoCandidate => extraction = e,
        Err(_) => {}
    }

    Err(ParseError { strict, extraction })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strict_json_is_taken_as_is() {
        let parsed = parse_structured(r#"  [{"name": "a"}]  "#).unwrap();
        assert_eq!(parsed, Parsed::Strict(json!([{"name": "a"}])));
    }

    #[test]
    fn fenced_block_is_extracted() {
        let text = "Here is your plan:\n```json\n[{\"name\": \"Walk\"}]\n```\nEnjoy!";
        let parsed = parse_structured(text).unwrap();
        assert_eq!(
            parsed,
            Parsed::Extracted {
                value: json!([{"name": "Walk"}]),
                source: ExtractionSource::FencedBlock,
            }
        );
    }

    #[test]
    fn balanced_span_ignores_brackets_inside_strings() {
        let text = r#"Sure! [{"name": "tidy [desk]", "description": "a \"}\" b"}] Done."#;
        let parsed = parse_structured(text).unwrap();
        match parsed {
            Parsed::Extracted { value, source } => {
                assert_eq!(source, ExtractionSource::BalancedSpan);
                assert_eq!(value[0]["name"], "tidy [desk]");
            }
            other => panic!("expected extraction, got {:?}", other),
        }
    }

    #[test]
    fn object_span_is_found() {
        let text = "result: {\"tasks\": []} (end)";
        let value = parse_structured(text).unwrap().into_value();
        assert_eq!(value, json!({"tasks": []}));
    }

    #[test]
    fn plain_prose_reports_both_failures() {
        let err = parse_structured("I cannot help with that.").unwrap_err();
        assert_eq!(err.extraction, ExtractionError::NoCandidate);
        assert!(!err.strict.is_empty());
    }

    #[test]
    fn truncated_output_is_unbalanced() {
        let err = parse_structured("[\"a\", \"b\",").unwrap_err();
        assert!(matches!(err.extraction, ExtractionError::Unbalanced(_)));
    }

    #[test]
    fn mismatched_closer_is_unbalanced() {
        let err = parse_structured("text [1, 2} more").unwrap_err();
        assert!(matches!(err.extraction, ExtractionError::Unbalanced(_)));
    }

    #[test]
    fn scan_is_bounded() {
        let mut text = "x".repeat(MAX_SCAN_BYTES);
        text.push_str("[1]");
        let err = parse_structured(&text).unwrap_err();
        assert_eq!(err.extraction, ExtractionError::NoCandidate);
    }

    #[test]
    fn unparseable_fence_falls_back_to_span() {
        let text = "```python\nprint('hi')\n```\nTasks: [{\"name\": \"Run\"}]";
        let parsed = parse_structured(text).unwrap();
        assert!(matches!(
            parsed,
            Parsed::Extracted {
                source: ExtractionSource::BalancedSpan,
                ..
            }
        ));
    }

    #[test]
    fn invalid_span_reports_json_error() {
        let err = parse_structured("see [name: a]").unwrap_err();
        assert!(matches!(err.extraction, ExtractionError::Invalid(_)));
    }

    #[test]
    fn bracketed_prose_before_the_payload_is_skipped() {
        let text = "Here is the plan for [your day]:\n[{\"name\": \"Write blog\"}]";
        let parsed = parse_structured(text).unwrap();
        assert_eq!(
            parsed,
            Parsed::Extracted {
                value: json!([{"name": "Write blog"}]),
                source: ExtractionSource::BalancedSpan,
            }
        );
    }

    #[test]
    fn mismatched_opener_moves_to_the_next_candidate() {
        let text = "Note: see item 1) [a} then {\"tasks\": []}";
        let value = parse_structured(text).unwrap().into_value();
        assert_eq!(value, json!({"tasks": []}));
    }

    #[test]
    fn candidate_count_is_bounded() {
        let mut text = "[x ".repeat(MAX_CANDIDATES);
        text.push_str("[1]");
        let err = parse_structured(&text).unwrap_err();
        assert!(matches!(err.extraction, ExtractionError::Unbalanced(_)));
    }
}
