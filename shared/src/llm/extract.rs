//! Best-effort extraction of a JSON object from free-form model output.
//!
//! Markdown fences are stripped, then everything between the first `{` and
//! the last `}` is parsed. This is a heuristic, not a parser: prose before or
//! after the object is tolerated, but a stray `}` after the object (or an
//! unbalanced brace inside a string value) widens the span and the parse
//! fails with [`InvocationFailure::InvalidJson`].

use serde_json::{Map, Value};

use super::failure::InvocationFailure;

/// Remove Markdown code-fence markers (with or without a `json` tag).
pub fn strip_fences(raw: &str) -> String {
    raw.replace("```json", "").replace("```", "").trim().to_string()
}

/// Locate and parse the JSON object embedded in `raw`.
pub fn extract_json(raw: &str) -> Result<Map<String, Value>, InvocationFailure> {
    let cleaned = strip_fences(raw);

    let span = match (cleaned.find('{'), cleaned.rfind('}')) {
        (Some(start), Some(end)) if end > start => &cleaned[start..=end],
        _ => return Err(InvocationFailure::parse_not_found(&cleaned)),
    };

    serde_json::from_str::<Map<String, Value>>(span).map_err(|e| InvocationFailure::InvalidJson {
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_object() {
        let obj = extract_json(r#"{"paraphrase":"hi"}"#).unwrap();
        assert_eq!(obj["paraphrase"], json!("hi"));
    }

    #[test]
    fn test_fenced_object_with_prose() {
        let raw = "Sure! Here you go:\n```json\n{\"tags\":[\"Transparency\"],\"n\":{\"a\":1}}\n```\nHope that helps.";
        let obj = extract_json(raw).unwrap();
        assert_eq!(obj["tags"], json!(["Transparency"]));
        assert_eq!(obj["n"], json!({"a": 1}));
    }

    #[test]
    fn test_untagged_fence() {
        let obj = extract_json("```\n{\"summary\":[]}\n```").unwrap();
        assert_eq!(obj["summary"], json!([]));
    }

    #[test]
    fn test_no_object_is_parse_not_found() {
        let raw = "```json\nI cannot help with that.\n```";
        match extract_json(raw) {
            Err(InvocationFailure::ParseNotFound { raw }) => {
                assert_eq!(raw, "I cannot help with that.");
            }
            other => panic!("expected ParseNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_not_found_diagnostic_is_truncated_prefix() {
        let raw = "a".repeat(450) + "b";
        match extract_json(&raw) {
            Err(InvocationFailure::ParseNotFound { raw: diag }) => {
                assert_eq!(diag.len(), 400);
                assert!(raw.starts_with(&diag));
            }
            other => panic!("expected ParseNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_reversed_braces_is_parse_not_found() {
        assert!(matches!(
            extract_json("} nothing {"),
            Err(InvocationFailure::ParseNotFound { .. })
        ));
    }

    #[test]
    fn test_json_shaped_but_invalid_is_distinct_failure() {
        let failure = extract_json("{\"paraphrase\": \"unterminated}").unwrap_err();
        assert!(matches!(failure, InvocationFailure::InvalidJson { .. }));
        assert!(!failure.is_retryable());
    }

    #[test]
    fn test_trailing_brace_in_prose_widens_span() {
        // Known limitation of the first/last brace search.
        let failure = extract_json("{\"a\":1} and then }").unwrap_err();
        assert!(matches!(failure, InvocationFailure::InvalidJson { .. }));
    }
}
