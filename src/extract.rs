//! Pulls structured data out of fenced ```` ```json ```` blocks in an answer.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::observability::EXTRACT_MALFORMED;

static JSON_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```json(.*?)```").expect("fence pattern is a valid regex")
});

/// Parse every fenced JSON block in `text`, in order of appearance.
///
/// A top-level array contributes its elements; any other non-null value
/// contributes itself.  Blocks that fail to parse are logged and skipped.
pub fn extract(text: &str) -> Vec<Value> {
    let mut payloads = Vec::new();
    for captures in JSON_FENCE.captures_iter(text) {
        let body = &captures[1];
        match serde_json::from_str::<Value>(body) {
            Ok(Value::Array(elements)) => payloads.extend(elements),
            Ok(Value::Null) => {}
            Ok(value) => payloads.push(value),
            Err(err) => {
                EXTRACT_MALFORMED.click();
                tracing::warn!(error = %err, block = body.trim(), "could not decode fenced json block");
            }
        }
    }
    payloads
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn single_block() {
        let text = "Here you go:\n```json\n[{\"a\":1}]\n```\nDone.";
        assert_eq!(extract(text), vec![json!({"a": 1})]);
    }

    #[test]
    fn malformed_block_yields_nothing() {
        let text = "```json\n[{\"a\":1,]\n```";
        assert!(extract(text).is_empty());
    }

    #[test]
    fn every_block_is_extracted() {
        let text = concat!(
            "first\n```json\n[1, 2]\n```\n",
            "broken\n```json\n{nope\n```\n",
            "second\n```json\n{\"b\": true}\n```\n",
        );
        assert_eq!(extract(text), vec![json!(1), json!(2), json!({"b": true})]);
    }

    #[test]
    fn other_fences_are_ignored() {
        let text = "```rust\nfn main() {}\n```\n```JSON\n[1]\n```";
        assert!(extract(text).is_empty());
    }

    #[test]
    fn unterminated_fence_is_ignored() {
        assert!(extract("```json\n[1, 2]").is_empty());
    }

    #[test]
    fn no_fences() {
        assert!(extract("plain answer").is_empty());
        assert!(extract("").is_empty());
    }

    #[test]
    fn empty_array_and_null_contribute_nothing() {
        assert!(extract("```json\n[]\n``` ```json\nnull\n```").is_empty());
    }
}
