use serde_json::Value;

use crate::error::GenerationError;

const FENCE: &str = "```";

/// Remove a markdown code fence wrapping the whole reply.
///
/// Only a fence at the very start of the trimmed text counts, optionally tagged
/// `json`; the closing fence is dropped when present. Fences further into the
/// text are left alone. Repeats until no leading fence remains, which makes the
/// function idempotent.
pub fn strip_code_fence(raw: &str) -> &str {
    let mut text = raw.trim();
    while let Some(rest) = text.strip_prefix(FENCE) {
        let rest = rest.strip_prefix("json").unwrap_or(rest);
        let rest = rest.strip_suffix(FENCE).unwrap_or(rest);
        text = rest.trim();
    }
    text
}

pub fn parse_model_json(raw: &str) -> Result<Value, GenerationError> {
    serde_json::from_str(strip_code_fence(raw)).map_err(GenerationError::MalformedJson)
}

/// Log-safe preview of model output.
pub fn preview(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((cut, _)) => format!("{}...[{} bytes total]", &s[..cut], s.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn strips_tagged_fence() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
    }

    #[test]
    fn strips_bare_fence_and_outer_whitespace() {
        assert_eq!(strip_code_fence("  \n```\n[1,2]\n```\n "), "[1,2]");
    }

    #[test]
    fn unterminated_fence_still_loses_its_opener() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}"), "{\"a\":1}");
    }

    #[test]
    fn fence_in_the_middle_is_kept() {
        let text = "Here you go: ```json {\"a\":1} ```";
        assert_eq!(strip_code_fence(text), text);
    }

    #[test]
    fn stripping_is_idempotent() {
        let samples = [
            "```json\n{\"a\":1}\n```",
            "```\n```json\n{}\n```\n```",
            "plain {\"a\": 1}",
            "   ``````   ",
            "```jsonjson```",
            "",
        ];
        for s in samples {
            let once = strip_code_fence(s);
            assert_eq!(strip_code_fence(once), once, "input {s:?}");
        }
    }

    #[test]
    fn parser_complaint_is_kept() {
        let err = parse_model_json("not json").unwrap_err();
        match &err {
            GenerationError::MalformedJson(inner) => {
                assert!(err.to_string().contains(&inner.to_string()));
                assert!(err.to_string().contains("expected"), "{err}");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn preview_respects_char_boundaries() {
        assert_eq!(preview("abc", 10), "abc");
        assert_eq!(preview("ধন্যবাদ", 2), format!("ধন...[{} bytes total]", "ধন্যবাদ".len()));
    }
}
