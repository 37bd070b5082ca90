use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

// Greedy and leftmost: first opening brace/bracket to the last matching closer.
// Nested or repeated spans in malformed output can produce an unparsable match.
static JSON_SPAN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)(\{.*\}|\[.*\])").expect("valid JSON span regex"));

/// Best-effort JSON extraction from free-form model output.
///
/// Tries the whole text first, then the first brace- or bracket-delimited
/// span. Never fails: anything unrecoverable is `None`.
pub fn extract_json(text: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return Some(value);
    }

    let span = JSON_SPAN_RE.captures(text)?.get(1)?.as_str();
    match serde_json::from_str::<Value>(span) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::debug!(error = %err, "model output span is not valid JSON");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_clean_json() {
        let text = r#"{"deals":[{"title":"TV"}],"notes":""}"#;
        assert_eq!(
            extract_json(text),
            Some(json!({"deals": [{"title": "TV"}], "notes": ""}))
        );
    }

    #[test]
    fn extracts_object_from_fenced_block() {
        let text = "```json\n{\"deals\": []}\n```";
        assert_eq!(extract_json(text), Some(json!({"deals": []})));
    }

    #[test]
    fn extracts_object_surrounded_by_prose() {
        let text = "Ecco le offerte:\n{\"deals\":[{\"title\":\"Frigo\",\"price\":299}]}\nBuono shopping!";
        let value = extract_json(text).unwrap();
        assert_eq!(value["deals"][0]["title"], json!("Frigo"));
        assert_eq!(value["deals"][0]["price"], json!(299));
    }

    #[test]
    fn extracts_array_when_it_comes_first() {
        let text = "risultati: [1, 2, 3] fine";
        assert_eq!(extract_json(text), Some(json!([1, 2, 3])));
    }

    #[test]
    fn multiple_objects_are_not_recovered() {
        // Greedy span covers both objects, which is not valid JSON.
        let text = "primo {\"a\":1} secondo {\"b\":2}";
        assert_eq!(extract_json(text), None);
    }

    #[test]
    fn malformed_output_yields_none() {
        assert_eq!(extract_json("nessuna offerta trovata"), None);
        assert_eq!(extract_json("{\"deals\": [ {\"title\": }"), None);
        assert_eq!(extract_json(""), None);
    }
}
