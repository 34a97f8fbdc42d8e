//! Recovery of JSON objects from free-text model replies.
//!
//! Models asked to "return only JSON" frequently wrap the object in a markdown
//! code fence. The functions here strip at most one leading fence line and one
//! trailing fence marker, then hand the remainder to a strict JSON parser.

use serde_json::{Map, Value};

use crate::GatewayError;

/// Code fence marker.
const FENCE: &str = "```";

/// Removes one optional leading fence line and one optional trailing fence marker.
///
/// The leading fence line may carry an info string (```` ```json ````); it is
/// dropped up to and including its newline. Surrounding whitespace is trimmed
/// before and after stripping.
pub fn strip_code_fence(raw: &str) -> &str {
    let mut body = raw.trim();

    if body.starts_with(FENCE) {
        if let Some(newline) = body.find('\n') {
            body = &body[newline + 1..];
        }
    }

    if let Some(rest) = body.strip_suffix(FENCE) {
        body = rest;
    }

    body.trim()
}

/// Parses a model reply into a JSON object.
///
/// Domain keys are not checked here; callers decide which keys they require.
///
/// # Errors
/// Returns `GatewayError::MalformedPayload` if the stripped text is not valid
/// JSON or is valid JSON but not an object.
pub fn parse_json_object(raw: &str) -> Result<Map<String, Value>, GatewayError> {
    let body = strip_code_fence(raw);

    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(object)) => Ok(object),
        Ok(other) => Err(GatewayError::MalformedPayload(format!(
            "expected a JSON object, got {}",
            json_kind(&other)
        ))),
        Err(e) => Err(GatewayError::MalformedPayload(format!("invalid JSON in model reply: {e}"))),
    }
}

/// JSON truthiness: `false`, `null`, zero, and empty strings/arrays/objects are false.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_fenced_object() {
        let object = parse_json_object("```\n{\"match\": true}\n```").unwrap();
        assert_eq!(Value::Object(object), json!({"match": true}));
    }

    #[test]
    fn test_parse_bare_object() {
        let object = parse_json_object("{\"match\": false}").unwrap();
        assert_eq!(Value::Object(object), json!({"match": false}));
    }

    #[test]
    fn test_parse_fence_with_info_string() {
        let raw = "```json\n{\n  \"image_prompt\": \"A red apple\"\n}\n```\n";
        let object = parse_json_object(raw).unwrap();
        assert_eq!(object["image_prompt"], json!("A red apple"));
    }

    #[test]
    fn test_parse_tolerates_surrounding_whitespace() {
        let object = parse_json_object("  \n```\n{\"a\": 1}\n```  \n").unwrap();
        assert_eq!(object["a"], json!(1));
    }

    #[test]
    fn test_only_trailing_fence() {
        let object = parse_json_object("{\"a\": 1}\n```").unwrap();
        assert_eq!(object["a"], json!(1));
    }

    #[test]
    fn test_fence_with_prose_is_rejected() {
        let raw = "Here you go:\n```json\n{\"a\": 1}\n```";
        let err = parse_json_object(raw).unwrap_err();
        assert!(matches!(err, GatewayError::MalformedPayload(_)));
    }

    #[test]
    fn test_non_object_is_rejected() {
        let err = parse_json_object("[1, 2, 3]").unwrap_err();
        match err {
            GatewayError::MalformedPayload(msg) => assert!(msg.contains("an array")),
            other => panic!("Expected MalformedPayload, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_reply_is_rejected() {
        assert!(parse_json_object("").is_err());
        assert!(parse_json_object("```\n```").is_err());
    }

    #[test]
    fn test_strip_code_fence_leaves_plain_text() {
        assert_eq!(strip_code_fence("  {\"a\": 1} "), "{\"a\": 1}");
    }

    #[test]
    fn test_truthiness() {
        assert!(is_truthy(&json!(true)));
        assert!(!is_truthy(&json!(false)));
        assert!(!is_truthy(&Value::Null));
        assert!(!is_truthy(&json!(0)));
        assert!(is_truthy(&json!(2.5)));
        assert!(!is_truthy(&json!("")));
        assert!(is_truthy(&json!("false")));
        assert!(!is_truthy(&json!([])));
        assert!(is_truthy(&json!({"k": 1})));
    }
}
