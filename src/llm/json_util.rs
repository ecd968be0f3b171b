//! Tolerant JSON recovery for model outputs.
//!
//! Model responses are treated as untrusted text: they may be clean JSON, a
//! JSON object buried in prose, or a fenced code block. Recovery tries the
//! strict interpretation first and degrades to scanning; callers always get
//! a tagged result with `Empty` as the safe floor, never an error.

use serde_json::{Map, Value};

/// Outcome of attempting to read a JSON object out of raw model text.
#[derive(Debug)]
pub enum JsonRecovery {
    /// The entire (trimmed) text parsed as a JSON object.
    Strict(Map<String, Value>),
    /// An object was recovered from inside surrounding text or a code fence.
    Embedded(Map<String, Value>),
    /// Nothing object-shaped could be recovered.
    Empty,
}

impl JsonRecovery {
    /// The recovered object, if any.
    #[must_use]
    pub fn into_object(self) -> Option<Map<String, Value>> {
        match self {
            Self::Strict(obj) | Self::Embedded(obj) => Some(obj),
            Self::Empty => None,
        }
    }
}

/// Recover a JSON object from `text`.
#[must_use]
pub fn recover_object(text: &str) -> JsonRecovery {
    let trimmed = text.trim();

    if let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(trimmed) {
        return JsonRecovery::Strict(obj);
    }

    // Permissive pass: parse every balanced {...} span until one is valid.
    for candidate in balanced_object_spans(trimmed) {
        if let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(candidate) {
            return JsonRecovery::Embedded(obj);
        }
    }

    // Last resort: strip a markdown code fence and retry the strict parse.
    if let Some(inner) = strip_code_fence(trimmed)
        && let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(inner)
    {
        return JsonRecovery::Embedded(obj);
    }

    JsonRecovery::Empty
}

/// Coerce a JSON value to display text. Arrays join with ", "; scalars print
/// plainly; null and objects become empty (objects are not valid snippet
/// payloads and are dropped rather than serialized).
#[must_use]
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(items) => items
            .iter()
            .map(value_to_text)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        Value::Null | Value::Object(_) => String::new(),
    }
}

/// Yield each balanced top-level `{...}` span in `text`, in order. String
/// literals and escapes are honored so braces inside values do not break
/// the balance count.
fn balanced_object_spans(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut spans = Vec::new();
    let mut start = None;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' if depth > 0 => in_string = true,
            b'{' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            b'}' if depth > 0 => {
                depth -= 1;
                if depth == 0
                    && let Some(s) = start.take()
                {
                    spans.push(&text[s..=i]);
                }
            }
            _ => {}
        }
    }
    spans
}

/// Strip a leading/trailing markdown code fence (with optional language tag).
fn strip_code_fence(text: &str) -> Option<&str> {
    let rest = text.strip_prefix("```")?;
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.strip_prefix('\n').unwrap_or(rest);
    let inner = rest.strip_suffix("```").or_else(|| {
        rest.rfind("```").map(|idx| &rest[..idx])
    })?;
    Some(inner.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_object_passes() {
        let r = recover_object(r#"{"faq": "Q: Pets? A: Yes."}"#);
        assert!(matches!(r, JsonRecovery::Strict(_)));
    }

    #[test]
    fn object_inside_prose_is_recovered() {
        let r = recover_object(r#"Here is the data you asked for: {"amenities": "pool"} hope it helps"#);
        let obj = r.into_object().expect("object");
        assert_eq!(obj["amenities"], "pool");
    }

    #[test]
    fn fenced_object_is_recovered() {
        let r = recover_object("```json\n{\"policies\": \"No smoking.\"}\n```");
        let obj = r.into_object().expect("object");
        assert_eq!(obj["policies"], "No smoking.");
    }

    #[test]
    fn braces_inside_strings_do_not_break_balance() {
        let r = recover_object(r#"note {"other": "uses { and } freely"} done"#);
        let obj = r.into_object().expect("object");
        assert_eq!(obj["other"], "uses { and } freely");
    }

    #[test]
    fn garbage_is_empty() {
        assert!(matches!(recover_object("not json at all"), JsonRecovery::Empty));
        assert!(matches!(recover_object("{broken"), JsonRecovery::Empty));
        assert!(matches!(recover_object(""), JsonRecovery::Empty));
    }

    #[test]
    fn first_valid_object_wins() {
        let r = recover_object(r#"{bad} {"contacts": "555-0100"}"#);
        let obj = r.into_object().expect("object");
        assert_eq!(obj["contacts"], "555-0100");
    }

    #[test]
    fn value_coercion() {
        assert_eq!(value_to_text(&serde_json::json!("  spa  ")), "spa");
        assert_eq!(value_to_text(&serde_json::json!(35)), "35");
        assert_eq!(
            value_to_text(&serde_json::json!(["pool", "gym", ""])),
            "pool, gym"
        );
        assert_eq!(value_to_text(&serde_json::json!(null)), "");
        assert_eq!(value_to_text(&serde_json::json!({"k": "v"})), "");
    }
}
