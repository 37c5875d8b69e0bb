use serde_json::Value;

/// Convert a field value to a short single-line representation.
pub fn value_to_short_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => if *b { "yes".into() } else { "no".into() },
        Value::Array(arr) => arr
            .iter()
            .map(value_to_short_string)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(obj) => {
            // Labels are stored as {key, value} pairs.
            if let (Some(k), Some(v)) = (obj.get("key").and_then(Value::as_str), obj.get("value")) {
                return format!("{}={}", k, value_to_short_string(v));
            }
            let mut parts = Vec::new();
            for (key, val) in obj {
                parts.push(format!("{}: {}", key, value_to_short_string(val)));
            }
            parts.join(", ")
        }
        Value::Null => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_labels_render_as_pairs() {
        let labels = json!([{"key": "a", "value": "1"}, {"key": "b", "value": ""}]);
        assert_eq!(value_to_short_string(&labels), "a=1, b=");
        assert_eq!(value_to_short_string(&json!(false)), "no");
    }
}
