//! `${a.b.c}` template interpolation.
//!
//! Placeholders are resolved by dotted-path lookup against a fixed JSON
//! context built from the triggering event. Unresolved placeholders are
//! left verbatim, never treated as failures. Rendering applies
//! recursively to strings, arrays, and object payloads. This is a plain
//! path lookup, not an expression evaluator.

use serde_json::Value;

/// Render every string inside a JSON value.
pub fn render_value(value: &Value, ctx: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(render_str(s, ctx)),
        Value::Array(items) => Value::Array(items.iter().map(|v| render_value(v, ctx)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), render_value(v, ctx)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Render one string, replacing each `${path}` whose path resolves.
pub fn render_str(input: &str, ctx: &Value) -> String {
    let mut output = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        output.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let path = &after[..end];
                match lookup(ctx, path) {
                    Some(resolved) => output.push_str(&resolved),
                    None => {
                        // Unresolved placeholders stay verbatim.
                        output.push_str(&rest[start..start + 2 + end + 1]);
                    }
                }
                rest = &after[end + 1..];
            }
            None => {
                // Unterminated placeholder, emit as-is.
                output.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    output.push_str(rest);
    output
}

fn lookup(ctx: &Value, path: &str) -> Option<String> {
    let mut current = ctx;
    for segment in path.split('.') {
        current = current.get(segment)?;
    }
    match current {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some(String::new()),
        // Composite values are not inlined into strings.
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> Value {
        json!({
            "alert": {
                "name": "HighLatency",
                "labels": { "service": "api", "zone": "us-east" },
                "severity": "warning"
            },
            "metric": { "value": 95.5 }
        })
    }

    #[test]
    fn test_simple_substitution() {
        assert_eq!(
            render_str("restart ${alert.labels.service} now", &ctx()),
            "restart api now"
        );
    }

    #[test]
    fn test_numeric_substitution() {
        assert_eq!(render_str("observed=${metric.value}", &ctx()), "observed=95.5");
    }

    #[test]
    fn test_unresolved_placeholder_left_verbatim() {
        assert_eq!(
            render_str("${alert.labels.region} stays", &ctx()),
            "${alert.labels.region} stays"
        );
    }

    #[test]
    fn test_unterminated_placeholder_left_verbatim() {
        assert_eq!(render_str("broken ${alert.name", &ctx()), "broken ${alert.name");
    }

    #[test]
    fn test_recursive_render_over_payload() {
        let payload = json!({
            "text": "alert ${alert.name} on ${alert.labels.service}",
            "tags": ["${alert.severity}", "${alert.labels.missing}"],
            "nested": { "zone": "${alert.labels.zone}" },
            "count": 3
        });
        let rendered = render_value(&payload, &ctx());
        assert_eq!(rendered["text"], "alert HighLatency on api");
        assert_eq!(rendered["tags"][0], "warning");
        assert_eq!(rendered["tags"][1], "${alert.labels.missing}");
        assert_eq!(rendered["nested"]["zone"], "us-east");
        assert_eq!(rendered["count"], 3);
    }
}
