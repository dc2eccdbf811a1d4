use crate::workflow::operation::{FieldType, Schema};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

static VARIABLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*([A-Za-z0-9_]+)\s*\}\}").expect("valid variable regex"));

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("Missing required variable '{0}'")]
    MissingVariable(String),
}

/// Replace every `{{name}}` in `template` with the matching variable
///
/// Strings are inserted as-is, other values as compact JSON. Missing variables
/// are an error when the schema marks them required, `{}` when the schema types
/// them as objects and empty otherwise.
pub fn render(template: &str, vars: &Map<String, Value>, schema: &Schema) -> Result<String, RenderError> {
    let mut rendered = String::with_capacity(template.len());
    let mut last = 0;

    for captures in VARIABLE.captures_iter(template) {
        let (Some(whole), Some(name)) = (captures.get(0), captures.get(1)) else {
            continue;
        };

        rendered.push_str(&template[last..whole.start()]);
        rendered.push_str(&substitute(name.as_str(), vars, schema)?);
        last = whole.end();
    }

    rendered.push_str(&template[last..]);

    Ok(rendered)
}

fn substitute(name: &str, vars: &Map<String, Value>, schema: &Schema) -> Result<String, RenderError> {
    match vars.get(name) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(value) if !value.is_null() => Ok(value.to_string()),
        _ => match schema.get(name) {
            Some(field) if field.required => Err(RenderError::MissingVariable(name.to_string())),
            Some(field) if field.field_type == FieldType::Object => Ok("{}".to_string()),
            _ => Ok(String::new()),
        },
    }
}

/// Variables a step runs with: the instance variables overlaid with the step config
///
/// String config values are rendered against the instance variables first and
/// only override when they render to something non-empty.
pub fn step_variables(instance: &Map<String, Value>, config: &Map<String, Value>) -> Map<String, Value> {
    let lenient = Schema::new();
    let mut vars = instance.clone();

    for (key, value) in config {
        match value {
            Value::String(template) => {
                let rendered = render(template, instance, &lenient).unwrap_or_default();
                if !rendered.is_empty() {
                    vars.insert(key.clone(), Value::String(rendered));
                }
            }
            other => {
                vars.insert(key.clone(), other.clone());
            }
        }
    }

    vars
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::operation::FieldSchema;
    use serde_json::json;

    fn vars(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    fn schema() -> Schema {
        let mut schema = Schema::new();
        schema.insert(
            "indexName".into(),
            FieldSchema {
                field_type: FieldType::String,
                required: true,
                description: None,
            },
        );
        schema.insert(
            "settings".into(),
            FieldSchema {
                field_type: FieldType::Object,
                required: false,
                description: None,
            },
        );
        schema
    }

    #[test]
    fn strings_raw_and_values_as_json() {
        let vars = vars(json!({
            "indexName": "logs-2024",
            "settings": {"number_of_replicas": 1}
        }));

        let rendered = render("/{{indexName}} {{ settings }}", &vars, &schema()).unwrap();

        assert_eq!(rendered, "/logs-2024 {\"number_of_replicas\":1}");
    }

    #[test]
    fn missing_variables_follow_schema() {
        let empty = Map::new();

        assert_eq!(
            render("/{{indexName}}", &empty, &schema()),
            Err(RenderError::MissingVariable("indexName".into()))
        );
        assert_eq!(render("{{settings}}", &empty, &schema()).unwrap(), "{}");
        assert_eq!(render("[{{other}}]", &empty, &schema()).unwrap(), "[]");
    }

    #[test]
    fn step_config_overlays_instance_variables() {
        let instance = vars(json!({ "sourceIndex": "users-v1", "targetIndex": "users-v2" }));
        let config = vars(json!({
            "indexName": "{{targetIndex}}",
            "alias": "{{alias}}",
            "channels": ["ch-1"]
        }));

        let merged = step_variables(&instance, &config);

        assert_eq!(merged["indexName"], "users-v2");
        assert_eq!(merged["sourceIndex"], "users-v1");
        assert_eq!(merged["channels"], json!(["ch-1"]));
        assert!(!merged.contains_key("alias"));
    }
}
