//! Structured action replies and the JSON schema that constrains them.
//!
//! The LLM must answer with exactly one of four actions. The schema builder
//! derives the `result` object from the agent's declared output schema so
//! the transport can enforce shape server-side.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value as Json};

/// The four actions an LLM reply may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    EvalAndContinue,
    EvalAndComplete,
    Return,
    Done,
}

/// A validated reply. `code` is required by the schema for every action; the
/// prompt instructs the model to send an empty string when unused.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionReply {
    pub action: ActionKind,
    pub code: String,
    pub result: Json,
}

impl ActionReply {
    /// Parse and shape-check a raw reply object. Violations are reported as
    /// a human-readable detail string the executor feeds back to the LLM.
    pub fn parse(raw: &Json) -> Result<ActionReply, String> {
        let reply: ActionReply =
            serde_json::from_value(raw.clone()).map_err(|e| e.to_string())?;
        match reply.action {
            ActionKind::EvalAndContinue | ActionKind::EvalAndComplete
                if reply.code.trim().is_empty() =>
            {
                Err(format!(
                    "action {} requires a non-empty code field",
                    match reply.action {
                        ActionKind::EvalAndContinue => "eval_and_continue",
                        _ => "eval_and_complete",
                    }
                ))
            }
            _ => Ok(reply),
        }
    }
}

/// Field types an agent may declare in its output schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    String,
    Float,
    Integer,
    Boolean,
    List(Box<FieldType>),
    /// Unknown declared types map to `string` in the JSON schema.
    Custom(String),
}

/// One declared output field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputField {
    pub name: String,
    pub ty: FieldType,
    pub required: bool,
}

impl OutputField {
    pub fn required(name: impl Into<String>, ty: FieldType) -> Self {
        Self { name: name.into(), ty, required: true }
    }

    pub fn optional(name: impl Into<String>, ty: FieldType) -> Self {
        Self { name: name.into(), ty, required: false }
    }
}

/// Ordered output schema for the `result` object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSchema {
    pub fields: Vec<OutputField>,
}

impl Default for OutputSchema {
    /// The single-field default: `{"result": <string>}`.
    fn default() -> Self {
        Self {
            fields: vec![OutputField::required("result", FieldType::String)],
        }
    }
}

impl OutputSchema {
    pub fn new(fields: Vec<OutputField>) -> Self {
        Self { fields }
    }

    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

/// Build the strict reply schema handed to the LLM transport.
pub fn action_schema(output: &OutputSchema) -> Json {
    json!({
        "type": "object",
        "properties": {
            "action": {
                "enum": ["eval_and_continue", "eval_and_complete", "return", "done"]
            },
            "code": { "type": "string" },
            "result": result_schema(output),
        },
        "required": ["action", "code", "result"],
        "additionalProperties": false,
    })
}

fn result_schema(output: &OutputSchema) -> Json {
    let mut properties = serde_json::Map::new();
    let mut required = Vec::new();
    for field in &output.fields {
        properties.insert(field.name.clone(), field_schema(&field.ty));
        if field.required {
            required.push(Json::String(field.name.clone()));
        }
    }
    json!({
        "type": "object",
        "properties": Json::Object(properties),
        "required": Json::Array(required),
        "additionalProperties": false,
    })
}

fn field_schema(ty: &FieldType) -> Json {
    match ty {
        FieldType::String | FieldType::Custom(_) => json!({ "type": "string" }),
        FieldType::Float => json!({ "type": "number" }),
        FieldType::Integer => json!({ "type": "integer" }),
        FieldType::Boolean => json!({ "type": "boolean" }),
        FieldType::List(inner) => json!({ "type": "array", "items": field_schema(inner) }),
    }
}

/// A placeholder object conforming to the output schema, used in the prompt
/// when the schema deviates from the single-field default.
pub fn example_result(output: &OutputSchema) -> Json {
    let mut obj = serde_json::Map::new();
    for field in &output.fields {
        obj.insert(field.name.clone(), example_value(&field.ty));
    }
    Json::Object(obj)
}

fn example_value(ty: &FieldType) -> Json {
    match ty {
        FieldType::String | FieldType::Custom(_) => json!("..."),
        FieldType::Float => json!(0.0),
        FieldType::Integer => json!(0),
        FieldType::Boolean => json!(false),
        FieldType::List(inner) => Json::Array(vec![example_value(inner)]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_reply() {
        let raw = json!({"action": "eval_and_complete", "code": "1 + 2", "result": "value"});
        let reply = ActionReply::parse(&raw).unwrap();
        assert_eq!(reply.action, ActionKind::EvalAndComplete);
        assert_eq!(reply.code, "1 + 2");
    }

    #[test]
    fn test_parse_rejects_empty_code_for_eval_actions() {
        let raw = json!({"action": "eval_and_continue", "code": "", "result": "value"});
        let err = ActionReply::parse(&raw).unwrap_err();
        assert!(err.contains("non-empty code"));
    }

    #[test]
    fn test_parse_allows_empty_code_for_return_and_done() {
        for action in ["return", "done"] {
            let raw = json!({"action": action, "code": "", "result": {"result": "ok"}});
            assert!(ActionReply::parse(&raw).is_ok(), "{action} should accept empty code");
        }
    }

    #[test]
    fn test_parse_rejects_unknown_action() {
        let raw = json!({"action": "explode", "code": "", "result": ""});
        assert!(ActionReply::parse(&raw).is_err());
    }

    #[test]
    fn test_schema_shape() {
        let schema = action_schema(&OutputSchema::default());
        assert_eq!(
            schema["properties"]["action"]["enum"],
            json!(["eval_and_continue", "eval_and_complete", "return", "done"])
        );
        assert_eq!(schema["required"], json!(["action", "code", "result"]));
        assert_eq!(schema["additionalProperties"], json!(false));
        assert_eq!(
            schema["properties"]["result"]["properties"]["result"],
            json!({"type": "string"})
        );
    }

    #[test]
    fn test_field_type_mapping() {
        let output = OutputSchema::new(vec![
            OutputField::required("score", FieldType::Float),
            OutputField::required("count", FieldType::Integer),
            OutputField::optional("tags", FieldType::List(Box::new(FieldType::String))),
            OutputField::required("blob", FieldType::Custom("uuid".into())),
        ]);
        let schema = action_schema(&output);
        let props = &schema["properties"]["result"]["properties"];
        assert_eq!(props["score"], json!({"type": "number"}));
        assert_eq!(props["count"], json!({"type": "integer"}));
        assert_eq!(props["tags"]["type"], json!("array"));
        assert_eq!(props["tags"]["items"], json!({"type": "string"}));
        // Unknown declared types degrade to string.
        assert_eq!(props["blob"], json!({"type": "string"}));
        assert_eq!(
            schema["properties"]["result"]["required"],
            json!(["score", "count", "blob"])
        );
    }

    #[test]
    fn test_example_result_conforms() {
        let output = OutputSchema::new(vec![
            OutputField::required("answer", FieldType::String),
            OutputField::required("confidence", FieldType::Float),
        ]);
        let example = example_result(&output);
        assert!(example["answer"].is_string());
        assert!(example["confidence"].is_number());
    }
}
