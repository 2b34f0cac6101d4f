//! Structured-output contracts.
//!
//! An [`OutputSchema`] is declared once and rendered for each backend
//! (JSON Schema for Ollama, the OpenAPI subset for Gemini). The same
//! declaration checks replies at the trust boundary before they are
//! deserialized.

use crate::error::SchemaError;
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};

/// Shape of one schema node.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaNode {
    String,
    Number,
    Array(Box<SchemaNode>),
    Object(Vec<Field>),
}

/// A named object property.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: &'static str,
    pub node: SchemaNode,
    pub required: bool,
}

impl Field {
    fn required(name: &'static str, node: SchemaNode) -> Self {
        Self {
            name,
            node,
            required: true,
        }
    }

    fn optional(name: &'static str, node: SchemaNode) -> Self {
        Self {
            name,
            node,
            required: false,
        }
    }
}

/// A versioned output contract.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSchema {
    pub name: &'static str,
    pub version: u32,
    pub root: SchemaNode,
}

impl OutputSchema {
    /// Contract for the corpus analysis (v1).
    pub fn analysis_result() -> Self {
        use SchemaNode::*;

        Self {
            name: "analysis_result",
            version: 1,
            root: Object(vec![
                Field::required(
                    "sentiment",
                    Object(vec![
                        Field::required("positive", Number),
                        Field::required("neutral", Number),
                        Field::required("negative", Number),
                    ]),
                ),
                Field::required(
                    "keyThemes",
                    Array(Box::new(Object(vec![
                        Field::required("theme", String),
                        Field::required("description", String),
                    ]))),
                ),
                Field::required("summary", String),
                Field::required(
                    "quotes",
                    Array(Box::new(Object(vec![
                        Field::required("theme", String),
                        Field::required("quotes", Array(Box::new(String))),
                    ]))),
                ),
            ]),
        }
    }

    /// Contract for suggested survey questions (v1).
    pub fn suggested_questions() -> Self {
        use SchemaNode::*;

        Self {
            name: "suggested_questions",
            version: 1,
            root: Array(Box::new(Object(vec![
                Field::required("id", String),
                Field::required("text", String),
                Field::required("type", String),
                Field::optional("options", Array(Box::new(String))),
            ]))),
        }
    }

    /// Render as standard JSON Schema.
    pub fn to_json_schema(&self) -> Value {
        render(&self.root, false)
    }

    /// Render as Gemini's `responseSchema` (upper-case type names).
    pub fn to_gemini_schema(&self) -> Value {
        render(&self.root, true)
    }

    /// Check a parsed value against the contract. Unknown fields are ignored.
    pub fn validate(&self, value: &Value) -> Result<(), SchemaError> {
        check(&self.root, value, "$")
    }

    /// Parse a backend reply, validate it, then deserialize it.
    pub fn parse<T: DeserializeOwned>(&self, text: &str) -> Result<T, SchemaError> {
        let payload = strip_code_fence(text);
        let value: Value =
            serde_json::from_str(payload).map_err(|e| SchemaError::InvalidJson(e.to_string()))?;
        self.validate(&value)?;
        serde_json::from_value(value).map_err(|e| SchemaError::InvalidJson(e.to_string()))
    }
}

fn render(node: &SchemaNode, upper: bool) -> Value {
    let type_name = |name: &str| {
        if upper {
            Value::String(name.to_uppercase())
        } else {
            Value::String(name.to_string())
        }
    };

    match node {
        SchemaNode::String => json!({ "type": type_name("string") }),
        SchemaNode::Number => json!({ "type": type_name("number") }),
        SchemaNode::Array(items) => json!({
            "type": type_name("array"),
            "items": render(items, upper),
        }),
        SchemaNode::Object(fields) => {
            let properties: Map<String, Value> = fields
                .iter()
                .map(|f| (f.name.to_string(), render(&f.node, upper)))
                .collect();
            let required: Vec<&str> = fields
                .iter()
                .filter(|f| f.required)
                .map(|f| f.name)
                .collect();
            json!({
                "type": type_name("object"),
                "properties": properties,
                "required": required,
            })
        }
    }
}

fn check(node: &SchemaNode, value: &Value, path: &str) -> Result<(), SchemaError> {
    match (node, value) {
        (SchemaNode::String, Value::String(_)) => Ok(()),
        (SchemaNode::Number, Value::Number(_)) => Ok(()),
        (SchemaNode::Array(items), Value::Array(values)) => {
            for (i, item) in values.iter().enumerate() {
                check(items, item, &format!("{}[{}]", path, i))?;
            }
            Ok(())
        }
        (SchemaNode::Object(fields), Value::Object(map)) => {
            for field in fields {
                let field_path = format!("{}.{}", path, field.name);
                match map.get(field.name) {
                    Some(Value::Null) | None if field.required => {
                        return Err(SchemaError::MissingField(field_path));
                    }
                    Some(Value::Null) | None => {}
                    Some(inner) => check(&field.node, inner, &field_path)?,
                }
            }
            Ok(())
        }
        (expected, found) => Err(SchemaError::WrongType {
            path: path.to_string(),
            expected: node_name(expected),
            found: value_name(found),
        }),
    }
}

fn node_name(node: &SchemaNode) -> &'static str {
    match node {
        SchemaNode::String => "a string",
        SchemaNode::Number => "a number",
        SchemaNode::Array(_) => "an array",
        SchemaNode::Object(_) => "an object",
    }
}

fn value_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Drop surrounding whitespace and an optional Markdown code fence.
///
/// The fence's language tag is dropped whether or not a newline follows it.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    let body = if rest.starts_with(|c: char| c.is_ascii_alphabetic()) {
        let tag_end = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '+')))
            .unwrap_or(rest.len());
        &rest[tag_end..]
    } else {
        rest
    };
    body.trim()
}
