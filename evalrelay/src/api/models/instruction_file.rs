use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// Current instruction file content, as stored on the remote service
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct InstructionFileContent {
    pub content: String,
}

/// Request to overwrite the instruction file
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct InstructionFileUpdate {
    /// New content. Missing and falsy values (`null`, `false`, `0`, `""`) are rejected.
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub content: Option<Value>,
}

impl InstructionFileUpdate {
    /// The text to upload, if there is any. Non-string values are uploaded as their text form.
    pub fn into_content(self) -> Option<String> {
        match self.content? {
            Value::Null | Value::Bool(false) => None,
            Value::String(content) if content.is_empty() => None,
            Value::String(content) => Some(content),
            Value::Number(n) if n.as_f64() == Some(0.0) => None,
            other => Some(other.to_string()),
        }
    }
}
