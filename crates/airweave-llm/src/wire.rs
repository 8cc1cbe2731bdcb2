//! OpenAI-compatible wire format, adapted from `ai-client::openai::types`.
//! Kept private — callers only ever see [`crate::message::Message`] and
//! plain JSON.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::message::{Message, MessageRole};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum WireRole {
    System,
    User,
    Assistant,
}

impl From<MessageRole> for WireRole {
    fn from(role: MessageRole) -> Self {
        match role {
            MessageRole::System => WireRole::System,
            MessageRole::User => WireRole::User,
            MessageRole::Assistant => WireRole::Assistant,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct WireMessage {
    pub role: WireRole,
    pub content: String,
}

impl From<&Message> for WireMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role.into(),
            content: message.content.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ChatRequest {
    pub model: String,
    pub messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ResponseFormat {
    #[serde(rename = "type")]
    pub format_type: &'static str,
    pub json_schema: JsonSchemaFormat,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct JsonSchemaFormat {
    pub name: &'static str,
    pub strict: bool,
    pub schema: Value,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponse {
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Choice {
    pub message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_role_maps_to_lowercase_wire_role() {
        let wire = WireMessage::from(&Message::system("be terse"));
        let json = serde_json::to_value(&wire).unwrap();
        assert_eq!(json["role"], "system");
        assert_eq!(json["content"], "be terse");
    }

    #[test]
    fn chat_request_omits_absent_optional_fields() {
        let request = ChatRequest {
            model: "gpt".into(),
            messages: vec![WireMessage::from(&Message::user("hi"))],
            temperature: None,
            max_tokens: None,
            response_format: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("temperature").is_none());
        assert!(json.get("max_tokens").is_none());
        assert!(json.get("response_format").is_none());
    }

    #[test]
    fn response_with_no_choices_deserializes_to_empty_vec() {
        let response: ChatResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(response.choices.is_empty());
    }
}
