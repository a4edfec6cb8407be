use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    pub fn is_user(self) -> bool {
        self == Role::User
    }

    pub fn is_assistant(self) -> bool {
        self == Role::Assistant
    }
}

impl AsRef<str> for Role {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl TryFrom<&str> for Role {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            _ => Err(format!("invalid message role: {value}")),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from(value.as_str())
    }
}

impl From<Role> for String {
    fn from(value: Role) -> Self {
        value.as_str().to_string()
    }
}

/// Lifecycle of a tool invocation reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolCallStatus {
    Calling,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub id: String,
    pub name: String,
    /// Raw JSON text exactly as the backend sent it.
    #[serde(alias = "args")]
    pub arguments: String,
    pub status: ToolCallStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

impl ToolCallRecord {
    pub fn calling(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
            status: ToolCallStatus::Calling,
            result: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == ToolCallStatus::Completed
    }

    /// Consume a `calling` record and produce its completed form.
    pub fn complete(self, result: Value) -> Self {
        Self {
            status: ToolCallStatus::Completed,
            result: Some(result),
            ..self
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub role: Role,
    #[serde(default)]
    pub content: String,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call: Option<ToolCallRecord>,
    #[serde(default)]
    pub is_tool_message: bool,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
            tool_call: None,
            is_tool_message: false,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Transcript entry for a finished tool invocation. Content stays empty;
    /// the record carries everything worth showing.
    pub fn tool_result(record: ToolCallRecord) -> Self {
        Self {
            role: Role::Assistant,
            content: String::new(),
            timestamp: Utc::now(),
            tool_call: Some(record),
            is_tool_message: true,
        }
    }

    pub fn is_user(&self) -> bool {
        self.role.is_user()
    }

    pub fn is_assistant(&self) -> bool {
        self.role.is_assistant()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tool_result_messages_have_empty_content() {
        let record = ToolCallRecord::calling("1", "search", "{}").complete(json!({"hits": 3}));
        let message = Message::tool_result(record);
        assert!(message.is_tool_message);
        assert!(message.content.is_empty());
        assert_eq!(message.role, Role::Assistant);
        assert!(message.tool_call.as_ref().is_some_and(|call| call.is_completed()));
    }

    #[test]
    fn invalid_role_strings_are_rejected() {
        assert!(Role::try_from("system").is_err());
    }

    #[test]
    fn messages_deserialize_from_backend_shape() {
        let raw = json!({
            "role": "assistant",
            "content": "",
            "timestamp": "2024-05-01T10:00:00Z",
            "isToolMessage": true,
            "toolCall": {
                "id": "call-1",
                "name": "search",
                "args": "{\"q\":\"rust\"}",
                "status": "completed",
                "result": {"ok": true}
            }
        });
        let message: Message = serde_json::from_value(raw).expect("message");
        let call = message.tool_call.expect("tool call");
        assert_eq!(call.arguments, "{\"q\":\"rust\"}");
        assert_eq!(call.status, ToolCallStatus::Completed);
        assert!(message.is_tool_message);
    }

    #[test]
    fn plain_messages_default_tool_fields() {
        let raw = json!({"role": "user", "content": "hi", "timestamp": "2024-05-01T10:00:00Z"});
        let message: Message = serde_json::from_value(raw).expect("message");
        assert!(message.tool_call.is_none());
        assert!(!message.is_tool_message);
        assert!(message.is_user());
    }
}
