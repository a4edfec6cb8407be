use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

pub mod client;

pub use client::HttpBackend;

const UNKNOWN_TOOL_NAME: &str = "unknown tool";
const EMPTY_TOOL_ARGUMENTS: &str = "{}";

#[derive(Serialize, Clone, Debug)]
pub struct SendMessageRequest {
    pub message: String,
    pub stream: bool,
}

#[derive(Serialize, Clone, Debug)]
pub struct QueryRequest {
    pub query: String,
}

#[derive(Serialize, Clone, Debug)]
pub struct ImportSessionsRequest {
    pub sessions: Value,
    pub merge: bool,
}

/// Body of `POST /api/mcp/connect`. An empty list asks the backend to
/// connect every configured server.
#[derive(Serialize, Clone, Debug)]
pub struct McpConnectRequest {
    pub servers: Vec<String>,
}

/// One decoded record from a streaming message response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Chunk {
        #[serde(default)]
        content: String,
    },
    ToolCall {
        tool_call: WireToolCall,
    },
    ToolCallComplete {
        #[serde(default)]
        result: Value,
    },
    Complete {
        #[serde(default)]
        content: String,
    },
    Error {
        #[serde(default)]
        error: Option<String>,
        #[serde(default)]
        message: Option<String>,
    },
    #[serde(other)]
    Unknown,
}

impl StreamEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            StreamEvent::Chunk { .. } => "chunk",
            StreamEvent::ToolCall { .. } => "tool_call",
            StreamEvent::ToolCallComplete { .. } => "tool_call_complete",
            StreamEvent::Complete { .. } => "complete",
            StreamEvent::Error { .. } => "error",
            StreamEvent::Unknown => "unknown",
        }
    }

    /// Decode one frame that is already known to be valid JSON.
    ///
    /// Shapes the typed enum does not accept are not dropped: an `error`
    /// record with a structured payload still reports its failure, and any
    /// other mismatch is treated as an unrecognized event.
    pub fn from_value(value: Value) -> StreamEvent {
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .map(str::to_string);
        match serde_json::from_value::<StreamEvent>(value.clone()) {
            Ok(event) => event,
            Err(_) if kind.as_deref() == Some("error") => StreamEvent::Error {
                error: loose_error_text(&value),
                message: None,
            },
            Err(err) => {
                debug!(
                    kind = kind.as_deref().unwrap_or("<none>"),
                    "Unexpected event shape: {err}"
                );
                StreamEvent::Unknown
            }
        }
    }

    /// Text of an `error` event, whichever field the backend used.
    pub fn error_text(&self) -> Option<String> {
        match self {
            StreamEvent::Error { error, message } => Some(
                error
                    .as_deref()
                    .or(message.as_deref())
                    .map(str::trim)
                    .filter(|text| !text.is_empty())
                    .unwrap_or("unknown backend error")
                    .to_string(),
            ),
            _ => None,
        }
    }
}

/// Error text from an `error` record whose fields are not plain strings.
fn loose_error_text(value: &Value) -> Option<String> {
    let error = value.get("error").filter(|error| !error.is_null());
    let as_text = |field: Option<&Value>| {
        field
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string)
    };

    as_text(error)
        .or_else(|| as_text(value.get("message")))
        .or_else(|| as_text(error.and_then(|error| error.get("message"))))
        .or_else(|| error.map(Value::to_string))
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WireToolCall {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub function: Option<WireToolFunction>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WireToolFunction {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arguments: Option<Value>,
}

impl WireToolCall {
    pub fn id_text(&self) -> String {
        match &self.id {
            Some(Value::String(id)) => id.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        }
    }

    pub fn name(&self) -> String {
        self.function
            .as_ref()
            .and_then(|function| function.name.as_deref())
            .filter(|name| !name.is_empty())
            .unwrap_or(UNKNOWN_TOOL_NAME)
            .to_string()
    }

    /// Arguments as raw JSON text. Backends usually send a string already;
    /// structured arguments are re-serialized.
    pub fn arguments_text(&self) -> String {
        match self
            .function
            .as_ref()
            .and_then(|function| function.arguments.as_ref())
        {
            Some(Value::String(arguments)) => arguments.clone(),
            Some(Value::Null) | None => EMPTY_TOOL_ARGUMENTS.to_string(),
            Some(other) => other.to_string(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_activity: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct SessionsResponse {
    #[serde(default)]
    pub sessions: Vec<SessionSummary>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct McpStatus {
    #[serde(default)]
    pub connected: bool,
    #[serde(default)]
    pub tool_count: Option<usize>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}
