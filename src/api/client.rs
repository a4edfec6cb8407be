use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::api::{
    ImportSessionsRequest, McpConnectRequest, McpStatus, QueryRequest, SendMessageRequest,
    SessionSummary, SessionsResponse,
};
use crate::core::backend::{ChatBackend, ChunkStream};
use crate::core::error::ExchangeError;
use crate::core::message::Message;
use crate::core::session::Session;
use crate::utils::url::{construct_api_url, normalize_base_url, segment_url};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Session detail as the backend returns it. Messages with roles the client
/// does not model (system prompts, raw tool frames) are dropped on load.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionDetail {
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    messages: Vec<Value>,
}

/// HTTP implementation of [`ChatBackend`] plus the session management calls.
///
/// The backend has no rename endpoint, so derived names live in a local
/// overlay that survives list refreshes for the lifetime of the client.
pub struct HttpBackend {
    client: Client,
    base_url: String,
    sessions: Mutex<Vec<SessionSummary>>,
    local_names: Mutex<HashMap<String, String>>,
}

impl HttpBackend {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: normalize_base_url(base_url),
            sessions: Mutex::new(Vec::new()),
            local_names: Mutex::new(HashMap::new()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Summaries from the most recent list call, with local names applied.
    pub fn cached_sessions(&self) -> Vec<SessionSummary> {
        self.sessions
            .lock()
            .map(|sessions| sessions.clone())
            .unwrap_or_default()
    }

    pub async fn health(&self) -> Result<Value, BoxError> {
        let request = self.client.get(construct_api_url(&self.base_url, "health"));
        read_json(send(request).await?).await
    }

    pub async fn mcp_status(&self) -> Result<McpStatus, BoxError> {
        let request = self
            .client
            .get(construct_api_url(&self.base_url, "api/mcp/status"));
        read_json(send(request).await?).await
    }

    pub async fn list_sessions(&self) -> Result<Vec<SessionSummary>, BoxError> {
        let request = self
            .client
            .get(construct_api_url(&self.base_url, "api/chat/sessions"));
        let response: SessionsResponse = read_json(send(request).await?).await?;
        let mut sessions = response.sessions;
        self.apply_local_names(&mut sessions);
        if let Ok(mut cache) = self.sessions.lock() {
            *cache = sessions.clone();
        }
        Ok(sessions)
    }

    pub async fn create_session(&self) -> Result<SessionSummary, BoxError> {
        let request = self
            .client
            .post(construct_api_url(&self.base_url, "api/chat/sessions"));
        let summary: SessionSummary = read_json(send(request).await?).await?;
        if let Ok(mut cache) = self.sessions.lock() {
            cache.push(summary.clone());
        }
        Ok(summary)
    }

    pub async fn get_session(&self, session_id: &str) -> Result<Session, BoxError> {
        let url = self.endpoint(&["api", "chat", "sessions", session_id])?;
        let detail: SessionDetail = read_json(send(self.client.get(url)).await?).await?;

        let mut messages = Vec::with_capacity(detail.messages.len());
        for raw in detail.messages {
            match serde_json::from_value::<Message>(raw) {
                Ok(message) => messages.push(message),
                Err(err) => debug!(%session_id, error = %err, "Skipping unsupported message"),
            }
        }

        let name = self.local_name(session_id).or(detail.name);
        Ok(Session {
            session_id: detail
                .session_id
                .unwrap_or_else(|| session_id.to_string()),
            name,
            messages,
        })
    }

    pub async fn delete_session(&self, session_id: &str) -> Result<Value, BoxError> {
        let url = self.endpoint(&["api", "chat", "sessions", session_id])?;
        let value = read_json_or_null(send(self.client.delete(url)).await?).await?;
        if let Ok(mut names) = self.local_names.lock() {
            names.remove(session_id);
        }
        self.list_sessions().await?;
        Ok(value)
    }

    /// The full export document, returned verbatim.
    pub async fn export_sessions(&self) -> Result<Value, BoxError> {
        let request = self
            .client
            .get(construct_api_url(&self.base_url, "api/chat/sessions/export"));
        read_json(send(request).await?).await
    }

    pub async fn import_sessions(&self, sessions: Value, merge: bool) -> Result<Value, BoxError> {
        let request = self
            .client
            .post(construct_api_url(&self.base_url, "api/chat/sessions/import"))
            .json(&ImportSessionsRequest { sessions, merge });
        let value = read_json_or_null(send(request).await?).await?;
        self.list_sessions().await?;
        Ok(value)
    }

    /// One-shot question outside any session.
    pub async fn direct_query(&self, query: &str) -> Result<Value, BoxError> {
        let request = self
            .client
            .post(construct_api_url(&self.base_url, "api/chat/query"))
            .json(&QueryRequest {
                query: query.to_string(),
            });
        read_json(send(request).await?).await
    }

    pub async fn ai_config(&self) -> Result<Value, BoxError> {
        let request = self
            .client
            .get(construct_api_url(&self.base_url, "api/ai/config"));
        read_json(send(request).await?).await
    }

    /// Replace the backend's model settings. The document is passed through
    /// unchanged; the backend answers with the stored result.
    pub async fn update_ai_config(&self, config: &Value) -> Result<Value, BoxError> {
        let request = self
            .client
            .post(construct_api_url(&self.base_url, "api/ai/config"))
            .json(config);
        read_json_or_null(send(request).await?).await
    }

    pub async fn mcp_config(&self) -> Result<Value, BoxError> {
        let request = self
            .client
            .get(construct_api_url(&self.base_url, "api/mcp/config"));
        read_json(send(request).await?).await
    }

    /// Add or replace the tool server registered under `name`.
    pub async fn put_mcp_server(&self, name: &str, config: &Value) -> Result<Value, BoxError> {
        let url = self.endpoint(&["api", "mcp", "servers", name])?;
        read_json_or_null(send(self.client.put(url).json(config)).await?).await
    }

    pub async fn delete_mcp_server(&self, name: &str) -> Result<Value, BoxError> {
        let url = self.endpoint(&["api", "mcp", "servers", name])?;
        read_json_or_null(send(self.client.delete(url)).await?).await
    }

    /// Connect the named tool servers (all of them when `servers` is empty)
    /// and return the backend's answer with the status read afterwards.
    pub async fn connect_mcp(&self, servers: &[String]) -> Result<(Value, McpStatus), BoxError> {
        let request = self
            .client
            .post(construct_api_url(&self.base_url, "api/mcp/connect"))
            .json(&McpConnectRequest {
                servers: servers.to_vec(),
            });
        let value = read_json_or_null(send(request).await?).await?;
        Ok((value, self.mcp_status().await?))
    }

    pub async fn disconnect_mcp(&self) -> Result<(Value, McpStatus), BoxError> {
        let request = self
            .client
            .post(construct_api_url(&self.base_url, "api/mcp/disconnect"));
        let value = read_json_or_null(send(request).await?).await?;
        Ok((value, self.mcp_status().await?))
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, BoxError> {
        segment_url(&self.base_url, segments).map_err(BoxError::from)
    }

    fn local_name(&self, session_id: &str) -> Option<String> {
        self.local_names
            .lock()
            .ok()
            .and_then(|names| names.get(session_id).cloned())
    }

    fn apply_local_names(&self, sessions: &mut [SessionSummary]) {
        let Ok(names) = self.local_names.lock() else {
            return;
        };
        for session in sessions.iter_mut() {
            if let Some(name) = names.get(&session.session_id) {
                session.name = Some(name.clone());
            }
        }
    }
}

#[async_trait]
impl ChatBackend for HttpBackend {
    async fn send_message(
        &self,
        session_id: &str,
        text: &str,
    ) -> Result<ChunkStream, ExchangeError> {
        let url = segment_url(&self.base_url, &["api", "chat", session_id, "message"])
            .map_err(ExchangeError::transport)?;
        let response = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .json(&SendMessageRequest {
                message: text.to_string(),
                stream: true,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "<no body>".to_string());
            return Err(ExchangeError::transport(format!(
                "request failed with status {status}: {}",
                error_text.trim()
            )));
        }

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(ExchangeError::from));
        Ok(Box::pin(body))
    }

    async fn update_session_name(&self, session_id: &str, name: &str) -> Result<(), BoxError> {
        self.local_names
            .lock()
            .map_err(|_| "session name cache poisoned")?
            .insert(session_id.to_string(), name.to_string());

        let mut sessions = self
            .sessions
            .lock()
            .map_err(|_| "session cache poisoned")?;
        match sessions
            .iter_mut()
            .find(|session| session.session_id == session_id)
        {
            Some(session) => session.name = Some(name.to_string()),
            None => sessions.push(SessionSummary {
                session_id: session_id.to_string(),
                name: Some(name.to_string()),
                message_count: None,
                created_at: None,
                last_activity: None,
            }),
        }
        Ok(())
    }

    async fn refresh_sessions(&self) -> Result<(), BoxError> {
        self.list_sessions().await.map(|_| ())
    }
}

async fn send(request: RequestBuilder) -> Result<Response, BoxError> {
    let response = request.send().await?;
    if !response.status().is_success() {
        let status = response.status();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        warn!(%status, "Backend request failed");
        return Err(format!("API request failed with status {status}: {}", error_text.trim()).into());
    }
    Ok(response)
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, BoxError> {
    Ok(response.json::<T>().await?)
}

/// Mutation endpoints sometimes answer with an empty body.
async fn read_json_or_null(response: Response) -> Result<Value, BoxError> {
    let bytes = response.bytes().await?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_slice(&bytes)?)
}
