//! Backend settings: model configuration and tool servers

use std::error::Error;

use serde_json::Value;

use crate::api::{HttpBackend, McpStatus};
use crate::cli::{AiConfigCommands, McpCommands};

pub async fn run_ai_config(
    backend: &HttpBackend,
    command: Option<AiConfigCommands>,
) -> Result<(), Box<dyn Error>> {
    let shown = match command {
        None => backend.ai_config().await,
        Some(AiConfigCommands::Set { json }) => {
            let config = parse_document(&json)?;
            let result = backend.update_ai_config(&config).await;
            if result.is_ok() {
                println!("✅ Model settings updated");
            }
            result
        }
    }
    .map_err(|err| err as Box<dyn Error>)?;
    print_document(&shown);
    Ok(())
}

pub async fn run_mcp(backend: &HttpBackend, command: McpCommands) -> Result<(), Box<dyn Error>> {
    match command {
        McpCommands::Config => {
            let config = backend
                .mcp_config()
                .await
                .map_err(|err| err as Box<dyn Error>)?;
            print_document(&config);
        }
        McpCommands::Add { name, json } => {
            let config = parse_document(&json)?;
            backend
                .put_mcp_server(&name, &config)
                .await
                .map_err(|err| err as Box<dyn Error>)?;
            println!("✅ Saved tool server {name}");
        }
        McpCommands::Remove { name } => {
            backend
                .delete_mcp_server(&name)
                .await
                .map_err(|err| err as Box<dyn Error>)?;
            println!("✅ Removed tool server {name}");
        }
        McpCommands::Connect { names } => {
            let (_, status) = backend
                .connect_mcp(&names)
                .await
                .map_err(|err| err as Box<dyn Error>)?;
            println!("{}", status_line(&status));
        }
        McpCommands::Disconnect => {
            let (_, status) = backend
                .disconnect_mcp()
                .await
                .map_err(|err| err as Box<dyn Error>)?;
            println!("{}", status_line(&status));
        }
    }
    Ok(())
}

/// Settings documents are opaque to the client; only their syntax is checked.
fn parse_document(text: &str) -> Result<Value, Box<dyn Error>> {
    match serde_json::from_str::<Value>(text) {
        Ok(value) if value.is_object() => Ok(value),
        Ok(_) => Err("expected a JSON object".into()),
        Err(err) => Err(format!("invalid JSON: {err}").into()),
    }
}

fn print_document(value: &Value) {
    if value.is_null() {
        return;
    }
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(_) => println!("{value}"),
    }
}

pub(crate) fn status_line(status: &McpStatus) -> String {
    match (status.connected, status.tool_count) {
        (true, Some(count)) => format!("🔧 Tool server connected ({count} tools)"),
        (true, None) => "🔧 Tool server connected".to_string(),
        (false, _) => "🔧 Tool server not connected".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn status(value: Value) -> McpStatus {
        serde_json::from_value(value).expect("status")
    }

    #[test]
    fn documents_must_be_json_objects() {
        assert_eq!(
            parse_document(r#"{"command": "files-server"}"#).expect("object"),
            json!({"command": "files-server"})
        );
        assert!(parse_document("[1, 2]")
            .expect_err("array")
            .to_string()
            .contains("JSON object"));
        assert!(parse_document("{command")
            .expect_err("syntax")
            .to_string()
            .starts_with("invalid JSON"));
    }

    #[test]
    fn status_line_reports_tool_count_when_known() {
        assert_eq!(
            status_line(&status(json!({"connected": true, "toolCount": 3}))),
            "🔧 Tool server connected (3 tools)"
        );
        assert_eq!(
            status_line(&status(json!({"connected": true}))),
            "🔧 Tool server connected"
        );
        assert_eq!(
            status_line(&status(json!({"connected": false, "toolCount": 3}))),
            "🔧 Tool server not connected"
        );
    }
}
