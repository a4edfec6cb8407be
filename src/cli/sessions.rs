//! Session management subcommands

use std::error::Error;
use std::fs;

use serde_json::Value;

use crate::api::{HttpBackend, SessionSummary};
use crate::cli::SessionCommands;
use crate::core::session::{derive_session_name, Session};

type BoxError = Box<dyn Error + Send + Sync>;

pub async fn run_sessions(
    backend: &HttpBackend,
    command: SessionCommands,
    name_limit: usize,
) -> Result<(), Box<dyn Error>> {
    dispatch(backend, command, name_limit)
        .await
        .map_err(|err| err as Box<dyn Error>)
}

async fn dispatch(
    backend: &HttpBackend,
    command: SessionCommands,
    name_limit: usize,
) -> Result<(), BoxError> {
    match command {
        SessionCommands::List => {
            let sessions = backend.list_sessions().await?;
            if sessions.is_empty() {
                println!("No sessions yet. Start one with 'chatstream chat'.");
            }
            for summary in &sessions {
                println!("{}", format_summary(summary, name_limit));
            }
        }
        SessionCommands::Show { id } => {
            let session = backend.get_session(&id).await?;
            print!("{}", format_transcript(&session, name_limit));
        }
        SessionCommands::New => {
            let summary = backend.create_session().await?;
            println!("{}", summary.session_id);
        }
        SessionCommands::Delete { id } => {
            backend.delete_session(&id).await?;
            println!("🗑️  Deleted session {id}");
        }
        SessionCommands::Export => {
            let document = backend.export_sessions().await?;
            println!("{}", serde_json::to_string_pretty(&document)?);
        }
        SessionCommands::Import { file, merge } => {
            let contents = fs::read_to_string(&file)
                .map_err(|err| format!("Failed to read {file}: {err}"))?;
            let document: Value = serde_json::from_str(&contents)
                .map_err(|err| format!("{file} is not valid JSON: {err}"))?;
            let sessions = match document {
                Value::Object(mut map) if map.contains_key("sessions") => {
                    map.remove("sessions").unwrap_or(Value::Null)
                }
                other => other,
            };
            let result = backend.import_sessions(sessions, merge).await?;
            match result {
                Value::Null => println!("✅ Imported sessions from {file}"),
                other => println!("✅ Imported sessions from {file}: {other}"),
            }
        }
    }
    Ok(())
}

fn format_summary(summary: &SessionSummary, name_limit: usize) -> String {
    let title = summary
        .name
        .as_deref()
        .filter(|name| !name.is_empty())
        .map(|name| derive_session_name(name, name_limit))
        .unwrap_or_else(|| "(unnamed)".to_string());
    let mut line = format!("{}  {}", summary.session_id, title);
    if let Some(count) = summary.message_count {
        line.push_str(&format!("  [{count} messages]"));
    }
    if let Some(last) = summary.last_activity.as_deref() {
        line.push_str(&format!("  {last}"));
    }
    line
}

fn format_transcript(session: &Session, name_limit: usize) -> String {
    let mut out = format!("# {}\n\n", session.display_title(name_limit));
    for message in &session.messages {
        let stamp = message.timestamp.format("%Y-%m-%d %H:%M");
        if message.is_tool_message {
            out.push_str(&format!("[{stamp}] 🔧 {}\n", message.content));
        } else if message.is_user() {
            out.push_str(&format!("[{stamp}] You: {}\n", message.content));
        } else {
            out.push_str(&format!("[{stamp}] {}\n", message.content));
        }
    }
    out
}
