//! One-shot backend calls: health and direct query

use std::error::Error;

use serde_json::Value;

use crate::api::HttpBackend;
use crate::cli::mcp::status_line;

pub async fn run_health(backend: &HttpBackend) -> Result<(), Box<dyn Error>> {
    match backend.health().await {
        Ok(status) => {
            println!("✅ Backend reachable at {}", backend.base_url());
            if let Some(detail) = status.get("status").and_then(Value::as_str) {
                println!("   status: {detail}");
            }
        }
        Err(err) => {
            eprintln!("❌ Backend unreachable at {}: {err}", backend.base_url());
            std::process::exit(1);
        }
    }

    match backend.mcp_status().await {
        Ok(mcp) => println!("{}", status_line(&mcp)),
        Err(err) => println!("🔧 Tool server status unavailable: {err}"),
    }
    Ok(())
}

pub async fn run_query(backend: &HttpBackend, query: &str) -> Result<(), Box<dyn Error>> {
    if query.trim().is_empty() {
        eprintln!("Usage: chatstream query <question>");
        std::process::exit(1);
    }

    let answer = backend
        .direct_query(query.trim())
        .await
        .map_err(|err| err as Box<dyn Error>)?;
    println!("{}", answer_text(&answer));
    Ok(())
}

/// The reply text of a direct query, or the raw document when it has none.
fn answer_text(answer: &Value) -> String {
    ["response", "content", "answer", "message"]
        .iter()
        .find_map(|key| answer.get(key).and_then(Value::as_str))
        .map(str::to_string)
        .unwrap_or_else(|| {
            serde_json::to_string_pretty(answer).unwrap_or_else(|_| answer.to_string())
        })
}
