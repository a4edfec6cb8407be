//! Non-interactive "say" command

use std::error::Error;
use std::sync::Arc;

use crate::api::HttpBackend;
use crate::cli::chat::{open_session, stream_exchange};
use crate::core::exchange::ExchangeController;

pub async fn run_say(
    backend: Arc<HttpBackend>,
    controller: ExchangeController,
    session_id: Option<String>,
    text: String,
) -> Result<(), Box<dyn Error>> {
    if text.trim().is_empty() {
        eprintln!("Usage: chatstream say <message>");
        std::process::exit(1);
    }

    let mut session = open_session(&backend, session_id).await?;
    match stream_exchange(&controller, &mut session, &text).await {
        Ok(report) => {
            if report.skipped_frames > 0 {
                eprintln!("⚠️  Skipped {} malformed frame(s)", report.skipped_frames);
            }
            eprintln!("Session: {}", session.session_id);
            Ok(())
        }
        Err(err) => {
            eprintln!("❌ Error: {err}");
            std::process::exit(1);
        }
    }
}
