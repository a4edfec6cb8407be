//! Line-oriented interactive chat

use std::error::Error;
use std::io::{self, Write};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::api::HttpBackend;
use crate::core::error::ExchangeError;
use crate::core::exchange::{ExchangeController, ExchangePhase, ExchangeReport, StreamView};
use crate::core::message::Role;
use crate::core::session::Session;

const HELP_TEXT: &str = "Commands: /help, /session, /quit. Anything else is sent to the backend.";

/// Writes the live view to a terminal as deltas.
///
/// Text is printed as it grows. A `complete` event may replace the text
/// outright; the printer then stops echoing and [`LivePrinter::finish`]
/// prints the final reply instead.
#[derive(Default)]
pub(crate) struct LivePrinter {
    exchange_id: u64,
    printed: String,
    diverged: bool,
    announced_tool: Option<String>,
}

impl LivePrinter {
    pub(crate) fn update<W: Write>(&mut self, view: &StreamView, out: &mut W) -> io::Result<()> {
        if view.exchange_id != self.exchange_id {
            *self = LivePrinter {
                exchange_id: view.exchange_id,
                ..Default::default()
            };
        }
        if view.phase != ExchangePhase::Streaming {
            return Ok(());
        }

        // Views coalesce, so one call may finish and the next start between
        // two observations.
        let current = view.in_flight_tool_call.as_ref();
        if self.announced_tool.is_some()
            && self.announced_tool.as_deref() != current.map(|call| call.id.as_str())
        {
            writeln!(out, "   ✓ done")?;
            self.announced_tool = None;
        }
        if let Some(call) = current.filter(|_| self.announced_tool.is_none()) {
            writeln!(out)?;
            writeln!(out, "🔧 {}({})", call.name, call.arguments)?;
            self.announced_tool = Some(call.id.clone());
        }

        if !self.diverged {
            match view.accumulated_text.strip_prefix(self.printed.as_str()) {
                Some(delta) if !delta.is_empty() => {
                    write!(out, "{delta}")?;
                    self.printed.push_str(delta);
                }
                Some(_) => {}
                None => self.diverged = true,
            }
        }
        out.flush()
    }

    /// Print whatever part of the final reply the live echo missed.
    pub(crate) fn finish<W: Write>(&mut self, reply: Option<&str>, out: &mut W) -> io::Result<()> {
        if let Some(reply) = reply {
            match reply.strip_prefix(self.printed.as_str()) {
                Some(rest) if !self.diverged => write!(out, "{rest}")?,
                _ => {
                    if !self.printed.is_empty() {
                        writeln!(out)?;
                    }
                    write!(out, "{reply}")?;
                }
            }
        }
        writeln!(out)?;
        out.flush()
    }
}

/// Run one exchange while echoing the live view to stdout.
pub(crate) async fn stream_exchange(
    controller: &ExchangeController,
    session: &mut Session,
    text: &str,
) -> Result<ExchangeReport, ExchangeError> {
    let mut views = controller.subscribe();
    let mut printer = LivePrinter::default();
    let mut stdout = io::stdout();

    let submit = controller.submit(session, text);
    tokio::pin!(submit);

    let result = loop {
        tokio::select! {
            result = &mut submit => break result,
            changed = views.changed() => {
                if changed.is_err() {
                    break submit.await;
                }
                let view = views.borrow_and_update().clone();
                // A closed stdout should not abort the exchange.
                let _ = printer.update(&view, &mut stdout);
            }
        }
    };

    match &result {
        Ok(report) => {
            let _ = printer.finish(report.reply.as_deref(), &mut stdout);
        }
        Err(_) if !printer.printed.is_empty() || printer.announced_tool.is_some() => {
            let _ = writeln!(stdout);
        }
        Err(_) => {}
    }
    result
}

pub async fn run_chat(
    backend: Arc<HttpBackend>,
    controller: ExchangeController,
    session_id: Option<String>,
) -> Result<(), Box<dyn Error>> {
    let mut session = open_session(&backend, session_id).await?;
    let limit = controller.config().session_name_limit;

    println!(
        "💬 {} ({})",
        session.display_title(limit),
        session.session_id
    );
    for message in &session.messages {
        print_history_entry(message.role, &message.content, message.is_tool_message);
    }
    println!("{HELP_TEXT}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };
        let input = line.trim();
        match input {
            "" => continue,
            "/quit" | "/exit" => break,
            "/help" => {
                println!("{HELP_TEXT}");
                continue;
            }
            "/session" => {
                println!(
                    "{} ({}, {} messages)",
                    session.display_title(limit),
                    session.session_id,
                    session.messages.len()
                );
                continue;
            }
            _ => {}
        }

        if let Err(err) = stream_exchange(&controller, &mut session, input).await {
            eprintln!("❌ {err}");
            if matches!(err, ExchangeError::Interrupted) {
                eprintln!("   Your message was not kept; try sending it again.");
            }
        }
    }

    Ok(())
}

pub(crate) async fn open_session(
    backend: &HttpBackend,
    session_id: Option<String>,
) -> Result<Session, Box<dyn Error>> {
    match session_id {
        Some(id) => backend
            .get_session(&id)
            .await
            .map_err(|err| err as Box<dyn Error>),
        None => {
            let summary = backend
                .create_session()
                .await
                .map_err(|err| err as Box<dyn Error>)?;
            Ok(Session::new(summary.session_id))
        }
    }
}

fn print_history_entry(role: Role, content: &str, is_tool_message: bool) {
    if is_tool_message {
        println!("🔧 {content}");
    } else if role.is_user() {
        println!("You: {content}");
    } else {
        println!("{content}");
    }
}
