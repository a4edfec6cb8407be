//! Folds decoded stream events into one assistant turn.

use tracing::debug;

use crate::api::StreamEvent;
use crate::core::error::ExchangeError;
use crate::core::message::{Message, ToolCallRecord};

/// What a single event did to the turn.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnUpdate {
    /// Unrecognized event kind; nothing changed.
    Ignored,
    TextAppended,
    ToolStarted,
    /// A tool call finished; the message belongs in the transcript now.
    ToolCompleted(Message),
    /// The backend sent its authoritative final content.
    Completed,
}

/// How the turn ended once the transport closed.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    /// Assistant text to append, if any was produced.
    pub final_text: Option<String>,
    pub tool_calls: Vec<ToolCallRecord>,
    /// Whether a `complete` event was seen rather than inferred from the close.
    pub explicit_completion: bool,
}

/// Rebuilds one assistant turn from decoded stream events.
///
/// At most one tool call is in flight. Starting a second one, or completing
/// when nothing is in flight, aborts the exchange.
#[derive(Debug, Default)]
pub struct TurnAggregator {
    text: String,
    in_flight: Option<ToolCallRecord>,
    completed: Vec<ToolCallRecord>,
    completion_seen: bool,
}

impl TurnAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn in_flight(&self) -> Option<&ToolCallRecord> {
        self.in_flight.as_ref()
    }

    pub fn completed_tools(&self) -> &[ToolCallRecord] {
        &self.completed
    }

    pub fn apply(&mut self, event: StreamEvent) -> Result<TurnUpdate, ExchangeError> {
        match event {
            StreamEvent::Chunk { content } => {
                self.text.push_str(&content);
                Ok(TurnUpdate::TextAppended)
            }
            StreamEvent::ToolCall { tool_call } => {
                if let Some(current) = &self.in_flight {
                    return Err(ExchangeError::protocol(format!(
                        "tool call '{}' started while '{}' ({}) is still running",
                        tool_call.name(),
                        current.name,
                        current.id
                    )));
                }
                let record = ToolCallRecord::calling(
                    tool_call.id_text(),
                    tool_call.name(),
                    tool_call.arguments_text(),
                );
                debug!(id = %record.id, name = %record.name, "tool call started");
                self.in_flight = Some(record);
                Ok(TurnUpdate::ToolStarted)
            }
            StreamEvent::ToolCallComplete { result } => {
                let Some(record) = self.in_flight.take() else {
                    return Err(ExchangeError::protocol(
                        "tool call completed with no call in flight",
                    ));
                };
                let completed = record.complete(result);
                debug!(id = %completed.id, name = %completed.name, "tool call completed");
                self.completed.push(completed.clone());
                Ok(TurnUpdate::ToolCompleted(Message::tool_result(completed)))
            }
            StreamEvent::Complete { content } => {
                if let Some(dangling) = self.in_flight.take() {
                    debug!(id = %dangling.id, "dropping unfinished tool call at completion");
                }
                self.text = content;
                self.completion_seen = true;
                Ok(TurnUpdate::Completed)
            }
            event @ StreamEvent::Error { .. } => Err(ExchangeError::Backend(
                event.error_text().unwrap_or_default(),
            )),
            StreamEvent::Unknown => Ok(TurnUpdate::Ignored),
        }
    }

    /// Resolve the turn after the transport closed.
    pub fn finish(self) -> Result<TurnOutcome, ExchangeError> {
        if !self.completion_seen && self.text.trim().is_empty() {
            return Err(ExchangeError::Interrupted);
        }
        if let Some(dangling) = &self.in_flight {
            debug!(id = %dangling.id, "stream closed with a tool call still running");
        }
        Ok(TurnOutcome {
            final_text: Some(self.text).filter(|text| !text.is_empty()),
            tool_calls: self.completed,
            explicit_completion: self.completion_seen,
        })
    }
}
