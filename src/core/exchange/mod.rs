//! One request/response cycle against the chat backend.
//!
//! An exchange moves through `Idle -> Sending -> Streaming -> Finalizing`
//! and back to `Idle`, or through `Failed` when anything goes wrong. The
//! user's message is appended before the request is sent; if the exchange
//! does not finish, the transcript is truncated back to where it started.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures_util::StreamExt;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::core::backend::ChatBackend;
use crate::core::error::ExchangeError;
use crate::core::frame::FrameDecoder;
use crate::core::liveness::{LivenessMonitor, DEFAULT_HEARTBEAT_INTERVAL};
use crate::core::message::{Message, ToolCallRecord};
use crate::core::session::{derive_session_name, Session, DEFAULT_SESSION_NAME_LIMIT};
use crate::core::turn::{TurnAggregator, TurnOutcome, TurnUpdate};
use crate::utils::logging::LoggingState;


#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExchangePhase {
    #[default]
    Idle,
    Sending,
    Streaming,
    Finalizing,
    Failed,
}

/// Read-only view of the running exchange for display code.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamView {
    pub exchange_id: u64,
    pub phase: ExchangePhase,
    pub is_streaming: bool,
    pub accumulated_text: String,
    pub in_flight_tool_call: Option<ToolCallRecord>,
    pub last_error: Option<ExchangeError>,
    pub liveness_warnings: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeConfig {
    pub heartbeat_interval: Duration,
    pub session_name_limit: usize,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            session_name_limit: DEFAULT_SESSION_NAME_LIMIT,
        }
    }
}

/// Summary of a finished exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeReport {
    pub exchange_id: u64,
    pub reply: Option<String>,
    pub tool_calls: Vec<ToolCallRecord>,
    /// Transcript entries added, including the user's message.
    pub appended: usize,
    pub skipped_frames: usize,
    pub liveness_warnings: u32,
}

/// Per-exchange state: the decoder, the turn being rebuilt, and when the
/// last chunk arrived.
#[derive(Debug)]
pub struct Exchange {
    id: u64,
    decoder: FrameDecoder,
    turn: TurnAggregator,
    last_activity: Instant,
}

impl Exchange {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            decoder: FrameDecoder::new(),
            turn: TurnAggregator::new(),
            last_activity: Instant::now(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn text(&self) -> &str {
        self.turn.text()
    }

    pub fn in_flight(&self) -> Option<&ToolCallRecord> {
        self.turn.in_flight()
    }

    pub fn last_activity(&self) -> Instant {
        self.last_activity
    }

    /// Decode one read and fold its events into the turn, in arrival order.
    pub fn ingest(&mut self, chunk: &[u8]) -> Result<Vec<TurnUpdate>, ExchangeError> {
        let now = Instant::now();
        if now > self.last_activity {
            self.last_activity = now;
        }
        self.decoder
            .push(chunk)
            .into_iter()
            .map(|event| self.turn.apply(event))
            .collect()
    }

    /// Flush the decoder and resolve the turn once the transport closed.
    pub fn close(mut self) -> Result<(Vec<TurnUpdate>, TurnOutcome, usize), ExchangeError> {
        let updates = self
            .decoder
            .finish()
            .into_iter()
            .map(|event| self.turn.apply(event))
            .collect::<Result<Vec<_>, _>>()?;
        let skipped = self.decoder.skipped();
        let outcome = self.turn.finish()?;
        Ok((updates, outcome, skipped))
    }
}

/// Drives exchanges for one session view.
///
/// All collaborators are injected; nothing is read from process-wide state.
pub struct ExchangeController {
    backend: Arc<dyn ChatBackend>,
    config: ExchangeConfig,
    logging: LoggingState,
    view: watch::Sender<StreamView>,
    busy: AtomicBool,
    next_exchange_id: AtomicU64,
    cancel_token: Mutex<Option<CancellationToken>>,
}

impl ExchangeController {
    pub fn new(backend: Arc<dyn ChatBackend>, config: ExchangeConfig) -> Self {
        let (view, _) = watch::channel(StreamView::default());
        Self {
            backend,
            config,
            logging: LoggingState::disabled(),
            view,
            busy: AtomicBool::new(false),
            next_exchange_id: AtomicU64::new(0),
            cancel_token: Mutex::new(None),
        }
    }

    pub fn with_logging(mut self, logging: LoggingState) -> Self {
        self.logging = logging;
        self
    }

    pub fn config(&self) -> &ExchangeConfig {
        &self.config
    }

    pub fn subscribe(&self) -> watch::Receiver<StreamView> {
        self.view.subscribe()
    }

    pub fn view(&self) -> StreamView {
        self.view.borrow().clone()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Cancel the running exchange, if any. Its transcript changes are rolled back.
    pub fn cancel_current(&self) -> bool {
        let guard = self
            .cancel_token
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match guard.as_ref() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Send `text` to the session and stream the reply into its transcript.
    pub async fn submit(
        &self,
        session: &mut Session,
        text: &str,
    ) -> Result<ExchangeReport, ExchangeError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ExchangeError::EmptyMessage);
        }
        if self.busy.swap(true, Ordering::AcqRel) {
            return Err(ExchangeError::Busy);
        }

        let exchange_id = self.next_exchange_id.fetch_add(1, Ordering::Relaxed) + 1;
        let cancel = CancellationToken::new();
        *self
            .cancel_token
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(cancel.clone());

        let mut scope = ExchangeScope::open(self, session, exchange_id);
        match self.run(&mut scope, exchange_id, text, &cancel).await {
            Ok(report) => {
                let session_id = scope.session.session_id.clone();
                let confirmed = scope.commit();
                drop(scope);

                if let Err(err) = self.logging.log_exchange(&confirmed) {
                    warn!("Failed to write transcript log: {err}");
                }
                if let Err(err) = self.backend.refresh_sessions().await {
                    warn!(session_id = %session_id, "Failed to refresh session summaries: {err}");
                }
                Ok(report)
            }
            Err(err) => {
                warn!(exchange_id, kind = err.kind(), "Exchange failed: {err}");
                self.view.send_modify(|view| {
                    view.phase = ExchangePhase::Failed;
                    view.last_error = Some(err.clone());
                });
                Err(err)
            }
        }
    }

    async fn run(
        &self,
        scope: &mut ExchangeScope<'_>,
        exchange_id: u64,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<ExchangeReport, ExchangeError> {
        let needs_name = scope.session.needs_name();
        let session_id = scope.session.session_id.clone();

        self.set_phase(ExchangePhase::Sending);
        scope.append(Message::user(text));

        if needs_name {
            let name = derive_session_name(text, self.config.session_name_limit);
            scope.session.name = Some(name.clone());
            if let Err(err) = self.backend.update_session_name(&session_id, &name).await {
                warn!(session_id = %session_id, "Failed to update session name: {err}");
            }
        }

        let mut stream = tokio::select! {
            _ = cancel.cancelled() => return Err(ExchangeError::Cancelled),
            response = self.backend.send_message(&session_id, text) => response?,
        };

        self.view.send_modify(|view| {
            view.phase = ExchangePhase::Streaming;
            view.is_streaming = true;
            view.accumulated_text.clear();
            view.in_flight_tool_call = None;
            view.liveness_warnings = 0;
        });
        debug!(exchange_id, session_id = %session_id, "streaming response");

        let (warning_tx, mut warning_rx) = mpsc::unbounded_channel();
        let monitor = LivenessMonitor::start(
            self.config.heartbeat_interval,
            cancel.child_token(),
            warning_tx,
        );
        let mut exchange = Exchange::new(exchange_id);
        let mut liveness_warnings = 0u32;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Err(ExchangeError::Cancelled),
                Some(_warning) = warning_rx.recv() => {
                    liveness_warnings += 1;
                    self.view.send_modify(|view| view.liveness_warnings = liveness_warnings);
                }
                next = stream.next() => match next {
                    Some(Ok(chunk)) => {
                        monitor.record_activity();
                        let updates = exchange.ingest(&chunk)?;
                        self.reconcile(scope, &exchange, updates);
                    }
                    Some(Err(err)) => return Err(err),
                    None => break,
                },
            }
        }
        monitor.stop();

        let (updates, outcome, skipped_frames) = exchange.close()?;
        for update in updates {
            if let TurnUpdate::ToolCompleted(message) = update {
                scope.append(message);
            }
        }

        self.set_phase(ExchangePhase::Finalizing);
        if let Some(reply) = &outcome.final_text {
            scope.append(Message::assistant(reply.clone()));
        }
        debug!(
            exchange_id,
            tools = outcome.tool_calls.len(),
            explicit = outcome.explicit_completion,
            "exchange finalized"
        );

        Ok(ExchangeReport {
            exchange_id,
            reply: outcome.final_text,
            tool_calls: outcome.tool_calls,
            appended: scope.appended(),
            skipped_frames,
            liveness_warnings,
        })
    }

    fn reconcile(
        &self,
        scope: &mut ExchangeScope<'_>,
        exchange: &Exchange,
        updates: Vec<TurnUpdate>,
    ) {
        if updates.is_empty() {
            return;
        }
        for update in updates {
            if let TurnUpdate::ToolCompleted(message) = update {
                scope.append(message);
            }
        }
        self.view.send_modify(|view| {
            if view.accumulated_text != exchange.text() {
                view.accumulated_text = exchange.text().to_string();
            }
            view.in_flight_tool_call = exchange.in_flight().cloned();
        });
    }

    fn set_phase(&self, phase: ExchangePhase) {
        debug!(?phase, "exchange phase");
        self.view.send_modify(|view| view.phase = phase);
    }
}

/// Holds the session for the life of one exchange.
///
/// Unless committed, dropping the scope truncates the transcript to its
/// length at open. Either way it clears the transient streaming view and
/// releases the controller; a `Failed` phase is left for display.
struct ExchangeScope<'a> {
    controller: &'a ExchangeController,
    session: &'a mut Session,
    checkpoint: usize,
    committed: bool,
}

impl<'a> ExchangeScope<'a> {
    fn open(
        controller: &'a ExchangeController,
        session: &'a mut Session,
        exchange_id: u64,
    ) -> Self {
        controller.view.send_modify(|view| {
            view.exchange_id = exchange_id;
            view.last_error = None;
            view.liveness_warnings = 0;
        });
        let checkpoint = session.messages.len();
        Self {
            controller,
            session,
            checkpoint,
            committed: false,
        }
    }

    fn append(&mut self, message: Message) {
        self.session.messages.push(message);
    }

    fn appended(&self) -> usize {
        self.session.messages.len() - self.checkpoint
    }

    /// Keep everything appended so far and return a copy of it.
    fn commit(&mut self) -> Vec<Message> {
        self.committed = true;
        self.session.messages[self.checkpoint..].to_vec()
    }
}

impl Drop for ExchangeScope<'_> {
    fn drop(&mut self) {
        if !self.committed {
            let removed = self.session.messages.len().saturating_sub(self.checkpoint);
            self.session.messages.truncate(self.checkpoint);
            debug!(removed, "rolled back transcript");
        }

        self.controller.view.send_modify(|view| {
            if view.phase != ExchangePhase::Failed {
                view.phase = ExchangePhase::Idle;
            }
            view.is_streaming = false;
            view.accumulated_text.clear();
            view.in_flight_tool_call = None;
        });
        *self
            .controller
            .cancel_token
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
        self.controller.busy.store(false, Ordering::Release);
    }
}
