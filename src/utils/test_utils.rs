use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use futures_util::stream;
use tokio::sync::mpsc;

use crate::core::backend::{ChatBackend, ChunkStream};
use crate::core::error::ExchangeError;
use crate::core::message::Message;
use crate::core::session::Session;

pub type ChunkSender = mpsc::UnboundedSender<Result<Vec<u8>, ExchangeError>>;

enum Reply {
    Chunks(Vec<Result<Vec<u8>, ExchangeError>>),
    Live(mpsc::UnboundedReceiver<Result<Vec<u8>, ExchangeError>>),
    Refused(ExchangeError),
}

/// In-memory backend that replays scripted response bodies.
#[derive(Default)]
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<Reply>>,
    sent: Mutex<Vec<(String, String)>>,
    names: Mutex<Vec<(String, String)>>,
    refreshes: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply whose body is the given lines, one read per line.
    pub fn reply_lines(&self, lines: &[&str]) -> &Self {
        let chunks = lines
            .iter()
            .map(|line| Ok(format!("{line}\n").into_bytes()))
            .collect();
        self.push(Reply::Chunks(chunks))
    }

    /// Queue a reply delivered as exactly these reads.
    pub fn reply_chunks(&self, chunks: Vec<Result<Vec<u8>, ExchangeError>>) -> &Self {
        self.push(Reply::Chunks(chunks))
    }

    pub fn refuse(&self, err: ExchangeError) -> &Self {
        self.push(Reply::Refused(err))
    }

    /// Queue a reply whose reads are fed by the returned sender; the body
    /// ends when the sender is dropped.
    pub fn reply_live(&self) -> ChunkSender {
        let (tx, rx) = mpsc::unbounded_channel();
        self.push(Reply::Live(rx));
        tx
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().expect("sent lock").clone()
    }

    pub fn names(&self) -> Vec<(String, String)> {
        self.names.lock().expect("names lock").clone()
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }

    fn push(&self, reply: Reply) -> &Self {
        self.replies.lock().expect("replies lock").push_back(reply);
        self
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    async fn send_message(
        &self,
        session_id: &str,
        text: &str,
    ) -> Result<ChunkStream, ExchangeError> {
        self.sent
            .lock()
            .expect("sent lock")
            .push((session_id.to_string(), text.to_string()));
        let reply = self
            .replies
            .lock()
            .expect("replies lock")
            .pop_front()
            .expect("no scripted reply left");
        match reply {
            Reply::Chunks(chunks) => Ok(Box::pin(stream::iter(chunks))),
            Reply::Live(rx) => Ok(Box::pin(stream::unfold(rx, |mut rx| async move {
                rx.recv().await.map(|item| (item, rx))
            }))),
            Reply::Refused(err) => Err(err),
        }
    }

    async fn update_session_name(
        &self,
        session_id: &str,
        name: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.names
            .lock()
            .expect("names lock")
            .push((session_id.to_string(), name.to_string()));
        Ok(())
    }

    async fn refresh_sessions(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub fn create_test_session() -> Session {
    Session::new("test-session-0001")
}

pub fn create_test_messages() -> Vec<Message> {
    vec![
        Message::user("Hello"),
        Message::assistant("Hi there!"),
        Message::user("How are you?"),
        Message::assistant("I'm doing well, thank you for asking!"),
    ]
}
