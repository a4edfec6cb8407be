use std::error::Error as StdError;
use std::fmt;

/// Why an exchange failed. Every variant rolls the transcript back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeError {
    /// The request could not be sent or the connection broke mid-stream.
    Transport(String),

    /// The stream violated the tool-call ordering rules.
    Protocol(String),

    /// The backend reported an `error` event.
    Backend(String),

    /// The stream closed without a terminal event and without any text.
    Interrupted,

    /// Another exchange is still running on this controller.
    Busy,

    /// The caller cancelled the exchange before it finished.
    Cancelled,

    /// Nothing to send after trimming the input.
    EmptyMessage,
}

impl ExchangeError {
    pub fn transport(message: impl Into<String>) -> Self {
        ExchangeError::Transport(message.into())
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        ExchangeError::Protocol(message.into())
    }

    pub fn backend(message: impl Into<String>) -> Self {
        ExchangeError::Backend(message.into())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ExchangeError::Transport(_) => "transport",
            ExchangeError::Protocol(_) => "protocol",
            ExchangeError::Backend(_) => "backend",
            ExchangeError::Interrupted => "interrupted",
            ExchangeError::Busy => "busy",
            ExchangeError::Cancelled => "cancelled",
            ExchangeError::EmptyMessage => "empty",
        }
    }
}

impl fmt::Display for ExchangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExchangeError::Transport(message) => write!(f, "Connection failed: {message}"),
            ExchangeError::Protocol(message) => write!(f, "Protocol error: {message}"),
            ExchangeError::Backend(message) => write!(f, "{message}"),
            ExchangeError::Interrupted => {
                write!(f, "The response stream was interrupted before any reply arrived")
            }
            ExchangeError::Busy => write!(f, "A reply is still streaming for this session"),
            ExchangeError::Cancelled => write!(f, "The exchange was cancelled"),
            ExchangeError::EmptyMessage => write!(f, "Cannot send an empty message"),
        }
    }
}

impl StdError for ExchangeError {}

impl From<reqwest::Error> for ExchangeError {
    fn from(err: reqwest::Error) -> Self {
        ExchangeError::Transport(err.to_string())
    }
}
