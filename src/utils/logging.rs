use crate::core::message::Message;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use tracing_subscriber::EnvFilter;

pub const LOG_FILTER_ENV: &str = "CHATSTREAM_LOG";

/// Install the stderr diagnostics subscriber. Safe to call more than once.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_env(LOG_FILTER_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Plain-text transcript log of confirmed exchanges.
#[derive(Debug)]
pub struct LoggingState {
    file_path: Option<String>,
}

impl LoggingState {
    pub fn new(log_file: Option<String>) -> Result<Self, Box<dyn std::error::Error>> {
        let mut logging = LoggingState::disabled();

        if let Some(path) = log_file {
            logging.set_log_file(path)?;
        }

        Ok(logging)
    }

    pub fn disabled() -> Self {
        LoggingState { file_path: None }
    }

    /// Start logging to `path`, failing now if the file cannot be opened.
    pub fn set_log_file(&mut self, path: String) -> Result<(), Box<dyn std::error::Error>> {
        self.test_file_access(&path)?;
        self.file_path = Some(path);
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.file_path.is_some()
    }

    pub fn log_message(&self, content: &str) -> Result<(), Box<dyn std::error::Error>> {
        let Some(file_path) = self.file_path.as_deref() else {
            return Ok(());
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(file_path)?;
        let mut writer = BufWriter::new(file);

        for line in content.lines() {
            writeln!(writer, "{line}")?;
        }

        // Blank line between entries
        writeln!(writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Write one confirmed exchange: the user's line, then each appended
    /// assistant or tool entry in transcript order.
    pub fn log_exchange(&self, entries: &[Message]) -> Result<(), Box<dyn std::error::Error>> {
        if !self.is_active() {
            return Ok(());
        }

        for entry in entries {
            if entry.is_user() {
                self.log_message(&format!("You: {}", entry.content))?;
            } else if let Some(call) = &entry.tool_call {
                let result = call
                    .result
                    .as_ref()
                    .map(|value| value.to_string())
                    .unwrap_or_default();
                self.log_message(&format!("## tool {}: {}", call.name, result))?;
            } else if !entry.content.is_empty() {
                self.log_message(&entry.content)?;
            }
        }
        Ok(())
    }

    fn test_file_access(&self, path: &str) -> Result<(), Box<dyn std::error::Error>> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.flush()?;
        Ok(())
    }
}
