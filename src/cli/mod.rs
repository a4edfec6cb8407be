//! Command-line interface parsing and handling
//!
//! This module handles parsing command-line arguments and executing the appropriate commands.

pub mod chat;
pub mod mcp;
pub mod remote;
pub mod say;
pub mod sessions;

use std::error::Error;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::api::HttpBackend;
use crate::cli::chat::run_chat;
use crate::cli::mcp::{run_ai_config, run_mcp};
use crate::cli::remote::{run_health, run_query};
use crate::cli::say::run_say;
use crate::cli::sessions::run_sessions;
use crate::core::config::Config;
use crate::core::exchange::ExchangeController;
use crate::utils::logging::{init_tracing, LoggingState};

#[derive(Parser)]
#[command(name = "chatstream")]
#[command(about = "Stream chat exchanges against a tool-calling chat backend")]
#[command(
    long_about = "chatstream talks to a chat backend over HTTP, streams assistant replies as \
they arrive, and shows tool calls the backend makes on your behalf. A failed exchange \
leaves the local transcript exactly as it was before you sent the message.\n\n\
Environment Variables:\n\
  CHATSTREAM_BASE_URL   Backend root URL (defaults to http://localhost:3000)\n\
  CHATSTREAM_LOG        Diagnostic filter, e.g. 'debug' or 'chatstream=trace'"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Backend root URL, overriding the environment and config file
    #[arg(short = 'b', long, global = true, value_name = "URL")]
    pub base_url: Option<String>,

    /// Append confirmed exchanges to the specified file
    #[arg(short = 'l', long, global = true)]
    pub log: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start an interactive chat (default)
    Chat {
        /// Resume an existing session instead of creating one
        #[arg(short = 's', long)]
        session: Option<String>,
    },
    /// Send a single message and print the streamed reply
    Say {
        /// Resume an existing session instead of creating one
        #[arg(short = 's', long)]
        session: Option<String>,
        /// Message text
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        text: Vec<String>,
    },
    /// Manage sessions stored by the backend
    Sessions {
        #[command(subcommand)]
        command: SessionCommands,
    },
    /// Check that the backend is reachable and show tool server status
    Health,
    /// Ask a one-off question outside any session
    Query {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        text: Vec<String>,
    },
    /// Show or replace the backend's model settings
    AiConfig {
        #[command(subcommand)]
        command: Option<AiConfigCommands>,
    },
    /// Manage the backend's tool servers
    Mcp {
        #[command(subcommand)]
        command: McpCommands,
    },
    /// Show or edit the configuration file
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
pub enum AiConfigCommands {
    /// Send a JSON settings object to the backend
    Set { json: String },
}

#[derive(Subcommand)]
pub enum McpCommands {
    /// Print the tool server configuration
    Config,
    /// Add or replace a tool server from a JSON object
    Add { name: String, json: String },
    /// Remove a tool server
    Remove { name: String },
    /// Connect tool servers; all configured servers when none are named
    Connect { names: Vec<String> },
    /// Disconnect every tool server
    Disconnect,
}

#[derive(Subcommand)]
pub enum SessionCommands {
    /// List sessions
    List,
    /// Print a session transcript
    Show { id: String },
    /// Create an empty session and print its id
    New,
    /// Delete a session
    Delete { id: String },
    /// Write every session to stdout as JSON
    Export,
    /// Load sessions from a JSON file produced by export
    Import {
        file: String,
        /// Keep existing sessions instead of replacing them
        #[arg(long)]
        merge: bool,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the current configuration
    Show,
    /// Set a configuration value
    Set { key: String, value: String },
    /// Remove a configuration value
    Unset { key: String },
}

pub fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();
    tokio::runtime::Runtime::new()?.block_on(async_main())
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let config = Config::load()?;

    match args.command.unwrap_or(Commands::Chat { session: None }) {
        Commands::Chat { session } => {
            let (backend, controller) = connect(&config, &args.base_url, args.log)?;
            run_chat(backend, controller, session).await
        }
        Commands::Say { session, text } => {
            let (backend, controller) = connect(&config, &args.base_url, args.log)?;
            run_say(backend, controller, session, text.join(" ")).await
        }
        Commands::Sessions { command } => {
            let backend = HttpBackend::new(&config.resolve_base_url(args.base_url.as_deref()));
            run_sessions(&backend, command, config.exchange_config().session_name_limit).await
        }
        Commands::Health => {
            let backend = HttpBackend::new(&config.resolve_base_url(args.base_url.as_deref()));
            run_health(&backend).await
        }
        Commands::Query { text } => {
            let backend = HttpBackend::new(&config.resolve_base_url(args.base_url.as_deref()));
            run_query(&backend, &text.join(" ")).await
        }
        Commands::AiConfig { command } => {
            let backend = HttpBackend::new(&config.resolve_base_url(args.base_url.as_deref()));
            run_ai_config(&backend, command).await
        }
        Commands::Mcp { command } => {
            let backend = HttpBackend::new(&config.resolve_base_url(args.base_url.as_deref()));
            run_mcp(&backend, command).await
        }
        Commands::Config { command } => run_config(config, command),
    }
}

fn connect(
    config: &Config,
    base_url: &Option<String>,
    log: Option<String>,
) -> Result<(Arc<HttpBackend>, ExchangeController), Box<dyn Error>> {
    let backend = Arc::new(HttpBackend::new(
        &config.resolve_base_url(base_url.as_deref()),
    ));
    let logging = LoggingState::new(log.or_else(|| config.log_file.clone()))?;
    let controller = ExchangeController::new(backend.clone(), config.exchange_config())
        .with_logging(logging);
    Ok((backend, controller))
}

fn run_config(mut config: Config, command: Option<ConfigCommands>) -> Result<(), Box<dyn Error>> {
    match command.unwrap_or(ConfigCommands::Show) {
        ConfigCommands::Show => {
            config.print_all();
            if let Ok(path) = Config::get_config_path() {
                println!();
                println!(
                    "Config file: {}",
                    crate::core::config::data::path_display(path)
                );
            }
        }
        ConfigCommands::Set { key, value } => {
            config.set_value(&key, &value)?;
            config.save()?;
            println!("✅ Set {key} to: {}", value.trim());
        }
        ConfigCommands::Unset { key } => {
            config.unset_value(&key)?;
            config.save()?;
            println!("✅ Unset {key}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests;
