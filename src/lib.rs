//! chatstream is a command-line client for a tool-calling chat backend.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns the exchange lifecycle: frame decoding, turn aggregation,
//!   the liveness monitor, and the controller that commits or rolls back a
//!   session transcript.
//! - [`api`] defines the backend wire types and the HTTP implementation of
//!   [`core::backend::ChatBackend`].
//! - [`cli`] parses arguments and drives one-shot and interactive sessions.
//! - [`utils`] holds endpoint helpers and the transcript log.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`].

pub mod api;
pub mod cli;
pub mod core;
pub mod utils;
