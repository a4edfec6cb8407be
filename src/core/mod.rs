pub mod backend;
pub mod config;
pub mod error;
pub mod exchange;
pub mod frame;
pub mod liveness;
pub mod message;
pub mod session;
pub mod turn;
