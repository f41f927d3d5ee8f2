//! Command-line interface module.
//!
//! This module provides the CLI functionality for:
//! - Running the prediction server
//! - Offline training
//! - One-off predictions

pub mod commands;
pub mod handlers;

pub use commands::Commands;
pub use handlers::{handle_predict, handle_server, handle_train, init_logging};
