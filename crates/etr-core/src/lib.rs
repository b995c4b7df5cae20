//! Core domain + application logic for the expense relay bot.
//!
//! This crate is intentionally framework-agnostic. Telegram and the remote
//! spreadsheet endpoint live behind ports (traits) implemented in adapter crates.

pub mod config;
pub mod dispatcher;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod logging;
pub mod parser;
pub mod ports;
pub mod reply;

pub use errors::{Error, Result};
