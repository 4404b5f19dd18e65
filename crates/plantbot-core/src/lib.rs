//! Core logic for the plant watering bot.
//!
//! Framework-agnostic: the Telegram transport and the GPIO pin live behind
//! traits implemented in adapter crates.

pub mod actuator;
pub mod command;
pub mod config;
pub mod dispatch;
pub mod domain;
pub mod errors;
pub mod logging;
pub mod messaging;

pub use errors::{Error, Result};
