//! Core logic for the relay bot: chat commands in, device bytes out.
//!
//! This crate is framework-agnostic. Telegram and the serial port live behind
//! `MessagingPort` and `DeviceTransport`, implemented in adapter crates.

pub mod audit;
pub mod commands;
pub mod config;
pub mod device;
pub mod dispatch;
pub mod domain;
pub mod errors;
pub mod logging;
pub mod messaging;
pub mod observer;
pub mod poll;
pub mod retry;
pub mod security;

#[cfg(test)]
mod testing;

pub use errors::{Error, Result};
