#![deny(missing_docs)]
//! Stream Link Bot
//!
//! A Telegram bot that archives submitted media into a storage channel and answers
//! with streaming and download links, surviving flood control and transient API
//! failures along the way.

/// Telegram bot implementation
pub mod bot;
/// Configuration management
pub mod config;
/// Admission checks (bans, tokens, channel gate, admin rights)
pub mod gate;
/// Link records and link generation
pub mod links;
/// Telegram runtime entrypoint
pub mod runner;
/// Utility functions
pub mod utils;

#[cfg(test)]
pub mod testing;
