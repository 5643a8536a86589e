//! leadbot — lead-capture Telegram bot core.

pub mod catalog;
pub mod channels;
pub mod config;
pub mod conversation;
pub mod error;
pub mod lead;
pub mod phone;
pub mod runner;
