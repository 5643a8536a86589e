//! Conversation state machine and session storage.

pub mod controller;
pub mod session;

pub use controller::{Controller, Effect, Outcome};
pub use session::{Session, SessionStore, Stage};
