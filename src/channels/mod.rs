//! Transport abstraction for message I/O.
//!
//! The conversation core never touches Telegram's native object shapes; it
//! consumes the narrow [`Event`] union and emits prompts through the
//! [`Transport`] trait.

pub mod telegram;

pub use telegram::TelegramTransport;

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::catalog::Catalog;
use crate::error::ChannelError;

/// Chat identifier on the transport side.
pub type ChatId = i64;

/// Identity fields the transport supplies with every event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserInfo {
    /// Opaque stable identifier of the remote party.
    pub id: i64,
    pub first_name: Option<String>,
    pub full_name: Option<String>,
    pub username: Option<String>,
}

/// Inbound events, narrowed to what the state machine needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The `/start` command.
    Start,
    /// The `/cancel` command.
    Cancel,
    /// An inline button press carrying a catalog code.
    CategorySelected { code: String },
    /// A shared contact card with its raw phone number.
    ContactShared { raw_number: String },
    /// A plain text message.
    Text { text: String },
    /// Anything the bot has no use for (stickers, unknown commands, ...).
    Other,
}

/// One update from the transport: who sent it, where to reply, what happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Incoming {
    pub chat: ChatId,
    pub user: UserInfo,
    pub event: Event,
}

/// How a text message should be rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkupHint {
    Plain,
    Html,
}

/// Stream of incoming events produced by a transport.
pub type EventStream = Pin<Box<dyn Stream<Item = Incoming> + Send>>;

/// The outbound operations the conversation core needs from a transport.
///
/// Delivery is at-most-once from the core's perspective: callers log send
/// failures and move on, conversation state is never rolled back.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Begin receiving updates.
    async fn start(&self) -> Result<EventStream, ChannelError>;

    /// Send the category prompt with the catalog entries as selectable
    /// buttons.
    async fn show_categories(
        &self,
        chat: ChatId,
        text: &str,
        catalog: &Catalog,
    ) -> Result<(), ChannelError>;

    /// Send a plain message.
    async fn show_text(
        &self,
        chat: ChatId,
        text: &str,
        markup: MarkupHint,
    ) -> Result<(), ChannelError>;

    /// Send the phone prompt with the share-contact and back buttons.
    async fn show_phone_prompt(&self, chat: ChatId, text: &str) -> Result<(), ChannelError>;

    /// Send a message and drop any reply keyboard still on screen.
    async fn clear_reply_controls(&self, chat: ChatId, text: &str) -> Result<(), ChannelError>;

    /// Deliver a message to the fixed admin chat.
    async fn notify_admin(&self, text: &str) -> Result<(), ChannelError>;
}
