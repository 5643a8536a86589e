//! Event loop — pulls updates, runs the state machine, performs effects.

use std::sync::Arc;

use futures::StreamExt;

use crate::channels::{ChatId, Incoming, Transport};
use crate::conversation::controller::{Controller, Effect};
use crate::conversation::session::SessionStore;
use crate::error::{ChannelError, Result};
use crate::lead::LeadDispatcher;

/// Owns the conversation core and drives it from the transport's event
/// stream. Updates are processed in arrival order; the transport already
/// serializes each user's events.
pub struct Runner {
    controller: Controller,
    store: SessionStore,
    transport: Arc<dyn Transport>,
    dispatcher: LeadDispatcher,
}

impl Runner {
    pub fn new(controller: Controller, transport: Arc<dyn Transport>) -> Self {
        Self {
            controller,
            store: SessionStore::new(),
            dispatcher: LeadDispatcher::new(Arc::clone(&transport)),
            transport,
        }
    }

    /// Run until the update stream ends.
    pub async fn run(&self) -> Result<()> {
        let mut events = self.transport.start().await.map_err(crate::error::Error::Channel)?;
        while let Some(incoming) = events.next().await {
            self.process(incoming).await;
        }
        Ok(())
    }

    /// Handle one update. Outbound sends are fire-and-forget: failures are
    /// logged and never roll back state the user already saw.
    pub async fn process(&self, incoming: Incoming) {
        let user_id = incoming.user.id;
        let prior = self.store.get(user_id).await;
        let outcome = self.controller.handle(prior, &incoming);

        match outcome.session {
            Some(session) => self.store.put(session).await,
            None => {
                self.store.remove(user_id).await;
            }
        }

        for effect in outcome.effects {
            if let Err(e) = self.perform(incoming.chat, effect).await {
                tracing::warn!(user_id, error = %e, "failed to deliver prompt");
            }
        }

        if let Some(lead) = outcome.lead {
            // At-most-once: the user already saw completion, so a delivery
            // failure is logged and the lead is not retried.
            if let Err(e) = self.dispatcher.dispatch(&lead).await {
                tracing::error!(user_id, error = %e, "lead notification failed");
            }
        }
    }

    async fn perform(&self, chat: ChatId, effect: Effect) -> std::result::Result<(), ChannelError> {
        match effect {
            Effect::ShowCategories { text } => {
                self.transport
                    .show_categories(chat, &text, self.controller.catalog())
                    .await
            }
            Effect::ShowText { text, markup } => {
                self.transport.show_text(chat, &text, markup).await
            }
            Effect::ShowPhonePrompt { text } => {
                self.transport.show_phone_prompt(chat, &text).await
            }
            Effect::ClearReplyControls { text } => {
                self.transport.clear_reply_controls(chat, &text).await
            }
        }
    }
}
