//! Telegram transport — long-polls the Bot API for updates.
//!
//! Native Bot API implementation over reqwest: inbound updates are narrowed
//! to [`Event`] variants, outbound prompts are sendMessage calls with the
//! appropriate keyboard markup.

use async_trait::async_trait;
use futures::stream;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

use crate::catalog::Catalog;
use crate::channels::{ChatId, Event, EventStream, Incoming, MarkupHint, Transport, UserInfo};
use crate::conversation::controller::{BACK_LABEL, CONTACT_LABEL};
use crate::error::ChannelError;

/// Telegram transport — connects to the Bot API via long-polling.
pub struct TelegramTransport {
    bot_token: SecretString,
    admin_chat_id: ChatId,
    client: reqwest::Client,
}

impl TelegramTransport {
    pub fn new(bot_token: SecretString, admin_chat_id: ChatId) -> Self {
        Self {
            bot_token,
            admin_chat_id,
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!(
            "https://api.telegram.org/bot{}/{method}",
            self.bot_token.expose_secret()
        )
    }

    async fn call(&self, method: &str, body: &Value) -> Result<reqwest::Response, ChannelError> {
        self.client
            .post(self.api_url(method))
            .json(body)
            .send()
            .await
            .map_err(|e| ChannelError::Http(e.to_string()))
    }

    /// Send a text message, HTML-first with a plain-text retry when Telegram
    /// rejects the markup.
    async fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        html: bool,
        reply_markup: Option<Value>,
    ) -> Result<(), ChannelError> {
        let mut body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
        });
        if let Some(markup) = reply_markup {
            body["reply_markup"] = markup;
        }

        if !html {
            let resp = self.call("sendMessage", &body).await?;
            if resp.status().is_success() {
                return Ok(());
            }
            let err = resp.text().await.unwrap_or_default();
            return Err(ChannelError::SendFailed {
                reason: format!("sendMessage failed: {err}"),
            });
        }

        body["parse_mode"] = Value::String("HTML".to_string());
        let resp = self.call("sendMessage", &body).await?;
        if resp.status().is_success() {
            return Ok(());
        }

        let html_status = resp.status();
        tracing::warn!(
            status = ?html_status,
            "sendMessage with HTML parse_mode failed; retrying as plain text"
        );

        if let Some(obj) = body.as_object_mut() {
            obj.remove("parse_mode");
        }
        let resp = self.call("sendMessage", &body).await?;
        if resp.status().is_success() {
            Ok(())
        } else {
            let plain_err = resp.text().await.unwrap_or_default();
            Err(ChannelError::SendFailed {
                reason: format!("sendMessage failed (html: {html_status}, plain: {plain_err})"),
            })
        }
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn start(&self) -> Result<EventStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let client = self.client.clone();
        let poll_url = self.api_url("getUpdates");
        let answer_url = self.api_url("answerCallbackQuery");

        tokio::spawn(async move {
            let mut offset: i64 = 0;

            tracing::info!("Telegram transport listening for updates...");

            loop {
                let body = serde_json::json!({
                    "offset": offset,
                    "timeout": 30,
                    "allowed_updates": ["message", "callback_query"]
                });

                let resp = match client.post(&poll_url).json(&body).send().await {
                    Ok(r) => r,
                    Err(e) => {
                        tracing::warn!("Telegram poll error: {e}");
                        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                        continue;
                    }
                };

                let data: Value = match resp.json().await {
                    Ok(d) => d,
                    Err(e) => {
                        tracing::warn!("Telegram parse error: {e}");
                        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                        continue;
                    }
                };

                if let Some(results) = data.get("result").and_then(Value::as_array) {
                    for update in results {
                        // Advance offset past this update
                        if let Some(uid) = update.get("update_id").and_then(Value::as_i64) {
                            offset = uid + 1;
                        }

                        let Some(parsed) = parse_update(update) else {
                            continue;
                        };

                        // Clear the client-side button spinner; the outcome
                        // does not matter.
                        if let Some(callback_id) = parsed.callback_id {
                            let _ = client
                                .post(&answer_url)
                                .json(&serde_json::json!({
                                    "callback_query_id": callback_id
                                }))
                                .send()
                                .await;
                        }

                        if tx.send(parsed.incoming).is_err() {
                            tracing::info!("Telegram listener channel closed");
                            return;
                        }
                    }
                }
            }
        });

        let stream = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|msg| (msg, rx))
        });

        Ok(Box::pin(stream))
    }

    async fn show_categories(
        &self,
        chat: ChatId,
        text: &str,
        catalog: &Catalog,
    ) -> Result<(), ChannelError> {
        self.send_message(chat, text, true, Some(categories_keyboard(catalog)))
            .await
    }

    async fn show_text(
        &self,
        chat: ChatId,
        text: &str,
        markup: MarkupHint,
    ) -> Result<(), ChannelError> {
        self.send_message(chat, text, markup == MarkupHint::Html, None)
            .await
    }

    async fn show_phone_prompt(&self, chat: ChatId, text: &str) -> Result<(), ChannelError> {
        self.send_message(chat, text, true, Some(phone_keyboard()))
            .await
    }

    async fn clear_reply_controls(&self, chat: ChatId, text: &str) -> Result<(), ChannelError> {
        self.send_message(chat, text, true, Some(remove_keyboard()))
            .await
    }

    async fn notify_admin(&self, text: &str) -> Result<(), ChannelError> {
        self.send_message(self.admin_chat_id, text, true, None).await
    }
}

// ── Keyboards ───────────────────────────────────────────────────────

/// One inline button per catalog entry, one entry per row.
fn categories_keyboard(catalog: &Catalog) -> Value {
    let rows: Vec<Value> = catalog
        .entries()
        .iter()
        .map(|c| serde_json::json!([{ "text": c.label, "callback_data": c.code }]))
        .collect();
    serde_json::json!({ "inline_keyboard": rows })
}

/// Reply keyboard for the phone stage: share-contact on top, back below.
/// Not one-time — it stays up through retries until explicitly removed.
fn phone_keyboard() -> Value {
    serde_json::json!({
        "keyboard": [
            [{ "text": CONTACT_LABEL, "request_contact": true }],
            [{ "text": BACK_LABEL }]
        ],
        "resize_keyboard": true,
        "one_time_keyboard": false
    })
}

fn remove_keyboard() -> Value {
    serde_json::json!({ "remove_keyboard": true })
}

// ── Update parsing ──────────────────────────────────────────────────

struct ParsedUpdate {
    incoming: Incoming,
    /// Present for callback queries; must be answered to clear the spinner.
    callback_id: Option<String>,
}

/// Narrow one Bot API update to an [`Incoming`] event, or `None` for
/// update kinds the bot never asked for.
fn parse_update(update: &Value) -> Option<ParsedUpdate> {
    if let Some(query) = update.get("callback_query") {
        let user = parse_user(query.get("from")?)?;
        let chat = query
            .get("message")
            .and_then(|m| m.get("chat"))
            .and_then(|c| c.get("id"))
            .and_then(Value::as_i64)
            .unwrap_or(user.id);
        let code = query.get("data").and_then(Value::as_str)?.to_string();
        let callback_id = query.get("id").and_then(Value::as_str).map(String::from);
        return Some(ParsedUpdate {
            incoming: Incoming {
                chat,
                user,
                event: Event::CategorySelected { code },
            },
            callback_id,
        });
    }

    let message = update.get("message")?;
    let user = parse_user(message.get("from")?)?;
    let chat = message
        .get("chat")
        .and_then(|c| c.get("id"))
        .and_then(Value::as_i64)
        .unwrap_or(user.id);

    let event = if let Some(number) = message
        .get("contact")
        .and_then(|c| c.get("phone_number"))
        .and_then(Value::as_str)
    {
        Event::ContactShared {
            raw_number: number.to_string(),
        }
    } else if let Some(text) = message.get("text").and_then(Value::as_str) {
        match command_of(text) {
            Some("start") => Event::Start,
            Some("cancel") => Event::Cancel,
            Some(_) => Event::Other,
            None => Event::Text {
                text: text.to_string(),
            },
        }
    } else {
        Event::Other
    };

    Some(ParsedUpdate {
        incoming: Incoming { chat, user, event },
        callback_id: None,
    })
}

fn parse_user(from: &Value) -> Option<UserInfo> {
    let id = from.get("id").and_then(Value::as_i64)?;
    let text_field = |key: &str| {
        from.get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(String::from)
    };
    let first_name = text_field("first_name");
    let last_name = text_field("last_name");
    let full_name = match (&first_name, &last_name) {
        (Some(f), Some(l)) => Some(format!("{f} {l}")),
        (Some(f), None) => Some(f.clone()),
        (None, Some(l)) => Some(l.clone()),
        (None, None) => None,
    };
    Some(UserInfo {
        id,
        first_name,
        full_name,
        username: text_field("username"),
    })
}

/// Extract the command name from a `/command` or `/command@bot` message.
fn command_of(text: &str) -> Option<&str> {
    let first = text.split_whitespace().next()?;
    let cmd = first.strip_prefix('/')?;
    cmd.split('@').next()
}

// ── Tests ───────────────────────────────────────────────────────────
