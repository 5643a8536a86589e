//! Lead formatting and dispatch to the admin chat.

use std::sync::Arc;

use crate::channels::Transport;
use crate::error::DispatchError;

/// A completed submission: identity, chosen direction, contact phone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lead {
    pub user_id: i64,
    pub display_name: String,
    pub username: Option<String>,
    /// Selected catalog code.
    pub direction: String,
    /// Normalized phone.
    pub phone: String,
}

impl Lead {
    /// Fixed-layout admin notification. Every user-supplied field is escaped
    /// before inclusion; the direction is catalog-controlled but escaped too.
    pub fn to_admin_html(&self) -> String {
        let username = match self.username.as_deref() {
            Some(u) => format!("@{u}"),
            None => "нет username".to_string(),
        };
        format!(
            "🔔 <b>Новая заявка из Telegram-бота!</b>\n\
             ─────────────────────\n\
             👤 <b>Имя:</b> {}\n\
             🆔 <b>Telegram ID:</b> <code>{}</code>\n\
             🔗 <b>Username:</b> {}\n\
             📚 <b>Направление:</b> {}\n\
             📞 <b>Телефон:</b> <code>{}</code>\n\
             ─────────────────────",
            escape_html(&self.display_name),
            self.user_id,
            escape_html(&username),
            escape_html(&self.direction),
            escape_html(&self.phone),
        )
    }
}

/// Escape text for Telegram's HTML parse mode.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Delivers completed leads to the admin chat.
pub struct LeadDispatcher {
    transport: Arc<dyn Transport>,
}

impl LeadDispatcher {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Deliver the lead notification. Failures surface to the caller for
    /// logging only — the user already saw completion and that is never
    /// rolled back.
    pub async fn dispatch(&self, lead: &Lead) -> Result<(), DispatchError> {
        // Logged before delivery: the admin notification is at-most-once,
        // so the log line must not depend on it landing.
        tracing::info!(
            user_id = lead.user_id,
            direction = %lead.direction,
            phone = %lead.phone,
            "lead captured"
        );
        self.transport.notify_admin(&lead.to_admin_html()).await?;
        Ok(())
    }
}
