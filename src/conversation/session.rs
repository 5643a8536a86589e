//! Per-user dialog state and the store that owns it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// The steps of the lead-capture dialog.
///
/// Progresses forward: AwaitingDirection → AwaitingPhone → done (session
/// cleared). The one back edge is AwaitingPhone → AwaitingDirection via the
/// explicit back button; `/start` and `/cancel` reset from anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    AwaitingDirection,
    AwaitingPhone,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::AwaitingDirection => "awaiting_direction",
            Self::AwaitingPhone => "awaiting_phone",
        };
        write!(f, "{s}")
    }
}

/// One user's dialog progress and captured answers.
///
/// Invariant: `stage == AwaitingPhone` implies `direction` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: i64,
    /// Resolved display name, never empty.
    pub display_name: String,
    pub stage: Stage,
    /// Selected catalog code, validated before it is stored.
    pub direction: Option<String>,
    /// Normalized phone, validated before it is stored.
    pub phone: Option<String>,
}

impl Session {
    /// Fresh session at the start of the dialog.
    pub fn new(user_id: i64, display_name: String) -> Self {
        Self {
            user_id,
            display_name,
            stage: Stage::AwaitingDirection,
            direction: None,
            phone: None,
        }
    }
}

/// In-memory session store, one entry per user id.
///
/// A user's events arrive serialized, so each key has a single logical
/// writer; the lock only coordinates access across users. Sessions have no
/// expiry — they live until `/start`, `/cancel`, or completion.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<i64, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, user_id: i64) -> Option<Session> {
        self.sessions.read().await.get(&user_id).cloned()
    }

    /// Store a session, replacing any prior one for the same user.
    pub async fn put(&self, session: Session) {
        self.sessions.write().await.insert(session.user_id, session);
    }

    pub async fn remove(&self, user_id: i64) -> Option<Session> {
        self.sessions.write().await.remove(&user_id)
    }
}
