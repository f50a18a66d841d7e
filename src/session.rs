use base64::Engine;
use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::Serialize;
use std::collections::HashMap;
use std::time;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// One conversation. Expiry is refreshed on every append, so a session
/// only dies after `ttl` of inactivity.
struct Session {
    expires: time::Instant,
    messages: Vec<ChatMessage>,
}

#[derive(Debug)]
pub enum SessionError {
    NotFound,
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            SessionError::NotFound => write!(f, "Session not found"),
        }
    }
}

impl std::error::Error for SessionError {}

/// In-memory conversation store keyed by generated session id. This is
/// the only mutable state in the process; the catalog itself is
/// read-only after load.
pub struct Store {
    entries: RwLock<HashMap<String, Session>>,
    ttl: time::Duration,
}

fn generate_session_id() -> String {
    let mut key = [0u8; 16];
    OsRng.fill_bytes(&mut key);
    // URL-safe so ids can ride in query strings unescaped
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(key)
}

impl Store {
    pub fn new(ttl: time::Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Create a fresh session and return its id.
    pub async fn create(&self) -> String {
        let id = generate_session_id();
        let session = Session {
            expires: time::Instant::now() + self.ttl,
            messages: Vec::new(),
        };
        self.entries.write().await.insert(id.clone(), session);
        id
    }

    /// Resolve a caller-supplied session id, falling back to a fresh
    /// session when the id is absent or has expired away.
    pub async fn get_or_create(&self, id: Option<&str>) -> String {
        if let Some(id) = id {
            if self.entries.read().await.contains_key(id) {
                return id.to_string();
            }
        }
        self.create().await
    }

    /// Append a message to a session, refreshing its expiry.
    pub async fn append(
        &self,
        id: &str,
        role: Role,
        content: String,
    ) -> Result<(), SessionError> {
        let mut entries = self.entries.write().await;
        let session = entries.get_mut(id).ok_or(SessionError::NotFound)?;
        session.messages.push(ChatMessage {
            role,
            content,
            created_at: Utc::now(),
        });
        session.expires = time::Instant::now() + self.ttl;
        Ok(())
    }

    /// The full message history of a session, oldest first.
    pub async fn history(
        &self,
        id: &str,
    ) -> Result<Vec<ChatMessage>, SessionError> {
        let entries = self.entries.read().await;
        let session = entries.get(id).ok_or(SessionError::NotFound)?;
        Ok(session.messages.clone())
    }

    pub async fn contains_key(&self, id: &str) -> bool {
        self.entries.read().await.contains_key(id)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub async fn remove(&self, id: &str) -> bool {
        self.entries.write().await.remove(id).is_some()
    }

    /// Drop expired sessions. Returns the number removed.
    pub async fn garbage_collect(&self) -> usize {
        let now = time::Instant::now();
        let mut entries = self.entries.write().await;
        let initial_count = entries.len();
        entries.retain(|_, session| session.expires > now);
        initial_count - entries.len()
    }
}
