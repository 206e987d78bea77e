//! Per-conversation session storage.
//!
//! Keyed, ephemeral, process-wide. Conversation identity is explicit and
//! mandatory: callers either present a known id or receive a freshly
//! minted conversation; there is no ambient default key.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Utc;
use uuid::Uuid;

use reserva_core::types::Conversation;

/// In-memory conversation store with TTL eviction.
///
/// Last-write-wins per id; access for one id is never torn by access for
/// another. Expired entries are dropped on read and by [`purge_expired`]
/// sweeps, bounding growth.
///
/// [`purge_expired`]: SessionStore::purge_expired
pub struct SessionStore {
    ttl_minutes: u32,
    sessions: Mutex<HashMap<Uuid, Conversation>>,
}

impl SessionStore {
    pub fn new(ttl_minutes: u32) -> Self {
        Self {
            ttl_minutes,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Mint a fresh conversation and store it.
    pub fn create(&self) -> Conversation {
        let conversation = Conversation::new();
        match self.sessions.lock() {
            Ok(mut sessions) => {
                sessions.insert(conversation.id, conversation.clone());
            }
            Err(e) => {
                tracing::error!("Session lock poisoned on create: {}", e);
            }
        }
        conversation
    }

    /// Fetch a conversation by id. Expired entries are removed and
    /// reported absent.
    pub fn get(&self, id: Uuid) -> Option<Conversation> {
        let mut sessions = match self.sessions.lock() {
            Ok(s) => s,
            Err(e) => {
                tracing::error!("Session lock poisoned on get: {}", e);
                return None;
            }
        };
        if let Some(conversation) = sessions.get(&id) {
            if self.is_expired(conversation) {
                sessions.remove(&id);
                tracing::debug!(conversation_id = %id, "Expired session evicted on access");
                return None;
            }
            return Some(conversation.clone());
        }
        None
    }

    /// Write a conversation back, stamping last activity. Last write wins.
    pub fn set(&self, mut conversation: Conversation) {
        conversation.last_activity_at = Utc::now().timestamp();
        match self.sessions.lock() {
            Ok(mut sessions) => {
                sessions.insert(conversation.id, conversation);
            }
            Err(e) => {
                tracing::error!("Session lock poisoned on set: {}", e);
            }
        }
    }

    /// Remove a conversation. Returns whether it existed.
    pub fn remove(&self, id: Uuid) -> bool {
        match self.sessions.lock() {
            Ok(mut sessions) => sessions.remove(&id).is_some(),
            Err(e) => {
                tracing::error!("Session lock poisoned on remove: {}", e);
                false
            }
        }
    }

    /// Drop every expired conversation, returning how many were evicted.
    pub fn purge_expired(&self) -> usize {
        let mut sessions = match self.sessions.lock() {
            Ok(s) => s,
            Err(e) => {
                tracing::error!("Session lock poisoned on purge: {}", e);
                return 0;
            }
        };
        let before = sessions.len();
        sessions.retain(|_, conversation| !self.is_expired(conversation));
        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::info!(evicted, "Purged expired sessions");
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_expired(&self, conversation: &Conversation) -> bool {
        let timeout_secs = i64::from(self.ttl_minutes) * 60;
        Utc::now().timestamp() - conversation.last_activity_at > timeout_secs
    }
}
