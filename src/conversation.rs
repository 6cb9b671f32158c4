//! In-memory conversation history for follow-up chat queries.
//!
//! The chat endpoint is stateless: a follow-up must resend every previous
//! turn. The cache is owned by one client and lives as long as it does.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Role codes used in the history array.
const ROLE_USER: i64 = 1;
const ROLE_ASSISTANT: i64 = 2;

/// Time source for turn timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Source of fresh conversation ids.
pub trait IdSource: Send + Sync {
    fn new_id(&self) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UuidSource;

impl IdSource for UuidSource {
    fn new_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub turn_number: usize,
    pub query: String,
    pub answer: String,
    pub recorded_at: DateTime<Utc>,
}

pub struct ConversationCache {
    turns: Mutex<HashMap<String, Vec<ConversationTurn>>>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdSource>,
}

impl Default for ConversationCache {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock), Arc::new(UuidSource))
    }
}

impl std::fmt::Debug for ConversationCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationCache")
            .field("conversations", &self.lock().len())
            .finish_non_exhaustive()
    }
}

impl ConversationCache {
    pub fn new(clock: Arc<dyn Clock>, ids: Arc<dyn IdSource>) -> Self {
        Self {
            turns: Mutex::new(HashMap::new()),
            clock,
            ids,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<ConversationTurn>>> {
        // A panic while holding the lock cannot leave a half-written turn.
        self.turns.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Fresh id for a new conversation.
    pub fn new_conversation_id(&self) -> String {
        self.ids.new_id()
    }

    /// Append a turn; returns its turn number.
    pub fn record(&self, conversation_id: &str, query: &str, answer: &str) -> usize {
        let recorded_at = self.clock.now();
        let mut map = self.lock();
        let turns = map.entry(conversation_id.to_string()).or_default();
        let turn_number = turns.len() + 1;
        turns.push(ConversationTurn {
            turn_number,
            query: query.to_string(),
            answer: answer.to_string(),
            recorded_at,
        });
        turn_number
    }

    /// History in the wire shape `[[answer, null, 2], [query, null, 1], ...]`,
    /// oldest turn first. `None` when the conversation has no turns.
    pub fn history(&self, conversation_id: &str) -> Option<Value> {
        let map = self.lock();
        let turns = map.get(conversation_id).filter(|t| !t.is_empty())?;
        let entries: Vec<Value> = turns
            .iter()
            .flat_map(|t| {
                [
                    json!([t.answer, null, ROLE_ASSISTANT]),
                    json!([t.query, null, ROLE_USER]),
                ]
            })
            .collect();
        Some(Value::Array(entries))
    }

    pub fn turns(&self, conversation_id: &str) -> Option<Vec<ConversationTurn>> {
        self.lock()
            .get(conversation_id)
            .filter(|t| !t.is_empty())
            .cloned()
    }

    pub fn turn_count(&self, conversation_id: &str) -> usize {
        self.lock().get(conversation_id).map_or(0, Vec::len)
    }

    /// Drop a conversation. Returns whether anything was removed.
    pub fn clear(&self, conversation_id: &str) -> bool {
        self.lock().remove(conversation_id).is_some()
    }
}
