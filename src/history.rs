//! Bounded per-session conversation history.
//!
//! Sessions live in a map of individually locked logs: appends to one
//! session serialise on that session's mutex, while other sessions proceed
//! independently. The map lock is only held to look a session up.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// Default number of turns kept per session.
pub const DEFAULT_MAX_TURNS: usize = 12;

/// Speaker of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Upper-case label used in prompts.
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Assistant => "ASSISTANT",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

type SessionLog = Arc<Mutex<VecDeque<ConversationTurn>>>;

/// In-memory store of session histories.
pub struct ConversationHistory {
    max_turns: usize,
    sessions: RwLock<HashMap<String, SessionLog>>,
}

impl ConversationHistory {
    /// Create a store that keeps the last `max_turns` turns per session.
    pub fn new(max_turns: usize) -> Self {
        Self {
            max_turns: max_turns.max(1),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Append a turn, dropping the oldest turns beyond the bound.
    pub fn append(&self, session_id: &str, role: Role, text: &str) {
        self.append_all(session_id, &[(role, text)]);
    }

    /// Append a user question and its answer as one step, so a concurrent
    /// `clear` or append never lands between them.
    pub fn append_exchange(&self, session_id: &str, question: &str, answer: &str) {
        self.append_all(session_id, &[(Role::User, question), (Role::Assistant, answer)]);
    }

    fn append_all(&self, session_id: &str, new_turns: &[(Role, &str)]) {
        let log = self.session(session_id);
        let mut turns = log.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Utc::now();
        turns.extend(new_turns.iter().map(|(role, text)| ConversationTurn {
            role: *role,
            text: text.to_string(),
            timestamp: now,
        }));
        while turns.len() > self.max_turns {
            turns.pop_front();
        }
    }

    /// Turns of `session_id` in chronological order; empty for unknown sessions.
    pub fn get(&self, session_id: &str) -> Vec<ConversationTurn> {
        let log = self
            .sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(session_id)
            .cloned();

        match log {
            Some(log) => log
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .iter()
                .cloned()
                .collect(),
            None => Vec::new(),
        }
    }

    /// Forget the turns of `session_id`. No-op if absent.
    ///
    /// The log is emptied under its own mutex rather than unmapped, so an
    /// append racing with the clear lands either before it or in the live log.
    pub fn clear(&self, session_id: &str) {
        let log = self
            .sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(session_id)
            .cloned();

        if let Some(log) = log {
            log.lock().unwrap_or_else(PoisonError::into_inner).clear();
        }
    }

    fn session(&self, session_id: &str) -> SessionLog {
        if let Some(log) = self
            .sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(session_id)
        {
            return log.clone();
        }

        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(session_id.to_string())
            .or_default()
            .clone()
    }
}

impl Default for ConversationHistory {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TURNS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_unknown_session_is_empty() {
        let history = ConversationHistory::default();
        assert!(history.get("nobody").is_empty());
    }

    #[test]
    fn test_append_keeps_order() {
        let history = ConversationHistory::default();
        history.append("s1", Role::User, "Was fusion discussed?");
        history.append("s1", Role::Assistant, "Yes.");

        let turns = history.get("s1");
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[0].text, "Was fusion discussed?");
        assert_eq!(turns[1].role, Role::Assistant);
        assert!(turns[0].timestamp <= turns[1].timestamp);
    }

    #[test]
    fn test_bound_drops_oldest_first() {
        let history = ConversationHistory::new(3);
        for i in 0..5 {
            history.append("s1", Role::User, &format!("turn {}", i));
        }

        let texts: Vec<String> = history.get("s1").into_iter().map(|t| t.text).collect();
        assert_eq!(texts, vec!["turn 2", "turn 3", "turn 4"]);
    }

    #[test]
    fn test_clear_is_idempotent_and_isolated() {
        let history = ConversationHistory::default();
        history.append("s1", Role::User, "hello");
        history.append("s2", Role::User, "hi");

        history.clear("s1");
        history.clear("s1");

        assert!(history.get("s1").is_empty());
        assert_eq!(history.get("s2").len(), 1);
    }

    #[test]
    fn test_exchange_stays_paired_across_clears() {
        let history = Arc::new(ConversationHistory::new(12));

        let writers: Vec<_> = (0..4)
            .map(|i| {
                let history = history.clone();
                thread::spawn(move || {
                    for n in 0..200 {
                        history.append_exchange("s1", &format!("q{}-{}", i, n), "a");
                    }
                })
            })
            .collect();
        let clearer = {
            let history = history.clone();
            thread::spawn(move || {
                for _ in 0..200 {
                    history.clear("s1");
                }
            })
        };

        for writer in writers {
            writer.join().unwrap();
        }
        clearer.join().unwrap();

        history.append_exchange("s1", "last question", "last answer");
        let turns = history.get("s1");
        assert_eq!(turns.len() % 2, 0);
        for pair in turns.chunks(2) {
            assert_eq!(pair[0].role, Role::User);
            assert_eq!(pair[1].role, Role::Assistant);
        }
        assert_eq!(turns[turns.len() - 1].text, "last answer");
    }

    #[test]
    fn test_concurrent_appends_respect_bound() {
        let history = Arc::new(ConversationHistory::new(12));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let history = history.clone();
                thread::spawn(move || {
                    let session = format!("s{}", i % 2);
                    for n in 0..50 {
                        history.append(&session, Role::User, &format!("{}-{}", i, n));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(history.get("s0").len(), 12);
        assert_eq!(history.get("s1").len(), 12);
    }

    #[test]
    fn test_role_labels() {
        assert_eq!(Role::User.label(), "USER");
        assert_eq!(Role::Assistant.to_string(), "assistant");
    }
}
