use crate::conversation::store::SessionStore;
use crate::conversation::types::{Message, Role};
use tracing::{debug, error, info};

/// Maintains one session's message log in memory, enforces the retention
/// policy, and mirrors every mutation to the session record on disk unless
/// saving is disabled.
///
/// The manager exclusively owns its log; one manager per session id, no
/// cross-session coordination. Storage problems never surface to callers:
/// a failed load degrades to an empty log and a failed save leaves the
/// in-memory state authoritative.
pub struct ConversationManager {
    session_id: String,
    max_history: usize,
    save_history: bool,
    log: Vec<Message>,
    store: SessionStore,
}

impl ConversationManager {
    /// Opens the conversation for a session id, eagerly adopting any prior
    /// record. Missing or malformed records yield an empty log.
    pub fn open(
        store: SessionStore,
        session_id: impl Into<String>,
        max_history: usize,
        save_history: bool,
    ) -> Self {
        let session_id = session_id.into();
        let log = store.load(&session_id);
        info!(
            session_id = %session_id,
            messages = log.len(),
            max_history,
            save_history,
            "Conversation opened"
        );
        Self {
            session_id,
            max_history,
            save_history,
            log,
            store,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn len(&self) -> usize {
        self.log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    /// True when the first message is the pinned system prompt.
    pub fn has_system_prompt(&self) -> bool {
        self.log.first().is_some_and(Message::is_system)
    }

    /// Appends one turn at the end of the log, applies the retention policy,
    /// then flushes the record if saving is enabled.
    pub fn append(&mut self, role: Role, content: impl Into<String>) {
        self.log.push(Message::new(role, content));
        self.apply_retention();
        self.flush_if_enabled();
    }

    /// Current ordered log, oldest first. Includes the pinned system prompt
    /// and any injected context messages; usable directly as a chat request
    /// payload.
    pub fn get_messages(&self) -> &[Message] {
        &self.log
    }

    /// Clears the log. With `keep_system` set and a pinned system prompt in
    /// first position, only that message survives; otherwise the log empties
    /// entirely. Flushes the record if saving is enabled.
    pub fn clear(&mut self, keep_system: bool) {
        if keep_system && self.has_system_prompt() {
            self.log.truncate(1);
        } else {
            self.log.clear();
        }
        info!(session_id = %self.session_id, keep_system, "Conversation history cleared");
        self.flush_if_enabled();
    }

    /// Explicit flush of the current log to the session record. Idempotent,
    /// safe to call redundantly as a terminal flush at shutdown. No-op when
    /// saving is disabled.
    pub fn persist(&self) {
        self.flush_if_enabled();
    }

    /// Bounds the log after an append. The first message, when it is the
    /// system prompt, is detached before counting and reinserted at index 0
    /// afterwards; it is never evicted. Everything else is dropped oldest
    /// first until at most `max_history - 1` entries remain beside it
    /// (`max_history` when no system prompt is pinned).
    fn apply_retention(&mut self) {
        if self.log.len() <= self.max_history {
            return;
        }

        let pinned = if self.has_system_prompt() {
            Some(self.log.remove(0))
        } else {
            None
        };

        let retain = self
            .max_history
            .saturating_sub(usize::from(pinned.is_some()));
        if self.log.len() > retain {
            let excess = self.log.len() - retain;
            self.log.drain(..excess);
            debug!(
                session_id = %self.session_id,
                dropped = excess,
                "Trimmed oldest messages"
            );
        }

        if let Some(pinned) = pinned {
            self.log.insert(0, pinned);
        }
    }

    fn flush_if_enabled(&self) {
        if !self.save_history {
            return;
        }
        if let Err(e) = self.store.save(&self.session_id, &self.log) {
            error!(
                session_id = %self.session_id,
                "Failed to save conversation history: {}", e
            );
        }
    }
}
