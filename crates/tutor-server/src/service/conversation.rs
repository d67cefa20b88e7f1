//! In-memory conversation store.
//!
//! Conversations are keyed by the client-generated conversation id and
//! live only in process memory; they are lost on restart, which is an
//! accepted limitation of the system. Swapping in a persistent store
//! means replacing this module behind the same interface.
//!
//! Each entry carries its own mutex. Concurrent turns on the same id are
//! not a supported client pattern, but if they happen the per-id lock
//! serializes them: whole user/assistant pairs are appended atomically
//! and never interleave.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use jiff::Timestamp;
use tutor_proxy::{ChatMessage, RagDocument, render_rag_context};

use super::SystemPrompt;

/// Tracing target for conversation store operations.
const TRACING_TARGET: &str = "tutor_server::service::conversation";

/// Read-only data the exchange controller needs to run one turn.
#[derive(Debug, Clone)]
pub struct TurnSnapshot {
    /// System instruction including accumulated retrieval context.
    pub system: String,
    /// Number of prior user/assistant pairs in the history.
    pub lastk: usize,
}

#[derive(Debug)]
struct ConversationState {
    history: Vec<ChatMessage>,
    context: Vec<RagDocument>,
    created_at: Timestamp,
    last_active_at: Timestamp,
}

impl ConversationState {
    fn new(system: String) -> Self {
        let now = Timestamp::now();
        Self {
            history: vec![ChatMessage::system(system)],
            context: Vec::new(),
            created_at: now,
            last_active_at: now,
        }
    }

    /// Prior user/assistant pairs, excluding the system instruction.
    fn lastk(&self) -> usize {
        (self.history.len() - 1) / 2
    }
}

/// Store of per-conversation chat histories.
///
/// This type is cheap to clone and can be shared across threads.
#[derive(Clone)]
pub struct ConversationStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    prompt: SystemPrompt,
    max_turns: usize,
    conversations: RwLock<HashMap<String, Arc<Mutex<ConversationState>>>>,
}

impl std::fmt::Debug for ConversationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationStore")
            .field("max_turns", &self.inner.max_turns)
            .finish_non_exhaustive()
    }
}

impl ConversationStore {
    /// Creates a new store.
    ///
    /// `max_turns` caps the number of retained user/assistant pairs per
    /// conversation; the oldest non-system pair is evicted first.
    #[must_use]
    pub fn new(prompt: SystemPrompt, max_turns: usize) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                prompt,
                max_turns,
                conversations: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Returns the data needed to run a turn for this conversation.
    ///
    /// Unknown ids are treated as fresh conversations without creating an
    /// entry: just the base system instruction and zero prior pairs.
    pub fn snapshot(&self, conversation_id: &str) -> TurnSnapshot {
        let Some(entry) = self.find(conversation_id) else {
            return TurnSnapshot {
                system: self.inner.prompt.base(),
                lastk: 0,
            };
        };

        let state = entry.lock().expect("conversation lock poisoned");
        TurnSnapshot {
            system: self
                .inner
                .prompt
                .with_context(&render_rag_context(&state.context)),
            lastk: state.lastk(),
        }
    }

    /// Returns the ordered message history for this conversation.
    ///
    /// Unknown ids yield just the system instruction.
    pub fn history(&self, conversation_id: &str) -> Vec<ChatMessage> {
        let Some(entry) = self.find(conversation_id) else {
            return vec![ChatMessage::system(self.inner.prompt.base())];
        };

        let state = entry.lock().expect("conversation lock poisoned");
        state.history.clone()
    }

    /// Accumulates retrieved context for this conversation.
    ///
    /// The system instruction in the history is re-rendered to include
    /// all context retrieved so far, creating the conversation if needed.
    pub fn push_context(&self, conversation_id: &str, documents: Vec<RagDocument>) {
        if documents.is_empty() {
            return;
        }

        let entry = self.entry(conversation_id);
        let mut state = entry.lock().expect("conversation lock poisoned");
        state.context.extend(documents);

        let enhanced = self
            .inner
            .prompt
            .with_context(&render_rag_context(&state.context));
        state.history[0].set_content(enhanced);

        tracing::debug!(
            target: TRACING_TARGET,
            conversation_id = %conversation_id,
            accumulated = state.context.len(),
            "Accumulated retrieval context"
        );
    }

    /// Returns the rendered accumulated retrieval context.
    pub fn rag_context(&self, conversation_id: &str) -> String {
        let Some(entry) = self.find(conversation_id) else {
            return String::new();
        };

        let state = entry.lock().expect("conversation lock poisoned");
        render_rag_context(&state.context)
    }

    /// Appends a completed turn, creating the conversation if needed.
    ///
    /// Both messages are appended under the per-conversation lock, then
    /// the history is trimmed back to the retention cap.
    pub fn append_turn(&self, conversation_id: &str, user_text: &str, assistant_text: &str) {
        let entry = self.entry(conversation_id);
        let mut state = entry.lock().expect("conversation lock poisoned");

        state.history.push(ChatMessage::user(user_text));
        state.history.push(ChatMessage::assistant(assistant_text));
        state.last_active_at = Timestamp::now();

        let cap = 1 + 2 * self.inner.max_turns;
        while state.history.len() > cap {
            // Drop the oldest non-system user/assistant pair.
            state.history.drain(1..3);
        }

        tracing::debug!(
            target: TRACING_TARGET,
            conversation_id = %conversation_id,
            history_len = state.history.len(),
            "Appended turn"
        );
    }

    /// Returns when this conversation was created, if it exists.
    pub fn created_at(&self, conversation_id: &str) -> Option<Timestamp> {
        let entry = self.find(conversation_id)?;
        let state = entry.lock().expect("conversation lock poisoned");
        Some(state.created_at)
    }

    /// Returns when this conversation last completed a turn, if it exists.
    pub fn last_active_at(&self, conversation_id: &str) -> Option<Timestamp> {
        let entry = self.find(conversation_id)?;
        let state = entry.lock().expect("conversation lock poisoned");
        Some(state.last_active_at)
    }

    /// Returns the number of live conversations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .conversations
            .read()
            .expect("conversation map lock poisoned")
            .len()
    }

    /// Returns `true` if no conversation has been started.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn find(&self, conversation_id: &str) -> Option<Arc<Mutex<ConversationState>>> {
        let conversations = self
            .inner
            .conversations
            .read()
            .expect("conversation map lock poisoned");
        conversations.get(conversation_id).cloned()
    }

    fn entry(&self, conversation_id: &str) -> Arc<Mutex<ConversationState>> {
        if let Some(entry) = self.find(conversation_id) {
            return entry;
        }

        let mut conversations = self
            .inner
            .conversations
            .write()
            .expect("conversation map lock poisoned");
        conversations
            .entry(conversation_id.to_owned())
            .or_insert_with(|| {
                tracing::debug!(
                    target: TRACING_TARGET,
                    conversation_id = %conversation_id,
                    "Initialized new conversation"
                );
                Arc::new(Mutex::new(ConversationState::new(self.inner.prompt.base())))
            })
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use tutor_proxy::MessageRole;

    use super::*;

    fn store(max_turns: usize) -> ConversationStore {
        ConversationStore::new(SystemPrompt::from_text("system instruction"), max_turns)
    }

    #[test]
    fn unknown_id_yields_system_only() {
        let store = store(4);
        let history = store.history("missing");

        assert_eq!(history.len(), 1);
        assert_eq!(history[0].role(), MessageRole::System);
        assert!(store.is_empty());
    }

    #[test]
    fn turns_append_in_order() {
        let store = store(4);
        store.append_turn("c1", "user1", "assistant1");
        store.append_turn("c1", "user2", "assistant2");

        let history = store.history("c1");
        let roles: Vec<_> = history.iter().map(ChatMessage::role).collect();
        assert_eq!(roles, vec![
            MessageRole::System,
            MessageRole::User,
            MessageRole::Assistant,
            MessageRole::User,
            MessageRole::Assistant,
        ]);
        assert_eq!(history[1].content(), "user1");
        assert_eq!(history[4].content(), "assistant2");
    }

    #[test]
    fn history_is_capped_with_oldest_pair_evicted() {
        let store = store(2);
        for i in 0..3 {
            store.append_turn("c1", &format!("user{i}"), &format!("assistant{i}"));
        }

        let history = store.history("c1");
        assert_eq!(history.len(), 1 + 2 * 2);
        assert_eq!(history[0].role(), MessageRole::System);
        // The first pair was evicted.
        assert_eq!(history[1].content(), "user1");
    }

    #[test]
    fn lastk_counts_prior_pairs() {
        let store = store(4);
        assert_eq!(store.snapshot("c1").lastk, 0);

        store.append_turn("c1", "u", "a");
        assert_eq!(store.snapshot("c1").lastk, 1);
    }

    #[test]
    fn context_accumulates_into_system_message() {
        let store = store(4);
        store.push_context("c1", vec![RagDocument::new("Handout", vec![
            "chunk".into(),
        ])]);
        store.push_context("c1", vec![RagDocument::new("Notes", vec![])]);

        let snapshot = store.snapshot("c1");
        assert!(snapshot.system.starts_with("system instruction"));
        assert!(snapshot.system.contains("#1 Handout"));
        assert!(snapshot.system.contains("#2 Notes"));

        // The in-history system message carries the same enhancement.
        let history = store.history("c1");
        assert!(history[0].content().contains("#2 Notes"));
    }

    #[test]
    fn conversations_are_isolated() {
        let store = store(4);
        store.append_turn("c1", "question", "answer");

        assert_eq!(store.history("c2").len(), 1);
        assert_eq!(store.rag_context("c2"), "");
    }
}
