//! Chat engine tying the conversation log to a completion provider
//!
//! The engine owns one session's `ConversationManager` and a shared
//! `ChatProvider`. Every exchange flows through the log: the user turn is
//! appended first, the full log is sent to the provider, and the assistant
//! reply is appended on success. Provider failures are logged and mapped to
//! a spoken-friendly apology so the caller always has something to say.

use std::sync::Arc;

use tracing::{error, info};

use crate::conversation::{ConversationManager, Message, Role};
use crate::providers::{ChatProvider, ProviderError};

/// Reply for blank or whitespace-only input
const EMPTY_INPUT_REPLY: &str = "I didn't catch that. Could you please repeat?";

/// Maps a provider failure to the reply the assistant gives the user
fn apology_for(error: &ProviderError) -> &'static str {
    match error {
        ProviderError::RateLimit { .. } => {
            "I'm currently handling too many requests. Please try again in a moment."
        }
        ProviderError::Api { .. } | ProviderError::EmptyResponse => {
            "I encountered an issue while processing your request. Please try again later."
        }
        ProviderError::Network { .. } | ProviderError::Timeout { .. } => {
            "I'm having trouble connecting to my knowledge base. Please try again later."
        }
        _ => "I'm experiencing technical difficulties. Please try again later.",
    }
}

/// Conversation-aware front end over a chat completion provider
pub struct ChatEngine {
    provider: Arc<dyn ChatProvider>,
    conversation: ConversationManager,
}

impl ChatEngine {
    /// Creates an engine for one session
    ///
    /// When the log has no leading system message, the given system prompt
    /// is added so the first exchange already carries the assistant persona.
    /// Sessions restored from disk keep their existing prompt.
    pub fn new(
        provider: Arc<dyn ChatProvider>,
        mut conversation: ConversationManager,
        system_prompt: &str,
    ) -> Self {
        if !system_prompt.is_empty() && !conversation.has_system_prompt() {
            conversation.append(Role::System, system_prompt);
        }

        info!(
            model = provider.model(),
            session_id = conversation.session_id(),
            "Chat engine initialized"
        );

        Self {
            provider,
            conversation,
        }
    }

    /// Returns the model identifier the provider is configured with
    pub fn model(&self) -> &str {
        self.provider.model()
    }

    /// Returns the session id of the underlying conversation
    pub fn session_id(&self) -> &str {
        self.conversation.session_id()
    }

    /// Returns the current conversation log
    pub fn messages(&self) -> &[Message] {
        self.conversation.get_messages()
    }

    /// Processes one user turn and returns the assistant's reply
    ///
    /// Blank input is answered with a canned prompt to repeat, without
    /// touching the log. On provider failure the user turn stays in the log,
    /// no assistant turn is appended, and a canned apology is returned.
    pub async fn respond(&mut self, user_input: &str) -> String {
        self.respond_with_context(user_input, &[]).await
    }

    /// Like `respond`, with retrieved context passages injected ahead of the
    /// user turn
    ///
    /// Non-empty passages are joined and appended as one system-role message.
    /// Context messages are ordinary log entries: they age out of the window
    /// like any other turn.
    pub async fn respond_with_context(&mut self, user_input: &str, context: &[String]) -> String {
        if user_input.trim().is_empty() {
            return EMPTY_INPUT_REPLY.to_string();
        }

        if !context.is_empty() {
            let context_text = context.join("\n\n");
            let context_message = format!(
                "Additional context information:\n{}\n\nPlease use this information to help answer the user's question if relevant.",
                context_text
            );
            self.conversation.append(Role::System, context_message);
        }

        self.conversation.append(Role::User, user_input);

        match self
            .provider
            .complete(self.conversation.get_messages())
            .await
        {
            Ok(reply) => {
                self.conversation.append(Role::Assistant, reply.clone());
                reply
            }
            Err(err) => {
                error!(error = %err, "Chat completion failed");
                apology_for(&err).to_string()
            }
        }
    }

    /// Clears the conversation, optionally keeping the pinned system prompt
    pub fn clear(&mut self, keep_system_prompt: bool) {
        self.conversation.clear(keep_system_prompt);
        info!("Conversation history cleared");
    }

    /// Flushes the conversation record before shutdown
    pub fn finish(&self) {
        info!(
            session_id = self.conversation.session_id(),
            "Chat engine shutting down"
        );
        self.conversation.persist();
    }
}
