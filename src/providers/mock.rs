//! Mock chat provider for testing
//!
//! Provides a scriptable implementation of `ChatProvider` so conversation
//! handling can be tested without making API calls.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::conversation::Message;
use crate::providers::{ChatProvider, ProviderError};

/// Scriptable provider for tests
///
/// Replies are served in the order they were pushed. Errors can be queued
/// in between replies to simulate failing exchanges. When the queue is
/// empty, a fixed placeholder reply is returned.
pub struct MockChatProvider {
    /// Queued outcomes, served front to back
    replies: Mutex<VecDeque<Result<String, ProviderError>>>,
    /// Number of times complete() was called
    call_count: Mutex<usize>,
    /// Last message log passed to complete()
    last_messages: Mutex<Option<Vec<Message>>>,
}

impl MockChatProvider {
    /// Creates a mock with an empty reply queue
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            call_count: Mutex::new(0),
            last_messages: Mutex::new(None),
        }
    }

    /// Queues a successful reply
    pub fn push_reply(&self, content: impl Into<String>) {
        self.replies.lock().unwrap().push_back(Ok(content.into()));
    }

    /// Queues an error outcome
    pub fn push_error(&self, error: ProviderError) {
        self.replies.lock().unwrap().push_back(Err(error));
    }

    /// Returns the number of times complete() was called
    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    /// Returns the last message log passed to complete()
    pub fn last_messages(&self) -> Option<Vec<Message>> {
        self.last_messages.lock().unwrap().clone()
    }

    /// Clears queued replies and recorded calls
    pub fn reset(&self) {
        self.replies.lock().unwrap().clear();
        *self.call_count.lock().unwrap() = 0;
        *self.last_messages.lock().unwrap() = None;
    }
}

impl Default for MockChatProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ChatProvider for MockChatProvider {
    async fn complete(&self, messages: &[Message]) -> Result<String, ProviderError> {
        *self.call_count.lock().unwrap() += 1;
        *self.last_messages.lock().unwrap() = Some(messages.to_vec());

        match self.replies.lock().unwrap().pop_front() {
            Some(outcome) => outcome,
            None => Ok("Mock reply".to_string()),
        }
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    fn provider_name(&self) -> &'static str {
        "MockProvider"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replies_served_in_order() {
        let mock = MockChatProvider::new();
        mock.push_reply("first");
        mock.push_reply("second");

        let messages = vec![Message::user("hi")];
        assert_eq!(mock.complete(&messages).await.unwrap(), "first");
        assert_eq!(mock.complete(&messages).await.unwrap(), "second");
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn test_placeholder_when_queue_empty() {
        let mock = MockChatProvider::new();

        let reply = mock.complete(&[Message::user("hi")]).await.unwrap();
        assert_eq!(reply, "Mock reply");
    }

    #[tokio::test]
    async fn test_queued_error_is_returned() {
        let mock = MockChatProvider::new();
        mock.push_error(ProviderError::rate_limit("slow down", Some(2)));
        mock.push_reply("recovered");

        let messages = vec![Message::user("hi")];
        let err = mock.complete(&messages).await.unwrap_err();
        assert!(err.is_rate_limit());

        assert_eq!(mock.complete(&messages).await.unwrap(), "recovered");
    }

    #[tokio::test]
    async fn test_captures_last_messages() {
        let mock = MockChatProvider::new();
        mock.push_reply("ok");

        let messages = vec![Message::system("sys"), Message::user("question")];
        mock.complete(&messages).await.unwrap();

        let seen = mock.last_messages().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1].content, "question");
    }

    #[tokio::test]
    async fn test_reset_clears_state() {
        let mock = MockChatProvider::new();
        mock.push_reply("stale");
        mock.complete(&[Message::user("hi")]).await.unwrap();

        mock.reset();

        assert_eq!(mock.call_count(), 0);
        assert!(mock.last_messages().is_none());
        assert_eq!(
            mock.complete(&[Message::user("hi")]).await.unwrap(),
            "Mock reply"
        );
    }

    #[test]
    fn test_mock_implements_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MockChatProvider>();
    }
}
