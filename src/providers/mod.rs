//! Chat completion providers for voxloop
//!
//! This module defines the trait and types for talking to chat completion
//! APIs. The assistant core only depends on the `ChatProvider` trait, so the
//! concrete backend can be swapped without touching conversation handling.
//!
//! # Example
//!
//! ```rust
//! use voxloop::conversation::Message;
//! use voxloop::providers::ChatProvider;
//!
//! async fn example(provider: &dyn ChatProvider) {
//!     let messages = vec![
//!         Message::system("You are a helpful insurance assistant."),
//!         Message::user("How do I file a claim?"),
//!     ];
//!
//!     let reply = provider.complete(&messages).await.unwrap();
//!     println!("Assistant: {reply}");
//! }
//! ```

pub mod error;
#[cfg(test)]
pub mod mock;
pub mod openai;

pub use error::ProviderError;
pub use openai::{OpenAiProvider, RetryPolicy};

use crate::conversation::Message;

/// Trait for chat completion backends
///
/// Implementations must be Send + Sync so a single provider can be shared
/// across async tasks.
#[async_trait::async_trait]
pub trait ChatProvider: Send + Sync {
    /// Sends the conversation log and returns the assistant's reply text
    ///
    /// # Arguments
    ///
    /// * `messages` - Ordered conversation log, oldest first, including any
    ///   pinned system prompt at index 0
    ///
    /// # Returns
    ///
    /// The reply content, or a `ProviderError` classifying what went wrong
    async fn complete(&self, messages: &[Message]) -> Result<String, ProviderError>;

    /// Returns the model identifier requests are made with
    fn model(&self) -> &str;

    /// Returns the provider name
    ///
    /// Used for logging and identification
    fn provider_name(&self) -> &'static str;
}

/// Type alias for a boxed ChatProvider trait object
pub type BoxedProvider = Box<dyn ChatProvider>;
