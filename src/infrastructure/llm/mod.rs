//! Generative backends for the advisory agent

pub mod openai_client;

pub use openai_client::OpenAiClient;

use async_trait::async_trait;

use crate::domain::advisory::ChatMessage;
use crate::shared::errors::AdvisoryError;

/// Chat-completion style text generator
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Return the assistant reply for the given conversation
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, AdvisoryError>;
}
