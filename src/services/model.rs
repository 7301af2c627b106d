use async_trait::async_trait;

use crate::error::Result;

/// A hosted chat-completion model.
///
/// One call, one reply: implementations do not retry, and a provider failure
/// surfaces immediately as an error.
#[async_trait]
pub trait ChatModel: Send + Sync + std::fmt::Debug {
    async fn invoke(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;
}
