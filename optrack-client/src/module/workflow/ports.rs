use async_trait::async_trait;

/// Decision port for soft warnings. The workflow never talks to a terminal
/// or a page directly; whoever drives it supplies the implementation.
#[async_trait]
pub trait ConfirmationPort: Send + Sync {
    /// Present `prompt` to the user and return their decision.
    async fn confirm(&self, prompt: &str) -> bool;
}
