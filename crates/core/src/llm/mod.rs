pub mod error;
pub mod gemini;
pub mod json;

use crate::llm::gemini::GenerateContentResponse;

#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    /// Model name reported back to callers in the response metadata.
    fn model(&self) -> &str;

    /// Sends one grounded generation request. A non-success upstream status
    /// is returned as [`error::UpstreamStatusError`] inside the `anyhow::Error`.
    async fn generate_content(&self, prompt: &str) -> anyhow::Result<GenerateContentResponse>;
}
