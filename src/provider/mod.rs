mod gemini;

use crate::error::Result;

pub use gemini::GeminiProvider;

/// Trait implemented by every generative-language backend the proxy can
/// forward to.  The handler only sees this seam, so the JSON contract stays
/// the same whichever provider is plugged in.
#[async_trait::async_trait]
pub trait Provider: Send + Sync {
    /// Human-readable name of this provider (e.g. "Gemini API").
    fn name(&self) -> &str;

    /// Send `prompt` once and return the first generated text.
    ///
    /// Transport failures and non-2xx statuses map to
    /// `MentorError::ProviderTransport`; a 2xx body without generated text
    /// maps to `MentorError::ProviderResponse`.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

#[async_trait::async_trait]
impl Provider for GeminiProvider {
    fn name(&self) -> &str {
        "Gemini API"
    }
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.generate(prompt).await
    }
}
