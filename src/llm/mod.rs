//! Text-generation integration.
//!
//! The profile deriver talks to a `GenerationService`; the only production
//! backend is Gemini with Google-Search grounding (see [`gemini`]).

pub mod gemini;

pub use gemini::GeminiClient;

use async_trait::async_trait;

use crate::error::LlmError;

/// A single prompt sent to a generation service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub prompt: String,
    /// Let the model run live web searches while answering.
    pub web_search: bool,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            web_search: false,
        }
    }

    pub fn with_web_search(mut self) -> Self {
        self.web_search = true;
        self
    }
}

/// A remote text-generation backend.
///
/// Returns the raw text of the first candidate. No schema is enforced.
#[async_trait]
pub trait GenerationService: Send + Sync {
    fn model_name(&self) -> &str;

    async fn generate(&self, request: GenerationRequest) -> Result<String, LlmError>;
}
