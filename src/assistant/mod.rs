//! Text-generation assistant.
//!
//! Produces a short bullet summary and a list of suggested interview questions
//! from a submission's experience text. Generation itself is delegated to a
//! [`TextGenerator`]; this module owns the prompts, the request timeout and the
//! parsing fallbacks.

mod gemini;
mod parse;

pub use gemini::GeminiClient;
pub use parse::{
    finalize_questions, numbered_lines, parse_question_array, summary_bullets, QUESTION_PLACEHOLDER,
};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::AssistantConfig;

/// Assistant errors. All of them surface to clients as "upstream unavailable".
#[derive(Error, Debug)]
pub enum AssistantError {
    /// No API key configured.
    #[error("assistant is not configured")]
    NotConfigured,

    /// Request could not be sent or the response could not be read.
    #[error("request failed: {0}")]
    Http(String),

    /// Upstream answered with a non-success status.
    #[error("upstream returned status {0}")]
    Status(u16),

    /// Upstream answered without any text.
    #[error("empty response")]
    EmptyResponse,

    /// Upstream did not answer in time.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}

/// Opaque text-in, text-out generation service.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a completion for a prompt.
    async fn generate(&self, prompt: &str) -> Result<String, AssistantError>;
}

/// Summary and question generation over a [`TextGenerator`].
#[derive(Clone)]
pub struct Assistant {
    generator: Arc<dyn TextGenerator>,
    timeout: Duration,
    question_count: usize,
}

impl Assistant {
    /// Create an assistant.
    pub fn new(generator: Arc<dyn TextGenerator>, timeout: Duration, question_count: usize) -> Self {
        Self {
            generator,
            timeout,
            question_count: question_count.max(1),
        }
    }

    /// Build the HTTP-backed assistant from configuration.
    pub fn from_config(config: &AssistantConfig) -> Result<Self, AssistantError> {
        let client = GeminiClient::new(config)?;
        Ok(Self::new(
            Arc::new(client),
            Duration::from_secs(config.timeout_secs),
            config.question_count,
        ))
    }

    /// Number of questions returned by [`Assistant::suggest_questions`].
    pub fn question_count(&self) -> usize {
        self.question_count
    }

    /// Summarize an experience in three or four bullet lines.
    pub async fn summarize(&self, experience: &str) -> Result<String, AssistantError> {
        let prompt = format!(
            "Summarize the following interview experience in 3 to 4 concise bullet points.\n\
             Output only bullet points using \"-\" at start of each line. No extra text.\n\n\
             Interview experience:\n{experience}"
        );
        debug!(input_len = experience.len(), "generating summary");
        let raw = self.generate(&prompt).await?;
        Ok(summary_bullets(&raw))
    }

    /// Suggest exactly `question_count` questions to prepare.
    ///
    /// Asks for a JSON array first. If that request fails or the answer is not
    /// an array, asks again for a numbered list and splits it by line.
    pub async fn suggest_questions(&self, experience: &str) -> Result<Vec<String>, AssistantError> {
        let n = self.question_count;
        let prompt = format!(
            "Based on the following interview experience, generate exactly {n} interview \
             questions a candidate should prepare.\nMix technical and behavioral.\n\
             Return ONLY JSON array of {n} strings.\n\nInterview experience:\n{experience}"
        );

        let first_error = match self.generate(&prompt).await {
            Ok(raw) => match parse_question_array(&raw) {
                Some(questions) => return Ok(finalize_questions(questions, n)),
                None => {
                    debug!("question answer was not a JSON array; retrying as numbered list");
                    None
                }
            },
            Err(e) => {
                warn!(error = %e, "question generation failed; retrying as numbered list");
                Some(e)
            }
        };

        let fallback_prompt = format!(
            "List exactly {n} interview questions based on this experience. \
             One per line numbered 1 to {n}.\n\n{experience}"
        );
        match self.generate(&fallback_prompt).await {
            Ok(raw) => Ok(finalize_questions(numbered_lines(&raw), n)),
            Err(e) => Err(first_error.unwrap_or(e)),
        }
    }

    async fn generate(&self, prompt: &str) -> Result<String, AssistantError> {
        let text = tokio::time::timeout(self.timeout, self.generator.generate(prompt))
            .await
            .map_err(|_| AssistantError::Timeout(self.timeout))??;
        let text = text.trim();
        if text.is_empty() {
            return Err(AssistantError::EmptyResponse);
        }
        Ok(text.to_string())
    }
}
