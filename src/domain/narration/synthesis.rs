use super::error::NarrationError;
use crate::infrastructure::repositories::{TtsRepository, VoiceProfile};
use std::sync::Arc;
use std::time::Duration;

/// Fixed-delay retry for synthesis calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Pause between two attempts, constant
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}

/// Synthesizes single chunks through the TTS provider, retrying failures
pub struct SynthesisClient {
    tts_repo: Arc<dyn TtsRepository>,
    voice: VoiceProfile,
    retry: RetryPolicy,
}

impl SynthesisClient {
    pub fn new(tts_repo: Arc<dyn TtsRepository>, voice: VoiceProfile, retry: RetryPolicy) -> Self {
        Self {
            tts_repo,
            voice,
            retry,
        }
    }

    /// Synthesize `text`, making at most `max_attempts` provider calls.
    /// The last provider error is returned as [`NarrationError::Synthesis`].
    pub async fn synthesize(&self, text: &str) -> Result<Vec<u8>, NarrationError> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.tts_repo.synthesize(text, &self.voice).await {
                Ok(audio) => return Ok(audio),
                Err(e) if attempt < max_attempts => {
                    tracing::warn!(
                        error = %e,
                        attempt,
                        max_attempts,
                        retry_in_ms = self.retry.delay.as_millis() as u64,
                        "Synthesis attempt failed, retrying"
                    );
                    tokio::time::sleep(self.retry.delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::error!(error = %e, attempts = attempt, "Synthesis failed, retries exhausted");
                    return Err(NarrationError::Synthesis(e));
                }
            }
        }
    }
}
