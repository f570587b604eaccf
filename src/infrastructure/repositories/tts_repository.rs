use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Voice used for every chunk of a narration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceProfile {
    pub voice_id: String,
    pub engine: String,
}

impl Default for VoiceProfile {
    fn default() -> Self {
        Self {
            voice_id: "Joanna".to_string(),
            engine: "standard".to_string(),
        }
    }
}

/// Repository for TTS synthesis operations.
/// Abstracts the underlying TTS provider.
///
/// Implementations synthesize exactly the text they are given: callers are
/// responsible for keeping each request under the provider's length limit.
#[async_trait]
pub trait TtsRepository: Send + Sync {
    /// Synthesize one unit of text to speech (MP3 format)
    ///
    /// # Errors
    /// Returns a provider-described error if the input is rejected or the
    /// provider is unavailable
    async fn synthesize(&self, text: &str, voice: &VoiceProfile) -> Result<Vec<u8>, String>;
}
