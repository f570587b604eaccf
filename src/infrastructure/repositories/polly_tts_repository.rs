use super::tts_repository::{TtsRepository, VoiceProfile};
use async_trait::async_trait;
use aws_sdk_polly::{
    types::{Engine, OutputFormat, VoiceId},
    Client as PollyClient,
};
use std::sync::Arc;

/// AWS Polly has a limit of 3000 characters per request
pub const MAX_REQUEST_CHARS: usize = 3000;

/// AWS Polly implementation of TTS repository
pub struct PollyTtsRepository {
    polly_client: Arc<PollyClient>,
}

impl PollyTtsRepository {
    pub fn new(polly_client: Arc<PollyClient>) -> Self {
        Self { polly_client }
    }

    fn validate_request(text: &str) -> Result<(), String> {
        if text.trim().is_empty() {
            return Err("Text cannot be empty".to_string());
        }
        let char_count = text.chars().count();
        if char_count > MAX_REQUEST_CHARS {
            return Err(format!(
                "Text has {} characters, Polly accepts at most {}",
                char_count, MAX_REQUEST_CHARS
            ));
        }
        Ok(())
    }

    fn preview(text: &str) -> &str {
        match text.char_indices().nth(200) {
            Some((idx, _)) => &text[..idx],
            None => text,
        }
    }
}

#[async_trait]
impl TtsRepository for PollyTtsRepository {
    async fn synthesize(&self, text: &str, voice: &VoiceProfile) -> Result<Vec<u8>, String> {
        Self::validate_request(text)?;

        let start_time = std::time::Instant::now();
        let voice_id = VoiceId::from(voice.voice_id.as_str());
        let engine = Engine::from(voice.engine.as_str());

        tracing::debug!(
            voice_id = ?voice_id,
            engine = ?engine,
            output_format = "Mp3",
            text_length = text.len(),
            text_preview = Self::preview(text),
            "Calling AWS Polly synthesize_speech"
        );

        let result = self
            .polly_client
            .synthesize_speech()
            .text(text)
            .voice_id(voice_id.clone())
            .output_format(OutputFormat::Mp3)
            .engine(engine.clone())
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = ?e,
                    error_display = %e,
                    voice_id = ?voice_id,
                    engine = ?engine,
                    text_length = text.len(),
                    "AWS Polly synthesize_speech failed"
                );
                format!("AWS Polly error: {}", e)
            })?;

        let audio_stream = result.audio_stream.collect().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to collect audio stream from Polly response");
            format!("Failed to read audio stream: {}", e)
        })?;

        let audio_bytes = audio_stream.into_bytes().to_vec();

        tracing::debug!(
            provider = "polly",
            latency_ms = start_time.elapsed().as_millis() as u64,
            characters_count = text.len(),
            audio_size_bytes = audio_bytes.len(),
            "Polly synthesis completed"
        );

        Ok(audio_bytes)
    }
}
