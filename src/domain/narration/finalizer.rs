use super::checkpoint::CheckpointStore;
use super::error::NarrationError;
use crate::infrastructure::storage::{Artifact, BlobStore, DocumentKey};
use std::sync::Arc;

/// Promotes the checkpoint to the final audio artifact
pub struct Finalizer {
    blob_store: Arc<dyn BlobStore>,
    checkpoints: Arc<CheckpointStore>,
}

impl Finalizer {
    pub fn new(blob_store: Arc<dyn BlobStore>, checkpoints: Arc<CheckpointStore>) -> Self {
        Self {
            blob_store,
            checkpoints,
        }
    }

    /// Write the checkpoint unmodified as the final artifact, then delete it.
    /// If the write fails the checkpoint is left in place.
    pub async fn finalize(&self, key: &DocumentKey) -> Result<usize, NarrationError> {
        let audio = self.checkpoints.read_checkpoint(key).await?.ok_or_else(|| {
            NarrationError::InvariantViolation(format!("no checkpoint to finalize for {}", key))
        })?;
        let audio_size = audio.len();

        self.blob_store
            .put(&key.artifact(Artifact::Audio), audio, Artifact::Audio.content_type())
            .await?;

        self.checkpoints.delete_checkpoint(key).await?;

        tracing::info!(document = %key, audio_size_bytes = audio_size, "Final audio written");
        Ok(audio_size)
    }
}
