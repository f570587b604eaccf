use super::error::NarrationError;
use crate::infrastructure::storage::{Artifact, BlobStore, DocumentKey};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// How much of the checkpoint is durably accounted for.
///
/// Written after every checkpoint append. `checkpoint_bytes` is the
/// checkpoint length once the first `chunks_completed` chunks were appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Watermark {
    pub chunks_completed: usize,
    pub checkpoint_bytes: usize,
    pub chunk_size: usize,
    pub total_chunks: usize,
}

/// Append-only scratch audio for a document, plus its watermark
pub struct CheckpointStore {
    blob_store: Arc<dyn BlobStore>,
}

impl CheckpointStore {
    pub fn new(blob_store: Arc<dyn BlobStore>) -> Self {
        Self { blob_store }
    }

    /// `None` means no progress has been recorded yet
    pub async fn read_checkpoint(&self, key: &DocumentKey) -> Result<Option<Vec<u8>>, NarrationError> {
        Ok(self.blob_store.get(&key.artifact(Artifact::AudioScratch)).await?)
    }

    /// Read-modify-write append. Single writer per document is assumed.
    /// Returns the checkpoint length after the append.
    pub async fn append_checkpoint(&self, key: &DocumentKey, bytes: &[u8]) -> Result<usize, NarrationError> {
        let scratch_key = key.artifact(Artifact::AudioScratch);
        let mut content = self.blob_store.get(&scratch_key).await?.unwrap_or_default();
        content.extend_from_slice(bytes);
        let total = content.len();

        self.blob_store
            .put(&scratch_key, content, Artifact::AudioScratch.content_type())
            .await?;

        tracing::debug!(
            document = %key,
            appended_bytes = bytes.len(),
            checkpoint_bytes = total,
            "Checkpoint appended"
        );
        Ok(total)
    }

    /// Removes the checkpoint and its watermark. Missing objects are fine.
    pub async fn delete_checkpoint(&self, key: &DocumentKey) -> Result<(), NarrationError> {
        self.blob_store.delete(&key.artifact(Artifact::AudioScratch)).await?;
        self.blob_store.delete(&key.artifact(Artifact::AudioProgress)).await?;
        Ok(())
    }

    pub async fn read_watermark(&self, key: &DocumentKey) -> Result<Option<Watermark>, NarrationError> {
        let Some(bytes) = self.blob_store.get(&key.artifact(Artifact::AudioProgress)).await? else {
            return Ok(None);
        };

        match serde_json::from_slice(&bytes) {
            Ok(watermark) => Ok(Some(watermark)),
            Err(e) => {
                tracing::warn!(document = %key, error = %e, "Unreadable watermark, ignoring it");
                Ok(None)
            }
        }
    }

    pub async fn write_watermark(&self, key: &DocumentKey, watermark: &Watermark) -> Result<(), NarrationError> {
        let bytes = serde_json::to_vec(watermark).map_err(|e| NarrationError::Other(e.into()))?;
        self.blob_store
            .put(
                &key.artifact(Artifact::AudioProgress),
                bytes,
                Artifact::AudioProgress.content_type(),
            )
            .await?;
        Ok(())
    }

    /// Number of chunks whose audio the checkpoint already holds.
    ///
    /// Reconciles watermark and checkpoint so the checkpoint is an exact
    /// prefix of the final audio: bytes appended after the last watermark
    /// write are cut off, and any state that cannot be trusted is discarded.
    pub async fn resume_point(
        &self,
        key: &DocumentKey,
        chunk_size: usize,
        total_chunks: usize,
    ) -> Result<usize, NarrationError> {
        let watermark = self.read_watermark(key).await?;
        let checkpoint = self.read_checkpoint(key).await?;

        match (watermark, checkpoint) {
            (None, None) => Ok(0),
            (Some(w), Some(bytes))
                if w.chunk_size == chunk_size
                    && w.total_chunks == total_chunks
                    && w.chunks_completed <= total_chunks
                    && bytes.len() >= w.checkpoint_bytes =>
            {
                if bytes.len() > w.checkpoint_bytes {
                    tracing::warn!(
                        document = %key,
                        checkpoint_bytes = bytes.len(),
                        recorded_bytes = w.checkpoint_bytes,
                        "Checkpoint has unrecorded audio, truncating to watermark"
                    );
                    let mut bytes = bytes;
                    bytes.truncate(w.checkpoint_bytes);
                    self.blob_store
                        .put(
                            &key.artifact(Artifact::AudioScratch),
                            bytes,
                            Artifact::AudioScratch.content_type(),
                        )
                        .await?;
                }
                Ok(w.chunks_completed)
            }
            (watermark, checkpoint) => {
                tracing::warn!(
                    document = %key,
                    watermark = ?watermark,
                    checkpoint_bytes = ?checkpoint.as_ref().map(|c| c.len()),
                    chunk_size,
                    total_chunks,
                    "Scratch state does not match the text, restarting from the first chunk"
                );
                self.delete_checkpoint(key).await?;
                Ok(0)
            }
        }
    }
}
