use super::budget::ExecutionBudget;
use super::checkpoint::{CheckpointStore, Watermark};
use super::chunker::TextChunker;
use super::error::NarrationError;
use super::extraction::strip_chunk_markers;
use super::finalizer::Finalizer;
use super::synthesis::SynthesisClient;
use crate::infrastructure::storage::{Artifact, BlobStore, DocumentKey};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Lifecycle of a document's narration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SynthesisState {
    NotStarted,
    Running,
    /// Suspended with progress saved, waiting to be invoked again
    Checkpointed,
    Failed,
    Complete,
}

impl SynthesisState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SynthesisState::Failed | SynthesisState::Complete)
    }
}

/// How a driver invocation ended when it did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationOutcome {
    /// Budget ran low; call again with the same document
    Checkpointed {
        chunks_completed: usize,
        total_chunks: usize,
    },
    Complete {
        total_chunks: usize,
        audio_size_bytes: usize,
    },
}

impl InvocationOutcome {
    pub fn state(&self) -> SynthesisState {
        match self {
            InvocationOutcome::Checkpointed { .. } => SynthesisState::Checkpointed,
            InvocationOutcome::Complete { .. } => SynthesisState::Complete,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverSettings {
    /// Target chunk size handed to the TTS provider
    pub chunk_size: usize,
    /// Chunks buffered in memory between two checkpoint appends
    pub checkpoint_interval: usize,
    /// Stop and checkpoint once the budget is at or below this
    pub safety_threshold: Duration,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            chunk_size: 1500,
            checkpoint_interval: 10,
            safety_threshold: Duration::from_secs(60),
        }
    }
}

/// Runs one time-bounded synthesis invocation for a document.
///
/// Holds no per-document state: everything needed to resume is read back
/// from the blob store at the start of each invocation.
pub struct SynthesisDriver {
    blob_store: Arc<dyn BlobStore>,
    synthesis: Arc<SynthesisClient>,
    checkpoints: Arc<CheckpointStore>,
    finalizer: Finalizer,
    settings: DriverSettings,
}

impl SynthesisDriver {
    pub fn new(
        blob_store: Arc<dyn BlobStore>,
        synthesis: Arc<SynthesisClient>,
        settings: DriverSettings,
    ) -> Self {
        let checkpoints = Arc::new(CheckpointStore::new(blob_store.clone()));
        let finalizer = Finalizer::new(blob_store.clone(), checkpoints.clone());
        Self {
            blob_store,
            synthesis,
            checkpoints,
            finalizer,
            settings,
        }
    }

    /// Observable state from durable storage alone
    pub async fn probe(&self, key: &DocumentKey) -> Result<SynthesisState, NarrationError> {
        if self.blob_store.exists(&key.artifact(Artifact::Audio)).await? {
            return Ok(SynthesisState::Complete);
        }
        if self.blob_store.exists(&key.artifact(Artifact::AudioScratch)).await? {
            return Ok(SynthesisState::Checkpointed);
        }
        Ok(SynthesisState::NotStarted)
    }

    /// Synthesize as many remaining chunks as the budget allows.
    ///
    /// Errors mean the invocation failed; the checkpoint written so far stays
    /// valid and the next invocation resumes from it.
    pub async fn run(
        &self,
        key: &DocumentKey,
        budget: &dyn ExecutionBudget,
    ) -> Result<InvocationOutcome, NarrationError> {
        let final_key = key.artifact(Artifact::Audio);
        if self.blob_store.exists(&final_key).await? {
            tracing::info!(document = %key, "Final audio already present, nothing to do");
            return Ok(InvocationOutcome::Complete {
                total_chunks: 0,
                audio_size_bytes: 0,
            });
        }

        let text = self.load_text(key).await?;
        let chunker = TextChunker::new(self.settings.chunk_size);
        let total_chunks = chunker.count(&text);
        if total_chunks == 0 {
            return Err(NarrationError::InvariantViolation(format!(
                "text derivative for {} is empty",
                key
            )));
        }

        let resume_from = self
            .checkpoints
            .resume_point(key, chunker.target_size(), total_chunks)
            .await?;

        tracing::info!(
            document = %key,
            total_chunks,
            resume_from,
            "Synthesis invocation started"
        );

        let mut batch = PendingBatch::default();
        for (index, chunk) in chunker.chunks(&text).enumerate().skip(resume_from) {
            let started = std::time::Instant::now();
            let audio = self.synthesis.synthesize(chunk).await.map_err(|e| {
                tracing::error!(
                    document = %key,
                    chunk_index = index,
                    pending_chunks = batch.chunks,
                    error = %e,
                    "Chunk synthesis failed, aborting invocation"
                );
                e
            })?;

            tracing::debug!(
                document = %key,
                chunk_index = index,
                chunk_chars = chunk.chars().count(),
                audio_size_bytes = audio.len(),
                latency_ms = started.elapsed().as_millis() as u64,
                "Chunk synthesized"
            );

            batch.push(audio);
            let chunks_completed = index + 1;

            if batch.chunks >= self.settings.checkpoint_interval || chunks_completed == total_chunks {
                self.flush(key, &mut batch, chunks_completed, total_chunks).await?;
            }

            let remaining = budget.remaining();
            if remaining <= self.settings.safety_threshold {
                self.flush(key, &mut batch, chunks_completed, total_chunks).await?;
                tracing::info!(
                    document = %key,
                    chunks_completed,
                    total_chunks,
                    remaining_budget_ms = remaining.as_millis() as u64,
                    "Execution budget nearly exhausted, checkpointed for re-invocation"
                );
                return Ok(InvocationOutcome::Checkpointed {
                    chunks_completed,
                    total_chunks,
                });
            }
        }

        let audio_size_bytes = self.finalizer.finalize(key).await?;
        tracing::info!(document = %key, total_chunks, audio_size_bytes, "Synthesis complete");

        Ok(InvocationOutcome::Complete {
            total_chunks,
            audio_size_bytes,
        })
    }

    async fn load_text(&self, key: &DocumentKey) -> Result<String, NarrationError> {
        let text_key = key.artifact(Artifact::Text);
        let bytes = self.blob_store.get(&text_key).await?.ok_or_else(|| {
            NarrationError::InvariantViolation(format!("text derivative missing for {}", key))
        })?;
        let stored = String::from_utf8(bytes)
            .map_err(|e| NarrationError::InvariantViolation(format!("text derivative is not UTF-8: {}", e)))?;
        Ok(strip_chunk_markers(&stored))
    }

    /// Append the pending batch and record the new watermark
    async fn flush(
        &self,
        key: &DocumentKey,
        batch: &mut PendingBatch,
        chunks_completed: usize,
        total_chunks: usize,
    ) -> Result<(), NarrationError> {
        if batch.chunks == 0 {
            return Ok(());
        }

        let checkpoint_bytes = self.checkpoints.append_checkpoint(key, &batch.audio).await?;
        self.checkpoints
            .write_watermark(
                key,
                &Watermark {
                    chunks_completed,
                    checkpoint_bytes,
                    chunk_size: self.settings.chunk_size.max(1),
                    total_chunks,
                },
            )
            .await?;

        tracing::info!(
            document = %key,
            flushed_chunks = batch.chunks,
            chunks_completed,
            total_chunks,
            checkpoint_bytes,
            "Checkpoint saved"
        );
        batch.clear();
        Ok(())
    }
}

/// Audio synthesized since the last checkpoint append
#[derive(Debug, Default)]
struct PendingBatch {
    audio: Vec<u8>,
    chunks: usize,
}

impl PendingBatch {
    fn push(&mut self, audio: Vec<u8>) {
        self.audio.extend(audio);
        self.chunks += 1;
    }

    fn clear(&mut self) {
        self.audio.clear();
        self.chunks = 0;
    }
}
