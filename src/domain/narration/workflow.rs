use super::budget::{BudgetProvider, CancellableBudget};
use super::driver::{DriverSettings, InvocationOutcome, SynthesisDriver, SynthesisState};
use super::error::NarrationError;
use super::extraction::TextExtractor;
use super::synthesis::{RetryPolicy, SynthesisClient};
use crate::infrastructure::config::NarrationSettings;
use crate::infrastructure::repositories::{TtsRepository, VoiceProfile};
use crate::infrastructure::storage::{Artifact, BlobStore, DocumentKey};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;

/// Failed and checkpointed outcomes kept for `status` before the oldest is dropped
const MAX_RETAINED_OUTCOMES: usize = 1024;

/// Last known state of a document's narration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NarrationProgress {
    pub state: SynthesisState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunks_completed: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_chunks: Option<usize>,
    pub invocations: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl NarrationProgress {
    fn new(state: SynthesisState) -> Self {
        Self {
            state,
            chunks_completed: None,
            total_chunks: None,
            invocations: 0,
            error: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    AlreadyComplete,
    AlreadyRunning,
    Started,
}

/// Owned by the task executing a run. Handing it back through
/// [`NarrationJobs::complete`] releases the document and wakes anyone
/// waiting in [`NarrationWorkflow::retire`].
#[derive(Debug)]
pub struct RunHandle {
    cancelled: Arc<AtomicBool>,
    done: watch::Sender<bool>,
}

impl RunHandle {
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
struct RunSignals {
    cancelled: Arc<AtomicBool>,
    done: watch::Receiver<bool>,
}

#[derive(Debug)]
struct JobEntry {
    progress: NarrationProgress,
    run: Option<RunSignals>,
    retiring: bool,
    finished_at: Option<Instant>,
}

/// In-process registry of narration runs; at most one active run per document.
///
/// Completed runs are dropped since storage alone answers for them. Failed and
/// checkpointed outcomes are kept up to a fixed number of documents.
#[derive(Debug)]
pub struct NarrationJobs {
    jobs: Mutex<HashMap<DocumentKey, JobEntry>>,
    max_retained: usize,
}

impl Default for NarrationJobs {
    fn default() -> Self {
        Self::with_retained(MAX_RETAINED_OUTCOMES)
    }
}

impl NarrationJobs {
    pub fn with_retained(max_retained: usize) -> Self {
        Self {
            jobs: Mutex::new(HashMap::new()),
            max_retained,
        }
    }

    /// Marks the document as running unless a run is active or the document
    /// is being retired
    pub fn try_begin(&self, key: &DocumentKey) -> Option<RunHandle> {
        let mut jobs = self.jobs.lock();
        if let Some(entry) = jobs.get(key) {
            if entry.run.is_some() || entry.retiring {
                return None;
            }
        }

        let cancelled = Arc::new(AtomicBool::new(false));
        let (done_tx, done_rx) = watch::channel(false);
        jobs.insert(
            key.clone(),
            JobEntry {
                progress: NarrationProgress::new(SynthesisState::Running),
                run: Some(RunSignals {
                    cancelled: cancelled.clone(),
                    done: done_rx,
                }),
                retiring: false,
                finished_at: None,
            },
        );
        Some(RunHandle {
            cancelled,
            done: done_tx,
        })
    }

    /// Progress of an active run; ignored once the document was forgotten
    pub fn update(&self, key: &DocumentKey, progress: NarrationProgress) {
        if let Some(entry) = self.jobs.lock().get_mut(key) {
            entry.progress = progress;
        }
    }

    /// Ends the run that owns `handle` with its final progress
    pub fn complete(&self, key: &DocumentKey, handle: RunHandle, progress: NarrationProgress) {
        {
            let mut jobs = self.jobs.lock();
            if let Some(entry) = jobs.get_mut(key) {
                if entry.retiring {
                    entry.run = None;
                } else if progress.state == SynthesisState::Complete {
                    jobs.remove(key);
                } else {
                    entry.progress = progress;
                    entry.run = None;
                    entry.finished_at = Some(Instant::now());
                    Self::evict_oldest(&mut jobs, self.max_retained);
                }
            }
        }
        let _ = handle.done.send(true);
    }

    pub fn get(&self, key: &DocumentKey) -> Option<NarrationProgress> {
        self.jobs.lock().get(key).map(|entry| entry.progress.clone())
    }

    /// Refuses new runs for the document and cancels the active one.
    /// The returned receiver turns `true` once that run has stopped.
    pub fn retire(&self, key: &DocumentKey) -> Option<watch::Receiver<bool>> {
        let mut jobs = self.jobs.lock();
        let entry = jobs.entry(key.clone()).or_insert_with(|| JobEntry {
            progress: NarrationProgress::new(SynthesisState::NotStarted),
            run: None,
            retiring: false,
            finished_at: None,
        });
        entry.retiring = true;
        entry.finished_at = None;
        entry.run.as_ref().map(|run| {
            run.cancelled.store(true, Ordering::SeqCst);
            run.done.clone()
        })
    }

    pub fn forget(&self, key: &DocumentKey) {
        self.jobs.lock().remove(key);
    }

    fn evict_oldest(jobs: &mut HashMap<DocumentKey, JobEntry>, max_retained: usize) {
        let retained = jobs.values().filter(|e| e.finished_at.is_some()).count();
        if retained <= max_retained {
            return;
        }
        let oldest = jobs
            .iter()
            .filter_map(|(key, entry)| entry.finished_at.map(|at| (at, key)))
            .min_by_key(|(at, _)| *at)
            .map(|(_, key)| key.clone());
        if let Some(key) = oldest {
            tracing::debug!(document = %key, "Dropping oldest retained narration outcome");
            jobs.remove(&key);
        }
    }
}

/// Local stand-in for the external orchestrator: extracts text once, then
/// invokes the synthesis driver with a fresh budget until it completes.
pub struct NarrationWorkflow {
    blob_store: Arc<dyn BlobStore>,
    extractor: Arc<TextExtractor>,
    driver: Arc<SynthesisDriver>,
    budgets: Arc<dyn BudgetProvider>,
    max_invocations: usize,
    jobs: NarrationJobs,
}

impl NarrationWorkflow {
    pub fn new(
        blob_store: Arc<dyn BlobStore>,
        extractor: Arc<TextExtractor>,
        driver: Arc<SynthesisDriver>,
        budgets: Arc<dyn BudgetProvider>,
        max_invocations: usize,
    ) -> Self {
        Self {
            blob_store,
            extractor,
            driver,
            budgets,
            max_invocations: max_invocations.max(1),
            jobs: NarrationJobs::default(),
        }
    }

    /// Wire extraction, synthesis and the driver from configuration
    pub fn from_settings(
        blob_store: Arc<dyn BlobStore>,
        tts_repo: Arc<dyn TtsRepository>,
        budgets: Arc<dyn BudgetProvider>,
        settings: &NarrationSettings,
    ) -> Self {
        let voice = VoiceProfile {
            voice_id: settings.polly_voice_id.clone(),
            engine: settings.polly_engine.clone(),
        };
        let retry = RetryPolicy {
            max_attempts: settings.synthesis_max_attempts,
            delay: settings.retry_delay(),
        };
        let synthesis = Arc::new(SynthesisClient::new(tts_repo, voice, retry));
        let driver = SynthesisDriver::new(
            blob_store.clone(),
            synthesis,
            DriverSettings {
                chunk_size: settings.audio_chunk_size,
                checkpoint_interval: settings.checkpoint_interval,
                safety_threshold: settings.safety_threshold(),
            },
        );
        let extractor = TextExtractor::new(blob_store.clone(), settings.text_chunk_size);

        Self::new(
            blob_store,
            Arc::new(extractor),
            Arc::new(driver),
            budgets,
            settings.max_invocations,
        )
    }

    /// Start a background run unless the audio exists or a run is active
    pub async fn start(self: &Arc<Self>, key: DocumentKey) -> Result<StartOutcome, NarrationError> {
        if self.driver.probe(&key).await? == SynthesisState::Complete {
            return Ok(StartOutcome::AlreadyComplete);
        }
        let Some(handle) = self.jobs.try_begin(&key) else {
            return Ok(StartOutcome::AlreadyRunning);
        };

        let workflow = Arc::clone(self);
        tokio::spawn(async move {
            workflow.execute(&key, handle).await;
        });
        Ok(StartOutcome::Started)
    }

    /// Run in the foreground. Returns `None` if a run is already active.
    pub async fn run_to_completion(&self, key: &DocumentKey) -> Option<NarrationProgress> {
        let handle = self.jobs.try_begin(key)?;
        Some(self.execute(key, handle).await)
    }

    pub async fn status(&self, key: &DocumentKey) -> Result<NarrationProgress, NarrationError> {
        if let Some(progress) = self.jobs.get(key) {
            return Ok(progress);
        }
        Ok(NarrationProgress::new(self.driver.probe(key).await?))
    }

    /// Cancel the document's active run and wait until it has stopped
    /// writing. No new run starts for the document until [`Self::forget`].
    pub async fn retire(&self, key: &DocumentKey) {
        let Some(mut done) = self.jobs.retire(key) else {
            return;
        };
        tracing::info!(document = %key, "Cancelling active narration run");
        while !*done.borrow() {
            if done.changed().await.is_err() {
                break;
            }
        }
        tracing::debug!(document = %key, "Narration run stopped after cancellation");
    }

    pub fn forget(&self, key: &DocumentKey) {
        self.jobs.forget(key);
    }

    async fn execute(&self, key: &DocumentKey, handle: RunHandle) -> NarrationProgress {
        let mut progress = NarrationProgress::new(SynthesisState::Running);
        tracing::info!(document = %key, "Narration run started");

        if let Err(e) = self.ensure_text(key).await {
            return self.finish(key, handle, progress, SynthesisState::Failed, Some(e));
        }

        while progress.invocations < self.max_invocations {
            if handle.is_cancelled() {
                tracing::info!(document = %key, invocations = progress.invocations, "Narration run cancelled");
                progress.error = Some("cancelled".to_string());
                return self.finish(key, handle, progress, SynthesisState::Checkpointed, None);
            }

            progress.invocations += 1;
            let budget = self.budgets.start_invocation();
            let budget = CancellableBudget::new(budget.as_ref(), &handle.cancelled);

            match self.driver.run(key, &budget).await {
                Ok(InvocationOutcome::Checkpointed {
                    chunks_completed,
                    total_chunks,
                }) => {
                    progress.chunks_completed = Some(chunks_completed);
                    progress.total_chunks = Some(total_chunks);
                    self.jobs.update(key, progress.clone());
                }
                Ok(InvocationOutcome::Complete { total_chunks, .. }) => {
                    if total_chunks > 0 {
                        progress.chunks_completed = Some(total_chunks);
                        progress.total_chunks = Some(total_chunks);
                    }
                    return self.finish(key, handle, progress, SynthesisState::Complete, None);
                }
                Err(e) => {
                    return self.finish(key, handle, progress, SynthesisState::Failed, Some(e));
                }
            }
        }

        let reason = format!(
            "stopped after {} invocations without completing",
            progress.invocations
        );
        tracing::warn!(document = %key, invocations = progress.invocations, "Narration run gave up, progress is checkpointed");
        progress.error = Some(reason);
        self.finish(key, handle, progress, SynthesisState::Checkpointed, None)
    }

    async fn ensure_text(&self, key: &DocumentKey) -> Result<(), NarrationError> {
        if self.blob_store.exists(&key.artifact(Artifact::Text)).await? {
            tracing::debug!(document = %key, "Text derivative already present, skipping extraction");
            return Ok(());
        }
        self.extractor.extract(key).await.map(|_| ())
    }

    fn finish(
        &self,
        key: &DocumentKey,
        handle: RunHandle,
        mut progress: NarrationProgress,
        state: SynthesisState,
        error: Option<NarrationError>,
    ) -> NarrationProgress {
        progress.state = state;
        if let Some(e) = error {
            tracing::error!(document = %key, error = %e, invocations = progress.invocations, "Narration run failed");
            progress.error = Some(e.to_string());
        } else {
            tracing::info!(document = %key, state = ?state, invocations = progress.invocations, "Narration run finished");
        }
        self.jobs.complete(key, handle, progress.clone());
        progress
    }
}
