//! Resumable, time-bounded conversion of a document's text into audio.

pub mod budget;
pub mod checkpoint;
pub mod chunker;
pub mod driver;
pub mod error;
pub mod extraction;
pub mod finalizer;
pub mod synthesis;
pub mod workflow;

pub use budget::{
    BudgetProvider, CancellableBudget, DeadlineBudget, ExecutionBudget, WallClockBudgets,
};
pub use checkpoint::{CheckpointStore, Watermark};
pub use chunker::TextChunker;
pub use driver::{DriverSettings, InvocationOutcome, SynthesisDriver, SynthesisState};
pub use error::NarrationError;
pub use extraction::TextExtractor;
pub use finalizer::Finalizer;
pub use synthesis::{RetryPolicy, SynthesisClient};
pub use workflow::{NarrationJobs, NarrationProgress, NarrationWorkflow, RunHandle, StartOutcome};
