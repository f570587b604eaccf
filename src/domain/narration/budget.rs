use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Remaining wall-clock time of the current invocation, as reported by the
/// environment running it
pub trait ExecutionBudget: Send + Sync {
    fn remaining(&self) -> Duration;
}

/// Hands out a fresh budget for each driver invocation
pub trait BudgetProvider: Send + Sync {
    fn start_invocation(&self) -> Box<dyn ExecutionBudget>;
}

/// Budget that expires at a fixed instant
#[derive(Debug, Clone, Copy)]
pub struct DeadlineBudget {
    deadline: Instant,
}

impl DeadlineBudget {
    pub fn new(deadline: Instant) -> Self {
        Self { deadline }
    }

    pub fn starting_now(window: Duration) -> Self {
        Self::new(Instant::now() + window)
    }
}

impl ExecutionBudget for DeadlineBudget {
    fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }
}

/// Every invocation gets the same wall-clock window, starting when it begins
#[derive(Debug, Clone, Copy)]
pub struct WallClockBudgets {
    window: Duration,
}

impl WallClockBudgets {
    pub fn new(window: Duration) -> Self {
        Self { window }
    }
}

impl BudgetProvider for WallClockBudgets {
    fn start_invocation(&self) -> Box<dyn ExecutionBudget> {
        Box::new(DeadlineBudget::starting_now(self.window))
    }
}

/// Reports no time left once the run owning it has been cancelled, so the
/// driver flushes its batch and stops at the next chunk boundary
pub struct CancellableBudget<'a> {
    inner: &'a dyn ExecutionBudget,
    cancelled: &'a AtomicBool,
}

impl<'a> CancellableBudget<'a> {
    pub fn new(inner: &'a dyn ExecutionBudget, cancelled: &'a AtomicBool) -> Self {
        Self { inner, cancelled }
    }
}

impl ExecutionBudget for CancellableBudget<'_> {
    fn remaining(&self) -> Duration {
        if self.cancelled.load(Ordering::SeqCst) {
            return Duration::ZERO;
        }
        self.inner.remaining()
    }
}
