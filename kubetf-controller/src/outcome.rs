use std::time::Duration;

/// What the caller of a reconcile should do next
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing left to do until the next change or resync
    Done,
    /// Transient failure; try again after the delay
    RetryAfter(Duration),
    /// Lost a write race; try again straight away
    RetryNow,
    /// Retrying will not help until the inputs change
    Fatal(String),
}

