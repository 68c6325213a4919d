use thiserror::Error;

/// Errors surfaced by the coordinator within one tick.
#[derive(Error, Debug)]
pub enum CoordinatorError {
    /// An interrupt was observed at a checkpoint. The caller treats this as
    /// a normal shutdown.
    #[error("rollup coordinator interrupted")]
    Interrupted,

    /// A core invariant was broken. Programmer error; never caught inside
    /// the coordinator.
    #[error("invariant violated: {0}")]
    InvariantViolated(String),

    /// Proof construction, aggregation or publication failed. The batch is
    /// abandoned; pending transactions are reconsidered next tick.
    #[error(transparent)]
    Collaborator(#[from] anyhow::Error),
}
