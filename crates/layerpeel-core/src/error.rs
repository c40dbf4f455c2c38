use std::fmt;

use layerpeel_pipeline::PipelineError;

use crate::collaborator::CollaboratorError;

/// Which collaborator call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Describe,
    Reconcile,
    Isolate,
    Remove,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Describe => "describe",
            Self::Reconcile => "reconcile",
            Self::Isolate => "isolate",
            Self::Remove => "remove",
        })
    }
}

/// Errors that abort a peel run. No partial result is returned.
#[derive(Debug, thiserror::Error)]
pub enum PeelError {
    /// A collaborator kept failing after the retry budget was spent, or
    /// failed permanently.
    #[error("{operation} failed after {attempts} attempt(s): {source}")]
    Collaborator {
        operation: Operation,
        attempts: u32,
        #[source]
        source: CollaboratorError,
    },

    /// A numeric stage rejected its input.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// A compute job panicked or was cancelled.
    #[error("compute job failed: {0}")]
    Worker(#[from] tokio::task::JoinError),

    /// The compute pool was shut down while a job was waiting for a slot.
    #[error("compute pool closed")]
    PoolClosed,

    /// The loop ran more iterations than there were descriptors.
    #[error("peel loop exceeded its cap of {0} iteration(s)")]
    IterationCap(usize),

    /// The supplied configuration is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
