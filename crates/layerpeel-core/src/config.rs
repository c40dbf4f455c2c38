//! Peel loop configuration.

use std::fmt;

use layerpeel_pipeline::DiffConfig;
use serde::{Deserialize, Serialize};

use crate::error::PeelError;
use crate::retry::RetryPolicy;

/// When the peel loop stops and keeps the remaining image as a whole.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationPolicy {
    /// Stop when one descriptor remains; the image state becomes that
    /// element's layer.
    #[default]
    SingleRemaining,
    /// Stop at the first `background` descriptor, whatever lies below it.
    /// Descriptors under the background are folded into its layer.
    BackgroundReached,
}

impl fmt::Display for TerminationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::SingleRemaining => "single_remaining",
            Self::BackgroundReached => "background_reached",
        })
    }
}

/// Everything the orchestrator needs besides its collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeelConfig {
    /// Change detection and resampling for each extraction.
    pub diff: DiffConfig,
    pub termination: TerminationPolicy,
    /// Applied to every collaborator call.
    pub retry: RetryPolicy,
    /// Concurrent numeric jobs for a pool built from this config.
    /// `None` uses the machine's available parallelism.
    pub compute_workers: Option<usize>,
}

impl PeelConfig {
    /// Check every nested section.
    ///
    /// # Errors
    ///
    /// Returns [`PeelError::InvalidConfig`] for an unusable retry policy or
    /// a zero worker count, and [`PeelError::Pipeline`] for invalid diff
    /// parameters.
    pub fn validate(&self) -> Result<(), PeelError> {
        self.diff.validate()?;
        self.retry.validate()?;
        if self.compute_workers == Some(0) {
            return Err(PeelError::InvalidConfig(
                "compute_workers must be at least 1".to_owned(),
            ));
        }
        Ok(())
    }
}

impl Default for PeelConfig {
    fn default() -> Self {
        Self {
            diff: DiffConfig::default(),
            termination: TerminationPolicy::default(),
            retry: RetryPolicy::default(),
            compute_workers: None,
        }
    }
}
