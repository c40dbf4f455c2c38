//! layerpeel-core: the asynchronous layer-peeling loop.
//!
//! Wires the raster stages from `layerpeel-pipeline` to two external
//! collaborators, a [`Describer`] that says what is on the canvas and an
//! [`Editor`] that isolates or removes one element at a time. The
//! [`Orchestrator`] runs the loop; everything it talks to is injected.
//!
//! Collaborator calls are retried with exponential backoff
//! ([`RetryPolicy`]). CPU-heavy extraction runs on tokio's blocking pool,
//! admitted through a shared [`ComputePool`].

pub mod collaborator;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod layer;
pub mod orchestrator;
pub mod pool;
pub mod retry;
pub mod sink;
pub mod state;

pub use collaborator::{CollaboratorError, Describer, Editor};
pub use config::{PeelConfig, TerminationPolicy};
pub use descriptor::{ElementDescriptor, ElementKind, normalize_reconciled, parse_descriptor_response};
pub use error::{Operation, PeelError};
pub use layer::{ExtractedLayer, LayerMetadata};
pub use orchestrator::Orchestrator;
pub use pool::ComputePool;
pub use retry::RetryPolicy;
pub use sink::{EventSink, NoopSink, PeelEvent};
pub use state::PeelState;

/// Re-exported so collaborator implementations need not depend on
/// `async-trait` directly.
pub use async_trait::async_trait;
