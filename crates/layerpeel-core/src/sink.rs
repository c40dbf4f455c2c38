//! Checkpoint notifications emitted by the peel loop.
//!
//! A sink observes intermediate artifacts (image states, silhouettes,
//! extracted layers) without influencing the loop. Sinks must not fail the
//! run: anything they do with an event is their own business.

use layerpeel_pipeline::{Extraction, RgbaImage};

use crate::descriptor::ElementDescriptor;
use crate::layer::ExtractedLayer;

/// A checkpoint in the peel loop. Iterations are numbered from 1.
#[derive(Debug, Clone, Copy)]
pub enum PeelEvent<'a> {
    /// The input image, before anything was asked about it.
    OriginalCaptured { image: &'a RgbaImage },
    /// The descriptor list the upcoming iteration works from.
    Descriptors {
        iteration: usize,
        descriptors: &'a [ElementDescriptor],
    },
    /// An iteration is about to peel `element` off `image`.
    IterationStarted {
        iteration: usize,
        image: &'a RgbaImage,
        element: &'a ElementDescriptor,
    },
    /// The comparison image came back from the edit collaborator.
    SilhouetteReceived {
        iteration: usize,
        silhouette: &'a RgbaImage,
    },
    /// A layer was extracted. `extraction` is `None` for full-canvas
    /// layers, which bypass the diff.
    LayerExtracted {
        iteration: usize,
        layer: &'a ExtractedLayer,
        extraction: Option<&'a Extraction>,
    },
    /// The image state after the element was removed.
    AfterRemoval {
        iteration: usize,
        image: &'a RgbaImage,
    },
    /// The run completed; `layers` is in bottom-to-top order.
    Finished { layers: &'a [ExtractedLayer] },
}

impl PeelEvent<'_> {
    /// Short stable label, handy for logs and assertions.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::OriginalCaptured { .. } => "original",
            Self::Descriptors { .. } => "descriptors",
            Self::IterationStarted { .. } => "iteration",
            Self::SilhouetteReceived { .. } => "silhouette",
            Self::LayerExtracted { .. } => "extracted",
            Self::AfterRemoval { .. } => "after_removal",
            Self::Finished { .. } => "finished",
        }
    }
}

/// Receives [`PeelEvent`]s.
pub trait EventSink: Send + Sync {
    fn on_event(&self, event: &PeelEvent<'_>);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn on_event(&self, _event: &PeelEvent<'_>) {}
}
