//! Mutable state of one peel run.

use std::sync::Arc;

use layerpeel_pipeline::RgbaImage;

use crate::descriptor::ElementDescriptor;
use crate::layer::ExtractedLayer;

/// State carried from one peel iteration to the next.
///
/// Every descriptor the run started with is accounted for exactly once:
/// it is either still `remaining`, was turned into an `extracted` layer,
/// or was `dropped` (confirmed gone, or folded into a background layer).
#[derive(Debug, Clone)]
pub struct PeelState {
    current: Arc<RgbaImage>,
    remaining: Vec<ElementDescriptor>,
    /// Topmost first, in extraction order.
    extracted: Vec<ExtractedLayer>,
    iteration: usize,
    dropped: usize,
    initial: usize,
}

impl PeelState {
    #[must_use]
    pub fn new(image: Arc<RgbaImage>, descriptors: Vec<ElementDescriptor>) -> Self {
        let initial = descriptors.len();
        Self {
            current: image,
            remaining: descriptors,
            extracted: Vec::with_capacity(initial),
            iteration: 0,
            dropped: 0,
            initial,
        }
    }

    /// The image state the next iteration peels from.
    #[must_use]
    pub const fn current(&self) -> &Arc<RgbaImage> {
        &self.current
    }

    /// Descriptors not yet extracted, bottom-most first.
    #[must_use]
    pub fn remaining(&self) -> &[ElementDescriptor] {
        &self.remaining
    }

    /// Layers extracted so far, topmost first.
    #[must_use]
    pub fn extracted(&self) -> &[ExtractedLayer] {
        &self.extracted
    }

    /// The element the next iteration will peel.
    #[must_use]
    pub fn top(&self) -> Option<&ElementDescriptor> {
        self.remaining.last()
    }

    /// Iterations started so far.
    #[must_use]
    pub const fn iteration(&self) -> usize {
        self.iteration
    }

    #[must_use]
    pub const fn dropped(&self) -> usize {
        self.dropped
    }

    /// Number of descriptors the run started with.
    #[must_use]
    pub const fn initial_count(&self) -> usize {
        self.initial
    }

    /// Whether every iteration the run is allowed has been started.
    ///
    /// Each iteration consumes one descriptor, so a run over `n`
    /// descriptors needs at most `n` iterations.
    #[must_use]
    pub const fn iterations_exhausted(&self) -> bool {
        self.iteration >= self.initial
    }

    /// `extracted + remaining + dropped == initial`.
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        self.extracted.len() + self.remaining.len() + self.dropped == self.initial
    }

    /// Start a new iteration and return its 1-based number.
    pub const fn begin_iteration(&mut self) -> usize {
        self.iteration += 1;
        self.iteration
    }

    /// Record `layer` for the topmost descriptor and move on to `next`.
    pub fn advance(&mut self, layer: ExtractedLayer, next: Arc<RgbaImage>) {
        self.remaining.pop();
        self.extracted.push(layer);
        self.current = next;
    }

    /// Record the terminal full-canvas `layer` for the topmost descriptor.
    /// Anything still below it is folded into that layer.
    pub fn finish(&mut self, layer: ExtractedLayer) {
        self.remaining.pop();
        self.extracted.push(layer);
        self.dropped += self.remaining.len();
        self.remaining.clear();
    }

    /// Replace the remaining descriptors with a reconciled subset of them.
    ///
    /// `reconciled` must not be longer than the current list; the
    /// difference is counted as dropped.
    pub fn reconcile(&mut self, reconciled: Vec<ElementDescriptor>) {
        debug_assert!(reconciled.len() <= self.remaining.len());
        self.dropped += self.remaining.len().saturating_sub(reconciled.len());
        self.remaining = reconciled;
    }

    /// Final layers in bottom-to-top (paint) order.
    #[must_use]
    pub fn into_layers(self) -> Vec<ExtractedLayer> {
        let mut layers = self.extracted;
        layers.reverse();
        layers
    }
}
