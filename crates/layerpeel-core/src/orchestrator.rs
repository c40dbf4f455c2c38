//! The peel loop.
//!
//! Repeatedly takes the topmost described element, extracts it from the
//! current image state, and asks the edit collaborator for a state with
//! that element removed:
//!
//! ```text
//! describe -> [ select -> isolate -> extract -> remove -> reconcile ]* -> reverse
//! ```
//!
//! The loop is strictly sequential within a run. Collaborator calls are
//! awaited with retries; numeric work goes through the [`ComputePool`].

use std::sync::Arc;

use layerpeel_pipeline::resample::match_dimensions;
use layerpeel_pipeline::{RgbaImage, Sprite, extract};

use crate::collaborator::{Describer, Editor};
use crate::config::{PeelConfig, TerminationPolicy};
use crate::descriptor::{ElementDescriptor, ElementKind, normalize_reconciled};
use crate::error::{Operation, PeelError};
use crate::layer::ExtractedLayer;
use crate::pool::ComputePool;
use crate::retry::with_backoff;
use crate::sink::{EventSink, NoopSink, PeelEvent};
use crate::state::PeelState;

/// Drives peel runs against injected collaborators.
///
/// One orchestrator can serve many runs, concurrently if desired; it
/// holds no per-run state.
pub struct Orchestrator {
    describer: Arc<dyn Describer>,
    editor: Arc<dyn Editor>,
    pool: ComputePool,
    sink: Arc<dyn EventSink>,
    config: PeelConfig,
}

impl Orchestrator {
    /// Build an orchestrator with its own compute pool sized from
    /// `config.compute_workers`, and no event sink.
    #[must_use]
    pub fn new(describer: Arc<dyn Describer>, editor: Arc<dyn Editor>, config: PeelConfig) -> Self {
        let pool = config
            .compute_workers
            .map_or_else(ComputePool::with_available_parallelism, ComputePool::new);
        Self {
            describer,
            editor,
            pool,
            sink: Arc::new(NoopSink),
            config,
        }
    }

    /// Share an existing pool instead of the one built from the config.
    #[must_use]
    pub fn with_pool(mut self, pool: ComputePool) -> Self {
        self.pool = pool;
        self
    }

    /// Attach an observer for intermediate artifacts.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// The configuration every run uses.
    #[must_use]
    pub const fn config(&self) -> &PeelConfig {
        &self.config
    }

    /// Peel `original` into layers, returned bottom-to-top.
    ///
    /// An image with no described elements yields an empty list.
    ///
    /// # Errors
    ///
    /// - [`PeelError::InvalidConfig`] / [`PeelError::Pipeline`] for a bad
    ///   configuration or an empty image.
    /// - [`PeelError::Collaborator`] when describe, isolate, or remove keeps
    ///   failing. Reconcile failures are logged and tolerated.
    /// - [`PeelError::Worker`] / [`PeelError::PoolClosed`] from the compute
    ///   pool.
    /// - [`PeelError::IterationCap`] if the loop fails to converge.
    #[tracing::instrument(
        name = "peel",
        skip_all,
        fields(width = original.width(), height = original.height(), strategy = self.config.diff.strategy.name())
    )]
    pub async fn run(&self, original: RgbaImage) -> Result<Vec<ExtractedLayer>, PeelError> {
        self.config.validate()?;
        if original.width() == 0 || original.height() == 0 {
            return Err(layerpeel_pipeline::PipelineError::EmptyImage {
                width: original.width(),
                height: original.height(),
            }
            .into());
        }

        let original = Arc::new(original);
        self.sink.on_event(&PeelEvent::OriginalCaptured { image: &original });

        let retry = &self.config.retry;
        let descriptors = with_backoff(retry, Operation::Describe, || {
            self.describer.describe(&original)
        })
        .await?;

        tracing::info!(elements = descriptors.len(), "described image");
        if descriptors.is_empty() {
            self.sink.on_event(&PeelEvent::Finished { layers: &[] });
            return Ok(Vec::new());
        }

        let mut state = PeelState::new(original, descriptors);

        while let Some(element) = state.top().cloned() {
            // Unreachable while reconcile can only shrink the list.
            if state.iterations_exhausted() {
                return Err(PeelError::IterationCap(state.initial_count()));
            }
            let iteration = state.begin_iteration();
            self.sink.on_event(&PeelEvent::Descriptors {
                iteration,
                descriptors: state.remaining(),
            });
            self.sink.on_event(&PeelEvent::IterationStarted {
                iteration,
                image: state.current(),
                element: &element,
            });
            tracing::info!(
                iteration,
                kind = %element.kind,
                name = %element.name,
                remaining = state.remaining().len(),
                "peeling element"
            );

            if self.is_terminal(&state, &element) {
                let sprite = Sprite::full_canvas(RgbaImage::clone(state.current()));
                let layer = ExtractedLayer::new(&element, sprite);
                self.sink.on_event(&PeelEvent::LayerExtracted {
                    iteration,
                    layer: &layer,
                    extraction: None,
                });
                tracing::info!(iteration, name = %element.name, "kept remaining image as final layer");
                state.finish(layer);
                break;
            }

            let next = self.peel_one(&mut state, &element, iteration).await?;
            if state.remaining().is_empty() {
                break;
            }
            self.refresh(&mut state, &next).await;
        }

        debug_assert!(state.is_balanced());
        tracing::info!(
            iterations = state.iteration(),
            extracted = state.extracted().len(),
            dropped = state.dropped(),
            "peel finished"
        );
        let layers = state.into_layers();
        self.sink.on_event(&PeelEvent::Finished { layers: &layers });
        Ok(layers)
    }

    fn is_terminal(&self, state: &PeelState, element: &ElementDescriptor) -> bool {
        match self.config.termination {
            TerminationPolicy::SingleRemaining => state.remaining().len() == 1,
            TerminationPolicy::BackgroundReached => element.kind == ElementKind::Background,
        }
    }

    /// Extract `element` from the current state and advance `state` to the
    /// image with it removed. Returns that new image.
    async fn peel_one(
        &self,
        state: &mut PeelState,
        element: &ElementDescriptor,
        iteration: usize,
    ) -> Result<Arc<RgbaImage>, PeelError> {
        let retry = &self.config.retry;
        let current = Arc::clone(state.current());

        // The threshold strategy diffs against a silhouette and needs a
        // separate removal; the similarity strategy diffs against the
        // removal itself.
        let (comparison, removed) = if self.config.diff.strategy.uses_silhouette() {
            let silhouette = with_backoff(retry, Operation::Isolate, || {
                self.editor.isolate(&current, element)
            })
            .await?;
            (Arc::new(silhouette), None)
        } else {
            let edited = Arc::new(
                with_backoff(retry, Operation::Remove, || {
                    self.editor.remove(&current, element)
                })
                .await?,
            );
            (Arc::clone(&edited), Some(edited))
        };
        self.sink.on_event(&PeelEvent::SilhouetteReceived {
            iteration,
            silhouette: &comparison,
        });

        let extraction = {
            let before = Arc::clone(&current);
            let after = Arc::clone(&comparison);
            let diff = self.config.diff;
            self.pool.run(move || extract(&before, &after, &diff)).await??
        };
        tracing::debug!(
            iteration,
            raw_pixels = extraction.raw_pixel_count,
            mask_pixels = extraction.mask.count(),
            regions_found = extraction.cleaning.regions_found,
            regions_kept = extraction.cleaning.regions_kept,
            fell_back = extraction.cleaning.fell_back,
            resampled = extraction.resampled,
            "mask statistics"
        );
        if extraction.sprite.is_blank() {
            tracing::warn!(iteration, name = %element.name, "extracted layer has no visible pixels");
        }

        let layer = ExtractedLayer::new(element, extraction.sprite.clone());
        self.sink.on_event(&PeelEvent::LayerExtracted {
            iteration,
            layer: &layer,
            extraction: Some(&extraction),
        });
        tracing::info!(
            iteration,
            name = %element.name,
            x = layer.x,
            y = layer.y,
            width = layer.width(),
            height = layer.height(),
            "extracted layer"
        );

        let removed = match removed {
            Some(edited) => edited,
            None => Arc::new(
                with_backoff(retry, Operation::Remove, || {
                    self.editor.remove(&current, element)
                })
                .await?,
            ),
        };
        let next = self
            .fit_to_canvas(removed, current.width(), current.height())
            .await?;
        self.sink.on_event(&PeelEvent::AfterRemoval {
            iteration,
            image: &next,
        });

        state.advance(layer, Arc::clone(&next));
        Ok(next)
    }

    /// Resample an edited image back to the canvas size so every layer
    /// stays in the original coordinate space.
    async fn fit_to_canvas(
        &self,
        image: Arc<RgbaImage>,
        width: u32,
        height: u32,
    ) -> Result<Arc<RgbaImage>, PeelError> {
        if image.dimensions() == (width, height) {
            return Ok(image);
        }
        tracing::debug!(
            from_width = image.width(),
            from_height = image.height(),
            width,
            height,
            "resampling edited image to canvas size"
        );
        let filter = self.config.diff.resample;
        let fitted = self
            .pool
            .run(move || match_dimensions(&image, width, height, filter).into_owned())
            .await?;
        Ok(Arc::new(fitted))
    }

    /// Ask the describer which remaining elements survived the last edit.
    /// Any failure keeps the current list.
    async fn refresh(&self, state: &mut PeelState, image: &RgbaImage) {
        let response = with_backoff(&self.config.retry, Operation::Reconcile, || {
            self.describer.reconcile(image, state.remaining())
        })
        .await;

        match response {
            Ok(response) => {
                let reconciled = normalize_reconciled(state.remaining(), &response);
                if reconciled.is_empty() {
                    tracing::warn!(
                        returned = response.len(),
                        "reconcile matched no remaining element, keeping previous descriptors"
                    );
                } else {
                    let before = state.remaining().len();
                    state.reconcile(reconciled);
                    let gone = before - state.remaining().len();
                    if gone > 0 {
                        tracing::info!(gone, "elements no longer visible");
                    }
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "reconcile failed, keeping previous descriptors");
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::collaborator::CollaboratorError;
    use crate::retry::RetryPolicy;

    // ───────────────────────────── helpers ─────────────────────────────

    const W: u32 = 60;
    const H: u32 = 60;

    fn descriptor(kind: ElementKind, name: &str) -> ElementDescriptor {
        ElementDescriptor::new(kind, name, format!("the {name}"))
    }

    fn canvas() -> RgbaImage {
        RgbaImage::from_pixel(W, H, image::Rgba([200, 220, 240, 255]))
    }

    /// Silhouette of a square at `(x0, y0)`.
    fn square_silhouette(x0: u32, y0: u32, side: u32) -> RgbaImage {
        RgbaImage::from_fn(W, H, |x, y| {
            if (x0..x0 + side).contains(&x) && (y0..y0 + side).contains(&y) {
                image::Rgba([0, 0, 0, 255])
            } else {
                image::Rgba([255, 255, 255, 255])
            }
        })
    }

    struct ScriptedDescriber {
        describe: Mutex<VecDeque<Result<Vec<ElementDescriptor>, CollaboratorError>>>,
        reconcile: Mutex<VecDeque<Result<Vec<ElementDescriptor>, CollaboratorError>>>,
        reconcile_calls: Mutex<usize>,
    }

    impl ScriptedDescriber {
        fn new(describe: Vec<ElementDescriptor>) -> Self {
            Self {
                describe: Mutex::new(VecDeque::from([Ok(describe)])),
                reconcile: Mutex::new(VecDeque::new()),
                reconcile_calls: Mutex::new(0),
            }
        }

        fn then_reconcile(self, answer: Result<Vec<ElementDescriptor>, CollaboratorError>) -> Self {
            self.reconcile.lock().unwrap().push_back(answer);
            self
        }
    }

    #[async_trait]
    impl Describer for ScriptedDescriber {
        async fn describe(
            &self,
            _image: &RgbaImage,
        ) -> Result<Vec<ElementDescriptor>, CollaboratorError> {
            self.describe
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(CollaboratorError::EmptyResponse))
        }

        async fn reconcile(
            &self,
            _image: &RgbaImage,
            candidates: &[ElementDescriptor],
        ) -> Result<Vec<ElementDescriptor>, CollaboratorError> {
            *self.reconcile_calls.lock().unwrap() += 1;
            // Unscripted calls confirm every candidate.
            self.reconcile
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(candidates.to_vec()))
        }
    }

    /// Isolates each named element as a square at a fixed spot and removes
    /// it by returning the canvas unchanged.
    #[derive(Default)]
    struct SquareEditor {
        squares: Vec<(&'static str, u32, u32, u32)>,
        isolated: Mutex<Vec<String>>,
        removed: Mutex<Vec<String>>,
        fail_isolate_with: Option<CollaboratorError>,
        /// Return removals at half the input size.
        shrink_removals: bool,
    }

    #[async_trait]
    impl Editor for SquareEditor {
        async fn isolate(
            &self,
            _image: &RgbaImage,
            element: &ElementDescriptor,
        ) -> Result<RgbaImage, CollaboratorError> {
            self.isolated.lock().unwrap().push(element.name.clone());
            if let Some(err) = &self.fail_isolate_with {
                return Err(err.clone());
            }
            let (_, x, y, side) = self
                .squares
                .iter()
                .find(|(name, ..)| *name == element.name)
                .copied()
                .ok_or_else(|| CollaboratorError::Rejected(element.name.clone()))?;
            Ok(square_silhouette(x, y, side))
        }

        async fn remove(
            &self,
            image: &RgbaImage,
            element: &ElementDescriptor,
        ) -> Result<RgbaImage, CollaboratorError> {
            self.removed.lock().unwrap().push(element.name.clone());
            if self.shrink_removals {
                return Ok(image::imageops::thumbnail(
                    image,
                    image.width() / 2,
                    image.height() / 2,
                ));
            }
            Ok(image.clone())
        }
    }

    fn config() -> PeelConfig {
        PeelConfig {
            retry: RetryPolicy {
                max_attempts: 3,
                base_delay_ms: 10,
            },
            compute_workers: Some(2),
            ..PeelConfig::default()
        }
    }

    fn orchestrator(
        describer: ScriptedDescriber,
        editor: SquareEditor,
        config: PeelConfig,
    ) -> (Orchestrator, Arc<ScriptedDescriber>, Arc<SquareEditor>) {
        let describer = Arc::new(describer);
        let editor = Arc::new(editor);
        let orch = Orchestrator::new(describer.clone(), editor.clone(), config);
        (orch, describer, editor)
    }

    // ───────────────────────────── scenarios ───────────────────────────

    #[tokio::test]
    async fn no_elements_yields_empty_result() {
        let (orch, _, editor) =
            orchestrator(ScriptedDescriber::new(vec![]), SquareEditor::default(), config());
        let layers = orch.run(canvas()).await.unwrap();
        assert!(layers.is_empty());
        assert!(editor.isolated.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn single_element_is_full_canvas() {
        let (orch, describer, editor) = orchestrator(
            ScriptedDescriber::new(vec![descriptor(ElementKind::Background, "paper")]),
            SquareEditor::default(),
            config(),
        );
        let layers = orch.run(canvas()).await.unwrap();
        assert_eq!(layers.len(), 1);
        let layer = &layers[0];
        assert_eq!((layer.x, layer.y, layer.width(), layer.height()), (0, 0, W, H));
        assert_eq!(layer.pixels, canvas());
        assert!(editor.isolated.lock().unwrap().is_empty());
        assert!(editor.removed.lock().unwrap().is_empty());
        assert_eq!(*describer.reconcile_calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn three_elements_come_back_bottom_to_top() {
        let (orch, _, editor) = orchestrator(
            ScriptedDescriber::new(vec![
                descriptor(ElementKind::Background, "paper"),
                descriptor(ElementKind::Shape, "circle"),
                descriptor(ElementKind::Text, "title"),
            ]),
            SquareEditor {
                squares: vec![("title", 5, 5, 20), ("circle", 30, 30, 15)],
                ..SquareEditor::default()
            },
            config(),
        );
        let layers = orch.run(canvas()).await.unwrap();

        let names: Vec<_> = layers.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["paper", "circle", "title"]);
        assert_eq!(*editor.isolated.lock().unwrap(), ["title", "circle"]);
        assert_eq!(*editor.removed.lock().unwrap(), ["title", "circle"]);

        let title = &layers[2];
        assert_eq!((title.x, title.y, title.width(), title.height()), (5, 5, 20, 20));
        let circle = &layers[1];
        assert_eq!((circle.x, circle.y, circle.width(), circle.height()), (30, 30, 15, 15));
        let paper = &layers[0];
        assert_eq!((paper.width(), paper.height()), (W, H));
    }

    #[tokio::test]
    async fn reconcile_drops_vanished_elements() {
        let describer = ScriptedDescriber::new(vec![
            descriptor(ElementKind::Background, "paper"),
            descriptor(ElementKind::Shape, "shadow"),
            descriptor(ElementKind::Text, "title"),
        ])
        .then_reconcile(Ok(vec![descriptor(ElementKind::Background, "paper")]));
        let (orch, _, editor) = orchestrator(
            describer,
            SquareEditor {
                squares: vec![("title", 5, 5, 20)],
                ..SquareEditor::default()
            },
            config(),
        );
        let layers = orch.run(canvas()).await.unwrap();
        let names: Vec<_> = layers.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["paper", "title"]);
        assert_eq!(*editor.isolated.lock().unwrap(), ["title"]);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_reconcile_keeps_previous_descriptors() {
        let describer = ScriptedDescriber::new(vec![
            descriptor(ElementKind::Background, "paper"),
            descriptor(ElementKind::Text, "title"),
            descriptor(ElementKind::Shape, "star"),
        ])
        .then_reconcile(Err(CollaboratorError::Transport("down".into())))
        .then_reconcile(Err(CollaboratorError::Transport("down".into())))
        .then_reconcile(Err(CollaboratorError::Transport("down".into())));
        let (orch, describer, _) = orchestrator(
            describer,
            SquareEditor {
                squares: vec![("star", 40, 40, 12), ("title", 5, 5, 20)],
                ..SquareEditor::default()
            },
            config(),
        );
        let layers = orch.run(canvas()).await.unwrap();
        assert_eq!(layers.len(), 3);
        // Three failing attempts after the first removal, one confirming
        // call after the second.
        assert_eq!(*describer.reconcile_calls.lock().unwrap(), 4);
    }

    #[tokio::test]
    async fn empty_or_unknown_reconcile_keeps_previous_descriptors() {
        let describer = ScriptedDescriber::new(vec![
            descriptor(ElementKind::Background, "paper"),
            descriptor(ElementKind::Text, "title"),
        ])
        .then_reconcile(Ok(vec![descriptor(ElementKind::Image, "invented")]));
        let (orch, _, _) = orchestrator(
            describer,
            SquareEditor {
                squares: vec![("title", 5, 5, 20)],
                ..SquareEditor::default()
            },
            config(),
        );
        let names: Vec<_> = orch
            .run(canvas())
            .await
            .unwrap()
            .into_iter()
            .map(|l| l.name)
            .collect();
        assert_eq!(names, ["paper", "title"]);
    }

    #[tokio::test(start_paused = true)]
    async fn isolate_failure_is_fatal_after_retries() {
        let (orch, _, editor) = orchestrator(
            ScriptedDescriber::new(vec![
                descriptor(ElementKind::Background, "paper"),
                descriptor(ElementKind::Text, "title"),
            ]),
            SquareEditor {
                fail_isolate_with: Some(CollaboratorError::EmptyResponse),
                ..SquareEditor::default()
            },
            config(),
        );
        let err = orch.run(canvas()).await.unwrap_err();
        assert!(matches!(
            err,
            PeelError::Collaborator {
                operation: Operation::Isolate,
                attempts: 3,
                ..
            }
        ));
        assert_eq!(editor.isolated.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn rejected_isolate_is_not_retried() {
        let (orch, _, editor) = orchestrator(
            ScriptedDescriber::new(vec![
                descriptor(ElementKind::Background, "paper"),
                descriptor(ElementKind::Text, "unknown"),
            ]),
            SquareEditor::default(),
            config(),
        );
        let err = orch.run(canvas()).await.unwrap_err();
        assert!(matches!(
            err,
            PeelError::Collaborator {
                operation: Operation::Isolate,
                attempts: 1,
                source: CollaboratorError::Rejected(_),
            }
        ));
        assert_eq!(editor.isolated.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn background_policy_stops_at_background() {
        let (orch, _, editor) = orchestrator(
            ScriptedDescriber::new(vec![
                descriptor(ElementKind::Image, "texture"),
                descriptor(ElementKind::Background, "paper"),
                descriptor(ElementKind::Text, "title"),
            ]),
            SquareEditor {
                squares: vec![("title", 5, 5, 20)],
                ..SquareEditor::default()
            },
            PeelConfig {
                termination: TerminationPolicy::BackgroundReached,
                ..config()
            },
        );
        let layers = orch.run(canvas()).await.unwrap();
        let names: Vec<_> = layers.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["paper", "title"]);
        assert_eq!(*editor.isolated.lock().unwrap(), ["title"]);
    }

    #[tokio::test]
    async fn background_policy_without_background_peels_everything() {
        let (orch, _, editor) = orchestrator(
            ScriptedDescriber::new(vec![
                descriptor(ElementKind::Shape, "circle"),
                descriptor(ElementKind::Text, "title"),
            ]),
            SquareEditor {
                squares: vec![("title", 5, 5, 20), ("circle", 30, 30, 15)],
                ..SquareEditor::default()
            },
            PeelConfig {
                termination: TerminationPolicy::BackgroundReached,
                ..config()
            },
        );
        let layers = orch.run(canvas()).await.unwrap();
        assert_eq!(layers.len(), 2);
        assert_eq!(*editor.removed.lock().unwrap(), ["title", "circle"]);
    }

    #[tokio::test]
    async fn resized_removals_keep_canvas_coordinates() {
        let sink = Arc::new(SizeSink::default());
        let (orch, _, _) = orchestrator(
            ScriptedDescriber::new(vec![
                descriptor(ElementKind::Background, "paper"),
                descriptor(ElementKind::Shape, "circle"),
                descriptor(ElementKind::Text, "title"),
            ]),
            SquareEditor {
                squares: vec![("title", 5, 5, 20), ("circle", 30, 30, 15)],
                shrink_removals: true,
                ..SquareEditor::default()
            },
            config(),
        );
        let orch = orch.with_sink(sink.clone());
        let layers = orch.run(canvas()).await.unwrap();

        let circle = &layers[1];
        assert_eq!((circle.x, circle.y, circle.width(), circle.height()), (30, 30, 15, 15));
        let paper = &layers[0];
        assert_eq!((paper.x, paper.y, paper.width(), paper.height()), (0, 0, W, H));
        assert!(sink.0.lock().unwrap().iter().all(|&d| d == (W, H)));
    }

    /// Records the size of every image state handed to the next iteration.
    #[derive(Default)]
    struct SizeSink(Mutex<Vec<(u32, u32)>>);

    impl EventSink for SizeSink {
        fn on_event(&self, event: &PeelEvent<'_>) {
            if let PeelEvent::AfterRemoval { image, .. } | PeelEvent::IterationStarted { image, .. } =
                *event
            {
                self.0.lock().unwrap().push(image.dimensions());
            }
        }
    }

    #[tokio::test]
    async fn empty_image_is_rejected_before_describing() {
        let (orch, _, _) = orchestrator(
            ScriptedDescriber::new(vec![descriptor(ElementKind::Shape, "x")]),
            SquareEditor::default(),
            config(),
        );
        let err = orch.run(RgbaImage::new(0, 5)).await.unwrap_err();
        assert!(matches!(err, PeelError::Pipeline(_)));
    }

    // ───────────────────────────── events ──────────────────────────────

    #[derive(Default)]
    struct LabelSink(Mutex<Vec<&'static str>>);

    impl EventSink for LabelSink {
        fn on_event(&self, event: &PeelEvent<'_>) {
            self.0.lock().unwrap().push(event.label());
        }
    }

    #[tokio::test]
    async fn sink_sees_every_checkpoint_in_order() {
        let sink = Arc::new(LabelSink::default());
        let (orch, _, _) = orchestrator(
            ScriptedDescriber::new(vec![
                descriptor(ElementKind::Background, "paper"),
                descriptor(ElementKind::Text, "title"),
            ]),
            SquareEditor {
                squares: vec![("title", 5, 5, 20)],
                ..SquareEditor::default()
            },
            config(),
        );
        let orch = orch.with_sink(sink.clone());
        orch.run(canvas()).await.unwrap();

        assert_eq!(
            *sink.0.lock().unwrap(),
            [
                "original",
                "descriptors",
                "iteration",
                "silhouette",
                "extracted",
                "after_removal",
                "descriptors",
                "iteration",
                "extracted",
                "finished",
            ]
        );
    }
}
