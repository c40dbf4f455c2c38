//! On-disk debug snapshots of a peel run.
//!
//! Each run writes to `<YYYYmmdd_HHMMSS>_<input file name>` under the
//! snapshot root. Layout of one session directory:
//!
//! ```text
//! 00_original.png
//! NN_elements_description.json
//! NN_iteration/
//!     01_image_state.png
//!     02_element_info.json
//!     03_silhouette.png
//!     04_extracted_element.png
//!     04_extracted_metadata.json
//!     05_after_removal.png
//! final_result.json
//! ```
//!
//! Write failures are logged and otherwise ignored.

use std::path::{Path, PathBuf};

use layerpeel_core::{EventSink, LayerMetadata, PeelEvent};
use layerpeel_pipeline::{CleanReport, RgbaImage};
use serde::Serialize;

pub struct SnapshotSink {
    session: PathBuf,
}

/// Contents of `04_extracted_metadata.json`.
#[derive(Serialize)]
struct ExtractedMetadata {
    #[serde(flatten)]
    layer: LayerMetadata,
    /// Absent for full-canvas layers.
    #[serde(skip_serializing_if = "Option::is_none")]
    mask: Option<MaskStats>,
}

#[derive(Serialize)]
struct MaskStats {
    raw_pixels: u64,
    cleaned_pixels: u64,
    resampled: bool,
    cleaning: CleanReport,
}

impl SnapshotSink {
    /// Create a session directory under `root` named after the local time
    /// and `input_name`.
    ///
    /// # Errors
    ///
    /// Returns a message if the directory cannot be created.
    pub fn create(root: &Path, input_name: &str) -> Result<Self, String> {
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let session = root.join(format!("{stamp}_{}", sanitize(input_name)));
        std::fs::create_dir_all(&session)
            .map_err(|e| format!("Error creating {}: {e}", session.display()))?;
        tracing::info!(dir = %session.display(), "writing debug snapshots");
        Ok(Self { session })
    }

    pub fn session_dir(&self) -> &Path {
        &self.session
    }

    fn iteration_dir(&self, iteration: usize) -> PathBuf {
        self.session.join(format!("{iteration:02}_iteration"))
    }

    fn write_png(&self, path: &Path, image: &RgbaImage) {
        let result = layerpeel_pipeline::decode::encode_png(image)
            .map_err(|e| e.to_string())
            .and_then(|png| self.write(path, &png));
        if let Err(e) = result {
            tracing::warn!(path = %path.display(), error = %e, "snapshot not written");
        }
    }

    fn write_json(&self, path: &Path, value: &impl Serialize) {
        let result = serde_json::to_vec_pretty(value)
            .map_err(|e| e.to_string())
            .and_then(|json| self.write(path, &json));
        if let Err(e) = result {
            tracing::warn!(path = %path.display(), error = %e, "snapshot not written");
        }
    }

    #[allow(clippy::unused_self)]
    fn write(&self, path: &Path, bytes: &[u8]) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }
        std::fs::write(path, bytes).map_err(|e| e.to_string())
    }
}

/// Replace anything but word characters, `-` and `.` with `_`.
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '_' | '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

impl EventSink for SnapshotSink {
    fn on_event(&self, event: &PeelEvent<'_>) {
        match *event {
            PeelEvent::OriginalCaptured { image } => {
                self.write_png(&self.session.join("00_original.png"), image);
            }
            PeelEvent::Descriptors {
                iteration,
                descriptors,
            } => {
                let name = format!("{iteration:02}_elements_description.json");
                self.write_json(&self.session.join(name), &descriptors);
            }
            PeelEvent::IterationStarted {
                iteration,
                image,
                element,
            } => {
                let dir = self.iteration_dir(iteration);
                self.write_png(&dir.join("01_image_state.png"), image);
                self.write_json(&dir.join("02_element_info.json"), element);
            }
            PeelEvent::SilhouetteReceived {
                iteration,
                silhouette,
            } => {
                let dir = self.iteration_dir(iteration);
                self.write_png(&dir.join("03_silhouette.png"), silhouette);
            }
            PeelEvent::LayerExtracted {
                iteration,
                layer,
                extraction,
            } => {
                let dir = self.iteration_dir(iteration);
                self.write_png(&dir.join("04_extracted_element.png"), &layer.pixels);
                let metadata = ExtractedMetadata {
                    layer: layer.metadata(),
                    mask: extraction.map(|e| MaskStats {
                        raw_pixels: e.raw_pixel_count,
                        cleaned_pixels: e.mask.count(),
                        resampled: e.resampled,
                        cleaning: e.cleaning,
                    }),
                };
                self.write_json(&dir.join("04_extracted_metadata.json"), &metadata);
            }
            PeelEvent::AfterRemoval { iteration, image } => {
                let dir = self.iteration_dir(iteration);
                self.write_png(&dir.join("05_after_removal.png"), image);
            }
            PeelEvent::Finished { layers } => {
                let summary: Vec<LayerMetadata> = layers.iter().map(|l| l.metadata()).collect();
                self.write_json(&self.session.join("final_result.json"), &summary);
            }
        }
    }
}
