//! layerpeel-pipeline: Pure raster stages for layer extraction (sans-IO).
//!
//! Carves one visual element out of an image state by comparing it with a
//! second image (a silhouette or an edited state):
//! resample -> detect -> clean -> carve -> trim.
//!
//! This crate has **no I/O dependencies** and no async code -- it operates
//! on in-memory buffers and returns structured data. Collaborator calls,
//! scheduling and the peel loop itself live in `layerpeel-core`.

pub mod blur;
pub mod clean;
pub mod decode;
pub mod detect;
pub mod extract;
pub mod resample;
pub mod similarity;
pub mod trim;
pub mod types;

pub use clean::{CleanParams, CleanReport};
pub use detect::{ChangeDetector, DetectionStrategy, SimilarityParams, ThresholdParams};
pub use extract::{Extraction, extract};
pub use resample::ResampleFilter;
pub use types::{BinaryMask, Dimensions, DiffConfig, PipelineError, Sprite};

/// Re-export raster types so downstream crates need not depend on `image`.
pub use types::{GrayImage, RgbaImage};
