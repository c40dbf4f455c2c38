//! Recorded collaborator responses, served back to the peel loop.
//!
//! A manifest names the input image, the describe response, one reconcile
//! response per iteration, and the edited images for each element:
//!
//! ```json
//! {
//!   "image": "input.png",
//!   "describe": { "elements": [ ... ] },
//!   "reconcile": [ { "elements": [ ... ] } ],
//!   "edits": { "title": { "silhouette": "title_sil.png", "removed": "no_title.png" } }
//! }
//! ```
//!
//! Paths are relative to the manifest. All images are decoded up front, so
//! a broken recording fails before the run starts. Anything the recording
//! lacks is answered with [`CollaboratorError::Rejected`].

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use layerpeel_core::{
    CollaboratorError, Describer, Editor, ElementDescriptor, async_trait, parse_descriptor_response,
};
use layerpeel_pipeline::RgbaImage;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Manifest {
    image: PathBuf,
    #[serde(default)]
    describe: Option<serde_json::Value>,
    #[serde(default)]
    reconcile: Vec<serde_json::Value>,
    #[serde(default)]
    edits: HashMap<String, EditPaths>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EditPaths {
    silhouette: Option<PathBuf>,
    removed: Option<PathBuf>,
}

#[derive(Debug, Default)]
struct Edits {
    silhouette: Option<RgbaImage>,
    removed: Option<RgbaImage>,
}

/// Serves a recording as both [`Describer`] and [`Editor`].
#[derive(Debug)]
pub struct Replay {
    image: PathBuf,
    describe: Option<String>,
    reconcile: Mutex<VecDeque<String>>,
    edits: HashMap<String, Edits>,
}

impl Replay {
    /// Load `manifest_path` and every image it references. Returns the
    /// recording and the input image.
    ///
    /// # Errors
    ///
    /// Returns a message naming the file that could not be read, parsed,
    /// or decoded.
    pub fn load(manifest_path: &Path) -> Result<(Self, RgbaImage), String> {
        let text = std::fs::read_to_string(manifest_path)
            .map_err(|e| format!("Error reading {}: {e}", manifest_path.display()))?;
        let manifest: Manifest = serde_json::from_str(&text)
            .map_err(|e| format!("Error parsing {}: {e}", manifest_path.display()))?;
        let base = manifest_path.parent().unwrap_or_else(|| Path::new("."));

        let image_path = base.join(&manifest.image);
        let image = read_image(&image_path)?;

        let mut edits = HashMap::with_capacity(manifest.edits.len());
        for (name, paths) in manifest.edits {
            let silhouette = paths
                .silhouette
                .map(|p| read_image(&base.join(p)))
                .transpose()?;
            let removed = paths
                .removed
                .map(|p| read_image(&base.join(p)))
                .transpose()?;
            edits.insert(name, Edits { silhouette, removed });
        }

        let replay = Self {
            image: image_path,
            describe: manifest.describe.map(|v| v.to_string()),
            reconcile: Mutex::new(manifest.reconcile.iter().map(ToString::to_string).collect()),
            edits,
        };
        Ok((replay, image))
    }

    /// Path of the recorded input image.
    pub fn image_path(&self) -> &Path {
        &self.image
    }

    fn edit(
        &self,
        element: &ElementDescriptor,
        pick: impl Fn(&Edits) -> Option<&RgbaImage>,
        what: &str,
    ) -> Result<RgbaImage, CollaboratorError> {
        self.edits
            .get(&element.name)
            .and_then(pick)
            .cloned()
            .ok_or_else(|| {
                CollaboratorError::Rejected(format!(
                    "no recorded {what} image for '{}'",
                    element.name
                ))
            })
    }
}

/// Read and decode one image file.
pub fn read_image(path: &Path) -> Result<RgbaImage, String> {
    let bytes = std::fs::read(path).map_err(|e| format!("Error reading {}: {e}", path.display()))?;
    layerpeel_pipeline::decode::decode_rgba(&bytes)
        .map_err(|e| format!("Error decoding {}: {e}", path.display()))
}

#[async_trait]
impl Describer for Replay {
    async fn describe(&self, _image: &RgbaImage) -> Result<Vec<ElementDescriptor>, CollaboratorError> {
        let text = self
            .describe
            .as_deref()
            .ok_or_else(|| CollaboratorError::Rejected("no recorded describe response".to_owned()))?;
        parse_descriptor_response(text)
    }

    async fn reconcile(
        &self,
        _image: &RgbaImage,
        _candidates: &[ElementDescriptor],
    ) -> Result<Vec<ElementDescriptor>, CollaboratorError> {
        let next = self
            .reconcile
            .lock()
            .map_err(|_| CollaboratorError::Rejected("recording lock poisoned".to_owned()))?
            .pop_front()
            .ok_or_else(|| {
                CollaboratorError::Rejected("no recorded reconcile response left".to_owned())
            })?;
        parse_descriptor_response(&next)
    }
}

#[async_trait]
impl Editor for Replay {
    async fn isolate(
        &self,
        _image: &RgbaImage,
        element: &ElementDescriptor,
    ) -> Result<RgbaImage, CollaboratorError> {
        self.edit(element, |e| e.silhouette.as_ref(), "silhouette")
    }

    async fn remove(
        &self,
        _image: &RgbaImage,
        element: &ElementDescriptor,
    ) -> Result<RgbaImage, CollaboratorError> {
        self.edit(element, |e| e.removed.as_ref(), "removed")
    }
}
