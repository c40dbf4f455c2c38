//! Extracted layers: a descriptor stamped onto a positioned sprite.

use layerpeel_pipeline::{RgbaImage, Sprite};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::descriptor::{ElementDescriptor, ElementKind};

/// One element peeled out of the canvas.
///
/// `x`/`y` locate the top-left corner of `pixels` on the original canvas;
/// the buffer is cropped to its visible pixels unless the layer is a
/// full-canvas extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedLayer {
    pub id: Uuid,
    pub kind: ElementKind,
    pub name: String,
    pub description: String,
    pub x: u32,
    pub y: u32,
    pub pixels: RgbaImage,
}

impl ExtractedLayer {
    /// Stamp `sprite` with `descriptor`'s identity and a fresh random id.
    #[must_use]
    pub fn new(descriptor: &ElementDescriptor, sprite: Sprite) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: descriptor.kind,
            name: descriptor.name.clone(),
            description: descriptor.description.clone(),
            x: sprite.x,
            y: sprite.y,
            pixels: sprite.pixels,
        }
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Everything except the pixels, in serializable form.
    #[must_use]
    pub fn metadata(&self) -> LayerMetadata {
        LayerMetadata {
            id: self.id,
            kind: self.kind,
            name: self.name.clone(),
            description: self.description.clone(),
            x: self.x,
            y: self.y,
            width: self.width(),
            height: self.height(),
        }
    }
}

/// Serializable summary of an [`ExtractedLayer`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerMetadata {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: ElementKind,
    pub name: String,
    pub description: String,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}
