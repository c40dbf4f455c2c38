//! Layered design document serializer.
//!
//! Produces a page-sized canvas description:
//!
//! ```json
//! {
//!   "width": 800, "height": 600,
//!   "pages": [{ "id": "...", "children": [
//!     { "id": "...", "type": "shape", "name": "...", "description": "...",
//!       "x": 10, "y": 20, "width": 64, "height": 32,
//!       "src": "data:image/png;base64,..." }
//!   ]}]
//! }
//! ```
//!
//! Children are listed bottom-to-top, the order a canvas paints them in.
//! Every payload is a PNG so transparency survives.
//!
//! This is a pure function with no I/O -- it returns structs or a `String`.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use layerpeel_core::{ElementKind, ExtractedLayer};
use layerpeel_pipeline::{PipelineError, RgbaImage, Sprite};
use serde::{Deserialize, Serialize};

/// Prefix of every `src` payload.
pub const PNG_DATA_URI_PREFIX: &str = "data:image/png;base64,";

/// Errors from building or serializing a design.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// A layer's pixels could not be encoded as PNG.
    #[error("failed to encode layer '{name}': {source}")]
    Encode {
        name: String,
        #[source]
        source: PipelineError,
    },

    #[error("failed to serialize design: {0}")]
    Json(#[from] serde_json::Error),
}

/// The whole document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Design {
    /// Width of the original image.
    pub width: u32,
    /// Height of the original image.
    pub height: u32,
    /// Always a single page holding every layer.
    pub pages: Vec<Page>,
}

/// A canvas the size of the original image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Random v4 UUID.
    pub id: String,
    /// Bottom-to-top.
    pub children: Vec<DesignElement>,
}

/// One positioned layer with its pixels inlined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesignElement {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ElementKind,
    pub name: String,
    pub description: String,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub src: String,
}

/// A bare positioned sprite, as reported by a single diff extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpriteRecord {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub src: String,
}

/// Encode `image` as a `data:image/png;base64,...` URI.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyImage`] for a zero-sized image.
pub fn png_data_uri(image: &RgbaImage) -> Result<String, PipelineError> {
    let png = layerpeel_pipeline::decode::encode_png(image)?;
    let mut uri = String::with_capacity(PNG_DATA_URI_PREFIX.len() + png.len().div_ceil(3) * 4);
    uri.push_str(PNG_DATA_URI_PREFIX);
    STANDARD.encode_string(&png, &mut uri);
    Ok(uri)
}

/// Build a single-page design of `width`x`height` from `layers`, which
/// must already be in bottom-to-top order.
///
/// # Errors
///
/// Returns [`ExportError::Encode`] if a layer's pixels cannot be encoded.
pub fn to_design(width: u32, height: u32, layers: &[ExtractedLayer]) -> Result<Design, ExportError> {
    let children = layers
        .iter()
        .map(|layer| {
            let src = png_data_uri(&layer.pixels).map_err(|source| ExportError::Encode {
                name: layer.name.clone(),
                source,
            })?;
            Ok(DesignElement {
                id: layer.id.to_string(),
                kind: layer.kind,
                name: layer.name.clone(),
                description: layer.description.clone(),
                x: layer.x,
                y: layer.y,
                width: layer.width(),
                height: layer.height(),
                src,
            })
        })
        .collect::<Result<Vec<_>, ExportError>>()?;

    Ok(Design {
        width,
        height,
        pages: vec![Page {
            id: uuid::Uuid::new_v4().to_string(),
            children,
        }],
    })
}

/// [`to_design`] rendered as pretty-printed JSON.
///
/// # Errors
///
/// See [`to_design`]; also [`ExportError::Json`] if serialization fails.
pub fn to_design_json(
    width: u32,
    height: u32,
    layers: &[ExtractedLayer],
) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(&to_design(width, height, layers)?)?)
}

/// Describe one extracted sprite with its pixels inlined.
///
/// # Errors
///
/// Returns [`ExportError::Encode`] if the pixels cannot be encoded.
pub fn sprite_record(sprite: &Sprite) -> Result<SpriteRecord, ExportError> {
    let src = png_data_uri(&sprite.pixels).map_err(|source| ExportError::Encode {
        name: "sprite".to_owned(),
        source,
    })?;
    Ok(SpriteRecord {
        x: sprite.x,
        y: sprite.y,
        width: sprite.width(),
        height: sprite.height(),
        src,
    })
}
