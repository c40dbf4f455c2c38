//! layerpeel-export: Pure result serializers (sans-IO)
//!
//! Converts extracted layers into a layered design document (JSON with
//! inline PNG payloads).

pub mod design;

pub use design::{
    Design, DesignElement, ExportError, Page, SpriteRecord, png_data_uri, sprite_record, to_design,
    to_design_json,
};
