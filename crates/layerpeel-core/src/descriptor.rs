//! Element descriptors: what the describe collaborator says is on the canvas.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::collaborator::CollaboratorError;

/// Broad category of a visual element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Text,
    Image,
    Shape,
    Background,
}

impl ElementKind {
    /// Lowercase wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Shape => "shape",
            Self::Background => "background",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One element as described in natural language.
///
/// Collections of descriptors are ordered by ascending z-index: index 0 is
/// the bottom-most element and the last entry is nearest the viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementDescriptor {
    #[serde(rename = "type")]
    pub kind: ElementKind,
    pub name: String,
    pub description: String,
}

impl ElementDescriptor {
    #[must_use]
    pub fn new(kind: ElementKind, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            description: description.into(),
        }
    }

    /// Whether `other` names the same element, ignoring the description.
    #[must_use]
    pub fn same_element(&self, other: &Self) -> bool {
        self.kind == other.kind && self.name == other.name
    }
}

/// Parse a `{"elements": [{"type", "name", "description"}, ...]}` response.
///
/// A body without an `elements` key is an empty list. Extra keys on the
/// body or on individual elements are ignored.
///
/// # Errors
///
/// Returns [`CollaboratorError::Malformed`] if the text is not JSON, the
/// body is not an object, `elements` is not an array, or any element lacks
/// a required field or carries an unknown `type`.
pub fn parse_descriptor_response(text: &str) -> Result<Vec<ElementDescriptor>, CollaboratorError> {
    let value: serde_json::Value = serde_json::from_str(text)
        .map_err(|e| CollaboratorError::Malformed(format!("response is not JSON: {e}")))?;

    let serde_json::Value::Object(mut body) = value else {
        return Err(CollaboratorError::Malformed(
            "response body is not a JSON object".to_owned(),
        ));
    };

    let Some(elements) = body.remove("elements") else {
        return Ok(Vec::new());
    };
    let serde_json::Value::Array(items) = elements else {
        return Err(CollaboratorError::Malformed(
            "`elements` is not an array".to_owned(),
        ));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value(item)
                .map_err(|e| CollaboratorError::Malformed(format!("element {index}: {e}")))
        })
        .collect()
}

/// Normalize a reconcile response against the candidates it was asked about.
///
/// Candidates whose `(kind, name)` appear in `response` survive, in the
/// candidates' order, carrying the response's description. Entries in the
/// response that match no candidate are ignored.
#[must_use]
pub fn normalize_reconciled(
    candidates: &[ElementDescriptor],
    response: &[ElementDescriptor],
) -> Vec<ElementDescriptor> {
    candidates
        .iter()
        .filter_map(|candidate| {
            response
                .iter()
                .find(|r| r.same_element(candidate))
                .map(|r| ElementDescriptor {
                    description: r.description.clone(),
                    ..candidate.clone()
                })
        })
        .collect()
}
