//! Contracts for the external services the peel loop depends on.
//!
//! Implementations typically wrap remote AI services; the loop only sees
//! these traits. Every method may fail with a [`CollaboratorError`], whose
//! [`is_transient`](CollaboratorError::is_transient) decides whether the
//! call is retried.

use async_trait::async_trait;
use layerpeel_pipeline::RgbaImage;

use crate::descriptor::ElementDescriptor;

/// Failure reported by a collaborator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollaboratorError {
    /// The service answered with nothing usable (no body, no image).
    #[error("empty response")]
    EmptyResponse,

    /// The service answered, but the answer does not fit the contract.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// The request never completed (network, timeout, rate limit).
    #[error("transport error: {0}")]
    Transport(String),

    /// The service refused the request; repeating it will not help.
    #[error("request rejected: {0}")]
    Rejected(String),
}

impl CollaboratorError {
    /// Whether repeating the same call could succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        !matches!(self, Self::Rejected(_))
    }
}

/// Describes the visual elements of an image.
#[async_trait]
pub trait Describer: Send + Sync {
    /// List the elements visible in `image`, bottom-most first. An empty
    /// list is a valid answer.
    async fn describe(&self, image: &RgbaImage) -> Result<Vec<ElementDescriptor>, CollaboratorError>;

    /// Re-examine `image` after an edit and report which of `candidates`
    /// are still visible, with refreshed descriptions.
    async fn reconcile(
        &self,
        image: &RgbaImage,
        candidates: &[ElementDescriptor],
    ) -> Result<Vec<ElementDescriptor>, CollaboratorError>;
}

/// Performs generative pixel edits targeting one element.
#[async_trait]
pub trait Editor: Send + Sync {
    /// Paint `element` solid black on a white field, preserving its exact
    /// shape and position.
    async fn isolate(
        &self,
        image: &RgbaImage,
        element: &ElementDescriptor,
    ) -> Result<RgbaImage, CollaboratorError>;

    /// Return `image` with `element` removed and the area behind it filled
    /// in.
    async fn remove(
        &self,
        image: &RgbaImage,
        element: &ElementDescriptor,
    ) -> Result<RgbaImage, CollaboratorError>;
}
