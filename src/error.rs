//! Errors surfaced by editor operations.

use thiserror::Error;

use crate::backend::{BackendError, CaseId};
use crate::model::AnnotationId;

/// Errors returned by [`crate::EditorSession`] operations.
///
/// Precondition failures leave the session untouched, so the user can fix
/// the cause and retry.
#[derive(Debug, Error)]
pub enum EditorError {
    #[error("There are no annotations to save")]
    NoAnnotations,

    #[error("Annotation {id} has neither a category nor a sub-category")]
    MissingTaxonomy { id: AnnotationId },

    #[error("A save for case {0} is already in progress")]
    SaveInProgress(CaseId),

    #[error("No image case is open")]
    NoCase,

    #[error("No detection at index {0}")]
    UnknownDetection(usize),

    #[error(transparent)]
    Backend(#[from] BackendError),
}
