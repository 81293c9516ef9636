//! Boundary to the annotation backend.
//!
//! The editor only needs a handful of request/response calls: taxonomy
//! lookup, pending cases, annotation load/save and detections. Transport
//! belongs to the implementation; the editor drives everything through
//! [`AnnotationBackend`].

mod json_dir;
mod memory;

pub use json_dir::JsonDirBackend;
pub use memory::MemoryBackend;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::format::{AnnotationRecord, DetectionRecord};
use crate::model::{Category, Subcategory};

/// Identifier of one image case on the backend.
pub type CaseId = u64;

/// One image waiting for annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageCase {
    #[serde(rename = "caseId", alias = "case_id", alias = "imageCaseId", alias = "image_case_id")]
    pub case_id: CaseId,
    #[serde(rename = "imageUrl", alias = "image_url", alias = "url")]
    pub image_url: String,
    #[serde(rename = "thumbnailUrl", alias = "thumbnail_url", default)]
    pub thumbnail_url: Option<String>,
}

impl ImageCase {
    pub fn new(case_id: CaseId, image_url: impl Into<String>) -> Self {
        Self {
            case_id,
            image_url: image_url.into(),
            thumbnail_url: None,
        }
    }

    /// File stem used when exporting labels for this case.
    pub fn label_stem(&self) -> String {
        std::path::Path::new(&self.image_url)
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("case_{}", self.case_id))
    }
}

/// Errors from a backend call.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown image case {0}")]
    UnknownCase(CaseId),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

/// Request/response calls the editor makes against the backend.
pub trait AnnotationBackend {
    /// All coarse categories.
    fn list_categories(&self) -> Result<Vec<Category>, BackendError>;

    /// Sub-categories of one category.
    fn list_subcategories(&self, category_id: u32) -> Result<Vec<Subcategory>, BackendError>;

    /// Image cases still waiting for annotation.
    fn list_pending_cases(&self) -> Result<Vec<ImageCase>, BackendError>;

    /// Saved annotations for one case, in whatever encoding they were stored.
    fn get_annotations(&self, case_id: CaseId) -> Result<Vec<AnnotationRecord>, BackendError>;

    /// Replace the saved annotations for one case.
    fn save_annotations(
        &mut self,
        case_id: CaseId,
        records: &[AnnotationRecord],
    ) -> Result<(), BackendError>;

    /// Machine-generated candidate boxes for one case.
    ///
    /// Backends without a detector return an empty list.
    fn list_detections(&self, _case_id: CaseId) -> Result<Vec<DetectionRecord>, BackendError> {
        Ok(Vec::new())
    }
}
