//! In-process backend.

use std::collections::HashMap;

use super::{AnnotationBackend, BackendError, CaseId, ImageCase};
use crate::format::{AnnotationRecord, DetectionRecord};
use crate::model::{Category, Subcategory};

/// Backend holding everything in memory.
///
/// Used by tests and by hosts that fetch data themselves and hand it to the
/// editor. Saves can be made to fail to exercise error paths.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    categories: Vec<Category>,
    subcategories: Vec<Subcategory>,
    cases: Vec<ImageCase>,
    annotations: HashMap<CaseId, Vec<AnnotationRecord>>,
    detections: HashMap<CaseId, Vec<DetectionRecord>>,
    fail_saves: bool,
    save_count: usize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_categories(mut self, categories: Vec<Category>) -> Self {
        self.categories = categories;
        self
    }

    pub fn with_subcategories(mut self, subcategories: Vec<Subcategory>) -> Self {
        self.subcategories = subcategories;
        self
    }

    /// Register a case, optionally with previously saved annotations.
    pub fn with_case(mut self, case: ImageCase, records: Vec<AnnotationRecord>) -> Self {
        self.insert_case(case, records);
        self
    }

    pub fn with_detections(mut self, case_id: CaseId, detections: Vec<DetectionRecord>) -> Self {
        self.detections.insert(case_id, detections);
        self
    }

    /// Add or replace a case and its saved annotations.
    pub fn insert_case(&mut self, case: ImageCase, records: Vec<AnnotationRecord>) {
        self.annotations.insert(case.case_id, records);
        match self.cases.iter_mut().find(|c| c.case_id == case.case_id) {
            Some(existing) => *existing = case,
            None => self.cases.push(case),
        }
    }

    pub fn set_detections(&mut self, case_id: CaseId, detections: Vec<DetectionRecord>) {
        self.detections.insert(case_id, detections);
    }

    pub fn set_taxonomy(&mut self, categories: Vec<Category>, subcategories: Vec<Subcategory>) {
        self.categories = categories;
        self.subcategories = subcategories;
    }

    /// Make every subsequent save fail with [`BackendError::Unavailable`].
    pub fn set_fail_saves(&mut self, fail: bool) {
        self.fail_saves = fail;
    }

    /// Records last saved for a case.
    pub fn saved(&self, case_id: CaseId) -> Option<&[AnnotationRecord]> {
        self.annotations.get(&case_id).map(Vec::as_slice)
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        self.save_count
    }

    fn check_case(&self, case_id: CaseId) -> Result<(), BackendError> {
        if self.cases.iter().any(|c| c.case_id == case_id) {
            Ok(())
        } else {
            Err(BackendError::UnknownCase(case_id))
        }
    }
}

impl AnnotationBackend for MemoryBackend {
    fn list_categories(&self) -> Result<Vec<Category>, BackendError> {
        Ok(self.categories.clone())
    }

    fn list_subcategories(&self, category_id: u32) -> Result<Vec<Subcategory>, BackendError> {
        Ok(self
            .subcategories
            .iter()
            .filter(|s| s.category_id == category_id)
            .cloned()
            .collect())
    }

    fn list_pending_cases(&self) -> Result<Vec<ImageCase>, BackendError> {
        Ok(self.cases.clone())
    }

    fn get_annotations(&self, case_id: CaseId) -> Result<Vec<AnnotationRecord>, BackendError> {
        self.check_case(case_id)?;
        Ok(self.annotations.get(&case_id).cloned().unwrap_or_default())
    }

    fn save_annotations(
        &mut self,
        case_id: CaseId,
        records: &[AnnotationRecord],
    ) -> Result<(), BackendError> {
        self.check_case(case_id)?;
        if self.fail_saves {
            return Err(BackendError::Unavailable("save rejected".to_string()));
        }
        self.annotations.insert(case_id, records.to_vec());
        self.save_count += 1;
        Ok(())
    }

    fn list_detections(&self, case_id: CaseId) -> Result<Vec<DetectionRecord>, BackendError> {
        self.check_case(case_id)?;
        Ok(self.detections.get(&case_id).cloned().unwrap_or_default())
    }
}
