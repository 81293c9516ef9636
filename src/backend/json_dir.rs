//! Backend stored as JSON files in a directory.
//!
//! Layout:
//!
//! ```text
//! <root>/taxonomy.json              {"categories": [...], "subcategories": [...]}
//! <root>/cases.json                 [{"caseId": .., "imageUrl": ..}, ...]
//! <root>/annotations/<case>.json    [AnnotationRecord, ...]
//! <root>/detections/<case>.json     [DetectionRecord, ...]
//! ```

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{AnnotationBackend, BackendError, CaseId, ImageCase};
use crate::format::{AnnotationRecord, DetectionRecord};
use crate::model::{Category, Subcategory};

const TAXONOMY_FILE: &str = "taxonomy.json";
const CASES_FILE: &str = "cases.json";
const ANNOTATIONS_DIR: &str = "annotations";
const DETECTIONS_DIR: &str = "detections";

#[derive(Debug, Default, Serialize, Deserialize)]
struct TaxonomyFile {
    #[serde(default)]
    categories: Vec<Category>,
    #[serde(default, alias = "smallBones", alias = "small_bones")]
    subcategories: Vec<Subcategory>,
}

/// File-backed backend rooted at a data directory.
#[derive(Debug, Clone)]
pub struct JsonDirBackend {
    root: PathBuf,
}

impl JsonDirBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write the taxonomy file, replacing any existing one.
    pub fn write_taxonomy(
        &self,
        categories: &[Category],
        subcategories: &[Subcategory],
    ) -> Result<(), BackendError> {
        let file = TaxonomyFile {
            categories: categories.to_vec(),
            subcategories: subcategories.to_vec(),
        };
        write_json(&self.root.join(TAXONOMY_FILE), &file)
    }

    /// Write the list of pending cases.
    pub fn write_cases(&self, cases: &[ImageCase]) -> Result<(), BackendError> {
        write_json(&self.root.join(CASES_FILE), &cases)
    }

    /// Write detections for a case.
    pub fn write_detections(
        &self,
        case_id: CaseId,
        detections: &[DetectionRecord],
    ) -> Result<(), BackendError> {
        write_json(&self.case_file(DETECTIONS_DIR, case_id), &detections)
    }

    fn case_file(&self, dir: &str, case_id: CaseId) -> PathBuf {
        self.root.join(dir).join(format!("{}.json", case_id))
    }

    fn taxonomy(&self) -> Result<TaxonomyFile, BackendError> {
        Ok(read_json_or_default(&self.root.join(TAXONOMY_FILE))?.unwrap_or_default())
    }

    fn check_case(&self, case_id: CaseId) -> Result<(), BackendError> {
        if self.list_pending_cases()?.iter().any(|c| c.case_id == case_id) {
            Ok(())
        } else {
            Err(BackendError::UnknownCase(case_id))
        }
    }
}

impl AnnotationBackend for JsonDirBackend {
    fn list_categories(&self) -> Result<Vec<Category>, BackendError> {
        Ok(self.taxonomy()?.categories)
    }

    fn list_subcategories(&self, category_id: u32) -> Result<Vec<Subcategory>, BackendError> {
        Ok(self
            .taxonomy()?
            .subcategories
            .into_iter()
            .filter(|s| s.category_id == category_id)
            .collect())
    }

    fn list_pending_cases(&self) -> Result<Vec<ImageCase>, BackendError> {
        Ok(read_json_or_default(&self.root.join(CASES_FILE))?.unwrap_or_default())
    }

    fn get_annotations(&self, case_id: CaseId) -> Result<Vec<AnnotationRecord>, BackendError> {
        match read_json_or_default(&self.case_file(ANNOTATIONS_DIR, case_id))? {
            Some(records) => Ok(records),
            None => {
                self.check_case(case_id)?;
                Ok(Vec::new())
            }
        }
    }

    fn save_annotations(
        &mut self,
        case_id: CaseId,
        records: &[AnnotationRecord],
    ) -> Result<(), BackendError> {
        self.check_case(case_id)?;
        let path = self.case_file(ANNOTATIONS_DIR, case_id);
        write_json(&path, &records)?;
        log::debug!("Wrote {} records to {:?}", records.len(), path);
        Ok(())
    }

    fn list_detections(&self, case_id: CaseId) -> Result<Vec<DetectionRecord>, BackendError> {
        Ok(read_json_or_default(&self.case_file(DETECTIONS_DIR, case_id))?.unwrap_or_default())
    }
}

/// Read a JSON file, or `None` if it does not exist.
fn read_json_or_default<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, BackendError> {
    let json = match std::fs::read_to_string(path) {
        Ok(json) => json,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(serde_json::from_str(&json)?))
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), BackendError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("galabone-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_empty_directory() {
        let backend = JsonDirBackend::new(scratch_dir("empty"));
        assert!(backend.list_categories().unwrap().is_empty());
        assert!(backend.list_pending_cases().unwrap().is_empty());
        assert!(matches!(backend.get_annotations(1), Err(BackendError::UnknownCase(1))));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = scratch_dir("reload");
        let mut backend = JsonDirBackend::new(&dir);
        backend
            .write_taxonomy(
                &[Category::new(7, "脊柱", "Spine")],
                &[Subcategory::new(42, 7, "胸椎", "Thoracic").with_ordinal("T")],
            )
            .unwrap();
        backend.write_cases(&[ImageCase::new(3, "spine.png")]).unwrap();

        assert!(backend.get_annotations(3).unwrap().is_empty());

        let record = AnnotationRecord {
            category_id: Some(7),
            subcategory_id: Some(42),
            ..Default::default()
        };
        backend.save_annotations(3, &[record.clone()]).unwrap();
        assert_eq!(backend.get_annotations(3).unwrap(), vec![record]);
        assert_eq!(backend.list_subcategories(7).unwrap()[0].ordinal.as_deref(), Some("T"));
        assert!(backend.save_annotations(4, &[]).is_err());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = scratch_dir("malformed");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(CASES_FILE), "{not json").unwrap();
        let backend = JsonDirBackend::new(&dir);
        assert!(matches!(backend.list_pending_cases(), Err(BackendError::Json(_))));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
