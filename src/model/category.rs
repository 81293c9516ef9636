//! Bone taxonomy entries served by the backend.

use serde::{Deserialize, Serialize};

/// A coarse bone category ("big bone").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Unique identifier for the category
    #[serde(alias = "bone_id", alias = "boneId")]
    pub id: u32,
    /// Name in the local language
    #[serde(alias = "bone_zh", alias = "nameZh", default)]
    pub name_local: String,
    /// English name
    #[serde(alias = "bone_en", alias = "nameEn", default)]
    pub name_en: String,
}

impl Category {
    /// Create a new category with the given ID and names.
    pub fn new(id: u32, name_local: &str, name_en: &str) -> Self {
        Self {
            id,
            name_local: name_local.to_string(),
            name_en: name_en.to_string(),
        }
    }
}

/// A fine bone sub-category ("small bone") belonging to one [`Category`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subcategory {
    #[serde(alias = "smallBoneId", alias = "small_bone_id")]
    pub id: u32,
    /// Parent category
    #[serde(alias = "boneId", alias = "bone_id")]
    pub category_id: u32,
    #[serde(alias = "nameZh", alias = "small_bone_zh", default)]
    pub name_local: String,
    #[serde(alias = "nameEn", alias = "small_bone_en", default)]
    pub name_en: String,
    /// Ordering key within the category (e.g. a serial number)
    #[serde(alias = "serialNumber", alias = "serial_number", default)]
    pub ordinal: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

impl Subcategory {
    pub fn new(id: u32, category_id: u32, name_local: &str, name_en: &str) -> Self {
        Self {
            id,
            category_id,
            name_local: name_local.to_string(),
            name_en: name_en.to_string(),
            ordinal: None,
            note: None,
        }
    }

    pub fn with_ordinal(mut self, ordinal: impl Into<String>) -> Self {
        self.ordinal = Some(ordinal.into());
        self
    }
}
