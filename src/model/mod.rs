//! Data models for the annotation editor.

mod annotation;
mod category;

pub use annotation::{Annotation, AnnotationId, Taxonomy};
pub use category::{Category, Subcategory};
