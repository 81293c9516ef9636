//! Editor state management modules.

mod annotation_set;
mod save_tracker;

pub use annotation_set::{AnnotationPatch, AnnotationSet, GeometryPatch};
pub use save_tracker::{SaveOutcome, SaveTracker};
