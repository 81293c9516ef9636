//! Wire formats: backend records and label export.
//!
//! - **Backend records**: [`AnnotationRecord`] and [`DetectionRecord`] accept
//!   every geometry encoding and field spelling the backend has used, and
//!   outgoing records carry all of them.
//! - **YOLO TXT**: per-image label files, axis-aligned or oriented.

mod error;
mod record;
mod yolo;

#[cfg(test)]
mod tests;

pub use error::FormatError;
pub use record::{AnnotationRecord, DetectionRecord, GeometryEncoding, GeometryFields, PolygonField};
pub use yolo::{YoloFlavor, YoloLabels, write_yolo_labels, yolo_labels, yolo_line};
