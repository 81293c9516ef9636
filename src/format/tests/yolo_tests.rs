//! Tests for YOLO label export.

use galabone_geom::ObbParams;

use crate::format::{YoloFlavor, write_yolo_labels, yolo_labels, yolo_line};
use crate::model::{Annotation, Taxonomy};

fn centered(taxonomy: Taxonomy, angle: f32) -> Annotation {
    Annotation::new(1, taxonomy, ObbParams::new(0.5, 0.5, 0.2, 0.1, angle))
}

#[test]
fn test_detect_line_uses_subcategory_class() {
    let line = yolo_line(&centered(Taxonomy::new(7, 42), 0.0), YoloFlavor::Detect).unwrap();
    assert_eq!(line, "42 0.500000 0.500000 0.200000 0.100000");
}

#[test]
fn test_detect_line_uses_rotated_bounds() {
    let line = yolo_line(&centered(Taxonomy::new(7, 42), 90.0), YoloFlavor::Detect).unwrap();
    assert_eq!(line, "42 0.500000 0.500000 0.100000 0.200000");
}

#[test]
fn test_obb_line_lists_four_corners() {
    let line = yolo_line(&centered(Taxonomy::new(7, 3), 0.0), YoloFlavor::Obb).unwrap();
    let fields: Vec<&str> = line.split(' ').collect();
    assert_eq!(fields.len(), 9);
    assert_eq!(fields[0], "3");
    assert_eq!(&fields[1..3], ["0.400000", "0.450000"]);
    assert_eq!(&fields[5..7], ["0.600000", "0.550000"]);
}

#[test]
fn test_missing_subcategory_is_skipped() {
    let partial = Taxonomy {
        category_id: Some(7),
        subcategory_id: None,
    };
    assert!(yolo_line(&centered(partial, 0.0), YoloFlavor::Detect).is_none());

    let annotations = [centered(partial, 0.0), centered(Taxonomy::new(7, 42), 0.0)];
    let labels = yolo_labels(annotations.iter(), YoloFlavor::Detect);
    assert_eq!(labels.lines.len(), 1);
    assert_eq!(labels.skipped, 1);
}

#[test]
fn test_write_labels_file() {
    let dir = std::env::temp_dir().join(format!("galabone-yolo-{}", std::process::id()));
    let annotations = [centered(Taxonomy::new(1, 5), 0.0), centered(Taxonomy::new(1, 6), 0.0)];
    let labels = yolo_labels(annotations.iter(), YoloFlavor::Detect);

    let path = write_yolo_labels(&dir, "case_12", &labels).unwrap();
    assert!(path.ends_with("case_12.txt"));

    let content = std::fs::read_to_string(&path).unwrap();
    assert_eq!(content.lines().count(), 2);
    assert!(content.starts_with("5 "));

    let _ = std::fs::remove_dir_all(&dir);
}
