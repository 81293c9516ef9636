//! End-to-end editing scenarios through the session API.

use galabone_geom::{Point, Size};
use serde_json::json;

use super::*;
use crate::backend::{ImageCase, JsonDirBackend, MemoryBackend};
use crate::format::DetectionRecord;
use crate::interaction::{Notice, PointerEvent};
use crate::state::SaveOutcome;

const EPSILON: f32 = 1e-3;

fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn record(value: serde_json::Value) -> AnnotationRecord {
    serde_json::from_value(value).unwrap()
}

fn backend(records: Vec<AnnotationRecord>) -> MemoryBackend {
    MemoryBackend::new()
        .with_categories(vec![Category::new(7, "脊柱", "Spine")])
        .with_subcategories(vec![
            Subcategory::new(42, 7, "胸椎", "Thoracic"),
            Subcategory::new(43, 7, "腰椎", "Lumbar"),
        ])
        .with_case(ImageCase::new(1, "case-1.png"), records)
}

/// Session with case 1 open, laid out at (50,20) 400x300 and (7,42) picked.
fn open_session(backend: &MemoryBackend) -> EditorSession {
    let mut session = EditorSession::default();
    session.load_taxonomy(backend).unwrap();
    session.select_category(backend, 7).unwrap();
    session.select_subcategory(Some(42));
    session.open_case(backend, 1);
    session.set_container(Point::new(50.0, 20.0), Size::new(400.0, 300.0));
    session.set_natural_size(Size::new(800.0, 600.0));
    session
}

fn drag(session: &mut EditorSession, from: (f32, f32), to: (f32, f32)) -> Vec<Effect> {
    let mut effects = session.pointer(PointerEvent::down(1, from.0, from.1));
    effects.extend(session.pointer(PointerEvent::moved(1, to.0, to.1)));
    effects.extend(session.pointer(PointerEvent::up(1, to.0, to.1)));
    effects
}

fn only_id(session: &EditorSession) -> AnnotationId {
    assert_eq!(session.annotations().len(), 1);
    session.annotations().iter().next().unwrap().id()
}

#[test]
fn test_layout_follows_container_and_image() {
    let backend = backend(Vec::new());
    let mut session = EditorSession::default();
    session.open_case(&backend, 1);
    assert!(session.layout().is_none());
    assert!(session.overlay().is_none());

    session.set_container(Point::new(50.0, 20.0), Size::new(400.0, 300.0));
    assert!(session.layout().is_none(), "natural size still unknown");

    session.set_natural_size(Size::new(800.0, 600.0));
    let layout = *session.layout().unwrap();
    assert_eq!(layout, ImageLayout::new(50.0, 20.0, 400.0, 300.0));

    // A wider container letterboxes horizontally.
    session.set_container_size(Size::new(600.0, 300.0));
    let layout = *session.layout().unwrap();
    assert!(approx_eq(layout.left, 150.0));
    assert!(approx_eq(layout.width, 400.0));
}

#[test]
fn test_draw_and_save() {
    let mut backend = backend(Vec::new());
    let mut session = open_session(&backend);
    assert!(!session.is_dirty());

    drag(&mut session, (100.0, 100.0), (300.0, 260.0));
    let id = only_id(&session);
    assert_eq!(session.annotations().active_id(), Some(id));
    assert!(session.is_dirty());

    assert_eq!(session.save(&mut backend).unwrap(), 1);
    assert!(!session.is_dirty());
    assert_eq!(session.last_save_outcome(), Some(SaveOutcome::Saved));
    assert_eq!(backend.save_count(), 1);

    let saved = backend.saved(1).unwrap();
    let value = serde_json::to_value(&saved[0]).unwrap();
    assert_eq!(value["bigBoneId"], 7);
    assert_eq!(value["smallBoneId"], 42);
    let field = |key: &str| value[key].as_f64().unwrap() as f32;
    assert!(approx_eq(field("x_min"), 0.125));
    assert!(approx_eq(field("y_min"), 0.2667));
    assert!(approx_eq(field("x_max"), 0.625));
    assert!(approx_eq(field("y_max"), 0.8));
    assert_eq!(field("angle"), 0.0);
}

#[test]
fn test_tiny_draw_is_discarded() {
    let backend = backend(Vec::new());
    let mut session = open_session(&backend);

    drag(&mut session, (100.0, 100.0), (102.0, 101.5));
    assert!(session.annotations().is_empty());
    assert!(!session.is_dirty());
    assert!(matches!(session.begin_save(), Err(EditorError::NoAnnotations)));
}

#[test]
fn test_draw_requires_taxonomy() {
    let backend = backend(Vec::new());
    let mut session = open_session(&backend);
    session.select_category(&backend, 7).unwrap();
    assert_eq!(session.selection().subcategory_id, None);

    let effects = session.pointer(PointerEvent::down(1, 100.0, 100.0));
    assert_eq!(effects, vec![Effect::Notify(Notice::TaxonomyRequired)]);
    assert_eq!(session.status(), Some(Notice::TaxonomyRequired.message()));
    assert!(session.interaction_state().is_idle());
}

#[test]
fn test_select_category_loads_subcategories() {
    let backend = backend(Vec::new());
    let mut session = EditorSession::default();
    session.load_taxonomy(&backend).unwrap();
    assert_eq!(session.categories().len(), 1);

    session.select_category(&backend, 7).unwrap();
    session.select_subcategory(Some(43));
    assert_eq!(session.subcategories().len(), 2);

    // Switching category drops the previous sub-category.
    session.select_category(&backend, 8).unwrap();
    assert!(session.subcategories().is_empty());
    assert_eq!(
        session.selection(),
        Taxonomy {
            category_id: Some(8),
            subcategory_id: None
        }
    );
}

#[test]
fn test_move_clamps_to_image() {
    let backend = backend(vec![record(json!({
        "bigBoneId": 7, "smallBoneId": 42,
        "cx": 0.05, "cy": 0.5, "w": 0.2, "h": 0.2, "angle": 0.0
    }))]);
    let mut session = open_session(&backend);
    let id = only_id(&session);
    session.set_active(Some(id));

    drag(&mut session, (80.0, 170.0), (20.0, 170.0));
    let obb = *session.annotations().get(id).unwrap().obb();
    assert!(approx_eq(obb.center_x, 0.1));
    assert!(approx_eq(obb.center_y, 0.5));
    assert!(session.is_dirty());
}

#[test]
fn test_rotate_quarter_turn_swaps_extents() {
    let backend = backend(vec![record(json!({
        "bigBoneId": 7, "smallBoneId": 42,
        "cx": 0.5, "cy": 0.5, "w": 0.2, "h": 0.1, "angle": 0.0
    }))]);
    let mut session = open_session(&backend);
    let id = only_id(&session);
    session.set_active(Some(id));

    drag(&mut session, (210.0, 127.0), (293.0, 130.0));
    let ann = session.annotations().get(id).unwrap();
    assert!(approx_eq(ann.obb().angle_degrees, 90.0));
    assert!(approx_eq(ann.aabb().width(), 0.1));
    assert!(approx_eq(ann.aabb().height(), 0.2));

    let records = session.records();
    assert!(approx_eq(records[0].geometry.angle_degrees.unwrap(), 90.0));
}

#[test]
fn test_legacy_box_loads_axis_aligned() {
    let backend = backend(vec![record(json!({
        "bigBoneId": 7, "smallBoneId": 42,
        "XMin": 0.1, "YMin": 0.2, "XMax": 0.3, "YMax": 0.6
    }))]);
    let session = open_session(&backend);
    let ann = session.annotations().iter().next().unwrap();

    assert_eq!(ann.obb().angle_degrees, 0.0);
    assert!(approx_eq(ann.obb().center_x, 0.2));
    assert!(approx_eq(ann.obb().center_y, 0.4));
    assert!(approx_eq(ann.polygon()[0].x, 0.1));
    assert!(approx_eq(ann.polygon()[2].y, 0.6));
    assert_eq!(session.status(), None);
}

#[test]
fn test_configured_size_floor_is_kept_on_load() {
    let backend = backend(vec![record(json!({
        "bigBoneId": 7, "smallBoneId": 42,
        "cx": 0.5, "cy": 0.5, "w": 0.002, "h": 0.2, "angle": 0.0
    }))]);
    let mut config = EditorConfig::default();
    config.interaction.min_box_dimension = 0.001;
    let mut session = EditorSession::new(config);
    session.open_case(&backend, 1);

    let ann = session.annotations().iter().next().unwrap();
    assert_eq!(ann.obb().width, 0.002);
}

#[test]
fn test_unreadable_records_are_skipped() {
    let backend = backend(vec![
        record(json!({"bigBoneId": 7, "smallBoneId": 42, "x_min": 0.1, "y_min": 0.1, "x_max": 0.2, "y_max": 0.2})),
        record(json!({"bigBoneId": 7, "smallBoneId": 42})),
    ]);
    let session = open_session(&backend);
    assert_eq!(session.annotations().len(), 1);
    assert_eq!(session.status(), Some("1 of 2 saved annotations could not be read"));
}

#[test]
fn test_unknown_case_opens_empty() {
    let backend = backend(Vec::new());
    let mut session = EditorSession::default();
    session.open_case(&backend, 99);

    assert!(session.annotations().is_empty());
    assert_eq!(session.case_id(), Some(99));
    assert!(session.status().unwrap().starts_with("Loading annotations failed"));
}

#[test]
fn test_save_preconditions() {
    let backend = backend(vec![record(json!({
        "x_min": 0.1, "y_min": 0.1, "x_max": 0.2, "y_max": 0.2
    }))]);

    let mut session = EditorSession::default();
    assert!(matches!(session.begin_save(), Err(EditorError::NoCase)));

    let mut session = open_session(&backend);
    let id = only_id(&session);
    assert!(matches!(session.begin_save(), Err(EditorError::MissingTaxonomy { id: bad }) if bad == id));

    // One level is enough.
    session.assign_taxonomy(
        id,
        Taxonomy {
            category_id: Some(7),
            subcategory_id: None,
        },
    );
    let (case_id, records) = session.begin_save().unwrap();
    assert_eq!(case_id, 1);
    assert_eq!(records.len(), 1);
    assert!(session.is_saving());
    assert!(matches!(session.begin_save(), Err(EditorError::SaveInProgress(1))));

    session.complete_save(case_id, Ok(records.len())).unwrap();
    assert!(!session.is_saving());
}

#[test]
fn test_failed_save_keeps_annotations() {
    let mut backend = backend(Vec::new());
    let mut session = open_session(&backend);
    drag(&mut session, (100.0, 100.0), (300.0, 260.0));
    let before = session.records();

    backend.set_fail_saves(true);
    let result = session.save(&mut backend);
    assert!(matches!(result, Err(EditorError::Backend(BackendError::Unavailable(_)))));
    assert_eq!(session.records(), before);
    assert!(session.is_dirty());
    assert!(!session.is_saving());
    assert_eq!(session.last_save_outcome(), Some(SaveOutcome::Failed));
    assert!(session.status().unwrap().starts_with("Save failed"));

    backend.set_fail_saves(false);
    assert_eq!(session.save(&mut backend).unwrap(), 1);
    assert!(!session.is_dirty());
}

#[test]
fn test_save_completes_for_its_own_case() {
    let backend = backend(Vec::new()).with_case(ImageCase::new(2, "case-2.png"), Vec::new());
    let mut session = open_session(&backend);
    drag(&mut session, (100.0, 100.0), (300.0, 260.0));
    let (case_id, records) = session.begin_save().unwrap();
    assert_eq!(case_id, 1);

    // Keep working on another image while case 1 is in flight.
    session.open_case(&backend, 2);
    session.set_natural_size(Size::new(800.0, 600.0));
    drag(&mut session, (100.0, 100.0), (300.0, 260.0));
    assert!(session.is_dirty());
    assert!(!session.is_saving());

    session.complete_save(case_id, Ok(records.len())).unwrap();
    assert!(session.is_dirty(), "case 2 was never saved");
    assert!(!session.is_saving());
    assert_eq!(session.last_save_outcome(), None);
    assert!(session.status().is_none());

    session.open_case(&backend, 1);
    assert!(!session.is_saving());
    assert_eq!(session.last_save_outcome(), Some(SaveOutcome::Saved));
    assert!(!session.is_dirty());
}

#[test]
fn test_delete_and_clear() {
    let backend = backend(Vec::new());
    let mut session = open_session(&backend);
    drag(&mut session, (100.0, 100.0), (300.0, 260.0));
    let id = only_id(&session);

    assert!(session.delete(id));
    assert!(!session.delete(id));
    assert!(session.annotations().is_empty());

    drag(&mut session, (100.0, 100.0), (300.0, 260.0));
    session.pointer(PointerEvent::down(2, 60.0, 30.0));
    assert_eq!(session.clear(), Some(Effect::ReleasePointer(2)));
    assert!(session.annotations().is_empty());
    assert!(session.interaction_state().is_idle());
}

#[test]
fn test_open_case_drops_gesture() {
    let backend = backend(Vec::new()).with_case(ImageCase::new(2, "case-2.png"), Vec::new());
    let mut session = open_session(&backend);
    session.pointer(PointerEvent::down(1, 100.0, 100.0));
    session.pointer(PointerEvent::moved(1, 200.0, 200.0));
    assert!(session.overlay().unwrap().preview.is_some());

    assert_eq!(session.open_case(&backend, 2), Some(Effect::ReleasePointer(1)));
    assert!(session.interaction_state().is_idle());
    assert!(session.layout().is_none(), "new image must be measured again");
    assert!(session.annotations().is_empty());
}

#[test]
fn test_detections_apply_with_spine_levels() {
    let detections: Vec<DetectionRecord> = serde_json::from_value(json!([
        {
            "boneId": 7, "conf": 0.9, "cls_name": "Thoracic_Vertebrae",
            "polygon": [[0.4, 0.5], [0.6, 0.5], [0.6, 0.52], [0.4, 0.52]]
        },
        {
            "boneId": 7, "conf": 0.8, "cls_name": "Thoracic_Vertebrae",
            "polygon": [[0.4, 0.3], [0.6, 0.3], [0.6, 0.32], [0.4, 0.32]]
        },
        {
            "boneId": 7, "conf": 0.1, "cls_name": "Thoracic_Vertebrae",
            "polygon": [[0.4, 0.7], [0.6, 0.7], [0.6, 0.72], [0.4, 0.72]]
        }
    ]))
    .unwrap();
    let backend = backend(Vec::new()).with_detections(1, detections);
    let mut session = open_session(&backend);

    assert_eq!(session.load_detections(&backend).unwrap(), 3);
    let levels: Vec<_> = session.detections().iter().map(|d| d.level.as_deref()).collect();
    assert_eq!(levels, vec![Some("T2"), Some("T1"), Some("T3")]);
    assert_eq!(session.visible_detections().count(), 2);
    assert_eq!(session.overlay().unwrap().detections.len(), 2);

    let id = session.apply_detection(0).unwrap();
    let ann = session.annotations().get(id).unwrap();
    assert_eq!(ann.taxonomy(), Taxonomy::new(7, 42));
    assert!(approx_eq(ann.obb().center_x, 0.5));
    assert!(approx_eq(ann.obb().center_y, 0.51));
    assert_eq!(session.annotations().active_id(), Some(id));
    assert!(session.is_dirty());

    assert!(matches!(session.apply_detection(5), Err(EditorError::UnknownDetection(5))));
}

#[test]
fn test_yolo_labels_from_session() {
    let backend = backend(Vec::new());
    let mut session = open_session(&backend);
    drag(&mut session, (100.0, 100.0), (300.0, 260.0));

    let labels = session.yolo_labels(YoloFlavor::Detect);
    assert_eq!(labels.lines.len(), 1);
    assert!(labels.lines[0].starts_with("42 0.375000 0.533"));
}

#[test]
fn test_json_dir_round_trip() {
    let root = std::env::temp_dir().join(format!("galabone_session_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&root);
    let mut backend = JsonDirBackend::new(&root);
    backend
        .write_taxonomy(
            &[Category::new(7, "脊柱", "Spine")],
            &[Subcategory::new(42, 7, "胸椎", "Thoracic")],
        )
        .unwrap();
    backend.write_cases(&[ImageCase::new(1, "case-1.png")]).unwrap();

    let mut session = EditorSession::default();
    session.load_taxonomy(&backend).unwrap();
    session.select_category(&backend, 7).unwrap();
    session.select_subcategory(Some(42));
    session.open_case(&backend, 1);
    assert!(session.annotations().is_empty());
    session.set_container(Point::new(50.0, 20.0), Size::new(400.0, 300.0));
    session.set_natural_size(Size::new(800.0, 600.0));
    drag(&mut session, (100.0, 100.0), (300.0, 260.0));
    session.save(&mut backend).unwrap();

    let mut reopened = EditorSession::default();
    reopened.open_case(&backend, 1);
    let ann = reopened.annotations().iter().next().unwrap();
    assert_eq!(ann.taxonomy(), Taxonomy::new(7, 42));
    assert!(approx_eq(ann.aabb().x_min, 0.125));
    assert!(approx_eq(ann.aabb().y_max, 0.8));

    let _ = std::fs::remove_dir_all(&root);
}
