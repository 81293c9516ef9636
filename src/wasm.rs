//! Browser entry point.
//!
//! The host page owns the DOM, fetching and pointer capture. It forwards
//! pointer events here and draws the overlay JSON it gets back. Data flows
//! as JSON strings so no browser bindings are needed on this side.

use std::collections::HashMap;

use galabone_geom::{Point, Size};
use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::backend::{AnnotationBackend, BackendError, CaseId, ImageCase, MemoryBackend};
use crate::config::EditorConfig;
use crate::format::{AnnotationRecord, DetectionRecord, YoloFlavor};
use crate::interaction::{Effect, PointerEvent, PointerEventKind};
use crate::model::{Category, Subcategory, Taxonomy};
use crate::session::EditorSession;

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(log::Level::Info).is_err() {
        // Logger was already installed by an earlier instance
        return;
    }
    log::info!("galabone v{} loaded", env!("CARGO_PKG_VERSION"));
}

/// What the host has to do after a pointer event.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum HostEffect {
    CapturePointer { pointer_id: i32 },
    ReleasePointer { pointer_id: i32 },
    /// Annotations changed; redraw the overlay.
    Redraw,
    Notice { message: &'static str },
}

impl HostEffect {
    fn from_effect(effect: &Effect) -> Self {
        match *effect {
            Effect::CapturePointer(pointer_id) => HostEffect::CapturePointer { pointer_id },
            Effect::ReleasePointer(pointer_id) => HostEffect::ReleasePointer { pointer_id },
            Effect::Create { .. } | Effect::Update { .. } => HostEffect::Redraw,
            Effect::Notify(notice) => HostEffect::Notice {
                message: notice.message(),
            },
        }
    }
}

/// Body of a save request handed to the host.
#[derive(Debug, Serialize)]
struct SavePayload<'a> {
    #[serde(rename = "caseId")]
    case_id: CaseId,
    records: &'a [AnnotationRecord],
}

fn effects_json<'a>(effects: impl IntoIterator<Item = &'a Effect>) -> Result<String, JsError> {
    let effects: Vec<HostEffect> = effects.into_iter().map(HostEffect::from_effect).collect();
    Ok(serde_json::to_string(&effects)?)
}

fn parse_kind(kind: &str) -> Result<PointerEventKind, JsError> {
    match kind {
        "down" | "pointerdown" => Ok(PointerEventKind::Down),
        "move" | "pointermove" => Ok(PointerEventKind::Move),
        "up" | "pointerup" => Ok(PointerEventKind::Up),
        "cancel" | "pointercancel" | "lostpointercapture" => Ok(PointerEventKind::Cancel),
        other => Err(JsError::new(&format!("unknown pointer event kind: {}", other))),
    }
}

/// JS-facing editor.
///
/// Backend data fetched by the page is pushed in with [`WasmEditor::set_taxonomy`]
/// and [`WasmEditor::open_case`]; saves are handed back as JSON for the page
/// to send, and confirmed with [`WasmEditor::complete_save`].
#[wasm_bindgen]
pub struct WasmEditor {
    session: EditorSession,
    backend: MemoryBackend,
    /// Records captured by `begin_save`, by case, until the host reports back.
    pending_saves: HashMap<CaseId, Vec<AnnotationRecord>>,
}

#[wasm_bindgen]
impl WasmEditor {
    /// Create an editor, optionally from a serialized [`EditorConfig`].
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<WasmEditor, JsError> {
        let config = match config_json {
            Some(json) => EditorConfig::from_json(&json)?,
            None => EditorConfig::default(),
        };
        Ok(Self {
            session: EditorSession::new(config),
            backend: MemoryBackend::new(),
            pending_saves: HashMap::new(),
        })
    }

    /// Replace the category and sub-category lists.
    pub fn set_taxonomy(&mut self, categories_json: &str, subcategories_json: &str) -> Result<(), JsError> {
        let categories: Vec<Category> = serde_json::from_str(categories_json)?;
        let subcategories: Vec<Subcategory> = serde_json::from_str(subcategories_json)?;
        self.backend.set_taxonomy(categories, subcategories);
        self.session.load_taxonomy(&self.backend)?;
        Ok(())
    }

    pub fn categories_json(&self) -> Result<String, JsError> {
        Ok(serde_json::to_string(self.session.categories())?)
    }

    /// Sub-categories of the selected category.
    pub fn subcategories_json(&self) -> Result<String, JsError> {
        Ok(serde_json::to_string(self.session.subcategories())?)
    }

    pub fn select_category(&mut self, category_id: u32) -> Result<(), JsError> {
        self.session.select_category(&self.backend, category_id)?;
        Ok(())
    }

    pub fn select_subcategory(&mut self, subcategory_id: Option<u32>) {
        self.session.select_subcategory(subcategory_id);
    }

    /// Open an image case with its saved annotations and detections.
    ///
    /// Returns the effects JSON (a pointer release if a gesture was dropped).
    pub fn open_case(
        &mut self,
        case_json: &str,
        annotations_json: &str,
        detections_json: Option<String>,
    ) -> Result<String, JsError> {
        let case: ImageCase = serde_json::from_str(case_json)?;
        let records: Vec<AnnotationRecord> = serde_json::from_str(annotations_json)?;
        let detections: Vec<DetectionRecord> = match detections_json {
            Some(json) => serde_json::from_str(&json)?,
            None => Vec::new(),
        };

        let case_id = case.case_id;
        self.backend.insert_case(case, records);
        self.backend.set_detections(case_id, detections);

        let released = self.session.open_case(&self.backend, case_id);
        if let Err(e) = self.session.load_detections(&self.backend) {
            log::warn!("Case {}: detections unavailable: {}", case_id, e);
        }
        effects_json(released.iter())
    }

    /// Position and size of the image element in viewport pixels.
    pub fn set_container(&mut self, left: f32, top: f32, width: f32, height: f32) {
        self.session
            .set_container(Point::new(left, top), Size::new(width, height));
    }

    /// Pixel size of the loaded image.
    pub fn set_natural_size(&mut self, width: f32, height: f32) {
        self.session.set_natural_size(Size::new(width, height));
    }

    /// Feed a pointer event; returns the effects JSON.
    pub fn pointer(&mut self, kind: &str, pointer_id: i32, x: f32, y: f32) -> Result<String, JsError> {
        let event = PointerEvent::new(pointer_id, parse_kind(kind)?, x, y);
        let effects = self.session.pointer(event);
        effects_json(&effects)
    }

    /// Current overlay JSON, or `null` while the image is not laid out.
    pub fn overlay_json(&self) -> Result<String, JsError> {
        Ok(serde_json::to_string(&self.session.overlay())?)
    }

    pub fn interaction_state(&self) -> String {
        self.session.interaction_state().name().to_string()
    }

    pub fn set_active(&mut self, id: Option<u64>) {
        self.session.set_active(id);
    }

    pub fn active_id(&self) -> Option<u64> {
        self.session.annotations().active_id()
    }

    pub fn assign_taxonomy(&mut self, id: u64, category_id: Option<u32>, subcategory_id: Option<u32>) -> bool {
        self.session.assign_taxonomy(
            id,
            Taxonomy {
                category_id,
                subcategory_id,
            },
        )
    }

    pub fn delete(&mut self, id: u64) -> bool {
        self.session.delete(id)
    }

    /// Remove every annotation; returns the effects JSON.
    pub fn clear(&mut self) -> Result<String, JsError> {
        let released = self.session.clear();
        effects_json(released.iter())
    }

    /// Copy a detection into a new annotation and return its id.
    pub fn apply_detection(&mut self, index: usize) -> Result<u64, JsError> {
        Ok(self.session.apply_detection(index)?)
    }

    /// Outgoing records for the current annotations.
    pub fn records_json(&self) -> Result<String, JsError> {
        Ok(serde_json::to_string(&self.session.records())?)
    }

    /// Start a save for the open case.
    ///
    /// Returns `{"caseId", "records"}` JSON. The case id must be passed back
    /// to [`WasmEditor::complete_save`], since another case may be open by
    /// the time the request resolves.
    pub fn begin_save(&mut self) -> Result<String, JsError> {
        let (case_id, records) = self.session.begin_save()?;
        let payload = serde_json::to_string(&SavePayload {
            case_id,
            records: &records,
        })?;
        self.pending_saves.insert(case_id, records);
        Ok(payload)
    }

    /// Report the outcome of the request started by [`WasmEditor::begin_save`]
    /// for `case_id`.
    pub fn complete_save(&mut self, case_id: CaseId, error: Option<String>) -> Result<usize, JsError> {
        let records = self.pending_saves.remove(&case_id).unwrap_or_default();
        let result = match error {
            None => self
                .backend
                .save_annotations(case_id, &records)
                .map(|()| records.len()),
            Some(message) => Err(BackendError::Unavailable(message)),
        };
        Ok(self.session.complete_save(case_id, result)?)
    }

    pub fn is_dirty(&self) -> bool {
        self.session.is_dirty()
    }

    pub fn is_saving(&self) -> bool {
        self.session.is_saving()
    }

    pub fn status(&self) -> Option<String> {
        self.session.status().map(str::to_string)
    }

    /// YOLO label text for the current annotations.
    pub fn yolo_labels(&self, obb: bool) -> String {
        let flavor = if obb { YoloFlavor::Obb } else { YoloFlavor::Detect };
        self.session.yolo_labels(flavor).to_text()
    }
}
