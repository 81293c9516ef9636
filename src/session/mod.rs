//! Editor session: everything the annotation editor knows about one image.
//!
//! The session owns the annotation set, the image layout and the gesture
//! state machine. All mutation goes through its named operations; backend
//! calls are passed in so the session itself never does I/O on its own.

use galabone_geom::{ImageLayout, Point, Size, compute_image_layout};

use crate::backend::{AnnotationBackend, BackendError, CaseId};
use crate::config::EditorConfig;
use crate::detection::{Detection, assign_spine_levels, decode_detections};
use crate::error::EditorError;
use crate::format::{AnnotationRecord, YoloFlavor, YoloLabels, yolo_labels};
use crate::interaction::{Effect, InteractionContext, InteractionMachine, InteractionState, PointerEvent};
use crate::model::{AnnotationId, Category, Subcategory, Taxonomy};
use crate::overlay::{Overlay, build_overlay};
use crate::state::{AnnotationPatch, AnnotationSet, SaveOutcome, SaveTracker};

/// The annotation editor for one displayed image at a time.
#[derive(Debug)]
pub struct EditorSession {
    config: EditorConfig,

    categories: Vec<Category>,
    /// Sub-categories of the selected category.
    subcategories: Vec<Subcategory>,
    /// Taxonomy picked for new boxes.
    selection: Taxonomy,

    case_id: Option<CaseId>,
    annotations: AnnotationSet,
    machine: InteractionMachine,
    detections: Vec<Detection>,
    saves: SaveTracker,

    /// Top-left of the image container in viewport pixels.
    container_origin: Point,
    container: Option<Size>,
    natural: Option<Size>,
    layout: Option<ImageLayout>,

    /// Last user-facing status line.
    status: Option<String>,
}

impl EditorSession {
    pub fn new(config: EditorConfig) -> Self {
        let annotations =
            AnnotationSet::new().with_min_box_dimension(config.interaction.min_box_dimension);
        Self {
            config,
            categories: Vec::new(),
            subcategories: Vec::new(),
            selection: Taxonomy::default(),
            case_id: None,
            annotations,
            machine: InteractionMachine::new(),
            detections: Vec::new(),
            saves: SaveTracker::new(),
            container_origin: Point::default(),
            container: None,
            natural: None,
            layout: None,
            status: None,
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn annotations(&self) -> &AnnotationSet {
        &self.annotations
    }

    pub fn case_id(&self) -> Option<CaseId> {
        self.case_id
    }

    pub fn interaction_state(&self) -> &InteractionState {
        self.machine.state()
    }

    pub fn layout(&self) -> Option<&ImageLayout> {
        self.layout.as_ref()
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    fn set_status(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::debug!("Status: {}", message);
        self.status = Some(message);
    }

    fn backend_failed(&mut self, what: &str, error: &BackendError) {
        log::warn!("{} failed: {}", what, error);
        self.set_status(format!("{} failed: {}", what, error));
    }

    fn mark_edited(&mut self) {
        if let Some(case_id) = self.case_id {
            self.saves.mark_dirty(case_id);
        }
    }

    // ------------------------------------------------------------------
    // Taxonomy
    // ------------------------------------------------------------------

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn subcategories(&self) -> &[Subcategory] {
        &self.subcategories
    }

    pub fn selection(&self) -> Taxonomy {
        self.selection
    }

    /// Load the category list.
    pub fn load_taxonomy(&mut self, backend: &impl AnnotationBackend) -> Result<(), EditorError> {
        match backend.list_categories() {
            Ok(categories) => {
                log::info!("Loaded {} categories", categories.len());
                self.categories = categories;
                Ok(())
            }
            Err(e) => {
                self.backend_failed("Loading categories", &e);
                Err(e.into())
            }
        }
    }

    /// Pick a category and load its sub-categories.
    ///
    /// The sub-category selection is cleared.
    pub fn select_category(
        &mut self,
        backend: &impl AnnotationBackend,
        category_id: u32,
    ) -> Result<(), EditorError> {
        self.selection = Taxonomy {
            category_id: Some(category_id),
            subcategory_id: None,
        };
        self.subcategories.clear();

        match backend.list_subcategories(category_id) {
            Ok(subcategories) => {
                log::debug!(
                    "Category {}: {} sub-categories",
                    category_id,
                    subcategories.len()
                );
                self.subcategories = subcategories;
                Ok(())
            }
            Err(e) => {
                self.backend_failed("Loading sub-categories", &e);
                Err(e.into())
            }
        }
    }

    /// Pick a sub-category, or clear it with `None`.
    pub fn select_subcategory(&mut self, subcategory_id: Option<u32>) {
        self.selection.subcategory_id = subcategory_id;
    }

    // ------------------------------------------------------------------
    // Image case and layout
    // ------------------------------------------------------------------

    /// Switch to another image case and load its saved annotations.
    ///
    /// Any gesture in progress is dropped; the returned effect is the pointer
    /// release the host should perform. A failed load leaves the set empty.
    pub fn open_case(&mut self, backend: &impl AnnotationBackend, case_id: CaseId) -> Option<Effect> {
        let released = self.machine.reset();
        self.case_id = Some(case_id);
        self.status = None;
        self.detections.clear();
        self.natural = None;
        self.layout = None;

        let records = match backend.get_annotations(case_id) {
            Ok(records) => records,
            Err(e) => {
                self.backend_failed("Loading annotations", &e);
                Vec::new()
            }
        };

        let total = records.len();
        let decoded: Vec<_> = records
            .iter()
            .filter_map(|record| match record.decode() {
                Ok(annotation) => Some(annotation),
                Err(e) => {
                    log::warn!(
                        "Case {}: skipping annotation {:?}: {}",
                        case_id,
                        record.annotation_id,
                        e
                    );
                    None
                }
            })
            .collect();
        if decoded.len() < total {
            self.set_status(format!(
                "{} of {} saved annotations could not be read",
                total - decoded.len(),
                total
            ));
        }

        self.annotations.replace_all(decoded);
        log::info!("Opened case {} with {} annotations", case_id, self.annotations.len());
        released
    }

    /// Update the size of the element the image is drawn in.
    pub fn set_container_size(&mut self, size: Size) {
        self.container = Some(size);
        self.refresh_layout();
    }

    /// Update the container's position and size within the viewport.
    pub fn set_container(&mut self, origin: Point, size: Size) {
        self.container_origin = origin;
        self.set_container_size(size);
    }

    /// Update the natural (pixel) size of the displayed image.
    pub fn set_natural_size(&mut self, size: Size) {
        self.natural = Some(size);
        self.refresh_layout();
    }

    /// Recompute the image layout from the known sizes.
    pub fn refresh_layout(&mut self) -> Option<&ImageLayout> {
        self.layout = match (self.container, self.natural) {
            (Some(container), Some(natural)) => compute_image_layout(container, natural)
                .map(|layout| layout.translated(self.container_origin)),
            _ => None,
        };
        match &self.layout {
            Some(layout) => log::trace!("Image layout {:?}", layout),
            None => log::trace!("Image layout not measurable yet"),
        }
        self.layout.as_ref()
    }

    // ------------------------------------------------------------------
    // Editing
    // ------------------------------------------------------------------

    /// Feed one pointer event and apply its edits.
    ///
    /// Returns every effect so the host can capture or release the pointer
    /// and show notices.
    pub fn pointer(&mut self, event: PointerEvent) -> Vec<Effect> {
        let ctx = InteractionContext {
            annotations: &self.annotations,
            layout: self.layout.as_ref(),
            taxonomy: self.selection,
            config: &self.config.interaction,
        };
        let effects = self.machine.handle(event, &ctx);

        for effect in &effects {
            match *effect {
                Effect::Create { taxonomy, aabb } => {
                    let id = self.annotations.create(taxonomy, &aabb);
                    self.annotations.set_active(Some(id));
                    self.mark_edited();
                }
                Effect::Update { id, patch } => {
                    if self.annotations.update(id, patch) {
                        self.mark_edited();
                    }
                }
                Effect::Notify(notice) => self.set_status(notice.message()),
                Effect::CapturePointer(_) | Effect::ReleasePointer(_) => {}
            }
        }
        effects
    }

    pub fn set_active(&mut self, id: Option<AnnotationId>) {
        self.annotations.set_active(id);
    }

    /// Change the taxonomy of an existing annotation.
    pub fn assign_taxonomy(&mut self, id: AnnotationId, taxonomy: Taxonomy) -> bool {
        let updated = self.annotations.update(id, AnnotationPatch::taxonomy(taxonomy));
        if updated {
            self.mark_edited();
        }
        updated
    }

    pub fn delete(&mut self, id: AnnotationId) -> bool {
        let removed = self.annotations.delete(id).is_some();
        if removed {
            log::debug!("Deleted annotation {}", id);
            self.mark_edited();
        }
        removed
    }

    /// Remove every annotation and drop any gesture in progress.
    pub fn clear(&mut self) -> Option<Effect> {
        let released = self.machine.reset();
        if !self.annotations.is_empty() {
            self.mark_edited();
        }
        self.annotations.clear();
        released
    }

    // ------------------------------------------------------------------
    // Saving
    // ------------------------------------------------------------------

    /// Whether the open case has edits not yet saved.
    pub fn is_dirty(&self) -> bool {
        self.case_id.is_some_and(|id| self.saves.is_dirty(id))
    }

    pub fn is_saving(&self) -> bool {
        self.case_id.is_some_and(|id| self.saves.is_busy(id))
    }

    pub fn last_save_outcome(&self) -> Option<SaveOutcome> {
        self.case_id.and_then(|id| self.saves.last_outcome(id))
    }

    /// Outgoing records for the current annotations.
    pub fn records(&self) -> Vec<AnnotationRecord> {
        self.annotations.iter().map(AnnotationRecord::from_annotation).collect()
    }

    /// Validate and start a save of the open case.
    ///
    /// Returns the case and the records to send. The case stays busy until
    /// [`Self::complete_save`] is called with the backend's answer.
    pub fn begin_save(&mut self) -> Result<(CaseId, Vec<AnnotationRecord>), EditorError> {
        let result = self.validate_save();
        match result {
            Ok(case_id) => {
                self.saves.begin(case_id);
                Ok((case_id, self.records()))
            }
            Err(e) => {
                self.set_status(e.to_string());
                Err(e)
            }
        }
    }

    fn validate_save(&self) -> Result<CaseId, EditorError> {
        let case_id = self.case_id.ok_or(EditorError::NoCase)?;
        if self.saves.is_busy(case_id) {
            return Err(EditorError::SaveInProgress(case_id));
        }
        if self.annotations.is_empty() {
            return Err(EditorError::NoAnnotations);
        }
        if let Some(ann) = self.annotations.iter().find(|a| a.taxonomy().is_empty()) {
            return Err(EditorError::MissingTaxonomy { id: ann.id() });
        }
        Ok(case_id)
    }

    /// Record the backend's answer to a save started with [`Self::begin_save`].
    ///
    /// The annotation set is never touched, so a failed save can be retried.
    pub fn complete_save(
        &mut self,
        case_id: CaseId,
        result: Result<usize, BackendError>,
    ) -> Result<usize, EditorError> {
        match result {
            Ok(count) => {
                self.saves.finish(case_id, SaveOutcome::Saved);
                log::info!("Saved {} annotations for case {}", count, case_id);
                if self.case_id == Some(case_id) {
                    self.set_status(format!("Saved {} annotations", count));
                }
                Ok(count)
            }
            Err(e) => {
                self.saves.finish(case_id, SaveOutcome::Failed);
                log::error!("Saving case {} failed: {}", case_id, e);
                if self.case_id == Some(case_id) {
                    self.set_status(format!("Save failed: {}", e));
                }
                Err(e.into())
            }
        }
    }

    /// Save the open case through a synchronous backend.
    pub fn save(&mut self, backend: &mut impl AnnotationBackend) -> Result<usize, EditorError> {
        let (case_id, records) = self.begin_save()?;
        let result = backend
            .save_annotations(case_id, &records)
            .map(|()| records.len());
        self.complete_save(case_id, result)
    }

    // ------------------------------------------------------------------
    // Detections
    // ------------------------------------------------------------------

    pub fn detections(&self) -> &[Detection] {
        &self.detections
    }

    /// Load detections for the open case and label spine levels.
    pub fn load_detections(&mut self, backend: &impl AnnotationBackend) -> Result<usize, EditorError> {
        let case_id = self.case_id.ok_or(EditorError::NoCase)?;
        let records = match backend.list_detections(case_id) {
            Ok(records) => records,
            Err(e) => {
                self.backend_failed("Loading detections", &e);
                return Err(e.into());
            }
        };

        let mut detections = decode_detections(&records);
        assign_spine_levels(&mut detections);
        log::info!("Case {}: {} detections", case_id, detections.len());
        self.detections = detections;
        Ok(self.detections.len())
    }

    /// Detections passing the configured confidence threshold.
    pub fn visible_detections(&self) -> impl Iterator<Item = &Detection> {
        let min = self.config.detection.min_confidence;
        self.detections.iter().filter(move |d| d.passes(min))
    }

    /// Copy a detection into a new active annotation.
    ///
    /// Missing taxonomy levels are filled from the current selection.
    pub fn apply_detection(&mut self, index: usize) -> Result<AnnotationId, EditorError> {
        let detection = self
            .detections
            .get(index)
            .ok_or(EditorError::UnknownDetection(index))?;
        let taxonomy = Taxonomy {
            category_id: detection.taxonomy.category_id.or(self.selection.category_id),
            subcategory_id: detection.taxonomy.subcategory_id.or(self.selection.subcategory_id),
        };
        let obb = detection.obb();

        let id = self.annotations.create_with_obb(taxonomy, obb);
        self.annotations.set_active(Some(id));
        self.mark_edited();
        log::debug!("Applied detection {} as annotation {}", index, id);
        Ok(id)
    }

    // ------------------------------------------------------------------
    // Output
    // ------------------------------------------------------------------

    /// Current frame of the annotation layer, once the layout is known.
    pub fn overlay(&self) -> Option<Overlay> {
        let layout = self.layout.as_ref()?;
        Some(build_overlay(
            &self.annotations,
            self.machine.state(),
            &self.detections,
            self.config.detection.min_confidence,
            layout,
            self.config.interaction.rotate_handle_offset,
        ))
    }

    /// YOLO label lines for the current annotations.
    pub fn yolo_labels(&self, flavor: YoloFlavor) -> YoloLabels {
        yolo_labels(self.annotations.iter(), flavor)
    }
}

impl Default for EditorSession {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

#[cfg(test)]
mod tests;
