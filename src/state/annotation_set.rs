//! Per-image annotation storage with a single active selection.

use galabone_geom::{Aabb, ObbParams};

use crate::constants::MIN_BOX_DIMENSION;
use crate::model::{Annotation, AnnotationId, Taxonomy};

/// Partial change to an annotation's box parameters.
///
/// Unset fields keep their current value. The patch is always applied to the
/// authoritative [`ObbParams`] and the polygon/AABB re-derived afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GeometryPatch {
    pub center_x: Option<f32>,
    pub center_y: Option<f32>,
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub angle_degrees: Option<f32>,
}

impl GeometryPatch {
    /// A patch that replaces every parameter.
    pub fn replace(obb: &ObbParams) -> Self {
        Self {
            center_x: Some(obb.center_x),
            center_y: Some(obb.center_y),
            width: Some(obb.width),
            height: Some(obb.height),
            angle_degrees: Some(obb.angle_degrees),
        }
    }

    /// A patch that replaces the geometry with an unrotated box covering `aabb`.
    pub fn from_aabb(aabb: &Aabb) -> Self {
        Self::replace(&ObbParams::from_aabb(aabb))
    }

    pub fn center(x: f32, y: f32) -> Self {
        Self {
            center_x: Some(x),
            center_y: Some(y),
            ..Default::default()
        }
    }

    pub fn angle(angle_degrees: f32) -> Self {
        Self {
            angle_degrees: Some(angle_degrees),
            ..Default::default()
        }
    }

    /// Apply to existing parameters.
    pub fn apply(&self, obb: &ObbParams) -> ObbParams {
        ObbParams {
            center_x: self.center_x.unwrap_or(obb.center_x),
            center_y: self.center_y.unwrap_or(obb.center_y),
            width: self.width.unwrap_or(obb.width),
            height: self.height.unwrap_or(obb.height),
            angle_degrees: self.angle_degrees.unwrap_or(obb.angle_degrees),
        }
    }
}

/// Partial change to an annotation.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AnnotationPatch {
    pub taxonomy: Option<Taxonomy>,
    pub geometry: Option<GeometryPatch>,
}

impl AnnotationPatch {
    pub fn geometry(patch: GeometryPatch) -> Self {
        Self {
            taxonomy: None,
            geometry: Some(patch),
        }
    }

    pub fn taxonomy(taxonomy: Taxonomy) -> Self {
        Self {
            taxonomy: Some(taxonomy),
            geometry: None,
        }
    }
}

/// The ordered annotations of one image plus at most one active annotation.
#[derive(Debug, Clone)]
pub struct AnnotationSet {
    annotations: Vec<Annotation>,
    next_id: AnnotationId,
    active: Option<AnnotationId>,
    /// Floor for box width and height in normalized units.
    min_box_dimension: f32,
}

impl AnnotationSet {
    pub fn new() -> Self {
        Self {
            annotations: Vec::new(),
            next_id: 1,
            active: None,
            min_box_dimension: MIN_BOX_DIMENSION,
        }
    }

    /// Use a different size floor for boxes created or updated from now on.
    pub fn with_min_box_dimension(mut self, min_box_dimension: f32) -> Self {
        self.min_box_dimension = min_box_dimension;
        self
    }

    fn allocate_id(&mut self) -> AnnotationId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Create an unrotated annotation from a drawn box and return its ID.
    pub fn create(&mut self, taxonomy: Taxonomy, aabb: &Aabb) -> AnnotationId {
        self.create_with_obb(taxonomy, ObbParams::from_aabb(aabb))
    }

    /// Create an annotation from explicit box parameters and return its ID.
    pub fn create_with_obb(&mut self, taxonomy: Taxonomy, obb: ObbParams) -> AnnotationId {
        let id = self.allocate_id();
        self.annotations
            .push(Annotation::with_min_size(id, taxonomy, obb, self.min_box_dimension));
        log::debug!("Created annotation {} ({:?})", id, taxonomy);
        id
    }

    /// Apply a patch. Returns `false` if no annotation has this ID.
    pub fn update(&mut self, id: AnnotationId, patch: AnnotationPatch) -> bool {
        let min_size = self.min_box_dimension;
        let Some(annotation) = self.annotations.iter_mut().find(|a| a.id() == id) else {
            log::debug!("Ignoring update for unknown annotation {}", id);
            return false;
        };

        if let Some(taxonomy) = patch.taxonomy {
            annotation.set_taxonomy(taxonomy);
        }
        if let Some(geometry) = patch.geometry {
            let obb = geometry.apply(annotation.obb());
            annotation.set_obb(obb, min_size);
        }
        true
    }

    /// Remove an annotation. Clears the active selection if it pointed here.
    pub fn delete(&mut self, id: AnnotationId) -> Option<Annotation> {
        let index = self.annotations.iter().position(|a| a.id() == id)?;
        let removed = self.annotations.remove(index);
        if self.active == Some(id) {
            self.active = None;
        }
        Some(removed)
    }

    /// Select an annotation, or clear the selection with `None`.
    ///
    /// Unknown IDs clear the selection.
    pub fn set_active(&mut self, id: Option<AnnotationId>) {
        self.active = id.filter(|id| self.get(*id).is_some());
    }

    pub fn active_id(&self) -> Option<AnnotationId> {
        self.active
    }

    pub fn active(&self) -> Option<&Annotation> {
        self.active.and_then(|id| self.get(id))
    }

    /// Replace every annotation, e.g. after loading an image's saved boxes.
    ///
    /// Each incoming annotation gets a fresh ID so IDs stay unique.
    pub fn replace_all<I>(&mut self, annotations: I)
    where
        I: IntoIterator<Item = (Taxonomy, ObbParams)>,
    {
        self.annotations.clear();
        self.active = None;
        self.next_id = 1;
        for (taxonomy, obb) in annotations {
            let id = self.allocate_id();
            self.annotations
                .push(Annotation::with_min_size(id, taxonomy, obb, self.min_box_dimension));
        }
    }

    /// Remove every annotation.
    pub fn clear(&mut self) {
        self.annotations.clear();
        self.active = None;
    }

    pub fn get(&self, id: AnnotationId) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.id() == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Annotation> {
        self.annotations.iter()
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }
}

impl Default for AnnotationSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_set() -> (AnnotationSet, AnnotationId, AnnotationId) {
        let mut set = AnnotationSet::new();
        let a = set.create(Taxonomy::new(1, 10), &Aabb::new(0.1, 0.1, 0.3, 0.3));
        let b = set.create(Taxonomy::new(2, 20), &Aabb::new(0.5, 0.5, 0.9, 0.7));
        (set, a, b)
    }

    #[test]
    fn test_ids_are_unique() {
        let (set, a, b) = sample_set();
        assert_ne!(a, b);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_delete_active_clears_selection() {
        let (mut set, a, b) = sample_set();
        set.set_active(Some(a));
        assert_eq!(set.active_id(), Some(a));

        set.delete(b);
        assert_eq!(set.active_id(), Some(a));

        set.delete(a);
        assert_eq!(set.active_id(), None);
        assert_eq!(set.len(), 0);
    }

    #[test]
    fn test_set_active_unknown_id_clears() {
        let (mut set, a, _) = sample_set();
        set.set_active(Some(a));
        set.set_active(Some(999));
        assert_eq!(set.active_id(), None);
    }

    #[test]
    fn test_noop_geometry_patch_is_idempotent() {
        let (mut set, a, _) = sample_set();
        set.update(a, AnnotationPatch::geometry(GeometryPatch::angle(33.0)));
        let before = set.get(a).unwrap().clone();

        set.update(a, AnnotationPatch::geometry(GeometryPatch::default()));
        assert_eq!(set.get(a).unwrap(), &before);

        set.update(a, AnnotationPatch::geometry(GeometryPatch::replace(before.obb())));
        assert_eq!(set.get(a).unwrap(), &before);
    }

    #[test]
    fn test_partial_patch_rederives_polygon() {
        let (mut set, a, _) = sample_set();
        set.update(a, AnnotationPatch::geometry(GeometryPatch::angle(90.0)));
        let ann = set.get(a).unwrap();
        assert_eq!(*ann.polygon(), ann.obb().polygon());
        assert!((ann.obb().center_x - 0.2).abs() < 1e-6);
        assert!((ann.obb().width - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_taxonomy_patch_keeps_geometry() {
        let (mut set, a, _) = sample_set();
        let before = *set.get(a).unwrap().obb();
        assert!(set.update(a, AnnotationPatch::taxonomy(Taxonomy::new(3, 30))));
        let ann = set.get(a).unwrap();
        assert_eq!(ann.taxonomy(), Taxonomy::new(3, 30));
        assert_eq!(*ann.obb(), before);
    }

    #[test]
    fn test_update_unknown_id() {
        let (mut set, _, _) = sample_set();
        assert!(!set.update(999, AnnotationPatch::taxonomy(Taxonomy::default())));
    }

    #[test]
    fn test_replace_all_resets_selection() {
        let (mut set, a, _) = sample_set();
        set.set_active(Some(a));
        set.replace_all(vec![(
            Taxonomy::new(4, 40),
            ObbParams::new(0.5, 0.5, 0.1, 0.1, 0.0),
        )]);
        assert_eq!(set.len(), 1);
        assert_eq!(set.active_id(), None);
        assert_eq!(set.iter().next().unwrap().taxonomy(), Taxonomy::new(4, 40));
    }

    #[test]
    fn test_configured_floor_applies_to_every_path() {
        let mut set = AnnotationSet::new().with_min_box_dimension(0.001);
        let a = set.create_with_obb(Taxonomy::default(), ObbParams::new(0.5, 0.5, 0.002, 0.2, 0.0));
        assert_eq!(set.get(a).unwrap().obb().width, 0.002);

        let patch = GeometryPatch {
            height: Some(0.0),
            ..Default::default()
        };
        set.update(a, AnnotationPatch::geometry(patch));
        assert_eq!(set.get(a).unwrap().obb().height, 0.001);

        set.replace_all(vec![(Taxonomy::default(), ObbParams::new(0.5, 0.5, 0.002, 0.0015, 0.0))]);
        let ann = set.iter().next().unwrap();
        assert_eq!(ann.obb().width, 0.002);
        assert_eq!(ann.obb().height, 0.0015);
    }
}
