//! Annotation data model.

use galabone_geom::{Aabb, ObbParams, Point, Polygon, point_in_polygon, polygon_to_aabb};
use serde::{Deserialize, Serialize};

use crate::constants::MIN_BOX_DIMENSION;

/// Unique identifier for an annotation within one annotation set.
pub type AnnotationId = u64;

/// Two-level bone classification assigned to an annotation.
///
/// Both levels stay `None` until the user picks them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Taxonomy {
    /// Coarse category ("big bone").
    pub category_id: Option<u32>,
    /// Fine sub-category ("small bone").
    pub subcategory_id: Option<u32>,
}

impl Taxonomy {
    /// Taxonomy with both levels assigned.
    pub fn new(category_id: u32, subcategory_id: u32) -> Self {
        Self {
            category_id: Some(category_id),
            subcategory_id: Some(subcategory_id),
        }
    }

    /// Whether both levels are assigned.
    pub fn is_complete(&self) -> bool {
        self.category_id.is_some() && self.subcategory_id.is_some()
    }

    /// Whether neither level is assigned.
    pub fn is_empty(&self) -> bool {
        self.category_id.is_none() && self.subcategory_id.is_none()
    }
}

/// A single oriented-box annotation.
///
/// [`ObbParams`] are authoritative. The polygon and the AABB are derived from
/// them on every geometry change and cannot be set independently, so the
/// three representations never diverge.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    id: AnnotationId,
    taxonomy: Taxonomy,
    obb: ObbParams,
    polygon: Polygon,
    aabb: Aabb,
}

impl Annotation {
    /// Create an annotation from box parameters.
    pub fn new(id: AnnotationId, taxonomy: Taxonomy, obb: ObbParams) -> Self {
        Self::with_min_size(id, taxonomy, obb, MIN_BOX_DIMENSION)
    }

    /// Create an annotation whose width and height are floored at `min_size`.
    pub fn with_min_size(id: AnnotationId, taxonomy: Taxonomy, obb: ObbParams, min_size: f32) -> Self {
        let mut annotation = Self {
            id,
            taxonomy,
            obb,
            polygon: [Point::default(); 4],
            aabb: Aabb::default(),
        };
        annotation.set_obb(obb, min_size);
        annotation
    }

    /// Create an unrotated annotation covering `aabb`.
    pub fn from_aabb(id: AnnotationId, taxonomy: Taxonomy, aabb: &Aabb) -> Self {
        Self::new(id, taxonomy, ObbParams::from_aabb(aabb))
    }

    pub fn id(&self) -> AnnotationId {
        self.id
    }

    pub fn taxonomy(&self) -> Taxonomy {
        self.taxonomy
    }

    pub fn obb(&self) -> &ObbParams {
        &self.obb
    }

    pub fn polygon(&self) -> &Polygon {
        &self.polygon
    }

    pub fn aabb(&self) -> &Aabb {
        &self.aabb
    }

    /// Check if a normalized point is inside the rotated box.
    pub fn contains(&self, p: Point) -> bool {
        point_in_polygon(p, &self.polygon)
    }

    /// Replace the box parameters and re-derive polygon and AABB.
    pub(crate) fn set_obb(&mut self, obb: ObbParams, min_size: f32) {
        self.obb = obb.with_min_size(min_size);
        self.polygon = self.obb.polygon();
        self.aabb = polygon_to_aabb(&self.polygon);
    }

    pub(crate) fn set_taxonomy(&mut self, taxonomy: Taxonomy) {
        self.taxonomy = taxonomy;
    }
}
