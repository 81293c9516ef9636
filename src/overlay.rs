//! Render model for the annotation layer.
//!
//! Everything here is in viewport pixels, projected from normalized space
//! through the current [`ImageLayout`]. The host draws it; nothing in the
//! editor reads it back.

use galabone_geom::{ImageLayout, Point, Polygon};
use serde::Serialize;

use crate::detection::Detection;
use crate::interaction::{Handle, InteractionState, resize_handles, rotate_handle_position};
use crate::model::{AnnotationId, Taxonomy};
use crate::state::AnnotationSet;

/// One annotation box.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayItem {
    pub id: AnnotationId,
    pub taxonomy: Taxonomy,
    pub polygon: Polygon,
    pub selected: bool,
}

/// Edit handles around the active annotation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayHandles {
    pub resize: Vec<(Handle, Point)>,
    pub rotate: Point,
    /// Vertex the rotation handle hangs from, for drawing its stem.
    pub rotate_anchor: Point,
}

/// A detection candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayDetection {
    /// Position in the session's detection list, used to apply it.
    pub index: usize,
    pub polygon: Polygon,
    pub label: Option<String>,
    pub level: Option<String>,
    pub confidence: Option<f32>,
}

/// A complete frame of the annotation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overlay {
    pub layout: ImageLayout,
    pub items: Vec<OverlayItem>,
    pub handles: Option<OverlayHandles>,
    /// Box being drawn, not yet committed.
    pub preview: Option<Polygon>,
    pub detections: Vec<OverlayDetection>,
}

impl Overlay {
    /// Check if the overlay is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.preview.is_none() && self.detections.is_empty()
    }
}

fn project(polygon: &Polygon, layout: &ImageLayout) -> Polygon {
    polygon.map(|p| layout.to_viewport(p))
}

/// Build an overlay from annotations, detections and the gesture state.
pub fn build_overlay(
    annotations: &AnnotationSet,
    state: &InteractionState,
    detections: &[Detection],
    min_confidence: f32,
    layout: &ImageLayout,
    rotate_handle_offset: f32,
) -> Overlay {
    let selected = annotations.active_id();

    let items = annotations
        .iter()
        .map(|ann| OverlayItem {
            id: ann.id(),
            taxonomy: ann.taxonomy(),
            polygon: project(ann.polygon(), layout),
            selected: selected == Some(ann.id()),
        })
        .collect();

    let handles = annotations.active().map(|ann| {
        let polygon = project(ann.polygon(), layout);
        let rotate = rotate_handle_position(&polygon, rotate_handle_offset);
        OverlayHandles {
            resize: resize_handles(&polygon).to_vec(),
            rotate,
            rotate_anchor: Point::new(rotate.x, rotate.y + rotate_handle_offset),
        }
    });

    let preview = state.draft().map(|aabb| project(&aabb.corners(), layout));

    let detections = detections
        .iter()
        .enumerate()
        .filter(|(_, d)| d.passes(min_confidence))
        .map(|(index, d)| OverlayDetection {
            index,
            polygon: project(&d.polygon, layout),
            label: d.label.clone(),
            level: d.level.clone(),
            confidence: d.confidence,
        })
        .collect();

    Overlay {
        layout: *layout,
        items,
        handles,
        preview,
        detections,
    }
}
