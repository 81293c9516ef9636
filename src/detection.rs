//! Machine-generated candidate boxes.
//!
//! Detections are decoded with the same tolerant geometry decoder as saved
//! annotations, shown as an overlay, and can be applied as new annotations.

use galabone_geom::{ObbParams, Polygon, polygon_to_aabb, polygon_to_obb};
use serde::Serialize;

use crate::format::{DetectionRecord, FormatError, GeometryEncoding};
use crate::model::Taxonomy;

/// Vertebral levels per spine class, top to bottom.
const SPINE_LEVELS: [(&str, &[&str]); 3] = [
    ("Cervical_Vertebrae", &["C1", "C2", "C3", "C4", "C5", "C6", "C7"]),
    (
        "Thoracic_Vertebrae",
        &["T1", "T2", "T3", "T4", "T5", "T6", "T7", "T8", "T9", "T10", "T11", "T12"],
    ),
    ("Lumbar_Vertebrae", &["L1", "L2", "L3", "L4", "L5"]),
];

/// Level given to a spine detection beyond the last known level.
pub const UNKNOWN_LEVEL: &str = "unknown";

/// A decoded detection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
    pub id: Option<u64>,
    pub taxonomy: Taxonomy,
    pub confidence: Option<f32>,
    /// Model class name.
    pub label: Option<String>,
    /// Vertebral level such as `T4`, set by [`assign_spine_levels`].
    pub level: Option<String>,
    /// Normalized corners.
    pub polygon: Polygon,
}

impl Detection {
    pub fn from_record(record: &DetectionRecord) -> Result<Self, FormatError> {
        let polygon = match record.geometry.decode()? {
            GeometryEncoding::Obb(obb) => obb.polygon(),
            GeometryEncoding::Polygon(p)
            | GeometryEncoding::PolygonJson(p)
            | GeometryEncoding::CornerPoints(p) => p,
            GeometryEncoding::Aabb(aabb) => aabb.corners(),
        };
        Ok(Self {
            id: record.id,
            taxonomy: Taxonomy {
                category_id: record.category_id,
                subcategory_id: record.subcategory_id,
            },
            confidence: record.confidence,
            label: record.label.clone(),
            level: None,
            polygon,
        })
    }

    /// Box parameters for a new annotation, keeping the detection's rotation.
    pub fn obb(&self) -> ObbParams {
        polygon_to_obb(&self.polygon)
    }

    /// Whether the detection passes a confidence threshold.
    ///
    /// Detections without a confidence always pass.
    pub fn passes(&self, min_confidence: f32) -> bool {
        self.confidence.is_none_or(|c| c >= min_confidence)
    }

    fn y_center(&self) -> f32 {
        polygon_to_aabb(&self.polygon).center().y
    }
}

/// Decode detection records, skipping those without usable geometry.
pub fn decode_detections(records: &[DetectionRecord]) -> Vec<Detection> {
    records
        .iter()
        .filter_map(|record| match Detection::from_record(record) {
            Ok(detection) => Some(detection),
            Err(e) => {
                log::warn!("Skipping detection {:?}: {}", record.id, e);
                None
            }
        })
        .collect()
}

/// Label spine detections with their vertebral level.
///
/// Within each spine class, detections are ranked top to bottom by the
/// vertical center of their bounds. Order of the slice is preserved.
pub fn assign_spine_levels(detections: &mut [Detection]) {
    for (class, levels) in SPINE_LEVELS {
        let mut ranked: Vec<usize> = detections
            .iter()
            .enumerate()
            .filter(|(_, d)| d.label.as_deref() == Some(class))
            .map(|(i, _)| i)
            .collect();
        ranked.sort_by(|&a, &b| detections[a].y_center().total_cmp(&detections[b].y_center()));

        for (rank, index) in ranked.into_iter().enumerate() {
            let level = levels.get(rank).copied().unwrap_or(UNKNOWN_LEVEL);
            detections[index].level = Some(level.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use galabone_geom::{Aabb, Point};

    use super::*;

    fn spine(label: &str, y: f32) -> Detection {
        Detection {
            id: None,
            taxonomy: Taxonomy::default(),
            confidence: Some(0.9),
            label: Some(label.to_string()),
            level: None,
            polygon: Aabb::new(0.4, y, 0.6, y + 0.02).corners(),
        }
    }

    #[test]
    fn test_levels_follow_vertical_order() {
        let mut dets = vec![
            spine("Lumbar_Vertebrae", 0.8),
            spine("Cervical_Vertebrae", 0.2),
            spine("Lumbar_Vertebrae", 0.7),
            spine("Femur", 0.9),
            spine("Cervical_Vertebrae", 0.1),
        ];
        assign_spine_levels(&mut dets);

        let levels: Vec<Option<&str>> = dets.iter().map(|d| d.level.as_deref()).collect();
        assert_eq!(levels, vec![Some("L2"), Some("C2"), Some("L1"), None, Some("C1")]);
    }

    #[test]
    fn test_levels_past_the_end_are_unknown() {
        let mut dets: Vec<Detection> =
            (0..6).map(|i| spine("Lumbar_Vertebrae", i as f32 * 0.1)).collect();
        assign_spine_levels(&mut dets);
        assert_eq!(dets[4].level.as_deref(), Some("L5"));
        assert_eq!(dets[5].level.as_deref(), Some(UNKNOWN_LEVEL));
    }

    #[test]
    fn test_confidence_threshold() {
        let mut det = spine("Femur", 0.1);
        assert!(det.passes(0.3));
        det.confidence = Some(0.2);
        assert!(!det.passes(0.3));
        det.confidence = None;
        assert!(det.passes(0.3));
    }

    #[test]
    fn test_decode_skips_records_without_geometry() {
        let records: Vec<DetectionRecord> = serde_json::from_str(
            r#"[
                {"id": 1, "bbox": [0.1, 0.1, 0.3, 0.2], "boneId": 3},
                {"id": 2},
                {"id": 3, "cx": 0.5, "cy": 0.5, "w": 0.2, "h": 0.1, "angle": 90}
            ]"#,
        )
        .unwrap();
        let dets = decode_detections(&records);
        assert_eq!(dets.len(), 2);
        assert_eq!(dets[0].taxonomy.category_id, Some(3));
        assert_eq!(dets[0].polygon[0], Point::new(0.1, 0.1));

        let obb = dets[1].obb();
        assert!((obb.width - 0.2).abs() < 1e-4);
        assert!((obb.angle_degrees - 90.0).abs() < 1e-3);
    }
}
