//! Wire records exchanged with the annotation backend.
//!
//! The backend schema grew over time, so an incoming record may carry its
//! geometry in one of several encodings and under several field spellings.
//! [`GeometryFields::decode`] resolves them in a fixed priority order:
//!
//! 1. a 4-point `polygon` field
//! 2. a JSON-encoded polygon string (`PolyJson`)
//! 3. four explicit corner points (`P1X` .. `P4Y`)
//! 4. explicit box parameters (`cx`, `cy`, `w`, `h`, `angle`)
//! 5. axis-aligned extrema (`x_min` .. `y_max`, or a `bbox` array), angle 0
//!
//! Outgoing records carry every encoding so any schema version can read them.

use galabone_geom::{Aabb, ObbParams, Point, Polygon, polygon_to_obb};
use serde::{Deserialize, Deserializer, Serialize};

use crate::format::error::FormatError;
use crate::model::{Annotation, AnnotationId, Taxonomy};

/// How far outside `[0,1]` a decoded coordinate may stray before the polygon
/// is treated as not normalized.
const NORMALIZED_TOLERANCE: f32 = 1e-3;

/// A polygon as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PolygonField {
    /// `[[x, y], ...]`
    Pairs(Vec<[f32; 2]>),
    /// `[{"x": .., "y": ..}, ...]`
    Points(Vec<Point>),
    /// `[x1, y1, x2, y2, ...]`
    Flat(Vec<f32>),
}

impl PolygonField {
    pub fn from_polygon(polygon: &Polygon) -> Self {
        PolygonField::Pairs(polygon.iter().map(|p| [p.x, p.y]).collect())
    }

    /// Validate and convert to a normalized four-corner polygon.
    pub fn to_polygon(&self) -> Result<Polygon, FormatError> {
        let points: Vec<Point> = match self {
            PolygonField::Pairs(pairs) => pairs.iter().map(|[x, y]| Point::new(*x, *y)).collect(),
            PolygonField::Points(points) => points.clone(),
            PolygonField::Flat(values) => {
                if values.len() % 2 != 0 {
                    return Err(FormatError::invalid_polygon(format!(
                        "odd number of coordinates ({})",
                        values.len()
                    )));
                }
                values
                    .chunks_exact(2)
                    .map(|c| Point::new(c[0], c[1]))
                    .collect()
            }
        };
        normalized_polygon(&points)
    }
}

fn normalized_polygon(points: &[Point]) -> Result<Polygon, FormatError> {
    let polygon: Polygon = points.try_into().map_err(|_| {
        FormatError::invalid_polygon(format!("expected 4 points, found {}", points.len()))
    })?;

    let range = -NORMALIZED_TOLERANCE..=1.0 + NORMALIZED_TOLERANCE;
    for p in &polygon {
        if !p.x.is_finite() || !p.y.is_finite() {
            return Err(FormatError::invalid_coordinates("non-finite polygon coordinate"));
        }
        if !range.contains(&p.x) || !range.contains(&p.y) {
            return Err(FormatError::invalid_coordinates(format!(
                "({}, {}) is not a normalized coordinate",
                p.x, p.y
            )));
        }
    }
    Ok(polygon.map(|p| p.clamped_unit()))
}

/// The geometry encoding a record was decoded from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeometryEncoding {
    Obb(ObbParams),
    Polygon(Polygon),
    PolygonJson(Polygon),
    CornerPoints(Polygon),
    Aabb(Aabb),
}

impl GeometryEncoding {
    /// Short name for log messages.
    pub fn name(&self) -> &'static str {
        match self {
            GeometryEncoding::Obb(_) => "obb",
            GeometryEncoding::Polygon(_) => "polygon",
            GeometryEncoding::PolygonJson(_) => "poly_json",
            GeometryEncoding::CornerPoints(_) => "corner_points",
            GeometryEncoding::Aabb(_) => "aabb",
        }
    }

    /// Box parameters for this encoding.
    pub fn to_obb(&self) -> ObbParams {
        match self {
            GeometryEncoding::Obb(obb) => *obb,
            GeometryEncoding::Polygon(polygon)
            | GeometryEncoding::PolygonJson(polygon)
            | GeometryEncoding::CornerPoints(polygon) => polygon_to_obb(polygon),
            GeometryEncoding::Aabb(aabb) => ObbParams::from_aabb(aabb),
        }
    }
}

/// Every geometry field any backend schema version has used.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeometryFields {
    #[serde(rename = "cx", alias = "centerX", alias = "center_x", default, skip_serializing_if = "Option::is_none")]
    pub center_x: Option<f32>,
    #[serde(rename = "cy", alias = "centerY", alias = "center_y", default, skip_serializing_if = "Option::is_none")]
    pub center_y: Option<f32>,
    #[serde(rename = "w", alias = "width", default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f32>,
    #[serde(rename = "h", alias = "height", default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f32>,
    #[serde(rename = "angle", alias = "angleDegrees", alias = "angle_degrees", alias = "angleDeg", default, skip_serializing_if = "Option::is_none")]
    pub angle_degrees: Option<f32>,

    #[serde(rename = "polygon", alias = "poly", default, skip_serializing_if = "Option::is_none")]
    pub polygon: Option<PolygonField>,

    #[serde(rename = "poly_json", alias = "PolyJson", alias = "polyJson", default, skip_serializing_if = "Option::is_none")]
    pub poly_json: Option<String>,

    #[serde(rename = "P1X", alias = "p1x", alias = "p1_x", default, skip_serializing_if = "Option::is_none")]
    pub p1x: Option<f32>,
    #[serde(rename = "P1Y", alias = "p1y", alias = "p1_y", default, skip_serializing_if = "Option::is_none")]
    pub p1y: Option<f32>,
    #[serde(rename = "P2X", alias = "p2x", alias = "p2_x", default, skip_serializing_if = "Option::is_none")]
    pub p2x: Option<f32>,
    #[serde(rename = "P2Y", alias = "p2y", alias = "p2_y", default, skip_serializing_if = "Option::is_none")]
    pub p2y: Option<f32>,
    #[serde(rename = "P3X", alias = "p3x", alias = "p3_x", default, skip_serializing_if = "Option::is_none")]
    pub p3x: Option<f32>,
    #[serde(rename = "P3Y", alias = "p3y", alias = "p3_y", default, skip_serializing_if = "Option::is_none")]
    pub p3y: Option<f32>,
    #[serde(rename = "P4X", alias = "p4x", alias = "p4_x", default, skip_serializing_if = "Option::is_none")]
    pub p4x: Option<f32>,
    #[serde(rename = "P4Y", alias = "p4y", alias = "p4_y", default, skip_serializing_if = "Option::is_none")]
    pub p4y: Option<f32>,

    #[serde(rename = "x_min", alias = "xMin", alias = "XMin", alias = "X_min", default, skip_serializing_if = "Option::is_none")]
    pub x_min: Option<f32>,
    #[serde(rename = "y_min", alias = "yMin", alias = "YMin", alias = "Y_min", default, skip_serializing_if = "Option::is_none")]
    pub y_min: Option<f32>,
    #[serde(rename = "x_max", alias = "xMax", alias = "XMax", alias = "X_max", default, skip_serializing_if = "Option::is_none")]
    pub x_max: Option<f32>,
    #[serde(rename = "y_max", alias = "yMax", alias = "YMax", alias = "Y_max", default, skip_serializing_if = "Option::is_none")]
    pub y_max: Option<f32>,

    /// `[x1, y1, x2, y2]` as served with detections; entries may be null.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<Vec<Option<f32>>>,
}

impl GeometryFields {
    /// Fill every encoding from an annotation.
    pub fn from_annotation(annotation: &Annotation) -> Self {
        let obb = annotation.obb();
        let polygon = annotation.polygon();
        let aabb = annotation.aabb();
        let pairs: Vec<[f32; 2]> = polygon.iter().map(|p| [p.x, p.y]).collect();

        Self {
            center_x: Some(obb.center_x),
            center_y: Some(obb.center_y),
            width: Some(obb.width),
            height: Some(obb.height),
            angle_degrees: Some(obb.angle_degrees),
            polygon: Some(PolygonField::from_polygon(polygon)),
            poly_json: serde_json::to_string(&pairs).ok(),
            p1x: Some(polygon[0].x),
            p1y: Some(polygon[0].y),
            p2x: Some(polygon[1].x),
            p2y: Some(polygon[1].y),
            p3x: Some(polygon[2].x),
            p3y: Some(polygon[2].y),
            p4x: Some(polygon[3].x),
            p4y: Some(polygon[3].y),
            x_min: Some(aabb.x_min),
            y_min: Some(aabb.y_min),
            x_max: Some(aabb.x_max),
            y_max: Some(aabb.y_max),
            bbox: None,
        }
    }

    /// Resolve the highest-priority usable encoding.
    ///
    /// A present but malformed encoding is logged and skipped in favour of
    /// the next one.
    pub fn decode(&self) -> Result<GeometryEncoding, FormatError> {
        if let Some(field) = &self.polygon {
            match field.to_polygon() {
                Ok(polygon) => return Ok(GeometryEncoding::Polygon(polygon)),
                Err(e) => log::warn!("Skipping polygon field: {}", e),
            }
        }

        if let Some(json) = self
            .poly_json
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty() && *s != "null")
        {
            let decoded = serde_json::from_str::<PolygonField>(json)
                .map_err(FormatError::from)
                .and_then(|field| field.to_polygon());
            match decoded {
                Ok(polygon) => return Ok(GeometryEncoding::PolygonJson(polygon)),
                Err(e) => log::warn!("Skipping polygon JSON: {}", e),
            }
        }

        if let Some(points) = self.corner_points() {
            match normalized_polygon(&points) {
                Ok(polygon) => return Ok(GeometryEncoding::CornerPoints(polygon)),
                Err(e) => log::warn!("Skipping corner points: {}", e),
            }
        }

        if let Some(obb) = self.obb_params() {
            return Ok(GeometryEncoding::Obb(obb));
        }

        self.aabb()
            .map(GeometryEncoding::Aabb)
            .ok_or(FormatError::MissingGeometry)
    }

    fn obb_params(&self) -> Option<ObbParams> {
        let obb = ObbParams::new(
            self.center_x?,
            self.center_y?,
            self.width?,
            self.height?,
            self.angle_degrees.unwrap_or(0.0),
        );
        let finite = [obb.center_x, obb.center_y, obb.width, obb.height, obb.angle_degrees]
            .iter()
            .all(|v| v.is_finite());
        (finite && obb.width > 0.0 && obb.height > 0.0).then_some(obb)
    }

    fn corner_points(&self) -> Option<[Point; 4]> {
        Some([
            Point::new(self.p1x?, self.p1y?),
            Point::new(self.p2x?, self.p2y?),
            Point::new(self.p3x?, self.p3y?),
            Point::new(self.p4x?, self.p4y?),
        ])
    }

    fn aabb(&self) -> Option<Aabb> {
        let extrema = match (self.x_min, self.y_min, self.x_max, self.y_max) {
            (Some(x_min), Some(y_min), Some(x_max), Some(y_max)) => [x_min, y_min, x_max, y_max],
            _ => match self.bbox.as_deref() {
                Some([Some(x1), Some(y1), Some(x2), Some(y2)]) => [*x1, *y1, *x2, *y2],
                _ => return None,
            },
        };
        if !extrema.iter().all(|v| v.is_finite()) {
            return None;
        }
        let [x1, y1, x2, y2] = extrema;
        Some(Aabb::from_corners(Point::new(x1, y1), Point::new(x2, y2)).clamped_unit())
    }
}

/// One saved annotation, as loaded from or sent to the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    #[serde(rename = "annotationId", alias = "annotation_id", alias = "id", default, skip_serializing_if = "Option::is_none")]
    pub annotation_id: Option<AnnotationId>,
    #[serde(rename = "bigBoneId", alias = "big_bone_id", alias = "categoryId", alias = "category_id", default)]
    pub category_id: Option<u32>,
    #[serde(rename = "smallBoneId", alias = "small_bone_id", alias = "subcategoryId", alias = "subcategory_id", default)]
    pub subcategory_id: Option<u32>,
    #[serde(flatten)]
    pub geometry: GeometryFields,
}

impl AnnotationRecord {
    /// Build an outgoing record carrying every geometry encoding.
    pub fn from_annotation(annotation: &Annotation) -> Self {
        let taxonomy = annotation.taxonomy();
        Self {
            annotation_id: None,
            category_id: taxonomy.category_id,
            subcategory_id: taxonomy.subcategory_id,
            geometry: GeometryFields::from_annotation(annotation),
        }
    }

    pub fn taxonomy(&self) -> Taxonomy {
        Taxonomy {
            category_id: self.category_id,
            subcategory_id: self.subcategory_id,
        }
    }

    /// Decode into taxonomy and authoritative box parameters.
    pub fn decode(&self) -> Result<(Taxonomy, ObbParams), FormatError> {
        let encoding = self.geometry.decode()?;
        log::trace!(
            "Decoded annotation record {:?} from {}",
            self.annotation_id,
            encoding.name()
        );
        Ok((self.taxonomy(), encoding.to_obb()))
    }
}

/// A machine-generated candidate box.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionRecord {
    #[serde(alias = "detectionId", alias = "detection_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(rename = "boneId", alias = "bone_id", alias = "categoryId", alias = "category_id", default)]
    pub category_id: Option<u32>,
    #[serde(rename = "smallBoneId", alias = "small_bone_id", alias = "subcategoryId", alias = "subcategory_id", default)]
    pub subcategory_id: Option<u32>,
    #[serde(alias = "conf", alias = "score", alias = "Confidence", default)]
    pub confidence: Option<f32>,
    /// Model class name, e.g. `Thoracic_Vertebrae`, or the numeric class id
    /// as text when only `Label41` was served.
    #[serde(alias = "cls_name", alias = "label41", alias = "Label41", default, deserialize_with = "label_text")]
    pub label: Option<String>,
    #[serde(flatten)]
    pub geometry: GeometryFields,
}

/// A class label as served: a name, or a bare class number.
#[derive(Deserialize)]
#[serde(untagged)]
enum LabelValue {
    Name(String),
    Class(serde_json::Number),
}

fn label_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<LabelValue>::deserialize(deserializer)?.map(|label| match label {
        LabelValue::Name(name) => name,
        LabelValue::Class(class) => class.to_string(),
    }))
}
