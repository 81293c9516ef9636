//! Core geometry value types.

use serde::{Deserialize, Serialize};

/// Clamp a coordinate into the normalized unit range.
#[inline]
pub fn clamp_unit(v: f32) -> f32 {
    v.clamp(0.0, 1.0)
}

/// A 2D point.
///
/// The same type is used for viewport pixels, image-local pixels and
/// normalized units; callers convert explicitly through [`crate::layout`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Calculate distance to another point.
    pub fn distance_to(&self, other: &Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Midpoint between this point and another.
    pub fn midpoint(&self, other: &Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    /// Both coordinates clamped into `[0,1]`.
    pub fn clamped_unit(&self) -> Point {
        Point::new(clamp_unit(self.x), clamp_unit(self.y))
    }
}

/// An oriented quadrilateral, four corners in winding order.
///
/// Corners produced by [`crate::obb_to_polygon`] are ordered top-left,
/// top-right, bottom-right, bottom-left of the unrotated rectangle.
pub type Polygon = [Point; 4];

/// An axis-aligned bounding box in normalized units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Aabb {
    pub x_min: f32,
    pub y_min: f32,
    pub x_max: f32,
    pub y_max: f32,
}

impl Aabb {
    pub const fn new(x_min: f32, y_min: f32, x_max: f32, y_max: f32) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    /// Create a box spanning two arbitrary corner points.
    pub fn from_corners(p1: Point, p2: Point) -> Self {
        Self {
            x_min: p1.x.min(p2.x),
            y_min: p1.y.min(p2.y),
            x_max: p1.x.max(p2.x),
            y_max: p1.y.max(p2.y),
        }
    }

    pub fn width(&self) -> f32 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f32 {
        self.y_max - self.y_min
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.x_min + self.x_max) / 2.0,
            (self.y_min + self.y_max) / 2.0,
        )
    }

    /// The four corners, clockwise from the top-left in screen orientation.
    pub fn corners(&self) -> Polygon {
        [
            Point::new(self.x_min, self.y_min),
            Point::new(self.x_max, self.y_min),
            Point::new(self.x_max, self.y_max),
            Point::new(self.x_min, self.y_max),
        ]
    }

    /// Copy with every extremum clamped into `[0,1]` and min/max reordered.
    pub fn clamped_unit(&self) -> Aabb {
        Aabb::from_corners(
            Point::new(clamp_unit(self.x_min), clamp_unit(self.y_min)),
            Point::new(clamp_unit(self.x_max), clamp_unit(self.y_max)),
        )
    }
}

/// Parameters of an oriented bounding box.
///
/// Center and size are in normalized units; the angle is in degrees and is
/// never canonicalized.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ObbParams {
    pub center_x: f32,
    pub center_y: f32,
    pub width: f32,
    pub height: f32,
    pub angle_degrees: f32,
}

impl ObbParams {
    pub const fn new(center_x: f32, center_y: f32, width: f32, height: f32, angle_degrees: f32) -> Self {
        Self {
            center_x,
            center_y,
            width,
            height,
            angle_degrees,
        }
    }

    /// Unrotated box covering `aabb`.
    pub fn from_aabb(aabb: &Aabb) -> Self {
        let center = aabb.center();
        Self::new(center.x, center.y, aabb.width(), aabb.height(), 0.0)
    }

    pub fn center(&self) -> Point {
        Point::new(self.center_x, self.center_y)
    }

    pub fn half_width(&self) -> f32 {
        self.width / 2.0
    }

    pub fn half_height(&self) -> f32 {
        self.height / 2.0
    }

    /// Copy with width and height floored at `min_size`.
    ///
    /// Non-finite sizes collapse to the floor as well.
    pub fn with_min_size(&self, min_size: f32) -> Self {
        let floor = |v: f32| if v.is_finite() { v.max(min_size) } else { min_size };
        Self {
            width: floor(self.width),
            height: floor(self.height),
            ..*self
        }
    }

    /// The rotated rectangle as a polygon.
    pub fn polygon(&self) -> Polygon {
        crate::kernel::obb_to_polygon(self.center(), self.width, self.height, self.angle_degrees)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aabb_from_corners_reversed() {
        let a = Aabb::from_corners(Point::new(0.6, 0.8), Point::new(0.1, 0.2));
        assert_eq!(a, Aabb::new(0.1, 0.2, 0.6, 0.8));
    }

    #[test]
    fn test_obb_from_aabb() {
        let obb = ObbParams::from_aabb(&Aabb::new(0.2, 0.4, 0.6, 0.5));
        assert!((obb.center_x - 0.4).abs() < 1e-6);
        assert!((obb.center_y - 0.45).abs() < 1e-6);
        assert!((obb.width - 0.4).abs() < 1e-6);
        assert!((obb.height - 0.1).abs() < 1e-6);
        assert_eq!(obb.angle_degrees, 0.0);
    }

    #[test]
    fn test_with_min_size() {
        let obb = ObbParams::new(0.5, 0.5, 0.0, f32::NAN, 10.0).with_min_size(0.005);
        assert_eq!(obb.width, 0.005);
        assert_eq!(obb.height, 0.005);
        assert_eq!(obb.angle_degrees, 10.0);
    }

    #[test]
    fn test_point_serializes_as_object() {
        let json = serde_json::to_string(&Point::new(0.25, 0.5)).unwrap();
        assert_eq!(json, r#"{"x":0.25,"y":0.5}"#);
    }
}
