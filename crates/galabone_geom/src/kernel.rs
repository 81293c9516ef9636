//! Pure geometry functions over normalized coordinates.
//!
//! Angles are in degrees. A positive angle follows the direction in which
//! `atan2` grows for screen-space deltas (y pointing down), so a box dragged
//! with the rotation handle turns the same way the pointer travels.

use crate::types::{clamp_unit, Aabb, ObbParams, Point, Polygon};

/// Rotate `p` about `center` without clamping.
fn rotate_raw(p: Point, center: Point, angle_degrees: f32) -> Point {
    let (sin, cos) = angle_degrees.to_radians().sin_cos();
    let dx = p.x - center.x;
    let dy = p.y - center.y;
    Point::new(
        center.x + dx * cos - dy * sin,
        center.y + dx * sin + dy * cos,
    )
}

/// Rotate `p` about `center` by `angle_degrees`, clamping the result into `[0,1]`.
///
/// Corners of a box rotated across the image border are clipped to the
/// border; the authoritative [`ObbParams`] keep the true shape.
pub fn rotate_point(p: Point, center: Point, angle_degrees: f32) -> Point {
    rotate_raw(p, center, angle_degrees).clamped_unit()
}

/// Build the polygon of a `width`×`height` rectangle centered at `center`
/// and rotated by `angle_degrees`.
pub fn obb_to_polygon(center: Point, width: f32, height: f32, angle_degrees: f32) -> Polygon {
    let hw = width / 2.0;
    let hh = height / 2.0;
    [
        Point::new(center.x - hw, center.y - hh),
        Point::new(center.x + hw, center.y - hh),
        Point::new(center.x + hw, center.y + hh),
        Point::new(center.x - hw, center.y + hh),
    ]
    .map(|corner| rotate_point(corner, center, angle_degrees))
}

/// Tight axis-aligned bounds of a polygon, clamped into `[0,1]`.
pub fn polygon_to_aabb(polygon: &Polygon) -> Aabb {
    let mut aabb = Aabb::new(f32::INFINITY, f32::INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY);
    for p in polygon {
        let (x, y) = (clamp_unit(p.x), clamp_unit(p.y));
        aabb.x_min = aabb.x_min.min(x);
        aabb.y_min = aabb.y_min.min(y);
        aabb.x_max = aabb.x_max.max(x);
        aabb.y_max = aabb.y_max.max(y);
    }
    aabb
}

/// Arithmetic mean of the four corners.
pub fn polygon_center(polygon: &Polygon) -> Point {
    let (sx, sy) = polygon
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
    Point::new(sx / 4.0, sy / 4.0)
}

/// Express `point` as an offset from `center` along the box's own axes.
///
/// This is the inverse rotation by `-angle_degrees`; the result is not
/// clamped because it is a relative offset, not a position.
pub fn to_local_frame(point: Point, center: Point, angle_degrees: f32) -> Point {
    let local = rotate_raw(point, center, -angle_degrees);
    Point::new(local.x - center.x, local.y - center.y)
}

/// Signed area (shoelace formula).
pub fn polygon_area(polygon: &Polygon) -> f32 {
    let mut twice = 0.0;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        twice += polygon[j].x * polygon[i].y - polygon[i].x * polygon[j].y;
        j = i;
    }
    twice / 2.0
}

/// Ray-casting containment test.
///
/// A polygon with no area (zero width or zero height) never contains a point.
pub fn point_in_polygon(point: Point, polygon: &Polygon) -> bool {
    if polygon_area(polygon).abs() < f32::EPSILON {
        return false;
    }

    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let vi = polygon[i];
        let vj = polygon[j];
        if ((vi.y > point.y) != (vj.y > point.y))
            && (point.x < (vj.x - vi.x) * (point.y - vi.y) / (vj.y - vi.y) + vi.x)
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Recover box parameters from a four-corner polygon.
///
/// Width follows the first edge, height the second, and the angle is the
/// direction of the first edge. For the corner order produced by
/// [`obb_to_polygon`] this inverts it exactly (barring clamping).
pub fn polygon_to_obb(polygon: &Polygon) -> ObbParams {
    let center = polygon_center(polygon);
    let [p0, p1, p2, _] = *polygon;
    let width = p0.distance_to(&p1);
    let height = p1.distance_to(&p2);
    let angle = if width > 0.0 {
        (p1.y - p0.y).atan2(p1.x - p0.x).to_degrees()
    } else {
        0.0
    };
    ObbParams::new(center.x, center.y, width, height, angle)
}

/// Direction from `center` to `p` in degrees.
pub fn angle_to_point(center: Point, p: Point) -> f32 {
    (p.y - center.y).atan2(p.x - center.x).to_degrees()
}

/// Fold an angle into `[0, 360)`.
pub fn normalize_angle(angle_degrees: f32) -> f32 {
    let a = angle_degrees.rem_euclid(360.0);
    // rem_euclid rounds tiny negative inputs up to exactly 360.0
    if a >= 360.0 {
        0.0
    } else {
        a
    }
}
