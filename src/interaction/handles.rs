//! Hit targets drawn around the active annotation.
//!
//! All positions here are viewport pixels.

use galabone_geom::{Point, Polygon};
use serde::Serialize;

/// One of the eight resize handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Handle {
    NorthWest,
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
}

impl Handle {
    pub const ALL: [Handle; 8] = [
        Handle::NorthWest,
        Handle::North,
        Handle::NorthEast,
        Handle::East,
        Handle::SouthEast,
        Handle::South,
        Handle::SouthWest,
        Handle::West,
    ];

    /// Whether dragging this handle changes the box width.
    pub fn resizes_width(self) -> bool {
        !matches!(self, Handle::North | Handle::South)
    }

    /// Whether dragging this handle changes the box height.
    pub fn resizes_height(self) -> bool {
        !matches!(self, Handle::East | Handle::West)
    }

    pub fn is_corner(self) -> bool {
        self.resizes_width() && self.resizes_height()
    }

    /// Position on a polygon ordered TL, TR, BR, BL.
    pub fn position(self, polygon: &Polygon) -> Point {
        let [tl, tr, br, bl] = polygon;
        match self {
            Handle::NorthWest => *tl,
            Handle::North => tl.midpoint(tr),
            Handle::NorthEast => *tr,
            Handle::East => tr.midpoint(br),
            Handle::SouthEast => *br,
            Handle::South => br.midpoint(bl),
            Handle::SouthWest => *bl,
            Handle::West => bl.midpoint(tl),
        }
    }
}

/// All eight handle positions.
pub fn resize_handles(polygon: &Polygon) -> [(Handle, Point); 8] {
    Handle::ALL.map(|h| (h, h.position(polygon)))
}

/// The rotation handle sits `offset` pixels above the topmost vertex.
pub fn rotate_handle_position(polygon: &Polygon, offset: f32) -> Point {
    let top = polygon
        .iter()
        .copied()
        .fold(polygon[0], |top, p| if p.y < top.y { p } else { top });
    Point::new(top.x, top.y - offset)
}

/// Closest resize handle within `radius`, if any.
pub fn hit_resize_handle(polygon: &Polygon, pointer: Point, radius: f32) -> Option<Handle> {
    resize_handles(polygon)
        .into_iter()
        .map(|(h, p)| (h, p.distance_to(&pointer)))
        .filter(|(_, d)| *d <= radius)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(h, _)| h)
}

/// Whether the pointer is on the rotation handle.
pub fn hit_rotate_handle(polygon: &Polygon, pointer: Point, offset: f32, radius: f32) -> bool {
    rotate_handle_position(polygon, offset).distance_to(&pointer) <= radius
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Polygon {
        [
            Point::new(100.0, 100.0),
            Point::new(200.0, 100.0),
            Point::new(200.0, 200.0),
            Point::new(100.0, 200.0),
        ]
    }

    #[test]
    fn test_handle_positions() {
        let handles = resize_handles(&square());
        assert_eq!(handles[0], (Handle::NorthWest, Point::new(100.0, 100.0)));
        assert_eq!(handles[1], (Handle::North, Point::new(150.0, 100.0)));
        assert_eq!(handles[3], (Handle::East, Point::new(200.0, 150.0)));
        assert_eq!(handles[7], (Handle::West, Point::new(100.0, 150.0)));
    }

    #[test]
    fn test_handle_axes() {
        assert!(Handle::East.resizes_width() && !Handle::East.resizes_height());
        assert!(Handle::South.resizes_height() && !Handle::South.resizes_width());
        assert!(Handle::SouthWest.is_corner());
        assert_eq!(Handle::ALL.iter().filter(|h| h.is_corner()).count(), 4);
    }

    #[test]
    fn test_hit_resize_picks_closest() {
        let poly = square();
        assert_eq!(hit_resize_handle(&poly, Point::new(203.0, 148.0), 10.0), Some(Handle::East));
        assert_eq!(hit_resize_handle(&poly, Point::new(150.0, 150.0), 10.0), None);
    }

    #[test]
    fn test_rotate_handle_above_topmost_vertex() {
        // Diamond: topmost vertex is the second one.
        let diamond = [
            Point::new(100.0, 150.0),
            Point::new(150.0, 100.0),
            Point::new(200.0, 150.0),
            Point::new(150.0, 200.0),
        ];
        assert_eq!(rotate_handle_position(&diamond, 28.0), Point::new(150.0, 72.0));
        assert!(hit_rotate_handle(&diamond, Point::new(160.0, 75.0), 28.0, 14.0));
        assert!(!hit_rotate_handle(&diamond, Point::new(150.0, 100.0), 28.0, 14.0));
    }
}
