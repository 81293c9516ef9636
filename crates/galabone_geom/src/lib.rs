//! Geometry for oriented bounding box annotations.
//!
//! Two layers live here, both free of I/O and state:
//!
//! - [`kernel`]: rotation about an arbitrary center, OBB/polygon/AABB
//!   conversion, local-frame projection and point-in-polygon testing, all
//!   in normalized `[0,1]` image units.
//! - [`layout`]: the "contain" fit of a natural-size image inside a container
//!   and the conversions between viewport pixels and normalized units.

pub mod kernel;
pub mod layout;
mod types;

pub use kernel::{
    angle_to_point, normalize_angle, obb_to_polygon, point_in_polygon, polygon_area,
    polygon_center, polygon_to_aabb, polygon_to_obb, rotate_point, to_local_frame,
};
pub use layout::{compute_image_layout, normalized_to_viewport, pixel_to_normalized, ImageLayout, Size};
pub use types::{clamp_unit, Aabb, ObbParams, Point, Polygon};
