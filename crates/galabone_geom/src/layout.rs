//! Contain-fit layout and coordinate-space conversion.
//!
//! An image drawn with "object-fit: contain" is scaled uniformly to fit its
//! container and centered, leaving letterbox margins on one axis. Pointer
//! positions arrive in container pixels and must be mapped through that
//! letterboxed rectangle before they mean anything in normalized units.

use serde::{Deserialize, Serialize};

use crate::types::Point;

/// A width/height pair in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Whether both dimensions are finite and strictly positive.
    pub fn is_measurable(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// Where the image is actually drawn inside its container, in container pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageLayout {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl ImageLayout {
    pub const fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Whether a viewport point lies on the image, allowing `epsilon` pixels of slack.
    pub fn contains(&self, p: Point, epsilon: f32) -> bool {
        p.x >= self.left - epsilon
            && p.x <= self.left + self.width + epsilon
            && p.y >= self.top - epsilon
            && p.y <= self.top + self.height + epsilon
    }

    /// See [`pixel_to_normalized`].
    pub fn to_normalized(&self, p: Point) -> Point {
        pixel_to_normalized(p, self)
    }

    /// See [`normalized_to_viewport`].
    pub fn to_viewport(&self, p: Point) -> Point {
        normalized_to_viewport(p, self)
    }

    /// The same rectangle with its container placed at `origin`.
    pub fn translated(&self, origin: Point) -> ImageLayout {
        ImageLayout {
            left: self.left + origin.x,
            top: self.top + origin.y,
            ..*self
        }
    }
}

/// Compute the contain-fit rectangle of `natural` inside `container`.
///
/// Returns `None` until both sizes have been measured, which is how callers
/// refuse layout-dependent gestures before the image has loaded.
pub fn compute_image_layout(container: Size, natural: Size) -> Option<ImageLayout> {
    if !container.is_measurable() || !natural.is_measurable() {
        return None;
    }

    let scale = (container.width / natural.width).min(container.height / natural.height);
    let width = natural.width * scale;
    let height = natural.height * scale;

    Some(ImageLayout {
        left: (container.width - width) / 2.0,
        top: (container.height - height) / 2.0,
        width,
        height,
    })
}

/// Map a viewport point to normalized image units, clamped into `[0,1]`.
pub fn pixel_to_normalized(p: Point, layout: &ImageLayout) -> Point {
    Point::new(
        (p.x - layout.left) / layout.width,
        (p.y - layout.top) / layout.height,
    )
    .clamped_unit()
}

/// Map a normalized point back into viewport pixels.
pub fn normalized_to_viewport(p: Point, layout: &ImageLayout) -> Point {
    Point::new(
        layout.left + p.x * layout.width,
        layout.top + p.y * layout.height,
    )
}
