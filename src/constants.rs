//! Global constants for the annotation editor

/// Minimum width and height (normalized) of a drawn box; smaller drafts are discarded.
pub const MIN_DRAW_SIZE: f32 = 0.01;

/// Floor applied to box width/height after any geometry edit.
pub const MIN_BOX_DIMENSION: f32 = 0.005;

/// Hit radius of the rotation handle, in viewport pixels.
pub const ROTATE_HANDLE_RADIUS: f32 = 14.0;

/// Distance of the rotation handle above the topmost polygon vertex, in viewport pixels.
pub const ROTATE_HANDLE_OFFSET: f32 = 28.0;

/// Hit radius of the corner and edge resize handles, in viewport pixels.
pub const RESIZE_HANDLE_RADIUS: f32 = 10.0;

/// Slack around the image rectangle within which a draw may still start, in viewport pixels.
pub const OUTSIDE_IMAGE_EPSILON: f32 = 2.0;

/// Detections below this confidence are hidden from the overlay by default.
pub const DEFAULT_MIN_DETECTION_CONFIDENCE: f32 = 0.3;
