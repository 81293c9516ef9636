//! Unit tests for the wire formats.
//!
//! These tests verify legacy decoding priority, outgoing record contents,
//! and label export.

mod yolo_tests;
