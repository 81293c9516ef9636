//! Galabone - oriented bounding box annotation editor core
//!
//! Annotates bones on radiographs with rotated boxes and a two-level
//! category/sub-category taxonomy. The crate holds the editing model and
//! gesture handling; rendering and transport are left to the host.

pub mod backend;
pub mod config;
mod constants;
pub mod detection;
mod error;
pub mod format;
pub mod interaction;
pub mod model;
pub mod overlay;
mod session;
pub mod state;

pub use backend::{AnnotationBackend, BackendError, CaseId, ImageCase, JsonDirBackend, MemoryBackend};
pub use config::{ConfigError, EditorConfig, LogLevel};
pub use error::EditorError;
pub use galabone_geom as geom;
pub use interaction::{Effect, Notice, PointerEvent, PointerEventKind};
pub use model::{Annotation, AnnotationId, Category, Subcategory, Taxonomy};
pub use session::EditorSession;

// WASM entry point
#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(target_arch = "wasm32")]
pub use wasm::*;
