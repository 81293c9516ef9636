//! Pointer gesture state machine.
//!
//! [`step`] is a pure transition function: it reads the annotation set and
//! layout, and returns the next state plus the [`Effect`]s the caller must
//! apply. Geometry is live-updated during move/resize/rotate by emitting
//! [`Effect::Update`] on every pointer move.

use galabone_geom::{
    Aabb, ImageLayout, ObbParams, Point, Polygon, angle_to_point, point_in_polygon, to_local_frame,
};

use super::handles::{Handle, hit_resize_handle, hit_rotate_handle};
use crate::config::InteractionConfig;
use crate::model::{AnnotationId, Taxonomy};
use crate::state::{AnnotationPatch, AnnotationSet, GeometryPatch};

/// Identifier of a pointer (mouse, pen or one touch contact).
pub type PointerId = i32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerEventKind {
    Down,
    Move,
    Up,
    /// Capture was lost or the gesture was aborted by the platform.
    Cancel,
}

/// A pointer event in viewport pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub pointer_id: PointerId,
    pub kind: PointerEventKind,
    pub position: Point,
}

impl PointerEvent {
    pub fn new(pointer_id: PointerId, kind: PointerEventKind, x: f32, y: f32) -> Self {
        Self {
            pointer_id,
            kind,
            position: Point::new(x, y),
        }
    }

    pub fn down(pointer_id: PointerId, x: f32, y: f32) -> Self {
        Self::new(pointer_id, PointerEventKind::Down, x, y)
    }

    pub fn moved(pointer_id: PointerId, x: f32, y: f32) -> Self {
        Self::new(pointer_id, PointerEventKind::Move, x, y)
    }

    pub fn up(pointer_id: PointerId, x: f32, y: f32) -> Self {
        Self::new(pointer_id, PointerEventKind::Up, x, y)
    }

    pub fn cancel(pointer_id: PointerId) -> Self {
        Self::new(pointer_id, PointerEventKind::Cancel, 0.0, 0.0)
    }
}

/// The gesture in progress.
///
/// Points are normalized image coordinates unless noted.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    Drawing {
        pointer_id: PointerId,
        start: Point,
        current: Point,
        /// Annotation whose geometry the draft replaces on commit.
        replace: Option<AnnotationId>,
        taxonomy: Taxonomy,
    },
    Moving {
        pointer_id: PointerId,
        id: AnnotationId,
        start: Point,
        start_center: Point,
    },
    Resizing {
        pointer_id: PointerId,
        id: AnnotationId,
        handle: Handle,
        start_obb: ObbParams,
    },
    Rotating {
        pointer_id: PointerId,
        id: AnnotationId,
        /// Pointer direction from the box center at gesture start, in viewport space.
        start_pointer_angle: f32,
        start_angle: f32,
    },
}

impl InteractionState {
    pub fn is_idle(&self) -> bool {
        matches!(self, InteractionState::Idle)
    }

    /// Pointer driving the current gesture.
    pub fn pointer_id(&self) -> Option<PointerId> {
        match *self {
            InteractionState::Idle => None,
            InteractionState::Drawing { pointer_id, .. }
            | InteractionState::Moving { pointer_id, .. }
            | InteractionState::Resizing { pointer_id, .. }
            | InteractionState::Rotating { pointer_id, .. } => Some(pointer_id),
        }
    }

    /// Preview box while drawing.
    pub fn draft(&self) -> Option<Aabb> {
        match self {
            InteractionState::Drawing { start, current, .. } => {
                Some(Aabb::from_corners(*start, *current))
            }
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            InteractionState::Idle => "idle",
            InteractionState::Drawing { .. } => "drawing",
            InteractionState::Moving { .. } => "moving",
            InteractionState::Resizing { .. } => "resizing",
            InteractionState::Rotating { .. } => "rotating",
        }
    }
}

/// User-facing message raised by a refused gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    /// Drawing needs a category and a sub-category.
    TaxonomyRequired,
}

impl Notice {
    pub fn message(&self) -> &'static str {
        match self {
            Notice::TaxonomyRequired => "Select a category and sub-category before drawing",
        }
    }
}

/// Something the caller must do after a transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Effect {
    CapturePointer(PointerId),
    ReleasePointer(PointerId),
    /// Commit a drawn box as a new annotation.
    Create { taxonomy: Taxonomy, aabb: Aabb },
    Update {
        id: AnnotationId,
        patch: AnnotationPatch,
    },
    Notify(Notice),
}

/// Everything a transition may read.
#[derive(Debug, Clone, Copy)]
pub struct InteractionContext<'a> {
    pub annotations: &'a AnnotationSet,
    pub layout: Option<&'a ImageLayout>,
    /// Taxonomy currently picked for new boxes.
    pub taxonomy: Taxonomy,
    pub config: &'a InteractionConfig,
}

/// Result of one transition.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: InteractionState,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn stay(state: InteractionState) -> Self {
        Self {
            state,
            effects: Vec::new(),
        }
    }

    fn with(state: InteractionState, effects: Vec<Effect>) -> Self {
        Self { state, effects }
    }
}

/// Advance the machine by one pointer event.
pub fn step(state: &InteractionState, event: PointerEvent, ctx: &InteractionContext<'_>) -> Transition {
    log::trace!(
        "Pointer {:?} #{} at ({:.1}, {:.1}) in {}",
        event.kind,
        event.pointer_id,
        event.position.x,
        event.position.y,
        state.name()
    );

    match state.pointer_id() {
        Some(owner) if owner != event.pointer_id => {
            log::trace!("Ignoring pointer {} while {} owns the gesture", event.pointer_id, owner);
            return Transition::stay(*state);
        }
        _ => {}
    }

    match event.kind {
        PointerEventKind::Down if state.is_idle() => pointer_down(event, ctx),
        PointerEventKind::Down => Transition::stay(*state),
        PointerEventKind::Move => pointer_move(state, event, ctx),
        PointerEventKind::Up => pointer_up(state, event, ctx),
        PointerEventKind::Cancel => cancel(state),
    }
}

fn viewport_polygon(polygon: &Polygon, layout: &ImageLayout) -> Polygon {
    polygon.map(|p| layout.to_viewport(p))
}

fn pointer_down(event: PointerEvent, ctx: &InteractionContext<'_>) -> Transition {
    let Some(layout) = ctx.layout else {
        log::debug!("Pointer down ignored: image layout not measured yet");
        return Transition::stay(InteractionState::Idle);
    };
    let config = ctx.config;
    let pointer_id = event.pointer_id;
    let pos = event.position;

    if let Some(active) = ctx.annotations.active() {
        let id = active.id();
        let obb = *active.obb();
        let polygon = viewport_polygon(active.polygon(), layout);

        let next = if hit_rotate_handle(
            &polygon,
            pos,
            config.rotate_handle_offset,
            config.rotate_handle_radius,
        ) {
            let center = layout.to_viewport(obb.center());
            Some(InteractionState::Rotating {
                pointer_id,
                id,
                start_pointer_angle: angle_to_point(center, pos),
                start_angle: obb.angle_degrees,
            })
        } else if let Some(handle) = hit_resize_handle(&polygon, pos, config.resize_handle_radius) {
            Some(InteractionState::Resizing {
                pointer_id,
                id,
                handle,
                start_obb: obb,
            })
        } else if point_in_polygon(pos, &polygon) {
            Some(InteractionState::Moving {
                pointer_id,
                id,
                start: layout.to_normalized(pos),
                start_center: obb.center(),
            })
        } else {
            None
        };

        if let Some(next) = next {
            log::debug!("Annotation {}: start {}", id, next.name());
            return Transition::with(next, vec![Effect::CapturePointer(pointer_id)]);
        }
    }

    if !layout.contains(pos, config.outside_image_epsilon) {
        log::trace!("Pointer down outside the image");
        return Transition::stay(InteractionState::Idle);
    }

    if !ctx.taxonomy.is_complete() {
        log::debug!("Drawing refused: no taxonomy selected");
        return Transition::with(
            InteractionState::Idle,
            vec![Effect::Notify(Notice::TaxonomyRequired)],
        );
    }

    let start = layout.to_normalized(pos);
    log::debug!("Start drawing at ({:.3}, {:.3})", start.x, start.y);
    Transition::with(
        InteractionState::Drawing {
            pointer_id,
            start,
            current: start,
            replace: ctx.annotations.active_id(),
            taxonomy: ctx.taxonomy,
        },
        vec![Effect::CapturePointer(pointer_id)],
    )
}

fn pointer_move(state: &InteractionState, event: PointerEvent, ctx: &InteractionContext<'_>) -> Transition {
    let Some(layout) = ctx.layout else {
        return Transition::stay(*state);
    };
    let pos = event.position;
    let config = ctx.config;

    match *state {
        InteractionState::Idle => Transition::stay(*state),

        InteractionState::Drawing {
            pointer_id,
            start,
            replace,
            taxonomy,
            ..
        } => Transition::stay(InteractionState::Drawing {
            pointer_id,
            start,
            current: layout.to_normalized(pos),
            replace,
            taxonomy,
        }),

        InteractionState::Moving {
            id,
            start,
            start_center,
            ..
        } => {
            let Some(annotation) = ctx.annotations.get(id) else {
                return lost_target(state, id);
            };
            let obb = annotation.obb();
            let current = layout.to_normalized(pos);
            let x = clamp_center(start_center.x + current.x - start.x, obb.half_width());
            let y = clamp_center(start_center.y + current.y - start.y, obb.half_height());
            update(*state, id, GeometryPatch::center(x, y))
        }

        InteractionState::Resizing {
            id,
            handle,
            start_obb,
            ..
        } => {
            if ctx.annotations.get(id).is_none() {
                return lost_target(state, id);
            }
            let local = to_local_frame(
                layout.to_normalized(pos),
                start_obb.center(),
                start_obb.angle_degrees,
            );
            let min = config.min_box_dimension;
            let patch = GeometryPatch {
                width: handle
                    .resizes_width()
                    .then(|| (2.0 * local.x.abs()).max(min)),
                height: handle
                    .resizes_height()
                    .then(|| (2.0 * local.y.abs()).max(min)),
                ..Default::default()
            };
            update(*state, id, patch)
        }

        InteractionState::Rotating {
            id,
            start_pointer_angle,
            start_angle,
            ..
        } => {
            let Some(annotation) = ctx.annotations.get(id) else {
                return lost_target(state, id);
            };
            let center = layout.to_viewport(annotation.obb().center());
            let angle = start_angle + (angle_to_point(center, pos) - start_pointer_angle);
            update(*state, id, GeometryPatch::angle(angle))
        }
    }
}

fn pointer_up(state: &InteractionState, event: PointerEvent, ctx: &InteractionContext<'_>) -> Transition {
    let Some(pointer_id) = state.pointer_id() else {
        return Transition::stay(*state);
    };
    let mut effects = Vec::new();

    if let InteractionState::Drawing {
        start,
        current,
        replace,
        taxonomy,
        ..
    } = *state
    {
        let end = ctx.layout.map_or(current, |l| l.to_normalized(event.position));
        let aabb = Aabb::from_corners(start, end);
        let min = ctx.config.min_draw_size;

        if aabb.width() >= min && aabb.height() >= min {
            match replace.filter(|id| ctx.annotations.get(*id).is_some()) {
                Some(id) => {
                    log::debug!("Redrew annotation {}", id);
                    effects.push(Effect::Update {
                        id,
                        patch: AnnotationPatch {
                            taxonomy: Some(taxonomy),
                            geometry: Some(GeometryPatch::from_aabb(&aabb)),
                        },
                    });
                }
                None => effects.push(Effect::Create { taxonomy, aabb }),
            }
        } else {
            log::debug!(
                "Discarding draft {:.4}x{:.4} below minimum size",
                aabb.width(),
                aabb.height()
            );
        }
    } else {
        log::debug!("End {}", state.name());
    }

    effects.push(Effect::ReleasePointer(pointer_id));
    Transition::with(InteractionState::Idle, effects)
}

fn cancel(state: &InteractionState) -> Transition {
    match state.pointer_id() {
        Some(pointer_id) => {
            log::debug!("Cancelled {}", state.name());
            Transition::with(
                InteractionState::Idle,
                vec![Effect::ReleasePointer(pointer_id)],
            )
        }
        None => Transition::stay(InteractionState::Idle),
    }
}

fn update(state: InteractionState, id: AnnotationId, patch: GeometryPatch) -> Transition {
    Transition::with(
        state,
        vec![Effect::Update {
            id,
            patch: AnnotationPatch::geometry(patch),
        }],
    )
}

fn lost_target(state: &InteractionState, id: AnnotationId) -> Transition {
    log::debug!("Annotation {} vanished during {}", id, state.name());
    cancel(state)
}

/// Keep a box of half-extent `half` inside `[0,1]`.
fn clamp_center(center: f32, half: f32) -> f32 {
    let (lo, hi) = (half, 1.0 - half);
    if lo > hi { 0.5 } else { center.clamp(lo, hi) }
}

/// Owns the current [`InteractionState`] and applies [`step`].
#[derive(Debug, Clone, Default)]
pub struct InteractionMachine {
    state: InteractionState,
}

impl InteractionMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    /// Process one event and return the effects to apply.
    pub fn handle(&mut self, event: PointerEvent, ctx: &InteractionContext<'_>) -> Vec<Effect> {
        let transition = step(&self.state, event, ctx);
        if transition.state.name() != self.state.name() {
            log::trace!("{} -> {}", self.state.name(), transition.state.name());
        }
        self.state = transition.state;
        transition.effects
    }

    /// Unconditionally drop any gesture, e.g. when the image changes.
    ///
    /// Returns the pointer release the caller should perform, if a gesture
    /// was in progress.
    pub fn reset(&mut self) -> Option<Effect> {
        let released = self.state.pointer_id().map(Effect::ReleasePointer);
        self.state = InteractionState::Idle;
        released
    }
}
