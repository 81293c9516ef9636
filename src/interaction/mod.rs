//! Pointer interaction: drawing, moving, resizing and rotating boxes.

mod handles;
mod machine;


pub use handles::{Handle, hit_resize_handle, hit_rotate_handle, resize_handles, rotate_handle_position};
pub use machine::{
    Effect, InteractionContext, InteractionMachine, InteractionState, Notice, PointerEvent,
    PointerEventKind, PointerId, Transition, step,
};
