#![forbid(unsafe_code)]

//! Reactive primitives: shared observable values and their animatable form.

pub mod motion_value;
pub mod observable;

pub use motion_value::MotionValue;
pub use observable::{Observable, Subscription};
