// Forbid unsafe in production; deny in tests.
#![cfg_attr(not(test), forbid(unsafe_code))]
#![cfg_attr(test, deny(unsafe_code))]

//! Core: clock-free building blocks for the knotted letter scroll.
//!
//! # Role in knotscroll
//! `knotscroll-core` holds the pieces that have no notion of wall-clock time
//! or scheduling. Every function here is driven by values the caller passes
//! in (events, elapsed durations, frame deltas), which keeps the algorithms
//! deterministic and directly testable.
//!
//! # Primary responsibilities
//! - **Event**: pointer and keyboard input as delivered by the host.
//! - **GestureRecognizer**: single-pointer drag tracking with cancellation.
//! - **Animation**: easing curves, interpolation, and the pure [`Tween`] sampler.
//! - **Particles**: petal burst/trickle spawners and per-frame physics.
//!
//! # How it fits in the system
//! `knotscroll-runtime` owns the frame loop, the observable motion values,
//! and the scroll state machine; it feeds this crate's types with time.
//!
//! [`Tween`]: animation::tween::Tween

pub mod animation;
pub mod event;
pub mod geometry;
pub mod gesture;
pub mod particles;
