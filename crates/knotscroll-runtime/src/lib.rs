// Forbid unsafe in production; deny in tests.
#![cfg_attr(not(test), forbid(unsafe_code))]
#![cfg_attr(test, deny(unsafe_code))]

//! Runtime: frame scheduling, motion values, and the letter-scroll lifecycle.
//!
//! # Role in knotscroll
//! `knotscroll-runtime` gives the clock-free pieces of `knotscroll-core` a
//! notion of time. A [`FrameScheduler`] supplies frames and one-shot timers;
//! [`animate`] turns them into tweens over [`MotionValue`]s; the
//! [`ScrollMachine`] holds the six-state lifecycle; and the controllers
//! translate input and transitions into visuals.
//!
//! # Primary responsibilities
//! - **Scheduling**: [`FrameLoop`] (host-driven, deterministic) and
//!   [`NoopScheduler`].
//! - **Reactivity**: [`Observable`], [`MotionValue`], [`animate`].
//! - **Lifecycle**: [`ScrollMachine`] with announcements and focus tokens.
//! - **Controllers**: [`KnotController`], [`PaperController`],
//!   [`PetalCanvas`], assembled by [`LetterScroll`].
//! - **Configuration**: [`ScrollConfig`], optionally loaded from TOML.
//!
//! # Threading
//! Everything here is single-threaded and `!Send`: state lives in `Rc` and
//! `RefCell`, and callbacks run on the thread that drives the scheduler.
//!
//! # Example
//! ```
//! use std::time::Duration;
//! use knotscroll_runtime::{FrameLoop, LetterScroll, ScrollConfig, ScrollState};
//!
//! let frames = FrameLoop::shared();
//! let scroll = LetterScroll::new(frames.clone(), ScrollConfig::default().with_initial_open(true));
//! scroll.start();
//! frames.run_for(Duration::from_millis(1300), Duration::from_millis(16));
//! assert_eq!(scroll.state(), ScrollState::Reading);
//! ```

pub mod animate;
pub mod config;
pub mod frame;
pub mod knot;
pub mod letter_scroll;
pub mod machine;
pub mod paper;
pub mod petals;
pub mod reactive;
pub mod viewport;

pub use animate::{TweenHandle, TweenStatus, animate};
pub use config::{ConfigError, ScrollConfig};
pub use frame::{FrameId, FrameLoop, FrameScheduler, NoopScheduler, SharedScheduler, TimerId};
pub use knot::{KnotController, KnotVisuals};
pub use letter_scroll::{KNOT_ELEMENT, LetterScroll, ScrollView};
pub use machine::{
    Announcements, FocusTarget, MachineSnapshot, ScrollMachine, ScrollState, TransitionOutcome,
};
pub use paper::{PaperController, PaperVisuals};
pub use petals::PetalCanvas;
pub use reactive::{MotionValue, Observable, Subscription};
pub use viewport::ScrollViewport;
