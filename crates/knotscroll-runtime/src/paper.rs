#![forbid(unsafe_code)]

//! The paper: unrolling, rolling back up, and the derived visuals.
//!
//! [`PaperController`] owns the open-progress value and everything derived
//! from it. It reacts to lifecycle transitions forwarded by its owner and to
//! reading-progress updates.
//!
//! | State        | On entry                                              |
//! |--------------|-------------------------------------------------------|
//! | Opening      | tween open 0 → 1, then `Reading`                      |
//! | Reading      | open = 1, opacity = 1                                 |
//! | AutoClosing  | tween open → 0, then `ReKnotting`                     |
//! | ReKnotting   | arm the re-knot timer, then `Closed`                  |
//! | Closed       | open = 0, opacity = 0                                 |
//!
//! # Derived Values
//!
//! - `opacity = clamp(open, 0, 1)` and `height = open · desired_height`
//!   whenever open changes.
//! - `desired_height = max(min_height, ratio · viewport + content)`.
//! - `rod_left = open_angle · open + (Reading ? scroll_rotation · progress : 0)`
//!   and `rod_right = -rod_left`.
//! - `wave = sin(progress · 4π) · amplitude`.
//!
//! # Invariants
//!
//! 1. The auto-close timer is pending only while `Reading` with progress at
//!    or past the trigger; any state or progress change re-arms it.
//! 2. The re-knot timer never outlives `ReKnotting`.

use std::cell::{Cell, RefCell};
use std::f64::consts::PI;
use std::fmt;
use std::rc::{Rc, Weak};

use knotscroll_core::animation::{Easing, TweenOptions};

use crate::animate::animate;
use crate::config::ScrollConfig;
use crate::frame::{SharedScheduler, TimerId};
use crate::machine::{ScrollMachine, ScrollState};
use crate::reactive::{MotionValue, Subscription};

/// Sampled paper visuals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaperVisuals {
    pub open_progress: f64,
    pub opacity: f64,
    pub height: f64,
    pub wave_offset: f64,
    /// Degrees.
    pub rod_left: f64,
    /// Degrees.
    pub rod_right: f64,
}

pub struct PaperController {
    scheduler: SharedScheduler,
    machine: ScrollMachine,
    config: Rc<ScrollConfig>,
    state: Cell<ScrollState>,
    scroll_progress: Cell<f64>,
    content_height: Cell<f64>,
    viewport_height: Cell<f64>,
    auto_close_timer: Cell<Option<TimerId>>,
    reknot_timer: Cell<Option<TimerId>>,
    open_progress: MotionValue<f64>,
    opacity: MotionValue<f64>,
    height: MotionValue<f64>,
    wave_offset: MotionValue<f64>,
    rod_left: MotionValue<f64>,
    rod_right: MotionValue<f64>,
    open_subscription: RefCell<Option<Subscription>>,
    this: Weak<Self>,
}

impl fmt::Debug for PaperController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaperController")
            .field("state", &self.state.get())
            .field("open_progress", &self.open_progress.get())
            .field("scroll_progress", &self.scroll_progress.get())
            .field("auto_close_pending", &self.auto_close_timer.get().is_some())
            .finish()
    }
}

impl PaperController {
    #[must_use]
    pub fn new(scheduler: SharedScheduler, machine: ScrollMachine, config: Rc<ScrollConfig>) -> Rc<Self> {
        let paper = Rc::new_cyclic(|this: &Weak<Self>| Self {
            scheduler,
            machine,
            config,
            state: Cell::new(ScrollState::Closed),
            scroll_progress: Cell::new(0.0),
            content_height: Cell::new(0.0),
            viewport_height: Cell::new(0.0),
            auto_close_timer: Cell::new(None),
            reknot_timer: Cell::new(None),
            open_progress: MotionValue::new(0.0),
            opacity: MotionValue::new(0.0),
            height: MotionValue::new(0.0),
            wave_offset: MotionValue::new(0.0),
            rod_left: MotionValue::new(0.0),
            rod_right: MotionValue::new(0.0),
            open_subscription: RefCell::new(None),
            this: this.clone(),
        });

        let weak = Rc::downgrade(&paper);
        let subscription = paper.open_progress.on_change(move |open: &f64| {
            if let Some(paper) = weak.upgrade() {
                paper.opacity.set(open.clamp(0.0, 1.0));
                paper.height.set(open * paper.desired_height());
                paper.update_rods();
            }
        });
        *paper.open_subscription.borrow_mut() = Some(subscription);
        paper
    }

    // --- Inputs ---

    /// React to a lifecycle transition.
    pub fn on_state(&self, state: ScrollState) {
        let previous = self.state.replace(state);
        if previous == ScrollState::ReKnotting && state != ScrollState::ReKnotting {
            self.clear_reknot();
        }

        match state {
            ScrollState::Opening => {
                let options = TweenOptions::new(self.config.open_duration, Easing::EaseInOut);
                let this = self.this.clone();
                animate(&self.scheduler, &self.open_progress, 1.0, options).then(move || {
                    if let Some(paper) = this.upgrade() {
                        paper.machine.set_state(ScrollState::Reading);
                    }
                });
            }
            ScrollState::Reading => {
                self.open_progress.jump(1.0);
                self.opacity.set(1.0);
            }
            ScrollState::AutoClosing => {
                let options = TweenOptions::new(self.config.close_duration, Easing::EaseInOut);
                let this = self.this.clone();
                animate(&self.scheduler, &self.open_progress, 0.0, options).then(move || {
                    if let Some(paper) = this.upgrade() {
                        paper.machine.set_state(ScrollState::ReKnotting);
                    }
                });
            }
            ScrollState::ReKnotting => self.arm_reknot(),
            ScrollState::Closed => {
                self.open_progress.jump(0.0);
                self.opacity.set(0.0);
            }
            ScrollState::KnotDragging => {}
        }

        self.update_rods();
        self.rearm_auto_close();
    }

    /// React to a reading-progress update.
    pub fn on_progress(&self, progress: f64) {
        self.scroll_progress.set(progress);
        self.wave_offset
            .set((progress * PI * 4.0).sin() * self.config.wave_amplitude);
        self.update_rods();
        self.rearm_auto_close();
    }

    /// Update the measured letter content height.
    pub fn set_content_height(&self, px: f64) {
        if px.is_finite() {
            self.content_height.set(px.max(0.0));
            self.refresh_height();
        }
    }

    /// Update the viewport height.
    pub fn set_viewport_height(&self, px: f64) {
        if px.is_finite() {
            self.viewport_height.set(px.max(0.0));
            self.refresh_height();
        }
    }

    /// Height of the fully open paper.
    #[must_use]
    pub fn desired_height(&self) -> f64 {
        let config = &self.config;
        let natural = config.paper_viewport_ratio * self.viewport_height.get() + self.content_height.get();
        natural.max(config.min_paper_height)
    }

    /// Drop pending timers and tweens.
    pub fn detach(&self) {
        self.clear_auto_close();
        self.clear_reknot();
        self.open_progress.stop();
    }

    // --- Internals ---

    fn refresh_height(&self) {
        self.height.set(self.open_progress.get() * self.desired_height());
    }

    fn update_rods(&self) {
        let config = &self.config;
        let mut left = config.rod_open_angle * self.open_progress.get();
        if self.state.get() == ScrollState::Reading {
            left += config.rod_scroll_rotation * self.scroll_progress.get();
        }
        self.rod_left.set(left);
        self.rod_right.set(-left);
    }

    fn rearm_auto_close(&self) {
        self.clear_auto_close();
        if self.state.get() != ScrollState::Reading
            || self.scroll_progress.get() < self.config.auto_close_progress
        {
            return;
        }
        let this = self.this.clone();
        let id = self.scheduler.set_timeout(
            self.config.auto_close_grace,
            Box::new(move || {
                if let Some(paper) = this.upgrade() {
                    paper.auto_close_timer.set(None);
                    tracing::debug!("end of letter reached; closing");
                    paper.machine.set_state(ScrollState::AutoClosing);
                }
            }),
        );
        self.auto_close_timer.set(Some(id));
    }

    fn arm_reknot(&self) {
        self.clear_reknot();
        let this = self.this.clone();
        let id = self.scheduler.set_timeout(
            self.config.reknot_delay,
            Box::new(move || {
                if let Some(paper) = this.upgrade() {
                    paper.reknot_timer.set(None);
                    paper.machine.set_state(ScrollState::Closed);
                }
            }),
        );
        self.reknot_timer.set(Some(id));
    }

    fn clear_auto_close(&self) {
        if let Some(id) = self.auto_close_timer.take() {
            self.scheduler.clear_timeout(id);
        }
    }

    fn clear_reknot(&self) {
        if let Some(id) = self.reknot_timer.take() {
            self.scheduler.clear_timeout(id);
        }
    }

    // --- Accessors ---

    #[must_use]
    pub fn visuals(&self) -> PaperVisuals {
        PaperVisuals {
            open_progress: self.open_progress.get(),
            opacity: self.opacity.get(),
            height: self.height.get(),
            wave_offset: self.wave_offset.get(),
            rod_left: self.rod_left.get(),
            rod_right: self.rod_right.get(),
        }
    }

    #[must_use]
    pub fn open_progress(&self) -> &MotionValue<f64> {
        &self.open_progress
    }

    #[must_use]
    pub fn is_auto_close_pending(&self) -> bool {
        self.auto_close_timer.get().is_some()
    }
}
