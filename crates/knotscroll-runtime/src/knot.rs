#![forbid(unsafe_code)]

//! The knot: drag-to-untie and hold-to-untie.
//!
//! [`KnotController`] turns drag snapshots and hold-key events into
//! lifecycle transitions and drives the knot's visual motion values.
//!
//! # Untie Paths
//!
//! - **Drag**: per-event delta lengths are summed; `ratio = min(1, total /
//!   threshold)` spreads the two knot halves. At `ratio == 1` the drag is
//!   cancelled and the knot unties. Releasing earlier runs the reset path.
//! - **Hold**: key-down of the hold key arms a timer; when it fires the knot
//!   unties. Key-up before that runs the reset path.
//!
//! # Invariants
//!
//! 1. Drag snapshots outside `Closed`/`KnotDragging` cancel the gesture and
//!    change nothing.
//! 2. A drag unties at most once: the gesture is cancelled on the same
//!    snapshot that crosses the threshold.
//! 3. At most one hold timer is pending.
//! 4. Entering `Closed` puts every knot value back at rest (fade 1, the rest
//!    0) without interrupting a reset tween already heading there.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use knotscroll_core::animation::{Easing, TweenOptions};
use knotscroll_core::event::{ElementId, KeyEvent, PointerEvent};
use knotscroll_core::gesture::{DragDispatch, DragState, GestureRecognizer};

use crate::animate::animate;
use crate::config::ScrollConfig;
use crate::frame::{SharedScheduler, TimerId};
use crate::machine::{ScrollMachine, ScrollState};
use crate::reactive::MotionValue;

/// Sampled knot visuals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KnotVisuals {
    /// Untie progress in [0, 1].
    pub progress: f64,
    pub fade: f64,
    pub translate_left: f64,
    pub translate_right: f64,
    pub rotate_left: f64,
    pub rotate_right: f64,
}

/// Drag and hold logic for the knot element.
pub struct KnotController {
    scheduler: SharedScheduler,
    machine: ScrollMachine,
    config: Rc<ScrollConfig>,
    gesture: RefCell<GestureRecognizer>,
    total_distance: Cell<f64>,
    hold_timer: Cell<Option<TimerId>>,
    hard_fade_timer: Cell<Option<TimerId>>,
    progress: MotionValue<f64>,
    fade: MotionValue<f64>,
    translate_left: MotionValue<f64>,
    translate_right: MotionValue<f64>,
    rotate_left: MotionValue<f64>,
    rotate_right: MotionValue<f64>,
    this: Weak<Self>,
}

impl fmt::Debug for KnotController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KnotController")
            .field("gesture", &self.gesture.borrow())
            .field("total_distance", &self.total_distance.get())
            .field("holding", &self.is_holding())
            .finish()
    }
}

impl KnotController {
    /// Create a controller bound to `element`.
    #[must_use]
    pub fn new(
        scheduler: SharedScheduler,
        machine: ScrollMachine,
        config: Rc<ScrollConfig>,
        element: ElementId,
    ) -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            scheduler,
            machine,
            config,
            gesture: RefCell::new(GestureRecognizer::with_target(element)),
            total_distance: Cell::new(0.0),
            hold_timer: Cell::new(None),
            hard_fade_timer: Cell::new(None),
            progress: MotionValue::new(0.0),
            fade: MotionValue::new(1.0),
            translate_left: MotionValue::new(0.0),
            translate_right: MotionValue::new(0.0),
            rotate_left: MotionValue::new(0.0),
            rotate_right: MotionValue::new(0.0),
            this: this.clone(),
        })
    }

    // --- Inputs ---

    /// Feed a pointer event from the knot element or the window.
    pub fn handle_pointer(&self, event: &PointerEvent) -> DragDispatch {
        let dispatch = self.gesture.borrow_mut().process(event);
        if let DragDispatch::Update(state) = &dispatch {
            self.on_drag(state);
        }
        dispatch
    }

    /// Start a drag from the knot element's own pointer-down handler.
    pub fn bind_pointer_down(&self, event: &PointerEvent) -> DragDispatch {
        let dispatch = self.gesture.borrow_mut().bind_pointer_down(event);
        if let DragDispatch::Update(state) = &dispatch {
            self.on_drag(state);
        }
        dispatch
    }

    /// Feed a key event. Returns `true` if the hold key was consumed.
    pub fn handle_key(&self, event: &KeyEvent) -> bool {
        if event.code != self.config.hold_key {
            return false;
        }
        if event.is_down() {
            self.begin_hold();
        } else {
            self.end_hold();
        }
        true
    }

    fn on_drag(&self, drag: &DragState) {
        let state = self.machine.state();
        if !state.shows_knot() {
            tracing::debug!(%state, "drag outside knot states cancelled");
            drag.cancel();
            return;
        }
        if drag.first {
            self.machine.set_state(ScrollState::KnotDragging);
            self.total_distance.set(0.0);
            self.fade.jump(1.0);
        }
        let total = self.total_distance.get() + drag.delta.length();
        self.total_distance.set(total);
        let ratio = (total / self.config.untie_threshold).min(1.0);
        self.spread(ratio);
        if ratio >= 1.0 {
            drag.cancel();
            self.trigger_untie();
            return;
        }
        if drag.last {
            self.reset();
        }
    }

    fn begin_hold(&self) {
        if self.hold_timer.get().is_some() || !self.machine.state().shows_knot() {
            return;
        }
        self.machine.set_state(ScrollState::KnotDragging);
        let this = self.this.clone();
        let id = self.scheduler.set_timeout(
            self.config.hold_duration,
            Box::new(move || {
                if let Some(knot) = this.upgrade() {
                    knot.hold_timer.set(None);
                    tracing::debug!("hold duration reached");
                    knot.trigger_untie();
                }
            }),
        );
        self.hold_timer.set(Some(id));
    }

    fn end_hold(&self) {
        if let Some(id) = self.hold_timer.take() {
            self.scheduler.clear_timeout(id);
            self.reset();
        }
    }

    // --- Outcomes ---

    fn spread(&self, ratio: f64) {
        let spread = ratio * self.config.knot_spread;
        let tilt = ratio * self.config.knot_tilt;
        self.progress.jump(ratio);
        self.translate_left.jump(-spread);
        self.translate_right.jump(spread);
        self.rotate_left.jump(-tilt);
        self.rotate_right.jump(tilt);
    }

    /// Untie: enter `Opening` and play the untie animation.
    pub fn trigger_untie(&self) {
        self.cancel_hold();
        let outcome = self.machine.set_state(ScrollState::Opening);
        if !outcome.is_applied() {
            tracing::debug!(?outcome, "untie ignored");
            return;
        }
        let config = &self.config;
        let fade = TweenOptions::new(config.knot_fade_duration, Easing::EaseInOut);
        let untie = TweenOptions::new(config.knot_untie_duration, Easing::EaseOut);
        animate(&self.scheduler, &self.fade, 0.0, fade);
        animate(&self.scheduler, &self.translate_left, -config.knot_untie_spread, untie);
        animate(&self.scheduler, &self.translate_right, config.knot_untie_spread, untie);
        animate(&self.scheduler, &self.rotate_left, -config.knot_untie_tilt, untie);
        animate(&self.scheduler, &self.rotate_right, config.knot_untie_tilt, untie);

        self.clear_hard_fade();
        let this = self.this.clone();
        let id = self.scheduler.set_timeout(
            config.knot_hard_fade_delay,
            Box::new(move || {
                if let Some(knot) = this.upgrade() {
                    knot.hard_fade_timer.set(None);
                    knot.fade.jump(0.0);
                }
            }),
        );
        self.hard_fade_timer.set(Some(id));
    }

    /// Abort an untie in progress: ease the halves back and return to
    /// `Closed`.
    pub fn reset(&self) {
        self.total_distance.set(0.0);
        self.progress.jump(0.0);
        let options = TweenOptions::new(self.config.knot_reset_duration, Easing::EaseOut);
        for value in self.halves() {
            animate(&self.scheduler, value, 0.0, options);
        }
        self.machine.set_state(ScrollState::Closed);
    }

    /// React to a lifecycle transition.
    pub fn on_state(&self, state: ScrollState) {
        if state == ScrollState::Closed {
            self.total_distance.set(0.0);
            self.clear_hard_fade();
            settle(&self.progress, 0.0);
            settle(&self.fade, 1.0);
            for value in self.halves() {
                settle(value, 0.0);
            }
        }
        if !state.shows_knot() {
            self.cancel_hold();
            self.gesture.borrow_mut().cancel();
        }
    }

    /// Drop the gesture binding and every pending timer and tween.
    pub fn detach(&self) {
        self.gesture.borrow_mut().detach();
        self.cancel_hold();
        self.clear_hard_fade();
        self.progress.stop();
        self.fade.stop();
        for value in self.halves() {
            value.stop();
        }
    }

    fn cancel_hold(&self) {
        if let Some(id) = self.hold_timer.take() {
            self.scheduler.clear_timeout(id);
        }
    }

    fn clear_hard_fade(&self) {
        if let Some(id) = self.hard_fade_timer.take() {
            self.scheduler.clear_timeout(id);
        }
    }

    fn halves(&self) -> [&MotionValue<f64>; 4] {
        [
            &self.translate_left,
            &self.translate_right,
            &self.rotate_left,
            &self.rotate_right,
        ]
    }

    // --- Accessors ---

    #[must_use]
    pub fn visuals(&self) -> KnotVisuals {
        KnotVisuals {
            progress: self.progress.get(),
            fade: self.fade.get(),
            translate_left: self.translate_left.get(),
            translate_right: self.translate_right.get(),
            rotate_left: self.rotate_left.get(),
            rotate_right: self.rotate_right.get(),
        }
    }

    #[must_use]
    pub fn progress(&self) -> &MotionValue<f64> {
        &self.progress
    }

    #[must_use]
    pub fn fade(&self) -> &MotionValue<f64> {
        &self.fade
    }

    #[must_use]
    pub fn total_distance(&self) -> f64 {
        self.total_distance.get()
    }

    #[must_use]
    pub fn is_holding(&self) -> bool {
        self.hold_timer.get().is_some()
    }

    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.gesture.borrow().is_dragging()
    }
}

/// Put `value` at `rest` unless a tween is already moving it.
fn settle(value: &MotionValue<f64>, rest: f64) {
    if !value.is_animating() {
        value.set(rest);
    }
}
