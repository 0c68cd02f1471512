#![forbid(unsafe_code)]

//! The letter-scroll lifecycle state machine.
//!
//! [`ScrollMachine`] is a cloneable handle over one [`MachineSnapshot`]
//! stored in an [`Observable`]. Every mutation produces a new snapshot and
//! notifies subscribers once.
//!
//! # State Machine
//!
//! ```text
//!   Closed ──gesture begins──────────▶ KnotDragging
//!   Closed ──untie──────────────────▶ Opening
//!   KnotDragging ──released early───▶ Closed
//!   KnotDragging ──untie────────────▶ Opening
//!   Opening ──open tween done───────▶ Reading
//!   Reading ──end reached + grace───▶ AutoClosing
//!   AutoClosing ──close tween done──▶ ReKnotting
//!   ReKnotting ──re-knot delay──────▶ Closed
//! ```
//!
//! # Invariants
//!
//! 1. Setting the current state again changes nothing and notifies no one.
//! 2. Transitions outside the table are rejected and leave the snapshot as is.
//! 3. `opening_seed` increments exactly once per entry into `Opening`.
//! 4. A focus token increments only when the incoming state has a focus
//!    target that differs from the outgoing state's target.
//! 5. Entering `Closed` resets `scroll_progress` to 0 in the same snapshot.
//! 6. `scroll_progress` is always within [0, 1].

use std::fmt;

use crate::frame::SharedScheduler;
use crate::reactive::{Observable, Subscription};
use std::time::Duration;

/// Lifecycle states of the scroll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ScrollState {
    #[default]
    Closed,
    KnotDragging,
    Opening,
    Reading,
    AutoClosing,
    ReKnotting,
}

/// Element that should receive input focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FocusTarget {
    Knot,
    Paper,
}

impl ScrollState {
    pub const ALL: [Self; 6] = [
        Self::Closed,
        Self::KnotDragging,
        Self::Opening,
        Self::Reading,
        Self::AutoClosing,
        Self::ReKnotting,
    ];

    /// Whether the lifecycle allows moving from `self` to `next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Closed, Self::KnotDragging)
                | (Self::Closed, Self::Opening)
                | (Self::KnotDragging, Self::Closed)
                | (Self::KnotDragging, Self::Opening)
                | (Self::Opening, Self::Reading)
                | (Self::Reading, Self::AutoClosing)
                | (Self::AutoClosing, Self::ReKnotting)
                | (Self::ReKnotting, Self::Closed)
        )
    }

    /// The element focused while in this state, if any.
    ///
    /// Only `Closed` (knot) and `Reading` (paper) carry a target, so any
    /// entry into `Closed` from another state refocuses the knot.
    #[must_use]
    pub const fn focus_target(self) -> Option<FocusTarget> {
        match self {
            Self::Closed => Some(FocusTarget::Knot),
            Self::Reading => Some(FocusTarget::Paper),
            Self::KnotDragging | Self::Opening | Self::AutoClosing | Self::ReKnotting => None,
        }
    }

    /// Whether the knot is on screen.
    #[must_use]
    pub const fn shows_knot(self) -> bool {
        matches!(self, Self::Closed | Self::KnotDragging)
    }

    /// Whether the letter body accepts scrolling.
    #[must_use]
    pub const fn allows_scroll(self) -> bool {
        matches!(self, Self::Reading)
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Closed => "Closed",
            Self::KnotDragging => "KnotDragging",
            Self::Opening => "Opening",
            Self::Reading => "Reading",
            Self::AutoClosing => "AutoClosing",
            Self::ReKnotting => "ReKnotting",
        }
    }
}

impl fmt::Display for ScrollState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Announcements
// ---------------------------------------------------------------------------

/// Live-region text, one string per state.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config-file", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "config-file", serde(default, deny_unknown_fields))]
pub struct Announcements {
    pub closed: String,
    pub knot_dragging: String,
    pub opening: String,
    pub reading: String,
    pub auto_closing: String,
    pub re_knotting: String,
}

impl Default for Announcements {
    fn default() -> Self {
        Self {
            closed: "The scroll is closed. Untie the knot to open it.".into(),
            knot_dragging: "Pulling the knot.".into(),
            opening: "The scroll is unrolling.".into(),
            reading: "The letter is ready to read.".into(),
            auto_closing: "The scroll is closing.".into(),
            re_knotting: "The knot is being tied again.".into(),
        }
    }
}

impl Announcements {
    #[must_use]
    pub fn for_state(&self, state: ScrollState) -> &str {
        match state {
            ScrollState::Closed => &self.closed,
            ScrollState::KnotDragging => &self.knot_dragging,
            ScrollState::Opening => &self.opening,
            ScrollState::Reading => &self.reading,
            ScrollState::AutoClosing => &self.auto_closing,
            ScrollState::ReKnotting => &self.re_knotting,
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Everything the machine knows at one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct MachineSnapshot {
    pub state: ScrollState,
    /// Scheduler time of the last transition.
    pub transition_at: Duration,
    pub scroll_progress: f64,
    pub announcement: String,
    pub knot_focus_id: u64,
    pub paper_focus_id: u64,
    pub opening_seed: u64,
}

/// Result of [`ScrollMachine::set_state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    Applied { from: ScrollState, to: ScrollState },
    /// Already in the requested state.
    Unchanged,
    /// Not an edge of the lifecycle.
    Rejected { from: ScrollState, to: ScrollState },
}

impl TransitionOutcome {
    #[must_use]
    pub const fn is_applied(self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

// ---------------------------------------------------------------------------
// ScrollMachine
// ---------------------------------------------------------------------------

/// Shared handle to the scroll lifecycle.
#[derive(Clone)]
pub struct ScrollMachine {
    snapshot: Observable<MachineSnapshot>,
    announcements: std::rc::Rc<Announcements>,
    scheduler: SharedScheduler,
}

impl fmt::Debug for ScrollMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.snapshot.with(|snap| {
            f.debug_struct("ScrollMachine")
                .field("state", &snap.state)
                .field("scroll_progress", &snap.scroll_progress)
                .field("opening_seed", &snap.opening_seed)
                .finish()
        })
    }
}

impl ScrollMachine {
    /// Create a machine in `Closed` with the given announcement table.
    #[must_use]
    pub fn new(scheduler: SharedScheduler, announcements: Announcements) -> Self {
        let snapshot = MachineSnapshot {
            state: ScrollState::Closed,
            transition_at: scheduler.now(),
            scroll_progress: 0.0,
            announcement: announcements.closed.clone(),
            knot_focus_id: 1,
            paper_focus_id: 0,
            opening_seed: 0,
        };
        Self {
            snapshot: Observable::new(snapshot),
            announcements: std::rc::Rc::new(announcements),
            scheduler,
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> MachineSnapshot {
        self.snapshot.get()
    }

    #[must_use]
    pub fn state(&self) -> ScrollState {
        self.snapshot.with(|snap| snap.state)
    }

    #[must_use]
    pub fn scroll_progress(&self) -> f64 {
        self.snapshot.with(|snap| snap.scroll_progress)
    }

    #[must_use]
    pub fn announcement(&self) -> String {
        self.snapshot.with(|snap| snap.announcement.clone())
    }

    #[must_use]
    pub fn opening_seed(&self) -> u64 {
        self.snapshot.with(|snap| snap.opening_seed)
    }

    #[must_use]
    pub fn knot_focus_id(&self) -> u64 {
        self.snapshot.with(|snap| snap.knot_focus_id)
    }

    #[must_use]
    pub fn paper_focus_id(&self) -> u64 {
        self.snapshot.with(|snap| snap.paper_focus_id)
    }

    /// Number of snapshot changes so far.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.snapshot.version()
    }

    #[must_use]
    pub fn announcements(&self) -> &Announcements {
        &self.announcements
    }

    /// Move to `next` using its fixed announcement.
    pub fn set_state(&self, next: ScrollState) -> TransitionOutcome {
        self.set_state_with(next, None)
    }

    /// Move to `next`, optionally overriding the announcement text.
    pub fn set_state_with(
        &self,
        next: ScrollState,
        announcement: Option<String>,
    ) -> TransitionOutcome {
        let current = self.state();
        if current == next {
            tracing::debug!(state = %next, "transition to current state ignored");
            return TransitionOutcome::Unchanged;
        }
        if !current.can_transition_to(next) {
            tracing::debug!(from = %current, to = %next, "transition rejected");
            return TransitionOutcome::Rejected {
                from: current,
                to: next,
            };
        }

        let now = self.scheduler.now();
        let text = announcement.unwrap_or_else(|| self.announcements.for_state(next).to_owned());
        let target = next.focus_target();
        let retarget = target.is_some() && target != current.focus_target();
        let mut opening_seed = 0;
        self.snapshot.update(|snap| {
            snap.state = next;
            snap.transition_at = now;
            snap.announcement = text;
            if retarget {
                match target {
                    Some(FocusTarget::Knot) => snap.knot_focus_id += 1,
                    Some(FocusTarget::Paper) => snap.paper_focus_id += 1,
                    None => {}
                }
            }
            if next == ScrollState::Opening {
                snap.opening_seed += 1;
            }
            if next == ScrollState::Closed {
                snap.scroll_progress = 0.0;
            }
            opening_seed = snap.opening_seed;
        });
        tracing::info!(from = %current, to = %next, opening_seed, "scroll state transition");
        TransitionOutcome::Applied {
            from: current,
            to: next,
        }
    }

    /// Record reading progress, clamped to [0, 1]. NaN is ignored.
    pub fn set_scroll_progress(&self, value: f64) {
        if value.is_nan() {
            tracing::debug!("NaN scroll progress ignored");
            return;
        }
        let clamped = value.clamp(0.0, 1.0);
        self.snapshot.update(|snap| snap.scroll_progress = clamped);
    }

    /// Force `Closed` with progress 0 and hand focus back to the knot.
    ///
    /// Unlike a regular transition, the knot focus token always increments.
    pub fn reset(&self) {
        let now = self.scheduler.now();
        let closed = self.announcements.closed.clone();
        self.snapshot.update(|snap| {
            snap.state = ScrollState::Closed;
            snap.transition_at = now;
            snap.scroll_progress = 0.0;
            snap.announcement = closed;
            snap.knot_focus_id += 1;
        });
        tracing::info!("scroll machine reset");
    }

    /// Subscribe to snapshot changes.
    pub fn subscribe(&self, callback: impl Fn(&MachineSnapshot) + 'static) -> Subscription {
        self.snapshot.subscribe(callback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FrameLoop;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn machine() -> (Rc<FrameLoop>, ScrollMachine) {
        let lp = FrameLoop::shared();
        let m = ScrollMachine::new(lp.clone(), Announcements::default());
        (lp, m)
    }

    fn drive(m: &ScrollMachine, path: &[ScrollState]) {
        for &s in path {
            assert!(m.set_state(s).is_applied(), "{s} should be reachable");
        }
    }

    #[test]
    fn initial_snapshot() {
        let (_lp, m) = machine();
        let snap = m.snapshot();
        assert_eq!(snap.state, ScrollState::Closed);
        assert_eq!(snap.knot_focus_id, 1);
        assert_eq!(snap.paper_focus_id, 0);
        assert_eq!(snap.opening_seed, 0);
        assert_eq!(snap.scroll_progress, 0.0);
        assert_eq!(snap.announcement, Announcements::default().closed);
    }

    #[test]
    fn full_cycle_bumps_tokens_once_each() {
        let (_lp, m) = machine();
        drive(
            &m,
            &[
                ScrollState::KnotDragging,
                ScrollState::Opening,
                ScrollState::Reading,
                ScrollState::AutoClosing,
                ScrollState::ReKnotting,
                ScrollState::Closed,
            ],
        );
        let snap = m.snapshot();
        assert_eq!(snap.opening_seed, 1);
        assert_eq!(snap.paper_focus_id, 1);
        // Leaving Closed bumps nothing; ReKnotting -> Closed bumps the knot.
        assert_eq!(snap.knot_focus_id, 2);
    }

    #[test]
    fn drag_cancel_refocuses_knot() {
        let (_lp, m) = machine();
        drive(&m, &[ScrollState::KnotDragging, ScrollState::Closed]);
        assert_eq!(m.knot_focus_id(), 2);
        assert_eq!(m.snapshot().paper_focus_id, 0);
        assert_eq!(ScrollState::KnotDragging.focus_target(), None);
    }

    #[test]
    fn reentering_same_state_is_noop() {
        let (_lp, m) = machine();
        let notified = Rc::new(RefCell::new(0));
        let n = Rc::clone(&notified);
        let _sub = m.subscribe(move |_| *n.borrow_mut() += 1);
        for state in ScrollState::ALL {
            let before = m.snapshot();
            if before.state != state && before.state.can_transition_to(state) {
                m.set_state(state);
            }
            let entered = m.snapshot();
            let count = *notified.borrow();
            assert_eq!(m.set_state(entered.state), TransitionOutcome::Unchanged);
            assert_eq!(m.snapshot(), entered);
            assert_eq!(*notified.borrow(), count);
        }
    }

    #[test]
    fn illegal_transition_rejected() {
        let (_lp, m) = machine();
        let outcome = m.set_state(ScrollState::Reading);
        assert_eq!(
            outcome,
            TransitionOutcome::Rejected {
                from: ScrollState::Closed,
                to: ScrollState::Reading
            }
        );
        assert_eq!(m.state(), ScrollState::Closed);
        assert_eq!(m.version(), 0);
    }

    #[test]
    fn entering_closed_resets_progress() {
        let (_lp, m) = machine();
        drive(&m, &[ScrollState::Opening, ScrollState::Reading]);
        m.set_scroll_progress(0.7);
        drive(
            &m,
            &[
                ScrollState::AutoClosing,
                ScrollState::ReKnotting,
                ScrollState::Closed,
            ],
        );
        assert_eq!(m.scroll_progress(), 0.0);
    }

    #[test]
    fn progress_is_clamped_and_nan_ignored() {
        let (_lp, m) = machine();
        m.set_scroll_progress(1.7);
        assert_eq!(m.scroll_progress(), 1.0);
        m.set_scroll_progress(-0.2);
        assert_eq!(m.scroll_progress(), 0.0);
        m.set_scroll_progress(0.4);
        m.set_scroll_progress(f64::NAN);
        assert_eq!(m.scroll_progress(), 0.4);
    }

    #[test]
    fn announcement_override() {
        let (_lp, m) = machine();
        m.set_state_with(ScrollState::Opening, Some("custom".into()));
        assert_eq!(m.announcement(), "custom");
        m.set_state(ScrollState::Reading);
        assert_eq!(m.announcement(), Announcements::default().reading);
    }

    #[test]
    fn transition_records_scheduler_time() {
        let (lp, m) = machine();
        lp.advance(Duration::from_millis(250));
        m.set_state(ScrollState::Opening);
        assert_eq!(m.snapshot().transition_at, Duration::from_millis(250));
    }

    #[test]
    fn reset_always_refocuses_knot() {
        let (_lp, m) = machine();
        drive(&m, &[ScrollState::Opening, ScrollState::Reading]);
        m.set_scroll_progress(0.5);
        m.reset();
        let snap = m.snapshot();
        assert_eq!(snap.state, ScrollState::Closed);
        assert_eq!(snap.scroll_progress, 0.0);
        assert_eq!(snap.knot_focus_id, 2);
        assert_eq!(snap.paper_focus_id, 1);
        assert_eq!(snap.opening_seed, 1);
        m.reset();
        assert_eq!(m.knot_focus_id(), 3);
    }

    #[test]
    fn table_matches_lifecycle() {
        let allowed: Vec<(ScrollState, ScrollState)> = ScrollState::ALL
            .iter()
            .flat_map(|&a| ScrollState::ALL.iter().map(move |&b| (a, b)))
            .filter(|&(a, b)| a.can_transition_to(b))
            .collect();
        assert_eq!(allowed.len(), 8);
        assert!(!ScrollState::Reading.can_transition_to(ScrollState::Closed));
    }
}
