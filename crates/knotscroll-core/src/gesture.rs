#![forbid(unsafe_code)]

//! Drag gesture recognition: turns raw pointer events into drag snapshots.
//!
//! [`GestureRecognizer`] follows one pointer from pointer-down to
//! pointer-up/cancel and reports each step as a [`DragState`] carrying the
//! per-event `delta`, the cumulative `movement`, and the cumulative `offset`.
//!
//! # State Machine
//!
//! ```text
//!   Idle ──pointer-down (primary, bound)──▶ Dragging
//!   Dragging ──move (same pointer)──▶ Dragging
//!   Dragging ──up / cancel (same pointer)──▶ Idle   (emits `last`)
//!   Dragging ──DragState::cancel()──▶ Idle          (emits nothing)
//! ```
//!
//! # Binding
//!
//! A drag can start through two paths that converge on the same routine:
//!
//! - [`GestureRecognizer::process`] with a pointer-down whose `target` equals
//!   the persistently bound target ([`GestureRecognizer::bind_target`]).
//! - [`GestureRecognizer::bind_pointer_down`], the per-element binder for
//!   manual wiring; the event's target is not checked.
//!
//! # Invariants
//!
//! 1. At most one drag is active per recognizer.
//! 2. Only the pointer that started the drag can move or end it; events from
//!    other pointers are ignored, not queued.
//! 3. The `first` snapshot always has `delta == ZERO`; the `last` snapshot
//!    always has `delta == ZERO` and `active == false`.
//! 4. `movement` and `offset` always equal the sum of emitted deltas.
//! 5. Cancelling is synchronous and idempotent: after the first call the
//!    recognizer reports idle and every later call is a no-op.
//!
//! # Failure Modes
//!
//! - Missing native movement: the delta falls back to the difference between
//!   this event's position and the previous one.
//! - Non-finite deltas are treated as zero movement.

use std::cell::Cell;
use std::rc::Rc;

use crate::event::{ElementId, PointerButton, PointerEvent, PointerEventKind};
use crate::geometry::Vec2;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Snapshot of an in-flight drag, produced for every accepted pointer event.
#[derive(Debug, Clone)]
pub struct DragState {
    /// The pointer event that produced this snapshot.
    pub event: PointerEvent,
    /// Element the drag was started on.
    pub target: Option<ElementId>,
    /// True for the pointer-down snapshot.
    pub first: bool,
    /// True for the pointer-up/cancel snapshot.
    pub last: bool,
    /// False only on the final snapshot.
    pub active: bool,
    /// Cumulative movement since pointer-down.
    pub movement: Vec2,
    /// Cumulative offset. No bounds are applied, so it tracks `movement`.
    pub offset: Vec2,
    /// Movement contributed by this event alone.
    pub delta: Vec2,
    cancel: DragCancel,
}

impl DragState {
    /// Tear the drag down immediately. No further snapshots are produced for
    /// this gesture, including the final `last` snapshot.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// A cloneable cancellation handle for this gesture.
    #[must_use]
    pub fn cancel_handle(&self) -> DragCancel {
        self.cancel.clone()
    }

    /// Whether this gesture has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Cancellation capability for one gesture.
///
/// Each gesture owns a fresh flag, so a stale handle never affects a later
/// gesture.
#[derive(Debug, Clone, Default)]
pub struct DragCancel {
    flag: Rc<Cell<bool>>,
}

impl DragCancel {
    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.set(true);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.get()
    }
}

/// Why a pointer event did not produce a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragIgnoredReason {
    /// Pointer-down with a button other than the primary one.
    SecondaryButton,
    /// Pointer-down while another drag is active.
    AlreadyDragging,
    /// Pointer-down on an element other than the bound target.
    TargetMismatch,
    /// Pointer-down delivered through `process` with no bound target.
    Unbound,
    /// Event from a pointer other than the one being tracked.
    PointerMismatch,
    /// Move/up/cancel while idle.
    NotDragging,
}

/// Result of feeding one pointer event to the recognizer.
#[derive(Debug, Clone)]
pub enum DragDispatch {
    /// The event advanced the drag.
    Update(DragState),
    /// The event was filtered out.
    Ignored(DragIgnoredReason),
}

impl DragDispatch {
    /// The snapshot, if the event was accepted.
    #[must_use]
    pub fn into_state(self) -> Option<DragState> {
        match self {
            Self::Update(state) => Some(state),
            Self::Ignored(_) => None,
        }
    }

    /// The ignore reason, if the event was filtered out.
    #[must_use]
    pub fn ignored(&self) -> Option<DragIgnoredReason> {
        match self {
            Self::Update(_) => None,
            Self::Ignored(reason) => Some(*reason),
        }
    }
}

// ---------------------------------------------------------------------------
// Internal state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct DragSession {
    pointer_id: u32,
    target: Option<ElementId>,
    last_event: PointerEvent,
    movement: Vec2,
    offset: Vec2,
    cancel: DragCancel,
}

// ---------------------------------------------------------------------------
// GestureRecognizer
// ---------------------------------------------------------------------------

/// Single-pointer drag recognizer.
#[derive(Default)]
pub struct GestureRecognizer {
    target: Option<ElementId>,
    session: Option<DragSession>,
}

impl std::fmt::Debug for GestureRecognizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GestureRecognizer")
            .field("target", &self.target)
            .field("dragging", &self.is_dragging())
            .finish()
    }
}

impl GestureRecognizer {
    /// Create a recognizer with no bound target.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a recognizer persistently bound to `target`.
    #[must_use]
    pub fn with_target(target: ElementId) -> Self {
        Self {
            target: Some(target),
            session: None,
        }
    }

    /// Attach (or detach with `None`) the persistent pointer-down target.
    ///
    /// Rebinding tears down any active drag.
    pub fn bind_target(&mut self, target: Option<ElementId>) {
        if self.target != target {
            self.teardown();
        }
        self.target = target;
    }

    /// Currently bound target.
    #[must_use]
    pub const fn target(&self) -> Option<ElementId> {
        self.target
    }

    /// Whether a drag is in progress.
    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| !session.cancel.is_cancelled())
    }

    /// Pointer id of the active drag.
    #[must_use]
    pub fn active_pointer_id(&self) -> Option<u32> {
        self.live_session().map(|session| session.pointer_id)
    }

    /// Feed a pointer event from the bound target or the window.
    pub fn process(&mut self, event: &PointerEvent) -> DragDispatch {
        self.prune_cancelled();
        match event.kind {
            PointerEventKind::Down => {
                let Some(bound) = self.target else {
                    return DragDispatch::Ignored(DragIgnoredReason::Unbound);
                };
                if event.target != Some(bound) {
                    return DragDispatch::Ignored(DragIgnoredReason::TargetMismatch);
                }
                self.start_drag(event)
            }
            PointerEventKind::Move => self.on_move(event),
            PointerEventKind::Up | PointerEventKind::Cancel => self.on_end(event),
        }
    }

    /// Per-element binder: start a drag from a pointer-down delivered by the
    /// element's own handler, regardless of the bound target.
    pub fn bind_pointer_down(&mut self, event: &PointerEvent) -> DragDispatch {
        self.prune_cancelled();
        self.start_drag(event)
    }

    /// Tear down the active drag without emitting a final snapshot.
    pub fn cancel(&mut self) {
        if let Some(session) = &self.session {
            session.cancel.cancel();
        }
        self.teardown();
    }

    /// Unbind the target and drop any active drag.
    pub fn detach(&mut self) {
        self.cancel();
        self.target = None;
    }
}

// ---------------------------------------------------------------------------
// Internal event handlers
// ---------------------------------------------------------------------------

impl GestureRecognizer {
    fn live_session(&self) -> Option<&DragSession> {
        self.session
            .as_ref()
            .filter(|session| !session.cancel.is_cancelled())
    }

    fn prune_cancelled(&mut self) {
        if self
            .session
            .as_ref()
            .is_some_and(|session| session.cancel.is_cancelled())
        {
            #[cfg(feature = "tracing")]
            tracing::debug!("drag torn down by cancel handle");
            self.session = None;
        }
    }

    fn teardown(&mut self) {
        self.session = None;
    }

    fn start_drag(&mut self, event: &PointerEvent) -> DragDispatch {
        if event.button != PointerButton::Primary {
            return DragDispatch::Ignored(DragIgnoredReason::SecondaryButton);
        }
        if self.session.is_some() {
            return DragDispatch::Ignored(DragIgnoredReason::AlreadyDragging);
        }
        let session = DragSession {
            pointer_id: event.pointer_id,
            target: event.target.or(self.target),
            last_event: *event,
            movement: Vec2::ZERO,
            offset: Vec2::ZERO,
            cancel: DragCancel::default(),
        };
        #[cfg(feature = "tracing")]
        tracing::debug!(pointer_id = event.pointer_id, "drag started");
        let state = snapshot(&session, event, true, false, true, Vec2::ZERO);
        self.session = Some(session);
        DragDispatch::Update(state)
    }

    fn on_move(&mut self, event: &PointerEvent) -> DragDispatch {
        let Some(session) = self.session.as_mut() else {
            return DragDispatch::Ignored(DragIgnoredReason::NotDragging);
        };
        if event.pointer_id != session.pointer_id {
            return DragDispatch::Ignored(DragIgnoredReason::PointerMismatch);
        }
        let delta = movement_delta(&session.last_event, event);
        session.offset += delta;
        session.movement += delta;
        session.last_event = *event;
        DragDispatch::Update(snapshot(session, event, false, false, true, delta))
    }

    fn on_end(&mut self, event: &PointerEvent) -> DragDispatch {
        let Some(session) = self.session.as_ref() else {
            return DragDispatch::Ignored(DragIgnoredReason::NotDragging);
        };
        if event.pointer_id != session.pointer_id {
            return DragDispatch::Ignored(DragIgnoredReason::PointerMismatch);
        }
        let state = snapshot(session, event, false, true, false, Vec2::ZERO);
        #[cfg(feature = "tracing")]
        tracing::debug!(
            pointer_id = event.pointer_id,
            movement_x = state.movement.x,
            movement_y = state.movement.y,
            "drag ended"
        );
        self.teardown();
        DragDispatch::Update(state)
    }
}

fn movement_delta(previous: &PointerEvent, event: &PointerEvent) -> Vec2 {
    let delta = event
        .movement
        .unwrap_or_else(|| event.position - previous.position);
    if delta.is_finite() { delta } else { Vec2::ZERO }
}

fn snapshot(
    session: &DragSession,
    event: &PointerEvent,
    first: bool,
    last: bool,
    active: bool,
    delta: Vec2,
) -> DragState {
    DragState {
        event: *event,
        target: session.target,
        first,
        last,
        active,
        movement: session.movement,
        offset: session.offset,
        delta,
        cancel: session.cancel.clone(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
