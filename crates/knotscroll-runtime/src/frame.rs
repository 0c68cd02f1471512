#![forbid(unsafe_code)]

//! Frame and timer scheduling.
//!
//! Everything in the runtime advances through a [`FrameScheduler`]: tweens
//! request one frame per sample, the petal canvas re-requests a frame every
//! tick, and the state machine's fixed delays are one-shot timers.
//!
//! [`FrameLoop`] is the host-driven implementation. The host calls
//! [`FrameLoop::tick`] once per display refresh (or [`FrameLoop::advance`]
//! with a simulated step in tests), which makes every run reproducible.
//!
//! # Tick Order
//!
//! ```text
//!   tick(now)
//!     1. clock := max(clock, now)
//!     2. fire timers whose deadline ≤ now, earliest first
//!     3. run the frame batch queued before this tick
//! ```
//!
//! # Invariants
//!
//! 1. The clock never goes backwards.
//! 2. A frame requested during a tick runs on the *next* tick.
//! 3. A timer armed during a tick is not fired by that tick.
//! 4. Cancelled frames and cleared timers never run, even if cancelled by a
//!    callback earlier in the same tick.
//! 5. No internal borrow is held while a callback runs, so callbacks may
//!    freely request, cancel, arm, or clear.
//!
//! # Failure Modes
//!
//! - Hosts without a frame primitive use [`NoopScheduler`]: requests are
//!   accepted and dropped, so animations never advance. A warning is logged
//!   once per scheduler.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use web_time::Instant;

/// Callback for one animation frame; receives the tick timestamp.
pub type FrameCallback = Box<dyn FnOnce(Duration)>;

/// Callback for a one-shot timer.
pub type TimerCallback = Box<dyn FnOnce()>;

/// Scheduler shared by every runtime component.
pub type SharedScheduler = Rc<dyn FrameScheduler>;

/// Handle for a requested frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(u64);

/// Handle for an armed timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// Cooperative single-threaded scheduler.
pub trait FrameScheduler {
    /// Current scheduler time, measured from an arbitrary origin.
    fn now(&self) -> Duration;

    /// Run `callback` on the next frame.
    fn request_frame(&self, callback: FrameCallback) -> FrameId;

    /// Cancel a pending frame. Unknown or already-run ids are ignored.
    fn cancel_frame(&self, id: FrameId);

    /// Run `callback` once `delay` has elapsed.
    fn set_timeout(&self, delay: Duration, callback: TimerCallback) -> TimerId;

    /// Clear a pending timer. Unknown or already-fired ids are ignored.
    fn clear_timeout(&self, id: TimerId);
}

// ---------------------------------------------------------------------------
// FrameLoop
// ---------------------------------------------------------------------------

#[derive(Default)]
struct LoopInner {
    now: Duration,
    next_id: u64,
    frames: Vec<(FrameId, FrameCallback)>,
    /// Keyed by (deadline, id) so iteration order is firing order.
    timers: BTreeMap<(Duration, u64), TimerCallback>,
    /// Frames cancelled while their batch is already in flight.
    cancelled_in_flight: HashSet<FrameId>,
    in_tick: bool,
    ticks: u64,
}

impl LoopInner {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Host-driven deterministic frame loop.
#[derive(Default)]
pub struct FrameLoop {
    inner: RefCell<LoopInner>,
}

impl fmt::Debug for FrameLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("FrameLoop")
            .field("now", &inner.now)
            .field("pending_frames", &inner.frames.len())
            .field("pending_timers", &inner.timers.len())
            .field("ticks", &inner.ticks)
            .finish()
    }
}

impl FrameLoop {
    /// Create a loop with its clock at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a shared loop, ready to hand out as a [`SharedScheduler`].
    #[must_use]
    pub fn shared() -> Rc<Self> {
        Rc::new(Self::new())
    }

    /// Run one tick at host time `now`.
    pub fn tick(&self, now: Duration) {
        let (due, frames) = {
            let mut inner = self.inner.borrow_mut();
            if inner.in_tick {
                tracing::warn!("FrameLoop::tick called re-entrantly; ignored");
                return;
            }
            inner.in_tick = true;
            inner.ticks += 1;
            inner.now = inner.now.max(now);
            let now = inner.now;
            let due: Vec<(Duration, u64)> = inner
                .timers
                .range(..=(now, u64::MAX))
                .map(|(key, _)| *key)
                .collect();
            (due, std::mem::take(&mut inner.frames))
        };

        for key in due {
            let callback = self.inner.borrow_mut().timers.remove(&key);
            if let Some(callback) = callback {
                callback();
            }
        }

        let now = self.now();
        for (id, callback) in frames {
            let cancelled = self.inner.borrow_mut().cancelled_in_flight.remove(&id);
            if !cancelled {
                callback(now);
            }
        }

        let mut inner = self.inner.borrow_mut();
        inner.cancelled_in_flight.clear();
        inner.in_tick = false;
    }

    /// Advance the clock by `dt` and tick.
    pub fn advance(&self, dt: Duration) {
        let now = self.now() + dt;
        self.tick(now);
    }

    /// Tick repeatedly in `step` increments until `total` has elapsed.
    pub fn run_for(&self, total: Duration, step: Duration) {
        if step.is_zero() {
            self.advance(total);
            return;
        }
        let end = self.now() + total;
        while self.now() < end {
            let next = (self.now() + step).min(end);
            self.tick(next);
        }
    }

    /// Number of frames waiting for the next tick.
    #[must_use]
    pub fn pending_frames(&self) -> usize {
        self.inner.borrow().frames.len()
    }

    /// Number of armed timers.
    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.inner.borrow().timers.len()
    }

    /// Number of ticks run so far.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.inner.borrow().ticks
    }
}

impl FrameScheduler for FrameLoop {
    fn now(&self) -> Duration {
        self.inner.borrow().now
    }

    fn request_frame(&self, callback: FrameCallback) -> FrameId {
        let mut inner = self.inner.borrow_mut();
        let id = FrameId(inner.next_id());
        inner.frames.push((id, callback));
        id
    }

    fn cancel_frame(&self, id: FrameId) {
        let mut inner = self.inner.borrow_mut();
        let before = inner.frames.len();
        inner.frames.retain(|(pending, _)| *pending != id);
        if inner.frames.len() == before && inner.in_tick {
            inner.cancelled_in_flight.insert(id);
        }
    }

    fn set_timeout(&self, delay: Duration, callback: TimerCallback) -> TimerId {
        let mut inner = self.inner.borrow_mut();
        let seq = inner.next_id();
        let deadline = inner.now + delay;
        // A zero delay armed inside a tick would otherwise match the current
        // tick's range; push it to the next tick instead.
        let deadline = if inner.in_tick && delay.is_zero() {
            deadline + Duration::from_nanos(1)
        } else {
            deadline
        };
        inner.timers.insert((deadline, seq), callback);
        TimerId(seq)
    }

    fn clear_timeout(&self, id: TimerId) {
        self.inner
            .borrow_mut()
            .timers
            .retain(|(_, seq), _| *seq != id.0);
    }
}

// ---------------------------------------------------------------------------
// NoopScheduler
// ---------------------------------------------------------------------------

/// Scheduler for hosts without a frame primitive. Nothing ever runs.
pub struct NoopScheduler {
    origin: Instant,
    next_id: Cell<u64>,
    dropped: Cell<u64>,
    warned: Cell<bool>,
}

impl fmt::Debug for NoopScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NoopScheduler")
            .field("dropped", &self.dropped.get())
            .finish()
    }
}

impl Default for NoopScheduler {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
            next_id: Cell::new(0),
            dropped: Cell::new(0),
            warned: Cell::new(false),
        }
    }
}

impl NoopScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests accepted and dropped so far.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.get()
    }

    fn drop_request(&self) -> u64 {
        self.dropped.set(self.dropped.get() + 1);
        if !self.warned.replace(true) {
            tracing::warn!("no frame scheduler available; animations will not advance");
        }
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        id
    }
}

impl FrameScheduler for NoopScheduler {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn request_frame(&self, _callback: FrameCallback) -> FrameId {
        FrameId(self.drop_request())
    }

    fn cancel_frame(&self, _id: FrameId) {}

    fn set_timeout(&self, _delay: Duration, _callback: TimerCallback) -> TimerId {
        TimerId(self.drop_request())
    }

    fn clear_timeout(&self, _id: TimerId) {}
}
