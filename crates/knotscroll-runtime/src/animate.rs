#![forbid(unsafe_code)]

//! Frame-driven tweens over [`MotionValue`]s.
//!
//! [`animate`] samples a [`Tween`] once per frame from the scheduler and
//! writes each sample into the target value. The returned [`TweenHandle`]
//! reports completion through [`TweenHandle::then`] and cancels through
//! [`TweenHandle::stop`].
//!
//! # Invariants
//!
//! 1. The start value is read when `animate` is called; the start time is
//!    the scheduler's `now()` at that moment.
//! 2. A completed tween leaves the value exactly at its target.
//! 3. `stop()` is idempotent and leaves the value at its last sample.
//! 4. Starting a tween on a value stops the tween that was driving it.
//! 5. Completion callbacks run once, after the final sample is written and
//!    after the value's driver slot is released.
//!
//! # Failure Modes
//!
//! - Scheduler dropped while a tween is pending: the tween can no longer be
//!   cancelled through the scheduler; `stop()` still marks it stopped so the
//!   frame callback, if it ever runs, exits without writing.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;

use knotscroll_core::animation::{Lerp, Tween, TweenOptions};

use crate::frame::{FrameId, FrameScheduler, SharedScheduler};
use crate::reactive::MotionValue;

/// Lifecycle of a tween.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TweenStatus {
    Running,
    Completed,
    Stopped,
}

type CompletionCallback = Box<dyn FnOnce()>;

struct HandleInner {
    status: Cell<TweenStatus>,
    frame: Cell<Option<FrameId>>,
    on_complete: RefCell<Vec<CompletionCallback>>,
    scheduler: Weak<dyn FrameScheduler>,
}

/// Shared handle to one running tween.
#[derive(Clone)]
pub struct TweenHandle {
    inner: Rc<HandleInner>,
}

impl fmt::Debug for TweenHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TweenHandle")
            .field("status", &self.inner.status.get())
            .field("callbacks", &self.inner.on_complete.borrow().len())
            .finish()
    }
}

impl TweenHandle {
    fn new(scheduler: &SharedScheduler) -> Self {
        Self {
            inner: Rc::new(HandleInner {
                status: Cell::new(TweenStatus::Running),
                frame: Cell::new(None),
                on_complete: RefCell::new(Vec::new()),
                scheduler: Rc::downgrade(scheduler),
            }),
        }
    }

    #[must_use]
    pub fn status(&self) -> TweenStatus {
        self.inner.status.get()
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.status() == TweenStatus::Running
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.status() == TweenStatus::Completed
    }

    /// Cancel the pending frame and freeze the value at its last sample.
    ///
    /// Pending completion callbacks are dropped. No-op unless running.
    pub fn stop(&self) {
        if !self.is_running() {
            return;
        }
        self.inner.status.set(TweenStatus::Stopped);
        if let Some(id) = self.inner.frame.take() {
            if let Some(scheduler) = self.inner.scheduler.upgrade() {
                scheduler.cancel_frame(id);
            }
        }
        let dropped = std::mem::take(&mut *self.inner.on_complete.borrow_mut());
        tracing::trace!(dropped_callbacks = dropped.len(), "tween stopped");
    }

    /// Run `callback` when the tween completes.
    ///
    /// Runs immediately if already complete; discarded if stopped.
    pub fn then(&self, callback: impl FnOnce() + 'static) -> &Self {
        match self.status() {
            TweenStatus::Running => self.inner.on_complete.borrow_mut().push(Box::new(callback)),
            TweenStatus::Completed => callback(),
            TweenStatus::Stopped => {
                tracing::trace!("completion callback attached to a stopped tween; discarded");
            }
        }
        self
    }

    pub(crate) fn same_as(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    fn complete(&self) {
        self.inner.status.set(TweenStatus::Completed);
        self.inner.frame.set(None);
        let callbacks = std::mem::take(&mut *self.inner.on_complete.borrow_mut());
        for callback in callbacks {
            callback();
        }
    }
}

struct TweenDriver<T> {
    tween: Tween<T>,
    started_at: Duration,
    value: MotionValue<T>,
    handle: TweenHandle,
}

/// Drive `value` from its current value to `target`.
pub fn animate<T>(
    scheduler: &SharedScheduler,
    value: &MotionValue<T>,
    target: T,
    options: TweenOptions,
) -> TweenHandle
where
    T: Lerp + Clone + PartialEq + 'static,
{
    let handle = TweenHandle::new(scheduler);
    if let Some(previous) = value.replace_driver(handle.clone()) {
        previous.stop();
    }
    let tween = Tween::new(value.get(), target, options);
    tracing::trace!(duration_ms = tween.duration().as_millis() as u64, "tween started");
    let driver = Rc::new(TweenDriver {
        tween,
        started_at: scheduler.now(),
        value: value.clone(),
        handle: handle.clone(),
    });
    request_step(scheduler, driver);
    handle
}

fn request_step<T>(scheduler: &SharedScheduler, driver: Rc<TweenDriver<T>>)
where
    T: Lerp + Clone + PartialEq + 'static,
{
    let handle = driver.handle.clone();
    let weak = Rc::downgrade(scheduler);
    let id = scheduler.request_frame(Box::new(move |now: Duration| {
        if let Some(scheduler) = weak.upgrade() {
            step(&scheduler, driver, now);
        }
    }));
    handle.inner.frame.set(Some(id));
}

fn step<T>(scheduler: &SharedScheduler, driver: Rc<TweenDriver<T>>, now: Duration)
where
    T: Lerp + Clone + PartialEq + 'static,
{
    let handle = &driver.handle;
    if !handle.is_running() {
        return;
    }
    handle.inner.frame.set(None);
    let sample = driver
        .tween
        .sample(now.saturating_sub(driver.started_at));
    driver.value.set(sample.value);

    // A subscriber may have stopped or replaced this tween.
    if !handle.is_running() {
        return;
    }
    if sample.complete {
        driver.value.release_driver(handle);
        handle.complete();
    } else {
        request_step(scheduler, driver);
    }
}
