#![forbid(unsafe_code)]

//! Animatable observable values.
//!
//! A [`MotionValue<T>`] is an [`Observable<T>`] plus a driver slot recording
//! the tween currently animating it. Starting a new tween on a value stops
//! the previous one, so at most one frame loop ever writes to a value.

use std::cell::RefCell;
use std::rc::Rc;

use super::observable::{Observable, Subscription};
use crate::animate::TweenHandle;

/// An observable scalar (or any `PartialEq` value) that tweens can drive.
pub struct MotionValue<T> {
    value: Observable<T>,
    driver: Rc<RefCell<Option<TweenHandle>>>,
}

impl<T> Clone for MotionValue<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            driver: Rc::clone(&self.driver),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for MotionValue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let animating = self
            .driver
            .borrow()
            .as_ref()
            .is_some_and(TweenHandle::is_running);
        f.debug_struct("MotionValue")
            .field("value", &self.value)
            .field("animating", &animating)
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> MotionValue<T> {
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            value: Observable::new(value),
            driver: Rc::new(RefCell::new(None)),
        }
    }

    #[must_use]
    pub fn get(&self) -> T {
        self.value.get()
    }

    /// Store `next` and notify subscribers if it differs from the current
    /// value. A running tween keeps running and overwrites on its next frame.
    pub fn set(&self, next: T) {
        self.value.set(next);
    }

    /// Stop any running tween, then store `next`.
    pub fn jump(&self, next: T) {
        self.stop();
        self.value.set(next);
    }

    /// Register a change listener.
    pub fn on_change(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        self.value.subscribe(callback)
    }

    /// Stop the running tween, if any, leaving the value where it is.
    pub fn stop(&self) {
        let driver = self.driver.borrow_mut().take();
        if let Some(handle) = driver {
            handle.stop();
        }
    }

    /// Whether a tween is currently driving this value.
    #[must_use]
    pub fn is_animating(&self) -> bool {
        self.driver
            .borrow()
            .as_ref()
            .is_some_and(TweenHandle::is_running)
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.value.version()
    }

    /// The underlying observable.
    #[must_use]
    pub fn observable(&self) -> &Observable<T> {
        &self.value
    }

    /// Install `handle` as the driver and return the previous one.
    pub(crate) fn replace_driver(&self, handle: TweenHandle) -> Option<TweenHandle> {
        self.driver.borrow_mut().replace(handle)
    }

    /// Clear the driver slot if `handle` still owns it.
    pub(crate) fn release_driver(&self, handle: &TweenHandle) {
        let mut driver = self.driver.borrow_mut();
        if driver.as_ref().is_some_and(|current| current.same_as(handle)) {
            *driver = None;
        }
    }
}
