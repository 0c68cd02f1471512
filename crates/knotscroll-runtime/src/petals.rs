#![forbid(unsafe_code)]

//! Frame-driven petal canvas.
//!
//! [`PetalCanvas`] owns a [`PetalField`] and steps it once per scheduler
//! frame while started. The field itself decides what to spawn; the canvas
//! only supplies the clock and the surface size.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;

use knotscroll_core::particles::{Petal, PetalField, PetalFieldConfig, PetalMode};

use crate::frame::{FrameId, SharedScheduler};

pub struct PetalCanvas {
    scheduler: SharedScheduler,
    field: RefCell<PetalField>,
    width: Cell<f64>,
    height: Cell<f64>,
    frame: Cell<Option<FrameId>>,
    frames: Cell<u64>,
    this: Weak<Self>,
}

impl fmt::Debug for PetalCanvas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PetalCanvas")
            .field("field", &self.field.borrow())
            .field("size", &(self.width.get(), self.height.get()))
            .field("running", &self.is_running())
            .finish()
    }
}

impl PetalCanvas {
    /// Canvas with an OS-seeded field, or a deterministic one when `seed`
    /// is given.
    #[must_use]
    pub fn new(scheduler: SharedScheduler, config: PetalFieldConfig, seed: Option<u64>) -> Rc<Self> {
        let field = match seed {
            Some(seed) => PetalField::with_seed(config, seed),
            None => PetalField::new(config),
        };
        Rc::new_cyclic(|this: &Weak<Self>| Self {
            scheduler,
            field: RefCell::new(field),
            width: Cell::new(0.0),
            height: Cell::new(0.0),
            frame: Cell::new(None),
            frames: Cell::new(0),
            this: this.clone(),
        })
    }

    /// Begin stepping the field every frame. No-op if already running.
    pub fn start(&self) {
        if self.is_running() {
            return;
        }
        self.request();
    }

    /// Stop stepping. Petals stay where they are.
    pub fn stop(&self) {
        if let Some(id) = self.frame.take() {
            self.scheduler.cancel_frame(id);
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.frame.get().is_some()
    }

    /// Forward mode, burst key, and active flag to the field.
    pub fn configure(&self, mode: PetalMode, burst_key: u64, active: bool) {
        self.field.borrow_mut().configure(
            mode,
            burst_key,
            active,
            self.width.get(),
            self.height.get(),
        );
    }

    /// Resize the drawing surface. Non-finite or negative sizes become 0,
    /// which pauses the simulation.
    pub fn set_size(&self, width: f64, height: f64) {
        let sanitize = |v: f64| if v.is_finite() { v.max(0.0) } else { 0.0 };
        self.width.set(sanitize(width));
        self.height.set(sanitize(height));
    }

    #[must_use]
    pub fn size(&self) -> (f64, f64) {
        (self.width.get(), self.height.get())
    }

    /// Copy of the current petals.
    #[must_use]
    pub fn petals(&self) -> Vec<Petal> {
        self.field.borrow().petals().to_vec()
    }

    #[must_use]
    pub fn petal_count(&self) -> usize {
        self.field.borrow().petals().len()
    }

    #[must_use]
    pub fn mode(&self) -> PetalMode {
        self.field.borrow().mode()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.field.borrow().is_active()
    }

    /// Frames stepped since creation.
    #[must_use]
    pub fn frames(&self) -> u64 {
        self.frames.get()
    }

    fn request(&self) {
        let this = self.this.clone();
        let id = self.scheduler.request_frame(Box::new(move |now: Duration| {
            if let Some(canvas) = this.upgrade() {
                canvas.step(now);
            }
        }));
        self.frame.set(Some(id));
    }

    fn step(&self, now: Duration) {
        if self.frame.take().is_none() {
            return;
        }
        self.field
            .borrow_mut()
            .frame(now, self.width.get(), self.height.get());
        self.frames.set(self.frames.get() + 1);
        self.request();
    }
}

impl Drop for PetalCanvas {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FrameLoop;

    const FRAME: Duration = Duration::from_millis(16);

    fn canvas() -> (Rc<FrameLoop>, Rc<PetalCanvas>) {
        let lp = FrameLoop::shared();
        let canvas = PetalCanvas::new(lp.clone(), PetalFieldConfig::default(), Some(7));
        canvas.set_size(400.0, 600.0);
        (lp, canvas)
    }

    #[test]
    fn steps_once_per_frame_while_running() {
        let (lp, canvas) = canvas();
        canvas.start();
        canvas.start();
        lp.run_for(Duration::from_millis(160), FRAME);
        assert_eq!(canvas.frames(), 10);
        canvas.stop();
        lp.run_for(Duration::from_millis(160), FRAME);
        assert_eq!(canvas.frames(), 10);
        assert_eq!(lp.pending_frames(), 0);
    }

    #[test]
    fn burst_then_reading_trickle() {
        let (lp, canvas) = canvas();
        canvas.start();
        canvas.configure(PetalMode::Opening, 1, true);
        assert_eq!(canvas.petal_count(), 10);

        canvas.configure(PetalMode::Reading, 1, true);
        lp.run_for(Duration::from_millis(32), FRAME);
        assert!(canvas.petal_count() >= 4);
        assert_eq!(canvas.mode(), PetalMode::Reading);
    }

    #[test]
    fn deactivation_clears_immediately() {
        let (lp, canvas) = canvas();
        canvas.start();
        canvas.configure(PetalMode::Opening, 1, true);
        lp.run_for(Duration::from_millis(48), FRAME);
        canvas.configure(PetalMode::Reading, 1, false);
        assert_eq!(canvas.petal_count(), 0);
        lp.run_for(Duration::from_secs(2), FRAME);
        assert_eq!(canvas.petal_count(), 0);
    }

    #[test]
    fn zero_size_pauses_simulation() {
        let (lp, canvas) = canvas();
        canvas.set_size(f64::NAN, -3.0);
        assert_eq!(canvas.size(), (0.0, 0.0));
        canvas.start();
        canvas.configure(PetalMode::Reading, 0, true);
        lp.run_for(Duration::from_millis(160), FRAME);
        assert_eq!(canvas.petal_count(), 0);
    }

    #[test]
    fn dropping_canvas_cancels_its_frame() {
        let (lp, canvas) = canvas();
        canvas.start();
        assert_eq!(lp.pending_frames(), 1);
        drop(canvas);
        assert_eq!(lp.pending_frames(), 0);
    }
}
