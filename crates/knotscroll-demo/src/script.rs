#![forbid(unsafe_code)]

//! Scripted input sessions replayed against a [`LetterScroll`].

use std::rc::Rc;
use std::time::Duration;

use anyhow::{Result, bail};
use knotscroll_core::event::{KeyCode, KeyEvent, PointerEvent};
use knotscroll_core::geometry::Vec2;
use knotscroll_runtime::{FrameLoop, FrameScheduler, KNOT_ELEMENT, LetterScroll, ScrollState};
use web_time::Instant;

/// One scripted input or pause.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    /// Pointer-down on the knot.
    Press,
    /// Pointer move by a delta.
    Drag(f64, f64),
    Release,
    KeyDown(KeyCode),
    KeyUp(KeyCode),
    /// Report reading progress.
    Scroll(f64),
    Wait(Duration),
    /// Wait until the machine reaches a state, failing after the timeout.
    WaitFor(ScrollState, Duration),
}

/// A short tug that springs back, then a full drag untie, reading to the
/// end, and the automatic close and re-knot.
#[must_use]
pub fn drag_session() -> Vec<Step> {
    let mut steps = vec![
        Step::Press,
        Step::Drag(40.0, 0.0),
        Step::Release,
        Step::Wait(Duration::from_millis(400)),
        Step::Press,
    ];
    steps.extend([Step::Drag(10.0, 0.0), Step::Drag(10.0, 0.0), Step::Drag(105.0, 0.0)]);
    steps.push(Step::WaitFor(ScrollState::Reading, Duration::from_secs(3)));
    for tenth in 1..=10 {
        steps.push(Step::Scroll(f64::from(tenth) / 10.0));
        steps.push(Step::Wait(Duration::from_millis(200)));
    }
    steps.push(Step::WaitFor(ScrollState::Closed, Duration::from_secs(5)));
    steps
}

/// Hold-to-untie, then close the same way.
#[must_use]
pub fn hold_session(key: KeyCode) -> Vec<Step> {
    vec![
        Step::KeyDown(key),
        Step::WaitFor(ScrollState::Opening, Duration::from_secs(2)),
        Step::KeyUp(key),
        Step::WaitFor(ScrollState::Reading, Duration::from_secs(3)),
        Step::Scroll(1.0),
        Step::WaitFor(ScrollState::Closed, Duration::from_secs(5)),
    ]
}

/// What a finished session observed.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionReport {
    pub final_state: ScrollState,
    pub opening_seed: u64,
    pub elapsed: Duration,
    pub ticks: u64,
    pub peak_petals: usize,
}

/// Drives a scroll with either a simulated or a wall clock.
pub struct Session {
    frames: Rc<FrameLoop>,
    scroll: LetterScroll,
    frame: Duration,
    realtime: Option<Instant>,
    peak_petals: usize,
}

impl Session {
    #[must_use]
    pub fn new(frames: Rc<FrameLoop>, scroll: LetterScroll, frame: Duration, realtime: bool) -> Self {
        Self {
            frames,
            scroll,
            frame,
            realtime: realtime.then(Instant::now),
            peak_petals: 0,
        }
    }

    pub fn run(&mut self, steps: &[Step]) -> Result<SessionReport> {
        self.scroll.start();
        for step in steps {
            self.apply(*step)?;
        }
        self.scroll.stop();
        let view = self.scroll.view();
        Ok(SessionReport {
            final_state: view.state,
            opening_seed: view.opening_seed,
            elapsed: self.frames.now(),
            ticks: self.frames.ticks(),
            peak_petals: self.peak_petals,
        })
    }

    fn apply(&mut self, step: Step) -> Result<()> {
        tracing::debug!(?step, "script step");
        match step {
            Step::Press => {
                self.scroll
                    .handle_pointer(&PointerEvent::down(1, Vec2::ZERO).with_target(KNOT_ELEMENT));
            }
            Step::Drag(dx, dy) => {
                self.scroll.handle_pointer(
                    &PointerEvent::moved(1, Vec2::ZERO).with_movement(Vec2::new(dx, dy)),
                );
            }
            Step::Release => {
                self.scroll.handle_pointer(&PointerEvent::up(1, Vec2::ZERO));
            }
            Step::KeyDown(code) => {
                self.scroll.handle_key(&KeyEvent::press(code));
            }
            Step::KeyUp(code) => {
                self.scroll.handle_key(&KeyEvent::release(code));
            }
            Step::Scroll(progress) => self.scroll.set_scroll_progress(progress),
            Step::Wait(duration) => {
                let end = self.frames.now() + duration;
                while self.frames.now() < end {
                    self.tick();
                }
            }
            Step::WaitFor(state, timeout) => {
                let end = self.frames.now() + timeout;
                while self.scroll.state() != state {
                    if self.frames.now() >= end {
                        bail!(
                            "timed out after {timeout:?} waiting for {state}; still {}",
                            self.scroll.state()
                        );
                    }
                    self.tick();
                }
            }
        }
        Ok(())
    }

    fn tick(&mut self) {
        match self.realtime {
            Some(origin) => {
                std::thread::sleep(self.frame);
                self.frames.tick(origin.elapsed());
            }
            None => self.frames.advance(self.frame),
        }
        self.peak_petals = self.peak_petals.max(self.scroll.petals().petal_count());
    }

    #[must_use]
    pub fn scroll(&self) -> &LetterScroll {
        &self.scroll
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use knotscroll_runtime::ScrollConfig;

    fn session() -> Session {
        let frames = FrameLoop::shared();
        let scroll = LetterScroll::new(frames.clone(), ScrollConfig::default().with_petal_seed(5));
        scroll.set_canvas_size(480.0, 720.0);
        Session::new(frames, scroll, Duration::from_millis(16), false)
    }

    #[test]
    fn drag_session_completes_a_full_cycle() {
        let report = session().run(&drag_session()).unwrap();
        assert_eq!(report.final_state, ScrollState::Closed);
        assert_eq!(report.opening_seed, 1);
        assert!(report.peak_petals >= 10);
        assert!(report.ticks > 0);
    }

    #[test]
    fn hold_session_completes_a_full_cycle() {
        let report = session().run(&hold_session(KeyCode::Space)).unwrap();
        assert_eq!(report.final_state, ScrollState::Closed);
        assert_eq!(report.opening_seed, 1);
    }

    #[test]
    fn unreachable_state_times_out() {
        let steps = [Step::WaitFor(ScrollState::Reading, Duration::from_millis(100))];
        let err = session().run(&steps).unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }
}
