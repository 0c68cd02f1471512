//! End-to-end lifecycle scenarios driven through `LetterScroll` at 16 ms ticks.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use knotscroll_core::event::{KeyCode, KeyEvent, PointerEvent};
use knotscroll_core::geometry::Vec2;
use knotscroll_core::gesture::{DragDispatch, DragIgnoredReason};
use knotscroll_runtime::{FrameLoop, KNOT_ELEMENT, LetterScroll, ScrollConfig, ScrollState};

const FRAME: Duration = Duration::from_millis(16);

struct Harness {
    frames: Rc<FrameLoop>,
    scroll: LetterScroll,
    states: Rc<RefCell<Vec<ScrollState>>>,
    _log: knotscroll_runtime::Subscription,
}

impl Harness {
    fn new(config: ScrollConfig) -> Self {
        let frames = FrameLoop::shared();
        let scroll = LetterScroll::new(frames.clone(), config.with_petal_seed(3));
        scroll.set_canvas_size(480.0, 720.0);
        let states = Rc::new(RefCell::new(vec![scroll.state()]));
        let sink = Rc::clone(&states);
        let log = scroll.machine().subscribe(move |snap| {
            let mut states = sink.borrow_mut();
            if states.last() != Some(&snap.state) {
                states.push(snap.state);
            }
        });
        scroll.start();
        Self {
            frames,
            scroll,
            states,
            _log: log,
        }
    }

    fn run(&self, ms: u64) {
        self.frames.run_for(Duration::from_millis(ms), FRAME);
    }

    fn press_knot(&self) -> DragDispatch {
        self.scroll
            .handle_pointer(&PointerEvent::down(1, Vec2::ZERO).with_target(KNOT_ELEMENT))
    }

    fn drag_by(&self, dx: f64, dy: f64) -> DragDispatch {
        self.scroll.handle_pointer(
            &PointerEvent::moved(1, Vec2::ZERO).with_movement(Vec2::new(dx, dy)),
        )
    }

    fn release(&self) -> DragDispatch {
        self.scroll.handle_pointer(&PointerEvent::up(1, Vec2::ZERO))
    }

    fn open_fully(&self) {
        self.press_knot();
        self.drag_by(0.0, 130.0);
        self.run(1300);
        assert_eq!(self.scroll.state(), ScrollState::Reading);
    }

    fn states(&self) -> Vec<ScrollState> {
        self.states.borrow().clone()
    }
}

#[test]
fn drag_deltas_untie_exactly_once() {
    let h = Harness::new(ScrollConfig::default());
    h.press_knot();
    for dx in [10.0, 10.0, 105.0] {
        h.drag_by(dx, 0.0);
    }
    assert_eq!(
        h.states(),
        vec![
            ScrollState::Closed,
            ScrollState::KnotDragging,
            ScrollState::Opening
        ]
    );
    assert_eq!(h.scroll.view().opening_seed, 1);

    // Deltas after the untie belong to no drag.
    for _ in 0..5 {
        assert_eq!(
            h.drag_by(40.0, 0.0).ignored(),
            Some(DragIgnoredReason::NotDragging)
        );
    }
    assert_eq!(h.scroll.view().opening_seed, 1);
    assert_eq!(h.states().len(), 3);
}

#[test]
fn diagonal_drag_sums_euclidean_distance() {
    let h = Harness::new(ScrollConfig::default());
    h.press_knot();
    // Four 3-4-5 steps: 100 px summed, below the threshold.
    for _ in 0..4 {
        h.drag_by(15.0, 20.0);
    }
    assert_eq!(h.scroll.state(), ScrollState::KnotDragging);
    assert!((h.scroll.knot().total_distance() - 100.0).abs() < 1e-9);
    h.drag_by(12.0, 16.0);
    assert_eq!(h.scroll.state(), ScrollState::Opening);
}

#[test]
fn released_drag_returns_knot_to_rest() {
    let h = Harness::new(ScrollConfig::default());
    h.press_knot();
    h.drag_by(30.0, 0.0);
    h.drag_by(30.0, 0.0);
    assert!(h.scroll.view().knot.progress > 0.0);
    h.release();
    assert_eq!(h.scroll.state(), ScrollState::Closed);

    h.run(400);
    let knot = h.scroll.view().knot;
    assert_eq!(knot.progress, 0.0);
    assert_eq!(knot.translate_left, 0.0);
    assert_eq!(knot.translate_right, 0.0);
    assert_eq!(knot.rotate_left, 0.0);
    assert_eq!(knot.rotate_right, 0.0);
    assert_eq!(knot.fade, 1.0);
    assert_eq!(h.scroll.view().opening_seed, 0);
}

#[test]
fn reading_to_the_end_closes_and_reknots() {
    let h = Harness::new(ScrollConfig::default());
    h.open_fully();
    h.scroll.set_scroll_progress(0.99);

    h.run(580);
    assert_eq!(h.scroll.state(), ScrollState::Reading);
    h.run(40);
    assert_eq!(h.scroll.state(), ScrollState::AutoClosing);

    h.run(1050);
    assert_eq!(h.scroll.state(), ScrollState::ReKnotting);
    h.run(620);
    assert_eq!(h.scroll.state(), ScrollState::Closed);

    let view = h.scroll.view();
    assert_eq!(view.scroll_progress, 0.0);
    assert_eq!(view.paper.open_progress, 0.0);
    assert!(!view.petals_active);
    assert_eq!(view.petal_count, 0);
    assert!(view.shows_knot);
    assert_eq!(view.knot.fade, 1.0);
    assert_eq!(
        h.states(),
        vec![
            ScrollState::Closed,
            ScrollState::KnotDragging,
            ScrollState::Opening,
            ScrollState::Reading,
            ScrollState::AutoClosing,
            ScrollState::ReKnotting,
            ScrollState::Closed,
        ]
    );
}

#[test]
fn knot_can_be_untied_again_after_reknotting() {
    let h = Harness::new(ScrollConfig::default());
    h.open_fully();
    h.scroll.set_scroll_progress(1.0);
    h.run(600 + 1100 + 700);
    assert_eq!(h.scroll.state(), ScrollState::Closed);

    h.press_knot();
    h.drag_by(125.0, 0.0);
    assert_eq!(h.scroll.state(), ScrollState::Opening);
    assert_eq!(h.scroll.view().opening_seed, 2);
    assert_eq!(h.scroll.view().petal_count, 10);
}

#[test]
fn early_release_refocuses_the_knot() {
    let h = Harness::new(ScrollConfig::default());
    assert_eq!(h.scroll.view().knot_focus_id, 1);
    h.press_knot();
    h.drag_by(30.0, 0.0);
    assert_eq!(h.scroll.state(), ScrollState::KnotDragging);
    assert_eq!(h.scroll.view().knot_focus_id, 1);
    h.release();
    assert_eq!(h.scroll.state(), ScrollState::Closed);
    assert_eq!(h.scroll.view().knot_focus_id, 2);
    assert_eq!(h.scroll.view().paper_focus_id, 0);
}

#[test]
fn hold_survives_an_early_drag_release() {
    let h = Harness::new(ScrollConfig::default());
    assert!(h.scroll.handle_key(&KeyEvent::press(KeyCode::Space)));
    h.press_knot();
    h.drag_by(30.0, 0.0);
    h.release();
    assert_eq!(h.scroll.state(), ScrollState::Closed);
    assert!(h.scroll.knot().is_holding());

    h.run(720);
    assert_eq!(h.scroll.state(), ScrollState::Opening);
    assert!(!h.scroll.knot().is_holding());
    assert_eq!(h.scroll.view().opening_seed, 1);
}

#[test]
fn holding_the_key_unties() {
    let h = Harness::new(ScrollConfig::default());
    assert!(h.scroll.handle_key(&KeyEvent::press(KeyCode::Space)));
    h.run(400);
    assert!(h.scroll.handle_key(&KeyEvent::repeat(KeyCode::Space)));
    assert_eq!(h.scroll.state(), ScrollState::KnotDragging);
    h.run(320);
    assert_eq!(h.scroll.state(), ScrollState::Opening);
    // The release after an untie has no hold to cancel.
    h.scroll.handle_key(&KeyEvent::release(KeyCode::Space));
    assert_eq!(h.scroll.state(), ScrollState::Opening);
}

#[test]
fn custom_hold_key_and_threshold() {
    let config = ScrollConfig::default()
        .with_hold(KeyCode::Enter, Duration::from_millis(200))
        .with_untie_threshold(50.0);
    let h = Harness::new(config);
    assert!(!h.scroll.handle_key(&KeyEvent::press(KeyCode::Space)));
    h.scroll.handle_key(&KeyEvent::press(KeyCode::Enter));
    h.run(208);
    assert_eq!(h.scroll.state(), ScrollState::Opening);

    let h = Harness::new(ScrollConfig::default().with_untie_threshold(50.0));
    h.press_knot();
    h.drag_by(50.0, 0.0);
    assert_eq!(h.scroll.state(), ScrollState::Opening);
}

#[test]
fn drag_during_reading_is_cancelled() {
    let h = Harness::new(ScrollConfig::default());
    h.open_fully();
    let dispatch = h.press_knot();
    assert!(matches!(dispatch, DragDispatch::Update(_)));
    assert!(!h.scroll.knot().is_dragging());
    assert_eq!(h.scroll.state(), ScrollState::Reading);
    assert_eq!(
        h.drag_by(200.0, 0.0).ignored(),
        Some(DragIgnoredReason::NotDragging)
    );
}

#[test]
fn petals_follow_the_lifecycle() {
    let h = Harness::new(ScrollConfig::default());
    assert!(!h.scroll.view().petals_active);
    h.press_knot();
    assert!(h.scroll.view().petals_active);
    h.drag_by(130.0, 0.0);
    assert_eq!(h.scroll.view().petal_count, 10);

    h.run(1300);
    h.run(3000);
    let view = h.scroll.view();
    assert!(view.petals_active);
    // Reading keeps a small trickle alive.
    assert!(view.petal_count >= 4);
    for petal in h.scroll.petals().petals() {
        assert!(petal.opacity >= 0.0 && petal.opacity <= 1.0);
    }
}

#[test]
fn announcements_track_transitions() {
    let h = Harness::new(ScrollConfig::default());
    let closed = h.scroll.view().announcement;
    h.open_fully();
    let reading = h.scroll.view().announcement;
    assert_ne!(closed, reading);
    assert_eq!(reading, h.scroll.config().announcements.reading);
}
