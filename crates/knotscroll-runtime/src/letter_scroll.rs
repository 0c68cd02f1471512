#![forbid(unsafe_code)]

//! The assembled letter scroll.
//!
//! [`LetterScroll`] owns one [`ScrollMachine`] and the three controllers that
//! react to it. A single machine subscription fans each snapshot out:
//!
//! ```text
//!   snapshot ──state changed────▶ knot.on_state, paper.on_state
//!            ──progress changed─▶ paper.on_progress
//!            ──state/seed changed▶ petals.configure(mode, seed, active)
//! ```
//!
//! Input goes the other way: pointer and key events reach the knot, scroll
//! metrics reach the machine. The rendering layer reads everything back
//! through [`LetterScroll::view`].
//!
//! # Invariants
//!
//! 1. Controllers see each state change exactly once, in snapshot order,
//!    including changes made from inside another controller's reaction.
//! 2. Petals are active in every state except `Closed`, and burst once per
//!    opening.
//! 3. Scroll progress is forwarded in every state; the machine clamps it.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use knotscroll_core::event::{ElementId, Event, KeyEvent, PointerEvent};
use knotscroll_core::gesture::DragDispatch;
use knotscroll_core::particles::PetalMode;

use crate::config::{ConfigError, ScrollConfig};
use crate::frame::SharedScheduler;
use crate::knot::{KnotController, KnotVisuals};
use crate::machine::{FocusTarget, MachineSnapshot, ScrollMachine, ScrollState};
use crate::paper::{PaperController, PaperVisuals};
use crate::petals::PetalCanvas;
use crate::reactive::Subscription;
use crate::viewport::ScrollViewport;

/// Element id the knot's pointer-down handler is bound to.
pub const KNOT_ELEMENT: ElementId = ElementId(1);

/// Everything the rendering layer needs for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrollView {
    pub state: ScrollState,
    pub shows_knot: bool,
    pub allows_scroll: bool,
    pub focus: Option<FocusTarget>,
    pub announcement: String,
    pub knot_focus_id: u64,
    pub paper_focus_id: u64,
    pub opening_seed: u64,
    pub scroll_progress: f64,
    pub petal_mode: PetalMode,
    pub petals_active: bool,
    pub petal_count: usize,
    pub knot: KnotVisuals,
    pub paper: PaperVisuals,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Observed {
    state: ScrollState,
    progress: f64,
    seed: u64,
}

impl Observed {
    fn of(snap: &MachineSnapshot) -> Self {
        Self {
            state: snap.state,
            progress: snap.scroll_progress,
            seed: snap.opening_seed,
        }
    }
}

/// Petal regime for a lifecycle state.
#[must_use]
pub fn petal_mode_for(state: ScrollState) -> PetalMode {
    if state == ScrollState::Opening {
        PetalMode::Opening
    } else {
        PetalMode::Reading
    }
}

pub struct LetterScroll {
    config: Rc<ScrollConfig>,
    machine: ScrollMachine,
    knot: Rc<KnotController>,
    paper: Rc<PaperController>,
    petals: Rc<PetalCanvas>,
    subscription: RefCell<Option<Subscription>>,
    started: Cell<bool>,
    initial_open_done: Cell<bool>,
}

impl fmt::Debug for LetterScroll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LetterScroll")
            .field("machine", &self.machine)
            .field("knot", &self.knot)
            .field("paper", &self.paper)
            .field("petals", &self.petals)
            .field("started", &self.started.get())
            .finish()
    }
}

impl LetterScroll {
    /// Assemble a scroll in `Closed`. Call [`start`](Self::start) to begin
    /// driving the petal canvas.
    #[must_use]
    pub fn new(scheduler: SharedScheduler, config: ScrollConfig) -> Self {
        let config = Rc::new(config);
        let machine = ScrollMachine::new(scheduler.clone(), config.announcements.clone());
        let knot = KnotController::new(
            scheduler.clone(),
            machine.clone(),
            Rc::clone(&config),
            KNOT_ELEMENT,
        );
        let paper = PaperController::new(scheduler.clone(), machine.clone(), Rc::clone(&config));
        let petals = PetalCanvas::new(scheduler, config.petal_field(), config.petal_seed);

        let last = Cell::new(Observed::of(&machine.snapshot()));
        let (k, p, c) = (Rc::clone(&knot), Rc::clone(&paper), Rc::clone(&petals));
        let subscription = machine.subscribe(move |snap: &MachineSnapshot| {
            let now = Observed::of(snap);
            let previous = last.replace(now);
            if previous.state != now.state {
                k.on_state(now.state);
                p.on_state(now.state);
            }
            if previous.progress != now.progress {
                p.on_progress(now.progress);
            }
            if previous.state != now.state || previous.seed != now.seed {
                c.configure(
                    petal_mode_for(now.state),
                    now.seed,
                    now.state != ScrollState::Closed,
                );
            }
        });

        Self {
            config,
            machine,
            knot,
            paper,
            petals,
            subscription: RefCell::new(Some(subscription)),
            started: Cell::new(false),
            initial_open_done: Cell::new(false),
        }
    }

    /// Like [`new`](Self::new), but rejects an invalid configuration.
    pub fn try_new(scheduler: SharedScheduler, config: ScrollConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(scheduler, config.validated()?))
    }

    // --- Lifecycle ---

    /// Start the petal canvas. With `initial_open`, the first start also
    /// unties the knot.
    pub fn start(&self) {
        if self.started.replace(true) {
            return;
        }
        self.petals.start();
        let snap = self.machine.snapshot();
        self.petals.configure(
            petal_mode_for(snap.state),
            snap.opening_seed,
            snap.state != ScrollState::Closed,
        );
        if self.config.initial_open && !self.initial_open_done.replace(true) {
            tracing::debug!("initial open requested");
            self.machine.set_state(ScrollState::Opening);
        }
    }

    /// Pause the petal canvas. Timers and tweens keep running.
    pub fn stop(&self) {
        self.started.set(false);
        self.petals.stop();
    }

    /// Return to `Closed` and release every timer, tween, and binding.
    ///
    /// The knot no longer accepts pointer-down events afterwards.
    pub fn teardown(&self) {
        self.stop();
        self.knot.detach();
        self.paper.detach();
        self.machine.reset();
        self.subscription.borrow_mut().take();
    }

    // --- Input ---

    /// Route an input event. Returns `true` if it was consumed.
    pub fn handle_event(&self, event: &Event) -> bool {
        match event {
            Event::Pointer(pointer) => matches!(self.handle_pointer(pointer), DragDispatch::Update(_)),
            Event::Key(key) => self.handle_key(key),
        }
    }

    pub fn handle_pointer(&self, event: &PointerEvent) -> DragDispatch {
        self.knot.handle_pointer(event)
    }

    pub fn handle_key(&self, event: &KeyEvent) -> bool {
        self.knot.handle_key(event)
    }

    /// Report reading progress from the content viewport.
    pub fn set_scroll_progress(&self, progress: f64) {
        self.machine.set_scroll_progress(progress);
    }

    pub fn on_viewport_scroll(&self, viewport: &ScrollViewport) {
        self.set_scroll_progress(viewport.progress());
    }

    pub fn set_content_height(&self, px: f64) {
        self.paper.set_content_height(px);
    }

    pub fn set_viewport_height(&self, px: f64) {
        self.paper.set_viewport_height(px);
    }

    pub fn set_canvas_size(&self, width: f64, height: f64) {
        self.petals.set_size(width, height);
    }

    // --- Output ---

    /// Sample the whole scroll.
    #[must_use]
    pub fn view(&self) -> ScrollView {
        let snap = self.machine.snapshot();
        ScrollView {
            state: snap.state,
            shows_knot: snap.state.shows_knot(),
            allows_scroll: snap.state.allows_scroll(),
            focus: snap.state.focus_target(),
            announcement: snap.announcement,
            knot_focus_id: snap.knot_focus_id,
            paper_focus_id: snap.paper_focus_id,
            opening_seed: snap.opening_seed,
            scroll_progress: snap.scroll_progress,
            petal_mode: self.petals.mode(),
            petals_active: self.petals.is_active(),
            petal_count: self.petals.petal_count(),
            knot: self.knot.visuals(),
            paper: self.paper.visuals(),
        }
    }

    #[must_use]
    pub fn state(&self) -> ScrollState {
        self.machine.state()
    }

    #[must_use]
    pub fn machine(&self) -> &ScrollMachine {
        &self.machine
    }

    #[must_use]
    pub fn knot(&self) -> &KnotController {
        &self.knot
    }

    #[must_use]
    pub fn paper(&self) -> &PaperController {
        &self.paper
    }

    #[must_use]
    pub fn petals(&self) -> &PetalCanvas {
        &self.petals
    }

    #[must_use]
    pub fn config(&self) -> &ScrollConfig {
        &self.config
    }
}
