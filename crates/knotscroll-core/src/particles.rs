#![forbid(unsafe_code)]

//! Petal particles: burst/trickle spawning and per-frame physics.
//!
//! Two spawn regimes feed one particle list:
//!
//! - **Burst** ([`create_opening_burst`]): many petals thrown radially from
//!   the canvas center when the scroll starts opening.
//! - **Trickle** ([`spawn_reading_petal`]): single petals drifting down from
//!   above the top edge while the letter is being read.
//!
//! [`update_petals`] advances every petal by one frame and culls the ones
//! that expired or fell below the canvas. [`PetalField`] wraps both into the
//! mode/active/burst-key engine the canvas drives once per frame.
//!
//! # Invariants
//!
//! 1. `dt` is clamped to [`MIN_STEP`, `MAX_STEP`] on every update.
//! 2. A petal is dropped once `life / max_life > 1` or `y > height + 40`.
//! 3. Surviving petals have opacity in `[0, previous opacity]`.
//! 4. An inactive field holds no petals.
//! 5. A burst is seeded at most once per distinct burst key.

use std::f64::consts::PI;
use std::time::Duration;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Smallest physics step (seconds).
pub const MIN_STEP: f64 = 0.016;
/// Largest physics step (seconds); longer frame gaps are truncated.
pub const MAX_STEP: f64 = 0.05;
/// Per-tick velocity multiplier.
pub const FRICTION: f64 = 0.92;
/// Downward acceleration (px/s²).
pub const GRAVITY: f64 = 12.0;
/// Distance below the canvas past which petals are culled.
pub const CULL_MARGIN: f64 = 40.0;

/// One petal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Petal {
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    /// Radians.
    pub rotation: f64,
    /// Angular velocity, radians per second.
    pub vr: f64,
    /// Seconds alive.
    pub life: f64,
    pub max_life: f64,
    pub size: f64,
    pub opacity: f64,
    pub fade: f64,
}

/// Which regime the field runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum PetalMode {
    /// One burst per burst key, no continuous spawning.
    Opening,
    /// Top-up to the target population plus periodic trickle.
    #[default]
    Reading,
}

fn rand_between<R: Rng + ?Sized>(rng: &mut R, min: f64, max: f64) -> f64 {
    min + rng.random::<f64>() * (max - min)
}

/// Spawn `count` petals at the canvas center with outward velocity.
pub fn create_opening_burst<R: Rng + ?Sized>(
    rng: &mut R,
    count: usize,
    width: f64,
    height: f64,
) -> Vec<Petal> {
    let cx = width / 2.0;
    let cy = height / 2.0;
    let max_speed = width.max(height) * 0.35;
    (0..count)
        .map(|_| {
            let angle = rand_between(rng, 0.0, PI * 2.0);
            let speed = rand_between(rng, max_speed * 0.3, max_speed * 0.6);
            Petal {
                x: cx,
                y: cy,
                vx: angle.cos() * speed,
                vy: angle.sin() * speed,
                rotation: rand_between(rng, -PI, PI),
                vr: rand_between(rng, -1.2, 1.2),
                life: 0.0,
                max_life: rand_between(rng, 1.2, 1.8),
                size: rand_between(rng, width * 0.04, width * 0.08),
                opacity: 1.0,
                fade: rand_between(rng, 0.5, 0.8),
            }
        })
        .collect()
}

/// Spawn one petal above the visible top edge, drifting down.
pub fn spawn_reading_petal<R: Rng + ?Sized>(rng: &mut R, width: f64, height: f64) -> Petal {
    let x = rand_between(rng, width * 0.2, width * 0.8);
    let base_speed = (height * 0.06).max(12.0);
    let speed = rand_between(rng, base_speed * 0.6, base_speed);
    let start_y = -(height * 0.1).max(20.0);
    Petal {
        x,
        y: start_y,
        vx: rand_between(rng, -4.0, 4.0),
        vy: speed,
        rotation: rand_between(rng, -PI, PI),
        vr: rand_between(rng, -0.6, 0.6),
        life: 0.0,
        max_life: rand_between(rng, 4.5, 7.0),
        size: rand_between(rng, width * 0.03, width * 0.05),
        opacity: 0.25,
        fade: rand_between(rng, 0.1, 0.2),
    }
}

/// Clamp a frame delta (seconds) to the physics step bounds.
#[inline]
#[must_use]
pub fn clamp_step(dt: f64) -> f64 {
    if dt.is_nan() {
        return MIN_STEP;
    }
    dt.clamp(MIN_STEP, MAX_STEP)
}

/// Advance every petal by `dt` seconds and drop the expired ones.
#[must_use]
pub fn update_petals(petals: &[Petal], dt: f64, _width: f64, height: f64) -> Vec<Petal> {
    let dt = clamp_step(dt);
    petals
        .iter()
        .filter_map(|petal| {
            let mut next = *petal;
            next.life += dt;
            next.x += next.vx * dt;
            next.y += next.vy * dt;
            next.vx *= FRICTION;
            next.vy = next.vy * FRICTION + GRAVITY * dt;
            next.rotation += next.vr * dt;
            let life_ratio = next.life / next.max_life;
            if life_ratio > 1.0 || next.y > height + CULL_MARGIN {
                return None;
            }
            next.opacity = (petal.opacity * (1.0 - life_ratio * petal.fade)).max(0.0);
            Some(next)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// PetalField
// ---------------------------------------------------------------------------

/// Population and spawn settings for a [`PetalField`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PetalFieldConfig {
    /// Petals per opening burst.
    pub opening_count: usize,
    /// Reading-mode population target (clamped to 3..=6).
    pub reading_count: usize,
    /// Seconds of active time between trickle spawns.
    pub spawn_interval: f64,
}

impl Default for PetalFieldConfig {
    fn default() -> Self {
        Self {
            opening_count: 10,
            reading_count: 4,
            spawn_interval: 1.2,
        }
    }
}

impl PetalFieldConfig {
    /// Reading population after clamping.
    #[must_use]
    pub fn reading_target(&self) -> usize {
        self.reading_count.clamp(3, 6)
    }
}

/// Stateful particle engine: mode, burst key, active flag, and the petals.
pub struct PetalField {
    config: PetalFieldConfig,
    rng: SmallRng,
    petals: Vec<Petal>,
    mode: PetalMode,
    active: bool,
    burst_key: u64,
    last_frame: Option<Duration>,
    spawn_timer: f64,
}

impl std::fmt::Debug for PetalField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PetalField")
            .field("mode", &self.mode)
            .field("active", &self.active)
            .field("burst_key", &self.burst_key)
            .field("petals", &self.petals.len())
            .finish()
    }
}

impl PetalField {
    /// Create an inactive field in reading mode seeded from the OS.
    #[must_use]
    pub fn new(config: PetalFieldConfig) -> Self {
        Self::with_rng(config, SmallRng::from_os_rng())
    }

    /// Create a field with a deterministic seed.
    #[must_use]
    pub fn with_seed(config: PetalFieldConfig, seed: u64) -> Self {
        Self::with_rng(config, SmallRng::seed_from_u64(seed))
    }

    fn with_rng(config: PetalFieldConfig, rng: SmallRng) -> Self {
        Self {
            config,
            rng,
            petals: Vec::new(),
            mode: PetalMode::Reading,
            active: false,
            burst_key: 0,
            last_frame: None,
            spawn_timer: 0.0,
        }
    }

    #[must_use]
    pub fn petals(&self) -> &[Petal] {
        &self.petals
    }

    #[must_use]
    pub const fn mode(&self) -> PetalMode {
        self.mode
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    #[must_use]
    pub const fn burst_key(&self) -> u64 {
        self.burst_key
    }

    #[must_use]
    pub const fn config(&self) -> &PetalFieldConfig {
        &self.config
    }

    /// Apply the mode, burst key, and active flag chosen by the owner.
    ///
    /// A new burst key seeds a burst in opening mode and clears the field in
    /// reading mode; deactivation clears it immediately.
    pub fn configure(
        &mut self,
        mode: PetalMode,
        burst_key: u64,
        active: bool,
        width: f64,
        height: f64,
    ) {
        self.mode = mode;
        self.active = active;
        if burst_key != self.burst_key {
            self.burst_key = burst_key;
            match mode {
                PetalMode::Opening => {
                    self.petals = create_opening_burst(
                        &mut self.rng,
                        self.config.opening_count,
                        width,
                        height,
                    );
                    #[cfg(feature = "tracing")]
                    tracing::debug!(burst_key, count = self.petals.len(), "petal burst seeded");
                }
                PetalMode::Reading => self.petals.clear(),
            }
        }
        if !active {
            self.petals.clear();
        }
    }

    /// Advance one frame at host time `now`.
    ///
    /// The step is the gap since the previous frame, clamped to the physics
    /// bounds. Inactive or zero-sized fields only resync the frame clock.
    pub fn frame(&mut self, now: Duration, width: f64, height: f64) {
        if width <= 0.0 || height <= 0.0 {
            return;
        }
        let previous = self.last_frame.replace(now).unwrap_or(now);
        if !self.active {
            return;
        }
        let dt = clamp_step(now.saturating_sub(previous).as_secs_f64());

        if self.mode == PetalMode::Reading {
            self.spawn_timer += dt;
            let target = self.config.reading_target();
            while self.petals.len() < target {
                self.petals
                    .push(spawn_reading_petal(&mut self.rng, width, height));
            }
            if self.spawn_timer > self.config.spawn_interval {
                self.petals
                    .push(spawn_reading_petal(&mut self.rng, width, height));
                self.spawn_timer = 0.0;
            }
        }

        self.petals = update_petals(&self.petals, dt, width, height);
    }

    /// Drop every petal.
    pub fn clear(&mut self) {
        self.petals.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const W: f64 = 400.0;
    const H: f64 = 600.0;

    fn rng() -> SmallRng {
        SmallRng::seed_from_u64(7)
    }

    fn still_petal(max_life: f64) -> Petal {
        Petal {
            x: 10.0,
            y: 10.0,
            vx: 0.0,
            vy: 0.0,
            rotation: 0.0,
            vr: 0.0,
            life: 0.0,
            max_life,
            size: 10.0,
            opacity: 1.0,
            fade: 0.5,
        }
    }

    // --- Spawners ---

    #[test]
    fn burst_respects_ranges() {
        let petals = create_opening_burst(&mut rng(), 50, W, H);
        assert_eq!(petals.len(), 50);
        let max_speed = W.max(H) * 0.35;
        for p in &petals {
            assert_eq!((p.x, p.y), (W / 2.0, H / 2.0));
            let speed = p.vx.hypot(p.vy);
            assert!(speed >= max_speed * 0.3 - 1e-9 && speed <= max_speed * 0.6 + 1e-9);
            assert!((1.2..=1.8).contains(&p.max_life));
            assert!((W * 0.04..=W * 0.08).contains(&p.size));
            assert!((0.5..=0.8).contains(&p.fade));
            assert_eq!(p.opacity, 1.0);
            assert_eq!(p.life, 0.0);
        }
    }

    #[test]
    fn reading_petal_respects_ranges() {
        let mut rng = rng();
        for _ in 0..50 {
            let p = spawn_reading_petal(&mut rng, W, H);
            assert!((W * 0.2..=W * 0.8).contains(&p.x));
            assert!(p.y <= -H * 0.1);
            let base = (H * 0.06).max(12.0);
            assert!(p.vy >= base * 0.6 && p.vy <= base);
            assert!((-4.0..=4.0).contains(&p.vx));
            assert!((4.5..=7.0).contains(&p.max_life));
            assert!((W * 0.03..=W * 0.05).contains(&p.size));
            assert_eq!(p.opacity, 0.25);
            assert!((0.1..=0.2).contains(&p.fade));
        }
    }

    #[test]
    fn reading_speed_has_floor() {
        let p = spawn_reading_petal(&mut rng(), 100.0, 50.0);
        assert!(p.vy >= 12.0 * 0.6);
        assert!(p.y <= -20.0);
    }

    // --- Physics ---

    #[test]
    fn step_is_clamped() {
        assert_eq!(clamp_step(0.0), MIN_STEP);
        assert_eq!(clamp_step(1.0), MAX_STEP);
        assert_eq!(clamp_step(0.03), 0.03);
        assert_eq!(clamp_step(f64::NAN), MIN_STEP);
    }

    #[test]
    fn integrates_velocity_friction_gravity() {
        let mut p = still_petal(10.0);
        p.vx = 10.0;
        p.vy = 10.0;
        p.vr = 2.0;
        let out = update_petals(&[p], 0.05, W, H);
        let n = out[0];
        assert!((n.x - 10.5).abs() < 1e-9);
        assert!((n.y - 10.5).abs() < 1e-9);
        assert!((n.vx - 9.2).abs() < 1e-9);
        assert!((n.vy - (9.2 + 12.0 * 0.05)).abs() < 1e-9);
        assert!((n.rotation - 0.1).abs() < 1e-9);
        assert!((n.life - 0.05).abs() < 1e-9);
    }

    #[test]
    fn opacity_decays_from_previous() {
        let p = still_petal(1.0);
        let n = update_petals(&[p], 0.05, W, H)[0];
        let expected = 1.0 * (1.0 - 0.05 * 0.5);
        assert!((n.opacity - expected).abs() < 1e-9);
    }

    #[test]
    fn expired_petal_is_culled() {
        let mut petals = vec![still_petal(1.2)];
        let mut steps = 0;
        while !petals.is_empty() {
            petals = update_petals(&petals, 0.05, W, H);
            steps += 1;
            assert!(steps <= 25, "petal outlived its max_life");
        }
        // 24 × 0.05 lands on 1.2 up to rounding; the drop happens on 24 or 25.
        assert!((24..=25).contains(&steps));
    }

    #[test]
    fn petal_below_canvas_is_culled() {
        let mut p = still_petal(10.0);
        p.y = H + CULL_MARGIN + 1.0;
        assert!(update_petals(&[p], 0.016, W, H).is_empty());
    }

    // --- Field ---

    #[test]
    fn burst_seeded_once_per_key() {
        let mut field = PetalField::with_seed(PetalFieldConfig::default(), 1);
        field.configure(PetalMode::Opening, 1, true, W, H);
        assert_eq!(field.petals().len(), 10);
        field.frame(Duration::from_millis(16), W, H);
        let before = field.petals().to_vec();
        field.configure(PetalMode::Opening, 1, true, W, H);
        assert_eq!(field.petals(), before.as_slice());
    }

    #[test]
    fn opening_mode_does_not_trickle() {
        let mut field = PetalField::with_seed(PetalFieldConfig::default(), 2);
        field.configure(PetalMode::Opening, 1, true, W, H);
        let mut now = Duration::ZERO;
        for _ in 0..10 {
            now += Duration::from_millis(16);
            field.frame(now, W, H);
            assert!(field.petals().len() <= 10);
        }
    }

    #[test]
    fn reading_mode_tops_up_and_trickles() {
        let mut field = PetalField::with_seed(PetalFieldConfig::default(), 3);
        field.configure(PetalMode::Reading, 0, true, W, H);
        field.frame(Duration::ZERO, W, H);
        assert_eq!(field.petals().len(), 4);

        let mut now = Duration::ZERO;
        let mut peak = 0;
        for _ in 0..40 {
            now += Duration::from_millis(50);
            field.frame(now, W, H);
            peak = peak.max(field.petals().len());
        }
        assert!(peak >= 5, "a trickle petal should join the population");
    }

    #[test]
    fn reading_key_change_clears() {
        let mut field = PetalField::with_seed(PetalFieldConfig::default(), 4);
        field.configure(PetalMode::Opening, 1, true, W, H);
        field.configure(PetalMode::Reading, 2, true, W, H);
        assert!(field.petals().is_empty());
    }

    #[test]
    fn deactivation_clears_immediately() {
        let mut field = PetalField::with_seed(PetalFieldConfig::default(), 5);
        field.configure(PetalMode::Opening, 1, true, W, H);
        field.configure(PetalMode::Opening, 1, false, W, H);
        assert!(field.petals().is_empty());
        field.frame(Duration::from_secs(1), W, H);
        assert!(field.petals().is_empty());
    }

    #[test]
    fn zero_size_canvas_skips_frame() {
        let mut field = PetalField::with_seed(PetalFieldConfig::default(), 6);
        field.configure(PetalMode::Reading, 0, true, W, H);
        field.frame(Duration::ZERO, 0.0, H);
        assert!(field.petals().is_empty());
    }

    #[test]
    fn reading_target_is_clamped() {
        let low = PetalFieldConfig {
            reading_count: 1,
            ..PetalFieldConfig::default()
        };
        let high = PetalFieldConfig {
            reading_count: 40,
            ..PetalFieldConfig::default()
        };
        assert_eq!(low.reading_target(), 3);
        assert_eq!(high.reading_target(), 6);
    }
}
