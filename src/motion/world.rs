/// Discrete slideshow navigation with looping, autoplay and parallax.
///
/// Unlike the gallery, the world view wraps in both directions. The
/// autoplay timer is a single deadline slot, so starting play again
/// replaces the pending deadline rather than adding a second one.

use std::time::{Duration, Instant};

use log::debug;

use super::spring::Spring;

const BACKGROUND_SHIFT_PX: f32 = 40.0;
const TILT_DEG: f32 = 12.0;
const TEXT_SHIFT_PX: f32 = 20.0;
/// Wheel deltas smaller than this are ignored
const WHEEL_MIN_DELTA: f32 = 8.0;
/// One slide per wheel gesture
const WHEEL_COOLDOWN: Duration = Duration::from_millis(400);

/// Repeating deadline driven by the frame clock
#[derive(Debug, Clone)]
pub struct Autoplay {
    interval: Duration,
    next_due: Option<Instant>,
}

impl Autoplay {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_due: None,
        }
    }

    /// (Re)start the timer; any pending deadline is dropped
    pub fn start(&mut self, now: Instant) {
        self.next_due = Some(now + self.interval);
    }

    pub fn stop(&mut self) {
        self.next_due = None;
    }

    pub fn is_running(&self) -> bool {
        self.next_due.is_some()
    }

    /// Number of pending timers (0 or 1)
    pub fn scheduled(&self) -> usize {
        usize::from(self.next_due.is_some())
    }

    /// Whether the deadline passed. Fires at most once per call; after a
    /// long stall the next deadline is measured from `now`.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.next_due {
            Some(due) if now >= due => {
                let next = due + self.interval;
                self.next_due = Some(if next <= now { now + self.interval } else { next });
                true
            }
            _ => false,
        }
    }
}

/// Cosmetic pointer-driven offsets
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParallaxOffset {
    pub background: (f32, f32),
    /// Card tilt in degrees about (x, y)
    pub tilt: (f32, f32),
    pub text: (f32, f32),
}

#[derive(Debug, Clone)]
pub struct Parallax {
    x: Spring,
    y: Spring,
}

impl Parallax {
    pub fn new(frequency: f32) -> Self {
        Self {
            x: Spring::new(0.0, frequency),
            y: Spring::new(0.0, frequency),
        }
    }

    /// Pointer position within a viewport, normalised to ±0.5 per axis
    pub fn pointer(&mut self, x: f32, y: f32, width: f32, height: f32) {
        self.x.set_target(normalise(x, width));
        self.y.set_target(normalise(y, height));
    }

    pub fn reset(&mut self) {
        self.x.set_target(0.0);
        self.y.set_target(0.0);
    }

    pub fn tick(&mut self, dt: f32) {
        self.x.step(dt);
        self.y.step(dt);
    }

    pub fn offset(&self) -> ParallaxOffset {
        let (nx, ny) = (self.x.value(), self.y.value());
        ParallaxOffset {
            background: (-nx * BACKGROUND_SHIFT_PX, -ny * BACKGROUND_SHIFT_PX),
            tilt: (-ny * TILT_DEG, nx * TILT_DEG),
            text: (nx * TEXT_SHIFT_PX, ny * TEXT_SHIFT_PX),
        }
    }
}

fn normalise(value: f32, extent: f32) -> f32 {
    if extent <= 0.0 || !value.is_finite() {
        return 0.0;
    }
    (value / extent - 0.5).clamp(-0.5, 0.5)
}

#[derive(Debug, Clone)]
pub struct WorldNavigator {
    count: usize,
    active: usize,
    playing: bool,
    autoplay: Autoplay,
    parallax: Parallax,
    last_wheel: Option<Instant>,
}

impl WorldNavigator {
    pub fn new(count: usize, interval: Duration, frequency: f32) -> Self {
        Self {
            count,
            active: 0,
            playing: false,
            autoplay: Autoplay::new(interval),
            parallax: Parallax::new(frequency),
            last_wheel: None,
        }
    }

    pub fn active(&self) -> usize {
        self.active
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn autoplay(&self) -> &Autoplay {
        &self.autoplay
    }

    pub fn parallax(&self) -> &Parallax {
        &self.parallax
    }

    pub fn parallax_mut(&mut self) -> &mut Parallax {
        &mut self.parallax
    }

    pub fn set_count(&mut self, count: usize) {
        self.count = count;
        if self.active >= count {
            self.active = count.saturating_sub(1);
        }
    }

    /// Set the index with wraparound in both directions
    pub fn set_active_index(&mut self, index: isize) -> usize {
        self.active = if self.count == 0 {
            0
        } else {
            index.rem_euclid(self.count as isize) as usize
        };
        self.active
    }

    pub fn next(&mut self) -> usize {
        self.set_active_index(self.active as isize + 1)
    }

    pub fn prev(&mut self) -> usize {
        self.set_active_index(self.active as isize - 1)
    }

    /// Step one slide per wheel gesture; returns the new index if it moved
    pub fn wheel(&mut self, delta: f32, now: Instant) -> Option<usize> {
        if delta.abs() < WHEEL_MIN_DELTA {
            return None;
        }
        if let Some(last) = self.last_wheel {
            if now.saturating_duration_since(last) < WHEEL_COOLDOWN {
                return None;
            }
        }
        self.last_wheel = Some(now);
        Some(if delta > 0.0 { self.next() } else { self.prev() })
    }

    pub fn play(&mut self, now: Instant) {
        self.playing = true;
        self.autoplay.start(now);
        debug!("world autoplay started");
    }

    pub fn pause(&mut self) {
        self.playing = false;
        self.autoplay.stop();
    }

    pub fn toggle_play(&mut self, now: Instant) {
        if self.playing {
            self.pause();
        } else {
            self.play(now);
        }
    }

    /// The view went away: no timer may outlive it
    pub fn unmount(&mut self) {
        self.pause();
        self.parallax.reset();
    }

    pub fn tick(&mut self, dt: f32, now: Instant) {
        self.parallax.tick(dt);
        if self.playing && self.autoplay.poll(now) {
            self.next();
        }
    }
}
