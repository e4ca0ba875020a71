/// Continuous index navigation for the stacked gallery
///
/// A real-valued position says which card is centred and how far the stack
/// is between it and its neighbour. Drag, wheel and direct selection all
/// move that position's target; the committed `active` index is an integer
/// clamped to `[0, count - 1]` and never wraps.
///
/// Rubber-banding only ever bends the continuous position. Commits go
/// through `commit`, which clamps.

use std::time::{Duration, Instant};

use log::debug;

use super::spring::Spring;

/// Pixels of vertical drag per item
pub const ITEM_EXTENT_PX: f32 = 240.0;
/// Fraction of out-of-range travel that is kept while dragging past an end
const RUBBER_BAND: f32 = 0.35;
/// Net drag (in items) that commits a step on release
const COMMIT_DISTANCE: f32 = 0.2;
/// Release speed (px/ms) that commits a step regardless of distance
const COMMIT_VELOCITY: f32 = 0.5;
/// A pointer that rested this long before release has no velocity
const VELOCITY_STALE: Duration = Duration::from_millis(100);
/// Accumulated wheel delta per committed step
const WHEEL_STEP: f32 = 100.0;
/// Wheel accumulation resets after this long without events
const WHEEL_IDLE: Duration = Duration::from_millis(150);
/// How far the uncommitted wheel remainder leans the stack
const WHEEL_PEEK: f32 = 0.3;
/// Items skipped by PageUp / PageDown
pub const PAGE_STEP: isize = 5;
/// Spacing between stacked cards peeking above the active one
const STACK_PEEK_PX: f32 = 28.0;

#[derive(Debug, Clone, Copy)]
struct DragSession {
    start_y: f32,
    last_y: f32,
    last_at: Instant,
    /// px/ms, positive toward the next item
    velocity: f32,
}

#[derive(Debug, Clone, Copy, Default)]
struct WheelAccumulator {
    delta: f32,
    last: Option<Instant>,
}

#[derive(Debug, Clone)]
pub struct GalleryNavigator {
    count: usize,
    active: usize,
    position: Spring,
    drag: Option<DragSession>,
    wheel: WheelAccumulator,
}

impl GalleryNavigator {
    pub fn new(count: usize, frequency: f32) -> Self {
        Self {
            count,
            active: 0,
            position: Spring::new(0.0, frequency),
            drag: None,
            wheel: WheelAccumulator::default(),
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Committed index
    pub fn active(&self) -> usize {
        self.active
    }

    /// Continuous position used for layout
    pub fn position(&self) -> f32 {
        self.position.value()
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// The collection grew or shrank
    pub fn set_count(&mut self, count: usize) {
        self.count = count;
        if self.active > self.max_index() {
            self.commit(self.max_index() as isize);
        }
    }

    /// Commit an index, clamped to the valid range
    pub fn commit(&mut self, index: isize) -> usize {
        let clamped = index.clamp(0, self.max_index() as isize) as usize;
        if clamped != self.active {
            debug!("gallery commit {} -> {}", self.active, clamped);
        }
        self.active = clamped;
        self.position.set_target(clamped as f32);
        clamped
    }

    // ========== Drag ==========

    pub fn drag_start(&mut self, y: f32, now: Instant) {
        self.wheel = WheelAccumulator::default();
        self.drag = Some(DragSession {
            start_y: y,
            last_y: y,
            last_at: now,
            velocity: 0.0,
        });
    }

    pub fn drag_move(&mut self, y: f32, now: Instant) {
        let Some(session) = self.drag.as_mut() else {
            return;
        };

        let elapsed_ms = now.saturating_duration_since(session.last_at).as_secs_f32() * 1000.0;
        if elapsed_ms > 0.0 {
            let instant = (y - session.last_y) / elapsed_ms;
            session.velocity = 0.8 * instant + 0.2 * session.velocity;
        }
        session.last_y = y;
        session.last_at = now;

        // Pulling down brings the cards stacked above into place
        let offset_items = (y - session.start_y) / ITEM_EXTENT_PX;
        let target = self.rubber_band(self.active as f32 + offset_items);
        self.position.snap_to(target);
    }

    /// Finish a drag: step by one if the drag went far enough or fast enough,
    /// then spring to the committed index from wherever the stack is.
    pub fn drag_end(&mut self, now: Instant) -> usize {
        let Some(session) = self.drag.take() else {
            return self.active;
        };

        let offset = (session.last_y - session.start_y) / ITEM_EXTENT_PX;
        let velocity = if now.saturating_duration_since(session.last_at) > VELOCITY_STALE {
            0.0
        } else {
            session.velocity
        };

        let forward = offset > COMMIT_DISTANCE || velocity > COMMIT_VELOCITY;
        let backward = offset < -COMMIT_DISTANCE || velocity < -COMMIT_VELOCITY;
        let step = match (forward, backward) {
            (true, false) => 1,
            (false, true) => -1,
            (true, true) if velocity != 0.0 => velocity.signum() as isize,
            _ => 0,
        };

        self.commit(self.active as isize + step)
    }

    /// Drop a drag without stepping, e.g. when the press turned out to be a click
    pub fn drag_cancel(&mut self) {
        if self.drag.take().is_some() {
            self.position.set_target(self.active as f32);
        }
    }

    // ========== Wheel ==========

    /// Accumulate a wheel delta; whole steps commit, the remainder leans the stack
    pub fn wheel(&mut self, delta: f32, now: Instant) {
        if self.drag.is_some() {
            return;
        }
        if let Some(last) = self.wheel.last {
            if now.saturating_duration_since(last) > WHEEL_IDLE {
                self.wheel.delta = 0.0;
            }
        }
        self.wheel.last = Some(now);
        self.wheel.delta += delta;

        let steps = (self.wheel.delta / WHEEL_STEP).trunc();
        if steps != 0.0 {
            self.commit(self.active as isize + steps as isize);
            self.wheel.delta -= steps * WHEEL_STEP;
        }

        let lean = self.wheel.delta / WHEEL_STEP * WHEEL_PEEK;
        let target = self.rubber_band(self.active as f32 + lean);
        self.position.set_target(target);
    }

    // ========== Direct selection ==========

    pub fn select(&mut self, index: usize) -> usize {
        self.commit(index as isize)
    }

    /// Jump to a fraction of the scrollbar track
    pub fn scrub(&mut self, fraction: f32) -> usize {
        let fraction = if fraction.is_finite() { fraction.clamp(0.0, 1.0) } else { 0.0 };
        let index = (fraction * self.max_index() as f32).round();
        self.commit(index as isize)
    }

    pub fn step(&mut self, delta: isize) -> usize {
        self.commit(self.active as isize + delta)
    }

    pub fn first(&mut self) -> usize {
        self.commit(0)
    }

    pub fn last(&mut self) -> usize {
        self.commit(self.max_index() as isize)
    }

    /// Scrollbar thumb position in `[0, 1]`
    pub fn thumb_fraction(&self) -> f32 {
        match self.max_index() {
            0 => 0.0,
            max => (self.position() / max as f32).clamp(0.0, 1.0),
        }
    }

    pub fn tick(&mut self, dt: f32, now: Instant) {
        if let Some(last) = self.wheel.last {
            if self.wheel.delta != 0.0 && now.saturating_duration_since(last) > WHEEL_IDLE {
                self.wheel.delta = 0.0;
                self.position.set_target(self.active as f32);
            }
        }
        if self.drag.is_none() {
            self.position.step(dt);
        }
    }

    /// Forget any gesture in flight (view unmounted)
    pub fn cancel_gestures(&mut self) {
        self.drag = None;
        self.wheel = WheelAccumulator::default();
        self.position.set_target(self.active as f32);
    }

    fn max_index(&self) -> usize {
        self.count.saturating_sub(1)
    }

    fn rubber_band(&self, target: f32) -> f32 {
        let max = self.max_index() as f32;
        if target < 0.0 {
            target * RUBBER_BAND
        } else if target > max {
            max + (target - max) * RUBBER_BAND
        } else {
            target
        }
    }
}

/// Visual parameters of one card
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CardLayout {
    pub translate_y: f32,
    pub scale: f32,
    pub opacity: f32,
    /// Paint order, higher is closer
    pub depth: f32,
    pub blur: f32,
}

impl CardLayout {
    pub fn is_visible(&self) -> bool {
        self.opacity > 0.01
    }
}

/// Layout of a card as a function of `index - position` alone.
/// Upcoming cards stack behind and above; passed cards slide down and fade.
pub fn card_layout(offset: f32) -> CardLayout {
    if offset >= 0.0 {
        CardLayout {
            translate_y: -offset * STACK_PEEK_PX,
            scale: (1.0 - offset * 0.06).max(0.7),
            opacity: (1.0 - offset * 0.22).clamp(0.0, 1.0),
            depth: -offset,
            blur: (offset * 1.5).min(6.0),
        }
    } else {
        let passed = -offset;
        CardLayout {
            translate_y: passed * ITEM_EXTENT_PX,
            scale: 1.0 + passed.min(1.0) * 0.05,
            opacity: (1.0 - passed).clamp(0.0, 1.0),
            depth: passed,
            blur: 0.0,
        }
    }
}

/// Visible cards for a position, in paint order (back to front)
pub fn layout_cards(count: usize, position: f32) -> Vec<(usize, CardLayout)> {
    let mut cards: Vec<(usize, CardLayout)> = (0..count)
        .map(|index| (index, card_layout(index as f32 - position)))
        .filter(|(_, layout)| layout.is_visible())
        .collect();
    cards.sort_by(|a, b| a.1.depth.total_cmp(&b.1.depth));
    cards
}
