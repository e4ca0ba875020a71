/// Drag-to-rotate controller
///
/// One instance drives the world camera; the `OrbSpins` side map holds one
/// more per orb that the user has spun. Both share the same mechanics:
/// - `Idle -> Dragging` on a pointer-down that did not land on a control
/// - pointer deltas feed raw pitch/yaw accumulators (pixels -> degrees)
/// - `Dragging -> Idle` on pointer-up; raw values persist unless gravity is on
/// - readers only ever see the spring-smoothed rotation

use std::collections::HashMap;

use cgmath::Matrix3;
use log::debug;

use super::spring::Spring;
use crate::projection;
use crate::state::data::Rotation;
use crate::state::settings::Settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragPhase {
    Idle,
    Dragging,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragConfig {
    /// Degrees per pixel
    pub sensitivity: f32,
    /// Symmetric pitch clamp in degrees
    pub pitch_limit: Option<f32>,
    /// Spring angular frequency
    pub frequency: f32,
}

impl DragConfig {
    pub fn camera(settings: &Settings) -> Self {
        Self {
            sensitivity: settings.drag_sensitivity,
            pitch_limit: settings.pitch_limit_deg,
            frequency: settings.spring_frequency,
        }
    }

    /// Orbs tumble freely around their own centre
    pub fn orb(settings: &Settings) -> Self {
        Self {
            pitch_limit: None,
            ..Self::camera(settings)
        }
    }
}

#[derive(Debug, Clone)]
pub struct DragRotation {
    config: DragConfig,
    phase: DragPhase,
    last_pointer: Option<(f32, f32)>,
    raw: Rotation,
    pitch: Spring,
    yaw: Spring,
    gravity: bool,
}

impl DragRotation {
    pub fn new(config: DragConfig) -> Self {
        Self {
            config,
            phase: DragPhase::Idle,
            last_pointer: None,
            raw: Rotation::IDENTITY,
            pitch: Spring::new(0.0, config.frequency),
            yaw: Spring::new(0.0, config.frequency),
            gravity: false,
        }
    }

    pub fn phase(&self) -> DragPhase {
        self.phase
    }

    /// Unsmoothed accumulator values
    pub fn raw(&self) -> Rotation {
        self.raw
    }

    /// The rotation every consumer should read
    pub fn smoothed(&self) -> Rotation {
        Rotation::new(self.pitch.value(), self.yaw.value())
    }

    pub fn gravity(&self) -> bool {
        self.gravity
    }

    /// Start a drag. Presses on interactive controls are left alone.
    /// Returns whether the drag started.
    pub fn pointer_down(&mut self, x: f32, y: f32, on_control: bool) -> bool {
        if on_control {
            return false;
        }
        self.phase = DragPhase::Dragging;
        self.last_pointer = Some((x, y));
        true
    }

    pub fn pointer_move(&mut self, x: f32, y: f32) {
        if self.phase != DragPhase::Dragging {
            return;
        }
        let Some((last_x, last_y)) = self.last_pointer.replace((x, y)) else {
            return;
        };

        self.raw.yaw += (x - last_x) * self.config.sensitivity;
        self.raw.pitch += (y - last_y) * self.config.sensitivity;
        if let Some(limit) = self.config.pitch_limit {
            self.raw.pitch = self.raw.pitch.clamp(-limit, limit);
        }
        self.retarget();
    }

    pub fn pointer_up(&mut self) {
        if self.phase != DragPhase::Dragging {
            return;
        }
        self.phase = DragPhase::Idle;
        self.last_pointer = None;
        if self.gravity {
            self.snap_home();
        }
    }

    /// Toggle gravity. Enabling it snaps immediately.
    pub fn set_gravity(&mut self, enabled: bool) {
        self.gravity = enabled;
        if enabled {
            self.snap_home();
        }
    }

    /// Jump to a rotation with no animation
    pub fn set_rotation(&mut self, rotation: Rotation) {
        self.raw = rotation;
        self.pitch.snap_to(rotation.pitch);
        self.yaw.snap_to(rotation.yaw);
    }

    /// Advance the smoothing springs by `dt` seconds
    pub fn tick(&mut self, dt: f32) {
        self.pitch.step(dt);
        self.yaw.step(dt);
    }

    pub fn is_settled(&self) -> bool {
        self.phase == DragPhase::Idle && self.pitch.is_settled(0.01) && self.yaw.is_settled(0.01)
    }

    /// Snap both axes to the nearest whole turn
    fn snap_home(&mut self) {
        self.raw = Rotation::new(nearest_turn(self.raw.pitch), nearest_turn(self.raw.yaw));
        debug!("gravity snap to pitch {} yaw {}", self.raw.pitch, self.raw.yaw);
        self.retarget();
    }

    fn retarget(&mut self) {
        self.pitch.set_target(self.raw.pitch);
        self.yaw.set_target(self.raw.yaw);
    }
}

fn nearest_turn(degrees: f32) -> f32 {
    (degrees / 360.0).round() * 360.0
}

/// Per-orb spin controllers, keyed by memory id and created on first touch.
/// Spinning an orb turns its image plane only; its sphere position is untouched.
#[derive(Debug)]
pub struct OrbSpins {
    config: DragConfig,
    spins: HashMap<String, DragRotation>,
    active: Option<String>,
}

impl OrbSpins {
    pub fn new(config: DragConfig) -> Self {
        Self {
            config,
            spins: HashMap::new(),
            active: None,
        }
    }

    pub fn pointer_down(&mut self, id: &str, x: f32, y: f32) {
        let config = self.config;
        let spin = self
            .spins
            .entry(id.to_string())
            .or_insert_with(|| DragRotation::new(config));
        if spin.pointer_down(x, y, false) {
            self.active = Some(id.to_string());
        }
    }

    pub fn pointer_move(&mut self, x: f32, y: f32) {
        if let Some(spin) = self.active.as_ref().and_then(|id| self.spins.get_mut(id)) {
            spin.pointer_move(x, y);
        }
    }

    pub fn pointer_up(&mut self) {
        if let Some(spin) = self.active.take().and_then(|id| self.spins.get_mut(&id)) {
            spin.pointer_up();
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.active.is_some()
    }

    pub fn tick(&mut self, dt: f32) {
        for spin in self.spins.values_mut() {
            spin.tick(dt);
        }
    }

    /// Smoothed local spin of an orb (identity if never touched)
    pub fn spin(&self, id: &str) -> Rotation {
        self.spins
            .get(id)
            .map(DragRotation::smoothed)
            .unwrap_or(Rotation::IDENTITY)
    }

    /// Image-plane frame of an orb: billboard against the camera, then local spin
    pub fn orb_frame(&self, id: &str, camera: Rotation) -> Matrix3<f32> {
        projection::billboard_matrix(camera) * projection::camera_matrix(self.spin(id))
    }
}
