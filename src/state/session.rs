/// The session context.
///
/// Constructed once at startup and handed to the UI shell. It owns the
/// memory store and every view controller, and is the only place where an
/// operation touches more than one of them (an upload reads the camera,
/// writes the store and moves the gallery and world indices).

use std::time::Instant;

use log::{info, warn};
use rand::rngs::StdRng;

use super::data::{Memory, MemoryPatch};
use super::library::MemoryStore;
use super::settings::Settings;
use super::view::{ViewCoordinator, ViewMode};
use crate::intake::caption::{CaptionJob, CaptionOutcome, ExpandJob, ExpandOutcome};
use crate::intake::files::IncomingImage;
use crate::intake::placement::PlacementResolver;
use crate::motion::camera::{DragConfig, DragRotation, OrbSpins};
use crate::motion::gallery::GalleryNavigator;
use crate::motion::world::WorldNavigator;
use crate::projection::{self, ProjectedOrb, SpherePoints, Viewport};

/// Longest frame step fed to the springs, so a stall does not teleport
const MAX_FRAME_SECS: f32 = 0.1;

pub struct Session {
    pub settings: Settings,
    pub store: MemoryStore,
    pub views: ViewCoordinator,
    pub camera: DragRotation,
    pub orb_spins: OrbSpins,
    pub gallery: GalleryNavigator,
    pub world: WorldNavigator,
    points: SpherePoints,
    placement: PlacementResolver<StdRng>,
    last_tick: Option<Instant>,
    /// Seconds of animation time, drives decorative drift
    clock: f32,
}

impl Session {
    pub fn new(settings: Settings, seeded: Vec<Memory>) -> Self {
        let placement = PlacementResolver::from_settings(&settings);
        Self::with_placement(settings, seeded, placement)
    }

    pub fn with_placement(settings: Settings, seeded: Vec<Memory>, placement: PlacementResolver<StdRng>) -> Self {
        let count = seeded.len();
        let mut store = MemoryStore::new();
        store.replace_all(seeded);

        let mut points = SpherePoints::new(settings.sphere_radius);
        points.sync(store.memories());

        Self {
            camera: DragRotation::new(DragConfig::camera(&settings)),
            orb_spins: OrbSpins::new(DragConfig::orb(&settings)),
            gallery: GalleryNavigator::new(count, settings.spring_frequency),
            world: WorldNavigator::new(count, settings.autoplay_interval(), settings.spring_frequency),
            views: ViewCoordinator::default(),
            store,
            points,
            placement,
            last_tick: None,
            clock: 0.0,
            settings,
        }
    }

    /// Switch views, tearing down whatever the old view had running
    pub fn switch_view(&mut self, mode: ViewMode) {
        match self.views.switch_to(mode) {
            Some(ViewMode::World) => self.world.unmount(),
            Some(ViewMode::Gallery) => self.gallery.cancel_gestures(),
            Some(ViewMode::Sphere) => {
                self.camera.pointer_up();
                self.orb_spins.pointer_up();
            }
            None => {}
        }
    }

    /// Insert placeholders for a batch of uploads and return their caption jobs.
    ///
    /// Placement reads the smoothed camera rotation. Afterwards the gallery
    /// and world point at the first new memory.
    pub fn admit_uploads(&mut self, images: Vec<IncomingImage>, now_ms: i64) -> Vec<CaptionJob> {
        if images.is_empty() {
            return Vec::new();
        }

        let rotation = self.camera.smoothed();
        let placeholders = self.placement.prepare_batch(&images, rotation, now_ms);
        let first_id = placeholders[0].id.clone();

        let jobs: Vec<CaptionJob> = placeholders
            .iter()
            .zip(images)
            .map(|(memory, image)| CaptionJob {
                id: memory.id.clone(),
                image,
            })
            .collect();

        self.store.append_batch(placeholders);
        self.points.sync(self.store.memories());
        self.gallery.set_count(self.store.len());
        self.world.set_count(self.store.len());

        if let Some(position) = self.store.chronological_position(&first_id) {
            self.gallery.select(position);
            self.world.set_active_index(position as isize);
        }

        info!("📥 Admitted {} uploads, collection now {}", jobs.len(), self.store.len());
        jobs
    }

    /// Land a caption result on its memory
    pub fn apply_caption(&mut self, outcome: CaptionOutcome) {
        if let Err(e) = self.store.patch(&outcome.id, MemoryPatch::caption(outcome.description)) {
            warn!("Dropping caption: {}", e);
        }
    }

    /// Build an expansion request for a memory, if it can be expanded
    pub fn request_expand(&self, id: &str, prompt: &str) -> Option<ExpandJob> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return None;
        }
        let memory = self.store.get(id).filter(|m| !m.is_analyzing)?;
        Some(ExpandJob {
            id: memory.id.clone(),
            path: memory.url.clone().into(),
            current: memory.description.clone(),
            prompt: prompt.to_string(),
        })
    }

    pub fn apply_expansion(&mut self, outcome: ExpandOutcome) {
        let Some(continuation) = outcome.continuation else {
            return;
        };
        if let Err(e) = self.store.append_description(&outcome.id, &continuation) {
            warn!("Dropping expansion: {}", e);
        }
    }

    /// Advance every animation by the time since the previous tick
    pub fn tick(&mut self, now: Instant) {
        let dt = self
            .last_tick
            .map(|last| now.saturating_duration_since(last).as_secs_f32().min(MAX_FRAME_SECS))
            .unwrap_or(0.0);
        self.last_tick = Some(now);
        self.clock += dt;

        self.camera.tick(dt);
        self.orb_spins.tick(dt);
        self.gallery.tick(dt, now);
        self.world.tick(dt, now);
    }

    pub fn clock(&self) -> f32 {
        self.clock
    }

    /// This frame's sphere, back to front
    pub fn projected_orbs(&self, center_x: f32, center_y: f32) -> Vec<ProjectedOrb> {
        let viewport = Viewport {
            center_x,
            center_y,
            perspective: self.settings.perspective,
        };
        projection::project_scene(&self.points, self.store.memories(), self.camera.smoothed(), viewport)
    }

    /// Memories in the order the gallery and world list them
    pub fn chronological(&self) -> Vec<&Memory> {
        self.store.chronological()
    }
}
