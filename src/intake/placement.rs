/// Placement of new uploads on the sphere.
///
/// New memories appear where the camera is looking: the facing direction
/// from the current (smoothed) camera rotation, plus a little random spread
/// so a batch does not stack on one point. The resolver takes the rotation
/// as a parameter and never reads controller state itself.

use std::f32::consts::PI;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::files::IncomingImage;
use crate::projection;
use crate::state::data::{Memory, Rotation};
use crate::state::settings::Settings;

/// Caption shown until the caption service answers
pub const PLACEHOLDER_DESCRIPTION: &str = "Reading this memory…";

#[derive(Debug)]
pub struct PlacementResolver<R: Rng> {
    rng: R,
    /// Max spread per axis, radians
    jitter: f32,
    /// Distance kept from the poles, radians
    pole_margin: f32,
}

impl PlacementResolver<StdRng> {
    pub fn from_settings(settings: &Settings) -> Self {
        Self::with_rng(
            StdRng::from_entropy(),
            settings.placement_jitter,
            settings.pole_margin,
        )
    }
}

impl<R: Rng> PlacementResolver<R> {
    pub fn with_rng(rng: R, jitter: f32, pole_margin: f32) -> Self {
        Self {
            rng,
            jitter: jitter.abs(),
            pole_margin: pole_margin.clamp(0.0, PI / 2.0),
        }
    }

    /// `(theta, phi)` near the direction facing the camera
    pub fn place(&mut self, rotation: Rotation) -> (f32, f32) {
        let (theta, phi) = projection::facing_direction(rotation);
        let theta = theta + self.rng.gen_range(-self.jitter..=self.jitter);
        let phi = (phi + self.rng.gen_range(-self.jitter..=self.jitter))
            .clamp(self.pole_margin, PI - self.pole_margin);
        (theta, Memory::clamp_phi(phi))
    }

    /// Placeholder memory for an upload: analyzing, placed, decorated
    pub fn placeholder(&mut self, image: &IncomingImage, rotation: Rotation, timestamp: i64) -> Memory {
        let (theta, phi) = self.place(rotation);
        Memory {
            id: uuid::Uuid::new_v4().to_string(),
            url: image.path.to_string_lossy().to_string(),
            description: PLACEHOLDER_DESCRIPTION.to_string(),
            timestamp,
            theta,
            phi,
            scale: self.rng.gen_range(0.85..1.15),
            rotation: self.rng.gen_range(-8.0..8.0),
            drift_speed: self.rng.gen_range(0.5..1.5),
            is_analyzing: true,
        }
    }

    /// Placeholders for a whole batch, in batch order
    pub fn prepare_batch(&mut self, images: &[IncomingImage], rotation: Rotation, now_ms: i64) -> Vec<Memory> {
        images
            .iter()
            .enumerate()
            .map(|(i, image)| self.placeholder(image, rotation, now_ms + i as i64))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::path::PathBuf;
    use std::sync::Arc;

    fn resolver(seed: u64) -> PlacementResolver<StdRng> {
        PlacementResolver::with_rng(StdRng::seed_from_u64(seed), 0.15, 0.1)
    }

    fn images(n: usize) -> Vec<IncomingImage> {
        (0..n)
            .map(|i| IncomingImage {
                path: PathBuf::from(format!("/photos/{i}.jpg")),
                bytes: Arc::new(vec![0xFF, 0xD8]),
                mime: "image/jpeg".to_string(),
            })
            .collect()
    }

    #[test]
    fn test_batch_lands_around_facing_direction() {
        for (seed, rotation) in [(1, Rotation::new(10.0, 40.0)), (2, Rotation::new(-30.0, 200.0)), (3, Rotation::IDENTITY)] {
            let (theta0, _) = projection::facing_direction(rotation);
            let batch = resolver(seed).prepare_batch(&images(3), rotation, 1_000);

            assert_eq!(batch.len(), 3);
            let ids: HashSet<&str> = batch.iter().map(|m| m.id.as_str()).collect();
            assert_eq!(ids.len(), 3);

            for memory in &batch {
                assert!(memory.phi >= 0.1 && memory.phi <= PI - 0.1);
                assert!((memory.theta - theta0).abs() <= 0.15 + 1e-5);
                assert!(memory.is_analyzing);
                assert_eq!(memory.description, PLACEHOLDER_DESCRIPTION);
            }
        }
    }

    #[test]
    fn test_pole_facing_camera_is_clamped() {
        // Pitching a quarter turn points the camera at the pole.
        let rotation = Rotation::new(90.0, 0.0);
        let mut resolver = resolver(7);
        for _ in 0..50 {
            let (_, phi) = resolver.place(rotation);
            assert!(phi >= 0.1 && phi <= 0.1 + 0.15 + 1e-3);
        }
    }

    #[test]
    fn test_batch_keeps_order_and_source() {
        let batch = resolver(9).prepare_batch(&images(2), Rotation::IDENTITY, 500);
        assert_eq!(batch[0].url, "/photos/0.jpg");
        assert_eq!(batch[1].url, "/photos/1.jpg");
        assert!(batch[0].timestamp < batch[1].timestamp);
    }

    #[test]
    fn test_zero_jitter_places_exactly() {
        let rotation = Rotation::new(20.0, -45.0);
        let mut resolver = PlacementResolver::with_rng(StdRng::seed_from_u64(0), 0.0, 0.1);
        assert_eq!(resolver.place(rotation), projection::facing_direction(rotation));
    }
}
