/// Spherical projection
///
/// Pure math that places memories on a sphere and projects them through
/// the camera rotation:
/// - static object-space positions from `(theta, phi)`
/// - the camera rotation matrix and its billboard inverse
/// - depth-driven atmospheric styling (opacity, blur, brightness, grayscale)
/// - the per-frame projected item list, painted back to front
///
/// # Rotation order
/// The camera applies yaw about Y first, then pitch about X:
/// `camera = Rx(pitch) * Ry(yaw)`. The billboard applies the exact inverse in
/// reverse order: `billboard = Ry(-yaw) * Rx(-pitch)`. Every consumer (the
/// renderer, depth, upload placement) goes through these two functions so
/// the order cannot drift apart.

use std::collections::HashMap;
use std::f32::consts::PI;

use cgmath::{Deg, InnerSpace, Matrix3, Vector3};

use crate::state::data::{Memory, Rotation};

/// Fraction of the radius toward the camera at which items are fully opaque
const NEAR_FRACTION: f32 = 0.8;
/// Fraction of the radius away from the camera at which styling saturates
const FAR_FRACTION: f32 = -0.8;
/// Fraction of the radius toward the camera beyond which there is no blur
const CLEAR_FRACTION: f32 = 0.5;

const MIN_OPACITY: f32 = 0.4;
const MAX_BLUR_PX: f32 = 8.0;
const MIN_BRIGHTNESS: f32 = 0.45;
const MAX_GRAYSCALE: f32 = 0.85;

/// Radii below this are treated as this
const MIN_RADIUS: f32 = 1e-3;

/// Object-space position of a point on the sphere.
/// `y` is the polar axis.
pub fn sphere_position(theta: f32, phi: f32, radius: f32) -> Vector3<f32> {
    let phi = Memory::clamp_phi(phi);
    Vector3::new(
        radius * phi.sin() * theta.cos(),
        radius * phi.cos(),
        radius * phi.sin() * theta.sin(),
    )
}

/// Inverse of `sphere_position` for a direction vector: returns `(theta, phi)`
pub fn to_spherical(direction: Vector3<f32>) -> (f32, f32) {
    let length = direction.magnitude();
    if length <= f32::EPSILON {
        return (0.0, PI / 2.0);
    }
    let unit = direction / length;
    let phi = unit.y.clamp(-1.0, 1.0).acos();
    let theta = unit.z.atan2(unit.x);
    (theta, Memory::clamp_phi(phi))
}

/// Rotation applied to the whole sphere: yaw about Y, then pitch about X
pub fn camera_matrix(rotation: Rotation) -> Matrix3<f32> {
    Matrix3::from_angle_x(Deg(rotation.pitch)) * Matrix3::from_angle_y(Deg(rotation.yaw))
}

/// Counter-rotation applied to each item so its image plane faces the viewer
pub fn billboard_matrix(rotation: Rotation) -> Matrix3<f32> {
    Matrix3::from_angle_y(Deg(-rotation.yaw)) * Matrix3::from_angle_x(Deg(-rotation.pitch))
}

/// Depth of an object-space position after the camera rotation.
/// Positive values face the viewer.
pub fn projected_depth(position: Vector3<f32>, rotation: Rotation) -> f32 {
    (camera_matrix(rotation) * position).z
}

/// Direction on the sphere currently facing the camera, as `(theta, phi)`.
///
/// The view-space forward vector `(0, 0, 1)` pulled back through the camera
/// rotation. A memory placed here projects to the maximum depth.
pub fn facing_direction(rotation: Rotation) -> (f32, f32) {
    let forward = Vector3::new(0.0, 0.0, 1.0);
    to_spherical(billboard_matrix(rotation) * forward)
}

/// Linear remap with the output clamped to the output range.
/// A degenerate input range acts as a step at `in_hi`.
pub fn remap_clamped(value: f32, in_lo: f32, in_hi: f32, out_lo: f32, out_hi: f32) -> f32 {
    let span = in_hi - in_lo;
    if span.abs() <= f32::EPSILON {
        return if value >= in_hi { out_hi } else { out_lo };
    }
    let t = ((value - in_lo) / span).clamp(0.0, 1.0);
    out_lo + (out_hi - out_lo) * t
}

/// Atmospheric styling derived from projected depth
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthStyle {
    pub opacity: f32,
    /// Blur radius in logical pixels
    pub blur: f32,
    /// 1.0 is unchanged
    pub brightness: f32,
    /// 0.0 is full colour
    pub grayscale: f32,
}

/// Map a projected depth to styling. Every channel is monotonic in depth and
/// saturates at the near and far bounds.
pub fn depth_style(z_final: f32, radius: f32) -> DepthStyle {
    let radius = radius.max(MIN_RADIUS);
    let z = z_final.clamp(-radius, radius);
    let far = radius * FAR_FRACTION;
    let near = radius * NEAR_FRACTION;
    let clear = radius * CLEAR_FRACTION;

    DepthStyle {
        opacity: remap_clamped(z, far, near, MIN_OPACITY, 1.0),
        blur: remap_clamped(z, far, clear, MAX_BLUR_PX, 0.0),
        brightness: remap_clamped(z, far, near, MIN_BRIGHTNESS, 1.0),
        grayscale: remap_clamped(z, far, clear, MAX_GRAYSCALE, 0.0),
    }
}

/// Back-hemisphere items are drawn but never receive pointer events
pub fn is_interactive(z_final: f32) -> bool {
    z_final >= 0.0
}

/// Even distribution of `count` points on the sphere (golden-angle spiral).
/// Returns `(theta, phi)` for point `index`.
pub fn fibonacci_coords(index: usize, count: usize) -> (f32, f32) {
    let count = count.max(1) as f32;
    let golden_angle = PI * (3.0 - 5.0_f32.sqrt());
    let i = index as f32;

    let y = 1.0 - 2.0 * (i + 0.5) / count;
    let phi = y.clamp(-1.0, 1.0).acos();
    let theta = (i * golden_angle).rem_euclid(2.0 * PI);
    (theta, Memory::clamp_phi(phi))
}

/// Object-space positions, computed once per memory and reused every frame
#[derive(Debug, Default)]
pub struct SpherePoints {
    radius: f32,
    points: HashMap<String, CachedPoint>,
}

#[derive(Debug, Clone, Copy)]
struct CachedPoint {
    theta: f32,
    phi: f32,
    position: Vector3<f32>,
}

impl SpherePoints {
    pub fn new(radius: f32) -> Self {
        Self {
            radius: radius.max(MIN_RADIUS),
            points: HashMap::new(),
        }
    }

    /// Bring the cache in line with the collection. Only memories that are
    /// new or have moved are recomputed.
    pub fn sync(&mut self, memories: &[Memory]) {
        let radius = self.radius;
        for memory in memories {
            let stale = match self.points.get(&memory.id) {
                Some(p) => p.theta != memory.theta || p.phi != memory.phi,
                None => true,
            };
            if stale {
                self.points.insert(
                    memory.id.clone(),
                    CachedPoint {
                        theta: memory.theta,
                        phi: memory.phi,
                        position: sphere_position(memory.theta, memory.phi, radius),
                    },
                );
            }
        }
        if self.points.len() > memories.len() {
            self.points.retain(|id, _| memories.iter().any(|m| &m.id == id));
        }
    }

    pub fn position(&self, id: &str) -> Option<Vector3<f32>> {
        self.points.get(id).map(|p| p.position)
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }
}

/// One memory as it should be drawn this frame
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedOrb {
    pub id: String,
    /// Screen-space centre
    pub x: f32,
    pub y: f32,
    /// Depth after camera rotation, positive toward the viewer
    pub depth: f32,
    /// Perspective size factor
    pub scale: f32,
    pub style: DepthStyle,
    pub interactive: bool,
}

impl ProjectedOrb {
    /// Whether a screen point falls on this orb, given its unscaled radius
    pub fn contains(&self, x: f32, y: f32, base_radius: f32) -> bool {
        let r = base_radius * self.scale;
        let (dx, dy) = (x - self.x, y - self.y);
        dx * dx + dy * dy <= r * r
    }
}

/// Screen placement of the sphere
#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    pub center_x: f32,
    pub center_y: f32,
    pub perspective: f32,
}

/// Project every cached memory through the camera.
/// The result is ordered back to front for painting.
pub fn project_scene(
    points: &SpherePoints,
    memories: &[Memory],
    rotation: Rotation,
    viewport: Viewport,
) -> Vec<ProjectedOrb> {
    let camera = camera_matrix(rotation);
    let radius = points.radius();

    let mut orbs: Vec<ProjectedOrb> = memories
        .iter()
        .filter_map(|memory| {
            let position = points.position(&memory.id)?;
            let rotated = camera * position;
            let denominator = (viewport.perspective - rotated.z).max(1.0);
            let scale = viewport.perspective / denominator;

            Some(ProjectedOrb {
                id: memory.id.clone(),
                x: viewport.center_x + rotated.x * scale,
                y: viewport.center_y - rotated.y * scale,
                depth: rotated.z,
                scale,
                style: depth_style(rotated.z, radius),
                interactive: is_interactive(rotated.z),
            })
        })
        .collect();

    orbs.sort_by(|a, b| a.depth.total_cmp(&b.depth));
    orbs
}

/// Front-most interactive orb under a screen point
pub fn hit_test<'a>(orbs: &'a [ProjectedOrb], x: f32, y: f32, base_radius: f32) -> Option<&'a str> {
    orbs.iter()
        .rev()
        .filter(|orb| orb.interactive)
        .find(|orb| orb.contains(x, y, base_radius))
        .map(|orb| orb.id.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-4;

    fn rotations() -> Vec<Rotation> {
        let mut out = Vec::new();
        for pitch in [-85.0, -47.5, -10.0, 0.0, 12.5, 33.0, 60.0, 85.0, 170.0, 400.0] {
            for yaw in [-720.0, -135.0, -30.0, 0.0, 17.0, 90.0, 181.0, 359.0, 1000.0] {
                out.push(Rotation::new(pitch, yaw));
            }
        }
        out
    }

    fn assert_identity(m: Matrix3<f32>) {
        let values: &[f32; 9] = m.as_ref();
        let identity = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];
        for (got, want) in values.iter().zip(identity) {
            assert!((got - want).abs() < EPSILON, "expected identity, got {:?}", values);
        }
    }

    fn memory(id: &str, theta: f32, phi: f32) -> Memory {
        Memory {
            id: id.into(),
            url: String::new(),
            description: String::new(),
            timestamp: 0,
            theta,
            phi,
            scale: 1.0,
            rotation: 0.0,
            drift_speed: 1.0,
            is_analyzing: false,
        }
    }

    #[test]
    fn test_positions_lie_on_sphere() {
        for radius in [0.5, 1.0, 320.0] {
            for i in 1..20 {
                let phi = i as f32 * PI / 20.0;
                for theta in [-7.0, -PI, 0.0, 1.0, 2.5, 12.0] {
                    let p = sphere_position(theta, phi, radius);
                    assert!((p.magnitude() - radius).abs() < radius * EPSILON);
                }
            }
        }
    }

    #[test]
    fn test_billboard_cancels_camera_rotation() {
        let normal = Vector3::new(0.0, 0.0, 1.0);
        for rotation in rotations() {
            let combined = camera_matrix(rotation) * billboard_matrix(rotation);
            assert_identity(combined);

            let facing = combined * normal;
            assert!((facing - normal).magnitude() < EPSILON, "{:?} tilts the image plane", rotation);
        }
    }

    #[test]
    fn test_mismatched_order_is_detected() {
        // Undoing pitch before yaw is the classic mistake; it must not cancel.
        let rotation = Rotation::new(40.0, 70.0);
        let wrong = Matrix3::from_angle_x(Deg(-rotation.pitch)) * Matrix3::from_angle_y(Deg(-rotation.yaw));
        let facing = camera_matrix(rotation) * wrong * Vector3::new(0.0, 0.0, 1.0);
        assert!((facing - Vector3::new(0.0, 0.0, 1.0)).magnitude() > 0.1);
    }

    #[test]
    fn test_opacity_is_monotonic_and_saturates() {
        let radius = 300.0;
        let mut previous = depth_style(-radius, radius);
        let steps = 200;
        for i in 0..=steps {
            let z = -radius + 2.0 * radius * i as f32 / steps as f32;
            let style = depth_style(z, radius);
            assert!(style.opacity >= previous.opacity);
            assert!(style.blur <= previous.blur);
            assert!(style.brightness >= previous.brightness);
            assert!(style.grayscale <= previous.grayscale);
            previous = style;
        }

        assert_eq!(depth_style(-radius * 0.8, radius).opacity, MIN_OPACITY);
        assert_eq!(depth_style(-radius * 5.0, radius).opacity, MIN_OPACITY);
        assert_eq!(depth_style(radius * 0.8, radius).opacity, 1.0);
        assert_eq!(depth_style(radius, radius).blur, 0.0);
        assert_eq!(depth_style(-radius, radius).blur, MAX_BLUR_PX);
    }

    #[test]
    fn test_degenerate_inputs_are_guarded() {
        let style = depth_style(0.0, 0.0);
        assert!(style.opacity.is_finite() && style.blur.is_finite());
        assert_eq!(remap_clamped(2.0, 1.0, 1.0, 0.0, 5.0), 5.0);
        assert_eq!(remap_clamped(0.0, 1.0, 1.0, 0.0, 5.0), 0.0);

        let pole = sphere_position(0.0, 0.0, 1.0);
        assert!(pole.y < 1.0);
        assert_eq!(to_spherical(Vector3::new(0.0, 0.0, 0.0)), (0.0, PI / 2.0));
    }

    #[test]
    fn test_interactivity_follows_hemisphere() {
        assert!(is_interactive(0.0));
        assert!(is_interactive(12.0));
        assert!(!is_interactive(-0.01));
    }

    #[test]
    fn test_facing_direction_projects_to_front() {
        let radius = 100.0;
        for rotation in rotations() {
            let (theta, phi) = facing_direction(rotation);
            let depth = projected_depth(sphere_position(theta, phi, radius), rotation);
            assert!((depth - radius).abs() < 0.05, "{:?} gave depth {}", rotation, depth);
        }
    }

    #[test]
    fn test_fibonacci_coords_stay_off_poles() {
        let count = 64;
        for i in 0..count {
            let (theta, phi) = fibonacci_coords(i, count);
            assert!(phi > 0.0 && phi < PI);
            assert!((0.0..2.0 * PI).contains(&theta));
        }
        // First and last points sit in opposite hemispheres.
        assert!(fibonacci_coords(0, count).1 < PI / 2.0);
        assert!(fibonacci_coords(count - 1, count).1 > PI / 2.0);
    }

    #[test]
    fn test_project_scene_orders_back_to_front() {
        let memories = vec![
            memory("front", PI / 2.0, PI / 2.0),
            memory("back", -PI / 2.0, PI / 2.0),
            memory("side", 0.0, PI / 2.0),
        ];
        let mut points = SpherePoints::new(100.0);
        points.sync(&memories);

        let viewport = Viewport { center_x: 400.0, center_y: 300.0, perspective: 1000.0 };
        let orbs = project_scene(&points, &memories, Rotation::IDENTITY, viewport);

        let ids: Vec<&str> = orbs.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["back", "side", "front"]);
        assert!(!orbs[0].interactive);
        assert!(orbs[2].interactive);
        assert!(orbs[2].scale > 1.0 && orbs[0].scale < 1.0);

        // The back orb sits under the front one on screen but cannot be hit.
        assert_eq!(hit_test(&orbs, 400.0, 300.0, 30.0), Some("front"));
    }

    #[test]
    fn test_sphere_points_track_moves_and_removals() {
        let mut memories = vec![memory("a", 0.0, 1.0), memory("b", 1.0, 1.0)];
        let mut points = SpherePoints::new(10.0);
        points.sync(&memories);
        let before = points.position("a").unwrap();

        memories[0].theta = 2.0;
        memories.pop();
        points.sync(&memories);

        assert_eq!(points.len(), 1);
        assert!((points.position("a").unwrap() - before).magnitude() > 1.0);
        assert!(points.position("b").is_none());
    }
}
