/// Shared data structures for the application state
///
/// These structs represent the data model that flows between
/// the collection store, the motion controllers and the UI layer.

/// Smallest distance `phi` keeps from either pole
pub const POLE_EPSILON: f32 = 1e-3;

/// Represents a single photo memory
#[derive(Debug, Clone, PartialEq)]
pub struct Memory {
    /// Stable unique identity
    pub id: String,
    /// Where the displayable image lives (a local file path for uploads)
    pub url: String,
    /// Caption text, starts as a placeholder for uploads
    pub description: String,
    /// Creation time in epoch milliseconds
    pub timestamp: i64,
    /// Azimuth on the sphere (radians, unconstrained)
    pub theta: f32,
    /// Polar angle on the sphere (radians, strictly inside (0, PI))
    pub phi: f32,
    /// Decorative size variance
    pub scale: f32,
    /// Decorative tilt in degrees
    pub rotation: f32,
    /// Decorative drift animation speed
    pub drift_speed: f32,
    /// True until caption generation resolves
    pub is_analyzing: bool,
}

impl Memory {
    /// Clamp `phi` away from the poles where the projection degenerates
    pub fn clamp_phi(phi: f32) -> f32 {
        phi.clamp(POLE_EPSILON, std::f32::consts::PI - POLE_EPSILON)
    }

    /// Whether the caption can be shown (false while still analyzing)
    pub fn has_caption(&self) -> bool {
        !self.is_analyzing
    }

    /// Text to display for the caption, an ellipsis while analyzing
    pub fn caption(&self) -> &str {
        if self.has_caption() {
            &self.description
        } else {
            "…"
        }
    }
}

/// Partial update addressed to a memory by id
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryPatch {
    pub description: Option<String>,
    pub is_analyzing: Option<bool>,
    pub theta: Option<f32>,
    pub phi: Option<f32>,
}

impl MemoryPatch {
    /// Patch produced when a caption resolves (success or fallback)
    pub fn caption(description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
            is_analyzing: Some(false),
            ..Self::default()
        }
    }

    pub(crate) fn apply(self, memory: &mut Memory) {
        if let Some(description) = self.description {
            memory.description = description;
        }
        if let Some(is_analyzing) = self.is_analyzing {
            memory.is_analyzing = is_analyzing;
        }
        if let Some(theta) = self.theta {
            memory.theta = theta;
        }
        if let Some(phi) = self.phi {
            memory.phi = Memory::clamp_phi(phi);
        }
    }
}

/// Camera or orb rotation in degrees
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rotation {
    /// Rotation about the X axis
    pub pitch: f32,
    /// Rotation about the Y axis
    pub yaw: f32,
}

impl Rotation {
    pub const IDENTITY: Rotation = Rotation { pitch: 0.0, yaw: 0.0 };

    pub fn new(pitch: f32, yaw: f32) -> Self {
        Self { pitch, yaw }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Memory {
        Memory {
            id: "m1".into(),
            url: "/tmp/a.jpg".into(),
            description: "placeholder".into(),
            timestamp: 1,
            theta: 0.0,
            phi: 1.0,
            scale: 1.0,
            rotation: 0.0,
            drift_speed: 1.0,
            is_analyzing: true,
        }
    }

    #[test]
    fn test_clamp_phi_keeps_away_from_poles() {
        assert!(Memory::clamp_phi(0.0) > 0.0);
        assert!(Memory::clamp_phi(std::f32::consts::PI) < std::f32::consts::PI);
        assert_eq!(Memory::clamp_phi(1.2), 1.2);
    }

    #[test]
    fn test_caption_patch_clears_analyzing() {
        let mut memory = sample();
        MemoryPatch::caption("a beach at dusk").apply(&mut memory);
        assert_eq!(memory.description, "a beach at dusk");
        assert!(!memory.is_analyzing);
        assert!(memory.has_caption());
    }

    #[test]
    fn test_caption_hidden_while_analyzing() {
        let mut memory = sample();
        assert_eq!(memory.caption(), "…");

        MemoryPatch::caption("two dogs in the snow").apply(&mut memory);
        assert_eq!(memory.caption(), "two dogs in the snow");
    }

    #[test]
    fn test_patch_phi_is_clamped() {
        let mut memory = sample();
        let patch = MemoryPatch { phi: Some(0.0), ..MemoryPatch::default() };
        patch.apply(&mut memory);
        assert!(memory.phi >= POLE_EPSILON);
        assert_eq!(memory.description, "placeholder");
    }
}
