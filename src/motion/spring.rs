/// Critically-damped spring used for every smoothed value (camera rotation,
/// gallery position, parallax). Uses the closed-form solution, so any frame
/// time is stable and the value never overshoots its target from rest.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spring {
    value: f32,
    velocity: f32,
    target: f32,
    /// Angular frequency in rad/s; higher settles faster
    frequency: f32,
}

impl Spring {
    pub fn new(value: f32, frequency: f32) -> Self {
        Self {
            value,
            velocity: 0.0,
            target: value,
            frequency: frequency.max(0.1),
        }
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    /// Jump to a value with no animation
    pub fn snap_to(&mut self, value: f32) {
        self.value = value;
        self.target = value;
        self.velocity = 0.0;
    }

    /// Advance by `dt` seconds
    pub fn step(&mut self, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        let omega = self.frequency;
        let offset = self.value - self.target;
        let temp = (self.velocity + omega * offset) * dt;
        let decay = (-omega * dt).exp();

        self.velocity = (self.velocity - omega * temp) * decay;
        self.value = self.target + (offset + temp) * decay;
    }

    pub fn is_settled(&self, tolerance: f32) -> bool {
        (self.value - self.target).abs() <= tolerance && self.velocity.abs() <= tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_converges_without_overshoot() {
        let mut spring = Spring::new(0.0, 12.0);
        spring.set_target(10.0);

        let mut previous = spring.value();
        for _ in 0..120 {
            spring.step(1.0 / 60.0);
            assert!(spring.value() <= 10.0 + 1e-4);
            assert!(spring.value() >= previous - 1e-4);
            previous = spring.value();
        }
        assert!(spring.is_settled(1e-2));
    }

    #[test]
    fn test_large_frame_time_is_stable() {
        let mut spring = Spring::new(5.0, 20.0);
        spring.set_target(-5.0);
        spring.step(10.0);
        assert!((spring.value() + 5.0).abs() < 1e-3);
    }

    #[test]
    fn test_snap_and_zero_dt() {
        let mut spring = Spring::new(1.0, 8.0);
        spring.set_target(3.0);
        spring.step(0.0);
        assert_eq!(spring.value(), 1.0);

        spring.snap_to(7.0);
        assert_eq!(spring.target(), 7.0);
        assert!(spring.is_settled(0.0));
    }
}
