//! Spring-damper actuator model
//!
//! Each corner behaves like a unit-mass spring-damper pulled toward its
//! target. Integration is semi-implicit Euler (velocity first, then
//! position with the new velocity). Travel limits act as inelastic
//! end-stops: a clamped corner loses all velocity.

/// Spring/damper coefficients for one axle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpringGains {
    /// Spring stiffness (1/s²)
    pub stiffness: f32,
    /// Damping coefficient (1/s)
    pub damping: f32,
}

impl SpringGains {
    pub fn new(stiffness: f32, damping: f32) -> Self {
        Self { stiffness, damping }
    }

    /// True when the continuous system does not oscillate (c² >= 4k)
    pub fn is_overdamped(&self) -> bool {
        self.damping * self.damping >= 4.0 * self.stiffness
    }
}

/// Position bounds enforced after every integration step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TravelLimits {
    /// Lower suspension travel bound (`rest_offset - half_range`)
    pub travel_min: f32,
    /// Upper suspension travel bound (`rest_offset + half_range`)
    pub travel_max: f32,
    /// Full actuator range, `[0, total_range]`
    pub total_range: f32,
}

impl TravelLimits {
    pub fn new(rest_offset: f32, half_range: f32, total_range: f32) -> Self {
        Self {
            travel_min: rest_offset - half_range,
            travel_max: rest_offset + half_range,
            total_range,
        }
    }

    /// Lowest position a corner can actually reach
    pub fn lower(&self) -> f32 {
        self.travel_min.clamp(0.0, self.total_range)
    }

    /// Highest position a corner can actually reach
    pub fn upper(&self) -> f32 {
        self.travel_max.clamp(0.0, self.total_range)
    }

    pub fn contains(&self, position: f32) -> bool {
        position >= self.lower() && position <= self.upper()
    }
}

/// One corner's spring-damper state
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ActuatorModel {
    position: f32,
    velocity: f32,
}

impl ActuatorModel {
    /// Corner resting at `position` with no velocity
    pub fn new(position: f32) -> Self {
        Self {
            position,
            velocity: 0.0,
        }
    }

    /// Absolute position (actuator units)
    pub fn position(&self) -> f32 {
        self.position
    }

    /// Velocity (actuator units per second)
    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    /// Advance one integration step toward `target`.
    ///
    /// Returns true when an end-stop was hit this step (velocity is then 0).
    /// A non-finite target, or a step that would leave the state
    /// non-finite, holds the previous position instead.
    pub fn advance(
        &mut self,
        target: f32,
        dt: f32,
        gains: SpringGains,
        limits: &TravelLimits,
    ) -> bool {
        let previous = self.position;

        if target.is_finite() {
            let error = self.position - target;
            // Unit mass: acceleration == force
            let force = -gains.stiffness * error - gains.damping * self.velocity;

            self.velocity += force * dt;
            self.position += self.velocity * dt;
        }

        if !self.position.is_finite() || !self.velocity.is_finite() {
            self.position = previous;
            self.velocity = 0.0;
        }

        let mut stopped = false;

        // Suspension travel
        if self.position < limits.travel_min {
            self.position = limits.travel_min;
            self.velocity = 0.0;
            stopped = true;
        }
        if self.position > limits.travel_max {
            self.position = limits.travel_max;
            self.velocity = 0.0;
            stopped = true;
        }

        // Hard actuator range, independent of travel share
        if self.position < 0.0 {
            self.position = 0.0;
            self.velocity = 0.0;
            stopped = true;
        }
        if self.position > limits.total_range {
            self.position = limits.total_range;
            self.velocity = 0.0;
            stopped = true;
        }

        stopped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 0.01;

    fn default_limits() -> TravelLimits {
        // 90° rest, 1/4 of 180° travel
        TravelLimits::new(90.0, 22.5, 180.0)
    }

    fn wide_limits() -> TravelLimits {
        TravelLimits::new(90.0, 90.0, 180.0)
    }

    #[test]
    fn test_rest_stays_at_rest() {
        let mut model = ActuatorModel::new(90.0);
        for _ in 0..1000 {
            model.advance(90.0, DT, SpringGains::new(5.0, 1.5), &default_limits());
        }
        assert_eq!(model.position(), 90.0);
        assert_eq!(model.velocity(), 0.0);
    }

    #[test]
    fn test_overdamped_approach_is_monotonic() {
        let gains = SpringGains::new(4.0, 10.0);
        assert!(gains.is_overdamped());

        let mut model = ActuatorModel::new(90.0);
        let target = 105.0;
        let mut last = model.position();

        for i in 0..3000 {
            model.advance(target, DT, gains, &wide_limits());
            assert!(
                model.position() >= last,
                "step {}: moved away from target ({} -> {})",
                i,
                last,
                model.position()
            );
            assert!(
                model.position() <= target,
                "step {}: overshot target ({})",
                i,
                model.position()
            );
            last = model.position();
        }

        assert!((model.position() - target).abs() < 0.05, "got {}", model.position());
    }

    #[test]
    fn test_underdamped_overshoots_then_settles() {
        // Firmware default front coefficients
        let gains = SpringGains::new(5.0, 1.5);
        assert!(!gains.is_overdamped());

        let mut model = ActuatorModel::new(90.0);
        let target = 100.0;
        let mut peak: f32 = 0.0;

        for _ in 0..2000 {
            model.advance(target, DT, gains, &wide_limits());
            peak = peak.max(model.position());
        }

        assert!(peak > target, "underdamped spring should overshoot (peak {})", peak);
        assert!(peak < target + 10.0, "overshoot must stay bounded (peak {})", peak);
        assert!(
            (model.position() - target).abs() < 0.01,
            "should settle on target: got {}",
            model.position()
        );
    }

    #[test]
    fn test_end_stop_absorbs_velocity() {
        let limits = default_limits();
        let gains = SpringGains::new(5.0, 1.5);
        let mut model = ActuatorModel::new(90.0);

        // Target well beyond the upper travel bound
        let mut reached = None;
        for i in 0..1000 {
            let stopped = model.advance(150.0, 0.05, gains, &limits);
            assert!(
                model.position() <= limits.travel_max,
                "step {}: passed the end-stop ({})",
                i,
                model.position()
            );
            if stopped {
                assert_eq!(model.velocity(), 0.0);
            }
            if model.position() == limits.travel_max && reached.is_none() {
                reached = Some(i);
            }
        }

        assert!(reached.is_some(), "never reached the end-stop");
        assert_eq!(model.position(), 112.5);
        assert_eq!(model.velocity(), 0.0);
    }

    #[test]
    fn test_hard_range_applies_when_travel_exceeds_actuator() {
        // Misconfigured: rest near the top of the range with full travel
        let limits = TravelLimits::new(170.0, 45.0, 180.0);
        assert_eq!(limits.upper(), 180.0);

        let mut model = ActuatorModel::new(170.0);
        for _ in 0..500 {
            model.advance(215.0, 0.05, SpringGains::new(5.0, 1.5), &limits);
            assert!(model.position() <= 180.0);
        }
        assert_eq!(model.position(), 180.0);
        assert_eq!(model.velocity(), 0.0);

        let low = TravelLimits::new(10.0, 45.0, 180.0);
        assert_eq!(low.lower(), 0.0);
        let mut model = ActuatorModel::new(10.0);
        for _ in 0..500 {
            model.advance(-35.0, 0.05, SpringGains::new(5.0, 1.5), &low);
            assert!(model.position() >= 0.0);
        }
        assert_eq!(model.position(), 0.0);
    }

    #[test]
    fn test_non_finite_target_holds_position() {
        let mut model = ActuatorModel::new(95.0);
        model.advance(f32::NAN, DT, SpringGains::new(5.0, 1.5), &default_limits());
        assert_eq!(model.position(), 95.0);
        assert!(model.velocity().is_finite());
    }

    #[test]
    fn test_position_always_within_limits() {
        let limits = default_limits();
        let targets = [0.0f32, 60.0, 89.0, 112.5, 140.0, 180.0];
        let gains = [
            SpringGains::new(0.0, 0.0),
            SpringGains::new(5.0, 1.5),
            SpringGains::new(3.0, 1.2),
            SpringGains::new(400.0, 0.0),
        ];

        for &target in &targets {
            for &g in &gains {
                let mut model = ActuatorModel::new(90.0);
                for _ in 0..400 {
                    let stopped = model.advance(target, 0.05, g, &limits);
                    assert!(
                        limits.contains(model.position()),
                        "position {} escaped limits (target {}, {:?})",
                        model.position(),
                        target,
                        g
                    );
                    if stopped {
                        assert_eq!(model.velocity(), 0.0);
                    }
                }
            }
        }
    }
}
