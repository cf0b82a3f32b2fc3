//! Chassis tilt estimation
//!
//! Converts a single accelerometer sample into roll/pitch angles. The rig
//! treats every sample as ground truth: there is no smoothing across
//! samples. Estimation sits behind [`TiltEstimator`] so a low-pass or
//! complementary filter can be dropped in without touching the mixer or the
//! actuator models.

/// Tilt (degrees) at which the estimate saturates. Anything steeper is
/// beyond mechanical travel or sensor noise.
pub const MAX_TILT_DEG: f32 = 30.0;

/// Raw acceleration sample in g (1 g at rest, pointing down the Z axis)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "std", derive(serde::Serialize))]
pub struct AccelSample {
    pub ax: f32,
    pub ay: f32,
    pub az: f32,
}

impl AccelSample {
    /// Level rig at rest
    pub const LEVEL: Self = Self {
        ax: 0.0,
        ay: 0.0,
        az: 1.0,
    };

    pub fn new(ax: f32, ay: f32, az: f32) -> Self {
        Self { ax, ay, az }
    }

    pub fn is_finite(&self) -> bool {
        self.ax.is_finite() && self.ay.is_finite() && self.az.is_finite()
    }
}

/// Clamped roll/pitch for one tick
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "std", derive(serde::Serialize))]
pub struct TiltSample {
    /// Roll (degrees, left/right), within ±MAX_TILT_DEG
    pub roll: f32,
    /// Pitch (degrees, nose up/down), within ±MAX_TILT_DEG
    pub pitch: f32,
    /// Roll scaled to [-1, 1]
    pub normalized_roll: f32,
    /// Pitch scaled to [-1, 1]
    pub normalized_pitch: f32,
}

impl TiltSample {
    pub const LEVEL: Self = Self {
        roll: 0.0,
        pitch: 0.0,
        normalized_roll: 0.0,
        normalized_pitch: 0.0,
    };

    /// Build a sample from raw angles, saturating at ±MAX_TILT_DEG.
    ///
    /// Non-finite angles are treated as level so they never reach the
    /// integrator.
    pub fn from_angles(roll_deg: f32, pitch_deg: f32) -> Self {
        let roll = finite_or_zero(roll_deg).clamp(-MAX_TILT_DEG, MAX_TILT_DEG);
        let pitch = finite_or_zero(pitch_deg).clamp(-MAX_TILT_DEG, MAX_TILT_DEG);

        Self {
            roll,
            pitch,
            normalized_roll: (roll / MAX_TILT_DEG).clamp(-1.0, 1.0),
            normalized_pitch: (pitch / MAX_TILT_DEG).clamp(-1.0, 1.0),
        }
    }
}

/// Source of tilt estimates for the control loop
pub trait TiltEstimator {
    /// Estimate tilt from the latest acceleration sample
    fn estimate(&mut self, sample: AccelSample) -> TiltSample;
}

/// Stateless estimator: one accelerometer sample, no filtering
#[derive(Debug, Clone, Copy, Default)]
pub struct AccelTilt;

impl TiltEstimator for AccelTilt {
    fn estimate(&mut self, sample: AccelSample) -> TiltSample {
        let (roll, pitch) = roll_pitch_deg(sample);
        TiltSample::from_angles(roll, pitch)
    }
}

/// Unclamped roll/pitch (degrees) of the gravity vector
///
/// # Arguments
/// * `sample` - Acceleration in g
///
/// # Returns
/// * `(roll, pitch)` - `roll = atan2(ay, az)`, `pitch = atan2(-ax, sqrt(ay² + az²))`
///
/// An all-zero sample yields `(0, 0)`.
pub fn roll_pitch_deg(sample: AccelSample) -> (f32, f32) {
    let AccelSample { ax, ay, az } = sample;

    let roll = libm::atan2f(ay, az).to_degrees();
    let pitch = libm::atan2f(-ax, libm::sqrtf(ay * ay + az * az)).to_degrees();

    (roll, pitch)
}

fn finite_or_zero(value: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn estimate(ax: f32, ay: f32, az: f32) -> TiltSample {
        AccelTilt.estimate(AccelSample::new(ax, ay, az))
    }

    #[test]
    fn test_level_rig() {
        let tilt = estimate(0.0, 0.0, 1.0);
        assert_eq!(tilt.roll, 0.0);
        assert_eq!(tilt.pitch, 0.0);
        assert_eq!(tilt.normalized_roll, 0.0);
        assert_eq!(tilt.normalized_pitch, 0.0);
    }

    #[test]
    fn test_small_roll_is_linear_in_degrees() {
        // 15° roll: gravity splits between Y and Z
        let angle = 15.0f32.to_radians();
        let tilt = estimate(0.0, angle.sin(), angle.cos());
        assert!((tilt.roll - 15.0).abs() < 0.01, "roll = {}", tilt.roll);
        assert!((tilt.normalized_roll - 0.5).abs() < 0.001);
        assert!(tilt.pitch.abs() < 0.001);
    }

    #[test]
    fn test_pitch_sign_follows_negative_x() {
        let angle = 10.0f32.to_radians();
        let nose = estimate(-angle.sin(), 0.0, angle.cos());
        assert!((nose.pitch - 10.0).abs() < 0.01, "pitch = {}", nose.pitch);

        let tail = estimate(angle.sin(), 0.0, angle.cos());
        assert!((tail.pitch + 10.0).abs() < 0.01, "pitch = {}", tail.pitch);
    }

    #[test]
    fn test_steep_tilt_saturates() {
        // 45° roll is beyond travel
        let tilt = estimate(0.0, 0.7071, 0.7071);
        assert_eq!(tilt.roll, MAX_TILT_DEG);
        assert_eq!(tilt.normalized_roll, 1.0);

        // Upside down rig: roll near 180° also saturates rather than wrapping
        let flipped = estimate(0.0, 0.05, -1.0);
        assert_eq!(flipped.roll, MAX_TILT_DEG);
    }

    #[test]
    fn test_zero_sample_does_not_fault() {
        let tilt = estimate(0.0, 0.0, 0.0);
        assert_eq!(tilt, TiltSample::LEVEL);
    }

    #[test]
    fn test_nan_sample_is_treated_as_level() {
        let tilt = estimate(f32::NAN, 0.2, f32::NAN);
        assert!(tilt.roll.is_finite());
        assert!(tilt.pitch.is_finite());
        assert_eq!(tilt.normalized_pitch, 0.0);
    }

    #[test]
    fn test_outputs_always_bounded() {
        let axes = [-4.0f32, -1.0, -0.3, 0.0, 0.2, 1.0, 3.5, f32::INFINITY];
        for &ax in &axes {
            for &ay in &axes {
                for &az in &axes {
                    let tilt = estimate(ax, ay, az);
                    assert!(
                        tilt.roll.abs() <= MAX_TILT_DEG && tilt.pitch.abs() <= MAX_TILT_DEG,
                        "angles out of range for ({}, {}, {}): {:?}",
                        ax,
                        ay,
                        az,
                        tilt
                    );
                    assert!(
                        tilt.normalized_roll.abs() <= 1.0 && tilt.normalized_pitch.abs() <= 1.0,
                        "normalized out of range for ({}, {}, {}): {:?}",
                        ax,
                        ay,
                        az,
                        tilt
                    );
                }
            }
        }
    }
}
