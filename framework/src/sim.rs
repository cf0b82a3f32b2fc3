//! Bench simulation helpers
//!
//! Synthetic accelerometer input for running the controller without a sensor:
//! the hosted rig and the `rig_sim` example both drive the control path with
//! these.

use crate::tilt::AccelSample;

/// Simple pseudo-random noise generator (deterministic for reproducibility)
#[derive(Debug, Clone)]
pub struct NoiseGen {
    state: u32,
}

impl NoiseGen {
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Returns noise in range [-amplitude, +amplitude]
    pub fn next(&mut self, amplitude: f32) -> f32 {
        // LCG
        self.state = self.state.wrapping_mul(1103515245).wrapping_add(12345);
        let normalized = (self.state as f32 / u32::MAX as f32) * 2.0 - 1.0;
        normalized * amplitude
    }
}

/// Gravity vector (g) seen by a sensor tilted by `roll`/`pitch` degrees
pub fn gravity(roll_deg: f32, pitch_deg: f32) -> AccelSample {
    let (roll, pitch) = (roll_deg.to_radians(), pitch_deg.to_radians());
    AccelSample::new(
        -libm::sinf(pitch),
        libm::sinf(roll) * libm::cosf(pitch),
        libm::cosf(roll) * libm::cosf(pitch),
    )
}
