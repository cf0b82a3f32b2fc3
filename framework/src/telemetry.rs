//! Read-only telemetry snapshot published by the control loop

use crate::mixer::PerCorner;
use crate::tilt::{AccelSample, TiltSample};

/// Latest tilt, raw acceleration and actuator positions
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "std", derive(serde::Serialize))]
pub struct TelemetrySnapshot {
    #[cfg_attr(feature = "std", serde(flatten))]
    pub tilt: TiltSample,
    #[cfg_attr(feature = "std", serde(flatten))]
    pub accel: AccelSample,
    /// Actuator positions after the last tick
    pub positions: PerCorner<f32>,
    /// Number of completed ticks
    pub tick: u64,
}

#[cfg(feature = "std")]
impl TelemetrySnapshot {
    /// Flat JSON object: `{roll, pitch, normalized_roll, normalized_pitch, ax, ay, az, positions, tick}`
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| String::from("{}"))
    }
}
