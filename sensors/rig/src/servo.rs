//! Servo bank actuator sink
//!
//! Hobby servos take an angle in degrees over their full sweep. The bank
//! keeps the last commanded angle per corner and converts it to the pulse
//! width a PWM driver would emit.

use log::trace;
use suspension_core::{ActuatorSink, Corner, PerCorner};

/// Pulse width at 0° (µs)
pub const MIN_PULSE_US: u16 = 544;
/// Pulse width at full sweep (µs)
pub const MAX_PULSE_US: u16 = 2400;

pub struct ServoBank {
    commands: PerCorner<u16>,
    full_sweep: u16,
    writes: u64,
}

impl ServoBank {
    /// Bank of four servos with a `total_range`-degree sweep, all at `rest`
    pub fn new(total_range: f32, rest: f32) -> Self {
        let full_sweep = total_range.clamp(1.0, u16::MAX as f32) as u16;
        let rest = (rest.round().max(0.0) as u16).min(full_sweep);
        Self {
            commands: PerCorner::splat(rest),
            full_sweep,
            writes: 0,
        }
    }

    /// Last commanded angle per corner
    #[cfg(test)]
    pub fn commands(&self) -> PerCorner<u16> {
        self.commands
    }

    #[cfg(test)]
    pub fn write_count(&self) -> u64 {
        self.writes
    }
}

impl ActuatorSink for ServoBank {
    fn write(&mut self, corner: Corner, position: u16) {
        let angle = position.min(self.full_sweep);
        if self.commands[corner] != angle {
            trace!(
                "servo {} -> {}° ({} µs)",
                corner.as_str(),
                angle,
                pulse_width_us(angle, self.full_sweep)
            );
        }
        self.commands[corner] = angle;
        self.writes += 1;
    }
}

/// Linear map of `angle` in `[0, full_sweep]` onto the servo pulse range
pub fn pulse_width_us(angle: u16, full_sweep: u16) -> u16 {
    if full_sweep == 0 {
        return MIN_PULSE_US;
    }
    let angle = u32::from(angle.min(full_sweep));
    let span = u32::from(MAX_PULSE_US - MIN_PULSE_US);
    MIN_PULSE_US + (angle * span / u32::from(full_sweep)) as u16
}
