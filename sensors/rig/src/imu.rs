//! Simulated accelerometer
//!
//! Stands in for the MPU-6050 on a hosted rig. The rig body follows a
//! scripted roll/pitch sway; every reading is encoded into the sensor's
//! register layout and decoded back, so the control loop sees exactly what
//! the hardware path would hand it (including 1-LSB quantisation).

use std::f32::consts::PI;
use std::time::Instant;

use mpu6050::{encode_accel, Mpu6050};
use suspension_core::sim::{gravity, NoiseGen};
use suspension_core::{AccelSample, ImuSource};

use crate::config::ImuConfig;

pub struct SimulatedImu {
    mpu: Mpu6050,
    config: ImuConfig,
    noise: NoiseGen,
    start: Instant,
}

impl SimulatedImu {
    pub fn new(config: &ImuConfig, start: Instant) -> Self {
        Self {
            mpu: Mpu6050::new(config.range),
            config: *config,
            noise: NoiseGen::new(42),
            start,
        }
    }

    /// Scripted rig attitude `(roll, pitch)` in degrees at `t` seconds
    pub fn attitude_at(&self, t: f32) -> (f32, f32) {
        let c = &self.config;
        (
            c.roll_amplitude_deg * sway(t, c.roll_period_s),
            c.pitch_amplitude_deg * sway(t, c.pitch_period_s),
        )
    }

    /// Reading at `t` seconds, through the register encoding
    pub fn sample_at(&mut self, t: f32) -> AccelSample {
        let (roll, pitch) = self.attitude_at(t);
        let g = gravity(roll, pitch);
        let noise = self.config.noise_g;

        let raw = encode_accel(
            g.ax + self.noise.next(noise),
            g.ay + self.noise.next(noise),
            g.az + self.noise.next(noise),
            self.mpu.range(),
        );
        let (ax, ay, az) = self.mpu.read_accel(&raw);

        AccelSample::new(ax, ay, az)
    }
}

impl ImuSource for SimulatedImu {
    fn read(&mut self) -> AccelSample {
        let t = self.start.elapsed().as_secs_f32();
        self.sample_at(t)
    }
}

fn sway(t: f32, period_s: f32) -> f32 {
    if period_s > 0.0 {
        (2.0 * PI * t / period_s).sin()
    } else {
        0.0
    }
}
