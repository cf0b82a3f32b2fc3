//! MPU-6050 Accelerometer Register Driver
//!
//! This crate decodes the MPU-6050 accelerometer burst read into g. It knows
//! the register map and the scaling, and leaves the I2C transfer itself to
//! the caller so it works with any bus implementation.
//!
//! # Features
//!
//! - Big-endian burst decoding (`ACCEL_XOUT_H`..`ACCEL_ZOUT_L`)
//! - All four full-scale ranges
//! - Startup register sequence
//! - `no_std` compatible
//! - No external dependencies (optional `log` behind `logging`)
//!
//! # Example
//!
//! ```ignore
//! use mpu6050::{AccelRange, Mpu6050, ACCEL_BURST_LEN, I2C_ADDR};
//!
//! let mpu = Mpu6050::new(AccelRange::G2);
//!
//! for (reg, value) in mpu.init_sequence() {
//!     i2c.write(I2C_ADDR, &[reg, value])?;
//! }
//!
//! let mut raw = [0u8; ACCEL_BURST_LEN];
//! i2c.write_read(I2C_ADDR, &[mpu6050::ACCEL_XOUT_H], &mut raw)?;
//! let (ax, ay, az) = mpu.read_accel(&raw);
//! ```

#![cfg_attr(not(any(test, feature = "std")), no_std)]

#[cfg(feature = "logging")]
use log::warn;

/// Default I2C address (AD0 low)
pub const I2C_ADDR: u8 = 0x68;

/// Register map (subset used here)
pub const ACCEL_CONFIG: u8 = 0x1C;
pub const ACCEL_XOUT_H: u8 = 0x3B;
pub const PWR_MGMT_1: u8 = 0x6B;
pub const WHO_AM_I: u8 = 0x75;

/// Expected WHO_AM_I response
pub const WHO_AM_I_VALUE: u8 = 0x68;

/// Bytes in one accelerometer burst (X, Y, Z as big-endian i16)
pub const ACCEL_BURST_LEN: usize = 6;

/// Accelerometer full-scale range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccelRange {
    /// ±2 g (power-on default)
    #[default]
    G2,
    /// ±4 g
    G4,
    /// ±8 g
    G8,
    /// ±16 g
    G16,
}

impl AccelRange {
    /// LSB per g
    pub fn sensitivity(self) -> f32 {
        match self {
            AccelRange::G2 => 16384.0,
            AccelRange::G4 => 8192.0,
            AccelRange::G8 => 4096.0,
            AccelRange::G16 => 2048.0,
        }
    }

    /// `AFS_SEL` bits for ACCEL_CONFIG
    pub fn config_bits(self) -> u8 {
        match self {
            AccelRange::G2 => 0x00,
            AccelRange::G4 => 0x08,
            AccelRange::G8 => 0x10,
            AccelRange::G16 => 0x18,
        }
    }

    pub fn from_config_bits(bits: u8) -> Self {
        match bits & 0x18 {
            0x08 => AccelRange::G4,
            0x10 => AccelRange::G8,
            0x18 => AccelRange::G16,
            _ => AccelRange::G2,
        }
    }
}

/// Decode an accelerometer burst into g
///
/// # Arguments
///
/// * `raw` - Six bytes starting at `ACCEL_XOUT_H`
/// * `range` - Full-scale range the sensor was configured with
pub fn decode_accel(raw: &[u8; ACCEL_BURST_LEN], range: AccelRange) -> (f32, f32, f32) {
    let scale = range.sensitivity();
    let x = i16::from_be_bytes([raw[0], raw[1]]);
    let y = i16::from_be_bytes([raw[2], raw[3]]);
    let z = i16::from_be_bytes([raw[4], raw[5]]);

    (x as f32 / scale, y as f32 / scale, z as f32 / scale)
}

/// Encode g values into the register layout, saturating at full scale
///
/// Inverse of [`decode_accel`] up to one LSB. Used to feed simulated
/// readings through the same decode path as hardware.
pub fn encode_accel(ax: f32, ay: f32, az: f32, range: AccelRange) -> [u8; ACCEL_BURST_LEN] {
    let scale = range.sensitivity();
    let mut raw = [0u8; ACCEL_BURST_LEN];

    for (i, value) in [ax, ay, az].into_iter().enumerate() {
        let counts = to_counts(value * scale);
        raw[i * 2..i * 2 + 2].copy_from_slice(&counts.to_be_bytes());
    }

    raw
}

/// Round to nearest and saturate into i16 (NaN maps to 0)
fn to_counts(scaled: f32) -> i16 {
    let rounded = if scaled >= 0.0 {
        scaled + 0.5
    } else {
        scaled - 0.5
    };
    (rounded as i32).clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

/// Accelerometer configuration and decoding
#[derive(Debug, Clone, Copy, Default)]
pub struct Mpu6050 {
    range: AccelRange,
}

impl Mpu6050 {
    pub fn new(range: AccelRange) -> Self {
        Self { range }
    }

    pub fn range(&self) -> AccelRange {
        self.range
    }

    /// Register writes to wake the sensor and select the range
    pub fn init_sequence(&self) -> [(u8, u8); 2] {
        [
            (PWR_MGMT_1, 0x00), // clear SLEEP, internal oscillator
            (ACCEL_CONFIG, self.range.config_bits()),
        ]
    }

    /// Check the WHO_AM_I response
    pub fn verify_identity(&self, who_am_i: u8) -> bool {
        if who_am_i == WHO_AM_I_VALUE {
            return true;
        }

        #[cfg(feature = "logging")]
        warn!(
            "MPU-6050 WHO_AM_I mismatch: expected 0x{:02X}, got 0x{:02X}",
            WHO_AM_I_VALUE, who_am_i
        );
        false
    }

    /// Decode a burst read with the configured range
    pub fn read_accel(&self, raw: &[u8; ACCEL_BURST_LEN]) -> (f32, f32, f32) {
        decode_accel(raw, self.range)
    }
}
