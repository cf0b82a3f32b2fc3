//! Corner mixing
//!
//! Turns normalized roll/pitch into a per-corner displacement ("mix") in
//! [-1, 1] and then into absolute actuator targets around the rest offset.
//!
//! Sign convention: the rear axle inverts the pitch response relative to the
//! front, so a pitched rig leans nose-down/tail-up (or the reverse) instead
//! of shifting uniformly. Roll drives both axles the same way.

use core::ops::{Index, IndexMut};

use crate::params::SuspensionParams;
use crate::tilt::TiltSample;

/// Suspension attachment point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Corner {
    FrontLeft,
    FrontRight,
    RearLeft,
    RearRight,
}

/// Front or rear corner pair sharing spring/damper coefficients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axle {
    Front,
    Rear,
}

impl Axle {
    pub fn as_str(self) -> &'static str {
        match self {
            Axle::Front => "front",
            Axle::Rear => "rear",
        }
    }
}

impl Corner {
    /// All corners in actuator output order
    pub const ALL: [Corner; 4] = [
        Corner::FrontLeft,
        Corner::FrontRight,
        Corner::RearLeft,
        Corner::RearRight,
    ];

    pub fn index(self) -> usize {
        match self {
            Corner::FrontLeft => 0,
            Corner::FrontRight => 1,
            Corner::RearLeft => 2,
            Corner::RearRight => 3,
        }
    }

    pub fn axle(self) -> Axle {
        match self {
            Corner::FrontLeft | Corner::FrontRight => Axle::Front,
            Corner::RearLeft | Corner::RearRight => Axle::Rear,
        }
    }

    pub fn is_left(self) -> bool {
        matches!(self, Corner::FrontLeft | Corner::RearLeft)
    }

    /// Short label for logs and telemetry
    pub fn as_str(self) -> &'static str {
        match self {
            Corner::FrontLeft => "FL",
            Corner::FrontRight => "FR",
            Corner::RearLeft => "RL",
            Corner::RearRight => "RR",
        }
    }
}

/// One value per corner, indexed by [`Corner`]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PerCorner<T>([T; 4]);

impl<T> PerCorner<T> {
    pub fn from_fn(mut f: impl FnMut(Corner) -> T) -> Self {
        Self(Corner::ALL.map(&mut f))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Corner, &T)> + '_ {
        Corner::ALL.iter().copied().zip(self.0.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Corner, &mut T)> + '_ {
        Corner::ALL.iter().copied().zip(self.0.iter_mut())
    }

    pub fn map<U>(&self, mut f: impl FnMut(Corner, &T) -> U) -> PerCorner<U> {
        PerCorner::from_fn(|corner| f(corner, &self.0[corner.index()]))
    }

    pub fn as_array(&self) -> &[T; 4] {
        &self.0
    }
}

impl<T: Copy> PerCorner<T> {
    pub fn splat(value: T) -> Self {
        Self([value; 4])
    }

    pub fn get(&self, corner: Corner) -> T {
        self.0[corner.index()]
    }
}

impl<T> Index<Corner> for PerCorner<T> {
    type Output = T;

    fn index(&self, corner: Corner) -> &T {
        &self.0[corner.index()]
    }
}

impl<T> IndexMut<Corner> for PerCorner<T> {
    fn index_mut(&mut self, corner: Corner) -> &mut T {
        &mut self.0[corner.index()]
    }
}

#[cfg(feature = "std")]
impl<T: serde::Serialize> serde::Serialize for PerCorner<T> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(4))?;
        for (corner, value) in self.iter() {
            map.serialize_entry(corner.as_str(), value)?;
        }
        map.end()
    }
}

/// Normalized displacement per corner, each in [-1, 1]
pub type CornerMix = PerCorner<f32>;

/// Absolute target position per corner
pub type CornerTargets = PerCorner<f32>;

/// Combines tilt with per-axle pitch balance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CornerMixer {
    pub front_balance: f32,
    pub rear_balance: f32,
}

impl CornerMixer {
    pub fn new(front_balance: f32, rear_balance: f32) -> Self {
        Self {
            front_balance,
            rear_balance,
        }
    }

    pub fn from_params(params: &SuspensionParams) -> Self {
        Self::new(params.front_balance, params.rear_balance)
    }

    /// Per-corner mix in [-1, 1]
    pub fn mix(&self, tilt: &TiltSample) -> CornerMix {
        let roll = tilt.normalized_roll;

        PerCorner::from_fn(|corner| {
            // Nose-up lifts the front and drops the rear
            let pitch = match corner.axle() {
                Axle::Front => tilt.normalized_pitch * self.front_balance,
                Axle::Rear => -tilt.normalized_pitch * self.rear_balance,
            };
            let side = if corner.is_left() { -roll } else { roll };
            (pitch + side).clamp(-1.0, 1.0)
        })
    }

    /// Absolute targets: `rest_offset + mix * half_range`
    pub fn targets(&self, tilt: &TiltSample, rest_offset: f32, half_range: f32) -> CornerTargets {
        self.mix(tilt).map(|_, m| rest_offset + m * half_range)
    }
}
