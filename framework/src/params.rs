//! Tunable suspension parameters
//!
//! The parameter set is a plain `Copy` value. The controller reads it once
//! per tick by value, so a tick always works against one consistent
//! snapshot. Derived travel values are computed from the current fields on
//! every call and can never go stale.

use core::fmt;

use crate::actuator::{SpringGains, TravelLimits};
use crate::mixer::Axle;

/// Full servo sweep (degrees)
pub const DEFAULT_TOTAL_RANGE: f32 = 180.0;
/// Smallest accepted travel share
pub const MIN_TRAVEL_SHARE: f32 = 0.01;
/// Largest accepted per-axle pitch balance
pub const MAX_BALANCE: f32 = 1.5;

/// Tunable parameter set
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SuspensionParams {
    /// Neutral actuator position (degrees), in [0, total_range]
    pub rest_offset: f32,
    /// Fraction of the total range used for suspension travel, in (0, 1]
    pub travel_share: f32,
    /// Full actuator range (degrees)
    pub total_range: f32,
    pub front_stiffness: f32,
    pub front_damping: f32,
    pub rear_stiffness: f32,
    pub rear_damping: f32,
    /// Pitch response scale for the front axle
    pub front_balance: f32,
    /// Pitch response scale for the rear axle
    pub rear_balance: f32,
}

impl Default for SuspensionParams {
    fn default() -> Self {
        Self {
            rest_offset: 90.0, // center of the servo sweep
            travel_share: 0.25,
            total_range: DEFAULT_TOTAL_RANGE,
            front_stiffness: 5.0,
            front_damping: 1.5,
            rear_stiffness: 3.0,
            rear_damping: 1.2,
            front_balance: 1.0, // front follows pitch fully
            rear_balance: 0.8,  // rear slightly softer
        }
    }
}

impl SuspensionParams {
    /// Total suspension travel (`total_range * travel_share`)
    pub fn suspension_range(&self) -> f32 {
        self.total_range * self.travel_share
    }

    /// Travel either side of the rest offset
    pub fn suspension_half_range(&self) -> f32 {
        self.suspension_range() / 2.0
    }

    pub fn travel_limits(&self) -> TravelLimits {
        TravelLimits::new(
            self.rest_offset,
            self.suspension_half_range(),
            self.total_range,
        )
    }

    pub fn gains(&self, axle: Axle) -> SpringGains {
        match axle {
            Axle::Front => SpringGains::new(self.front_stiffness, self.front_damping),
            Axle::Rear => SpringGains::new(self.rear_stiffness, self.rear_damping),
        }
    }

    pub fn get(&self, key: ParamKey) -> f32 {
        match key {
            ParamKey::RestOffset => self.rest_offset,
            ParamKey::TravelShare => self.travel_share,
            ParamKey::FrontStiffness => self.front_stiffness,
            ParamKey::FrontDamping => self.front_damping,
            ParamKey::RearStiffness => self.rear_stiffness,
            ParamKey::RearDamping => self.rear_damping,
            ParamKey::FrontBalance => self.front_balance,
            ParamKey::RearBalance => self.rear_balance,
        }
    }

    /// Overwrite the fields present in `update`.
    ///
    /// `update` is assumed to be validated (see [`ParamUpdate::validated`]).
    /// Returns true when the suspension travel changed.
    pub fn apply(&mut self, update: &ParamUpdate) -> bool {
        let before = (self.rest_offset, self.suspension_range());

        if let Some(v) = update.total_range {
            self.total_range = v;
        }
        for key in ParamKey::ALL {
            if let Some(v) = update.get(key) {
                match key {
                    ParamKey::RestOffset => self.rest_offset = v,
                    ParamKey::TravelShare => self.travel_share = v,
                    ParamKey::FrontStiffness => self.front_stiffness = v,
                    ParamKey::FrontDamping => self.front_damping = v,
                    ParamKey::RearStiffness => self.rear_stiffness = v,
                    ParamKey::RearDamping => self.rear_damping = v,
                    ParamKey::FrontBalance => self.front_balance = v,
                    ParamKey::RearBalance => self.rear_balance = v,
                }
            }
        }

        before != (self.rest_offset, self.suspension_range())
    }
}

/// Externally tunable fields, keyed by their configuration-form names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKey {
    RestOffset,
    TravelShare,
    FrontStiffness,
    FrontDamping,
    RearStiffness,
    RearDamping,
    FrontBalance,
    RearBalance,
}

impl ParamKey {
    pub const ALL: [ParamKey; 8] = [
        ParamKey::RestOffset,
        ParamKey::TravelShare,
        ParamKey::FrontStiffness,
        ParamKey::FrontDamping,
        ParamKey::RearStiffness,
        ParamKey::RearDamping,
        ParamKey::FrontBalance,
        ParamKey::RearBalance,
    ];

    /// Name used by the configuration form and the parameter store
    pub fn as_str(self) -> &'static str {
        match self {
            ParamKey::RestOffset => "offset",
            ParamKey::TravelShare => "share",
            ParamKey::FrontStiffness => "kFront",
            ParamKey::FrontDamping => "cFront",
            ParamKey::RearStiffness => "kRear",
            ParamKey::RearDamping => "cRear",
            ParamKey::FrontBalance => "frontBalance",
            ParamKey::RearBalance => "rearBalance",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        ParamKey::ALL.into_iter().find(|k| k.as_str() == name)
    }
}

/// Partial parameter update: only `Some` fields are written
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ParamUpdate {
    pub rest_offset: Option<f32>,
    pub travel_share: Option<f32>,
    /// Not exposed remotely: the actuator range is a hardware constant
    pub total_range: Option<f32>,
    pub front_stiffness: Option<f32>,
    pub front_damping: Option<f32>,
    pub rear_stiffness: Option<f32>,
    pub rear_damping: Option<f32>,
    pub front_balance: Option<f32>,
    pub rear_balance: Option<f32>,
}

impl ParamUpdate {
    pub fn is_empty(&self) -> bool {
        self.total_range.is_none() && ParamKey::ALL.iter().all(|&k| self.get(k).is_none())
    }

    pub fn get(&self, key: ParamKey) -> Option<f32> {
        match key {
            ParamKey::RestOffset => self.rest_offset,
            ParamKey::TravelShare => self.travel_share,
            ParamKey::FrontStiffness => self.front_stiffness,
            ParamKey::FrontDamping => self.front_damping,
            ParamKey::RearStiffness => self.rear_stiffness,
            ParamKey::RearDamping => self.rear_damping,
            ParamKey::FrontBalance => self.front_balance,
            ParamKey::RearBalance => self.rear_balance,
        }
    }

    pub fn set(&mut self, key: ParamKey, value: f32) {
        let slot = match key {
            ParamKey::RestOffset => &mut self.rest_offset,
            ParamKey::TravelShare => &mut self.travel_share,
            ParamKey::FrontStiffness => &mut self.front_stiffness,
            ParamKey::FrontDamping => &mut self.front_damping,
            ParamKey::RearStiffness => &mut self.rear_stiffness,
            ParamKey::RearDamping => &mut self.rear_damping,
            ParamKey::FrontBalance => &mut self.front_balance,
            ParamKey::RearBalance => &mut self.rear_balance,
        };
        *slot = Some(value);
    }

    /// Fold a later update into this one; later values win
    pub fn merge(&mut self, later: &ParamUpdate) {
        if later.total_range.is_some() {
            self.total_range = later.total_range;
        }
        for key in ParamKey::ALL {
            if let Some(v) = later.get(key) {
                self.set(key, v);
            }
        }
    }

    /// True when applying this update can move the travel limits
    pub fn touches_travel(&self) -> bool {
        self.rest_offset.is_some() || self.travel_share.is_some() || self.total_range.is_some()
    }

    /// Check and clamp every present field into its domain.
    ///
    /// Non-finite values and a non-positive total range are rejected.
    /// Everything else is clamped:
    /// - `share` to [MIN_TRAVEL_SHARE, 1]
    /// - `offset` to [0, total_range]
    /// - stiffness/damping to >= 0
    /// - balances to [0, MAX_BALANCE]
    ///
    /// `current_total_range` is used for the offset bound unless the update
    /// itself carries a new range.
    pub fn validated(mut self, current_total_range: f32) -> Result<Self, InvalidValue> {
        if let Some(range) = self.total_range {
            if !range.is_finite() || range <= 0.0 {
                return Err(InvalidValue {
                    key: "totalRange",
                    reason: "must be a positive number",
                });
            }
        }
        let total_range = self.total_range.unwrap_or(current_total_range);

        for key in ParamKey::ALL {
            let Some(v) = self.get(key) else {
                continue;
            };
            if !v.is_finite() {
                return Err(InvalidValue {
                    key: key.as_str(),
                    reason: "not a finite number",
                });
            }
            let clamped = match key {
                ParamKey::RestOffset => v.clamp(0.0, total_range),
                ParamKey::TravelShare => v.clamp(MIN_TRAVEL_SHARE, 1.0),
                ParamKey::FrontStiffness
                | ParamKey::FrontDamping
                | ParamKey::RearStiffness
                | ParamKey::RearDamping => v.max(0.0),
                ParamKey::FrontBalance | ParamKey::RearBalance => v.clamp(0.0, MAX_BALANCE),
            };
            self.set(key, clamped);
        }

        Ok(self)
    }
}

/// A parameter value rejected at the update boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidValue {
    pub key: &'static str,
    pub reason: &'static str,
}

impl fmt::Display for InvalidValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid value for {}: {}", self.key, self.reason)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for InvalidValue {}
