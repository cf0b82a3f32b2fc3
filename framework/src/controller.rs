//! Suspension controller
//!
//! One control tick runs estimate → mix → integrate → emit:
//!
//! ```text
//! AccelSample ─▶ TiltEstimator ─▶ CornerMixer ─▶ ActuatorModel ×4 ─▶ ActuatorSink
//!                                     ▲                ▲
//!                         balance ────┘    axle gains ─┘
//! ```
//!
//! The controller owns its parameter set. A tick copies it once up front, so
//! everything inside one tick sees a single consistent snapshot. Updates are
//! applied between ticks through [`SuspensionController::apply_parameter_update`].

use log::{info, trace};

use crate::actuator::ActuatorModel;
use crate::mixer::{Axle, Corner, CornerMixer, CornerTargets, PerCorner};
use crate::params::{ParamUpdate, SuspensionParams};
use crate::telemetry::TelemetrySnapshot;
use crate::tilt::{AccelSample, AccelTilt, TiltEstimator, TiltSample};

/// Shortest integration step (s). Zero or negative ticks are raised to this.
pub const MIN_DT: f32 = 0.001;
/// Longest integration step (s). Stalled ticks are cut down to this.
pub const MAX_DT: f32 = 0.05;

/// Source of raw acceleration samples
///
/// May return stale or zero data; the controller tolerates both.
pub trait ImuSource {
    fn read(&mut self) -> AccelSample;
}

/// Destination for per-corner actuator commands
pub trait ActuatorSink {
    /// Fire-and-forget position command in `[0, total_range]`
    fn write(&mut self, corner: Corner, position: u16);
}

/// Bound a measured tick interval to `[MIN_DT, MAX_DT]`
pub fn clamp_dt(dt: f32) -> f32 {
    // NaN fails every comparison and lands on MIN_DT
    if !(dt > MIN_DT) {
        MIN_DT
    } else if dt > MAX_DT {
        MAX_DT
    } else {
        dt
    }
}

/// Round a model position to the sink's integer resolution
fn to_command(position: f32, total_range: f32) -> u16 {
    libm::roundf(position).clamp(0.0, total_range.max(0.0)) as u16
}

pub struct SuspensionController<E = AccelTilt> {
    params: SuspensionParams,
    estimator: E,
    actuators: PerCorner<ActuatorModel>,
    last_tilt: TiltSample,
    last_accel: AccelSample,
    last_targets: CornerTargets,
    ticks: u64,
}

impl SuspensionController<AccelTilt> {
    /// Controller with the unfiltered accelerometer estimator, all corners at rest
    pub fn new(params: SuspensionParams) -> Self {
        Self::with_estimator(params, AccelTilt)
    }
}

impl<E: TiltEstimator> SuspensionController<E> {
    pub fn with_estimator(params: SuspensionParams, estimator: E) -> Self {
        Self {
            params,
            estimator,
            actuators: PerCorner::splat(ActuatorModel::new(params.rest_offset)),
            last_tilt: TiltSample::LEVEL,
            last_accel: AccelSample::default(),
            last_targets: PerCorner::splat(params.rest_offset),
            ticks: 0,
        }
    }

    /// Run one control tick and emit four commands to `sink`.
    ///
    /// `dt` is clamped to `[MIN_DT, MAX_DT]`. Never fails: degenerate samples
    /// produce a level estimate and the actuators keep converging.
    pub fn tick<S: ActuatorSink + ?Sized>(
        &mut self,
        sample: AccelSample,
        dt: f32,
        sink: &mut S,
    ) -> PerCorner<u16> {
        let dt = clamp_dt(dt);
        let params = self.params;

        let tilt = self.estimator.estimate(sample);
        let targets = CornerMixer::from_params(&params).targets(
            &tilt,
            params.rest_offset,
            params.suspension_half_range(),
        );

        let limits = params.travel_limits();
        for (corner, actuator) in self.actuators.iter_mut() {
            let gains = params.gains(corner.axle());
            if actuator.advance(targets[corner], dt, gains, &limits) {
                trace!("{} at end-stop ({:.1})", corner.as_str(), actuator.position());
            }
            debug_assert!(limits.contains(actuator.position()));
        }

        let commands = self
            .actuators
            .map(|_, actuator| to_command(actuator.position(), params.total_range));
        for (corner, &command) in commands.iter() {
            sink.write(corner, command);
        }

        trace!(
            "tick {}: roll={:.1} pitch={:.1} cmd={:?}",
            self.ticks,
            tilt.roll,
            tilt.pitch,
            commands.as_array()
        );

        self.last_tilt = tilt;
        self.last_accel = sample;
        self.last_targets = targets;
        self.ticks += 1;

        commands
    }

    /// Read one sample from `imu` and tick with it
    pub fn tick_from<I, S>(&mut self, imu: &mut I, dt: f32, sink: &mut S) -> PerCorner<u16>
    where
        I: ImuSource + ?Sized,
        S: ActuatorSink + ?Sized,
    {
        let sample = imu.read();
        self.tick(sample, dt, sink)
    }

    /// Overwrite the supplied fields. Actuator state is left untouched, so
    /// corners keep converging from where they are under the new dynamics.
    ///
    /// `update` must already be validated. Returns true when the travel
    /// limits moved.
    pub fn apply_parameter_update(&mut self, update: &ParamUpdate) -> bool {
        if update.is_empty() {
            return false;
        }

        let travel_changed = self.params.apply(update);
        if travel_changed {
            let limits = self.params.travel_limits();
            info!(
                "Suspension travel now {:.1}..{:.1} (rest {:.1}, share {:.2})",
                limits.lower(),
                limits.upper(),
                self.params.rest_offset,
                self.params.travel_share
            );
        } else {
            info!("Parameters updated: {:?}", self.params);
        }

        for axle in [Axle::Front, Axle::Rear] {
            if !self.params.gains(axle).is_overdamped() {
                info!("{} axle is underdamped, corners will overshoot", axle.as_str());
            }
        }

        travel_changed
    }

    /// Latest tilt, raw sample and positions
    pub fn snapshot_telemetry(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            tilt: self.last_tilt,
            accel: self.last_accel,
            positions: self.positions(),
            tick: self.ticks,
        }
    }

    pub fn params(&self) -> &SuspensionParams {
        &self.params
    }

    pub fn positions(&self) -> PerCorner<f32> {
        self.actuators.map(|_, actuator| actuator.position())
    }

    pub fn actuator(&self, corner: Corner) -> &ActuatorModel {
        &self.actuators[corner]
    }

    /// Targets computed by the last tick
    pub fn last_targets(&self) -> &CornerTargets {
        &self.last_targets
    }

    pub fn tick_count(&self) -> u64 {
        self.ticks
    }
}
