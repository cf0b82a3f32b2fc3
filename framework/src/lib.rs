//! Four-corner suspension control core
//!
//! Drives four suspension actuators from chassis tilt so the rig body
//! responds to roll and pitch. Each corner is a spring-damper pulled toward
//! a target derived from the measured attitude, bounded by travel end-stops.
//!
//! ## Features
//!
//! - **Tilt Estimation**: roll/pitch from a single accelerometer sample, behind a swappable trait
//! - **Corner Mixing**: roll + per-axle pitch balance into per-corner displacement
//! - **Actuator Dynamics**: semi-implicit spring-damper with inelastic end-stops
//! - **Live Re-tuning**: partial parameter updates applied between ticks without resetting actuators
//! - **Persistence**: flat JSON parameter store with per-field defaults (`std`)
//! - **No-std Compatible**: the control path needs only `libm` and `log`
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │  RemoteConfigChannel (validate, queue, save)   [std] │
//! ├──────────────────────────────────────────────────────┤
//! │  SuspensionController (tick, apply update, snapshot) │
//! ├──────────────────────────────────────────────────────┤
//! │  TiltEstimator → CornerMixer → ActuatorModel ×4      │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example Usage
//!
//! ```rust
//! use suspension_core::{
//!     AccelSample, ActuatorSink, Corner, SuspensionController, SuspensionParams,
//! };
//!
//! struct Servos([u16; 4]);
//!
//! impl ActuatorSink for Servos {
//!     fn write(&mut self, corner: Corner, position: u16) {
//!         self.0[corner.index()] = position;
//!     }
//! }
//!
//! let mut controller = SuspensionController::new(SuspensionParams::default());
//! let mut servos = Servos([0; 4]);
//!
//! // Level rig: every corner holds the rest offset
//! controller.tick(AccelSample::new(0.0, 0.0, 1.0), 0.005, &mut servos);
//! assert_eq!(servos.0, [90; 4]);
//! ```
//!
//! ## Modules
//!
//! - [`tilt`] - Accelerometer tilt estimation
//! - [`mixer`] - Corner identifiers and roll/pitch mixing
//! - [`actuator`] - Spring-damper actuator model and travel limits
//! - [`params`] - Tunable parameters and partial updates
//! - [`controller`] - Control tick orchestration
//! - [`telemetry`] - Read-only telemetry snapshot
//! - [`sim`] - Synthetic accelerometer input for bench runs
//! - `store` - Parameter persistence (`std`)
//! - `remote` - Remote configuration channel (`std`)

#![cfg_attr(not(any(test, feature = "std")), no_std)]

pub mod actuator;
pub mod controller;
pub mod mixer;
pub mod params;
pub mod sim;
pub mod telemetry;
pub mod tilt;

#[cfg(feature = "std")]
pub mod remote;
#[cfg(feature = "std")]
pub mod store;

// Re-export commonly used types
pub use actuator::{ActuatorModel, SpringGains, TravelLimits};
pub use controller::{clamp_dt, ActuatorSink, ImuSource, SuspensionController, MAX_DT, MIN_DT};
pub use mixer::{Axle, Corner, CornerMixer, CornerTargets, PerCorner};
pub use params::{InvalidValue, ParamKey, ParamUpdate, SuspensionParams};
pub use telemetry::TelemetrySnapshot;
pub use tilt::{AccelSample, AccelTilt, TiltEstimator, TiltSample};

#[cfg(feature = "std")]
pub use remote::{ConfigChannel, ConfigState, UpdateError};
#[cfg(feature = "std")]
pub use store::{JsonFileStore, MemoryStore, ParameterStore, StoreError};
