//! Remote configuration channel
//!
//! The only path by which the outside world changes the controller. The
//! configuration side validates an update, folds it into a mirror of the
//! current parameters (for display) and queues it. The control side drains
//! the queue between ticks and applies it to its own copy, so the parameter
//! set is never mutated while a tick is running.
//!
//! Telemetry flows the other way: the control loop publishes a snapshot with
//! `try_lock()` and simply skips a publication when a reader holds the lock.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, info};
use thiserror::Error;

use crate::params::{InvalidValue, ParamKey, ParamUpdate, SuspensionParams};
use crate::store::{ParameterStore, StoreError};
use crate::telemetry::TelemetrySnapshot;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum UpdateError {
    #[error("malformed value for {key}: {value:?}")]
    Malformed { key: String, value: String },
    #[error("{0} cannot be changed remotely")]
    ReadOnly(&'static str),
    #[error(transparent)]
    Invalid(#[from] InvalidValue),
}

/// A poisoned lock still holds valid plain data; keep using it
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// State shared between the control loop and the configuration server
pub struct ConfigState {
    /// Parameters as they will be once pending updates are applied
    params: Mutex<SuspensionParams>,
    pending: Mutex<ParamUpdate>,
    params_changed: AtomicBool,
    update_counter: AtomicU32,
    telemetry: Mutex<TelemetrySnapshot>,
}

impl ConfigState {
    pub fn new(params: SuspensionParams) -> Self {
        Self {
            params: Mutex::new(params),
            pending: Mutex::new(ParamUpdate::default()),
            params_changed: AtomicBool::new(false),
            update_counter: AtomicU32::new(0),
            telemetry: Mutex::new(TelemetrySnapshot::default()),
        }
    }

    /// Current parameters, including updates the control loop has not picked up yet
    pub fn get_params(&self) -> SuspensionParams {
        *lock(&self.params)
    }

    /// Fold a validated update into the mirror and the pending queue
    fn queue_update(&self, update: &ParamUpdate) -> SuspensionParams {
        let mut params = lock(&self.params);
        params.apply(update);
        lock(&self.pending).merge(update);
        self.params_changed.store(true, Ordering::SeqCst);
        self.update_counter.fetch_add(1, Ordering::SeqCst);
        *params
    }

    /// Take everything queued since the last call, if anything
    pub fn take_pending_update(&self) -> Option<ParamUpdate> {
        if !self.params_changed.swap(false, Ordering::SeqCst) {
            return None;
        }
        let update = std::mem::take(&mut *lock(&self.pending));
        (!update.is_empty()).then_some(update)
    }

    /// Number of accepted updates since startup
    pub fn update_count(&self) -> u32 {
        self.update_counter.load(Ordering::SeqCst)
    }

    /// Publish a snapshot without blocking.
    ///
    /// Returns false when a reader holds the lock and the snapshot was dropped.
    pub fn publish_telemetry(&self, snapshot: TelemetrySnapshot) -> bool {
        if let Ok(mut guard) = self.telemetry.try_lock() {
            *guard = snapshot;
            true
        } else {
            false
        }
    }

    pub fn telemetry(&self) -> TelemetrySnapshot {
        self.telemetry.lock().map(|g| *g).unwrap_or_default()
    }
}

impl Default for ConfigState {
    fn default() -> Self {
        Self::new(SuspensionParams::default())
    }
}

/// Read/update/save surface exposed to remote clients
pub struct ConfigChannel<S> {
    state: Arc<ConfigState>,
    store: Mutex<S>,
}

impl<S: ParameterStore> ConfigChannel<S> {
    pub fn new(state: Arc<ConfigState>, store: S) -> Self {
        Self {
            state,
            store: Mutex::new(store),
        }
    }

    pub fn state(&self) -> &Arc<ConfigState> {
        &self.state
    }

    pub fn current(&self) -> SuspensionParams {
        self.state.get_params()
    }

    /// Parse `key=value&key=value` pairs from a query string or form body.
    ///
    /// Unknown keys are skipped, as are blank values.
    pub fn parse_update(form: &str) -> Result<ParamUpdate, UpdateError> {
        let mut update = ParamUpdate::default();

        for pair in form.split('&').filter(|p| !p.is_empty()) {
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            let value = value.trim();

            let Some(key) = ParamKey::from_name(name) else {
                debug!("Ignoring unknown parameter {:?}", name);
                continue;
            };
            if value.is_empty() {
                continue;
            }

            let parsed: f32 = value.parse().map_err(|_| UpdateError::Malformed {
                key: name.to_string(),
                value: value.to_string(),
            })?;
            update.set(key, parsed);
        }

        Ok(update)
    }

    /// Validate and queue an update. Returns the resulting parameters.
    pub fn submit(&self, update: ParamUpdate) -> Result<SuspensionParams, UpdateError> {
        if update.total_range.is_some() {
            return Err(UpdateError::ReadOnly("totalRange"));
        }

        let current = self.current();
        let update = update.validated(current.total_range)?;
        if update.is_empty() {
            return Ok(current);
        }

        let params = self.state.queue_update(&update);
        info!(
            "Parameter update queued: offset={:.1} share={:.2} k={:.2}/{:.2} c={:.2}/{:.2} bal={:.2}/{:.2}",
            params.rest_offset,
            params.travel_share,
            params.front_stiffness,
            params.rear_stiffness,
            params.front_damping,
            params.rear_damping,
            params.front_balance,
            params.rear_balance
        );
        Ok(params)
    }

    pub fn submit_form(&self, form: &str) -> Result<SuspensionParams, UpdateError> {
        self.submit(Self::parse_update(form)?)
    }

    /// Persist the current parameters
    pub fn save(&self) -> Result<(), StoreError> {
        let params = self.current();
        lock(&self.store).save(&params)
    }

    pub fn telemetry(&self) -> TelemetrySnapshot {
        self.state.telemetry()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{ActuatorSink, SuspensionController};
    use crate::mixer::Corner;
    use crate::store::MemoryStore;
    use crate::tilt::AccelSample;

    struct FailingStore;

    impl ParameterStore for FailingStore {
        fn load(&self) -> Result<SuspensionParams, StoreError> {
            Err(StoreError::Io(std::io::Error::other("flash unavailable")))
        }

        fn save(&mut self, _params: &SuspensionParams) -> Result<(), StoreError> {
            Err(StoreError::Io(std::io::Error::other("flash unavailable")))
        }
    }

    struct NullSink;

    impl ActuatorSink for NullSink {
        fn write(&mut self, _corner: Corner, _position: u16) {}
    }

    fn channel() -> ConfigChannel<MemoryStore> {
        ConfigChannel::new(Arc::new(ConfigState::default()), MemoryStore::new())
    }

    #[test]
    fn test_parse_form() {
        let update = ConfigChannel::<MemoryStore>::parse_update(
            "offset=95&share=0.3&kFront=6&cRear=1.1&frontBalance=1.2",
        )
        .unwrap();

        assert_eq!(update.rest_offset, Some(95.0));
        assert_eq!(update.travel_share, Some(0.3));
        assert_eq!(update.front_stiffness, Some(6.0));
        assert_eq!(update.rear_damping, Some(1.1));
        assert_eq!(update.front_balance, Some(1.2));
        assert_eq!(update.rear_stiffness, None);
    }

    #[test]
    fn test_parse_skips_unknown_and_blank() {
        let update =
            ConfigChannel::<MemoryStore>::parse_update("alpha=0.2&share=&kRear=2.5&&debug").unwrap();
        assert_eq!(update.rear_stiffness, Some(2.5));
        assert_eq!(update.travel_share, None);
        assert_eq!(
            update,
            ParamUpdate {
                rear_stiffness: Some(2.5),
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = ConfigChannel::<MemoryStore>::parse_update("share=wide").unwrap_err();
        assert_eq!(
            err,
            UpdateError::Malformed {
                key: "share".into(),
                value: "wide".into()
            }
        );
    }

    #[test]
    fn test_submit_clamps_and_queues() {
        let channel = channel();
        let params = channel.submit_form("share=0&kFront=-1&offset=95").unwrap();

        assert_eq!(params.travel_share, 0.01);
        assert_eq!(params.front_stiffness, 0.0);
        assert_eq!(channel.current(), params, "mirror reflects the update");

        let pending = channel.state().take_pending_update().unwrap();
        assert_eq!(pending.travel_share, Some(0.01));
        assert_eq!(pending.rest_offset, Some(95.0));
        assert_eq!(channel.state().take_pending_update(), None, "drained once");
        assert_eq!(channel.state().update_count(), 1);
    }

    #[test]
    fn test_updates_merge_until_drained() {
        let channel = channel();
        channel.submit_form("share=0.3&kRear=2").unwrap();
        channel.submit_form("share=0.4").unwrap();

        let pending = channel.state().take_pending_update().unwrap();
        assert_eq!(pending.travel_share, Some(0.4));
        assert_eq!(pending.rear_stiffness, Some(2.0));
    }

    #[test]
    fn test_invalid_update_changes_nothing() {
        let channel = channel();
        let err = channel.submit_form("share=0.5&cFront=NaN").unwrap_err();
        assert!(matches!(err, UpdateError::Invalid(InvalidValue { key: "cFront", .. })));
        assert_eq!(channel.current(), SuspensionParams::default());
        assert_eq!(channel.state().take_pending_update(), None);

        let err = channel
            .submit(ParamUpdate {
                total_range: Some(270.0),
                ..Default::default()
            })
            .unwrap_err();
        assert_eq!(err, UpdateError::ReadOnly("totalRange"));
    }

    #[test]
    fn test_empty_update_is_noop() {
        let channel = channel();
        assert_eq!(channel.submit_form("").unwrap(), SuspensionParams::default());
        assert_eq!(channel.state().take_pending_update(), None);
        assert_eq!(channel.state().update_count(), 0);
    }

    #[test]
    fn test_save_persists_mirror() {
        let channel = channel();
        channel.submit_form("offset=100").unwrap();
        channel.save().unwrap();

        let store = lock(&channel.store);
        assert_eq!(store.load().unwrap().rest_offset, 100.0);
        assert_eq!(store.save_count(), 1);
    }

    #[test]
    fn test_save_failure_reported() {
        let channel = ConfigChannel::new(Arc::new(ConfigState::default()), FailingStore);
        assert!(matches!(channel.save(), Err(StoreError::Io(_))));
        assert_eq!(
            channel.store.lock().unwrap().load_or_default(),
            SuspensionParams::default()
        );
    }

    #[test]
    fn test_telemetry_publish_skips_when_busy() {
        let state = ConfigState::default();
        let snapshot = TelemetrySnapshot {
            tick: 7,
            ..Default::default()
        };
        assert!(state.publish_telemetry(snapshot));
        assert_eq!(state.telemetry().tick, 7);

        let guard = state.telemetry.lock().unwrap();
        assert!(!state.publish_telemetry(TelemetrySnapshot::default()));
        drop(guard);
        assert_eq!(state.telemetry().tick, 7);
    }

    #[test]
    fn test_drained_update_reaches_next_tick() {
        let channel = channel();
        let mut controller = SuspensionController::new(channel.current());
        let roll = AccelSample::new(0.0, 0.7071, 0.7071);

        controller.tick(roll, 0.01, &mut NullSink);
        assert_eq!(controller.last_targets()[Corner::FrontRight], 112.5);

        channel.submit_form("share=0.5").unwrap();
        // Not applied until the control side drains it
        assert_eq!(controller.params().travel_share, 0.25);

        if let Some(update) = channel.state().take_pending_update() {
            controller.apply_parameter_update(&update);
        }
        controller.tick(roll, 0.01, &mut NullSink);
        assert_eq!(controller.last_targets()[Corner::FrontRight], 135.0);
        assert_eq!(controller.params(), &channel.current());
    }
}
