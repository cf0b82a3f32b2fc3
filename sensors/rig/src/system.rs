/// Control task for the rig
/// Owns the controller and its collaborators and runs them at a fixed period.
/// The configuration server never touches the controller directly: it queues
/// updates in the shared `ConfigState`, which are drained here between ticks.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use log::info;
use suspension_core::{
    ActuatorSink, ConfigState, Corner, ImuSource, PerCorner, SuspensionController,
};

use crate::config::SystemConfig;

pub struct ControlLoop<I, S> {
    controller: SuspensionController,
    imu: I,
    sink: S,
    state: Arc<ConfigState>,
    period: Duration,
    telemetry_interval: Duration,
    summary_interval: Duration,
    last_tick: Instant,
    last_publish: Option<Instant>,
    last_summary: Instant,
    loop_count: u32,
    skipped_publishes: u32,
}

impl<I: ImuSource, S: ActuatorSink> ControlLoop<I, S> {
    pub fn new(
        controller: SuspensionController,
        imu: I,
        sink: S,
        state: Arc<ConfigState>,
        config: &SystemConfig,
        start: Instant,
    ) -> Self {
        Self {
            controller,
            imu,
            sink,
            state,
            period: config.control.period,
            telemetry_interval: config.telemetry.interval,
            summary_interval: config.control.summary_interval,
            last_tick: start,
            last_publish: None,
            last_summary: start,
            loop_count: 0,
            skipped_publishes: 0,
        }
    }

    /// One iteration: apply queued updates, tick, publish telemetry
    pub fn step(&mut self, now: Instant) -> PerCorner<u16> {
        if let Some(update) = self.state.take_pending_update() {
            self.controller.apply_parameter_update(&update);
        }

        let dt = now.saturating_duration_since(self.last_tick).as_secs_f32();
        self.last_tick = now;

        let commands = self.controller.tick_from(&mut self.imu, dt, &mut self.sink);
        self.loop_count += 1;

        let publish_due = self
            .last_publish
            .map_or(true, |last| now.saturating_duration_since(last) >= self.telemetry_interval);
        if publish_due {
            if self.state.publish_telemetry(self.controller.snapshot_telemetry()) {
                self.last_publish = Some(now);
            } else {
                self.skipped_publishes += 1;
            }
        }

        let since_summary = now.saturating_duration_since(self.last_summary);
        if since_summary >= self.summary_interval {
            self.log_summary(since_summary);
            self.last_summary = now;
            self.loop_count = 0;
        }

        commands
    }

    /// Run until `running` is cleared
    pub fn run(&mut self, running: &AtomicBool) {
        info!(
            "Control loop running at {:.0} Hz",
            1.0 / self.period.as_secs_f32().max(f32::EPSILON)
        );

        while running.load(Ordering::Relaxed) {
            let started = Instant::now();
            self.step(started);
            thread::sleep(self.period.saturating_sub(started.elapsed()));
        }

        info!("Control loop stopped after {} ticks", self.controller.tick_count());
    }

    fn log_summary(&self, elapsed: Duration) {
        let rate = self.loop_count as f32 / elapsed.as_secs_f32().max(f32::EPSILON);
        let telemetry = self.controller.snapshot_telemetry();
        let p = telemetry.positions;
        info!(
            "Loop: {:.0}Hz | roll={:.1} pitch={:.1} | FL={:.1} FR={:.1} RL={:.1} RR={:.1} | skipped publishes: {}",
            rate,
            telemetry.tilt.roll,
            telemetry.tilt.pitch,
            p[Corner::FrontLeft],
            p[Corner::FrontRight],
            p[Corner::RearLeft],
            p[Corner::RearRight],
            self.skipped_publishes
        );
    }

    #[cfg(test)]
    pub fn controller(&self) -> &SuspensionController {
        &self.controller
    }

    #[cfg(test)]
    pub fn sink(&self) -> &S {
        &self.sink
    }
}
