/// Configuration management for the suspension rig
/// Compiled-in defaults, overridable at build time (`option_env!`) and at
/// run time (process environment)
use std::path::PathBuf;
use std::time::Duration;

use log::warn;
use mpu6050::AccelRange;

/// HTTP configuration server
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Listen address for the configuration/telemetry server
    pub http_addr: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            http_addr: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Control loop timing
#[derive(Debug, Clone, Copy)]
pub struct ControlConfig {
    /// Target loop period
    pub period: Duration,
    /// Interval between loop-rate summaries in the log
    pub summary_interval: Duration,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_millis(5), // ~200 Hz
            summary_interval: Duration::from_secs(5),
        }
    }
}

/// Parameter persistence
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub params_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            params_path: PathBuf::from("suspension_params.json"),
        }
    }
}

/// Telemetry publication to the configuration server
#[derive(Debug, Clone, Copy)]
pub struct TelemetryConfig {
    pub interval: Duration,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(20), // 50 Hz
        }
    }
}

/// Simulated IMU motion
#[derive(Debug, Clone, Copy)]
pub struct ImuConfig {
    pub range: AccelRange,
    pub roll_amplitude_deg: f32,
    pub roll_period_s: f32,
    pub pitch_amplitude_deg: f32,
    pub pitch_period_s: f32,
    /// Peak sensor noise (g)
    pub noise_g: f32,
}

impl Default for ImuConfig {
    fn default() -> Self {
        Self {
            range: AccelRange::G2,
            roll_amplitude_deg: 20.0,
            roll_period_s: 6.0,
            pitch_amplitude_deg: 12.0,
            pitch_period_s: 9.0,
            noise_g: 0.01,
        }
    }
}

/// Master system configuration
#[derive(Debug, Clone, Default)]
pub struct SystemConfig {
    pub network: NetworkConfig,
    pub control: ControlConfig,
    pub storage: StorageConfig,
    pub telemetry: TelemetryConfig,
    pub imu: ImuConfig,
}

impl SystemConfig {
    /// Create configuration from environment variables
    ///
    /// Compile-time values (`option_env!`) are applied first, then the
    /// process environment:
    /// ```bash
    /// export RIG_HTTP_ADDR="127.0.0.1:8080"
    /// export RIG_PARAMS_PATH="/var/lib/rig/params.json"
    /// export RIG_PERIOD_MS=5
    /// ```
    pub fn from_env() -> Self {
        Self::from_lookup(|name| {
            let compiled = match name {
                "RIG_HTTP_ADDR" => option_env!("RIG_HTTP_ADDR"),
                "RIG_PARAMS_PATH" => option_env!("RIG_PARAMS_PATH"),
                "RIG_PERIOD_MS" => option_env!("RIG_PERIOD_MS"),
                _ => None,
            };
            std::env::var(name)
                .ok()
                .or_else(|| compiled.map(str::to_string))
        })
    }

    /// Build configuration from an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = lookup("RIG_HTTP_ADDR") {
            config.network.http_addr = addr;
        }
        if let Some(path) = lookup("RIG_PARAMS_PATH") {
            config.storage.params_path = PathBuf::from(path);
        }
        if let Some(period) = lookup("RIG_PERIOD_MS") {
            match period.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => config.control.period = Duration::from_millis(ms),
                _ => warn!("Ignoring invalid RIG_PERIOD_MS {:?}", period),
            }
        }

        config
    }
}
