//! Parameter persistence
//!
//! Parameters are stored as one flat JSON object keyed by the configuration
//! form names (`offset`, `share`, `kFront`, ...). Loading is forgiving:
//! missing keys keep their defaults and unknown keys are skipped. The total
//! actuator range is a hardware constant and never persisted.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::params::{InvalidValue, ParamUpdate, SuspensionParams};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("parameter store I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("stored parameters are corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("stored parameters rejected: {0}")]
    Invalid(#[from] InvalidValue),
}

/// Load/save of the tunable parameter set
pub trait ParameterStore {
    /// Saved parameters, or defaults when nothing has been saved yet
    fn load(&self) -> Result<SuspensionParams, StoreError>;

    fn save(&mut self, params: &SuspensionParams) -> Result<(), StoreError>;

    /// Like [`load`](Self::load), but any failure falls back to defaults
    fn load_or_default(&self) -> SuspensionParams {
        match self.load() {
            Ok(params) => params,
            Err(e) => {
                warn!("Failed to load parameters ({}), using defaults", e);
                SuspensionParams::default()
            }
        }
    }
}

/// On-disk layout; every field optional so partial files still load
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct StoredParams {
    #[serde(rename = "offset", skip_serializing_if = "Option::is_none")]
    rest_offset: Option<f32>,
    #[serde(rename = "share", skip_serializing_if = "Option::is_none")]
    travel_share: Option<f32>,
    #[serde(rename = "kFront", skip_serializing_if = "Option::is_none")]
    front_stiffness: Option<f32>,
    #[serde(rename = "cFront", skip_serializing_if = "Option::is_none")]
    front_damping: Option<f32>,
    #[serde(rename = "kRear", skip_serializing_if = "Option::is_none")]
    rear_stiffness: Option<f32>,
    #[serde(rename = "cRear", skip_serializing_if = "Option::is_none")]
    rear_damping: Option<f32>,
    #[serde(rename = "frontBalance", skip_serializing_if = "Option::is_none")]
    front_balance: Option<f32>,
    #[serde(rename = "rearBalance", skip_serializing_if = "Option::is_none")]
    rear_balance: Option<f32>,
}

impl From<&SuspensionParams> for StoredParams {
    fn from(p: &SuspensionParams) -> Self {
        Self {
            rest_offset: Some(p.rest_offset),
            travel_share: Some(p.travel_share),
            front_stiffness: Some(p.front_stiffness),
            front_damping: Some(p.front_damping),
            rear_stiffness: Some(p.rear_stiffness),
            rear_damping: Some(p.rear_damping),
            front_balance: Some(p.front_balance),
            rear_balance: Some(p.rear_balance),
        }
    }
}

impl From<StoredParams> for ParamUpdate {
    fn from(s: StoredParams) -> Self {
        ParamUpdate {
            rest_offset: s.rest_offset,
            travel_share: s.travel_share,
            total_range: None,
            front_stiffness: s.front_stiffness,
            front_damping: s.front_damping,
            rear_stiffness: s.rear_stiffness,
            rear_damping: s.rear_damping,
            front_balance: s.front_balance,
            rear_balance: s.rear_balance,
        }
    }
}

/// Parse a stored JSON object, starting from defaults
pub fn decode_params(text: &str) -> Result<SuspensionParams, StoreError> {
    let stored: StoredParams = serde_json::from_str(text)?;
    let mut params = SuspensionParams::default();
    let update = ParamUpdate::from(stored).validated(params.total_range)?;
    params.apply(&update);
    Ok(params)
}

pub fn encode_params(params: &SuspensionParams) -> Result<String, StoreError> {
    Ok(serde_json::to_string_pretty(&StoredParams::from(params))?)
}

/// Volatile store; loses everything on restart
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    saved: Option<SuspensionParams>,
    saves: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful saves
    pub fn save_count(&self) -> usize {
        self.saves
    }
}

impl ParameterStore for MemoryStore {
    fn load(&self) -> Result<SuspensionParams, StoreError> {
        Ok(self.saved.unwrap_or_default())
    }

    fn save(&mut self, params: &SuspensionParams) -> Result<(), StoreError> {
        self.saved = Some(*params);
        self.saves += 1;
        Ok(())
    }
}

/// JSON file on disk, replaced atomically on save
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ParameterStore for JsonFileStore {
    fn load(&self) -> Result<SuspensionParams, StoreError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!(
                    "No saved parameters at {}, using defaults",
                    self.path.display()
                );
                return Ok(SuspensionParams::default());
            }
            Err(e) => return Err(e.into()),
        };

        let params = decode_params(&text)?;
        info!(
            "Loaded parameters from {}: offset={:.1} share={:.2} k={:.2}/{:.2} c={:.2}/{:.2}",
            self.path.display(),
            params.rest_offset,
            params.travel_share,
            params.front_stiffness,
            params.rear_stiffness,
            params.front_damping,
            params.rear_damping
        );
        Ok(params)
    }

    fn save(&mut self, params: &SuspensionParams) -> Result<(), StoreError> {
        let json = encode_params(params)?;

        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }

        // Write then rename so a crash never leaves a half-written file
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;

        info!("Saved parameters to {}", self.path.display());
        Ok(())
    }
}
