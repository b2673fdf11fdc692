use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use oee_predictors::MaintenanceConfig;
use oee_signals::anomaly::AnomalyConfig;
use oee_signals::energy::EnergyConfig;
use oee_views::downtime::DowntimeReportConfig;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ShiftConfig {
    pub shift_hours: f64,
}

impl Default for ShiftConfig {
    fn default() -> Self {
        Self { shift_hours: 8.0 }
    }
}

/// Tunables for every engine operation. Missing JSON fields keep their defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub anomaly: AnomalyConfig,
    pub downtime: DowntimeReportConfig,
    pub energy: EnergyConfig,
    pub maintenance: MaintenanceConfig,
    pub shift: ShiftConfig,
}

impl EngineConfig {
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(raw).context("parsing engine config")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        self.maintenance.validate().context("validating engine config")
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading engine config {}", path.display()))?;
        Self::from_json_str(&raw)
    }
}
