//! Z-score outlier flags on a trailing window of readings.

use serde::{Deserialize, Serialize};

use oee_core::Timestamp;

use crate::{mean_and_std, Point};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnomalyConfig {
    pub min_samples: usize,
    /// Strictly above this z-score is flagged `medium`.
    pub medium_z: f64,
    /// Strictly above this z-score is flagged `high`.
    pub high_z: f64,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self { min_samples: 10, medium_z: 2.5, high_z: 3.0 }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Anomaly {
    pub timestamp: Timestamp,
    pub value: f64,
    pub z_score: f64,
    pub severity: Severity,
}

/// Flags readings far from the window mean. Too few readings or a flat signal yield nothing.
pub fn detect_outliers(points: &[Point], cfg: &AnomalyConfig) -> Vec<Anomaly> {
    if points.len() < cfg.min_samples {
        return Vec::new();
    }
    let values: Vec<f64> = points.iter().map(|p| p.1).collect();
    let Some((mean, std)) = mean_and_std(&values) else {
        return Vec::new();
    };
    if std == 0.0 {
        return Vec::new();
    }

    points
        .iter()
        .filter_map(|&(timestamp, value)| {
            let z_score = (value - mean).abs() / std;
            let severity = if z_score > cfg.high_z {
                Severity::High
            } else if z_score > cfg.medium_z {
                Severity::Medium
            } else {
                return None;
            };
            Some(Anomaly { timestamp, value, z_score, severity })
        })
        .collect()
}
