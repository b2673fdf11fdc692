//! Electrical power and energy estimates from current readings.
//!
//! `point_sum_kw` is the plain sum of sampled power, which only equals energy
//! when every sample stands for one hour. `integrated_kwh` weights power by the
//! time between readings (trapezoid rule) and is the figure to use for billing.

use serde::{Deserialize, Serialize};

use oee_core::interval::as_secs;

use crate::Point;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EnergyConfig {
    pub nominal_voltage: f64,
}

impl Default for EnergyConfig {
    fn default() -> Self {
        Self { nominal_voltage: 380.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnergySummary {
    pub point_sum_kw: f64,
    pub integrated_kwh: f64,
    pub average_power_kw: f64,
    pub max_power_kw: f64,
    pub data_points: usize,
}

/// `None` when there are no readings.
pub fn energy_estimate(points: &[Point], cfg: &EnergyConfig) -> Option<EnergySummary> {
    if points.is_empty() {
        return None;
    }
    let watts: Vec<f64> = points.iter().map(|p| p.1 * cfg.nominal_voltage).collect();
    let sum: f64 = watts.iter().sum();
    let max = watts.iter().copied().fold(f64::MIN, f64::max);

    let integrated_wh: f64 = points
        .windows(2)
        .zip(watts.windows(2))
        .map(|(pts, w)| {
            let hours = as_secs(pts[1].0 - pts[0].0).max(0.0) / 3600.0;
            (w[0] + w[1]) / 2.0 * hours
        })
        .sum();

    Some(EnergySummary {
        point_sum_kw: sum / 1000.0,
        integrated_kwh: integrated_wh / 1000.0,
        average_power_kw: sum / watts.len() as f64 / 1000.0,
        max_power_kw: max / 1000.0,
        data_points: points.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn t(h: u32) -> oee_core::Timestamp {
        Utc.with_ymd_and_hms(2024, 3, 1, h, 0, 0).unwrap()
    }

    #[test]
    fn steady_load_over_two_hours() {
        let points = vec![(t(6), 10.0), (t(7), 10.0), (t(8), 10.0)];
        let e = energy_estimate(&points, &EnergyConfig::default()).unwrap();
        assert!((e.point_sum_kw - 11.4).abs() < 1e-9);
        assert!((e.integrated_kwh - 7.6).abs() < 1e-9);
        assert!((e.average_power_kw - 3.8).abs() < 1e-9);
        assert!((e.max_power_kw - 3.8).abs() < 1e-9);
        assert_eq!(e.data_points, 3);
    }

    #[test]
    fn ramp_uses_trapezoid() {
        let points = vec![(t(6), 0.0), (t(7), 20.0)];
        let cfg = EnergyConfig { nominal_voltage: 100.0 };
        let e = energy_estimate(&points, &cfg).unwrap();
        assert!((e.integrated_kwh - 1.0).abs() < 1e-9);
        assert!((e.max_power_kw - 2.0).abs() < 1e-9);
    }

    #[test]
    fn single_reading_has_no_integrated_energy() {
        let e = energy_estimate(&[(t(6), 5.0)], &EnergyConfig::default()).unwrap();
        assert_eq!(e.integrated_kwh, 0.0);
        assert!(energy_estimate(&[], &EnergyConfig::default()).is_none());
    }
}
