//! Signal analysis over sampled machine readings.

use oee_core::machine::StatusSample;
use oee_core::Timestamp;

pub mod anomaly;
pub mod energy;
pub mod smoothing;

pub type Point = (Timestamp, f64);

/// Time-ordered current readings, skipping samples without one.
pub fn current_series(samples: &[StatusSample]) -> Vec<Point> {
    let mut points: Vec<Point> = samples
        .iter()
        .filter_map(|s| s.current_consumption.map(|c| (s.timestamp, c)))
        .collect();
    points.sort_by_key(|p| p.0);
    points
}

pub(crate) fn mean_and_std(values: &[f64]) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    Some((mean, var.sqrt()))
}
