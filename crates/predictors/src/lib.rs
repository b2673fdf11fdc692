//! Maintenance predictor trait and the failure-frequency heuristic.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use oee_core::interval::as_secs;
use oee_core::{CoreError, MachineId, Timestamp};

const SECS_PER_DAY: f64 = 86_400.0;
const DEFAULT_FALLBACK_DAYS: i64 = 30;
/// Upper bound accepted for `fallback_days` (ten years).
pub const MAX_FALLBACK_DAYS: i64 = 3_650;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MaintenanceConfig {
    /// Downtime category counted as wear-related failures.
    pub category: String,
    pub interval_factor: f64,
    pub fallback_days: i64,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            category: "mechanical".to_string(),
            interval_factor: 0.8,
            fallback_days: DEFAULT_FALLBACK_DAYS,
        }
    }
}

impl MaintenanceConfig {
    /// Rejects values that would push a forecast outside any sensible horizon.
    pub fn validate(&self) -> Result<(), CoreError> {
        if !(1..=MAX_FALLBACK_DAYS).contains(&self.fallback_days) {
            return Err(CoreError::InvalidParameter(format!(
                "maintenance.fallback_days must be in 1..={MAX_FALLBACK_DAYS}, got {}",
                self.fallback_days
            )));
        }
        if !(self.interval_factor.is_finite() && self.interval_factor > 0.0 && self.interval_factor <= 1.0) {
            return Err(CoreError::InvalidParameter(format!(
                "maintenance.interval_factor must be in (0, 1], got {}",
                self.interval_factor
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MaintenanceInput {
    pub machine_id: MachineId,
    pub last_maintenance: Timestamp,
    /// Failures in the configured category since the last maintenance.
    pub failure_count: u64,
    pub now: Timestamp,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ForecastBasis {
    FailureHistory { failures: u64, avg_interval_days: f64 },
    Fallback { days: i64 },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MaintenanceForecast {
    pub machine_id: MachineId,
    pub last_maintenance: Timestamp,
    pub predicted: Timestamp,
    pub urgency: Urgency,
    pub basis: ForecastBasis,
}

/// Estimates the next maintenance date for a machine.
pub trait MaintenancePredictor: Send + Sync {
    fn predict(&self, input: &MaintenanceInput) -> MaintenanceForecast;
}

/// `last + factor * (days since last / failures)`, or a fixed offset without failures.
/// A coarse rule of thumb, not a statistical forecast.
#[derive(Debug, Clone, Default)]
pub struct FailureFrequencyPredictor {
    cfg: MaintenanceConfig,
}

impl FailureFrequencyPredictor {
    pub fn new(cfg: MaintenanceConfig) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &MaintenanceConfig {
        &self.cfg
    }

    /// `last + fallback_days`, dropping to the default offset (and finally to `last`
    /// itself) when the configured one leaves chrono's range.
    fn fallback(&self, last: Timestamp) -> (Timestamp, ForecastBasis) {
        [self.cfg.fallback_days, DEFAULT_FALLBACK_DAYS]
            .into_iter()
            .find_map(|days| {
                Duration::try_days(days)
                    .and_then(|d| last.checked_add_signed(d))
                    .map(|predicted| (predicted, ForecastBasis::Fallback { days }))
            })
            .unwrap_or((last, ForecastBasis::Fallback { days: 0 }))
    }
}

fn offset_by_secs(last: Timestamp, secs: f64) -> Option<Timestamp> {
    if !secs.is_finite() {
        return None;
    }
    Duration::try_seconds(secs.round() as i64).and_then(|d| last.checked_add_signed(d))
}

impl MaintenancePredictor for FailureFrequencyPredictor {
    fn predict(&self, input: &MaintenanceInput) -> MaintenanceForecast {
        let elapsed_days = as_secs(input.now - input.last_maintenance) / SECS_PER_DAY;

        let history = if input.failure_count > 0 && elapsed_days > 0.0 {
            let avg_interval_days = elapsed_days / input.failure_count as f64;
            let offset_secs = avg_interval_days * self.cfg.interval_factor * SECS_PER_DAY;
            offset_by_secs(input.last_maintenance, offset_secs).map(|predicted| {
                (
                    predicted,
                    ForecastBasis::FailureHistory {
                        failures: input.failure_count,
                        avg_interval_days,
                    },
                )
            })
        } else {
            None
        };
        let (predicted, basis) =
            history.unwrap_or_else(|| self.fallback(input.last_maintenance));

        let urgency = if input.now.date_naive() > predicted.date_naive() {
            Urgency::High
        } else {
            Urgency::Medium
        };

        MaintenanceForecast {
            machine_id: input.machine_id,
            last_maintenance: input.last_maintenance,
            predicted,
            urgency,
            basis,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn day(d: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2024, 3, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn no_failures_falls_back_to_thirty_days() {
        let p = FailureFrequencyPredictor::default();
        let f = p.predict(&MaintenanceInput {
            machine_id: 3,
            last_maintenance: day(1),
            failure_count: 0,
            now: day(10),
        });
        assert_eq!(f.predicted, day(31));
        assert_eq!(f.urgency, Urgency::Medium);
        assert_eq!(f.basis, ForecastBasis::Fallback { days: 30 });
    }

    #[test]
    fn overdue_fallback_is_high_urgency() {
        let p = FailureFrequencyPredictor::default();
        let f = p.predict(&MaintenanceInput {
            machine_id: 3,
            last_maintenance: day(1) - Duration::days(45),
            failure_count: 0,
            now: day(1),
        });
        assert_eq!(f.urgency, Urgency::High);
    }

    #[test]
    fn failure_history_shortens_interval() {
        let p = FailureFrequencyPredictor::default();
        let f = p.predict(&MaintenanceInput {
            machine_id: 3,
            last_maintenance: day(1),
            failure_count: 4,
            now: day(21),
        });
        // 20 days / 4 failures = 5 days, times 0.8 = 4 days
        assert_eq!(f.predicted, day(5));
        assert_eq!(f.urgency, Urgency::High);
        match f.basis {
            ForecastBasis::FailureHistory { failures, avg_interval_days } => {
                assert_eq!(failures, 4);
                assert!((avg_interval_days - 5.0).abs() < 1e-9);
            }
            other => panic!("unexpected basis {other:?}"),
        }
    }

    #[test]
    fn maintenance_in_the_future_uses_fallback() {
        let p = FailureFrequencyPredictor::default();
        let f = p.predict(&MaintenanceInput {
            machine_id: 3,
            last_maintenance: day(20),
            failure_count: 2,
            now: day(10),
        });
        assert!(matches!(f.basis, ForecastBasis::Fallback { .. }));
    }

    #[test]
    fn out_of_range_offsets_degrade_instead_of_overflowing() {
        let p = FailureFrequencyPredictor::new(MaintenanceConfig {
            fallback_days: 1_000_000_000,
            interval_factor: 1e300,
            ..MaintenanceConfig::default()
        });
        let f = p.predict(&MaintenanceInput {
            machine_id: 3,
            last_maintenance: day(1),
            failure_count: 2,
            now: day(11),
        });
        assert_eq!(f.predicted, day(31));
        assert_eq!(f.basis, ForecastBasis::Fallback { days: 30 });

        let f = p.predict(&MaintenanceInput {
            machine_id: 3,
            last_maintenance: day(1),
            failure_count: 0,
            now: day(11),
        });
        assert_eq!(f.basis, ForecastBasis::Fallback { days: 30 });
    }

    #[test]
    fn validate_bounds_fallback_and_factor() {
        assert!(MaintenanceConfig::default().validate().is_ok());
        for cfg in [
            MaintenanceConfig { fallback_days: 0, ..MaintenanceConfig::default() },
            MaintenanceConfig { fallback_days: MAX_FALLBACK_DAYS + 1, ..MaintenanceConfig::default() },
            MaintenanceConfig { interval_factor: 0.0, ..MaintenanceConfig::default() },
            MaintenanceConfig { interval_factor: 1.5, ..MaintenanceConfig::default() },
            MaintenanceConfig { interval_factor: f64::NAN, ..MaintenanceConfig::default() },
        ] {
            assert!(matches!(cfg.validate(), Err(CoreError::InvalidParameter(_))), "{cfg:?}");
        }
    }
}
