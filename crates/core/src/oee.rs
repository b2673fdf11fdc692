//! Availability, performance and quality calculators and their OEE composition.
//!
//! Every calculator works on a snapshot already fetched for one window and
//! returns a value clamped to `[0, 1]`. Boundary effects such as duplicate
//! downtime records can push raw accounting slightly outside that range.

use serde::{Deserialize, Serialize};

use crate::interval::{self, as_secs};
use crate::machine::{DowntimeEvent, MachineStatus, ProductionRecord, StatusSample};
use crate::{DateSpan, MachineId, Timestamp, Window};

pub fn clamp_unit(x: f64) -> f64 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}

/// `1 - downtime / window`, using the downtime log as the sole source of lost time.
pub fn availability(events: &[DowntimeEvent], window: &Window) -> f64 {
    let planned = window.duration_secs();
    let downtime = interval::total_downtime_secs(events, window);
    clamp_unit(1.0 - downtime / planned)
}

/// Counter delta (`max - min`) over samples inside the window. Zero with fewer than one reading.
pub fn actual_cycles(samples: &[StatusSample], window: &Window) -> u64 {
    let mut counts = samples
        .iter()
        .filter(|s| window.contains(s.timestamp))
        .filter_map(|s| s.cycle_count);
    let Some(first) = counts.next() else {
        return 0;
    };
    let (lo, hi) = counts.fold((first, first), |(lo, hi), c| (lo.min(c), hi.max(c)));
    hi - lo
}

pub fn planned_cycles(ideal_cycle_time: f64, window: &Window) -> f64 {
    if ideal_cycle_time > 0.0 {
        window.duration_secs() / ideal_cycle_time
    } else {
        0.0
    }
}

pub fn performance(samples: &[StatusSample], ideal_cycle_time: f64, window: &Window) -> f64 {
    let planned = planned_cycles(ideal_cycle_time, window);
    if planned <= 0.0 {
        return 0.0;
    }
    clamp_unit(actual_cycles(samples, window) as f64 / planned)
}

/// Good share of all parts from records dated inside `span`. No production means no defects: 1.0.
pub fn quality(records: &[ProductionRecord], span: &DateSpan) -> f64 {
    let (good, defective) = records
        .iter()
        .filter(|r| span.contains(r.shift_date))
        .fold((0u64, 0u64), |(g, d), r| {
            (g.saturating_add(r.good_parts), d.saturating_add(r.defective_parts))
        });
    let total = good.saturating_add(defective);
    if total == 0 {
        1.0
    } else {
        clamp_unit(good as f64 / total as f64)
    }
}

/// Fraction of the window spent `running` according to status samples.
///
/// A sample's status holds until the next sample; the last one holds until
/// the window end. Time before the first sample counts as not running.
pub fn utilization(samples: &[StatusSample], window: &Window) -> f64 {
    let mut ordered: Vec<&StatusSample> = samples.iter().collect();
    ordered.sort_by_key(|s| s.timestamp);

    let mut running = 0.0;
    for (i, sample) in ordered.iter().enumerate() {
        if sample.status != MachineStatus::Running {
            continue;
        }
        let until = ordered
            .get(i + 1)
            .map(|next| next.timestamp)
            .unwrap_or_else(|| window.end());
        running += as_secs(interval::clip(sample.timestamp, until, window));
    }
    clamp_unit(running / window.duration_secs())
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OeeRating {
    WorldClass,
    Good,
    Average,
    Poor,
}

impl OeeRating {
    pub fn from_oee(oee: f64) -> Self {
        if oee >= 0.85 {
            OeeRating::WorldClass
        } else if oee >= 0.60 {
            OeeRating::Good
        } else if oee >= 0.40 {
            OeeRating::Average
        } else {
            OeeRating::Poor
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OeeBreakdown {
    pub machine_id: MachineId,
    pub window: Window,
    pub availability: f64,
    pub performance: f64,
    pub quality: f64,
    pub oee: f64,
    pub rating: OeeRating,
    pub computed_at: Timestamp,
}

impl OeeBreakdown {
    pub fn compose(
        machine_id: MachineId,
        window: Window,
        availability: f64,
        performance: f64,
        quality: f64,
        computed_at: Timestamp,
    ) -> Self {
        let availability = clamp_unit(availability);
        let performance = clamp_unit(performance);
        let quality = clamp_unit(quality);
        let oee = availability * performance * quality;
        Self {
            machine_id,
            window,
            availability,
            performance,
            quality,
            oee,
            rating: OeeRating::from_oee(oee),
            computed_at,
        }
    }

    /// Computes the full breakdown from one window's snapshot.
    pub fn from_snapshot(
        machine_id: MachineId,
        window: Window,
        ideal_cycle_time: f64,
        samples: &[StatusSample],
        downtime: &[DowntimeEvent],
        production: &[ProductionRecord],
        computed_at: Timestamp,
    ) -> Self {
        Self::compose(
            machine_id,
            window,
            availability(downtime, &window),
            performance(samples, ideal_cycle_time, &window),
            quality(production, &window.date_span()),
            computed_at,
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShiftEfficiency {
    pub machine_id: MachineId,
    pub shift_date: chrono::NaiveDate,
    pub shift_number: crate::machine::ShiftNumber,
    pub quality_rate: f64,
    pub performance_rate: f64,
    pub total_parts: u64,
    pub good_parts: u64,
    pub defective_parts: u64,
}

/// Efficiency of a single shift record against a nominal shift length.
pub fn shift_efficiency(
    record: &ProductionRecord,
    ideal_cycle_time: f64,
    shift_hours: f64,
) -> ShiftEfficiency {
    let total = record.total_parts();
    let quality_rate = if total == 0 {
        0.0
    } else {
        record.good_parts as f64 / total as f64
    };
    let planned = if ideal_cycle_time > 0.0 {
        shift_hours * 3600.0 / ideal_cycle_time
    } else {
        0.0
    };
    let performance_rate = if planned > 0.0 { total as f64 / planned } else { 0.0 };
    ShiftEfficiency {
        machine_id: record.machine_id,
        shift_date: record.shift_date,
        shift_number: record.shift_number,
        quality_rate,
        performance_rate,
        total_parts: total,
        good_parts: record.good_parts,
        defective_parts: record.defective_parts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, TimeZone, Utc};

    fn t(h: u32, m: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2024, 3, 1, h, m, 0).unwrap()
    }

    fn downtime(start: Timestamp, end: Option<Timestamp>) -> DowntimeEvent {
        DowntimeEvent {
            machine_id: 1,
            category: "mechanical".into(),
            reason: "jam".into(),
            start_time: start,
            end_time: end,
            resolved: end.is_some(),
        }
    }

    fn sample(ts: Timestamp, status: MachineStatus, cycles: u64) -> StatusSample {
        StatusSample {
            machine_id: 1,
            timestamp: ts,
            status,
            current_consumption: Some(12.0),
            temperature: Some(40.0),
            cycle_count: Some(cycles),
        }
    }

    fn record(good: u64, defective: u64) -> ProductionRecord {
        ProductionRecord {
            machine_id: 1,
            shift_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            shift_number: 1,
            good_parts: good,
            defective_parts: defective,
            target_count: 100,
        }
    }

    #[test]
    fn one_hour_down_in_eight_hour_shift() {
        let w = Window::new(t(6, 0), t(14, 0)).unwrap();
        let events = vec![downtime(t(8, 0), Some(t(9, 0)))];
        assert!((availability(&events, &w) - 0.875).abs() < 1e-12);
    }

    #[test]
    fn availability_bounds() {
        let w = Window::new(t(6, 0), t(14, 0)).unwrap();
        assert_eq!(availability(&[], &w), 1.0);
        let full = vec![downtime(t(5, 0), Some(t(15, 0)))];
        assert_eq!(availability(&full, &w), 0.0);
        // duplicated records over-count and must still clamp
        let dup = vec![downtime(t(6, 0), None), downtime(t(6, 0), None)];
        assert_eq!(availability(&dup, &w), 0.0);
    }

    #[test]
    fn performance_uses_counter_delta() {
        let w = Window::new(t(6, 0), t(7, 0)).unwrap();
        let samples = vec![
            sample(t(6, 0), MachineStatus::Running, 5_000),
            sample(t(6, 30), MachineStatus::Running, 5_900),
            sample(t(6, 59), MachineStatus::Running, 6_600),
        ];
        assert_eq!(actual_cycles(&samples, &w), 1_600);
        assert!((planned_cycles(2.0, &w) - 1_800.0).abs() < 1e-9);
        assert!((performance(&samples, 2.0, &w) - 1_600.0 / 1_800.0).abs() < 1e-12);
    }

    #[test]
    fn performance_without_samples_is_zero() {
        let w = Window::new(t(6, 0), t(7, 0)).unwrap();
        assert_eq!(performance(&[], 2.0, &w), 0.0);
        assert_eq!(performance(&[], 0.0, &w), 0.0);
    }

    #[test]
    fn performance_ignores_samples_outside_window() {
        let w = Window::new(t(6, 0), t(7, 0)).unwrap();
        let samples = vec![
            sample(t(5, 0), MachineStatus::Running, 0),
            sample(t(6, 10), MachineStatus::Running, 100),
            sample(t(6, 20), MachineStatus::Running, 400),
            sample(t(7, 0), MachineStatus::Running, 9_999),
        ];
        assert_eq!(actual_cycles(&samples, &w), 300);
    }

    #[test]
    fn quality_defaults_to_one_without_parts() {
        let span = DateSpan::single(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(quality(&[], &span), 1.0);
        assert_eq!(quality(&[record(0, 0)], &span), 1.0);
        assert!((quality(&[record(90, 10)], &span) - 0.9).abs() < 1e-12);
    }

    #[test]
    fn quality_skips_records_outside_span() {
        let span = DateSpan::single(NaiveDate::from_ymd_opt(2024, 3, 2).unwrap());
        assert_eq!(quality(&[record(10, 90)], &span), 1.0);
    }

    #[test]
    fn oee_is_exact_product() {
        let w = Window::new(t(6, 0), t(7, 0)).unwrap();
        let b = OeeBreakdown::compose(1, w, 0.875, 1_600.0 / 1_800.0, 0.9, t(7, 0));
        assert_eq!(b.oee, b.availability * b.performance * b.quality);
        assert!((b.oee - 0.7).abs() < 1e-9);
        assert_eq!(b.rating, OeeRating::Good);
    }

    #[test]
    fn compose_clamps_inputs() {
        let w = Window::new(t(6, 0), t(7, 0)).unwrap();
        let b = OeeBreakdown::compose(1, w, 1.2, -0.1, f64::NAN, t(7, 0));
        assert_eq!((b.availability, b.performance, b.quality, b.oee), (1.0, 0.0, 0.0, 0.0));
        assert_eq!(b.rating, OeeRating::Poor);
    }

    #[test]
    fn utilization_holds_status_until_next_sample() {
        let w = Window::new(t(6, 0), t(8, 0)).unwrap();
        let samples = vec![
            sample(t(6, 0), MachineStatus::Running, 0),
            sample(t(6, 30), MachineStatus::Idle, 0),
            sample(t(7, 0), MachineStatus::Running, 0),
        ];
        // 30 min + 60 min out of 120
        assert!((utilization(&samples, &w) - 0.75).abs() < 1e-12);
        assert_eq!(utilization(&[], &w), 0.0);
    }

    #[test]
    fn utilization_clips_sample_before_window() {
        let w = Window::new(t(6, 0), t(7, 0)).unwrap();
        let samples = vec![sample(t(5, 0), MachineStatus::Running, 0)];
        assert_eq!(utilization(&samples, &w), 1.0);
        let w2 = Window::new(t(6, 0), t(6, 0) + Duration::minutes(90)).unwrap();
        let samples = vec![sample(t(7, 0), MachineStatus::Running, 0)];
        assert!((utilization(&samples, &w2) - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn shift_efficiency_against_nominal_shift() {
        let eff = shift_efficiency(&record(9_000, 1_000), 2.5, 8.0);
        assert_eq!(eff.total_parts, 10_000);
        assert!((eff.quality_rate - 0.9).abs() < 1e-12);
        assert!((eff.performance_rate - 10_000.0 / 11_520.0).abs() < 1e-12);
        let empty = shift_efficiency(&record(0, 0), 2.5, 8.0);
        assert_eq!(empty.quality_rate, 0.0);
    }
}
