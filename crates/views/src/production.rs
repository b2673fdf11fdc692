//! Production totals, per-shift averages and daily trend.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use oee_core::machine::{ProductionRecord, ShiftNumber};
use oee_core::{DateSpan, MachineId, Outcome};

use crate::mean;

fn saturating_sum(parts: impl Iterator<Item = u64>) -> u64 {
    parts.fold(0, u64::saturating_add)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductionTotals {
    pub good_parts: u64,
    pub defective_parts: u64,
    pub total_produced: u64,
    /// Percent; 0 when nothing was produced.
    pub overall_quality_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShiftSummary {
    pub shift_number: ShiftNumber,
    pub records: usize,
    pub mean_good_parts: f64,
    pub mean_defective_parts: f64,
    pub mean_quality_rate: f64,
    pub mean_efficiency_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyProduction {
    pub shift_date: NaiveDate,
    pub good_parts: u64,
    pub defective_parts: u64,
    pub total_parts: u64,
    pub mean_quality_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductionReport {
    pub span: DateSpan,
    pub machine_id: Option<MachineId>,
    pub totals: ProductionTotals,
    pub daily_average_production: f64,
    pub by_shift: Vec<ShiftSummary>,
    pub daily_trend: Vec<DailyProduction>,
}

pub fn production_report(
    records: &[ProductionRecord],
    span: &DateSpan,
    machine_id: Option<MachineId>,
) -> Outcome<ProductionReport> {
    let selected: Vec<&ProductionRecord> = records
        .iter()
        .filter(|r| span.contains(r.shift_date))
        .filter(|r| machine_id.map_or(true, |m| m == r.machine_id))
        .collect();
    if selected.is_empty() {
        return Outcome::NoData;
    }

    let good = saturating_sum(selected.iter().map(|r| r.good_parts));
    let defective = saturating_sum(selected.iter().map(|r| r.defective_parts));
    let produced = good.saturating_add(defective);
    let totals = ProductionTotals {
        good_parts: good,
        defective_parts: defective,
        total_produced: produced,
        overall_quality_rate: if produced == 0 {
            0.0
        } else {
            good as f64 * 100.0 / produced as f64
        },
    };

    let mut shifts: BTreeMap<ShiftNumber, Vec<&ProductionRecord>> = BTreeMap::new();
    let mut days: BTreeMap<NaiveDate, Vec<&ProductionRecord>> = BTreeMap::new();
    for r in selected.iter().copied() {
        shifts.entry(r.shift_number).or_default().push(r);
        days.entry(r.shift_date).or_default().push(r);
    }

    let by_shift = shifts
        .into_iter()
        .map(|(shift_number, rows)| ShiftSummary {
            shift_number,
            records: rows.len(),
            mean_good_parts: mean(rows.iter().map(|r| r.good_parts as f64)),
            mean_defective_parts: mean(rows.iter().map(|r| r.defective_parts as f64)),
            mean_quality_rate: mean(rows.iter().map(|r| r.quality_rate())),
            mean_efficiency_rate: mean(rows.iter().map(|r| r.efficiency_rate())),
        })
        .collect();

    let daily_trend: Vec<DailyProduction> = days
        .into_iter()
        .map(|(shift_date, rows)| {
            let good_parts = saturating_sum(rows.iter().map(|r| r.good_parts));
            let defective_parts = saturating_sum(rows.iter().map(|r| r.defective_parts));
            DailyProduction {
                shift_date,
                good_parts,
                defective_parts,
                total_parts: good_parts.saturating_add(defective_parts),
                mean_quality_rate: mean(rows.iter().map(|r| r.quality_rate())),
            }
        })
        .collect();

    let daily_average_production = mean(daily_trend.iter().map(|d| d.total_parts as f64));

    Outcome::Computed(ProductionReport {
        span: *span,
        machine_id,
        totals,
        daily_average_production,
        by_shift,
        daily_trend,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn rec(d: u32, shift: ShiftNumber, good: u64, defective: u64, target: u64) -> ProductionRecord {
        ProductionRecord {
            machine_id: 1,
            shift_date: date(d),
            shift_number: shift,
            good_parts: good,
            defective_parts: defective,
            target_count: target,
        }
    }

    fn span() -> DateSpan {
        DateSpan { first: date(1), last: date(2) }
    }

    #[test]
    fn totals_shifts_and_days() {
        let rows = vec![
            rec(1, 1, 90, 10, 100),
            rec(1, 2, 40, 10, 100),
            rec(2, 1, 70, 30, 200),
        ];
        let report = production_report(&rows, &span(), Some(1)).computed().unwrap();

        assert_eq!(report.totals.total_produced, 250);
        assert!((report.totals.overall_quality_rate - 80.0).abs() < 1e-9);

        let shift1 = &report.by_shift[0];
        assert_eq!(shift1.shift_number, 1);
        assert_eq!(shift1.records, 2);
        assert!((shift1.mean_quality_rate - 80.0).abs() < 1e-9);
        assert!((shift1.mean_efficiency_rate - 75.0).abs() < 1e-9);

        assert_eq!(report.daily_trend.len(), 2);
        assert_eq!(report.daily_trend[0].total_parts, 150);
        assert!((report.daily_trend[0].mean_quality_rate - 85.0).abs() < 1e-9);
        assert!((report.daily_average_production - 125.0).abs() < 1e-9);
    }

    #[test]
    fn zero_part_record_has_zero_quality_rate() {
        let rows = vec![rec(1, 3, 0, 0, 50)];
        let report = production_report(&rows, &span(), None).computed().unwrap();
        assert_eq!(report.totals.overall_quality_rate, 0.0);
        assert_eq!(report.by_shift[0].mean_quality_rate, 0.0);
    }

    #[test]
    fn huge_counts_saturate() {
        let rows = vec![rec(1, 1, u64::MAX, 5, 100), rec(1, 2, 10, u64::MAX, 100)];
        let report = production_report(&rows, &span(), Some(1)).computed().unwrap();
        assert_eq!(report.totals.good_parts, u64::MAX);
        assert_eq!(report.totals.defective_parts, u64::MAX);
        assert_eq!(report.totals.total_produced, u64::MAX);
        assert_eq!(report.daily_trend[0].total_parts, u64::MAX);
    }

    #[test]
    fn empty_selection_is_no_data() {
        assert!(production_report(&[], &span(), None).is_no_data());
        let rows = vec![rec(5, 1, 1, 1, 1)];
        assert!(production_report(&rows, &span(), None).is_no_data());
        let rows = vec![rec(1, 1, 1, 1, 1)];
        assert!(production_report(&rows, &span(), Some(9)).is_no_data());
    }
}
