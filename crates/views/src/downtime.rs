//! Downtime rollups by category, reason and calendar day.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use oee_core::interval::as_secs;
use oee_core::machine::DowntimeEvent;
use oee_core::{MachineId, Outcome, Window};

use crate::{sort_desc_by, top_k, TopKConfig};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DowntimeReportConfig {
    pub top: TopKConfig,
    /// Skip events not yet marked resolved.
    pub resolved_only: bool,
}

impl Default for DowntimeReportConfig {
    fn default() -> Self {
        Self { top: TopKConfig::default(), resolved_only: false }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReasonSummary {
    pub machine_id: MachineId,
    pub category: String,
    pub reason: String,
    pub total_seconds: f64,
    pub incident_count: u64,
    pub avg_downtime_per_incident: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategorySummary {
    pub category: String,
    pub total_seconds: f64,
    pub downtime_hours: f64,
    pub incident_count: u64,
    pub avg_downtime_per_incident: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyDowntime {
    pub date: NaiveDate,
    pub total_seconds: f64,
    pub downtime_hours: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DowntimeReport {
    pub window: Window,
    pub machine_id: Option<MachineId>,
    pub total_hours: f64,
    pub total_incidents: u64,
    pub by_category: Vec<CategorySummary>,
    pub by_reason: Vec<ReasonSummary>,
    pub top_reasons: Vec<ReasonSummary>,
    pub daily_trend: Vec<DailyDowntime>,
}

/// Duration charged to an event: its own length, or up to the window end while open.
pub fn event_seconds(event: &DowntimeEvent, window: &Window) -> f64 {
    let end = event.effective_end(window);
    if end > event.start_time {
        as_secs(end - event.start_time)
    } else {
        0.0
    }
}

#[derive(Default)]
struct Tally {
    seconds: f64,
    count: u64,
}

impl Tally {
    fn add(&mut self, seconds: f64) {
        self.seconds += seconds;
        self.count += 1;
    }

    fn avg(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.seconds / self.count as f64
        }
    }
}

/// Builds the report from events that started inside the window.
pub fn downtime_report(
    events: &[DowntimeEvent],
    window: &Window,
    machine_id: Option<MachineId>,
    cfg: &DowntimeReportConfig,
) -> Outcome<DowntimeReport> {
    let selected: Vec<&DowntimeEvent> = events
        .iter()
        .filter(|e| window.contains(e.start_time))
        .filter(|e| machine_id.map_or(true, |m| m == e.machine_id))
        .filter(|e| !cfg.resolved_only || e.resolved)
        .collect();
    if selected.is_empty() {
        return Outcome::NoData;
    }

    let mut reasons: BTreeMap<(String, String, MachineId), Tally> = BTreeMap::new();
    let mut categories: BTreeMap<String, Tally> = BTreeMap::new();
    let mut days: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    let mut total = Tally::default();

    for ev in selected {
        let secs = event_seconds(ev, window);
        reasons
            .entry((ev.category.clone(), ev.reason.clone(), ev.machine_id))
            .or_default()
            .add(secs);
        categories.entry(ev.category.clone()).or_default().add(secs);
        *days.entry(ev.start_time.date_naive()).or_insert(0.0) += secs;
        total.add(secs);
    }

    let mut by_reason: Vec<ReasonSummary> = reasons
        .into_iter()
        .map(|((category, reason, machine_id), t)| ReasonSummary {
            machine_id,
            category,
            reason,
            total_seconds: t.seconds,
            incident_count: t.count,
            avg_downtime_per_incident: t.avg(),
        })
        .collect();
    sort_desc_by(&mut by_reason, |r| r.total_seconds);

    let mut by_category: Vec<CategorySummary> = categories
        .into_iter()
        .map(|(category, t)| CategorySummary {
            category,
            total_seconds: t.seconds,
            downtime_hours: t.seconds / 3600.0,
            incident_count: t.count,
            avg_downtime_per_incident: t.avg(),
        })
        .collect();
    sort_desc_by(&mut by_category, |c| c.total_seconds);

    let daily_trend = days
        .into_iter()
        .map(|(date, secs)| DailyDowntime {
            date,
            total_seconds: secs,
            downtime_hours: secs / 3600.0,
        })
        .collect();

    let top_reasons = top_k(by_reason.clone(), cfg.top, |r| r.total_seconds);

    Outcome::Computed(DowntimeReport {
        window: *window,
        machine_id,
        total_hours: total.seconds / 3600.0,
        total_incidents: total.count,
        by_category,
        by_reason,
        top_reasons,
        daily_trend,
    })
}
