use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{MachineId, Timestamp, Window};

pub type ShiftNumber = u8;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Machine {
    pub id: MachineId,
    pub name: String,
    /// press, welding, injection, ...
    pub kind: String,
    /// Seconds per unit at rated speed. Always positive in a well-formed store.
    pub ideal_cycle_time: f64,
    pub last_maintenance: Option<Timestamp>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MachineStatus {
    Running,
    Idle,
    Stopped,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusSample {
    pub machine_id: MachineId,
    pub timestamp: Timestamp,
    pub status: MachineStatus,
    /// Amps.
    pub current_consumption: Option<f64>,
    pub temperature: Option<f64>,
    /// Cumulative counter, non-decreasing per machine.
    pub cycle_count: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DowntimeEvent {
    pub machine_id: MachineId,
    pub category: String,
    pub reason: String,
    pub start_time: Timestamp,
    /// `None` while the stoppage is still open.
    pub end_time: Option<Timestamp>,
    pub resolved: bool,
}

impl DowntimeEvent {
    pub fn is_open(&self) -> bool {
        self.end_time.is_none()
    }

    /// End used for accounting: open events run until the window end.
    pub fn effective_end(&self, window: &Window) -> Timestamp {
        self.end_time.unwrap_or_else(|| window.end())
    }

    /// Whether any part of the event falls inside the window.
    pub fn touches(&self, window: &Window) -> bool {
        self.start_time < window.end() && self.effective_end(window) > window.start()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductionRecord {
    pub machine_id: MachineId,
    pub shift_date: NaiveDate,
    pub shift_number: ShiftNumber,
    pub good_parts: u64,
    pub defective_parts: u64,
    pub target_count: u64,
}

impl ProductionRecord {
    pub fn total_parts(&self) -> u64 {
        self.good_parts.saturating_add(self.defective_parts)
    }

    /// Good share of produced parts in percent, 0 when nothing was produced.
    pub fn quality_rate(&self) -> f64 {
        let total = self.total_parts();
        if total == 0 {
            0.0
        } else {
            self.good_parts as f64 * 100.0 / total as f64
        }
    }

    /// Produced parts against target in percent, 0 when the target is missing.
    pub fn efficiency_rate(&self) -> f64 {
        if self.target_count == 0 {
            0.0
        } else {
            self.total_parts() as f64 * 100.0 / self.target_count as f64
        }
    }
}
