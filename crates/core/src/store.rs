//! Read-only access to stored machine history.

use crate::machine::{DowntimeEvent, Machine, ProductionRecord, StatusSample};
use crate::{DateSpan, MachineId, StoreError, Window};

/// Storage collaborator consulted by the engine. `machine = None` means all machines.
///
/// Implementations must return an empty vector for "no rows" and reserve
/// `Err` for failures of the query itself.
pub trait RecordStore: Send + Sync {
    fn machine(&self, id: MachineId) -> Result<Option<Machine>, StoreError>;

    /// Samples with `window.start <= timestamp < window.end`, ordered by timestamp.
    fn status_samples(
        &self,
        machine: Option<MachineId>,
        window: &Window,
    ) -> Result<Vec<StatusSample>, StoreError>;

    /// Events overlapping the window; open events overlap everything after their start.
    fn downtime_events(
        &self,
        machine: Option<MachineId>,
        window: &Window,
        resolved_only: bool,
    ) -> Result<Vec<DowntimeEvent>, StoreError>;

    /// Records whose shift date lies in `span`, ordered by date then shift number.
    fn production_records(
        &self,
        machine: Option<MachineId>,
        span: &DateSpan,
    ) -> Result<Vec<ProductionRecord>, StoreError>;
}

/// Store backed by plain vectors, for tests and synthetic runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    machines: Vec<Machine>,
    samples: Vec<StatusSample>,
    downtime: Vec<DowntimeEvent>,
    production: Vec<ProductionRecord>,
}

fn matches(filter: Option<MachineId>, id: MachineId) -> bool {
    filter.map_or(true, |m| m == id)
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_machine(&mut self, machine: Machine) {
        self.machines.retain(|m| m.id != machine.id);
        self.machines.push(machine);
    }

    pub fn add_sample(&mut self, sample: StatusSample) {
        self.samples.push(sample);
    }

    pub fn add_downtime(&mut self, event: DowntimeEvent) {
        self.downtime.push(event);
    }

    /// Replaces any record for the same machine, date and shift.
    pub fn add_production(&mut self, record: ProductionRecord) {
        self.production.retain(|r| {
            !(r.machine_id == record.machine_id
                && r.shift_date == record.shift_date
                && r.shift_number == record.shift_number)
        });
        self.production.push(record);
    }

    pub fn machines(&self) -> &[Machine] {
        &self.machines
    }
}

impl RecordStore for MemoryStore {
    fn machine(&self, id: MachineId) -> Result<Option<Machine>, StoreError> {
        Ok(self.machines.iter().find(|m| m.id == id).cloned())
    }

    fn status_samples(
        &self,
        machine: Option<MachineId>,
        window: &Window,
    ) -> Result<Vec<StatusSample>, StoreError> {
        let mut out: Vec<StatusSample> = self
            .samples
            .iter()
            .filter(|s| matches(machine, s.machine_id) && window.contains(s.timestamp))
            .cloned()
            .collect();
        out.sort_by_key(|s| s.timestamp);
        Ok(out)
    }

    fn downtime_events(
        &self,
        machine: Option<MachineId>,
        window: &Window,
        resolved_only: bool,
    ) -> Result<Vec<DowntimeEvent>, StoreError> {
        let mut out: Vec<DowntimeEvent> = self
            .downtime
            .iter()
            .filter(|e| matches(machine, e.machine_id))
            .filter(|e| !resolved_only || e.resolved)
            .filter(|e| e.touches(window))
            .cloned()
            .collect();
        out.sort_by_key(|e| e.start_time);
        Ok(out)
    }

    fn production_records(
        &self,
        machine: Option<MachineId>,
        span: &DateSpan,
    ) -> Result<Vec<ProductionRecord>, StoreError> {
        let mut out: Vec<ProductionRecord> = self
            .production
            .iter()
            .filter(|r| matches(machine, r.machine_id) && span.contains(r.shift_date))
            .cloned()
            .collect();
        out.sort_by_key(|r| (r.shift_date, r.shift_number, r.machine_id));
        Ok(out)
    }
}
