//! Read-only analytics over one machine's (or the whole floor's) stored history.
//!
//! Each call fetches a fresh snapshot from the injected [`RecordStore`] and
//! computes a pure function of it. The engine holds no mutable state apart
//! from its metrics counters, so clones can serve concurrent requests.

use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use tracing::{debug, info, warn};

use oee_core::machine::{Machine, ShiftNumber, StatusSample};
use oee_core::oee::{self, OeeBreakdown, ShiftEfficiency};
use oee_core::store::RecordStore;
use oee_core::{CoreError, DateSpan, MachineId, Outcome, StoreError, Timestamp, Window};
use oee_predictors::{
    FailureFrequencyPredictor, MaintenanceForecast, MaintenanceInput, MaintenancePredictor,
};
use oee_signals::anomaly::{detect_outliers, Anomaly};
use oee_signals::energy::{energy_estimate, EnergySummary};
use oee_signals::smoothing::{moving_average, resample, Bucket};
use oee_signals::{current_series, Point};
use oee_views::downtime::{downtime_report, DowntimeReport};
use oee_views::production::{production_report, ProductionReport};

use crate::config::EngineConfig;
use crate::metrics::{CallTimer, MetricsRegistry};

#[derive(Clone)]
pub struct OeeEngine {
    store: Arc<dyn RecordStore>,
    cfg: EngineConfig,
    predictor: Arc<dyn MaintenancePredictor>,
    metrics: MetricsRegistry,
}

impl OeeEngine {
    pub fn new(store: Arc<dyn RecordStore>, cfg: EngineConfig) -> Self {
        let predictor = Arc::new(FailureFrequencyPredictor::new(cfg.maintenance.clone()));
        Self {
            store,
            cfg,
            predictor,
            metrics: MetricsRegistry::default(),
        }
    }

    pub fn with_predictor(mut self, predictor: Arc<dyn MaintenancePredictor>) -> Self {
        self.predictor = predictor;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    pub fn metrics(&self) -> &MetricsRegistry {
        &self.metrics
    }

    fn track<T>(&self, result: Result<T, StoreError>) -> Result<T, CoreError> {
        result.map_err(|err| {
            self.metrics.inc_store_errors(1);
            warn!(error = %err, "record store query failed");
            CoreError::from(err)
        })
    }

    fn no_data<T>(&self, what: &str, outcome: &Outcome<T>) {
        if outcome.is_no_data() {
            self.metrics.inc_no_data_results(1);
            debug!(what, "no data for request");
        }
    }

    fn require_machine(&self, machine_id: MachineId) -> Result<Machine, CoreError> {
        self.track(self.store.machine(machine_id))?
            .ok_or(CoreError::MachineNotFound(machine_id))
    }

    /// OEE breakdown for the window, stamped with the current time.
    pub fn compute_oee(&self, machine_id: MachineId, window: Window) -> Result<OeeBreakdown, CoreError> {
        self.compute_oee_at(machine_id, window, Utc::now())
    }

    pub fn compute_oee_at(
        &self,
        machine_id: MachineId,
        window: Window,
        computed_at: Timestamp,
    ) -> Result<OeeBreakdown, CoreError> {
        let timer = CallTimer::start();
        let machine = self.require_machine(machine_id)?;
        let samples = self.track(self.store.status_samples(Some(machine_id), &window))?;
        let downtime = self.track(self.store.downtime_events(Some(machine_id), &window, false))?;
        let production = self.track(self.store.production_records(Some(machine_id), &window.date_span()))?;
        debug!(
            machine_id,
            samples = samples.len(),
            downtime_events = downtime.len(),
            production_records = production.len(),
            "oee snapshot loaded"
        );

        let breakdown = OeeBreakdown::from_snapshot(
            machine_id,
            window,
            machine.ideal_cycle_time,
            &samples,
            &downtime,
            &production,
            computed_at,
        );
        self.metrics.inc_oee_computations(1);
        self.metrics.record_call(timer.elapsed());
        info!(
            machine_id,
            start = %window.start(),
            end = %window.end(),
            availability = breakdown.availability,
            performance = breakdown.performance,
            quality = breakdown.quality,
            oee = breakdown.oee,
            "oee computed"
        );
        Ok(breakdown)
    }

    /// One OEE breakdown per calendar day (UTC) of the window, from a single snapshot.
    pub fn oee_trend(&self, machine_id: MachineId, window: Window) -> Result<Vec<OeeBreakdown>, CoreError> {
        self.oee_trend_at(machine_id, window, Utc::now())
    }

    pub fn oee_trend_at(
        &self,
        machine_id: MachineId,
        window: Window,
        computed_at: Timestamp,
    ) -> Result<Vec<OeeBreakdown>, CoreError> {
        let machine = self.require_machine(machine_id)?;
        let samples = self.track(self.store.status_samples(Some(machine_id), &window))?;
        let downtime = self.track(self.store.downtime_events(Some(machine_id), &window, false))?;
        let production = self.track(self.store.production_records(Some(machine_id), &window.date_span()))?;

        let trend: Vec<OeeBreakdown> = window
            .split_days()
            .into_iter()
            .map(|day| {
                OeeBreakdown::from_snapshot(
                    machine_id,
                    day,
                    machine.ideal_cycle_time,
                    &samples,
                    &downtime,
                    &production,
                    computed_at,
                )
            })
            .collect();
        self.metrics.inc_oee_computations(trend.len() as u64);
        info!(machine_id, days = trend.len(), "oee trend computed");
        Ok(trend)
    }

    /// Running share of the window according to status samples, independent of the downtime log.
    pub fn utilization(&self, machine_id: MachineId, window: Window) -> Result<f64, CoreError> {
        let samples = self.machine_history(machine_id, window)?;
        let value = oee::utilization(&samples, &window);
        debug!(machine_id, samples = samples.len(), utilization = value, "utilization computed");
        Ok(value)
    }

    pub fn shift_efficiency(
        &self,
        machine_id: MachineId,
        shift_date: NaiveDate,
        shift_number: ShiftNumber,
    ) -> Result<Outcome<ShiftEfficiency>, CoreError> {
        let machine = self.require_machine(machine_id)?;
        let records = self.track(
            self.store
                .production_records(Some(machine_id), &DateSpan::single(shift_date)),
        )?;
        let outcome = Outcome::from_option(
            records
                .iter()
                .find(|r| r.shift_number == shift_number)
                .map(|r| oee::shift_efficiency(r, machine.ideal_cycle_time, self.cfg.shift.shift_hours)),
        );
        self.no_data("shift_efficiency", &outcome);
        Ok(outcome)
    }

    pub fn downtime_report(
        &self,
        machine_id: Option<MachineId>,
        window: Window,
    ) -> Result<Outcome<DowntimeReport>, CoreError> {
        let timer = CallTimer::start();
        if let Some(id) = machine_id {
            self.require_machine(id)?;
        }
        let events = self.track(self.store.downtime_events(
            machine_id,
            &window,
            self.cfg.downtime.resolved_only,
        ))?;
        let outcome = downtime_report(&events, &window, machine_id, &self.cfg.downtime);
        self.no_data("downtime_report", &outcome);
        if let Outcome::Computed(report) = &outcome {
            self.metrics.inc_reports_generated(1);
            info!(
                machine_id = ?machine_id,
                total_hours = report.total_hours,
                total_incidents = report.total_incidents,
                categories = report.by_category.len(),
                "downtime report generated"
            );
        }
        self.metrics.record_call(timer.elapsed());
        Ok(outcome)
    }

    pub fn production_report(
        &self,
        machine_id: Option<MachineId>,
        window: Window,
    ) -> Result<Outcome<ProductionReport>, CoreError> {
        let timer = CallTimer::start();
        if let Some(id) = machine_id {
            self.require_machine(id)?;
        }
        let span = window.date_span();
        let records = self.track(self.store.production_records(machine_id, &span))?;
        let outcome = production_report(&records, &span, machine_id);
        self.no_data("production_report", &outcome);
        if let Outcome::Computed(report) = &outcome {
            self.metrics.inc_reports_generated(1);
            info!(
                machine_id = ?machine_id,
                total_produced = report.totals.total_produced,
                quality_rate = report.totals.overall_quality_rate,
                days = report.daily_trend.len(),
                "production report generated"
            );
        }
        self.metrics.record_call(timer.elapsed());
        Ok(outcome)
    }

    pub fn machine_history(&self, machine_id: MachineId, window: Window) -> Result<Vec<StatusSample>, CoreError> {
        self.require_machine(machine_id)?;
        self.track(self.store.status_samples(Some(machine_id), &window))
    }

    fn current_readings(&self, machine_id: MachineId, window: Window) -> Result<Vec<Point>, CoreError> {
        Ok(current_series(&self.machine_history(machine_id, window)?))
    }

    /// Current-draw outliers in the window; an empty list when data is insufficient.
    pub fn detect_anomalies(&self, machine_id: MachineId, window: Window) -> Result<Vec<Anomaly>, CoreError> {
        let points = self.current_readings(machine_id, window)?;
        if points.len() < self.cfg.anomaly.min_samples {
            warn!(
                machine_id,
                readings = points.len(),
                required = self.cfg.anomaly.min_samples,
                "not enough current readings for anomaly detection"
            );
            self.metrics.inc_no_data_results(1);
            return Ok(Vec::new());
        }
        let anomalies = detect_outliers(&points, &self.cfg.anomaly);
        self.metrics.inc_anomalies_flagged(anomalies.len() as u64);
        info!(machine_id, readings = points.len(), flagged = anomalies.len(), "anomaly scan finished");
        Ok(anomalies)
    }

    pub fn energy_analysis(&self, machine_id: MachineId, window: Window) -> Result<Outcome<EnergySummary>, CoreError> {
        let points = self.current_readings(machine_id, window)?;
        let outcome = Outcome::from_option(energy_estimate(&points, &self.cfg.energy));
        self.no_data("energy_analysis", &outcome);
        if let Outcome::Computed(summary) = &outcome {
            info!(
                machine_id,
                integrated_kwh = summary.integrated_kwh,
                max_power_kw = summary.max_power_kw,
                "energy analysis finished"
            );
        }
        Ok(outcome)
    }

    /// Rolling mean of current draw, aligned with the reading timestamps.
    pub fn current_moving_average(
        &self,
        machine_id: MachineId,
        window: Window,
        k: usize,
    ) -> Result<Vec<Point>, CoreError> {
        let points = self.current_readings(machine_id, window)?;
        let values: Vec<f64> = points.iter().map(|p| p.1).collect();
        Ok(points
            .iter()
            .map(|p| p.0)
            .zip(moving_average(&values, k))
            .collect())
    }

    pub fn resampled_current(
        &self,
        machine_id: MachineId,
        window: Window,
        bucket: Duration,
    ) -> Result<Vec<Bucket>, CoreError> {
        let points = self.current_readings(machine_id, window)?;
        resample(&points, bucket)
    }

    pub fn predict_maintenance(&self, machine_id: MachineId) -> Result<Outcome<MaintenanceForecast>, CoreError> {
        self.predict_maintenance_at(machine_id, Utc::now())
    }

    /// `NoData` when the machine has never been maintained.
    pub fn predict_maintenance_at(
        &self,
        machine_id: MachineId,
        now: Timestamp,
    ) -> Result<Outcome<MaintenanceForecast>, CoreError> {
        let machine = self.require_machine(machine_id)?;
        let Some(last_maintenance) = machine.last_maintenance else {
            self.metrics.inc_no_data_results(1);
            debug!(machine_id, "machine has no recorded maintenance");
            return Ok(Outcome::NoData);
        };

        let failure_count = match Window::new(last_maintenance, now) {
            Ok(since) => {
                let events = self.track(self.store.downtime_events(Some(machine_id), &since, false))?;
                events
                    .iter()
                    .filter(|e| e.category == self.cfg.maintenance.category && since.contains(e.start_time))
                    .count() as u64
            }
            Err(_) => 0,
        };
        if failure_count == 0 {
            warn!(machine_id, "no failure history since last maintenance, using fixed interval");
        }

        let forecast = self.predictor.predict(&MaintenanceInput {
            machine_id,
            last_maintenance,
            failure_count,
            now,
        });
        info!(
            machine_id,
            predicted = %forecast.predicted,
            urgency = ?forecast.urgency,
            failure_count,
            "maintenance predicted"
        );
        Ok(Outcome::Computed(forecast))
    }
}
