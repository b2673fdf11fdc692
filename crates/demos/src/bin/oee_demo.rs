use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use clap::Parser;
use serde::Serialize;
use tracing::info;

use oee_core::machine::{DowntimeEvent, Machine, MachineStatus, ProductionRecord, StatusSample};
use oee_core::store::MemoryStore;
use oee_core::{Outcome, Timestamp, Window};
use oee_runtime::metrics::CallTimer;
use oee_runtime::{init_tracing, EngineConfig, OeeEngine};

/// Seeds an in-memory store with a synthetic shop floor and prints every analysis as JSON lines.
#[derive(Debug, Parser)]
#[command(name = "oee_demo")]
struct Args {
    /// Engine config (JSON). Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, default_value_t = 3)]
    machines: u64,
    #[arg(long, default_value_t = 3)]
    days: i64,
    /// Shifts the generated patterns so runs can differ.
    #[arg(long, default_value_t = 7)]
    seed: u64,
    /// Trailing window for the anomaly scan.
    #[arg(long, default_value_t = 2)]
    anomaly_hours: i64,
}

const SAMPLE_EVERY_MIN: i64 = 5;
const DOWNTIME_REASONS: [(&str, &str); 5] = [
    ("mechanical", "tool jam"),
    ("mechanical", "bearing noise"),
    ("electrical", "breaker trip"),
    ("operational", "material shortage"),
    ("quality", "first-piece rejection"),
];

fn history_start() -> Timestamp {
    Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).single().unwrap_or_else(Utc::now)
}

fn seed_store(args: &Args, start: Timestamp) -> MemoryStore {
    let mut store = MemoryStore::new();
    let end = start + Duration::days(args.days);

    for machine_id in 1..=args.machines {
        let ideal_cycle_time = 2.0 + 0.5 * (machine_id % 3) as f64;
        store.add_machine(Machine {
            id: machine_id,
            name: format!("line-{machine_id}"),
            kind: ["press", "welding", "injection"][(machine_id % 3) as usize].to_string(),
            ideal_cycle_time,
            last_maintenance: (machine_id % 4 != 0)
                .then(|| start - Duration::days(10 + 5 * machine_id as i64)),
        });

        // Synthetic generator
        let mut cycles: u64 = 1_000 * machine_id;
        let mut ts = start;
        let mut tick: u64 = 0;
        while ts < end {
            let phase = (tick + args.seed * machine_id) % 48;
            let status = match phase {
                0..=39 => MachineStatus::Running,
                40..=44 => MachineStatus::Idle,
                _ => MachineStatus::Stopped,
            };
            if status == MachineStatus::Running {
                let per_sample = (SAMPLE_EVERY_MIN as f64 * 60.0 / ideal_cycle_time) as u64;
                cycles += per_sample - per_sample / (5 + machine_id);
            }
            let base = match status {
                MachineStatus::Running => 14.0 + (tick % 7) as f64 * 0.3,
                MachineStatus::Idle => 4.0,
                MachineStatus::Stopped => 0.5,
            };
            let spike = if (tick + args.seed) % 211 == 0 { 30.0 } else { 0.0 };
            store.add_sample(StatusSample {
                machine_id,
                timestamp: ts,
                status,
                current_consumption: Some(base + spike),
                temperature: Some(38.0 + (tick % 11) as f64),
                cycle_count: Some(cycles),
            });
            ts += Duration::minutes(SAMPLE_EVERY_MIN);
            tick += 1;
        }

        for day in 0..args.days {
            let day_start = start + Duration::days(day);
            for k in 0..3u64 {
                let (category, reason) =
                    DOWNTIME_REASONS[((day as u64 + k + machine_id + args.seed) % 5) as usize];
                let begin = day_start + Duration::minutes((90 + 400 * k + 17 * machine_id) as i64);
                let minutes = 5 + ((machine_id * 7 + k * 11 + day as u64) % 40) as i64;
                let still_open = day == args.days - 1 && k == 2 && machine_id == 1;
                store.add_downtime(DowntimeEvent {
                    machine_id,
                    category: category.to_string(),
                    reason: reason.to_string(),
                    start_time: begin,
                    end_time: (!still_open).then(|| begin + Duration::minutes(minutes)),
                    resolved: !still_open,
                });
            }

            let shift_date: NaiveDate = day_start.date_naive();
            for shift_number in 1..=3u8 {
                let target = (8.0 * 3600.0 / ideal_cycle_time) as u64;
                let produced = target - target / (6 + shift_number as u64 + machine_id);
                let defective = produced / (40 + 3 * shift_number as u64);
                store.add_production(ProductionRecord {
                    machine_id,
                    shift_date,
                    shift_number,
                    good_parts: produced - defective,
                    defective_parts: defective,
                    target_count: target,
                });
            }
        }
    }
    store
}

fn emit<T: Serialize>(label: &str, value: &T) -> Result<()> {
    #[derive(Serialize)]
    struct Line<'a, T> {
        label: &'a str,
        value: &'a T,
    }
    let line = serde_json::to_string(&Line { label, value }).context("serializing demo output")?;
    println!("{line}");
    Ok(())
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let cfg = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    info!(machines = args.machines, days = args.days, "oee_demo starting");

    let start = history_start();
    let store = seed_store(&args, start);
    let engine = OeeEngine::new(Arc::new(store), cfg);
    let now = start + Duration::days(args.days);
    let whole = Window::new(start, now)?;
    let last_shift = Window::new(now - Duration::hours(8), now)?;
    let anomaly_window = Window::trailing(now, Duration::hours(args.anomaly_hours))?;

    let timer = CallTimer::start();
    for machine_id in 1..=args.machines {
        emit("oee_last_shift", &engine.compute_oee_at(machine_id, last_shift, now)?)?;
        emit("oee_daily", &engine.oee_trend(machine_id, whole)?)?;
        emit("utilization", &engine.utilization(machine_id, whole)?)?;
        emit(
            "shift_efficiency",
            &engine.shift_efficiency(machine_id, start.date_naive(), 1)?,
        )?;
        emit("anomalies", &engine.detect_anomalies(machine_id, anomaly_window)?)?;
        emit("energy", &engine.energy_analysis(machine_id, whole)?)?;
        emit(
            "current_hourly",
            &engine.resampled_current(machine_id, last_shift, Duration::hours(1))?,
        )?;
        emit("maintenance", &engine.predict_maintenance_at(machine_id, now)?)?;
    }

    match engine.downtime_report(None, whole)? {
        Outcome::Computed(report) => emit("downtime_report", &report)?,
        Outcome::NoData => info!("no downtime recorded in window"),
    }
    match engine.production_report(None, whole)? {
        Outcome::Computed(report) => emit("production_report", &report)?,
        Outcome::NoData => info!("no production recorded in window"),
    }

    let snapshot = engine.metrics().snapshot();
    println!("{}", snapshot.to_json_line("oee_demo", Some(timer.elapsed())));
    info!(?snapshot, "final metrics summary");
    Ok(())
}
