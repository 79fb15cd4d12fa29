use crate::config::Config;
use crate::engine::read_trajectory;
use crate::metrics::Snapshot;
use crate::stats::TimeSeries;
use crate::truck::TruckState;
use anyhow::{Context, Result};
use std::{collections::BTreeMap, fs, path::Path};

/// Quantity derived from saved snapshots.
pub trait Obs {
    fn name(&self) -> &'static str;
    fn update(&mut self, snapshot: &Snapshot);
    fn report(&self) -> Result<toml::Value>;
}

/// Observable tracking one scalar field of each snapshot.
pub struct Scalar {
    name: &'static str,
    extract: fn(&Snapshot) -> f64,
    time_series: TimeSeries,
}

impl Scalar {
    pub fn new(name: &'static str, extract: fn(&Snapshot) -> f64) -> Self {
        Self {
            name,
            extract,
            time_series: TimeSeries::new(),
        }
    }
}

impl Obs for Scalar {
    fn name(&self) -> &'static str {
        self.name
    }

    fn update(&mut self, snapshot: &Snapshot) {
        self.time_series.push((self.extract)(snapshot));
    }

    fn report(&self) -> Result<toml::Value> {
        to_value(&self.time_series.report())
    }
}

/// Fraction of trucks in each controller state.
pub struct TruckStateFractions {
    series: [(TruckState, TimeSeries); 3],
}

impl TruckStateFractions {
    pub fn new() -> Self {
        Self {
            series: [
                (TruckState::Patrolling, TimeSeries::new()),
                (TruckState::Collecting, TimeSeries::new()),
                (TruckState::Returning, TimeSeries::new()),
            ],
        }
    }
}

impl Obs for TruckStateFractions {
    fn name(&self) -> &'static str {
        "truck_state_fractions"
    }

    fn update(&mut self, snapshot: &Snapshot) {
        let counts = snapshot.trucks_by_state;
        let total = counts.total().max(1) as f64;
        for (state, time_series) in &mut self.series {
            time_series.push(counts.count(*state) as f64 / total);
        }
    }

    fn report(&self) -> Result<toml::Value> {
        let mut table = toml::Table::new();
        for (state, time_series) in &self.series {
            table.insert(state.to_string(), to_value(&time_series.report())?);
        }
        Ok(toml::Value::Table(table))
    }
}

/// Trash disposed per step between consecutive saves.
pub struct Throughput {
    last: Option<(usize, f64)>,
    time_series: TimeSeries,
}

impl Throughput {
    pub fn new() -> Self {
        Self {
            last: None,
            time_series: TimeSeries::new(),
        }
    }
}

impl Obs for Throughput {
    fn name(&self) -> &'static str {
        "disposal_throughput"
    }

    fn update(&mut self, snapshot: &Snapshot) {
        if let Some((step, disposed)) = self.last {
            if snapshot.step > step {
                let rate = (snapshot.total_disposed - disposed) / (snapshot.step - step) as f64;
                self.time_series.push(rate);
            }
        }
        self.last = Some((snapshot.step, snapshot.total_disposed));
    }

    fn report(&self) -> Result<toml::Value> {
        to_value(&self.time_series.report())
    }
}

/// Feeds the snapshots of one run through every observable.
pub struct Analyzer {
    cfg: Config,
    obs_ptr_vec: Vec<Box<dyn Obs>>,
}

impl Analyzer {
    pub fn new(cfg: Config) -> Self {
        let obs_ptr_vec: Vec<Box<dyn Obs>> = vec![
            Box::new(Scalar::new("total_trash_in_buildings", |s| {
                s.total_trash_in_buildings
            })),
            Box::new(Scalar::new("buildings_awaiting_pickup", |s| {
                s.buildings_awaiting_pickup as f64
            })),
            Box::new(Scalar::new("avg_wait_time", |s| s.avg_wait_time)),
            Box::new(TruckStateFractions::new()),
            Box::new(Throughput::new()),
        ];
        Self { cfg, obs_ptr_vec }
    }

    pub fn add_snapshot(&mut self, snapshot: &Snapshot) {
        for obs in &mut self.obs_ptr_vec {
            obs.update(snapshot);
        }
    }

    pub fn add_file<P: AsRef<Path>>(&mut self, file: P) -> Result<()> {
        let snapshots = read_trajectory(file, self.cfg.output.saves_per_file)
            .context("failed to read trajectory")?;
        for snapshot in &snapshots {
            self.add_snapshot(snapshot);
        }
        Ok(())
    }

    pub fn results(&self) -> Result<BTreeMap<&'static str, toml::Value>> {
        let mut results = BTreeMap::new();
        for obs in &self.obs_ptr_vec {
            let report = obs
                .report()
                .with_context(|| format!("failed to report {}", obs.name()))?;
            results.insert(obs.name(), report);
        }
        Ok(results)
    }

    pub fn save_results<P: AsRef<Path>>(&self, file: P) -> Result<()> {
        let file = file.as_ref();
        let results = self.results()?;
        let contents = toml::to_string_pretty(&results).context("failed to serialize results")?;
        fs::write(file, contents).with_context(|| format!("failed to write {file:?}"))?;
        Ok(())
    }
}

fn to_value<T: serde::Serialize>(report: &T) -> Result<toml::Value> {
    toml::Value::try_from(report).context("failed to convert report")
}
