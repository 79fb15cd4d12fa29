use crate::config::Config;
use crate::metrics::Snapshot;
use crate::model::Model;
use anyhow::{Context, Result};
use rand::prelude::*;
use rand_chacha::ChaCha12Rng;
use rmp_serde::{decode, encode};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

/// Simulation engine.
///
/// Holds the configuration, the model, and the random number generator that
/// drives activation order and wandering, and provides methods to initialize,
/// run, save, and load simulations.
#[derive(Serialize, Deserialize)]
pub struct Engine {
    cfg: Config,
    model: Model,
    rng: ChaCha12Rng,
}

impl Engine {
    /// Create a new `Engine` with the given configuration and a random initial state.
    ///
    /// The RNG is seeded from `cfg.seed` if set, otherwise from the OS.
    pub fn generate_initial_condition(cfg: Config) -> Result<Self> {
        let mut rng = match cfg.seed {
            Some(seed) => ChaCha12Rng::seed_from_u64(seed),
            None => ChaCha12Rng::try_from_os_rng()?,
        };

        let model =
            Model::generate(&cfg.model, &mut rng).context("failed to generate model")?;

        Ok(Self { cfg, model, rng })
    }

    pub fn cfg(&self) -> &Config {
        &self.cfg
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Advance the model by one step.
    pub fn advance_one_step(&mut self) {
        self.model.step(&mut self.rng);
    }

    /// Run the simulation and save the resulting snapshots to a binary file.
    ///
    /// Every step also appends to the model's in-memory snapshot history, so one
    /// call holds `steps_per_save * saves_per_file` snapshots.
    pub fn run_simulation<P: AsRef<Path>>(&mut self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let mut writer = BufWriter::new(file);

        let saves_per_file = self.cfg.output.saves_per_file;
        for i_save in 0..saves_per_file {
            for _ in 0..self.cfg.output.steps_per_save {
                self.advance_one_step();
            }

            let snapshot = self
                .model
                .latest_snapshot()
                .context("no snapshot was recorded")?;
            encode::write(&mut writer, snapshot).context("failed to serialize snapshot")?;

            let progress = 100.0 * (i_save + 1) as f64 / saves_per_file as f64;
            log::info!("completed {progress:06.2}%");
        }

        writer.flush().context("failed to flush writer stream")?;

        Ok(())
    }

    /// Save a checkpoint of the entire engine state.
    ///
    /// Can be used to resume the simulation later.
    pub fn save_checkpoint<P: AsRef<Path>>(&self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let mut writer = BufWriter::new(file);
        encode::write(&mut writer, &self).context("failed to serialize engine")?;
        writer.flush().context("failed to flush writer stream")?;
        Ok(())
    }

    /// Load a previously saved engine checkpoint.
    pub fn load_checkpoint<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let file = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
        let mut reader = BufReader::new(file);
        let engine = decode::from_read(&mut reader).context("failed to deserialize engine")?;
        Ok(engine)
    }
}

/// Read the `n_saves` snapshots stored in a trajectory file.
pub fn read_trajectory<P: AsRef<Path>>(file: P, n_saves: usize) -> Result<Vec<Snapshot>> {
    let file = file.as_ref();
    let file = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
    let mut reader = BufReader::new(file);

    let mut snapshots = Vec::with_capacity(n_saves);
    for i_save in 0..n_saves {
        let snapshot = decode::from_read(&mut reader)
            .with_context(|| format!("failed to read snapshot {i_save}"))?;
        snapshots.push(snapshot);
    }
    Ok(snapshots)
}
