use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, fs, ops::RangeBounds, path::Path};

/// Simulation configuration parameters.
///
/// Loaded from a TOML file and validated before use.
/// See [`Config::from_file`] for loading.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Seed of the simulation RNG; drawn from the OS if absent.
    #[serde(default)]
    pub seed: Option<u64>,

    pub model: ModelConfig,
    pub output: OutputConfig,
}

/// Parameters of the simulated world.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub grid_width: usize,
    pub grid_height: usize,

    pub n_buildings: usize,
    pub n_trucks: usize,

    /// Range `[min, max]` each building's capacity is drawn from.
    pub building_capacity: [f64; 2],
    /// Range `[min, max]` each building's generation rate is drawn from.
    pub generation_rate: [f64; 2],

    pub truck_capacity: f64,
    /// Controller actions per truck activation.
    #[serde(default = "default_truck_speed")]
    pub truck_speed: usize,

    pub disposal_site: [usize; 2],

    /// Skip buildings already targeted by another truck.
    #[serde(default)]
    pub claim_targets: bool,
}

/// Parameters of the trajectory output.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Number of steps between saved snapshots.
    pub steps_per_save: usize,
    /// Number of snapshots written per file.
    pub saves_per_file: usize,
}

fn default_truck_speed() -> usize {
    1
}

impl Config {
    /// Load a [`Config`] from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized,
    /// or if the configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;
        Self::from_toml(&contents)
    }

    /// Parse and validate a [`Config`] from a TOML string.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents).context("failed to deserialize config")?;

        config.validate().context("failed to validate config")?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.model.validate().context("invalid model parameters")?;

        check_num(self.output.steps_per_save, 1..10_000)
            .context("invalid number of steps per save")?;
        check_num(self.output.saves_per_file, 1..10_000)
            .context("invalid number of saves per file")?;

        Ok(())
    }
}

impl ModelConfig {
    pub fn validate(&self) -> Result<()> {
        check_num(self.grid_width, 1..10_000).context("invalid grid width")?;
        check_num(self.grid_height, 1..10_000).context("invalid grid height")?;

        check_num(self.n_buildings, 1..100_000).context("invalid number of buildings")?;
        check_num(self.n_trucks, 0..100_000).context("invalid number of trucks")?;

        // The disposal site keeps its cell; every other agent needs its own.
        let n_cells = self.grid_width * self.grid_height;
        let n_placed = self.n_buildings + self.n_trucks;
        if n_placed >= n_cells {
            bail!("{n_placed} buildings and trucks do not fit on {n_cells} cells");
        }

        check_range(self.building_capacity).context("invalid building capacity range")?;
        check_range(self.generation_rate).context("invalid generation rate range")?;

        check_num(self.truck_capacity, f64::MIN_POSITIVE..f64::MAX)
            .context("invalid truck capacity")?;
        check_num(self.truck_speed, 1..100).context("invalid truck speed")?;

        let [x, y] = self.disposal_site;
        check_num(x, 0..self.grid_width).context("invalid disposal site column")?;
        check_num(y, 0..self.grid_height).context("invalid disposal site row")?;

        Ok(())
    }
}

pub(crate) fn check_num<T, R>(num: T, range: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        bail!("number must be in the range {range:?}, but is {num:?}");
    }
    Ok(())
}

fn check_range([min, max]: [f64; 2]) -> Result<()> {
    check_num(min, f64::MIN_POSITIVE..f64::MAX).context("invalid lower bound")?;
    if max < min {
        bail!("upper bound {max} must not be below lower bound {min}");
    }
    check_num(max, f64::MIN_POSITIVE..f64::MAX).context("invalid upper bound")?;
    Ok(())
}
