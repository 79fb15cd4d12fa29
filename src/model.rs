use crate::building::{Building, BuildingId};
use crate::config::{ModelConfig, check_num};
use crate::disposal::DisposalSite;
use crate::grid::{Grid, Position};
use crate::metrics::{Collector, Snapshot};
use crate::scheduler::{AgentId, RandomActivation};
use crate::truck::{Surroundings, Truck, TruckId};
use anyhow::{Context, Result};
use rand::prelude::*;
use rand_distr::Uniform;
use serde::{Deserialize, Serialize};

/// The simulated world: grid, agents, scheduler and metrics.
///
/// The in-memory snapshot history is not serialized; a restored model starts
/// a fresh history while its step counter continues.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Model {
    grid: Grid,
    buildings: Vec<Building>,
    trucks: Vec<Truck>,
    site: DisposalSite,

    scheduler: RandomActivation,
    claim_targets: bool,

    #[serde(skip)]
    collector: Collector,
}

impl Model {
    /// Create a model with only the disposal site placed.
    pub fn empty(width: usize, height: usize, site_pos: Position) -> Result<Self> {
        let mut grid = Grid::new(width, height)?;
        grid.place_agent(AgentId::DisposalSite, site_pos)
            .context("failed to place disposal site")?;

        let mut scheduler = RandomActivation::new();
        scheduler.add(AgentId::DisposalSite);

        Ok(Self {
            grid,
            buildings: Vec::new(),
            trucks: Vec::new(),
            site: DisposalSite::new(site_pos),
            scheduler,
            claim_targets: false,
            collector: Collector::new(),
        })
    }

    /// Generate a model with randomly placed and parameterized agents.
    pub fn generate<R: Rng + ?Sized>(cfg: &ModelConfig, rng: &mut R) -> Result<Self> {
        let [x, y] = cfg.disposal_site;
        let mut model = Self::empty(cfg.grid_width, cfg.grid_height, Position::new(x, y))?;
        model.set_claim_targets(cfg.claim_targets);

        let [cap_min, cap_max] = cfg.building_capacity;
        let cap_dist = Uniform::new_inclusive(cap_min, cap_max)?;
        let [rate_min, rate_max] = cfg.generation_rate;
        let rate_dist = Uniform::new_inclusive(rate_min, rate_max)?;

        for i_bld in 0..cfg.n_buildings {
            let pos = model
                .grid
                .find_empty(rng)
                .with_context(|| format!("no empty cell left for building {i_bld}"))?;
            let capacity = cap_dist.sample(rng);
            let rate = rate_dist.sample(rng);
            model.add_building(pos, capacity, rate)?;
        }

        for i_trk in 0..cfg.n_trucks {
            let pos = model
                .grid
                .find_empty(rng)
                .with_context(|| format!("no empty cell left for truck {i_trk}"))?;
            model.add_truck(pos, cfg.truck_capacity, cfg.truck_speed)?;
        }

        log::info!(
            "generated {}x{} grid with {} buildings and {} trucks",
            cfg.grid_width,
            cfg.grid_height,
            cfg.n_buildings,
            cfg.n_trucks
        );

        Ok(model)
    }

    pub fn add_building(
        &mut self,
        pos: Position,
        capacity: f64,
        generation_rate: f64,
    ) -> Result<BuildingId> {
        check_num(capacity, f64::MIN_POSITIVE..f64::MAX).context("invalid building capacity")?;
        check_num(generation_rate, f64::MIN_POSITIVE..f64::MAX)
            .context("invalid generation rate")?;
        let id = BuildingId(self.buildings.len());
        self.grid
            .place_agent(AgentId::Building(id), pos)
            .context("failed to place building")?;
        self.buildings
            .push(Building::new(pos, capacity, generation_rate));
        self.scheduler.add(AgentId::Building(id));
        Ok(id)
    }

    pub fn add_truck(&mut self, pos: Position, capacity: f64, speed: usize) -> Result<TruckId> {
        check_num(capacity, f64::MIN_POSITIVE..f64::MAX).context("invalid truck capacity")?;
        check_num(speed, 1..usize::MAX).context("invalid truck speed")?;
        let id = TruckId(self.trucks.len());
        self.grid
            .place_agent(AgentId::Truck(id), pos)
            .context("failed to place truck")?;
        self.trucks.push(Truck::new(id, pos, capacity, speed));
        self.scheduler.add(AgentId::Truck(id));
        Ok(id)
    }

    pub fn set_claim_targets(&mut self, claim_targets: bool) {
        self.claim_targets = claim_targets;
    }

    /// Advance time by one step.
    ///
    /// Every agent is activated once in an order drawn from `rng`, then one
    /// snapshot is recorded.
    pub fn step<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for agent in self.scheduler.next_order(rng) {
            self.activate(agent, rng);
        }

        let snapshot = Snapshot::capture(
            self.scheduler.steps(),
            &self.buildings,
            &self.trucks,
            &self.site,
        );
        self.collector.push(snapshot);
    }

    /// Run a single agent's step. Ids not registered in this model are skipped.
    pub(crate) fn activate<R: Rng + ?Sized>(&mut self, agent: AgentId, rng: &mut R) {
        match agent {
            AgentId::Building(id) => match self.buildings.get_mut(id.0) {
                Some(building) => building.step(),
                None => log::warn!("skipped unknown building {}", id.0),
            },
            AgentId::DisposalSite => self.site.step(),
            AgentId::Truck(id) => {
                if id.0 >= self.trucks.len() {
                    log::warn!("skipped unknown truck {}", id.0);
                    return;
                }
                let claimed: Vec<_> = if self.claim_targets {
                    self.trucks
                        .iter()
                        .filter(|truck| truck.id() != id)
                        .filter_map(Truck::target)
                        .collect()
                } else {
                    Vec::new()
                };
                let mut env = Surroundings {
                    grid: &mut self.grid,
                    buildings: &mut self.buildings,
                    site: &mut self.site,
                    claimed: &claimed,
                };
                self.trucks[id.0].step(&mut env, rng);
            }
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn buildings(&self) -> &[Building] {
        &self.buildings
    }

    pub fn building(&self, id: BuildingId) -> Option<&Building> {
        self.buildings.get(id.0)
    }

    pub fn trucks(&self) -> &[Truck] {
        &self.trucks
    }

    pub fn truck(&self, id: TruckId) -> Option<&Truck> {
        self.trucks.get(id.0)
    }

    pub fn disposal_site(&self) -> &DisposalSite {
        &self.site
    }

    /// Agents in registration order.
    pub fn agents(&self) -> &[AgentId] {
        self.scheduler.agents()
    }

    /// Number of completed steps.
    pub fn steps(&self) -> usize {
        self.scheduler.steps()
    }

    /// Snapshots recorded since the model was created or restored.
    pub fn snapshots(&self) -> &[Snapshot] {
        self.collector.snapshots()
    }

    pub fn latest_snapshot(&self) -> Option<&Snapshot> {
        self.collector.latest()
    }

    #[cfg(test)]
    pub(crate) fn truck_mut(&mut self, id: TruckId) -> &mut Truck {
        &mut self.trucks[id.0]
    }

    #[cfg(test)]
    pub(crate) fn building_mut(&mut self, id: BuildingId) -> &mut Building {
        &mut self.buildings[id.0]
    }
}
