use crate::building::Building;
use crate::disposal::DisposalSite;
use crate::truck::{Truck, TruckState};
use serde::{Deserialize, Serialize};

/// Number of trucks in each controller state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TruckStateCounts {
    pub patrolling: usize,
    pub collecting: usize,
    pub returning: usize,
}

impl TruckStateCounts {
    pub fn count(&self, state: TruckState) -> usize {
        match state {
            TruckState::Patrolling => self.patrolling,
            TruckState::Collecting => self.collecting,
            TruckState::Returning => self.returning,
        }
    }

    pub fn total(&self) -> usize {
        self.patrolling + self.collecting + self.returning
    }
}

/// Aggregate state of the model after a completed step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Number of completed steps.
    pub step: usize,

    pub total_trash_in_buildings: f64,
    pub buildings_awaiting_pickup: usize,
    pub trucks_by_state: TruckStateCounts,

    /// Trash accepted by buildings since the start of the run.
    pub total_generated: f64,
    /// Trash picked up by trucks since the start of the run.
    pub total_collected: f64,
    /// Trash received by the disposal site since the start of the run.
    pub total_disposed: f64,

    /// Mean wait over buildings with an open request, 0 if there are none.
    pub avg_wait_time: f64,
}

impl Snapshot {
    pub fn capture(
        step: usize,
        buildings: &[Building],
        trucks: &[Truck],
        site: &DisposalSite,
    ) -> Self {
        let mut trucks_by_state = TruckStateCounts::default();
        for truck in trucks {
            match truck.state() {
                TruckState::Patrolling => trucks_by_state.patrolling += 1,
                TruckState::Collecting => trucks_by_state.collecting += 1,
                TruckState::Returning => trucks_by_state.returning += 1,
            }
        }

        let waiting: Vec<_> = buildings
            .iter()
            .filter(|bld| bld.pickup_requested())
            .map(|bld| bld.pickup_wait_time())
            .collect();
        let avg_wait_time = if waiting.is_empty() {
            0.0
        } else {
            waiting.iter().sum::<usize>() as f64 / waiting.len() as f64
        };

        Self {
            step,
            total_trash_in_buildings: buildings.iter().map(Building::trash_level).sum(),
            buildings_awaiting_pickup: waiting.len(),
            trucks_by_state,
            total_generated: buildings.iter().map(Building::total_generated).sum(),
            total_collected: trucks.iter().map(Truck::total_collected).sum(),
            total_disposed: site.total_received(),
            avg_wait_time,
        }
    }
}

/// Append-only series of per-step snapshots.
#[derive(Debug, Clone, Default)]
pub struct Collector {
    snapshots: Vec<Snapshot>,
}

impl Collector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, snapshot: Snapshot) {
        self.snapshots.push(snapshot);
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    pub fn latest(&self) -> Option<&Snapshot> {
        self.snapshots.last()
    }
}
