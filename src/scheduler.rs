use crate::building::BuildingId;
use crate::truck::TruckId;
use rand::prelude::*;
use serde::{Deserialize, Serialize};

/// Handle to any stepped agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentId {
    Building(BuildingId),
    Truck(TruckId),
    DisposalSite,
}

impl AgentId {
    pub fn is_truck(&self) -> bool {
        matches!(self, AgentId::Truck(_))
    }
}

/// Activates every registered agent once per step in a freshly shuffled order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RandomActivation {
    agents: Vec<AgentId>,
    steps: usize,
}

impl RandomActivation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, agent: AgentId) {
        self.agents.push(agent);
    }

    pub fn agents(&self) -> &[AgentId] {
        &self.agents
    }

    /// Number of completed steps.
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Draw this step's activation order and count the step as completed.
    pub fn next_order<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Vec<AgentId> {
        let mut order = self.agents.clone();
        order.shuffle(rng);
        self.steps += 1;
        order
    }
}
