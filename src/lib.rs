//! Agent-based model of waste generation and collection on a grid.
//!
//! Buildings accumulate trash and request pickups; trucks patrol, collect and
//! unload at a disposal site. [`Model::step`] activates every agent once in a
//! random order and records a [`Snapshot`]; [`Engine`] adds seeding,
//! trajectory output and checkpoints on top.

pub mod analysis;
pub mod building;
pub mod config;
pub mod disposal;
pub mod engine;
pub mod grid;
pub mod manager;
pub mod metrics;
pub mod model;
pub mod scheduler;
pub mod stats;
pub mod truck;

pub use building::{Building, BuildingId};
pub use config::{Config, ModelConfig, OutputConfig};
pub use disposal::DisposalSite;
pub use engine::Engine;
pub use grid::{Grid, Position};
pub use metrics::{Snapshot, TruckStateCounts};
pub use model::Model;
pub use scheduler::{AgentId, RandomActivation};
pub use truck::{Truck, TruckId, TruckState};
