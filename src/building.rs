use crate::grid::Position;
use serde::{Deserialize, Serialize};

/// Fraction of capacity above which a building requests a pickup.
pub const PICKUP_THRESHOLD: f64 = 0.8;

/// Index of a building in the model's building registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuildingId(pub usize);

/// Stationary agent that accumulates trash and requests pickups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Building {
    pos: Position,
    capacity: f64,
    generation_rate: f64,

    trash_level: f64,
    pickup_requested: bool,

    total_generated: f64,
    pickup_wait_time: usize,
}

impl Building {
    pub fn new(pos: Position, capacity: f64, generation_rate: f64) -> Self {
        Self {
            pos,
            capacity,
            generation_rate,
            trash_level: 0.0,
            pickup_requested: false,
            total_generated: 0.0,
            pickup_wait_time: 0,
        }
    }

    /// Generate trash for one step.
    ///
    /// Generation beyond capacity is discarded. The pickup request is
    /// recomputed from the new level, and the wait counter advances while a
    /// request is open.
    pub fn step(&mut self) {
        let generated = self.generation_rate.min(self.capacity - self.trash_level);
        self.trash_level += generated;
        self.total_generated += generated;

        self.update_request();
        if self.pickup_requested {
            self.pickup_wait_time += 1;
        }
    }

    /// Hand over up to `requested_amount` of trash and return what was removed.
    pub fn offer_pickup(&mut self, requested_amount: f64) -> f64 {
        let amount = requested_amount.min(self.trash_level).max(0.0);
        self.trash_level -= amount;
        self.update_request();
        amount
    }

    fn update_request(&mut self) {
        self.pickup_requested = self.trash_level > PICKUP_THRESHOLD * self.capacity;
        if !self.pickup_requested {
            self.pickup_wait_time = 0;
        }
    }

    pub fn pos(&self) -> Position {
        self.pos
    }

    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    pub fn generation_rate(&self) -> f64 {
        self.generation_rate
    }

    pub fn trash_level(&self) -> f64 {
        self.trash_level
    }

    pub fn pickup_requested(&self) -> bool {
        self.pickup_requested
    }

    /// Trash accepted since creation, excluding discarded overflow.
    pub fn total_generated(&self) -> f64 {
        self.total_generated
    }

    /// Steps the current pickup request has been open.
    pub fn pickup_wait_time(&self) -> usize {
        self.pickup_wait_time
    }
}
