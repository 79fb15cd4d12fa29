use crate::grid::Position;
use serde::{Deserialize, Serialize};

/// Unbounded sink for collected trash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisposalSite {
    pos: Position,
    total_received: f64,
}

impl DisposalSite {
    pub fn new(pos: Position) -> Self {
        Self {
            pos,
            total_received: 0.0,
        }
    }

    /// The site has no behavior of its own.
    pub fn step(&mut self) {}

    /// Accept `amount` unconditionally.
    pub fn receive(&mut self, amount: f64) -> bool {
        self.total_received += amount;
        true
    }

    pub fn pos(&self) -> Position {
        self.pos
    }

    pub fn total_received(&self) -> f64 {
        self.total_received
    }
}
