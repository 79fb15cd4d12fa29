//! Bounded 2D cell space with multi-occupancy.

use crate::scheduler::AgentId;
use anyhow::{Result, bail};
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Integer cell coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: usize,
    pub y: usize,
}

impl Position {
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    /// Manhattan distance to `other`.
    pub fn distance(&self, other: Position) -> usize {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Occupancy map from cells to the agents standing on them.
///
/// Cells are stored row-major; several agents may share a cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<Vec<AgentId>>,
}

impl Grid {
    pub fn new(width: usize, height: usize) -> Result<Self> {
        if width == 0 || height == 0 {
            bail!("grid dimensions must be positive, but are {width}x{height}");
        }
        Ok(Self {
            width,
            height,
            cells: vec![Vec::new(); width * height],
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn out_of_bounds(&self, x: i64, y: i64) -> bool {
        x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64
    }

    pub fn contains(&self, pos: Position) -> bool {
        pos.x < self.width && pos.y < self.height
    }

    /// Agents occupying `pos` (empty for out-of-bounds cells).
    pub fn cell_contents(&self, pos: Position) -> &[AgentId] {
        if !self.contains(pos) {
            return &[];
        }
        &self.cells[self.index(pos)]
    }

    pub fn is_cell_empty(&self, pos: Position) -> bool {
        self.cell_contents(pos).is_empty()
    }

    /// Whether a truck other than `except` stands on `pos`.
    pub fn has_other_truck(&self, pos: Position, except: AgentId) -> bool {
        self.cell_contents(pos)
            .iter()
            .any(|&agent| agent.is_truck() && agent != except)
    }

    pub fn place_agent(&mut self, agent: AgentId, pos: Position) -> Result<()> {
        if !self.contains(pos) {
            bail!("position {pos} is outside the {}x{} grid", self.width, self.height);
        }
        let idx = self.index(pos);
        self.cells[idx].push(agent);
        Ok(())
    }

    /// Move `agent` from `from` to `to`.
    ///
    /// Both cells must be in bounds and `agent` must be recorded at `from`.
    pub fn move_agent(&mut self, agent: AgentId, from: Position, to: Position) {
        let from_idx = self.index(from);
        if let Some(i_agt) = self.cells[from_idx].iter().position(|&a| a == agent) {
            self.cells[from_idx].swap_remove(i_agt);
        }
        let to_idx = self.index(to);
        self.cells[to_idx].push(agent);
    }

    /// In-bounds neighbors of `pos`, 8-connected if `moore` else 4-connected.
    pub fn neighborhood(&self, pos: Position, moore: bool) -> Vec<Position> {
        let mut neighbors = Vec::with_capacity(8);
        for dy in -1i64..=1 {
            for dx in -1i64..=1 {
                if (dx, dy) == (0, 0) || (!moore && dx != 0 && dy != 0) {
                    continue;
                }
                let x = pos.x as i64 + dx;
                let y = pos.y as i64 + dy;
                if !self.out_of_bounds(x, y) {
                    neighbors.push(Position::new(x as usize, y as usize));
                }
            }
        }
        neighbors
    }

    /// Pick a uniformly random unoccupied cell.
    pub fn find_empty<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Position> {
        let empty: Vec<_> = (0..self.cells.len())
            .filter(|&idx| self.cells[idx].is_empty())
            .collect();
        empty
            .choose(rng)
            .map(|&idx| Position::new(idx % self.width, idx / self.width))
    }

    fn index(&self, pos: Position) -> usize {
        pos.y * self.width + pos.x
    }
}
