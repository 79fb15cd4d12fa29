//! Truck agents: patrol/collect/return controller and greedy grid movement.
//!
//! # Target selection
//!
//! A patrolling truck picks, among buildings requesting a pickup, the one
//! nearest by Manhattan distance; ties go to the lowest [`BuildingId`]. With
//! target claiming enabled, buildings already targeted by another truck are
//! skipped.
//!
//! # Stale targets
//!
//! A collecting truck keeps chasing its target until arrival even if the
//! building's request clears meanwhile. If there is nothing to collect on
//! arrival, the truck drops the target and patrols again.
//!
//! # Movement
//!
//! One cell per action. The primary move reduces the larger axis offset
//! (vertical on ties), the secondary move reduces the other offset. A move into
//! a cell holding another truck is blocked, except into the destination cell
//! itself. If both moves are blocked the truck holds for this action. This
//! avoidance is local: it breaks single-step standoffs but gives no global
//! deadlock-freedom under dense occupancy.

use crate::building::{Building, BuildingId};
use crate::disposal::DisposalSite;
use crate::grid::{Grid, Position};
use crate::scheduler::AgentId;
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a truck in the model's truck registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TruckId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TruckState {
    Patrolling,
    Collecting,
    Returning,
}

impl fmt::Display for TruckState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TruckState::Patrolling => "patrolling",
            TruckState::Collecting => "collecting",
            TruckState::Returning => "returning",
        };
        f.write_str(name)
    }
}

/// The parts of the world a truck reads and mutates during its activation.
pub struct Surroundings<'a> {
    pub grid: &'a mut Grid,
    pub buildings: &'a mut [Building],
    pub site: &'a mut DisposalSite,

    /// Buildings targeted by other trucks; skipped during target selection.
    pub claimed: &'a [BuildingId],
}

/// Mobile collector agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Truck {
    id: TruckId,
    pos: Position,
    capacity: f64,
    speed: usize,

    current_load: f64,
    state: TruckState,
    target: Option<BuildingId>,

    total_collected: f64,
    trips_made: usize,
    distance_traveled: usize,
    blocked_steps: usize,
}

impl Truck {
    pub fn new(id: TruckId, pos: Position, capacity: f64, speed: usize) -> Self {
        Self {
            id,
            pos,
            capacity,
            speed,
            current_load: 0.0,
            state: TruckState::Patrolling,
            target: None,
            total_collected: 0.0,
            trips_made: 0,
            distance_traveled: 0,
            blocked_steps: 0,
        }
    }

    /// Run `speed` controller actions.
    pub fn step<R: Rng + ?Sized>(&mut self, env: &mut Surroundings, rng: &mut R) {
        for _ in 0..self.speed {
            self.act(env, rng);
        }
    }

    fn act<R: Rng + ?Sized>(&mut self, env: &mut Surroundings, rng: &mut R) {
        if self.current_load >= self.capacity && self.state != TruckState::Returning {
            log::debug!("truck {} is full, returning", self.id.0);
            self.begin_return();
        }

        match self.state {
            TruckState::Patrolling => self.patrol(env, rng),
            TruckState::Collecting => self.collect(env),
            TruckState::Returning => self.return_to_site(env),
        }
    }

    fn patrol<R: Rng + ?Sized>(&mut self, env: &mut Surroundings, rng: &mut R) {
        let pos = self.pos;
        let nearest = env
            .buildings
            .iter()
            .enumerate()
            .filter(|(i_bld, bld)| {
                bld.pickup_requested() && !env.claimed.contains(&BuildingId(*i_bld))
            })
            .min_by_key(|(i_bld, bld)| (pos.distance(bld.pos()), *i_bld))
            .map(|(i_bld, _)| BuildingId(i_bld));

        match nearest {
            Some(target) => {
                log::debug!("truck {} targets building {}", self.id.0, target.0);
                self.target = Some(target);
                self.state = TruckState::Collecting;
            }
            None => self.wander(env.grid, rng),
        }
    }

    fn collect(&mut self, env: &mut Surroundings) {
        let Some(target) = self.target else {
            self.abandon_target();
            return;
        };
        let Some(building) = env.buildings.get_mut(target.0) else {
            log::debug!("truck {} lost building {}", self.id.0, target.0);
            self.abandon_target();
            return;
        };

        let dest = building.pos();
        if self.pos != dest {
            self.move_towards(dest, env.grid);
            return;
        }

        let amount = building.offer_pickup(self.capacity - self.current_load);
        if amount <= 0.0 {
            log::debug!("truck {} found building {} empty", self.id.0, target.0);
            self.abandon_target();
            return;
        }

        self.current_load = (self.current_load + amount).min(self.capacity);
        self.total_collected += amount;

        if self.current_load >= self.capacity || building.trash_level() <= 0.0 {
            log::debug!(
                "truck {} collected {amount:.2} from building {}, returning",
                self.id.0,
                target.0
            );
            self.begin_return();
        }
    }

    fn return_to_site(&mut self, env: &mut Surroundings) {
        let dest = env.site.pos();
        if self.pos != dest {
            self.move_towards(dest, env.grid);
            return;
        }

        env.site.receive(self.current_load);
        log::debug!("truck {} disposed {:.2}", self.id.0, self.current_load);
        self.current_load = 0.0;
        self.trips_made += 1;
        self.state = TruckState::Patrolling;
    }

    fn begin_return(&mut self) {
        self.target = None;
        self.state = TruckState::Returning;
    }

    fn abandon_target(&mut self) {
        self.target = None;
        self.state = TruckState::Patrolling;
    }

    /// Take one greedy step towards `dest`, stepping around blocking trucks.
    fn move_towards(&mut self, dest: Position, grid: &mut Grid) {
        let dx = dest.x as i64 - self.pos.x as i64;
        let dy = dest.y as i64 - self.pos.y as i64;
        let step_x = (dx.signum(), 0);
        let step_y = (0, dy.signum());

        let (primary, secondary) = if dx.abs() > dy.abs() {
            (step_x, step_y)
        } else {
            (step_y, step_x)
        };

        for (sx, sy) in [primary, secondary] {
            if (sx, sy) == (0, 0) {
                continue;
            }
            let next = Position::new(
                (self.pos.x as i64 + sx) as usize,
                (self.pos.y as i64 + sy) as usize,
            );
            if next == dest || !grid.has_other_truck(next, self.agent_id()) {
                self.relocate(next, grid);
                return;
            }
        }

        log::trace!("truck {} held at {} towards {dest}", self.id.0, self.pos);
        self.blocked_steps += 1;
    }

    /// Move to a random adjacent cell free of trucks, or hold if there is none.
    fn wander<R: Rng + ?Sized>(&mut self, grid: &mut Grid, rng: &mut R) {
        let free: Vec<_> = grid
            .neighborhood(self.pos, true)
            .into_iter()
            .filter(|&pos| !grid.has_other_truck(pos, self.agent_id()))
            .collect();

        match free.choose(rng) {
            Some(&next) => self.relocate(next, grid),
            None => {
                log::trace!("truck {} boxed in at {}", self.id.0, self.pos);
                self.blocked_steps += 1;
            }
        }
    }

    fn relocate(&mut self, next: Position, grid: &mut Grid) {
        grid.move_agent(self.agent_id(), self.pos, next);
        self.pos = next;
        self.distance_traveled += 1;
    }

    fn agent_id(&self) -> AgentId {
        AgentId::Truck(self.id)
    }

    pub fn id(&self) -> TruckId {
        self.id
    }

    pub fn pos(&self) -> Position {
        self.pos
    }

    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    pub fn speed(&self) -> usize {
        self.speed
    }

    pub fn current_load(&self) -> f64 {
        self.current_load
    }

    pub fn state(&self) -> TruckState {
        self.state
    }

    pub fn target(&self) -> Option<BuildingId> {
        self.target
    }

    pub fn total_collected(&self) -> f64 {
        self.total_collected
    }

    pub fn trips_made(&self) -> usize {
        self.trips_made
    }

    pub fn distance_traveled(&self) -> usize {
        self.distance_traveled
    }

    /// Actions in which the truck wanted to move but could not.
    pub fn blocked_steps(&self) -> usize {
        self.blocked_steps
    }

    #[cfg(test)]
    pub(crate) fn set_cargo(&mut self, load: f64, state: TruckState, target: Option<BuildingId>) {
        self.current_load = load;
        self.state = state;
        self.target = target;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::ChaCha12Rng;

    struct World {
        grid: Grid,
        buildings: Vec<Building>,
        site: DisposalSite,
        trucks: Vec<Truck>,
    }

    impl World {
        fn new(width: usize, height: usize, site: Position) -> Self {
            let mut grid = Grid::new(width, height).unwrap();
            grid.place_agent(AgentId::DisposalSite, site).unwrap();
            Self {
                grid,
                buildings: Vec::new(),
                site: DisposalSite::new(site),
                trucks: Vec::new(),
            }
        }

        fn add_building(&mut self, pos: Position, capacity: f64, level: f64) -> BuildingId {
            let id = BuildingId(self.buildings.len());
            let mut building = Building::new(pos, capacity, level);
            building.step();
            self.grid.place_agent(AgentId::Building(id), pos).unwrap();
            self.buildings.push(building);
            id
        }

        fn add_truck(&mut self, pos: Position, capacity: f64) -> TruckId {
            let id = TruckId(self.trucks.len());
            self.grid.place_agent(AgentId::Truck(id), pos).unwrap();
            self.trucks.push(Truck::new(id, pos, capacity, 1));
            id
        }

        fn step_truck(&mut self, id: TruckId, rng: &mut ChaCha12Rng) {
            let mut env = Surroundings {
                grid: &mut self.grid,
                buildings: &mut self.buildings,
                site: &mut self.site,
                claimed: &[],
            };
            self.trucks[id.0].step(&mut env, rng);
        }
    }

    #[test]
    fn nearest_request_wins_with_index_tie_break() {
        let mut world = World::new(9, 9, Position::new(0, 0));
        world.add_building(Position::new(8, 4), 10.0, 9.0);
        let near_a = world.add_building(Position::new(4, 2), 10.0, 9.0);
        world.add_building(Position::new(4, 6), 10.0, 9.0);
        world.add_building(Position::new(5, 4), 10.0, 1.0);
        let truck = world.add_truck(Position::new(4, 4), 5.0);
        let mut rng = ChaCha12Rng::seed_from_u64(0);

        world.step_truck(truck, &mut rng);

        let truck = &world.trucks[truck.0];
        assert_eq!(truck.state(), TruckState::Collecting);
        assert_eq!(truck.target(), Some(near_a));
        assert_eq!(truck.pos(), Position::new(4, 4));
    }

    #[test]
    fn collects_partial_load_and_returns() {
        let mut world = World::new(10, 10, Position::new(0, 0));
        let building = world.add_building(Position::new(5, 5), 10.0, 10.0);
        let truck = world.add_truck(Position::new(5, 1), 5.0);
        let mut rng = ChaCha12Rng::seed_from_u64(0);

        // Select the target, then four moves, then the pickup.
        for _ in 0..5 {
            world.step_truck(truck, &mut rng);
        }
        assert_eq!(world.trucks[truck.0].pos(), Position::new(5, 5));
        assert_eq!(world.trucks[truck.0].current_load(), 0.0);

        world.step_truck(truck, &mut rng);
        let t = &world.trucks[truck.0];
        assert_eq!(t.current_load(), 5.0);
        assert_eq!(world.buildings[building.0].trash_level(), 5.0);
        assert_eq!(t.state(), TruckState::Returning);
        assert_eq!(t.target(), None);
    }

    #[test]
    fn draining_a_building_sends_truck_home() {
        let mut world = World::new(4, 4, Position::new(0, 0));
        world.add_building(Position::new(2, 2), 10.0, 9.0);
        let truck = world.add_truck(Position::new(2, 2), 50.0);
        let mut rng = ChaCha12Rng::seed_from_u64(0);

        world.step_truck(truck, &mut rng);
        world.step_truck(truck, &mut rng);

        let t = &world.trucks[truck.0];
        assert_eq!(t.current_load(), 9.0);
        assert_eq!(t.state(), TruckState::Returning);
    }

    #[test]
    fn empty_target_on_arrival_falls_back_to_patrol() {
        let mut world = World::new(4, 4, Position::new(0, 0));
        let building = world.add_building(Position::new(2, 2), 10.0, 9.0);
        let truck = world.add_truck(Position::new(2, 2), 50.0);
        let mut rng = ChaCha12Rng::seed_from_u64(0);

        world.trucks[truck.0].set_cargo(0.0, TruckState::Collecting, Some(building));
        world.buildings[building.0].offer_pickup(100.0);
        world.step_truck(truck, &mut rng);

        let t = &world.trucks[truck.0];
        assert_eq!(t.state(), TruckState::Patrolling);
        assert_eq!(t.target(), None);
        assert_eq!(t.current_load(), 0.0);
    }

    #[test]
    fn missing_target_falls_back_to_patrol() {
        let mut world = World::new(4, 4, Position::new(0, 0));
        let truck = world.add_truck(Position::new(2, 2), 50.0);
        let mut rng = ChaCha12Rng::seed_from_u64(0);

        world.trucks[truck.0].set_cargo(0.0, TruckState::Collecting, Some(BuildingId(7)));
        world.step_truck(truck, &mut rng);

        assert_eq!(world.trucks[truck.0].state(), TruckState::Patrolling);
        assert_eq!(world.trucks[truck.0].target(), None);
    }

    #[test]
    fn full_truck_returns_without_collecting() {
        let mut world = World::new(6, 6, Position::new(0, 0));
        let building = world.add_building(Position::new(3, 3), 10.0, 9.0);
        let truck = world.add_truck(Position::new(3, 3), 5.0);
        let mut rng = ChaCha12Rng::seed_from_u64(0);

        world.trucks[truck.0].set_cargo(5.0, TruckState::Collecting, Some(building));
        world.step_truck(truck, &mut rng);

        let t = &world.trucks[truck.0];
        assert_eq!(t.state(), TruckState::Returning);
        assert_eq!(t.target(), None);
        assert_eq!(world.buildings[building.0].trash_level(), 9.0);
        assert_eq!(t.pos().distance(Position::new(0, 0)), 5);
    }

    #[test]
    fn disposes_in_place_on_single_cell_grid() {
        let mut world = World::new(1, 1, Position::new(0, 0));
        let truck = world.add_truck(Position::new(0, 0), 5.0);
        let mut rng = ChaCha12Rng::seed_from_u64(0);

        world.trucks[truck.0].set_cargo(4.0, TruckState::Returning, None);
        world.step_truck(truck, &mut rng);

        let t = &world.trucks[truck.0];
        assert_eq!(t.state(), TruckState::Patrolling);
        assert_eq!(t.current_load(), 0.0);
        assert_eq!(t.trips_made(), 1);
        assert_eq!(t.distance_traveled(), 0);
        assert_eq!(world.site.total_received(), 4.0);
    }

    #[test]
    fn return_trip_takes_manhattan_distance() {
        let mut world = World::new(8, 8, Position::new(1, 1));
        let truck = world.add_truck(Position::new(6, 4), 5.0);
        let mut rng = ChaCha12Rng::seed_from_u64(0);

        world.trucks[truck.0].set_cargo(5.0, TruckState::Returning, None);
        for _ in 0..8 {
            world.step_truck(truck, &mut rng);
        }
        assert_eq!(world.trucks[truck.0].pos(), Position::new(1, 1));
        assert_eq!(world.trucks[truck.0].state(), TruckState::Returning);

        world.step_truck(truck, &mut rng);
        assert_eq!(world.trucks[truck.0].state(), TruckState::Patrolling);
        assert_eq!(world.site.total_received(), 5.0);
    }

    #[test]
    fn steps_around_blocking_truck() {
        let mut world = World::new(8, 8, Position::new(0, 0));
        let mover = world.add_truck(Position::new(5, 1), 5.0);
        world.add_truck(Position::new(4, 1), 5.0);
        let mut rng = ChaCha12Rng::seed_from_u64(0);

        world.trucks[mover.0].set_cargo(5.0, TruckState::Returning, None);
        world.step_truck(mover, &mut rng);

        let t = &world.trucks[mover.0];
        assert_eq!(t.pos(), Position::new(5, 0));
        assert_eq!(t.blocked_steps(), 0);
    }

    #[test]
    fn equal_offsets_move_vertically_first() {
        let mut world = World::new(6, 6, Position::new(1, 1));
        let mover = world.add_truck(Position::new(3, 3), 5.0);
        let mut rng = ChaCha12Rng::seed_from_u64(0);

        world.trucks[mover.0].set_cargo(5.0, TruckState::Returning, None);
        world.step_truck(mover, &mut rng);

        assert_eq!(world.trucks[mover.0].pos(), Position::new(3, 2));
    }

    #[test]
    fn equal_offsets_step_horizontally_when_vertical_blocked() {
        let mut world = World::new(6, 6, Position::new(1, 1));
        let mover = world.add_truck(Position::new(3, 3), 5.0);
        world.add_truck(Position::new(3, 2), 5.0);
        let mut rng = ChaCha12Rng::seed_from_u64(0);

        world.trucks[mover.0].set_cargo(5.0, TruckState::Returning, None);
        world.step_truck(mover, &mut rng);

        let t = &world.trucks[mover.0];
        assert_eq!(t.pos(), Position::new(2, 3));
        assert_eq!(t.blocked_steps(), 0);
    }

    #[test]
    fn holds_when_both_moves_blocked() {
        let mut world = World::new(8, 8, Position::new(0, 0));
        let mover = world.add_truck(Position::new(3, 3), 5.0);
        world.add_truck(Position::new(2, 3), 5.0);
        world.add_truck(Position::new(3, 2), 5.0);
        let mut rng = ChaCha12Rng::seed_from_u64(0);

        world.trucks[mover.0].set_cargo(5.0, TruckState::Returning, None);
        world.step_truck(mover, &mut rng);

        let t = &world.trucks[mover.0];
        assert_eq!(t.pos(), Position::new(3, 3));
        assert_eq!(t.blocked_steps(), 1);
        assert_eq!(t.state(), TruckState::Returning);
    }

    #[test]
    fn holds_when_aligned_and_blocked() {
        let mut world = World::new(8, 8, Position::new(0, 0));
        let mover = world.add_truck(Position::new(3, 0), 5.0);
        world.add_truck(Position::new(2, 0), 5.0);
        let mut rng = ChaCha12Rng::seed_from_u64(0);

        world.trucks[mover.0].set_cargo(5.0, TruckState::Returning, None);
        world.step_truck(mover, &mut rng);

        assert_eq!(world.trucks[mover.0].pos(), Position::new(3, 0));
    }

    #[test]
    fn destination_cell_is_never_blocked() {
        let mut world = World::new(4, 4, Position::new(0, 0));
        let mover = world.add_truck(Position::new(1, 0), 5.0);
        world.add_truck(Position::new(0, 0), 5.0);
        let mut rng = ChaCha12Rng::seed_from_u64(0);

        world.trucks[mover.0].set_cargo(5.0, TruckState::Returning, None);
        world.step_truck(mover, &mut rng);

        assert_eq!(world.trucks[mover.0].pos(), Position::new(0, 0));
        assert_eq!(world.grid.cell_contents(Position::new(0, 0)).len(), 3);
    }

    #[test]
    fn wandering_avoids_trucks() {
        let mut world = World::new(3, 3, Position::new(0, 0));
        let wanderer = world.add_truck(Position::new(1, 1), 5.0);
        for pos in world.grid.neighborhood(Position::new(1, 1), true) {
            if pos != Position::new(2, 2) {
                world.add_truck(pos, 5.0);
            }
        }
        let mut rng = ChaCha12Rng::seed_from_u64(9);

        world.step_truck(wanderer, &mut rng);
        assert_eq!(world.trucks[wanderer.0].pos(), Position::new(2, 2));
        assert_eq!(world.trucks[wanderer.0].state(), TruckState::Patrolling);
    }

    #[test]
    fn claimed_buildings_are_skipped() {
        let mut world = World::new(6, 6, Position::new(0, 0));
        let near = world.add_building(Position::new(2, 2), 10.0, 9.0);
        let far = world.add_building(Position::new(5, 5), 10.0, 9.0);
        let truck = world.add_truck(Position::new(1, 1), 5.0);
        let mut rng = ChaCha12Rng::seed_from_u64(0);

        let claimed = [near];
        let mut env = Surroundings {
            grid: &mut world.grid,
            buildings: &mut world.buildings,
            site: &mut world.site,
            claimed: &claimed,
        };
        world.trucks[truck.0].step(&mut env, &mut rng);

        assert_eq!(world.trucks[truck.0].target(), Some(far));
    }
}
