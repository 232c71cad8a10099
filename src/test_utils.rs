use crate::config::AgentConfig;
use crate::heuristics::local_search::{LocalSearch, SearchReport, StopReason};
use crate::instance::{CityId, Task, TaskId, Vehicle, VehicleId};
use crate::solution::Solution;
use crate::topology::{City, CityMap, Topology};
use rand_chacha::ChaCha8Rng;
use std::time::Duration;

/// Cities `0..n` on a straight road, one unit apart
pub fn line_map(n: usize) -> CityMap {
    let cities = (0..n).map(|i| City::new(i, &format!("c{}", i), i as f64, 0.0)).collect();
    let roads: Vec<(CityId, CityId)> = (1..n).map(|i| (CityId(i - 1), CityId(i))).collect();
    CityMap::new("line", cities, &roads).unwrap()
}

/// A 3x3 grid of cities, one unit apart, row-major ids
pub fn grid_map() -> CityMap {
    let mut cities = Vec::new();
    let mut roads = Vec::new();
    for row in 0..3 {
        for col in 0..3 {
            let id = row * 3 + col;
            cities.push(City::new(id, &format!("g{}", id), col as f64, row as f64));
            if col > 0 {
                roads.push((CityId(id - 1), CityId(id)));
            }
            if row > 0 {
                roads.push((CityId(id - 3), CityId(id)));
            }
        }
    }
    CityMap::new("grid", cities, &roads).unwrap()
}

pub fn task(id: u64, pickup: usize, delivery: usize, weight: u32) -> Task {
    Task::new(TaskId(id), CityId(pickup), CityId(delivery), weight, 0)
}

pub fn vehicle(id: usize, capacity: u32, location: usize) -> Vehicle {
    Vehicle::new(VehicleId(id), capacity, CityId(location), 1.0)
}

/// Configuration whose outcome does not depend on wall-clock time
pub fn deterministic_config() -> AgentConfig {
    let mut config = AgentConfig::default();
    config.budgets.bid_ms = 600_000;
    config.budgets.plan_ms = 600_000;
    config.search.bid_iterations = 300;
    config.search.plan_iterations = 300;
    config.search.acceptance_probability = 1.0;
    config.search.safety_margin_ms = 0;
    config
}

pub fn generous_budget() -> Duration {
    Duration::from_secs(600)
}

/// Leaves every solution untouched
pub struct Frozen;

impl LocalSearch for Frozen {
    fn improve(
        &self,
        topology: &dyn Topology,
        solution: &mut Solution,
        _budget: Duration,
        _rng: &mut ChaCha8Rng,
    ) -> SearchReport {
        let cost = solution.cost(topology);
        SearchReport {
            iterations: 0,
            initial_cost: cost,
            final_cost: cost,
            stop_reason: StopReason::NothingToMove,
            elapsed: Duration::ZERO,
        }
    }

    fn name(&self) -> &str {
        "Frozen"
    }
}
