use crate::instance::{Task, TaskId, Vehicle, VehicleId};
use crate::solution::Solution;
use crate::topology::Topology;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

/// Builds a starting solution for a task set.
///
/// Returns `None` when the task set cannot be served by the fleet.
pub trait ConstructionHeuristic {
    fn construct(&self, vehicles: &[Vehicle], tasks: &[Task], topology: &dyn Topology) -> Option<Solution>;
    fn name(&self) -> &str;
}

/// Selectable construction heuristics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstructionKind {
    LargestVehicle,
    GreedyInsertion,
}

impl ConstructionKind {
    pub fn construct(&self, vehicles: &[Vehicle], tasks: &[Task], topology: &dyn Topology) -> Option<Solution> {
        match self {
            ConstructionKind::LargestVehicle => LargestVehicleConstruction.construct(vehicles, tasks, topology),
            ConstructionKind::GreedyInsertion => GreedyInsertionConstruction.construct(vehicles, tasks, topology),
        }
    }
}

/// Every task goes to the vehicle with the greatest capacity, each pickup
/// directly followed by its delivery, so the vehicle never carries more
/// than one task at a time.
#[derive(Debug, Clone, Copy, Default)]
pub struct LargestVehicleConstruction;

impl LargestVehicleConstruction {
    fn largest(vehicles: &[Vehicle]) -> Option<&Vehicle> {
        // first of the largest wins ties
        vehicles
            .iter()
            .rev()
            .max_by_key(|v| v.capacity)
    }
}

impl ConstructionHeuristic for LargestVehicleConstruction {
    fn construct(&self, vehicles: &[Vehicle], tasks: &[Task], _topology: &dyn Topology) -> Option<Solution> {
        let mut solution = Solution::empty(vehicles);
        if tasks.is_empty() {
            return Some(solution);
        }

        let biggest = Self::largest(vehicles)?;
        let mut index = 0;

        for task in tasks {
            if !biggest.can_carry(task) {
                log::warn!(
                    "{} exceeds the largest capacity {}, no solution",
                    task, biggest.capacity
                );
                return None;
            }
            solution.add_task(biggest.id, index, *task);
            index += 2;
        }

        Some(solution)
    }

    fn name(&self) -> &str {
        "LargestVehicle"
    }
}

/// Tasks are inserted one at a time at their cheapest feasible position
#[derive(Debug, Clone, Copy, Default)]
pub struct GreedyInsertionConstruction;

impl ConstructionHeuristic for GreedyInsertionConstruction {
    fn construct(&self, vehicles: &[Vehicle], tasks: &[Task], topology: &dyn Topology) -> Option<Solution> {
        let mut solution = Solution::empty(vehicles);

        for task in tasks {
            let (vehicle, index, _) = best_insertion(&solution, task, topology)?;
            solution.add_task(vehicle, index, *task);
        }

        Some(solution)
    }

    fn name(&self) -> &str {
        "GreedyInsertion"
    }
}

/// Cheapest position for inserting `task` as an adjacent pickup/delivery
/// pair, as `(vehicle, index, cost increase)`.
///
/// Only positions where the pair fits on top of the load already carried
/// are considered. Runs in O(vehicles x route length).
pub fn best_insertion(solution: &Solution, task: &Task, topology: &dyn Topology) -> Option<(VehicleId, usize, f64)> {
    let mut best: Option<(VehicleId, usize, f64)> = None;
    let weight = task.weight as i64;

    for route in solution.routes() {
        if !route.vehicle.can_carry(task) {
            continue;
        }

        let capacity = route.vehicle.capacity as i64;
        let profile = route.load_profile();
        let base = topology.distance(task.pickup, task.delivery);

        for (i, &load) in profile.iter().enumerate() {
            if load + weight > capacity {
                continue;
            }

            let previous = if i == 0 {
                route.vehicle.location
            } else {
                route.entries[i - 1].location()
            };

            let mut delta = topology.distance(previous, task.pickup) + base;
            if let Some(next) = route.entries.get(i) {
                let next = next.location();
                delta += topology.distance(task.delivery, next) - topology.distance(previous, next);
            }

            if best.map_or(true, |(_, _, cost)| OrderedFloat(delta) < OrderedFloat(cost)) {
                best = Some((route.vehicle.id, i, delta));
            }
        }
    }

    best
}

/// Greedy estimator for "with": `solution` plus `task` at its cheapest position
pub fn greedy_insert(solution: &Solution, task: &Task, topology: &dyn Topology) -> Option<Solution> {
    let (vehicle, index, _) = best_insertion(solution, task, topology)?;
    let mut result = solution.clone();
    result.add_task(vehicle, index, *task);
    Some(result)
}

/// Greedy estimator for "without": `solution` with `task` taken out.
///
/// Removing a pickup/delivery pair never breaks feasibility.
pub fn greedy_remove(solution: &Solution, task: TaskId) -> Solution {
    let mut result = solution.clone();
    result.remove_task(task);
    result
}
