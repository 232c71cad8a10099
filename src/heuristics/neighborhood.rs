//! Neighbor generation for the route optimizer.
//!
//! A neighborhood is built around one task currently served by one vehicle:
//! - Relocate: hand the task over to another vehicle, at the front of its route
//! - Reorder: move the task's pickup and delivery anywhere in its own route
//!
//! Every candidate is an independent clone of the input solution.

use crate::instance::{Task, VehicleId};
use crate::solution::{load_profile, RouteEntry, Solution};
use crate::topology::Topology;
use ordered_float::OrderedFloat;

/// Move `task` from `vehicle` to the front of every other vehicle able to carry it
pub fn relocate(solution: &Solution, vehicle: VehicleId, task: &Task) -> Vec<Solution> {
    if !serves(solution, vehicle, task) {
        return Vec::new();
    }

    solution
        .vehicles()
        .filter(|other| other.id != vehicle && other.can_carry(task))
        .map(|other| {
            let mut candidate = solution.clone();
            candidate.remove_task(task.id);
            candidate.add_task(other.id, 0, *task);
            candidate
        })
        .collect()
}

/// Reinsert `task` at every feasible pair of positions of its own route.
///
/// When the route holds nothing but `task`, the only candidate is the
/// unchanged solution.
pub fn reorder(solution: &Solution, vehicle: VehicleId, task: &Task) -> Vec<Solution> {
    if !serves(solution, vehicle, task) {
        return Vec::new();
    }

    let mut without = solution.clone();
    without.remove_task(task.id);

    let remaining = without.get(vehicle);
    if remaining.is_empty() {
        return vec![solution.clone()];
    }

    let capacity = without
        .route(vehicle)
        .map(|r| r.vehicle.capacity)
        .unwrap_or(0);

    let mut candidates = Vec::new();
    for (first, last) in feasible_windows(remaining, task.weight, capacity) {
        for pickup in first..=last {
            for delivery in pickup..=last {
                let mut candidate = without.clone();
                candidate.add_entry(vehicle, pickup, RouteEntry::pickup(*task));
                candidate.add_entry(vehicle, delivery + 1, RouteEntry::delivery(*task));
                candidates.push(candidate);
            }
        }
    }

    candidates
}

/// Relocate and reorder candidates together
pub fn neighbors(solution: &Solution, vehicle: VehicleId, task: &Task) -> Vec<Solution> {
    let mut candidates = relocate(solution, vehicle, task);
    candidates.extend(reorder(solution, vehicle, task));
    candidates
}

/// Insertion windows for a task of `weight` in a route.
///
/// Position `k` (before entry `k`, or at the end when `k == entries.len()`)
/// is usable while the load carried there plus `weight` fits in
/// `capacity`. Returns maximal runs of usable positions as inclusive
/// `(first, last)` ranges. The end of the route is always usable for a
/// task the vehicle can carry, since nothing is on board there.
pub fn feasible_windows(entries: &[RouteEntry], weight: u32, capacity: u32) -> Vec<(usize, usize)> {
    let weight = weight as i64;
    let capacity = capacity as i64;
    let mut windows = Vec::new();
    let mut open: Option<usize> = None;

    for (k, load) in load_profile(entries).into_iter().enumerate() {
        let fits = load + weight <= capacity;
        match (open, fits) {
            (None, true) => open = Some(k),
            (Some(first), false) => {
                windows.push((first, k - 1));
                open = None;
            }
            _ => {}
        }
    }

    if let Some(first) = open {
        windows.push((first, entries.len()));
    }

    windows
}

/// Cheapest candidate; ties go to the shorter longest route, then to the
/// earliest candidate.
pub fn select_best(candidates: Vec<Solution>, topology: &dyn Topology) -> Option<Solution> {
    candidates
        .into_iter()
        .map(|s| {
            let key = (OrderedFloat(s.cost(topology)), s.max_route_len());
            (key, s)
        })
        .min_by_key(|(key, _)| *key)
        .map(|(_, s)| s)
}

fn serves(solution: &Solution, vehicle: VehicleId, task: &Task) -> bool {
    solution.task_vehicle(task.id) == Some(vehicle)
}
