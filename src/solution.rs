//! Solution representation and manipulation.
//!
//! A solution maps every vehicle of the fleet to an ordered list of route
//! entries (pickup or delivery events). Solutions are plain values: search
//! code clones before mutating, so candidates never share route lists.

use crate::instance::{CityId, Task, TaskId, Vehicle, VehicleId};
use crate::topology::Topology;
use std::collections::HashMap;
use std::fmt;

/// Role of a route entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stop {
    Pickup,
    Delivery,
}

/// A pickup or delivery event for one task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RouteEntry {
    pub task: Task,
    pub stop: Stop,
}

impl RouteEntry {
    pub fn pickup(task: Task) -> Self {
        RouteEntry { task, stop: Stop::Pickup }
    }

    pub fn delivery(task: Task) -> Self {
        RouteEntry { task, stop: Stop::Delivery }
    }

    #[inline]
    pub fn is_pickup(&self) -> bool {
        self.stop == Stop::Pickup
    }

    #[inline]
    pub fn is_delivery(&self) -> bool {
        self.stop == Stop::Delivery
    }

    /// City where the event takes place
    #[inline]
    pub fn location(&self) -> CityId {
        match self.stop {
            Stop::Pickup => self.task.pickup,
            Stop::Delivery => self.task.delivery,
        }
    }
}

impl fmt::Display for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = if self.is_pickup() { "pick" } else { "deliver" };
        write!(f, "{} {}@{}", verb, self.task.id, self.location().0)
    }
}

/// The ordered route of one vehicle
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleRoute {
    pub vehicle: Vehicle,
    pub entries: Vec<RouteEntry>,
}

impl VehicleRoute {
    pub fn new(vehicle: Vehicle) -> Self {
        VehicleRoute { vehicle, entries: Vec::new() }
    }

    /// Distance from the vehicle's location through every entry
    pub fn cost(&self, topology: &dyn Topology) -> f64 {
        let mut cost = 0.0;
        let mut previous = self.vehicle.location;

        for entry in &self.entries {
            let next = entry.location();
            cost += topology.distance(previous, next);
            previous = next;
        }

        cost
    }

    /// Carried weight before the first entry and after each entry
    pub fn load_profile(&self) -> Vec<i64> {
        load_profile(&self.entries)
    }

    pub fn max_load(&self) -> i64 {
        self.load_profile().into_iter().max().unwrap_or(0)
    }
}

/// Carried weight before the first entry and after each entry of `entries`
pub fn load_profile(entries: &[RouteEntry]) -> Vec<i64> {
    let mut load = 0i64;
    let mut profile = Vec::with_capacity(entries.len() + 1);
    profile.push(load);

    for entry in entries {
        let weight = entry.task.weight as i64;
        if entry.is_pickup() {
            load += weight;
        } else {
            load -= weight;
        }
        profile.push(load);
    }

    profile
}

/// Assignment of route entries to every vehicle of the fleet
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    routes: Vec<VehicleRoute>,
}

impl Solution {
    /// A solution where every vehicle has an empty route
    pub fn empty(vehicles: &[Vehicle]) -> Self {
        Solution {
            routes: vehicles.iter().copied().map(VehicleRoute::new).collect(),
        }
    }

    pub fn routes(&self) -> &[VehicleRoute] {
        &self.routes
    }

    pub fn route(&self, vehicle: VehicleId) -> Option<&VehicleRoute> {
        self.routes.iter().find(|r| r.vehicle.id == vehicle)
    }

    fn route_mut(&mut self, vehicle: VehicleId) -> Option<&mut VehicleRoute> {
        self.routes.iter_mut().find(|r| r.vehicle.id == vehicle)
    }

    /// Entries of a vehicle's route (empty for an unknown vehicle)
    pub fn get(&self, vehicle: VehicleId) -> &[RouteEntry] {
        self.route(vehicle).map(|r| r.entries.as_slice()).unwrap_or(&[])
    }

    pub fn vehicles(&self) -> impl Iterator<Item = &Vehicle> + '_ {
        self.routes.iter().map(|r| &r.vehicle)
    }

    pub fn num_vehicles(&self) -> usize {
        self.routes.len()
    }

    /// Insert one entry at `index` of the vehicle's route.
    ///
    /// Returns false if the vehicle is unknown or the index is past the end.
    pub fn add_entry(&mut self, vehicle: VehicleId, index: usize, entry: RouteEntry) -> bool {
        match self.route_mut(vehicle) {
            Some(route) if index <= route.entries.len() => {
                route.entries.insert(index, entry);
                true
            }
            _ => false,
        }
    }

    /// Insert the pickup of `task` at `index`, immediately followed by its delivery
    pub fn add_task(&mut self, vehicle: VehicleId, index: usize, task: Task) -> bool {
        match self.route_mut(vehicle) {
            Some(route) if index <= route.entries.len() => {
                route.entries.insert(index, RouteEntry::pickup(task));
                route.entries.insert(index + 1, RouteEntry::delivery(task));
                true
            }
            _ => false,
        }
    }

    /// Remove one entry from the vehicle's route
    pub fn remove_entry(&mut self, vehicle: VehicleId, entry: &RouteEntry) -> bool {
        match self.route_mut(vehicle) {
            Some(route) => match route.entries.iter().position(|e| e == entry) {
                Some(pos) => {
                    route.entries.remove(pos);
                    true
                }
                None => false,
            },
            None => false,
        }
    }

    /// Remove both entries of a task, wherever they are
    pub fn remove_task(&mut self, task: TaskId) -> bool {
        let mut removed = false;
        for route in &mut self.routes {
            let before = route.entries.len();
            route.entries.retain(|e| e.task.id != task);
            removed |= route.entries.len() != before;
        }
        removed
    }

    /// Vehicle currently serving `task`
    pub fn task_vehicle(&self, task: TaskId) -> Option<VehicleId> {
        self.routes
            .iter()
            .find(|r| r.entries.iter().any(|e| e.task.id == task))
            .map(|r| r.vehicle.id)
    }

    pub fn contains_task(&self, task: TaskId) -> bool {
        self.task_vehicle(task).is_some()
    }

    /// Every task of the solution, in pickup order
    pub fn tasks(&self) -> Vec<Task> {
        self.routes
            .iter()
            .flat_map(|r| r.entries.iter())
            .filter(|e| e.is_pickup())
            .map(|e| e.task)
            .collect()
    }

    pub fn num_tasks(&self) -> usize {
        self.routes
            .iter()
            .map(|r| r.entries.iter().filter(|e| e.is_pickup()).count())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.iter().all(|r| r.entries.is_empty())
    }

    /// Route cost of one vehicle (0 for an unknown vehicle)
    pub fn vehicle_cost(&self, topology: &dyn Topology, vehicle: VehicleId) -> f64 {
        self.route(vehicle).map(|r| r.cost(topology)).unwrap_or(0.0)
    }

    /// Sum of all route costs
    pub fn cost(&self, topology: &dyn Topology) -> f64 {
        self.routes.iter().map(|r| r.cost(topology)).sum()
    }

    /// Length of the longest route
    pub fn max_route_len(&self) -> usize {
        self.routes.iter().map(|r| r.entries.len()).max().unwrap_or(0)
    }

    /// Check the pairing and capacity invariants.
    ///
    /// Every task has exactly one pickup and one delivery in the same route,
    /// pickup first, and the carried weight stays within `[0, capacity]`.
    pub fn is_feasible(&self) -> bool {
        let mut seen: HashMap<TaskId, VehicleId> = HashMap::new();

        for route in &self.routes {
            let mut open: HashMap<TaskId, bool> = HashMap::new();

            for entry in &route.entries {
                let id = entry.task.id;
                if entry.is_pickup() {
                    if seen.insert(id, route.vehicle.id).is_some() {
                        return false;
                    }
                    open.insert(id, true);
                } else {
                    match open.get_mut(&id) {
                        Some(pending) if *pending => *pending = false,
                        _ => return false,
                    }
                }
            }

            if open.values().any(|&pending| pending) {
                return false;
            }

            let capacity = route.vehicle.capacity as i64;
            if route.load_profile().iter().any(|&load| load < 0 || load > capacity) {
                return false;
            }
        }

        true
    }

    /// Refresh vehicle data (location, capacity) from the host.
    ///
    /// Routes follow their vehicle id; vehicles absent from `self` start
    /// empty. Tasks of vehicles missing from `vehicles` are returned so the
    /// caller can place them again.
    pub fn rebind(&self, vehicles: &[Vehicle]) -> (Solution, Vec<Task>) {
        let routes = vehicles
            .iter()
            .map(|&vehicle| VehicleRoute {
                vehicle,
                entries: self.get(vehicle.id).to_vec(),
            })
            .collect();

        let orphans = self
            .routes
            .iter()
            .filter(|r| !vehicles.iter().any(|v| v.id == r.vehicle.id))
            .flat_map(|r| r.entries.iter())
            .filter(|e| e.is_pickup())
            .map(|e| e.task)
            .collect();

        (Solution { routes }, orphans)
    }
}

impl fmt::Display for Solution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{{")?;
        for route in &self.routes {
            let entries: Vec<String> = route.entries.iter().map(|e| e.to_string()).collect();
            writeln!(f, "  vehicle {}: [{}]", route.vehicle.id.0, entries.join(", "))?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{line_map, task, vehicle};

    #[test]
    fn test_empty_solution_keeps_every_vehicle() {
        let vehicles = [vehicle(0, 10, 0), vehicle(1, 5, 2)];
        let sol = Solution::empty(&vehicles);

        assert_eq!(sol.num_vehicles(), 2);
        assert!(sol.is_empty());
        assert!(sol.get(VehicleId(1)).is_empty());
        assert!(sol.is_feasible());
    }

    #[test]
    fn test_add_and_remove_task() {
        let vehicles = [vehicle(0, 10, 0), vehicle(1, 5, 2)];
        let mut sol = Solution::empty(&vehicles);
        let t1 = task(1, 0, 3, 4);
        let t2 = task(2, 1, 2, 4);

        assert!(sol.add_task(VehicleId(0), 0, t1));
        assert!(sol.add_task(VehicleId(0), 1, t2));
        assert_eq!(
            sol.get(VehicleId(0)),
            &[
                RouteEntry::pickup(t1),
                RouteEntry::pickup(t2),
                RouteEntry::delivery(t2),
                RouteEntry::delivery(t1),
            ]
        );
        assert_eq!(sol.task_vehicle(t2.id), Some(VehicleId(0)));
        assert!(sol.is_feasible());

        assert!(sol.remove_task(t1.id));
        assert!(!sol.contains_task(t1.id));
        assert_eq!(sol.num_tasks(), 1);
        assert!(!sol.remove_task(t1.id));
    }

    #[test]
    fn test_add_entry_rejects_bad_index() {
        let mut sol = Solution::empty(&[vehicle(0, 10, 0)]);
        let t = task(1, 0, 1, 1);
        assert!(!sol.add_entry(VehicleId(0), 1, RouteEntry::pickup(t)));
        assert!(!sol.add_entry(VehicleId(9), 0, RouteEntry::pickup(t)));
        assert!(sol.add_entry(VehicleId(0), 0, RouteEntry::pickup(t)));
        assert!(sol.remove_entry(VehicleId(0), &RouteEntry::pickup(t)));
        assert!(!sol.remove_entry(VehicleId(0), &RouteEntry::delivery(t)));
    }

    #[test]
    fn test_cost_is_sum_of_vehicle_costs() {
        let map = line_map(6);
        let vehicles = [vehicle(0, 10, 0), vehicle(1, 10, 5)];
        let mut sol = Solution::empty(&vehicles);
        sol.add_task(VehicleId(0), 0, task(1, 1, 3, 2));
        sol.add_task(VehicleId(1), 0, task(2, 4, 2, 2));

        // vehicle 0: 0 -> 1 -> 3, vehicle 1: 5 -> 4 -> 2
        assert!((sol.vehicle_cost(&map, VehicleId(0)) - 3.0).abs() < 1e-10);
        assert!((sol.vehicle_cost(&map, VehicleId(1)) - 3.0).abs() < 1e-10);

        let total: f64 = sol.vehicles().map(|v| sol.vehicle_cost(&map, v.id)).sum();
        assert!((sol.cost(&map) - total).abs() < 1e-10);
    }

    #[test]
    fn test_feasibility_detects_violations() {
        let t1 = task(1, 0, 1, 6);
        let t2 = task(2, 0, 1, 6);

        let mut over_capacity = Solution::empty(&[vehicle(0, 10, 0)]);
        over_capacity.add_task(VehicleId(0), 0, t1);
        over_capacity.add_task(VehicleId(0), 1, t2);
        assert!(!over_capacity.is_feasible());

        let mut reversed = Solution::empty(&[vehicle(0, 10, 0)]);
        reversed.add_entry(VehicleId(0), 0, RouteEntry::delivery(t1));
        reversed.add_entry(VehicleId(0), 1, RouteEntry::pickup(t1));
        assert!(!reversed.is_feasible());

        let mut split = Solution::empty(&[vehicle(0, 10, 0), vehicle(1, 10, 0)]);
        split.add_entry(VehicleId(0), 0, RouteEntry::pickup(t1));
        split.add_entry(VehicleId(1), 0, RouteEntry::delivery(t1));
        assert!(!split.is_feasible());
    }

    #[test]
    fn test_clone_does_not_alias() {
        let mut sol = Solution::empty(&[vehicle(0, 10, 0)]);
        sol.add_task(VehicleId(0), 0, task(1, 0, 1, 1));

        let mut copy = sol.clone();
        copy.remove_task(TaskId(1));

        assert_eq!(sol.num_tasks(), 1);
        assert_eq!(copy.num_tasks(), 0);
    }

    #[test]
    fn test_rebind_returns_orphans() {
        let mut sol = Solution::empty(&[vehicle(0, 10, 0), vehicle(1, 10, 0)]);
        sol.add_task(VehicleId(0), 0, task(1, 0, 1, 1));
        sol.add_task(VehicleId(1), 0, task(2, 1, 2, 1));

        let moved = vehicle(0, 10, 3);
        let (rebound, orphans) = sol.rebind(&[moved]);

        assert_eq!(rebound.num_vehicles(), 1);
        assert_eq!(rebound.routes()[0].vehicle.location, CityId(3));
        assert_eq!(rebound.num_tasks(), 1);
        assert_eq!(orphans, vec![task(2, 1, 2, 1)]);
    }
}
