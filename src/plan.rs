//! Per-vehicle action sequences handed back to the host.

use crate::instance::{CityId, TaskId, VehicleId};
use crate::solution::{Solution, Stop, VehicleRoute};
use crate::topology::Topology;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Action {
    /// Drive along one road to a neighboring city
    Move(CityId),
    Pickup(TaskId),
    Delivery(TaskId),
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Move(city) => write!(f, "move {}", city.0),
            Action::Pickup(task) => write!(f, "pickup {}", task),
            Action::Delivery(task) => write!(f, "deliver {}", task),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plan {
    pub vehicle: VehicleId,
    pub start: CityId,
    pub actions: Vec<Action>,
}

impl Plan {
    /// Expand a route into moves along shortest paths
    pub fn from_route(route: &VehicleRoute, topology: &dyn Topology) -> Self {
        let mut actions = Vec::new();
        let mut current = route.vehicle.location;

        for entry in &route.entries {
            let target = entry.location();
            actions.extend(topology.path(current, target).into_iter().map(Action::Move));
            current = target;

            actions.push(match entry.stop {
                Stop::Pickup => Action::Pickup(entry.task.id),
                Stop::Delivery => Action::Delivery(entry.task.id),
            });
        }

        Plan {
            vehicle: route.vehicle.id,
            start: route.vehicle.location,
            actions,
        }
    }

    /// One plan per vehicle, in fleet order
    pub fn from_solution(solution: &Solution, topology: &dyn Topology) -> Vec<Plan> {
        solution
            .routes()
            .iter()
            .map(|route| Self::from_route(route, topology))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn moves(&self) -> impl Iterator<Item = CityId> + '_ {
        self.actions.iter().filter_map(|a| match a {
            Action::Move(city) => Some(*city),
            _ => None,
        })
    }

    /// Length of the driven roads
    pub fn total_distance(&self, topology: &dyn Topology) -> f64 {
        let mut current = self.start;
        let mut total = 0.0;
        for city in self.moves() {
            total += topology.distance(current, city);
            current = city;
        }
        total
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let actions: Vec<String> = self.actions.iter().map(|a| a.to_string()).collect();
        write!(
            f,
            "vehicle {} from {}: [{}]",
            self.vehicle.0,
            self.start.0,
            actions.join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{line_map, task, vehicle};

    #[test]
    fn test_route_expands_into_moves() {
        let map = line_map(5);
        let vehicles = [vehicle(0, 10, 2)];
        let mut sol = Solution::empty(&vehicles);
        let t = task(7, 0, 4, 3);
        sol.add_task(VehicleId(0), 0, t);

        let plans = Plan::from_solution(&sol, &map);
        assert_eq!(plans.len(), 1);
        assert_eq!(
            plans[0].actions,
            vec![
                Action::Move(CityId(1)),
                Action::Move(CityId(0)),
                Action::Pickup(TaskId(7)),
                Action::Move(CityId(1)),
                Action::Move(CityId(2)),
                Action::Move(CityId(3)),
                Action::Move(CityId(4)),
                Action::Delivery(TaskId(7)),
            ]
        );
        assert!((plans[0].total_distance(&map) - sol.cost(&map)).abs() < 1e-9);
    }

    #[test]
    fn test_same_city_needs_no_move() {
        let map = line_map(3);
        let mut sol = Solution::empty(&[vehicle(0, 10, 1)]);
        sol.add_task(VehicleId(0), 0, task(1, 1, 1, 1));

        let plan = Plan::from_route(&sol.routes()[0], &map);
        assert_eq!(plan.actions, vec![Action::Pickup(TaskId(1)), Action::Delivery(TaskId(1))]);
        assert_eq!(plan.total_distance(&map), 0.0);
    }

    #[test]
    fn test_empty_route_gives_empty_plan() {
        let map = line_map(3);
        let sol = Solution::empty(&[vehicle(0, 10, 1), vehicle(1, 10, 2)]);
        let plans = Plan::from_solution(&sol, &map);

        assert_eq!(plans.len(), 2);
        assert!(plans.iter().all(Plan::is_empty));
        assert_eq!(plans[1].start, CityId(2));
        assert_eq!(plans[1].to_string(), "vehicle 1 from 2: []");
    }
}
