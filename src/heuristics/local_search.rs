//! Local search improvement for the route optimizer.
//!
//! The stochastic descent repeatedly picks a random task, computes the best
//! relocate/reorder neighbor for it and moves there with a fixed
//! probability. It stops on its iteration cap, on a cost plateau or when
//! the wall-clock budget runs out, and hands back the best solution seen.

use crate::heuristics::neighborhood::{neighbors, select_best};
use crate::solution::{Solution, VehicleRoute};
use crate::topology::Topology;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::time::{Duration, Instant};

/// Trait for local search improvement methods
pub trait LocalSearch {
    /// Improve `solution` in place within `budget`
    fn improve(
        &self,
        topology: &dyn Topology,
        solution: &mut Solution,
        budget: Duration,
        rng: &mut ChaCha8Rng,
    ) -> SearchReport;

    fn name(&self) -> &str;
}

/// Why a search run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StopReason {
    IterationsExhausted,
    /// Cost unchanged for longer than the plateau limit
    Stalled,
    TimedOut,
    /// No vehicle has anything to move
    NothingToMove,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct SearchReport {
    pub iterations: usize,
    pub initial_cost: f64,
    pub final_cost: f64,
    pub stop_reason: StopReason,
    pub elapsed: Duration,
}

enum Step {
    Moved(Solution),
    Kept,
    Empty,
}

/// Randomized best-neighbor descent
#[derive(Debug, Clone)]
pub struct StochasticDescent {
    pub max_iterations: usize,
    /// Probability of moving to the best neighbor
    pub acceptance_probability: f64,
    /// Consecutive unchanged iterations tolerated
    pub plateau_limit: usize,
    pub plateau_epsilon: f64,
    /// Time kept in reserve at the end of the budget
    pub safety_margin: Duration,
}

impl StochasticDescent {
    pub fn new() -> Self {
        StochasticDescent {
            max_iterations: 10_000,
            acceptance_probability: 0.2,
            plateau_limit: 100,
            plateau_epsilon: 0.01,
            safety_margin: Duration::from_millis(100),
        }
    }

    pub fn with_iterations(max_iterations: usize) -> Self {
        StochasticDescent {
            max_iterations,
            ..Self::new()
        }
    }

    fn step(&self, topology: &dyn Topology, current: &Solution, rng: &mut ChaCha8Rng) -> Step {
        let loaded: Vec<&VehicleRoute> = current
            .routes()
            .iter()
            .filter(|r| !r.entries.is_empty())
            .collect();

        if loaded.is_empty() {
            return Step::Empty;
        }

        let route = loaded[rng.gen_range(0..loaded.len())];
        let task = route.entries[rng.gen_range(0..route.entries.len())].task;

        // Rejected steps would discard the neighborhood anyway
        if rng.gen::<f64>() >= self.acceptance_probability {
            return Step::Kept;
        }

        match select_best(neighbors(current, route.vehicle.id, &task), topology) {
            Some(best) => Step::Moved(best),
            None => Step::Kept,
        }
    }
}

impl Default for StochasticDescent {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalSearch for StochasticDescent {
    fn improve(
        &self,
        topology: &dyn Topology,
        solution: &mut Solution,
        budget: Duration,
        rng: &mut ChaCha8Rng,
    ) -> SearchReport {
        let start = Instant::now();
        let deadline = budget.saturating_sub(self.safety_margin);

        let initial_cost = solution.cost(topology);
        let mut current = solution.clone();
        let mut best_cost = initial_cost;
        let mut last_cost = initial_cost;
        let mut unchanged = 0;
        let mut iterations = 0;

        let stop_reason = loop {
            if iterations >= self.max_iterations {
                break StopReason::IterationsExhausted;
            }
            if start.elapsed() >= deadline {
                break StopReason::TimedOut;
            }
            if unchanged > self.plateau_limit {
                break StopReason::Stalled;
            }

            match self.step(topology, &current, rng) {
                Step::Empty => break StopReason::NothingToMove,
                Step::Kept => {}
                Step::Moved(next) => current = next,
            }
            iterations += 1;

            let cost = current.cost(topology);
            if (last_cost - cost).abs() < self.plateau_epsilon {
                unchanged += 1;
            } else {
                unchanged = 0;
            }
            last_cost = cost;

            if cost < best_cost {
                best_cost = cost;
                *solution = current.clone();
            }
        };

        let report = SearchReport {
            iterations,
            initial_cost,
            final_cost: best_cost,
            stop_reason,
            elapsed: start.elapsed(),
        };

        log::debug!(
            "{}: {:.1} -> {:.1} after {} iterations ({:?})",
            self.name(),
            report.initial_cost,
            report.final_cost,
            report.iterations,
            report.stop_reason
        );

        report
    }

    fn name(&self) -> &str {
        "StochasticDescent"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heuristics::construction::{ConstructionHeuristic, LargestVehicleConstruction};
    use crate::instance::{Task, VehicleId};
    use crate::solution::RouteEntry;
    use crate::test_utils::{generous_budget, grid_map, task, vehicle};

    fn descent() -> StochasticDescent {
        StochasticDescent {
            max_iterations: 500,
            acceptance_probability: 1.0,
            plateau_limit: 50,
            plateau_epsilon: 0.01,
            safety_margin: Duration::ZERO,
        }
    }

    fn grid_tasks() -> Vec<Task> {
        vec![
            task(1, 0, 8, 3),
            task(2, 2, 6, 4),
            task(3, 1, 7, 2),
            task(4, 3, 5, 5),
            task(5, 8, 0, 1),
        ]
    }

    /// Cost of every precedence-respecting ordering of `tasks` in one vehicle
    fn all_orderings(tasks: &[Task], capacity: u32, location: usize) -> Vec<Solution> {
        fn extend(
            prefix: &mut Vec<RouteEntry>,
            picked: &mut Vec<bool>,
            delivered: &mut Vec<bool>,
            tasks: &[Task],
            out: &mut Vec<Vec<RouteEntry>>,
        ) {
            if prefix.len() == tasks.len() * 2 {
                out.push(prefix.clone());
                return;
            }
            for i in 0..tasks.len() {
                if !picked[i] {
                    picked[i] = true;
                    prefix.push(RouteEntry::pickup(tasks[i]));
                    extend(prefix, picked, delivered, tasks, out);
                    prefix.pop();
                    picked[i] = false;
                } else if !delivered[i] {
                    delivered[i] = true;
                    prefix.push(RouteEntry::delivery(tasks[i]));
                    extend(prefix, picked, delivered, tasks, out);
                    prefix.pop();
                    delivered[i] = false;
                }
            }
        }

        let mut orders = Vec::new();
        extend(
            &mut Vec::new(),
            &mut vec![false; tasks.len()],
            &mut vec![false; tasks.len()],
            tasks,
            &mut orders,
        );

        orders
            .into_iter()
            .map(|entries| {
                let mut sol = Solution::empty(&[vehicle(0, capacity, location)]);
                for (i, entry) in entries.into_iter().enumerate() {
                    sol.add_entry(VehicleId(0), i, entry);
                }
                sol
            })
            .filter(Solution::is_feasible)
            .collect()
    }

    #[test]
    fn test_two_tasks_reach_optimum() {
        let map = grid_map();
        let tasks = [task(1, 0, 8, 4), task(2, 2, 6, 4)];
        let vehicles = [vehicle(0, 10, 4)];

        let optimum = all_orderings(&tasks, 10, 4)
            .iter()
            .map(|s| s.cost(&map))
            .fold(f64::INFINITY, f64::min);

        let mut sol = LargestVehicleConstruction.construct(&vehicles, &tasks, &map).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        descent().improve(&map, &mut sol, generous_budget(), &mut rng);

        assert!(sol.is_feasible());
        assert!((sol.cost(&map) - optimum).abs() < 1e-9);
    }

    #[test]
    fn test_never_worse_and_feasible() {
        let map = grid_map();
        let vehicles = [vehicle(0, 8, 0), vehicle(1, 6, 8), vehicle(2, 4, 4)];

        for seed in 0..5 {
            let mut sol = LargestVehicleConstruction.construct(&vehicles, &grid_tasks(), &map).unwrap();
            let before = sol.cost(&map);
            let mut rng = ChaCha8Rng::seed_from_u64(seed);

            let mut search = descent();
            search.acceptance_probability = 0.3;
            let report = search.improve(&map, &mut sol, generous_budget(), &mut rng);

            assert!(sol.is_feasible());
            assert_eq!(sol.num_tasks(), 5);
            assert!(sol.cost(&map) <= before + 1e-9);
            assert!((report.final_cost - sol.cost(&map)).abs() < 1e-9);
            assert!((report.initial_cost - before).abs() < 1e-9);
        }
    }

    #[test]
    fn test_same_seed_same_result() {
        let map = grid_map();
        let vehicles = [vehicle(0, 8, 0), vehicle(1, 6, 8)];
        let start = LargestVehicleConstruction.construct(&vehicles, &grid_tasks(), &map).unwrap();

        let run = |seed: u64| {
            let mut sol = start.clone();
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let mut search = descent();
            search.acceptance_probability = 0.5;
            let report = search.improve(&map, &mut sol, generous_budget(), &mut rng);
            (sol, report.iterations)
        };

        assert_eq!(run(11), run(11));
    }

    #[test]
    fn test_empty_solution_has_nothing_to_move() {
        let map = grid_map();
        let mut sol = Solution::empty(&[vehicle(0, 8, 0)]);
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let report = descent().improve(&map, &mut sol, generous_budget(), &mut rng);

        assert_eq!(report.stop_reason, StopReason::NothingToMove);
        assert_eq!(report.iterations, 0);
        assert_eq!(report.final_cost, 0.0);
    }

    #[test]
    fn test_plateau_stops_search() {
        let map = grid_map();
        let vehicles = [vehicle(0, 8, 0)];
        let mut sol = LargestVehicleConstruction.construct(&vehicles, &grid_tasks(), &map).unwrap();
        let before = sol.clone();
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        let mut search = descent();
        search.acceptance_probability = 0.0;
        search.max_iterations = 10_000;
        let report = search.improve(&map, &mut sol, generous_budget(), &mut rng);

        assert_eq!(report.stop_reason, StopReason::Stalled);
        assert_eq!(report.iterations, search.plateau_limit + 1);
        assert_eq!(sol, before);
    }

    #[test]
    fn test_exhausted_budget_returns_input() {
        let map = grid_map();
        let vehicles = [vehicle(0, 8, 0)];
        let mut sol = LargestVehicleConstruction.construct(&vehicles, &grid_tasks(), &map).unwrap();
        let before = sol.clone();
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        let report = descent().improve(&map, &mut sol, Duration::ZERO, &mut rng);

        assert_eq!(report.stop_reason, StopReason::TimedOut);
        assert_eq!(sol, before);
    }

    #[test]
    fn test_iteration_cap() {
        let map = grid_map();
        let vehicles = [vehicle(0, 8, 0), vehicle(1, 8, 8)];
        let mut sol = LargestVehicleConstruction.construct(&vehicles, &grid_tasks(), &map).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(5);

        let mut search = descent();
        search.max_iterations = 3;
        let report = search.improve(&map, &mut sol, generous_budget(), &mut rng);

        assert_eq!(report.iterations, 3);
        assert_eq!(report.stop_reason, StopReason::IterationsExhausted);
    }
}
