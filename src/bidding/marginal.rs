//! Marginal cost from two searches, guarded by greedy estimators.
//!
//! The "with" and "without" task sets are optimized independently. Since
//! the search carries no optimality guarantee, the difference is checked
//! against two cheap anchors:
//! - removing the task from "with" must not beat "without" by itself
//!   (a negative marginal cost means "without" got stuck)
//! - inserting the task greedily into "without" bounds "with" from above
//!
//! A suspicious side is searched again on a shrinking slice of the
//! remaining budget. If it is still off after the last retry, the
//! estimator takes its place.

use super::{BidContext, BiddingPolicy, MarginalCost, Substitution};
use crate::config::{AgentConfig, BiddingConfig};
use crate::heuristics::construction::{greedy_insert, greedy_remove};
use crate::heuristics::local_search::LocalSearch;
use crate::instance::{Task, Vehicle};
use crate::solution::Solution;
use crate::topology::Topology;
use rand_chacha::ChaCha8Rng;
use std::time::{Duration, Instant};

/// Slack for comparing route costs
const TOLERANCE: f64 = 1e-6;

pub struct MarginalCostPolicy {
    search: Box<dyn LocalSearch>,
    config: BiddingConfig,
}

/// Flags raised against the current pair of search results
#[derive(Debug, Clone, Copy)]
struct Checks {
    without_suspicious: bool,
    with_suspicious: bool,
}

impl Checks {
    fn any(&self) -> bool {
        self.without_suspicious || self.with_suspicious
    }
}

impl MarginalCostPolicy {
    pub fn new(search: Box<dyn LocalSearch>, config: BiddingConfig) -> Self {
        MarginalCostPolicy { search, config }
    }

    pub fn from_config(config: &AgentConfig) -> Self {
        Self::new(Box::new(config.search.bid_driver()), config.bidding.clone())
    }

    fn solve(
        &self,
        topology: &dyn Topology,
        vehicles: &[Vehicle],
        tasks: &[Task],
        budget: Duration,
        rng: &mut ChaCha8Rng,
    ) -> Option<Solution> {
        let mut solution = self.config.construction.construct(vehicles, tasks, topology)?;
        self.search.improve(topology, &mut solution, budget, rng);
        Some(solution)
    }

    fn check(
        task: &Task,
        topology: &dyn Topology,
        with: &Solution,
        without: &Solution,
    ) -> (Checks, Solution, Option<Solution>) {
        let cost_with = with.cost(topology);
        let cost_without = without.cost(topology);

        let without_estimator = greedy_remove(with, task.id);
        let with_estimator = greedy_insert(without, task, topology);

        let marginal = cost_with - cost_without;
        let upper_bound = with_estimator
            .as_ref()
            .map_or(f64::INFINITY, |s| s.cost(topology) - cost_without);

        let checks = Checks {
            without_suspicious: marginal < -TOLERANCE,
            with_suspicious: marginal > upper_bound + TOLERANCE,
        };

        (checks, without_estimator, with_estimator)
    }

    /// Run the protocol for `task` on top of `committed`.
    ///
    /// Returns `None` when no vehicle can serve the resulting task set.
    pub fn evaluate(
        &self,
        topology: &dyn Topology,
        vehicles: &[Vehicle],
        committed: &[Task],
        task: &Task,
        budget: Duration,
        rng: &mut ChaCha8Rng,
    ) -> Option<MarginalCost> {
        let start = Instant::now();

        let mut with_tasks = committed.to_vec();
        with_tasks.push(*task);

        let slice = budget.mul_f64(self.config.initial_split);
        let mut without = self.solve(topology, vehicles, committed, slice, rng)?;
        let mut with = self.solve(topology, vehicles, &with_tasks, slice, rng)?;

        let (mut checks, mut without_estimator, mut with_estimator) =
            Self::check(task, topology, &with, &without);

        let mut retries = 0;
        while checks.any() && retries < self.config.retry_limit {
            retries += 1;
            let slice = budget.saturating_sub(start.elapsed()).mul_f64(self.config.retry_split);

            log::debug!(
                "{}: retry {} (without suspicious: {}, with suspicious: {}) on {:?}",
                task.id, retries, checks.without_suspicious, checks.with_suspicious, slice
            );

            if checks.without_suspicious {
                without = self.solve(topology, vehicles, committed, slice, rng)?;
            }
            if checks.with_suspicious {
                with = self.solve(topology, vehicles, &with_tasks, slice, rng)?;
            }

            (checks, without_estimator, with_estimator) = Self::check(task, topology, &with, &without);
        }

        let mut substitution = Substitution::default();

        if checks.without_suspicious {
            substitution.without = true;
            without = without_estimator;
        }
        if checks.with_suspicious {
            if let Some(estimator) = with_estimator {
                substitution.with = true;
                with = estimator;
            }
        }

        let cost_with = with.cost(topology);
        let cost_without = without.cost(topology);

        if substitution.any() {
            log::debug!(
                "{}: estimators substituted after {} retries (without: {}, with: {})",
                task.id, retries, substitution.without, substitution.with
            );
        }

        Some(MarginalCost {
            value: cost_with - cost_without,
            cost_with,
            cost_without,
            with_solution: with,
            without_solution: without,
            retries,
            substitution,
        })
    }
}

impl BiddingPolicy for MarginalCostPolicy {
    fn marginal_cost(&self, ctx: &mut BidContext<'_>, task: &Task) -> Option<MarginalCost> {
        self.evaluate(
            ctx.topology,
            ctx.vehicles,
            ctx.committed,
            task,
            ctx.budget,
            ctx.rng,
        )
    }

    fn name(&self) -> &str {
        "MarginalCost"
    }
}
