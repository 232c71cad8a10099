//! The bidding agent and its host callback contract.
//!
//! The host drives the lifecycle: one `initialize`, then for every auction
//! round a `price_for` followed by `report_round_outcome`, and finally
//! `produce_plan`. The agent never calls back into the host.

use crate::bidding::{build_policy, price, BidContext, BiddingPolicy, Confidence};
use crate::config::AgentConfig;
use crate::error::ConfigError;
use crate::heuristics::construction::greedy_insert;
use crate::heuristics::local_search::LocalSearch;
use crate::instance::{AgentId, Task, TaskId, Vehicle};
use crate::plan::Plan;
use crate::solution::Solution;
use crate::topology::{TaskDistribution, Topology};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;

/// Callbacks the auction host invokes on a participant
pub trait AuctionBehavior {
    fn id(&self) -> AgentId;

    /// Strategy label used in reports
    fn name(&self) -> &str;

    /// Bid for `task`, or `None` to stay out of the round
    fn price_for(&mut self, task: &Task) -> Option<u64>;

    /// `bids` holds every agent's offer, indexed by agent id
    fn report_round_outcome(&mut self, task: &Task, winner: AgentId, bids: &[Option<u64>]);

    /// One plan per vehicle of `vehicles`, covering every won task
    fn produce_plan(&mut self, vehicles: &[Vehicle]) -> Vec<Plan>;
}

/// Who the agent is and what it drives
#[derive(Debug, Clone)]
pub struct AgentIdentity {
    pub id: AgentId,
    pub vehicles: Vec<Vehicle>,
}

pub struct AuctionAgent {
    identity: AgentIdentity,
    topology: Arc<dyn Topology>,
    distribution: Arc<dyn TaskDistribution>,
    config: AgentConfig,
    policy: Box<dyn BiddingPolicy>,
    confidence: Confidence,
    rng: ChaCha8Rng,
    /// Won tasks in award order
    committed: Vec<Task>,
    solution: Solution,
    /// Routes including the task currently being bid on
    pending: Option<(TaskId, Solution)>,
}

impl AuctionAgent {
    pub fn initialize(
        topology: Arc<dyn Topology>,
        distribution: Arc<dyn TaskDistribution>,
        identity: AgentIdentity,
        config: AgentConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        if identity.vehicles.is_empty() {
            return Err(ConfigError::NoVehicle);
        }

        let policy = build_policy(&config);
        let confidence = Confidence::from_config(&config.confidence);
        let rng = ChaCha8Rng::seed_from_u64(config.seed.wrapping_add(identity.id.0 as u64));
        let solution = Solution::empty(&identity.vehicles);

        log::info!(
            "agent {} ready: {} policy, {} vehicles",
            identity.id.0,
            policy.name(),
            identity.vehicles.len()
        );

        Ok(AuctionAgent {
            identity,
            topology,
            distribution,
            config,
            policy,
            confidence,
            rng,
            committed: Vec::new(),
            solution,
            pending: None,
        })
    }

    /// Replace the configured policy
    pub fn with_policy(mut self, policy: Box<dyn BiddingPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn committed_tasks(&self) -> &[Task] {
        &self.committed
    }

    pub fn solution(&self) -> &Solution {
        &self.solution
    }

    pub fn confidence(&self) -> f64 {
        self.confidence.value()
    }

    pub fn vehicles(&self) -> &[Vehicle] {
        &self.identity.vehicles
    }

    /// Place a won task that has no precomputed routes.
    ///
    /// A task no vehicle can carry stays out of `committed`, so the
    /// committed set always matches the routes.
    fn commit_without_pending(&mut self, task: &Task) {
        match greedy_insert(&self.solution, task, self.topology.as_ref()) {
            Some(solution) => {
                self.committed.push(*task);
                self.solution = solution;
            }
            None => log::warn!(
                "agent {}: won {} but no vehicle can carry it, leaving it out",
                self.identity.id.0,
                task
            ),
        }
    }
}

impl AuctionBehavior for AuctionAgent {
    fn id(&self) -> AgentId {
        self.identity.id
    }

    fn name(&self) -> &str {
        self.policy.name()
    }

    fn price_for(&mut self, task: &Task) -> Option<u64> {
        self.pending = None;

        let mut ctx = BidContext {
            topology: self.topology.as_ref(),
            distribution: self.distribution.as_ref(),
            vehicles: &self.identity.vehicles,
            committed: &self.committed,
            budget: self.config.budgets.bid(),
            rng: &mut self.rng,
        };

        let Some(marginal) = self.policy.marginal_cost(&mut ctx, task) else {
            log::info!("agent {}: no bid for {}", self.identity.id.0, task);
            return None;
        };

        let topology = self.topology.as_ref();
        if marginal.without_solution.num_tasks() == self.committed.len()
            && marginal.cost_without < self.solution.cost(topology)
        {
            log::debug!(
                "agent {}: committed routes improved {:.1} -> {:.1}",
                self.identity.id.0,
                self.solution.cost(topology),
                marginal.cost_without
            );
            self.solution = marginal.without_solution;
        }

        let bid = price(marginal.value, &self.config.bidding, &self.confidence, topology, task);

        log::info!(
            "agent {}: {} marginal {:.1} (retries {}), confidence {:.2}, bid {}",
            self.identity.id.0,
            task,
            marginal.value,
            marginal.retries,
            self.confidence.value(),
            bid
        );

        self.pending = Some((task.id, marginal.with_solution));
        Some(bid)
    }

    fn report_round_outcome(&mut self, task: &Task, winner: AgentId, bids: &[Option<u64>]) {
        let pending = self.pending.take();

        if winner != self.identity.id {
            self.confidence.record_loss();
            log::info!(
                "agent {}: lost {} to agent {} ({:?}), confidence {:.2}",
                self.identity.id.0,
                task.id,
                winner.0,
                bids.get(winner.0).copied().flatten(),
                self.confidence.value()
            );
            return;
        }

        self.confidence.record_win();

        match pending {
            Some((id, solution)) if id == task.id => {
                self.committed.push(*task);
                self.solution = solution;
            }
            _ => self.commit_without_pending(task),
        }

        log::info!(
            "agent {}: won {}, {} tasks committed, route cost {:.1}",
            self.identity.id.0,
            task.id,
            self.committed.len(),
            self.solution.cost(self.topology.as_ref())
        );
    }

    fn produce_plan(&mut self, vehicles: &[Vehicle]) -> Vec<Plan> {
        let topology = self.topology.as_ref();
        let (mut solution, orphans) = self.solution.rebind(vehicles);

        for task in orphans {
            match greedy_insert(&solution, &task, topology) {
                Some(placed) => solution = placed,
                None => log::warn!("{} cannot be carried by the new fleet", task.id),
            }
        }

        let report = self
            .config
            .search
            .plan_driver()
            .improve(topology, &mut solution, self.config.budgets.plan(), &mut self.rng);

        log::info!(
            "agent {}: final plan for {} tasks, cost {:.1} -> {:.1}",
            self.identity.id.0,
            solution.num_tasks(),
            report.initial_cost,
            report.final_cost
        );

        self.solution = solution;
        Plan::from_solution(&self.solution, topology)
    }
}
