//! Bidding policies.
//!
//! A policy turns an offered task into a marginal cost: how much the
//! committed routes grow when the task is added. The agent then prices the
//! bid from that value with [`price`].
//!
//! - [`SequentialPolicy`]: everything on the largest vehicle, in award order
//! - [`MarginalCostPolicy`]: with/without searches guarded by greedy estimators
//! - [`BayesianPolicy`]: marginal cost averaged over likely future tasks

pub mod bayesian;
pub mod confidence;
pub mod marginal;
pub mod sequential;

pub use bayesian::BayesianPolicy;
pub use confidence::Confidence;
pub use marginal::MarginalCostPolicy;
pub use sequential::SequentialPolicy;

use crate::config::{AgentConfig, BiddingConfig, PolicyKind};
use crate::instance::{Task, Vehicle};
use crate::solution::Solution;
use crate::topology::{TaskDistribution, Topology};
use rand_chacha::ChaCha8Rng;
use std::time::Duration;

/// Everything a policy may read while evaluating one offer
pub struct BidContext<'a> {
    pub topology: &'a dyn Topology,
    pub distribution: &'a dyn TaskDistribution,
    pub vehicles: &'a [Vehicle],
    /// Tasks already won, in award order
    pub committed: &'a [Task],
    pub budget: Duration,
    pub rng: &'a mut ChaCha8Rng,
}

/// Which estimator replaced a search result
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Substitution {
    pub without: bool,
    pub with: bool,
}

impl Substitution {
    pub fn any(&self) -> bool {
        self.without || self.with
    }
}

/// Outcome of evaluating one offer
#[derive(Debug, Clone)]
pub struct MarginalCost {
    /// `cost_with - cost_without`, after any substitution
    pub value: f64,
    pub cost_with: f64,
    pub cost_without: f64,
    /// Routes to commit if the task is won
    pub with_solution: Solution,
    /// Routes serving the committed tasks alone
    pub without_solution: Solution,
    /// Searches recomputed because of a suspicious result
    pub retries: usize,
    pub substitution: Substitution,
}

/// A pluggable way of computing marginal costs
pub trait BiddingPolicy {
    /// `None` when the fleet cannot serve the task on top of its commitments
    fn marginal_cost(&self, ctx: &mut BidContext<'_>, task: &Task) -> Option<MarginalCost>;

    fn name(&self) -> &str;
}

/// Build the policy selected in `config`
pub fn build_policy(config: &AgentConfig) -> Box<dyn BiddingPolicy> {
    match config.policy {
        PolicyKind::Sequential => Box::new(SequentialPolicy),
        PolicyKind::MarginalCost => Box::new(MarginalCostPolicy::from_config(config)),
        PolicyKind::Bayesian => Box::new(BayesianPolicy::from_config(config)),
    }
}

/// Bid for a task from its marginal cost.
///
/// `max(marginal, floor) x (1 + confidence)`, minus the valence discount
/// for each road leaving the pickup and delivery cities, clamped at zero.
pub fn price(
    marginal: f64,
    config: &BiddingConfig,
    confidence: &Confidence,
    topology: &dyn Topology,
    task: &Task,
) -> u64 {
    if marginal < 0.0 {
        log::warn!(
            "negative marginal cost {:.2} for {}, using floor {:.2}",
            marginal, task.id, config.price_floor
        );
    }

    let base = if marginal.is_finite() {
        marginal.max(config.price_floor)
    } else {
        config.price_floor
    };

    let valence = topology.neighbor_count(task.pickup) + topology.neighbor_count(task.delivery);
    let amount = confidence.scale(base) - config.valence_discount * valence as f64;

    // saturating float-to-int cast
    amount.max(0.0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{line_map, task};

    #[test]
    fn test_price_uses_floor_and_confidence() {
        let map = line_map(4);
        let config = BiddingConfig::default();
        let confidence = Confidence::new(0.5, 0.05, 0.0);
        let t = task(1, 0, 3, 1);

        assert_eq!(price(100.0, &config, &confidence, &map, &t), 150);
        assert_eq!(price(3.0, &config, &confidence, &map, &t), 30);
        assert_eq!(price(-12.0, &config, &confidence, &map, &t), 30);
    }

    #[test]
    fn test_valence_discount_never_goes_negative() {
        let map = line_map(4);
        let confidence = Confidence::new(0.0, 0.05, 0.0);
        let t = task(1, 1, 2, 1); // two roads at each end

        let mut config = BiddingConfig::default();
        config.valence_discount = 2.5;
        assert_eq!(price(100.0, &config, &confidence, &map, &t), 90);

        config.valence_discount = 1_000.0;
        assert_eq!(price(100.0, &config, &confidence, &map, &t), 0);
    }

    #[test]
    fn test_policy_selection() {
        let mut config = AgentConfig::default();
        for (kind, name) in [
            (PolicyKind::Sequential, "Sequential"),
            (PolicyKind::MarginalCost, "MarginalCost"),
            (PolicyKind::Bayesian, "Bayesian"),
        ] {
            config.policy = kind;
            assert_eq!(build_policy(&config).name(), name);
        }
    }
}
