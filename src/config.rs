//! Agent configuration.
//!
//! Every tunable of the optimizer and of the bidding protocol lives here so
//! it can be changed from a JSON file without recompiling. Missing fields
//! fall back to their defaults.

use crate::error::ConfigError;
use crate::heuristics::construction::ConstructionKind;
use crate::heuristics::local_search::StochasticDescent;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Wall-clock budgets granted by the host, in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeBudgets {
    pub setup_ms: u64,
    pub bid_ms: u64,
    pub plan_ms: u64,
}

impl Default for TimeBudgets {
    fn default() -> Self {
        TimeBudgets {
            setup_ms: 5_000,
            bid_ms: 5_000,
            plan_ms: 10_000,
        }
    }
}

impl TimeBudgets {
    pub fn bid(&self) -> Duration {
        Duration::from_millis(self.bid_ms)
    }

    pub fn plan(&self) -> Duration {
        Duration::from_millis(self.plan_ms)
    }
}

/// Local search parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Iteration cap of each search run while bidding
    pub bid_iterations: usize,
    /// Iteration cap of the final planning search
    pub plan_iterations: usize,
    /// Probability of moving to the best neighbor at each iteration
    pub acceptance_probability: f64,
    /// Consecutive unchanged iterations tolerated before stopping
    pub plateau_limit: usize,
    /// Cost changes below this count as unchanged
    pub plateau_epsilon: f64,
    /// Stop this long before the budget runs out
    pub safety_margin_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            bid_iterations: 10_000,
            plan_iterations: 20_000,
            acceptance_probability: 0.2,
            plateau_limit: 100,
            plateau_epsilon: 0.01,
            safety_margin_ms: 100,
        }
    }
}

impl SearchConfig {
    pub fn driver(&self, max_iterations: usize) -> StochasticDescent {
        StochasticDescent {
            max_iterations,
            acceptance_probability: self.acceptance_probability,
            plateau_limit: self.plateau_limit,
            plateau_epsilon: self.plateau_epsilon,
            safety_margin: Duration::from_millis(self.safety_margin_ms),
        }
    }

    pub fn bid_driver(&self) -> StochasticDescent {
        self.driver(self.bid_iterations)
    }

    pub fn plan_driver(&self) -> StochasticDescent {
        self.driver(self.plan_iterations)
    }
}

/// Marginal-cost protocol and pricing parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BiddingConfig {
    /// Lowest marginal cost a bid is built from
    pub price_floor: f64,
    /// How many times a suspicious search result is recomputed
    pub retry_limit: usize,
    /// Share of the bid budget given to each of the two initial searches
    pub initial_split: f64,
    /// Share of the remaining bid budget given to each retried search
    pub retry_split: f64,
    /// Price reduction per neighboring road of the task's two cities
    pub valence_discount: f64,
    /// Maximum number of hypothetical tasks weighed by the Bayesian policy
    pub bayesian_samples: usize,
    /// How search starting points are built
    pub construction: ConstructionKind,
}

impl Default for BiddingConfig {
    fn default() -> Self {
        BiddingConfig {
            price_floor: 20.0,
            retry_limit: 3,
            initial_split: 0.5,
            retry_split: 0.25,
            valence_discount: 0.0,
            bayesian_samples: 8,
            construction: ConstructionKind::LargestVehicle,
        }
    }
}

/// Price scaling factor adapted from auction outcomes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceConfig {
    pub baseline: f64,
    pub step: f64,
    pub floor: f64,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        ConfidenceConfig {
            baseline: 0.1,
            step: 0.05,
            floor: 0.0,
        }
    }
}

/// Which bidding policy the agent runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    Sequential,
    MarginalCost,
    Bayesian,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub budgets: TimeBudgets,
    pub search: SearchConfig,
    pub bidding: BiddingConfig,
    pub confidence: ConfidenceConfig,
    pub policy: PolicyKind,
    /// Random seed
    pub seed: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig {
            budgets: TimeBudgets::default(),
            search: SearchConfig::default(),
            bidding: BiddingConfig::default(),
            confidence: ConfidenceConfig::default(),
            policy: PolicyKind::MarginalCost,
            seed: 42,
        }
    }
}

impl AgentConfig {
    /// Load and validate a JSON configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: AgentConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make deadlines or prices meaningless
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.budgets.setup_ms == 0 {
            return Err(ConfigError::InvalidBudget("setup_ms"));
        }
        if self.budgets.bid_ms == 0 {
            return Err(ConfigError::InvalidBudget("bid_ms"));
        }
        if self.budgets.plan_ms == 0 {
            return Err(ConfigError::InvalidBudget("plan_ms"));
        }

        check_range("search.acceptance_probability", "[0, 1]", self.search.acceptance_probability, |p| {
            (0.0..=1.0).contains(&p)
        })?;
        check_range("search.plateau_epsilon", "[0, inf)", self.search.plateau_epsilon, |e| {
            e.is_finite() && e >= 0.0
        })?;
        check_range("bidding.initial_split", "(0, 1]", self.bidding.initial_split, |s| {
            s > 0.0 && s <= 1.0
        })?;
        check_range("bidding.retry_split", "(0, 1]", self.bidding.retry_split, |s| {
            s > 0.0 && s <= 1.0
        })?;
        check_range("bidding.price_floor", "[0, inf)", self.bidding.price_floor, |f| {
            f.is_finite() && f >= 0.0
        })?;
        check_range("bidding.valence_discount", "[0, inf)", self.bidding.valence_discount, |v| {
            v.is_finite() && v >= 0.0
        })?;
        check_range("confidence.step", "[0, inf)", self.confidence.step, |s| {
            s.is_finite() && s >= 0.0
        })?;
        check_range("confidence.floor", "(-1, inf)", self.confidence.floor, |f| {
            f.is_finite() && f > -1.0
        })?;
        check_range("confidence.baseline", "[floor, inf)", self.confidence.baseline, |b| {
            b.is_finite() && b >= self.confidence.floor
        })?;

        Ok(())
    }
}

fn check_range(
    name: &'static str,
    range: &'static str,
    value: f64,
    valid: impl Fn(f64) -> bool,
) -> Result<(), ConfigError> {
    if valid(value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { name, range, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AgentConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.bidding.retry_limit, 3);
        assert_eq!(config.policy, PolicyKind::MarginalCost);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = AgentConfig::from_json(
            r#"{ "budgets": { "bid_ms": 2000 }, "policy": "bayesian", "seed": 7 }"#,
        )
        .unwrap();

        assert_eq!(config.budgets.bid_ms, 2000);
        assert_eq!(config.budgets.plan_ms, 10_000);
        assert_eq!(config.policy, PolicyKind::Bayesian);
        assert_eq!(config.seed, 7);
        assert_eq!(config.bidding.construction, ConstructionKind::LargestVehicle);
    }

    #[test]
    fn test_zero_budget_is_rejected() {
        let err = AgentConfig::from_json(r#"{ "budgets": { "plan_ms": 0 } }"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBudget("plan_ms")));
    }

    #[test]
    fn test_out_of_range_probability_is_rejected() {
        let err = AgentConfig::from_json(r#"{ "search": { "acceptance_probability": 1.5 } }"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { name: "search.acceptance_probability", .. }));
    }

    #[test]
    fn test_malformed_json_is_a_parse_error() {
        assert!(matches!(
            AgentConfig::from_json("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = AgentConfig::from_file("/nonexistent/agent.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
