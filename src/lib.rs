//! PD Auction Agent Library
//!
//! A bidding agent for sequential pickup-and-delivery task auctions.
//!
//! # Features
//!
//! - Multi-vehicle pickup/delivery routes with capacity and precedence checks
//! - Stochastic local search over relocate and reorder neighborhoods
//! - Marginal-cost bidding guarded by greedy insertion/removal estimators
//! - Sequential, marginal-cost and Bayesian bidding policies
//! - Confidence-scaled pricing adapted from auction outcomes
//! - A local auction host with plan validation and CSV reports
//!
//! # Example
//!
//! ```no_run
//! use pd_auction_agent::agent::{AgentIdentity, AuctionAgent, AuctionBehavior};
//! use pd_auction_agent::config::AgentConfig;
//! use pd_auction_agent::instance::{AgentId, CityId, Task, TaskId, Vehicle, VehicleId};
//! use pd_auction_agent::topology::{CityMap, UniformDistribution};
//! use std::sync::Arc;
//!
//! let map = Arc::new(CityMap::from_file("data/switzerland.map").unwrap());
//! let distribution = Arc::new(UniformDistribution::new(map.cities.len()));
//! let vehicles = vec![Vehicle::new(VehicleId(0), 30, CityId(0), 5.0)];
//!
//! let mut agent = AuctionAgent::initialize(
//!     map,
//!     distribution,
//!     AgentIdentity { id: AgentId(0), vehicles: vehicles.clone() },
//!     AgentConfig::default(),
//! )
//! .unwrap();
//!
//! let task = Task::new(TaskId(0), CityId(1), CityId(4), 5, 300);
//! let bid = agent.price_for(&task);
//! agent.report_round_outcome(&task, AgentId(0), &[bid]);
//!
//! for plan in agent.produce_plan(&vehicles) {
//!     println!("{}", plan);
//! }
//! ```

pub mod agent;
pub mod bidding;
pub mod config;
pub mod error;
pub mod heuristics;
pub mod instance;
pub mod plan;
pub mod simulation;
pub mod solution;
pub mod topology;

#[cfg(test)]
mod test_utils;

pub use agent::{AuctionAgent, AuctionBehavior};
pub use config::AgentConfig;
pub use solution::Solution;
