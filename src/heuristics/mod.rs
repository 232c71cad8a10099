//! Route optimizer.
//!
//! This module exports the construction heuristics, greedy estimators,
//! neighbor generators and the local search driver.

pub mod construction;
pub mod local_search;
pub mod neighborhood;

pub use construction::*;
pub use local_search::*;
pub use neighborhood::*;
