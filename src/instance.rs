//! Identifiers and the read-only objects handed over by the auction host.
//!
//! Tasks and vehicles belong to the simulation platform; the agent only
//! reads their properties. Task identity is the auction sequence number,
//! never the task's contents.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Index of a city in the host topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CityId(pub usize);

/// Identifier of an agent taking part in the auction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub usize);

/// Identifier of a vehicle owned by an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VehicleId(pub usize);

/// Opaque task identifier.
///
/// The host assigns one per auctioned offer (the round sequence number).
/// Ids at the top of the range are reserved for hypothetical tasks built
/// while estimating future demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(pub u64);

impl TaskId {
    const PROBE_BASE: u64 = u64::MAX - u32::MAX as u64;

    /// Id for the `n`-th hypothetical task
    pub fn probe(n: u32) -> Self {
        TaskId(Self::PROBE_BASE + n as u64)
    }

    pub fn is_probe(&self) -> bool {
        self.0 >= Self::PROBE_BASE
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_probe() {
            write!(f, "probe#{}", self.0 - Self::PROBE_BASE)
        } else {
            write!(f, "#{}", self.0)
        }
    }
}

/// A delivery task offered at auction
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub pickup: CityId,
    pub delivery: CityId,
    pub weight: u32,
    pub reward: u64,
}

impl Task {
    pub fn new(id: TaskId, pickup: CityId, delivery: CityId, weight: u32, reward: u64) -> Self {
        Task { id, pickup, delivery, weight, reward }
    }
}

// Identity only: two offers with the same cities and weight are still different tasks.
impl PartialEq for Task {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Task {}

impl Hash for Task {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Task {} ({} -> {}, weight {})",
            self.id, self.pickup.0, self.delivery.0, self.weight
        )
    }
}

/// A vehicle of the bidding agent's fleet
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: VehicleId,
    /// Maximum carried weight
    pub capacity: u32,
    /// Where the vehicle currently stands
    pub location: CityId,
    /// Monetary cost per distance unit travelled
    pub cost_per_km: f64,
}

impl Vehicle {
    pub fn new(id: VehicleId, capacity: u32, location: CityId, cost_per_km: f64) -> Self {
        Vehicle { id, capacity, location, cost_per_km }
    }

    /// Whether the vehicle could carry `task` on its own
    #[inline]
    pub fn can_carry(&self, task: &Task) -> bool {
        task.weight <= self.capacity
    }
}
