//! Local auction host.
//!
//! Stands in for the external platform when running experiments: draws
//! tasks from the distribution, collects sealed bids, awards each task to
//! the lowest bidder, then asks every agent for its plans and checks that
//! they can actually be driven.

use crate::agent::AuctionBehavior;
use crate::error::PlanError;
use crate::instance::{CityId, Task, TaskId, Vehicle, VehicleId};
use crate::plan::{Action, Plan};
use crate::topology::{CityMap, TaskDistribution, Topology};
use rand::distributions::{WeightedError, WeightedIndex};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::path::Path;

/// Parameters of a simulated auction
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub rounds: usize,
    /// Seed of the task generator and of fleet placement
    pub seed: u64,
    pub min_weight: u32,
    pub max_weight: u32,
    /// Task reward per distance unit between pickup and delivery
    pub reward_per_km: f64,
    pub vehicles_per_agent: usize,
    pub capacity: u32,
    pub cost_per_km: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            rounds: 20,
            seed: 2024,
            min_weight: 1,
            max_weight: 10,
            reward_per_km: 50.0,
            vehicles_per_agent: 2,
            capacity: 30,
            cost_per_km: 5.0,
        }
    }
}

/// Draws auction offers from a task distribution
pub struct TaskGenerator {
    pairs: Vec<(CityId, CityId)>,
    rewards: Vec<u64>,
    index: WeightedIndex<f64>,
    rng: ChaCha8Rng,
    next_id: u64,
    min_weight: u32,
    max_weight: u32,
}

impl TaskGenerator {
    pub fn new(
        topology: &dyn Topology,
        distribution: &dyn TaskDistribution,
        config: &SimulationConfig,
    ) -> Result<Self, WeightedError> {
        let cities = topology.cities();
        let pairs: Vec<(CityId, CityId)> = cities
            .iter()
            .flat_map(|&from| cities.iter().map(move |&to| (from, to)))
            .collect();

        let weights: Vec<f64> = pairs
            .iter()
            .map(|&(from, to)| distribution.probability(from, to).max(0.0))
            .collect();
        let index = WeightedIndex::new(&weights)?;

        let rewards = pairs
            .iter()
            .map(|&(from, to)| (topology.distance(from, to) * config.reward_per_km) as u64)
            .collect();

        Ok(TaskGenerator {
            pairs,
            rewards,
            index,
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            next_id: 0,
            min_weight: config.min_weight,
            max_weight: config.max_weight.max(config.min_weight),
        })
    }

    /// Next offer; ids follow the round sequence
    pub fn next_task(&mut self) -> Task {
        let pick = self.index.sample(&mut self.rng);
        let (pickup, delivery) = self.pairs[pick];
        let weight = self.rng.gen_range(self.min_weight..=self.max_weight);

        let task = Task::new(TaskId(self.next_id), pickup, delivery, weight, self.rewards[pick]);
        self.next_id += 1;
        task
    }
}

/// Vehicles parked at random cities
pub fn generate_fleet(topology: &dyn Topology, config: &SimulationConfig, rng: &mut ChaCha8Rng) -> Vec<Vehicle> {
    (0..config.vehicles_per_agent)
        .map(|i| {
            let location = CityId(rng.gen_range(0..topology.num_cities()));
            Vehicle::new(VehicleId(i), config.capacity, location, config.cost_per_km)
        })
        .collect()
}

/// One auction round as exported to CSV
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundRecord {
    pub round: usize,
    pub task: u64,
    pub pickup: usize,
    pub delivery: usize,
    pub weight: u32,
    pub winner: Option<usize>,
    pub price: Option<u64>,
    /// Every bid, `-` for abstentions
    pub bids: String,
}

/// End-of-auction figures for one agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSummary {
    pub agent: usize,
    pub policy: String,
    pub tasks_won: usize,
    /// Sum of the winning bids
    pub revenue: u64,
    pub distance: f64,
    pub cost: f64,
    pub profit: f64,
    pub valid: bool,
    pub error: Option<String>,
}

struct Participant {
    agent: Box<dyn AuctionBehavior>,
    vehicles: Vec<Vehicle>,
    won: Vec<Task>,
    revenue: u64,
}

/// First-price sealed-bid auction over a sequence of tasks
pub struct Auction<'a> {
    map: &'a CityMap,
    participants: Vec<Participant>,
    records: Vec<RoundRecord>,
}

impl<'a> Auction<'a> {
    pub fn new(map: &'a CityMap) -> Self {
        Auction {
            map,
            participants: Vec::new(),
            records: Vec::new(),
        }
    }

    /// Register the next agent; agents must be added in id order
    pub fn add_agent(&mut self, agent: Box<dyn AuctionBehavior>, vehicles: Vec<Vehicle>) {
        if agent.id().0 != self.participants.len() {
            log::warn!(
                "agent {} registered at position {}",
                agent.id().0,
                self.participants.len()
            );
        }
        self.participants.push(Participant {
            agent,
            vehicles,
            won: Vec::new(),
            revenue: 0,
        });
    }

    pub fn num_agents(&self) -> usize {
        self.participants.len()
    }

    pub fn records(&self) -> &[RoundRecord] {
        &self.records
    }

    /// Collect bids for `task` and award it.
    ///
    /// The lowest bid wins, ties go to the lowest agent id. Every agent
    /// hears the outcome; a task nobody bids on is dropped.
    pub fn run_round(&mut self, task: Task) -> &RoundRecord {
        let bids: Vec<Option<u64>> = self
            .participants
            .iter_mut()
            .map(|p| p.agent.price_for(&task))
            .collect();

        let winner = bids
            .iter()
            .enumerate()
            .filter_map(|(i, bid)| bid.map(|b| (b, i)))
            .min();

        if let Some((price, index)) = winner {
            let winner_id = self.participants[index].agent.id();
            for participant in &mut self.participants {
                participant.agent.report_round_outcome(&task, winner_id, &bids);
            }
            let participant = &mut self.participants[index];
            participant.won.push(task);
            participant.revenue += price;
        } else {
            log::warn!("nobody bid for {}", task);
        }

        let bids_text: Vec<String> = bids
            .iter()
            .map(|b| b.map_or_else(|| "-".to_string(), |v| v.to_string()))
            .collect();

        self.records.push(RoundRecord {
            round: self.records.len(),
            task: task.id.0,
            pickup: task.pickup.0,
            delivery: task.delivery.0,
            weight: task.weight,
            winner: winner.map(|(_, i)| i),
            price: winner.map(|(p, _)| p),
            bids: bids_text.join(";"),
        });

        &self.records[self.records.len() - 1]
    }

    /// Ask every agent for its plans, validate and cost them
    pub fn finish(&mut self) -> Vec<AgentSummary> {
        let map = self.map;

        self.participants
            .iter_mut()
            .map(|p| {
                let plans = p.agent.produce_plan(&p.vehicles);
                let outcome = validate_plans(map, &p.vehicles, &p.won, &plans);

                let mut distance = 0.0;
                let mut cost = 0.0;
                for (plan, vehicle) in plans.iter().zip(&p.vehicles) {
                    let d = plan.total_distance(map);
                    distance += d;
                    cost += d * vehicle.cost_per_km;
                }

                if let Err(e) = &outcome {
                    log::warn!("agent {}: invalid plan: {}", p.agent.id().0, e);
                }

                AgentSummary {
                    agent: p.agent.id().0,
                    policy: p.agent.name().to_string(),
                    tasks_won: p.won.len(),
                    revenue: p.revenue,
                    distance,
                    cost,
                    profit: p.revenue as f64 - cost,
                    valid: outcome.is_ok(),
                    error: outcome.err().map(|e| e.to_string()),
                }
            })
            .collect()
    }
}

/// Check that `plans` drive along roads and carry every won task once
pub fn validate_plans(map: &CityMap, vehicles: &[Vehicle], won: &[Task], plans: &[Plan]) -> Result<(), PlanError> {
    if plans.len() != vehicles.len() {
        return Err(PlanError::PlanCount {
            expected: vehicles.len(),
            got: plans.len(),
        });
    }

    let tasks: HashMap<TaskId, &Task> = won.iter().map(|t| (t.id, t)).collect();
    let mut picked: HashSet<TaskId> = HashSet::new();
    let mut delivered: HashSet<TaskId> = HashSet::new();

    for (vehicle, plan) in vehicles.iter().zip(plans) {
        let v = vehicle.id.0;
        let mut city = vehicle.location;
        let mut load: u64 = 0;
        let mut carrying: HashSet<TaskId> = HashSet::new();

        for action in &plan.actions {
            match *action {
                Action::Move(next) => {
                    if !map.neighbors(city).contains(&next) {
                        return Err(PlanError::NoRoad { vehicle: v, from: city.0, to: next.0 });
                    }
                    city = next;
                }
                Action::Pickup(id) => {
                    let task = tasks.get(&id).ok_or(PlanError::UnknownTask { vehicle: v, task: id })?;
                    if task.pickup != city {
                        return Err(PlanError::WrongCity { vehicle: v, task: id });
                    }
                    if !picked.insert(id) {
                        return Err(PlanError::DuplicatePickup { vehicle: v, task: id });
                    }
                    load += task.weight as u64;
                    if load > vehicle.capacity as u64 {
                        return Err(PlanError::Overloaded { vehicle: v, load, capacity: vehicle.capacity });
                    }
                    carrying.insert(id);
                }
                Action::Delivery(id) => {
                    let task = tasks.get(&id).ok_or(PlanError::UnknownTask { vehicle: v, task: id })?;
                    if !carrying.remove(&id) {
                        return Err(PlanError::NotCarried { vehicle: v, task: id });
                    }
                    if task.delivery != city {
                        return Err(PlanError::WrongCity { vehicle: v, task: id });
                    }
                    load -= task.weight as u64;
                    delivered.insert(id);
                }
            }
        }
    }

    match won.iter().find(|t| !delivered.contains(&t.id)) {
        Some(t) => Err(PlanError::Undelivered(t.id)),
        None => Ok(()),
    }
}

/// Export round records to CSV
pub fn export_rounds_csv<P: AsRef<Path>>(records: &[RoundRecord], path: P) -> std::io::Result<()> {
    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(file);

    for record in records {
        writer.serialize(record)?;
    }

    writer.flush()?;
    Ok(())
}

/// Export agent summaries to CSV
pub fn export_summary_csv<P: AsRef<Path>>(summaries: &[AgentSummary], path: P) -> std::io::Result<()> {
    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(file);

    for summary in summaries {
        writer.serialize(summary)?;
    }

    writer.flush()?;
    Ok(())
}

/// Text report of an auction
pub fn generate_report(map_name: &str, records: &[RoundRecord], summaries: &[AgentSummary]) -> String {
    let mut report = String::new();

    report.push_str("========================================\n");
    report.push_str("          Auction Report\n");
    report.push_str("========================================\n\n");

    let awarded = records.iter().filter(|r| r.winner.is_some()).count();
    report.push_str(&format!("Map: {}\n", map_name));
    report.push_str(&format!("Rounds: {} ({} awarded)\n\n", records.len(), awarded));

    report.push_str("-".repeat(90).as_str());
    report.push('\n');
    report.push_str(&format!(
        "{:<6} {:<14} {:>6} {:>12} {:>12} {:>12} {:>12} {:>8}\n",
        "Agent", "Policy", "Tasks", "Revenue", "Distance", "Cost", "Profit", "Valid"
    ));
    report.push_str("-".repeat(90).as_str());
    report.push('\n');

    for s in summaries {
        report.push_str(&format!(
            "{:<6} {:<14} {:>6} {:>12} {:>12.1} {:>12.1} {:>12.1} {:>8}\n",
            s.agent,
            s.policy,
            s.tasks_won,
            s.revenue,
            s.distance,
            s.cost,
            s.profit,
            if s.valid { "yes" } else { "NO" }
        ));
    }

    report.push_str("-".repeat(90).as_str());
    report.push('\n');

    if let Some(best) = summaries
        .iter()
        .filter(|s| s.valid)
        .max_by(|a, b| a.profit.total_cmp(&b.profit))
    {
        report.push_str(&format!("\nWinner: agent {} ({}), profit {:.1}\n", best.agent, best.policy, best.profit));
    }

    for s in summaries.iter().filter(|s| !s.valid) {
        if let Some(e) = &s.error {
            report.push_str(&format!("Agent {} plan rejected: {}\n", s.agent, e));
        }
    }

    report
}
