use crate::instance::TaskId;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read configuration file {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Time budget `{0}` must be greater than zero")]
    InvalidBudget(&'static str),
    #[error("`{name}` must lie in {range}, got {value}")]
    OutOfRange {
        name: &'static str,
        range: &'static str,
        value: f64,
    },
    #[error("Agent has no vehicle")]
    NoVehicle,
}

#[derive(Debug, Error)]
pub enum MapError {
    #[error("Cannot open map file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("Unknown city {0}")]
    UnknownCity(usize),
    #[error("Map has no city")]
    Empty,
    #[error("City {0} cannot be reached from city 0")]
    Disconnected(usize),
}

/// A plan the host cannot execute
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    #[error("Agent returned {got} plans for {expected} vehicles")]
    PlanCount { expected: usize, got: usize },
    #[error("Vehicle {vehicle}: no road from city {from} to city {to}")]
    NoRoad { vehicle: usize, from: usize, to: usize },
    #[error("Vehicle {vehicle}: task {task} handled at the wrong city")]
    WrongCity { vehicle: usize, task: TaskId },
    #[error("Vehicle {vehicle}: task {task} is not the agent's")]
    UnknownTask { vehicle: usize, task: TaskId },
    #[error("Vehicle {vehicle}: task {task} delivered before pickup")]
    NotCarried { vehicle: usize, task: TaskId },
    #[error("Vehicle {vehicle}: task {task} picked up twice")]
    DuplicatePickup { vehicle: usize, task: TaskId },
    #[error("Vehicle {vehicle}: load {load} exceeds capacity {capacity}")]
    Overloaded { vehicle: usize, load: u64, capacity: u32 },
    #[error("Task {0} is never delivered")]
    Undelivered(TaskId),
}
