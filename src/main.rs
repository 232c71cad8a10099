//! PD Auction Agent - Command Line Interface
//!
//! Runs simulated pickup-and-delivery auctions between bidding agents.

use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use pd_auction_agent::agent::{AgentIdentity, AuctionAgent};
use pd_auction_agent::config::{AgentConfig, PolicyKind};
use pd_auction_agent::instance::AgentId;
use pd_auction_agent::simulation::{
    export_rounds_csv, export_summary_csv, generate_fleet, generate_report, Auction, SimulationConfig,
    TaskGenerator,
};
use pd_auction_agent::topology::{CityMap, Topology, UniformDistribution};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "pd-auction-agent")]
#[command(version = "1.0")]
#[command(about = "Bidding agents for pickup-and-delivery task auctions")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an auction between agents
    Simulate {
        /// Road map file
        #[arg(short, long, default_value = "data/switzerland.map")]
        map: PathBuf,

        /// One bidding policy per agent
        #[arg(short, long, value_enum, value_delimiter = ',', default_value = "marginal-cost,sequential")]
        policies: Vec<Policy>,

        /// Number of auctioned tasks
        #[arg(short, long, default_value = "20")]
        rounds: usize,

        /// Vehicles per agent
        #[arg(long, default_value = "2")]
        vehicles: usize,

        /// Vehicle capacity
        #[arg(long, default_value = "30")]
        capacity: u32,

        /// Random seed
        #[arg(short, long, default_value = "42")]
        seed: u64,

        /// Agent configuration (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Bid time budget in milliseconds
        #[arg(long)]
        bid_ms: Option<u64>,

        /// Planning time budget in milliseconds
        #[arg(long)]
        plan_ms: Option<u64>,

        /// Output directory for CSV results
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print every round
        #[arg(short, long)]
        verbose: bool,
    },

    /// Analyze a road map
    Analyze {
        /// Road map file
        #[arg(short, long)]
        map: PathBuf,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum Policy {
    /// Everything on the largest vehicle, in award order
    Sequential,
    /// With/without searches guarded by estimators
    MarginalCost,
    /// Marginal cost averaged over likely future tasks
    Bayesian,
}

impl From<Policy> for PolicyKind {
    fn from(policy: Policy) -> Self {
        match policy {
            Policy::Sequential => PolicyKind::Sequential,
            Policy::MarginalCost => PolicyKind::MarginalCost,
            Policy::Bayesian => PolicyKind::Bayesian,
        }
    }
}

struct SimulateArgs {
    map: PathBuf,
    policies: Vec<Policy>,
    rounds: usize,
    vehicles: usize,
    capacity: u32,
    seed: u64,
    config: Option<PathBuf>,
    bid_ms: Option<u64>,
    plan_ms: Option<u64>,
    output: Option<PathBuf>,
    verbose: bool,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            map,
            policies,
            rounds,
            vehicles,
            capacity,
            seed,
            config,
            bid_ms,
            plan_ms,
            output,
            verbose,
        } => {
            run_simulation(SimulateArgs {
                map,
                policies,
                rounds,
                vehicles,
                capacity,
                seed,
                config,
                bid_ms,
                plan_ms,
                output,
                verbose,
            });
        }

        Commands::Analyze { map } => {
            analyze_map(&map);
        }
    }
}

fn load_map(path: &PathBuf) -> CityMap {
    match CityMap::from_file(path) {
        Ok(map) => map,
        Err(e) => {
            eprintln!("Error loading map {:?}: {}", path, e);
            std::process::exit(1);
        }
    }
}

fn load_config(args: &SimulateArgs) -> AgentConfig {
    let mut config = match &args.config {
        Some(path) => match AgentConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },
        None => AgentConfig::default(),
    };

    if let Some(ms) = args.bid_ms {
        config.budgets.bid_ms = ms;
    }
    if let Some(ms) = args.plan_ms {
        config.budgets.plan_ms = ms;
    }
    config.seed = args.seed;
    config
}

fn run_simulation(args: SimulateArgs) {
    if args.policies.is_empty() {
        eprintln!("At least one policy is required");
        std::process::exit(1);
    }

    let map = Arc::new(load_map(&args.map));
    let distribution = Arc::new(UniformDistribution::new(map.num_cities()));
    let base_config = load_config(&args);

    let sim_config = SimulationConfig {
        rounds: args.rounds,
        seed: args.seed,
        vehicles_per_agent: args.vehicles,
        capacity: args.capacity,
        ..Default::default()
    };

    println!("Map: {} ({} cities)", map.name, map.num_cities());
    println!(
        "Agents: {}",
        args.policies.iter().map(|p| format!("{:?}", p)).collect::<Vec<_>>().join(", ")
    );
    println!(
        "Rounds: {}, bid budget: {} ms, plan budget: {} ms\n",
        sim_config.rounds, base_config.budgets.bid_ms, base_config.budgets.plan_ms
    );

    let mut fleet_rng = ChaCha8Rng::seed_from_u64(args.seed);
    let mut auction = Auction::new(&map);

    for (index, &policy) in args.policies.iter().enumerate() {
        let vehicles = generate_fleet(map.as_ref(), &sim_config, &mut fleet_rng);
        let mut config = base_config.clone();
        config.policy = policy.into();

        let identity = AgentIdentity {
            id: AgentId(index),
            vehicles: vehicles.clone(),
        };
        let agent = match AuctionAgent::initialize(map.clone(), distribution.clone(), identity, config) {
            Ok(agent) => agent,
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        };
        auction.add_agent(Box::new(agent), vehicles);
    }

    let mut generator = match TaskGenerator::new(map.as_ref(), distribution.as_ref(), &sim_config) {
        Ok(generator) => generator,
        Err(e) => {
            eprintln!("Cannot draw tasks on this map: {}", e);
            std::process::exit(1);
        }
    };

    let start = Instant::now();
    let bar = ProgressBar::new(sim_config.rounds as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("[{bar:40}] {pos}/{len} rounds ({elapsed})")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    for _ in 0..sim_config.rounds {
        let task = generator.next_task();
        let record = auction.run_round(task);

        if args.verbose {
            let outcome = match (record.winner, record.price) {
                (Some(winner), Some(price)) => format!("agent {} at {}", winner, price),
                _ => "no winner".to_string(),
            };
            bar.println(format!("{} -> {} (bids {})", task, outcome, record.bids));
        }
        bar.inc(1);
    }

    bar.finish_and_clear();

    let summaries = auction.finish();
    println!("{}", generate_report(&map.name, auction.records(), &summaries));
    println!("Total time: {:.2}s", start.elapsed().as_secs_f64());

    if let Some(dir) = args.output {
        if let Err(e) = std::fs::create_dir_all(&dir) {
            eprintln!("Cannot create {:?}: {}", dir, e);
            std::process::exit(1);
        }

        let rounds_path = dir.join("rounds.csv");
        let summary_path = dir.join("summary.csv");
        if let Err(e) = export_rounds_csv(auction.records(), &rounds_path)
            .and_then(|_| export_summary_csv(&summaries, &summary_path))
        {
            eprintln!("Failed to export results: {}", e);
            std::process::exit(1);
        }
        println!("Results exported to {:?} and {:?}", rounds_path, summary_path);
    }
}

fn analyze_map(path: &PathBuf) {
    let map = load_map(path);

    println!("========== Map Analysis ==========\n");
    println!("{}", map.statistics());

    let mut cities: Vec<_> = map.cities.iter().collect();
    cities.sort_by_key(|c| std::cmp::Reverse(map.neighbors(c.id).len()));

    println!("Best connected cities:");
    for city in cities.iter().take(5) {
        println!(
            "  {:<15} {} roads",
            city.name,
            map.neighbors(city.id).len()
        );
    }
}
