//! Run a random grid scenario with both strategies and print ride statistics.
//!
//! Run with: cargo run -p dispatch_core --example scenario_run [events.jsonl]
//! Set RUST_LOG=dispatch_core=debug to trace every confirmation.

use std::fs::File;
use std::io::BufWriter;
use std::sync::Arc;

use bevy_ecs::prelude::World;
use dispatch_core::config::{DispatchConfig, StrategyKind};
use dispatch_core::network::{GridNetwork, GridParams};
use dispatch_core::runner::{initialize_simulation, run_until_empty, simulation_schedule};
use dispatch_core::scenario::{build_scenario, random_demand, random_fleet, ScenarioParams};
use dispatch_core::telemetry::EventLog;
use tracing_subscriber::EnvFilter;

const NUM_VEHICLES: usize = 40;
const NUM_PASSENGERS: usize = 400;
const DEMAND_WINDOW_SECS: u64 = 3600;
const SEED: u64 = 123;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("dispatch_core=info")),
        )
        .init();

    let network = Arc::new(GridNetwork::grid(12, 12, GridParams::default()));
    let vehicles = random_fleet(&network, NUM_VEHICLES, 2 * DEMAND_WINDOW_SECS, SEED);
    let passengers = random_demand(&network, NUM_PASSENGERS, DEMAND_WINDOW_SECS, SEED);
    let jsonl_path = std::env::args().nth(1);

    for strategy in [StrategyKind::RuleBased, StrategyKind::Assignment] {
        let mut world = World::new();
        let params = ScenarioParams::default()
            .with_dispatch(
                DispatchConfig::default()
                    .with_strategy(strategy)
                    .with_confirmation_delay_secs(10)
                    .with_reoptimization_step_secs(15),
            )
            .with_max_search_secs(600);
        if let Err(err) = build_scenario(&mut world, network.clone(), &vehicles, &passengers, params) {
            eprintln!("invalid scenario: {err}");
            std::process::exit(1);
        }

        initialize_simulation(&mut world);
        let mut schedule = simulation_schedule();
        let steps = run_until_empty(&mut world, &mut schedule, 2_000_000);

        let log = world.resource::<EventLog>();
        let records = log.ride_records();
        let completed: Vec<_> = records.values().filter(|r| r.is_completed()).collect();
        let rejected = records.values().filter(|r| r.rejected_at.is_some()).count();
        let mean_secs = |values: Vec<u64>| {
            if values.is_empty() {
                0.0
            } else {
                values.iter().sum::<u64>() as f64 / values.len() as f64 / 1000.0
            }
        };
        let to_schedule = mean_secs(completed.iter().filter_map(|r| r.time_to_schedule()).collect());
        let wait = mean_secs(completed.iter().filter_map(|r| r.wait_time()).collect());
        let ride = mean_secs(completed.iter().filter_map(|r| r.ride_duration()).collect());

        println!(
            "--- {strategy:?}: {NUM_PASSENGERS} passengers, {NUM_VEHICLES} vehicles, seed {SEED} ---"
        );
        println!("Steps executed:        {steps}");
        println!("Events logged:         {}", log.len());
        println!("Completed rides:       {}", completed.len());
        println!("Rejected requests:     {rejected}");
        println!("Mean time to schedule: {to_schedule:.1} s");
        println!("Mean wait for pickup:  {wait:.1} s");
        println!("Mean ride duration:    {ride:.1} s");

        if let Some(path) = &jsonl_path {
            let path = format!("{path}.{strategy:?}").to_lowercase();
            let written = File::create(&path)
                .map_err(serde_json::Error::io)
                .and_then(|file| log.write_json_lines(BufWriter::new(file)));
            match written {
                Ok(()) => println!("Event log written to {path}"),
                Err(err) => eprintln!("failed to write {path}: {err}"),
            }
        }
        println!();
    }
}
