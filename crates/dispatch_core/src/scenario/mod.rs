//! Scenario setup: road network, fleet, demand and dispatch configuration
//! turned into ECS resources plus the initial event queue.

mod build;
mod params;

pub use build::{build_scenario, random_demand, random_fleet};
pub use params::{
    DemandConfig, PassengerSpec, PendingRequest, PendingRequests, ScenarioParams,
    SimulationEndTimeMs, VehicleSpec,
};
