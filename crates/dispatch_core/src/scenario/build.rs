use std::sync::Arc;

use bevy_ecs::prelude::World;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info_span;

use crate::clock::{EventKind, EventSubject, SimulationClock};
use crate::dispatcher::{Dispatcher, DispatcherResource};
use crate::error::ScenarioError;
use crate::fleet::schedule::SimFleet;
use crate::model::{secs, LinkId, PassengerId, RequestId, SimTime};
use crate::network::GridNetwork;
use crate::routing::{PathProvider, PathProviderResource};
use crate::scenario::params::{
    DemandConfig, PassengerSpec, PendingRequest, PendingRequests, ScenarioParams,
    SimulationEndTimeMs, VehicleSpec,
};
use crate::telemetry::EventLog;

/// Insert every resource the simulation schedule needs and queue one
/// `RequestSubmitted` event per passenger. Request ids follow passenger order.
pub fn build_scenario(
    world: &mut World,
    network: Arc<GridNetwork>,
    vehicles: &[VehicleSpec],
    passengers: &[PassengerSpec],
    params: ScenarioParams,
) -> Result<(), ScenarioError> {
    let span = info_span!("dispatch", strategy = ?params.dispatch.strategy);
    let dispatcher = Dispatcher::new(params.dispatch.clone(), span)?;

    let paths: Arc<dyn PathProvider> = network.clone();
    let mut fleet = SimFleet::new(
        paths.clone(),
        secs(params.pickup_duration_secs),
        secs(params.dropoff_duration_secs),
    );
    for spec in vehicles {
        let start = network
            .location(spec.link)
            .ok_or(ScenarioError::UnknownLink(spec.link))?;
        fleet.add_vehicle(spec.id, start, spec.service_begin, spec.service_end)?;
    }

    let mut clock = SimulationClock::default();
    let mut pending = PendingRequests::default();
    for (idx, spec) in passengers.iter().enumerate() {
        let from = network
            .location(spec.from)
            .ok_or(ScenarioError::UnknownLink(spec.from))?;
        let to = network
            .location(spec.to)
            .ok_or(ScenarioError::UnknownLink(spec.to))?;
        let id = RequestId(idx as u64);
        pending.0.insert(
            id,
            PendingRequest {
                passenger: spec.id,
                from,
                to,
            },
        );
        clock.schedule_at(
            spec.departure,
            EventKind::RequestSubmitted,
            Some(EventSubject::Request(id)),
        );
    }

    world.insert_resource(clock);
    world.insert_resource(EventLog::default());
    world.insert_resource(PathProviderResource(paths));
    world.insert_resource(fleet);
    world.insert_resource(DispatcherResource(dispatcher));
    world.insert_resource(pending);
    world.insert_resource(DemandConfig {
        max_search: params.max_search_secs.map(secs),
    });
    if let Some(end_ms) = params.simulation_end_time_ms {
        world.insert_resource(SimulationEndTimeMs(end_ms));
    }
    Ok(())
}

/// Seeded random fleet: `count` vehicles on random links, in service from 0
/// for `service_secs`.
pub fn random_fleet(
    network: &GridNetwork,
    count: usize,
    service_secs: u64,
    seed: u64,
) -> Vec<VehicleSpec> {
    let links: Vec<LinkId> = network.links().map(|l| l.id).collect();
    if links.is_empty() {
        return Vec::new();
    }
    let mut rng = StdRng::seed_from_u64(seed.wrapping_add(0x5eed_f1ee7));
    (0..count)
        .map(|i| VehicleSpec::new(i as u64, links[rng.gen_range(0..links.len())], service_secs))
        .collect()
}

/// Seeded random demand: `count` passengers departing uniformly in
/// `[0, window_secs)`, each travelling between two distinct links.
pub fn random_demand(
    network: &GridNetwork,
    count: usize,
    window_secs: u64,
    seed: u64,
) -> Vec<PassengerSpec> {
    let links: Vec<LinkId> = network.links().map(|l| l.id).collect();
    if links.len() < 2 {
        return Vec::new();
    }
    let mut rng = StdRng::seed_from_u64(seed.wrapping_add(0xdea_d5eed));
    let window: SimTime = secs(window_secs).max(1);
    let mut passengers: Vec<PassengerSpec> = (0..count)
        .map(|i| {
            let from = rng.gen_range(0..links.len());
            // Shift by 1..len so the destination always differs.
            let to = (from + rng.gen_range(1..links.len())) % links.len();
            PassengerSpec {
                id: PassengerId(i as u64),
                from: links[from],
                to: links[to],
                departure: rng.gen_range(0..window),
            }
        })
        .collect();
    passengers.sort_by_key(|p| (p.departure, p.id));
    passengers
}
