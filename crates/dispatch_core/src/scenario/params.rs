use std::collections::BTreeMap;

use bevy_ecs::prelude::Resource;

use crate::config::DispatchConfig;
use crate::model::{secs, LinkId, Location, PassengerId, RequestId, SimTime, VehicleId};

/// Simulation end time in milliseconds. When set, the runner stops processing events
/// once the next event would be at or after this timestamp (so the simulation "ends" at this time).
#[derive(Debug, Clone, Copy, Resource)]
pub struct SimulationEndTimeMs(pub u64);

/// Demand-side behaviour shared by every request.
#[derive(Debug, Clone, Copy, Default, Resource)]
pub struct DemandConfig {
    /// How long a passenger waits for a vehicle before giving up; `None` = forever.
    pub max_search: Option<SimTime>,
}

/// A vehicle placed on the network at scenario start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VehicleSpec {
    pub id: VehicleId,
    pub link: LinkId,
    pub service_begin: SimTime,
    pub service_end: SimTime,
}

impl VehicleSpec {
    /// In service from time 0 for `service_secs`.
    pub fn new(id: u64, link: LinkId, service_secs: u64) -> Self {
        Self {
            id: VehicleId(id),
            link,
            service_begin: 0,
            service_end: secs(service_secs),
        }
    }
}

/// A passenger who submits one immediate ride request at `departure`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassengerSpec {
    pub id: PassengerId,
    pub from: LinkId,
    pub to: LinkId,
    pub departure: SimTime,
}

impl PassengerSpec {
    pub fn new(id: u64, from: LinkId, to: LinkId, departure_secs: u64) -> Self {
        Self {
            id: PassengerId(id),
            from,
            to,
            departure: secs(departure_secs),
        }
    }
}

/// A request waiting for its submission time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingRequest {
    pub passenger: PassengerId,
    pub from: Location,
    pub to: Location,
}

#[derive(Debug, Default, Resource)]
pub struct PendingRequests(pub BTreeMap<RequestId, PendingRequest>);

/// Scenario configuration: dispatch settings plus the harness around them.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioParams {
    pub dispatch: DispatchConfig,
    pub pickup_duration_secs: u64,
    pub dropoff_duration_secs: u64,
    pub max_search_secs: Option<u64>,
    pub simulation_end_time_ms: Option<u64>,
}

impl Default for ScenarioParams {
    fn default() -> Self {
        Self {
            dispatch: DispatchConfig::default(),
            pickup_duration_secs: 120,
            dropoff_duration_secs: 60,
            max_search_secs: None,
            simulation_end_time_ms: None,
        }
    }
}

impl ScenarioParams {
    pub fn with_dispatch(mut self, dispatch: DispatchConfig) -> Self {
        self.dispatch = dispatch;
        self
    }

    /// Stop durations at pickup and drop-off.
    pub fn with_stop_durations_secs(mut self, pickup: u64, dropoff: u64) -> Self {
        self.pickup_duration_secs = pickup;
        self.dropoff_duration_secs = dropoff;
        self
    }

    /// Passengers give up (and are rejected) after waiting this long for a vehicle.
    pub fn with_max_search_secs(mut self, max_search: u64) -> Self {
        self.max_search_secs = Some(max_search);
        self
    }

    /// Set simulation end time in ms. Runner stops when the next event is at or after this time.
    pub fn with_simulation_end_time_ms(mut self, end_ms: u64) -> Self {
        self.simulation_end_time_ms = Some(end_ms);
        self
    }
}
