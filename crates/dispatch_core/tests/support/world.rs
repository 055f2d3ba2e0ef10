#![allow(dead_code)]

use std::sync::Arc;

use bevy_ecs::prelude::World;
use dispatch_core::config::DispatchConfig;
use dispatch_core::model::LinkId;
use dispatch_core::network::{GridNetwork, GridParams};
use dispatch_core::scenario::{build_scenario, PassengerSpec, ScenarioParams, VehicleSpec};
use dispatch_core::telemetry::EventLog;

use super::schedule::ScheduleRunner;

/// Service window used by every test vehicle.
pub const SERVICE_SECS: u64 = 1000;

/// Builder for small grid scenarios: vehicles and passengers placed on named
/// lattice links, then run to completion.
pub struct GridScenario {
    network: GridNetwork,
    vehicles: Vec<VehicleSpec>,
    passengers: Vec<PassengerSpec>,
    pub params: ScenarioParams,
}

impl GridScenario {
    /// Full `nx × ny` lattice with double links and default link length/speed.
    pub fn grid(nx: usize, ny: usize) -> Self {
        Self {
            network: GridNetwork::grid(nx, ny, GridParams::default()),
            vehicles: Vec::new(),
            passengers: Vec::new(),
            params: ScenarioParams::default(),
        }
    }

    /// `nx × ny` lattice nodes without links; lay the road network out with
    /// [GridScenario::one_way] and [GridScenario::double].
    pub fn nodes(nx: usize, ny: usize) -> Self {
        Self {
            network: GridNetwork::new(nx, ny, GridParams::default()),
            vehicles: Vec::new(),
            passengers: Vec::new(),
            params: ScenarioParams::default(),
        }
    }

    pub fn one_way(&mut self, from: (usize, usize), to: (usize, usize)) -> LinkId {
        self.network.add_one_way_link(from, to)
    }

    pub fn double(&mut self, a: (usize, usize), b: (usize, usize)) -> (LinkId, LinkId) {
        self.network.add_double_link(a, b)
    }

    pub fn link(&self, fx: usize, fy: usize, tx: usize, ty: usize) -> LinkId {
        let id = self.network.link_id(fx, fy, tx, ty);
        assert!(self.network.link(id).is_some(), "no link ({fx},{fy})->({tx},{ty})");
        id
    }

    pub fn dispatch(mut self, dispatch: DispatchConfig) -> Self {
        self.params.dispatch = dispatch;
        self
    }

    pub fn max_search_secs(mut self, secs: u64) -> Self {
        self.params.max_search_secs = Some(secs);
        self
    }

    pub fn add_vehicle(&mut self, id: u64, link: LinkId) {
        self.vehicles.push(VehicleSpec::new(id, link, SERVICE_SECS));
    }

    pub fn add_passenger(&mut self, id: u64, from: LinkId, to: LinkId, departure_secs: u64) {
        self.passengers
            .push(PassengerSpec::new(id, from, to, departure_secs));
    }

    pub fn build(self) -> World {
        let mut world = World::new();
        build_scenario(
            &mut world,
            Arc::new(self.network),
            &self.vehicles,
            &self.passengers,
            self.params,
        )
        .expect("scenario");
        world
    }

    /// Build and drain the event queue.
    pub fn run(self) -> World {
        let mut world = self.build();
        ScheduleRunner::new().run_full(&mut world);
        world
    }
}

pub fn event_log(world: &World) -> &EventLog {
    world.resource::<EventLog>()
}
