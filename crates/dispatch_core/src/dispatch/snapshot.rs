//! Per-cycle view of plannable requests and available vehicles.

use crate::confirmation::ConfirmationRegistry;
use crate::config::DispatchConfig;
use crate::fleet::Fleet;
use crate::model::{secs, Location, Request, RequestId, SimTime, VehicleId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupplyState {
    /// Fewer idle vehicles than urgent requests.
    Undersupply,
    Oversupply,
}

/// How far ahead a busy vehicle's idleness still counts as available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanningHorizon {
    pub supply: SupplyState,
    pub horizon: SimTime,
}

impl PlanningHorizon {
    pub fn choose(idle_vehicles: usize, urgent_requests: usize, config: &DispatchConfig) -> Self {
        if idle_vehicles < urgent_requests {
            Self {
                supply: SupplyState::Undersupply,
                horizon: secs(config.veh_planning_horizon_undersupply_secs),
            }
        } else {
            Self {
                supply: SupplyState::Oversupply,
                horizon: secs(config.veh_planning_horizon_oversupply_secs),
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RequestEntry {
    pub id: RequestId,
    pub from: Location,
    pub earliest_start: SimTime,
    pub urgent: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VehicleEntry {
    pub id: VehicleId,
    /// Where the vehicle becomes free.
    pub location: Location,
    /// When the vehicle becomes free; `now` for idle vehicles.
    pub available_at: SimTime,
    pub idle: bool,
}

/// Requests and vehicles free of any registered confirmation, taken once per
/// cycle before the strategy runs. Entries are in ascending id order.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleSnapshot {
    pub now: SimTime,
    pub requests: Vec<RequestEntry>,
    pub vehicles: Vec<VehicleEntry>,
    pub idle_vehicles: usize,
    pub urgent_requests: usize,
    pub horizon: PlanningHorizon,
}

impl CycleSnapshot {
    pub fn build<'a>(
        planning: impl IntoIterator<Item = &'a Request>,
        fleet: &dyn Fleet,
        registry: &ConfirmationRegistry,
        config: &DispatchConfig,
        now: SimTime,
    ) -> Self {
        let requests: Vec<RequestEntry> = planning
            .into_iter()
            .filter(|r| !registry.is_waiting_request(r.id) && !r.is_expired(now))
            .map(|r| RequestEntry {
                id: r.id,
                from: r.from,
                earliest_start: r.earliest_start,
                urgent: r.is_urgent(now),
            })
            .collect();
        let urgent_requests = requests.iter().filter(|r| r.urgent).count();

        let candidates: Vec<(VehicleId, bool)> = fleet
            .vehicle_ids()
            .into_iter()
            .filter(|&v| !registry.is_waiting_vehicle(v) && !fleet.is_out_of_service(v, now))
            .map(|v| (v, fleet.is_idle(v, now)))
            .collect();
        let idle_vehicles = candidates.iter().filter(|(_, idle)| *idle).count();

        let horizon = PlanningHorizon::choose(idle_vehicles, urgent_requests, config);
        let limit = now.saturating_add(horizon.horizon);
        let vehicles = candidates
            .into_iter()
            .filter_map(|(id, idle)| {
                let idleness = fleet.earliest_idleness(id, now)?;
                (idle || idleness.time <= limit).then_some(VehicleEntry {
                    id,
                    location: idleness.location,
                    available_at: idleness.time,
                    idle,
                })
            })
            .collect();

        Self {
            now,
            requests,
            vehicles,
            idle_vehicles,
            urgent_requests,
            horizon,
        }
    }

    pub fn idle(&self) -> impl Iterator<Item = &VehicleEntry> {
        self.vehicles.iter().filter(|v| v.idle)
    }
}
