//! Batch assignment: one sparse minimum-cost bipartite matching per cycle
//! between plannable requests and idle or soon-idle vehicles.

use std::collections::BTreeMap;
use std::fmt;

use h3o::Resolution;
use tracing::{debug, warn, Span};

use crate::confirmation::ConfirmationRegistry;
use crate::config::DispatchConfig;
use crate::error::{ConfigError, DispatchError};
use crate::fleet::Fleet;
use crate::model::{secs, Location, Request, RequestId, SimTime, ONE_SEC_MS};
use crate::routing::{PathData, PathProvider};
use crate::spatial::ZoneMap;

use super::algorithm::InsertionStrategy;
use super::hungarian;
use super::snapshot::{CycleSnapshot, VehicleEntry};
use super::state::{DispatchContext, DispatchState};
use super::types::{CycleReport, Dispatch};

#[derive(Debug)]
pub struct AssignmentStrategy {
    nearest_vehicles_limit: usize,
    nearest_requests_limit: usize,
    wait_time_weight: f64,
    undersupply_horizon: SimTime,
    resolution: Resolution,
    span: Span,
}

impl AssignmentStrategy {
    pub fn new(config: &DispatchConfig, span: Span) -> Result<Self, ConfigError> {
        Ok(Self {
            nearest_vehicles_limit: config.nearest_vehicles_limit,
            nearest_requests_limit: config.nearest_requests_limit,
            wait_time_weight: config.wait_time_weight,
            undersupply_horizon: secs(config.veh_planning_horizon_undersupply_secs),
            resolution: config.resolution()?,
            span,
        })
    }

    /// Pickup travel time plus weighted rider wait, in seconds.
    fn cost(&self, request: &Request, path: &PathData) -> f64 {
        let travel = path.travel_time as f64 / ONE_SEC_MS as f64;
        let wait = path.arrival().saturating_sub(request.earliest_start) as f64 / ONE_SEC_MS as f64;
        travel + self.wait_time_weight * wait
    }

    /// Request/vehicle index pairs restricted to each side's nearest-K counterparts.
    fn candidate_pairs(
        &self,
        requests: &[Request],
        vehicles: &[&VehicleEntry],
    ) -> BTreeMap<usize, Vec<usize>> {
        let mut vehicle_zones = ZoneMap::new(self.resolution);
        for (vi, v) in vehicles.iter().enumerate() {
            vehicle_zones.insert(vi, v.location);
        }
        let mut request_zones = ZoneMap::new(self.resolution);
        for (ri, r) in requests.iter().enumerate() {
            request_zones.insert(ri, r.from);
        }

        let mut pairs: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (ri, r) in requests.iter().enumerate() {
            let near = vehicle_zones.nearest(r.from.coord, self.nearest_vehicles_limit, |_| true);
            pairs.entry(ri).or_default().extend(near);
        }
        for (vi, v) in vehicles.iter().enumerate() {
            for ri in request_zones.nearest(v.location.coord, self.nearest_requests_limit, |_| true)
            {
                pairs.entry(ri).or_default().push(vi);
            }
        }
        for list in pairs.values_mut() {
            list.sort_unstable();
            list.dedup();
        }
        pairs
    }
}

impl InsertionStrategy for AssignmentStrategy {
    fn name(&self) -> &'static str {
        "assignment"
    }

    fn schedule(
        &mut self,
        _planning: &[RequestId],
        snapshot: &CycleSnapshot,
        state: &mut DispatchState,
        ctx: &mut DispatchContext<'_>,
        report: &mut CycleReport,
    ) -> Result<(), DispatchError> {
        let now = ctx.now;
        let requests: Vec<Request> = snapshot
            .requests
            .iter()
            .filter(|e| state.is_plannable(e.id, now))
            .filter_map(|e| state.unplanned.get(e.id).cloned())
            .collect();
        if requests.is_empty() {
            return Ok(());
        }
        let vehicles: Vec<&VehicleEntry> = snapshot
            .vehicles
            .iter()
            .filter(|v| !state.registry.is_waiting_vehicle(v.id))
            .collect();

        let pairs = self.candidate_pairs(&requests, &vehicles);
        let mut edges = Vec::new();
        let mut edge_paths: BTreeMap<(usize, usize), PathData> = BTreeMap::new();
        for (&ri, vis) in &pairs {
            let request = &requests[ri];
            let origins: Vec<(Location, SimTime)> = vis
                .iter()
                .map(|&vi| (vehicles[vi].location, vehicles[vi].available_at))
                .collect();
            let found = ctx.paths.paths_to(&origins, &request.from);
            for (&vi, path) in vis.iter().zip(found) {
                let Some(path) = path else {
                    continue;
                };
                edges.push((ri, vi, self.cost(request, &path)));
                edge_paths.insert((ri, vi), path);
            }
        }

        let assignments = hungarian::solve(requests.len(), vehicles.len(), &edges);
        debug!(
            parent: &self.span,
            requests = requests.len(),
            urgent = snapshot.urgent_requests,
            vehicles = vehicles.len(),
            idle = snapshot.idle_vehicles,
            horizon_ms = snapshot.horizon.horizon,
            supply = ?snapshot.horizon.supply,
            edges = edges.len(),
            assigned = assignments.len(),
            "batch assignment solved"
        );

        if assignments.len() < requests.len() {
            let mut matched = vec![false; requests.len()];
            for &(ri, _) in &assignments {
                matched[ri] = true;
            }
            let unmatched: Vec<Location> = requests
                .iter()
                .zip(&matched)
                .filter(|(_, &m)| !m)
                .map(|(r, _)| r.from)
                .collect();
            report.unmatched += unmatched.len();
            let fleet_state = FleetSummary::collect(
                &*ctx.fleet,
                &state.registry,
                ctx.paths,
                &unmatched,
                now,
                self.undersupply_horizon,
            );
            warn!(
                parent: &self.span,
                requests = requests.len(),
                urgent = snapshot.urgent_requests,
                vehicles = vehicles.len(),
                idle = snapshot.idle_vehicles,
                horizon_ms = snapshot.horizon.horizon,
                assigned = assignments.len(),
                unmatched = unmatched.len(),
                fleet = %fleet_state,
                "cannot find a vehicle for every request"
            );
        }

        for (ri, vi) in assignments {
            let Some(path) = edge_paths.remove(&(ri, vi)) else {
                continue;
            };
            let dispatch = Dispatch {
                vehicle: vehicles[vi].id,
                request: requests[ri].id,
                path,
            };
            state.open_confirmation(dispatch, ctx, report)?;
        }
        Ok(())
    }
}

/// Min/avg/max over a sample; all zero when empty.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Stats {
    pub min: f64,
    pub avg: f64,
    pub max: f64,
}

impl Stats {
    fn of(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let avg = values.iter().sum::<f64>() / values.len() as f64;
        Self { min, avg, max }
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{avg: {:.1}, min: {:.1}, max: {:.1}}}", self.avg, self.min, self.max)
    }
}

/// Fleet state logged when a batch leaves requests unmatched.
#[derive(Debug, Clone, PartialEq)]
pub struct FleetSummary {
    pub offline: usize,
    pub online: usize,
    /// Online, busy past the undersupply horizon.
    pub driving: usize,
    pub awaiting_confirmation: usize,
    /// Seconds until pending confirmations are due.
    pub confirmation_due_secs: Stats,
    /// Online and free within the undersupply horizon.
    pub idle: usize,
    /// Pickup travel time from idle vehicles to the unmatched requests, seconds.
    pub eta_to_idle_secs: Stats,
}

impl FleetSummary {
    pub fn collect(
        fleet: &dyn Fleet,
        registry: &ConfirmationRegistry,
        paths: &dyn PathProvider,
        unmatched: &[Location],
        now: SimTime,
        undersupply_horizon: SimTime,
    ) -> Self {
        let mut summary = Self {
            offline: 0,
            online: 0,
            driving: 0,
            awaiting_confirmation: 0,
            confirmation_due_secs: Stats::default(),
            idle: 0,
            eta_to_idle_secs: Stats::default(),
        };
        let mut due = Vec::new();
        let mut etas = Vec::new();
        for vehicle in fleet.vehicle_ids() {
            if fleet.is_out_of_service(vehicle, now) {
                summary.offline += 1;
                continue;
            }
            summary.online += 1;
            if let Some(confirmation) = registry.lookup_vehicle(vehicle) {
                summary.awaiting_confirmation += 1;
                due.push(confirmation.due_at.saturating_sub(now) as f64 / ONE_SEC_MS as f64);
                continue;
            }
            match fleet.earliest_idleness(vehicle, now) {
                Some(idle) if idle.time <= now.saturating_add(undersupply_horizon) => {
                    summary.idle += 1;
                    etas.extend(
                        paths
                            .paths_from(&idle.location, unmatched, now)
                            .into_iter()
                            .flatten()
                            .map(|p| p.travel_time as f64 / ONE_SEC_MS as f64),
                    );
                }
                _ => summary.driving += 1,
            }
        }
        summary.confirmation_due_secs = Stats::of(&due);
        summary.eta_to_idle_secs = Stats::of(&etas);
        summary
    }
}

fn share(count: usize, total: usize) -> String {
    let pct = if total == 0 {
        0.0
    } else {
        count as f64 * 100.0 / total as f64
    };
    format!("{count}/{total} ({pct:.1}%)")
}

impl fmt::Display for FleetSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.offline + self.online;
        write!(
            f,
            "{{offline: {}, online: {}, driving: {}, waiting_conf: {}, waiting_conf_due_secs: {}, idle: {}, eta_to_idle_vehicles: {}}}",
            share(self.offline, total),
            share(self.online, total),
            share(self.driving, total),
            share(self.awaiting_confirmation, total),
            self.confirmation_due_secs,
            share(self.idle, total),
            self.eta_to_idle_secs,
        )
    }
}
