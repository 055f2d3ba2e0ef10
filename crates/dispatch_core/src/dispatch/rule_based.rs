//! Greedy one-to-one insertion.
//!
//! Two symmetric modes: request-initiated (each unplanned request takes its
//! nearest-arriving idle vehicle) and vehicle-initiated (each idle vehicle takes
//! the unplanned request it reaches first). [Goal] selects the mode per cycle.

use tracing::{debug, Span};

use crate::config::{DispatchConfig, Goal};
use crate::error::DispatchError;
use crate::model::{Request, RequestId};

use super::algorithm::InsertionStrategy;
use super::finder::{best_request_for_vehicle, best_vehicle_for_request};
use super::snapshot::{CycleSnapshot, VehicleEntry};
use super::state::{DispatchContext, DispatchState};
use super::types::CycleReport;

#[derive(Debug)]
pub struct RuleBasedStrategy {
    goal: Goal,
    nearest_vehicles_limit: usize,
    nearest_requests_limit: usize,
    span: Span,
}

impl RuleBasedStrategy {
    pub fn new(config: &DispatchConfig, span: Span) -> Self {
        Self {
            goal: config.goal,
            nearest_vehicles_limit: config.nearest_vehicles_limit,
            nearest_requests_limit: config.nearest_requests_limit,
            span,
        }
    }

    /// Vehicle-initiated when the goal asks for it, or when urgent demand
    /// outnumbers idle supply under [Goal::DemandSupplyEquil].
    pub fn vehicle_initiated(&self, snapshot: &CycleSnapshot) -> bool {
        match self.goal {
            Goal::MinWaitTime => false,
            Goal::MinPickupTime => true,
            Goal::DemandSupplyEquil => snapshot.urgent_requests > snapshot.idle_vehicles,
        }
    }

    fn schedule_unplanned_requests(
        &self,
        planning: &[RequestId],
        snapshot: &CycleSnapshot,
        state: &mut DispatchState,
        ctx: &mut DispatchContext<'_>,
        report: &mut CycleReport,
    ) -> Result<(), DispatchError> {
        let mut idle_count = snapshot.idle_vehicles;
        for &id in planning {
            if !state.is_plannable(id, ctx.now) {
                continue;
            }
            if idle_count == 0 {
                report.unmatched += 1;
                continue;
            }
            let Some(request) = state.unplanned.get(id).cloned() else {
                continue;
            };

            let candidates: Vec<VehicleEntry> = state
                .zones
                .nearest_vehicles(request.from.coord, self.nearest_vehicles_limit, |v| {
                    !state.registry.is_waiting_vehicle(v)
                })
                .into_iter()
                .filter_map(|v| {
                    state.zones.vehicles().location(v).map(|location| VehicleEntry {
                        id: v,
                        location,
                        available_at: ctx.now,
                        idle: true,
                    })
                })
                .collect();

            let Some(dispatch) = best_vehicle_for_request(&request, &candidates, ctx.paths) else {
                debug!(parent: &self.span, request = %id, "no vehicle reachable");
                report.unmatched += 1;
                continue;
            };
            let opened = report.opened;
            state.open_confirmation(dispatch, ctx, report)?;
            if report.opened > opened {
                idle_count = idle_count.saturating_sub(1);
            }
        }
        Ok(())
    }

    fn schedule_idle_vehicles(
        &self,
        snapshot: &CycleSnapshot,
        state: &mut DispatchState,
        ctx: &mut DispatchContext<'_>,
        report: &mut CycleReport,
    ) -> Result<(), DispatchError> {
        let now = ctx.now;
        for vehicle in snapshot.idle() {
            if state.unplanned.is_empty() {
                break;
            }
            if state.registry.is_waiting_vehicle(vehicle.id)
                || !state.zones.vehicles().contains(vehicle.id)
            {
                continue;
            }

            let candidates: Vec<Request> = state
                .zones
                .nearest_requests(vehicle.location.coord, self.nearest_requests_limit, |r| {
                    state.is_plannable(r, now)
                })
                .into_iter()
                .filter_map(|r| state.unplanned.get(r).cloned())
                .collect();
            if candidates.is_empty() {
                continue;
            }
            let refs: Vec<&Request> = candidates.iter().collect();

            let Some(dispatch) = best_request_for_vehicle(vehicle, &refs, ctx.paths) else {
                debug!(parent: &self.span, vehicle = %vehicle.id, "no request reachable");
                continue;
            };
            state.open_confirmation(dispatch, ctx, report)?;
        }
        Ok(())
    }
}

impl InsertionStrategy for RuleBasedStrategy {
    fn name(&self) -> &'static str {
        "rule_based"
    }

    fn schedule(
        &mut self,
        planning: &[RequestId],
        snapshot: &CycleSnapshot,
        state: &mut DispatchState,
        ctx: &mut DispatchContext<'_>,
        report: &mut CycleReport,
    ) -> Result<(), DispatchError> {
        if self.vehicle_initiated(snapshot) {
            debug!(parent: &self.span, goal = ?self.goal, "vehicle-initiated insertion");
            self.schedule_idle_vehicles(snapshot, state, ctx, report)?;
            report.unmatched = planning
                .iter()
                .filter(|&&id| state.is_plannable(id, ctx.now))
                .count();
            Ok(())
        } else {
            debug!(parent: &self.span, goal = ?self.goal, "request-initiated insertion");
            self.schedule_unplanned_requests(planning, snapshot, state, ctx, report)
        }
    }
}
