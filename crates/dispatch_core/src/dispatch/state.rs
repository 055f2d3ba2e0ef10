//! Mutable dispatch state shared by the orchestrator and the strategies, and
//! the confirmation open/consume lifecycle.

use std::collections::BTreeMap;

use tracing::{debug, warn, Span};

use crate::confirmation::{ConfirmationId, ConfirmationRegistry};
use crate::error::DispatchError;
use crate::events::EventSink;
use crate::fleet::Fleet;
use crate::model::{Request, RequestId, SimTime};
use crate::routing::PathProvider;
use crate::spatial::ZonalRegistry;

use super::types::{CommittedRide, CycleReport, Dispatch, DropReason, Placement};

/// Injected collaborators for one dispatch cycle.
pub struct DispatchContext<'a> {
    pub now: SimTime,
    pub fleet: &'a mut dyn Fleet,
    pub paths: &'a dyn PathProvider,
    pub events: &'a mut dyn EventSink,
}

/// Requests not yet bound to a vehicle, in id order.
#[derive(Debug, Default, Clone)]
pub struct UnplannedRequests {
    requests: BTreeMap<RequestId, Request>,
}

impl UnplannedRequests {
    pub fn insert(&mut self, request: Request) -> Option<Request> {
        self.requests.insert(request.id, request)
    }

    pub fn remove(&mut self, id: RequestId) -> Option<Request> {
        self.requests.remove(&id)
    }

    pub fn get(&self, id: RequestId) -> Option<&Request> {
        self.requests.get(&id)
    }

    pub fn get_mut(&mut self, id: RequestId) -> Option<&mut Request> {
        self.requests.get_mut(&id)
    }

    pub fn contains(&self, id: RequestId) -> bool {
        self.requests.contains_key(&id)
    }

    pub fn ids(&self) -> Vec<RequestId> {
        self.requests.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Request> {
        self.requests.values()
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

#[derive(Debug)]
pub struct DispatchState {
    pub unplanned: UnplannedRequests,
    pub registry: ConfirmationRegistry,
    pub zones: ZonalRegistry,
    span: Span,
}

impl DispatchState {
    pub fn new(registry: ConfirmationRegistry, zones: ZonalRegistry, span: Span) -> Self {
        Self {
            unplanned: UnplannedRequests::default(),
            registry,
            zones,
            span,
        }
    }

    /// Open a confirmation for `dispatch`. One that completes at creation is
    /// consumed right away.
    pub fn open_confirmation(
        &mut self,
        dispatch: Dispatch,
        ctx: &mut DispatchContext<'_>,
        report: &mut CycleReport,
    ) -> Result<Placement, DispatchError> {
        let Some(request) = self.unplanned.get(dispatch.request) else {
            report.dropped.push((dispatch.request, DropReason::NotUnplanned));
            return Ok(Placement::Dropped(DropReason::NotUnplanned));
        };
        let confirmation =
            self.registry
                .add(request, dispatch.vehicle, dispatch.path, ctx.now, ctx.events)?;
        let (id, complete) = (confirmation.id, confirmation.is_complete());
        report.opened += 1;

        if complete {
            Ok(self.consume(id, ctx, report))
        } else {
            Ok(Placement::Pending)
        }
    }

    /// Consume a completed confirmation: commit the ride when the driver
    /// accepted, the vehicle is in service and the request is still plannable;
    /// otherwise drop it. The request stays unplanned unless committed.
    pub fn consume(
        &mut self,
        id: ConfirmationId,
        ctx: &mut DispatchContext<'_>,
        report: &mut CycleReport,
    ) -> Placement {
        let Some(confirmation) = self.registry.get(id).cloned() else {
            return Placement::Dropped(DropReason::NotUnplanned);
        };
        let now = ctx.now;

        let outcome = if !confirmation.is_accepted() {
            Err(DropReason::Refused)
        } else if ctx.fleet.is_out_of_service(confirmation.vehicle, now) {
            Err(DropReason::OutOfService)
        } else {
            match self.unplanned.get(confirmation.request) {
                None => Err(DropReason::NotUnplanned),
                Some(request) if request.is_expired(now) => Err(DropReason::Expired),
                Some(request) => ctx
                    .fleet
                    .commit(
                        confirmation.vehicle,
                        request,
                        confirmation.pickup.retimed(now),
                        now,
                    )
                    .map_err(|err| {
                        warn!(
                            parent: &self.span,
                            request = %confirmation.request,
                            vehicle = %confirmation.vehicle,
                            error = %err,
                            "schedule commit failed, request stays unplanned"
                        );
                        DropReason::CommitFailed
                    }),
            }
        };

        self.registry.remove(id, now, ctx.events);

        match outcome {
            Ok(()) => {
                self.unplanned.remove(confirmation.request);
                self.zones.remove_request(confirmation.request);
                self.zones.remove_vehicle(confirmation.vehicle);
                debug!(
                    parent: &self.span,
                    request = %confirmation.request,
                    vehicle = %confirmation.vehicle,
                    "ride committed"
                );
                report.committed.push(CommittedRide {
                    request: confirmation.request,
                    passenger: confirmation.passenger,
                    vehicle: confirmation.vehicle,
                });
                Placement::Committed
            }
            Err(reason) => {
                debug!(
                    parent: &self.span,
                    request = %confirmation.request,
                    vehicle = %confirmation.vehicle,
                    ?reason,
                    "confirmation dropped"
                );
                report.dropped.push((confirmation.request, reason));
                Placement::Dropped(reason)
            }
        }
    }

    /// Requests that can take a new confirmation at `now`.
    pub fn is_plannable(&self, request: RequestId, now: SimTime) -> bool {
        !self.registry.is_waiting_request(request)
            && self
                .unplanned
                .get(request)
                .is_some_and(|r| !r.is_expired(now))
    }
}
