use crate::model::{PassengerId, RequestId, SimTime, VehicleId};
use crate::routing::PathData;

use super::snapshot::PlanningHorizon;

/// A proposed pairing: `vehicle` drives `path` to pick up `request`.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    pub vehicle: VehicleId,
    pub request: RequestId,
    pub path: PathData,
}

/// Why a confirmation was consumed without committing the ride.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DropReason {
    /// The driver did not accept.
    Refused,
    /// The vehicle left service while the confirmation was pending.
    OutOfService,
    /// The request passed its search deadline.
    Expired,
    /// The request is no longer in the unplanned queue.
    NotUnplanned,
    /// The fleet refused the schedule append.
    CommitFailed,
}

/// Outcome of opening or consuming a confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Committed,
    /// Waiting for the driver; reconciled on a later cycle.
    Pending,
    Dropped(DropReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommittedRide {
    pub request: RequestId,
    pub passenger: PassengerId,
    pub vehicle: VehicleId,
}

/// What a dispatch cycle did.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub now: SimTime,
    pub strategy: &'static str,
    /// Requests handed to the strategy.
    pub planned: usize,
    /// Confirmations opened this cycle.
    pub opened: usize,
    pub committed: Vec<CommittedRide>,
    pub dropped: Vec<(RequestId, DropReason)>,
    /// Planned requests the strategy could not pair.
    pub unmatched: usize,
    pub horizon: Option<PlanningHorizon>,
}

impl CycleReport {
    pub fn new(now: SimTime, strategy: &'static str) -> Self {
        Self {
            now,
            strategy,
            planned: 0,
            opened: 0,
            committed: Vec::new(),
            dropped: Vec::new(),
            unmatched: 0,
            horizon: None,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.opened == 0 && self.committed.is_empty() && self.dropped.is_empty()
    }

    pub fn committed_vehicle(&self, request: RequestId) -> Option<VehicleId> {
        self.committed
            .iter()
            .find(|ride| ride.request == request)
            .map(|ride| ride.vehicle)
    }
}
