//! Fleet collaborator contract: vehicle status queries and schedule commits.
//!
//! The dispatch core never mutates vehicle schedules except through
//! [Fleet::commit]. [schedule::SimFleet] is the reference implementation used by
//! the simulation harness.

pub mod schedule;

use crate::error::CommitError;
use crate::model::{Location, Request, SimTime, VehicleId};
use crate::routing::PathData;

/// Where and when a vehicle is next free to start a new ride.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Idleness {
    pub location: Location,
    pub time: SimTime,
}

pub trait Fleet {
    /// All vehicles, in ascending id order.
    fn vehicle_ids(&self) -> Vec<VehicleId>;

    /// In service with nothing left to do at `now`.
    fn is_idle(&self, vehicle: VehicleId, now: SimTime) -> bool;

    /// Outside the service window `[service_begin, service_end)`.
    fn is_out_of_service(&self, vehicle: VehicleId, now: SimTime) -> bool;

    /// End of the committed schedule; `None` when the vehicle cannot take new work.
    fn earliest_idleness(&self, vehicle: VehicleId, now: SimTime) -> Option<Idleness>;

    /// Append the ride for `request` to the vehicle's schedule, starting with the
    /// empty `pickup` drive.
    fn commit(
        &mut self,
        vehicle: VehicleId,
        request: &Request,
        pickup: PathData,
        now: SimTime,
    ) -> Result<(), CommitError>;
}
