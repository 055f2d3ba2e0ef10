//! Best single pairing by earliest pickup arrival. Ties keep the first
//! candidate in the order given.

use crate::model::{Location, Request, SimTime};
use crate::routing::{PathData, PathProvider};

use super::snapshot::VehicleEntry;
use super::types::Dispatch;

/// Vehicle among `candidates` that reaches the request's pickup first.
pub fn best_vehicle_for_request(
    request: &Request,
    candidates: &[VehicleEntry],
    paths: &dyn PathProvider,
) -> Option<Dispatch> {
    let origins: Vec<(Location, SimTime)> = candidates
        .iter()
        .map(|v| (v.location, v.available_at))
        .collect();
    let found = paths.paths_to(&origins, &request.from);
    earliest_arrival(found).map(|(idx, path)| Dispatch {
        vehicle: candidates[idx].id,
        request: request.id,
        path,
    })
}

/// Request among `candidates` whose pickup `vehicle` reaches first.
pub fn best_request_for_vehicle(
    vehicle: &VehicleEntry,
    candidates: &[&Request],
    paths: &dyn PathProvider,
) -> Option<Dispatch> {
    let targets: Vec<Location> = candidates.iter().map(|r| r.from).collect();
    let found = paths.paths_from(&vehicle.location, &targets, vehicle.available_at);
    earliest_arrival(found).map(|(idx, path)| Dispatch {
        vehicle: vehicle.id,
        request: candidates[idx].id,
        path,
    })
}

fn earliest_arrival(found: Vec<Option<PathData>>) -> Option<(usize, PathData)> {
    let mut best: Option<(usize, PathData)> = None;
    for (idx, path) in found.into_iter().enumerate() {
        let Some(path) = path else {
            continue;
        };
        if best
            .as_ref()
            .map_or(true, |(_, b)| path.arrival() < b.arrival())
        {
            best = Some((idx, path));
        }
    }
    best
}
