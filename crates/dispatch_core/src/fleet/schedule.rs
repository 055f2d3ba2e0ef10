//! Reference fleet: vehicles with service windows and an append-only task list.
//!
//! A committed ride becomes four tasks: empty drive to the pickup, pickup stop,
//! occupied drive, drop-off stop. Tasks are retired by [SimFleet::advance] as
//! simulation time passes their end.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::error::{CommitError, ScenarioError};
use crate::fleet::{Fleet, Idleness};
use crate::model::{LinkId, Location, PassengerId, Request, RequestId, SimTime, VehicleId};
use crate::routing::{PathData, PathProvider};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    EmptyDrive,
    Pickup,
    OccupiedDrive,
    Dropoff,
}

impl TaskKind {
    pub fn is_drive(self) -> bool {
        matches!(self, TaskKind::EmptyDrive | TaskKind::OccupiedDrive)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub kind: TaskKind,
    pub begin: SimTime,
    pub end: SimTime,
    pub request: RequestId,
    pub passenger: PassengerId,
    /// Where the vehicle is once the task ends.
    pub end_location: Location,
    /// Links driven; empty for stops.
    pub links: Vec<LinkId>,
}

#[derive(Debug, Clone)]
pub struct FleetVehicle {
    pub id: VehicleId,
    pub service_begin: SimTime,
    pub service_end: SimTime,
    /// Location after the last retired task.
    pub location: Location,
    pub tasks: VecDeque<Task>,
}

impl FleetVehicle {
    /// Where the vehicle ends up once its committed schedule is done.
    pub fn final_location(&self) -> Location {
        self.tasks.back().map_or(self.location, |t| t.end_location)
    }

    pub fn busy_until(&self) -> SimTime {
        self.tasks.back().map_or(0, |t| t.end)
    }

    pub fn current_task(&self, now: SimTime) -> Option<&Task> {
        self.tasks.iter().find(|t| t.begin <= now && now < t.end)
    }
}

/// A retired task, reported to the harness for ride telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskEnded {
    pub vehicle: VehicleId,
    pub kind: TaskKind,
    pub request: RequestId,
    pub passenger: PassengerId,
    pub time: SimTime,
}

#[derive(Resource)]
pub struct SimFleet {
    vehicles: BTreeMap<VehicleId, FleetVehicle>,
    paths: Arc<dyn PathProvider>,
    pickup_duration: SimTime,
    dropoff_duration: SimTime,
    /// Task end times not yet handed to the clock.
    wakeups: Vec<(VehicleId, SimTime)>,
}

impl SimFleet {
    pub fn new(
        paths: Arc<dyn PathProvider>,
        pickup_duration: SimTime,
        dropoff_duration: SimTime,
    ) -> Self {
        Self {
            vehicles: BTreeMap::new(),
            paths,
            pickup_duration,
            dropoff_duration,
            wakeups: Vec::new(),
        }
    }

    pub fn add_vehicle(
        &mut self,
        id: VehicleId,
        start: Location,
        service_begin: SimTime,
        service_end: SimTime,
    ) -> Result<(), ScenarioError> {
        if self.vehicles.contains_key(&id) {
            return Err(ScenarioError::DuplicateVehicle(id));
        }
        self.vehicles.insert(
            id,
            FleetVehicle {
                id,
                service_begin,
                service_end,
                location: start,
                tasks: VecDeque::new(),
            },
        );
        Ok(())
    }

    pub fn vehicle(&self, id: VehicleId) -> Option<&FleetVehicle> {
        self.vehicles.get(&id)
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    pub fn drain_wakeups(&mut self) -> Vec<(VehicleId, SimTime)> {
        std::mem::take(&mut self.wakeups)
    }

    /// Retire every task of `vehicle` that has ended by `now`.
    pub fn advance(&mut self, vehicle: VehicleId, now: SimTime) -> Vec<TaskEnded> {
        let Some(v) = self.vehicles.get_mut(&vehicle) else {
            return Vec::new();
        };
        let mut ended = Vec::new();
        while v.tasks.front().is_some_and(|t| t.end <= now) {
            let Some(task) = v.tasks.pop_front() else {
                break;
            };
            v.location = task.end_location;
            ended.push(TaskEnded {
                vehicle,
                kind: task.kind,
                request: task.request,
                passenger: task.passenger,
                time: task.end,
            });
        }
        ended
    }

    /// True when the vehicle is moving at `now`.
    pub fn is_driving(&self, vehicle: VehicleId, now: SimTime) -> bool {
        self.vehicles
            .get(&vehicle)
            .and_then(|v| v.current_task(now))
            .is_some_and(|t| t.kind.is_drive())
    }
}

impl Fleet for SimFleet {
    fn vehicle_ids(&self) -> Vec<VehicleId> {
        self.vehicles.keys().copied().collect()
    }

    fn is_idle(&self, vehicle: VehicleId, now: SimTime) -> bool {
        !self.is_out_of_service(vehicle, now)
            && self
                .vehicles
                .get(&vehicle)
                .is_some_and(|v| v.tasks.iter().all(|t| t.end <= now))
    }

    fn is_out_of_service(&self, vehicle: VehicleId, now: SimTime) -> bool {
        self.vehicles
            .get(&vehicle)
            .map_or(true, |v| now < v.service_begin || now >= v.service_end)
    }

    fn earliest_idleness(&self, vehicle: VehicleId, now: SimTime) -> Option<Idleness> {
        let v = self.vehicles.get(&vehicle)?;
        let time = now.max(v.busy_until()).max(v.service_begin);
        if time >= v.service_end {
            return None;
        }
        Some(Idleness {
            location: v.final_location(),
            time,
        })
    }

    fn commit(
        &mut self,
        vehicle: VehicleId,
        request: &Request,
        pickup: PathData,
        now: SimTime,
    ) -> Result<(), CommitError> {
        let v = self
            .vehicles
            .get(&vehicle)
            .ok_or(CommitError::UnknownVehicle(vehicle))?;
        let start = pickup.departure.max(now).max(v.busy_until());
        if start >= v.service_end {
            return Err(CommitError::ServiceEnded {
                vehicle,
                service_end: v.service_end,
            });
        }

        let arrive_at_pickup = start.saturating_add(pickup.travel_time);
        let pickup_end = arrive_at_pickup.saturating_add(self.pickup_duration);
        let occupied = self
            .paths
            .path(&request.from, &request.to, pickup_end)
            .ok_or(CommitError::NoRoute {
                from: request.from.link,
                to: request.to.link,
            })?;
        let arrive_at_dropoff = pickup_end.saturating_add(occupied.travel_time);
        let dropoff_end = arrive_at_dropoff.saturating_add(self.dropoff_duration);

        let task = |kind, begin, end, end_location, links| Task {
            kind,
            begin,
            end,
            request: request.id,
            passenger: request.passenger,
            end_location,
            links,
        };
        let chain = [
            task(
                TaskKind::EmptyDrive,
                start,
                arrive_at_pickup,
                request.from,
                pickup.links,
            ),
            task(
                TaskKind::Pickup,
                arrive_at_pickup,
                pickup_end,
                request.from,
                Vec::new(),
            ),
            task(
                TaskKind::OccupiedDrive,
                pickup_end,
                arrive_at_dropoff,
                request.to,
                occupied.links,
            ),
            task(
                TaskKind::Dropoff,
                arrive_at_dropoff,
                dropoff_end,
                request.to,
                Vec::new(),
            ),
        ];

        let Some(v) = self.vehicles.get_mut(&vehicle) else {
            return Err(CommitError::UnknownVehicle(vehicle));
        };
        for t in chain {
            self.wakeups.push((vehicle, t.end));
            v.tasks.push_back(t);
        }
        Ok(())
    }
}
