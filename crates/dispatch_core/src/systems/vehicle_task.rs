use bevy_ecs::prelude::{Res, ResMut};

use crate::clock::{CurrentEvent, EventKind, SimulationClock};
use crate::fleet::schedule::{SimFleet, TaskKind};
use crate::telemetry::{EventLog, RideEvent, RideEventKind};

/// Retire ended tasks; stop ends become pickup and drop-off ride events.
pub fn vehicle_task_system(
    event: Res<CurrentEvent>,
    clock: Res<SimulationClock>,
    mut fleet: ResMut<SimFleet>,
    mut log: ResMut<EventLog>,
) {
    if event.0.kind != EventKind::VehicleTaskEnded {
        return;
    }
    let Some(vehicle) = event.0.vehicle() else {
        return;
    };
    for ended in fleet.advance(vehicle, clock.now()) {
        let kind = match ended.kind {
            TaskKind::Pickup => RideEventKind::PickedUp,
            TaskKind::Dropoff => RideEventKind::DroppedOff,
            TaskKind::EmptyDrive | TaskKind::OccupiedDrive => continue,
        };
        log.record_ride(RideEvent {
            time: ended.time,
            kind,
            request: ended.request,
            passenger: ended.passenger,
            vehicle: Some(ended.vehicle),
        });
    }
}
