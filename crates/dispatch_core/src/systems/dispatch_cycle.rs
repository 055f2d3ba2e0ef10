use bevy_ecs::prelude::{Res, ResMut};
use tracing::error;

use crate::clock::{CurrentEvent, EventKind, EventSubject, SimulationClock};
use crate::dispatch::DispatchContext;
use crate::dispatcher::DispatcherResource;
use crate::fleet::schedule::SimFleet;
use crate::model::SimTime;
use crate::routing::PathProviderResource;
use crate::telemetry::{EventLog, RideEvent, RideEventKind};

/// First cycle boundary strictly after `now`.
pub fn next_cycle_at(now: SimTime, step: SimTime) -> SimTime {
    let step = step.max(1);
    (now / step + 1) * step
}

pub fn dispatch_cycle_system(
    event: Res<CurrentEvent>,
    mut clock: ResMut<SimulationClock>,
    mut dispatcher: ResMut<DispatcherResource>,
    mut fleet: ResMut<SimFleet>,
    paths: Res<PathProviderResource>,
    mut log: ResMut<EventLog>,
) {
    if event.0.kind != EventKind::DispatchCycle {
        return;
    }
    let now = clock.now();

    let outcome = {
        let mut ctx = DispatchContext {
            now,
            fleet: &mut *fleet,
            paths: &*paths.0,
            events: &mut *log,
        };
        dispatcher.run_cycle(&mut ctx)
    };
    match outcome {
        Ok(report) => {
            for ride in &report.committed {
                log.record_ride(RideEvent {
                    time: now,
                    kind: RideEventKind::Scheduled,
                    request: ride.request,
                    passenger: ride.passenger,
                    vehicle: Some(ride.vehicle),
                });
            }
        }
        Err(err) => error!(now, error = %err, "dispatch cycle aborted"),
    }

    for (vehicle, at) in fleet.drain_wakeups() {
        clock.schedule_at(
            at,
            EventKind::VehicleTaskEnded,
            Some(EventSubject::Vehicle(vehicle)),
        );
    }

    if dispatcher.has_pending_work() && !clock.has_pending(EventKind::DispatchCycle) {
        let step = dispatcher.reoptimization_step();
        clock.schedule_at(next_cycle_at(now, step), EventKind::DispatchCycle, None);
    }
}
