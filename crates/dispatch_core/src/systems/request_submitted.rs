use bevy_ecs::prelude::{Res, ResMut};

use crate::clock::{CurrentEvent, EventKind, EventSubject, SimulationClock};
use crate::dispatcher::DispatcherResource;
use crate::model::Request;
use crate::scenario::{DemandConfig, PendingRequests};
use crate::systems::dispatch_cycle::next_cycle_at;
use crate::telemetry::{EventLog, RideEvent, RideEventKind};

pub fn request_submitted_system(
    event: Res<CurrentEvent>,
    demand: Res<DemandConfig>,
    mut clock: ResMut<SimulationClock>,
    mut pending: ResMut<PendingRequests>,
    mut dispatcher: ResMut<DispatcherResource>,
    mut log: ResMut<EventLog>,
) {
    if event.0.kind != EventKind::RequestSubmitted {
        return;
    }
    let Some(id) = event.0.request() else {
        return;
    };
    let Some(spec) = pending.0.remove(&id) else {
        return;
    };

    let now = clock.now();
    let request = Request::immediate(id, spec.passenger, spec.from, spec.to, now, demand.max_search);
    log.record_ride(RideEvent {
        time: now,
        kind: RideEventKind::Submitted,
        request: id,
        passenger: spec.passenger,
        vehicle: None,
    });
    dispatcher.submit(request);

    if let Some(max_search) = demand.max_search {
        clock.schedule_in(
            max_search,
            EventKind::RequestExpired,
            Some(EventSubject::Request(id)),
        );
    }
    if !clock.has_pending(EventKind::DispatchCycle) {
        let step = dispatcher.reoptimization_step();
        clock.schedule_at(next_cycle_at(now, step), EventKind::DispatchCycle, None);
    }
}
