use bevy_ecs::prelude::{Res, ResMut};
use tracing::debug;

use crate::clock::{CurrentEvent, EventKind, SimulationClock};
use crate::dispatcher::DispatcherResource;
use crate::telemetry::{EventLog, RideEvent, RideEventKind};

/// The passenger stops searching. Only requests still unplanned are rejected;
/// a ride committed earlier is unaffected.
pub fn request_expired_system(
    event: Res<CurrentEvent>,
    clock: Res<SimulationClock>,
    mut dispatcher: ResMut<DispatcherResource>,
    mut log: ResMut<EventLog>,
) {
    if event.0.kind != EventKind::RequestExpired {
        return;
    }
    let Some(id) = event.0.request() else {
        return;
    };
    let now = clock.now();
    let Some(request) = dispatcher.withdraw(id, now, &mut *log) else {
        return;
    };
    debug!(
        request = %id,
        attempts = request.schedule_attempts,
        "request rejected"
    );
    log.record_ride(RideEvent {
        time: now,
        kind: RideEventKind::Rejected,
        request: id,
        passenger: request.passenger,
        vehicle: None,
    });
}
