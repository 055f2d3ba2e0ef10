//! Telemetry: the simulation event log and per-ride KPIs derived from it.

use std::collections::BTreeMap;
use std::io::Write;

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::events::{DispatchEvent, EventSink};
use crate::model::{PassengerId, RequestId, SimTime, VehicleId};

/// Lifecycle transitions of a ride, as seen by the demand side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RideEventKind {
    Submitted,
    Scheduled,
    Rejected,
    PickedUp,
    DroppedOff,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RideEvent {
    pub time: SimTime,
    pub kind: RideEventKind,
    pub request: RequestId,
    pub passenger: PassengerId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle: Option<VehicleId>,
}

/// One entry of the simulation event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SimEvent {
    Dispatch(DispatchEvent),
    Ride(RideEvent),
}

impl SimEvent {
    pub fn time(&self) -> SimTime {
        match self {
            SimEvent::Dispatch(e) => e.time(),
            SimEvent::Ride(e) => e.time,
        }
    }

    pub fn request(&self) -> RequestId {
        match self {
            SimEvent::Dispatch(e) => e.request(),
            SimEvent::Ride(e) => e.request,
        }
    }
}

/// Timings of one request; missing stages are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RideRecord {
    pub request: Option<RequestId>,
    pub vehicle: Option<VehicleId>,
    pub submitted_at: Option<SimTime>,
    pub scheduled_at: Option<SimTime>,
    pub rejected_at: Option<SimTime>,
    pub picked_up_at: Option<SimTime>,
    pub dropped_off_at: Option<SimTime>,
}

impl RideRecord {
    /// Time from submission to the ride being committed to a vehicle.
    pub fn time_to_schedule(&self) -> Option<SimTime> {
        Some(self.scheduled_at?.saturating_sub(self.submitted_at?))
    }

    /// Time from submission to pickup.
    pub fn wait_time(&self) -> Option<SimTime> {
        Some(self.picked_up_at?.saturating_sub(self.submitted_at?))
    }

    pub fn ride_duration(&self) -> Option<SimTime> {
        Some(self.dropped_off_at?.saturating_sub(self.picked_up_at?))
    }

    pub fn is_completed(&self) -> bool {
        self.dropped_off_at.is_some()
    }
}

/// Append-only event log. Also the [EventSink] the dispatcher writes into.
#[derive(Debug, Default, Resource)]
pub struct EventLog {
    events: Vec<SimEvent>,
}

impl EventLog {
    pub fn record_ride(&mut self, event: RideEvent) {
        self.events.push(SimEvent::Ride(event));
    }

    pub fn events(&self) -> &[SimEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn dispatch_events(&self) -> impl Iterator<Item = &DispatchEvent> {
        self.events.iter().filter_map(|e| match e {
            SimEvent::Dispatch(d) => Some(d),
            SimEvent::Ride(_) => None,
        })
    }

    pub fn ride_events(&self) -> impl Iterator<Item = &RideEvent> {
        self.events.iter().filter_map(|e| match e {
            SimEvent::Ride(r) => Some(r),
            SimEvent::Dispatch(_) => None,
        })
    }

    /// First ride event of `kind` for `request`.
    pub fn find_ride(&self, request: RequestId, kind: RideEventKind) -> Option<&RideEvent> {
        self.ride_events()
            .find(|e| e.request == request && e.kind == kind)
    }

    /// Per-request records, in request id order.
    pub fn ride_records(&self) -> BTreeMap<RequestId, RideRecord> {
        let mut records: BTreeMap<RequestId, RideRecord> = BTreeMap::new();
        for event in self.ride_events() {
            let record = records.entry(event.request).or_default();
            record.request = Some(event.request);
            if event.vehicle.is_some() {
                record.vehicle = event.vehicle;
            }
            let slot = match event.kind {
                RideEventKind::Submitted => &mut record.submitted_at,
                RideEventKind::Scheduled => &mut record.scheduled_at,
                RideEventKind::Rejected => &mut record.rejected_at,
                RideEventKind::PickedUp => &mut record.picked_up_at,
                RideEventKind::DroppedOff => &mut record.dropped_off_at,
            };
            slot.get_or_insert(event.time);
        }
        records
    }

    /// One JSON object per line, in log order.
    pub fn write_json_lines<W: Write>(&self, mut writer: W) -> Result<(), serde_json::Error> {
        for event in &self.events {
            serde_json::to_writer(&mut writer, event)?;
            writer.write_all(b"\n").map_err(serde_json::Error::io)?;
        }
        writer.flush().map_err(serde_json::Error::io)
    }
}

impl EventSink for EventLog {
    fn emit(&mut self, event: DispatchEvent) {
        self.events.push(SimEvent::Dispatch(event));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ride(time: SimTime, kind: RideEventKind, vehicle: Option<u64>) -> RideEvent {
        RideEvent {
            time,
            kind,
            request: RequestId(1),
            passenger: PassengerId(10),
            vehicle: vehicle.map(VehicleId),
        }
    }

    #[test]
    fn records_derive_ride_kpis() {
        let mut log = EventLog::default();
        log.record_ride(ride(0, RideEventKind::Submitted, None));
        log.emit(DispatchEvent::ConfirmationCreated {
            time: 1_000,
            request: RequestId(1),
            passenger: PassengerId(10),
            vehicle: VehicleId(3),
        });
        log.record_ride(ride(1_000, RideEventKind::Scheduled, Some(3)));
        log.record_ride(ride(20_000, RideEventKind::PickedUp, Some(3)));
        log.record_ride(ride(90_000, RideEventKind::DroppedOff, Some(3)));

        assert_eq!(log.len(), 5);
        assert_eq!(log.dispatch_events().count(), 1);
        let records = log.ride_records();
        let record = &records[&RequestId(1)];
        assert_eq!(record.vehicle, Some(VehicleId(3)));
        assert_eq!(record.time_to_schedule(), Some(1_000));
        assert_eq!(record.wait_time(), Some(20_000));
        assert_eq!(record.ride_duration(), Some(70_000));
        assert!(record.is_completed());
        assert!(log.find_ride(RequestId(1), RideEventKind::Rejected).is_none());
    }

    #[test]
    fn json_lines_keep_event_types() {
        let mut log = EventLog::default();
        log.record_ride(ride(0, RideEventKind::Submitted, None));
        log.emit(DispatchEvent::ConfirmationCompleted {
            time: 5_000,
            request: RequestId(1),
            passenger: PassengerId(10),
            vehicle: VehicleId(3),
            accepted: false,
        });

        let mut out = Vec::new();
        log.write_json_lines(&mut out).expect("write");
        let text = String::from_utf8(out).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("\"kind\":\"submitted\""));
        assert!(!lines[0].contains("vehicle"));
        assert!(lines[1].contains("\"type\":\"driverConfirmationCompleted\""));
        assert!(lines[1].contains("\"accepted\":false"));

        let parsed: SimEvent = serde_json::from_str(lines[1]).expect("parse");
        assert_eq!(parsed, log.events()[1]);
    }
}
