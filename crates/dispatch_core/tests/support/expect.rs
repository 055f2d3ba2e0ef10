#![allow(dead_code)]

use dispatch_core::model::{secs, PassengerId, SimTime, VehicleId};
use dispatch_core::telemetry::{EventLog, RideEvent, RideEventKind};

/// Slack allowed after a target time: one dispatch cycle plus routing jitter.
pub const APPROX_SLACK_SECS: u64 = 30;

#[derive(Debug, Clone, Copy)]
pub enum TimeMatch {
    Any,
    Exactly(SimTime),
    /// Within `[t, t + APPROX_SLACK_SECS]`.
    About(SimTime),
}

impl TimeMatch {
    fn matches(self, time: SimTime) -> bool {
        match self {
            TimeMatch::Any => true,
            TimeMatch::Exactly(t) => time == t,
            TimeMatch::About(t) => time >= t && time <= t + secs(APPROX_SLACK_SECS),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Expected {
    pub time: TimeMatch,
    pub kind: RideEventKind,
    pub passenger: PassengerId,
    pub vehicle: Option<VehicleId>,
}

pub fn submitted(passenger: u64, at_secs: u64) -> Expected {
    Expected {
        time: TimeMatch::Exactly(secs(at_secs)),
        kind: RideEventKind::Submitted,
        passenger: PassengerId(passenger),
        vehicle: None,
    }
}

pub fn scheduled(passenger: u64, vehicle: u64, about_secs: u64) -> Expected {
    Expected {
        time: TimeMatch::About(secs(about_secs)),
        kind: RideEventKind::Scheduled,
        passenger: PassengerId(passenger),
        vehicle: Some(VehicleId(vehicle)),
    }
}

pub fn rejected(passenger: u64, about_secs: u64) -> Expected {
    Expected {
        time: TimeMatch::About(secs(about_secs)),
        kind: RideEventKind::Rejected,
        passenger: PassengerId(passenger),
        vehicle: None,
    }
}

pub fn picked_up(passenger: u64, vehicle: u64) -> Expected {
    Expected {
        time: TimeMatch::Any,
        kind: RideEventKind::PickedUp,
        passenger: PassengerId(passenger),
        vehicle: Some(VehicleId(vehicle)),
    }
}

pub fn dropped_off(passenger: u64, vehicle: u64) -> Expected {
    Expected {
        time: TimeMatch::Any,
        kind: RideEventKind::DroppedOff,
        passenger: PassengerId(passenger),
        vehicle: Some(VehicleId(vehicle)),
    }
}

fn describe(events: &[&RideEvent]) -> String {
    events
        .iter()
        .map(|e| format!("  {:>9} ms {:?} {} {:?}", e.time, e.kind, e.passenger, e.vehicle))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Assert that `expected` occurs as an ordered subsequence of the ride events.
/// Each expectation binds to the first later event of the same kind and
/// passenger, whose vehicle and time must then match.
pub fn expect_rides(log: &EventLog, expected: &[Expected]) {
    let events: Vec<&RideEvent> = log.ride_events().collect();
    let mut cursor = 0;
    for exp in expected {
        let found = events[cursor..]
            .iter()
            .position(|e| e.kind == exp.kind && e.passenger == exp.passenger);
        let Some(offset) = found else {
            panic!(
                "event not found: {exp:?}\nride events:\n{}",
                describe(&events)
            );
        };
        let actual = events[cursor + offset];
        assert_eq!(
            actual.vehicle,
            exp.vehicle,
            "vehicle mismatch for {exp:?}\nride events:\n{}",
            describe(&events)
        );
        assert!(
            exp.time.matches(actual.time),
            "time mismatch for {exp:?}: got {} ms\nride events:\n{}",
            actual.time,
            describe(&events)
        );
        cursor += offset + 1;
    }
}

/// Assert that no ride event of `kind` exists for `passenger`.
pub fn expect_none(log: &EventLog, kind: RideEventKind, passenger: u64) {
    assert!(
        !log
            .ride_events()
            .any(|e| e.kind == kind && e.passenger == PassengerId(passenger)),
        "unexpected {kind:?} for passenger_{passenger}"
    );
}
