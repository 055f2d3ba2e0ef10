use std::cmp::Ordering;
use std::collections::BinaryHeap;

use bevy_ecs::prelude::Resource;

use crate::model::{RequestId, SimTime, VehicleId, ONE_SEC_MS};

/// Event kinds in same-timestamp processing order: vehicle progress first,
/// then expiries, then the dispatch cycle, then new submissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventKind {
    VehicleTaskEnded,
    RequestExpired,
    DispatchCycle,
    RequestSubmitted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventSubject {
    Request(RequestId),
    Vehicle(VehicleId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub timestamp: SimTime,
    pub kind: EventKind,
    pub subject: Option<EventSubject>,
    /// Insertion order; breaks remaining ties so pops are deterministic.
    seq: u64,
}

impl Event {
    pub fn request(&self) -> Option<RequestId> {
        match self.subject {
            Some(EventSubject::Request(id)) => Some(id),
            _ => None,
        }
    }

    pub fn vehicle(&self) -> Option<VehicleId> {
        match self.subject {
            Some(EventSubject::Vehicle(id)) => Some(id),
            _ => None,
        }
    }
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering to make BinaryHeap a min-heap by timestamp.
        other
            .timestamp
            .cmp(&self.timestamp)
            .then_with(|| other.kind.cmp(&self.kind))
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The event being processed by the current schedule run.
#[derive(Debug, Clone, Copy, Resource)]
pub struct CurrentEvent(pub Event);

#[derive(Debug, Default, Resource)]
pub struct SimulationClock {
    now: SimTime,
    next_seq: u64,
    events: BinaryHeap<Event>,
}

impl SimulationClock {
    pub fn now(&self) -> SimTime {
        self.now
    }

    pub fn schedule_at(
        &mut self,
        timestamp: SimTime,
        kind: EventKind,
        subject: Option<EventSubject>,
    ) {
        debug_assert!(
            timestamp >= self.now,
            "event timestamp must be >= current time"
        );
        let seq = self.next_seq;
        self.next_seq += 1;
        self.events.push(Event {
            timestamp: timestamp.max(self.now),
            kind,
            subject,
            seq,
        });
    }

    pub fn schedule_at_secs(&mut self, secs: u64, kind: EventKind, subject: Option<EventSubject>) {
        self.schedule_at(secs * ONE_SEC_MS, kind, subject);
    }

    pub fn schedule_in(&mut self, delay: SimTime, kind: EventKind, subject: Option<EventSubject>) {
        self.schedule_at(self.now.saturating_add(delay), kind, subject);
    }

    pub fn schedule_in_secs(&mut self, secs: u64, kind: EventKind, subject: Option<EventSubject>) {
        self.schedule_in(secs * ONE_SEC_MS, kind, subject);
    }

    pub fn pop_next(&mut self) -> Option<Event> {
        let event = self.events.pop()?;
        self.now = event.timestamp;
        Some(event)
    }

    pub fn next_event_time(&self) -> Option<SimTime> {
        self.events.peek().map(|e| e.timestamp)
    }

    /// True if an event of `kind` is queued at any time.
    pub fn has_pending(&self, kind: EventKind) -> bool {
        self.events.iter().any(|e| e.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
