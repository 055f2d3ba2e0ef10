//! Driver confirmation registry: pending accept/reject handshakes between a
//! dispatch decision and the vehicle's driver.
//!
//! A confirmation is open until its due time (creation + configured delay), at
//! which point the driver is modeled as accepting. Completed confirmations stay
//! registered until the dispatcher consumes them with [ConfirmationRegistry::remove].
//! Each confirmation emits exactly one created and one completed event.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use tracing::{debug, Span};

use crate::error::DispatchError;
use crate::events::{DispatchEvent, EventSink};
use crate::model::{PassengerId, Request, RequestId, SimTime, VehicleId};
use crate::routing::PathData;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConfirmationId(pub u64);

impl fmt::Display for ConfirmationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "confirmation_{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DriverConfirmation {
    pub id: ConfirmationId,
    pub request: RequestId,
    pub passenger: PassengerId,
    pub vehicle: VehicleId,
    /// Planned empty drive from the vehicle to the pickup.
    pub pickup: PathData,
    pub created_at: SimTime,
    pub due_at: SimTime,
    complete: bool,
    accepted: bool,
}

impl DriverConfirmation {
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn is_accepted(&self) -> bool {
        self.accepted
    }

    fn resolve(&mut self, accepted: bool) {
        self.complete = true;
        self.accepted = accepted;
    }
}

#[derive(Debug)]
pub struct ConfirmationRegistry {
    delay: SimTime,
    next_id: u64,
    confirmations: BTreeMap<ConfirmationId, DriverConfirmation>,
    by_request: HashMap<RequestId, ConfirmationId>,
    by_vehicle: HashMap<VehicleId, ConfirmationId>,
    span: Span,
}

impl ConfirmationRegistry {
    pub fn new(delay: SimTime, span: Span) -> Self {
        Self {
            delay,
            next_id: 0,
            confirmations: BTreeMap::new(),
            by_request: HashMap::new(),
            by_vehicle: HashMap::new(),
            span,
        }
    }

    pub fn delay(&self) -> SimTime {
        self.delay
    }

    /// Open a confirmation binding `request` to `vehicle`. Completes at once
    /// when the configured delay is zero.
    ///
    /// Fails if either side is already bound to a registered confirmation.
    pub fn add(
        &mut self,
        request: &Request,
        vehicle: VehicleId,
        pickup: PathData,
        now: SimTime,
        events: &mut dyn EventSink,
    ) -> Result<&DriverConfirmation, DispatchError> {
        if self.by_request.contains_key(&request.id) {
            return Err(DispatchError::RequestAlreadyPending(request.id));
        }
        if self.by_vehicle.contains_key(&vehicle) {
            return Err(DispatchError::VehicleAlreadyPending(vehicle));
        }

        let id = ConfirmationId(self.next_id);
        self.next_id += 1;
        let due_at = now.saturating_add(self.delay);
        let mut confirmation = DriverConfirmation {
            id,
            request: request.id,
            passenger: request.passenger,
            vehicle,
            pickup,
            created_at: now,
            due_at,
            complete: false,
            accepted: false,
        };
        if due_at <= now {
            confirmation.resolve(true);
        }

        debug!(
            parent: &self.span,
            confirmation = %id,
            request = %request.id,
            vehicle = %vehicle,
            due_at,
            complete = confirmation.complete,
            "driver confirmation created"
        );
        events.emit(DispatchEvent::ConfirmationCreated {
            time: now,
            request: request.id,
            passenger: request.passenger,
            vehicle,
        });

        self.by_request.insert(request.id, id);
        self.by_vehicle.insert(vehicle, id);
        Ok(self.confirmations.entry(id).or_insert(confirmation))
    }

    /// Auto-accept every open confirmation whose due time has passed.
    /// Returns how many were completed.
    pub fn tick(&mut self, now: SimTime) -> usize {
        let mut completed = 0;
        let span = &self.span;
        for confirmation in self.confirmations.values_mut() {
            if !confirmation.complete && confirmation.due_at <= now {
                confirmation.resolve(true);
                completed += 1;
                debug!(
                    parent: span,
                    confirmation = %confirmation.id,
                    request = %confirmation.request,
                    vehicle = %confirmation.vehicle,
                    "driver accepted"
                );
            }
        }
        completed
    }

    /// Unregister a confirmation and emit its completed event. An open
    /// confirmation removed this way counts as not accepted. Removing an
    /// unknown id is a no-op.
    pub fn remove(
        &mut self,
        id: ConfirmationId,
        now: SimTime,
        events: &mut dyn EventSink,
    ) -> Option<DriverConfirmation> {
        let confirmation = self.confirmations.remove(&id)?;
        self.by_request.remove(&confirmation.request);
        self.by_vehicle.remove(&confirmation.vehicle);
        events.emit(DispatchEvent::ConfirmationCompleted {
            time: now,
            request: confirmation.request,
            passenger: confirmation.passenger,
            vehicle: confirmation.vehicle,
            accepted: confirmation.accepted,
        });
        Some(confirmation)
    }

    /// Resolve the confirmation for a withdrawn request as rejected and remove it.
    pub fn withdraw_request(
        &mut self,
        request: RequestId,
        now: SimTime,
        events: &mut dyn EventSink,
    ) -> Option<DriverConfirmation> {
        let id = *self.by_request.get(&request)?;
        if let Some(confirmation) = self.confirmations.get_mut(&id) {
            confirmation.resolve(false);
        }
        debug!(parent: &self.span, confirmation = %id, request = %request, "driver confirmation withdrawn");
        self.remove(id, now, events)
    }

    pub fn get(&self, id: ConfirmationId) -> Option<&DriverConfirmation> {
        self.confirmations.get(&id)
    }

    pub fn lookup_request(&self, request: RequestId) -> Option<&DriverConfirmation> {
        self.by_request
            .get(&request)
            .and_then(|id| self.confirmations.get(id))
    }

    pub fn lookup_vehicle(&self, vehicle: VehicleId) -> Option<&DriverConfirmation> {
        self.by_vehicle
            .get(&vehicle)
            .and_then(|id| self.confirmations.get(id))
    }

    pub fn is_waiting_request(&self, request: RequestId) -> bool {
        self.by_request.contains_key(&request)
    }

    pub fn is_waiting_vehicle(&self, vehicle: VehicleId) -> bool {
        self.by_vehicle.contains_key(&vehicle)
    }

    /// Completed confirmations awaiting consumption, oldest first.
    pub fn completed_ids(&self) -> Vec<ConfirmationId> {
        self.confirmations
            .values()
            .filter(|c| c.complete)
            .map(|c| c.id)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DriverConfirmation> {
        self.confirmations.values()
    }

    pub fn len(&self) -> usize {
        self.confirmations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.confirmations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{secs, LinkId, Location};
    use h3o::LatLng;

    fn loc(link: u64) -> Location {
        Location::new(LinkId(link), LatLng::new(52.5, 13.4).expect("coord"))
    }

    fn request(id: u64) -> Request {
        Request::immediate(RequestId(id), PassengerId(id), loc(1), loc(2), 0, None)
    }

    fn path() -> PathData {
        PathData {
            departure: 0,
            travel_time: secs(7),
            cost: 7.0,
            links: vec![LinkId(3), LinkId(1)],
        }
    }

    #[test]
    fn zero_delay_completes_at_creation() {
        let mut registry = ConfirmationRegistry::new(0, Span::none());
        let mut events: Vec<DispatchEvent> = Vec::new();
        let confirmation = registry
            .add(&request(1), VehicleId(1), path(), secs(3), &mut events)
            .expect("add");
        assert!(confirmation.is_complete());
        assert!(confirmation.is_accepted());
        assert_eq!(confirmation.due_at, secs(3));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type(), "driverConfirmationCreated");
        // Still registered until consumed.
        assert!(registry.is_waiting_request(RequestId(1)));
        assert_eq!(registry.completed_ids().len(), 1);
    }

    #[test]
    fn delayed_confirmation_completes_at_due_time() {
        let mut registry = ConfirmationRegistry::new(secs(15), Span::none());
        let mut events: Vec<DispatchEvent> = Vec::new();
        let id = registry
            .add(&request(1), VehicleId(1), path(), secs(2), &mut events)
            .expect("add")
            .id;

        assert_eq!(registry.tick(secs(16)), 0);
        assert!(!registry.get(id).expect("open").is_complete());
        assert_eq!(registry.tick(secs(17)), 1);
        assert!(registry.get(id).expect("complete").is_accepted());
        assert_eq!(registry.tick(secs(18)), 0);
    }

    #[test]
    fn second_confirmation_for_same_request_or_vehicle_is_refused() {
        let mut registry = ConfirmationRegistry::new(secs(15), Span::none());
        let mut events: Vec<DispatchEvent> = Vec::new();
        registry
            .add(&request(1), VehicleId(1), path(), 0, &mut events)
            .expect("add");

        let err = registry
            .add(&request(1), VehicleId(2), path(), 0, &mut events)
            .unwrap_err();
        assert_eq!(err, DispatchError::RequestAlreadyPending(RequestId(1)));
        let err = registry
            .add(&request(2), VehicleId(1), path(), 0, &mut events)
            .unwrap_err();
        assert_eq!(err, DispatchError::VehicleAlreadyPending(VehicleId(1)));
        assert_eq!(events.len(), 1);
        assert_eq!(
            registry.lookup_vehicle(VehicleId(1)).map(|c| c.request),
            Some(RequestId(1))
        );
    }

    #[test]
    fn remove_emits_completed_exactly_once() {
        let mut registry = ConfirmationRegistry::new(0, Span::none());
        let mut events: Vec<DispatchEvent> = Vec::new();
        let id = registry
            .add(&request(1), VehicleId(1), path(), 0, &mut events)
            .expect("add")
            .id;

        let removed = registry.remove(id, secs(1), &mut events).expect("removed");
        assert!(removed.is_accepted());
        assert!(registry.remove(id, secs(1), &mut events).is_none());
        assert!(registry.is_empty());
        assert!(!registry.is_waiting_vehicle(VehicleId(1)));
        assert_eq!(
            events[1],
            DispatchEvent::ConfirmationCompleted {
                time: secs(1),
                request: RequestId(1),
                passenger: PassengerId(1),
                vehicle: VehicleId(1),
                accepted: true,
            }
        );
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn withdrawn_request_completes_unaccepted() {
        let mut registry = ConfirmationRegistry::new(secs(35), Span::none());
        let mut events: Vec<DispatchEvent> = Vec::new();
        registry
            .add(&request(1), VehicleId(1), path(), 0, &mut events)
            .expect("add");

        let withdrawn = registry
            .withdraw_request(RequestId(1), secs(25), &mut events)
            .expect("withdrawn");
        assert!(withdrawn.is_complete());
        assert!(!withdrawn.is_accepted());
        assert!(registry
            .withdraw_request(RequestId(1), secs(26), &mut events)
            .is_none());
        assert!(matches!(
            events.last(),
            Some(DispatchEvent::ConfirmationCompleted {
                accepted: false,
                ..
            })
        ));
    }
}
