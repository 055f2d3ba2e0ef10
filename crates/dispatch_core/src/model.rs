//! Core data model: identifiers, simulation time, locations and ride requests.
//!
//! Simulation time is an integer number of milliseconds ([SimTime]). Configuration
//! surfaces are expressed in seconds and converted with [secs].

use std::fmt;

use h3o::LatLng;
use serde::{Deserialize, Serialize};

/// Simulation timestamp or duration in milliseconds.
pub type SimTime = u64;

/// Milliseconds per simulated second.
pub const ONE_SEC_MS: SimTime = 1000;

/// Sentinel for "never" (e.g. a request without a search deadline).
pub const NEVER: SimTime = SimTime::MAX;

/// Convert whole seconds to [SimTime].
pub const fn secs(s: u64) -> SimTime {
    s.saturating_mul(ONE_SEC_MS)
}

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "_{}"), self.0)
            }
        }
    };
}

define_id!(
    /// Identity of a ride request.
    RequestId,
    "request"
);
define_id!(
    /// Identity of the passenger who submitted a request.
    PassengerId,
    "passenger"
);
define_id!(
    /// Identity of a fleet vehicle.
    VehicleId,
    "vehicle"
);
define_id!(
    /// Identity of a road-network link.
    LinkId,
    "link"
);

/// A place in the road network: the link plus a geographic coordinate used for
/// proximity queries (the link's downstream node).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    pub link: LinkId,
    pub coord: LatLng,
}

impl Location {
    pub fn new(link: LinkId, coord: LatLng) -> Self {
        Self { link, coord }
    }
}

/// An unplanned ride request as seen by the dispatch core.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub id: RequestId,
    pub passenger: PassengerId,
    pub from: Location,
    pub to: Location,
    pub submitted_at: SimTime,
    /// Earliest allowable pickup; requests past this point are "urgent".
    pub earliest_start: SimTime,
    /// Search deadline; [NEVER] when the request does not expire.
    pub latest_start: SimTime,
    /// Number of dispatch cycles in which the request was (re)planned.
    pub schedule_attempts: u32,
}

impl Request {
    /// Build an immediate request (earliest start = submission time).
    pub fn immediate(
        id: RequestId,
        passenger: PassengerId,
        from: Location,
        to: Location,
        submitted_at: SimTime,
        max_search: Option<SimTime>,
    ) -> Self {
        let latest_start = max_search.map_or(NEVER, |m| submitted_at.saturating_add(m));
        Self {
            id,
            passenger,
            from,
            to,
            submitted_at,
            earliest_start: submitted_at,
            latest_start,
            schedule_attempts: 0,
        }
    }

    pub fn is_urgent(&self, now: SimTime) -> bool {
        self.earliest_start <= now
    }

    /// A request is expired from its deadline onwards and must never be committed.
    pub fn is_expired(&self, now: SimTime) -> bool {
        self.latest_start != NEVER && now >= self.latest_start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(link: u64) -> Location {
        Location::new(LinkId(link), LatLng::new(52.5, 13.4).expect("coord"))
    }

    #[test]
    fn ids_display_with_prefix() {
        assert_eq!(RequestId(3).to_string(), "request_3");
        assert_eq!(VehicleId(1).to_string(), "vehicle_1");
        assert_eq!(PassengerId(7).to_string(), "passenger_7");
    }

    #[test]
    fn expiry_starts_at_deadline() {
        let req = Request::immediate(
            RequestId(1),
            PassengerId(1),
            loc(1),
            loc(2),
            secs(5),
            Some(secs(65)),
        );
        assert!(!req.is_expired(secs(69)));
        assert!(req.is_expired(secs(70)));
        assert!(req.is_urgent(secs(5)));
        assert!(!req.is_urgent(secs(4)));
    }

    #[test]
    fn request_without_deadline_never_expires() {
        let req = Request::immediate(RequestId(1), PassengerId(1), loc(1), loc(2), 0, None);
        assert_eq!(req.latest_start, NEVER);
        assert!(!req.is_expired(SimTime::MAX - 1));
    }
}
