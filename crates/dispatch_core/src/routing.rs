//! Path provider abstraction: travel-time and route queries between locations.
//!
//! The dispatch core consumes paths only through [PathProvider]. The reference
//! implementation is the grid road network in [crate::network]; tests use the
//! table-driven provider in `test_helpers`.

use std::sync::Arc;

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::model::{LinkId, Location, SimTime};

/// A timed path through the road network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathData {
    pub departure: SimTime,
    /// Travel time in milliseconds.
    pub travel_time: SimTime,
    /// Generalized cost; equals travel time in seconds for the grid network.
    pub cost: f64,
    /// Links traversed, from the origin link to the destination link inclusive.
    pub links: Vec<LinkId>,
}

impl PathData {
    pub fn arrival(&self) -> SimTime {
        self.departure.saturating_add(self.travel_time)
    }

    /// Same route, departing no earlier than `now`.
    pub fn retimed(&self, now: SimTime) -> PathData {
        PathData {
            departure: self.departure.max(now),
            ..self.clone()
        }
    }
}

/// Trait for road-network backends. Implementations must be deterministic for a
/// fixed network and departure time, and `Send + Sync` so the provider can be
/// shared as an ECS resource.
pub trait PathProvider: Send + Sync {
    /// Shortest path from `from` to `to` departing at `departure`; `None` if unreachable.
    fn path(&self, from: &Location, to: &Location, departure: SimTime) -> Option<PathData>;

    /// One-to-many form. Entry `i` answers the query to `targets[i]`.
    fn paths_from(
        &self,
        from: &Location,
        targets: &[Location],
        departure: SimTime,
    ) -> Vec<Option<PathData>> {
        targets
            .iter()
            .map(|to| self.path(from, to, departure))
            .collect()
    }

    /// Many-to-one form: each origin carries its own departure time.
    fn paths_to(&self, origins: &[(Location, SimTime)], to: &Location) -> Vec<Option<PathData>> {
        origins
            .iter()
            .map(|(from, departure)| self.path(from, to, *departure))
            .collect()
    }
}

/// ECS resource wrapping the shared path provider.
#[derive(Resource, Clone)]
pub struct PathProviderResource(pub Arc<dyn PathProvider>);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retiming_only_moves_departure_forward() {
        let path = PathData {
            departure: 5_000,
            travel_time: 3_000,
            cost: 3.0,
            links: vec![LinkId(1), LinkId(2)],
        };
        assert_eq!(path.arrival(), 8_000);
        assert_eq!(path.retimed(4_000).departure, 5_000);
        let later = path.retimed(9_000);
        assert_eq!(later.departure, 9_000);
        assert_eq!(later.arrival(), 12_000);
        assert_eq!(later.links, path.links);
    }
}
