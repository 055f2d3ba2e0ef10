//! Test helpers for common test setup and utilities.
//!
//! [TablePaths] answers path queries from a fixed travel-time table so dispatch
//! logic can be tested without a road network.

use std::collections::HashMap;

use h3o::LatLng;

use crate::model::{secs, LinkId, Location, SimTime, ONE_SEC_MS};
use crate::routing::{PathData, PathProvider};

const BASE_LAT: f64 = 52.52;
const BASE_LNG: f64 = 13.40;

/// A location on `link`, with a coordinate that moves north-east as the link
/// id grows. Distinct links get distinct coordinates.
///
/// # Panics
///
/// Panics if `link` is large enough to leave the valid latitude range.
pub fn location(link: u64) -> Location {
    let offset = link as f64 * 0.001;
    let coord = LatLng::new(BASE_LAT + offset, BASE_LNG + offset)
        .expect("test link ids should map to valid coordinates");
    Location::new(LinkId(link), coord)
}

/// Table-driven [PathProvider]. Same-link queries are free; missing entries
/// are unreachable.
#[derive(Debug, Clone, Default)]
pub struct TablePaths {
    travel_times: HashMap<(LinkId, LinkId), SimTime>,
}

impl TablePaths {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secs(mut self, from: u64, to: u64, travel_secs: u64) -> Self {
        self.travel_times
            .insert((LinkId(from), LinkId(to)), secs(travel_secs));
        self
    }
}

impl PathProvider for TablePaths {
    fn path(&self, from: &Location, to: &Location, departure: SimTime) -> Option<PathData> {
        let (travel_time, links) = if from.link == to.link {
            (0, vec![from.link])
        } else {
            let tt = *self.travel_times.get(&(from.link, to.link))?;
            (tt, vec![from.link, to.link])
        };
        Some(PathData {
            departure,
            travel_time,
            cost: travel_time as f64 / ONE_SEC_MS as f64,
            links,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_paths_answer_known_pairs_only() {
        let paths = TablePaths::new().with_secs(1, 2, 7);
        let found = paths.path(&location(1), &location(2), 1_000).expect("known");
        assert_eq!(found.travel_time, 7_000);
        assert_eq!(found.arrival(), 8_000);
        assert!(paths.path(&location(2), &location(1), 0).is_none());
        assert_eq!(
            paths.path(&location(3), &location(3), 0).expect("same").travel_time,
            0
        );
        assert_ne!(location(1).coord, location(2).coord);
    }
}
