//! Spatial candidate selection: H3-bucketed registries of idle vehicles and
//! unplanned requests.
//!
//! This module provides:
//!
//! - **ZoneMap**: H3 cell → member mapping with a reverse index for O(1) updates
//! - **ZonalRegistry**: one zone map for idle vehicles, one for unplanned requests
//! - **Nearest-K queries**: ring expansion over the grid disk, ranked by Haversine distance
//!
//! Default resolution is 9 (~240m cell size), suitable for city-scale fleets.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

use h3o::{CellIndex, LatLng, Resolution};

use crate::fleet::Fleet;
use crate::model::{Location, RequestId, SimTime, VehicleId};

/// Largest ring radius tried before falling back to a full scan.
const MAX_RING: u32 = 64;

/// Great-circle distance in kilometres.
pub fn distance_km(a: LatLng, b: LatLng) -> f64 {
    let (lat1, lon1) = (a.lat().to_radians(), a.lng().to_radians());
    let (lat2, lon2) = (b.lat().to_radians(), b.lng().to_radians());
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    let sin_dlat = (dlat * 0.5).sin();
    let sin_dlon = (dlon * 0.5).sin();
    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    6371.0 * c
}

/// Members bucketed by H3 cell.
#[derive(Debug, Clone)]
pub struct ZoneMap<K> {
    resolution: Resolution,
    by_cell: HashMap<CellIndex, Vec<K>>,
    members: BTreeMap<K, (CellIndex, Location)>,
}

impl<K: Copy + Ord + Hash> ZoneMap<K> {
    pub fn new(resolution: Resolution) -> Self {
        Self {
            resolution,
            by_cell: HashMap::new(),
            members: BTreeMap::new(),
        }
    }

    /// Insert or move a member.
    pub fn insert(&mut self, key: K, location: Location) {
        let cell = location.coord.to_cell(self.resolution);
        if let Some((old_cell, _)) = self.members.get(&key).copied() {
            if old_cell == cell {
                self.members.insert(key, (cell, location));
                return;
            }
            self.detach(key, old_cell);
        }
        self.by_cell.entry(cell).or_default().push(key);
        self.members.insert(key, (cell, location));
    }

    pub fn remove(&mut self, key: K) -> bool {
        match self.members.remove(&key) {
            Some((cell, _)) => {
                self.detach(key, cell);
                true
            }
            None => false,
        }
    }

    fn detach(&mut self, key: K, cell: CellIndex) {
        if let Some(keys) = self.by_cell.get_mut(&cell) {
            keys.retain(|&k| k != key);
            if keys.is_empty() {
                self.by_cell.remove(&cell);
            }
        }
    }

    pub fn contains(&self, key: K) -> bool {
        self.members.contains_key(&key)
    }

    pub fn location(&self, key: K) -> Option<Location> {
        self.members.get(&key).map(|(_, loc)| *loc)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = K> + '_ {
        self.members.keys().copied()
    }

    /// Up to `limit` members accepted by `eligible`, nearest to `coord` first
    /// (ties by key). When no more than `limit` members are eligible, all of them
    /// are returned in key order without ranking.
    pub fn nearest(&self, coord: LatLng, limit: usize, eligible: impl Fn(K) -> bool) -> Vec<K> {
        let total = self.members.keys().filter(|&&k| eligible(k)).count();
        if total <= limit {
            return self.members.keys().copied().filter(|&k| eligible(k)).collect();
        }

        let origin = coord.to_cell(self.resolution);
        let mut k = 1;
        let found = loop {
            let found = self.members_within(origin, k, &eligible);
            if found.len() >= limit {
                // One extra ring: members just outside the disk may be closer
                // than those in its corners.
                break self.members_within(origin, k + 1, &eligible);
            }
            if k >= MAX_RING {
                break self
                    .members
                    .keys()
                    .copied()
                    .filter(|&key| eligible(key))
                    .collect();
            }
            k = (k * 2).min(MAX_RING);
        };
        self.rank(coord, found, limit)
    }

    fn members_within(&self, origin: CellIndex, k: u32, eligible: &impl Fn(K) -> bool) -> Vec<K> {
        origin
            .grid_disk::<Vec<_>>(k)
            .iter()
            .filter_map(|cell| self.by_cell.get(cell))
            .flatten()
            .copied()
            .filter(|&key| eligible(key))
            .collect()
    }

    fn rank(&self, coord: LatLng, candidates: Vec<K>, limit: usize) -> Vec<K> {
        let mut ranked: Vec<(f64, K)> = candidates
            .into_iter()
            .filter_map(|key| {
                self.members
                    .get(&key)
                    .map(|(_, loc)| (distance_km(coord, loc.coord), key))
            })
            .collect();
        ranked.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
        ranked.truncate(limit);
        ranked.into_iter().map(|(_, key)| key).collect()
    }
}

/// Always-current index of idle vehicles and unplanned requests.
#[derive(Debug, Clone)]
pub struct ZonalRegistry {
    vehicles: ZoneMap<VehicleId>,
    requests: ZoneMap<RequestId>,
}

impl ZonalRegistry {
    pub fn new(resolution: Resolution) -> Self {
        Self {
            vehicles: ZoneMap::new(resolution),
            requests: ZoneMap::new(resolution),
        }
    }

    pub fn add_vehicle(&mut self, vehicle: VehicleId, location: Location) {
        self.vehicles.insert(vehicle, location);
    }

    pub fn remove_vehicle(&mut self, vehicle: VehicleId) -> bool {
        self.vehicles.remove(vehicle)
    }

    pub fn add_request(&mut self, request: RequestId, pickup: Location) {
        self.requests.insert(request, pickup);
    }

    pub fn remove_request(&mut self, request: RequestId) -> bool {
        self.requests.remove(request)
    }

    pub fn vehicles(&self) -> &ZoneMap<VehicleId> {
        &self.vehicles
    }

    pub fn requests(&self) -> &ZoneMap<RequestId> {
        &self.requests
    }

    pub fn nearest_vehicles(
        &self,
        coord: LatLng,
        limit: usize,
        eligible: impl Fn(VehicleId) -> bool,
    ) -> Vec<VehicleId> {
        self.vehicles.nearest(coord, limit, eligible)
    }

    pub fn nearest_requests(
        &self,
        coord: LatLng,
        limit: usize,
        eligible: impl Fn(RequestId) -> bool,
    ) -> Vec<RequestId> {
        self.requests.nearest(coord, limit, eligible)
    }

    /// Reconcile vehicle membership with the fleet: idle vehicles are indexed at
    /// their current location, all others are dropped. Returns (added, removed).
    pub fn sync_vehicles(&mut self, fleet: &dyn Fleet, now: SimTime) -> (usize, usize) {
        let (mut added, mut removed) = (0, 0);
        for vehicle in fleet.vehicle_ids() {
            let idle_at = fleet
                .is_idle(vehicle, now)
                .then(|| fleet.earliest_idleness(vehicle, now))
                .flatten();
            match idle_at {
                Some(idleness) => {
                    if !self.vehicles.contains(vehicle) {
                        added += 1;
                    }
                    self.vehicles.insert(vehicle, idleness.location);
                }
                None => {
                    if self.vehicles.remove(vehicle) {
                        removed += 1;
                    }
                }
            }
        }
        (added, removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LinkId;

    fn at(lat: f64, lng: f64) -> Location {
        Location::new(LinkId(0), LatLng::new(lat, lng).expect("coord"))
    }

    #[test]
    fn haversine_matches_known_distance() {
        let berlin = LatLng::new(52.52, 13.405).expect("coord");
        let potsdam = LatLng::new(52.3906, 13.0645).expect("coord");
        let d = distance_km(berlin, potsdam);
        assert!((d - 27.2).abs() < 0.3, "got {d}");
        assert_eq!(distance_km(berlin, berlin), 0.0);
    }

    #[test]
    fn small_population_is_returned_unranked() {
        let mut zones = ZoneMap::new(Resolution::Nine);
        zones.insert(VehicleId(2), at(52.60, 13.40));
        zones.insert(VehicleId(1), at(52.50, 13.40));
        let found = zones.nearest(LatLng::new(52.60, 13.40).expect("coord"), 5, |_| true);
        assert_eq!(found, vec![VehicleId(1), VehicleId(2)]);
    }

    #[test]
    fn large_population_is_ranked_and_truncated() {
        let mut zones = ZoneMap::new(Resolution::Nine);
        for i in 0..20u64 {
            zones.insert(VehicleId(i), at(52.50 + i as f64 * 0.002, 13.40));
        }
        let origin = LatLng::new(52.50, 13.40).expect("coord");
        let found = zones.nearest(origin, 3, |_| true);
        assert_eq!(found, vec![VehicleId(0), VehicleId(1), VehicleId(2)]);

        let filtered = zones.nearest(origin, 3, |v| v != VehicleId(0));
        assert_eq!(filtered, vec![VehicleId(1), VehicleId(2), VehicleId(3)]);
    }

    #[test]
    fn far_members_are_found_by_fallback_scan() {
        let mut zones = ZoneMap::new(Resolution::Nine);
        zones.insert(RequestId(1), at(52.50, 13.40));
        zones.insert(RequestId(2), at(48.85, 2.35));
        zones.insert(RequestId(3), at(40.71, -74.0));
        let found = zones.nearest(LatLng::new(48.85, 2.35).expect("coord"), 2, |_| true);
        assert_eq!(found, vec![RequestId(2), RequestId(1)]);
    }

    #[test]
    fn moving_a_member_updates_its_bucket() {
        let mut zones = ZoneMap::new(Resolution::Nine);
        zones.insert(VehicleId(1), at(52.50, 13.40));
        zones.insert(VehicleId(1), at(52.60, 13.50));
        assert_eq!(zones.len(), 1);
        assert_eq!(zones.location(VehicleId(1)), Some(at(52.60, 13.50)));
        assert!(zones.remove(VehicleId(1)));
        assert!(!zones.remove(VehicleId(1)));
        assert!(zones.is_empty());
        assert!(zones.by_cell.is_empty());
    }
}
