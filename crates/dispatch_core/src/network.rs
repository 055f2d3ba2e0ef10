//! Grid road network: the reference [PathProvider] used by the simulation
//! harness.
//!
//! Nodes sit on an `nx × ny` lattice; links are directed and carry a length and
//! a free-flow speed. A vehicle on a link is at the link's downstream node, so
//! a path from link `a` to link `b` is the shortest node path from `a`'s head
//! to `b`'s tail plus the traversal of `b` itself.

use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::sync::Mutex;

use h3o::LatLng;
use lru::LruCache;
use pathfinding::prelude::dijkstra;

use crate::model::{LinkId, Location, SimTime, ONE_SEC_MS};
use crate::routing::{PathData, PathProvider};

/// Default origin: Berlin, Germany (approx).
const ORIGIN_LAT: f64 = 52.52;
const ORIGIN_LNG: f64 = 13.40;
const METERS_PER_DEG_LAT: f64 = 111_195.0;

const PATH_CACHE_SIZE: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridParams {
    pub link_length_m: f64,
    pub free_speed_mps: f64,
    /// Distance between neighbouring nodes, used for coordinates only.
    pub node_spacing_m: f64,
}

impl Default for GridParams {
    fn default() -> Self {
        Self {
            link_length_m: 100.0,
            free_speed_mps: 15.0,
            node_spacing_m: 100.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Link {
    pub id: LinkId,
    pub from: usize,
    pub to: usize,
    pub length_m: f64,
    pub travel_time: SimTime,
}

type CachedPath = Option<(SimTime, Vec<LinkId>)>;

pub struct GridNetwork {
    nx: usize,
    ny: usize,
    params: GridParams,
    coords: Vec<Option<LatLng>>,
    links: BTreeMap<LinkId, Link>,
    outgoing: Vec<Vec<LinkId>>,
    cache: Mutex<LruCache<(LinkId, LinkId), CachedPath>>,
}

impl GridNetwork {
    /// Nodes only; add links with [GridNetwork::add_one_way_link] or
    /// [GridNetwork::add_double_link].
    pub fn new(nx: usize, ny: usize, params: GridParams) -> Self {
        let lng_scale = METERS_PER_DEG_LAT * ORIGIN_LAT.to_radians().cos();
        let mut coords = Vec::with_capacity(nx * ny);
        for x in 0..nx {
            for y in 0..ny {
                let lat = ORIGIN_LAT + (y as f64 * params.node_spacing_m) / METERS_PER_DEG_LAT;
                let lng = ORIGIN_LNG + (x as f64 * params.node_spacing_m) / lng_scale;
                coords.push(LatLng::new(lat, lng).ok());
            }
        }
        Self {
            nx,
            ny,
            params,
            coords,
            links: BTreeMap::new(),
            outgoing: vec![Vec::new(); nx * ny],
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(PATH_CACHE_SIZE).unwrap_or(NonZeroUsize::MIN),
            )),
        }
    }

    /// Full lattice with links in both directions between neighbouring nodes.
    pub fn grid(nx: usize, ny: usize, params: GridParams) -> Self {
        let mut network = Self::new(nx, ny, params);
        for x in 0..nx {
            for y in 0..ny {
                if x + 1 < nx {
                    network.add_double_link((x, y), (x + 1, y));
                }
                if y + 1 < ny {
                    network.add_double_link((x, y), (x, y + 1));
                }
            }
        }
        network
    }

    fn node(&self, (x, y): (usize, usize)) -> usize {
        x * self.ny + y
    }

    pub fn node_count(&self) -> usize {
        self.nx * self.ny
    }

    /// Id of the directed link between two lattice nodes (whether or not it exists).
    pub fn link_id(&self, fx: usize, fy: usize, tx: usize, ty: usize) -> LinkId {
        let from = self.node((fx, fy)) as u64;
        let to = self.node((tx, ty)) as u64;
        LinkId(from * self.node_count() as u64 + to)
    }

    pub fn add_one_way_link(&mut self, from: (usize, usize), to: (usize, usize)) -> LinkId {
        let id = self.link_id(from.0, from.1, to.0, to.1);
        let (from, to) = (self.node(from), self.node(to));
        let travel_time = (self.params.link_length_m / self.params.free_speed_mps
            * ONE_SEC_MS as f64)
            .round() as SimTime;
        if self
            .links
            .insert(
                id,
                Link {
                    id,
                    from,
                    to,
                    length_m: self.params.link_length_m,
                    travel_time,
                },
            )
            .is_none()
        {
            self.outgoing[from].push(id);
        }
        if let Ok(mut cache) = self.cache.lock() {
            cache.clear();
        }
        id
    }

    pub fn add_double_link(&mut self, a: (usize, usize), b: (usize, usize)) -> (LinkId, LinkId) {
        (self.add_one_way_link(a, b), self.add_one_way_link(b, a))
    }

    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.get(&id)
    }

    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.links.values()
    }

    /// Location of a vehicle or rider on `link`: its downstream node.
    pub fn location(&self, link: LinkId) -> Option<Location> {
        let l = self.links.get(&link)?;
        Some(Location::new(link, self.coords[l.to]?))
    }

    fn compute(&self, from: LinkId, to: LinkId) -> CachedPath {
        let start = self.links.get(&from)?;
        let end = self.links.get(&to)?;
        if from == to {
            return Some((0, vec![from]));
        }

        let (nodes, cost) = dijkstra(
            &start.to,
            |&n| {
                self.outgoing[n]
                    .iter()
                    .filter_map(|id| self.links.get(id))
                    .map(|l| (l.to, l.travel_time))
                    .collect::<Vec<_>>()
            },
            |&n| n == end.from,
        )?;

        let mut links = Vec::with_capacity(nodes.len() + 1);
        links.push(from);
        for pair in nodes.windows(2) {
            let step = self.outgoing[pair[0]]
                .iter()
                .filter_map(|id| self.links.get(id))
                .filter(|l| l.to == pair[1])
                .min_by_key(|l| (l.travel_time, l.id))?;
            links.push(step.id);
        }
        links.push(to);
        Some((cost + end.travel_time, links))
    }
}

impl PathProvider for GridNetwork {
    fn path(&self, from: &Location, to: &Location, departure: SimTime) -> Option<PathData> {
        let key = (from.link, to.link);
        let found = match self.cache.lock() {
            Ok(mut cache) => cache.get_or_insert(key, || self.compute(key.0, key.1)).clone(),
            Err(_) => self.compute(key.0, key.1),
        };
        let (travel_time, links) = found?;
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

    fn loc(network: &GridNetwork, link: LinkId) -> Location {
        network.location(link).expect("link exists")
    }

    #[test]
    fn link_travel_time_follows_length_and_speed() {
        let network = GridNetwork::grid(3, 3, GridParams::default());
        let link = network
            .link(network.link_id(0, 0, 0, 1))
            .expect("link");
        assert_eq!(link.travel_time, 6_667);
        // 3x3 lattice: 12 undirected edges.
        assert_eq!(network.links().count(), 24);
    }

    #[test]
    fn shortest_path_crosses_the_grid() {
        let network = GridNetwork::grid(3, 3, GridParams::default());
        let from = loc(&network, network.link_id(0, 1, 0, 0));
        let to = loc(&network, network.link_id(2, 1, 2, 2));
        let path = network.path(&from, &to, 1_000).expect("reachable");
        // From node (0,0) to node (2,1) is three links, then traverse the last link.
        assert_eq!(path.links.len(), 5);
        assert_eq!(path.travel_time, 4 * 6_667);
        assert_eq!(path.departure, 1_000);
        assert_eq!(path.links.first(), Some(&from.link));
        assert_eq!(path.links.last(), Some(&to.link));
    }

    #[test]
    fn same_link_is_free_and_missing_links_are_unreachable() {
        let network = GridNetwork::grid(2, 2, GridParams::default());
        let here = loc(&network, network.link_id(0, 0, 1, 0));
        assert_eq!(network.path(&here, &here, 0).expect("same").travel_time, 0);

        let mut one_way = GridNetwork::new(2, 2, GridParams::default());
        let a = one_way.add_one_way_link((0, 0), (1, 0));
        let b = one_way.add_one_way_link((1, 0), (1, 1));
        let a = one_way.location(a).expect("a");
        let b = one_way.location(b).expect("b");
        assert!(one_way.path(&a, &b, 0).is_some());
        assert!(one_way.path(&b, &a, 0).is_none());
    }
}
