//! Road network
//!
//! Roads are stored as a width raster over the build area. Road cells also
//! pave a small surface around them which is marked in the obstacle map so
//! buildings keep off the road, while road searches may still cross it.
//!
//! An incremental distance field from the network answers "how far, and
//! which way, to the nearest road" for every cell; accessibility interest
//! reads it through the change log.

pub mod cost;
pub mod cycles;
pub mod distance_field;
pub mod pathfinding;

use std::collections::{BTreeSet, HashSet, VecDeque};
use std::time::{Duration, Instant};

use tracing::{debug, info, trace};

use crate::geometry::{BoundingBox, Point};
use crate::obstacle_map::ObstacleMap;
use crate::params::RoadParams;
use crate::terrain::Terrain;
use crate::tilemap::Tilemap;

pub use cost::{CostCache, CostModel, INFINITE_COST};
pub use cycles::{CityBlock, MAX_DISTANCE_CYCLE, MIN_CYCLE_GAIN, MIN_DISTANCE_CYCLE};
pub use distance_field::{ChangeLog, DistanceField};
pub use pathfinding::{Goal, SearchOutcome};

pub const MIN_ROAD_WIDTH: u8 = 2;
pub const MAX_ROAD_WIDTH: u8 = 4;
/// Spacing of network nodes along a new road.
pub const DIST_BETWEEN_NODES: usize = 10;

/// Result of connecting a parcel seed to the network.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Connection {
    /// Road cells laid by this connection, from the network outwards
    pub path: Vec<Point>,
    /// Road cell the parcel is entered from
    pub entry: Option<Point>,
    /// Loops closed by cycle roads built after the connection
    pub cycles: Vec<Vec<Point>>,
}

#[derive(Clone, Debug)]
pub struct RoadNetwork {
    params: RoadParams,
    /// Road width per cell; 0 off the network
    network: Tilemap<u8>,
    /// Paved cells; obstacles here do not stop road searches
    surface: Tilemap<bool>,
    field: DistanceField,
    cost_cache: CostCache,
    nodes: BTreeSet<Point>,
    road_blocks: HashSet<Point>,
    /// Bridges and stairs; excluded from width-based queries
    special_road_blocks: HashSet<Point>,
    /// Road cells used as parcel entries; never pruned
    entries: HashSet<Point>,
    blocks: Vec<CityBlock>,
    /// When each cell's distance label last changed
    changes: ChangeLog,
    road_cells: usize,
}

impl RoadNetwork {
    pub fn new(terrain: &Terrain, params: RoadParams) -> Self {
        let (width, length) = (terrain.width(), terrain.length());
        Self {
            field: DistanceField::new(width, length, params.lambda_max),
            params,
            network: Tilemap::new_with(width, length, 0),
            surface: Tilemap::new_with(width, length, false),
            cost_cache: CostCache::new(width, length),
            nodes: BTreeSet::new(),
            road_blocks: HashSet::new(),
            special_road_blocks: HashSet::new(),
            entries: HashSet::new(),
            blocks: Vec::new(),
            changes: ChangeLog::new(width, length),
            road_cells: 0,
        }
    }

    pub fn params(&self) -> &RoadParams {
        &self.params
    }

    pub fn is_empty(&self) -> bool {
        self.road_cells == 0
    }

    pub fn road_cell_count(&self) -> usize {
        self.road_cells
    }

    pub fn is_road(&self, p: Point) -> bool {
        self.network.get(p).is_some_and(|w| *w > 0)
    }

    /// Width of the road at `p`; 0 off the network and on bridges or stairs.
    pub fn width_at(&self, p: Point) -> u8 {
        if self.special_road_blocks.contains(&p) {
            return 0;
        }
        self.network.get(p).copied().unwrap_or(0)
    }

    pub fn is_special(&self, p: Point) -> bool {
        self.special_road_blocks.contains(&p)
    }

    pub fn is_paved(&self, p: Point) -> bool {
        self.surface.get(p).copied().unwrap_or(false)
    }

    pub fn network(&self) -> &Tilemap<u8> {
        &self.network
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Point> {
        self.nodes.iter()
    }

    pub fn road_blocks(&self) -> &HashSet<Point> {
        &self.road_blocks
    }

    pub fn special_road_blocks(&self) -> &HashSet<Point> {
        &self.special_road_blocks
    }

    pub fn city_blocks(&self) -> &[CityBlock] {
        &self.blocks
    }

    pub fn distance_map(&self) -> &Tilemap<f32> {
        &self.field.distance_map
    }

    pub fn cost_map(&self) -> &Tilemap<f32> {
        &self.field.cost_map
    }

    pub fn path_map(&self) -> &Tilemap<Option<Point>> {
        &self.field.path_map
    }

    /// Current epoch of the distance field; readers store it to catch up later.
    pub fn change_epoch(&self) -> u32 {
        self.changes.epoch()
    }

    /// Cells whose distance changed after `epoch` (a previous `change_epoch`).
    pub fn changed_since(&self, epoch: u32) -> Vec<Point> {
        self.changes.changed_since(epoch)
    }

    /// Closest road cell to `p` within `max_radius` (Chebyshev rings).
    pub fn nearest_road_cell(&self, p: Point, max_radius: i32) -> Option<Point> {
        for radius in 0..=max_radius {
            let ring = BoundingBox::new(p - Point::new(radius, radius), p + Point::new(radius, radius));
            let closest = ring
                .cells()
                .filter(|q| q.chebyshev(p) == radius && self.is_road(*q))
                .min_by(|a, b| a.distance(p).total_cmp(&b.distance(p)).then(a.cmp(b)));
            if closest.is_some() {
                return closest;
            }
        }
        None
    }

    /// Protect a road cell from dead-end pruning.
    pub fn register_entry(&mut self, p: Point) {
        self.entries.insert(p);
    }

    pub fn unregister_entry(&mut self, p: Point) {
        self.entries.remove(&p);
    }

    fn search_deadline(&self) -> Instant {
        Instant::now() + Duration::from_millis(self.params.astar_timeout_ms)
    }

    /// Build a road from `a` to `b` and return the cells laid.
    ///
    /// When the search runs out of time the best partial road from `a` is
    /// built instead. An empty result means no road could be built.
    pub fn create_road(&mut self, terrain: &Terrain, obstacles: &mut ObstacleMap, a: Point, b: Point) -> Vec<Point> {
        let deadline = self.search_deadline();
        let outcome = {
            let mut model = CostModel {
                terrain,
                obstacles: &*obstacles,
                surface: &self.surface,
                cache: &mut self.cost_cache,
            };
            pathfinding::find_path(
                &mut model,
                a,
                b,
                &self.network,
                self.params.coarse_step,
                deadline,
                self.params.max_distance,
            )
        };
        let path = match outcome {
            SearchOutcome::Found(path) => path,
            SearchOutcome::Partial(path) => {
                debug!("road {} -> {} stopped short at {:?}", a, b, path.last());
                path
            }
            SearchOutcome::NotFound => {
                debug!("no road possible between {} and {}", a, b);
                return Vec::new();
            }
        };
        self.commit(terrain, obstacles, &path);
        path
    }

    /// Route from `target` to the network: follow the distance field when it
    /// is still valid, otherwise search.
    fn route_to_network(&mut self, terrain: &Terrain, obstacles: &ObstacleMap, target: Point) -> Option<Vec<Point>> {
        if !terrain.contains(target) {
            return None;
        }
        let deadline = self.search_deadline();
        let mut model = CostModel {
            terrain,
            obstacles,
            surface: &self.surface,
            cache: &mut self.cost_cache,
        };
        if let Some(path) = self.field.trace(target, &mut model) {
            return Some(path);
        }
        let limits = pathfinding::SearchLimits { deadline, max_distance: self.params.max_distance, corridor: None };
        match pathfinding::astar(&mut model, target, Goal::Network, &self.network, &limits) {
            SearchOutcome::Found(path) => Some(path),
            // A partial route does not touch the network and would leave an island
            SearchOutcome::Partial(_) | SearchOutcome::NotFound => None,
        }
    }

    /// Connect `target` to the network, stopping the road `margin` cells
    /// (Chebyshev) short of it, then probe for cycles from the junction.
    ///
    /// Returns `None` when the network is empty or unreachable.
    pub fn connect_to_network(
        &mut self,
        terrain: &Terrain,
        obstacles: &mut ObstacleMap,
        target: Point,
        margin: i32,
    ) -> Option<Connection> {
        if self.is_empty() {
            return None;
        }
        let route = self.route_to_network(terrain, obstacles, target)?;

        // route runs target -> network; drop the stretch inside the margin
        let kept: Vec<Point> = route.iter().copied().skip_while(|p| p.chebyshev(target) <= margin).collect();
        let Some(&junction) = kept.last() else {
            // The network already runs through the margin
            let entry = route.last().copied();
            return Some(Connection { path: Vec::new(), entry, cycles: Vec::new() });
        };
        let entry = kept.first().copied();
        let mut path = kept;
        path.reverse();
        self.commit(terrain, obstacles, &path);

        let cycles = match entry {
            Some(from) if path.len() > 1 => self.close_cycles(terrain, obstacles, from),
            _ => Vec::new(),
        };
        trace!("connected {} to the network at {} with {} cells", target, junction, path.len());
        Some(Connection { path, entry, cycles })
    }

    /// Probe nearby nodes from `from` and build the roads worth building.
    fn close_cycles(&mut self, terrain: &Terrain, obstacles: &mut ObstacleMap, from: Point) -> Vec<Vec<Point>> {
        let candidates = cycles::cycle_candidates(self.nodes.iter(), from, self.params.max_cycle_probes);
        let mut closed = Vec::new();

        for candidate in candidates {
            if closed.len() >= self.params.max_cycles_per_connection {
                break;
            }
            let straight = from.distance(candidate);
            let limit = MIN_CYCLE_GAIN * MAX_DISTANCE_CYCLE * 2.0;
            let road_only = cycles::road_route(&self.network, from, candidate, limit);
            // A new road is never shorter than the straight line
            if !cycles::worth_closing(road_only.as_ref().map(|r| r.1), straight) {
                continue;
            }

            let deadline = self.search_deadline();
            let outcome = {
                let mut model = CostModel {
                    terrain,
                    obstacles: &*obstacles,
                    surface: &self.surface,
                    cache: &mut self.cost_cache,
                };
                pathfinding::find_path(
                    &mut model,
                    from,
                    candidate,
                    &self.network,
                    self.params.coarse_step,
                    deadline,
                    MIN_CYCLE_GAIN * MAX_DISTANCE_CYCLE,
                )
            };
            let SearchOutcome::Found(new_road) = outcome else {
                continue;
            };
            let new_length = pathfinding::path_length(&new_road);
            if !cycles::worth_closing(road_only.as_ref().map(|r| r.1), new_length) {
                continue;
            }

            self.commit(terrain, obstacles, &new_road);
            let mut ring = new_road;
            if let Some((route, _)) = road_only {
                ring.extend(route.into_iter().rev().skip(1));
            }
            if let Some(block) = cycles::enclosed_cells(&ring, terrain.width(), terrain.length()) {
                debug!("cycle {} -> {} encloses a block of {} cells", from, candidate, block.area());
                self.blocks.push(block);
            }
            closed.push(ring);
        }
        closed
    }

    /// Lay `path` on the network: new cells get the minimum width, reused
    /// cells are widened, nodes are dropped along the way and the distance
    /// field is relaxed from the new cells.
    fn commit(&mut self, terrain: &Terrain, obstacles: &mut ObstacleMap, path: &[Point]) {
        let mut fresh = Vec::new();
        let mut previous: Option<Point> = None;

        for (i, &p) in path.iter().enumerate() {
            let Some(width) = self.network.get_mut(p) else {
                continue;
            };
            if *width == 0 {
                *width = MIN_ROAD_WIDTH;
                self.road_cells += 1;
                fresh.push(p);
            } else {
                *width = (*width + 1).min(MAX_ROAD_WIDTH);
            }

            let steep = previous
                .and_then(|q| Some((terrain.height(q)? - terrain.height(p)?).abs()))
                .is_some_and(|rise| rise >= 1);
            if terrain.is_water(p) || steep {
                self.special_road_blocks.insert(p);
            }
            if i % DIST_BETWEEN_NODES == 0 || i + 1 == path.len() {
                self.nodes.insert(p);
            }
            previous = Some(p);
        }

        for &p in path {
            self.pave(obstacles, p);
        }

        let mut model = CostModel {
            terrain,
            obstacles: &*obstacles,
            surface: &self.surface,
            cache: &mut self.cost_cache,
        };
        self.changes.begin();
        let changes = &mut self.changes;
        self.field.relax_from(&fresh, &mut model, |p| changes.mark(p));
        trace!("committed {} road cells ({} new)", path.len(), fresh.len());
    }

    /// Pave the surface around a road cell; bridges and stairs are one cell wide.
    fn pave(&mut self, obstacles: &mut ObstacleMap, p: Point) {
        let radius = if self.special_road_blocks.contains(&p) { 0 } else { (self.network[p] / 2) as i32 };
        let reach = BoundingBox::new(p - Point::new(radius, radius), p + Point::new(radius, radius));
        let Some(reach) = self.network.clip(reach) else {
            return;
        };
        for cell in reach.cells() {
            if cell.distance(p) > radius as f32 || self.surface[cell] {
                continue;
            }
            if cell != p && !obstacles.is_accessible(cell) {
                continue;
            }
            self.surface[cell] = true;
            self.road_blocks.insert(cell);
            obstacles.add_box(BoundingBox::new(cell, cell));
        }
    }

    /// Whether `cell` is still within the paved reach of some road cell.
    fn is_covered(&self, cell: Point) -> bool {
        let reach = BoundingBox::new(
            cell - Point::new(MAX_ROAD_WIDTH as i32, MAX_ROAD_WIDTH as i32),
            cell + Point::new(MAX_ROAD_WIDTH as i32, MAX_ROAD_WIDTH as i32),
        );
        let Some(reach) = self.network.clip(reach) else {
            return false;
        };
        let covered = reach.cells().any(|q| {
            let width = self.network[q];
            if width == 0 {
                return false;
            }
            let radius = if self.special_road_blocks.contains(&q) { 0 } else { (width / 2) as i32 };
            cell.distance(q) <= radius as f32
        });
        covered
    }

    /// 8-neighbours of `p` on the network.
    fn road_degree(&self, p: Point) -> usize {
        p.neighbors8().iter().filter(|q| self.is_road(**q)).count()
    }

    /// Remove dead-end stubs of at most `max_length` cells that end away from
    /// any parcel entry. Returns the number of road cells removed.
    ///
    /// The distance field is rebuilt afterwards, since removal is the one
    /// change the incremental relaxation cannot follow.
    pub fn prune_dead_ends(&mut self, terrain: &Terrain, obstacles: &mut ObstacleMap, max_length: usize) -> usize {
        let leaves: Vec<Point> = self
            .network
            .iter()
            .filter(|(p, w)| **w > 0 && !self.entries.contains(p))
            .map(|(p, _)| p)
            .filter(|p| self.road_degree(*p) <= 1)
            .collect();

        let mut removed = 0;
        for leaf in leaves {
            if !self.is_road(leaf) || self.road_degree(leaf) > 1 {
                continue;
            }
            let Some(stub) = self.dead_end_stub(leaf, max_length) else {
                continue;
            };
            for p in &stub {
                self.remove_cell(obstacles, *p);
            }
            removed += stub.len();
        }
        if removed > 0 {
            info!("pruned {} dead-end road cells", removed);
            self.recompute_distance_field(terrain, obstacles);
        }
        removed
    }

    /// The chain of cells from `leaf` up to the junction it hangs from, if it
    /// is short and free of entries.
    ///
    /// With 8-connectivity the last chain cell usually touches several cells
    /// of the road it joins; it belongs to the stub as long as those cells
    /// stay connected to each other without it.
    fn dead_end_stub(&self, leaf: Point, max_length: usize) -> Option<Vec<Point>> {
        let mut stub = vec![leaf];
        let mut current = leaf;
        loop {
            let onward: Vec<Point> = current
                .neighbors8()
                .into_iter()
                .filter(|q| self.is_road(*q) && !stub.contains(q))
                .collect();
            match onward.as_slice() {
                [] => return None,
                [next] => {
                    if self.entries.contains(next) || stub.len() >= max_length {
                        return None;
                    }
                    stub.push(*next);
                    current = *next;
                }
                _ if locally_connected(&onward) => return Some(stub),
                _ => {
                    // `current` is the junction itself
                    stub.pop();
                    return (!stub.is_empty()).then_some(stub);
                }
            }
        }
    }

    fn remove_cell(&mut self, obstacles: &mut ObstacleMap, p: Point) {
        if self.network[p] == 0 {
            return;
        }
        self.network[p] = 0;
        self.road_cells -= 1;
        self.nodes.remove(&p);
        self.special_road_blocks.remove(&p);

        let reach = BoundingBox::new(
            p - Point::new(MAX_ROAD_WIDTH as i32, MAX_ROAD_WIDTH as i32),
            p + Point::new(MAX_ROAD_WIDTH as i32, MAX_ROAD_WIDTH as i32),
        );
        let Some(reach) = self.network.clip(reach) else {
            return;
        };
        for cell in reach.cells() {
            if self.surface[cell] && !self.is_covered(cell) {
                self.surface[cell] = false;
                self.road_blocks.remove(&cell);
                obstacles.remove_box(BoundingBox::new(cell, cell));
            }
        }
    }

    /// Every road cell reachable from every other through 8-adjacent road cells.
    pub fn is_connected(&self) -> bool {
        let Some(start) = self.network.iter().find(|(_, w)| **w > 0).map(|(p, _)| p) else {
            return true;
        };
        let mut seen = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);
        while let Some(p) = queue.pop_front() {
            for q in p.neighbors8() {
                if self.is_road(q) && seen.insert(q) {
                    queue.push_back(q);
                }
            }
        }
        seen.len() == self.road_cells
    }

    /// Rebuild the distance field from scratch against the current obstacles.
    /// Cells whose label differs from before are stamped in a new epoch.
    pub fn recompute_distance_field(&mut self, terrain: &Terrain, obstacles: &ObstacleMap) {
        let previous = self.field.clone();
        self.field.reset();
        let sources: Vec<Point> = self.network.iter().filter(|(_, w)| **w > 0).map(|(p, _)| p).collect();
        let mut model = CostModel {
            terrain,
            obstacles,
            surface: &self.surface,
            cache: &mut self.cost_cache,
        };
        self.field.relax_from(&sources, &mut model, |_| {});

        self.changes.begin();
        for (p, cost) in self.field.cost_map.iter() {
            if *cost != previous.cost_map[p] || self.field.distance_map[p] != previous.distance_map[p] {
                self.changes.mark(p);
            }
        }
        debug!("distance field rebuilt from {} road cells", sources.len());
    }
}

/// Whether `cells` form one 8-connected group on their own.
fn locally_connected(cells: &[Point]) -> bool {
    let Some(&first) = cells.first() else {
        return true;
    };
    let mut seen = vec![first];
    let mut queue = vec![first];
    while let Some(p) = queue.pop() {
        for q in cells {
            if !seen.contains(q) && p.chebyshev(*q) == 1 {
                seen.push(*q);
                queue.push(*q);
            }
        }
    }
    seen.len() == cells.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::synthetic;

    #[test]
    fn test_straight_road() {
        let terrain = synthetic::flat(10, 10, 64);
        let mut obstacles = ObstacleMap::new(10, 10);
        let mut roads = RoadNetwork::new(&terrain, RoadParams::default());
        let path = roads.create_road(&terrain, &mut obstacles, Point::new(0, 0), Point::new(0, 9));
        assert_eq!(path.len(), 10);
        for z in 0..10 {
            assert!(roads.width_at(Point::new(0, z)) >= MIN_ROAD_WIDTH);
        }
        assert_eq!(roads.distance_map()[Point::new(0, 0)], 0.0);
        assert_eq!(roads.distance_map()[Point::new(5, 4)], 5.0);
        assert!(roads.is_connected());
    }

    #[test]
    fn test_reuse_widens() {
        let terrain = synthetic::flat(20, 20, 64);
        let mut obstacles = ObstacleMap::new(20, 20);
        let mut roads = RoadNetwork::new(&terrain, RoadParams::default());
        roads.create_road(&terrain, &mut obstacles, Point::new(2, 10), Point::new(17, 10));
        roads.create_road(&terrain, &mut obstacles, Point::new(2, 10), Point::new(17, 10));
        assert_eq!(roads.width_at(Point::new(9, 10)), MIN_ROAD_WIDTH + 1);
        for _ in 0..4 {
            roads.create_road(&terrain, &mut obstacles, Point::new(2, 10), Point::new(17, 10));
        }
        assert_eq!(roads.width_at(Point::new(9, 10)), MAX_ROAD_WIDTH);
    }

    #[test]
    fn test_road_surface_blocks_buildings() {
        let terrain = synthetic::flat(20, 20, 64);
        let mut obstacles = ObstacleMap::new(20, 20);
        let mut roads = RoadNetwork::new(&terrain, RoadParams::default());
        roads.create_road(&terrain, &mut obstacles, Point::new(0, 10), Point::new(19, 10));
        assert!(!obstacles.is_accessible(Point::new(5, 10)));
        assert!(!obstacles.is_accessible(Point::new(5, 11)));
        assert!(obstacles.is_accessible(Point::new(5, 12)));
        assert!(roads.is_paved(Point::new(5, 9)));
    }

    #[test]
    fn test_connect_stops_at_margin() {
        let terrain = synthetic::flat(40, 40, 64);
        let mut obstacles = ObstacleMap::new(40, 40);
        let mut roads = RoadNetwork::new(&terrain, RoadParams::default());
        roads.create_road(&terrain, &mut obstacles, Point::new(0, 5), Point::new(39, 5));

        let target = Point::new(20, 25);
        let connection = roads.connect_to_network(&terrain, &mut obstacles, target, 3).unwrap();
        let entry = connection.entry.unwrap();
        assert_eq!(entry.chebyshev(target), 4);
        assert!(roads.is_road(entry));
        assert!(connection.path.iter().all(|p| p.chebyshev(target) > 3));
        assert!(roads.is_connected());
        assert!(obstacles.is_box_free(BoundingBox::centered(target, 5, 5)));
    }

    #[test]
    fn test_connect_without_network() {
        let terrain = synthetic::flat(10, 10, 64);
        let mut obstacles = ObstacleMap::new(10, 10);
        let mut roads = RoadNetwork::new(&terrain, RoadParams::default());
        assert!(roads.connect_to_network(&terrain, &mut obstacles, Point::new(5, 5), 1).is_none());
    }

    #[test]
    fn test_change_epochs() {
        let terrain = synthetic::flat(16, 16, 64);
        let mut obstacles = ObstacleMap::new(16, 16);
        let mut roads = RoadNetwork::new(&terrain, RoadParams::default());
        assert_eq!(roads.change_epoch(), 0);
        roads.create_road(&terrain, &mut obstacles, Point::new(0, 0), Point::new(15, 0));
        let epoch = roads.change_epoch();
        assert!(epoch > 0);
        assert_eq!(roads.changed_since(0).len(), 256);
        assert!(roads.changed_since(epoch).is_empty());

        roads.create_road(&terrain, &mut obstacles, Point::new(0, 15), Point::new(15, 15));
        let changed = roads.changed_since(epoch);
        assert!(changed.contains(&Point::new(7, 14)));
        assert!(!changed.contains(&Point::new(7, 1)));
        // Each cell is reported once however often it was relabelled
        assert!(changed.len() <= 256);
    }

    #[test]
    fn test_prune_removes_short_stub_only() {
        let terrain = synthetic::flat(30, 30, 64);
        let mut obstacles = ObstacleMap::new(30, 30);
        let mut roads = RoadNetwork::new(&terrain, RoadParams::default());
        roads.create_road(&terrain, &mut obstacles, Point::new(0, 15), Point::new(29, 15));
        // Three-cell spur hanging off the main road
        roads.create_road(&terrain, &mut obstacles, Point::new(10, 15), Point::new(10, 12));
        let protected = Point::new(20, 10);
        roads.create_road(&terrain, &mut obstacles, Point::new(20, 15), protected);
        roads.register_entry(protected);

        let before = roads.road_cell_count();
        let epoch = roads.change_epoch();
        let removed = roads.prune_dead_ends(&terrain, &mut obstacles, 4);
        assert_eq!(removed, 3);
        assert_eq!(roads.road_cell_count(), before - 3);
        assert!(!roads.is_road(Point::new(10, 12)));
        assert!(roads.is_road(protected));
        assert!(roads.is_road(Point::new(0, 15)));
        assert!(roads.is_connected());
        assert!(obstacles.is_accessible(Point::new(10, 12)));

        // The field no longer treats the stub as road
        assert_eq!(roads.distance_map()[Point::new(10, 12)], 3.0);
        assert_eq!(roads.cost_map()[Point::new(10, 12)], 3.0);
        assert!(roads.changed_since(epoch).contains(&Point::new(10, 12)));
        let mut rebuilt = roads.clone();
        rebuilt.recompute_distance_field(&terrain, &obstacles);
        assert_eq!(rebuilt.distance_map(), roads.distance_map());
    }
}
