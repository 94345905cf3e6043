//! Road cycles and the city blocks they enclose
//!
//! After a connection, nearby network nodes are probed: if reaching one
//! along existing roads takes at least `MIN_CYCLE_GAIN` times longer than a
//! fresh road would, the fresh road is built. The loop it closes bounds a
//! city block.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};

use crate::geometry::{BoundingBox, Point};
use crate::tilemap::Tilemap;

use super::cost::{step_length, DIRECTIONS};

/// Nodes closer than this are never joined by a cycle road.
pub const MIN_DISTANCE_CYCLE: f32 = 12.0;
/// Nodes further than this are not probed.
pub const MAX_DISTANCE_CYCLE: f32 = 48.0;
/// Required ratio of road-only length to new-road length.
pub const MIN_CYCLE_GAIN: f32 = 2.0;

/// Cells enclosed by a loop of roads.
#[derive(Clone, Debug, PartialEq)]
pub struct CityBlock {
    pub cells: Vec<Point>,
    pub bounds: BoundingBox,
}

impl CityBlock {
    pub fn area(&self) -> usize {
        self.cells.len()
    }
}

/// Network nodes inside the cycle distance band around `from`, nearest first.
pub fn cycle_candidates<'a>(nodes: impl IntoIterator<Item = &'a Point>, from: Point, limit: usize) -> Vec<Point> {
    let mut candidates: Vec<(Point, f32)> = nodes
        .into_iter()
        .map(|&n| (n, n.distance(from)))
        .filter(|(_, d)| (MIN_DISTANCE_CYCLE..=MAX_DISTANCE_CYCLE).contains(d))
        .collect();
    candidates.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal).then(a.0.cmp(&b.0)));
    candidates.into_iter().take(limit).map(|(n, _)| n).collect()
}

/// Whether the road-only route is long enough to justify a new road.
pub fn worth_closing(road_only: Option<f32>, new_road: f32) -> bool {
    match road_only {
        Some(length) => length >= MIN_CYCLE_GAIN * new_road,
        None => true,
    }
}

#[derive(Clone, Copy)]
struct RouteNode {
    point: Point,
    length: f32,
}

impl PartialEq for RouteNode {
    fn eq(&self, other: &Self) -> bool {
        self.length == other.length
    }
}

impl Eq for RouteNode {}

impl PartialOrd for RouteNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RouteNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap
        other.length.partial_cmp(&self.length).unwrap_or(Ordering::Equal)
    }
}

/// Shortest route from `from` to `to` along existing road cells, up to
/// `limit` long. `None` when they are not connected within the limit.
pub fn road_route(network: &Tilemap<u8>, from: Point, to: Point, limit: f32) -> Option<(Vec<Point>, f32)> {
    let on_road = |p: Point| network.get(p).is_some_and(|w| *w > 0);
    if !on_road(from) || !on_road(to) {
        return None;
    }
    let mut best: HashMap<Point, f32> = HashMap::new();
    let mut came_from: HashMap<Point, Point> = HashMap::new();
    let mut frontier = BinaryHeap::new();
    best.insert(from, 0.0);
    frontier.push(RouteNode { point: from, length: 0.0 });

    while let Some(RouteNode { point, length }) = frontier.pop() {
        if point == to {
            let mut route = vec![to];
            let mut current = to;
            while let Some(&prev) = came_from.get(&current) {
                route.push(prev);
                current = prev;
            }
            route.reverse();
            return Some((route, length));
        }
        if length > best.get(&point).copied().unwrap_or(f32::INFINITY) {
            continue;
        }
        for step in DIRECTIONS {
            let next = point + step;
            if !on_road(next) {
                continue;
            }
            let next_length = length + step_length(step);
            if next_length > limit {
                continue;
            }
            if next_length < best.get(&next).copied().unwrap_or(f32::INFINITY) {
                best.insert(next, next_length);
                came_from.insert(next, point);
                frontier.push(RouteNode { point: next, length: next_length });
            }
        }
    }
    None
}

/// Cells strictly inside a closed loop of 8-connected cells.
///
/// The loop is rasterised inside its bounding box grown by one cell, the
/// outside is flood filled with 4-connectivity (which cannot slip through
/// diagonal steps of the loop), and whatever was not reached is inside.
pub fn enclosed_cells(ring: &[Point], width: usize, length: usize) -> Option<CityBlock> {
    let bounds = BoundingBox::from_points(ring.iter().copied())?.inflate(1);
    let ring: HashSet<Point> = ring.iter().copied().collect();

    let mut outside: HashSet<Point> = HashSet::new();
    let mut queue: VecDeque<Point> = bounds.cells().filter(|p| on_border(&bounds, *p)).collect();
    for p in &queue {
        outside.insert(*p);
    }
    while let Some(p) = queue.pop_front() {
        for next in p.neighbors4() {
            if bounds.contains(next) && !ring.contains(&next) && outside.insert(next) {
                queue.push_back(next);
            }
        }
    }

    let area = BoundingBox::new(Point::ZERO, Point::new(width as i32 - 1, length as i32 - 1));
    let cells: Vec<Point> = bounds
        .cells()
        .filter(|p| !ring.contains(p) && !outside.contains(p) && area.contains(*p))
        .collect();
    let bounds = BoundingBox::from_points(cells.iter().copied())?;
    Some(CityBlock { cells, bounds })
}

fn on_border(bounds: &BoundingBox, p: Point) -> bool {
    p.x == bounds.min.x || p.x == bounds.max.x || p.z == bounds.min.z || p.z == bounds.max.z
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_ring(min: Point, max: Point) -> Vec<Point> {
        let mut ring = Vec::new();
        for x in min.x..=max.x {
            ring.push(Point::new(x, min.z));
            ring.push(Point::new(x, max.z));
        }
        for z in min.z + 1..max.z {
            ring.push(Point::new(min.x, z));
            ring.push(Point::new(max.x, z));
        }
        ring
    }

    #[test]
    fn test_close_nodes_are_not_candidates() {
        let nodes = [Point::new(5, 0), Point::new(20, 0), Point::new(100, 0)];
        let candidates = cycle_candidates(nodes.iter(), Point::ZERO, 8);
        assert_eq!(candidates, vec![Point::new(20, 0)]);
    }

    #[test]
    fn test_gain_threshold() {
        assert!(worth_closing(Some(40.0), 20.0));
        assert!(!worth_closing(Some(39.0), 20.0));
        assert!(worth_closing(None, 20.0));
    }

    #[test]
    fn test_road_route_follows_roads() {
        let mut network = Tilemap::new_with(20, 20, 0u8);
        for p in square_ring(Point::new(2, 2), Point::new(12, 12)) {
            network[p] = 2;
        }
        let (route, length) = road_route(&network, Point::new(2, 2), Point::new(12, 12), 100.0).unwrap();
        assert_eq!(route.first(), Some(&Point::new(2, 2)));
        assert_eq!(route.last(), Some(&Point::new(12, 12)));
        // Corners are cut diagonally
        assert!((length - (18.0 + std::f32::consts::SQRT_2)).abs() < 1e-4);
        assert!(road_route(&network, Point::new(2, 2), Point::new(12, 12), 10.0).is_none());
    }

    #[test]
    fn test_enclosed_square() {
        let ring = square_ring(Point::new(2, 2), Point::new(8, 7));
        let block = enclosed_cells(&ring, 20, 20).unwrap();
        assert_eq!(block.area(), 5 * 4);
        assert_eq!(block.bounds, BoundingBox::new(Point::new(3, 3), Point::new(7, 6)));
    }

    #[test]
    fn test_diagonal_ring_is_closed() {
        // Diamond drawn with diagonal steps only
        let ring = vec![
            Point::new(5, 2),
            Point::new(6, 3),
            Point::new(7, 4),
            Point::new(6, 5),
            Point::new(5, 6),
            Point::new(4, 5),
            Point::new(3, 4),
            Point::new(4, 3),
        ];
        let block = enclosed_cells(&ring, 10, 10).unwrap();
        assert!(block.cells.contains(&Point::new(5, 4)));
        assert!(!block.cells.contains(&Point::new(2, 2)));
    }
}
