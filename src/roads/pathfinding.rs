//! Road pathfinding
//!
//! Long connections are routed in two layers: a Dijkstra over a coarse grid
//! picks a corridor, then A* runs on full-resolution cells restricted to that
//! corridor. Fine searches carry a wall-clock deadline; when it passes they
//! hand back the best partial path found so far.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::time::Instant;

use tracing::{debug, trace};

use crate::geometry::Point;
use crate::tilemap::Tilemap;

use super::cost::{step_length, CostModel, DIRECTIONS};

/// Deadline is checked once every this many expansions.
const DEADLINE_CHECK_INTERVAL: usize = 256;
/// Cost charged per blocked cell when estimating a coarse edge.
const COARSE_BLOCKED_COST: f32 = 40.0;
/// Corridor half-width around the coarse route, in coarse cells.
const CORRIDOR_MARGIN: i32 = 1;

/// What a search is looking for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Goal {
    Cell(Point),
    /// Any cell of the road network
    Network,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SearchOutcome {
    /// Complete path from start to goal, both included
    Found(Vec<Point>),
    /// Deadline passed; path from start to the node closest to the goal
    Partial(Vec<Point>),
    NotFound,
}

impl SearchOutcome {
    pub fn into_path(self) -> Option<Vec<Point>> {
        match self {
            SearchOutcome::Found(path) | SearchOutcome::Partial(path) => Some(path),
            SearchOutcome::NotFound => None,
        }
    }
}

/// Node for the A* priority queue
#[derive(Clone, Copy)]
struct SearchNode {
    point: Point,
    priority: f32,
}

impl PartialEq for SearchNode {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority
    }
}

impl Eq for SearchNode {}

impl PartialOrd for SearchNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SearchNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap
        other.priority.partial_cmp(&self.priority).unwrap_or(Ordering::Equal)
    }
}

/// Limits of one fine search.
pub struct SearchLimits<'a> {
    pub deadline: Instant,
    /// Paths longer than this (geometric length) are not explored
    pub max_distance: f32,
    /// Cells the search may enter; `None` allows every cell
    pub corridor: Option<&'a Tilemap<bool>>,
}

/// A* from `start` to `goal`. `on_network` tells which cells are road cells
/// for `Goal::Network`.
pub fn astar(
    model: &mut CostModel<'_>,
    start: Point,
    goal: Goal,
    on_network: &Tilemap<u8>,
    limits: &SearchLimits<'_>,
) -> SearchOutcome {
    if !model.terrain.contains(start) {
        return SearchOutcome::NotFound;
    }
    let is_goal = |p: Point| match goal {
        Goal::Cell(g) => p == g,
        Goal::Network => on_network.get(p).is_some_and(|w| *w > 0),
    };
    let heuristic = |model: &CostModel<'_>, p: Point| match goal {
        Goal::Cell(g) => model.heuristic(p, g),
        Goal::Network => 0.0,
    };

    let mut g_cost: HashMap<Point, f32> = HashMap::new();
    let mut length: HashMap<Point, f32> = HashMap::new();
    let mut came_from: HashMap<Point, Point> = HashMap::new();
    let mut frontier = BinaryHeap::new();

    g_cost.insert(start, 0.0);
    length.insert(start, 0.0);
    frontier.push(SearchNode { point: start, priority: heuristic(model, start) });

    let mut best = (start, heuristic(model, start));
    let mut expansions = 0usize;

    while let Some(SearchNode { point, priority }) = frontier.pop() {
        if is_goal(point) {
            return SearchOutcome::Found(reconstruct(&came_from, point));
        }
        let cost = g_cost.get(&point).copied().unwrap_or(f32::INFINITY);
        // Skip if we've found a better path to this node
        if priority > cost + heuristic(model, point) + f32::EPSILON {
            continue;
        }

        expansions += 1;
        if expansions % DEADLINE_CHECK_INTERVAL == 0 && Instant::now() >= limits.deadline {
            debug!("road search from {} timed out after {} expansions", start, expansions);
            if best.0 == start {
                return SearchOutcome::NotFound;
            }
            return SearchOutcome::Partial(reconstruct(&came_from, best.0));
        }

        let h = heuristic(model, point);
        if h < best.1 {
            best = (point, h);
        }

        let travelled = length.get(&point).copied().unwrap_or(0.0);
        for step in DIRECTIONS {
            let next = point + step;
            if let Some(corridor) = limits.corridor {
                if !corridor.get(next).copied().unwrap_or(false) {
                    continue;
                }
            }
            let next_length = travelled + step_length(step);
            if next_length > limits.max_distance {
                continue;
            }
            let edge = model.road_build_cost(point, next);
            if !edge.is_finite() {
                continue;
            }
            let new_cost = cost + edge;
            if new_cost < g_cost.get(&next).copied().unwrap_or(f32::INFINITY) {
                g_cost.insert(next, new_cost);
                length.insert(next, next_length);
                came_from.insert(next, point);
                frontier.push(SearchNode { point: next, priority: new_cost + heuristic(model, next) });
            }
        }
    }

    trace!("road search from {} exhausted after {} expansions", start, expansions);
    SearchOutcome::NotFound
}

fn reconstruct(came_from: &HashMap<Point, Point>, end: Point) -> Vec<Point> {
    let mut path = vec![end];
    let mut current = end;
    while let Some(&prev) = came_from.get(&current) {
        path.push(prev);
        current = prev;
    }
    path.reverse();
    path
}

/// Bresenham line between two cells, both included.
pub fn bresenham_line(from: Point, to: Point) -> Vec<Point> {
    let mut points = Vec::new();
    let dx = (to.x - from.x).abs();
    let dz = -(to.z - from.z).abs();
    let sx = if from.x < to.x { 1 } else { -1 };
    let sz = if from.z < to.z { 1 } else { -1 };
    let mut err = dx + dz;
    let mut current = from;

    loop {
        points.push(current);
        if current == to {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dz {
            err += dz;
            current.x += sx;
        }
        if e2 <= dx {
            err += dx;
            current.z += sz;
        }
    }
    points
}

/// Coarse route from `start` to `goal`, returned as a corridor mask over
/// the fine grid. `None` when the coarse graph does not connect them.
pub fn coarse_corridor(model: &mut CostModel<'_>, start: Point, goal: Point, step: usize) -> Option<Tilemap<bool>> {
    if !model.terrain.contains(start) || !model.terrain.contains(goal) {
        return None;
    }
    let width = model.terrain.width();
    let length = model.terrain.length();
    let step = step.max(2);
    let coarse_w = width.div_ceil(step);
    let coarse_l = length.div_ceil(step);
    let s = step as i32;

    let to_coarse = |p: Point| Point::new(p.x / s, p.z / s);
    let representative = |c: Point| {
        Point::new(
            (c.x * s + s / 2).min(width as i32 - 1),
            (c.z * s + s / 2).min(length as i32 - 1),
        )
    };

    let start_c = to_coarse(start);
    let goal_c = to_coarse(goal);
    let mut costs: Tilemap<f32> = Tilemap::new_with(coarse_w, coarse_l, f32::INFINITY);
    let mut came_from: HashMap<Point, Point> = HashMap::new();
    let mut frontier = BinaryHeap::new();
    costs[start_c] = 0.0;
    frontier.push(SearchNode { point: start_c, priority: 0.0 });

    while let Some(SearchNode { point, priority }) = frontier.pop() {
        if point == goal_c {
            break;
        }
        if priority > costs[point] {
            continue;
        }
        for dir in DIRECTIONS {
            let next = point + dir;
            if !costs.in_bounds(next) {
                continue;
            }
            let from = if point == start_c { start } else { representative(point) };
            let to = if next == goal_c { goal } else { representative(next) };
            let edge = line_cost(model, from, to);
            let new_cost = priority + edge;
            if new_cost < costs[next] {
                costs[next] = new_cost;
                came_from.insert(next, point);
                frontier.push(SearchNode { point: next, priority: new_cost });
            }
        }
    }

    if !costs[goal_c].is_finite() {
        return None;
    }

    let route = reconstruct(&came_from, goal_c);
    let mut corridor = Tilemap::new_with(width, length, false);
    for c in &route {
        for dz in -CORRIDOR_MARGIN..=CORRIDOR_MARGIN {
            for dx in -CORRIDOR_MARGIN..=CORRIDOR_MARGIN {
                let cell = *c + Point::new(dx, dz);
                if !costs.in_bounds(cell) {
                    continue;
                }
                for z in cell.z * s..((cell.z + 1) * s).min(length as i32) {
                    for x in cell.x * s..((cell.x + 1) * s).min(width as i32) {
                        corridor[Point::new(x, z)] = true;
                    }
                }
            }
        }
    }
    trace!("coarse route {} -> {} spans {} coarse cells", start, goal, route.len());
    Some(corridor)
}

/// Estimated cost of following a straight line; blocked steps are charged
/// a flat penalty so the coarse layer still sees a route around them.
fn line_cost(model: &mut CostModel<'_>, from: Point, to: Point) -> f32 {
    let line = bresenham_line(from, to);
    line.windows(2)
        .map(|w| {
            let c = model.road_build_cost(w[0], w[1]);
            if c.is_finite() {
                c
            } else {
                COARSE_BLOCKED_COST
            }
        })
        .sum()
}

/// Point-to-point search: corridor-limited A* for long hops, falling back to
/// an unrestricted search when the corridor holds no path.
pub fn find_path(
    model: &mut CostModel<'_>,
    start: Point,
    goal: Point,
    on_network: &Tilemap<u8>,
    coarse_step: usize,
    deadline: Instant,
    max_distance: f32,
) -> SearchOutcome {
    if !model.terrain.contains(start) || !model.terrain.contains(goal) {
        return SearchOutcome::NotFound;
    }
    let limits = SearchLimits { deadline, max_distance, corridor: None };
    if start.chebyshev(goal) <= 2 * coarse_step as i32 {
        return astar(model, start, Goal::Cell(goal), on_network, &limits);
    }

    if let Some(corridor) = coarse_corridor(model, start, goal, coarse_step) {
        let narrowed = SearchLimits { corridor: Some(&corridor), ..limits };
        match astar(model, start, Goal::Cell(goal), on_network, &narrowed) {
            SearchOutcome::NotFound => {}
            outcome => return outcome,
        }
        trace!("corridor {} -> {} holds no path, widening", start, goal);
    }
    let limits = SearchLimits { deadline, max_distance, corridor: None };
    astar(model, start, Goal::Cell(goal), on_network, &limits)
}

/// Geometric length of a path of adjacent cells.
pub fn path_length(path: &[Point]) -> f32 {
    path.windows(2).map(|w| step_length(w[1] - w[0])).sum()
}
