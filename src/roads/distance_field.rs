//! Incremental multi-source Dijkstra from the road network
//!
//! Every cell stores the cheapest known construction cost to reach the
//! network, the geometric length of that route, and its next step towards
//! the network. New road cells only ever lower labels, so adding sources
//! relaxes outwards from them alone; the result matches a full recompute.
//! The relaxation stops at `lambda_max` on the cost, the same key the
//! frontier is ordered on.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::geometry::{BoundingBox, Point};
use crate::tilemap::Tilemap;

use super::cost::{step_length, CostModel, DIRECTIONS};

/// Frontier entry, ordered so the heap pops the smallest (cost, distance).
#[derive(Clone, Copy, Debug)]
struct FrontierNode {
    point: Point,
    cost: f32,
    distance: f32,
}

impl PartialEq for FrontierNode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FrontierNode {}

impl PartialOrd for FrontierNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FrontierNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap
        label_cmp((other.cost, other.distance), (self.cost, self.distance))
    }
}

/// Lexicographic order on (cost, distance); ties in cost keep the shorter route.
fn label_cmp(a: (f32, f32), b: (f32, f32)) -> Ordering {
    a.0.partial_cmp(&b.0)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal))
}

#[derive(Clone, Debug)]
pub struct DistanceField {
    lambda_max: f32,
    pub cost_map: Tilemap<f32>,
    pub distance_map: Tilemap<f32>,
    /// Next cell towards the network; `None` on the network and where unreached
    pub path_map: Tilemap<Option<Point>>,
}

impl DistanceField {
    pub fn new(width: usize, length: usize, lambda_max: f32) -> Self {
        Self {
            lambda_max,
            cost_map: Tilemap::new_with(width, length, f32::INFINITY),
            distance_map: Tilemap::new_with(width, length, f32::INFINITY),
            path_map: Tilemap::new_with(width, length, None),
        }
    }

    pub fn reset(&mut self) {
        self.cost_map.fill(f32::INFINITY);
        self.distance_map.fill(f32::INFINITY);
        self.path_map.fill(None);
    }

    pub fn is_reached(&self, p: Point) -> bool {
        self.cost_map.get(p).is_some_and(|c| c.is_finite())
    }

    /// Turn `sources` into network cells and propagate the improvement.
    ///
    /// `on_change` sees every cell whose label changed, possibly more than once.
    pub fn relax_from(&mut self, sources: &[Point], model: &mut CostModel<'_>, mut on_change: impl FnMut(Point)) {
        let mut frontier = BinaryHeap::new();
        for &s in sources {
            if !self.cost_map.in_bounds(s) {
                continue;
            }
            if self.cost_map[s] == 0.0 && self.distance_map[s] == 0.0 {
                continue;
            }
            self.cost_map[s] = 0.0;
            self.distance_map[s] = 0.0;
            self.path_map[s] = None;
            on_change(s);
            frontier.push(FrontierNode { point: s, cost: 0.0, distance: 0.0 });
        }

        while let Some(FrontierNode { point, cost, distance }) = frontier.pop() {
            // Skip if we've found a better label for this node
            if label_cmp((cost, distance), (self.cost_map[point], self.distance_map[point])) == Ordering::Greater {
                continue;
            }

            for step in DIRECTIONS {
                let next = point + step;
                if !self.cost_map.in_bounds(next) {
                    continue;
                }
                let edge = model.road_build_cost(point, next);
                if !edge.is_finite() {
                    continue;
                }
                let new_cost = cost + edge;
                if new_cost > self.lambda_max {
                    continue;
                }
                let new_distance = distance + step_length(step);
                let current = (self.cost_map[next], self.distance_map[next]);
                if label_cmp((new_cost, new_distance), current) == Ordering::Less {
                    self.cost_map[next] = new_cost;
                    self.distance_map[next] = new_distance;
                    self.path_map[next] = Some(point);
                    on_change(next);
                    frontier.push(FrontierNode { point: next, cost: new_cost, distance: new_distance });
                }
            }
        }
    }

    /// Follow `path_map` from `from` to the network.
    ///
    /// Returns `None` when `from` is unreached or a step along the chain is no
    /// longer buildable (an obstacle appeared after the field was relaxed).
    pub fn trace(&self, from: Point, model: &mut CostModel<'_>) -> Option<Vec<Point>> {
        if !self.is_reached(from) {
            return None;
        }
        let mut path = vec![from];
        let mut current = from;
        while let Some(next) = self.path_map[current] {
            if !model.road_build_cost(current, next).is_finite() {
                return None;
            }
            path.push(next);
            current = next;
            // Labels strictly decrease along the chain, so this terminates
            debug_assert!(path.len() <= self.cost_map.values().len());
        }
        Some(path)
    }
}

/// Last epoch in which each cell's label changed.
///
/// Readers keep the epoch they last caught up to and ask for the cells
/// stamped after it. Memory stays one stamp per cell plus one box per epoch.
#[derive(Clone, Debug)]
pub struct ChangeLog {
    epoch: u32,
    stamps: Tilemap<u32>,
    /// Bounds of the cells stamped in each epoch; entry `e - 1` is epoch `e`
    touched: Vec<Option<BoundingBox>>,
}

impl ChangeLog {
    pub fn new(width: usize, length: usize) -> Self {
        Self {
            epoch: 0,
            stamps: Tilemap::new_with(width, length, 0),
            touched: Vec::new(),
        }
    }

    pub fn epoch(&self) -> u32 {
        self.epoch
    }

    /// Open a new epoch; later marks belong to it.
    pub fn begin(&mut self) {
        self.epoch += 1;
        self.touched.push(None);
    }

    pub fn mark(&mut self, p: Point) {
        let Some(stamp) = self.stamps.get_mut(p) else {
            return;
        };
        *stamp = self.epoch;
        let cell = BoundingBox::new(p, p);
        if let Some(slot) = self.touched.last_mut() {
            *slot = Some(slot.map_or(cell, |b| b.union(&cell)));
        }
    }

    /// Cells whose label changed after `epoch`, each once.
    pub fn changed_since(&self, epoch: u32) -> Vec<Point> {
        let area = self
            .touched
            .iter()
            .skip(epoch as usize)
            .flatten()
            .copied()
            .reduce(|a, b| a.union(&b));
        let Some(area) = area else {
            return Vec::new();
        };
        area.cells().filter(|p| self.stamps[*p] > epoch).collect()
    }
}
