//! Fluid classification and distance fields
//!
//! Distances are chamfer distances (1 orthogonal, sqrt(2) diagonal) from the
//! nearest cell of a given fluid, computed once by multi-source Dijkstra.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use serde::{Deserialize, Serialize};

use crate::geometry::Point;
use crate::tilemap::Tilemap;

/// Distances saturate here; anything farther is "far enough not to matter".
pub const MAX_FLUID_DISTANCE: f32 = 128.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FluidKind {
    #[default]
    None,
    River,
    Ocean,
    Lava,
}

#[derive(Clone, Debug)]
pub struct FluidMap {
    pub kinds: Tilemap<FluidKind>,
    pub river_distance: Tilemap<f32>,
    pub ocean_distance: Tilemap<f32>,
    pub lava_distance: Tilemap<f32>,
}

impl FluidMap {
    pub fn from_kinds(kinds: Tilemap<FluidKind>) -> Self {
        let ((river_distance, ocean_distance), lava_distance) = rayon::join(
            || {
                rayon::join(
                    || distance_transform(&kinds, |k| k == FluidKind::River),
                    || distance_transform(&kinds, |k| k == FluidKind::Ocean),
                )
            },
            || distance_transform(&kinds, |k| k == FluidKind::Lava),
        );
        Self { kinds, river_distance, ocean_distance, lava_distance }
    }

    pub fn kind(&self, p: Point) -> FluidKind {
        self.kinds.get(p).copied().unwrap_or_default()
    }

    /// River or ocean.
    pub fn is_water(&self, p: Point) -> bool {
        matches!(self.kind(p), FluidKind::River | FluidKind::Ocean)
    }

    pub fn is_lava(&self, p: Point) -> bool {
        self.kind(p) == FluidKind::Lava
    }

    /// Distance to the nearest water cell of either kind.
    pub fn water_distance(&self, p: Point) -> f32 {
        match (self.river_distance.get(p), self.ocean_distance.get(p)) {
            (Some(r), Some(o)) => r.min(*o),
            _ => MAX_FLUID_DISTANCE,
        }
    }

    pub fn lava_distance(&self, p: Point) -> f32 {
        self.lava_distance.get(p).copied().unwrap_or(MAX_FLUID_DISTANCE)
    }
}

#[derive(Clone, Copy)]
struct Frontier {
    point: Point,
    distance: f32,
}

impl PartialEq for Frontier {
    fn eq(&self, other: &Self) -> bool {
        self.distance == other.distance
    }
}

impl Eq for Frontier {}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap
        other.distance.total_cmp(&self.distance)
    }
}

fn distance_transform(kinds: &Tilemap<FluidKind>, is_source: impl Fn(FluidKind) -> bool) -> Tilemap<f32> {
    let mut distance = Tilemap::new_with(kinds.width, kinds.length, MAX_FLUID_DISTANCE);
    let mut heap = BinaryHeap::new();

    for (p, kind) in kinds.iter() {
        if is_source(*kind) {
            distance[p] = 0.0;
            heap.push(Frontier { point: p, distance: 0.0 });
        }
    }

    while let Some(Frontier { point, distance: d }) = heap.pop() {
        if d > distance[point] {
            continue;
        }
        for n in kinds.neighbors8(point) {
            let step = if n.x != point.x && n.z != point.z { std::f32::consts::SQRT_2 } else { 1.0 };
            let nd = d + step;
            if nd < distance[n] && nd < MAX_FLUID_DISTANCE {
                distance[n] = nd;
                heap.push(Frontier { point: n, distance: nd });
            }
        }
    }

    distance
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_from_river_column() {
        let kinds = Tilemap::from_fn(10, 4, |p| if p.x == 0 { FluidKind::River } else { FluidKind::None });
        let fluids = FluidMap::from_kinds(kinds);
        assert_eq!(fluids.river_distance[Point::new(0, 2)], 0.0);
        assert!((fluids.river_distance[Point::new(4, 2)] - 4.0).abs() < 1e-5);
        assert_eq!(fluids.ocean_distance[Point::new(4, 2)], MAX_FLUID_DISTANCE);
        assert!((fluids.water_distance(Point::new(7, 0)) - 7.0).abs() < 1e-5);
        assert!(fluids.is_water(Point::new(0, 3)));
        assert!(!fluids.is_lava(Point::new(0, 3)));
    }

    #[test]
    fn test_diagonal_distance() {
        let kinds = Tilemap::from_fn(5, 5, |p| if p == Point::ZERO { FluidKind::Lava } else { FluidKind::None });
        let fluids = FluidMap::from_kinds(kinds);
        let d = fluids.lava_distance(Point::new(3, 3));
        assert!((d - 3.0 * std::f32::consts::SQRT_2).abs() < 1e-4);
    }
}
