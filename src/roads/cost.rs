//! Road construction cost between adjacent cells
//!
//! The terrain-only part of an edge cost (slope, water, bridge) is pure and
//! cached per directed edge; obstacle and road-surface checks are live.

use crate::geometry::Point;
use crate::obstacle_map::ObstacleMap;
use crate::terrain::Terrain;
use crate::tilemap::Tilemap;

/// Cost of an impossible edge.
pub const INFINITE_COST: f32 = f32::INFINITY;

/// Roads keep at least this far from lava.
pub const LAVA_MARGIN: f32 = 3.0;
/// One-time cost of starting a bridge over water.
pub const BRIDGE_CREATION_COST: f32 = 12.0;
/// Per-cell multiplier while already on a bridge.
pub const BRIDGE_CONTINUATION_FACTOR: f32 = 3.0;
/// Cells within this distance of (but not in) water get a discount.
pub const NEAR_WATER_BAND: f32 = 4.0;
pub const NEAR_WATER_DISCOUNT: f32 = 0.85;
/// Weight of the squared along-track slope.
pub const STEEPNESS_FACTOR: f32 = 4.0;
/// Largest height change per unit of horizontal travel.
pub const MAX_SLOPE_RATIO: f32 = 1.0;

/// Offsets of the 8 neighbour directions, indexed by `direction_index`.
pub const DIRECTIONS: [Point; 8] = [
    Point::new(-1, 0),
    Point::new(1, 0),
    Point::new(0, -1),
    Point::new(0, 1),
    Point::new(-1, -1),
    Point::new(1, -1),
    Point::new(-1, 1),
    Point::new(1, 1),
];

pub fn direction_index(step: Point) -> Option<usize> {
    DIRECTIONS.iter().position(|d| *d == step)
}

/// Geometric length of a single step.
pub fn step_length(step: Point) -> f32 {
    if step.x != 0 && step.z != 0 {
        std::f32::consts::SQRT_2
    } else {
        1.0
    }
}

/// Lazily filled per-edge cache of the terrain part of the cost.
#[derive(Clone, Debug)]
pub struct CostCache {
    edges: Tilemap<[f32; 8]>,
}

impl CostCache {
    pub fn new(width: usize, length: usize) -> Self {
        Self {
            edges: Tilemap::new_with(width, length, [f32::NAN; 8]),
        }
    }

    fn terrain_cost(&mut self, terrain: &Terrain, src: Point, dst: Point) -> f32 {
        let Some(dir) = direction_index(dst - src) else {
            return INFINITE_COST;
        };
        match self.edges.get(src) {
            Some(costs) if !costs[dir].is_nan() => costs[dir],
            Some(_) => {
                let cost = terrain_edge_cost(terrain, src, dst);
                self.edges[src][dir] = cost;
                cost
            }
            None => INFINITE_COST,
        }
    }
}

/// The static part: Manhattan base, bridges, water-side discount, slope.
fn terrain_edge_cost(terrain: &Terrain, src: Point, dst: Point) -> f32 {
    let (Some(h_src), Some(h_dst)) = (terrain.height(src), terrain.height(dst)) else {
        return INFINITE_COST;
    };
    let step = dst - src;
    let length = step_length(step);
    let mut cost = step.manhattan(Point::ZERO) as f32;

    let src_water = terrain.is_water(src);
    let dst_water = terrain.is_water(dst);

    if dst_water {
        // Bridges stay level, so no slope term
        if src_water {
            return cost * BRIDGE_CONTINUATION_FACTOR;
        }
        return cost + BRIDGE_CREATION_COST;
    }

    let rise = if src_water { 0.0 } else { (h_dst - h_src) as f32 };
    if rise.abs() / length > MAX_SLOPE_RATIO {
        return INFINITE_COST;
    }

    let (gx, gz) = terrain.gradient[dst];
    let along = (gx * step.x as f32 + gz * step.z as f32) / length;
    cost += STEEPNESS_FACTOR * along * along;

    let water_distance = terrain.fluids.water_distance(dst);
    if water_distance > 0.0 && water_distance <= NEAR_WATER_BAND {
        cost *= NEAR_WATER_DISCOUNT;
    }
    cost
}

/// Everything the cost function reads, borrowed for the duration of a search.
pub struct CostModel<'a> {
    pub terrain: &'a Terrain,
    pub obstacles: &'a ObstacleMap,
    /// Cells paved by an existing road; obstacles there do not block roads
    pub surface: &'a Tilemap<bool>,
    pub cache: &'a mut CostCache,
}

impl CostModel<'_> {
    /// Cost of building the road step `src -> dst` (adjacent cells).
    pub fn road_build_cost(&mut self, src: Point, dst: Point) -> f32 {
        if !self.terrain.contains(dst) {
            return INFINITE_COST;
        }
        let paved = self.surface.get(dst).copied().unwrap_or(false);
        if !paved && !self.obstacles.is_accessible(dst) {
            return INFINITE_COST;
        }
        if self.terrain.fluids.lava_distance(dst) < LAVA_MARGIN {
            return INFINITE_COST;
        }
        self.cache.terrain_cost(self.terrain, src, dst)
    }

    /// Lower bound of the cost from `p` to `goal`, for A*.
    pub fn heuristic(&self, p: Point, goal: Point) -> f32 {
        p.manhattan(goal) as f32 * NEAR_WATER_DISCOUNT
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::BoundingBox;
    use crate::terrain::{synthetic, BuildArea, FluidKind};

    fn model_parts(terrain: &Terrain) -> (ObstacleMap, Tilemap<bool>, CostCache) {
        (
            ObstacleMap::new(terrain.width(), terrain.length()),
            Tilemap::new_with(terrain.width(), terrain.length(), false),
            CostCache::new(terrain.width(), terrain.length()),
        )
    }

    #[test]
    fn test_flat_costs_are_manhattan() {
        let terrain = synthetic::flat(8, 8, 64);
        let (obstacles, surface, mut cache) = model_parts(&terrain);
        let mut model = CostModel { terrain: &terrain, obstacles: &obstacles, surface: &surface, cache: &mut cache };
        assert_eq!(model.road_build_cost(Point::new(2, 2), Point::new(3, 2)), 1.0);
        assert_eq!(model.road_build_cost(Point::new(2, 2), Point::new(3, 3)), 2.0);
        assert_eq!(model.road_build_cost(Point::new(7, 7), Point::new(8, 7)), INFINITE_COST);
    }

    #[test]
    fn test_obstacles_block_unless_paved() {
        let terrain = synthetic::flat(8, 8, 64);
        let (mut obstacles, mut surface, mut cache) = model_parts(&terrain);
        obstacles.add_box(BoundingBox::new(Point::new(3, 0), Point::new(3, 7)));
        surface[Point::new(3, 5)] = true;
        let mut model = CostModel { terrain: &terrain, obstacles: &obstacles, surface: &surface, cache: &mut cache };
        assert_eq!(model.road_build_cost(Point::new(2, 2), Point::new(3, 2)), INFINITE_COST);
        assert_eq!(model.road_build_cost(Point::new(2, 5), Point::new(3, 5)), 1.0);
    }

    #[test]
    fn test_steep_step_is_rejected() {
        let heights = Tilemap::from_fn(6, 6, |p| if p.x >= 3 { 70 } else { 64 });
        let terrain = Terrain::new(BuildArea::new(Point::ZERO, 6, 6), heights, Tilemap::new(6, 6), Tilemap::new(6, 6)).unwrap();
        let (obstacles, surface, mut cache) = model_parts(&terrain);
        let mut model = CostModel { terrain: &terrain, obstacles: &obstacles, surface: &surface, cache: &mut cache };
        assert_eq!(model.road_build_cost(Point::new(2, 2), Point::new(3, 2)), INFINITE_COST);
        assert!(model.road_build_cost(Point::new(2, 2), Point::new(2, 3)).is_finite());
    }

    #[test]
    fn test_bridge_costs() {
        let kinds = Tilemap::from_fn(10, 4, |p| if (4..=6).contains(&p.x) { FluidKind::River } else { FluidKind::None });
        let terrain = Terrain::new(
            BuildArea::new(Point::ZERO, 10, 4),
            Tilemap::new_with(10, 4, 64),
            Tilemap::new(10, 4),
            kinds,
        )
        .unwrap();
        let (obstacles, surface, mut cache) = model_parts(&terrain);
        let mut model = CostModel { terrain: &terrain, obstacles: &obstacles, surface: &surface, cache: &mut cache };
        let enter = model.road_build_cost(Point::new(3, 1), Point::new(4, 1));
        let cross = model.road_build_cost(Point::new(4, 1), Point::new(5, 1));
        let bank = model.road_build_cost(Point::new(1, 1), Point::new(2, 1));
        assert_eq!(enter, 1.0 + BRIDGE_CREATION_COST);
        assert_eq!(cross, BRIDGE_CONTINUATION_FACTOR);
        assert!((bank - NEAR_WATER_DISCOUNT).abs() < 1e-6);
    }

    #[test]
    fn test_cache_is_consistent() {
        let terrain = synthetic::SyntheticTerrain { width: 32, length: 32, seed: 9, ..Default::default() }
            .generate()
            .unwrap();
        let (obstacles, surface, mut cache) = model_parts(&terrain);
        let mut model = CostModel { terrain: &terrain, obstacles: &obstacles, surface: &surface, cache: &mut cache };
        let first = model.road_build_cost(Point::new(10, 10), Point::new(11, 11));
        let second = model.road_build_cost(Point::new(10, 10), Point::new(11, 11));
        assert!(first == second || (first.is_infinite() && second.is_infinite()));
    }
}
