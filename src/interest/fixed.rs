//! Fixed terrain interest
//!
//! Factors that depend only on the terrain (altitude band, steepness, river
//! and ocean proximity, lava safety, room to extend). Computed once per
//! building type on the rayon pool; they never change during growth.

use crate::geometry::{BoundingBox, Point};
use crate::terrain::Terrain;
use crate::tilemap::Tilemap;

use super::curves::{INFEASIBLE, MIN_FEASIBLE};
use super::scenario::FixedProfile;

/// Nothing is built closer than this to lava.
pub const LAVA_SAFETY_DISTANCE: f32 = 6.0;

/// Cells steeper than this never count as room to extend into.
const EXTENDABLE_STEEPNESS: f32 = 1.5;

/// Terrain-derived rasters shared by all building types.
pub struct TerrainFactors {
    /// Height relative to the dry-land height range, in `[0, 1]`
    pub relative_altitude: Tilemap<f32>,
    /// Summed-area table of extendable cells, `(width + 1) * (length + 1)`
    extendable_sums: Vec<u32>,
    width: usize,
    length: usize,
}

impl TerrainFactors {
    pub fn new(terrain: &Terrain) -> Self {
        let (lo, hi) = terrain
            .heights
            .iter()
            .filter(|(p, _)| !terrain.is_water(*p) && !terrain.is_lava(*p))
            .fold((i32::MAX, i32::MIN), |(lo, hi), (_, &h)| (lo.min(h), hi.max(h)));
        let range = if hi > lo { (hi - lo) as f32 } else { 1.0 };
        let relative_altitude = terrain
            .heights
            .map(|&h| if lo == i32::MAX { 0.0 } else { ((h - lo) as f32 / range).clamp(0.0, 1.0) });

        let width = terrain.width();
        let length = terrain.length();
        let mut extendable_sums = vec![0u32; (width + 1) * (length + 1)];
        for z in 0..length {
            let mut row = 0u32;
            for x in 0..width {
                let p = Point::new(x as i32, z as i32);
                if is_extendable(terrain, p) {
                    row += 1;
                }
                extendable_sums[(z + 1) * (width + 1) + x + 1] = extendable_sums[z * (width + 1) + x + 1] + row;
            }
        }

        Self { relative_altitude, extendable_sums, width, length }
    }

    /// Share of extendable cells in `bounds`; cells outside the area count as not extendable.
    pub fn extendable_fraction(&self, bounds: BoundingBox) -> f32 {
        let total = bounds.area().max(1) as f32;
        let x0 = bounds.min.x.clamp(0, self.width as i32) as usize;
        let z0 = bounds.min.z.clamp(0, self.length as i32) as usize;
        let x1 = (bounds.max.x + 1).clamp(0, self.width as i32) as usize;
        let z1 = (bounds.max.z + 1).clamp(0, self.length as i32) as usize;
        if x1 <= x0 || z1 <= z0 {
            return 0.0;
        }
        let stride = self.width + 1;
        let s = |x: usize, z: usize| self.extendable_sums[z * stride + x] as i64;
        let count = s(x1, z1) - s(x0, z1) - s(x1, z0) + s(x0, z0);
        count as f32 / total
    }
}

fn is_extendable(terrain: &Terrain, p: Point) -> bool {
    !terrain.is_water(p) && !terrain.is_lava(p) && terrain.steepness[p] <= EXTENDABLE_STEEPNESS
}

/// Fixed interest of one building type and the total weight of its factors.
pub fn compute_fixed_interest(
    terrain: &Terrain,
    factors: &TerrainFactors,
    profile: &FixedProfile,
    max_side: i32,
) -> (Tilemap<f32>, f32) {
    let w = profile.weights;
    let total_weight = w.altitude + w.steepness + w.river + w.ocean + w.extendability;

    let values = Tilemap::par_from_fn(terrain.width(), terrain.length(), |p| {
        fixed_interest_at(terrain, factors, profile, max_side, total_weight, p)
    });
    (values, total_weight)
}

fn fixed_interest_at(
    terrain: &Terrain,
    factors: &TerrainFactors,
    profile: &FixedProfile,
    max_side: i32,
    total_weight: f32,
    p: Point,
) -> f32 {
    if terrain.is_water(p) || terrain.is_lava(p) || terrain.fluids.lava_distance(p) < LAVA_SAFETY_DISTANCE {
        return INFEASIBLE;
    }

    let altitude = profile.altitude_band.balance(factors.relative_altitude[p]);

    let s = terrain.steepness[p];
    let steepness = if s > profile.max_steepness {
        INFEASIBLE
    } else if profile.prefers_slope {
        (2.0 * (s / profile.max_steepness).min(1.0) - 1.0).max(MIN_FEASIBLE)
    } else {
        (1.0 - 2.0 * s / profile.max_steepness).max(MIN_FEASIBLE)
    };

    let river = profile.river.attraction_repulsion(terrain.fluids.river_distance[p]);
    let ocean = profile.ocean.attraction_repulsion(terrain.fluids.ocean_distance[p]);

    let reach = max_side / 2;
    let room = BoundingBox::new(p - Point::new(reach, reach), p + Point::new(reach, reach));
    let extendability = (2.0 * factors.extendable_fraction(room) - 1.0).max(MIN_FEASIBLE);

    let parts = [altitude, steepness, river, ocean, extendability];
    if parts.iter().any(|v| *v == INFEASIBLE) {
        return INFEASIBLE;
    }
    if total_weight <= 0.0 {
        return 0.0;
    }
    let w = profile.weights;
    let sum = w.altitude * altitude
        + w.steepness * steepness
        + w.river * river
        + w.ocean * ocean
        + w.extendability * extendability;
    (sum / total_weight).clamp(MIN_FEASIBLE, 1.0)
}

/// Density factor: `preference` 1 wants the densest districts, -1 the emptiest.
pub fn density_factor(density: f32, preference: f32) -> f32 {
    (preference * (2.0 * density.clamp(0.0, 1.0) - 1.0)).clamp(MIN_FEASIBLE, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::building::BuildingType;
    use crate::interest::Scenario;
    use crate::terrain::synthetic;

    #[test]
    fn test_extendable_fraction_near_edge() {
        let terrain = synthetic::flat(20, 20, 64);
        let factors = TerrainFactors::new(&terrain);
        let inner = BoundingBox::new(Point::new(5, 5), Point::new(9, 9));
        assert!((factors.extendable_fraction(inner) - 1.0).abs() < 1e-6);
        let corner = BoundingBox::new(Point::new(-5, -5), Point::new(4, 4));
        assert!((factors.extendable_fraction(corner) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_flat_dry_land_is_feasible() {
        let terrain = synthetic::flat(30, 30, 64);
        let factors = TerrainFactors::new(&terrain);
        let profile = Scenario::Balanced.fixed_profile(BuildingType::House);
        let (values, weight) = compute_fixed_interest(&terrain, &factors, &profile, BuildingType::House.max_side());
        assert!(weight > 0.0);
        assert!(values[Point::new(15, 15)] > -1.0);
        // Corners have less room to extend than the middle
        assert!(values[Point::new(0, 0)] < values[Point::new(15, 15)]);
    }

    #[test]
    fn test_lava_is_vetoed() {
        let terrain = crate::terrain::synthetic::SyntheticTerrain {
            width: 96,
            length: 96,
            river: false,
            lava_pool: true,
            relief: 0.0,
            ..Default::default()
        }
        .generate()
        .unwrap();
        let factors = TerrainFactors::new(&terrain);
        let profile = Scenario::Balanced.fixed_profile(BuildingType::Ghost);
        let (values, _) = compute_fixed_interest(&terrain, &factors, &profile, BuildingType::Ghost.max_side());
        assert_eq!(values[Point::new(84, 84)], INFEASIBLE);
        assert_eq!(values[Point::new(84, 78)], INFEASIBLE);
    }

    #[test]
    fn test_density_factor_preference() {
        assert!(density_factor(0.9, 1.0) > 0.5);
        assert!(density_factor(0.9, -1.0) < -0.5);
        assert_eq!(density_factor(0.5, 1.0), 0.0);
    }
}
