//! Interest engine
//!
//! For every building type, a raster of desirability in `[-1, 1]` combining
//! three groups of factors:
//! - accessibility: distance to the road network through a balance curve
//! - sociability: attraction/repulsion towards already placed buildings
//! - fixed terrain interest: altitude, steepness, fluids, room to extend,
//!   and (once the first building exists) district density
//!
//! `-1` means infeasible and always wins over the weighted average. Maps are
//! updated incrementally: only parcels added since the last update and road
//! cells whose distance changed are re-evaluated.

pub mod accessibility;
pub mod curves;
pub mod fixed;
pub mod scenario;
pub mod sociability;

use std::collections::HashMap;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, trace};

use crate::building::BuildingType;
use crate::geometry::{BoundingBox, Point};
use crate::obstacle_map::ObstacleMap;
use crate::params::SkeletonParams;
use crate::parcels::{Parcel, ParcelId};
use crate::roads::RoadNetwork;
use crate::terrain::Terrain;
use crate::tilemap::Tilemap;

pub use accessibility::Accessibility;
pub use curves::{attraction_repulsion, balance, CurveParams, INFEASIBLE, MIN_FEASIBLE};
pub use fixed::TerrainFactors;
pub use scenario::{FixedProfile, InterestWeights, Scenario};
pub use sociability::Sociability;

/// Step by which the seed percentile is relaxed after a failed round.
const PERCENTILE_RELAX_STEP: f32 = 10.0;

/// Weighted average of the three interest groups; any infeasible group makes
/// the whole cell infeasible.
pub fn combine(accessibility: f32, sociability: f32, fixed: f32, weights: &InterestWeights) -> f32 {
    if accessibility == INFEASIBLE || sociability == INFEASIBLE || fixed == INFEASIBLE {
        return INFEASIBLE;
    }
    let total = weights.accessibility + weights.sociability + weights.fixed;
    if total <= 0.0 {
        return 0.0;
    }
    let sum = weights.accessibility * accessibility + weights.sociability * sociability + weights.fixed * fixed;
    (sum / total).clamp(MIN_FEASIBLE, 1.0)
}

/// Interest of one building type.
#[derive(Clone, Debug)]
pub struct InterestMap {
    building: BuildingType,
    weights: InterestWeights,
    profile: FixedProfile,
    accessibility: Accessibility,
    sociability: Sociability,
    fixed: Tilemap<f32>,
    fixed_weight: f32,
    density_folded: bool,
    /// Position and type each known parcel was registered with
    known: HashMap<ParcelId, (Point, BuildingType)>,
    last_parcel: Option<ParcelId>,
}

impl InterestMap {
    pub fn new(
        building: BuildingType,
        scenario: Scenario,
        terrain: &Terrain,
        factors: &TerrainFactors,
        roads: &RoadNetwork,
    ) -> Self {
        let profile = scenario.fixed_profile(building);
        let (fixed, fixed_weight) = fixed::compute_fixed_interest(terrain, factors, &profile, building.max_side());
        Self {
            building,
            weights: scenario.weights(building),
            profile,
            accessibility: Accessibility::new(scenario.accessibility(building), roads),
            sociability: Sociability::new(terrain.width(), terrain.length(), building, scenario),
            fixed,
            fixed_weight,
            density_folded: false,
            known: HashMap::new(),
            last_parcel: None,
        }
    }

    pub fn building_type(&self) -> BuildingType {
        self.building
    }

    /// Bring the map up to date with the parcel list and the road network.
    ///
    /// `parcels` must be ordered by id. Only parcels newer than the last
    /// update are applied, so calling this twice in a row is a no-op.
    pub fn update(&mut self, parcels: &[Parcel], roads: &RoadNetwork, density: &Tilemap<f32>) {
        self.accessibility.update(roads);

        if !self.density_folded && !parcels.is_empty() {
            self.fold_density(density);
        }

        let last = self.last_parcel;
        let fresh: Vec<&Parcel> = parcels.iter().rev().take_while(|p| Some(p.id) > last).collect();
        for parcel in fresh.iter().rev() {
            let center = parcel.center();
            self.sociability.apply(center, parcel.building_type, 1);
            self.known.insert(parcel.id, (center, parcel.building_type));
            self.last_parcel = Some(parcel.id);
        }
        if !fresh.is_empty() {
            trace!("{} interest absorbed {} new parcels", self.building, fresh.len());
        }
    }

    /// Patch sociability after `parcel` changed type from `old_type`.
    pub fn notify_type_change(&mut self, parcel: &Parcel, old_type: BuildingType) {
        if let Some((center, registered)) = self.known.get_mut(&parcel.id) {
            debug_assert_eq!(*registered, old_type);
            self.sociability.apply(*center, old_type, -1);
            self.sociability.apply(*center, parcel.building_type, 1);
            *registered = parcel.building_type;
        }
    }

    /// Retract the influence of a parcel that no longer exists.
    pub fn notify_removal(&mut self, parcel: &Parcel) {
        if let Some((center, registered)) = self.known.remove(&parcel.id) {
            self.sociability.apply(center, registered, -1);
        }
    }

    fn fold_density(&mut self, density: &Tilemap<f32>) {
        let wd = self.profile.weights.density;
        let w = self.fixed_weight;
        if wd > 0.0 && density.same_shape(&self.fixed) {
            let preference = self.profile.density_preference;
            for (p, value) in self.fixed.iter_mut() {
                if *value == INFEASIBLE {
                    continue;
                }
                let d = fixed::density_factor(density[p], preference);
                *value = ((*value * w + d * wd) / (w + wd)).clamp(MIN_FEASIBLE, 1.0);
            }
            self.fixed_weight = w + wd;
        }
        self.density_folded = true;
        debug!("{} interest folded district density", self.building);
    }

    pub fn accessibility_at(&self, p: Point) -> f32 {
        self.accessibility.at(p)
    }

    pub fn sociability_at(&self, p: Point) -> f32 {
        self.sociability.at(p)
    }

    pub fn fixed_at(&self, p: Point) -> f32 {
        self.fixed[p]
    }

    /// Overall interest at a cell, ignoring obstacles.
    pub fn interest_at(&self, p: Point) -> f32 {
        combine(self.accessibility_at(p), self.sociability_at(p), self.fixed_at(p), &self.weights)
    }

    /// Interest at a cell of `parcel` as if `parcel` itself were not placed.
    pub fn interest_excluding(&self, p: Point, parcel: &Parcel) -> f32 {
        let sociability = match self.known.get(&parcel.id) {
            Some((center, registered)) => self.sociability.at_excluding(p, *center, *registered),
            None => self.sociability_at(p),
        };
        combine(self.accessibility_at(p), sociability, self.fixed_at(p), &self.weights)
    }

    /// Full interest raster; blocked cells are infeasible.
    pub fn compute(&self, obstacles: &ObstacleMap) -> Tilemap<f32> {
        Tilemap::par_from_fn(self.fixed.width, self.fixed.length, |p| {
            if obstacles.is_accessible(p) {
                self.interest_at(p)
            } else {
                INFEASIBLE
            }
        })
    }

    /// Draw a seed among the cells whose interest is at or above `percentile`,
    /// accepting candidates with probability proportional to their interest.
    /// The percentile is relaxed step by step down to `params.min_percentile`.
    pub fn get_seed<R: Rng>(
        &self,
        percentile: f32,
        obstacles: &ObstacleMap,
        params: &SkeletonParams,
        rng: &mut R,
    ) -> Option<Point> {
        let interest = self.compute(obstacles);
        let (width, length) = self.building.initial_size();
        let floor = params.min_percentile.min(percentile);
        let mut level = percentile;

        loop {
            let threshold = interest.percentile_where(level, |v| v > INFEASIBLE)?;
            let mut candidates: Vec<(Point, f32)> = interest
                .iter()
                .filter(|(_, v)| **v > INFEASIBLE && **v >= threshold)
                .map(|(p, v)| (p, *v))
                .collect();
            candidates.shuffle(rng);

            for (p, v) in candidates.into_iter().take(params.seed_attempts) {
                let acceptance = ((v + 1.0) / 2.0).clamp(0.0, 1.0) as f64;
                if rng.gen_bool(acceptance) && obstacles.is_box_free(BoundingBox::centered(p, width, length)) {
                    return Some(p);
                }
            }

            if level <= floor {
                return None;
            }
            level = (level - PERCENTILE_RELAX_STEP).max(floor);
        }
    }
}

/// Interest maps of every building type.
#[derive(Clone, Debug)]
pub struct InterestMaps {
    maps: Vec<InterestMap>,
}

impl InterestMaps {
    pub fn new(scenario: Scenario, terrain: &Terrain, roads: &RoadNetwork) -> Self {
        let factors = TerrainFactors::new(terrain);
        let maps = BuildingType::ALL
            .iter()
            .map(|&t| InterestMap::new(t, scenario, terrain, &factors, roads))
            .collect();
        Self { maps }
    }

    pub fn get(&self, building: BuildingType) -> &InterestMap {
        &self.maps[building.index()]
    }

    pub fn update(&mut self, parcels: &[Parcel], roads: &RoadNetwork, density: &Tilemap<f32>) {
        for map in &mut self.maps {
            map.update(parcels, roads, density);
        }
    }

    pub fn notify_type_change(&mut self, parcel: &Parcel, old_type: BuildingType) {
        for map in &mut self.maps {
            map.notify_type_change(parcel, old_type);
        }
    }

    pub fn notify_removal(&mut self, parcel: &Parcel) {
        for map in &mut self.maps {
            map.notify_removal(parcel);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use crate::params::RoadParams;
    use crate::terrain::synthetic;

    #[test]
    fn test_sentinel_propagates_for_any_weights() {
        let weight_sets = [
            InterestWeights { accessibility: 1.0, sociability: 1.0, fixed: 1.0 },
            InterestWeights { accessibility: 0.0, sociability: 0.0, fixed: 5.0 },
            InterestWeights { accessibility: 100.0, sociability: 0.01, fixed: 0.0 },
            InterestWeights { accessibility: 0.0, sociability: 0.0, fixed: 0.0 },
        ];
        for w in &weight_sets {
            assert_eq!(combine(INFEASIBLE, 1.0, 1.0, w), INFEASIBLE);
            assert_eq!(combine(1.0, INFEASIBLE, 1.0, w), INFEASIBLE);
            assert_eq!(combine(1.0, 1.0, INFEASIBLE, w), INFEASIBLE);
            assert!(combine(MIN_FEASIBLE, MIN_FEASIBLE, MIN_FEASIBLE, w) > INFEASIBLE);
        }
    }

    #[test]
    fn test_weighted_average() {
        let w = InterestWeights { accessibility: 1.0, sociability: 1.0, fixed: 2.0 };
        assert!((combine(1.0, 0.0, 0.5, &w) - 0.5).abs() < 1e-6);
    }

    fn setup() -> (crate::terrain::Terrain, RoadNetwork, ObstacleMap) {
        let terrain = synthetic::flat(48, 48, 64);
        let mut obstacles = ObstacleMap::new(48, 48);
        let mut roads = RoadNetwork::new(&terrain, RoadParams::default());
        let path = roads.create_road(&terrain, &mut obstacles, Point::new(2, 24), Point::new(45, 24));
        assert!(!path.is_empty());
        (terrain, roads, obstacles)
    }

    #[test]
    fn test_update_is_incremental_and_idempotent() {
        let (terrain, roads, mut obstacles) = setup();
        let factors = TerrainFactors::new(&terrain);
        let mut map = InterestMap::new(BuildingType::House, Scenario::Balanced, &terrain, &factors, &roads);
        let density = Tilemap::new_with(48, 48, 0.5f32);

        let parcel = Parcel::new(ParcelId(0), Point::new(20, 30), BuildingType::House, Point::new(20, 24), &mut obstacles, 1);
        let parcels = vec![parcel];
        map.update(&parcels, &roads, &density);
        let once = map.sociability_at(Point::new(28, 30));
        map.update(&parcels, &roads, &density);
        assert_eq!(map.sociability_at(Point::new(28, 30)), once);
        assert_eq!(map.sociability_at(Point::new(21, 30)), INFEASIBLE);
        assert_eq!(map.interest_at(Point::new(21, 30)), INFEASIBLE);
    }

    #[test]
    fn test_type_change_matches_fresh_registration() {
        let (terrain, roads, mut obstacles) = setup();
        let factors = TerrainFactors::new(&terrain);
        let density = Tilemap::new_with(48, 48, 0.5f32);

        let mut parcel = Parcel::new(ParcelId(0), Point::new(20, 30), BuildingType::House, Point::new(20, 24), &mut obstacles, 1);
        let mut patched = InterestMap::new(BuildingType::Crop, Scenario::Balanced, &terrain, &factors, &roads);
        patched.update(std::slice::from_ref(&parcel), &roads, &density);
        parcel.building_type = BuildingType::Windmill;
        patched.notify_type_change(&parcel, BuildingType::House);

        let mut fresh = InterestMap::new(BuildingType::Crop, Scenario::Balanced, &terrain, &factors, &roads);
        fresh.update(std::slice::from_ref(&parcel), &roads, &density);

        for p in [Point::new(26, 30), Point::new(20, 38), Point::new(10, 40)] {
            assert!((patched.sociability_at(p) - fresh.sociability_at(p)).abs() < 1e-5);
        }
    }

    #[test]
    fn test_accessibility_follows_roads() {
        let (terrain, roads, _) = setup();
        let factors = TerrainFactors::new(&terrain);
        let map = InterestMap::new(BuildingType::House, Scenario::Balanced, &terrain, &factors, &roads);
        assert_eq!(map.accessibility_at(Point::new(20, 24)), INFEASIBLE);
        assert!(map.accessibility_at(Point::new(20, 28)) > 0.9);
        assert_eq!(map.accessibility_at(Point::new(20, 47)), INFEASIBLE);
    }

    #[test]
    fn test_seed_lands_on_free_ground() {
        let (terrain, roads, obstacles) = setup();
        let factors = TerrainFactors::new(&terrain);
        let map = InterestMap::new(BuildingType::House, Scenario::Balanced, &terrain, &factors, &roads);
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let seed = map.get_seed(90.0, &obstacles, &SkeletonParams::default(), &mut rng).unwrap();
        assert!(map.interest_at(seed) > INFEASIBLE);
        assert!(obstacles.is_box_free(BoundingBox::centered(seed, 5, 5)));
    }

    #[test]
    fn test_no_seed_without_roads() {
        let terrain = synthetic::flat(32, 32, 64);
        let roads = RoadNetwork::new(&terrain, RoadParams::default());
        let obstacles = ObstacleMap::new(32, 32);
        let factors = TerrainFactors::new(&terrain);
        let map = InterestMap::new(BuildingType::House, Scenario::Balanced, &terrain, &factors, &roads);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(map.get_seed(90.0, &obstacles, &SkeletonParams::default(), &mut rng).is_none());
    }
}
