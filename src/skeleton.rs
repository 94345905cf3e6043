//! Village skeleton: the growth loop
//!
//! A pool of building types is drawn up front. Each iteration takes the next
//! type, either retypes an existing parcel or seeds a new one, connects it to
//! the road network and turns any city block the new roads closed into lots.

use std::time::Instant;

use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::building::BuildingType;
use crate::context::GenerationContext;
use crate::districts::{DistrictSeeder, Districts};
use crate::error::GenerationError;
use crate::geometry::{BoundingBox, Point};
use crate::interest::{InterestMaps, INFEASIBLE};
use crate::params::GenerationParams;
use crate::parcels::{fill_block, Parcel, ParcelId, ParcelSet};
use crate::roads::CityBlock;

/// District proposals tried before falling back to the percentile search.
const SEEDER_ATTEMPTS: usize = 8;
/// Relative spread of the pool size around its expected value.
const POOL_JITTER: f64 = 0.2;

/// Counters of one growth run.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SkeletonStats {
    pub pool_size: usize,
    pub iterations: usize,
    pub placed: usize,
    pub retyped: usize,
    pub no_seed: usize,
    pub no_road: usize,
    /// Connected, but a cycle road was laid across the site
    pub sites_lost: usize,
    /// Placed, then taken over by the lots of a block closed in the same step
    pub absorbed: usize,
    pub blocks_filled: usize,
    pub lots: usize,
    pub out_of_time: bool,
}

/// What one iteration did with its building type.
#[derive(Clone, Copy, Debug, PartialEq)]
enum Step {
    Placed(ParcelId),
    Retyped(ParcelId),
    NoSeed,
    NoRoad,
    SiteLost,
    Absorbed(ParcelId),
}

/// What became of a new site once its roads and any blocks they closed are in.
fn settle(placed: Option<ParcelId>, parcels: &ParcelSet) -> Step {
    match placed {
        None => Step::SiteLost,
        Some(id) if parcels.get(id).is_none() => Step::Absorbed(id),
        Some(id) => Step::Placed(id),
    }
}

pub struct VillageSkeleton {
    pool: Vec<BuildingType>,
    parcels: ParcelSet,
    interest: InterestMaps,
    seeder: DistrictSeeder,
    processed_blocks: usize,
    stats: SkeletonStats,
}

/// Building pool for the buildable surface: its size scales with the
/// buildable area and the density knob, jittered and capped.
pub fn draw_pool<R: Rng>(buildable: usize, params: &GenerationParams, rng: &mut R) -> Vec<BuildingType> {
    let expected = buildable as f64 / params.skeleton.cells_per_building as f64 * params.building_density as f64;
    let jitter = rng.gen_range((1.0 - POOL_JITTER)..=(1.0 + POOL_JITTER));
    let size = ((expected * jitter).round() as usize).min(params.max_buildings);

    let weights: Vec<f32> = BuildingType::ALL.iter().map(|t| t.pool_weight()).collect();
    let Ok(dist) = WeightedIndex::new(&weights) else {
        return Vec::new();
    };
    (0..size).map(|_| BuildingType::ALL[dist.sample(rng)]).collect()
}

impl VillageSkeleton {
    pub fn new(ctx: &mut GenerationContext<'_>, districts: &Districts) -> Result<Self, GenerationError> {
        let terrain = ctx.terrain;
        let buildable = terrain.heights.bounds().cells().filter(|p| terrain.quality(*p) > 0.0).count();
        if buildable == 0 {
            return Err(GenerationError::NoBuildableTerrain);
        }
        let pool = draw_pool(buildable, &ctx.params, &mut ctx.rng);
        info!("building pool of {} for {} buildable cells", pool.len(), buildable);

        Ok(Self {
            stats: SkeletonStats { pool_size: pool.len(), ..Default::default() },
            pool,
            parcels: ParcelSet::new(),
            interest: InterestMaps::new(ctx.params.scenario, terrain, &ctx.roads),
            seeder: DistrictSeeder::new(districts),
            processed_blocks: ctx.roads.city_blocks().len(),
        })
    }

    pub fn parcels(&self) -> &ParcelSet {
        &self.parcels
    }

    pub fn interest(&self) -> &InterestMaps {
        &self.interest
    }

    pub fn stats(&self) -> &SkeletonStats {
        &self.stats
    }

    pub fn remaining(&self) -> usize {
        self.pool.len()
    }

    pub fn into_parts(self) -> (ParcelSet, InterestMaps, SkeletonStats) {
        (self.parcels, self.interest, self.stats)
    }

    /// Run until the pool is empty or `deadline` passes. The deadline is
    /// checked once per iteration.
    pub fn grow(&mut self, ctx: &mut GenerationContext<'_>, districts: &Districts, deadline: Instant) {
        let start = Instant::now();
        while let Some(building) = self.pool.pop() {
            if Instant::now() >= deadline {
                self.pool.push(building);
                self.stats.out_of_time = true;
                warn!("growth stopped by the time budget with {} buildings left", self.pool.len());
                break;
            }
            self.stats.iterations += 1;
            let step = self.step(ctx, districts, building);
            match step {
                Step::Placed(_) => self.stats.placed += 1,
                Step::Retyped(_) => self.stats.retyped += 1,
                Step::NoSeed => self.stats.no_seed += 1,
                Step::NoRoad => self.stats.no_road += 1,
                Step::SiteLost => self.stats.sites_lost += 1,
                Step::Absorbed(_) => self.stats.absorbed += 1,
            }
            debug!("iteration {}: {} -> {:?}", self.stats.iterations, building, step);
        }
        info!(
            "growth finished in {:.2?}: {} parcels ({} placed, {} retyped, {} lots), {} road cells",
            start.elapsed(),
            self.parcels.len(),
            self.stats.placed,
            self.stats.retyped,
            self.stats.lots,
            ctx.roads.road_cell_count()
        );
    }

    fn step(&mut self, ctx: &mut GenerationContext<'_>, districts: &Districts, building: BuildingType) -> Step {
        self.interest.update(self.parcels.as_slice(), &ctx.roads, &districts.density);

        if !self.parcels.is_empty() && ctx.rng.gen_bool(ctx.params.skeleton.reuse_probability.clamp(0.0, 1.0)) {
            if let Some(id) = self.try_retype(ctx, building) {
                return Step::Retyped(id);
            }
        }

        let Some(seed) = self.find_seed(ctx, building) else {
            return Step::NoSeed;
        };

        let (width, length) = building.initial_size();
        let margin = width.max(length) / 2 + ctx.params.parcels.obstacle_margin;
        let Some(connection) = ctx.roads.connect_to_network(ctx.terrain, &mut ctx.obstacles, seed, margin) else {
            warn!("{} at {} could not be connected to the road network", building, seed);
            return Step::NoRoad;
        };
        let Some(entry) = connection.entry else {
            return Step::NoRoad;
        };
        if !connection.cycles.is_empty() {
            debug!("connection of {} closed {} cycles", seed, connection.cycles.len());
        }

        // Cycle roads may have been laid across the site
        let placed = if ctx.obstacles.is_box_free(BoundingBox::centered(seed, width, length)) {
            let id = self.parcels.next_id();
            let parcel = Parcel::new(id, seed, building, entry, &mut ctx.obstacles, ctx.params.parcels.obstacle_margin);
            ctx.roads.register_entry(entry);
            self.parcels.push(parcel);
            Some(id)
        } else {
            None
        };

        self.fill_new_blocks(ctx);
        settle(placed, &self.parcels)
    }

    /// Mean interest of `building` over a parcel's footprint with the
    /// parcel itself left out; infeasible if any cell is.
    fn footprint_interest(&self, parcel: &Parcel, building: BuildingType) -> f32 {
        let map = self.interest.get(building);
        let cells = parcel.cells();
        let mut sum = 0.0;
        for p in &cells {
            let v = map.interest_excluding(*p, parcel);
            if v == INFEASIBLE {
                return INFEASIBLE;
            }
            sum += v;
        }
        sum / cells.len().max(1) as f32
    }

    /// Retype a sampled parcel to `building` when that raises its interest,
    /// accepting with probability equal to the gain.
    fn try_retype(&mut self, ctx: &mut GenerationContext<'_>, building: BuildingType) -> Option<ParcelId> {
        let candidates: Vec<ParcelId> = self
            .parcels
            .iter()
            .filter(|p| !p.is_lot() && p.building_type != building)
            .filter(|p| {
                let b = p.bounds();
                b.area() <= building.max_area() && b.width().max(b.length()) <= building.max_side()
            })
            .map(|p| p.id)
            .collect();
        let sample: Vec<ParcelId> = candidates
            .choose_multiple(&mut ctx.rng, ctx.params.skeleton.reuse_sample)
            .copied()
            .collect();

        let (best, gain) = sample
            .iter()
            .filter_map(|id| self.parcels.get(*id))
            .filter_map(|parcel| {
                let retyped = self.footprint_interest(parcel, building);
                let current = self.footprint_interest(parcel, parcel.building_type);
                (retyped > INFEASIBLE).then(|| (parcel.id, retyped - current))
            })
            .max_by(|a, b| a.1.total_cmp(&b.1))?;
        if gain <= 0.0 || !ctx.rng.gen_bool(gain.min(1.0) as f64) {
            return None;
        }

        let parcel = self.parcels.get_mut(best)?;
        let old = parcel.building_type;
        parcel.building_type = building;
        let parcel = parcel.clone();
        self.interest.notify_type_change(&parcel, old);
        debug!("parcel {} retyped from {} to {} (gain {:.3})", best, old, building, gain);
        Some(best)
    }

    /// A district proposal when one is good enough, otherwise a draw from
    /// the top of the interest map.
    fn find_seed(&self, ctx: &mut GenerationContext<'_>, building: BuildingType) -> Option<Point> {
        let map = self.interest.get(building);
        let (width, length) = building.initial_size();
        for _ in 0..SEEDER_ATTEMPTS {
            let Some(p) = self.seeder.propose(&mut ctx.rng) else {
                break;
            };
            let v = map.interest_at(p);
            if v > INFEASIBLE
                && ctx.obstacles.is_box_free(BoundingBox::centered(p, width, length))
                && ctx.rng.gen_bool(((v + 1.0) / 2.0).clamp(0.0, 1.0) as f64)
            {
                return Some(p);
            }
        }
        let skeleton = &ctx.params.skeleton;
        map.get_seed(skeleton.seed_percentile, &ctx.obstacles, skeleton, &mut ctx.rng)
    }

    /// Carve every city block closed since the last call.
    fn fill_new_blocks(&mut self, ctx: &mut GenerationContext<'_>) {
        let fresh: Vec<CityBlock> = ctx.roads.city_blocks()[self.processed_blocks..].to_vec();
        for (offset, block) in fresh.iter().enumerate() {
            let index = self.processed_blocks + offset;
            let lots = fill_block(
                index,
                block,
                &mut self.parcels,
                &mut self.interest,
                &mut ctx.roads,
                &mut ctx.obstacles,
                &ctx.params.parcels,
            );
            if !lots.is_empty() {
                self.stats.blocks_filled += 1;
                self.stats.lots += lots.len();
            }
        }
        self.processed_blocks += fresh.len();
    }
}
