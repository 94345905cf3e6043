//! Generation parameters and configuration
//!
//! Every knob of a run lives here. Parameters are fixed for the whole run;
//! they can be loaded from a JSON file where missing fields take defaults.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::GenerationError;
use crate::interest::Scenario;

/// Top-level parameters of a generation run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationParams {
    /// Master seed; subsystem seeds are derived from it
    pub seed: u64,
    /// Wall-clock budget of the growth loop, in seconds
    pub time_limit_secs: f64,
    /// Interest lookup table set
    pub scenario: Scenario,
    /// Multiplier on the number of buildings drawn into the pool
    pub building_density: f32,
    /// Hard cap on the building pool size
    pub max_buildings: usize,
    /// Emit per-iteration diagnostics
    pub debug: bool,
    /// Render PNG visualisations after the run
    pub visualize: bool,
    pub districts: DistrictParams,
    pub roads: RoadParams,
    pub parcels: ParcelParams,
    pub skeleton: SkeletonParams,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            seed: 0,
            time_limit_secs: 60.0,
            scenario: Scenario::default(),
            building_density: 1.0,
            max_buildings: 400,
            debug: false,
            visualize: false,
            districts: DistrictParams::default(),
            roads: RoadParams::default(),
            parcels: ParcelParams::default(),
            skeleton: SkeletonParams::default(),
        }
    }
}

/// District partitioning
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistrictParams {
    /// One terrain sample every `sample_step` cells along each axis
    pub sample_step: usize,
    pub k_min: usize,
    pub k_max: usize,
    /// Skip the model search and use this many clusters
    pub fixed_k: Option<usize>,
    /// Stop selecting towns once they cover this share of sampled area
    pub town_coverage: f32,
    /// Stop selecting towns scoring below this fraction of the best score
    pub min_score_ratio: f32,
    /// Stop the k search when silhouette drops by more than this fraction
    pub silhouette_degradation: f32,
    pub max_iterations: usize,
    /// Samples with lower terrain quality are not clustered
    pub min_quality: f32,
    /// Weight of height relative to horizontal position in cluster features
    pub height_weight: f32,
}

impl Default for DistrictParams {
    fn default() -> Self {
        Self {
            sample_step: 4,
            k_min: 2,
            k_max: 10,
            fixed_k: None,
            town_coverage: 0.7,
            min_score_ratio: 0.5,
            silhouette_degradation: 0.2,
            max_iterations: 50,
            min_quality: 0.2,
            height_weight: 1.0,
        }
    }
}

/// Road network construction
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoadParams {
    /// The incremental distance field is not relaxed beyond this construction cost
    pub lambda_max: f32,
    /// Cell size of the coarse routing grid
    pub coarse_step: usize,
    /// Wall-clock allotment of one fine A* search, in milliseconds
    pub astar_timeout_ms: u64,
    /// Searches give up beyond this path length
    pub max_distance: f32,
    /// Network nodes probed for cycles after each connection
    pub max_cycle_probes: usize,
    pub max_cycles_per_connection: usize,
    /// Dead-end stubs shorter than this are pruned after growth
    pub dead_end_max_length: usize,
}

impl Default for RoadParams {
    fn default() -> Self {
        Self {
            lambda_max: 64.0,
            coarse_step: 8,
            astar_timeout_ms: 250,
            max_distance: 1024.0,
            max_cycle_probes: 8,
            max_cycles_per_connection: 2,
            dead_end_max_length: 4,
        }
    }
}

/// Parcel extension, subdivision and heights
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParcelParams {
    /// Cells around a parcel that are also marked as obstacle
    pub obstacle_margin: i32,
    pub max_aspect_ratio: f32,
    /// Parcels with both sides at most this long ignore the aspect ratio
    pub small_side_exemption: i32,
    /// Building heights halve roughly every `height_falloff * ln 2` cells from a town center
    pub height_falloff: f32,
    /// City blocks larger than this are subdivided
    pub block_max_area: usize,
    /// City blocks smaller than this are left alone
    pub block_min_area: usize,
    /// Percentile band of terrain height a parcel's ground level is clipped to
    pub ground_percentiles: (f32, f32),
}

impl Default for ParcelParams {
    fn default() -> Self {
        Self {
            obstacle_margin: 1,
            max_aspect_ratio: 2.0,
            small_side_exemption: 5,
            height_falloff: 64.0,
            block_max_area: 400,
            block_min_area: 30,
            ground_percentiles: (25.0, 75.0),
        }
    }
}

/// Growth loop
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkeletonParams {
    /// Chance per iteration of trying to retype an existing parcel
    pub reuse_probability: f64,
    /// Existing parcels sampled per reuse attempt
    pub reuse_sample: usize,
    /// Interest percentile seeds are first drawn from
    pub seed_percentile: f32,
    /// Lowest percentile the relaxed seed search goes down to
    pub min_percentile: f32,
    /// Bernoulli trials per percentile level
    pub seed_attempts: usize,
    /// Buildable cells per building at density 1
    pub cells_per_building: f32,
}

impl Default for SkeletonParams {
    fn default() -> Self {
        Self {
            reuse_probability: 0.15,
            reuse_sample: 5,
            seed_percentile: 90.0,
            min_percentile: 50.0,
            seed_attempts: 64,
            cells_per_building: 180.0,
        }
    }
}

impl GenerationParams {
    /// Load from a JSON file; absent fields take their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, GenerationError> {
        let text = std::fs::read_to_string(path)?;
        let params: GenerationParams = serde_json::from_str(&text)?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), GenerationError> {
        let fail = |msg: &str| Err(GenerationError::InvalidParams(msg.to_string()));
        if !(self.time_limit_secs >= 0.0) {
            return fail("time_limit_secs must be non-negative");
        }
        if self.building_density < 0.0 {
            return fail("building_density must be non-negative");
        }
        let d = &self.districts;
        if d.sample_step == 0 {
            return fail("districts.sample_step must be positive");
        }
        if d.k_min == 0 || d.k_min > d.k_max {
            return fail("districts.k_min must be in 1..=k_max");
        }
        if d.fixed_k == Some(0) {
            return fail("districts.fixed_k must be positive");
        }
        if !(0.0..=1.0).contains(&d.town_coverage) {
            return fail("districts.town_coverage must be within [0, 1]");
        }
        let r = &self.roads;
        if r.coarse_step == 0 {
            return fail("roads.coarse_step must be positive");
        }
        if r.lambda_max <= 0.0 || r.max_distance <= 0.0 {
            return fail("roads.lambda_max and roads.max_distance must be positive");
        }
        let p = &self.parcels;
        if p.obstacle_margin < 0 {
            return fail("parcels.obstacle_margin must be non-negative");
        }
        if p.max_aspect_ratio < 1.0 {
            return fail("parcels.max_aspect_ratio must be at least 1");
        }
        if p.ground_percentiles.0 > p.ground_percentiles.1 {
            return fail("parcels.ground_percentiles must be ordered");
        }
        let s = &self.skeleton;
        if s.min_percentile > s.seed_percentile {
            return fail("skeleton.min_percentile must not exceed seed_percentile");
        }
        if s.cells_per_building <= 0.0 {
            return fail("skeleton.cells_per_building must be positive");
        }
        Ok(())
    }

    /// Seed for one subsystem, derived deterministically from the master seed.
    pub fn derive_seed(&self, system: &str) -> u64 {
        derive_seed(self.seed, system)
    }
}

/// Derive a sub-seed from a master seed and a system name.
pub fn derive_seed(master: u64, system: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    master.hash(&mut hasher);
    system.hash(&mut hasher);
    hasher.finish()
}
