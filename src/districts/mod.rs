//! District partitioning
//!
//! Terrain samples are clustered on position and height; the best clusters
//! become towns. Every cell then gets a district by 3-nearest-sample vote
//! and a density that falls off from its district's center.

pub mod kmeans;
pub mod seeder;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::GenerationError;
use crate::geometry::Point;
use crate::params::DistrictParams;
use crate::terrain::Terrain;
use crate::tilemap::Tilemap;

pub use kmeans::{Feature, KMeansModel};
pub use seeder::DistrictSeeder;

/// Neighbours consulted by the district classifier.
const KNN_K: usize = 3;
/// Density multiplier of districts that were not selected as towns.
const RURAL_DENSITY: f32 = 0.5;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct District {
    pub id: usize,
    pub center: Point,
    /// Mean terrain quality of the members
    pub score: f32,
    /// Approximate area in cells
    pub size: f32,
    /// RMS horizontal distance of the members from the center
    pub spread: f32,
    pub is_town: bool,
}

#[derive(Clone, Debug)]
pub struct Districts {
    pub districts: Vec<District>,
    pub district_map: Tilemap<usize>,
    pub density: Tilemap<f32>,
}

impl Districts {
    pub fn towns(&self) -> impl Iterator<Item = &District> {
        self.districts.iter().filter(|d| d.is_town)
    }

    pub fn town_centers(&self) -> Vec<Point> {
        self.towns().map(|d| d.center).collect()
    }

    pub fn district_at(&self, p: Point) -> Option<&District> {
        self.district_map.get(p).and_then(|id| self.districts.get(*id))
    }

    pub fn density_at(&self, p: Point) -> f32 {
        self.density.get(p).copied().unwrap_or(0.0)
    }
}

struct Sample {
    cell: Point,
    feature: Feature,
    quality: f32,
}

fn feature(terrain: &Terrain, p: Point, height_weight: f32) -> Feature {
    let h = terrain.height(p).unwrap_or(0) as f32;
    [p.x as f32, p.z as f32, h * height_weight]
}

fn sample_terrain(terrain: &Terrain, params: &DistrictParams) -> Vec<Sample> {
    let step = params.sample_step.max(1);
    let mut samples = Vec::new();
    for z in (0..terrain.length()).step_by(step) {
        for x in (0..terrain.width()).step_by(step) {
            let cell = Point::new(x as i32, z as i32);
            let quality = terrain.quality(cell);
            if quality >= params.min_quality {
                samples.push(Sample { cell, feature: feature(terrain, cell, params.height_weight), quality });
            }
        }
    }
    samples
}

/// Partition the terrain into districts and pick the towns.
pub fn partition<R: Rng>(terrain: &Terrain, params: &DistrictParams, rng: &mut R) -> Result<Districts, GenerationError> {
    let samples = sample_terrain(terrain, params);
    if samples.is_empty() {
        return Err(GenerationError::NoBuildableTerrain);
    }
    let features: Vec<Feature> = samples.iter().map(|s| s.feature).collect();
    let model = kmeans::select_model(&features, params, rng).ok_or(GenerationError::NoBuildableTerrain)?;

    let cell_area = (params.sample_step * params.sample_step) as f32;
    let mut districts: Vec<District> = (0..model.k())
        .filter_map(|cluster| describe_cluster(cluster, &samples, &model, cell_area, params.sample_step))
        .collect();
    // Clusters left empty by Lloyd iterations are dropped; keep labels dense
    let mut relabel = vec![usize::MAX; model.k()];
    for (i, d) in districts.iter_mut().enumerate() {
        relabel[d.id] = i;
        d.id = i;
    }
    let labels: Vec<usize> = model.labels.iter().map(|l| relabel[*l]).collect();

    select_towns(&mut districts, samples.len() as f32 * cell_area, params);

    let district_map = classify(terrain, &samples, &labels, params);
    let density = Tilemap::par_from_fn(terrain.width(), terrain.length(), |p| {
        let d = &districts[district_map[p]];
        let falloff = gaussian(p.distance(d.center), d.spread);
        if d.is_town { falloff } else { RURAL_DENSITY * falloff }
    });

    info!(
        "{} districts from {} samples, {} towns at {:?}",
        districts.len(),
        samples.len(),
        districts.iter().filter(|d| d.is_town).count(),
        districts.iter().filter(|d| d.is_town).map(|d| d.center).collect::<Vec<_>>()
    );
    Ok(Districts { districts, district_map, density })
}

fn describe_cluster(
    cluster: usize,
    samples: &[Sample],
    model: &KMeansModel,
    cell_area: f32,
    step: usize,
) -> Option<District> {
    let members: Vec<&Sample> = model.members(cluster).map(|i| &samples[i]).collect();
    if members.is_empty() {
        return None;
    }
    let centroid = model.centroids[cluster];
    // Center on a real sampled cell, the one nearest the centroid
    let center = members
        .iter()
        .min_by(|a, b| {
            kmeans::squared_distance(&a.feature, &centroid).total_cmp(&kmeans::squared_distance(&b.feature, &centroid))
        })?
        .cell;
    let n = members.len() as f32;
    let score = members.iter().map(|s| s.quality).sum::<f32>() / n;
    let spread = (members.iter().map(|s| s.cell.distance(center).powi(2)).sum::<f32>() / n)
        .sqrt()
        .max(step as f32);
    Some(District { id: cluster, center, score, size: n * cell_area, spread, is_town: false })
}

/// Mark towns by descending score until they cover `town_coverage` of the
/// sampled area or the score drops below `min_score_ratio` of the best.
fn select_towns(districts: &mut [District], sampled_area: f32, params: &DistrictParams) {
    let mut order: Vec<usize> = (0..districts.len()).collect();
    order.sort_by(|a, b| districts[*b].score.total_cmp(&districts[*a].score).then(a.cmp(b)));
    let Some(best) = order.first().map(|i| districts[*i].score) else {
        return;
    };
    let mut covered = 0.0;
    for i in order {
        let d = &mut districts[i];
        if d.score < params.min_score_ratio * best {
            break;
        }
        d.is_town = true;
        covered += d.size;
        if covered >= params.town_coverage * sampled_area {
            break;
        }
    }
}

/// District of every cell by majority of its 3 nearest samples in feature
/// space, ties going to the nearest. Samples are bucketed on the sampling
/// grid so the search only visits nearby rings.
fn classify(terrain: &Terrain, samples: &[Sample], labels: &[usize], params: &DistrictParams) -> Tilemap<usize> {
    let step = params.sample_step.max(1) as i32;
    let grid_w = (terrain.width() as i32 + step - 1) / step;
    let grid_l = (terrain.length() as i32 + step - 1) / step;
    let mut buckets: Tilemap<Vec<usize>> = Tilemap::new(grid_w as usize, grid_l as usize);
    for (i, s) in samples.iter().enumerate() {
        buckets[Point::new(s.cell.x / step, s.cell.z / step)].push(i);
    }
    let max_ring = grid_w.max(grid_l);

    Tilemap::par_from_fn(terrain.width(), terrain.length(), |p| {
        let f = feature(terrain, p, params.height_weight);
        let home = Point::new(p.x / step, p.z / step);
        let mut nearest: Vec<(f32, usize)> = Vec::with_capacity(KNN_K + 8);
        for ring in 0..=max_ring {
            for b in ring_cells(home, ring) {
                if let Some(bucket) = buckets.get(b) {
                    nearest.extend(bucket.iter().map(|&i| (kmeans::squared_distance(&samples[i].feature, &f), i)));
                }
            }
            nearest.sort_by(|a, b| a.0.total_cmp(&b.0));
            nearest.truncate(KNN_K);
            // Unvisited rings are farther than `ring * step` horizontally
            let bound = (ring * step) as f32;
            if nearest.len() == KNN_K && nearest[KNN_K - 1].0 <= bound * bound {
                break;
            }
        }
        vote(&nearest, labels)
    })
}

fn ring_cells(center: Point, ring: i32) -> Vec<Point> {
    if ring == 0 {
        return vec![center];
    }
    let mut cells = Vec::with_capacity(8 * ring as usize);
    for d in -ring..=ring {
        cells.push(center + Point::new(d, -ring));
        cells.push(center + Point::new(d, ring));
    }
    for d in (-ring + 1)..ring {
        cells.push(center + Point::new(-ring, d));
        cells.push(center + Point::new(ring, d));
    }
    cells
}

fn vote(nearest: &[(f32, usize)], labels: &[usize]) -> usize {
    let mut counts: Vec<(usize, usize, usize)> = Vec::new(); // (label, votes, rank of first vote)
    for (rank, (_, i)) in nearest.iter().enumerate() {
        let label = labels[*i];
        match counts.iter_mut().find(|c| c.0 == label) {
            Some(c) => c.1 += 1,
            None => counts.push((label, 1, rank)),
        }
    }
    counts
        .iter()
        .max_by(|a, b| a.1.cmp(&b.1).then(b.2.cmp(&a.2)))
        .map(|c| c.0)
        .unwrap_or(0)
}

fn gaussian(d: f32, sigma: f32) -> f32 {
    (-(d * d) / (2.0 * sigma * sigma)).exp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use crate::terrain::synthetic;

    #[test]
    fn test_flat_terrain_partition() {
        let terrain = synthetic::flat(64, 64, 64);
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let params = DistrictParams { fixed_k: Some(4), ..Default::default() };
        let districts = partition(&terrain, &params, &mut rng).unwrap();
        assert_eq!(districts.districts.len(), 4);
        assert!(districts.towns().count() >= 1);
        // Every cell belongs to a known district and has a density
        for (p, id) in districts.district_map.iter() {
            assert!(*id < districts.districts.len());
            let density = districts.density_at(p);
            assert!((0.0..=1.0).contains(&density));
        }
        for d in &districts.districts {
            assert_eq!(districts.district_map[d.center], d.id);
            assert!(districts.density_at(d.center) >= RURAL_DENSITY);
        }
    }

    #[test]
    fn test_town_selection_stops_on_score() {
        let mut districts: Vec<District> = [(1.0, 100.0), (0.9, 100.0), (0.3, 100.0)]
            .iter()
            .enumerate()
            .map(|(id, (score, size))| District {
                id,
                center: Point::ZERO,
                score: *score,
                size: *size,
                spread: 4.0,
                is_town: false,
            })
            .collect();
        select_towns(&mut districts, 1000.0, &DistrictParams::default());
        assert_eq!(districts.iter().map(|d| d.is_town).collect::<Vec<_>>(), vec![true, true, false]);

        for d in districts.iter_mut() {
            d.is_town = false;
        }
        select_towns(&mut districts, 120.0, &DistrictParams::default());
        assert_eq!(districts.iter().map(|d| d.is_town).collect::<Vec<_>>(), vec![true, false, false]);
    }

    #[test]
    fn test_majority_vote_breaks_ties_by_distance() {
        let labels = [7, 2, 2, 7];
        assert_eq!(vote(&[(1.0, 0), (2.0, 1), (3.0, 2)], &labels), 2);
        assert_eq!(vote(&[(1.0, 0), (2.0, 1), (3.0, 3)], &labels), 7);
        assert_eq!(vote(&[(1.0, 1), (2.0, 0)], &labels), 2);
    }

    #[test]
    fn test_water_only_terrain_has_no_districts() {
        let terrain = synthetic::SyntheticTerrain {
            width: 24,
            length: 24,
            sea_level: 200,
            base_height: -100,
            relief: 1.0,
            river: false,
            lava_pool: false,
            ..Default::default()
        }
        .generate()
        .unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        assert!(matches!(
            partition(&terrain, &DistrictParams::default(), &mut rng),
            Err(GenerationError::NoBuildableTerrain)
        ));
    }
}
