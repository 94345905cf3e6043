//! K-means clustering with silhouette-based model selection

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use rayon::prelude::*;
use tracing::{debug, trace};

use crate::params::DistrictParams;

/// Clustering feature of one terrain sample: x, z and weighted height.
pub type Feature = [f32; 3];

#[derive(Clone, Debug)]
pub struct KMeansModel {
    pub centroids: Vec<Feature>,
    /// Cluster of each sample, parallel to the input slice
    pub labels: Vec<usize>,
    pub iterations: usize,
}

impl KMeansModel {
    pub fn k(&self) -> usize {
        self.centroids.len()
    }

    pub fn members(&self, cluster: usize) -> impl Iterator<Item = usize> + '_ {
        self.labels
            .iter()
            .enumerate()
            .filter(move |(_, l)| **l == cluster)
            .map(|(i, _)| i)
    }
}

pub fn squared_distance(a: &Feature, b: &Feature) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn nearest(centroids: &[Feature], f: &Feature) -> usize {
    centroids
        .iter()
        .enumerate()
        .map(|(i, c)| (i, squared_distance(c, f)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// k-means++ seeding: each new centroid is drawn with probability
/// proportional to its squared distance from the closest chosen one.
fn init_centroids<R: Rng>(samples: &[Feature], k: usize, rng: &mut R) -> Vec<Feature> {
    let mut centroids = vec![samples[rng.gen_range(0..samples.len())]];
    let mut closest: Vec<f32> = samples.iter().map(|s| squared_distance(s, &centroids[0])).collect();
    while centroids.len() < k {
        let Ok(dist) = WeightedIndex::new(&closest) else {
            // Every sample already sits on a centroid
            break;
        };
        let chosen = samples[dist.sample(rng)];
        for (d, s) in closest.iter_mut().zip(samples) {
            *d = d.min(squared_distance(s, &chosen));
        }
        centroids.push(chosen);
    }
    centroids
}

/// Lloyd's algorithm from a k-means++ start. Returns `None` when there are
/// fewer samples than clusters.
pub fn kmeans<R: Rng>(samples: &[Feature], k: usize, max_iterations: usize, rng: &mut R) -> Option<KMeansModel> {
    if k == 0 || samples.len() < k {
        return None;
    }
    let mut centroids = init_centroids(samples, k, rng);
    let mut labels = vec![usize::MAX; samples.len()];
    let mut iterations = 0;

    while iterations < max_iterations {
        iterations += 1;
        let assigned: Vec<usize> = samples.par_iter().map(|s| nearest(&centroids, s)).collect();
        let changed = assigned != labels;
        labels = assigned;
        if !changed {
            break;
        }

        let mut sums = vec![[0.0f32; 3]; centroids.len()];
        let mut counts = vec![0usize; centroids.len()];
        for (s, &l) in samples.iter().zip(&labels) {
            for (acc, v) in sums[l].iter_mut().zip(s) {
                *acc += v;
            }
            counts[l] += 1;
        }
        // Empty clusters keep their previous centroid
        for ((c, sum), n) in centroids.iter_mut().zip(&sums).zip(&counts) {
            if *n > 0 {
                *c = sum.map(|v| v / *n as f32);
            }
        }
    }
    trace!("k-means k={} converged after {} iterations", centroids.len(), iterations);
    Some(KMeansModel { centroids, labels, iterations })
}

/// Simplified silhouette: per sample `(b - a) / max(a, b)` with `a` the
/// distance to its own centroid and `b` to the closest other one.
pub fn silhouette(samples: &[Feature], model: &KMeansModel) -> f32 {
    if model.k() < 2 || samples.is_empty() {
        return 0.0;
    }
    let total: f32 = samples
        .par_iter()
        .zip(model.labels.par_iter())
        .map(|(s, &l)| {
            let a = squared_distance(s, &model.centroids[l]).sqrt();
            let b = model
                .centroids
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != l)
                .map(|(_, c)| squared_distance(s, c).sqrt())
                .fold(f32::INFINITY, f32::min);
            let m = a.max(b);
            if m > 0.0 { (b - a) / m } else { 0.0 }
        })
        .sum();
    total / samples.len() as f32
}

/// Search `k_min..=k_max` for the best silhouette, stopping early once the
/// score degrades by more than the configured fraction. A fixed k skips
/// the search.
pub fn select_model<R: Rng>(samples: &[Feature], params: &DistrictParams, rng: &mut R) -> Option<KMeansModel> {
    if let Some(k) = params.fixed_k {
        return kmeans(samples, k.min(samples.len()), params.max_iterations, rng);
    }

    let k_max = params.k_max.min(samples.len());
    let mut best: Option<(f32, KMeansModel)> = None;
    let mut previous: Option<f32> = None;
    for k in params.k_min..=k_max {
        let Some(model) = kmeans(samples, k, params.max_iterations, rng) else {
            break;
        };
        let score = silhouette(samples, &model);
        debug!("k={} silhouette {:.3}", k, score);

        if let Some(prev) = previous {
            if score < prev - prev.abs() * params.silhouette_degradation {
                if best.as_ref().map_or(true, |(s, _)| score > *s) {
                    best = Some((score, model));
                }
                break;
            }
        }
        if best.as_ref().map_or(true, |(s, _)| score > *s) {
            best = Some((score, model));
        }
        previous = Some(score);
    }
    match best {
        Some((_, model)) => Some(model),
        // Fewer samples than k_min: fall back to as many clusters as samples
        None => kmeans(samples, samples.len().min(params.k_min).max(1), params.max_iterations, rng),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn blobs() -> Vec<Feature> {
        let mut samples = Vec::new();
        for (cx, cz) in [(10.0, 10.0), (80.0, 15.0), (45.0, 80.0)] {
            for dx in -3..=3 {
                for dz in -3..=3 {
                    samples.push([cx + dx as f32, cz + dz as f32, 64.0]);
                }
            }
        }
        samples
    }

    #[test]
    fn test_separated_blobs_are_recovered() {
        let samples = blobs();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let model = kmeans(&samples, 3, 50, &mut rng).unwrap();
        // Every blob of 49 samples ends up in a single cluster
        for blob in samples.chunks(49).zip(model.labels.chunks(49)) {
            assert!(blob.1.iter().all(|l| *l == blob.1[0]));
        }
        assert!(silhouette(&samples, &model) > 0.8);
    }

    #[test]
    fn test_model_search_finds_three() {
        let samples = blobs();
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let params = DistrictParams { k_min: 2, k_max: 6, ..Default::default() };
        let model = select_model(&samples, &params, &mut rng).unwrap();
        assert_eq!(model.k(), 3);
    }

    #[test]
    fn test_fixed_k_and_tiny_inputs() {
        let samples = blobs();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let params = DistrictParams { fixed_k: Some(5), ..Default::default() };
        assert_eq!(select_model(&samples, &params, &mut rng).unwrap().k(), 5);

        assert!(kmeans(&samples[..2], 3, 10, &mut rng).is_none());
        let single = select_model(&samples[..1], &DistrictParams::default(), &mut rng).unwrap();
        assert_eq!(single.k(), 1);
    }
}
