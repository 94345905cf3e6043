use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::geometry::Point;

use super::Districts;

/// Proposes building sites scattered around the town centers, weighted by
/// town size and spread with a Gaussian of the town's own spread.
#[derive(Clone, Debug)]
pub struct DistrictSeeder {
    towns: Vec<(Point, f32, f32)>,
    width: i32,
    length: i32,
}

impl DistrictSeeder {
    pub fn new(districts: &Districts) -> Self {
        let towns = districts.towns().map(|d| (d.center, d.spread, d.size)).collect();
        Self {
            towns,
            width: districts.district_map.width as i32,
            length: districts.district_map.length as i32,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.towns.is_empty()
    }

    /// One candidate site, clamped to the area. `None` without towns.
    pub fn propose<R: Rng>(&self, rng: &mut R) -> Option<Point> {
        let total: f32 = self.towns.iter().map(|t| t.2).sum();
        if self.towns.is_empty() || total <= 0.0 {
            return None;
        }
        let mut pick = rng.gen_range(0.0..total);
        let &(center, spread, _) = self
            .towns
            .iter()
            .find(|t| {
                pick -= t.2;
                pick < 0.0
            })
            .or_else(|| self.towns.last())?;

        let normal = Normal::new(0.0f32, spread.max(1.0)).ok()?;
        let dx = normal.sample(rng).round() as i32;
        let dz = normal.sample(rng).round() as i32;
        Some(Point::new(
            (center.x + dx).clamp(0, self.width - 1),
            (center.z + dz).clamp(0, self.length - 1),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use crate::districts::District;
    use crate::tilemap::Tilemap;

    fn one_town(center: Point, spread: f32) -> Districts {
        Districts {
            districts: vec![
                District { id: 0, center, score: 1.0, size: 400.0, spread, is_town: true },
                District { id: 1, center: Point::new(90, 90), score: 0.2, size: 400.0, spread, is_town: false },
            ],
            district_map: Tilemap::new(100, 100),
            density: Tilemap::new(100, 100),
        }
    }

    #[test]
    fn test_proposals_cluster_around_town() {
        let seeder = DistrictSeeder::new(&one_town(Point::new(30, 30), 5.0));
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let proposals: Vec<Point> = (0..200).filter_map(|_| seeder.propose(&mut rng)).collect();
        assert_eq!(proposals.len(), 200);
        let near = proposals.iter().filter(|p| p.distance(Point::new(30, 30)) < 15.0).count();
        assert!(near > 190);
    }

    #[test]
    fn test_proposals_stay_in_bounds() {
        let seeder = DistrictSeeder::new(&one_town(Point::new(0, 99), 30.0));
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        for _ in 0..100 {
            let p = seeder.propose(&mut rng).unwrap();
            assert!((0..100).contains(&p.x) && (0..100).contains(&p.z));
        }
    }
}
