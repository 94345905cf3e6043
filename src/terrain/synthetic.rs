//! Noise-based terrain for running the generator without a world snapshot

use noise::{NoiseFn, Perlin};

use crate::error::GenerationError;
use crate::geometry::Point;
use crate::tilemap::Tilemap;

use super::{Biome, BuildArea, FluidKind, Terrain};

/// Parameters for a synthetic terrain.
#[derive(Clone, Debug)]
pub struct SyntheticTerrain {
    pub width: usize,
    pub length: usize,
    pub seed: u64,
    pub sea_level: i32,
    /// Mean land height above sea level
    pub base_height: i32,
    /// Peak-to-mean height of the noise relief
    pub relief: f64,
    /// Noise feature size in cells
    pub feature_size: f64,
    /// Carve a meandering river across the area
    pub river: bool,
    /// Drop a small lava pool in one corner
    pub lava_pool: bool,
}

impl Default for SyntheticTerrain {
    fn default() -> Self {
        Self {
            width: 256,
            length: 256,
            seed: 0,
            sea_level: 62,
            base_height: 8,
            relief: 10.0,
            feature_size: 96.0,
            river: true,
            lava_pool: false,
        }
    }
}

impl SyntheticTerrain {
    pub fn generate(&self) -> Result<Terrain, GenerationError> {
        let perlin = Perlin::new(self.seed as u32);
        let detail = Perlin::new(self.seed.wrapping_add(0x5EED) as u32);
        let (width, length) = (self.width, self.length);

        let river_x = |z: i32| -> f64 {
            width as f64 * 0.4 + (z as f64 / 23.0).sin() * width as f64 * 0.08
        };

        let mut kinds = Tilemap::new_with(width, length, FluidKind::None);
        let heights = Tilemap::from_fn(width, length, |p| {
            let nx = p.x as f64 / self.feature_size;
            let nz = p.z as f64 / self.feature_size;
            let n = perlin.get([nx, nz]) + 0.35 * detail.get([nx * 3.0, nz * 3.0]);
            let mut h = self.sea_level as f64 + self.base_height as f64 + n * self.relief;

            if self.river {
                let d = (p.x as f64 - river_x(p.z)).abs();
                if d < 2.5 {
                    h = self.sea_level as f64;
                } else if d < 8.0 {
                    // Banks slope down to the river
                    let t = (d - 2.5) / 5.5;
                    h = self.sea_level as f64 + 1.0 + (h - self.sea_level as f64 - 1.0).max(0.0) * t;
                }
            }
            h.round() as i32
        });

        for (p, &h) in heights.iter() {
            let kind = if self.river && (p.x as f64 - river_x(p.z)).abs() < 2.5 {
                FluidKind::River
            } else if h < self.sea_level {
                FluidKind::Ocean
            } else {
                FluidKind::None
            };
            kinds[p] = kind;
        }

        if self.lava_pool {
            let center = Point::new((width as i32 * 7) / 8, (length as i32 * 7) / 8);
            let radius = (width.min(length) as f32 / 24.0).max(2.0);
            for (p, kind) in kinds.iter_mut() {
                if p.distance(center) <= radius {
                    *kind = FluidKind::Lava;
                }
            }
        }

        let biomes = Tilemap::from_fn(width, length, |p| {
            let h = heights[p];
            match kinds[p] {
                FluidKind::River => Biome::River,
                FluidKind::Ocean => Biome::Ocean,
                _ if h <= self.sea_level + 1 => Biome::Beach,
                _ if h > self.sea_level + self.base_height + (self.relief * 0.8) as i32 => Biome::Mountains,
                _ if detail.get([p.x as f64 / 40.0, p.z as f64 / 40.0]) > 0.25 => Biome::Forest,
                _ => Biome::Plains,
            }
        });

        Terrain::new(BuildArea::new(Point::ZERO, width, length), heights, biomes, kinds)
    }
}

/// Perfectly flat dry plains, handy for tests.
pub fn flat(width: usize, length: usize, height: i32) -> Terrain {
    Terrain {
        area: BuildArea::new(Point::ZERO, width, length),
        heights: Tilemap::new_with(width, length, height),
        biomes: Tilemap::new(width, length),
        fluids: super::FluidMap::from_kinds(Tilemap::new(width, length)),
        gradient: Tilemap::new_with(width, length, (0.0, 0.0)),
        steepness: Tilemap::new_with(width, length, 0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_is_deterministic() {
        let params = SyntheticTerrain { width: 64, length: 48, seed: 7, ..Default::default() };
        let a = params.generate().unwrap();
        let b = params.generate().unwrap();
        assert_eq!(a.heights, b.heights);
        assert_eq!((a.width(), a.length()), (64, 48));
    }

    #[test]
    fn test_river_is_carved() {
        let params = SyntheticTerrain { width: 64, length: 64, seed: 3, river: true, ..Default::default() };
        let terrain = params.generate().unwrap();
        let river_cells = terrain.fluids.kinds.values().iter().filter(|k| **k == FluidKind::River).count();
        assert!(river_cells >= 64 * 4);
        assert!(terrain.fluids.river_distance.values().iter().any(|d| *d > 5.0));
    }

    #[test]
    fn test_lava_pool() {
        let params = SyntheticTerrain { width: 96, length: 96, lava_pool: true, ..Default::default() };
        let terrain = params.generate().unwrap();
        assert!(terrain.is_lava(Point::new(84, 84)));
        assert!(terrain.fluids.lava_distance(Point::new(10, 10)) > 50.0);
    }

    #[test]
    fn test_flat_helper() {
        let terrain = flat(10, 10, 70);
        assert_eq!(terrain.height(Point::new(9, 9)), Some(70));
        assert!(!terrain.is_water(Point::new(0, 0)));
    }
}
