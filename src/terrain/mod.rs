//! Terrain snapshot consumed by the generator
//!
//! Holds the build area frame, the height and biome rasters and the derived
//! fluid distance, gradient and steepness rasters. Everything here is
//! immutable once built.

pub mod fluids;
pub mod synthetic;

use serde::{Deserialize, Serialize};

use crate::error::GenerationError;
use crate::geometry::{Point, Position};
use crate::tilemap::Tilemap;

pub use fluids::{FluidKind, FluidMap};

/// Rectangle of the world the settlement is generated in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildArea {
    /// World coordinate of local `(0, 0)`
    pub origin: Point,
    pub width: usize,
    pub length: usize,
}

impl BuildArea {
    pub fn new(origin: Point, width: usize, length: usize) -> Self {
        Self { origin, width, length }
    }

    pub fn position(&self, local: Point) -> Position {
        Position::new(local, self.origin)
    }

    pub fn area(&self) -> usize {
        self.width * self.length
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Biome {
    #[default]
    Plains,
    Forest,
    Desert,
    Snowy,
    Swamp,
    Mountains,
    Beach,
    River,
    Ocean,
}

impl Biome {
    /// Multiplier on terrain quality.
    pub fn suitability(&self) -> f32 {
        match self {
            Biome::Plains => 1.0,
            Biome::Forest => 0.85,
            Biome::Beach => 0.7,
            Biome::Desert => 0.6,
            Biome::Snowy => 0.6,
            Biome::Swamp => 0.5,
            Biome::Mountains => 0.4,
            Biome::River | Biome::Ocean => 0.0,
        }
    }
}

/// Immutable terrain rasters for one generation run.
#[derive(Clone, Debug)]
pub struct Terrain {
    pub area: BuildArea,
    pub heights: Tilemap<i32>,
    pub biomes: Tilemap<Biome>,
    pub fluids: FluidMap,
    /// Central-difference height gradient `(dh/dx, dh/dz)`
    pub gradient: Tilemap<(f32, f32)>,
    /// Gradient magnitude
    pub steepness: Tilemap<f32>,
}

impl Terrain {
    /// Assemble a terrain from the raw rasters, deriving fluid distances,
    /// gradient and steepness.
    pub fn new(
        area: BuildArea,
        heights: Tilemap<i32>,
        biomes: Tilemap<Biome>,
        fluid_kinds: Tilemap<FluidKind>,
    ) -> Result<Self, GenerationError> {
        if area.width == 0 || area.length == 0 {
            return Err(GenerationError::EmptyBuildArea);
        }
        check_shape("heights", &area, &heights)?;
        check_shape("biomes", &area, &biomes)?;
        check_shape("fluids", &area, &fluid_kinds)?;

        let fluids = FluidMap::from_kinds(fluid_kinds);
        let gradient = compute_gradient(&heights);
        let steepness = gradient.map(|&(gx, gz)| (gx * gx + gz * gz).sqrt());

        Ok(Self { area, heights, biomes, fluids, gradient, steepness })
    }

    pub fn width(&self) -> usize {
        self.area.width
    }

    pub fn length(&self) -> usize {
        self.area.length
    }

    pub fn contains(&self, p: Point) -> bool {
        self.heights.in_bounds(p)
    }

    /// Surface height, or `None` outside the build area.
    pub fn height(&self, p: Point) -> Option<i32> {
        self.heights.get(p).copied()
    }

    pub fn is_water(&self, p: Point) -> bool {
        self.fluids.is_water(p)
    }

    pub fn is_lava(&self, p: Point) -> bool {
        self.fluids.is_lava(p)
    }

    /// Terrain suitability in `[0, 1]`: flat, dry, hospitable cells score high.
    pub fn quality(&self, p: Point) -> f32 {
        if !self.contains(p) || self.is_water(p) || self.is_lava(p) {
            return 0.0;
        }
        let biome = self.biomes[p].suitability();
        biome / (1.0 + self.steepness[p])
    }
}

fn check_shape<T>(raster: &'static str, area: &BuildArea, map: &Tilemap<T>) -> Result<(), GenerationError> {
    if map.width != area.width || map.length != area.length {
        return Err(GenerationError::ShapeMismatch {
            raster,
            expected: (area.width, area.length),
            found: (map.width, map.length),
        });
    }
    Ok(())
}

/// Central differences, one-sided at the edges.
fn compute_gradient(heights: &Tilemap<i32>) -> Tilemap<(f32, f32)> {
    let width = heights.width as i32;
    let length = heights.length as i32;
    Tilemap::par_from_fn(heights.width, heights.length, |p| {
        let h = |x: i32, z: i32| heights[Point::new(x.clamp(0, width - 1), z.clamp(0, length - 1))] as f32;
        let x0 = (p.x - 1).max(0);
        let x1 = (p.x + 1).min(width - 1);
        let z0 = (p.z - 1).max(0);
        let z1 = (p.z + 1).min(length - 1);
        let gx = if x1 > x0 { (h(x1, p.z) - h(x0, p.z)) / (x1 - x0) as f32 } else { 0.0 };
        let gz = if z1 > z0 { (h(p.x, z1) - h(p.x, z0)) / (z1 - z0) as f32 } else { 0.0 };
        (gx, gz)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(width: usize, length: usize) -> Terrain {
        Terrain::new(
            BuildArea::new(Point::ZERO, width, length),
            Tilemap::new_with(width, length, 64),
            Tilemap::new(width, length),
            Tilemap::new(width, length),
        )
        .unwrap()
    }

    #[test]
    fn test_shape_mismatch_is_rejected() {
        let result = Terrain::new(
            BuildArea::new(Point::ZERO, 8, 8),
            Tilemap::new_with(8, 7, 64),
            Tilemap::new(8, 8),
            Tilemap::new(8, 8),
        );
        assert!(matches!(result, Err(GenerationError::ShapeMismatch { raster: "heights", .. })));
    }

    #[test]
    fn test_flat_terrain_is_ideal() {
        let terrain = flat(6, 6);
        assert_eq!(terrain.steepness[Point::new(3, 3)], 0.0);
        assert!((terrain.quality(Point::new(3, 3)) - 1.0).abs() < 1e-6);
        assert_eq!(terrain.quality(Point::new(6, 0)), 0.0);
    }

    #[test]
    fn test_gradient_follows_slope() {
        let heights = Tilemap::from_fn(5, 5, |p| p.x * 2);
        let terrain = Terrain::new(
            BuildArea::new(Point::ZERO, 5, 5),
            heights,
            Tilemap::new(5, 5),
            Tilemap::new(5, 5),
        )
        .unwrap();
        let (gx, gz) = terrain.gradient[Point::new(2, 2)];
        assert!((gx - 2.0).abs() < 1e-6);
        assert_eq!(gz, 0.0);
        assert!(terrain.quality(Point::new(2, 2)) < 0.5);
    }
}
