//! PNG visualisation of a run

use std::path::{Path, PathBuf};

use image::{ImageBuffer, Rgb, RgbImage};

use crate::building::BuildingType;
use crate::districts::Districts;
use crate::error::GenerationError;
use crate::generator::GenerationReport;
use crate::geometry::Point;
use crate::interest::{InterestMap, INFEASIBLE};
use crate::parcels::Parcel;
use crate::roads::{RoadNetwork, MAX_ROAD_WIDTH};
use crate::terrain::Terrain;
use crate::tilemap::Tilemap;

/// Spectral colormap (matplotlib style): dark blue -> yellow -> dark red
fn spectral_colormap(t: f32) -> [u8; 3] {
    let colors: [[f32; 3]; 11] = [
        [0.37, 0.31, 0.64],
        [0.20, 0.53, 0.74],
        [0.40, 0.76, 0.65],
        [0.67, 0.87, 0.64],
        [0.90, 0.96, 0.60],
        [1.00, 1.00, 0.75],
        [1.00, 0.88, 0.55],
        [0.99, 0.68, 0.38],
        [0.96, 0.43, 0.26],
        [0.84, 0.24, 0.31],
        [0.62, 0.00, 0.26],
    ];
    let scaled = t.clamp(0.0, 1.0) * 10.0;
    let idx = (scaled as usize).min(9);
    let frac = scaled - idx as f32;
    let (c1, c2) = (colors[idx], colors[idx + 1]);
    [0, 1, 2].map(|i| ((c1[i] + (c2[i] - c1[i]) * frac) * 255.0) as u8)
}

fn building_color(building: BuildingType) -> [u8; 3] {
    match building {
        BuildingType::House => [196, 64, 52],
        BuildingType::Crop => [222, 196, 84],
        BuildingType::Windmill => [150, 90, 200],
        BuildingType::Ghost => [170, 170, 170],
        BuildingType::Structure => [60, 60, 160],
        BuildingType::Cave => [110, 80, 50],
    }
}

fn terrain_color(terrain: &Terrain, p: Point, min_h: i32, max_h: i32) -> [u8; 3] {
    if terrain.is_lava(p) {
        return [230, 90, 20];
    }
    if terrain.is_water(p) {
        return [50, 90, 190];
    }
    let h = terrain.height(p).unwrap_or(min_h);
    let t = (h - min_h) as f32 / (max_h - min_h).max(1) as f32;
    let shade = (90.0 + 110.0 * t) as u8;
    [shade / 2, shade, shade / 2]
}

fn render<T>(map: &Tilemap<T>, color: impl Fn(Point, &T) -> [u8; 3]) -> RgbImage {
    let mut img: RgbImage = ImageBuffer::new(map.width as u32, map.length as u32);
    for (p, v) in map.iter() {
        img.put_pixel(p.x as u32, p.z as u32, Rgb(color(p, v)));
    }
    img
}

/// Settlement layout: terrain, road surface shaded by width, parcels by type.
pub fn render_layout(terrain: &Terrain, roads: &RoadNetwork, parcels: &[Parcel]) -> RgbImage {
    let min_h = terrain.heights.values().iter().copied().min().unwrap_or(0);
    let max_h = terrain.heights.values().iter().copied().max().unwrap_or(0);
    let mut img = render(&terrain.heights, |p, _| {
        if roads.is_special(p) {
            [140, 100, 60]
        } else if roads.is_road(p) {
            let w = roads.width_at(p).min(MAX_ROAD_WIDTH) as u32;
            let v = (110 - 15 * w) as u8;
            [v, v, v]
        } else if roads.is_paved(p) {
            [125, 125, 125]
        } else {
            terrain_color(terrain, p, min_h, max_h)
        }
    });
    for parcel in parcels {
        let color = building_color(parcel.building_type);
        for p in parcel.cells() {
            if terrain.contains(p) {
                img.put_pixel(p.x as u32, p.z as u32, Rgb(color));
            }
        }
        if terrain.contains(parcel.entry) {
            img.put_pixel(parcel.entry.x as u32, parcel.entry.z as u32, Rgb([255, 255, 255]));
        }
    }
    img
}

pub fn render_density(districts: &Districts) -> RgbImage {
    render(&districts.density, |_, d| spectral_colormap(*d))
}

/// Interest of one building type; infeasible cells are black.
pub fn render_interest(map: &InterestMap, width: usize, length: usize) -> RgbImage {
    let values = Tilemap::from_fn(width, length, |p| map.interest_at(p));
    render(&values, |_, v| {
        if *v == INFEASIBLE {
            [0, 0, 0]
        } else {
            spectral_colormap((v + 1.0) / 2.0)
        }
    })
}

/// Write layout, density and house interest PNGs into `dir`.
pub fn export_report<P: AsRef<Path>>(
    report: &GenerationReport,
    terrain: &Terrain,
    dir: P,
) -> Result<Vec<PathBuf>, GenerationError> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;
    let images = [
        ("layout.png", render_layout(terrain, &report.roads, &report.parcels)),
        ("density.png", render_density(&report.districts)),
        (
            "interest_house.png",
            render_interest(report.interest.get(BuildingType::House), terrain.width(), terrain.length()),
        ),
    ];
    let mut written = Vec::with_capacity(images.len());
    for (name, img) in images {
        let path = dir.join(name);
        img.save(&path)?;
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::obstacle_map::ObstacleMap;
    use crate::params::RoadParams;
    use crate::parcels::ParcelId;
    use crate::terrain::synthetic;

    #[test]
    fn test_colormap_ends() {
        assert_eq!(spectral_colormap(0.0), [94, 79, 163]);
        assert_eq!(spectral_colormap(2.0), spectral_colormap(1.0));
    }

    #[test]
    fn test_layout_marks_roads_and_parcels() {
        let terrain = synthetic::flat(32, 32, 64);
        let mut obstacles = ObstacleMap::new(32, 32);
        let mut roads = RoadNetwork::new(&terrain, RoadParams::default());
        roads.create_road(&terrain, &mut obstacles, Point::new(0, 4), Point::new(31, 4));
        let parcel = Parcel::new(ParcelId(0), Point::new(16, 16), BuildingType::Crop, Point::new(16, 4), &mut obstacles, 1);

        let img = render_layout(&terrain, &roads, &[parcel]);
        assert_eq!(img.dimensions(), (32, 32));
        assert_eq!(img.get_pixel(16, 16).0, building_color(BuildingType::Crop));
        assert_eq!(img.get_pixel(16, 4).0, [255, 255, 255]);
        assert_ne!(img.get_pixel(5, 4).0, img.get_pixel(5, 25).0);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layout.png");
        img.save(&path).unwrap();
        assert!(path.exists());
    }
}
