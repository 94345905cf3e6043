//! Ground level and building height of parcels

use crate::geometry::Point;
use crate::params::ParcelParams;
use crate::terrain::Terrain;

use super::Parcel;

/// Value at `pct` (0-100) of an already sorted slice, nearest rank.
fn percentile(sorted: &[i32], pct: f32) -> Option<i32> {
    if sorted.is_empty() {
        return None;
    }
    let rank = ((pct.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f32).round() as usize;
    sorted.get(rank).copied()
}

/// Ground level: the entry road's height clipped to the parcel's own
/// height percentile band.
pub fn ground_level(parcel: &Parcel, terrain: &Terrain, params: &ParcelParams) -> Option<i32> {
    let mut heights: Vec<i32> = parcel.cells().into_iter().filter_map(|p| terrain.height(p)).collect();
    heights.sort_unstable();
    let (lo_pct, hi_pct) = params.ground_percentiles;
    let lo = percentile(&heights, lo_pct)?;
    let hi = percentile(&heights, hi_pct)?.max(lo);
    let road = terrain.height(parcel.entry).unwrap_or((lo + hi) / 2);
    Some(road.clamp(lo, hi))
}

/// Building height, tallest at a town center and falling off exponentially.
pub fn building_height(parcel: &Parcel, town_centers: &[Point], params: &ParcelParams) -> u32 {
    let max_height = parcel.building_type.max_height();
    if max_height == 0 {
        return 0;
    }
    let center = parcel.center();
    let distance = town_centers
        .iter()
        .map(|c| c.distance(center))
        .fold(f32::INFINITY, f32::min);
    let scale = if distance.is_finite() && params.height_falloff > 0.0 {
        (-distance / params.height_falloff).exp()
    } else {
        1.0
    };
    ((max_height as f32 * scale).round() as u32).max(1)
}

pub fn assign_heights(parcels: &mut [Parcel], terrain: &Terrain, town_centers: &[Point], params: &ParcelParams) {
    for parcel in parcels.iter_mut() {
        parcel.ground_level = ground_level(parcel, terrain, params);
        parcel.building_height = Some(building_height(parcel, town_centers, params));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::building::BuildingType;
    use crate::obstacle_map::ObstacleMap;
    use crate::parcels::ParcelId;
    use crate::terrain::BuildArea;
    use crate::tilemap::Tilemap;

    fn ramp() -> Terrain {
        let heights = Tilemap::from_fn(40, 40, |p| 60 + p.x / 2);
        Terrain::new(BuildArea::new(Point::ZERO, 40, 40), heights, Tilemap::new(40, 40), Tilemap::new(40, 40)).unwrap()
    }

    #[test]
    fn test_ground_clipped_to_band() {
        let terrain = ramp();
        let mut obstacles = ObstacleMap::new(40, 40);
        let params = ParcelParams::default();
        // Parcel spans x 18..=22 (heights 69..=71); road far west at height 60
        let parcel = Parcel::new(ParcelId(0), Point::new(20, 20), BuildingType::House, Point::new(0, 20), &mut obstacles, 1);
        assert_eq!(ground_level(&parcel, &terrain, &params), Some(69));
        let parcel = Parcel::new(ParcelId(1), Point::new(20, 30), BuildingType::House, Point::new(20, 36), &mut obstacles, 1);
        assert_eq!(ground_level(&parcel, &terrain, &params), Some(70));
    }

    #[test]
    fn test_height_falls_off_from_town_center() {
        let mut obstacles = ObstacleMap::new(200, 200);
        let params = ParcelParams::default();
        let centers = [Point::new(10, 10)];
        let near = Parcel::new(ParcelId(0), Point::new(10, 10), BuildingType::House, Point::ZERO, &mut obstacles, 1);
        let far = Parcel::new(ParcelId(1), Point::new(150, 150), BuildingType::House, Point::ZERO, &mut obstacles, 1);
        assert_eq!(building_height(&near, &centers, &params), BuildingType::House.max_height());
        assert!(building_height(&far, &centers, &params) < building_height(&near, &centers, &params));
        assert!(building_height(&far, &centers, &params) >= 1);

        let ghost = Parcel::new(ParcelId(2), Point::new(50, 50), BuildingType::Ghost, Point::ZERO, &mut obstacles, 1);
        assert_eq!(building_height(&ghost, &centers, &params), 0);
    }
}
