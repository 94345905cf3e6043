//! Parcel extension
//!
//! After growth every rectangular parcel grows one strip at a time, towards
//! its road first, then sideways, then away. The smallest parcel always
//! moves next, so small parcels get first claim on contested ground.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use tracing::debug;

use crate::geometry::Direction;
use crate::obstacle_map::ObstacleMap;
use crate::params::ParcelParams;

use super::Parcel;

/// Grow every parcel as far as it can. Returns the number of strips added.
pub fn extend_parcels(parcels: &mut [Parcel], obstacles: &mut ObstacleMap, params: &ParcelParams) -> usize {
    let mut queue: BinaryHeap<Reverse<(usize, usize)>> = parcels
        .iter()
        .enumerate()
        .filter(|(_, p)| !p.is_lot())
        .map(|(i, p)| Reverse((p.area(), i)))
        .collect();

    let mut grown = 0;
    while let Some(Reverse((_, index))) = queue.pop() {
        let parcel = &mut parcels[index];
        let towards_road = parcel.entry - parcel.center();
        let expanded = Direction::ordered_towards(towards_road)
            .into_iter()
            .any(|direction| parcel.try_expand(direction, obstacles, params));
        if expanded {
            grown += 1;
            queue.push(Reverse((parcel.area(), index)));
        }
    }
    debug!("parcel extension added {} strips to {} parcels", grown, parcels.len());
    grown
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::building::BuildingType;
    use crate::geometry::{BoundingBox, Point};
    use crate::parcels::ParcelId;

    #[test]
    fn test_growth_stops_at_type_limits() {
        let mut obstacles = ObstacleMap::new(60, 60);
        let params = ParcelParams::default();
        let mut parcels = vec![Parcel::new(
            ParcelId(0),
            Point::new(30, 30),
            BuildingType::House,
            Point::new(30, 20),
            &mut obstacles,
            1,
        )];
        extend_parcels(&mut parcels, &mut obstacles, &params);
        let bounds = parcels[0].bounds();
        assert!(bounds.area() <= BuildingType::House.max_area());
        assert!(bounds.area() > 25);
        // Grew towards the road first
        assert!(bounds.min.z < 28);
    }

    #[test]
    fn test_neighbours_never_overlap() {
        let mut obstacles = ObstacleMap::new(40, 20);
        let params = ParcelParams::default();
        let mut parcels = vec![
            Parcel::new(ParcelId(0), Point::new(10, 10), BuildingType::Ghost, Point::new(10, 2), &mut obstacles, 1),
            Parcel::new(ParcelId(1), Point::new(18, 10), BuildingType::Crop, Point::new(18, 2), &mut obstacles, 1),
        ];
        extend_parcels(&mut parcels, &mut obstacles, &params);
        let a = parcels[0].bounds();
        let b = parcels[1].bounds();
        assert!(!a.intersects(&b));
        assert!(!a.inflate(1).intersects(&b));
        // The smaller parcel moved first and kept its limits
        assert!(a.area() <= BuildingType::Ghost.max_area());
        for parcel in &parcels {
            for p in parcel.cells() {
                assert!(obstacles.counter(p) >= 1);
            }
        }
        assert!(BoundingBox::new(Point::ZERO, Point::new(39, 19)).contains(b.max));
    }
}
