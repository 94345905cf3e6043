//! City block subdivision
//!
//! A block closed by a road cycle is cut into lots by recursive median
//! splits across its longer side. Every lot of a block gets the same
//! building type, the one most of its cells prefer.

use std::collections::HashSet;

use tracing::debug;

use crate::building::BuildingType;
use crate::geometry::{BoundingBox, Point};
use crate::interest::{InterestMaps, INFEASIBLE};
use crate::obstacle_map::ObstacleMap;
use crate::params::ParcelParams;
use crate::roads::{CityBlock, RoadNetwork};

use super::{Parcel, ParcelId, ParcelSet};

/// Lots smaller than this are left empty.
pub const MIN_LOT_CELLS: usize = 4;
/// How far from a lot its entry road may be.
const ENTRY_SEARCH_RADIUS: i32 = 24;

/// Split `cells` into groups of at most `max_area` cells.
pub fn subdivide_block(cells: &[Point], max_area: usize) -> Vec<Vec<Point>> {
    let mut lots = Vec::new();
    split(cells.to_vec(), max_area.max(1), &mut lots);
    lots
}

fn split(mut cells: Vec<Point>, max_area: usize, lots: &mut Vec<Vec<Point>>) {
    let Some(bounds) = BoundingBox::from_points(cells.iter().copied()) else {
        return;
    };
    if cells.len() <= max_area {
        lots.push(cells);
        return;
    }
    // Cut across the longer side, through the median cell
    if bounds.width() >= bounds.length() {
        cells.sort_by_key(|p| (p.x, p.z));
    } else {
        cells.sort_by_key(|p| (p.z, p.x));
    }
    let mid = cells.len() / 2;
    let cut = if bounds.width() >= bounds.length() { cells[mid].x } else { cells[mid].z };
    let (left, right): (Vec<Point>, Vec<Point>) = cells
        .iter()
        .partition(|p| if bounds.width() >= bounds.length() { p.x < cut } else { p.z < cut });
    if left.is_empty() || right.is_empty() {
        // A single row or column of cells; cut it by count instead
        let right = cells.split_off(mid);
        split(cells, max_area, lots);
        split(right, max_area, lots);
        return;
    }
    split(left, max_area, lots);
    split(right, max_area, lots);
}

/// The block-filling type most cells of `cells` find most interesting.
pub fn majority_type(cells: &[Point], interest: &InterestMaps) -> BuildingType {
    let candidates: Vec<BuildingType> = BuildingType::ALL.into_iter().filter(|t| t.fills_blocks()).collect();
    let mut votes = vec![0usize; candidates.len()];
    for &p in cells {
        let best = candidates
            .iter()
            .enumerate()
            .map(|(i, t)| (i, interest.get(*t).interest_at(p)))
            .filter(|(_, v)| *v > INFEASIBLE)
            .max_by(|a, b| a.1.total_cmp(&b.1).then(b.0.cmp(&a.0)));
        if let Some((i, _)) = best {
            votes[i] += 1;
        }
    }
    votes
        .iter()
        .enumerate()
        .filter(|(_, v)| **v > 0)
        .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(&a.0)))
        .map(|(i, _)| candidates[i])
        .unwrap_or(BuildingType::Ghost)
}

/// Carve `block` into lots. Parcels lying entirely inside the block are
/// superseded by the lots. Returns the ids of the new lots.
#[allow(clippy::too_many_arguments)]
pub fn fill_block(
    block_index: usize,
    block: &CityBlock,
    parcels: &mut ParcelSet,
    interest: &mut InterestMaps,
    roads: &mut RoadNetwork,
    obstacles: &mut ObstacleMap,
    params: &ParcelParams,
) -> Vec<ParcelId> {
    let inside: HashSet<Point> = block.cells.iter().copied().collect();
    let superseded: Vec<ParcelId> = parcels
        .iter()
        .filter(|p| !p.is_lot() && p.cells().iter().all(|c| inside.contains(c)))
        .map(|p| p.id)
        .collect();
    let free = block.cells.iter().filter(|p| obstacles.is_accessible(**p)).count();
    let reclaimable: usize = superseded.iter().filter_map(|id| parcels.get(*id)).map(|p| p.area()).sum();
    if free + reclaimable < params.block_min_area {
        return Vec::new();
    }

    for id in &superseded {
        if let Some(parcel) = parcels.remove(*id, obstacles) {
            roads.unregister_entry(parcel.entry);
            interest.notify_removal(&parcel);
        }
    }

    let cells: Vec<Point> = block.cells.iter().copied().filter(|p| obstacles.is_accessible(*p)).collect();
    let building_type = majority_type(&cells, interest);
    let lot_area = if cells.len() <= params.block_max_area {
        cells.len()
    } else {
        building_type.max_area() as usize
    };

    let mut created = Vec::new();
    for lot in subdivide_block(&cells, lot_area) {
        if lot.len() < MIN_LOT_CELLS {
            continue;
        }
        let Some(bounds) = BoundingBox::from_points(lot.iter().copied()) else {
            continue;
        };
        let Some(entry) = roads.nearest_road_cell(bounds.center(), ENTRY_SEARCH_RADIUS) else {
            continue;
        };
        let id = parcels.next_id();
        if let Some(mut parcel) = Parcel::from_cells(id, &lot, building_type, entry, obstacles) {
            parcel.block = Some(block_index);
            roads.register_entry(entry);
            parcels.push(parcel);
            created.push(id);
        }
    }
    debug!(
        "block {} ({} cells) became {} {} lots, superseding {} parcels",
        block_index,
        block.area(),
        created.len(),
        building_type,
        superseded.len()
    );
    created
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(w: i32, l: i32) -> Vec<Point> {
        BoundingBox::new(Point::ZERO, Point::new(w - 1, l - 1)).cells().collect()
    }

    #[test]
    fn test_small_block_stays_whole() {
        let lots = subdivide_block(&rect(5, 5), 30);
        assert_eq!(lots.len(), 1);
        assert_eq!(lots[0].len(), 25);
    }

    #[test]
    fn test_lots_partition_the_block() {
        let cells = rect(20, 12);
        let lots = subdivide_block(&cells, 40);
        assert!(lots.iter().all(|l| l.len() <= 40 && !l.is_empty()));
        let total: usize = lots.iter().map(|l| l.len()).sum();
        assert_eq!(total, cells.len());
        let unique: HashSet<Point> = lots.iter().flatten().copied().collect();
        assert_eq!(unique.len(), cells.len());
    }

    #[test]
    fn test_single_row_is_cut_by_count() {
        let lots = subdivide_block(&rect(10, 1), 3);
        assert!(lots.iter().all(|l| l.len() <= 3));
        assert_eq!(lots.iter().map(|l| l.len()).sum::<usize>(), 10);
    }
}
