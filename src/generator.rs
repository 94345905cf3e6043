//! Generation driver
//!
//! districts -> bootstrap roads -> growth loop -> dead-end pruning ->
//! parcel extension -> finalization -> heights

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{info, warn};

use crate::context::GenerationContext;
use crate::districts::{self, Districts};
use crate::error::{GenerationError, ParcelError, ParcelFailure};
use crate::geometry::Point;
use crate::interest::InterestMaps;
use crate::parcels::blocks::MIN_LOT_CELLS;
use crate::parcels::{assign_heights, extend_parcels, Parcel};
use crate::params::GenerationParams;
use crate::roads::RoadNetwork;
use crate::skeleton::{SkeletonStats, VillageSkeleton};
use crate::terrain::Terrain;

/// Half length of the starter road laid when there is nothing to connect.
const LONE_ROAD_HALF_LENGTH: i32 = 24;

#[derive(Clone, Debug, Default, Serialize)]
pub struct GenerationStats {
    pub districts: usize,
    pub towns: usize,
    pub bootstrap_roads: usize,
    pub skeleton: SkeletonStats,
    pub pruned_road_cells: usize,
    pub extension_strips: usize,
    pub road_cells: usize,
    pub city_blocks: usize,
    pub elapsed_secs: f64,
}

/// Outcome of a run: the parcels that passed finalization, the ones that
/// did not and why, and the structures later stages read from.
pub struct GenerationReport {
    pub parcels: Vec<Parcel>,
    pub failures: Vec<ParcelFailure>,
    pub districts: Districts,
    pub roads: RoadNetwork,
    pub interest: InterestMaps,
    pub stats: GenerationStats,
}

/// Prim's minimum spanning tree over straight-line distances.
pub fn spanning_tree(points: &[Point]) -> Vec<(usize, usize)> {
    let n = points.len();
    if n < 2 {
        return Vec::new();
    }
    let mut in_tree = vec![false; n];
    let mut edges = Vec::with_capacity(n - 1);
    let mut queue: BinaryHeap<Reverse<(u64, usize, usize)>> = BinaryHeap::new();
    let weight = |a: usize, b: usize| (points[a].distance(points[b]) * 1000.0) as u64;

    in_tree[0] = true;
    for j in 1..n {
        queue.push(Reverse((weight(0, j), 0, j)));
    }
    while let Some(Reverse((_, from, to))) = queue.pop() {
        if in_tree[to] {
            continue;
        }
        in_tree[to] = true;
        edges.push((from, to));
        for j in 0..n {
            if !in_tree[j] {
                queue.push(Reverse((weight(to, j), to, j)));
            }
        }
    }
    edges
}

/// Lay the first roads: a spanning tree between town centers, or one road
/// out of a lone town. Returns the number of roads built.
fn bootstrap_roads(ctx: &mut GenerationContext<'_>, districts: &Districts) -> usize {
    let towns = districts.town_centers();
    let pairs: Vec<(Point, Point)> = match towns.as_slice() {
        [] => Vec::new(),
        [town] => {
            let partner = districts
                .districts
                .iter()
                .filter(|d| !d.is_town)
                .map(|d| d.center)
                .min_by(|a, b| a.distance(*town).total_cmp(&b.distance(*town)));
            match partner {
                Some(p) => vec![(*town, p)],
                None => {
                    let max_x = ctx.terrain.width() as i32 - 1;
                    let west = Point::new((town.x - LONE_ROAD_HALF_LENGTH).max(0), town.z);
                    let east = Point::new((town.x + LONE_ROAD_HALF_LENGTH).min(max_x), town.z);
                    vec![(west, east)]
                }
            }
        }
        _ => spanning_tree(&towns).into_iter().map(|(a, b)| (towns[a], towns[b])).collect(),
    };

    // The first road is laid end to end; later ones branch off the network
    // so a failed pair never leaves an island
    let mut built = 0;
    for (a, b) in pairs {
        let laid = if ctx.roads.is_empty() {
            !ctx.roads.create_road(ctx.terrain, &mut ctx.obstacles, a, b).is_empty()
        } else {
            let target = if ctx.roads.is_road(b) { a } else { b };
            ctx.roads.connect_to_network(ctx.terrain, &mut ctx.obstacles, target, 0).is_some()
        };
        if laid {
            built += 1;
        } else {
            warn!("no bootstrap road between {} and {}", a, b);
        }
    }
    built
}

/// Check a parcel before it is handed over.
pub fn validate_parcel(parcel: &Parcel, terrain: &Terrain, roads: &RoadNetwork) -> Result<(), ParcelError> {
    let cells = parcel.cells();
    if cells.iter().any(|p| !terrain.contains(*p)) {
        return Err(ParcelError::OutOfBounds);
    }
    if cells.len() < MIN_LOT_CELLS {
        return Err(ParcelError::Degenerate);
    }
    if !roads.is_road(parcel.entry) {
        return Err(ParcelError::NoRoadAccess);
    }
    if cells.iter().any(|p| roads.is_road(*p) || roads.is_paved(*p)) {
        return Err(ParcelError::Obstructed);
    }
    Ok(())
}

/// Run the whole pipeline on `terrain`.
pub fn generate(terrain: &Terrain, params: GenerationParams) -> Result<GenerationReport, GenerationError> {
    params.validate()?;
    let start = Instant::now();
    let deadline = start + Duration::from_secs_f64(params.time_limit_secs);
    let mut ctx = GenerationContext::new(terrain, params);
    let mut stats = GenerationStats::default();

    let mut rng = ctx.subsystem_rng("districts");
    let districts = districts::partition(terrain, &ctx.params.districts, &mut rng)?;
    stats.districts = districts.districts.len();
    stats.towns = districts.towns().count();

    stats.bootstrap_roads = bootstrap_roads(&mut ctx, &districts);
    if ctx.roads.is_empty() {
        warn!("no bootstrap road could be built; the settlement will stay empty");
    }
    info!("bootstrap laid {} roads, {} road cells", stats.bootstrap_roads, ctx.roads.road_cell_count());

    let mut skeleton = VillageSkeleton::new(&mut ctx, &districts)?;
    skeleton.grow(&mut ctx, &districts, deadline);
    let (parcels, interest, skeleton_stats) = skeleton.into_parts();
    stats.skeleton = skeleton_stats;

    stats.pruned_road_cells =
        ctx.roads.prune_dead_ends(terrain, &mut ctx.obstacles, ctx.params.roads.dead_end_max_length);

    let mut parcels = parcels.into_vec();
    stats.extension_strips = extend_parcels(&mut parcels, &mut ctx.obstacles, &ctx.params.parcels);

    let mut accepted = Vec::with_capacity(parcels.len());
    let mut failures = Vec::new();
    for parcel in parcels {
        match validate_parcel(&parcel, terrain, &ctx.roads) {
            Ok(()) => accepted.push(parcel),
            Err(error) => {
                warn!("parcel {} ({}) rejected: {}", parcel.id, parcel.building_type, error);
                parcel.release(&mut ctx.obstacles);
                failures.push(ParcelFailure { parcel: parcel.id, error });
            }
        }
    }
    assign_heights(&mut accepted, terrain, &districts.town_centers(), &ctx.params.parcels);
    debug_assert!(ctx.roads.is_connected() || ctx.roads.is_empty());

    stats.road_cells = ctx.roads.road_cell_count();
    stats.city_blocks = ctx.roads.city_blocks().len();
    stats.elapsed_secs = start.elapsed().as_secs_f64();
    info!(
        "generated {} parcels ({} rejected), {} road cells, {} city blocks in {:.2}s",
        accepted.len(),
        failures.len(),
        stats.road_cells,
        stats.city_blocks,
        stats.elapsed_secs
    );

    Ok(GenerationReport {
        parcels: accepted,
        failures,
        districts,
        roads: ctx.roads,
        interest,
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::building::BuildingType;
    use crate::obstacle_map::ObstacleMap;
    use crate::params::RoadParams;
    use crate::parcels::ParcelId;
    use crate::terrain::synthetic;

    #[test]
    fn test_spanning_tree_links_everything() {
        let points = [Point::new(0, 0), Point::new(10, 0), Point::new(10, 10), Point::new(50, 50)];
        let edges = spanning_tree(&points);
        assert_eq!(edges.len(), 3);
        assert!(edges.contains(&(0, 1)));
        assert!(edges.contains(&(1, 2)));
        assert!(edges.contains(&(2, 3)));
        assert!(spanning_tree(&points[..1]).is_empty());
    }

    #[test]
    fn test_validation_failures() {
        let terrain = synthetic::flat(40, 40, 64);
        let mut obstacles = ObstacleMap::new(40, 40);
        let mut roads = RoadNetwork::new(&terrain, RoadParams::default());
        roads.create_road(&terrain, &mut obstacles, Point::new(0, 5), Point::new(39, 5));

        let good = Parcel::new(ParcelId(0), Point::new(20, 15), BuildingType::House, Point::new(20, 5), &mut obstacles, 1);
        assert_eq!(validate_parcel(&good, &terrain, &roads), Ok(()));

        let edge = Parcel::new(ParcelId(1), Point::new(39, 30), BuildingType::House, Point::new(30, 5), &mut obstacles, 1);
        assert_eq!(validate_parcel(&edge, &terrain, &roads), Err(ParcelError::OutOfBounds));

        let stranded = Parcel::new(ParcelId(2), Point::new(10, 30), BuildingType::House, Point::new(10, 25), &mut obstacles, 1);
        assert_eq!(validate_parcel(&stranded, &terrain, &roads), Err(ParcelError::NoRoadAccess));

        let on_road = Parcel::new(ParcelId(3), Point::new(30, 5), BuildingType::House, Point::new(25, 5), &mut obstacles, 1);
        assert_eq!(validate_parcel(&on_road, &terrain, &roads), Err(ParcelError::Obstructed));
    }
}
