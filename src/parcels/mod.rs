//! Parcels
//!
//! A parcel reserves a footprint for one building and the road cell it is
//! entered from. Creating a parcel marks its footprint (grown by a margin)
//! in the obstacle map; every later change removes exactly what was added
//! and marks the new footprint, so the obstacle counters stay in sync.

pub mod blocks;
pub mod extension;
pub mod heights;

use serde::{Deserialize, Serialize};

use crate::building::BuildingType;
use crate::geometry::{BoundingBox, Direction, Point};
use crate::obstacle_map::{ObstacleMap, ObstacleMask};
use crate::params::ParcelParams;
use crate::tilemap::Tilemap;

pub use blocks::{fill_block, majority_type, subdivide_block};
pub use extension::extend_parcels;
pub use heights::assign_heights;

/// Identifier of a parcel; ids increase in creation order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParcelId(pub u32);

impl std::fmt::Display for ParcelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Parcel {
    pub id: ParcelId,
    pub building_type: BuildingType,
    /// Road cell the parcel is entered from
    pub entry: Point,
    bounds: BoundingBox,
    /// Cells of `bounds` that belong to the parcel, indexed from `bounds.min`;
    /// `None` for a plain rectangle
    mask: Option<Tilemap<bool>>,
    /// Cells around a rectangular footprint that are also kept free
    margin: i32,
    /// Index of the city block the parcel was carved from
    pub block: Option<usize>,
    /// Ground level the building stands on
    pub ground_level: Option<i32>,
    /// Building height above ground, in blocks
    pub building_height: Option<u32>,
}

impl Parcel {
    /// Rectangular parcel of the type's initial size around `center`.
    pub fn new(
        id: ParcelId,
        center: Point,
        building_type: BuildingType,
        entry: Point,
        obstacles: &mut ObstacleMap,
        margin: i32,
    ) -> Self {
        let (width, length) = building_type.initial_size();
        let parcel = Self {
            id,
            building_type,
            entry,
            bounds: BoundingBox::centered(center, width, length),
            mask: None,
            margin,
            block: None,
            ground_level: None,
            building_height: None,
        };
        obstacles.add_obstacle(Point::ZERO, &parcel.obstacle_mask());
        parcel
    }

    /// Parcel covering exactly `cells` (a city block lot). No margin is kept
    /// around lots; neighbouring lots share their borders.
    pub fn from_cells(
        id: ParcelId,
        cells: &[Point],
        building_type: BuildingType,
        entry: Point,
        obstacles: &mut ObstacleMap,
    ) -> Option<Self> {
        let bounds = BoundingBox::from_points(cells.iter().copied())?;
        let mut mask = Tilemap::new_with(bounds.width() as usize, bounds.length() as usize, false);
        for &p in cells {
            debug_assert!(obstacles.is_accessible(p), "lot cell {} is already blocked", p);
            mask[p - bounds.min] = true;
        }
        let parcel = Self {
            id,
            building_type,
            entry,
            bounds,
            mask: Some(mask),
            margin: 0,
            block: None,
            ground_level: None,
            building_height: None,
        };
        obstacles.add_obstacle(Point::ZERO, &parcel.obstacle_mask());
        Some(parcel)
    }

    pub fn bounds(&self) -> BoundingBox {
        self.bounds
    }

    pub fn center(&self) -> Point {
        self.bounds.center()
    }

    pub fn is_lot(&self) -> bool {
        self.mask.is_some()
    }

    pub fn contains(&self, p: Point) -> bool {
        match &self.mask {
            None => self.bounds.contains(p),
            Some(mask) => self.bounds.contains(p) && mask.get(p - self.bounds.min).copied().unwrap_or(false),
        }
    }

    /// Cells of the footprint proper (without margin).
    pub fn cells(&self) -> Vec<Point> {
        self.bounds.cells().filter(|p| self.contains(*p)).collect()
    }

    pub fn area(&self) -> usize {
        match &self.mask {
            None => self.bounds.area() as usize,
            Some(mask) => mask.values().iter().filter(|m| **m).count(),
        }
    }

    /// What this parcel adds to the obstacle map.
    pub fn obstacle_mask(&self) -> ObstacleMask {
        match &self.mask {
            None => ObstacleMask::Box(self.bounds.inflate(self.margin)),
            Some(mask) => ObstacleMask::Masked { bounds: self.bounds, mask: mask.clone() },
        }
    }

    /// Take the parcel off the obstacle map.
    pub fn release(&self, obstacles: &mut ObstacleMap) {
        obstacles.hide_obstacle(Point::ZERO, &self.obstacle_mask(), false);
    }

    /// Whether `bounds` would be an acceptable footprint for this parcel's type.
    pub fn shape_allows(&self, bounds: BoundingBox, params: &ParcelParams) -> bool {
        let (w, l) = (bounds.width(), bounds.length());
        let long = w.max(l);
        let short = w.min(l).max(1);
        if bounds.area() > self.building_type.max_area() || long > self.building_type.max_side() {
            return false;
        }
        if long <= params.small_side_exemption {
            return true;
        }
        long as f32 / short as f32 <= params.max_aspect_ratio
    }

    /// Whether the strip `cells` is free once this parcel's own marks are set aside.
    fn is_free_ignoring_self(&self, obstacles: &mut ObstacleMap, cells: BoundingBox) -> bool {
        obstacles.hide_obstacle(Point::ZERO, &self.obstacle_mask(), true);
        let free = obstacles.is_box_free(cells);
        obstacles.reveal_obstacles();
        free
    }

    /// Grow one cell towards `direction` if the new strip is free and the
    /// shape stays within the type's limits. Lots never grow.
    pub fn try_expand(&mut self, direction: Direction, obstacles: &mut ObstacleMap, params: &ParcelParams) -> bool {
        if self.is_lot() {
            return false;
        }
        let grown = self.bounds.extend(direction);
        if !self.shape_allows(grown, params) {
            return false;
        }
        if !self.is_free_ignoring_self(obstacles, self.bounds.strip(direction)) {
            return false;
        }
        self.expand(direction, obstacles);
        true
    }

    /// Grow one cell towards `direction`; the caller has checked the strip is free.
    pub fn expand(&mut self, direction: Direction, obstacles: &mut ObstacleMap) {
        debug_assert!(
            self.bounds.strip(direction).cells().all(|p| obstacles.counter(p) <= 1),
            "parcel {} expanding into an obstacle",
            self.id
        );
        self.release(obstacles);
        self.bounds = self.bounds.extend(direction);
        obstacles.add_obstacle(Point::ZERO, &self.obstacle_mask());
    }

    /// Translate the parcel by `offset` if its new footprint is free.
    pub fn move_center(&mut self, offset: Point, obstacles: &mut ObstacleMap) -> bool {
        if offset == Point::ZERO {
            return true;
        }
        obstacles.hide_obstacle(Point::ZERO, &self.obstacle_mask(), true);
        let free = self.cells().iter().all(|p| obstacles.is_accessible(*p + offset));
        obstacles.reveal_obstacles();
        if !free {
            return false;
        }
        self.release(obstacles);
        self.bounds = self.bounds.translate(offset);
        obstacles.add_obstacle(Point::ZERO, &self.obstacle_mask());
        true
    }
}

/// Parcels of a run, ordered by id.
#[derive(Clone, Debug, Default)]
pub struct ParcelSet {
    parcels: Vec<Parcel>,
    next_id: u32,
}

impl ParcelSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> ParcelId {
        let id = ParcelId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn push(&mut self, parcel: Parcel) {
        debug_assert!(self.parcels.last().map_or(true, |last| last.id < parcel.id));
        self.parcels.push(parcel);
    }

    /// Remove a parcel and release its obstacle marks.
    pub fn remove(&mut self, id: ParcelId, obstacles: &mut ObstacleMap) -> Option<Parcel> {
        let index = self.parcels.binary_search_by_key(&id, |p| p.id).ok()?;
        let parcel = self.parcels.remove(index);
        parcel.release(obstacles);
        Some(parcel)
    }

    pub fn get(&self, id: ParcelId) -> Option<&Parcel> {
        let index = self.parcels.binary_search_by_key(&id, |p| p.id).ok()?;
        self.parcels.get(index)
    }

    pub fn get_mut(&mut self, id: ParcelId) -> Option<&mut Parcel> {
        let index = self.parcels.binary_search_by_key(&id, |p| p.id).ok()?;
        self.parcels.get_mut(index)
    }

    pub fn as_slice(&self) -> &[Parcel] {
        &self.parcels
    }

    pub fn as_mut_slice(&mut self) -> &mut [Parcel] {
        &mut self.parcels
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parcel> {
        self.parcels.iter()
    }

    pub fn len(&self) -> usize {
        self.parcels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parcels.is_empty()
    }

    pub fn into_vec(self) -> Vec<Parcel> {
        self.parcels
    }
}
