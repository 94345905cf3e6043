//! Shared blockedness raster
//!
//! Every cell carries a counter of how many independent sources (parcels,
//! road surface, their margins) currently block it. Sources are added and
//! removed symmetrically, so overlapping sources never clobber each other.

use crate::geometry::{BoundingBox, Point};
use crate::tilemap::Tilemap;

/// Footprint of an obstacle relative to its origin.
#[derive(Clone, Debug, PartialEq)]
pub enum ObstacleMask {
    /// Every cell of the box
    Box(BoundingBox),
    /// Cells of `bounds` where the mask is set; the mask is indexed from `bounds.min`
    Masked { bounds: BoundingBox, mask: Tilemap<bool> },
    /// Explicit cell list
    Cells(Vec<Point>),
}

impl ObstacleMask {
    /// Cells covered by this mask once shifted by `origin`.
    pub fn cells(&self, origin: Point) -> Vec<Point> {
        match self {
            ObstacleMask::Box(bb) => bb.translate(origin).cells().collect(),
            ObstacleMask::Masked { bounds, mask } => bounds
                .cells()
                .filter(|p| mask.get(*p - bounds.min).copied().unwrap_or(false))
                .map(|p| p + origin)
                .collect(),
            ObstacleMask::Cells(cells) => cells.iter().map(|p| *p + origin).collect(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ObstacleMap {
    counters: Tilemap<u16>,
    hidden: Vec<(Point, ObstacleMask)>,
}

impl ObstacleMap {
    pub fn new(width: usize, length: usize) -> Self {
        Self {
            counters: Tilemap::new(width, length),
            hidden: Vec::new(),
        }
    }

    pub fn width(&self) -> usize {
        self.counters.width
    }

    pub fn length(&self) -> usize {
        self.counters.length
    }

    /// Mark every in-bounds cell of `origin + mask` as blocked once more.
    pub fn add_obstacle(&mut self, origin: Point, mask: &ObstacleMask) {
        for p in mask.cells(origin) {
            if let Some(counter) = self.counters.get_mut(p) {
                *counter += 1;
            }
        }
    }

    /// Undo one `add_obstacle` of the same footprint. With `store`, the
    /// footprint is remembered so `reveal_obstacles` can put it back.
    pub fn hide_obstacle(&mut self, origin: Point, mask: &ObstacleMask, store: bool) {
        for p in mask.cells(origin) {
            if let Some(counter) = self.counters.get_mut(p) {
                debug_assert!(*counter > 0, "hiding an obstacle that is not there at {}", p);
                *counter = counter.saturating_sub(1);
            }
        }
        if store {
            self.hidden.push((origin, mask.clone()));
        }
    }

    /// Re-add every stored hidden obstacle, most recent first.
    pub fn reveal_obstacles(&mut self) {
        while let Some((origin, mask)) = self.hidden.pop() {
            self.add_obstacle(origin, &mask);
        }
    }

    pub fn add_box(&mut self, bounds: BoundingBox) {
        self.add_obstacle(Point::ZERO, &ObstacleMask::Box(bounds));
    }

    pub fn remove_box(&mut self, bounds: BoundingBox) {
        self.hide_obstacle(Point::ZERO, &ObstacleMask::Box(bounds), false);
    }

    /// Out-of-bounds cells are never accessible.
    pub fn is_accessible(&self, p: Point) -> bool {
        self.counters.get(p).is_some_and(|c| *c == 0)
    }

    /// True when every cell of `bounds` lies in the map and is free.
    pub fn is_box_free(&self, bounds: BoundingBox) -> bool {
        bounds.cells().all(|p| self.is_accessible(p))
    }

    pub fn counter(&self, p: Point) -> u16 {
        self.counters.get(p).copied().unwrap_or(0)
    }

    pub fn counters(&self) -> &Tilemap<u16> {
        &self.counters
    }

    pub fn hidden_count(&self) -> usize {
        self.hidden.len()
    }
}
