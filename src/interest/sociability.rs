use crate::building::BuildingType;
use crate::geometry::{BoundingBox, Point};
use crate::tilemap::Tilemap;

use super::curves::{INFEASIBLE, MIN_FEASIBLE};
use super::scenario::Scenario;

/// Running average of pairwise attraction/repulsion towards placed buildings.
///
/// Each placed building contributes its curve value to `sum` and one unit to
/// `count` inside its influence radius, and one veto where it is too close.
/// Contributions are applied with a sign so they can be retracted exactly.
#[derive(Clone, Debug)]
pub struct Sociability {
    building: BuildingType,
    scenario: Scenario,
    sum: Tilemap<f32>,
    count: Tilemap<i32>,
    vetoes: Tilemap<i32>,
}

impl Sociability {
    pub fn new(width: usize, length: usize, building: BuildingType, scenario: Scenario) -> Self {
        Self {
            building,
            scenario,
            sum: Tilemap::new_with(width, length, 0.0),
            count: Tilemap::new_with(width, length, 0),
            vetoes: Tilemap::new_with(width, length, 0),
        }
    }

    /// Add (`sign = 1`) or retract (`sign = -1`) the influence of a building
    /// of type `other` centred on `center`.
    pub fn apply(&mut self, center: Point, other: BuildingType, sign: i32) {
        let Some(params) = self.scenario.sociability(self.building, other) else {
            return;
        };
        let reach = params.lambda_max.ceil() as i32;
        let area = BoundingBox::new(center - Point::new(reach, reach), center + Point::new(reach, reach));
        let Some(area) = self.sum.clip(area) else {
            return;
        };
        for p in area.cells() {
            let d = p.distance(center);
            if d > params.lambda_max {
                continue;
            }
            let v = params.attraction_repulsion(d);
            if v == INFEASIBLE {
                self.vetoes[p] += sign;
            } else {
                self.sum[p] += sign as f32 * v;
                self.count[p] += sign;
            }
            debug_assert!(self.vetoes[p] >= 0 && self.count[p] >= 0, "retracted a contribution twice at {}", p);
        }
    }

    /// `-1` where any building vetoes the cell, 0 where none is in range.
    pub fn at(&self, p: Point) -> f32 {
        if self.vetoes[p] > 0 {
            return INFEASIBLE;
        }
        let n = self.count[p];
        if n <= 0 {
            return 0.0;
        }
        (self.sum[p] / n as f32).clamp(MIN_FEASIBLE, 1.0)
    }

    /// Value at `p` as if the building of type `other` at `center` were absent.
    pub fn at_excluding(&self, p: Point, center: Point, other: BuildingType) -> f32 {
        let (mut sum, mut count, mut vetoes) = (self.sum[p], self.count[p], self.vetoes[p]);
        if let Some(params) = self.scenario.sociability(self.building, other) {
            let d = p.distance(center);
            if d <= params.lambda_max {
                let v = params.attraction_repulsion(d);
                if v == INFEASIBLE {
                    vetoes -= 1;
                } else {
                    sum -= v;
                    count -= 1;
                }
            }
        }
        if vetoes > 0 {
            return INFEASIBLE;
        }
        if count <= 0 {
            return 0.0;
        }
        (sum / count as f32).clamp(MIN_FEASIBLE, 1.0)
    }
}
