use crate::geometry::Point;
use crate::roads::RoadNetwork;
use crate::tilemap::Tilemap;

use super::curves::CurveParams;

/// Distance-to-road response, kept in step with the road network's change log.
#[derive(Clone, Debug)]
pub struct Accessibility {
    params: CurveParams,
    values: Tilemap<f32>,
    /// Road field epoch the values are current with
    road_epoch: u32,
}

impl Accessibility {
    pub fn new(params: CurveParams, roads: &RoadNetwork) -> Self {
        let values = roads.distance_map().map(|&d| params.balance(d));
        Self {
            params,
            values,
            road_epoch: roads.change_epoch(),
        }
    }

    /// Re-evaluate only the cells whose road distance changed since the last call.
    pub fn update(&mut self, roads: &RoadNetwork) {
        let distances = roads.distance_map();
        for p in roads.changed_since(self.road_epoch) {
            if let Some(d) = distances.get(p) {
                self.values[p] = self.params.balance(*d);
            }
        }
        self.road_epoch = roads.change_epoch();
    }

    pub fn at(&self, p: Point) -> f32 {
        self.values[p]
    }

    pub fn values(&self) -> &Tilemap<f32> {
        &self.values
    }
}
