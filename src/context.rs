//! Shared state of one generation run

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::obstacle_map::ObstacleMap;
use crate::params::GenerationParams;
use crate::roads::RoadNetwork;
use crate::terrain::Terrain;

/// Everything the phases of a run mutate together. There is one obstacle
/// map and one road network per run; both are only touched from the
/// driving thread.
pub struct GenerationContext<'t> {
    pub terrain: &'t Terrain,
    pub params: GenerationParams,
    pub obstacles: ObstacleMap,
    pub roads: RoadNetwork,
    pub rng: ChaCha8Rng,
}

impl<'t> GenerationContext<'t> {
    pub fn new(terrain: &'t Terrain, params: GenerationParams) -> Self {
        let obstacles = ObstacleMap::new(terrain.width(), terrain.length());
        let roads = RoadNetwork::new(terrain, params.roads.clone());
        let rng = ChaCha8Rng::seed_from_u64(params.derive_seed("skeleton"));
        Self { terrain, params, obstacles, roads, rng }
    }

    /// Fresh generator for a named subsystem, independent of how much
    /// randomness other phases consumed.
    pub fn subsystem_rng(&self, system: &str) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(self.params.derive_seed(system))
    }
}
