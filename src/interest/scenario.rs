//! Interest lookup tables keyed by scenario and building type

use serde::{Deserialize, Serialize};

use crate::building::BuildingType;

use super::curves::CurveParams;

/// Overall layout flavour of a settlement
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scenario {
    /// Tight streets, buildings close together, strong pull to town centers
    Compact,
    #[default]
    Balanced,
    /// Loose hamlets spread along long roads
    Sprawling,
}

impl std::str::FromStr for Scenario {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "compact" => Ok(Scenario::Compact),
            "balanced" => Ok(Scenario::Balanced),
            "sprawling" => Ok(Scenario::Sprawling),
            other => Err(format!("unknown scenario '{}' (compact, balanced, sprawling)", other)),
        }
    }
}

impl Scenario {
    pub fn all() -> &'static [Self] {
        &[Self::Compact, Self::Balanced, Self::Sprawling]
    }

    /// Multiplier applied to every distance in the tables.
    pub fn distance_scale(&self) -> f32 {
        match self {
            Scenario::Compact => 0.75,
            Scenario::Balanced => 1.0,
            Scenario::Sprawling => 1.5,
        }
    }

    /// Multiplier on the district density factor weight.
    pub fn density_emphasis(&self) -> f32 {
        match self {
            Scenario::Compact => 1.5,
            Scenario::Balanced => 1.0,
            Scenario::Sprawling => 0.5,
        }
    }

    /// Distance-to-road response of a building type.
    pub fn accessibility(&self, building: BuildingType) -> CurveParams {
        let base = match building {
            BuildingType::House => CurveParams::new(3.0, 4.0, 14.0),
            BuildingType::Crop => CurveParams::new(3.0, 6.0, 24.0),
            BuildingType::Windmill => CurveParams::new(3.0, 6.0, 24.0),
            BuildingType::Ghost => CurveParams::new(2.0, 3.0, 12.0),
            BuildingType::Structure => CurveParams::new(4.0, 5.0, 12.0),
            BuildingType::Cave => CurveParams::new(2.0, 5.0, 20.0),
        };
        // The minimum is a footprint clearance and does not scale
        let scaled = base.scaled(self.distance_scale());
        CurveParams::new(base.lambda_min, scaled.lambda_0.max(base.lambda_min), scaled.lambda_max)
    }

    /// How a new building of type `candidate` reacts to an existing building
    /// of type `existing`. `None` means the pair does not interact.
    pub fn sociability(&self, candidate: BuildingType, existing: BuildingType) -> Option<CurveParams> {
        use BuildingType::*;
        let base = match (candidate, existing) {
            (House, House) => CurveParams::new(5.0, 9.0, 24.0),
            (House, Crop) | (Crop, House) => CurveParams::new(4.0, 12.0, 32.0),
            (House, Windmill) | (Windmill, House) => CurveParams::new(6.0, 18.0, 40.0),
            (House, Structure) | (Structure, House) => CurveParams::new(6.0, 12.0, 40.0),
            (Crop, Crop) => CurveParams::new(4.0, 8.0, 24.0),
            (Crop, Windmill) | (Windmill, Crop) => CurveParams::new(4.0, 10.0, 32.0),
            (Windmill, Windmill) => CurveParams::new(20.0, 40.0, 60.0),
            (Structure, Structure) => CurveParams::new(24.0, 48.0, 64.0),
            (Ghost, Ghost) => CurveParams::new(16.0, 30.0, 48.0),
            (Ghost, House) | (Ghost, Structure) | (House, Ghost) | (Structure, Ghost) => {
                CurveParams::new(4.0, 8.0, 20.0)
            }
            (Cave, Cave) => CurveParams::new(4.0, 8.0, 24.0),
            (Cave, _) | (_, Cave) => CurveParams::new(5.0, 12.0, 30.0),
            _ => return None,
        };
        let scaled = base.scaled(self.distance_scale());
        Some(CurveParams::new(base.lambda_min.max(scaled.lambda_min * 0.8), scaled.lambda_0, scaled.lambda_max))
    }

    /// Weights of (accessibility, sociability, fixed terrain) in the overall interest.
    pub fn weights(&self, building: BuildingType) -> InterestWeights {
        let (accessibility, sociability, fixed) = match building {
            BuildingType::House => (1.0, 1.0, 0.6),
            BuildingType::Crop => (0.6, 0.6, 1.2),
            BuildingType::Windmill => (0.5, 0.6, 1.5),
            BuildingType::Ghost => (0.8, 1.0, 0.4),
            BuildingType::Structure => (1.2, 1.0, 0.6),
            BuildingType::Cave => (0.6, 0.4, 1.5),
        };
        InterestWeights { accessibility, sociability, fixed }
    }

    /// Terrain preferences of a building type.
    pub fn fixed_profile(&self, building: BuildingType) -> FixedProfile {
        let mut profile = match building {
            BuildingType::House => FixedProfile {
                altitude_band: CurveParams::new(0.0, 0.35, 0.85),
                max_steepness: 1.5,
                prefers_slope: false,
                river: CurveParams::new(3.0, 10.0, 40.0),
                ocean: CurveParams::new(3.0, 12.0, 40.0),
                density_preference: 1.0,
                weights: FixedWeights { altitude: 0.5, steepness: 1.0, river: 0.5, ocean: 0.3, extendability: 0.5, density: 1.0 },
            },
            BuildingType::Crop => FixedProfile {
                altitude_band: CurveParams::new(0.0, 0.2, 0.65),
                max_steepness: 1.0,
                prefers_slope: false,
                river: CurveParams::new(2.0, 6.0, 32.0),
                ocean: CurveParams::new(4.0, 16.0, 40.0),
                density_preference: -0.6,
                weights: FixedWeights { altitude: 0.3, steepness: 1.5, river: 1.0, ocean: 0.2, extendability: 1.0, density: 0.8 },
            },
            BuildingType::Windmill => FixedProfile {
                altitude_band: CurveParams::new(0.3, 0.85, 1.0),
                max_steepness: 1.0,
                prefers_slope: false,
                river: CurveParams::new(3.0, 12.0, 40.0),
                ocean: CurveParams::new(4.0, 16.0, 40.0),
                density_preference: -0.8,
                weights: FixedWeights { altitude: 1.5, steepness: 0.8, river: 0.2, ocean: 0.2, extendability: 0.3, density: 0.6 },
            },
            BuildingType::Ghost => FixedProfile {
                altitude_band: CurveParams::new(0.0, 0.4, 1.0),
                max_steepness: 1.5,
                prefers_slope: false,
                river: CurveParams::new(2.0, 8.0, 32.0),
                ocean: CurveParams::new(2.0, 8.0, 32.0),
                density_preference: 0.4,
                weights: FixedWeights { altitude: 0.2, steepness: 1.0, river: 0.2, ocean: 0.2, extendability: 0.3, density: 0.5 },
            },
            BuildingType::Structure => FixedProfile {
                altitude_band: CurveParams::new(0.1, 0.5, 0.9),
                max_steepness: 1.0,
                prefers_slope: false,
                river: CurveParams::new(4.0, 12.0, 40.0),
                ocean: CurveParams::new(4.0, 12.0, 40.0),
                density_preference: 1.0,
                weights: FixedWeights { altitude: 0.8, steepness: 1.5, river: 0.3, ocean: 0.3, extendability: 1.0, density: 1.5 },
            },
            BuildingType::Cave => FixedProfile {
                altitude_band: CurveParams::new(0.2, 0.6, 1.0),
                max_steepness: 6.0,
                prefers_slope: true,
                river: CurveParams::new(3.0, 12.0, 40.0),
                ocean: CurveParams::new(4.0, 16.0, 40.0),
                density_preference: -0.5,
                weights: FixedWeights { altitude: 0.5, steepness: 1.5, river: 0.2, ocean: 0.2, extendability: 0.2, density: 0.5 },
            },
        };
        profile.weights.density *= self.density_emphasis();
        profile
    }
}

/// Combination weights of the three interest groups
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InterestWeights {
    pub accessibility: f32,
    pub sociability: f32,
    pub fixed: f32,
}

/// Weights of the fixed terrain factors
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FixedWeights {
    pub altitude: f32,
    pub steepness: f32,
    pub river: f32,
    pub ocean: f32,
    pub extendability: f32,
    pub density: f32,
}

/// Terrain preferences of one building type
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FixedProfile {
    /// Response to altitude relative to the dry-land height range, in `[0, 1]`
    pub altitude_band: CurveParams,
    /// Steeper cells are infeasible (or, for slope lovers, ideal up to here)
    pub max_steepness: f32,
    pub prefers_slope: bool,
    pub river: CurveParams,
    pub ocean: CurveParams,
    /// 1 favours dense town centers, -1 favours the outskirts
    pub density_preference: f32,
    pub weights: FixedWeights,
}
