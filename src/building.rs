//! Building types and their generation parameters
//!
//! The set of building types is closed; every per-type constant is resolved
//! by `match` here rather than scattered through the generator.

use serde::{Deserialize, Serialize};

/// Type of building a parcel is reserved for
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BuildingType {
    /// Dwelling, the bulk of any settlement
    House,
    /// Farmland plot
    Crop,
    /// Landmark mill, likes open high ground
    Windmill,
    /// Reserved empty lot (plaza, garden); keeps space open between buildings
    Ghost,
    /// Larger public building (hall, market, church)
    Structure,
    /// Dwelling dug into a slope
    Cave,
}

impl BuildingType {
    pub const ALL: [BuildingType; 6] = [
        BuildingType::House,
        BuildingType::Crop,
        BuildingType::Windmill,
        BuildingType::Ghost,
        BuildingType::Structure,
        BuildingType::Cave,
    ];

    pub fn index(self) -> usize {
        match self {
            BuildingType::House => 0,
            BuildingType::Crop => 1,
            BuildingType::Windmill => 2,
            BuildingType::Ghost => 3,
            BuildingType::Structure => 4,
            BuildingType::Cave => 5,
        }
    }

    /// Footprint a parcel starts with when it is seeded (width, length)
    pub fn initial_size(self) -> (i32, i32) {
        match self {
            BuildingType::House => (5, 5),
            BuildingType::Crop => (5, 5),
            BuildingType::Windmill => (5, 5),
            BuildingType::Ghost => (3, 3),
            BuildingType::Structure => (7, 7),
            BuildingType::Cave => (3, 3),
        }
    }

    /// Largest footprint area extension may grow a parcel to
    pub fn max_area(self) -> i32 {
        match self {
            BuildingType::House => 100,
            BuildingType::Crop => 196,
            BuildingType::Windmill => 64,
            BuildingType::Ghost => 49,
            BuildingType::Structure => 256,
            BuildingType::Cave => 36,
        }
    }

    /// Longest side extension may grow a parcel to
    pub fn max_side(self) -> i32 {
        match self {
            BuildingType::House => 13,
            BuildingType::Crop => 20,
            BuildingType::Windmill => 9,
            BuildingType::Ghost => 9,
            BuildingType::Structure => 21,
            BuildingType::Cave => 7,
        }
    }

    /// Relative frequency in the building pool
    pub fn pool_weight(self) -> f32 {
        match self {
            BuildingType::House => 10.0,
            BuildingType::Crop => 4.0,
            BuildingType::Windmill => 1.0,
            BuildingType::Ghost => 1.5,
            BuildingType::Structure => 2.0,
            BuildingType::Cave => 0.5,
        }
    }

    /// Tallest building (in blocks) near a town center
    pub fn max_height(self) -> u32 {
        match self {
            BuildingType::House => 12,
            BuildingType::Crop => 1,
            BuildingType::Windmill => 14,
            BuildingType::Ghost => 0,
            BuildingType::Structure => 20,
            BuildingType::Cave => 6,
        }
    }

    /// Whether this type may take over a city block as its uniform type
    pub fn fills_blocks(self) -> bool {
        matches!(self, BuildingType::House | BuildingType::Crop | BuildingType::Ghost)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            BuildingType::House => "House",
            BuildingType::Crop => "Crop",
            BuildingType::Windmill => "Windmill",
            BuildingType::Ghost => "Ghost",
            BuildingType::Structure => "Structure",
            BuildingType::Cave => "Cave",
        }
    }
}

impl std::fmt::Display for BuildingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indices_are_dense() {
        for (i, t) in BuildingType::ALL.iter().enumerate() {
            assert_eq!(t.index(), i);
        }
    }

    #[test]
    fn test_initial_size_fits_limits() {
        for t in BuildingType::ALL {
            let (w, l) = t.initial_size();
            assert!(w * l <= t.max_area(), "{} starts too large", t);
            assert!(w.max(l) <= t.max_side());
        }
    }
}
