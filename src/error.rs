//! Error types for settlement generation

use std::fmt;

use crate::parcels::ParcelId;

/// Errors that abort a generation run.
#[derive(Debug)]
pub enum GenerationError {
    /// Parameters failed validation
    InvalidParams(String),
    /// An input raster does not match the build area
    ShapeMismatch {
        raster: &'static str,
        expected: (usize, usize),
        found: (usize, usize),
    },
    /// Build area with zero width or length
    EmptyBuildArea,
    /// No sampled cell is suitable for building
    NoBuildableTerrain,
    /// IO error (config file, export)
    Io(std::io::Error),
    /// Malformed JSON configuration
    Config(serde_json::Error),
    /// Failed to encode or write an image
    Image(image::ImageError),
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationError::InvalidParams(msg) => write!(f, "Invalid parameters: {}", msg),
            GenerationError::ShapeMismatch { raster, expected, found } => write!(
                f,
                "Raster '{}' is {}x{} but the build area is {}x{}",
                raster, found.0, found.1, expected.0, expected.1
            ),
            GenerationError::EmptyBuildArea => write!(f, "Build area is empty"),
            GenerationError::NoBuildableTerrain => write!(f, "No buildable terrain in the build area"),
            GenerationError::Io(e) => write!(f, "IO error: {}", e),
            GenerationError::Config(e) => write!(f, "Configuration error: {}", e),
            GenerationError::Image(e) => write!(f, "Image error: {}", e),
        }
    }
}

impl std::error::Error for GenerationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GenerationError::Io(e) => Some(e),
            GenerationError::Config(e) => Some(e),
            GenerationError::Image(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for GenerationError {
    fn from(e: std::io::Error) -> Self {
        GenerationError::Io(e)
    }
}

impl From<serde_json::Error> for GenerationError {
    fn from(e: serde_json::Error) -> Self {
        GenerationError::Config(e)
    }
}

impl From<image::ImageError> for GenerationError {
    fn from(e: image::ImageError) -> Self {
        GenerationError::Image(e)
    }
}

/// Why a parcel could not be handed to building generators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParcelError {
    /// Footprint leaves the build area
    OutOfBounds,
    /// Footprint overlaps a road or another obstacle
    Obstructed,
    /// Entry point is not on the road network
    NoRoadAccess,
    /// Footprint smaller than the type minimum
    Degenerate,
}

impl fmt::Display for ParcelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParcelError::OutOfBounds => write!(f, "footprint leaves the build area"),
            ParcelError::Obstructed => write!(f, "footprint overlaps an obstacle"),
            ParcelError::NoRoadAccess => write!(f, "entry point is not on the road network"),
            ParcelError::Degenerate => write!(f, "footprint below the minimum size"),
        }
    }
}

impl std::error::Error for ParcelError {}

/// A parcel that failed finalization.
#[derive(Clone, Debug)]
pub struct ParcelFailure {
    pub parcel: ParcelId,
    pub error: ParcelError,
}
