//! Settlement generation library
//!
//! Partitions a terrain into districts, grows a road network towards seeded
//! building sites chosen by per-type interest maps, and carves the parcels
//! later stages build on.

pub mod building;
pub mod context;
pub mod districts;
pub mod error;
pub mod export;
pub mod generator;
pub mod geometry;
pub mod interest;
pub mod obstacle_map;
pub mod params;
pub mod parcels;
pub mod roads;
pub mod skeleton;
pub mod terrain;
pub mod tilemap;

pub use error::{GenerationError, ParcelError, ParcelFailure};
pub use generator::{generate, GenerationReport, GenerationStats};
pub use params::GenerationParams;
