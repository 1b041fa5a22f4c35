//! Starmap generation and pathfinding for the EC4X turn engine.
//!
//! The starmap is a hexagonal disc of star systems joined by classified
//! jump lanes. This crate owns the graph structure, its seeded generator,
//! and the A* router the movement phase uses.
//!
//! # Modules
//!
//! - [`starmap`] -- The [`Starmap`] graph and its invariant checks
//! - [`generate`] -- Seeded map generation
//! - [`path`] -- A* pathfinding and fleet ETA
//! - [`error`] -- Shared error types
//!
//! [`Starmap`]: starmap::Starmap

pub mod error;
pub mod generate;
pub mod path;
pub mod starmap;

pub use error::WorldError;
pub use generate::{GeneratedMap, generate};
pub use path::{PathResult, calculate_eta, find_path};
pub use starmap::Starmap;
