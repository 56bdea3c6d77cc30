//! # Map module
//!
//! The arena is a square, discretised into a grid of square cells. Obstacles are square
//! keep-out regions, and a band along the walls is kept free so the robot never touches them.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod grid;
mod obstacle;
mod params;

pub use grid::{CellIndex, Grid, Node};
pub use obstacle::{Obstacle, ObstacleSpec};
pub use params::{ArenaParams, ObstacleParams};

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use thiserror::Error;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Tolerance used by geometric comparisons against keep-out boundaries.
///
/// Units: centimeters
pub const GEOM_EPS: f64 = 1e-6;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors which can occur while building the map.
#[derive(Debug, Error, PartialEq)]
pub enum MapError {
    #[error("Invalid map parameters: {0}")]
    InvalidParams(String),

    #[error(
        "Obstacle {id} at ({x_cm}, {y_cm}) is outside the {length_cm} cm arena"
    )]
    ObstacleOutsideArena {
        id: usize,
        x_cm: f64,
        y_cm: f64,
        length_cm: f64,
    },
}
