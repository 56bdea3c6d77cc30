//! # Navigation
//!
//! This module provides the route planning algorithms:
//! - [`order`] - chooses the order in which to visit the obstacles.
//! - [`hybrid_astar`] - a lattice search over cardinal poses using straight and quarter turn
//!   primitives.
//! - [`quadrant`] - closed-form manoeuvre synthesis from the target's position relative to the
//!   robot.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod hybrid_astar;
pub mod order;
pub mod quadrant;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use crate::loc::Pose;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NavError {
    #[error("The {0} pose {1} is not on the grid")]
    PointOutsideMap(String, Pose),

    #[error("The pose {0} does not face a cardinal direction")]
    NonCardinalHeading(Pose),

    #[error("No path to the target could be found")]
    NoPathToTarget,

    #[error("Encountered a NaN cost during the search")]
    InvalidCost,

    #[error("Manoeuvre synthesis did not reach the target after {0} steps")]
    SynthesisDidNotConverge(usize),

    #[error("Cannot order {0} obstacles, at most {1} are supported")]
    TooManyObstacles(usize, usize),
}
