//! # Route planning library.
//!
//! This library allows other crates in the workspace (and the benchmarks) to access the items
//! defined inside the route executable.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Brain - chooses the visiting order and plans every leg into a single command queue
pub mod brain;

/// Motion commands and robot kinematics
pub mod cmd;

/// Localisation - poses and cardinal headings in the map frame
pub mod loc;

/// Arena, obstacles and the occupancy grid
pub mod map;

/// Navigation algorithms - visiting order, hybrid A* and quadrant synthesis
pub mod nav;

/// Parameters of the executable and scenario files
pub mod params;

/// Trajectory control - tick by tick execution of a command queue
pub mod traj_ctrl;

#[cfg(test)]
mod test_util;
