//! Arena parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::loc::{Direction, Pose};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Dimensions of the (square) arena and its grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArenaParams {
    /// Side length of the arena.
    ///
    /// Units: centimeters
    pub length_cm: f64,

    /// Side length of a single grid cell.
    ///
    /// Units: centimeters
    pub cell_length_cm: f64,

    /// Side length of the start box in the bottom-left corner of the arena.
    ///
    /// Units: centimeters
    pub start_box_length_cm: f64,

    /// Width of the band along the arena walls which the robot's reference point may not enter.
    ///
    /// Units: centimeters
    pub border_safety_cm: f64,
}

/// Parameters shared by all obstacles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObstacleParams {
    /// Half side length of the keep-out square around an obstacle centre, which is also the
    /// distance from the centre at which the robot stops to scan the image.
    ///
    /// Units: centimeters
    pub safety_width_cm: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ArenaParams {
    /// Number of cells along each side of the grid.
    pub fn num_cells(&self) -> usize {
        let n = (self.length_cm / self.cell_length_cm).floor();

        if n.is_finite() && n > 0.0 {
            n as usize
        } else {
            0
        }
    }

    /// True if the point lies inside the arena, edges included.
    pub fn contains(&self, x_cm: f64, y_cm: f64) -> bool {
        (0.0..=self.length_cm).contains(&x_cm) && (0.0..=self.length_cm).contains(&y_cm)
    }

    /// Convert a point from the arena frame (origin bottom-left, `+Y` up) to the map frame
    /// (origin top-left, `+Y` down).
    pub fn arena_to_map(&self, x_cm: f64, y_cm: f64) -> (f64, f64) {
        (x_cm, self.length_cm - y_cm)
    }

    /// Convert a point from the map frame to the arena frame.
    pub fn map_to_arena(&self, x_cm: f64, y_cm: f64) -> (f64, f64) {
        (x_cm, self.length_cm - y_cm)
    }

    /// Pose at the centre of the start box, facing up the arena.
    pub fn start_pose(&self) -> Pose {
        let half = self.start_box_length_cm / 2.0;
        Pose::new(half, self.length_cm - half, Direction::Top)
    }
}

impl Default for ArenaParams {
    fn default() -> Self {
        Self {
            length_cm: 200.0,
            cell_length_cm: 10.0,
            start_box_length_cm: 30.0,
            border_safety_cm: 15.0,
        }
    }
}

impl Default for ObstacleParams {
    fn default() -> Self {
        Self {
            safety_width_cm: 20.0,
        }
    }
}
