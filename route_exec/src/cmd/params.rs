//! Robot kinematic parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Kinematic parameters of the robot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RobotParams {
    /// Length of the robot body.
    ///
    /// Units: centimeters
    pub length_cm: f64,

    /// Radius of the circle traced by the robot's reference point during a turn.
    ///
    /// Units: centimeters
    pub turn_radius_cm: f64,

    /// Travel speed along the path, identical for straights and turns.
    ///
    /// Units: centimeters/second
    pub speed_cms: f64,

    /// Number of execution ticks per second.
    ///
    /// Units: hertz
    pub tick_rate_hz: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl RobotParams {
    /// Ratio of body length to turn radius, which scales the speed used to time a turn.
    pub fn turn_factor(&self) -> f64 {
        self.length_cm / self.turn_radius_cm
    }
}

impl Default for RobotParams {
    fn default() -> Self {
        Self {
            length_cm: 20.0,
            turn_radius_cm: 30.0,
            speed_cms: 100.0,
            tick_rate_hz: 60.0,
        }
    }
}
