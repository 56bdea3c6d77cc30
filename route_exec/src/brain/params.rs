//! Parameters for the planning brain

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::str::FromStr;

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

/// Algorithm used to plan each leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlannerMode {
    /// Lattice search around the obstacles.
    HybridAStar,

    /// Closed-form manoeuvre patterns, no obstacle checks.
    Quadrant,
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerParams {
    pub mode: PlannerMode,

    /// Edge cost of a quarter turn in the search. Defaults to twice the turn radius.
    pub turn_cost: Option<f64>,

    /// Number of sections a turn is split into when checking it for collisions.
    pub turn_check_granularity: usize,

    /// Largest number of obstacles accepted, bounding the exhaustive ordering.
    pub max_obstacles: usize,

    /// Largest number of manoeuvre patterns emitted for a single leg in `Quadrant` mode.
    pub max_synth_iterations: usize,

    /// Length of the scan pause at each obstacle, zero for none.
    ///
    /// Units: seconds
    pub scan_duration_s: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl FromStr for PlannerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hybrid-astar" | "hybridastar" | "astar" => Ok(PlannerMode::HybridAStar),
            "quadrant" => Ok(PlannerMode::Quadrant),
            _ => Err(format!(
                "Unknown planner mode \"{}\", expected \"hybrid-astar\" or \"quadrant\"",
                s
            )),
        }
    }
}

impl Default for PlannerParams {
    fn default() -> Self {
        Self {
            mode: PlannerMode::HybridAStar,
            turn_cost: None,
            turn_check_granularity: 3,
            max_obstacles: 8,
            max_synth_iterations: 6,
            scan_duration_s: 0.0,
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
