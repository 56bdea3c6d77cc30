//! Obstacles carrying the images to be scanned

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{ArenaParams, MapError, ObstacleParams, GEOM_EPS};
use crate::loc::{Direction, Pose};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An obstacle as written in a scenario file, in the arena frame (origin in the bottom-left
/// corner, `+Y` up the arena).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObstacleSpec {
    /// Units: centimeters
    pub x_cm: f64,

    /// Units: centimeters
    pub y_cm: f64,

    /// Side of the obstacle the image is on.
    pub facing: Direction,
}

/// A square obstacle with an image on one of its faces.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    /// Index of the obstacle in the scenario.
    pub id: usize,

    /// Centre of the obstacle in the map frame.
    ///
    /// Units: centimeters
    pub centre_cm: Point2<f64>,

    /// Side of the obstacle the image is on.
    pub facing: Direction,

    /// Half side length of the keep-out square.
    ///
    /// Units: centimeters
    pub safety_width_cm: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Obstacle {
    /// Create a new obstacle from a map frame centre.
    ///
    /// Fails if the centre lies outside the arena.
    pub fn new(
        id: usize,
        x_cm: f64,
        y_cm: f64,
        facing: Direction,
        arena: &ArenaParams,
        params: &ObstacleParams,
    ) -> Result<Self, MapError> {
        if !(params.safety_width_cm > 0.0) {
            return Err(MapError::InvalidParams(format!(
                "obstacle safety width must be positive, found {}",
                params.safety_width_cm
            )));
        }

        if !arena.contains(x_cm, y_cm) {
            return Err(MapError::ObstacleOutsideArena {
                id,
                x_cm,
                y_cm,
                length_cm: arena.length_cm,
            });
        }

        Ok(Self {
            id,
            centre_cm: Point2::new(x_cm, y_cm),
            facing,
            safety_width_cm: params.safety_width_cm,
        })
    }

    /// Create a new obstacle from its arena frame description.
    pub fn from_spec(
        id: usize,
        spec: &ObstacleSpec,
        arena: &ArenaParams,
        params: &ObstacleParams,
    ) -> Result<Self, MapError> {
        let (x, y) = arena.arena_to_map(spec.x_cm, spec.y_cm);
        Self::new(id, x, y, spec.facing, arena, params)
    }

    /// The pose the robot must reach to scan this obstacle's image: one safety width out from
    /// the image face, looking back at it.
    pub fn target_pose(&self) -> Pose {
        let (ux, uy) = self.facing.unit_vector();

        Pose::new(
            self.centre_cm.x + ux * self.safety_width_cm,
            self.centre_cm.y + uy * self.safety_width_cm,
            self.facing.opposite(),
        )
    }

    /// True if the point lies strictly inside this obstacle's keep-out square.
    ///
    /// Points on the edge of the square are outside it, so target poses stay reachable.
    pub fn within_safety_boundary(&self, x_cm: f64, y_cm: f64) -> bool {
        let limit = self.safety_width_cm - GEOM_EPS;

        (x_cm - self.centre_cm.x).abs() < limit && (y_cm - self.centre_cm.y).abs() < limit
    }
}

impl fmt::Display for Obstacle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} ({:.1}, {:.1}) facing {}",
            self.id, self.centre_cm.x, self.centre_cm.y, self.facing
        )
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
