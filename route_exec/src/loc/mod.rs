//! # Localisation module
//!
//! Poses and headings of the robot in the map frame.
//!
//! The map frame has its origin in the top-left corner of the arena, with `+X` to the right and
//! `+Y` down. Headings are measured anticlockwise as seen by an observer above the arena (so
//! `Top` points towards `-Y`), and are always stored wrapped into `(-pi, pi]`.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, PI};
use std::fmt;

use util::maths::{get_ang_dist, norm, wrap_pi};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Maximum angular distance from a cardinal direction for a heading to be considered cardinal.
///
/// Units: radians
pub const CARDINAL_SNAP_TOLERANCE_RAD: f64 = 0.005;

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

/// One of the four axis-aligned headings.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Top,
    Bottom,
    Left,
    Right,
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The pose (position and heading in the map frame) of the robot.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Position in the map frame.
    ///
    /// Units: centimeters
    pub position_cm: Point2<f64>,

    /// Heading, wrapped into `(-pi, pi]`, with 0 facing `Right` and `pi/2` facing `Top`.
    ///
    /// Units: radians
    pub heading_rad: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Direction {
    /// All directions, in a fixed order.
    pub const ALL: [Direction; 4] = [
        Direction::Right,
        Direction::Top,
        Direction::Left,
        Direction::Bottom,
    ];

    /// The heading angle of this direction.
    pub fn angle_rad(self) -> f64 {
        match self {
            Direction::Right => 0.0,
            Direction::Top => FRAC_PI_2,
            Direction::Left => PI,
            Direction::Bottom => -FRAC_PI_2,
        }
    }

    /// The opposite direction.
    pub fn opposite(self) -> Self {
        match self {
            Direction::Top => Direction::Bottom,
            Direction::Bottom => Direction::Top,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    /// Unit vector of this direction in the map frame.
    pub fn unit_vector(self) -> (f64, f64) {
        match self {
            Direction::Right => (1.0, 0.0),
            Direction::Top => (0.0, -1.0),
            Direction::Left => (-1.0, 0.0),
            Direction::Bottom => (0.0, 1.0),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Direction::Top => "TOP",
            Direction::Bottom => "BOTTOM",
            Direction::Left => "LEFT",
            Direction::Right => "RIGHT",
        };
        write!(f, "{}", s)
    }
}

impl Pose {
    /// Create a new pose facing a cardinal direction.
    pub fn new(x_cm: f64, y_cm: f64, direction: Direction) -> Self {
        Self {
            position_cm: Point2::new(x_cm, y_cm),
            heading_rad: direction.angle_rad(),
        }
    }

    /// Create a new pose with an arbitrary heading, which will be wrapped into `(-pi, pi]`.
    pub fn from_heading(x_cm: f64, y_cm: f64, heading_rad: f64) -> Self {
        Self {
            position_cm: Point2::new(x_cm, y_cm),
            heading_rad: wrap_pi(heading_rad),
        }
    }

    pub fn x(&self) -> f64 {
        self.position_cm.x
    }

    pub fn y(&self) -> f64 {
        self.position_cm.y
    }

    /// The cardinal direction of this pose, or `None` if the heading is not within
    /// [`CARDINAL_SNAP_TOLERANCE_RAD`] of one.
    pub fn direction(&self) -> Option<Direction> {
        to_nearest_cardinal(self.heading_rad, CARDINAL_SNAP_TOLERANCE_RAD)
    }

    /// Euclidean distance between the positions of two poses.
    pub fn distance_to(&self, other: &Pose) -> f64 {
        norm(
            &[self.position_cm.x, self.position_cm.y],
            &[other.position_cm.x, other.position_cm.y],
        )
        .unwrap_or(std::f64::NAN)
    }

    /// True if both poses are within `tol_cm` of each other and share the same cardinal
    /// direction.
    pub fn approx_eq(&self, other: &Pose, tol_cm: f64) -> bool {
        self.distance_to(other) <= tol_cm
            && get_ang_dist(self.heading_rad, other.heading_rad).abs()
                <= CARDINAL_SNAP_TOLERANCE_RAD
    }
}

impl fmt::Display for Pose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction() {
            Some(d) => write!(f, "({:.2}, {:.2}, {})", self.x(), self.y(), d),
            None => write!(
                f,
                "({:.2}, {:.2}, {:.4} rad)",
                self.x(),
                self.y(),
                self.heading_rad
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Find the cardinal direction within `tolerance_rad` of the given heading.
pub fn to_nearest_cardinal(heading_rad: f64, tolerance_rad: f64) -> Option<Direction> {
    Direction::ALL
        .iter()
        .copied()
        .find(|d| get_ang_dist(heading_rad, d.angle_rad()).abs() <= tolerance_rad)
}

/// Snap a heading onto the exact cardinal angle if it is within tolerance of one, otherwise
/// return the wrapped heading unchanged.
pub fn snap_heading(heading_rad: f64) -> f64 {
    match to_nearest_cardinal(heading_rad, CARDINAL_SNAP_TOLERANCE_RAD) {
        Some(d) => d.angle_rad(),
        None => wrap_pi(heading_rad),
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_to_nearest_cardinal() {
        assert_eq!(to_nearest_cardinal(0.0, 0.005), Some(Direction::Right));
        assert_eq!(to_nearest_cardinal(0.004, 0.005), Some(Direction::Right));
        assert_eq!(to_nearest_cardinal(-0.004, 0.005), Some(Direction::Right));
        assert_eq!(to_nearest_cardinal(0.1, 0.005), None);
        assert_eq!(to_nearest_cardinal(PI, 0.005), Some(Direction::Left));
        assert_eq!(to_nearest_cardinal(-PI + 0.001, 0.005), Some(Direction::Left));
        assert_eq!(to_nearest_cardinal(3.0 * FRAC_PI_2, 0.005), Some(Direction::Bottom));
        assert_eq!(to_nearest_cardinal(FRAC_PI_2, 0.005), Some(Direction::Top));
    }

    #[test]
    fn test_snap_heading() {
        assert_eq!(snap_heading(FRAC_PI_2 + 1e-4), FRAC_PI_2);
        assert_eq!(snap_heading(-PI + 1e-4), PI);
        assert_eq!(snap_heading(0.5), 0.5);
    }

    #[test]
    fn test_pose() {
        let p = Pose::new(15.0, 185.0, Direction::Top);
        assert_eq!(p.direction(), Some(Direction::Top));

        let q = Pose::from_heading(15.0, 185.0, 5.0 * FRAC_PI_2);
        assert_eq!(q.direction(), Some(Direction::Top));
        assert!(p.approx_eq(&q, 1e-9));

        let r = Pose::new(18.0, 189.0, Direction::Bottom);
        assert!((p.distance_to(&r) - 5.0).abs() < 1e-12);
        assert!(!p.approx_eq(&r, 10.0));
    }

    #[test]
    fn test_direction() {
        for d in Direction::ALL.iter() {
            assert_eq!(d.opposite().opposite(), *d);
            let (ux, uy) = d.unit_vector();
            // Map frame y points down, headings are anticlockwise from +X
            assert!((ux - d.angle_rad().cos()).abs() < 1e-12);
            assert!((uy + d.angle_rad().sin()).abs() < 1e-12);
        }
    }
}
