//! # Route executable parameters
//!
//! Loaded from `params/route_exec.toml`, with the obstacle layout loaded separately from a
//! scenario file.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::brain::PlannerParams;
use crate::cmd::RobotParams;
use crate::loc::{Direction, Pose};
use crate::map::{ArenaParams, MapError, Obstacle, ObstacleParams, ObstacleSpec};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// All parameters of the route planner.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteExecParams {
    pub arena: ArenaParams,
    pub robot: RobotParams,
    pub obstacle: ObstacleParams,
    pub planner: PlannerParams,
}

/// The robot's starting pose, in the arena frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StartSpec {
    /// Units: centimeters
    pub x_cm: f64,

    /// Units: centimeters
    pub y_cm: f64,

    pub heading: Direction,
}

/// A planning scenario: where the robot starts and where the obstacles are.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioParams {
    /// Starting pose, defaults to the centre of the start box facing up the arena.
    #[serde(default)]
    pub start: Option<StartSpec>,

    #[serde(default)]
    pub obstacles: Vec<ObstacleSpec>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ScenarioParams {
    /// The start pose in the map frame.
    pub fn start_pose(&self, arena: &ArenaParams) -> Pose {
        match self.start {
            Some(s) => {
                let (x, y) = arena.arena_to_map(s.x_cm, s.y_cm);
                Pose::new(x, y, s.heading)
            }
            None => arena.start_pose(),
        }
    }

    /// Build the scenario's obstacles in the map frame, numbered in file order.
    pub fn obstacles(
        &self,
        arena: &ArenaParams,
        params: &ObstacleParams,
    ) -> Result<Vec<Obstacle>, MapError> {
        self.obstacles
            .iter()
            .enumerate()
            .map(|(i, s)| Obstacle::from_spec(i, s, arena, params))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::brain::PlannerMode;

    #[test]
    fn test_parse_params() {
        let params: RouteExecParams = util::params::from_str(
            r#"
            [arena]
            length_cm = 200.0
            cell_length_cm = 10.0
            start_box_length_cm = 30.0
            border_safety_cm = 15.0

            [planner]
            mode = "Quadrant"
            scan_duration_s = 0.5
            "#,
        )
        .unwrap();

        assert_eq!(params.arena, ArenaParams::default());
        assert_eq!(params.robot, RobotParams::default());
        assert_eq!(params.planner.mode, PlannerMode::Quadrant);
        assert_eq!(params.planner.scan_duration_s, 0.5);
        assert_eq!(params.planner.max_obstacles, 8);
        assert_eq!(params.planner.turn_cost, None);
    }

    #[test]
    fn test_parse_scenario() {
        let scenario: ScenarioParams = util::params::from_str(
            r#"
            [[obstacles]]
            x_cm = 115.0
            y_cm = 45.0
            facing = "Left"

            [[obstacles]]
            x_cm = 25.0
            y_cm = 95.0
            facing = "Bottom"
            "#,
        )
        .unwrap();

        let arena = ArenaParams::default();
        assert_eq!(scenario.start_pose(&arena), arena.start_pose());
        assert_eq!(scenario.start_pose(&arena), Pose::new(15.0, 185.0, Direction::Top));

        let obstacles = scenario.obstacles(&arena, &ObstacleParams::default()).unwrap();
        assert_eq!(obstacles.len(), 2);
        assert_eq!(obstacles[1].id, 1);
        assert_eq!(obstacles[1].centre_cm.y, 105.0);
    }

    #[test]
    fn test_scenario_outside_arena() {
        let scenario = ScenarioParams {
            start: Some(StartSpec {
                x_cm: 40.0,
                y_cm: 20.0,
                heading: Direction::Right,
            }),
            obstacles: vec![ObstacleSpec {
                x_cm: 100.0,
                y_cm: 210.0,
                facing: Direction::Top,
            }],
        };
        let arena = ArenaParams::default();

        assert_eq!(
            scenario.start_pose(&arena),
            Pose::new(40.0, 180.0, Direction::Right)
        );
        assert!(matches!(
            scenario.obstacles(&arena, &ObstacleParams::default()),
            Err(MapError::ObstacleOutsideArena { id: 0, .. })
        ));
    }
}
