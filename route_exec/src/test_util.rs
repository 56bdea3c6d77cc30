//! Helpers shared by the unit tests

use crate::loc::Direction;
use crate::map::{ArenaParams, Obstacle, ObstacleParams, ObstacleSpec};

/// Five obstacle layout used across the planner tests, in the arena frame.
pub fn reference_scenario() -> Vec<ObstacleSpec> {
    [
        (115.0, 45.0, Direction::Left),
        (25.0, 95.0, Direction::Bottom),
        (35.0, 175.0, Direction::Bottom),
        (155.0, 165.0, Direction::Left),
        (175.0, 85.0, Direction::Left),
    ]
    .iter()
    .map(|&(x_cm, y_cm, facing)| ObstacleSpec { x_cm, y_cm, facing })
    .collect()
}

/// [`reference_scenario`] built with the default parameters.
pub fn reference_obstacles() -> Vec<Obstacle> {
    let arena = ArenaParams::default();
    let params = ObstacleParams::default();

    reference_scenario()
        .iter()
        .enumerate()
        .map(|(i, s)| Obstacle::from_spec(i, s, &arena, &params).unwrap())
        .collect()
}
