//! # Planning brain
//!
//! Turns a set of obstacles into a single queue of commands visiting every obstacle's scanning
//! pose. The brain first chooses a visiting order, then plans each leg in that order from the
//! pose the previous leg actually ends at.
//!
//! Planning runs to completion before anything is executed. If any leg cannot be planned the
//! whole plan fails, so the robot never starts on a route it cannot finish.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
pub use params::{PlannerMode, PlannerParams};

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cmd::{replay, Command, CommandQueue, RobotParams};
use crate::loc::Pose;
use crate::map::{Grid, MapError, Obstacle};
use crate::nav::{hybrid_astar::HybridAStar, order, quadrant::QuadrantSynth, NavError};
use crate::params::RouteExecParams;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Distance between a replayed leg end and its target above which a warning is raised.
///
/// Units: centimeters
const LEG_END_WARN_DIST_CM: f64 = 1.0;

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

/// The planning stage the brain is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BrainState {
    Idle,
    ComputingOrder,
    PlanningLeg(usize),
    Done,
    Failed,
}

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("Could not build the map: {0}")]
    MapError(#[from] MapError),

    #[error("Could not order the obstacles: {0}")]
    OrderError(NavError),

    #[error("Could not plan leg {leg} from {start} to obstacle {obstacle_id} at {target}: {source}")]
    LegFailed {
        leg: usize,
        obstacle_id: usize,
        start: Pose,
        target: Pose,
        source: NavError,
    },
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// One leg of the route, from the end of the previous leg to an obstacle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leg {
    pub index: usize,
    pub obstacle: Obstacle,
    pub start: Pose,
    pub target: Pose,

    /// Pose reached by replaying `commands` from `start`.
    pub end: Pose,

    /// Position of `end` in the arena frame, as an operator would measure it.
    ///
    /// Units: centimeters
    pub end_arena_cm: (f64, f64),

    /// False if driving `commands` takes the robot through an occupied region of the grid.
    pub clear: bool,

    pub commands: Vec<Command>,
}

/// A complete plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub mode: PlannerMode,
    pub start: Pose,
    pub order: Vec<Obstacle>,
    pub legs: Vec<Leg>,
    queue: CommandQueue,
}

/// Plans routes through the obstacles of a scenario.
#[derive(Debug)]
pub struct Brain {
    robot: RobotParams,
    params: PlannerParams,
    safety_width_cm: f64,
    grid: Grid,
    state: BrainState,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Plan {
    /// The command queue covering every leg in order.
    pub fn queue(&self) -> &CommandQueue {
        &self.queue
    }

    /// Take the command queue, handing it to the execution layer.
    pub fn into_queue(self) -> CommandQueue {
        self.queue
    }

    /// Pose at the end of the final leg, or the start pose if there are none.
    pub fn end_pose(&self) -> Pose {
        self.legs.last().map(|l| l.end).unwrap_or(self.start)
    }
}

impl Brain {
    /// Create a new brain for the given obstacles.
    pub fn new(params: &RouteExecParams, obstacles: &[Obstacle]) -> Result<Self, PlanError> {
        let grid = Grid::new(params.arena, obstacles)?;

        Ok(Self {
            robot: params.robot,
            params: params.planner.clone(),
            safety_width_cm: params.obstacle.safety_width_cm,
            grid,
            state: BrainState::Idle,
        })
    }

    pub fn state(&self) -> BrainState {
        self.state
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Plan a route from `start` visiting every obstacle.
    pub fn plan_path(&mut self, start: &Pose) -> Result<Plan, PlanError> {
        self.state = BrainState::ComputingOrder;

        let order = order::best_order(start, self.grid.obstacles(), self.params.max_obstacles)
            .map_err(|e| {
                self.state = BrainState::Failed;
                PlanError::OrderError(e)
            })?;

        info!(
            "Planning {} legs from {} in {:?} mode",
            order.len(),
            start,
            self.params.mode
        );

        let mut legs = Vec::with_capacity(order.len());
        let mut queue = CommandQueue::new();
        let mut current = *start;

        for (index, obstacle) in order.iter().enumerate() {
            self.state = BrainState::PlanningLeg(index);

            let target = obstacle.target_pose();
            info!("Leg {}: {} -> {} (obstacle {})", index, current, target, obstacle);

            let mut commands = self
                .plan_leg(&current, &target, index == 0)
                .map_err(|source| {
                    self.state = BrainState::Failed;
                    PlanError::LegFailed {
                        leg: index,
                        obstacle_id: obstacle.id,
                        start: current,
                        target,
                        source,
                    }
                })?;

            let end = replay(&current, commands.iter(), &self.robot);
            if end.distance_to(&target) > LEG_END_WARN_DIST_CM {
                warn!(
                    "Leg {} ends at {}, {:.2} cm from its target {}",
                    index,
                    end,
                    end.distance_to(&target),
                    target
                );
            }

            let conflict = self.grid.first_conflict(
                &current,
                commands.iter(),
                &self.robot,
                self.params.turn_check_granularity,
            );
            if let Some(p) = conflict {
                warn!("Leg {} passes through an occupied region at {}", index, p);
            }

            if self.params.scan_duration_s > 0.0 {
                commands.push(Command::scan(self.params.scan_duration_s));
            }

            queue.extend(commands.iter().copied());
            legs.push(Leg {
                index,
                obstacle: *obstacle,
                start: current,
                target,
                end,
                end_arena_cm: self.grid.arena().map_to_arena(end.x(), end.y()),
                clear: conflict.is_none(),
                commands,
            });

            current = end;
        }

        self.state = BrainState::Done;
        info!(
            "Plan complete: {} commands, {:.2} s",
            queue.len(),
            queue.duration_s(&self.robot)
        );

        Ok(Plan {
            mode: self.params.mode,
            start: *start,
            order,
            legs,
            queue,
        })
    }

    /// Plan a single leg with the configured algorithm.
    ///
    /// `first_leg` tells the synthesiser the robot is not facing an obstacle it has just
    /// scanned.
    fn plan_leg(&self, start: &Pose, target: &Pose, first_leg: bool) -> Result<Vec<Command>, NavError> {
        match self.params.mode {
            PlannerMode::HybridAStar => {
                let turn_cost = self
                    .params
                    .turn_cost
                    .unwrap_or(2.0 * self.robot.turn_radius_cm);

                HybridAStar::new(
                    &self.grid,
                    self.robot,
                    turn_cost,
                    self.params.turn_check_granularity,
                )
                .plan(start, target)
            }
            PlannerMode::Quadrant => QuadrantSynth::new(
                self.robot,
                self.safety_width_cm,
                self.params.max_synth_iterations,
            )
            .synthesize(start, target, first_leg),
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
