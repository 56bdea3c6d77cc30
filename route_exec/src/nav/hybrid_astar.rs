//! # Hybrid A* search
//!
//! Searches a lattice of (cell, cardinal heading) states. Edges are motion primitives (a cell
//! length straight forwards or backwards, or a quarter turn in either sense driving forwards or
//! backwards), applied to the continuous pose of the parent so the path can be replayed exactly.
//!
//! The lattice is anchored on the start pose, so an obstacle's scanning pose usually lies between
//! lattice points. Every expanded state facing the goal heading and within reach of the goal is
//! offered a closing manoeuvre: a lateral shift made of two opposite partial turns, then a straight
//! of arbitrary length along the approach axis. Reaching the goal through a closing manoeuvre is
//! queued as a terminal entry, so the search still returns the cheapest route.
//!
//! The heuristic is the straight line distance to the goal. Straight edges cost their length and
//! turn edges a fixed cost no smaller than the chord of the arc, so the heuristic never
//! overestimates.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use log::{debug, trace};
use ordered_float::NotNan;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::f64::consts::FRAC_PI_2;

use super::NavError;
use crate::cmd::{replay, Command, RobotParams};
use crate::loc::{Direction, Pose};
use crate::map::{CellIndex, Grid, GEOM_EPS};

// -----------------------------------------------------------------------------------------------
// CONSTANTS
// -----------------------------------------------------------------------------------------------

/// Distance within which a closing manoeuvre must land on the goal.
///
/// Units: centimeters
const CLOSING_ARRIVAL_TOL_CM: f64 = 1e-6;

// -----------------------------------------------------------------------------------------------
// STRUCTS
// -----------------------------------------------------------------------------------------------

/// Lattice search planner.
///
/// The planner owns a private copy of the grid, so the caller's grid is never modified by a
/// search.
#[derive(Debug, Clone)]
pub struct HybridAStar {
    grid: Grid,
    robot: RobotParams,

    /// Primitives tried from every state, with their edge cost.
    primitives: Vec<(Command, f64)>,

    /// Cost of a quarter turn, partial turns are charged in proportion.
    turn_cost: f64,

    /// Largest distance along the approach axis a closing manoeuvre may cover.
    ///
    /// Units: centimeters
    closing_reach_cm: f64,

    /// Number of sections a turn arc is split into when checking it for collisions.
    turn_check_granularity: usize,
}

/// A state in the lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct SearchKey {
    cell: CellIndex,
    heading: Direction,
}

/// An entry in the open set.
#[derive(Debug, Clone, Copy)]
struct Frontier {
    /// Cost so far plus heuristic.
    priority: NotNan<f64>,

    /// Insertion order, so that equal priorities pop first-in first-out.
    seq: u64,

    key: SearchKey,
    pose: Pose,
    cost: f64,

    /// Set on entries that reach the goal through the closing manoeuvre stored for `key`.
    closing: bool,
}

/// Statistics of a single search.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchReport {
    pub num_expanded: usize,
    pub num_queued: usize,
}

// -----------------------------------------------------------------------------------------------
// IMPLS
// -----------------------------------------------------------------------------------------------

impl HybridAStar {
    /// Create a new planner over a copy of `grid`.
    ///
    /// Straight primitives are one cell long, turns cost `turn_cost` and are checked at
    /// `turn_check_granularity - 1` intermediate points along the arc.
    pub fn new(
        grid: &Grid,
        robot: RobotParams,
        turn_cost: f64,
        turn_check_granularity: usize,
    ) -> Self {
        let step = grid.arena().cell_length_cm;

        let primitives = vec![
            (Command::straight(step), step),
            (Command::straight(-step), step),
            (Command::turn(FRAC_PI_2, false), turn_cost),
            (Command::turn(-FRAC_PI_2, false), turn_cost),
            (Command::turn(FRAC_PI_2, true), turn_cost),
            (Command::turn(-FRAC_PI_2, true), turn_cost),
        ];

        Self {
            grid: grid.clone(),
            robot,
            primitives,
            turn_cost,
            closing_reach_cm: 2.0 * robot.turn_radius_cm + 2.0 * step,
            turn_check_granularity: turn_check_granularity.max(1),
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Find the cheapest sequence of primitives from `start` to `goal`.
    ///
    /// An empty sequence means the start is already on the goal.
    pub fn plan(&self, start: &Pose, goal: &Pose) -> Result<Vec<Command>, NavError> {
        self.plan_with_report(start, goal).map(|(cmds, _)| cmds)
    }

    /// As [`HybridAStar::plan`], also returning the search statistics.
    pub fn plan_with_report(
        &self,
        start: &Pose,
        goal: &Pose,
    ) -> Result<(Vec<Command>, SearchReport), NavError> {
        let start_key = self
            .key(start)?
            .ok_or_else(|| NavError::PointOutsideMap("start".into(), *start))?;

        // A goal off the grid or inside a keep-out region can never be reached
        match self.key(goal)? {
            Some(_) if self.grid.is_position_valid(goal.x(), goal.y()) => (),
            _ => {
                debug!("Goal {} is not a valid position", goal);
                return Err(NavError::NoPathToTarget);
            }
        }

        let mut report = SearchReport::default();
        let mut best_cost: HashMap<SearchKey, f64> = HashMap::new();
        let mut parents: HashMap<SearchKey, (SearchKey, Command)> = HashMap::new();
        let mut closings: HashMap<SearchKey, Vec<Command>> = HashMap::new();
        let mut open = BinaryHeap::new();
        let mut seq = 0u64;

        best_cost.insert(start_key, 0.0);
        open.push(Frontier {
            priority: not_nan(start.distance_to(goal))?,
            seq,
            key: start_key,
            pose: *start,
            cost: 0.0,
            closing: false,
        });

        while let Some(current) = open.pop() {
            if current.closing {
                let mut cmds = reconstruct(&parents, start_key, current.key);
                cmds.extend(closings.remove(&current.key).unwrap_or_default());
                debug!(
                    "Path found: {} commands, cost {:.2}, {} states expanded, {} queued",
                    cmds.len(),
                    current.cost,
                    report.num_expanded,
                    report.num_queued
                );
                return Ok((cmds, report));
            }

            // Stale entry, a cheaper route to this state was queued after it
            if current.cost > best_cost.get(&current.key).copied().unwrap_or(std::f64::INFINITY) {
                continue;
            }

            report.num_expanded += 1;

            if let Some((tail, tail_cost)) = self.closing(&current.pose, goal) {
                let cost = current.cost + tail_cost;
                trace!(
                    "Closing from {} with {} commands at cost {:.2}",
                    current.pose,
                    tail.len(),
                    cost
                );

                closings.insert(current.key, tail);
                seq += 1;
                open.push(Frontier {
                    priority: not_nan(cost)?,
                    seq,
                    key: current.key,
                    pose: *goal,
                    cost,
                    closing: true,
                });
            }

            for (cmd, edge_cost) in self.primitives.iter() {
                let next = match self.expand(&current.pose, cmd) {
                    Some(p) => p,
                    None => continue,
                };
                let next_key = match self.key(&next)? {
                    Some(k) => k,
                    None => continue,
                };

                let cost = current.cost + edge_cost;
                let known = best_cost.get(&next_key).copied().unwrap_or(std::f64::INFINITY);
                if cost < known {
                    trace!("Queue {} via {} at cost {:.2}", next, cmd, cost);

                    best_cost.insert(next_key, cost);
                    parents.insert(next_key, (current.key, *cmd));

                    seq += 1;
                    report.num_queued += 1;
                    open.push(Frontier {
                        priority: not_nan(cost + next.distance_to(goal))?,
                        seq,
                        key: next_key,
                        pose: next,
                        cost,
                        closing: false,
                    });
                }
            }
        }

        debug!(
            "Search exhausted after expanding {} states",
            report.num_expanded
        );

        Err(NavError::NoPathToTarget)
    }

    /// Apply a primitive to `pose`, returning the new pose if the motion is feasible.
    fn expand(&self, pose: &Pose, cmd: &Command) -> Option<Pose> {
        self.sweep(pose, cmd)
            .filter(|next| self.grid.is_pose_valid(next))
    }

    /// Apply any command to `pose`, returning the end pose if the motion is clear.
    fn sweep(&self, pose: &Pose, cmd: &Command) -> Option<Pose> {
        self.grid
            .sweep(pose, cmd, &self.robot, self.turn_check_granularity)
    }

    /// Find the cheapest collision free manoeuvre taking `pose` exactly onto `goal`, with its
    /// cost.
    ///
    /// Only poses already facing the goal heading, less than a cell to the side of the approach
    /// axis and within `closing_reach_cm` along it are considered.
    fn closing(&self, pose: &Pose, goal: &Pose) -> Option<(Vec<Command>, f64)> {
        let heading = pose.direction()?;
        if goal.direction() != Some(heading) {
            return None;
        }

        let (ux, uy) = heading.unit_vector();
        let (dx, dy) = (goal.x() - pose.x(), goal.y() - pose.y());
        let forward = dx * ux + dy * uy;
        let lateral = dx * uy - dy * ux;

        let r = self.robot.turn_radius_cm;
        let step = self.grid.arena().cell_length_cm;
        if lateral.abs() > step + GEOM_EPS || forward.abs() > self.closing_reach_cm {
            return None;
        }

        let straight = |dist_cm: f64| {
            if dist_cm.abs() < GEOM_EPS {
                None
            } else {
                Some(Command::straight(dist_cm))
            }
        };

        let mut candidates: Vec<Vec<Command>> = Vec::new();

        if lateral.abs() < GEOM_EPS {
            candidates.push(straight(forward).into_iter().collect());
        } else {
            // Two opposite turns of `phi` shift the robot sideways by 2R(1 - cos phi). The sense
            // of the shift is found by replaying each variant.
            let phi = (1.0 - lateral.abs() / (2.0 * r)).acos();

            for &reverse in [false, true].iter() {
                for &sense in [1.0, -1.0].iter() {
                    let shift = [
                        Command::turn(sense * phi, reverse),
                        Command::turn(-sense * phi, reverse),
                    ];
                    let end = replay(pose, shift.iter(), &self.robot);
                    let advance = (end.x() - pose.x()) * ux + (end.y() - pose.y()) * uy;
                    let rest = straight(forward - advance);

                    candidates.push(shift.iter().copied().chain(rest).collect());
                    candidates.push(rest.into_iter().chain(shift.iter().copied()).collect());
                }
            }
        }

        candidates
            .into_iter()
            .filter(|cmds| self.lands_on(pose, cmds, goal))
            .map(|cmds| {
                let cost: f64 = cmds.iter().map(|c| self.closing_cost(c)).sum();
                (cmds, cost)
            })
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal))
    }

    /// True if `cmds` can be driven from `pose` without collision and end on `goal`.
    fn lands_on(&self, pose: &Pose, cmds: &[Command], goal: &Pose) -> bool {
        let mut current = *pose;
        for cmd in cmds.iter() {
            current = match self.sweep(&current, cmd) {
                Some(p) => p,
                None => return false,
            };
        }

        current.approx_eq(goal, CLOSING_ARRIVAL_TOL_CM)
    }

    fn closing_cost(&self, cmd: &Command) -> f64 {
        match *cmd {
            Command::Straight { dist_cm } => dist_cm.abs(),
            Command::Turn { delta_rad, .. } => self.turn_cost * delta_rad.abs() / FRAC_PI_2,
            Command::Scan { .. } => 0.0,
        }
    }

    /// Get the lattice state of a pose, `None` if it is off the grid.
    fn key(&self, pose: &Pose) -> Result<Option<SearchKey>, NavError> {
        let heading = pose
            .direction()
            .ok_or(NavError::NonCardinalHeading(*pose))?;

        Ok(self
            .grid
            .cell_index(pose.x(), pose.y())
            .map(|cell| SearchKey { cell, heading }))
    }
}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        // Flipped so the max-heap pops the lowest priority, then the earliest inserted
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Frontier {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Frontier {}

// -----------------------------------------------------------------------------------------------
// FUNCTIONS
// -----------------------------------------------------------------------------------------------

fn not_nan(value: f64) -> Result<NotNan<f64>, NavError> {
    NotNan::new(value).map_err(|_| NavError::InvalidCost)
}

/// Walk the parent links back from the goal, returning the commands in execution order.
fn reconstruct(
    parents: &HashMap<SearchKey, (SearchKey, Command)>,
    start: SearchKey,
    goal: SearchKey,
) -> Vec<Command> {
    let mut cmds = Vec::new();
    let mut key = goal;

    while key != start {
        match parents.get(&key) {
            Some((parent, cmd)) => {
                cmds.push(*cmd);
                key = *parent;
            }
            None => break,
        }
    }

    cmds.reverse();
    cmds
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------
