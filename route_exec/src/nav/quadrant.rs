//! # Quadrant manoeuvre synthesis
//!
//! Builds the command sequence to a target pose in closed form, without searching. The target is
//! expressed in the robot frame (`+x` to the robot's right, `+y` ahead) and the quadrant it falls
//! in selects a fixed manoeuvre pattern whose segment lengths come from the current offset.
//!
//! Patterns assume the target must be approached facing the same way as the robot. Any other
//! relative heading is first reduced to that case by quarter turns. The offset is updated in
//! closed form after every emitted command, so each segment length is computed from where the
//! robot will actually be.
//!
//! No obstacle checks are made; clearance comes from the safety width built into the patterns.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{debug, trace};
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, PI};

use super::NavError;
use crate::cmd::{Command, RobotParams};
use crate::loc::{Pose, CARDINAL_SNAP_TOLERANCE_RAD};
use util::maths::{get_ang_dist, sign, wrap_pi};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Offsets smaller than this are treated as zero.
///
/// Units: centimeters
const ZERO_TOL_CM: f64 = 1e-6;

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

/// Quadrant of the robot frame containing the target.
///
/// Points on the forward axis belong to `First`, points on the lateral axis to `First` (right)
/// or `Second` (left), and points straight behind to `Fourth`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Quadrant {
    /// Ahead and to the right
    First,
    /// Ahead and to the left
    Second,
    /// Behind and to the left
    Third,
    /// Behind and to the right
    Fourth,
}

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

/// Target pose relative to the robot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Offset {
    /// Distance to the robot's right.
    ///
    /// Units: centimeters
    pub x_cm: f64,

    /// Distance ahead of the robot.
    ///
    /// Units: centimeters
    pub y_cm: f64,

    /// Target heading minus robot heading, wrapped into `(-pi, pi]`.
    ///
    /// Units: radians
    pub heading_rad: f64,
}

/// Closed-form manoeuvre synthesiser.
#[derive(Debug, Clone)]
pub struct QuadrantSynth {
    robot: RobotParams,

    /// Clearance kept from the obstacle when manoeuvring around it.
    ///
    /// Units: centimeters
    safety_width_cm: f64,

    /// Maximum number of pattern emissions before giving up.
    max_iterations: usize,
}

/// A command sequence under construction, with the pose and offset it leads to.
struct Sketch<'a> {
    robot: &'a RobotParams,
    pose: Pose,
    offset: Offset,
    cmds: Vec<Command>,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl Offset {
    /// Express `target` in the frame of a robot at `bot`.
    pub fn wrt_bot(bot: &Pose, target: &Pose) -> Self {
        // Map frame `+Y` is down, flip it so both axes are right-handed
        let dx = target.x() - bot.x();
        let dy = -(target.y() - bot.y());
        let (sin, cos) = bot.heading_rad.sin_cos();

        Self {
            x_cm: dx * sin - dy * cos,
            y_cm: dx * cos + dy * sin,
            heading_rad: get_ang_dist(bot.heading_rad, target.heading_rad),
        }
    }

    /// The offset seen after the robot executes `cmd`.
    pub fn after(&self, cmd: &Command, robot: &RobotParams) -> Self {
        match *cmd {
            Command::Straight { dist_cm } => Self {
                y_cm: self.y_cm - dist_cm,
                ..*self
            },
            Command::Turn { delta_rad, reverse } => {
                let r = robot.turn_radius_cm;
                let angle = delta_rad.abs();

                // Robot displacement in its own starting frame
                let centre_left = (delta_rad >= 0.0) != reverse;
                let lateral = if centre_left { -r } else { r };
                let forward = if reverse { -r } else { r };
                let px = lateral * (1.0 - angle.cos());
                let py = forward * angle.sin();

                // Then rotate into the new heading
                let rx = self.x_cm - px;
                let ry = self.y_cm - py;
                let (sin, cos) = delta_rad.sin_cos();

                Self {
                    x_cm: rx * cos + ry * sin,
                    y_cm: -rx * sin + ry * cos,
                    heading_rad: wrap_pi(self.heading_rad - delta_rad),
                }
            }
            Command::Scan { .. } => *self,
        }
    }

    pub fn quadrant(&self) -> Quadrant {
        let right = self.x_cm >= -ZERO_TOL_CM;

        match (self.y_cm >= -ZERO_TOL_CM, right) {
            (true, true) => Quadrant::First,
            (true, false) => Quadrant::Second,
            (false, false) => Quadrant::Third,
            (false, true) => Quadrant::Fourth,
        }
    }

    /// True if the robot already faces the same way as the target.
    pub fn is_aligned(&self) -> bool {
        self.heading_rad.abs() <= CARDINAL_SNAP_TOLERANCE_RAD
    }

    /// True if the robot is at the target and facing the same way.
    pub fn is_arrived(&self) -> bool {
        self.x_cm.abs() < ZERO_TOL_CM && self.y_cm.abs() < ZERO_TOL_CM && self.is_aligned()
    }
}

impl<'a> Sketch<'a> {
    fn new(robot: &'a RobotParams, start: &Pose, target: &Pose) -> Self {
        Self {
            robot,
            pose: *start,
            offset: Offset::wrt_bot(start, target),
            cmds: Vec::new(),
        }
    }

    fn emit(&mut self, cmd: Command) {
        self.pose = cmd.apply(&self.pose, self.robot);
        self.offset = self.offset.after(&cmd, self.robot);
        trace!("    {} -> {}", cmd, self.pose);
        self.cmds.push(cmd);
    }
}

impl QuadrantSynth {
    pub fn new(robot: RobotParams, safety_width_cm: f64, max_iterations: usize) -> Self {
        Self {
            robot,
            safety_width_cm,
            max_iterations,
        }
    }

    /// Build the command sequence taking the robot from `start` to `target`.
    ///
    /// `is_start` is true when the robot is free to drive straight ahead. It is false when the
    /// robot has just scanned an obstacle and so is facing it at one safety width, in which case
    /// the robot first backs away around it.
    pub fn synthesize(
        &self,
        start: &Pose,
        target: &Pose,
        is_start: bool,
    ) -> Result<Vec<Command>, NavError> {
        if start.direction().is_none() {
            return Err(NavError::NonCardinalHeading(*start));
        }
        if target.direction().is_none() {
            return Err(NavError::NonCardinalHeading(*target));
        }

        let mut sketch = Sketch::new(&self.robot, start, target);
        let mut is_start = is_start;
        let mut iterations = 0;

        loop {
            if sketch.offset.is_arrived() {
                debug!(
                    "Synthesised {} commands from {} to {}",
                    sketch.cmds.len(),
                    start,
                    target
                );
                return Ok(sketch.cmds);
            }

            if iterations >= self.max_iterations {
                return Err(NavError::SynthesisDidNotConverge(iterations));
            }
            iterations += 1;

            if !sketch.offset.is_aligned() {
                self.align(&mut sketch, is_start);
                is_start = true;
                continue;
            }

            match sketch.offset.quadrant() {
                q @ Quadrant::First | q @ Quadrant::Second => {
                    if is_start {
                        self.direct(&mut sketch, q);
                    } else {
                        self.avoid(&mut sketch, q);
                        is_start = true;
                    }
                }
                q @ Quadrant::Third | q @ Quadrant::Fourth => self.s_curve(&mut sketch, q),
            }
        }
    }

    /// Quarter turn towards the target's heading.
    ///
    /// When the target faces the opposite way the turn is made towards the target's side. The
    /// turn is made in reverse if the robot is blocked ahead or the target is behind.
    fn align(&self, sketch: &mut Sketch, is_start: bool) {
        let offset = sketch.offset;

        let delta = if get_ang_dist(offset.heading_rad, PI).abs() <= CARDINAL_SNAP_TOLERANCE_RAD {
            if offset.x_cm >= 0.0 {
                -FRAC_PI_2
            } else {
                FRAC_PI_2
            }
        } else {
            sign(offset.heading_rad) * FRAC_PI_2
        };
        let reverse = !is_start || offset.y_cm < 0.0;

        trace!("Align with offset {:?}", offset);
        sketch.emit(Command::turn(delta, reverse));
    }

    /// Back away from the obstacle just scanned, moving sideways by one safety width.
    fn avoid(&self, sketch: &mut Sketch, quadrant: Quadrant) {
        let s = side_sign(quadrant);
        let w = self.safety_width_cm;

        trace!("Avoid with offset {:?}", sketch.offset);
        sketch.emit(Command::turn(s * FRAC_PI_2, true));
        sketch.emit(Command::straight(-w));
        sketch.emit(Command::turn(-s * FRAC_PI_2, false));
        sketch.emit(Command::straight(w));
    }

    /// Target ahead: sidestep across to its line then drive up to it.
    fn direct(&self, sketch: &mut Sketch, quadrant: Quadrant) {
        let s = side_sign(quadrant);
        let r = self.robot.turn_radius_cm;

        trace!("Direct with offset {:?}", sketch.offset);
        sketch.emit(Command::straight(r));
        sketch.emit(Command::turn(s * FRAC_PI_2, true));
        sketch.emit(Command::straight(sketch.offset.y_cm - r));
        sketch.emit(Command::turn(-s * FRAC_PI_2, false));
        sketch.emit(Command::straight(sketch.offset.y_cm));
    }

    /// Target behind: reverse out facing across, loop round, and come up behind it.
    fn s_curve(&self, sketch: &mut Sketch, quadrant: Quadrant) {
        // The first reverse turn swings the robot to face the target's side
        let s = -side_sign(quadrant);
        let r = self.robot.turn_radius_cm;
        let w = self.safety_width_cm;

        trace!("S-curve with offset {:?}", sketch.offset);
        sketch.emit(Command::turn(s * FRAC_PI_2, true));
        sketch.emit(Command::straight(sketch.offset.y_cm - (w + r)));
        sketch.emit(Command::turn(s * FRAC_PI_2, false));
        sketch.emit(Command::straight(sketch.offset.y_cm));
        sketch.emit(Command::turn(-s * FRAC_PI_2, false));
        sketch.emit(Command::straight(sketch.offset.y_cm - r));
        sketch.emit(Command::turn(-s * FRAC_PI_2, false));
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// `+1` for quadrants on the robot's right, `-1` for those on its left.
fn side_sign(quadrant: Quadrant) -> f64 {
    match quadrant {
        Quadrant::First | Quadrant::Fourth => 1.0,
        Quadrant::Second | Quadrant::Third => -1.0,
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::cmd::replay;
    use crate::loc::Direction;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn synth() -> QuadrantSynth {
        QuadrantSynth::new(RobotParams::default(), 20.0, 6)
    }

    fn offset_err(a: &Offset, b: &Offset) -> f64 {
        (a.x_cm - b.x_cm)
            .abs()
            .max((a.y_cm - b.y_cm).abs())
            .max(get_ang_dist(a.heading_rad, b.heading_rad).abs())
    }

    #[test]
    fn test_wrt_bot() {
        // Robot facing up the arena, target ahead and to the right
        let bot = Pose::new(100.0, 150.0, Direction::Top);
        let o = Offset::wrt_bot(&bot, &Pose::new(160.0, 60.0, Direction::Top));
        assert!((o.x_cm - 60.0).abs() < 1e-9);
        assert!((o.y_cm - 90.0).abs() < 1e-9);
        assert!(o.heading_rad.abs() < 1e-12);

        // Robot facing right, target below it is on its right
        let bot = Pose::new(100.0, 100.0, Direction::Right);
        let o = Offset::wrt_bot(&bot, &Pose::new(90.0, 130.0, Direction::Left));
        assert!((o.x_cm - 30.0).abs() < 1e-9);
        assert!((o.y_cm + 10.0).abs() < 1e-9);
        assert!((o.heading_rad - PI).abs() < 1e-12);
        assert_eq!(o.quadrant(), Quadrant::Fourth);
    }

    #[test]
    fn test_quadrant() {
        let q = |x, y| {
            Offset {
                x_cm: x,
                y_cm: y,
                heading_rad: 0.0,
            }
            .quadrant()
        };

        assert_eq!(q(10.0, 10.0), Quadrant::First);
        assert_eq!(q(-10.0, 10.0), Quadrant::Second);
        assert_eq!(q(-10.0, -10.0), Quadrant::Third);
        assert_eq!(q(10.0, -10.0), Quadrant::Fourth);
        assert_eq!(q(0.0, 10.0), Quadrant::First);
        assert_eq!(q(1e-9, 10.0), Quadrant::First);
        assert_eq!(q(-1e-9, 10.0), Quadrant::First);
        assert_eq!(q(0.0, -10.0), Quadrant::Fourth);
        assert_eq!(q(-10.0, 0.0), Quadrant::Second);
    }

    #[test]
    fn test_direct_pattern() {
        let robot = RobotParams::default();
        let start = Pose::new(100.0, 150.0, Direction::Top);
        let target = Pose::new(160.0, 60.0, Direction::Top);

        let cmds = synth().synthesize(&start, &target, true).unwrap();

        assert_eq!(cmds.len(), 5);
        assert_eq!(cmds[0], Command::straight(robot.turn_radius_cm));
        assert_eq!(cmds[1], Command::turn(FRAC_PI_2, true));
        assert_eq!(cmds[3], Command::turn(-FRAC_PI_2, false));
        assert!(replay(&start, cmds.iter(), &robot).approx_eq(&target, 1e-6));
    }

    #[test]
    fn test_s_curve_pattern() {
        let robot = RobotParams::default();
        let start = Pose::new(100.0, 60.0, Direction::Top);
        let target = Pose::new(70.0, 160.0, Direction::Top);

        let cmds = synth().synthesize(&start, &target, true).unwrap();

        assert_eq!(cmds.len(), 7);
        assert_eq!(cmds[0], Command::turn(FRAC_PI_2, true));
        assert_eq!(cmds.iter().filter(|c| c.is_turn()).count(), 4);
        assert!(replay(&start, cmds.iter(), &robot).approx_eq(&target, 1e-6));
    }

    #[test]
    fn test_avoidance_when_blocked() {
        let robot = RobotParams::default();
        let start = Pose::new(100.0, 150.0, Direction::Top);
        let target = Pose::new(160.0, 60.0, Direction::Top);

        let cmds = synth().synthesize(&start, &target, false).unwrap();

        assert_eq!(&cmds[..2], &[Command::turn(FRAC_PI_2, true), Command::straight(-20.0)]);
        assert!(replay(&start, cmds.iter(), &robot).approx_eq(&target, 1e-6));
    }

    #[test]
    fn test_already_at_target() {
        let start = Pose::new(100.0, 150.0, Direction::Left);
        assert_eq!(synth().synthesize(&start, &start, false), Ok(Vec::new()));
    }

    #[test]
    fn test_non_cardinal() {
        let start = Pose::from_heading(100.0, 150.0, 0.7);
        let target = Pose::new(100.0, 100.0, Direction::Left);

        assert!(matches!(
            synth().synthesize(&start, &target, true),
            Err(NavError::NonCardinalHeading(_))
        ));
    }

    #[test]
    fn test_iteration_limit() {
        let start = Pose::new(100.0, 60.0, Direction::Top);
        let target = Pose::new(70.0, 160.0, Direction::Right);

        assert_eq!(
            QuadrantSynth::new(RobotParams::default(), 20.0, 1).synthesize(&start, &target, true),
            Err(NavError::SynthesisDidNotConverge(1))
        );
    }

    /// Every intermediate offset tracked by the synthesiser must agree with the offset
    /// recomputed from the replayed pose, and every case must arrive.
    #[test]
    fn test_random_cases_arrive() {
        let robot = RobotParams::default();
        let synth = synth();
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..2000 {
            let start = Pose::new(
                rng.gen_range(20.0..180.0),
                rng.gen_range(20.0..180.0),
                Direction::ALL[rng.gen_range(0..4usize)],
            );
            let target = Pose::new(
                rng.gen_range(20.0..180.0),
                rng.gen_range(20.0..180.0),
                Direction::ALL[rng.gen_range(0..4usize)],
            );
            let is_start = rng.gen_bool(0.5);

            let cmds = synth.synthesize(&start, &target, is_start).unwrap();

            let mut pose = start;
            let mut offset = Offset::wrt_bot(&start, &target);
            for cmd in cmds.iter() {
                pose = cmd.apply(&pose, &robot);
                offset = offset.after(cmd, &robot);

                assert!(pose.direction().is_some());
                assert!(offset_err(&offset, &Offset::wrt_bot(&pose, &target)) < 1e-6);
            }

            assert!(
                pose.approx_eq(&target, 1e-6),
                "{} to {} (is_start {}) ended at {}",
                start,
                target,
                is_start,
                pose
            );
        }
    }
}
