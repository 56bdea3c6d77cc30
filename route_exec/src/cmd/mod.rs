//! # Motion commands
//!
//! A plan is a FIFO of [`Command`]s. Each command is a pure function of the pose it is applied
//! to, and has a duration (and so a number of execution ticks) fixed by the robot's kinematics.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
pub use params::RobotParams;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

use crate::loc::{snap_heading, Pose};
use util::time::seconds_to_ticks;

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

/// A single primitive motion (or pause) of the robot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Drive along an arc of the turning circle.
    ///
    /// A positive `delta_rad` turns the heading anticlockwise. With `reverse` set the robot
    /// drives backwards along the arc.
    Turn { delta_rad: f64, reverse: bool },

    /// Drive straight along the current heading, backwards if `dist_cm` is negative.
    Straight { dist_cm: f64 },

    /// Stay still while the target is scanned.
    Scan { duration_s: f64 },
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An ordered FIFO of commands awaiting execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandQueue(VecDeque<Command>);

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Command {
    pub fn turn(delta_rad: f64, reverse: bool) -> Self {
        Command::Turn { delta_rad, reverse }
    }

    pub fn straight(dist_cm: f64) -> Self {
        Command::Straight { dist_cm }
    }

    pub fn scan(duration_s: f64) -> Self {
        Command::Scan { duration_s }
    }

    /// Get the pose reached by executing this command from `pose`.
    pub fn apply(&self, pose: &Pose, robot: &RobotParams) -> Pose {
        match *self {
            Command::Turn { delta_rad, reverse } => {
                apply_turn(pose, delta_rad, reverse, robot.turn_radius_cm)
            }
            Command::Straight { dist_cm } => apply_straight(pose, dist_cm),
            Command::Scan { .. } => *pose,
        }
    }

    /// Time taken to execute this command.
    ///
    /// Units: seconds
    pub fn duration_s(&self, robot: &RobotParams) -> f64 {
        match *self {
            Command::Turn { delta_rad, .. } => {
                delta_rad.abs() * robot.length_cm / (robot.speed_cms * robot.turn_factor())
            }
            Command::Straight { dist_cm } => dist_cm.abs() / robot.speed_cms,
            Command::Scan { duration_s } => duration_s.max(0.0),
        }
    }

    /// Number of execution ticks this command occupies.
    pub fn total_ticks(&self, robot: &RobotParams) -> u64 {
        seconds_to_ticks(self.duration_s(robot), robot.tick_rate_hz)
    }

    /// The motion performed during a single tick when this command is spread over `total_ticks`.
    ///
    /// Returns `None` for commands which do not move the robot.
    pub fn tick_increment(&self, total_ticks: u64) -> Option<Command> {
        if total_ticks == 0 {
            return None;
        }
        let n = total_ticks as f64;

        match *self {
            Command::Turn { delta_rad, reverse } => Some(Command::turn(delta_rad / n, reverse)),
            Command::Straight { dist_cm } => Some(Command::straight(dist_cm / n)),
            Command::Scan { .. } => None,
        }
    }

    pub fn is_turn(&self) -> bool {
        matches!(self, Command::Turn { .. })
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Turn { delta_rad, reverse } => write!(
                f,
                "Turn({:.1} deg, {})",
                delta_rad.to_degrees(),
                if *reverse { "reverse" } else { "forward" }
            ),
            Command::Straight { dist_cm } => write!(f, "Straight({:.2} cm)", dist_cm),
            Command::Scan { duration_s } => write!(f, "Scan({:.2} s)", duration_s),
        }
    }
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_back(&mut self, cmd: Command) {
        self.0.push_back(cmd)
    }

    pub fn pop_front(&mut self) -> Option<Command> {
        self.0.pop_front()
    }

    pub fn front(&self) -> Option<&Command> {
        self.0.front()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Command> {
        self.0.iter()
    }

    /// Total execution time of every command in the queue.
    ///
    /// Units: seconds
    pub fn duration_s(&self, robot: &RobotParams) -> f64 {
        self.0.iter().map(|c| c.duration_s(robot)).sum()
    }

    /// Pose reached by executing every command in order from `start`.
    pub fn replay(&self, start: &Pose, robot: &RobotParams) -> Pose {
        replay(start, self.0.iter(), robot)
    }
}

impl Extend<Command> for CommandQueue {
    fn extend<I: IntoIterator<Item = Command>>(&mut self, iter: I) {
        self.0.extend(iter)
    }
}

impl From<Vec<Command>> for CommandQueue {
    fn from(cmds: Vec<Command>) -> Self {
        Self(cmds.into())
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Apply a sequence of commands in order, returning the final pose.
pub fn replay<'a, I>(start: &Pose, cmds: I, robot: &RobotParams) -> Pose
where
    I: IntoIterator<Item = &'a Command>,
{
    cmds.into_iter()
        .fold(*start, |pose, cmd| cmd.apply(&pose, robot))
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn apply_straight(pose: &Pose, dist_cm: f64) -> Pose {
    let (ux, uy) = match pose.direction() {
        Some(d) => d.unit_vector(),
        None => (pose.heading_rad.cos(), -pose.heading_rad.sin()),
    };

    Pose {
        position_cm: pose.position_cm + nalgebra::Vector2::new(ux, uy) * dist_cm,
        heading_rad: pose.heading_rad,
    }
}

fn apply_turn(pose: &Pose, delta_rad: f64, reverse: bool, radius_cm: f64) -> Pose {
    let theta = pose.heading_rad;

    let dx = radius_cm * ((theta + delta_rad).sin() - theta.sin());
    let dy = radius_cm * ((theta + delta_rad).cos() - theta.cos());

    // The centre of the turning circle is on the left when the heading increases going forwards,
    // or decreases going backwards.
    let centre_left = (delta_rad >= 0.0) != reverse;

    let (x, y) = if centre_left {
        (pose.x() + dx, pose.y() + dy)
    } else {
        (pose.x() - dx, pose.y() - dy)
    };

    Pose {
        position_cm: nalgebra::Point2::new(x, y),
        heading_rad: snap_heading(theta + delta_rad),
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::loc::Direction;
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_straight() {
        let robot = RobotParams::default();
        let start = Pose::new(50.0, 50.0, Direction::Top);

        let fwd = Command::straight(30.0).apply(&start, &robot);
        assert!(fwd.approx_eq(&Pose::new(50.0, 20.0, Direction::Top), 1e-12));

        let back = Command::straight(-30.0).apply(&fwd, &robot);
        assert!(back.approx_eq(&start, 1e-12));

        for d in Direction::ALL.iter() {
            let p = Pose::new(100.0, 100.0, *d);
            let q = Command::straight(-17.5).apply(&Command::straight(17.5).apply(&p, &robot), &robot);
            assert_eq!(p, q);
        }

        // Off-cardinal headings follow the trig path
        let diag = Pose::from_heading(0.0, 0.0, FRAC_PI_2 / 2.0);
        let moved = Command::straight(2f64.sqrt()).apply(&diag, &robot);
        assert!((moved.x() - 1.0).abs() < 1e-12);
        assert!((moved.y() + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_turn_geometry() {
        let robot = RobotParams::default();
        let r = robot.turn_radius_cm;
        let start = Pose::new(0.0, 0.0, Direction::Right);

        // Forward left turn moves forward and left, ending facing top
        let p = Command::turn(FRAC_PI_2, false).apply(&start, &robot);
        assert!(p.approx_eq(&Pose::new(r, -r, Direction::Top), 1e-9));
        assert_eq!(p.heading_rad, FRAC_PI_2);

        // Forward right turn
        let p = Command::turn(-FRAC_PI_2, false).apply(&start, &robot);
        assert!(p.approx_eq(&Pose::new(r, r, Direction::Bottom), 1e-9));

        // Reversing with the heading increasing swings backwards to the right
        let p = Command::turn(FRAC_PI_2, true).apply(&start, &robot);
        assert!(p.approx_eq(&Pose::new(-r, r, Direction::Top), 1e-9));

        let p = Command::turn(-FRAC_PI_2, true).apply(&start, &robot);
        assert!(p.approx_eq(&Pose::new(-r, -r, Direction::Bottom), 1e-9));
    }

    #[test]
    fn test_turn_closure() {
        let robot = RobotParams::default();

        for d in Direction::ALL.iter() {
            for &delta in [FRAC_PI_2, -FRAC_PI_2, 2.0 * FRAC_PI_2].iter() {
                for &reverse in [false, true].iter() {
                    let start = Pose::new(100.0, 100.0, *d);
                    let mid = Command::turn(delta, reverse).apply(&start, &robot);
                    let end = Command::turn(-delta, !reverse).apply(&mid, &robot);

                    assert!(
                        end.approx_eq(&start, 1e-9),
                        "{} then undo from {} ended at {}",
                        Command::turn(delta, reverse),
                        start,
                        end
                    );
                    assert_eq!(end.heading_rad, start.heading_rad);
                }
            }
        }
    }

    #[test]
    fn test_random_turns_stay_cardinal() {
        let robot = RobotParams::default();
        let mut rng = StdRng::seed_from_u64(0x5eed);

        for _ in 0..1000 {
            let mut pose = Pose::new(100.0, 100.0, Direction::Top);
            for _ in 0..20 {
                let delta = if rng.gen_bool(0.5) { FRAC_PI_2 } else { -FRAC_PI_2 };
                let cmd = if rng.gen_bool(0.3) {
                    Command::straight(rng.gen_range(-40.0..40.0))
                } else {
                    Command::turn(delta, rng.gen_bool(0.5))
                };
                pose = cmd.apply(&pose, &robot);

                let d = pose.direction().expect("heading left the cardinal set");
                assert_eq!(pose.heading_rad, d.angle_rad());
            }
        }
    }

    #[test]
    fn test_durations() {
        let robot = RobotParams::default();

        // 40 cm at 100 cm/s
        let s = Command::straight(-40.0);
        assert!((s.duration_s(&robot) - 0.4).abs() < 1e-12);
        assert_eq!(s.total_ticks(&robot), 24);

        // A quarter turn covers pi/2 * R = 47.1 cm of arc
        let t = Command::turn(-FRAC_PI_2, true);
        let expected = FRAC_PI_2 * robot.turn_radius_cm / robot.speed_cms;
        assert!((t.duration_s(&robot) - expected).abs() < 1e-12);
        assert_eq!(t.total_ticks(&robot), 29);

        let scan = Command::scan(0.5);
        assert_eq!(scan.total_ticks(&robot), 30);
        assert_eq!(scan.tick_increment(30), None);
        assert_eq!(Command::straight(0.0).total_ticks(&robot), 0);
    }

    #[test]
    fn test_tick_increments_compose() {
        let robot = RobotParams::default();
        let start = Pose::new(60.0, 120.0, Direction::Left);

        for cmd in [
            Command::straight(33.0),
            Command::turn(FRAC_PI_2, false),
            Command::turn(-FRAC_PI_2, true),
        ]
        .iter()
        {
            let n = cmd.total_ticks(&robot);
            let inc = cmd.tick_increment(n).unwrap();
            let stepped = (0..n).fold(start, |p, _| inc.apply(&p, &robot));

            assert!(stepped.approx_eq(&cmd.apply(&start, &robot), 1e-9));
        }
    }

    #[test]
    fn test_queue() {
        let robot = RobotParams::default();
        let mut queue = CommandQueue::from(vec![
            Command::straight(10.0),
            Command::turn(FRAC_PI_2, false),
        ]);
        queue.push_back(Command::scan(1.0));

        assert_eq!(queue.len(), 3);
        let end = queue.replay(&Pose::new(100.0, 100.0, Direction::Top), &robot);
        assert!(end.approx_eq(&Pose::new(70.0, 60.0, Direction::Left), 1e-9));

        assert_eq!(queue.pop_front(), Some(Command::straight(10.0)));
        assert_eq!(queue.front(), Some(&Command::turn(FRAC_PI_2, false)));
    }
}
