//! Occupancy grid over the arena

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::debug;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use super::{ArenaParams, MapError, Obstacle, GEOM_EPS};
use crate::cmd::{Command, RobotParams};
use crate::loc::Pose;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Index of a cell in the grid.
///
/// Rows are counted from the bottom of the arena upwards and columns from the left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellIndex {
    pub row: usize,
    pub col: usize,
}

/// A single grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub index: CellIndex,

    /// Centre of the cell in the map frame.
    ///
    /// Units: centimeters
    pub centre_cm: Point2<f64>,

    /// True if the robot may not stand at the cell centre.
    pub occupied: bool,
}

/// Occupancy grid covering the arena.
///
/// Cloning a grid produces a fully independent copy, which the searches use as their private
/// working map.
#[derive(Debug, Clone)]
pub struct Grid {
    arena: ArenaParams,
    num_cells: usize,

    /// Nodes stored row-major, row 0 first.
    nodes: Vec<Node>,

    obstacles: Vec<Obstacle>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Grid {
    /// Build the grid for the given arena and obstacles, marking every cell whose centre is
    /// inside a keep-out square or the border band as occupied.
    pub fn new(arena: ArenaParams, obstacles: &[Obstacle]) -> Result<Self, MapError> {
        if !(arena.length_cm > 0.0) || !(arena.cell_length_cm > 0.0) {
            return Err(MapError::InvalidParams(format!(
                "arena length ({}) and cell length ({}) must be positive",
                arena.length_cm, arena.cell_length_cm
            )));
        }

        let num_cells = arena.num_cells();
        if num_cells == 0 {
            return Err(MapError::InvalidParams(format!(
                "cell length {} is larger than the arena",
                arena.cell_length_cm
            )));
        }

        for o in obstacles {
            if !arena.contains(o.centre_cm.x, o.centre_cm.y) {
                return Err(MapError::ObstacleOutsideArena {
                    id: o.id,
                    x_cm: o.centre_cm.x,
                    y_cm: o.centre_cm.y,
                    length_cm: arena.length_cm,
                });
            }
        }

        let mut grid = Self {
            arena,
            num_cells,
            nodes: Vec::with_capacity(num_cells * num_cells),
            obstacles: obstacles.to_vec(),
        };

        for row in 0..num_cells {
            for col in 0..num_cells {
                let index = CellIndex { row, col };
                let centre_cm = grid.cell_centre(index);
                let occupied = !grid.is_position_valid(centre_cm.x, centre_cm.y);

                grid.nodes.push(Node {
                    index,
                    centre_cm,
                    occupied,
                });
            }
        }

        debug!(
            "Built {}x{} grid with {} obstacles, {} cells occupied",
            num_cells,
            num_cells,
            grid.obstacles.len(),
            grid.num_occupied()
        );

        Ok(grid)
    }

    pub fn arena(&self) -> &ArenaParams {
        &self.arena
    }

    /// Number of cells along each side of the grid.
    pub fn num_cells(&self) -> usize {
        self.num_cells
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn num_occupied(&self) -> usize {
        self.nodes.iter().filter(|n| n.occupied).count()
    }

    /// Get the node with the given index, if it is inside the grid.
    pub fn node(&self, index: CellIndex) -> Option<&Node> {
        if index.row >= self.num_cells || index.col >= self.num_cells {
            return None;
        }
        self.nodes.get(index.row * self.num_cells + index.col)
    }

    /// Get the index of the cell containing the given map frame point.
    ///
    /// Points outside `[0, length)` on either axis have no cell.
    pub fn cell_index(&self, x_cm: f64, y_cm: f64) -> Option<CellIndex> {
        let cell = self.arena.cell_length_cm;

        let col = (x_cm / cell).floor();
        let row_from_top = (y_cm / cell).floor();

        let n = self.num_cells as f64;
        if !(col >= 0.0 && col < n && row_from_top >= 0.0 && row_from_top < n) {
            return None;
        }

        Some(CellIndex {
            row: self.num_cells - 1 - row_from_top as usize,
            col: col as usize,
        })
    }

    /// Get the node containing the given map frame point.
    pub fn node_at(&self, x_cm: f64, y_cm: f64) -> Option<&Node> {
        self.cell_index(x_cm, y_cm).and_then(|i| self.node(i))
    }

    /// True if the robot's reference point may stand at the given map frame point: outside every
    /// obstacle's keep-out square and outside the border band.
    pub fn is_position_valid(&self, x_cm: f64, y_cm: f64) -> bool {
        let lower = self.arena.border_safety_cm - GEOM_EPS;
        let upper = self.arena.length_cm - self.arena.border_safety_cm + GEOM_EPS;

        if x_cm < lower || x_cm > upper || y_cm < lower || y_cm > upper {
            return false;
        }

        !self
            .obstacles
            .iter()
            .any(|o| o.within_safety_boundary(x_cm, y_cm))
    }

    /// True if the pose's position is valid and maps onto a grid node.
    pub fn is_pose_valid(&self, pose: &Pose) -> bool {
        self.is_position_valid(pose.x(), pose.y()) && self.node_at(pose.x(), pose.y()).is_some()
    }

    /// Drive `cmd` from `pose`, returning the end pose if every sampled point on the way is
    /// valid.
    ///
    /// Straights are sampled once per cell length travelled and turns at `turn_samples` evenly
    /// spaced points along the arc, the end point included in both.
    pub fn sweep(
        &self,
        pose: &Pose,
        cmd: &Command,
        robot: &RobotParams,
        turn_samples: usize,
    ) -> Option<Pose> {
        self.sample_motion(pose, cmd, robot, turn_samples).ok()
    }

    /// Get the first sampled point along `cmds`, driven from `start`, at which the robot would
    /// stand in an occupied region. Sampling is as for [`Grid::sweep`].
    pub fn first_conflict<'a, I>(
        &self,
        start: &Pose,
        cmds: I,
        robot: &RobotParams,
        turn_samples: usize,
    ) -> Option<Pose>
    where
        I: IntoIterator<Item = &'a Command>,
    {
        let mut pose = *start;

        for cmd in cmds {
            match self.sample_motion(&pose, cmd, robot, turn_samples) {
                Ok(end) => pose = end,
                Err(conflict) => return Some(conflict),
            }
        }

        None
    }

    /// Render the occupancy as text, top row first, `#` for occupied cells.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity((self.num_cells + 1) * self.num_cells);

        for row in (0..self.num_cells).rev() {
            for col in 0..self.num_cells {
                let occupied = self
                    .node(CellIndex { row, col })
                    .map(|n| n.occupied)
                    .unwrap_or(true);
                out.push(if occupied { '#' } else { '.' });
            }
            out.push('\n');
        }

        out
    }

    fn cell_centre(&self, index: CellIndex) -> Point2<f64> {
        let cell = self.arena.cell_length_cm;

        Point2::new(
            cell * (index.col as f64 + 0.5),
            self.arena.length_cm - cell * (index.row as f64 + 0.5),
        )
    }
}

// ---------------------------------------------------------------------------
// PRIVATE IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Grid {
    /// The end pose of `cmd` driven from `pose`, or the first sampled pose which is invalid.
    fn sample_motion(
        &self,
        pose: &Pose,
        cmd: &Command,
        robot: &RobotParams,
        turn_samples: usize,
    ) -> Result<Pose, Pose> {
        let partials: Vec<Command> = match *cmd {
            Command::Straight { dist_cm } => {
                let n = ((dist_cm.abs() / self.arena.cell_length_cm - GEOM_EPS).ceil() as usize)
                    .max(1);
                (1..=n)
                    .map(|i| Command::straight(dist_cm * i as f64 / n as f64))
                    .collect()
            }
            Command::Turn { delta_rad, reverse } => {
                let n = turn_samples.max(1);
                (1..=n)
                    .map(|i| Command::turn(delta_rad * i as f64 / n as f64, reverse))
                    .collect()
            }
            Command::Scan { .. } => Vec::new(),
        };

        for partial in partials.iter() {
            let p = partial.apply(pose, robot);
            if !self.is_position_valid(p.x(), p.y()) {
                return Err(p);
            }
        }

        Ok(cmd.apply(pose, robot))
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::loc::Direction;
    use crate::map::ObstacleParams;
    use std::f64::consts::FRAC_PI_2;

    fn obstacle(x: f64, y: f64) -> Obstacle {
        Obstacle::new(
            0,
            x,
            y,
            Direction::Top,
            &ArenaParams::default(),
            &ObstacleParams::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_node_at() {
        let grid = Grid::new(ArenaParams::default(), &[]).unwrap();
        assert_eq!(grid.num_cells(), 20);

        // Start box centre, bottom left of the arena
        let node = grid.node_at(15.0, 185.0).unwrap();
        assert_eq!(node.index, CellIndex { row: 1, col: 1 });
        assert_eq!(node.centre_cm, Point2::new(15.0, 185.0));

        let node = grid.node_at(0.0, 0.0).unwrap();
        assert_eq!(node.index, CellIndex { row: 19, col: 0 });
        assert_eq!(grid.node_at(199.9, 199.9).unwrap().index, CellIndex { row: 0, col: 19 });

        assert!(grid.node_at(-0.1, 50.0).is_none());
        assert!(grid.node_at(50.0, 200.0).is_none());
        assert!(grid.node_at(200.0, 50.0).is_none());
        assert!(grid.node(CellIndex { row: 20, col: 0 }).is_none());
    }

    #[test]
    fn test_border() {
        let grid = Grid::new(ArenaParams::default(), &[]).unwrap();

        // Border cells (centres at 5) are occupied, the next ring (centres at 15) is free
        assert!(grid.node_at(5.0, 100.0).unwrap().occupied);
        assert!(grid.node_at(195.0, 100.0).unwrap().occupied);
        assert!(!grid.node_at(15.0, 100.0).unwrap().occupied);
        assert!(!grid.node_at(185.0, 185.0).unwrap().occupied);

        assert_eq!(grid.num_occupied(), 20 * 20 - 18 * 18);
    }

    #[test]
    fn test_obstacle_occupancy() {
        let grid = Grid::new(ArenaParams::default(), &[obstacle(105.0, 105.0)]).unwrap();

        // Centre and the cells just inside the keep-out edge
        assert!(grid.node_at(105.0, 105.0).unwrap().occupied);
        assert!(grid.node_at(115.0, 105.0).unwrap().occupied);
        assert!(grid.node_at(95.0, 115.0).unwrap().occupied);

        // Cell centres exactly on the keep-out edge are free
        assert!(!grid.node_at(125.0, 105.0).unwrap().occupied);
        assert!(!grid.node_at(85.0, 85.0).unwrap().occupied);

        assert!(!grid.is_position_valid(124.0, 105.0));
        assert!(grid.is_position_valid(125.0, 105.0));
    }

    #[test]
    fn test_copy_is_independent() {
        let grid = Grid::new(ArenaParams::default(), &[obstacle(100.0, 100.0)]).unwrap();
        let mut copy = grid.clone();
        copy.nodes[0].occupied = false;

        assert!(grid.nodes[0].occupied);
        assert_eq!(copy.obstacles(), grid.obstacles());
    }

    #[test]
    fn test_invalid_params() {
        let mut arena = ArenaParams::default();
        arena.cell_length_cm = 0.0;
        assert!(matches!(Grid::new(arena, &[]), Err(MapError::InvalidParams(_))));

        arena.cell_length_cm = 300.0;
        assert!(matches!(Grid::new(arena, &[]), Err(MapError::InvalidParams(_))));
    }

    #[test]
    fn test_first_conflict() {
        let grid = Grid::new(ArenaParams::default(), &[obstacle(105.0, 105.0)]).unwrap();
        let robot = RobotParams::default();

        // Straight down the arena through the keep-out square, first blocked sample is 10 cm in
        let start = Pose::new(105.0, 165.0, Direction::Top);
        let cmds = [Command::straight(60.0)];
        let conflict = grid.first_conflict(&start, cmds.iter(), &robot, 3).unwrap();
        assert!(conflict.approx_eq(&Pose::new(105.0, 115.0, Direction::Top), 1e-9));
        assert!(grid.sweep(&start, &cmds[0], &robot, 3).is_none());

        // Passing alongside the square is clear
        let start = Pose::new(55.0, 165.0, Direction::Right);
        let cmds = [Command::straight(60.0), Command::turn(FRAC_PI_2, false)];
        assert_eq!(grid.first_conflict(&start, cmds.iter(), &robot, 3), None);
        assert_eq!(
            grid.sweep(&start, &cmds[0], &robot, 3),
            Some(Pose::new(115.0, 165.0, Direction::Right))
        );
    }

    #[test]
    fn test_render() {
        let grid = Grid::new(ArenaParams::default(), &[]).unwrap();
        let text = grid.render();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 20);
        assert_eq!(lines[0], "####################");
        assert_eq!(lines[1], "#..................#");
    }
}
