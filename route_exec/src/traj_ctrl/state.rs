//! Trajectory control module state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{debug, info, warn};
use serde::Serialize;

use super::AbortHandle;
use crate::cmd::{Command, CommandQueue, RobotParams};
use crate::loc::Pose;
use util::module::State;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct TrajCtrl {
    robot: RobotParams,

    /// Executing mode
    mode: TrajCtrlMode,

    /// Live pose of the robot, known once a sequence has been loaded.
    pose: Option<Pose>,

    /// Commands not yet started.
    queue: Option<CommandQueue>,

    /// The command currently being executed.
    active: Option<ActiveCommand>,

    abort: AbortHandle,
    report: StatusReport,
}

/// Progress through a single command.
#[derive(Debug, Clone, Copy)]
struct ActiveCommand {
    cmd: Command,

    /// Motion applied on each tick, `None` for commands which do not move.
    increment: Option<Command>,

    total_ticks: u64,
    ticks_done: u64,

    /// Pose at the start of the command.
    start: Pose,
}

/// Status of the module after a cycle.
#[derive(Debug, Default, Copy, Clone, Serialize)]
pub struct StatusReport {
    pub mode: TrajCtrlMode,

    /// Number of commands completed in the current sequence.
    pub num_cmds_executed: usize,

    /// Number of commands still waiting in the queue.
    pub num_cmds_queued: usize,

    /// Ticks left in the active command.
    pub ticks_remaining: u64,

    /// Ticks spent moving or scanning since the sequence began.
    pub ticks_elapsed: u64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Potential errors that can occur during processing of the module.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum TrajCtrlError {
    /// A sequence is already loaded. This error occurs when attempting to start a new sequence
    /// before the current one has finished.
    #[error("Attempted to load a command sequence while one is already loaded")]
    SequenceAlreadyLoaded,

    /// Attempted to load a sequence with no commands in it.
    #[error("Attempted to load an empty command sequence")]
    AttemptEmptySeqLoad,

    /// The module is executing but has no sequence, which indicates a mode logic error.
    #[error("No command sequence has been set")]
    NoSequence,
}

/// The possible modes of execution of TrajCtrl. Each mode is handled by a `mode_xyz` function.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum TrajCtrlMode {
    Off,
    Executing,
    SequenceFinished,
    Aborted,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for TrajCtrlMode {
    fn default() -> Self {
        TrajCtrlMode::Off
    }
}

impl State for TrajCtrl {
    type InitData = RobotParams;
    type InitError = TrajCtrlError;

    type InputData = ();
    type OutputData = Option<Pose>;
    type StatusReport = StatusReport;
    type ProcError = TrajCtrlError;

    fn init(&mut self, robot: Self::InitData) -> Result<(), Self::InitError> {
        *self = Self::new(robot);
        Ok(())
    }

    /// Advance execution by one tick.
    fn proc(
        &mut self,
        _input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        self.mode = match self.mode {
            TrajCtrlMode::Off => self.mode_off(),
            TrajCtrlMode::Executing => self.mode_executing(),
            TrajCtrlMode::SequenceFinished | TrajCtrlMode::Aborted => self.mode_finished(),
        }?;

        self.report.mode = self.mode;
        self.report.num_cmds_queued = self.queue.as_ref().map(|q| q.len()).unwrap_or(0);
        self.report.ticks_remaining = self
            .active
            .map(|a| a.total_ticks - a.ticks_done)
            .unwrap_or(0);

        Ok((self.pose, self.report))
    }
}

impl TrajCtrl {
    pub fn new(robot: RobotParams) -> Self {
        Self {
            robot,
            ..Default::default()
        }
    }

    /// A handle which can abort execution from elsewhere, for example another thread.
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    pub fn mode(&self) -> TrajCtrlMode {
        self.mode
    }

    pub fn pose(&self) -> Option<Pose> {
        self.pose
    }

    /// Begin executing a command sequence from the given pose.
    ///
    /// Execution starts on the next call to `proc`. Loading a new sequence before the current
    /// one has been finished will result in an error. To stop a sequence whilst it's executing
    /// use `abort_sequence` or the [`AbortHandle`].
    pub fn begin_sequence(&mut self, queue: CommandQueue, start: Pose) -> Result<(), TrajCtrlError> {
        if self.queue.is_some() {
            return Err(TrajCtrlError::SequenceAlreadyLoaded);
        }

        if queue.is_empty() {
            return Err(TrajCtrlError::AttemptEmptySeqLoad);
        }

        info!(
            "Beginning sequence of {} commands ({:.2} s) from {}",
            queue.len(),
            queue.duration_s(&self.robot),
            start
        );

        self.abort.clear();
        self.queue = Some(queue);
        self.active = None;
        self.pose = Some(start);
        self.report = StatusReport::default();
        self.mode = TrajCtrlMode::Executing;

        Ok(())
    }

    /// Stop the sequence once the active command has finished.
    pub fn abort_sequence(&self) {
        self.abort.request();
    }

    fn mode_off(&mut self) -> Result<TrajCtrlMode, TrajCtrlError> {
        Ok(TrajCtrlMode::Off)
    }

    fn mode_finished(&mut self) -> Result<TrajCtrlMode, TrajCtrlError> {
        self.queue = None;
        self.active = None;
        Ok(TrajCtrlMode::Off)
    }

    fn mode_executing(&mut self) -> Result<TrajCtrlMode, TrajCtrlError> {
        // Zero length commands complete without using a tick, so keep starting commands until
        // one takes time
        let mut active = loop {
            if let Some(a) = self.active {
                break a;
            }

            let pose = self.pose.ok_or(TrajCtrlError::NoSequence)?;

            if self.abort.is_requested() {
                warn!(
                    "Sequence aborted at {} after {} commands",
                    pose, self.report.num_cmds_executed
                );
                return Ok(TrajCtrlMode::Aborted);
            }

            let cmd = match self
                .queue
                .as_mut()
                .ok_or(TrajCtrlError::NoSequence)?
                .pop_front()
            {
                Some(c) => c,
                None => {
                    info!("Sequence finished at {}", pose);
                    return Ok(TrajCtrlMode::SequenceFinished);
                }
            };

            let total_ticks = cmd.total_ticks(&self.robot);
            debug!("Starting {} over {} ticks", cmd, total_ticks);

            if total_ticks == 0 {
                self.complete(cmd, &pose);
                continue;
            }

            self.active = Some(ActiveCommand {
                cmd,
                increment: cmd.tick_increment(total_ticks),
                total_ticks,
                ticks_done: 0,
                start: pose,
            });
        };

        active.ticks_done += 1;
        self.report.ticks_elapsed += 1;

        if active.ticks_done >= active.total_ticks {
            self.active = None;
            self.complete(active.cmd, &active.start);
        } else {
            if let (Some(inc), Some(pose)) = (active.increment, self.pose) {
                self.pose = Some(inc.apply(&pose, &self.robot));
            }
            self.active = Some(active);
        }

        Ok(TrajCtrlMode::Executing)
    }

    /// Finish a command, placing the robot exactly at its end pose.
    fn complete(&mut self, cmd: Command, start: &Pose) {
        let end = cmd.apply(start, &self.robot);
        self.pose = Some(end);
        self.report.num_cmds_executed += 1;
        debug!("Completed {}, now at {}", cmd, end);
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
