//! Main route planning executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise the session and logging
//!     - Load the parameters and the scenario
//!     - Plan the full route (visiting order, then each leg)
//!     - Save the plan into the session directory
//!     - Optionally simulate execution of the command queue tick by tick
//!
//! Planning always completes before any execution begins. If planning fails the executable exits
//! with an error and nothing is executed.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{debug, error, info};
use serde::Serialize;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;
use structopt::StructOpt;

// Internal
use route_lib::{
    brain::{Brain, Plan, PlannerMode},
    loc::Pose,
    params::{RouteExecParams, ScenarioParams},
    traj_ctrl::{TrajCtrl, TrajCtrlMode},
};
use util::{
    logger::{logger_init, LevelFilter},
    module::State,
    session::Session,
};

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

/// Plan a route visiting every obstacle of a scenario.
#[derive(Debug, StructOpt)]
#[structopt(name = "route_exec")]
struct Opt {
    /// Parameter file, defaults to `params/route_exec.toml` under the software root.
    #[structopt(long, parse(from_os_str))]
    params: Option<PathBuf>,

    /// Scenario file, defaults to `params/scenario.toml` under the software root.
    #[structopt(long, parse(from_os_str))]
    scenario: Option<PathBuf>,

    /// Override the planner mode: `hybrid-astar` or `quadrant`.
    #[structopt(long)]
    mode: Option<PlannerMode>,

    /// Simulate execution of the planned commands.
    #[structopt(long)]
    simulate: bool,

    /// Pace the simulation at the robot's tick rate instead of running flat out.
    #[structopt(long)]
    realtime: bool,

    /// Log at trace level.
    #[structopt(short, long)]
    verbose: bool,
}

/// Pose of the robot at the end of each executed command.
#[derive(Debug, Serialize)]
struct ExecTrace {
    start: Pose,
    cmd_end_poses: Vec<Pose>,
    final_mode: TrajCtrlMode,
    num_ticks: u64,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let opt = Opt::from_args();

    // ---- EARLY INITIALISATION ----

    let session = Session::new("route_exec", "sessions").wrap_err("Failed to create the session")?;

    let level = if opt.verbose {
        LevelFilter::Trace
    } else {
        LevelFilter::Debug
    };
    logger_init(level, &session).wrap_err("Failed to initialise logging")?;

    info!("Route Planning Executable\n");
    info!("Session directory: {:?}\n", session.session_root);
    debug!("CLI options: {:?}", opt);

    // ---- LOAD PARAMETERS ----

    let mut params: RouteExecParams = match &opt.params {
        Some(p) => util::params::load_path(p),
        None => util::params::load("route_exec.toml"),
    }
    .wrap_err("Could not load route_exec params")?;

    if let Some(mode) = opt.mode {
        params.planner.mode = mode;
    }

    let scenario: ScenarioParams = match &opt.scenario {
        Some(p) => util::params::load_path(p),
        None => util::params::load("scenario.toml"),
    }
    .wrap_err("Could not load the scenario")?;

    info!("Parameters loaded, planner mode {:?}", params.planner.mode);

    // ---- PLANNING ----

    let obstacles = scenario
        .obstacles(&params.arena, &params.obstacle)
        .wrap_err("Invalid scenario")?;
    let start = scenario.start_pose(&params.arena);

    info!("{} obstacles, starting from {}", obstacles.len(), start);
    for o in obstacles.iter() {
        debug!("    {} -> target {}", o, o.target_pose());
    }

    let mut brain = Brain::new(&params, &obstacles).wrap_err("Failed to initialise the brain")?;
    debug!("Occupancy grid:\n{}", brain.grid().render());

    let plan = brain
        .plan_path(&start)
        .map_err(|e| {
            error!("{}", e);
            e
        })
        .wrap_err("Planning failed, no commands will be executed")?;

    log_plan(&plan);

    session
        .save("plan/plan.json", &plan)
        .wrap_err("Could not save the plan")?;

    // ---- EXECUTION ----

    if opt.simulate {
        let trace = simulate(plan, &params, opt.realtime)?;

        session
            .save("exec/trace.json", &trace)
            .wrap_err("Could not save the execution trace")?;
    }

    info!("End of execution");

    Ok(())
}

fn log_plan(plan: &Plan) {
    for leg in plan.legs.iter() {
        info!(
            "Leg {} to obstacle {}: {} commands, ends at {} (arena {:.1}, {:.1})",
            leg.index,
            leg.obstacle.id,
            leg.commands.len(),
            leg.end,
            leg.end_arena_cm.0,
            leg.end_arena_cm.1
        );
        for cmd in leg.commands.iter() {
            debug!("    {}", cmd);
        }
    }
}

/// Run the plan's command queue through trajectory control until it finishes.
fn simulate(plan: Plan, params: &RouteExecParams, realtime: bool) -> Result<ExecTrace, Report> {
    if !(params.robot.tick_rate_hz > 0.0) {
        return Err(eyre!(
            "Tick rate must be positive, found {} Hz",
            params.robot.tick_rate_hz
        ));
    }

    let start = plan.start;
    let expected_end = plan.end_pose();

    let mut traj_ctrl = TrajCtrl::default();
    traj_ctrl
        .init(params.robot)
        .wrap_err("Failed to initialise TrajCtrl")?;

    let queue = plan.into_queue();
    if queue.is_empty() {
        info!("Nothing to execute");
        return Ok(ExecTrace {
            start,
            cmd_end_poses: Vec::new(),
            final_mode: TrajCtrlMode::Off,
            num_ticks: 0,
        });
    }

    traj_ctrl
        .begin_sequence(queue, start)
        .wrap_err("Failed to begin the command sequence")?;

    let tick_period = Duration::from_secs_f64(1.0 / params.robot.tick_rate_hz);
    let mut cmd_end_poses = Vec::new();
    let mut num_executed = 0;

    let report = loop {
        let (pose, report) = traj_ctrl
            .proc(&())
            .wrap_err("Error during trajectory control processing")?;

        if report.num_cmds_executed > num_executed {
            num_executed = report.num_cmds_executed;
            if let Some(p) = pose {
                cmd_end_poses.push(p);
            }
        }

        if report.mode != TrajCtrlMode::Executing {
            break report;
        }

        if realtime {
            thread::sleep(tick_period);
        }
    };

    let end = traj_ctrl
        .pose()
        .ok_or_else(|| eyre!("Trajectory control lost the robot's pose"))?;

    info!(
        "Simulation {:?} after {} ticks ({:.2} s), final pose {}",
        report.mode,
        report.ticks_elapsed,
        report.ticks_elapsed as f64 / params.robot.tick_rate_hz,
        end
    );
    debug!(
        "Final pose is {:.3} cm from the planned end {}",
        end.distance_to(&expected_end),
        expected_end
    );

    Ok(ExecTrace {
        start,
        cmd_end_poses,
        final_mode: report.mode,
        num_ticks: report.ticks_elapsed,
    })
}
