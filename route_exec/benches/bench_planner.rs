//! # Planner Benchmark

use criterion::{criterion_group, criterion_main, Criterion};

use route_lib::{
    brain::{Brain, PlannerMode},
    cmd::RobotParams,
    loc::Direction,
    map::{ArenaParams, Grid, Obstacle, ObstacleParams, ObstacleSpec},
    nav::{hybrid_astar::HybridAStar, order::best_order},
    params::RouteExecParams,
};

fn planner_benchmark(c: &mut Criterion) {
    // ---- Build the arena ----

    let arena = ArenaParams::default();
    let robot = RobotParams::default();
    let obstacle_params = ObstacleParams::default();

    let specs = [
        (115.0, 45.0, Direction::Left),
        (25.0, 95.0, Direction::Bottom),
        (35.0, 175.0, Direction::Bottom),
        (155.0, 165.0, Direction::Left),
        (175.0, 85.0, Direction::Left),
        (85.0, 115.0, Direction::Top),
    ];
    let obstacles: Vec<Obstacle> = specs
        .iter()
        .enumerate()
        .map(|(i, &(x_cm, y_cm, facing))| {
            Obstacle::from_spec(
                i,
                &ObstacleSpec { x_cm, y_cm, facing },
                &arena,
                &obstacle_params,
            )
            .unwrap()
        })
        .collect();

    let start = arena.start_pose();

    // ---- Ordering ----

    c.bench_function("order::best_order (6 obstacles)", |b| {
        b.iter(|| best_order(&start, &obstacles, 8).unwrap())
    });

    // ---- Single search leg ----

    let grid = Grid::new(arena, &obstacles[..5]).unwrap();
    let planner = HybridAStar::new(&grid, robot, 2.0 * robot.turn_radius_cm, 3);
    let target = obstacles[3].target_pose();

    c.bench_function("HybridAStar::plan", |b| {
        b.iter(|| planner.plan(&start, &target).unwrap())
    });

    // ---- Full plans ----

    for &mode in [PlannerMode::HybridAStar, PlannerMode::Quadrant].iter() {
        let mut params = RouteExecParams::default();
        params.planner.mode = mode;

        c.bench_function(&format!("Brain::plan_path ({:?})", mode), |b| {
            b.iter(|| {
                Brain::new(&params, &obstacles[..5])
                    .unwrap()
                    .plan_path(&start)
                    .unwrap()
            })
        });
    }
}

criterion_group!(benches, planner_benchmark);
criterion_main!(benches);
