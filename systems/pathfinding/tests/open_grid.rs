use glam::Vec2;
use harbor_patrol_core::{Algorithm, CellCoord};
use harbor_patrol_system_pathfinding::{resolve, solver_for};
use harbor_patrol_world::{GridMap, GridSettings, TerrainLayer};

#[test]
fn both_solvers_cross_an_open_grid() {
    let grid = GridMap::open(ten_by_ten()).expect("grid");
    let start = Vec2::new(-4.0, -4.0);
    let goal = Vec2::new(4.0, 4.0);
    let start_cell = grid.cell_from_world_point(start).coord();

    for algorithm in Algorithm::ALL {
        let mut solver = solver_for(algorithm);
        let outcome = resolve(solver.as_mut(), &grid, start, goal);
        assert!(outcome.success, "{algorithm:?} failed on an open grid");

        let route = outcome.route.expect("route");
        assert_eq!(route.first_cell(), Some(start_cell));

        let last = *outcome.waypoints.last().expect("waypoints");
        let radius = grid.cell_radius();
        assert!(
            (last.x - goal.x).abs() <= radius + 1e-4 && (last.y - goal.y).abs() <= radius + 1e-4,
            "{algorithm:?} ended at {last:?}"
        );
        assert_eq!(
            Some(last),
            route.steps().last().map(|step| step.position),
            "last waypoint must be the goal cell"
        );
    }
}

#[test]
fn uniform_cost_costs_accumulate_along_route() {
    let grid = GridMap::build_with(ten_by_ten(), |layer, center, _| {
        layer == TerrainLayer::Difficult && center.y > -1.0 && center.y < 1.0
    })
    .expect("grid");
    let mut solver = solver_for(Algorithm::UniformCost);
    let outcome = resolve(
        solver.as_mut(),
        &grid,
        Vec2::new(-3.5, -4.5),
        Vec2::new(2.5, 4.5),
    );
    let route = outcome.route.expect("route");
    let costs = route.cumulative_costs();
    assert_eq!(costs.len(), route.len());
    assert!(costs.windows(2).all(|pair| pair[0] <= pair[1]));

    let expected: f32 = route
        .steps()
        .windows(2)
        .map(|pair| grid.step_cost(pair[0].cell, pair[1].cell))
        .sum();
    assert!((route.total_cost() - expected).abs() < 1e-4);
}

#[test]
fn blocked_start_fails_for_both_solvers() {
    let blocked = CellCoord::new(0, 0);
    let grid = GridMap::build_with(ten_by_ten(), |layer, center, _| {
        layer == TerrainLayer::Blocking && center.x < -4.0 && center.y < -4.0
    })
    .expect("grid");
    assert_eq!(
        grid.cell_from_world_point(Vec2::new(-4.5, -4.5)).coord(),
        blocked
    );

    for algorithm in Algorithm::ALL {
        let mut solver = solver_for(algorithm);
        let outcome = resolve(
            solver.as_mut(),
            &grid,
            Vec2::new(-4.5, -4.5),
            Vec2::new(4.0, 4.0),
        );
        assert!(!outcome.success);
        assert!(outcome.waypoints.is_empty());
    }
}

fn ten_by_ten() -> GridSettings {
    GridSettings {
        world_size: Vec2::new(10.0, 10.0),
        cell_radius: 0.5,
        ..GridSettings::default()
    }
}
