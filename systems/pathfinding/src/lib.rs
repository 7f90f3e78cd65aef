#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Grid path solvers for Harbor Patrol.
//!
//! Two interchangeable strategies implement [`PathSolver`]: a uniform-cost
//! frontier search that honors per-cell movement costs and a heuristic-guided
//! search driven by an octile estimate. Both read an immutable
//! [`GridMap`], keep their transient search state in a private
//! [`SearchScratch`] arena, and produce a [`Route`] that
//! [`simplify_waypoints`] collapses into direction-change waypoints.

pub mod heuristic;
pub mod queue;
pub mod scratch;
pub mod simplify;
pub mod uniform_cost;

use std::fmt;

use glam::Vec2;
use harbor_patrol_core::{Algorithm, CellCoord, PathOutcome, Route, RouteStep};
use harbor_patrol_world::GridMap;
use thiserror::Error;

pub use heuristic::HeuristicSolver;
pub use queue::PriorityQueue;
pub use scratch::SearchScratch;
pub use simplify::simplify_waypoints;
pub use uniform_cost::UniformCostSolver;

/// Reasons a search fails to produce a route.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum PathError {
    /// The cell covering the start position cannot be entered.
    #[error("start cell ({}, {}) is not walkable", .0.column(), .0.row())]
    StartBlocked(CellCoord),
    /// The cell covering the goal position cannot be entered.
    #[error("goal cell ({}, {}) is not walkable", .0.column(), .0.row())]
    GoalBlocked(CellCoord),
    /// The frontier emptied before the goal was reached.
    #[error("goal unreachable after expanding {expanded} cells")]
    Unreachable {
        /// Cell the search started from.
        start: CellCoord,
        /// Cell the search was aiming for.
        goal: CellCoord,
        /// Number of cells expanded before giving up.
        expanded: usize,
    },
}

/// Strategy that turns a start and goal position into a route.
pub trait PathSolver: fmt::Debug {
    /// Algorithm implemented by the solver.
    fn algorithm(&self) -> Algorithm;

    /// Searches the grid for a route between two world positions.
    fn solve(&mut self, grid: &GridMap, start: Vec2, goal: Vec2) -> Result<Route, PathError>;
}

/// Creates the stock solver for the provided algorithm.
#[must_use]
pub fn solver_for(algorithm: Algorithm) -> Box<dyn PathSolver> {
    match algorithm {
        Algorithm::UniformCost => Box::new(UniformCostSolver::default()),
        Algorithm::Heuristic => Box::new(HeuristicSolver::default()),
    }
}

/// Runs a solver and packages its result for a path requester.
pub fn resolve(solver: &mut dyn PathSolver, grid: &GridMap, start: Vec2, goal: Vec2) -> PathOutcome {
    match solver.solve(grid, start, goal) {
        Ok(route) => {
            let waypoints = simplify_waypoints(&route);
            tracing::debug!(
                algorithm = solver.algorithm().label(),
                cells = route.len(),
                waypoints = waypoints.len(),
                cost = route.total_cost(),
                "path found"
            );
            PathOutcome::found(waypoints, route)
        }
        Err(error) => {
            tracing::debug!(algorithm = solver.algorithm().label(), %error, "path search failed");
            PathOutcome::failed()
        }
    }
}

/// Builds a route through the provided dense cell indices.
///
/// The first cumulative cost is the cost of the first step (zero for a
/// single-cell route); every later entry is the running sum of step costs
/// into that cell, so the final entry equals the total path cost.
pub(crate) fn route_through(grid: &GridMap, indices: &[usize]) -> Route {
    let steps: Vec<RouteStep> = indices
        .iter()
        .filter_map(|index| grid.cell_at(*index))
        .map(|cell| RouteStep {
            cell: cell.coord(),
            position: cell.position(),
            movement_cost: cell.movement_cost(),
        })
        .collect();

    let mut cumulative_costs = Vec::with_capacity(steps.len());
    let mut total = 0.0;
    for (index, step) in steps.iter().enumerate() {
        if index == 0 {
            let first = steps
                .get(1)
                .map_or(0.0, |next| grid.step_cost(step.cell, next.cell));
            cumulative_costs.push(first);
        } else {
            total += grid.step_cost(steps[index - 1].cell, step.cell);
            cumulative_costs.push(total);
        }
    }

    Route::new(steps, cumulative_costs)
}

/// Looks up the walkable start and goal cells of a search.
pub(crate) fn endpoints(grid: &GridMap, start: Vec2, goal: Vec2) -> Result<(usize, usize), PathError> {
    let start_cell = grid.cell_from_world_point(start);
    let goal_cell = grid.cell_from_world_point(goal);
    if !start_cell.walkable() {
        return Err(PathError::StartBlocked(start_cell.coord()));
    }
    if !goal_cell.walkable() {
        return Err(PathError::GoalBlocked(goal_cell.coord()));
    }

    match (grid.index(start_cell.coord()), grid.index(goal_cell.coord())) {
        (Some(start_index), Some(goal_index)) => Ok((start_index, goal_index)),
        _ => Err(PathError::Unreachable {
            start: start_cell.coord(),
            goal: goal_cell.coord(),
            expanded: 0,
        }),
    }
}
