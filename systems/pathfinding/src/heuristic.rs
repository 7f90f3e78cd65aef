//! Heuristic-guided best-first search over octile distances.

use glam::Vec2;
use harbor_patrol_core::{Algorithm, Route};
use harbor_patrol_world::GridMap;

use crate::{endpoints, route_through, PathError, PathSolver, PriorityQueue, SearchScratch};

/// Integer weight of a horizontal or vertical step.
pub const STRAIGHT_WEIGHT: u32 = 10;
/// Integer weight of a diagonal step.
pub const DIAGONAL_WEIGHT: u32 = 14;

/// Best-first search ordered by `g + h`, ties broken by the smaller `h`.
///
/// Step weights ignore per-cell movement cost unless the solver is built
/// with [`HeuristicSolver::with_terrain_cost`].
#[derive(Debug, Default)]
pub struct HeuristicSolver {
    apply_terrain_cost: bool,
    open: PriorityQueue<usize, (u32, u32)>,
    scratch: SearchScratch<u32>,
}

impl HeuristicSolver {
    /// Creates a solver that optionally scales steps by movement cost.
    #[must_use]
    pub fn with_terrain_cost(apply_terrain_cost: bool) -> Self {
        Self {
            apply_terrain_cost,
            ..Self::default()
        }
    }

    /// Reports whether step weights are scaled by movement cost.
    #[must_use]
    pub const fn applies_terrain_cost(&self) -> bool {
        self.apply_terrain_cost
    }
}

impl PathSolver for HeuristicSolver {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Heuristic
    }

    fn solve(&mut self, grid: &GridMap, start: Vec2, goal: Vec2) -> Result<Route, PathError> {
        let (start_index, goal_index) = endpoints(grid, start, goal)?;
        let goal_coord = grid.cell_from_world_point(goal).coord();
        let start_coord = grid.cell_from_world_point(start).coord();

        self.scratch.begin(grid.cell_count());
        self.open.clear();
        self.scratch.record(start_index, 0, None);
        let estimate = start_coord.octile_distance(goal_coord, STRAIGHT_WEIGHT, DIAGONAL_WEIGHT);
        self.open.enqueue(start_index, (estimate, estimate));

        let mut expanded = 0;
        while let Some(current) = self.open.dequeue() {
            if self.scratch.is_closed(current) {
                continue;
            }
            self.scratch.close(current);

            if current == goal_index {
                return Ok(route_through(grid, &self.scratch.trace(goal_index)));
            }

            let Some(cell) = grid.cell_at(current) else {
                continue;
            };
            let travelled = self.scratch.cost(current).unwrap_or_default();
            expanded += 1;

            for neighbor in grid.neighbors(cell.coord()) {
                let Some(index) = grid.index(neighbor) else {
                    continue;
                };
                let Some(next) = grid.cell_at(index) else {
                    continue;
                };
                if !next.walkable() || self.scratch.is_closed(index) {
                    continue;
                }

                let mut step = if cell.coord().is_diagonal_to(neighbor) {
                    DIAGONAL_WEIGHT
                } else {
                    STRAIGHT_WEIGHT
                };
                if self.apply_terrain_cost {
                    step = step.saturating_mul(next.movement_cost().max(1));
                }

                let candidate = travelled.saturating_add(step);
                let improves = self
                    .scratch
                    .cost(index)
                    .map_or(true, |known| candidate < known);
                if improves {
                    self.scratch.record(index, candidate, Some(current));
                    let remaining =
                        neighbor.octile_distance(goal_coord, STRAIGHT_WEIGHT, DIAGONAL_WEIGHT);
                    self.open
                        .enqueue(index, (candidate.saturating_add(remaining), remaining));
                }
            }
        }

        Err(PathError::Unreachable {
            start: start_coord,
            goal: goal_coord,
            expanded,
        })
    }
}
