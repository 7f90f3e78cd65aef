//! Uniform-cost frontier search.

use glam::Vec2;
use harbor_patrol_core::{Algorithm, Route};
use harbor_patrol_world::GridMap;

use crate::{endpoints, route_through, PathError, PathSolver, PriorityQueue, SearchScratch};

/// Frontier search ordered by accumulated step cost.
///
/// Edge weights come from [`GridMap::step_cost`], so difficult terrain is
/// avoided whenever a cheaper detour exists.
#[derive(Debug, Default)]
pub struct UniformCostSolver {
    frontier: PriorityQueue<usize, f32>,
    scratch: SearchScratch<f32>,
}

impl PathSolver for UniformCostSolver {
    fn algorithm(&self) -> Algorithm {
        Algorithm::UniformCost
    }

    fn solve(&mut self, grid: &GridMap, start: Vec2, goal: Vec2) -> Result<Route, PathError> {
        let (start_index, goal_index) = endpoints(grid, start, goal)?;

        self.scratch.begin(grid.cell_count());
        self.frontier.clear();
        self.scratch.record(start_index, 0.0, None);
        self.frontier.enqueue(start_index, 0.0);

        let mut expanded = 0;
        while let Some((current, priority)) = self.frontier.dequeue_with_priority() {
            if current == goal_index {
                return Ok(route_through(grid, &self.scratch.trace(goal_index)));
            }

            let Some(current_cost) = self.scratch.cost(current) else {
                continue;
            };
            if priority > current_cost {
                continue;
            }
            let Some(cell) = grid.cell_at(current) else {
                continue;
            };
            expanded += 1;

            for neighbor in grid.neighbors(cell.coord()) {
                let Some(index) = grid.index(neighbor) else {
                    continue;
                };
                if !grid.cell_at(index).is_some_and(|next| next.walkable()) {
                    continue;
                }

                let candidate = current_cost + grid.step_cost(cell.coord(), neighbor);
                let improves = self
                    .scratch
                    .cost(index)
                    .map_or(true, |known| candidate < known);
                if improves {
                    self.scratch.record(index, candidate, Some(current));
                    self.frontier.enqueue(index, candidate);
                }
            }
        }

        Err(PathError::Unreachable {
            start: grid.cell_from_world_point(start).coord(),
            goal: grid.cell_from_world_point(goal).coord(),
            expanded,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::UniformCostSolver;
    use crate::{PathError, PathSolver};
    use glam::Vec2;
    use harbor_patrol_core::CellCoord;
    use harbor_patrol_world::{GridMap, GridSettings, TerrainLayer};

    #[test]
    fn detours_around_difficult_terrain() {
        let expensive = GridSettings {
            difficult_cost: 10,
            ..settings()
        };
        let grid = GridMap::build_with(expensive, |layer, center, _| {
            layer == TerrainLayer::Difficult && center.x.abs() < 0.6 && center.y < 2.0
        })
        .expect("grid");
        let mut solver = UniformCostSolver::default();

        let route = solver
            .solve(&grid, Vec2::new(-2.5, -2.5), Vec2::new(2.5, -2.5))
            .expect("route");

        assert!(route
            .steps()
            .iter()
            .all(|step| step.movement_cost == 1));
        assert_eq!(route.first_cell(), Some(CellCoord::new(0, 0)));
        assert_eq!(route.last_cell(), Some(CellCoord::new(5, 0)));
    }

    #[test]
    fn crosses_difficult_terrain_when_cheaper() {
        let grid = GridMap::build_with(settings(), |layer, center, _| {
            layer == TerrainLayer::Difficult && center.x.abs() < 0.6
        })
        .expect("grid");
        let mut solver = UniformCostSolver::default();

        let route = solver
            .solve(&grid, Vec2::new(-2.5, 0.5), Vec2::new(2.5, 0.5))
            .expect("route");

        assert_eq!(route.len(), 6);
        assert_eq!(route.total_cost(), 13.0);
    }

    #[test]
    fn reports_unreachable_goal_behind_wall() {
        let grid = GridMap::build_with(settings(), |layer, center, _| {
            layer == TerrainLayer::Blocking && center.x.abs() < 0.6
        })
        .expect("grid");
        let mut solver = UniformCostSolver::default();

        let result = solver.solve(&grid, Vec2::new(-2.5, 0.5), Vec2::new(2.5, 0.5));
        assert!(matches!(
            result,
            Err(PathError::Unreachable { expanded: 12, .. })
        ));
    }

    #[test]
    fn reusing_solver_yields_identical_routes() {
        let grid = GridMap::open(settings()).expect("grid");
        let mut solver = UniformCostSolver::default();

        let first = solver
            .solve(&grid, Vec2::new(-2.5, -2.5), Vec2::new(1.5, 2.5))
            .expect("route");
        let _ = solver
            .solve(&grid, Vec2::new(2.5, 2.5), Vec2::new(-2.5, 0.5))
            .expect("route");
        let third = solver
            .solve(&grid, Vec2::new(-2.5, -2.5), Vec2::new(1.5, 2.5))
            .expect("route");

        assert_eq!(first, third);
    }

    fn settings() -> GridSettings {
        GridSettings {
            world_size: Vec2::new(6.0, 6.0),
            ..GridSettings::default()
        }
    }
}
