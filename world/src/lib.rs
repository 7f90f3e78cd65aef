#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Navigation grid and route bookkeeping for Harbor Patrol.
//!
//! A [`GridMap`] discretizes a rectangular region of the world into square
//! cells, classifies each cell once against the obstacle layout, and answers
//! world-to-cell and neighbor queries for the path solvers. The
//! [`progress::RouteProgressTracker`] follows an agent along a solved route.

pub mod geometry;
pub mod progress;

use glam::Vec2;
use harbor_patrol_core::CellCoord;
use thiserror::Error;

pub use geometry::{ObstacleLayout, Shape, TerrainLayer};
pub use progress::{RouteLabel, RouteLabelMode, RouteProgressTracker};

/// Fraction of the cell radius used when sampling obstacle overlap.
pub const SAMPLE_RADIUS_FACTOR: f32 = 0.9;

const MAX_CELLS_PER_AXIS: f32 = 4096.0;

/// Parameters describing how the world region is discretized.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridSettings {
    /// Width and height of the covered world region.
    pub world_size: Vec2,
    /// World-space center of the covered region.
    pub center: Vec2,
    /// Half the edge length of a cell.
    pub cell_radius: f32,
    /// Movement cost of ordinary walkable cells.
    pub default_cost: u32,
    /// Movement cost of cells overlapping difficult terrain.
    pub difficult_cost: u32,
    /// Weight of a horizontal or vertical step.
    pub straight_step_cost: f32,
    /// Weight of a diagonal step.
    pub diagonal_step_cost: f32,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            world_size: Vec2::new(20.0, 20.0),
            center: Vec2::ZERO,
            cell_radius: 0.5,
            default_cost: 1,
            difficult_cost: 5,
            straight_step_cost: 1.0,
            diagonal_step_cost: 1.5,
        }
    }
}

/// Reasons a grid cannot be constructed from its settings.
#[derive(Clone, Copy, Debug, PartialEq, Error)]
pub enum GridError {
    /// The cell radius was not a positive finite number.
    #[error("cell radius must be positive and finite, got {0}")]
    InvalidCellRadius(f32),
    /// The world extent was not positive and finite on both axes.
    #[error("world size must be positive and finite, got {width}x{height}")]
    InvalidExtent {
        /// Requested width.
        width: f32,
        /// Requested height.
        height: f32,
    },
    /// The extent rounds down to zero cells on some axis.
    #[error("world size {width}x{height} holds no cells of diameter {diameter}")]
    Empty {
        /// Requested width.
        width: f32,
        /// Requested height.
        height: f32,
        /// Cell diameter.
        diameter: f32,
    },
    /// The extent would allocate an unreasonable number of cells.
    #[error("grid of {columns}x{rows} cells exceeds the supported size")]
    TooLarge {
        /// Columns that would have been allocated.
        columns: f32,
        /// Rows that would have been allocated.
        rows: f32,
    },
    /// Step weights were not finite, positive and ordered straight < diagonal.
    #[error("step costs must satisfy 0 < straight < diagonal, got {straight} and {diagonal}")]
    InvalidStepCost {
        /// Requested straight step weight.
        straight: f32,
        /// Requested diagonal step weight.
        diagonal: f32,
    },
}

/// A classified grid cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cell {
    coord: CellCoord,
    position: Vec2,
    walkable: bool,
    movement_cost: u32,
}

impl Cell {
    /// Grid coordinate of the cell.
    #[must_use]
    pub const fn coord(&self) -> CellCoord {
        self.coord
    }

    /// World-space center of the cell.
    #[must_use]
    pub const fn position(&self) -> Vec2 {
        self.position
    }

    /// Whether agents may enter the cell.
    #[must_use]
    pub const fn walkable(&self) -> bool {
        self.walkable
    }

    /// Cost multiplier applied when entering the cell; never below one.
    #[must_use]
    pub const fn movement_cost(&self) -> u32 {
        self.movement_cost
    }
}

/// Dense, immutable traversability grid.
#[derive(Clone, Debug)]
pub struct GridMap {
    settings: GridSettings,
    columns: u32,
    rows: u32,
    origin: Vec2,
    cells: Vec<Cell>,
}

impl GridMap {
    /// Builds a grid, classifying every cell against the obstacle layout.
    pub fn build(settings: GridSettings, layout: &ObstacleLayout) -> Result<Self, GridError> {
        Self::build_with(settings, |layer, center, radius| {
            layout.overlaps(layer, center, radius)
        })
    }

    /// Builds a grid with no obstacles or difficult terrain.
    pub fn open(settings: GridSettings) -> Result<Self, GridError> {
        Self::build_with(settings, |_, _, _| false)
    }

    /// Builds a grid, classifying every cell with the provided terrain sampler.
    ///
    /// The sampler answers whether a disk of the given radius centered at the
    /// given world point overlaps the requested terrain layer.
    pub fn build_with<F>(settings: GridSettings, mut sample: F) -> Result<Self, GridError>
    where
        F: FnMut(TerrainLayer, Vec2, f32) -> bool,
    {
        let radius = settings.cell_radius;
        if !radius.is_finite() || radius <= 0.0 {
            return Err(GridError::InvalidCellRadius(radius));
        }

        let size = settings.world_size;
        if !size.is_finite() || size.x <= 0.0 || size.y <= 0.0 {
            return Err(GridError::InvalidExtent {
                width: size.x,
                height: size.y,
            });
        }

        let diameter = radius * 2.0;
        let columns = (size.x / diameter).round();
        let rows = (size.y / diameter).round();
        if columns < 1.0 || rows < 1.0 {
            return Err(GridError::Empty {
                width: size.x,
                height: size.y,
                diameter,
            });
        }
        if columns > MAX_CELLS_PER_AXIS || rows > MAX_CELLS_PER_AXIS {
            return Err(GridError::TooLarge { columns, rows });
        }

        let straight = settings.straight_step_cost;
        let diagonal = settings.diagonal_step_cost;
        if !straight.is_finite() || !diagonal.is_finite() || straight <= 0.0 || diagonal <= straight
        {
            return Err(GridError::InvalidStepCost { straight, diagonal });
        }

        let columns = columns as u32;
        let rows = rows as u32;
        let origin = settings.center - size * 0.5;
        let sample_radius = radius * SAMPLE_RADIUS_FACTOR;
        let default_cost = settings.default_cost.max(1);
        let difficult_cost = settings.difficult_cost.max(1);

        let mut cells = Vec::with_capacity(columns as usize * rows as usize);
        for row in 0..rows {
            for column in 0..columns {
                let position = origin
                    + Vec2::new(
                        column as f32 * diameter + radius,
                        row as f32 * diameter + radius,
                    );
                let walkable = !sample(TerrainLayer::Blocking, position, sample_radius);
                let movement_cost = if sample(TerrainLayer::Difficult, position, sample_radius) {
                    difficult_cost
                } else {
                    default_cost
                };
                cells.push(Cell {
                    coord: CellCoord::new(column, row),
                    position,
                    walkable,
                    movement_cost,
                });
            }
        }

        Ok(Self {
            settings,
            columns,
            rows,
            origin,
            cells,
        })
    }

    /// Settings the grid was built from.
    #[must_use]
    pub const fn settings(&self) -> &GridSettings {
        &self.settings
    }

    /// Number of columns and rows in the grid.
    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.columns, self.rows)
    }

    /// Total number of cells in the grid.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Half the edge length of a cell.
    #[must_use]
    pub const fn cell_radius(&self) -> f32 {
        self.settings.cell_radius
    }

    /// Lower-left and upper-right corners of the covered region.
    #[must_use]
    pub fn bounds(&self) -> (Vec2, Vec2) {
        (self.origin, self.origin + self.settings.world_size)
    }

    /// All cells in row-major order, bottom row first.
    #[must_use]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Dense index of the provided coordinate, if it lies inside the grid.
    #[must_use]
    pub fn index(&self, coord: CellCoord) -> Option<usize> {
        if coord.column() < self.columns && coord.row() < self.rows {
            let row = usize::try_from(coord.row()).ok()?;
            let column = usize::try_from(coord.column()).ok()?;
            let width = usize::try_from(self.columns).ok()?;
            Some(row * width + column)
        } else {
            None
        }
    }

    /// Cell at the provided coordinate, if it lies inside the grid.
    #[must_use]
    pub fn cell(&self, coord: CellCoord) -> Option<&Cell> {
        self.index(coord).and_then(|index| self.cells.get(index))
    }

    /// Cell stored at the provided dense index.
    #[must_use]
    pub fn cell_at(&self, index: usize) -> Option<&Cell> {
        self.cells.get(index)
    }

    /// Maps a world position to the cell covering it.
    ///
    /// Points outside the grid clamp to the nearest border cell.
    #[must_use]
    pub fn cell_from_world_point(&self, position: Vec2) -> &Cell {
        let relative = (position - self.origin) / self.settings.world_size;
        let column = axis_index(relative.x, self.columns);
        let row = axis_index(relative.y, self.rows);
        let index = row as usize * self.columns as usize + column as usize;
        &self.cells[index]
    }

    /// In-bounds cells surrounding `coord`, diagonals included.
    ///
    /// Walkability is not filtered; callers decide which cells to enter.
    #[must_use]
    pub fn neighbors(&self, coord: CellCoord) -> Neighbors {
        let mut neighbors = Neighbors::default();
        for dy in -1_i64..=1 {
            for dx in -1_i64..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let column = i64::from(coord.column()) + dx;
                let row = i64::from(coord.row()) + dy;
                if column < 0
                    || row < 0
                    || column >= i64::from(self.columns)
                    || row >= i64::from(self.rows)
                {
                    continue;
                }
                neighbors.push(CellCoord::new(column as u32, row as u32));
            }
        }
        neighbors
    }

    /// Geometric weight of a step between adjacent cells.
    #[must_use]
    pub fn step_weight(&self, from: CellCoord, to: CellCoord) -> f32 {
        if from.is_diagonal_to(to) {
            self.settings.diagonal_step_cost
        } else {
            self.settings.straight_step_cost
        }
    }

    /// Cost of stepping from `from` into `to`, scaled by the destination's
    /// movement cost.
    #[must_use]
    pub fn step_cost(&self, from: CellCoord, to: CellCoord) -> f32 {
        let movement_cost = self.cell(to).map_or(1, Cell::movement_cost).max(1);
        self.step_weight(from, to) * movement_cost as f32
    }
}

fn axis_index(fraction: f32, count: u32) -> u32 {
    let fraction = if fraction.is_nan() {
        0.0
    } else {
        fraction.clamp(0.0, 1.0)
    };
    let last = count.saturating_sub(1);
    let index = (last as f32 * fraction).round() as u32;
    index.min(last)
}

/// Iterator over the up-to-eight neighbors of a cell.
#[derive(Clone, Debug, Default)]
pub struct Neighbors {
    buffer: [Option<CellCoord>; 8],
    len: usize,
    cursor: usize,
}

impl Neighbors {
    fn push(&mut self, cell: CellCoord) {
        if self.len < self.buffer.len() {
            self.buffer[self.len] = Some(cell);
            self.len += 1;
        }
    }
}

impl Iterator for Neighbors {
    type Item = CellCoord;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor >= self.len {
            return None;
        }

        let value = self.buffer[self.cursor];
        self.cursor += 1;
        value
    }
}
