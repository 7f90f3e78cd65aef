//! Obstacle geometry sampled once while a [`crate::GridMap`] is classified.

use glam::Vec2;

/// Terrain layer a shape belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TerrainLayer {
    /// Impassable geometry; overlapping cells become unwalkable.
    Blocking,
    /// Slow terrain; overlapping cells receive the difficult movement cost.
    Difficult,
}

/// Primitive region used to describe obstacles and terrain.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Shape {
    /// Disk described by its center and radius.
    Circle {
        /// World-space center of the disk.
        center: Vec2,
        /// Radius of the disk.
        radius: f32,
    },
    /// Axis-aligned rectangle described by its corners.
    Rect {
        /// Lower-left corner.
        min: Vec2,
        /// Upper-right corner.
        max: Vec2,
    },
}

impl Shape {
    /// Creates an axis-aligned rectangle from its center and full size.
    #[must_use]
    pub fn rect_from_center(center: Vec2, size: Vec2) -> Self {
        let half = size.abs() * 0.5;
        Self::Rect {
            min: center - half,
            max: center + half,
        }
    }

    /// Reports whether a disk centered at `center` overlaps the shape.
    #[must_use]
    pub fn overlaps_disk(&self, center: Vec2, radius: f32) -> bool {
        match *self {
            Self::Circle {
                center: own_center,
                radius: own_radius,
            } => {
                let reach = own_radius + radius;
                own_center.distance_squared(center) < reach * reach
            }
            Self::Rect { min, max } => {
                let closest = center.clamp(min.min(max), max.max(min));
                closest.distance_squared(center) < radius * radius
            }
        }
    }
}

/// Collection of shapes sorted into terrain layers.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ObstacleLayout {
    blocking: Vec<Shape>,
    difficult: Vec<Shape>,
}

impl ObstacleLayout {
    /// Creates an empty layout with no obstacles.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a shape to the provided layer, returning the layout.
    #[must_use]
    pub fn with(mut self, layer: TerrainLayer, shape: Shape) -> Self {
        self.add(layer, shape);
        self
    }

    /// Adds a shape to the provided layer.
    pub fn add(&mut self, layer: TerrainLayer, shape: Shape) {
        match layer {
            TerrainLayer::Blocking => self.blocking.push(shape),
            TerrainLayer::Difficult => self.difficult.push(shape),
        }
    }

    /// Shapes registered for the provided layer.
    #[must_use]
    pub fn shapes(&self, layer: TerrainLayer) -> &[Shape] {
        match layer {
            TerrainLayer::Blocking => &self.blocking,
            TerrainLayer::Difficult => &self.difficult,
        }
    }

    /// Reports whether any shape of the layer overlaps the sample disk.
    #[must_use]
    pub fn overlaps(&self, layer: TerrainLayer, center: Vec2, radius: f32) -> bool {
        self.shapes(layer)
            .iter()
            .any(|shape| shape.overlaps_disk(center, radius))
    }
}
