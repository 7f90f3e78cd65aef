//! Tracks how far an agent has advanced along its current route.

use glam::Vec2;
use harbor_patrol_core::{CellCoord, Route, RouteStep};

/// Default tolerance applied to the endpoint-distance comparison.
pub const DEFAULT_PROGRESS_EPSILON: f32 = 0.02;

const LOOKAHEAD_SEGMENTS: usize = 8;
const DEGENERATE_SEGMENT_SQUARED: f32 = 1e-6;

/// Selects which value is shown for each remaining route step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RouteLabelMode {
    /// No labels are produced.
    #[default]
    Off,
    /// Each step shows the movement cost of its cell.
    TileCost,
    /// Each step shows the cumulative path cost up to that cell.
    RouteCumulative,
}

/// Label attached to a remaining route step.
#[derive(Clone, Debug, PartialEq)]
pub struct RouteLabel {
    /// Cell the label belongs to.
    pub cell: CellCoord,
    /// World position of the cell center.
    pub position: Vec2,
    /// Rendered label text.
    pub text: String,
}

/// Monotonic progress marker along a route.
#[derive(Clone, Debug)]
pub struct RouteProgressTracker {
    steps: Vec<RouteStep>,
    cumulative_costs: Vec<f32>,
    start_index: usize,
    epsilon: f32,
}

impl Default for RouteProgressTracker {
    fn default() -> Self {
        Self::with_epsilon(DEFAULT_PROGRESS_EPSILON)
    }
}

impl RouteProgressTracker {
    /// Creates an empty tracker with a custom endpoint tolerance.
    #[must_use]
    pub fn with_epsilon(epsilon: f32) -> Self {
        Self {
            steps: Vec::new(),
            cumulative_costs: Vec::new(),
            start_index: 0,
            epsilon: epsilon.abs(),
        }
    }

    /// Replaces the tracked route.
    ///
    /// Cumulative costs are kept only when they match the step count. The
    /// current index is clamped into the new route rather than reset.
    pub fn set_route(&mut self, steps: Vec<RouteStep>, cumulative_costs: Option<Vec<f32>>) {
        self.cumulative_costs = match cumulative_costs {
            Some(costs) if costs.len() == steps.len() => costs,
            _ => Vec::new(),
        };
        self.steps = steps;
        self.start_index = self.start_index.min(self.steps.len().saturating_sub(1));
    }

    /// Replaces the tracked route with a solved [`Route`].
    pub fn set_from_route(&mut self, route: &Route) {
        self.set_route(
            route.steps().to_vec(),
            Some(route.cumulative_costs().to_vec()),
        );
    }

    /// Drops the tracked route.
    pub fn clear(&mut self) {
        self.steps.clear();
        self.cumulative_costs.clear();
        self.start_index = 0;
    }

    /// Moves the progress marker back to the first step.
    pub fn reset_progress(&mut self) {
        self.start_index = 0;
    }

    /// Reports whether a route is being tracked.
    #[must_use]
    pub fn has_route(&self) -> bool {
        !self.steps.is_empty()
    }

    /// Index of the step the agent is currently leaving.
    #[must_use]
    pub const fn current_index(&self) -> usize {
        self.start_index
    }

    /// Every tracked step, start first.
    #[must_use]
    pub fn steps(&self) -> &[RouteStep] {
        &self.steps
    }

    /// Steps from the current index onward.
    #[must_use]
    pub fn remaining(&self) -> &[RouteStep] {
        self.steps.get(self.start_index..).unwrap_or(&[])
    }

    /// Cumulative costs matching [`Self::steps`], empty when untracked.
    #[must_use]
    pub fn cumulative_costs(&self) -> &[f32] {
        &self.cumulative_costs
    }

    /// Advances the progress marker past segments the agent has covered.
    ///
    /// A segment counts as covered once the agent's projection onto it passes
    /// the midpoint, or once the agent is measurably closer to its far end.
    /// At most a fixed window of segments is examined per call, and the
    /// marker never moves backwards.
    pub fn update_progress_by_position(&mut self, position: Vec2) {
        let count = self.steps.len();
        if count < 2 {
            return;
        }

        let last_segment = count - 2;
        let mut index = self.start_index.min(last_segment);
        let max_index = (index + LOOKAHEAD_SEGMENTS).min(last_segment);
        let epsilon_squared = self.epsilon * self.epsilon;

        while index <= max_index {
            let start = self.steps[index].position;
            let end = self.steps[index + 1].position;
            let segment = end - start;
            let length_squared = segment.length_squared();
            if length_squared < DEGENERATE_SEGMENT_SQUARED {
                index += 1;
                continue;
            }

            let along = (position - start).dot(segment) / length_squared;
            let to_start = position.distance_squared(start);
            let to_end = position.distance_squared(end);
            if along > 0.5 || to_end + epsilon_squared < to_start {
                index += 1;
                self.start_index = self.start_index.max(index);
            } else {
                break;
            }
        }
    }

    /// Labels for the remaining steps in the requested mode.
    #[must_use]
    pub fn labels(&self, mode: RouteLabelMode) -> Vec<RouteLabel> {
        if mode == RouteLabelMode::Off {
            return Vec::new();
        }

        self.steps
            .iter()
            .enumerate()
            .skip(self.start_index)
            .map(|(index, step)| {
                let text = match (mode, self.cumulative_costs.get(index)) {
                    (RouteLabelMode::RouteCumulative, Some(cost)) => format_cost(*cost),
                    _ => step.movement_cost.to_string(),
                };
                RouteLabel {
                    cell: step.cell,
                    position: step.position,
                    text,
                }
            })
            .collect()
    }
}

fn format_cost(cost: f32) -> String {
    let fixed = format!("{cost:.2}");
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    trimmed.to_owned()
}
