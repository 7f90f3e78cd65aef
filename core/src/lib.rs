#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Harbor Patrol engine.
//!
//! This crate defines the vocabulary that connects the navigation grid, the
//! path solvers, the request dispatcher and the agent behavior controllers.
//! Adapters submit [`Command`] values describing desired mutations, the
//! simulation executes them through its `apply` entry point and broadcasts
//! [`Event`] values describing everything that changed. Agents and solvers
//! exchange [`Route`] and [`PathOutcome`] values; no component reaches into
//! another's internal state.

use std::time::Duration;

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Canonical banner emitted when the command-line adapter boots.
pub const WELCOME_BANNER: &str = "Harbor Patrol: headless navigation sandbox.";

/// Commands that express all permissible simulation mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Advances the simulation by one logic and one physical tick.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Introduces a new target at the provided world position.
    PlaceTarget {
        /// Identifier the target will be known by.
        target: TargetId,
        /// World position of the target.
        position: Vec2,
    },
    /// Moves an existing target to a new world position.
    MoveTarget {
        /// Identifier of the target being moved.
        target: TargetId,
        /// Destination world position.
        position: Vec2,
    },
    /// Marks a target alive or destroyed.
    SetTargetAlive {
        /// Identifier of the affected target.
        target: TargetId,
        /// Whether the target should be considered alive.
        alive: bool,
    },
    /// Removes a target from the world entirely.
    RemoveTarget {
        /// Identifier of the target to remove.
        target: TargetId,
    },
    /// Asks an agent to hand its current target to its partner.
    AlertPartner {
        /// Agent raising the alert.
        agent: AgentId,
    },
}

/// Events broadcast by the simulation after processing commands.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Reports that an agent moved between behavior states.
    StateChanged {
        /// Agent whose state changed.
        agent: AgentId,
        /// State held before the transition.
        from: AgentState,
        /// State held after the transition.
        to: AgentState,
    },
    /// Reports that an agent submitted a path request.
    PathRequested {
        /// Agent that issued the request.
        agent: AgentId,
        /// Ticket assigned by the dispatcher.
        ticket: RequestTicket,
        /// Solver selected for the request.
        algorithm: Algorithm,
    },
    /// Reports that an agent consumed a path result.
    PathResolved {
        /// Agent that received the result.
        agent: AgentId,
        /// Ticket of the request that completed.
        ticket: RequestTicket,
        /// Whether the solver produced a route.
        success: bool,
        /// Number of simplified waypoints delivered.
        waypoints: usize,
    },
    /// Reports that an agent locked onto a target.
    TargetAcquired {
        /// Agent that acquired the target.
        agent: AgentId,
        /// Target that was acquired.
        target: TargetId,
        /// Whether the target was adopted from the agent's partner.
        cooperative: bool,
    },
    /// Reports that an agent stopped pursuing a target.
    TargetReleased {
        /// Agent that released the target.
        agent: AgentId,
        /// Target that was released.
        target: TargetId,
    },
    /// Reports that a patrolling agent reached a tour waypoint.
    WaypointReached {
        /// Agent that reached the waypoint.
        agent: AgentId,
        /// Index of the waypoint within the tour.
        waypoint: usize,
    },
    /// Reports that an agent handed its target to its partner.
    AlertSent {
        /// Agent raising the alert.
        from: AgentId,
        /// Partner receiving the alert.
        to: AgentId,
        /// Target carried by the alert.
        target: TargetId,
    },
    /// Reports that a target command referenced an unknown or duplicate target.
    TargetRejected {
        /// Identifier supplied by the rejected command.
        target: TargetId,
    },
}

/// Location of a single grid cell expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Octile distance using the provided straight and diagonal step weights.
    ///
    /// Diagonal steps cover the shorter axis and straight steps cover the
    /// remainder, which is the exact cost of an unobstructed 8-connected walk.
    #[must_use]
    pub fn octile_distance(self, other: CellCoord, straight: u32, diagonal: u32) -> u32 {
        let dx = self.column.abs_diff(other.column);
        let dy = self.row.abs_diff(other.row);
        let (short, long) = if dx < dy { (dx, dy) } else { (dy, dx) };
        diagonal * short + straight * (long - short)
    }

    /// Signed column and row delta from `self` to `other`.
    #[must_use]
    pub fn offset_to(self, other: CellCoord) -> (i64, i64) {
        (
            i64::from(other.column) - i64::from(self.column),
            i64::from(other.row) - i64::from(self.row),
        )
    }

    /// Reports whether `other` is a diagonal neighbor of `self`.
    #[must_use]
    pub fn is_diagonal_to(self, other: CellCoord) -> bool {
        self.column != other.column && self.row != other.row
    }
}

/// Unique identifier assigned to an autonomous agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(u32);

impl AgentId {
    /// Creates a new agent identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a pursuable target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TargetId(u32);

impl TargetId {
    /// Creates a new target identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Ticket handed out by the dispatcher for every accepted path request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RequestTicket(u64);

impl RequestTicket {
    /// Creates a ticket with the provided sequence number.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the sequence number of the ticket.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Selects which search strategy resolves a path request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    /// Uniform-cost frontier search that honors per-cell movement costs.
    UniformCost,
    /// Heuristic-guided best-first search using an octile estimate.
    Heuristic,
}

impl Algorithm {
    /// Every algorithm, in registry order.
    pub const ALL: [Algorithm; 2] = [Algorithm::UniformCost, Algorithm::Heuristic];

    /// Short human-readable name of the algorithm.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::UniformCost => "dijkstra",
            Self::Heuristic => "a-star",
        }
    }
}

/// Behavior state held by an agent controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    /// The agent has nothing to do and stays in place.
    Idle,
    /// The agent walks its waypoint tour.
    Patrol,
    /// The agent chases a target along searched paths.
    Following,
    /// The agent closes in on a target in a straight line.
    Attack,
    /// The agent periodically re-paths toward a fixed goal.
    Recalculating,
}

impl AgentState {
    /// Display label used by overlays and logs.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Patrol => "PATROL",
            Self::Following => "FOLLOWING",
            Self::Attack => "ATTACK",
            Self::Recalculating => "RECALC",
        }
    }

    /// Reports whether the state is actively pursuing a target.
    #[must_use]
    pub const fn is_pursuing(self) -> bool {
        matches!(self, Self::Following | Self::Attack)
    }
}

/// Immutable representation of a single target used for queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TargetSnapshot {
    /// Identifier of the target.
    pub id: TargetId,
    /// World position of the target.
    pub position: Vec2,
    /// Whether the target is still alive.
    pub alive: bool,
}

/// Read-only snapshot describing every target known to the simulation.
#[derive(Clone, Debug, Default)]
pub struct TargetView {
    snapshots: Vec<TargetSnapshot>,
}

impl TargetView {
    /// Creates a new target view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<TargetSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Looks up the snapshot for a target, if it exists.
    #[must_use]
    pub fn get(&self, id: TargetId) -> Option<&TargetSnapshot> {
        self.snapshots
            .binary_search_by_key(&id, |snapshot| snapshot.id)
            .ok()
            .and_then(|index| self.snapshots.get(index))
    }

    /// Iterator over the captured target snapshots in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &TargetSnapshot> {
        self.snapshots.iter()
    }

    /// Nearest live target within `range` of `origin`.
    ///
    /// Equal distances resolve to the lowest identifier.
    #[must_use]
    pub fn nearest_alive(&self, origin: Vec2, range: f32) -> Option<&TargetSnapshot> {
        let mut best: Option<(&TargetSnapshot, f32)> = None;
        for snapshot in self.snapshots.iter().filter(|snapshot| snapshot.alive) {
            let distance = snapshot.position.distance(origin);
            if distance > range {
                continue;
            }
            match best {
                Some((_, best_distance)) if best_distance <= distance => {}
                _ => best = Some((snapshot, distance)),
            }
        }
        best.map(|(snapshot, _)| snapshot)
    }

    /// Number of targets captured by the view.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether the view contains no targets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

/// A single cell visited by a route.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RouteStep {
    /// Grid coordinate of the cell.
    pub cell: CellCoord,
    /// World-space center of the cell.
    pub position: Vec2,
    /// Movement cost assigned to the cell.
    pub movement_cost: u32,
}

/// Ordered cell sequence from start to goal with cumulative path costs.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Route {
    steps: Vec<RouteStep>,
    cumulative_costs: Vec<f32>,
}

impl Route {
    /// Creates a route from its steps and the matching cumulative costs.
    ///
    /// Costs whose length does not match the steps are discarded.
    #[must_use]
    pub fn new(steps: Vec<RouteStep>, cumulative_costs: Vec<f32>) -> Self {
        let cumulative_costs = if cumulative_costs.len() == steps.len() {
            cumulative_costs
        } else {
            Vec::new()
        };
        Self {
            steps,
            cumulative_costs,
        }
    }

    /// Cells visited by the route, start first.
    #[must_use]
    pub fn steps(&self) -> &[RouteStep] {
        &self.steps
    }

    /// Cumulative cost at every step, empty when costs were not tracked.
    #[must_use]
    pub fn cumulative_costs(&self) -> &[f32] {
        &self.cumulative_costs
    }

    /// Total cost of the route, zero when costs were not tracked.
    #[must_use]
    pub fn total_cost(&self) -> f32 {
        self.cumulative_costs.last().copied().unwrap_or(0.0)
    }

    /// Number of cells visited by the route.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Reports whether the route visits no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// First cell of the route.
    #[must_use]
    pub fn first_cell(&self) -> Option<CellCoord> {
        self.steps.first().map(|step| step.cell)
    }

    /// Last cell of the route.
    #[must_use]
    pub fn last_cell(&self) -> Option<CellCoord> {
        self.steps.last().map(|step| step.cell)
    }
}

/// Result handed to the requester of a path.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PathOutcome {
    /// Simplified waypoints ending at the goal cell, empty on failure.
    pub waypoints: Vec<Vec2>,
    /// Whether the solver reached the goal.
    pub success: bool,
    /// Full route backing the waypoints, present on success.
    pub route: Option<Route>,
}

impl PathOutcome {
    /// Builds a successful outcome.
    #[must_use]
    pub fn found(waypoints: Vec<Vec2>, route: Route) -> Self {
        Self {
            waypoints,
            success: true,
            route: Some(route),
        }
    }

    /// Builds a failed outcome with no waypoints.
    #[must_use]
    pub fn failed() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::{AgentState, CellCoord, Route, RouteStep, TargetId, TargetSnapshot, TargetView};
    use glam::Vec2;

    #[test]
    fn octile_distance_prefers_diagonals() {
        let origin = CellCoord::new(1, 1);
        let destination = CellCoord::new(4, 3);
        assert_eq!(origin.octile_distance(destination, 10, 14), 48);
        assert_eq!(destination.octile_distance(origin, 10, 14), 48);
        assert_eq!(origin.octile_distance(origin, 10, 14), 0);
    }

    #[test]
    fn diagonal_detection_requires_both_axes() {
        let origin = CellCoord::new(2, 2);
        assert!(origin.is_diagonal_to(CellCoord::new(3, 3)));
        assert!(!origin.is_diagonal_to(CellCoord::new(3, 2)));
        assert_eq!(origin.offset_to(CellCoord::new(1, 3)), (-1, 1));
    }

    #[test]
    fn state_labels_match_overlay_text() {
        assert_eq!(AgentState::Recalculating.label(), "RECALC");
        assert_eq!(AgentState::Following.label(), "FOLLOWING");
        assert!(AgentState::Attack.is_pursuing());
        assert!(!AgentState::Patrol.is_pursuing());
    }

    #[test]
    fn target_view_finds_nearest_live_target() {
        let view = TargetView::from_snapshots(vec![
            target(3, Vec2::new(1.0, 0.0), false),
            target(2, Vec2::new(2.0, 0.0), true),
            target(1, Vec2::new(-2.0, 0.0), true),
        ]);

        let nearest = view.nearest_alive(Vec2::ZERO, 5.0).expect("live target");
        assert_eq!(nearest.id, TargetId::new(1));
        assert!(view.nearest_alive(Vec2::ZERO, 1.5).is_none());
        assert_eq!(
            view.get(TargetId::new(3)).map(|snapshot| snapshot.alive),
            Some(false)
        );
        assert!(view.get(TargetId::new(9)).is_none());
    }

    #[test]
    fn route_discards_mismatched_costs() {
        let step = RouteStep {
            cell: CellCoord::new(0, 0),
            position: Vec2::ZERO,
            movement_cost: 1,
        };
        let route = Route::new(vec![step, step], vec![1.0]);
        assert!(route.cumulative_costs().is_empty());
        assert_eq!(route.total_cost(), 0.0);

        let route = Route::new(vec![step, step], vec![1.0, 2.5]);
        assert_eq!(route.total_cost(), 2.5);
    }

    fn target(id: u32, position: Vec2, alive: bool) -> TargetSnapshot {
        TargetSnapshot {
            id: TargetId::new(id),
            position,
            alive,
        }
    }
}
