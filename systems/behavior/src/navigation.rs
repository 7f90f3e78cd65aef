//! Where an agent heads when it is not pursuing anything.

use glam::Vec2;
use harbor_patrol_core::{AgentState, TargetId, TargetView};

/// Supplies the non-pursuit goals of an agent.
pub trait NavigationSource {
    /// State the agent enters when it starts.
    fn initial_state(&self) -> AgentState;

    /// Tour waypoint the agent is currently heading for.
    fn patrol_goal(&self) -> Option<Vec2>;

    /// Index of the current tour waypoint.
    fn patrol_index(&self) -> Option<usize>;

    /// Moves to the next tour waypoint, returning whether the goal changed.
    fn advance_patrol(&mut self) -> bool;

    /// Re-targets the tour waypoint closest to `position` and returns it.
    fn resume_nearest(&mut self, position: Vec2) -> Option<Vec2>;

    /// Fixed goal to re-path toward outside of patrols.
    fn fixed_goal(&self, targets: &TargetView) -> Option<Vec2>;
}

/// Ordered waypoints walked back and forth.
#[derive(Clone, Debug, PartialEq)]
pub struct PatrolTour {
    waypoints: Vec<Vec2>,
    index: usize,
    forward: bool,
}

impl PatrolTour {
    /// Creates a tour heading for its first waypoint.
    #[must_use]
    pub fn new(waypoints: Vec<Vec2>) -> Self {
        Self {
            waypoints,
            index: 0,
            forward: true,
        }
    }

    /// Waypoints in tour order.
    #[must_use]
    pub fn waypoints(&self) -> &[Vec2] {
        &self.waypoints
    }

    /// Index of the current waypoint.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Reports whether the tour is walked in ascending order.
    #[must_use]
    pub const fn is_forward(&self) -> bool {
        self.forward
    }

    /// Current waypoint, if the tour has any.
    #[must_use]
    pub fn current(&self) -> Option<Vec2> {
        self.waypoints.get(self.index).copied()
    }

    /// Steps to the next waypoint, reversing at either end.
    ///
    /// Tours with fewer than two waypoints never move.
    pub fn advance(&mut self) -> bool {
        let len = self.waypoints.len();
        if len < 2 {
            return false;
        }

        if self.forward {
            self.index += 1;
            if self.index >= len {
                self.index = len - 2;
                self.forward = false;
            }
        } else if self.index == 0 {
            self.index = 1;
            self.forward = true;
        } else {
            self.index -= 1;
        }
        true
    }

    /// Jumps to the waypoint nearest `position`, keeping the walk direction.
    ///
    /// Ties go to the earliest waypoint.
    pub fn snap_to_nearest(&mut self, position: Vec2) -> Option<Vec2> {
        let mut best: Option<(usize, f32)> = None;
        for (index, waypoint) in self.waypoints.iter().enumerate() {
            let distance = waypoint.distance(position);
            if best.map_or(true, |(_, closest)| distance < closest) {
                best = Some((index, distance));
            }
        }

        let (index, _) = best?;
        self.index = index;
        self.current()
    }
}

impl NavigationSource for PatrolTour {
    fn initial_state(&self) -> AgentState {
        if self.waypoints.is_empty() {
            AgentState::Idle
        } else {
            AgentState::Patrol
        }
    }

    fn patrol_goal(&self) -> Option<Vec2> {
        self.current()
    }

    fn patrol_index(&self) -> Option<usize> {
        self.current().map(|_| self.index)
    }

    fn advance_patrol(&mut self) -> bool {
        self.advance()
    }

    fn resume_nearest(&mut self, position: Vec2) -> Option<Vec2> {
        self.snap_to_nearest(position)
    }

    fn fixed_goal(&self, _targets: &TargetView) -> Option<Vec2> {
        None
    }
}

/// Destination of a fixed-goal agent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum FixedGoal {
    /// A static world position.
    Point(Vec2),
    /// The current position of a target, alive or not.
    Target(TargetId),
}

/// Navigation that periodically re-paths toward one goal.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FixedTarget {
    goal: FixedGoal,
}

impl FixedTarget {
    /// Heads for a static position.
    #[must_use]
    pub const fn point(position: Vec2) -> Self {
        Self {
            goal: FixedGoal::Point(position),
        }
    }

    /// Heads for wherever a target currently stands.
    #[must_use]
    pub const fn tracking(target: TargetId) -> Self {
        Self {
            goal: FixedGoal::Target(target),
        }
    }
}

impl NavigationSource for FixedTarget {
    fn initial_state(&self) -> AgentState {
        AgentState::Recalculating
    }

    fn patrol_goal(&self) -> Option<Vec2> {
        None
    }

    fn patrol_index(&self) -> Option<usize> {
        None
    }

    fn advance_patrol(&mut self) -> bool {
        false
    }

    fn resume_nearest(&mut self, _position: Vec2) -> Option<Vec2> {
        None
    }

    fn fixed_goal(&self, targets: &TargetView) -> Option<Vec2> {
        match self.goal {
            FixedGoal::Point(position) => Some(position),
            FixedGoal::Target(id) => targets.get(id).map(|target| target.position),
        }
    }
}

/// Navigation configured for an agent.
#[derive(Clone, Debug, PartialEq)]
pub enum Navigation {
    /// Walks a waypoint tour.
    Tour(PatrolTour),
    /// Re-paths toward a fixed goal.
    Fixed(FixedTarget),
    /// Nothing configured; the agent idles.
    Unconfigured,
}

impl NavigationSource for Navigation {
    fn initial_state(&self) -> AgentState {
        match self {
            Self::Tour(tour) => tour.initial_state(),
            Self::Fixed(fixed) => fixed.initial_state(),
            Self::Unconfigured => AgentState::Idle,
        }
    }

    fn patrol_goal(&self) -> Option<Vec2> {
        match self {
            Self::Tour(tour) => tour.patrol_goal(),
            Self::Fixed(_) | Self::Unconfigured => None,
        }
    }

    fn patrol_index(&self) -> Option<usize> {
        match self {
            Self::Tour(tour) => tour.patrol_index(),
            Self::Fixed(_) | Self::Unconfigured => None,
        }
    }

    fn advance_patrol(&mut self) -> bool {
        match self {
            Self::Tour(tour) => tour.advance_patrol(),
            Self::Fixed(_) | Self::Unconfigured => false,
        }
    }

    fn resume_nearest(&mut self, position: Vec2) -> Option<Vec2> {
        match self {
            Self::Tour(tour) => tour.resume_nearest(position),
            Self::Fixed(_) | Self::Unconfigured => None,
        }
    }

    fn fixed_goal(&self, targets: &TargetView) -> Option<Vec2> {
        match self {
            Self::Fixed(fixed) => fixed.fixed_goal(targets),
            Self::Tour(_) | Self::Unconfigured => None,
        }
    }
}
