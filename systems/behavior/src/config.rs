//! Tunable radii, speeds and intervals for agent behavior.

use std::time::Duration;

use harbor_patrol_core::Algorithm;
use serde::Deserialize;

/// Behavior parameters shared by every agent unless overridden.
///
/// Distances are world units and intervals are seconds. Missing fields fall
/// back to [`BehaviorConfig::default`] when deserialized.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Travel speed while following paths or chasing.
    pub move_speed: f32,
    /// Distance at which a patrol tour waypoint counts as reached.
    pub waypoint_reach_distance: f32,
    /// Distance at which an intermediate path waypoint counts as reached.
    pub path_node_reach_distance: f32,
    /// Paths ending within this distance of their requested goal are
    /// extended to end exactly on it.
    pub goal_approach_distance: f32,
    /// Radius within which a patrolling agent notices a target.
    pub follow_range: f32,
    /// Radius within which a pursuing agent switches to direct attack.
    pub attack_range: f32,
    /// Stand-off distance kept while attacking.
    pub stop_distance: f32,
    /// Radius beyond which a pursued target is given up.
    pub lose_target_range: f32,
    /// Seconds between path requests toward a fixed goal.
    pub repath_interval: f32,
    /// Seconds between path requests while following a target.
    pub follow_repath_interval: f32,
    /// Solver used for fixed-goal navigation.
    pub fixed_goal_algorithm: Algorithm,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            move_speed: 3.0,
            waypoint_reach_distance: 0.5,
            path_node_reach_distance: 0.1,
            goal_approach_distance: 1.0,
            follow_range: 5.0,
            attack_range: 3.0,
            stop_distance: 2.0,
            lose_target_range: 5.0,
            repath_interval: 1.0,
            follow_repath_interval: 0.5,
            fixed_goal_algorithm: Algorithm::UniformCost,
        }
    }
}

impl BehaviorConfig {
    /// Interval between fixed-goal path requests.
    #[must_use]
    pub fn repath_period(&self) -> Duration {
        seconds(self.repath_interval)
    }

    /// Interval between path requests while following.
    #[must_use]
    pub fn follow_repath_period(&self) -> Duration {
        seconds(self.follow_repath_interval)
    }
}

fn seconds(value: f32) -> Duration {
    Duration::try_from_secs_f32(value.max(0.0)).unwrap_or(Duration::MAX)
}
