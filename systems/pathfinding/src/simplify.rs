//! Collapses a cell route into direction-change waypoints.

use glam::Vec2;
use harbor_patrol_core::Route;

/// Reduces a route to the cells where the step direction changes.
///
/// The first waypoint is the start cell whenever the route has more than one
/// cell, and the goal cell position always closes the list.
#[must_use]
pub fn simplify_waypoints(route: &Route) -> Vec<Vec2> {
    let steps = route.steps();
    let Some(last) = steps.last() else {
        return Vec::new();
    };

    let mut waypoints = Vec::new();
    let mut previous_direction = (0, 0);
    for pair in steps.windows(2) {
        let direction = pair[0].cell.offset_to(pair[1].cell);
        if direction != previous_direction {
            waypoints.push(pair[0].position);
            previous_direction = direction;
        }
    }
    waypoints.push(last.position);
    waypoints
}
