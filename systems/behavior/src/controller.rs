//! Per-agent behavior state machine.

use std::{
    collections::VecDeque,
    sync::mpsc::{self, Receiver, Sender},
    time::Duration,
};

use glam::Vec2;
use harbor_patrol_core::{
    AgentId, AgentState, Algorithm, Event, PathOutcome, RequestTicket, TargetId, TargetView,
};
use harbor_patrol_system_dispatch::PathRequestDispatcher;
use harbor_patrol_world::RouteProgressTracker;

use crate::{
    config::BehaviorConfig,
    navigation::{Navigation, NavigationSource},
    squad::{Alert, MemberStatus, Squad},
};

/// Shared state lent to a controller for one logic tick.
pub struct TickContext<'a> {
    /// Targets visible this tick.
    pub targets: &'a TargetView,
    /// Coordination state shared with the other agents.
    pub squad: &'a mut Squad,
    /// Dispatcher receiving path requests.
    pub dispatcher: &'a mut PathRequestDispatcher,
    /// Sink for emitted events.
    pub events: &'a mut Vec<Event>,
}

/// Point-in-time view of a controller.
#[derive(Clone, Debug, PartialEq)]
pub struct AgentSnapshot {
    /// Identifier of the agent.
    pub id: AgentId,
    /// Display name of the agent.
    pub name: String,
    /// Current behavior state.
    pub state: AgentState,
    /// Solver used for the most recent path request.
    pub algorithm: Algorithm,
    /// World position.
    pub position: Vec2,
    /// Displacement per second during the last physics tick.
    pub velocity: Vec2,
    /// Unit direction of the last path-following move.
    pub heading: Vec2,
    /// Target being pursued.
    pub target: Option<TargetId>,
    /// Cooperating partner.
    pub partner: Option<AgentId>,
    /// Whether the target was adopted from the partner.
    pub cooperative_follower: bool,
    /// Tour waypoint held when pursuit began.
    pub last_known_waypoint: Option<Vec2>,
    /// Path waypoints not yet reached.
    pub remaining_waypoints: usize,
    /// Index reached along the tracked route.
    pub route_progress: usize,
}

#[derive(Debug)]
struct PathDelivery {
    algorithm: Algorithm,
    goal: Vec2,
    outcome: PathOutcome,
}

/// Drives one agent between patrol, pursuit and re-pathing.
///
/// The controller runs two phases per simulation step. [`Self::tick_logic`]
/// evaluates transitions and issues path requests; [`Self::tick_physics`]
/// moves the agent. Path results arrive through a private channel and are
/// applied at the start of the next logic tick, so a result only ever swaps
/// the followed path and never changes the state.
#[derive(Debug)]
pub struct AgentBehaviorController<N = Navigation> {
    id: AgentId,
    name: String,
    config: BehaviorConfig,
    navigation: N,
    state: AgentState,
    algorithm: Algorithm,
    position: Vec2,
    velocity: Vec2,
    heading: Vec2,
    chase_velocity: Vec2,
    partner: Option<AgentId>,
    target: Option<TargetId>,
    cooperative_follower: bool,
    last_known_waypoint: Option<Vec2>,
    path: Vec<Vec2>,
    path_index: usize,
    tracker: RouteProgressTracker,
    clock: Duration,
    next_repath: Duration,
    next_follow_repath: Duration,
    started: bool,
    pending: VecDeque<RequestTicket>,
    deliveries: Sender<PathDelivery>,
    inbox: Receiver<PathDelivery>,
}

impl<N: NavigationSource> AgentBehaviorController<N> {
    /// Creates a controller at the origin in its navigation's initial state.
    pub fn new(id: AgentId, name: impl Into<String>, navigation: N, config: BehaviorConfig) -> Self {
        let (deliveries, inbox) = mpsc::channel();
        let state = navigation.initial_state();
        let algorithm = match state {
            AgentState::Recalculating => config.fixed_goal_algorithm,
            _ => Algorithm::UniformCost,
        };
        Self {
            id,
            name: name.into(),
            config,
            navigation,
            state,
            algorithm,
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            heading: Vec2::ZERO,
            chase_velocity: Vec2::ZERO,
            partner: None,
            target: None,
            cooperative_follower: false,
            last_known_waypoint: None,
            path: Vec::new(),
            path_index: 0,
            tracker: RouteProgressTracker::default(),
            clock: Duration::ZERO,
            next_repath: Duration::ZERO,
            next_follow_repath: Duration::ZERO,
            started: false,
            pending: VecDeque::new(),
            deliveries,
            inbox,
        }
    }

    /// Places the agent at `position`.
    #[must_use]
    pub fn with_position(mut self, position: Vec2) -> Self {
        self.position = position;
        self
    }

    /// Pairs the agent with a cooperating partner.
    #[must_use]
    pub fn with_partner(mut self, partner: AgentId) -> Self {
        self.partner = Some(partner);
        self
    }

    /// Replaces the cooperating partner.
    pub fn set_partner(&mut self, partner: Option<AgentId>) {
        self.partner = partner;
    }

    /// Identifier of the agent.
    #[must_use]
    pub const fn id(&self) -> AgentId {
        self.id
    }

    /// Display name of the agent.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current behavior state.
    #[must_use]
    pub const fn state(&self) -> AgentState {
        self.state
    }

    /// World position.
    #[must_use]
    pub const fn position(&self) -> Vec2 {
        self.position
    }

    /// Target being pursued.
    #[must_use]
    pub const fn target(&self) -> Option<TargetId> {
        self.target
    }

    /// Cooperating partner.
    #[must_use]
    pub const fn partner(&self) -> Option<AgentId> {
        self.partner
    }

    /// Whether the current target was adopted from the partner.
    #[must_use]
    pub const fn is_cooperative_follower(&self) -> bool {
        self.cooperative_follower
    }

    /// Waypoints of the followed path.
    #[must_use]
    pub fn path(&self) -> &[Vec2] {
        &self.path
    }

    /// Index of the path waypoint being approached.
    #[must_use]
    pub const fn path_index(&self) -> usize {
        self.path_index
    }

    /// Progress along the last uniform-cost route.
    #[must_use]
    pub const fn tracker(&self) -> &RouteProgressTracker {
        &self.tracker
    }

    /// Navigation source of the agent.
    #[must_use]
    pub const fn navigation(&self) -> &N {
        &self.navigation
    }

    /// Behavior parameters of the agent.
    #[must_use]
    pub const fn config(&self) -> &BehaviorConfig {
        &self.config
    }

    /// Number of path requests still awaiting a result.
    #[must_use]
    pub fn awaiting_paths(&self) -> usize {
        self.pending.len()
    }

    /// Captures the observable state of the agent.
    #[must_use]
    pub fn snapshot(&self) -> AgentSnapshot {
        AgentSnapshot {
            id: self.id,
            name: self.name.clone(),
            state: self.state,
            algorithm: self.algorithm,
            position: self.position,
            velocity: self.velocity,
            heading: self.heading,
            target: self.target,
            partner: self.partner,
            cooperative_follower: self.cooperative_follower,
            last_known_waypoint: self.last_known_waypoint,
            remaining_waypoints: self.path.len().saturating_sub(self.path_index),
            route_progress: self.tracker.current_index(),
        }
    }

    /// Runs the decision phase of one simulation step.
    pub fn tick_logic(&mut self, dt: Duration, ctx: &mut TickContext<'_>) {
        self.clock = self.clock.saturating_add(dt);
        if !self.started {
            self.started = true;
            self.start(ctx);
        }

        self.drain_deliveries(ctx.events);
        for alert in ctx.squad.take_alerts_for(self.id) {
            self.receive_cooperative_alert(alert.from, alert.target, ctx);
        }

        match self.state {
            AgentState::Patrol => {
                self.check_for_targets(ctx);
                if self.state == AgentState::Patrol {
                    self.check_waypoint_reached(ctx);
                }
            }
            AgentState::Following | AgentState::Attack => {
                self.check_target_validity(ctx);
                if self.state == AgentState::Following && self.clock >= self.next_follow_repath {
                    self.repath_to_target(ctx);
                }
            }
            AgentState::Idle | AgentState::Recalculating => {}
        }

        if !self.state.is_pursuing() && self.clock >= self.next_repath {
            if let Some(goal) = self.navigation.fixed_goal(ctx.targets) {
                self.set_state(AgentState::Recalculating, ctx.events);
                self.algorithm = self.config.fixed_goal_algorithm;
                self.request_path(ctx, goal, self.algorithm);
                self.next_repath = self.clock.saturating_add(self.config.repath_period());
            }
        }

        ctx.squad.publish(
            self.id,
            MemberStatus {
                state: self.state,
                target: self.target,
            },
        );
    }

    /// Runs the movement phase of one simulation step.
    pub fn tick_physics(&mut self, dt: Duration) {
        let seconds = dt.as_secs_f32();
        if self.tracker.has_route() {
            self.tracker.update_progress_by_position(self.position);
        }

        let start = self.position;
        match self.state {
            AgentState::Attack => self.position += self.chase_velocity * seconds,
            AgentState::Idle => {}
            AgentState::Patrol | AgentState::Following | AgentState::Recalculating => {
                self.follow_path(self.config.move_speed * seconds);
            }
        }
        self.velocity = if seconds > 0.0 {
            (self.position - start) / seconds
        } else {
            Vec2::ZERO
        };
    }

    /// Asks the partner to pursue the current target.
    ///
    /// Returns `false` when the agent has no partner or no target.
    pub fn alert_partner(&mut self, squad: &mut Squad, events: &mut Vec<Event>) -> bool {
        let (Some(partner), Some(target)) = (self.partner, self.target) else {
            return false;
        };
        squad.alert(Alert {
            from: self.id,
            to: partner,
            target,
        });
        events.push(Event::AlertSent {
            from: self.id,
            to: partner,
            target,
        });
        tracing::info!(agent = %self.name, partner = partner.get(), target = target.get(), "partner alerted");
        true
    }

    /// Switches to following `target` regardless of its distance.
    ///
    /// Alerts for a target already being pursued, or for a target that is
    /// gone, are ignored.
    pub fn receive_cooperative_alert(
        &mut self,
        from: AgentId,
        target: TargetId,
        ctx: &mut TickContext<'_>,
    ) {
        if self.state.is_pursuing() && self.target == Some(target) {
            return;
        }
        if !ctx.targets.get(target).is_some_and(|snapshot| snapshot.alive) {
            tracing::debug!(agent = %self.name, target = target.get(), "alert for missing target ignored");
            return;
        }

        tracing::info!(agent = %self.name, from = from.get(), target = target.get(), "cooperative alert received");
        self.last_known_waypoint = self.navigation.patrol_goal();
        self.target = Some(target);
        self.cooperative_follower = self.partner == Some(from);
        ctx.events.push(Event::TargetAcquired {
            agent: self.id,
            target,
            cooperative: true,
        });
        self.transition_to_following(ctx);
    }

    fn start(&mut self, ctx: &mut TickContext<'_>) {
        match self.state {
            AgentState::Patrol => {
                if let Some(goal) = self.navigation.patrol_goal() {
                    self.request_path(ctx, goal, Algorithm::UniformCost);
                }
            }
            AgentState::Idle => {
                tracing::warn!(agent = %self.name, "no patrol tour or fixed goal configured; idling");
            }
            AgentState::Recalculating | AgentState::Following | AgentState::Attack => {}
        }
    }

    fn drain_deliveries(&mut self, events: &mut Vec<Event>) {
        while let Ok(delivery) = self.inbox.try_recv() {
            self.on_path_found(delivery, events);
        }
    }

    fn on_path_found(&mut self, delivery: PathDelivery, events: &mut Vec<Event>) {
        let PathDelivery {
            algorithm,
            goal,
            outcome,
        } = delivery;
        let PathOutcome {
            mut waypoints,
            success,
            route,
        } = outcome;

        if let Some(ticket) = self.pending.pop_front() {
            events.push(Event::PathResolved {
                agent: self.id,
                ticket,
                success,
                waypoints: waypoints.len(),
            });
        }

        let Some(&last) = waypoints.last().filter(|_| success) else {
            tracing::warn!(
                agent = %self.name,
                state = self.state.label(),
                algorithm = algorithm.label(),
                "no path found; keeping current path"
            );
            return;
        };

        let gap = last.distance(goal);
        if gap > self.config.path_node_reach_distance && gap <= self.config.goal_approach_distance {
            waypoints.push(goal);
        }
        if algorithm == Algorithm::UniformCost {
            if let Some(route) = route.as_ref() {
                self.tracker.set_from_route(route);
            }
        }

        self.path_index = nearest_waypoint(&waypoints, self.position);
        self.path = waypoints;
        self.heading = Vec2::ZERO;
    }

    fn check_for_targets(&mut self, ctx: &mut TickContext<'_>) {
        if let Some(target) = self.partner_target(ctx) {
            self.acquire(target, true, ctx);
            return;
        }

        let nearest = ctx
            .targets
            .nearest_alive(self.position, self.config.follow_range)
            .map(|snapshot| snapshot.id);
        if let Some(target) = nearest {
            self.acquire(target, false, ctx);
        }
    }

    fn partner_target(&self, ctx: &TickContext<'_>) -> Option<TargetId> {
        let status = ctx.squad.member(self.partner?)?;
        if !status.state.is_pursuing() {
            return None;
        }
        ctx.targets
            .get(status.target?)
            .filter(|snapshot| snapshot.alive)
            .map(|snapshot| snapshot.id)
    }

    fn partner_pursuing(&self, squad: &Squad) -> bool {
        self.partner
            .and_then(|partner| squad.member(partner))
            .is_some_and(|status| status.state.is_pursuing())
    }

    fn acquire(&mut self, target: TargetId, cooperative: bool, ctx: &mut TickContext<'_>) {
        self.last_known_waypoint = self.navigation.patrol_goal();
        self.target = Some(target);
        self.cooperative_follower = cooperative;
        ctx.events.push(Event::TargetAcquired {
            agent: self.id,
            target,
            cooperative,
        });
        tracing::info!(agent = %self.name, target = target.get(), cooperative, "target acquired");

        let close = self
            .target_position(ctx.targets)
            .is_some_and(|position| self.position.distance(position) <= self.config.attack_range);
        if close {
            self.transition_to_attack(ctx);
        } else {
            self.transition_to_following(ctx);
        }
    }

    fn check_target_validity(&mut self, ctx: &mut TickContext<'_>) {
        let Some(target) = self
            .target
            .and_then(|id| ctx.targets.get(id))
            .filter(|snapshot| snapshot.alive)
            .copied()
        else {
            tracing::info!(agent = %self.name, "target lost");
            self.transition_to_patrol(ctx);
            return;
        };

        let distance = self.position.distance(target.position);
        if distance <= self.config.attack_range {
            if self.state != AgentState::Attack {
                self.transition_to_attack(ctx);
            }
        } else if distance <= self.config.follow_range && self.state != AgentState::Following {
            self.transition_to_following(ctx);
        }

        if self.cooperative_follower && self.partner.is_some() {
            if !self.partner_pursuing(ctx.squad) {
                tracing::debug!(agent = %self.name, "partner stopped pursuing");
                self.transition_to_patrol(ctx);
                return;
            }
            if distance > self.config.lose_target_range {
                self.update_chase(target.position);
                return;
            }
        }

        if distance > self.config.lose_target_range {
            tracing::debug!(agent = %self.name, distance, "target out of range");
            self.transition_to_patrol(ctx);
            return;
        }
        self.update_chase(target.position);
    }

    fn check_waypoint_reached(&mut self, ctx: &mut TickContext<'_>) {
        let Some(goal) = self.navigation.patrol_goal() else {
            return;
        };
        if self.position.distance(goal) > self.config.waypoint_reach_distance {
            return;
        }

        let reached = self.navigation.patrol_index().unwrap_or_default();
        if !self.navigation.advance_patrol() {
            return;
        }
        ctx.events.push(Event::WaypointReached {
            agent: self.id,
            waypoint: reached,
        });
        if let Some(next) = self.navigation.patrol_goal() {
            tracing::debug!(agent = %self.name, waypoint = reached, "patrol waypoint reached");
            self.request_path(ctx, next, Algorithm::UniformCost);
        }
    }

    fn transition_to_following(&mut self, ctx: &mut TickContext<'_>) {
        self.set_state(AgentState::Following, ctx.events);
        self.algorithm = Algorithm::Heuristic;
        self.chase_velocity = Vec2::ZERO;
        self.clear_path();
        if !self.cooperative_follower {
            if let Some(target) = self.target {
                ctx.squad.claim_target(self.id, target);
            }
        }
        self.repath_to_target(ctx);
    }

    fn transition_to_attack(&mut self, ctx: &mut TickContext<'_>) {
        self.set_state(AgentState::Attack, ctx.events);
        self.algorithm = Algorithm::Heuristic;
        self.clear_path();
        if let Some(target) = self.target {
            let _ = ctx.squad.propose_target(self.id, target);
        }
        if let Some(position) = self.target_position(ctx.targets) {
            self.update_chase(position);
        }
    }

    fn transition_to_patrol(&mut self, ctx: &mut TickContext<'_>) {
        if let Some(target) = self.target.take() {
            ctx.events.push(Event::TargetReleased {
                agent: self.id,
                target,
            });
        }
        let _ = ctx.squad.clear_if_initiator(self.id);
        self.cooperative_follower = false;
        self.chase_velocity = Vec2::ZERO;
        self.clear_path();
        self.algorithm = Algorithm::UniformCost;

        // Agents without a tour or fixed goal go back to rest.
        if self.navigation.initial_state() == AgentState::Idle {
            self.set_state(AgentState::Idle, ctx.events);
            return;
        }
        self.set_state(AgentState::Patrol, ctx.events);

        match self.navigation.resume_nearest(self.position) {
            Some(goal) => self.request_path(ctx, goal, Algorithm::UniformCost),
            None => tracing::debug!(agent = %self.name, "no patrol tour to resume"),
        }
    }

    fn set_state(&mut self, next: AgentState, events: &mut Vec<Event>) {
        if self.state == next {
            return;
        }
        tracing::info!(
            agent = %self.name,
            from = self.state.label(),
            to = next.label(),
            "state transition"
        );
        events.push(Event::StateChanged {
            agent: self.id,
            from: self.state,
            to: next,
        });
        self.state = next;
    }

    fn repath_to_target(&mut self, ctx: &mut TickContext<'_>) {
        self.next_follow_repath = self
            .clock
            .saturating_add(self.config.follow_repath_period());
        if let Some(goal) = self.target_position(ctx.targets) {
            self.request_path(ctx, goal, Algorithm::Heuristic);
        }
    }

    fn request_path(&mut self, ctx: &mut TickContext<'_>, goal: Vec2, algorithm: Algorithm) {
        let deliveries = self.deliveries.clone();
        let ticket = ctx
            .dispatcher
            .request(self.position, goal, algorithm, move |outcome| {
                let _ = deliveries.send(PathDelivery {
                    algorithm,
                    goal,
                    outcome,
                });
            });
        self.pending.push_back(ticket);
        ctx.events.push(Event::PathRequested {
            agent: self.id,
            ticket,
            algorithm,
        });
    }

    fn update_chase(&mut self, target_position: Vec2) {
        self.chase_velocity = Vec2::ZERO;
        if self.state != AgentState::Attack {
            return;
        }
        let offset = target_position - self.position;
        if offset.length() > self.config.stop_distance {
            self.chase_velocity = offset.normalize_or_zero() * self.config.move_speed;
        }
    }

    fn follow_path(&mut self, mut budget: f32) {
        while let Some(&waypoint) = self.path.get(self.path_index) {
            let offset = waypoint - self.position;
            let distance = offset.length();
            if distance <= self.config.path_node_reach_distance {
                self.path_index += 1;
                continue;
            }
            if budget <= 0.0 {
                break;
            }

            self.heading = offset / distance;
            if distance <= budget {
                self.position = waypoint;
                budget -= distance;
                self.path_index += 1;
            } else {
                self.position += self.heading * budget;
                break;
            }
        }
    }

    fn target_position(&self, targets: &TargetView) -> Option<Vec2> {
        targets.get(self.target?).map(|snapshot| snapshot.position)
    }

    fn clear_path(&mut self) {
        self.path.clear();
        self.path_index = 0;
        self.heading = Vec2::ZERO;
    }
}

fn nearest_waypoint(waypoints: &[Vec2], position: Vec2) -> usize {
    let mut best = (0, f32::INFINITY);
    for (index, waypoint) in waypoints.iter().enumerate() {
        let distance = waypoint.distance_squared(position);
        if distance < best.1 {
            best = (index, distance);
        }
    }
    best.0
}
