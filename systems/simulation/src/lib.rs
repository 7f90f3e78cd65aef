#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative Harbor Patrol simulation.
//!
//! The [`Simulation`] owns the grid, the path dispatcher, the squad and every
//! agent controller. Adapters drive it exclusively through [`apply`] and read
//! it back through [`query`]. Each [`Command::Tick`] pumps the dispatcher,
//! runs the logic phase of every agent in insertion order and then the
//! physics phase, so a path requested during a tick is applied during the
//! next one.

use std::{collections::BTreeMap, time::Duration};

use glam::Vec2;
use harbor_patrol_core::{AgentId, Command, Event, TargetId, TargetSnapshot, TargetView};
use harbor_patrol_system_behavior::{
    AgentBehaviorController, BehaviorConfig, Navigation, Squad, TickContext,
};
use harbor_patrol_system_dispatch::PathRequestDispatcher;
use harbor_patrol_world::GridMap;
use thiserror::Error;

/// Description of an agent added to the simulation.
#[derive(Clone, Debug, PartialEq)]
pub struct AgentSpec {
    /// Identifier of the agent.
    pub id: AgentId,
    /// Display name used in logs.
    pub name: String,
    /// Starting position.
    pub position: Vec2,
    /// Tour or fixed goal of the agent.
    pub navigation: Navigation,
    /// Behavior parameters of the agent.
    pub config: BehaviorConfig,
}

/// Reasons the roster of a simulation cannot be changed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum SimulationError {
    /// Another agent already uses the identifier.
    #[error("agent {} already exists", .0.get())]
    DuplicateAgent(AgentId),
    /// No agent uses the identifier.
    #[error("agent {} does not exist", .0.get())]
    UnknownAgent(AgentId),
    /// An agent cannot partner with itself.
    #[error("agent {} cannot partner with itself", .0.get())]
    SelfPartner(AgentId),
}

/// Complete simulation state.
#[derive(Debug)]
pub struct Simulation {
    grid: GridMap,
    dispatcher: PathRequestDispatcher,
    squad: Squad,
    agents: Vec<AgentBehaviorController>,
    targets: BTreeMap<TargetId, TargetSnapshot>,
    tick_index: u64,
    elapsed: Duration,
}

impl Simulation {
    /// Creates an empty simulation over `grid` with the stock solvers.
    #[must_use]
    pub fn new(grid: GridMap) -> Self {
        Self::with_dispatcher(grid, PathRequestDispatcher::new())
    }

    /// Creates an empty simulation that routes requests through `dispatcher`.
    #[must_use]
    pub fn with_dispatcher(grid: GridMap, dispatcher: PathRequestDispatcher) -> Self {
        Self {
            grid,
            dispatcher,
            squad: Squad::new(),
            agents: Vec::new(),
            targets: BTreeMap::new(),
            tick_index: 0,
            elapsed: Duration::ZERO,
        }
    }

    /// Adds an agent; agents tick in the order they were added.
    pub fn add_agent(&mut self, spec: AgentSpec) -> Result<(), SimulationError> {
        if self.agent_index(spec.id).is_some() {
            return Err(SimulationError::DuplicateAgent(spec.id));
        }
        tracing::debug!(agent = %spec.name, id = spec.id.get(), "agent added");
        let controller =
            AgentBehaviorController::new(spec.id, spec.name, spec.navigation, spec.config)
                .with_position(spec.position);
        self.agents.push(controller);
        Ok(())
    }

    /// Makes two agents each other's cooperating partner.
    pub fn pair(&mut self, first: AgentId, second: AgentId) -> Result<(), SimulationError> {
        if first == second {
            return Err(SimulationError::SelfPartner(first));
        }
        let first_index = self
            .agent_index(first)
            .ok_or(SimulationError::UnknownAgent(first))?;
        let second_index = self
            .agent_index(second)
            .ok_or(SimulationError::UnknownAgent(second))?;

        self.release_partner(first_index, second);
        self.release_partner(second_index, first);
        self.agents[first_index].set_partner(Some(second));
        self.agents[second_index].set_partner(Some(first));
        Ok(())
    }

    /// Drops the back-link of an agent's previous partner unless it is `keep`.
    fn release_partner(&mut self, index: usize, keep: AgentId) {
        let id = self.agents[index].id();
        let Some(previous) = self.agents[index].partner().filter(|&partner| partner != keep) else {
            return;
        };
        if let Some(old) = self.agent_index(previous) {
            if self.agents[old].partner() == Some(id) {
                tracing::debug!(agent = previous.get(), former = id.get(), "partnership dissolved");
                self.agents[old].set_partner(None);
            }
        }
    }

    /// Dispatcher used for path requests, for enabling or replacing solvers.
    pub fn dispatcher_mut(&mut self) -> &mut PathRequestDispatcher {
        &mut self.dispatcher
    }

    fn agent_index(&self, id: AgentId) -> Option<usize> {
        self.agents.iter().position(|agent| agent.id() == id)
    }

    fn target_view(&self) -> TargetView {
        TargetView::from_snapshots(self.targets.values().copied().collect())
    }

    fn step(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        self.tick_index = self.tick_index.saturating_add(1);
        self.elapsed = self.elapsed.saturating_add(dt);
        out_events.push(Event::TimeAdvanced { dt });

        let resolved = self.dispatcher.pump(&self.grid);
        let view = self.target_view();
        for agent in &mut self.agents {
            let mut ctx = TickContext {
                targets: &view,
                squad: &mut self.squad,
                dispatcher: &mut self.dispatcher,
                events: &mut *out_events,
            };
            agent.tick_logic(dt, &mut ctx);
        }
        for agent in &mut self.agents {
            agent.tick_physics(dt);
        }

        tracing::trace!(
            tick = self.tick_index,
            resolved,
            pending = self.dispatcher.pending(),
            "simulation stepped"
        );
    }
}

/// Applies the provided command to the simulation.
pub fn apply(simulation: &mut Simulation, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::Tick { dt } => simulation.step(dt, out_events),
        Command::PlaceTarget { target, position } => {
            if simulation.targets.contains_key(&target) {
                out_events.push(Event::TargetRejected { target });
                return;
            }
            let _ = simulation.targets.insert(
                target,
                TargetSnapshot {
                    id: target,
                    position,
                    alive: true,
                },
            );
        }
        Command::MoveTarget { target, position } => {
            match simulation.targets.get_mut(&target) {
                Some(snapshot) => snapshot.position = position,
                None => out_events.push(Event::TargetRejected { target }),
            }
        }
        Command::SetTargetAlive { target, alive } => match simulation.targets.get_mut(&target) {
            Some(snapshot) => snapshot.alive = alive,
            None => out_events.push(Event::TargetRejected { target }),
        },
        Command::RemoveTarget { target } => {
            if simulation.targets.remove(&target).is_none() {
                out_events.push(Event::TargetRejected { target });
                return;
            }
            simulation.squad.forget_target(target);
        }
        Command::AlertPartner { agent } => {
            let Some(index) = simulation.agent_index(agent) else {
                tracing::warn!(agent = agent.get(), "alert from unknown agent ignored");
                return;
            };
            let Simulation { agents, squad, .. } = simulation;
            if !agents[index].alert_partner(squad, out_events) {
                tracing::debug!(agent = agent.get(), "agent has no partner or target to share");
            }
        }
    }
}

/// Read-only views of the simulation.
pub mod query {
    use std::time::Duration;

    use harbor_patrol_core::{AgentId, TargetView};
    use harbor_patrol_system_behavior::{AgentSnapshot, CooperativeTarget};
    use harbor_patrol_system_dispatch::DispatchStats;
    use harbor_patrol_world::{GridMap, RouteLabel, RouteLabelMode};

    use super::Simulation;

    /// Snapshots of every agent in tick order.
    #[must_use]
    pub fn agents(simulation: &Simulation) -> Vec<AgentSnapshot> {
        simulation.agents.iter().map(|agent| agent.snapshot()).collect()
    }

    /// Snapshot of one agent.
    #[must_use]
    pub fn agent(simulation: &Simulation, id: AgentId) -> Option<AgentSnapshot> {
        simulation
            .agent_index(id)
            .map(|index| simulation.agents[index].snapshot())
    }

    /// Every target known to the simulation.
    #[must_use]
    pub fn targets(simulation: &Simulation) -> TargetView {
        simulation.target_view()
    }

    /// Target the squad is converging on.
    #[must_use]
    pub fn cooperative_target(simulation: &Simulation) -> Option<CooperativeTarget> {
        simulation.squad.current_target()
    }

    /// Grid the agents navigate.
    #[must_use]
    pub fn grid(simulation: &Simulation) -> &GridMap {
        &simulation.grid
    }

    /// Path dispatcher counters.
    #[must_use]
    pub fn dispatch_stats(simulation: &Simulation) -> DispatchStats {
        simulation.dispatcher.stats()
    }

    /// Overlay labels for the route an agent is tracking.
    #[must_use]
    pub fn route_labels(
        simulation: &Simulation,
        id: AgentId,
        mode: RouteLabelMode,
    ) -> Vec<RouteLabel> {
        simulation
            .agent_index(id)
            .map(|index| simulation.agents[index].tracker().labels(mode))
            .unwrap_or_default()
    }

    /// Number of ticks applied so far.
    #[must_use]
    pub fn tick_index(simulation: &Simulation) -> u64 {
        simulation.tick_index
    }

    /// Simulated time elapsed so far.
    #[must_use]
    pub fn elapsed(simulation: &Simulation) -> Duration {
        simulation.elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::{apply, query, AgentSpec, Simulation, SimulationError};
    use glam::Vec2;
    use harbor_patrol_core::{AgentId, Command, Event, TargetId};
    use harbor_patrol_system_behavior::{BehaviorConfig, Navigation};
    use harbor_patrol_world::{GridMap, GridSettings};

    #[test]
    fn roster_rejects_duplicates_and_bad_pairs() {
        let mut simulation = Simulation::new(GridMap::open(GridSettings::default()).expect("grid"));
        simulation.add_agent(spec(1)).expect("first agent");

        assert_eq!(
            simulation.add_agent(spec(1)),
            Err(SimulationError::DuplicateAgent(AgentId::new(1)))
        );
        assert_eq!(
            simulation.pair(AgentId::new(1), AgentId::new(1)),
            Err(SimulationError::SelfPartner(AgentId::new(1)))
        );
        assert_eq!(
            simulation.pair(AgentId::new(1), AgentId::new(9)),
            Err(SimulationError::UnknownAgent(AgentId::new(9)))
        );

        simulation.add_agent(spec(2)).expect("second agent");
        simulation
            .pair(AgentId::new(1), AgentId::new(2))
            .expect("pair");
        let partner = query::agent(&simulation, AgentId::new(2)).and_then(|agent| agent.partner);
        assert_eq!(partner, Some(AgentId::new(1)));

        simulation.add_agent(spec(3)).expect("third agent");
        simulation
            .pair(AgentId::new(3), AgentId::new(1))
            .expect("re-pair");
        let partner_of = |id: u32| {
            query::agent(&simulation, AgentId::new(id)).and_then(|agent| agent.partner)
        };
        assert_eq!(partner_of(1), Some(AgentId::new(3)));
        assert_eq!(partner_of(3), Some(AgentId::new(1)));
        assert_eq!(partner_of(2), None);
    }

    #[test]
    fn target_commands_reject_unknown_or_duplicate_ids() {
        let mut simulation = Simulation::new(GridMap::open(GridSettings::default()).expect("grid"));
        let target = TargetId::new(3);
        let mut events = Vec::new();

        apply(
            &mut simulation,
            Command::PlaceTarget {
                target,
                position: Vec2::ZERO,
            },
            &mut events,
        );
        assert!(events.is_empty());

        apply(
            &mut simulation,
            Command::PlaceTarget {
                target,
                position: Vec2::ONE,
            },
            &mut events,
        );
        apply(
            &mut simulation,
            Command::SetTargetAlive {
                target: TargetId::new(4),
                alive: false,
            },
            &mut events,
        );
        apply(&mut simulation, Command::RemoveTarget { target }, &mut events);
        apply(&mut simulation, Command::RemoveTarget { target }, &mut events);

        assert_eq!(
            events,
            vec![
                Event::TargetRejected { target },
                Event::TargetRejected {
                    target: TargetId::new(4)
                },
                Event::TargetRejected { target },
            ]
        );
        assert!(query::targets(&simulation).is_empty());
    }

    fn spec(id: u32) -> AgentSpec {
        AgentSpec {
            id: AgentId::new(id),
            name: format!("agent-{id}"),
            position: Vec2::ZERO,
            navigation: Navigation::Unconfigured,
            config: BehaviorConfig::default(),
        }
    }
}
