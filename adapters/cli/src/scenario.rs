//! TOML scenario files describing a headless run.

use std::collections::BTreeMap;

use glam::Vec2;
use harbor_patrol_core::{AgentId, Algorithm, Command, TargetId};
use harbor_patrol_system_behavior::{BehaviorConfig, FixedTarget, Navigation, PatrolTour};
use harbor_patrol_system_dispatch::PathRequestDispatcher;
use harbor_patrol_system_pathfinding::HeuristicSolver;
use harbor_patrol_system_simulation::{AgentSpec, Simulation, SimulationError};
use harbor_patrol_world::{GridError, GridMap, GridSettings, ObstacleLayout, Shape, TerrainLayer};
use serde::Deserialize;
use thiserror::Error;

/// Scenario used when no file is given on the command line.
const BUILTIN: &str = include_str!("../scenarios/harbor.toml");

/// Errors raised while loading or instantiating a scenario.
#[derive(Debug, Error)]
pub(crate) enum ScenarioError {
    /// The file is not valid TOML or does not match the schema.
    #[error("scenario does not parse: {0}")]
    Parse(#[from] toml::de::Error),
    /// The grid settings are unusable.
    #[error(transparent)]
    Grid(#[from] GridError),
    /// Two agents share a name.
    #[error("agent `{0}` is declared more than once")]
    DuplicateAgent(String),
    /// An agent names a partner that does not exist.
    #[error("agent `{agent}` names unknown partner `{partner}`")]
    UnknownPartner {
        /// Agent declaring the partner.
        agent: String,
        /// Partner name that was not found.
        partner: String,
    },
    /// An agent sets more than one of `tour`, `goal` and `track`.
    #[error("agent `{0}` mixes a tour with a fixed goal")]
    ConflictingNavigation(String),
    /// Two targets share an identifier.
    #[error("target {0} is declared more than once")]
    DuplicateTarget(u32),
    /// The simulation rejected the roster.
    #[error(transparent)]
    Roster(#[from] SimulationError),
}

/// Complete description of a run.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct Scenario {
    pub(crate) run: RunSection,
    pub(crate) grid: GridSection,
    pub(crate) pathfinding: PathfindingSection,
    pub(crate) behavior: BehaviorConfig,
    pub(crate) obstacles: Vec<ObstacleSpec>,
    pub(crate) agents: Vec<AgentEntry>,
    pub(crate) targets: Vec<TargetEntry>,
}

/// Length and seeding of the run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub(crate) struct RunSection {
    pub(crate) steps: u32,
    pub(crate) dt_ms: u64,
    pub(crate) seed: u64,
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            steps: 400,
            dt_ms: 50,
            seed: 0,
        }
    }
}

/// Grid discretization settings.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub(crate) struct GridSection {
    pub(crate) world_size: [f32; 2],
    pub(crate) center: [f32; 2],
    pub(crate) cell_radius: f32,
    pub(crate) default_cost: u32,
    pub(crate) difficult_cost: u32,
    pub(crate) straight_step_cost: f32,
    pub(crate) diagonal_step_cost: f32,
}

impl Default for GridSection {
    fn default() -> Self {
        let settings = GridSettings::default();
        Self {
            world_size: settings.world_size.to_array(),
            center: settings.center.to_array(),
            cell_radius: settings.cell_radius,
            default_cost: settings.default_cost,
            difficult_cost: settings.difficult_cost,
            straight_step_cost: settings.straight_step_cost,
            diagonal_step_cost: settings.diagonal_step_cost,
        }
    }
}

impl GridSection {
    fn settings(&self) -> GridSettings {
        GridSettings {
            world_size: Vec2::from_array(self.world_size),
            center: Vec2::from_array(self.center),
            cell_radius: self.cell_radius,
            default_cost: self.default_cost,
            difficult_cost: self.difficult_cost,
            straight_step_cost: self.straight_step_cost,
            diagonal_step_cost: self.diagonal_step_cost,
        }
    }
}

/// Solver options.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub(crate) struct PathfindingSection {
    /// Scales heuristic search steps by per-cell movement cost.
    pub(crate) heuristic_terrain_cost: bool,
    /// Algorithms whose requests fail as unavailable.
    pub(crate) disabled: Vec<Algorithm>,
}

/// Terrain layer an obstacle belongs to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum LayerSpec {
    #[default]
    Blocking,
    Difficult,
}

impl From<LayerSpec> for TerrainLayer {
    fn from(layer: LayerSpec) -> Self {
        match layer {
            LayerSpec::Blocking => TerrainLayer::Blocking,
            LayerSpec::Difficult => TerrainLayer::Difficult,
        }
    }
}

/// Obstacle shape placed on a terrain layer.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub(crate) enum ObstacleSpec {
    Circle {
        #[serde(default)]
        layer: LayerSpec,
        center: [f32; 2],
        radius: f32,
    },
    Rect {
        #[serde(default)]
        layer: LayerSpec,
        center: [f32; 2],
        size: [f32; 2],
    },
}

impl ObstacleSpec {
    fn placed(&self) -> (TerrainLayer, Shape) {
        match *self {
            Self::Circle {
                layer,
                center,
                radius,
            } => (
                layer.into(),
                Shape::Circle {
                    center: Vec2::from_array(center),
                    radius,
                },
            ),
            Self::Rect {
                layer,
                center,
                size,
            } => (
                layer.into(),
                Shape::rect_from_center(Vec2::from_array(center), Vec2::from_array(size)),
            ),
        }
    }
}

/// Agent declaration.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub(crate) struct AgentEntry {
    pub(crate) name: String,
    pub(crate) position: [f32; 2],
    #[serde(default)]
    pub(crate) tour: Vec<[f32; 2]>,
    #[serde(default)]
    pub(crate) goal: Option<[f32; 2]>,
    #[serde(default)]
    pub(crate) track: Option<u32>,
    #[serde(default)]
    pub(crate) partner: Option<String>,
    #[serde(default)]
    pub(crate) overrides: BehaviorOverrides,
}

impl AgentEntry {
    fn navigation(&self) -> Result<Navigation, ScenarioError> {
        let fixed = match (self.goal, self.track) {
            (Some(_), Some(_)) => return Err(ScenarioError::ConflictingNavigation(self.name.clone())),
            (Some(goal), None) => Some(FixedTarget::point(Vec2::from_array(goal))),
            (None, Some(target)) => Some(FixedTarget::tracking(TargetId::new(target))),
            (None, None) => None,
        };

        match (self.tour.is_empty(), fixed) {
            (false, Some(_)) => Err(ScenarioError::ConflictingNavigation(self.name.clone())),
            (false, None) => Ok(Navigation::Tour(PatrolTour::new(
                self.tour.iter().copied().map(Vec2::from_array).collect(),
            ))),
            (true, Some(fixed)) => Ok(Navigation::Fixed(fixed)),
            (true, None) => Ok(Navigation::Unconfigured),
        }
    }
}

/// Per-agent replacements for the shared behavior defaults.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub(crate) struct BehaviorOverrides {
    pub(crate) move_speed: Option<f32>,
    pub(crate) follow_range: Option<f32>,
    pub(crate) attack_range: Option<f32>,
    pub(crate) stop_distance: Option<f32>,
    pub(crate) lose_target_range: Option<f32>,
}

impl BehaviorOverrides {
    fn apply(&self, base: BehaviorConfig) -> BehaviorConfig {
        BehaviorConfig {
            move_speed: self.move_speed.unwrap_or(base.move_speed),
            follow_range: self.follow_range.unwrap_or(base.follow_range),
            attack_range: self.attack_range.unwrap_or(base.attack_range),
            stop_distance: self.stop_distance.unwrap_or(base.stop_distance),
            lose_target_range: self.lose_target_range.unwrap_or(base.lose_target_range),
            ..base
        }
    }
}

/// Target declaration.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub(crate) struct TargetEntry {
    pub(crate) id: u32,
    pub(crate) position: [f32; 2],
    #[serde(default = "alive_by_default")]
    pub(crate) alive: bool,
    /// Radius around the spawn point the target drifts within.
    #[serde(default)]
    pub(crate) wander: f32,
    /// Step at which the target is placed.
    #[serde(default)]
    pub(crate) appear_at: u32,
    /// Step at which the target dies.
    #[serde(default)]
    pub(crate) expire_at: Option<u32>,
}

fn alive_by_default() -> bool {
    true
}

impl Scenario {
    /// Parses a scenario from TOML text.
    pub(crate) fn parse(text: &str) -> Result<Self, ScenarioError> {
        Ok(toml::from_str(text)?)
    }

    /// Scenario shipped with the binary.
    pub(crate) fn builtin() -> Result<Self, ScenarioError> {
        Self::parse(BUILTIN)
    }

    /// Instantiates the grid, dispatcher and roster.
    pub(crate) fn build(&self) -> Result<Simulation, ScenarioError> {
        let mut layout = ObstacleLayout::new();
        for obstacle in &self.obstacles {
            let (layer, shape) = obstacle.placed();
            layout.add(layer, shape);
        }
        let grid = GridMap::build(self.grid.settings(), &layout)?;

        let mut dispatcher = PathRequestDispatcher::new();
        if self.pathfinding.heuristic_terrain_cost {
            dispatcher.install_solver(Box::new(HeuristicSolver::with_terrain_cost(true)));
        }
        for algorithm in &self.pathfinding.disabled {
            dispatcher.set_solver_enabled(*algorithm, false);
        }

        let mut simulation = Simulation::with_dispatcher(grid, dispatcher);
        let ids = self.agent_ids()?;
        for (entry, id) in self.agents.iter().zip(1..) {
            simulation.add_agent(AgentSpec {
                id: AgentId::new(id),
                name: entry.name.clone(),
                position: Vec2::from_array(entry.position),
                navigation: entry.navigation()?,
                config: entry.overrides.apply(self.behavior),
            })?;
        }

        for entry in &self.agents {
            let Some(partner) = &entry.partner else {
                continue;
            };
            let (Some(&agent), Some(&other)) = (ids.get(&entry.name), ids.get(partner)) else {
                return Err(ScenarioError::UnknownPartner {
                    agent: entry.name.clone(),
                    partner: partner.clone(),
                });
            };
            simulation.pair(agent, other)?;
        }

        self.check_targets()?;
        Ok(simulation)
    }

    /// Target commands scheduled for the start of `step`.
    pub(crate) fn schedule(&self, step: u32) -> Vec<Command> {
        let mut commands = Vec::new();
        for target in &self.targets {
            let id = TargetId::new(target.id);
            if target.appear_at == step {
                commands.push(Command::PlaceTarget {
                    target: id,
                    position: Vec2::from_array(target.position),
                });
                if !target.alive {
                    commands.push(Command::SetTargetAlive {
                        target: id,
                        alive: false,
                    });
                }
            }
            if target.expire_at == Some(step) {
                commands.push(Command::SetTargetAlive {
                    target: id,
                    alive: false,
                });
            }
        }
        commands
    }

    fn agent_ids(&self) -> Result<BTreeMap<String, AgentId>, ScenarioError> {
        let mut ids = BTreeMap::new();
        for (entry, id) in self.agents.iter().zip(1..) {
            if ids.insert(entry.name.clone(), AgentId::new(id)).is_some() {
                return Err(ScenarioError::DuplicateAgent(entry.name.clone()));
            }
        }
        Ok(ids)
    }

    fn check_targets(&self) -> Result<(), ScenarioError> {
        let mut seen = Vec::with_capacity(self.targets.len());
        for target in &self.targets {
            if seen.contains(&target.id) {
                return Err(ScenarioError::DuplicateTarget(target.id));
            }
            seen.push(target.id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Scenario, ScenarioError};
    use harbor_patrol_core::{AgentId, AgentState, Algorithm, Command, TargetId};
    use harbor_patrol_system_simulation::query;
    use harbor_patrol_world::GridError;

    #[test]
    fn builtin_scenario_builds() {
        let scenario = Scenario::builtin().expect("builtin parses");
        assert_eq!(scenario.agents.len(), 3);
        assert_eq!(scenario.agents[2].overrides.move_speed, Some(2.0));

        let simulation = scenario.build().expect("builtin builds");
        let agents = query::agents(&simulation);
        assert_eq!(agents[0].partner, Some(AgentId::new(2)));
        assert_eq!(agents[2].state, AgentState::Recalculating);
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let scenario = Scenario::parse(
            r#"
                [[agents]]
                name = "solo"
                position = [0.5, 0.5]
                tour = [[0.5, 0.5], [3.5, 0.5]]
            "#,
        )
        .expect("parse");

        assert_eq!(scenario.run.steps, 400);
        assert_eq!(scenario.behavior.move_speed, 3.0);
        assert!(scenario.obstacles.is_empty());
        let simulation = scenario.build().expect("build");
        assert_eq!(query::grid(&simulation).dimensions(), (20, 20));
    }

    #[test]
    fn unknown_partner_is_rejected() {
        let scenario = Scenario::parse(
            r#"
                [[agents]]
                name = "lonely"
                position = [0.0, 0.0]
                partner = "ghost"
            "#,
        )
        .expect("parse");

        assert!(matches!(
            scenario.build(),
            Err(ScenarioError::UnknownPartner { .. })
        ));
    }

    #[test]
    fn inverted_step_costs_are_rejected() {
        let scenario = Scenario::parse(
            r#"
                [grid]
                straight_step_cost = 2.0
                diagonal_step_cost = -1.0
            "#,
        )
        .expect("parse");

        assert!(matches!(
            scenario.build(),
            Err(ScenarioError::Grid(GridError::InvalidStepCost { .. }))
        ));
    }

    #[test]
    fn tour_and_goal_conflict() {
        let scenario = Scenario::parse(
            r#"
                [[agents]]
                name = "torn"
                position = [0.0, 0.0]
                tour = [[1.0, 1.0]]
                goal = [4.0, 4.0]
            "#,
        )
        .expect("parse");

        assert!(matches!(
            scenario.build(),
            Err(ScenarioError::ConflictingNavigation(name)) if name == "torn"
        ));
    }

    #[test]
    fn obstacles_and_disabled_solvers_are_parsed() {
        let scenario = Scenario::parse(
            r#"
                [pathfinding]
                disabled = ["heuristic"]

                [[obstacles]]
                shape = "circle"
                layer = "difficult"
                center = [2.0, 2.0]
                radius = 1.0

                [[obstacles]]
                shape = "rect"
                center = [-3.0, 0.0]
                size = [1.0, 6.0]
            "#,
        )
        .expect("parse");

        assert_eq!(scenario.pathfinding.disabled, vec![Algorithm::Heuristic]);
        let simulation = scenario.build().expect("build");
        let grid = query::grid(&simulation);
        assert!(!grid.cell_from_world_point(glam::Vec2::new(-3.0, 0.0)).walkable());
        assert!(grid.cell_from_world_point(glam::Vec2::new(2.0, 2.0)).movement_cost() > 1);
    }

    #[test]
    fn targets_are_scheduled_by_step() {
        let scenario = Scenario::parse(
            r#"
                [[targets]]
                id = 4
                position = [1.0, 2.0]
                appear_at = 3
                expire_at = 9
            "#,
        )
        .expect("parse");

        assert!(scenario.schedule(0).is_empty());
        assert!(matches!(
            scenario.schedule(3).as_slice(),
            [Command::PlaceTarget { target, .. }] if *target == TargetId::new(4)
        ));
        assert_eq!(
            scenario.schedule(9),
            vec![Command::SetTargetAlive {
                target: TargetId::new(4),
                alive: false,
            }]
        );
    }
}
