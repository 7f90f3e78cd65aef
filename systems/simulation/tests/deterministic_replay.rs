use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
    time::Duration,
};

use glam::Vec2;
use harbor_patrol_core::{AgentId, AgentState, Command, Event, TargetId};
use harbor_patrol_system_behavior::{
    AgentSnapshot, BehaviorConfig, FixedTarget, Navigation, PatrolTour,
};
use harbor_patrol_system_simulation::{self as simulation, query, AgentSpec, Simulation};
use harbor_patrol_world::{GridMap, GridSettings, ObstacleLayout, Shape, TerrainLayer};

#[test]
fn deterministic_replay_produces_identical_outcomes() {
    let first = replay(scripted_commands());
    let second = replay(scripted_commands());

    assert_eq!(first, second, "replay diverged between runs");
    assert_eq!(first.fingerprint(), second.fingerprint());

    let transitions = first
        .events
        .iter()
        .filter(|record| matches!(record, EventRecord::StateChanged { .. }))
        .count();
    assert!(transitions >= 2, "expected pursuit transitions");
    assert!(first
        .events
        .iter()
        .any(|record| matches!(record, EventRecord::WaypointReached { .. })));
}

fn replay(commands: Vec<Command>) -> ReplayOutcome {
    let mut simulation = build();
    let mut log = Vec::new();

    for command in commands {
        let mut events = Vec::new();
        simulation::apply(&mut simulation, command, &mut events);
        log.extend(events.iter().map(EventRecord::from));
    }

    let agents = query::agents(&simulation)
        .into_iter()
        .map(AgentRecord::from)
        .collect();

    ReplayOutcome {
        agents,
        events: log,
    }
}

fn build() -> Simulation {
    let layout = ObstacleLayout::new()
        .with(
            TerrainLayer::Blocking,
            Shape::Rect {
                min: Vec2::new(-1.0, -6.0),
                max: Vec2::new(1.0, 3.0),
            },
        )
        .with(
            TerrainLayer::Difficult,
            Shape::Circle {
                center: Vec2::new(-5.0, 6.0),
                radius: 1.5,
            },
        );
    let grid = GridMap::build(GridSettings::default(), &layout).expect("grid");
    let mut simulation = Simulation::new(grid);

    let tour = |points: &[(f32, f32)]| {
        Navigation::Tour(PatrolTour::new(
            points.iter().map(|&(x, y)| Vec2::new(x, y)).collect(),
        ))
    };
    let specs = [
        (1, "north", Vec2::new(-6.5, 7.5), tour(&[(-6.5, 7.5), (6.5, 7.5), (6.5, -7.5)])),
        (2, "south", Vec2::new(6.5, -7.5), tour(&[(6.5, -7.5), (-6.5, -7.5)])),
        (
            3,
            "courier",
            Vec2::new(-8.5, -2.5),
            Navigation::Fixed(FixedTarget::point(Vec2::new(8.5, -2.5))),
        ),
    ];
    for (id, name, position, navigation) in specs {
        simulation
            .add_agent(AgentSpec {
                id: AgentId::new(id),
                name: name.to_owned(),
                position,
                navigation,
                config: BehaviorConfig::default(),
            })
            .expect("agent");
    }
    simulation
        .pair(AgentId::new(1), AgentId::new(2))
        .expect("pair");
    simulation
}

fn scripted_commands() -> Vec<Command> {
    let intruder = TargetId::new(1);
    let mut commands = Vec::new();
    let ticks = |commands: &mut Vec<Command>, count: usize| {
        for _ in 0..count {
            commands.push(Command::Tick {
                dt: Duration::from_millis(50),
            });
        }
    };

    ticks(&mut commands, 40);
    commands.push(Command::PlaceTarget {
        target: intruder,
        position: Vec2::new(4.5, 7.5),
    });
    ticks(&mut commands, 30);
    commands.push(Command::AlertPartner {
        agent: AgentId::new(1),
    });
    commands.push(Command::MoveTarget {
        target: intruder,
        position: Vec2::new(5.5, 5.5),
    });
    ticks(&mut commands, 40);
    commands.push(Command::SetTargetAlive {
        target: intruder,
        alive: false,
    });
    ticks(&mut commands, 60);
    commands
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct ReplayOutcome {
    agents: Vec<AgentRecord>,
    events: Vec<EventRecord>,
}

impl ReplayOutcome {
    fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct AgentRecord {
    id: AgentId,
    state: AgentState,
    target: Option<TargetId>,
    position: (u32, u32),
    remaining_waypoints: usize,
}

impl From<AgentSnapshot> for AgentRecord {
    fn from(snapshot: AgentSnapshot) -> Self {
        Self {
            id: snapshot.id,
            state: snapshot.state,
            target: snapshot.target,
            position: (snapshot.position.x.to_bits(), snapshot.position.y.to_bits()),
            remaining_waypoints: snapshot.remaining_waypoints,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum EventRecord {
    TimeAdvanced {
        dt_micros: u128,
    },
    StateChanged {
        agent: AgentId,
        from: AgentState,
        to: AgentState,
    },
    WaypointReached {
        agent: AgentId,
        waypoint: usize,
    },
    Other(Event),
}

impl From<&Event> for EventRecord {
    fn from(event: &Event) -> Self {
        match event {
            Event::TimeAdvanced { dt } => Self::TimeAdvanced {
                dt_micros: dt.as_micros(),
            },
            Event::StateChanged { agent, from, to } => Self::StateChanged {
                agent: *agent,
                from: *from,
                to: *to,
            },
            Event::WaypointReached { agent, waypoint } => Self::WaypointReached {
                agent: *agent,
                waypoint: *waypoint,
            },
            other => Self::Other(other.clone()),
        }
    }
}
