use std::time::Duration;

use glam::Vec2;
use harbor_patrol_core::{AgentId, AgentState, Command, Event, TargetId};
use harbor_patrol_system_behavior::{BehaviorConfig, Navigation, PatrolTour};
use harbor_patrol_system_simulation::{apply, query, AgentSpec, Simulation};
use harbor_patrol_world::{GridMap, GridSettings, RouteLabelMode};

const QUARRY: TargetId = TargetId::new(7);
const SCOUT: AgentId = AgentId::new(1);
const WARDEN: AgentId = AgentId::new(2);

#[test]
fn partner_joins_the_chase_and_both_return_when_target_dies() {
    let mut simulation = paired(Navigation::Tour(PatrolTour::new(vec![
        Vec2::new(8.5, 8.5),
        Vec2::new(8.5, 4.5),
    ])));
    let mut events = Vec::new();

    place_quarry(&mut simulation, &mut events);
    tick(&mut simulation, &mut events);

    let scout = query::agent(&simulation, SCOUT).expect("scout");
    let warden = query::agent(&simulation, WARDEN).expect("warden");
    assert_eq!(scout.state, AgentState::Attack);
    assert_eq!(warden.state, AgentState::Following);
    assert!(warden.cooperative_follower);
    assert_eq!(warden.target, Some(QUARRY));
    let claim = query::cooperative_target(&simulation).expect("claim");
    assert_eq!((claim.target, claim.initiator), (QUARRY, SCOUT));

    apply(
        &mut simulation,
        Command::SetTargetAlive {
            target: QUARRY,
            alive: false,
        },
        &mut events,
    );
    tick(&mut simulation, &mut events);

    for snapshot in query::agents(&simulation) {
        assert_eq!(snapshot.state, AgentState::Patrol, "{}", snapshot.name);
        assert_eq!(snapshot.target, None);
        assert!(!snapshot.cooperative_follower);
    }
    assert_eq!(query::cooperative_target(&simulation), None);
}

#[test]
fn removed_target_ends_the_pursuit() {
    let mut simulation = paired(Navigation::Unconfigured);
    let mut events = Vec::new();

    place_quarry(&mut simulation, &mut events);
    tick(&mut simulation, &mut events);
    assert_eq!(
        query::agent(&simulation, SCOUT).map(|agent| agent.state),
        Some(AgentState::Attack)
    );

    apply(
        &mut simulation,
        Command::RemoveTarget { target: QUARRY },
        &mut events,
    );
    assert_eq!(query::cooperative_target(&simulation), None);
    events.clear();
    tick(&mut simulation, &mut events);

    assert_eq!(
        query::agent(&simulation, SCOUT).map(|agent| agent.state),
        Some(AgentState::Patrol)
    );
    assert!(events.contains(&Event::TargetReleased {
        agent: SCOUT,
        target: QUARRY,
    }));
}

#[test]
fn alert_command_recruits_an_idle_partner() {
    let mut simulation = paired(Navigation::Unconfigured);
    let mut events = Vec::new();

    place_quarry(&mut simulation, &mut events);
    tick(&mut simulation, &mut events);
    assert_eq!(
        query::agent(&simulation, WARDEN).map(|agent| agent.state),
        Some(AgentState::Idle)
    );

    apply(&mut simulation, Command::AlertPartner { agent: SCOUT }, &mut events);
    assert!(events.contains(&Event::AlertSent {
        from: SCOUT,
        to: WARDEN,
        target: QUARRY,
    }));
    tick(&mut simulation, &mut events);

    let warden = query::agent(&simulation, WARDEN).expect("warden");
    assert_eq!(warden.state, AgentState::Following);
    assert_eq!(warden.target, Some(QUARRY));
    assert!(warden.cooperative_follower);

    apply(
        &mut simulation,
        Command::SetTargetAlive {
            target: QUARRY,
            alive: false,
        },
        &mut events,
    );
    events.clear();
    tick(&mut simulation, &mut events);

    let warden = query::agent(&simulation, WARDEN).expect("warden");
    assert_eq!(warden.state, AgentState::Idle);
    assert_eq!(warden.target, None);
    assert!(events.contains(&Event::StateChanged {
        agent: WARDEN,
        from: AgentState::Following,
        to: AgentState::Idle,
    }));
}

#[test]
fn patrol_route_exposes_cost_labels() {
    let mut simulation = Simulation::new(GridMap::open(GridSettings::default()).expect("grid"));
    simulation
        .add_agent(AgentSpec {
            id: SCOUT,
            name: "scout".to_owned(),
            position: Vec2::new(-4.5, 0.5),
            navigation: Navigation::Tour(PatrolTour::new(vec![
                Vec2::new(-4.5, 0.5),
                Vec2::new(3.5, 0.5),
            ])),
            config: BehaviorConfig::default(),
        })
        .expect("agent");
    let mut events = Vec::new();

    tick(&mut simulation, &mut events);
    tick(&mut simulation, &mut events);

    assert!(query::route_labels(&simulation, SCOUT, RouteLabelMode::Off).is_empty());
    let tiles = query::route_labels(&simulation, SCOUT, RouteLabelMode::TileCost);
    assert!(!tiles.is_empty());
    assert!(tiles.iter().all(|label| label.text == "1"));
    let cumulative = query::route_labels(&simulation, SCOUT, RouteLabelMode::RouteCumulative);
    assert_eq!(cumulative.last().map(|label| label.text.as_str()), Some("8"));

    let stats = query::dispatch_stats(&simulation);
    assert_eq!(stats.requested, 2);
    assert_eq!(stats.resolved, 2);
    assert_eq!(query::tick_index(&simulation), 2);
    assert_eq!(query::elapsed(&simulation), Duration::from_millis(200));
}

fn paired(warden_navigation: Navigation) -> Simulation {
    let mut simulation = Simulation::new(GridMap::open(GridSettings::default()).expect("grid"));
    simulation
        .add_agent(AgentSpec {
            id: SCOUT,
            name: "scout".to_owned(),
            position: Vec2::new(-2.5, 0.5),
            navigation: Navigation::Tour(PatrolTour::new(vec![
                Vec2::new(-2.5, 0.5),
                Vec2::new(-6.5, 0.5),
            ])),
            config: BehaviorConfig::default(),
        })
        .expect("scout");
    simulation
        .add_agent(AgentSpec {
            id: WARDEN,
            name: "warden".to_owned(),
            position: Vec2::new(8.5, 8.5),
            navigation: warden_navigation,
            config: BehaviorConfig::default(),
        })
        .expect("warden");
    simulation.pair(SCOUT, WARDEN).expect("pair");
    simulation
}

fn place_quarry(simulation: &mut Simulation, events: &mut Vec<Event>) {
    apply(
        simulation,
        Command::PlaceTarget {
            target: QUARRY,
            position: Vec2::new(0.5, 0.5),
        },
        events,
    );
}

fn tick(simulation: &mut Simulation, events: &mut Vec<Event>) {
    apply(
        simulation,
        Command::Tick {
            dt: Duration::from_millis(100),
        },
        events,
    );
}
