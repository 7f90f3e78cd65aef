#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a Harbor Patrol scenario headless.

mod scenario;
mod wander;

use std::{
    collections::BTreeMap,
    fs,
    io::{self, Write},
    path::PathBuf,
    time::Duration,
};

use anyhow::{Context, Result};
use clap::Parser;
use harbor_patrol_core::{AgentId, AgentState, Algorithm, Command, Event, TargetId, WELCOME_BANNER};
use harbor_patrol_system_behavior::AgentSnapshot;
use harbor_patrol_system_simulation::{self as simulation, query, Simulation};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use crate::{scenario::Scenario, wander::Wanderers};

/// Runs a patrol scenario and reports what the agents did.
#[derive(Debug, Parser)]
#[command(name = "harbor-patrol", version)]
#[command(about = "Headless patrol, pursuit and path-finding sandbox", long_about = None)]
struct Cli {
    /// Scenario file to load instead of the built-in harbor.
    #[arg(long)]
    scenario: Option<PathBuf>,
    /// Number of simulation steps to run.
    #[arg(long)]
    steps: Option<u32>,
    /// Length of one simulation step in milliseconds.
    #[arg(long = "dt-ms")]
    dt_ms: Option<u64>,
    /// Seed for target wandering.
    #[arg(long)]
    seed: Option<u64>,
    /// Emit one JSON object per event and a final snapshot line.
    #[arg(long)]
    json: bool,
}

/// Entry point for the Harbor Patrol command-line interface.
fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut scenario = match &cli.scenario {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read scenario {}", path.display()))?;
            Scenario::parse(&text)
                .with_context(|| format!("failed to parse scenario {}", path.display()))?
        }
        None => Scenario::builtin().context("built-in scenario is invalid")?,
    };
    if let Some(steps) = cli.steps {
        scenario.run.steps = steps;
    }
    if let Some(dt_ms) = cli.dt_ms {
        scenario.run.dt_ms = dt_ms;
    }
    if let Some(seed) = cli.seed {
        scenario.run.seed = seed;
    }

    let mut simulation = scenario.build().context("failed to build simulation")?;
    let mut wanderers = Wanderers::new(&scenario);
    let dt = Duration::from_millis(scenario.run.dt_ms);
    tracing::info!(
        steps = scenario.run.steps,
        dt_ms = scenario.run.dt_ms,
        seed = scenario.run.seed,
        agents = scenario.agents.len(),
        "starting run"
    );

    let stdout = io::stdout();
    let mut report = Report::new(stdout.lock(), cli.json, &simulation, dt);
    report.banner()?;
    for step in 0..scenario.run.steps {
        let mut commands = scenario.schedule(step);
        commands.extend(wanderers.drift(step, dt));
        commands.push(Command::Tick { dt });

        for command in commands {
            let mut events = Vec::new();
            simulation::apply(&mut simulation, command, &mut events);
            for event in &events {
                report.event(step, event)?;
            }
        }
    }
    report.finish(&simulation)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

#[derive(Serialize)]
struct EventLine<'a> {
    step: u32,
    event: &'a Event,
}

#[derive(Serialize)]
struct AgentLine {
    id: AgentId,
    name: String,
    state: AgentState,
    algorithm: Algorithm,
    position: [f32; 2],
    target: Option<TargetId>,
    partner: Option<AgentId>,
    cooperative_follower: bool,
    remaining_waypoints: usize,
    route_progress: usize,
}

impl From<AgentSnapshot> for AgentLine {
    fn from(snapshot: AgentSnapshot) -> Self {
        Self {
            id: snapshot.id,
            name: snapshot.name,
            state: snapshot.state,
            algorithm: snapshot.algorithm,
            position: snapshot.position.to_array(),
            target: snapshot.target,
            partner: snapshot.partner,
            cooperative_follower: snapshot.cooperative_follower,
            remaining_waypoints: snapshot.remaining_waypoints,
            route_progress: snapshot.route_progress,
        }
    }
}

#[derive(Serialize)]
struct FinalLine {
    steps: u64,
    elapsed_secs: f32,
    agents: Vec<AgentLine>,
}

struct Report<W> {
    out: W,
    json: bool,
    names: BTreeMap<AgentId, String>,
    dt: Duration,
    counts: BTreeMap<&'static str, usize>,
}

impl<W: Write> Report<W> {
    fn new(out: W, json: bool, simulation: &Simulation, dt: Duration) -> Self {
        let names = query::agents(simulation)
            .into_iter()
            .map(|agent| (agent.id, agent.name))
            .collect();
        Self {
            out,
            json,
            names,
            dt,
            counts: BTreeMap::new(),
        }
    }

    fn banner(&mut self) -> Result<()> {
        if !self.json {
            writeln!(self.out, "{WELCOME_BANNER}")?;
        }
        Ok(())
    }

    fn event(&mut self, step: u32, event: &Event) -> Result<()> {
        *self.counts.entry(event_kind(event)).or_default() += 1;
        if self.json {
            serde_json::to_writer(&mut self.out, &EventLine { step, event })?;
            writeln!(self.out)?;
            return Ok(());
        }

        let line = match event {
            Event::StateChanged { agent, from, to } => Some(format!(
                "{} {} -> {}",
                self.name(*agent),
                from.label(),
                to.label()
            )),
            Event::TargetAcquired {
                agent,
                target,
                cooperative,
            } => Some(format!(
                "{} acquired target {}{}",
                self.name(*agent),
                target.get(),
                if *cooperative { " (cooperative)" } else { "" }
            )),
            Event::TargetReleased { agent, target } => Some(format!(
                "{} released target {}",
                self.name(*agent),
                target.get()
            )),
            Event::AlertSent { from, to, target } => Some(format!(
                "{} alerted {} about target {}",
                self.name(*from),
                self.name(*to),
                target.get()
            )),
            Event::TargetRejected { target } => Some(format!("target {} rejected", target.get())),
            Event::TimeAdvanced { .. }
            | Event::PathRequested { .. }
            | Event::PathResolved { .. }
            | Event::WaypointReached { .. } => None,
        };
        if let Some(line) = line {
            let at = self.dt.as_secs_f32() * step as f32;
            writeln!(self.out, "[{at:7.2}s] {line}")?;
        }
        Ok(())
    }

    fn finish(mut self, simulation: &Simulation) -> Result<()> {
        let agents = query::agents(simulation);
        if self.json {
            let line = FinalLine {
                steps: query::tick_index(simulation),
                elapsed_secs: query::elapsed(simulation).as_secs_f32(),
                agents: agents.into_iter().map(AgentLine::from).collect(),
            };
            serde_json::to_writer(&mut self.out, &line)?;
            writeln!(self.out)?;
            return Ok(());
        }

        writeln!(
            self.out,
            "\nafter {} steps ({:.2}s):",
            query::tick_index(simulation),
            query::elapsed(simulation).as_secs_f32()
        )?;
        for agent in &agents {
            let target = agent
                .target
                .map_or_else(|| "-".to_owned(), |target| target.get().to_string());
            writeln!(
                self.out,
                "  {:<10} {:<10} at ({:6.2}, {:6.2}) target {}",
                agent.name,
                agent.state.label(),
                agent.position.x,
                agent.position.y,
                target
            )?;
        }

        let stats = query::dispatch_stats(simulation);
        writeln!(
            self.out,
            "paths: {} requested, {} resolved, {} failed ({} unavailable)",
            stats.requested, stats.resolved, stats.failed, stats.unavailable
        )?;
        let counts: Vec<String> = self
            .counts
            .iter()
            .map(|(kind, count)| format!("{kind}={count}"))
            .collect();
        writeln!(self.out, "events: {}", counts.join(" "))?;
        Ok(())
    }

    fn name(&self, agent: AgentId) -> &str {
        self.names.get(&agent).map_or("?", String::as_str)
    }
}

fn event_kind(event: &Event) -> &'static str {
    match event {
        Event::TimeAdvanced { .. } => "time_advanced",
        Event::StateChanged { .. } => "state_changed",
        Event::PathRequested { .. } => "path_requested",
        Event::PathResolved { .. } => "path_resolved",
        Event::TargetAcquired { .. } => "target_acquired",
        Event::TargetReleased { .. } => "target_released",
        Event::WaypointReached { .. } => "waypoint_reached",
        Event::AlertSent { .. } => "alert_sent",
        Event::TargetRejected { .. } => "target_rejected",
    }
}
