//! Seeded drift of wandering targets.

use std::time::Duration;

use glam::Vec2;
use harbor_patrol_core::{Command, TargetId};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::scenario::Scenario;

/// Drift speed of a wandering target, in world units per second.
const WANDER_SPEED: f32 = 1.0;

#[derive(Clone, Copy, Debug)]
struct Wanderer {
    id: TargetId,
    home: Vec2,
    position: Vec2,
    radius: f32,
    appear_at: u32,
}

/// Moves targets with a wander radius around their spawn point.
#[derive(Debug)]
pub(crate) struct Wanderers {
    rng: ChaCha8Rng,
    wanderers: Vec<Wanderer>,
}

impl Wanderers {
    /// Collects the wandering targets of a scenario, seeded by its run seed.
    pub(crate) fn new(scenario: &Scenario) -> Self {
        let wanderers = scenario
            .targets
            .iter()
            .filter(|target| target.wander > 0.0)
            .map(|target| {
                let home = Vec2::from_array(target.position);
                Wanderer {
                    id: TargetId::new(target.id),
                    home,
                    position: home,
                    radius: target.wander,
                    appear_at: target.appear_at,
                }
            })
            .collect();
        Self {
            rng: ChaCha8Rng::seed_from_u64(scenario.run.seed),
            wanderers,
        }
    }

    /// Move commands for every placed wanderer at `step`.
    pub(crate) fn drift(&mut self, step: u32, dt: Duration) -> Vec<Command> {
        let reach = WANDER_SPEED * dt.as_secs_f32();
        let mut commands = Vec::new();
        for wanderer in &mut self.wanderers {
            if step <= wanderer.appear_at {
                continue;
            }
            let nudge = Vec2::new(
                self.rng.gen_range(-1.0..=1.0),
                self.rng.gen_range(-1.0..=1.0),
            ) * reach;
            let offset = (wanderer.position + nudge - wanderer.home)
                .clamp_length_max(wanderer.radius);
            wanderer.position = wanderer.home + offset;
            commands.push(Command::MoveTarget {
                target: wanderer.id,
                position: wanderer.position,
            });
        }
        commands
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::Wanderers;
    use crate::scenario::Scenario;
    use glam::Vec2;
    use harbor_patrol_core::Command;

    const SCENARIO: &str = r#"
        [run]
        seed = 11

        [[targets]]
        id = 1
        position = [2.0, 2.0]
        wander = 0.5
        appear_at = 2

        [[targets]]
        id = 2
        position = [-2.0, -2.0]
    "#;

    #[test]
    fn same_seed_drifts_identically() {
        let scenario = Scenario::parse(SCENARIO).expect("parse");
        let mut first = Wanderers::new(&scenario);
        let mut second = Wanderers::new(&scenario);
        let dt = Duration::from_millis(100);

        for step in 0..50 {
            assert_eq!(first.drift(step, dt), second.drift(step, dt));
        }
    }

    #[test]
    fn drift_stays_within_radius_and_waits_for_placement() {
        let scenario = Scenario::parse(SCENARIO).expect("parse");
        let mut wanderers = Wanderers::new(&scenario);
        let dt = Duration::from_millis(500);

        assert!(wanderers.drift(2, dt).is_empty());
        for step in 3..200 {
            let commands = wanderers.drift(step, dt);
            assert_eq!(commands.len(), 1);
            let Command::MoveTarget { position, .. } = commands[0] else {
                panic!("unexpected command {:?}", commands[0]);
            };
            assert!(position.distance(Vec2::new(2.0, 2.0)) <= 0.5 + 1e-4);
        }
    }
}
