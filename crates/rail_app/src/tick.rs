//! Fixed-timestep frame driver.
//!
//! Each tick sets the scripted input, then advances the world by one fixed
//! step. `run` paces ticks to the configured rate and warns when a tick
//! overruns its budget.

use std::time::{Duration, Instant};

use rail_game::World;
use tracing::{debug, info, warn};

use crate::autofire::Autofire;

/// Configuration for the tick loop.
#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Target ticks per second.
    pub tick_rate: f64,
    /// Maximum number of ticks to run (0 = unlimited).
    pub max_ticks: u64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60.0,
            max_ticks: 0,
        }
    }
}

impl TickConfig {
    /// Wall-clock length of one tick, or `None` if the rate is not positive
    /// or too small for the interval to be represented.
    #[must_use]
    pub fn tick_duration(&self) -> Option<Duration> {
        if self.tick_rate > 0.0 {
            Duration::try_from_secs_f64(1.0 / self.tick_rate).ok()
        } else {
            None
        }
    }
}

/// Drives a [`World`] at a fixed rate.
#[derive(Debug)]
pub struct TickLoop {
    tick_id: u64,
    config: TickConfig,
    world: World,
    autofire: Option<Autofire>,
}

impl TickLoop {
    /// A loop over `world`.
    #[must_use]
    pub fn new(config: TickConfig, world: World) -> Self {
        Self {
            tick_id: 0,
            config,
            world,
            autofire: None,
        }
    }

    /// Drive the fire button from `autofire` before every tick.
    pub fn set_autofire(&mut self, autofire: Autofire) {
        self.autofire = Some(autofire);
    }

    /// Returns the current tick counter.
    #[must_use]
    pub fn tick_id(&self) -> u64 {
        self.tick_id
    }

    /// Returns a reference to the world.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Run one tick.
    pub fn tick(&mut self, dt: f64) {
        self.tick_id += 1;
        if let Some(autofire) = &self.autofire {
            autofire.drive(self.tick_id);
        }
        self.world.update(dt);
        debug!(
            tick_id = self.tick_id,
            dt,
            entities = self.world.manager().entity_count(),
            "tick"
        );
    }

    /// Run for the configured number of ticks, or indefinitely. Does nothing
    /// if the tick rate is unusable.
    pub fn run(&mut self) {
        let Some(tick_duration) = self.config.tick_duration() else {
            warn!(tick_rate = self.config.tick_rate, "unusable tick rate, not running");
            return;
        };
        let mut tick_count = 0u64;

        info!(
            tick_rate = self.config.tick_rate,
            max_ticks = self.config.max_ticks,
            "starting tick loop"
        );

        loop {
            let start = Instant::now();

            self.tick(tick_duration.as_secs_f64());

            tick_count += 1;
            if self.config.max_ticks > 0 && tick_count >= self.config.max_ticks {
                info!(
                    ticks = tick_count,
                    entities = self.world.manager().entity_count(),
                    "tick loop complete"
                );
                break;
            }

            let elapsed = start.elapsed();
            if elapsed < tick_duration {
                std::thread::sleep(tick_duration - elapsed);
            } else {
                warn!(
                    tick_id = self.tick_id,
                    elapsed_ms = elapsed.as_millis() as u64,
                    budget_ms = tick_duration.as_millis() as u64,
                    "tick exceeded time budget"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rail_ecs::{MemoryPrototypes, Template};
    use rail_game::components::{PhysicsData, PlayerProjectile, Physics, TimeLimit, TimeLimitData};
    use rail_game::{EntityList, GameConfig, GameServices};

    use super::*;

    fn world() -> World {
        let mut store = MemoryPrototypes::new();
        store
            .insert_template(
                &Template::new("Projectile")
                    .with::<Physics>(&PhysicsData::default())
                    .unwrap()
                    .with::<PlayerProjectile>(&Default::default())
                    .unwrap()
                    .with::<TimeLimit>(&TimeLimitData::new(0.05))
                    .unwrap(),
            )
            .unwrap();
        World::new(GameConfig::default(), store, GameServices::new()).unwrap()
    }

    #[test]
    fn test_tick_advances_counter() {
        let mut tick_loop = TickLoop::new(TickConfig::default(), world());
        assert_eq!(tick_loop.tick_id(), 0);
        tick_loop.tick(1.0 / 60.0);
        assert_eq!(tick_loop.tick_id(), 1);
        tick_loop.tick(1.0 / 60.0);
        assert_eq!(tick_loop.tick_id(), 2);
        assert_eq!(tick_loop.world().manager().frame(), 2);
    }

    #[test]
    fn test_run_limited_ticks() {
        let config = TickConfig {
            tick_rate: 1000.0,
            max_ticks: 5,
        };
        let mut tick_loop = TickLoop::new(config, world());
        tick_loop.run();
        assert_eq!(tick_loop.tick_id(), 5);
    }

    #[test]
    fn test_unusable_tick_rates_do_not_run() {
        for tick_rate in [0.0, -5.0, 1e-20, f64::NAN] {
            let config = TickConfig {
                tick_rate,
                max_ticks: 3,
            };
            assert!(config.tick_duration().is_none(), "{tick_rate}");
            let mut tick_loop = TickLoop::new(config, world());
            tick_loop.run();
            assert_eq!(tick_loop.tick_id(), 0);
        }
        assert_eq!(
            TickConfig::default().tick_duration(),
            Some(Duration::from_secs_f64(1.0 / 60.0))
        );
    }

    #[test]
    fn test_autofire_spawns_and_expires_projectiles() {
        let mut world = world();
        world.load_entities(
            &EntityList::from_json(
                r#"{ "entities": [ { "name": "player", "components": { "Player": {} }, "role": "player" } ] }"#,
            )
            .unwrap(),
        );
        let autofire = Autofire::new(10);
        world.set_active_controller(autofire.handle()).unwrap();

        let mut tick_loop = TickLoop::new(TickConfig::default(), world);
        tick_loop.set_autofire(autofire);

        let projectiles = |tick_loop: &TickLoop| {
            tick_loop
                .world()
                .manager()
                .table::<PlayerProjectile>()
                .map_or(0, |t| t.len())
        };

        tick_loop.tick(0.02);
        assert_eq!(projectiles(&tick_loop), 1);

        // Three ticks of 0.02 pass the 0.05 limit.
        for _ in 0..3 {
            tick_loop.tick(0.02);
        }
        assert_eq!(projectiles(&tick_loop), 0);

        for _ in 0..7 {
            tick_loop.tick(0.02);
        }
        assert_eq!(projectiles(&tick_loop), 1);
    }
}
