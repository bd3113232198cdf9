//! Entities with a bounded lifetime.

use rail_ecs::{Component, EntityManager, WorldTime};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Lifetime bookkeeping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeLimitData {
    /// Seconds the entity lives for.
    pub limit: WorldTime,
    /// Seconds lived so far.
    pub elapsed: WorldTime,
}

impl TimeLimitData {
    /// A lifetime of `limit` seconds.
    #[must_use]
    pub fn new(limit: WorldTime) -> Self {
        Self {
            limit,
            elapsed: 0.0,
        }
    }
}

/// Destroys entities whose time is up.
#[derive(Debug, Default)]
pub struct TimeLimit;

impl Component for TimeLimit {
    type Data = TimeLimitData;

    fn type_name() -> &'static str {
        "TimeLimit"
    }

    fn update(&mut self, manager: &mut EntityManager, delta_time: WorldTime) {
        manager.each::<Self>(|manager, entity| {
            let data = manager.require_mut::<Self>(entity)?;
            data.elapsed += delta_time;
            if data.elapsed >= data.limit {
                debug!(%entity, limit = data.limit, "time limit reached");
                manager.destroy_entity(entity)?;
            }
            Ok(())
        });
    }
}
