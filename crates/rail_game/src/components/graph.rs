//! Per-entity event broadcasting.
//!
//! Components broadcast [`GameEvent`]s on an entity's [`GraphData`] during the
//! frame. The graph component runs last and moves each entity's pending
//! events into `last_frame`, where listeners read them during the next frame
//! regardless of update order.

use std::collections::HashMap;

use rail_ecs::{Component, EntityManager, WorldTime};
use serde::{Deserialize, Serialize};

/// Events gameplay components raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameEvent {
    /// The player launched a projectile.
    OnFire,
}

/// An entity's event queues.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphData {
    /// Broadcast this frame, not yet delivered.
    #[serde(skip)]
    pending: Vec<GameEvent>,
    /// Delivered at the end of the previous frame.
    #[serde(skip)]
    last_frame: Vec<GameEvent>,
}

impl GraphData {
    /// Queue `event` for delivery at the end of the frame.
    pub fn broadcast(&mut self, event: GameEvent) {
        self.pending.push(event);
    }

    /// Events delivered at the end of the previous frame.
    #[must_use]
    pub fn last_frame(&self) -> &[GameEvent] {
        &self.last_frame
    }

    /// Returns `true` if `event` was delivered at the end of the previous
    /// frame.
    #[must_use]
    pub fn received(&self, event: GameEvent) -> bool {
        self.last_frame.contains(&event)
    }
}

/// Delivers broadcast events and keeps running totals.
#[derive(Debug, Default)]
pub struct Graph {
    totals: HashMap<GameEvent, u64>,
}

impl Graph {
    /// Number of times `event` has been delivered this session.
    #[must_use]
    pub fn total(&self, event: GameEvent) -> u64 {
        self.totals.get(&event).copied().unwrap_or(0)
    }
}

impl Component for Graph {
    type Data = GraphData;

    fn type_name() -> &'static str {
        "Graph"
    }

    fn update(&mut self, manager: &mut EntityManager, _delta_time: WorldTime) {
        let totals = &mut self.totals;
        manager.each::<Self>(|manager, entity| {
            let graph = manager.require_mut::<Self>(entity)?;
            graph.last_frame = std::mem::take(&mut graph.pending);
            for &event in &graph.last_frame {
                *totals.entry(event).or_default() += 1;
            }
            Ok(())
        });
    }
}
