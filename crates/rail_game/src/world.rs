//! The world aggregate.
//!
//! Owns the entity manager, the prototype factory, the game configuration and
//! the session services, and registers the gameplay components in their
//! canonical order. Levels are described by an [`EntityList`] in JSON: each
//! entry names a prototype, inline component records, or both (inline records
//! override the prototype's), and may mark the entity as the player or the
//! raft.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use rail_ecs::{
    Entity, EntityError, EntityFactory, EntityManager, PrototypeStore, Services, Template,
    WorldTime, codec,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::components::{
    Graph, Physics, Player, PlayerProjectile, PlayerState, RailDenizen, TimeLimit, Transform,
};
use crate::config::GameConfig;
use crate::services::{ControllerHandle, GameServices};

/// Special entities a level can mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityRole {
    /// The active player.
    Player,
    /// The raft the player rides.
    Raft,
}

/// One entity in a level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityEntry {
    /// Label used in logs; defaults to the prototype name.
    pub name: Option<String>,
    /// Prototype to instantiate.
    pub prototype: Option<String>,
    /// Inline records keyed by component name, applied after the prototype.
    pub components: BTreeMap<String, serde_json::Value>,
    /// Role this entity plays.
    pub role: Option<EntityRole>,
}

impl EntityEntry {
    /// Label for logs and load reports.
    #[must_use]
    pub fn label(&self) -> &str {
        self.name
            .as_deref()
            .or(self.prototype.as_deref())
            .unwrap_or("inline")
    }

    /// The inline records as a template.
    ///
    /// # Errors
    ///
    /// [`EntityError::Encode`] if a value cannot be re-encoded.
    pub fn inline_template(&self) -> Result<Template, EntityError> {
        let mut template = Template::new(self.label());
        for (component, value) in &self.components {
            template.push_raw(component.clone(), codec::encode("EntityList", value)?);
        }
        Ok(template)
    }
}

/// A level: entities built in order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityList {
    /// Entries, built in order.
    pub entities: Vec<EntityEntry>,
}

impl EntityList {
    /// Parse a JSON document.
    ///
    /// # Errors
    ///
    /// The parse error.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Outcome of loading an [`EntityList`].
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Entities created, in entry order.
    pub entities: Vec<Entity>,
    /// Entry label, component (if any) and error for every failure.
    pub failures: Vec<(String, EntityError)>,
}

impl LoadReport {
    /// Returns `true` if nothing failed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Errors raised while reading an entity list file.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The file could not be read.
    #[error("failed to read entity list {path}: {source}")]
    Io {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not a valid entity list.
    #[error("failed to parse entity list: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Everything a running game needs.
pub struct World {
    manager: EntityManager,
    factory: Rc<EntityFactory>,
    config: Rc<GameConfig>,
    services: Rc<GameServices>,
    active_player: Option<Entity>,
    controller: Option<ControllerHandle>,
}

impl World {
    /// Register and initialise every gameplay component.
    ///
    /// # Errors
    ///
    /// Registration or component init failures.
    pub fn new(
        config: GameConfig,
        store: impl PrototypeStore + 'static,
        services: GameServices,
    ) -> Result<Self, EntityError> {
        let config = Rc::new(config);
        let services = Rc::new(services);

        let mut context = Services::new();
        context.insert(Rc::clone(&config));
        context.insert(Rc::clone(&services));

        let mut manager = EntityManager::new(context);
        manager.register_component(Transform)?;
        manager.register_component(RailDenizen)?;
        manager.register_component(Player::default())?;
        manager.register_component(PlayerProjectile)?;
        manager.register_component(Physics)?;
        manager.register_component(TimeLimit)?;
        manager.register_component(Graph::default())?;
        manager.init_components()?;

        let factory = Rc::new(EntityFactory::new(store));
        manager.set_factory(Rc::clone(&factory));

        let components: Vec<&str> = manager.component_metas().map(|m| m.name).collect();
        info!(?components, "world initialised");

        Ok(Self {
            manager,
            factory,
            config,
            services,
            active_player: None,
            controller: None,
        })
    }

    /// Advance one frame.
    pub fn update(&mut self, delta_time: WorldTime) {
        self.manager.update_all(delta_time);
    }

    /// Build every entry of `list`.
    ///
    /// Failures are isolated per entry: an unknown prototype skips its entry,
    /// a failed record leaves its entity degraded. Both are logged and
    /// reported.
    pub fn load_entities(&mut self, list: &EntityList) -> LoadReport {
        let mut report = LoadReport::default();
        for entry in &list.entities {
            let label = entry.label().to_string();
            match self.load_entry(entry) {
                Ok((entity, failures)) => {
                    for (component, err) in failures {
                        report.failures.push((format!("{label}/{component}"), err));
                    }
                    report.entities.push(entity);
                }
                Err(err) => {
                    warn!(entry = %label, error = %err, "skipped entity list entry");
                    report.failures.push((label, err));
                }
            }
        }
        info!(
            entities = report.entities.len(),
            failures = report.failures.len(),
            "loaded entity list"
        );
        report
    }

    /// Read and build a JSON entity list.
    ///
    /// # Errors
    ///
    /// [`LoadError`] if the file cannot be read or parsed. Per-entry failures
    /// are in the report.
    pub fn load_entity_file(&mut self, path: impl AsRef<Path>) -> Result<LoadReport, LoadError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let list = EntityList::from_json(&json)?;
        debug!(path = %path.display(), entries = list.entities.len(), "read entity list");
        Ok(self.load_entities(&list))
    }

    fn load_entry(
        &mut self,
        entry: &EntityEntry,
    ) -> Result<(Entity, Vec<(String, EntityError)>), EntityError> {
        let inline = entry.inline_template()?;
        let (entity, mut failures) = match &entry.prototype {
            Some(prototype) => {
                let built = self.factory.instantiate(prototype, &mut self.manager)?;
                (built.entity, built.failures)
            }
            None => (self.manager.create_entity(), Vec::new()),
        };
        failures.extend(EntityFactory::apply_template(&inline, entity, &mut self.manager));

        match entry.role {
            Some(EntityRole::Player) => self.set_active_player(entity),
            Some(EntityRole::Raft) => self.set_raft(entity),
            None => {}
        }
        Ok((entity, failures))
    }

    /// Spawn an entity from a prototype.
    ///
    /// # Errors
    ///
    /// See [`EntityManager::spawn_prototype`].
    pub fn spawn(&mut self, prototype: &str) -> Result<Entity, EntityError> {
        self.manager.spawn_prototype(prototype)
    }

    /// Make `player` the active player, attaching the active controller if one
    /// is set.
    pub fn set_active_player(&mut self, player: Entity) {
        self.active_player = Some(player);
        if let Some(controller) = self.controller.clone()
            && let Err(err) = Player::set_controller(&mut self.manager, player, controller)
        {
            warn!(%player, error = %err, "could not attach controller");
        }
    }

    /// Drive the active player with `controller`. The controller is kept and
    /// attached to whichever entity becomes the active player later.
    ///
    /// # Errors
    ///
    /// [`EntityError::InvalidEntity`] or [`EntityError::MissingComponent`] if
    /// the active player is not a live player.
    pub fn set_active_controller(&mut self, controller: ControllerHandle) -> Result<(), EntityError> {
        self.controller = Some(Rc::clone(&controller));
        match self.active_player {
            Some(player) => Player::set_controller(&mut self.manager, player, controller),
            None => Ok(()),
        }
    }

    /// Set the player component's state.
    pub fn set_player_state(&mut self, state: PlayerState) {
        if let Some(player) = self.manager.get_component_mut::<Player>() {
            player.set_state(state);
        }
    }

    /// Mark `raft` as the entity the player rides.
    pub fn set_raft(&mut self, raft: Entity) {
        self.services.set_raft_entity(Some(raft));
    }

    /// The entity manager.
    #[must_use]
    pub fn manager(&self) -> &EntityManager {
        &self.manager
    }

    /// The entity manager, mutably.
    pub fn manager_mut(&mut self) -> &mut EntityManager {
        &mut self.manager
    }

    /// The prototype factory.
    #[must_use]
    pub fn factory(&self) -> &Rc<EntityFactory> {
        &self.factory
    }

    /// The game configuration.
    #[must_use]
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Session services.
    #[must_use]
    pub fn game_services(&self) -> &GameServices {
        &self.services
    }

    /// The active player, if any.
    #[must_use]
    pub fn active_player(&self) -> Option<Entity> {
        self.active_player
    }

    /// The raft, if any.
    #[must_use]
    pub fn raft(&self) -> Option<Entity> {
        self.services.raft_entity()
    }
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("manager", &self.manager)
            .field("active_player", &self.active_player)
            .field("raft", &self.raft())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use rail_ecs::MemoryPrototypes;
    use rail_math::Vec3;

    use super::*;
    use crate::components::{PhysicsData, RailDenizenData, TimeLimitData, TransformData};

    fn store() -> MemoryPrototypes {
        let mut store = MemoryPrototypes::new();
        store
            .insert_template(
                &Template::new("Projectile")
                    .with::<Physics>(&PhysicsData::moving(Vec3::Y))
                    .unwrap()
                    .with::<PlayerProjectile>(&Default::default())
                    .unwrap()
                    .with::<TimeLimit>(&TimeLimitData::new(2.0))
                    .unwrap(),
            )
            .unwrap();
        store
            .insert_template(
                &Template::new("Raft")
                    .with::<RailDenizen>(&RailDenizenData {
                        nodes: vec![Vec3::ZERO, Vec3::new(0.0, 50.0, 0.0)],
                        ..RailDenizenData::default()
                    })
                    .unwrap(),
            )
            .unwrap();
        store
    }

    fn world() -> World {
        World::new(GameConfig::default(), store(), GameServices::new()).unwrap()
    }

    const LEVEL: &str = r#"{
        "entities": [
            { "prototype": "Raft", "role": "raft" },
            {
                "name": "hero",
                "components": {
                    "Transform": { "position": [0.0, 0.0, 1.0] },
                    "Player": {}
                },
                "role": "player"
            },
            {
                "prototype": "Raft",
                "name": "fast raft",
                "components": { "RailDenizen": { "nodes": [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]], "speed": 4.0 } }
            }
        ]
    }"#;

    #[test]
    fn test_registration_order() {
        let world = world();
        let names: Vec<&str> = world.manager().component_metas().map(|m| m.name).collect();
        assert_eq!(
            names,
            vec![
                "Transform",
                "RailDenizen",
                "Player",
                "PlayerProjectile",
                "Physics",
                "TimeLimit",
                "Graph"
            ]
        );
    }

    #[test]
    fn test_load_entity_list() {
        let mut world = world();
        let list = EntityList::from_json(LEVEL).unwrap();
        let report = world.load_entities(&list);

        assert!(report.is_clean(), "{:?}", report.failures);
        assert_eq!(report.entities.len(), 3);
        let [raft, hero, fast] = report.entities[..] else {
            panic!("expected three entities");
        };

        assert_eq!(world.raft(), Some(raft));
        assert_eq!(world.active_player(), Some(hero));

        let manager = world.manager();
        assert!(manager.has::<Transform>(raft));
        assert_eq!(
            manager.lookup::<Transform>(hero),
            Some(&TransformData::at(Vec3::new(0.0, 0.0, 1.0)))
        );
        assert!(manager.has::<Player>(hero));

        let rail = manager.lookup::<RailDenizen>(fast).unwrap();
        assert_eq!(rail.speed, 4.0);
        assert_eq!(rail.nodes.len(), 2);
    }

    #[test]
    fn test_bad_entries_are_isolated() {
        let mut world = world();
        let list = EntityList::from_json(
            r#"{ "entities": [
                { "prototype": "Nothing" },
                { "name": "odd", "components": { "Transform": { "position": "north" }, "Sparkle": 1 } },
                { "prototype": "Raft" }
            ] }"#,
        )
        .unwrap();
        let report = world.load_entities(&list);

        assert_eq!(report.entities.len(), 2);
        let labels: Vec<&str> = report.failures.iter().map(|(l, _)| l.as_str()).collect();
        assert_eq!(labels, vec!["Nothing", "odd/Transform", "odd/Sparkle"]);
        assert!(matches!(report.failures[0].1, EntityError::PrototypeNotFound(_)));
        assert!(matches!(report.failures[1].1, EntityError::Decode { .. }));
        assert!(matches!(report.failures[2].1, EntityError::UnknownComponent(_)));
    }

    #[test]
    fn test_projectiles_expire() {
        let mut world = world();
        let projectile = world.spawn("Projectile").unwrap();
        assert!(world.manager().has::<Transform>(projectile));

        world.update(1.0);
        assert!(world.manager().is_valid(projectile));
        let position = world.manager().lookup::<Transform>(projectile).unwrap().position;
        assert!(position.abs_diff_eq(Vec3::Y, 1e-5));

        world.update(1.0);
        assert!(!world.manager().is_valid(projectile));
    }

    #[test]
    fn test_missing_entity_file() {
        let mut world = world();
        assert!(matches!(
            world.load_entity_file("/nonexistent/level.json"),
            Err(LoadError::Io { .. })
        ));
    }

    #[test]
    fn test_controller_attaches_to_later_player() {
        use std::cell::RefCell;

        use crate::services::ScriptedController;

        let mut world = world();
        world
            .set_active_controller(Rc::new(RefCell::new(ScriptedController::new())))
            .unwrap();
        world.load_entities(&EntityList::from_json(LEVEL).unwrap());

        let hero = world.active_player().unwrap();
        assert!(world.manager().lookup::<Player>(hero).unwrap().controller.is_some());
    }

    #[test]
    fn test_component_records_round_trip() {
        use rail_math::Quat;

        use crate::components::PlayerProjectileData;

        let mut world = world();
        let anchor = world.manager_mut().create_entity();
        let e = world.manager_mut().create_entity();
        {
            let manager = world.manager_mut();
            manager
                .add_entity_with::<Transform>(
                    e,
                    TransformData {
                        position: Vec3::new(1.0, 2.0, 3.0),
                        orientation: Quat::from_rotation_z(0.3),
                        scale: Vec3::new(1.0, 2.0, 0.5),
                        parent: Some(anchor),
                    },
                )
                .unwrap();
            manager
                .add_entity_with::<Physics>(
                    e,
                    PhysicsData {
                        velocity: Vec3::new(0.0, 4.0, 1.0),
                        angular_velocity: Vec3::new(0.5, -1.0, 2.0),
                        gravity_scale: 0.25,
                    },
                )
                .unwrap();
            manager
                .add_entity_with::<RailDenizen>(
                    e,
                    RailDenizenData {
                        nodes: vec![Vec3::ZERO, Vec3::new(0.0, 10.0, 0.0), Vec3::new(5.0, 10.0, 0.0)],
                        speed: 2.0,
                        looping: true,
                        ..RailDenizenData::default()
                    },
                )
                .unwrap();
            manager
                .add_entity_with::<PlayerProjectile>(e, PlayerProjectileData { owner: Some(anchor) })
                .unwrap();
            manager
                .add_entity_with::<TimeLimit>(e, TimeLimitData::new(5.0))
                .unwrap();
        }

        // Run a frame so derived state (rail velocity, elapsed time) is live.
        world.update(0.5);
        assert_ne!(
            world.manager().lookup::<RailDenizen>(e).unwrap().velocity(),
            Vec3::ZERO
        );

        let snapshot = world.manager().export_entity(e).unwrap();
        let factory = Rc::clone(world.factory());
        let copy = factory.create_from_template(&snapshot, world.manager_mut());
        assert!(!copy.is_degraded(), "{:?}", copy.failures);

        let manager = world.manager();
        let c = copy.entity;
        assert_eq!(manager.lookup::<Transform>(c), manager.lookup::<Transform>(e));
        assert_eq!(manager.lookup::<Physics>(c), manager.lookup::<Physics>(e));
        assert_eq!(manager.lookup::<RailDenizen>(c), manager.lookup::<RailDenizen>(e));
        assert_eq!(
            manager.lookup::<PlayerProjectile>(c),
            manager.lookup::<PlayerProjectile>(e)
        );
        assert_eq!(manager.lookup::<TimeLimit>(c), manager.lookup::<TimeLimit>(e));
        assert_eq!(
            manager.lookup::<PlayerProjectile>(c).unwrap().owner,
            Some(anchor)
        );
        assert_eq!(manager.lookup::<TimeLimit>(c).unwrap().elapsed, 0.5);
    }
}
