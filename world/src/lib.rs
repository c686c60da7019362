#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative simulated world for tilebot agents.
//!
//! The world owns the passability grid, the entity registry, movement
//! cooldowns and the broadcast channel. Drivers mutate it exclusively through
//! [`apply`], and agents observe it through [`AgentContext`], which implements
//! the host traits defined in `tilebot-core`.

mod agent;
mod broadcast;
mod entities;

use tilebot_core::{
    Command, Direction, EntityId, Event, MapBounds, MoveError, Point, WELCOME_BANNER,
};
use tracing::{debug, trace};

pub use agent::{AgentContext, SCAN_COST, SENSE_COST};

use broadcast::FlagChannel;
use entities::EntityRegistry;

const DEFAULT_MAP_ORIGIN: Point = Point::new(0, 0);
const DEFAULT_MAP_WIDTH: u32 = 32;
const DEFAULT_MAP_HEIGHT: u32 = 32;

/// Slowest terrain the world accepts. Lower requests are clamped to it.
pub const MIN_PASSABILITY: f64 = 0.1;

/// Represents the authoritative simulation state.
#[derive(Debug)]
pub struct World {
    banner: &'static str,
    bounds: MapBounds,
    passability: Vec<f64>,
    occupancy: Vec<Option<EntityId>>,
    entities: EntityRegistry,
    flags: FlagChannel,
    round: u64,
}

impl World {
    /// Creates a world with an empty default map.
    #[must_use]
    pub fn new() -> Self {
        let bounds = MapBounds::new(DEFAULT_MAP_ORIGIN, DEFAULT_MAP_WIDTH, DEFAULT_MAP_HEIGHT);
        Self {
            banner: WELCOME_BANNER,
            bounds,
            passability: vec![1.0; bounds.area()],
            occupancy: vec![None; bounds.area()],
            entities: EntityRegistry::new(),
            flags: FlagChannel::default(),
            round: 0,
        }
    }

    fn reset(&mut self, bounds: MapBounds) {
        self.bounds = bounds;
        self.passability = vec![1.0; bounds.area()];
        self.occupancy = vec![None; bounds.area()];
        self.entities.clear();
        self.flags.clear();
    }

    pub(crate) fn occupant(&self, point: Point) -> Option<EntityId> {
        self.bounds
            .index(point)
            .and_then(|index| self.occupancy.get(index).copied().flatten())
    }

    pub(crate) fn passability_at(&self, point: Point) -> Option<f64> {
        self.bounds
            .index(point)
            .and_then(|index| self.passability.get(index).copied())
    }

    /// Validates a step without performing it, returning the destination.
    pub(crate) fn check_step(
        &self,
        entity: EntityId,
        direction: Direction,
    ) -> Result<Point, MoveError> {
        if direction == Direction::Center {
            return Err(MoveError::Stationary);
        }
        let state = self.entities.get(entity).ok_or(MoveError::UnknownEntity)?;
        if state.cooldown >= 1.0 {
            return Err(MoveError::NotReady);
        }
        let destination = state.location.add(direction);
        if !self.bounds.contains(destination) {
            return Err(MoveError::OffMap);
        }
        if self.occupant(destination).is_some() {
            return Err(MoveError::Occupied);
        }
        Ok(destination)
    }

    fn step(&mut self, entity: EntityId, direction: Direction) -> Result<(Point, Point), MoveError> {
        let to = self.check_step(entity, direction)?;
        let passability = self.passability_at(to).unwrap_or(MIN_PASSABILITY);
        let Some(state) = self.entities.get_mut(entity) else {
            return Err(MoveError::UnknownEntity);
        };
        let from = state.location;
        state.location = to;
        state.cooldown += state.kind.base_cooldown() / passability;

        if let Some(index) = self.bounds.index(from) {
            self.occupancy[index] = None;
        }
        if let Some(index) = self.bounds.index(to) {
            self.occupancy[index] = Some(entity);
        }
        Ok((from, to))
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    trace!(?command, round = world.round, "applying world command");
    match command {
        Command::ConfigureMap { bounds } => {
            world.reset(bounds);
            out_events.push(Event::MapConfigured { bounds });
        }
        Command::SetPassability { point, passability } => {
            if let Some(index) = world.bounds.index(point) {
                world.passability[index] = clamp_passability(passability);
            }
        }
        Command::SpawnEntity {
            team,
            kind,
            location,
        } => {
            let Some(index) = world.bounds.index(location) else {
                out_events.push(Event::SpawnRejected {
                    location,
                    reason: MoveError::OffMap,
                });
                return;
            };
            if world.occupancy[index].is_some() {
                out_events.push(Event::SpawnRejected {
                    location,
                    reason: MoveError::Occupied,
                });
                return;
            }
            let entity = world.entities.insert(team, kind, location);
            world.occupancy[index] = Some(entity);
            out_events.push(Event::EntitySpawned { entity, location });
        }
        Command::RemoveEntity { entity } => {
            if let Some(state) = world.entities.remove(entity) {
                if let Some(index) = world.bounds.index(state.location) {
                    world.occupancy[index] = None;
                }
                world.flags.forget(entity);
                out_events.push(Event::EntityRemoved { entity });
            }
        }
        Command::MoveEntity { entity, direction } => match world.step(entity, direction) {
            Ok((from, to)) => out_events.push(Event::EntityMoved { entity, from, to }),
            Err(reason) => {
                debug!(entity = entity.get(), ?direction, ?reason, "move rejected");
                out_events.push(Event::MoveRejected {
                    entity,
                    direction,
                    reason,
                });
            }
        },
        Command::SetCooldown { entity, turns } => {
            if let Some(state) = world.entities.get_mut(entity) {
                state.cooldown = turns.max(0.0);
            }
        }
        Command::SetFlag { entity, flag } => {
            if world.entities.get(entity).is_some() {
                world.flags.write(entity, flag);
                out_events.push(Event::FlagSet { entity, flag });
            }
        }
        Command::AdvanceRound => {
            world.round = world.round.saturating_add(1);
            for state in world.entities.iter_mut() {
                state.cooldown = (state.cooldown - 1.0).max(0.0);
            }
            world.flags.publish();
            out_events.push(Event::RoundAdvanced { round: world.round });
        }
    }
}

fn clamp_passability(value: f64) -> f64 {
    if value.is_nan() {
        return MIN_PASSABILITY;
    }
    value.clamp(MIN_PASSABILITY, 1.0)
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use tilebot_core::{EntityId, EntityInfo, MapBounds, Point};

    use super::World;

    /// Retrieves the banner that adapters may display on start-up.
    #[must_use]
    pub fn welcome_banner(world: &World) -> &'static str {
        world.banner
    }

    /// Extent of the current map.
    #[must_use]
    pub fn bounds(world: &World) -> MapBounds {
        world.bounds
    }

    /// Index of the current round.
    #[must_use]
    pub fn round(world: &World) -> u64 {
        world.round
    }

    /// Public view of a single entity.
    #[must_use]
    pub fn entity(world: &World, entity: EntityId) -> Option<EntityInfo> {
        world.entities.get(entity).map(|state| state.info())
    }

    /// Public views of all entities in ascending identifier order.
    #[must_use]
    pub fn entities(world: &World) -> Vec<EntityInfo> {
        world.entities.iter().map(|state| state.info()).collect()
    }

    /// Entity standing on the point, if any.
    #[must_use]
    pub fn occupant(world: &World, point: Point) -> Option<EntityId> {
        world.occupant(point)
    }

    /// Passability of an on-map tile.
    #[must_use]
    pub fn passability(world: &World, point: Point) -> Option<f64> {
        world.passability_at(point)
    }

    /// Outstanding cooldown of an entity.
    #[must_use]
    pub fn cooldown(world: &World, entity: EntityId) -> Option<f64> {
        world.entities.get(entity).map(|state| state.cooldown)
    }

    /// Flag currently readable for an entity; zero when nothing was published.
    #[must_use]
    pub fn published_flag(world: &World, entity: EntityId) -> u32 {
        world.flags.read(entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tilebot_core::{Broadcast, ComputeClock, Senses, Team, UnitKind};

    fn configured_world(width: u32, height: u32) -> World {
        let mut world = World::new();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::ConfigureMap {
                bounds: MapBounds::new(Point::new(0, 0), width, height),
            },
            &mut events,
        );
        world
    }

    fn spawn(world: &mut World, kind: UnitKind, location: Point) -> EntityId {
        let mut events = Vec::new();
        apply(
            world,
            Command::SpawnEntity {
                team: Team::Ally,
                kind,
                location,
            },
            &mut events,
        );
        match events.as_slice() {
            [Event::EntitySpawned { entity, .. }] => *entity,
            other => panic!("unexpected spawn events: {other:?}"),
        }
    }

    #[test]
    fn apply_configures_map() {
        let mut world = World::new();
        let mut events = Vec::new();
        let bounds = MapBounds::new(Point::new(-5, 3), 12, 8);

        apply(&mut world, Command::ConfigureMap { bounds }, &mut events);

        assert_eq!(query::bounds(&world), bounds);
        assert_eq!(events, vec![Event::MapConfigured { bounds }]);
        assert_eq!(query::passability(&world, Point::new(-5, 3)), Some(1.0));
        assert_eq!(query::passability(&world, Point::new(-6, 3)), None);
    }

    #[test]
    fn spawn_rejects_occupied_and_off_map_tiles() {
        let mut world = configured_world(4, 4);
        let _ = spawn(&mut world, UnitKind::Scout, Point::new(1, 1));
        let mut events = Vec::new();

        apply(
            &mut world,
            Command::SpawnEntity {
                team: Team::Enemy,
                kind: UnitKind::Decoy,
                location: Point::new(1, 1),
            },
            &mut events,
        );
        apply(
            &mut world,
            Command::SpawnEntity {
                team: Team::Enemy,
                kind: UnitKind::Decoy,
                location: Point::new(9, 1),
            },
            &mut events,
        );

        assert_eq!(
            events,
            vec![
                Event::SpawnRejected {
                    location: Point::new(1, 1),
                    reason: MoveError::Occupied,
                },
                Event::SpawnRejected {
                    location: Point::new(9, 1),
                    reason: MoveError::OffMap,
                },
            ]
        );
    }

    #[test]
    fn move_updates_occupancy_and_cooldown() {
        let mut world = configured_world(4, 4);
        let scout = spawn(&mut world, UnitKind::Scout, Point::new(1, 1));
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::SetPassability {
                point: Point::new(2, 1),
                passability: 0.5,
            },
            &mut events,
        );

        apply(
            &mut world,
            Command::MoveEntity {
                entity: scout,
                direction: Direction::East,
            },
            &mut events,
        );

        assert_eq!(
            events,
            vec![Event::EntityMoved {
                entity: scout,
                from: Point::new(1, 1),
                to: Point::new(2, 1),
            }]
        );
        assert_eq!(query::occupant(&world, Point::new(1, 1)), None);
        assert_eq!(query::occupant(&world, Point::new(2, 1)), Some(scout));
        assert_eq!(query::cooldown(&world, scout), Some(3.0));
    }

    #[test]
    fn moves_are_rejected_while_cooling_down() {
        let mut world = configured_world(4, 4);
        let scout = spawn(&mut world, UnitKind::Scout, Point::new(1, 1));
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::SetCooldown {
                entity: scout,
                turns: 1.5,
            },
            &mut events,
        );

        apply(
            &mut world,
            Command::MoveEntity {
                entity: scout,
                direction: Direction::North,
            },
            &mut events,
        );
        assert!(matches!(
            events.last(),
            Some(Event::MoveRejected {
                reason: MoveError::NotReady,
                ..
            })
        ));

        apply(&mut world, Command::AdvanceRound, &mut events);
        assert_eq!(query::cooldown(&world, scout), Some(0.5));
        let context = AgentContext::new(&world, scout).expect("scout exists");
        assert!(context.is_ready());
        assert!(context.can_move(Direction::North));
    }

    #[test]
    fn flags_become_readable_next_round() {
        let mut world = configured_world(4, 4);
        let speaker = spawn(&mut world, UnitKind::Hub, Point::new(0, 0));
        let listener = spawn(&mut world, UnitKind::Scout, Point::new(3, 3));
        let mut events = Vec::new();

        apply(
            &mut world,
            Command::SetFlag {
                entity: speaker,
                flag: 1234,
            },
            &mut events,
        );
        {
            let context = AgentContext::new(&world, listener).expect("listener exists");
            assert_eq!(context.get_flag(speaker), Some(0));
        }

        apply(&mut world, Command::AdvanceRound, &mut events);
        let context = AgentContext::new(&world, listener).expect("listener exists");
        assert!(context.can_get_flag(speaker));
        assert_eq!(context.get_flag(speaker), Some(1234));
        assert_eq!(context.get_flag(EntityId::new(999)), None);
    }

    #[test]
    fn agent_context_limits_sensing_to_radius() {
        let mut world = configured_world(16, 16);
        let decoy = spawn(&mut world, UnitKind::Decoy, Point::new(0, 0));
        let near = spawn(&mut world, UnitKind::Scout, Point::new(4, 2));
        let far = spawn(&mut world, UnitKind::Scout, Point::new(5, 0));

        let context = AgentContext::new(&world, decoy).expect("decoy exists");
        assert!(context.sense_robot(near).is_some());
        assert!(context.sense_robot(far).is_none());
        assert_eq!(context.sense_passability(Point::new(5, 0)), None);
        assert_eq!(context.sense_passability(Point::new(4, 2)), Some(1.0));

        let nearby: Vec<_> = context
            .sense_nearby_robots(None, Some(Team::Ally))
            .into_iter()
            .map(|info| info.id)
            .collect();
        assert_eq!(nearby, vec![near]);
    }

    #[test]
    fn agent_context_charges_compute() {
        let mut world = configured_world(4, 4);
        let scout = spawn(&mut world, UnitKind::Scout, Point::new(0, 0));
        let context = AgentContext::new(&world, scout)
            .expect("scout exists")
            .with_compute_used(100);

        let _ = context.on_the_map(Point::new(1, 1));
        let _ = context.is_location_occupied(Point::new(1, 1));

        assert_eq!(context.compute_used(), 100 + 2 * SENSE_COST);
        assert_eq!(context.compute_limit(), UnitKind::Scout.compute_limit());
    }

    #[test]
    fn removed_entities_free_their_tile() {
        let mut world = configured_world(4, 4);
        let scout = spawn(&mut world, UnitKind::Scout, Point::new(2, 2));
        let mut events = Vec::new();

        apply(&mut world, Command::RemoveEntity { entity: scout }, &mut events);

        assert_eq!(events, vec![Event::EntityRemoved { entity: scout }]);
        assert_eq!(query::occupant(&world, Point::new(2, 2)), None);
        assert!(query::entity(&world, scout).is_none());
    }
}
