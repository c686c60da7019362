//! Deterministic multi-agent run that exercises navigation and messaging.
//!
//! An allied hub broadcasts its wrapped location. Scouts spawned around it
//! explore the map, report neutral hubs and nearby threats over the flag
//! channel, and head home once their frontier is exhausted.

use anyhow::{anyhow, bail, Result};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tilebot_core::{
    Broadcast, Command, Direction, DirectionSet, EntityId, EntityInfo, Event, MapBounds, Point,
    Senses, Team, UnitKind,
};
use tilebot_system_communication::{
    decode, encode, unwrap_location, wrap_location, DecodeError, Label, Message,
};
use tilebot_system_exploration::ExplorationConfig;
use tilebot_system_navigation::{Nav, NavConfig, NavStep};
use tilebot_world::{self as world, query, AgentContext, World};
use tracing::{debug, info, warn};

use crate::config::SimulationSection;

const PLACEMENT_ATTEMPTS: u32 = 10_000;
const STRENGTH_BUCKETS: u32 = 16;
const SEVERITY_BUCKETS: u32 = 32;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Exploring,
    Returning,
    Parked,
}

#[derive(Debug)]
struct Scout {
    id: EntityId,
    nav: Nav,
    phase: Phase,
    home: Option<Point>,
    reported: Vec<Point>,
}

/// Totals reported at the end of a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Summary {
    pub(crate) rounds: u32,
    pub(crate) moves: u32,
    pub(crate) rejected_moves: u32,
    pub(crate) flags_sent: u32,
    pub(crate) malformed_flags: u32,
    pub(crate) neutral_bases_reported: u32,
    pub(crate) cells_visited: usize,
    pub(crate) scouts_parked: u32,
}

/// Owns the world and every agent taking part in a run.
#[derive(Debug)]
pub(crate) struct Simulation {
    world: World,
    hub: EntityId,
    scouts: Vec<Scout>,
    rounds: u32,
    summary: Summary,
}

impl Simulation {
    /// Generates the map and population described by `settings`.
    pub(crate) fn new(
        settings: &SimulationSection,
        navigation: NavConfig,
        exploration: ExplorationConfig,
    ) -> Result<Self> {
        let mut rng = ChaCha8Rng::seed_from_u64(settings.seed);
        let mut world = World::new();
        let mut events = Vec::new();
        let bounds = MapBounds::new(Point::new(0, 0), settings.width, settings.height);
        world::apply(&mut world, Command::ConfigureMap { bounds }, &mut events);

        for y in 0..settings.height {
            for x in 0..settings.width {
                let passability = rng.gen_range(settings.min_passability..=1.0);
                world::apply(
                    &mut world,
                    Command::SetPassability {
                        point: tile(x, y),
                        passability,
                    },
                    &mut events,
                );
            }
        }

        let centre = tile(settings.width / 2, settings.height / 2);
        let hub = spawn(&mut world, Team::Ally, UnitKind::Hub, centre)?;

        let mut scouts = Vec::new();
        for _ in 0..settings.scouts {
            let location = free_tile_near(&world, centre)?;
            let id = spawn(&mut world, Team::Ally, UnitKind::Scout, location)?;
            let mut nav = Nav::with_config(location, navigation, exploration);
            nav.set_explore();
            scouts.push(Scout {
                id,
                nav,
                phase: Phase::Exploring,
                home: None,
                reported: Vec::new(),
            });
        }

        for _ in 0..settings.neutral_bases {
            let location = random_free_tile(&world, &mut rng, bounds)?;
            let _ = spawn(&mut world, Team::Neutral, UnitKind::Hub, location)?;
        }
        for _ in 0..settings.enemies {
            let location = random_free_tile(&world, &mut rng, bounds)?;
            let _ = spawn(&mut world, Team::Enemy, UnitKind::Enforcer, location)?;
        }

        info!(
            width = settings.width,
            height = settings.height,
            scouts = scouts.len(),
            seed = settings.seed,
            "generated map"
        );
        Ok(Self {
            world,
            hub,
            scouts,
            rounds: settings.rounds,
            summary: Summary::default(),
        })
    }

    /// Banner of the underlying world.
    pub(crate) fn banner(&self) -> &'static str {
        query::welcome_banner(&self.world)
    }

    /// Plays every round and returns the totals.
    pub(crate) fn run(mut self) -> Summary {
        for _ in 0..self.rounds {
            self.play_round();
            if self.scouts.iter().all(|scout| scout.phase == Phase::Parked) {
                break;
            }
        }
        self.summary.cells_visited = self
            .scouts
            .iter()
            .map(|scout| scout.nav.history().visited_count())
            .sum();
        self.summary
    }

    fn play_round(&mut self) {
        let mut events = Vec::new();
        if let Some(hub) = query::entity(&self.world, self.hub) {
            let (x, y) = wrap_location(hub.location);
            if let Ok(message) = Message::new(Label::AllyBase, &[x, y]) {
                self.publish(self.hub, &message, &mut events);
            }
        }

        for index in 0..self.scouts.len() {
            let teammates: Vec<EntityId> = self
                .scouts
                .iter()
                .map(|scout| scout.id)
                .chain(std::iter::once(self.hub))
                .collect();
            let (commands, malformed) =
                plan_turn(&self.world, &mut self.scouts[index], &teammates);
            self.summary.malformed_flags += malformed;

            for command in commands {
                if matches!(command, Command::SetFlag { .. }) {
                    self.summary.flags_sent += 1;
                }
                world::apply(&mut self.world, command, &mut events);
            }
        }

        world::apply(&mut self.world, Command::AdvanceRound, &mut events);
        self.summary.rounds += 1;
        for event in &events {
            match event {
                Event::EntityMoved { .. } => self.summary.moves += 1,
                Event::MoveRejected { .. } => self.summary.rejected_moves += 1,
                _ => {}
            }
        }
        self.summary.neutral_bases_reported = self
            .scouts
            .iter()
            .map(|scout| scout.reported.len() as u32)
            .sum();
        self.summary.scouts_parked = self
            .scouts
            .iter()
            .filter(|scout| scout.phase == Phase::Parked)
            .count() as u32;
    }

    fn publish(&mut self, entity: EntityId, message: &Message, events: &mut Vec<Event>) {
        let flag = encode(message);
        world::apply(&mut self.world, Command::SetFlag { entity, flag }, events);
        self.summary.flags_sent += 1;
    }
}

/// Runs one scout's turn against a read-only world and returns the commands it issues.
fn plan_turn(world: &World, scout: &mut Scout, teammates: &[EntityId]) -> (Vec<Command>, u32) {
    let mut commands = Vec::new();
    let Some(context) = AgentContext::new(world, scout.id) else {
        return (commands, 0);
    };
    let location = context.location();

    let mut malformed = 0;
    let scout_id = scout.id;
    for &teammate in teammates.iter().filter(|&&teammate| teammate != scout_id) {
        let Some(flag) = context.get_flag(teammate) else {
            continue;
        };
        match decode(flag) {
            Ok(message) => read_message(scout, &message, location),
            Err(DecodeError::NoMessage) => {}
            Err(error) => {
                malformed += 1;
                warn!(entity = teammate.get(), %error, "skipping malformed flag");
            }
        }
    }

    let enemies = context.sense_nearby_robots(None, Some(Team::Enemy));
    let danger: DirectionSet = enemies
        .iter()
        .map(|enemy| location.direction_to(enemy.location))
        .filter(|direction| *direction != Direction::Center)
        .collect();

    match scout.nav.tick(&context, danger) {
        NavStep::Move(direction) => {
            if context.can_move(direction) {
                commands.push(Command::MoveEntity {
                    entity: scout.id,
                    direction,
                });
            }
        }
        NavStep::NoMove => {}
        NavStep::GoalComplete => advance_phase(scout),
    }

    let neutral = context
        .sense_nearby_robots(None, Some(Team::Neutral))
        .into_iter()
        .filter(|info| info.kind == UnitKind::Hub)
        .find(|info| !scout.reported.contains(&info.location));
    let message = outgoing_message(scout, neutral, &enemies);
    if let Some(message) = message {
        commands.push(Command::SetFlag {
            entity: scout.id,
            flag: encode(&message),
        });
    }
    (commands, malformed)
}

fn read_message(scout: &mut Scout, message: &Message, location: Point) {
    match message.label() {
        Label::AllyBase => {
            let &[x, y] = message.fields() else {
                return;
            };
            let home = unwrap_location(x, y, location);
            if scout.home != Some(home) {
                debug!(scout = scout.id.get(), ?home, "learned home location");
                scout.home = Some(home);
            }
        }
        Label::NeutralBase => {
            let &[x, y, _] = message.fields() else {
                return;
            };
            let base = unwrap_location(x, y, location);
            if !scout.reported.contains(&base) {
                scout.reported.push(base);
            }
        }
        _ => {}
    }
}

fn advance_phase(scout: &mut Scout) {
    match (scout.phase, scout.home) {
        (Phase::Exploring, Some(home)) => {
            info!(scout = scout.id.get(), ?home, "frontier exhausted, returning home");
            scout.phase = Phase::Returning;
            scout.nav.set_go_to(home);
        }
        (Phase::Exploring, None) | (Phase::Returning, _) => {
            info!(scout = scout.id.get(), "scout parked");
            scout.phase = Phase::Parked;
        }
        (Phase::Parked, _) => {}
    }
}

fn outgoing_message(
    scout: &mut Scout,
    neutral: Option<EntityInfo>,
    enemies: &[EntityInfo],
) -> Option<Message> {
    if let Some(base) = neutral {
        scout.reported.push(base.location);
        let (x, y) = wrap_location(base.location);
        let strength = base.id.get() % STRENGTH_BUCKETS;
        return Message::new(Label::NeutralBase, &[x, y, strength]).ok();
    }
    if let Some(enemy) = enemies.first() {
        let (x, y) = wrap_location(enemy.location);
        let severity = (enemies.len() as u32).min(SEVERITY_BUCKETS - 1);
        return Message::new(Label::DangerInfo, &[x, y, severity]).ok();
    }
    match scout.phase {
        Phase::Exploring => Message::new(Label::Explore, &[]).ok(),
        Phase::Returning | Phase::Parked => None,
    }
}

fn spawn(world: &mut World, team: Team, kind: UnitKind, location: Point) -> Result<EntityId> {
    let mut events = Vec::new();
    world::apply(
        world,
        Command::SpawnEntity {
            team,
            kind,
            location,
        },
        &mut events,
    );
    events
        .iter()
        .find_map(|event| match event {
            Event::EntitySpawned { entity, .. } => Some(*entity),
            _ => None,
        })
        .ok_or_else(|| anyhow!("could not spawn {kind:?} at {location:?}: {events:?}"))
}

/// First free tile on the smallest square ring around `centre`.
fn free_tile_near(world: &World, centre: Point) -> Result<Point> {
    let bounds = query::bounds(world);
    for radius in 1..=bounds.width().max(bounds.height()) as i32 {
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx.abs().max(dy.abs()) != radius {
                    continue;
                }
                let point = centre.translate(dx, dy);
                if !bounds.contains(point) || query::occupant(world, point).is_some() {
                    continue;
                }
                return Ok(point);
            }
        }
    }
    bail!("no free tile left around {centre:?}")
}

fn random_free_tile(world: &World, rng: &mut ChaCha8Rng, bounds: MapBounds) -> Result<Point> {
    for _ in 0..PLACEMENT_ATTEMPTS {
        let x = rng.gen_range(0..bounds.width());
        let y = rng.gen_range(0..bounds.height());
        let point = tile(x, y);
        if query::occupant(world, point).is_none() {
            return Ok(point);
        }
    }
    bail!("could not find a free tile after {PLACEMENT_ATTEMPTS} attempts")
}

fn tile(x: u32, y: u32) -> Point {
    Point::new(x as i32, y as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> SimulationSection {
        SimulationSection {
            seed: 11,
            rounds: 60,
            width: 24,
            height: 24,
            scouts: 3,
            neutral_bases: 2,
            enemies: 1,
            min_passability: 0.5,
        }
    }

    fn build(settings: &SimulationSection) -> Simulation {
        Simulation::new(settings, NavConfig::default(), ExplorationConfig::default())
            .expect("simulation builds")
    }

    #[test]
    fn runs_are_deterministic_for_a_seed() {
        let first = build(&settings()).run();
        let second = build(&settings()).run();

        assert_eq!(first, second);
    }

    #[test]
    fn scouts_move_and_talk() {
        let summary = build(&settings()).run();

        assert!(summary.rounds > 0);
        assert!(summary.moves > 0);
        assert!(summary.flags_sent > summary.rounds);
        assert_eq!(summary.malformed_flags, 0);
        assert!(summary.cells_visited >= 3);
    }

    #[test]
    fn scouts_spawn_next_to_the_hub() {
        let simulation = build(&settings());
        let hub = query::entity(&simulation.world, simulation.hub).expect("hub exists");

        for scout in &simulation.scouts {
            let info = query::entity(&simulation.world, scout.id).expect("scout exists");
            assert!(info.location.is_adjacent_to(hub.location));
        }
    }

    #[test]
    fn hub_flag_teaches_scouts_their_home() {
        let mut simulation = build(&settings());
        simulation.play_round();
        simulation.play_round();

        let hub = query::entity(&simulation.world, simulation.hub).expect("hub exists");
        assert!(simulation
            .scouts
            .iter()
            .all(|scout| scout.home == Some(hub.location)));
    }

    #[test]
    fn malformed_flags_are_counted_and_skipped() {
        let mut simulation = build(&settings());
        let mut events = Vec::new();
        world::apply(
            &mut simulation.world,
            Command::SetFlag {
                entity: simulation.hub,
                flag: tilebot_system_communication::FLAG_SPACE,
            },
            &mut events,
        );
        world::apply(&mut simulation.world, Command::AdvanceRound, &mut events);

        let teammates = vec![simulation.hub];
        let (_, malformed) = plan_turn(&simulation.world, &mut simulation.scouts[0], &teammates);

        assert_eq!(malformed, 1);
    }
}
