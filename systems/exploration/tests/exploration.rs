use tilebot_core::{Command, EntityId, Event, MapBounds, Point, Team, UnitKind};
use tilebot_system_exploration::{KnownEdges, NavHistory};
use tilebot_world::{self as world, AgentContext, World};

fn world_with_scout(bounds: MapBounds, location: Point) -> (World, EntityId) {
    let mut world = World::new();
    let mut events = Vec::new();
    world::apply(&mut world, Command::ConfigureMap { bounds }, &mut events);
    world::apply(
        &mut world,
        Command::SpawnEntity {
            team: Team::Ally,
            kind: UnitKind::Scout,
            location,
        },
        &mut events,
    );
    let scout = events
        .iter()
        .find_map(|event| match event {
            Event::EntitySpawned { entity, .. } => Some(*entity),
            _ => None,
        })
        .expect("scout spawned");
    (world, scout)
}

#[test]
fn observe_discovers_nearby_edges() {
    let spawn = Point::new(3, 3);
    let (world, scout) = world_with_scout(MapBounds::new(Point::new(0, 0), 8, 8), spawn);
    let context = AgentContext::new(&world, scout).expect("scout exists");
    let mut history = NavHistory::new(spawn);

    history.observe(&context);

    assert_eq!(
        history.known_edges(),
        KnownEdges {
            north: Some(7),
            east: Some(7),
            south: Some(0),
            west: Some(0),
        }
    );
    assert!(history.visited(spawn));
    assert!(history.visited(Point::new(20, 3)), "cells past the east edge");
}

#[test]
fn far_edges_stay_unknown() {
    let spawn = Point::new(32, 32);
    let (world, scout) = world_with_scout(MapBounds::new(Point::new(0, 0), 64, 64), spawn);
    let context = AgentContext::new(&world, scout).expect("scout exists");
    let mut history = NavHistory::new(spawn);

    history.observe(&context);

    assert_eq!(history.known_edges(), KnownEdges::default());
    assert_eq!(history.visited_count(), 1);
}

#[test]
fn small_map_is_exhausted_after_visiting_every_frontier() {
    let spawn = Point::new(3, 3);
    let (world, scout) = world_with_scout(MapBounds::new(Point::new(0, 0), 8, 8), spawn);
    let context = AgentContext::new(&world, scout).expect("scout exists");
    let mut history = NavHistory::new(spawn);
    history.observe(&context);

    let mut frontier = Vec::new();
    while let Some(next) = history.nearest_unexplored(spawn) {
        assert!(frontier.len() < 8, "frontier search did not terminate");
        frontier.push(next);
        history.mark_visited(next);
    }

    assert_eq!(
        frontier,
        vec![Point::new(0, 7), Point::new(7, 0), Point::new(0, 0)]
    );
    assert_eq!(history.nearest_unexplored(spawn), None);
}
