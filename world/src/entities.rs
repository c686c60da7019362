//! Authoritative entity state management utilities.

use std::collections::BTreeMap;

use tilebot_core::{EntityId, EntityInfo, Point, Team, UnitKind};

/// Snapshot of an entity stored inside the world.
#[derive(Clone, Debug)]
pub(crate) struct EntityState {
    /// Identifier allocated by the world for the entity.
    pub(crate) id: EntityId,
    /// Allegiance of the entity.
    pub(crate) team: Team,
    /// Archetype of the entity.
    pub(crate) kind: UnitKind,
    /// Tile currently occupied by the entity.
    pub(crate) location: Point,
    /// Outstanding movement cooldown.
    pub(crate) cooldown: f64,
}

impl EntityState {
    /// Public view of the entity handed to sensing agents.
    pub(crate) fn info(&self) -> EntityInfo {
        EntityInfo {
            id: self.id,
            team: self.team,
            kind: self.kind,
            location: self.location,
        }
    }
}

/// Registry that stores entities and manages identifier allocation.
#[derive(Debug)]
pub(crate) struct EntityRegistry {
    entries: BTreeMap<EntityId, EntityState>,
    next_entity_id: EntityId,
}

impl EntityRegistry {
    /// Creates an empty registry whose first identifier is 1.
    pub(crate) fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_entity_id: EntityId::new(1),
        }
    }

    /// Stores a new entity and returns its freshly allocated identifier.
    pub(crate) fn insert(&mut self, team: Team, kind: UnitKind, location: Point) -> EntityId {
        let id = self.next_entity_id;
        self.next_entity_id = EntityId::new(id.get().saturating_add(1));
        let _ = self.entries.insert(
            id,
            EntityState {
                id,
                team,
                kind,
                location,
                cooldown: 0.0,
            },
        );
        id
    }

    /// Removes the entity, returning its final state.
    pub(crate) fn remove(&mut self, id: EntityId) -> Option<EntityState> {
        self.entries.remove(&id)
    }

    pub(crate) fn get(&self, id: EntityId) -> Option<&EntityState> {
        self.entries.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: EntityId) -> Option<&mut EntityState> {
        self.entries.get_mut(&id)
    }

    /// Iterates entities in ascending identifier order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &EntityState> {
        self.entries.values()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut EntityState> {
        self.entries.values_mut()
    }

    /// Drops every entity. Identifiers keep increasing.
    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_allocates_increasing_identifiers() {
        let mut registry = EntityRegistry::new();
        let first = registry.insert(Team::Ally, UnitKind::Scout, Point::new(0, 0));
        let second = registry.insert(Team::Enemy, UnitKind::Decoy, Point::new(1, 0));

        assert_eq!(first, EntityId::new(1));
        assert_eq!(second, EntityId::new(2));
        assert_eq!(registry.iter().count(), 2);
    }

    #[test]
    fn identifiers_are_not_reused_after_clear() {
        let mut registry = EntityRegistry::new();
        let _ = registry.insert(Team::Ally, UnitKind::Scout, Point::new(0, 0));
        registry.clear();
        let next = registry.insert(Team::Ally, UnitKind::Scout, Point::new(0, 0));
        assert_eq!(next, EntityId::new(2));
    }

    #[test]
    fn info_mirrors_state() {
        let mut registry = EntityRegistry::new();
        let id = registry.insert(Team::Neutral, UnitKind::Hub, Point::new(4, -2));
        let info = registry.get(id).expect("entity stored").info();

        assert_eq!(info.id, id);
        assert_eq!(info.team, Team::Neutral);
        assert_eq!(info.kind, UnitKind::Hub);
        assert_eq!(info.location, Point::new(4, -2));
    }
}
