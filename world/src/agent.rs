//! Host view handed to a single agent during its turn.

use std::cell::Cell;

use tilebot_core::{
    Broadcast, ComputeClock, Direction, EntityId, EntityInfo, Point, Senses, Team, UnitKind,
};

use crate::{entities::EntityState, World};

/// Compute units charged for every sensing query an agent issues.
pub const SENSE_COST: u32 = 5;

/// Compute units charged for a nearby-entity scan.
pub const SCAN_COST: u32 = 100;

/// Read-only view of the world from one agent's perspective.
///
/// Every query charges the agent's compute meter, so `compute_used` grows as
/// the agent senses during its turn. The meter starts at zero for every new
/// context; [`AgentContext::with_compute_used`] simulates earlier spending.
#[derive(Debug)]
pub struct AgentContext<'w> {
    world: &'w World,
    state: &'w EntityState,
    meter: Cell<u32>,
}

impl<'w> AgentContext<'w> {
    /// Builds the view for `entity`, or `None` when it does not exist.
    #[must_use]
    pub fn new(world: &'w World, entity: EntityId) -> Option<Self> {
        let state = world.entities.get(entity)?;
        Some(Self {
            world,
            state,
            meter: Cell::new(0),
        })
    }

    /// Presets the compute meter as if `units` had already been spent this round.
    #[must_use]
    pub fn with_compute_used(self, units: u32) -> Self {
        self.meter.set(units);
        self
    }

    /// Charges additional compute units against the agent.
    pub fn charge(&self, units: u32) {
        self.meter.set(self.meter.get().saturating_add(units));
    }

    /// Allegiance of the acting agent.
    #[must_use]
    pub fn team(&self) -> Team {
        self.state.team
    }

    /// Archetype of the acting agent.
    #[must_use]
    pub fn kind(&self) -> UnitKind {
        self.state.kind
    }

    fn in_range(&self, point: Point, radius_squared: u32) -> bool {
        self.state.location.distance_squared_to(point) <= radius_squared
    }
}

impl Senses for AgentContext<'_> {
    fn id(&self) -> EntityId {
        self.state.id
    }

    fn location(&self) -> Point {
        self.state.location
    }

    fn sensor_radius_squared(&self) -> u32 {
        self.state.kind.sensor_radius_squared()
    }

    fn on_the_map(&self, point: Point) -> bool {
        self.charge(SENSE_COST);
        self.world.bounds.contains(point)
    }

    fn can_sense_location(&self, point: Point) -> bool {
        self.charge(SENSE_COST);
        self.in_range(point, self.sensor_radius_squared())
    }

    fn is_location_occupied(&self, point: Point) -> bool {
        self.charge(SENSE_COST);
        self.world.occupant(point).is_some()
    }

    fn sense_passability(&self, point: Point) -> Option<f64> {
        self.charge(SENSE_COST);
        if !self.in_range(point, self.sensor_radius_squared()) {
            return None;
        }
        self.world.passability_at(point)
    }

    fn sense_robot_at_location(&self, point: Point) -> Option<EntityInfo> {
        self.charge(SENSE_COST);
        if !self.in_range(point, self.sensor_radius_squared()) {
            return None;
        }
        let occupant = self.world.occupant(point)?;
        self.world.entities.get(occupant).map(EntityState::info)
    }

    fn sense_robot(&self, id: EntityId) -> Option<EntityInfo> {
        self.charge(SENSE_COST);
        let state = self.world.entities.get(id)?;
        self.in_range(state.location, self.sensor_radius_squared())
            .then(|| state.info())
    }

    fn sense_nearby_robots(
        &self,
        radius_squared: Option<u32>,
        team: Option<Team>,
    ) -> Vec<EntityInfo> {
        self.charge(SCAN_COST);
        let sensor = self.sensor_radius_squared();
        let radius = radius_squared.map_or(sensor, |radius| radius.min(sensor));
        self.world
            .entities
            .iter()
            .filter(|other| other.id != self.state.id)
            .filter(|other| team.map_or(true, |team| other.team == team))
            .filter(|other| self.in_range(other.location, radius))
            .map(EntityState::info)
            .collect()
    }

    fn can_move(&self, direction: Direction) -> bool {
        self.charge(SENSE_COST);
        self.world.check_step(self.state.id, direction).is_ok()
    }
}

impl ComputeClock for AgentContext<'_> {
    fn cooldown_turns(&self) -> f64 {
        self.state.cooldown
    }

    fn compute_limit(&self) -> u32 {
        self.state.kind.compute_limit()
    }

    fn compute_used(&self) -> u32 {
        self.meter.get()
    }
}

impl Broadcast for AgentContext<'_> {
    fn can_get_flag(&self, entity: EntityId) -> bool {
        self.world.entities.get(entity).is_some()
    }

    fn get_flag(&self, entity: EntityId) -> Option<u32> {
        self.charge(SENSE_COST);
        self.can_get_flag(entity)
            .then(|| self.world.flags.read(entity))
    }
}
