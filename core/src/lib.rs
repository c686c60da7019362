#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the tilebot agents.
//!
//! This crate defines the vocabulary that connects the simulated world, the
//! per-agent systems, and the adapters. Agents observe the world exclusively
//! through the [`Senses`], [`ComputeClock`] and [`Broadcast`] host traits,
//! and request mutations by submitting [`Command`] values that the world
//! answers with [`Event`] values.

use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

/// Canonical banner emitted when the simulation boots.
pub const WELCOME_BANNER: &str = "tilebot swarm simulation";

/// Location of a single map tile expressed in absolute coordinates.
///
/// North points toward increasing `y`, east toward increasing `x`. Points are
/// allowed to lie outside the map; hosts report such tiles as off-map.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Point {
    x: i32,
    y: i32,
}

impl Point {
    /// Creates a new point from absolute coordinates.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Horizontal coordinate of the point.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Vertical coordinate of the point.
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.y
    }

    /// Returns the point offset by the provided deltas.
    #[must_use]
    pub const fn translate(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
        }
    }

    /// Returns the neighbouring point reached by a single step in `direction`.
    #[must_use]
    pub const fn add(self, direction: Direction) -> Self {
        self.translate(direction.dx(), direction.dy())
    }

    /// Squared euclidean distance between two points.
    ///
    /// Saturates instead of overflowing for points that are absurdly far apart,
    /// which keeps far-away heading targets well ordered.
    #[must_use]
    pub fn distance_squared_to(self, other: Point) -> u32 {
        let dx = u64::from(self.x.abs_diff(other.x));
        let dy = u64::from(self.y.abs_diff(other.y));
        u32::try_from(dx * dx + dy * dy).unwrap_or(u32::MAX)
    }

    /// Reports whether `other` is one of the eight tiles surrounding `self`.
    #[must_use]
    pub fn is_adjacent_to(self, other: Point) -> bool {
        self != other && self.x.abs_diff(other.x) <= 1 && self.y.abs_diff(other.y) <= 1
    }

    /// Approximate direction from `self` toward `other`.
    ///
    /// The offset is bucketed into one of eight octants; a purely cardinal
    /// direction is returned once one axis dominates the other by a factor of
    /// roughly 2.414 (tan 67.5°). Equal points yield [`Direction::Center`].
    #[must_use]
    pub fn direction_to(self, other: Point) -> Direction {
        let dx = i64::from(other.x) - i64::from(self.x);
        let dy = i64::from(other.y) - i64::from(self.y);
        let (ax, ay) = (dx.abs(), dy.abs());

        if ax * 1000 >= ay * 2414 {
            match dx.signum() {
                1 => Direction::East,
                -1 => Direction::West,
                _ => Direction::Center,
            }
        } else if ay * 1000 >= ax * 2414 {
            if dy > 0 {
                Direction::North
            } else {
                Direction::South
            }
        } else {
            match (dx > 0, dy > 0) {
                (true, true) => Direction::NorthEast,
                (false, true) => Direction::NorthWest,
                (true, false) => Direction::SouthEast,
                (false, false) => Direction::SouthWest,
            }
        }
    }
}

/// Compass directions an agent may step in, plus the stationary centre.
///
/// Ordinals follow declaration order, which is also the bit order used by
/// [`DirectionSet`] and by direction fields inside broadcast messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    /// Toward increasing `y`.
    North,
    /// Toward increasing `x` and `y`.
    NorthEast,
    /// Toward increasing `x`.
    East,
    /// Toward increasing `x` and decreasing `y`.
    SouthEast,
    /// Toward decreasing `y`.
    South,
    /// Toward decreasing `x` and `y`.
    SouthWest,
    /// Toward decreasing `x`.
    West,
    /// Toward decreasing `x` and increasing `y`.
    NorthWest,
    /// No movement.
    Center,
}

impl Direction {
    /// The eight movement directions in ordinal order.
    pub const MOVES: [Direction; 8] = [
        Direction::North,
        Direction::NorthEast,
        Direction::East,
        Direction::SouthEast,
        Direction::South,
        Direction::SouthWest,
        Direction::West,
        Direction::NorthWest,
    ];

    /// Zero-based ordinal of the direction (`North` is 0, `Center` is 8).
    #[must_use]
    pub const fn ordinal(self) -> u8 {
        self as u8
    }

    /// Looks up a direction from its ordinal.
    #[must_use]
    pub const fn from_ordinal(ordinal: u8) -> Option<Self> {
        match ordinal {
            0 => Some(Self::North),
            1 => Some(Self::NorthEast),
            2 => Some(Self::East),
            3 => Some(Self::SouthEast),
            4 => Some(Self::South),
            5 => Some(Self::SouthWest),
            6 => Some(Self::West),
            7 => Some(Self::NorthWest),
            8 => Some(Self::Center),
            _ => None,
        }
    }

    /// Horizontal component of a single step.
    #[must_use]
    pub const fn dx(self) -> i32 {
        match self {
            Self::NorthEast | Self::East | Self::SouthEast => 1,
            Self::SouthWest | Self::West | Self::NorthWest => -1,
            Self::North | Self::South | Self::Center => 0,
        }
    }

    /// Vertical component of a single step.
    #[must_use]
    pub const fn dy(self) -> i32 {
        match self {
            Self::NorthWest | Self::North | Self::NorthEast => 1,
            Self::SouthWest | Self::South | Self::SouthEast => -1,
            Self::East | Self::West | Self::Center => 0,
        }
    }

    /// Direction pointing the opposite way. `Center` is its own opposite.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::North => Self::South,
            Self::NorthEast => Self::SouthWest,
            Self::East => Self::West,
            Self::SouthEast => Self::NorthWest,
            Self::South => Self::North,
            Self::SouthWest => Self::NorthEast,
            Self::West => Self::East,
            Self::NorthWest => Self::SouthEast,
            Self::Center => Self::Center,
        }
    }
}

/// Compact set of directions, stored as a bit mask keyed by ordinal.
///
/// Navigation uses it as the danger mask: directions in the set are never
/// chosen as the outgoing step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DirectionSet(u16);

impl DirectionSet {
    /// Set containing no directions.
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Set containing exactly one direction.
    #[must_use]
    pub const fn only(direction: Direction) -> Self {
        Self(1 << direction.ordinal())
    }

    /// Adds a direction to the set.
    pub fn insert(&mut self, direction: Direction) {
        self.0 |= 1 << direction.ordinal();
    }

    /// Reports whether the direction is part of the set.
    #[must_use]
    pub const fn contains(&self, direction: Direction) -> bool {
        self.0 & (1 << direction.ordinal()) != 0
    }

    /// Reports whether the set is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Raw bit mask where bit `n` corresponds to the direction with ordinal `n`.
    #[must_use]
    pub const fn bits(&self) -> u16 {
        self.0
    }
}

impl FromIterator<Direction> for DirectionSet {
    fn from_iter<I: IntoIterator<Item = Direction>>(iter: I) -> Self {
        let mut set = Self::empty();
        for direction in iter {
            set.insert(direction);
        }
        set
    }
}

impl BitOr for DirectionSet {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for DirectionSet {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Unique identifier assigned to an entity by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u32);

impl EntityId {
    /// Creates a new entity identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Allegiance of an entity relative to the simulation's home side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Team {
    /// Entities controlled by our agents.
    Ally,
    /// Entities controlled by the opponent.
    Enemy,
    /// Unaffiliated entities.
    Neutral,
}

/// Unit archetypes, each with its own sensing range and compute allowance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitKind {
    /// Stationary producer that coordinates the swarm.
    Hub,
    /// Slow, short-sighted unit that holds ground.
    Enforcer,
    /// Fragile unit with the smallest sensing range and compute allowance.
    Decoy,
    /// Fast explorer with a wide sensing range.
    Scout,
}

impl UnitKind {
    /// Squared radius within which the unit can sense tiles and entities.
    #[must_use]
    pub const fn sensor_radius_squared(self) -> u32 {
        match self {
            Self::Hub => 40,
            Self::Enforcer => 25,
            Self::Decoy => 20,
            Self::Scout => 30,
        }
    }

    /// Compute units the unit may spend within a single round.
    #[must_use]
    pub const fn compute_limit(self) -> u32 {
        match self {
            Self::Hub => 20_000,
            Self::Enforcer | Self::Scout => 15_000,
            Self::Decoy => 7_500,
        }
    }

    /// Cooldown accrued by a move onto a tile of passability 1.0.
    ///
    /// Moving onto slower terrain divides this value by the tile passability.
    #[must_use]
    pub const fn base_cooldown(self) -> f64 {
        match self {
            Self::Hub | Self::Decoy => 2.0,
            Self::Enforcer => 1.0,
            Self::Scout => 1.5,
        }
    }
}

/// Information about an entity that a host sensed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityInfo {
    /// Identifier assigned to the entity.
    pub id: EntityId,
    /// Allegiance of the entity.
    pub team: Team,
    /// Archetype of the entity.
    pub kind: UnitKind,
    /// Tile the entity currently occupies.
    pub location: Point,
}

/// Axis-aligned extent of the playable map.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MapBounds {
    origin: Point,
    width: u32,
    height: u32,
}

impl MapBounds {
    /// Creates bounds whose south-west corner is `origin`.
    #[must_use]
    pub const fn new(origin: Point, width: u32, height: u32) -> Self {
        Self {
            origin,
            width,
            height,
        }
    }

    /// South-west corner of the map.
    #[must_use]
    pub const fn origin(&self) -> Point {
        self.origin
    }

    /// Number of tile columns.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Number of tile rows.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Reports whether the point lies on the map.
    #[must_use]
    pub fn contains(&self, point: Point) -> bool {
        let dx = i64::from(point.x()) - i64::from(self.origin.x());
        let dy = i64::from(point.y()) - i64::from(self.origin.y());
        (0..i64::from(self.width)).contains(&dx) && (0..i64::from(self.height)).contains(&dy)
    }

    /// Row-major index of an on-map point.
    #[must_use]
    pub fn index(&self, point: Point) -> Option<usize> {
        if !self.contains(point) {
            return None;
        }
        let column = usize::try_from(point.x() - self.origin.x()).ok()?;
        let row = usize::try_from(point.y() - self.origin.y()).ok()?;
        let width = usize::try_from(self.width).ok()?;
        row.checked_mul(width)?.checked_add(column)
    }

    /// Number of tiles covered by the bounds.
    #[must_use]
    pub fn area(&self) -> usize {
        usize::try_from(u64::from(self.width) * u64::from(self.height)).unwrap_or(0)
    }
}

/// Read-only world queries available to an agent during its turn.
///
/// Each call may be charged against the agent's compute meter by the host.
pub trait Senses {
    /// Identifier of the agent the host view belongs to.
    fn id(&self) -> EntityId;

    /// Tile currently occupied by the agent.
    fn location(&self) -> Point;

    /// Squared radius within which the agent can sense.
    fn sensor_radius_squared(&self) -> u32;

    /// Reports whether the point lies on the map. Only meaningful for sensable points.
    fn on_the_map(&self, point: Point) -> bool;

    /// Reports whether the point lies within sensing range.
    fn can_sense_location(&self, point: Point) -> bool;

    /// Reports whether an entity currently occupies the point.
    fn is_location_occupied(&self, point: Point) -> bool;

    /// Passability of the tile in `(0, 1]`, or `None` when it cannot be sensed.
    fn sense_passability(&self, point: Point) -> Option<f64>;

    /// Entity standing on the point, if it is sensable and occupied.
    fn sense_robot_at_location(&self, point: Point) -> Option<EntityInfo>;

    /// Entity with the provided identifier, if it is within sensing range.
    fn sense_robot(&self, id: EntityId) -> Option<EntityInfo>;

    /// Entities within `radius_squared` (defaults to the sensor radius),
    /// optionally restricted to one team. The agent itself is excluded.
    fn sense_nearby_robots(&self, radius_squared: Option<u32>, team: Option<Team>)
        -> Vec<EntityInfo>;

    /// Reports whether a step in `direction` would currently succeed.
    fn can_move(&self, direction: Direction) -> bool;
}

/// Cooldown and compute budget introspection for the acting agent.
pub trait ComputeClock {
    /// Outstanding cooldown. The agent may act while it is below one.
    fn cooldown_turns(&self) -> f64;

    /// Compute units the agent may spend per round.
    fn compute_limit(&self) -> u32;

    /// Compute units already spent this round.
    fn compute_used(&self) -> u32;

    /// Reports whether the agent may act this round.
    fn is_ready(&self) -> bool {
        self.cooldown_turns() < 1.0
    }
}

/// Read access to the shared broadcast channel.
pub trait Broadcast {
    /// Reports whether the flag of `entity` is readable.
    fn can_get_flag(&self, entity: EntityId) -> bool;

    /// Flag published by `entity` in the previous round. Zero means no message.
    fn get_flag(&self, entity: EntityId) -> Option<u32>;
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Replaces the map with a fresh one of uniform passability 1.0 and no entities.
    ConfigureMap {
        /// Extent of the new map.
        bounds: MapBounds,
    },
    /// Overrides the passability of a single tile.
    SetPassability {
        /// Tile to update.
        point: Point,
        /// New passability, clamped into `(0, 1]`.
        passability: f64,
    },
    /// Requests a new entity at the provided location.
    SpawnEntity {
        /// Allegiance of the new entity.
        team: Team,
        /// Archetype of the new entity.
        kind: UnitKind,
        /// Tile the entity should occupy.
        location: Point,
    },
    /// Removes an entity from the world.
    RemoveEntity {
        /// Entity to remove.
        entity: EntityId,
    },
    /// Requests that an entity step once in the provided direction.
    MoveEntity {
        /// Entity attempting to move.
        entity: EntityId,
        /// Direction of the attempted step.
        direction: Direction,
    },
    /// Forces the outstanding cooldown of an entity.
    SetCooldown {
        /// Entity whose cooldown changes.
        entity: EntityId,
        /// New outstanding cooldown.
        turns: f64,
    },
    /// Writes the outgoing broadcast slot of an entity. Last write within a round wins.
    SetFlag {
        /// Entity publishing the flag.
        entity: EntityId,
        /// Encoded flag value. Zero clears the slot.
        flag: u32,
    },
    /// Ends the round: publishes flags and decays cooldowns.
    AdvanceRound,
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Confirms that the map was replaced.
    MapConfigured {
        /// Extent of the new map.
        bounds: MapBounds,
    },
    /// Confirms that an entity was created.
    EntitySpawned {
        /// Identifier assigned to the entity.
        entity: EntityId,
        /// Tile the entity occupies.
        location: Point,
    },
    /// Reports that a spawn request was rejected.
    SpawnRejected {
        /// Requested location.
        location: Point,
        /// Reason the spawn failed.
        reason: MoveError,
    },
    /// Confirms that an entity was removed.
    EntityRemoved {
        /// Identifier of the removed entity.
        entity: EntityId,
    },
    /// Confirms that an entity stepped between two tiles.
    EntityMoved {
        /// Entity that moved.
        entity: EntityId,
        /// Tile occupied before the step.
        from: Point,
        /// Tile occupied after the step.
        to: Point,
    },
    /// Reports that a move request was rejected.
    MoveRejected {
        /// Entity that attempted the step.
        entity: EntityId,
        /// Direction of the attempted step.
        direction: Direction,
        /// Reason the step failed.
        reason: MoveError,
    },
    /// Confirms that an entity wrote its outgoing flag.
    FlagSet {
        /// Entity publishing the flag.
        entity: EntityId,
        /// Flag value written.
        flag: u32,
    },
    /// Announces that a new round started.
    RoundAdvanced {
        /// Index of the round that just started.
        round: u64,
    },
}

/// Reasons a move or placement can be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MoveError {
    /// The entity does not exist.
    UnknownEntity,
    /// The entity still has outstanding cooldown.
    NotReady,
    /// The destination lies off the map.
    OffMap,
    /// The destination is occupied.
    Occupied,
    /// `Direction::Center` is not a move.
    Stationary,
}

#[cfg(test)]
mod tests {
    use super::{Direction, DirectionSet, EntityId, MapBounds, Point, UnitKind};
    use serde::{de::DeserializeOwned, Serialize};

    #[test]
    fn distance_squared_matches_expectation() {
        let origin = Point::new(1, 1);
        let destination = Point::new(4, -3);
        assert_eq!(origin.distance_squared_to(destination), 25);
        assert_eq!(destination.distance_squared_to(origin), 25);
    }

    #[test]
    fn distance_squared_saturates_for_far_points() {
        let near = Point::new(i32::MIN, i32::MIN);
        let far = Point::new(i32::MAX, i32::MAX);
        assert_eq!(near.distance_squared_to(far), u32::MAX);
    }

    #[test]
    fn direction_deltas_round_trip_through_add() {
        let origin = Point::new(3, 3);
        for direction in Direction::MOVES {
            let neighbour = origin.add(direction);
            assert!(origin.is_adjacent_to(neighbour));
            assert_eq!(origin.direction_to(neighbour), direction);
            assert_eq!(neighbour.add(direction.opposite()), origin);
        }
        assert_eq!(origin.add(Direction::Center), origin);
    }

    #[test]
    fn direction_to_buckets_into_octants() {
        let origin = Point::new(0, 0);
        assert_eq!(origin.direction_to(Point::new(5, 0)), Direction::East);
        assert_eq!(origin.direction_to(Point::new(5, 2)), Direction::East);
        assert_eq!(origin.direction_to(Point::new(5, 3)), Direction::NorthEast);
        assert_eq!(origin.direction_to(Point::new(-1, 7)), Direction::North);
        assert_eq!(origin.direction_to(Point::new(-4, -4)), Direction::SouthWest);
        assert_eq!(origin.direction_to(origin), Direction::Center);
    }

    #[test]
    fn ordinals_are_stable() {
        for ordinal in 0..=8 {
            let direction = Direction::from_ordinal(ordinal).expect("valid ordinal");
            assert_eq!(direction.ordinal(), ordinal);
        }
        assert_eq!(Direction::from_ordinal(9), None);
        assert_eq!(Direction::East.ordinal(), 2);
    }

    #[test]
    fn direction_set_tracks_members() {
        let mut set = DirectionSet::empty();
        assert!(set.is_empty());
        set.insert(Direction::East);
        set |= DirectionSet::only(Direction::NorthWest);
        assert!(set.contains(Direction::East));
        assert!(set.contains(Direction::NorthWest));
        assert!(!set.contains(Direction::North));
        assert_eq!(set.bits(), 0b1000_0100);

        let collected: DirectionSet = [Direction::East, Direction::NorthWest].into_iter().collect();
        assert_eq!(collected, set);
    }

    #[test]
    fn map_bounds_index_is_row_major() {
        let bounds = MapBounds::new(Point::new(-2, 10), 4, 3);
        assert!(bounds.contains(Point::new(-2, 10)));
        assert!(bounds.contains(Point::new(1, 12)));
        assert!(!bounds.contains(Point::new(2, 12)));
        assert!(!bounds.contains(Point::new(0, 9)));
        assert_eq!(bounds.index(Point::new(-1, 11)), Some(5));
        assert_eq!(bounds.index(Point::new(5, 5)), None);
        assert_eq!(bounds.area(), 12);
    }

    #[test]
    fn scouts_outsee_decoys() {
        assert!(UnitKind::Scout.sensor_radius_squared() > UnitKind::Decoy.sensor_radius_squared());
        assert!(UnitKind::Decoy.compute_limit() < UnitKind::Scout.compute_limit());
    }

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn point_round_trips_through_bincode() {
        assert_round_trip(&Point::new(-17, 42));
    }

    #[test]
    fn entity_id_round_trips_through_bincode() {
        assert_round_trip(&EntityId::new(4242));
    }
}
