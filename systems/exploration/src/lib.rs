#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Coarse visitation tracking that drives frontier exploration.
//!
//! The map is partitioned into square coarse cells anchored at the agent's
//! spawn point. Cells are marked as the agent passes through them and the
//! tracker answers which nearby cell has not been seen yet. Map edges are
//! discovered lazily from sensing, after which cells beyond them count as
//! visited.

use fixedbitset::FixedBitSet;
use tilebot_core::{Direction, Point, Senses};
use tracing::debug;

const DEFAULT_CHUNK_SIZE: u32 = 8;
const DEFAULT_RING_RADIUS: u32 = 7;
const DEFAULT_SPAN_RADIUS: u32 = 8;

/// Largest span radius a tracker accepts; larger values are clamped.
pub const MAX_SPAN_RADIUS: u32 = 64;

const CARDINALS: [Direction; 4] = [
    Direction::North,
    Direction::East,
    Direction::South,
    Direction::West,
];

/// Tunables for the coarse exploration grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExplorationConfig {
    /// Side length of a coarse cell in tiles.
    pub chunk_size: u32,
    /// Largest coarse offset examined by a frontier search.
    pub ring_radius: u32,
    /// Number of coarse cells tracked on each side of the origin cell.
    pub span_radius: u32,
}

impl Default for ExplorationConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            ring_radius: DEFAULT_RING_RADIUS,
            span_radius: DEFAULT_SPAN_RADIUS,
        }
    }
}

/// Last on-map coordinate along each side, once observed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KnownEdges {
    /// Largest on-map `y`.
    pub north: Option<i32>,
    /// Largest on-map `x`.
    pub east: Option<i32>,
    /// Smallest on-map `y`.
    pub south: Option<i32>,
    /// Smallest on-map `x`.
    pub west: Option<i32>,
}

impl KnownEdges {
    fn get(&self, side: Direction) -> Option<i32> {
        match side {
            Direction::North => self.north,
            Direction::East => self.east,
            Direction::South => self.south,
            Direction::West => self.west,
            _ => None,
        }
    }

    fn record(&mut self, side: Direction, coordinate: i32) {
        let slot = match side {
            Direction::North => &mut self.north,
            Direction::East => &mut self.east,
            Direction::South => &mut self.south,
            Direction::West => &mut self.west,
            _ => return,
        };
        *slot = Some(coordinate);
    }

    fn excludes(&self, extent: CellExtent) -> bool {
        self.north.is_some_and(|edge| extent.min_y > i64::from(edge))
            || self.south.is_some_and(|edge| extent.max_y < i64::from(edge))
            || self.east.is_some_and(|edge| extent.min_x > i64::from(edge))
            || self.west.is_some_and(|edge| extent.max_x < i64::from(edge))
    }

    fn clamp(&self, x: i64, y: i64) -> (i64, i64) {
        let x = clamp_optional(x, self.west, self.east);
        let y = clamp_optional(y, self.south, self.north);
        (x, y)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Cell {
    x: i64,
    y: i64,
}

#[derive(Clone, Copy, Debug)]
struct CellExtent {
    min_x: i64,
    max_x: i64,
    min_y: i64,
    max_y: i64,
}

/// Per-agent record of visited coarse cells.
#[derive(Clone, Debug)]
pub struct NavHistory {
    origin: Point,
    config: ExplorationConfig,
    chunk: i64,
    span: i64,
    cells: FixedBitSet,
    ring: Vec<(i64, i64)>,
    edges: KnownEdges,
}

impl NavHistory {
    /// Creates a tracker anchored at `origin` with default tunables.
    #[must_use]
    pub fn new(origin: Point) -> Self {
        Self::with_config(origin, ExplorationConfig::default())
    }

    /// Creates a tracker anchored at `origin`.
    ///
    /// The span radius is capped at [`MAX_SPAN_RADIUS`] and the ring radius
    /// at the span radius, since cells beyond the span already count as
    /// visited.
    #[must_use]
    pub fn with_config(origin: Point, config: ExplorationConfig) -> Self {
        let span_radius = config.span_radius.min(MAX_SPAN_RADIUS);
        let config = ExplorationConfig {
            chunk_size: config.chunk_size.max(1),
            ring_radius: config.ring_radius.min(span_radius),
            span_radius,
        };
        let chunk = i64::from(config.chunk_size);
        let span = i64::from(config.span_radius);
        let side = 2 * config.span_radius as usize + 1;
        Self {
            origin,
            config,
            chunk,
            span,
            cells: FixedBitSet::with_capacity(side * side),
            ring: ring_offsets(i64::from(config.ring_radius)),
            edges: KnownEdges::default(),
        }
    }

    /// Point the coarse grid is anchored at.
    #[must_use]
    pub const fn origin(&self) -> Point {
        self.origin
    }

    /// Tunables the tracker was built with.
    #[must_use]
    pub const fn config(&self) -> ExplorationConfig {
        self.config
    }

    /// Map edges discovered so far.
    #[must_use]
    pub const fn known_edges(&self) -> KnownEdges {
        self.edges
    }

    /// Number of tracked cells marked visited.
    #[must_use]
    pub fn visited_count(&self) -> usize {
        self.cells.count_ones(..)
    }

    /// Marks the coarse cell containing `point`. Idempotent.
    pub fn mark_visited(&mut self, point: Point) {
        if let Some(slot) = self.slot(self.cell_of(point)) {
            self.cells.insert(slot);
        }
    }

    /// Reports whether the coarse cell containing `point` needs no visit.
    ///
    /// Cells outside the tracked span or wholly beyond a discovered map edge
    /// are reported as visited.
    #[must_use]
    pub fn visited(&self, point: Point) -> bool {
        self.cell_visited(self.cell_of(point))
    }

    /// Centre of the closest unvisited coarse cell around `from`.
    ///
    /// Candidates are scanned by increasing squared coarse distance and the
    /// search never leaves the configured ring radius. The returned point is
    /// clamped onto the known map.
    #[must_use]
    pub fn nearest_unexplored(&self, from: Point) -> Option<Point> {
        let base = self.cell_of(from);
        self.ring
            .iter()
            .map(|&(dx, dy)| Cell {
                x: base.x + dx,
                y: base.y + dy,
            })
            .find(|&cell| !self.cell_visited(cell))
            .map(|cell| self.cell_centre(cell))
    }

    /// Marks the host's cell and discovers any map edge within sensor range.
    pub fn observe<H>(&mut self, host: &H)
    where
        H: Senses + ?Sized,
    {
        let location = host.location();
        let range = sight_range(host.sensor_radius_squared());

        for side in CARDINALS {
            if self.edges.get(side).is_some() {
                continue;
            }
            let along = |steps: i32| location.translate(side.dx() * steps, side.dy() * steps);
            if host.on_the_map(along(range)) {
                continue;
            }

            let mut reach = 0;
            while reach < range && host.on_the_map(along(reach + 1)) {
                reach += 1;
            }
            let last = along(reach);
            let coordinate = if side.dx() == 0 { last.y() } else { last.x() };
            self.edges.record(side, coordinate);
            debug!(?side, coordinate, "discovered map edge");
        }

        self.mark_visited(location);
    }

    fn cell_of(&self, point: Point) -> Cell {
        let dx = i64::from(point.x()) - i64::from(self.origin.x());
        let dy = i64::from(point.y()) - i64::from(self.origin.y());
        Cell {
            x: dx.div_euclid(self.chunk),
            y: dy.div_euclid(self.chunk),
        }
    }

    fn slot(&self, cell: Cell) -> Option<usize> {
        if cell.x.abs() > self.span || cell.y.abs() > self.span {
            return None;
        }
        let side = 2 * self.span + 1;
        usize::try_from((cell.y + self.span) * side + (cell.x + self.span)).ok()
    }

    fn extent(&self, cell: Cell) -> CellExtent {
        let min_x = i64::from(self.origin.x()) + cell.x * self.chunk;
        let min_y = i64::from(self.origin.y()) + cell.y * self.chunk;
        CellExtent {
            min_x,
            max_x: min_x + self.chunk - 1,
            min_y,
            max_y: min_y + self.chunk - 1,
        }
    }

    fn cell_visited(&self, cell: Cell) -> bool {
        if self.edges.excludes(self.extent(cell)) {
            return true;
        }
        self.slot(cell)
            .map_or(true, |slot| self.cells.contains(slot))
    }

    fn cell_centre(&self, cell: Cell) -> Point {
        let extent = self.extent(cell);
        let half = self.chunk / 2;
        let (x, y) = self.edges.clamp(extent.min_x + half, extent.min_y + half);
        Point::new(saturate(x), saturate(y))
    }
}

fn ring_offsets(radius: i64) -> Vec<(i64, i64)> {
    let mut offsets: Vec<(i64, i64)> = (-radius..=radius)
        .flat_map(|dx| (-radius..=radius).map(move |dy| (dx, dy)))
        .filter(|&offset| offset != (0, 0))
        .collect();
    offsets.sort_by_key(|&(dx, dy)| (dx * dx + dy * dy, dx, dy));
    offsets
}

fn sight_range(radius_squared: u32) -> i32 {
    let target = u64::from(radius_squared);
    let mut range: u64 = 0;
    while (range + 1) * (range + 1) <= target {
        range += 1;
    }
    i32::try_from(range).unwrap_or(i32::MAX)
}

fn clamp_optional(value: i64, low: Option<i32>, high: Option<i32>) -> i64 {
    let value = low.map_or(value, |low| value.max(i64::from(low)));
    high.map_or(value, |high| value.min(i64::from(high)))
}

fn saturate(value: i64) -> i32 {
    i32::try_from(value).unwrap_or(if value < 0 { i32::MIN } else { i32::MAX })
}
