//! Bellman-Ford style cost relaxation over a local window.

use tilebot_core::{Direction, DirectionSet, Point, Senses};

use crate::window::Window;

const BLOCKED: f64 = f64::INFINITY;

/// Order in which candidate steps are compared. Earlier entries win ties.
const PREFERENCE: [Direction; 8] = [
    Direction::East,
    Direction::NorthEast,
    Direction::North,
    Direction::NorthWest,
    Direction::West,
    Direction::SouthWest,
    Direction::South,
    Direction::SouthEast,
];

/// Reusable cost grids for the relaxation kernel.
///
/// Buffers grow to the largest window requested and are reused afterwards.
#[derive(Debug, Default)]
pub(crate) struct RelaxationGrid {
    reach: i32,
    side: usize,
    cost: Vec<f64>,
    step_cost: Vec<f64>,
}

impl RelaxationGrid {
    /// Runs the kernel and returns the neighbour that beats standing still.
    pub(crate) fn best_step<H>(
        &mut self,
        host: &H,
        window: Window,
        target: Point,
        danger: DirectionSet,
    ) -> Option<Direction>
    where
        H: Senses + ?Sized,
    {
        self.populate(host, window, target);
        for _ in 0..window.sweeps() {
            self.sweep();
        }
        self.choose(danger)
    }

    fn populate<H>(&mut self, host: &H, window: Window, target: Point)
    where
        H: Senses + ?Sized,
    {
        self.reach = window.reach();
        self.side = (2 * self.reach + 1) as usize;
        let tiles = self.side * self.side;
        self.cost.clear();
        self.cost.resize(tiles, BLOCKED);
        self.step_cost.clear();
        self.step_cost.resize(tiles, BLOCKED);

        let radius_squared = window.radius_squared() as i32;
        let origin = host.location();
        for dy in -self.reach..=self.reach {
            for dx in -self.reach..=self.reach {
                if dx * dx + dy * dy > radius_squared {
                    continue;
                }
                let index = self.index(dx, dy);
                let tile = origin.translate(dx, dy);
                let heuristic = f64::from(tile.distance_squared_to(target));

                if dx == 0 && dy == 0 {
                    self.cost[index] = heuristic;
                    self.step_cost[index] = host.sense_passability(tile).map_or(1.0, traversal_cost);
                    continue;
                }
                if !host.on_the_map(tile) || host.is_location_occupied(tile) {
                    continue;
                }
                if let Some(passability) = host.sense_passability(tile) {
                    self.cost[index] = heuristic;
                    self.step_cost[index] = traversal_cost(passability);
                }
            }
        }
    }

    /// One in-place row-major pass: `cost = min(cost, min neighbour + step cost)`.
    fn sweep(&mut self) {
        for dy in -self.reach..=self.reach {
            for dx in -self.reach..=self.reach {
                let index = self.index(dx, dy);
                let step = self.step_cost[index];
                if step.is_infinite() {
                    continue;
                }
                let mut best = self.cost[index];
                for direction in Direction::MOVES {
                    if let Some(neighbour) = self.checked_index(dx + direction.dx(), dy + direction.dy())
                    {
                        best = best.min(self.cost[neighbour] + step);
                    }
                }
                self.cost[index] = best;
            }
        }
    }

    fn choose(&self, danger: DirectionSet) -> Option<Direction> {
        let mut best = self.cost[self.index(0, 0)];
        let mut choice = None;
        for direction in PREFERENCE {
            if danger.contains(direction) {
                continue;
            }
            let cost = self.cost[self.index(direction.dx(), direction.dy())];
            if cost < best {
                best = cost;
                choice = Some(direction);
            }
        }
        choice
    }

    fn index(&self, dx: i32, dy: i32) -> usize {
        (dy + self.reach) as usize * self.side + (dx + self.reach) as usize
    }

    fn checked_index(&self, dx: i32, dy: i32) -> Option<usize> {
        (dx.abs() <= self.reach && dy.abs() <= self.reach).then(|| self.index(dx, dy))
    }

    #[cfg(test)]
    fn cost_at(&self, dx: i32, dy: i32) -> f64 {
        self.cost[self.index(dx, dy)]
    }
}

fn traversal_cost(passability: f64) -> f64 {
    if passability > 0.0 {
        1.0 / passability
    } else {
        BLOCKED
    }
}
