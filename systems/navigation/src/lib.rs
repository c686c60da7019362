#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Budget-aware local navigation for a single agent.
//!
//! [`Nav`] holds the agent's movement goal and, once per turn, turns it into
//! one step. The step comes from a cost relaxation over a small window around
//! the agent; the window grows with the compute budget left this turn.

mod relaxation;
mod window;

use tilebot_core::{ComputeClock, Direction, DirectionSet, EntityId, Point, Senses};
use tilebot_system_exploration::{ExplorationConfig, NavHistory};
use tracing::{debug, trace};

use relaxation::RelaxationGrid;

pub use window::{available_budget, Window};

const DEFAULT_FAILURE_TURNS: u32 = 10;
const DEFAULT_EXPLORE_RETARGET_TURNS: u32 = 5;
const DEFAULT_SAFETY_MARGIN: u32 = 1_000;
const DEFAULT_HEADING_REACH: i32 = 100;
const DEFAULT_ADJACENT_DISTANCE_SQUARED: u32 = 4;

/// Tunables that govern goal abandonment and budgeting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NavConfig {
    /// Turns without getting closer before a goal is abandoned.
    pub failure_turns: u32,
    /// Turns without getting closer before an exploration target is dropped.
    pub explore_retarget_turns: u32,
    /// Compute units kept back when sizing the relaxation window.
    pub safety_margin: u32,
    /// Distance in tiles per unit of heading used to anchor directional goals.
    pub heading_reach: i32,
    /// Squared distance below which a blocked target is given up on.
    pub adjacent_distance_squared: u32,
}

impl Default for NavConfig {
    fn default() -> Self {
        Self {
            failure_turns: DEFAULT_FAILURE_TURNS,
            explore_retarget_turns: DEFAULT_EXPLORE_RETARGET_TURNS,
            safety_margin: DEFAULT_SAFETY_MARGIN,
            heading_reach: DEFAULT_HEADING_REACH,
            adjacent_distance_squared: DEFAULT_ADJACENT_DISTANCE_SQUARED,
        }
    }
}

/// Movement intent of an agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NavGoal {
    /// Stand still.
    Nothing,
    /// Visit the nearest unvisited coarse cell.
    Explore {
        /// Point currently driven toward, picked lazily.
        target: Option<Point>,
    },
    /// Drive toward a fixed point.
    GoTo {
        /// Destination.
        target: Point,
    },
    /// Keep heading along `(dx, dy)`.
    GoInDir {
        /// Horizontal heading.
        dx: i32,
        /// Vertical heading.
        dy: i32,
        /// Far point along the heading, anchored on the first tick.
        target: Option<Point>,
    },
    /// Track another entity while it stays sensed.
    Follow {
        /// Entity being followed.
        entity: EntityId,
        /// Where the entity was last sensed.
        last_seen: Option<Point>,
    },
}

/// Outcome of a navigation tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NavStep {
    /// Step in the given direction.
    Move(Direction),
    /// Nothing beats standing still this turn, or the agent is cooling down.
    NoMove,
    /// There is no goal, or the goal was just reached or abandoned.
    GoalComplete,
}

/// Closest approach to the current target and how long ago it happened.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Progress {
    min_distance: Option<u32>,
    turns_since_improvement: u32,
}

impl Progress {
    /// Smallest squared distance to the target seen since the last reset.
    #[must_use]
    pub const fn min_distance(&self) -> Option<u32> {
        self.min_distance
    }

    /// Consecutive ticks that did not beat [`Progress::min_distance`].
    #[must_use]
    pub const fn turns_since_improvement(&self) -> u32 {
        self.turns_since_improvement
    }

    fn observe(&mut self, distance: u32) {
        match self.min_distance {
            Some(best) if distance >= best => {
                self.turns_since_improvement = self.turns_since_improvement.saturating_add(1);
            }
            _ => {
                self.min_distance = Some(distance);
                self.turns_since_improvement = 0;
            }
        }
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Per-agent navigation engine.
#[derive(Debug)]
pub struct Nav {
    config: NavConfig,
    goal: NavGoal,
    progress: Progress,
    history: NavHistory,
    grid: RelaxationGrid,
    last_window: Option<Window>,
}

impl Nav {
    /// Creates an idle engine for an agent that spawned at `origin`.
    #[must_use]
    pub fn new(origin: Point) -> Self {
        Self::with_config(origin, NavConfig::default(), ExplorationConfig::default())
    }

    /// Creates an idle engine with explicit tunables.
    #[must_use]
    pub fn with_config(origin: Point, config: NavConfig, exploration: ExplorationConfig) -> Self {
        Self {
            config,
            goal: NavGoal::Nothing,
            progress: Progress::default(),
            history: NavHistory::with_config(origin, exploration),
            grid: RelaxationGrid::default(),
            last_window: None,
        }
    }

    /// Tunables in effect.
    #[must_use]
    pub const fn config(&self) -> NavConfig {
        self.config
    }

    /// Current goal.
    #[must_use]
    pub const fn goal(&self) -> NavGoal {
        self.goal
    }

    /// Progress toward the current goal.
    #[must_use]
    pub const fn progress(&self) -> Progress {
        self.progress
    }

    /// Window used by the most recent relaxation, if any ran.
    #[must_use]
    pub const fn last_window(&self) -> Option<Window> {
        self.last_window
    }

    /// Visitation record backing exploration.
    #[must_use]
    pub const fn history(&self) -> &NavHistory {
        &self.history
    }

    /// Mutable access to the visitation record.
    pub fn history_mut(&mut self) -> &mut NavHistory {
        &mut self.history
    }

    /// Explores the nearest unvisited coarse cells.
    pub fn set_explore(&mut self) {
        self.replace_goal(NavGoal::Explore { target: None });
    }

    /// Drives toward `target`, which may lie off the map.
    pub fn set_go_to(&mut self, target: Point) {
        self.replace_goal(NavGoal::GoTo { target });
    }

    /// Keeps heading along `(dx, dy)`.
    pub fn set_go_in_dir(&mut self, dx: i32, dy: i32) {
        self.replace_goal(NavGoal::GoInDir {
            dx,
            dy,
            target: None,
        });
    }

    /// Follows `entity` while it remains sensed.
    pub fn set_follow(&mut self, entity: EntityId) {
        self.replace_goal(NavGoal::Follow {
            entity,
            last_seen: None,
        });
    }

    /// Advances the goal by one turn and proposes a step.
    ///
    /// Ticks while the host is cooling down return [`NavStep::NoMove`] and
    /// leave progress untouched. A goal that stops getting closer for
    /// [`NavConfig::failure_turns`] ticks, is reached, or sits on an adjacent
    /// tile the agent cannot enter is dropped with [`NavStep::GoalComplete`].
    pub fn tick<H>(&mut self, host: &H, danger: DirectionSet) -> NavStep
    where
        H: Senses + ComputeClock + ?Sized,
    {
        self.history.observe(host);

        if self.goal == NavGoal::Nothing {
            return NavStep::GoalComplete;
        }
        if !host.is_ready() {
            return NavStep::NoMove;
        }

        let Some(target) = self.resolve_target(host) else {
            self.abandon("target unavailable");
            return NavStep::GoalComplete;
        };

        let location = host.location();
        let distance = location.distance_squared_to(target);
        self.progress.observe(distance);

        let stalled = self.progress.turns_since_improvement >= self.config.failure_turns;
        let arrived = location == target;
        let blocked = distance < self.config.adjacent_distance_squared
            && !host.can_move(location.direction_to(target));
        if stalled || arrived || blocked {
            if let NavGoal::Explore { target: slot } = &mut self.goal {
                debug!(point = ?target, stalled, arrived, blocked, "dropping exploration target");
                self.history.mark_visited(target);
                *slot = None;
                return NavStep::NoMove;
            }
            let reason = if arrived {
                "arrived"
            } else if blocked {
                "target blocked"
            } else {
                "no progress"
            };
            self.abandon(reason);
            return NavStep::GoalComplete;
        }

        let budget = available_budget(host, self.config.safety_margin);
        let window = Window::select(host.sensor_radius_squared(), budget);
        trace!(?window, budget, point = ?target, "relaxing toward target");
        self.last_window = Some(window);

        match self.grid.best_step(host, window, target, danger) {
            Some(direction) => NavStep::Move(direction),
            None => NavStep::NoMove,
        }
    }

    fn replace_goal(&mut self, goal: NavGoal) {
        self.goal = goal;
        self.progress.reset();
    }

    fn abandon(&mut self, reason: &'static str) {
        debug!(goal = ?self.goal, reason, "abandoning navigation goal");
        self.goal = NavGoal::Nothing;
        self.progress.reset();
    }

    fn resolve_target<H>(&mut self, host: &H) -> Option<Point>
    where
        H: Senses + ?Sized,
    {
        let reach = self.config.heading_reach;
        match &mut self.goal {
            NavGoal::Nothing => None,
            NavGoal::GoTo { target } => Some(*target),
            NavGoal::GoInDir { dx, dy, target } => {
                let anchor = *target.get_or_insert_with(|| {
                    host.location()
                        .translate(reach.saturating_mul(*dx), reach.saturating_mul(*dy))
                });
                Some(anchor)
            }
            NavGoal::Follow { entity, last_seen } => {
                let location = host.sense_robot(*entity)?.location;
                *last_seen = Some(location);
                Some(location)
            }
            NavGoal::Explore { target } => {
                if let Some(current) = *target {
                    if self.history.visited(current)
                        || self.progress.turns_since_improvement >= self.config.explore_retarget_turns
                    {
                        self.history.mark_visited(current);
                        *target = None;
                    }
                }
                if target.is_none() {
                    *target = self.history.nearest_unexplored(host.location());
                    self.progress.reset();
                    debug!(point = ?*target, "picked exploration target");
                }
                *target
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_counts_ticks_without_improvement() {
        let mut progress = Progress::default();

        progress.observe(25);
        progress.observe(25);
        progress.observe(30);
        assert_eq!(progress.min_distance(), Some(25));
        assert_eq!(progress.turns_since_improvement(), 2);

        progress.observe(16);
        assert_eq!(progress.min_distance(), Some(16));
        assert_eq!(progress.turns_since_improvement(), 0);
    }

    #[test]
    fn setting_a_goal_resets_progress() {
        let mut nav = Nav::new(Point::new(0, 0));
        nav.progress.observe(9);
        nav.progress.observe(9);

        nav.set_go_to(Point::new(4, 4));

        assert_eq!(nav.progress(), Progress::default());
        assert_eq!(
            nav.goal(),
            NavGoal::GoTo {
                target: Point::new(4, 4)
            }
        );
    }

    #[test]
    fn default_config_matches_documented_values() {
        let config = NavConfig::default();

        assert_eq!(config.failure_turns, 10);
        assert_eq!(config.explore_retarget_turns, 5);
        assert_eq!(config.safety_margin, 1_000);
        assert_eq!(config.heading_reach, 100);
        assert_eq!(config.adjacent_distance_squared, 4);
    }
}
