//! TOML configuration for simulation runs.

use std::{fs, path::Path};

use anyhow::{ensure, Context, Result};
use serde::Deserialize;
use tilebot_system_exploration::{ExplorationConfig, MAX_SPAN_RADIUS};
use tilebot_system_navigation::NavConfig;

/// Complete configuration of a simulation run.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct RunConfig {
    /// Navigation tunables shared by every scout.
    pub(crate) navigation: NavigationSection,
    /// Coarse exploration grid tunables.
    pub(crate) exploration: ExplorationSection,
    /// Map generation and population.
    pub(crate) simulation: SimulationSection,
}

/// `[navigation]` table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct NavigationSection {
    pub(crate) failure_turns: u32,
    pub(crate) explore_retarget_turns: u32,
    pub(crate) safety_margin: u32,
    pub(crate) heading_reach: i32,
    pub(crate) adjacent_distance_squared: u32,
}

impl Default for NavigationSection {
    fn default() -> Self {
        let defaults = NavConfig::default();
        Self {
            failure_turns: defaults.failure_turns,
            explore_retarget_turns: defaults.explore_retarget_turns,
            safety_margin: defaults.safety_margin,
            heading_reach: defaults.heading_reach,
            adjacent_distance_squared: defaults.adjacent_distance_squared,
        }
    }
}

impl From<NavigationSection> for NavConfig {
    fn from(section: NavigationSection) -> Self {
        Self {
            failure_turns: section.failure_turns,
            explore_retarget_turns: section.explore_retarget_turns,
            safety_margin: section.safety_margin,
            heading_reach: section.heading_reach,
            adjacent_distance_squared: section.adjacent_distance_squared,
        }
    }
}

/// `[exploration]` table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct ExplorationSection {
    pub(crate) chunk_size: u32,
    pub(crate) ring_radius: u32,
    pub(crate) span_radius: u32,
}

impl Default for ExplorationSection {
    fn default() -> Self {
        let defaults = ExplorationConfig::default();
        Self {
            chunk_size: defaults.chunk_size,
            ring_radius: defaults.ring_radius,
            span_radius: defaults.span_radius,
        }
    }
}

impl From<ExplorationSection> for ExplorationConfig {
    fn from(section: ExplorationSection) -> Self {
        Self {
            chunk_size: section.chunk_size,
            ring_radius: section.ring_radius,
            span_radius: section.span_radius,
        }
    }
}

/// `[simulation]` table.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct SimulationSection {
    /// Seed for map generation.
    pub(crate) seed: u64,
    /// Rounds to simulate before stopping.
    pub(crate) rounds: u32,
    /// Map width in tiles.
    pub(crate) width: u32,
    /// Map height in tiles.
    pub(crate) height: u32,
    /// Scouts spawned next to the allied hub.
    pub(crate) scouts: u32,
    /// Neutral hubs scattered over the map.
    pub(crate) neutral_bases: u32,
    /// Stationary enemy enforcers scattered over the map.
    pub(crate) enemies: u32,
    /// Slowest terrain generated.
    pub(crate) min_passability: f64,
}

impl Default for SimulationSection {
    fn default() -> Self {
        Self {
            seed: 7,
            rounds: 200,
            width: 48,
            height: 48,
            scouts: 4,
            neutral_bases: 3,
            enemies: 2,
            min_passability: 0.3,
        }
    }
}

impl RunConfig {
    /// Reads the file at `path`, or falls back to defaults when no path is given.
    pub(crate) fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file at {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("invalid config file at {}", path.display()))
    }

    /// Parses TOML contents; missing tables and keys keep their defaults.
    pub(crate) fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("failed to parse config toml contents")
    }

    /// Rejects settings the simulation cannot run with.
    pub(crate) fn validate(&self) -> Result<()> {
        let simulation = &self.simulation;
        ensure!(
            simulation.width > 0 && simulation.height > 0,
            "map must be at least one tile wide and tall"
        );
        ensure!(
            simulation.width <= 1024 && simulation.height <= 1024,
            "map dimensions above 1024 tiles are not supported"
        );
        ensure!(
            simulation.min_passability > 0.0 && simulation.min_passability <= 1.0,
            "min_passability must lie in (0, 1], got {}",
            simulation.min_passability
        );
        let population = u64::from(simulation.scouts)
            + u64::from(simulation.neutral_bases)
            + u64::from(simulation.enemies)
            + 1;
        ensure!(
            population <= u64::from(simulation.width) * u64::from(simulation.height) / 2,
            "{population} entities do not fit on a {}x{} map",
            simulation.width,
            simulation.height
        );
        let exploration = &self.exploration;
        ensure!(
            exploration.chunk_size > 0,
            "exploration chunk_size must be positive"
        );
        ensure!(
            exploration.span_radius <= MAX_SPAN_RADIUS,
            "exploration span_radius must not exceed {MAX_SPAN_RADIUS}, got {}",
            exploration.span_radius
        );
        ensure!(
            exploration.ring_radius <= exploration.span_radius,
            "exploration ring_radius {} reaches past span_radius {}",
            exploration.ring_radius,
            exploration.span_radius
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_keeps_defaults() {
        let config = RunConfig::parse("").expect("empty config parses");

        assert_eq!(config, RunConfig::default());
        assert_eq!(NavConfig::from(config.navigation), NavConfig::default());
        assert_eq!(
            ExplorationConfig::from(config.exploration),
            ExplorationConfig::default()
        );
    }

    #[test]
    fn tables_override_individual_keys() {
        let config = RunConfig::parse(
            r#"
                [navigation]
                failure_turns = 6

                [simulation]
                seed = 99
                width = 20
            "#,
        )
        .expect("config parses");

        assert_eq!(config.navigation.failure_turns, 6);
        assert_eq!(config.navigation.explore_retarget_turns, 5);
        assert_eq!(config.simulation.seed, 99);
        assert_eq!(config.simulation.width, 20);
        assert_eq!(config.simulation.height, 48);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let error = RunConfig::parse("[navigation]\nfailure_turn = 3\n")
            .expect_err("typo must be rejected");

        assert!(format!("{error:#}").contains("failure_turn"));
    }

    #[test]
    fn validation_rejects_crowded_maps() {
        let mut config = RunConfig::default();
        config.simulation.width = 2;
        config.simulation.height = 2;

        assert!(config.validate().is_err());
    }

    #[test]
    fn validation_rejects_oversized_exploration_grid() {
        let mut config = RunConfig::parse(
            r#"
                [exploration]
                span_radius = 4294967295
            "#,
        )
        .expect("config parses");
        assert!(config.validate().is_err());

        config.exploration.span_radius = MAX_SPAN_RADIUS;
        assert!(config.validate().is_ok());

        config.exploration.ring_radius = MAX_SPAN_RADIUS + 1;
        let error = config.validate().expect_err("ring wider than span");
        assert!(error.to_string().contains("ring_radius"));
    }

    #[test]
    fn validation_rejects_impassable_terrain() {
        let mut config = RunConfig::default();
        config.simulation.min_passability = 0.0;

        assert!(config.validate().is_err());
        assert!(RunConfig::default().validate().is_ok());
    }
}
