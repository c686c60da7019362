//! Relaxation windows and the budget policy that picks between them.

use tilebot_core::ComputeClock;

/// Local window over which the relaxation kernel runs.
///
/// Windows are discs of tiles with `dx² + dy² <= radius_squared` around the
/// agent, ordered from cheapest to most expensive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Window {
    /// 25 tiles, two sweeps. Always affordable.
    Radius8,
    /// 69 tiles, three sweeps.
    Radius20,
    /// 81 tiles, four sweeps.
    Radius25,
    /// 97 tiles, four sweeps.
    Radius30,
}

impl Window {
    /// Every window from cheapest to most expensive.
    pub const ALL: [Window; 4] = [
        Window::Radius8,
        Window::Radius20,
        Window::Radius25,
        Window::Radius30,
    ];

    /// Squared radius of the disc.
    #[must_use]
    pub const fn radius_squared(self) -> u32 {
        match self {
            Window::Radius8 => 8,
            Window::Radius20 => 20,
            Window::Radius25 => 25,
            Window::Radius30 => 30,
        }
    }

    /// Largest axis offset inside the disc.
    #[must_use]
    pub const fn reach(self) -> i32 {
        match self {
            Window::Radius8 => 2,
            Window::Radius20 => 4,
            Window::Radius25 | Window::Radius30 => 5,
        }
    }

    /// Relaxation sweeps needed for costs to cross the window.
    #[must_use]
    pub const fn sweeps(self) -> usize {
        match self {
            Window::Radius8 => 2,
            Window::Radius20 => 3,
            Window::Radius25 | Window::Radius30 => 4,
        }
    }

    /// Compute units a full run over the window may consume.
    #[must_use]
    pub const fn cost_ceiling(self) -> i64 {
        match self {
            Window::Radius8 => 2_250,
            Window::Radius20 => 7_600,
            Window::Radius25 => 10_500,
            Window::Radius30 => 12_600,
        }
    }

    /// Picks the largest window the sensor can cover and the budget can pay for.
    ///
    /// [`Window::Radius8`] has no precondition and is the fallback.
    #[must_use]
    pub fn select(sensor_radius_squared: u32, budget: i64) -> Self {
        Self::ALL
            .into_iter()
            .rev()
            .find(|window| {
                sensor_radius_squared >= window.radius_squared() && budget >= window.cost_ceiling()
            })
            .unwrap_or(Window::Radius8)
    }
}

/// Compute units the agent can spend on navigation this turn.
///
/// Whole cooldown turns still queued convert into extra allowance at the
/// agent's per-turn limit; `safety_margin` is held back for the caller.
pub fn available_budget<H>(host: &H, safety_margin: u32) -> i64
where
    H: ComputeClock + ?Sized,
{
    let queued_turns = host.cooldown_turns().floor().max(0.0) as i64;
    i64::from(host.compute_used()) + queued_turns * i64::from(host.compute_limit())
        - i64::from(safety_margin)
}
