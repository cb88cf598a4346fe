//! Solar luminosity schedules.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

const RAMP_UP_TICKS: (u64, u64) = (200, 400);
const RAMP_UP_STEP: f64 = 0.005;
const RAMP_DOWN_TICKS: (u64, u64) = (600, 850);
const RAMP_DOWN_STEP: f64 = 0.0025;

/// Named luminosity schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scenario {
    #[serde(alias = "low solar luminosity")]
    Low,
    #[serde(alias = "our solar luminosity")]
    Nominal,
    #[serde(alias = "high solar luminosity")]
    High,
    #[serde(alias = "ramp-up-ramp-down")]
    Ramp,
}

impl Scenario {
    pub fn as_str(self) -> &'static str {
        match self {
            Scenario::Low => "low",
            Scenario::Nominal => "nominal",
            Scenario::High => "high",
            Scenario::Ramp => "ramp",
        }
    }

    /// Luminosity reasserted every tick, or `None` for the time-varying ramp.
    pub fn fixed_luminosity(self) -> Option<f64> {
        match self {
            Scenario::Low => Some(0.6),
            Scenario::Nominal => Some(1.0),
            Scenario::High => Some(1.4),
            Scenario::Ramp => None,
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scenario {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "low" | "low solar luminosity" => Ok(Scenario::Low),
            "nominal" | "our solar luminosity" => Ok(Scenario::Nominal),
            "high" | "high solar luminosity" => Ok(Scenario::High),
            "ramp" | "ramp-up-ramp-down" => Ok(Scenario::Ramp),
            other => Err(ConfigError::UnknownScenario(other.to_string())),
        }
    }
}

/// Drives solar luminosity from a [`Scenario`].
///
/// The controller runs after a tick's temperature and reproduction work, so
/// the value it returns for tick `N` is what tick `N + 1` heats with.
#[derive(Debug, Clone)]
pub struct ScenarioController {
    scenario: Scenario,
    initial_luminosity: f64,
}

impl ScenarioController {
    pub fn new(scenario: Scenario, initial_luminosity: f64) -> Self {
        Self {
            scenario,
            initial_luminosity,
        }
    }

    pub fn scenario(&self) -> Scenario {
        self.scenario
    }

    /// Luminosity in effect right after setup.
    pub fn initial_luminosity(&self) -> f64 {
        self.scenario
            .fixed_luminosity()
            .unwrap_or(self.initial_luminosity)
    }

    /// Luminosity after the tick counter has advanced to `tick`.
    pub fn next_luminosity(&self, tick: u64, current: f64) -> f64 {
        if let Some(fixed) = self.scenario.fixed_luminosity() {
            return fixed;
        }
        if tick > RAMP_UP_TICKS.0 && tick <= RAMP_UP_TICKS.1 {
            round4(current + RAMP_UP_STEP)
        } else if tick > RAMP_DOWN_TICKS.0 && tick <= RAMP_DOWN_TICKS.1 {
            round4(current - RAMP_DOWN_STEP)
        } else {
            current
        }
    }
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_ramp(ticks: u64) -> f64 {
        let controller = ScenarioController::new(Scenario::Ramp, 0.8);
        (1..=ticks).fold(controller.initial_luminosity(), |lum, tick| {
            controller.next_luminosity(tick, lum)
        })
    }

    #[test]
    fn constant_scenarios_reset_every_tick() {
        let controller = ScenarioController::new(Scenario::High, 0.8);
        assert_eq!(controller.initial_luminosity(), 1.4);
        assert_eq!(controller.next_luminosity(17, 0.3), 1.4);
        let low = ScenarioController::new(Scenario::Low, 0.8);
        assert_eq!(low.next_luminosity(1, 1.0), 0.6);
    }

    #[test]
    fn ramp_holds_then_rises_then_falls() {
        assert_eq!(run_ramp(200), 0.8);
        assert_eq!(run_ramp(201), 0.805);
        assert_eq!(run_ramp(400), 1.8);
        assert_eq!(run_ramp(401), 1.8);
        assert_eq!(run_ramp(600), 1.8);
        assert_eq!(run_ramp(601), 1.7975);
        assert_eq!(run_ramp(850), 1.175);
        assert_eq!(run_ramp(1000), 1.175);
    }

    #[test]
    fn parses_short_and_long_names() {
        assert_eq!("ramp".parse::<Scenario>().unwrap(), Scenario::Ramp);
        assert_eq!(
            "our solar luminosity".parse::<Scenario>().unwrap(),
            Scenario::Nominal
        );
        assert!(matches!(
            "solstice".parse::<Scenario>(),
            Err(ConfigError::UnknownScenario(name)) if name == "solstice"
        ));
    }
}
