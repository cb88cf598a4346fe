use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::scenario::Scenario;

fn default_grid_size() -> u32 {
    29
}

fn default_start_percent() -> f64 {
    20.0
}

fn default_albedo_of_blacks() -> f64 {
    0.25
}

fn default_albedo_of_whites() -> f64 {
    0.75
}

fn default_albedo_of_bare_surface() -> f64 {
    0.4
}

fn default_scenario() -> Scenario {
    Scenario::Ramp
}

fn default_initial_solar_luminosity() -> f64 {
    0.8
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{field} must lie in [0, 100], got {value}")]
    PercentOutOfRange { field: &'static str, value: f64 },
    #[error("start percentages sum to {0}, which exceeds 100")]
    PercentSumExceeded(f64),
    #[error("{field} must lie in [0, 1], got {value}")]
    AlbedoOutOfRange { field: &'static str, value: f64 },
    #[error("initial solar luminosity must be positive and finite, got {0}")]
    InvalidLuminosity(f64),
    #[error("grid must be at least 3x3, got {width}x{height}")]
    GridTooSmall { width: u32, height: u32 },
    #[error("unknown scenario '{0}' (expected low, nominal, high or ramp)")]
    UnknownScenario(String),
}

/// Immutable run configuration handed to `Engine::setup`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub name: String,
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub ticks: Option<u64>,
    #[serde(default)]
    pub grid: GridConfig,
    #[serde(default = "default_start_percent")]
    pub start_percent_blacks: f64,
    #[serde(default = "default_start_percent")]
    pub start_percent_whites: f64,
    #[serde(default = "default_albedo_of_blacks")]
    pub albedo_of_blacks: f64,
    #[serde(default = "default_albedo_of_whites")]
    pub albedo_of_whites: f64,
    #[serde(default = "default_albedo_of_bare_surface")]
    pub albedo_of_bare_surface: f64,
    #[serde(default = "default_scenario")]
    pub scenario: Scenario,
    #[serde(default = "default_initial_solar_luminosity")]
    pub initial_solar_luminosity: f64,
    #[serde(default)]
    pub snapshot_interval_ticks: u64,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GridConfig {
    #[serde(default = "default_grid_size")]
    pub width: u32,
    #[serde(default = "default_grid_size")]
    pub height: u32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            width: default_grid_size(),
            height: default_grid_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Albedo lookup for the three surface kinds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Albedos {
    pub blacks: f64,
    pub whites: f64,
    pub bare_surface: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            name: "daisyworld".to_string(),
            seed: 0,
            ticks: None,
            grid: GridConfig::default(),
            start_percent_blacks: default_start_percent(),
            start_percent_whites: default_start_percent(),
            albedo_of_blacks: default_albedo_of_blacks(),
            albedo_of_whites: default_albedo_of_whites(),
            albedo_of_bare_surface: default_albedo_of_bare_surface(),
            scenario: default_scenario(),
            initial_solar_luminosity: default_initial_solar_luminosity(),
            snapshot_interval_ticks: 0,
            logging: LoggingConfig::default(),
        }
    }
}

impl SimulationConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let config: SimulationConfig =
            serde_yaml::from_str(text).context("Failed to parse simulation config")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that would break the model's invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grid.width < 3 || self.grid.height < 3 {
            return Err(ConfigError::GridTooSmall {
                width: self.grid.width,
                height: self.grid.height,
            });
        }

        for (field, value) in [
            ("start_percent_blacks", self.start_percent_blacks),
            ("start_percent_whites", self.start_percent_whites),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(ConfigError::PercentOutOfRange { field, value });
            }
        }
        let total = self.start_percent_blacks + self.start_percent_whites;
        if total > 100.0 {
            return Err(ConfigError::PercentSumExceeded(total));
        }

        for (field, value) in [
            ("albedo_of_blacks", self.albedo_of_blacks),
            ("albedo_of_whites", self.albedo_of_whites),
            ("albedo_of_bare_surface", self.albedo_of_bare_surface),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::AlbedoOutOfRange { field, value });
            }
        }

        if !(self.initial_solar_luminosity.is_finite() && self.initial_solar_luminosity > 0.0) {
            return Err(ConfigError::InvalidLuminosity(self.initial_solar_luminosity));
        }

        Ok(())
    }

    pub fn albedos(&self) -> Albedos {
        Albedos {
            blacks: self.albedo_of_blacks,
            whites: self.albedo_of_whites,
            bare_surface: self.albedo_of_bare_surface,
        }
    }

    pub fn ticks(&self, override_ticks: Option<u64>) -> u64 {
        override_ticks.or(self.ticks).unwrap_or(1_000)
    }
}

pub struct ConfigLoader {
    base_dir: PathBuf,
}

impl ConfigLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<SimulationConfig> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: SimulationConfig = serde_yaml::from_str(&data)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config {}", path.display()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = SimulationConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.grid.width, 29);
        assert_eq!(config.scenario, Scenario::Ramp);
    }

    #[test]
    fn yaml_fills_in_defaults() {
        let config = SimulationConfig::from_yaml_str(
            "name: sparse\nseed: 9\nscenario: high\ngrid:\n  width: 12\n",
        )
        .unwrap();
        assert_eq!(config.seed, 9);
        assert_eq!(config.scenario, Scenario::High);
        assert_eq!(config.grid.width, 12);
        assert_eq!(config.grid.height, 29);
        assert_eq!(config.albedo_of_bare_surface, 0.4);
    }

    #[test]
    fn yaml_accepts_long_scenario_names() {
        let config =
            SimulationConfig::from_yaml_str("name: legacy\nscenario: ramp-up-ramp-down\n").unwrap();
        assert_eq!(config.scenario, Scenario::Ramp);
    }

    #[test]
    fn yaml_rejects_unknown_scenario() {
        assert!(SimulationConfig::from_yaml_str("name: x\nscenario: eclipse\n").is_err());
    }

    #[test]
    fn rejects_negative_percentage() {
        let config = SimulationConfig {
            start_percent_whites: -1.0,
            ..SimulationConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::PercentOutOfRange {
                field: "start_percent_whites",
                value: -1.0
            })
        );
    }

    #[test]
    fn rejects_overfull_seeding() {
        let config = SimulationConfig {
            start_percent_blacks: 60.0,
            start_percent_whites: 50.0,
            ..SimulationConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::PercentSumExceeded(110.0)));
    }

    #[test]
    fn rejects_albedo_outside_unit_interval() {
        let config = SimulationConfig {
            albedo_of_bare_surface: 1.2,
            ..SimulationConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::AlbedoOutOfRange {
                field: "albedo_of_bare_surface",
                ..
            })
        ));
    }

    #[test]
    fn rejects_non_positive_luminosity_and_tiny_grids() {
        let dark = SimulationConfig {
            initial_solar_luminosity: 0.0,
            ..SimulationConfig::default()
        };
        assert_eq!(dark.validate(), Err(ConfigError::InvalidLuminosity(0.0)));

        let tiny = SimulationConfig {
            grid: GridConfig {
                width: 2,
                height: 10,
            },
            ..SimulationConfig::default()
        };
        assert!(matches!(
            tiny.validate(),
            Err(ConfigError::GridTooSmall { .. })
        ));
    }
}
