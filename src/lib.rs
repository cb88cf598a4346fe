//! Daisyworld: a two-species cellular model of albedo-driven temperature regulation.

pub mod config;
pub mod daisy;
pub mod engine;
pub mod grid;
pub mod rng;
pub mod scenario;
pub mod snapshot;
pub mod systems;
pub mod web;
pub mod world;

pub use config::{ConfigLoader, SimulationConfig};
pub use daisy::{Daisy, DaisyColor, MAX_AGE};
pub use engine::{Engine, EngineBuilder, EngineError, EngineSettings, TickSummary};
pub use grid::Cell;
pub use scenario::Scenario;
pub use world::{GlobalStats, World};
