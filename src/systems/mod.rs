mod bookkeeping;
mod diffusion;
mod reproduction;
mod temperature;

pub use bookkeeping::BookkeepingSystem;
pub use diffusion::DiffusionSystem;
pub use reproduction::{reproduction_probability, ReproductionSystem};
pub use temperature::{
    absorbed_luminosity, apply_local_heating, equilibrium_temperature, local_heating,
    TemperatureSystem,
};
