use anyhow::Result;

use crate::{
    engine::{System, SystemContext},
    rng::DaisyRng,
    world::World,
};

/// Heating used when a surface absorbs no light at all.
const FALLBACK_HEATING: f64 = 80.0;

/// Share of incoming light a surface with `albedo` keeps.
pub fn absorbed_luminosity(albedo: f64, solar_luminosity: f64) -> f64 {
    (1.0 - albedo) * solar_luminosity
}

/// Temperature a patch is pulled toward for a given absorbed luminosity.
///
/// An absorbed luminosity of 1 heats to 80 degrees, 0.5 to roughly 30.
pub fn local_heating(absorbed: f64) -> f64 {
    if absorbed > 0.0 {
        72.0 * absorbed.ln() + 80.0
    } else {
        FALLBACK_HEATING
    }
}

/// Fixed point of the relaxation for a surface uniformly covered by `albedo`.
pub fn equilibrium_temperature(albedo: f64, solar_luminosity: f64) -> f64 {
    local_heating(absorbed_luminosity(albedo, solar_luminosity))
}

/// Move every patch halfway from its previous temperature toward its local
/// heating. All patches read the same pre-update field.
pub fn apply_local_heating(world: &mut World) {
    let luminosity = world.solar_luminosity();
    let next: Vec<f64> = world
        .grid
        .temperatures()
        .iter()
        .enumerate()
        .map(|(index, &previous)| {
            let heating = local_heating(absorbed_luminosity(world.surface_albedo(index), luminosity));
            (previous + heating) / 2.0
        })
        .collect();
    world.grid.commit_temperatures(next);
}

pub struct TemperatureSystem;

impl TemperatureSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TemperatureSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for TemperatureSystem {
    fn name(&self) -> &str {
        "temperature"
    }

    fn run(
        &mut self,
        _ctx: &SystemContext,
        world: &mut World,
        _rng: &mut DaisyRng,
    ) -> Result<()> {
        apply_local_heating(world);
        Ok(())
    }
}
