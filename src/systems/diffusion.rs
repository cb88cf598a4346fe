use anyhow::Result;

use crate::{
    engine::{System, SystemContext},
    grid::DIFFUSION_RATE,
    rng::DaisyRng,
    world::World,
};

/// Spreads heat between neighbouring patches once per tick.
pub struct DiffusionSystem {
    rate: f64,
}

impl DiffusionSystem {
    pub fn new() -> Self {
        Self {
            rate: DIFFUSION_RATE,
        }
    }
}

impl Default for DiffusionSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for DiffusionSystem {
    fn name(&self) -> &str {
        "diffusion"
    }

    fn run(
        &mut self,
        _ctx: &SystemContext,
        world: &mut World,
        _rng: &mut DaisyRng,
    ) -> Result<()> {
        world.grid.diffuse(self.rate);
        Ok(())
    }
}
