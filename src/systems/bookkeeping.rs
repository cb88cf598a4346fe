use anyhow::Result;
use tracing::warn;

use crate::{
    daisy::MAX_AGE,
    engine::{System, SystemContext},
    rng::DaisyRng,
    world::World,
};

/// Closes a tick: enforces the age bound and recomputes global statistics.
pub struct BookkeepingSystem;

impl BookkeepingSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for BookkeepingSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for BookkeepingSystem {
    fn name(&self) -> &str {
        "bookkeeping"
    }

    fn run(
        &mut self,
        ctx: &SystemContext,
        world: &mut World,
        _rng: &mut DaisyRng,
    ) -> Result<()> {
        let expired = world.daisies.retain(|daisy| daisy.age() < MAX_AGE);
        if expired > 0 {
            warn!(tick = ctx.tick, expired, "removed daisies past max age");
        }
        world.refresh_stats();
        Ok(())
    }
}
