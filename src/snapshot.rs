use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::world::{World, WorldSnapshot};

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot encoding error: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct SnapshotFile<'a> {
    written_at: DateTime<Utc>,
    #[serde(flatten)]
    world: &'a WorldSnapshot,
}

/// Writes a JSON snapshot of the world every `interval` ticks.
pub struct SnapshotWriter {
    dir: PathBuf,
    interval: u64,
}

impl SnapshotWriter {
    pub fn new(dir: impl AsRef<Path>, interval: u64) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            interval,
        }
    }

    pub fn set_interval(&mut self, interval: u64) {
        self.interval = interval;
    }

    pub fn maybe_write(
        &self,
        world: &World,
        name: &str,
    ) -> Result<Option<PathBuf>, SnapshotError> {
        if self.interval == 0 || world.tick() % self.interval != 0 {
            return Ok(None);
        }

        let dir = self.dir.join(name);
        fs::create_dir_all(&dir)?;
        let path = dir.join(format!("tick_{:06}.json", world.tick()));
        let snapshot = world.snapshot(name);
        let file = SnapshotFile {
            written_at: Utc::now(),
            world: &snapshot,
        };
        fs::write(&path, serde_json::to_string_pretty(&file)?)?;
        debug!(path = %path.display(), "snapshot written");
        Ok(Some(path))
    }
}
