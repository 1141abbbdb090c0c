use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;
use uuid::Uuid;

use crate::error::{RecapError, Result};

/// Per-run home for every intermediate artifact.
///
/// Each pipeline run owns exactly one workspace; nothing inside it is shared
/// with or visible to another run, and the whole directory is removed when
/// the workspace drops, on success and on failure alike. Only the final
/// recap video is written outside it.
pub struct RunWorkspace {
    dir: TempDir,
    run_id: Uuid,
}

impl RunWorkspace {
    pub fn create() -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("recapgen-")
            .tempdir()
            .map_err(|e| RecapError::Io(e))?;
        let run_id = Uuid::new_v4();

        debug!("Created run workspace {} at {}", run_id, dir.path().display());

        Ok(Self { dir, run_id })
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Destination for the synthesized narration track
    pub fn narration_path(&self, format: &str) -> PathBuf {
        self.dir.path().join(format!("narration-{}.{}", self.run_id, format))
    }

    /// Destination for the sanitized (blurred) copy of the source video
    pub fn blurred_video_path(&self) -> PathBuf {
        self.dir.path().join(format!("blurred-{}.mp4", self.run_id))
    }

    /// Staging path for the muxed output; it is renamed to the real
    /// destination only after encoding succeeds, so a failed run never
    /// leaves a partial recap behind.
    pub fn staged_output_path(&self) -> PathBuf {
        self.dir.path().join(format!("recap-{}.mp4", self.run_id))
    }
}
