//! Idempotent on-disk transcode cache.
//!
//! Sources are remuxed once into seek-friendly MPEG-TS intermediates under a
//! fixed `ts/` subdirectory; a file that already exists there is trusted and
//! returned without running the tool, which is what makes repeated runs
//! cheap. The check is not safe under concurrent runs against the same
//! working directory — callers serialize.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::TranscodeError;
use crate::media::runner::ToolRunner;

pub const CACHE_SUBDIR: &str = "ts";
const CACHE_EXT: &str = "ts";

#[derive(Clone)]
pub struct TranscodeCache {
    cache_dir: PathBuf,
    runner: Arc<dyn ToolRunner>,
}

impl TranscodeCache {
    /// Create the cache rooted at `<workdir>/ts/`, creating the directory if
    /// needed.
    pub fn new(workdir: &Path, runner: Arc<dyn ToolRunner>) -> io::Result<Self> {
        let cache_dir = workdir.join(CACHE_SUBDIR);
        std::fs::create_dir_all(&cache_dir)?;
        Ok(Self { cache_dir, runner })
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Deterministic cache location for a source file.
    pub fn cached_path(&self, source: &Path) -> PathBuf {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "clip".to_string());
        self.cache_dir.join(format!("{stem}.{CACHE_EXT}"))
    }

    /// Return the cached intermediate for `source`, converting it first if it
    /// is not on disk yet. Conversion failures are fatal.
    pub fn ensure(&self, source: &Path) -> Result<PathBuf, TranscodeError> {
        let target = self.cached_path(source);
        if target.is_file() {
            debug!("transcode cache hit: {}", target.display());
            return Ok(target);
        }

        info!("transcoding {} -> {}", source.display(), target.display());
        let args = vec![
            "-i".to_string(),
            source.display().to_string(),
            "-c".to_string(),
            "copy".to_string(),
            "-bsf:v".to_string(),
            "h264_mp4toannexb".to_string(),
            "-f".to_string(),
            "mpegts".to_string(),
            target.display().to_string(),
        ];

        let output = self
            .runner
            .run("ffmpeg", &args)
            .map_err(|e| TranscodeError::Spawn {
                reason: e.to_string(),
            })?;

        if !output.success() {
            return Err(TranscodeError::ToolFailed {
                code: output.code,
                stderr: output.stderr.trim().to_string(),
            });
        }

        Ok(target)
    }
}
