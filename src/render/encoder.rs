//! Runs the compiled ffmpeg invocation for the final encode.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::RenderError;
use crate::media::runner::ToolRunner;
use crate::render::compiler::FfmpegCompiler;
use crate::timeline::model::FinalTimeline;

#[derive(Clone)]
pub struct FfmpegEncoder {
    runner: Arc<dyn ToolRunner>,
    fontfile: Option<PathBuf>,
}

impl FfmpegEncoder {
    pub fn new(runner: Arc<dyn ToolRunner>, fontfile: Option<PathBuf>) -> Self {
        Self { runner, fontfile }
    }

    pub fn available(&self) -> bool {
        self.runner
            .run("ffmpeg", &["-version".to_string()])
            .map(|output| output.success())
            .unwrap_or(false)
    }

    /// Compile the timeline and block until ffmpeg has written the output
    /// file. A non-zero exit is fatal and carries the tool's stderr.
    pub fn encode(&self, timeline: &FinalTimeline, output: &Path) -> Result<(), RenderError> {
        if !self.available() {
            return Err(RenderError::EncoderMissing {
                reason: "ffmpeg not found on PATH".to_string(),
            });
        }

        let compiler = FfmpegCompiler::new(timeline.canvas, self.fontfile.clone());
        let args = compiler.compile(timeline, output);
        debug!("ffmpeg {}", args.join(" "));
        info!(
            "encoding {} clips ({:.1}s) -> {}",
            timeline.clips.len(),
            timeline.total_duration(),
            output.display()
        );

        let result = self
            .runner
            .run("ffmpeg", &args)
            .map_err(|e| RenderError::EncodeFailed {
                reason: e.to_string(),
            })?;

        if !result.success() {
            return Err(RenderError::EncodeFailed {
                reason: result.stderr.trim().to_string(),
            });
        }

        Ok(())
    }
}
