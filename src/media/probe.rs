//! FFprobe-based media metadata extraction: the native size and duration the
//! canvas negotiation pass runs on.

use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use crate::error::SourceError;
use crate::media::runner::ToolRunner;

/// Native metadata of a source file
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediaInfo {
    pub width: u32,
    pub height: u32,
    pub duration: f64,
}

pub trait MediaProbe: Send + Sync {
    fn probe(&self, path: &Path) -> Result<MediaInfo, SourceError>;
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: Option<FfprobeFormat>,
    streams: Option<Vec<FfprobeStream>>,
}

/// Parse ffprobe JSON output. Audio-only sources yield a zero size, which
/// simply never wins the canvas maximum.
pub fn parse_probe_json(json: &str) -> Result<MediaInfo, String> {
    let output: FfprobeOutput =
        serde_json::from_str(json).map_err(|e| format!("invalid ffprobe JSON: {e}"))?;

    let duration = output
        .format
        .as_ref()
        .and_then(|f| f.duration.as_ref())
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.0);

    let video_stream = output
        .streams
        .as_ref()
        .and_then(|streams| streams.iter().find(|s| s.codec_type.as_deref() == Some("video")));
    let width = video_stream.and_then(|s| s.width).unwrap_or(0);
    let height = video_stream.and_then(|s| s.height).unwrap_or(0);

    Ok(MediaInfo {
        width,
        height,
        duration,
    })
}

/// Probes media by running ffprobe through the tool runner
#[derive(Clone)]
pub struct FfprobeProbe {
    runner: Arc<dyn ToolRunner>,
}

impl FfprobeProbe {
    pub fn new(runner: Arc<dyn ToolRunner>) -> Self {
        Self { runner }
    }
}

impl MediaProbe for FfprobeProbe {
    fn probe(&self, path: &Path) -> Result<MediaInfo, SourceError> {
        let path_str = path.display().to_string();
        debug!("probing {path_str}");

        let args = vec![
            "-v".to_string(),
            "quiet".to_string(),
            "-print_format".to_string(),
            "json".to_string(),
            "-show_format".to_string(),
            "-show_streams".to_string(),
            path_str.clone(),
        ];

        let output = self
            .runner
            .run("ffprobe", &args)
            .map_err(|e| SourceError::ProbeFailed {
                path: path_str.clone(),
                reason: e.to_string(),
            })?;

        if !output.success() {
            return Err(SourceError::ProbeFailed {
                path: path_str,
                reason: output.stderr.trim().to_string(),
            });
        }

        let info = parse_probe_json(&output.stdout).map_err(|reason| SourceError::ProbeFailed {
            path: path_str.clone(),
            reason,
        })?;

        if info.duration <= 0.0 {
            return Err(SourceError::ProbeFailed {
                path: path_str,
                reason: "source reports no duration".to_string(),
            });
        }

        Ok(info)
    }
}
