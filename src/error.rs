use thiserror::Error;

/// Main error type for the sprint-stitcher library
#[derive(Error, Debug)]
pub enum StitchError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Transcode error: {0}")]
    Transcode(#[from] TranscodeError),

    #[error("Splice error: {0}")]
    Splice(#[from] SpliceError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors, raised during validation before any media I/O
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("Failed to parse configuration file: {path} - {reason}")]
    ParseFailed { path: String, reason: String },

    #[error("Missing required configuration: {key}")]
    MissingKey { key: String },

    #[error("Invalid configuration value: {key} = {value}")]
    InvalidValue { key: String, value: String },

    #[error("Expected exactly one '{role}' video, found {count}")]
    RoleCount { role: String, count: usize },
}

/// Errors around locating and probing source media
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Source file missing and no remote URL configured: {path}")]
    Missing { path: String },

    #[error("Download failed for {url}: {reason}")]
    DownloadFailed { url: String, reason: String },

    #[error("Probing media failed for {path}: {reason}")]
    ProbeFailed { path: String, reason: String },

    #[error("Font file unusable: {path}")]
    FontUnavailable { path: String },
}

/// External transcoder failures
#[derive(Error, Debug)]
pub enum TranscodeError {
    #[error("Failed to spawn transcoder: {reason}")]
    Spawn { reason: String },

    #[error("Transcoder exited with code {code}: {stderr}")]
    ToolFailed { code: i32, stderr: String },
}

/// Table-of-contents splice configuration failures
#[derive(Error, Debug)]
pub enum SpliceError {
    #[error("TOC fade time {fade_time}s does not fit into the opening clip ({clip_duration}s)")]
    FadeExceedsDuration { fade_time: f64, clip_duration: f64 },
}

/// Final composition and encoding failures
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Encoder not available: {reason}")]
    EncoderMissing { reason: String },

    #[error("Encoding failed: {reason}")]
    EncodeFailed { reason: String },

    #[error("Watermark could not be loaded: {reason}")]
    WatermarkFailed { reason: String },
}

/// Convenience type alias for Results using StitchError
pub type Result<T> = std::result::Result<T, StitchError>;
