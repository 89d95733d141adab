//! External collaborators: tool invocation, media probing, the transcode
//! cache, and remote acquisition.

pub mod download;
pub mod probe;
pub mod runner;
pub mod transcode;

pub use download::{ClipDownloader, WatermarkImage, YtDlpDownloader};
pub use probe::{FfprobeProbe, MediaInfo, MediaProbe};
pub use runner::{SystemRunner, ToolOutput, ToolRunner};
pub use transcode::TranscodeCache;
