//! Remote acquisition: clip downloads for URL-sourced entries and watermark
//! image fetching.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::GenericImageView;
use tracing::info;

use crate::config::WatermarkConfig;
use crate::error::{RenderError, SourceError, StitchError};
use crate::media::runner::ToolRunner;

pub trait ClipDownloader: Send + Sync {
    /// Fetch the highest-resolution progressive MP4 stream for `url` to
    /// `dest`.
    fn fetch(&self, url: &str, dest: &Path) -> Result<(), SourceError>;
}

/// Downloads clips by shelling out to yt-dlp
#[derive(Clone)]
pub struct YtDlpDownloader {
    runner: Arc<dyn ToolRunner>,
}

impl YtDlpDownloader {
    pub fn new(runner: Arc<dyn ToolRunner>) -> Self {
        Self { runner }
    }
}

impl ClipDownloader for YtDlpDownloader {
    fn fetch(&self, url: &str, dest: &Path) -> Result<(), SourceError> {
        info!("downloading {url} -> {}", dest.display());
        let args = vec![
            "-f".to_string(),
            "best[ext=mp4]".to_string(),
            "-o".to_string(),
            dest.display().to_string(),
            url.to_string(),
        ];

        let output =
            self.runner
                .run("yt-dlp", &args)
                .map_err(|e| SourceError::DownloadFailed {
                    url: url.to_string(),
                    reason: e.to_string(),
                })?;

        if !output.success() {
            return Err(SourceError::DownloadFailed {
                url: url.to_string(),
                reason: output.stderr.trim().to_string(),
            });
        }

        Ok(())
    }
}

/// A watermark image on local disk with its probed dimensions
#[derive(Debug, Clone)]
pub struct WatermarkImage {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

/// Resolve the configured watermark into a local file and its dimensions.
/// URL watermarks are fetched and decoded into the cache directory; path
/// watermarks are probed in place. Returns `None` when neither is set.
pub async fn acquire_watermark(
    config: &WatermarkConfig,
    workdir: &Path,
    cache_dir: &Path,
) -> Result<Option<WatermarkImage>, StitchError> {
    if let Some(url) = &config.url {
        info!("fetching watermark from {url}");
        let response = reqwest::get(url)
            .await
            .map_err(|e| RenderError::WatermarkFailed {
                reason: e.to_string(),
            })?;
        if !response.status().is_success() {
            return Err(RenderError::WatermarkFailed {
                reason: format!("{url} returned {}", response.status()),
            }
            .into());
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| RenderError::WatermarkFailed {
                reason: e.to_string(),
            })?;
        let image =
            image::load_from_memory(&bytes).map_err(|e| RenderError::WatermarkFailed {
                reason: e.to_string(),
            })?;

        let path = cache_dir.join("watermark.png");
        image.save(&path).map_err(|e| RenderError::WatermarkFailed {
            reason: e.to_string(),
        })?;

        return Ok(Some(WatermarkImage {
            path,
            width: image.width(),
            height: image.height(),
        }));
    }

    if let Some(relative) = &config.path {
        let path = workdir.join(relative);
        let (width, height) =
            image::image_dimensions(&path).map_err(|e| RenderError::WatermarkFailed {
                reason: format!("{}: {e}", path.display()),
            })?;
        return Ok(Some(WatermarkImage {
            path,
            width,
            height,
        }));
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::Mutex;

    use tempfile::tempdir;

    use crate::config::Corner;
    use crate::media::runner::ToolOutput;

    struct FakeFetcher {
        calls: Mutex<Vec<Vec<String>>>,
        succeed: bool,
    }

    impl ToolRunner for FakeFetcher {
        fn run(&self, _program: &str, args: &[String]) -> io::Result<ToolOutput> {
            self.calls.lock().unwrap().push(args.to_vec());
            Ok(ToolOutput {
                code: if self.succeed { 0 } else { 1 },
                stdout: String::new(),
                stderr: "network unreachable".to_string(),
            })
        }
    }

    #[test]
    fn fetch_targets_the_best_progressive_mp4() {
        let runner = Arc::new(FakeFetcher {
            calls: Mutex::new(vec![]),
            succeed: true,
        });
        let downloader = YtDlpDownloader::new(runner.clone());
        downloader
            .fetch("https://example.com/v", Path::new("/tmp/v.mp4"))
            .unwrap();

        let calls = runner.calls.lock().unwrap();
        assert!(calls[0].contains(&"best[ext=mp4]".to_string()));
        assert!(calls[0].contains(&"https://example.com/v".to_string()));
        assert!(calls[0].contains(&"/tmp/v.mp4".to_string()));
    }

    #[test]
    fn failed_fetch_surfaces_the_tool_stderr() {
        let downloader = YtDlpDownloader::new(Arc::new(FakeFetcher {
            calls: Mutex::new(vec![]),
            succeed: false,
        }));
        let err = downloader
            .fetch("https://example.com/v", Path::new("/tmp/v.mp4"))
            .unwrap_err();
        match err {
            SourceError::DownloadFailed { reason, .. } => {
                assert_eq!(reason, "network unreachable")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    fn watermark(url: Option<&str>, path: Option<&str>) -> WatermarkConfig {
        WatermarkConfig {
            url: url.map(String::from),
            path: path.map(String::from),
            position: Corner::TopRight,
            height_ratio: 0.1,
        }
    }

    #[tokio::test]
    async fn no_watermark_configured_is_a_no_op() {
        let dir = tempdir().unwrap();
        let result = acquire_watermark(&watermark(None, None), dir.path(), dir.path())
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn local_watermark_is_probed_in_place() {
        let dir = tempdir().unwrap();
        let logo = dir.path().join("logo.png");
        image::RgbImage::from_pixel(8, 4, image::Rgb([255, 0, 0]))
            .save(&logo)
            .unwrap();

        let result = acquire_watermark(&watermark(None, Some("logo.png")), dir.path(), dir.path())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result.width, 8);
        assert_eq!(result.height, 4);
        assert_eq!(result.path, logo);
    }

    #[tokio::test]
    async fn missing_local_watermark_is_an_error() {
        let dir = tempdir().unwrap();
        let err = acquire_watermark(&watermark(None, Some("nope.png")), dir.path(), dir.path())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StitchError::Render(RenderError::WatermarkFailed { .. })
        ));
    }
}
