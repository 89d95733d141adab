use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::task;
use tracing::{debug, info};

use crate::composition::chapters::{self, ChapterEntry};
use crate::config::{Config, Role};
use crate::error::{ConfigError, RenderError, Result, SourceError, TranscodeError};
use crate::layout::toc::build_toc;
use crate::layout::{ApproxMetrics, FontMetrics, LayoutContext, TextMeasure};
use crate::media::download::{acquire_watermark, ClipDownloader, YtDlpDownloader};
use crate::media::probe::{FfprobeProbe, MediaProbe};
use crate::media::runner::{SystemRunner, ToolRunner};
use crate::media::transcode::{TranscodeCache, CACHE_SUBDIR};
use crate::render::encoder::FfmpegEncoder;
use crate::timeline::assembler::{prepare, resolve_entries, ResolvedEntry};
use crate::timeline::model::{FinalTimeline, PreparedClip, Size};
use crate::timeline::splice::splice_toc;
use crate::timeline::watermark::watermark_layer;

/// Main stitching engine that orchestrates the whole composition pipeline
///
/// The engine follows a strict sequence:
/// 1. Source Acquisition - download remote clips, fill the transcode cache
/// 2. Canvas Negotiation - probe native sizes, resolve subclip windows
/// 3. Clip Preparation - fades, overlays, the TOC splice into the opening
/// 4. Concatenation - chapter bookkeeping over the ordered clips
/// 5. Final Encode - watermark and a single external encoder run
///
/// Every external call is awaited to completion before the next begins; there
/// is no internal parallelism.
pub struct StitchEngine {
    dir: PathBuf,
    config: Config,
    preview: Option<f64>,
    fontfile: Option<PathBuf>,
    runner: Arc<dyn ToolRunner>,
    probe: Arc<dyn MediaProbe>,
    downloader: Arc<dyn ClipDownloader>,
    measure: Arc<dyn TextMeasure>,
}

/// Summary of a completed run
#[derive(Debug, Clone)]
pub struct StitchReport {
    pub output: PathBuf,
    pub canvas: Size,
    pub total_duration: f64,
    pub chapters: Vec<ChapterEntry>,
}

impl StitchEngine {
    /// Create an engine with the production collaborators: system tools,
    /// ffprobe, yt-dlp, and font metrics from the configured font file.
    pub fn new(dir: PathBuf, config: Config, preview: Option<f64>) -> Result<Self> {
        let runner: Arc<dyn ToolRunner> = Arc::new(SystemRunner);
        let fontfile = resolve_fontfile(&dir, &config);
        let measure: Arc<dyn TextMeasure> = match &fontfile {
            Some(path) => Arc::new(FontMetrics::from_file(path)?),
            None => Arc::new(ApproxMetrics),
        };

        Ok(Self {
            probe: Arc::new(FfprobeProbe::new(Arc::clone(&runner))),
            downloader: Arc::new(YtDlpDownloader::new(Arc::clone(&runner))),
            fontfile,
            runner,
            measure,
            dir,
            config,
            preview,
        })
    }

    /// Create an engine with injected collaborators.
    pub fn with_components(
        dir: PathBuf,
        config: Config,
        preview: Option<f64>,
        runner: Arc<dyn ToolRunner>,
        probe: Arc<dyn MediaProbe>,
        downloader: Arc<dyn ClipDownloader>,
        measure: Arc<dyn TextMeasure>,
    ) -> Self {
        let fontfile = resolve_fontfile(&dir, &config);
        Self {
            dir,
            config,
            preview,
            fontfile,
            runner,
            probe,
            downloader,
            measure,
        }
    }

    /// Run the whole pipeline and write the final video into the working
    /// directory.
    pub async fn run(&self) -> Result<StitchReport> {
        info!(
            "🎬 Stitching sprint demo '{}' for {}",
            self.config.sprint, self.config.project
        );
        if let Some(preview) = self.preview {
            info!("   Preview mode: clips capped at {preview}s");
        }

        let cached = self.acquire_sources().await?;
        let (canvas, resolved) = self.negotiate_canvas(&cached).await?;
        info!("   Canvas is {}x{}", canvas.width, canvas.height);

        let clips = self.prepare_clips(canvas, &resolved)?;

        let (chapter_list, total_duration) = chapters::concatenate(&clips);
        info!(
            "⏱️  Total duration: {total_duration:.1}s across {} clips",
            clips.len()
        );
        for chapter in &chapter_list {
            info!("   Chapter {}: {:.1} sec", chapter.index + 1, chapter.start);
        }

        let timeline = self.finalize(canvas, clips, total_duration).await?;
        let output = self.dir.join(&self.config.output_file);
        self.encode(timeline, &output).await?;

        info!("🎉 Sprint demo written to {}", output.display());
        Ok(StitchReport {
            output,
            canvas,
            total_duration,
            chapters: chapter_list,
        })
    }

    // ==========================================
    // STEP 1: SOURCE ACQUISITION
    // ==========================================

    /// Fetch remote clips for missing local files, then fill the transcode
    /// cache. A source that is still missing afterwards is fatal.
    async fn acquire_sources(&self) -> Result<Vec<PathBuf>> {
        info!(
            "📼 Step 1: Preparing {} source clips...",
            self.config.entries.len()
        );

        let cache = TranscodeCache::new(&self.dir, Arc::clone(&self.runner))?;
        let mut cached = Vec::with_capacity(self.config.entries.len());

        for entry in &self.config.entries {
            let source = self.dir.join(&entry.video);

            if !source.is_file() {
                if let Some(url) = entry.youtube_url.clone() {
                    let downloader = Arc::clone(&self.downloader);
                    let dest = source.clone();
                    let fetch_url = url.clone();
                    task::spawn_blocking(move || downloader.fetch(&fetch_url, &dest))
                        .await
                        .map_err(|e| SourceError::DownloadFailed {
                            url,
                            reason: e.to_string(),
                        })??;
                }
            }

            if !source.is_file() {
                return Err(SourceError::Missing {
                    path: source.display().to_string(),
                }
                .into());
            }

            let cache = cache.clone();
            let src = source.clone();
            let path = task::spawn_blocking(move || cache.ensure(&src))
                .await
                .map_err(|e| TranscodeError::Spawn {
                    reason: e.to_string(),
                })??;
            debug!("  - {} ready as {}", entry.video, path.display());
            cached.push(path);
        }

        Ok(cached)
    }

    // ==========================================
    // STEP 2: CANVAS NEGOTIATION
    // ==========================================

    /// Probe every cached source for its native, untrimmed metadata and
    /// resolve the canvas and per-entry windows in one pass.
    async fn negotiate_canvas(
        &self,
        cached: &[PathBuf],
    ) -> Result<(Size, Vec<ResolvedEntry>)> {
        info!("📐 Step 2: Negotiating canvas size...");

        let mut infos = Vec::with_capacity(cached.len());
        for path in cached {
            let probe = Arc::clone(&self.probe);
            let target = path.clone();
            let info = task::spawn_blocking(move || probe.probe(&target))
                .await
                .map_err(|e| SourceError::ProbeFailed {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                })??;
            debug!(
                "  - {}: {}x{}, {:.2}s",
                path.display(),
                info.width,
                info.height,
                info.duration
            );
            infos.push(info);
        }

        let (canvas, resolved) =
            resolve_entries(&self.config.entries, cached, &infos, self.preview)?;
        Ok((canvas, resolved))
    }

    // ==========================================
    // STEP 3: CLIP PREPARATION
    // ==========================================

    /// Prepare every entry at canvas size, splicing the TOC into the opening
    /// when requested. Output order: opening, middles in config order,
    /// closing.
    fn prepare_clips(
        &self,
        canvas: Size,
        resolved: &[ResolvedEntry],
    ) -> Result<Vec<PreparedClip>> {
        info!("🧩 Step 3: Preparing clips...");

        let ctx = LayoutContext {
            canvas,
            font_size: self.config.font_size,
            fade_in: self.config.fadein,
            fade_out: self.config.fadeout,
            measure: self.measure.as_ref(),
        };

        let opening = find_role(resolved, Role::Opening, "opening")?;
        let closing = find_role(resolved, Role::Closing, "closing")?;

        let mut clips = Vec::with_capacity(resolved.len());

        let mut opening_clip = prepare(&ctx, opening);
        if opening.entry.show_toc {
            debug!("  - splicing table of contents into '{}'", opening.entry.video);
            let toc = build_toc(&ctx, resolved, self.config.toc_fade_time);
            opening_clip = splice_toc(opening_clip, toc, self.config.toc_fade_time)?;
        }
        clips.push(opening_clip);

        for entry in resolved.iter().filter(|r| r.entry.is_middle()) {
            debug!("  - prepared '{}'", entry.entry.video);
            clips.push(prepare(&ctx, entry));
        }

        clips.push(prepare(&ctx, closing));
        Ok(clips)
    }

    // ==========================================
    // STEPS 4-5: WATERMARK AND FINAL ENCODE
    // ==========================================

    async fn finalize(
        &self,
        canvas: Size,
        clips: Vec<PreparedClip>,
        total_duration: f64,
    ) -> Result<FinalTimeline> {
        let watermark = match &self.config.watermark {
            Some(config) => {
                let cache_dir = self.dir.join(CACHE_SUBDIR);
                acquire_watermark(config, &self.dir, &cache_dir)
                    .await?
                    .map(|image| {
                        watermark_layer(
                            canvas,
                            &image,
                            config.position,
                            config.height_ratio,
                            total_duration,
                        )
                    })
            }
            None => None,
        };

        Ok(FinalTimeline {
            canvas,
            clips,
            watermark,
        })
    }

    async fn encode(&self, timeline: FinalTimeline, output: &Path) -> Result<()> {
        info!("🎞️  Step 4: Encoding final video...");

        let encoder = FfmpegEncoder::new(Arc::clone(&self.runner), self.fontfile.clone());
        let target = output.to_path_buf();
        task::spawn_blocking(move || encoder.encode(&timeline, &target))
            .await
            .map_err(|e| RenderError::EncodeFailed {
                reason: e.to_string(),
            })??;
        Ok(())
    }
}

fn resolve_fontfile(dir: &Path, config: &Config) -> Option<PathBuf> {
    config.fontfile.as_ref().map(|fontfile| {
        if fontfile.is_absolute() {
            fontfile.clone()
        } else {
            dir.join(fontfile)
        }
    })
}

fn find_role<'a>(
    resolved: &'a [ResolvedEntry],
    role: Role,
    label: &str,
) -> Result<&'a ResolvedEntry> {
    resolved
        .iter()
        .find(|r| r.entry.role == Some(role))
        .ok_or_else(|| {
            ConfigError::RoleCount {
                role: label.to_string(),
                count: 0,
            }
            .into()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io;
    use std::sync::Mutex;

    use tempfile::tempdir;

    use crate::error::StitchError;
    use crate::media::probe::MediaInfo;
    use crate::media::runner::ToolOutput;

    /// Records every invocation and materializes output files the way the
    /// real tools would.
    struct FakeTools {
        calls: Mutex<Vec<Vec<String>>>,
    }

    impl FakeTools {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(vec![]),
            })
        }

        fn runs_containing(&self, needle: &str) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|args| args.iter().any(|a| a == needle))
                .count()
        }
    }

    impl ToolRunner for FakeTools {
        fn run(&self, _program: &str, args: &[String]) -> io::Result<ToolOutput> {
            self.calls.lock().unwrap().push(args.to_vec());
            let creates_file = args.iter().any(|a| a == "mpegts" || a == "-filter_complex");
            if creates_file {
                if let Some(target) = args.last() {
                    std::fs::write(target, b"out")?;
                }
            }
            Ok(ToolOutput {
                code: 0,
                stdout: String::new(),
                stderr: String::new(),
            })
        }
    }

    struct MapProbe {
        by_stem: HashMap<String, MediaInfo>,
    }

    impl MapProbe {
        fn new(entries: &[(&str, u32, u32, f64)]) -> Arc<Self> {
            Arc::new(Self {
                by_stem: entries
                    .iter()
                    .map(|(stem, width, height, duration)| {
                        (
                            stem.to_string(),
                            MediaInfo {
                                width: *width,
                                height: *height,
                                duration: *duration,
                            },
                        )
                    })
                    .collect(),
            })
        }
    }

    impl MediaProbe for MapProbe {
        fn probe(&self, path: &Path) -> std::result::Result<MediaInfo, SourceError> {
            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default();
            self.by_stem
                .get(stem)
                .copied()
                .ok_or_else(|| SourceError::ProbeFailed {
                    path: path.display().to_string(),
                    reason: "unknown fixture".to_string(),
                })
        }
    }

    struct CreatingDownloader {
        calls: Mutex<Vec<String>>,
    }

    impl ClipDownloader for CreatingDownloader {
        fn fetch(&self, url: &str, dest: &Path) -> std::result::Result<(), SourceError> {
            self.calls.lock().unwrap().push(url.to_string());
            std::fs::write(dest, b"downloaded").map_err(|e| SourceError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            })
        }
    }

    fn engine_for(
        dir: &Path,
        yaml: &str,
        preview: Option<f64>,
        runner: Arc<FakeTools>,
        probe: Arc<MapProbe>,
        downloader: Arc<CreatingDownloader>,
    ) -> StitchEngine {
        let config = Config::from_yaml(yaml, "test").unwrap();
        StitchEngine::with_components(
            dir.to_path_buf(),
            config,
            preview,
            runner,
            probe,
            downloader,
            Arc::new(ApproxMetrics),
        )
    }

    fn touch(dir: &Path, names: &[&str]) {
        for name in names {
            std::fs::write(dir.join(name), b"src").unwrap();
        }
    }

    const SCENARIO: &str = r#"
Sprint: "S1"
Project: "P1"
Videos:
  - video: open.mp4
    type: opening
  - video: a.mp4
    ticket: T-1
    description: Did X
    duration: 5
  - video: close.mp4
    type: closing
"#;

    #[tokio::test]
    async fn end_to_end_scenario_yields_summed_duration_and_chapters() {
        let dir = tempdir().unwrap();
        touch(dir.path(), &["open.mp4", "a.mp4", "close.mp4"]);

        let runner = FakeTools::new();
        let probe = MapProbe::new(&[
            ("open", 1280, 720, 8.0),
            ("a", 1920, 1080, 30.0),
            ("close", 640, 360, 4.0),
        ]);
        let downloader = Arc::new(CreatingDownloader {
            calls: Mutex::new(vec![]),
        });

        let engine = engine_for(dir.path(), SCENARIO, None, runner.clone(), probe, downloader);
        let report = engine.run().await.unwrap();

        assert_eq!(report.canvas, Size::new(1920, 1080));
        assert_eq!(report.total_duration, 17.0);
        let starts: Vec<f64> = report.chapters.iter().map(|c| c.start).collect();
        assert_eq!(starts, vec![0.0, 8.0, 13.0]);

        assert_eq!(runner.runs_containing("mpegts"), 3);
        assert_eq!(runner.runs_containing("-filter_complex"), 1);
        assert!(report.output.is_file());
        assert_eq!(
            report.output.file_name().unwrap().to_str().unwrap(),
            "sprint-demo-s1.mp4"
        );
    }

    #[tokio::test]
    async fn toc_splice_shortens_the_opening_chapter() {
        let yaml = r#"
Sprint: S1
Project: P1
Videos:
  - video: open.mp4
    type: opening
    "show toc": true
  - video: a.mp4
    duration: 5
  - video: close.mp4
    type: closing
"#;
        let dir = tempdir().unwrap();
        touch(dir.path(), &["open.mp4", "a.mp4", "close.mp4"]);

        let runner = FakeTools::new();
        let probe = MapProbe::new(&[
            ("open", 1280, 720, 12.0),
            ("a", 1280, 720, 30.0),
            ("close", 1280, 720, 4.0),
        ]);
        let downloader = Arc::new(CreatingDownloader {
            calls: Mutex::new(vec![]),
        });

        let engine = engine_for(dir.path(), yaml, None, runner, probe, downloader);
        let report = engine.run().await.unwrap();

        // The spliced opening loses one second of video: trim 7s + black 4s.
        let starts: Vec<f64> = report.chapters.iter().map(|c| c.start).collect();
        assert_eq!(starts, vec![0.0, 11.0, 16.0]);
        assert_eq!(report.total_duration, 20.0);
    }

    #[tokio::test]
    async fn missing_source_without_url_is_fatal() {
        let dir = tempdir().unwrap();
        touch(dir.path(), &["open.mp4", "close.mp4"]);

        let runner = FakeTools::new();
        let probe = MapProbe::new(&[
            ("open", 1280, 720, 8.0),
            ("a", 1280, 720, 30.0),
            ("close", 1280, 720, 4.0),
        ]);
        let downloader = Arc::new(CreatingDownloader {
            calls: Mutex::new(vec![]),
        });

        let engine = engine_for(dir.path(), SCENARIO, None, runner, probe, downloader);
        let err = engine.run().await.unwrap_err();
        assert!(matches!(
            err,
            StitchError::Source(SourceError::Missing { .. })
        ));
    }

    #[tokio::test]
    async fn remote_entries_are_downloaded_before_transcoding() {
        let yaml = r#"
Sprint: S1
Project: P1
Videos:
  - video: open.mp4
    type: opening
  - video: remote.mp4
    youtube-url: https://example.com/watch?v=1
    duration: 5
  - video: close.mp4
    type: closing
"#;
        let dir = tempdir().unwrap();
        touch(dir.path(), &["open.mp4", "close.mp4"]);

        let runner = FakeTools::new();
        let probe = MapProbe::new(&[
            ("open", 1280, 720, 8.0),
            ("remote", 1280, 720, 30.0),
            ("close", 1280, 720, 4.0),
        ]);
        let downloader = Arc::new(CreatingDownloader {
            calls: Mutex::new(vec![]),
        });

        let engine = engine_for(
            dir.path(),
            yaml,
            None,
            runner,
            probe,
            downloader.clone(),
        );
        let report = engine.run().await.unwrap();

        assert_eq!(
            downloader.calls.lock().unwrap().as_slice(),
            ["https://example.com/watch?v=1"]
        );
        assert_eq!(report.total_duration, 17.0);
    }

    #[tokio::test]
    async fn preview_caps_entries_without_explicit_durations() {
        let yaml = r#"
Sprint: S1
Project: P1
Videos:
  - video: open.mp4
    type: opening
  - video: a.mp4
  - video: close.mp4
    type: closing
"#;
        let dir = tempdir().unwrap();
        touch(dir.path(), &["open.mp4", "a.mp4", "close.mp4"]);

        let runner = FakeTools::new();
        let probe = MapProbe::new(&[
            ("open", 1280, 720, 8.0),
            ("a", 1280, 720, 30.0),
            ("close", 1280, 720, 4.0),
        ]);
        let downloader = Arc::new(CreatingDownloader {
            calls: Mutex::new(vec![]),
        });

        let engine = engine_for(dir.path(), yaml, Some(2.0), runner, probe, downloader);
        let report = engine.run().await.unwrap();

        // Preview caps open, a, and close alike.
        assert_eq!(report.total_duration, 6.0);
    }

    #[tokio::test]
    async fn transcode_cache_survives_repeated_runs() {
        let dir = tempdir().unwrap();
        touch(dir.path(), &["open.mp4", "a.mp4", "close.mp4"]);

        let runner = FakeTools::new();
        let probe = MapProbe::new(&[
            ("open", 1280, 720, 8.0),
            ("a", 1920, 1080, 30.0),
            ("close", 640, 360, 4.0),
        ]);
        let downloader = Arc::new(CreatingDownloader {
            calls: Mutex::new(vec![]),
        });

        let engine = engine_for(
            dir.path(),
            SCENARIO,
            None,
            runner.clone(),
            probe,
            downloader,
        );
        engine.run().await.unwrap();
        engine.run().await.unwrap();

        // Three conversions on the first run, zero on the second.
        assert_eq!(runner.runs_containing("mpegts"), 3);
        assert_eq!(runner.runs_containing("-filter_complex"), 2);
    }
}
