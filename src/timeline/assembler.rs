//! Canvas negotiation and per-entry clip preparation.
//!
//! Canvas sizing is a separate pass that runs before any overlay math: it
//! probes every source's native, untrimmed resolution and resolves each
//! entry's effective subclip window once, into an immutable `ResolvedEntry`.

use std::path::PathBuf;

use tracing::debug;

use crate::config::VideoEntry;
use crate::error::ConfigError;
use crate::layout::overlay::build_overlay;
use crate::layout::{positive, LayoutContext, TITLE_FONT_SIZE};
use crate::media::probe::MediaInfo;
use crate::timeline::model::{
    parse_color, AudioTrack, Layer, LayerContent, PreparedClip, Size, VideoPiece, WHITE,
};

/// One entry with its probe results and effective subclip window resolved.
/// Built once during canvas negotiation and never mutated again.
#[derive(Debug, Clone)]
pub struct ResolvedEntry {
    pub entry: VideoEntry,
    /// Cached, seek-friendly source path
    pub source: PathBuf,
    /// Native resolution of the untrimmed source
    pub native: Size,
    /// Effective subclip start in the source, seconds
    pub start: f64,
    /// Effective subclip length, seconds
    pub duration: f64,
}

/// Resolve every entry's window against its probed native metadata and derive
/// the canvas as the pixel-wise maximum of the native resolutions.
///
/// The entry's explicit `duration` wins over the global preview cap; without
/// either, the window runs to the end of the source. The source's native
/// length is always an upper bound.
pub fn resolve_entries(
    entries: &[VideoEntry],
    sources: &[PathBuf],
    infos: &[MediaInfo],
    preview: Option<f64>,
) -> Result<(Size, Vec<ResolvedEntry>), ConfigError> {
    let mut max_width = 0;
    let mut max_height = 0;
    let mut resolved = Vec::with_capacity(entries.len());

    for ((entry, source), info) in entries.iter().zip(sources).zip(infos) {
        let start = entry.start;
        if start >= info.duration {
            return Err(ConfigError::InvalidValue {
                key: "start".to_string(),
                value: format!("{start}s into a {}s source ({})", info.duration, entry.video),
            });
        }

        let remaining = info.duration - start;
        let duration = match entry.duration.or(preview) {
            Some(requested) => requested.min(remaining),
            None => remaining,
        };

        debug!(
            "  - {}: {}x{}, window [{start}, {:.3})",
            entry.video,
            info.width,
            info.height,
            start + duration
        );

        max_width = max_width.max(info.width);
        max_height = max_height.max(info.height);

        resolved.push(ResolvedEntry {
            entry: entry.clone(),
            source: source.clone(),
            native: Size::new(info.width, info.height),
            start,
            duration,
        });
    }

    Ok((Size::new(max_width, max_height), resolved))
}

/// Lay out one entry as a prepared clip: its trimmed (or color-card) video
/// piece with the global fades, an optional centered title, and the per-clip
/// overlay widgets.
pub fn prepare(ctx: &LayoutContext, resolved: &ResolvedEntry) -> PreparedClip {
    let entry = &resolved.entry;

    let (pieces, audio) = if let Some(color) = entry.background {
        // Audio-only entry: a solid card carrying the subclip's audio.
        (
            vec![VideoPiece::color(color, resolved.duration)],
            AudioTrack::Detached {
                source: resolved.source.clone(),
                start: resolved.start,
                duration: resolved.duration,
            },
        )
    } else {
        let mut piece =
            VideoPiece::subclip(resolved.source.clone(), resolved.start, resolved.duration);
        piece.fade_in = positive(ctx.fade_in);
        piece.fade_out = positive(ctx.fade_out);
        (vec![piece], AudioTrack::FollowVideo)
    };

    let mut overlays = Vec::new();

    if let Some(title) = entry.title.as_deref() {
        let color = entry.color.as_deref().map(parse_color).unwrap_or(WHITE);
        let extent = ctx.measure.measure(title, TITLE_FONT_SIZE);
        overlays.push(Layer {
            x: ((ctx.canvas.width.saturating_sub(extent.width)) / 2) as i32,
            y: ((ctx.canvas.height.saturating_sub(extent.height)) / 2) as i32,
            width: extent.width,
            height: extent.height,
            start: 0.0,
            duration: resolved.duration,
            fade_in: None,
            fade_out: None,
            content: LayerContent::Text {
                text: title.to_string(),
                font_size: TITLE_FONT_SIZE,
                color,
                background: None,
            },
        });
    }

    if let Some(widgets) = build_overlay(ctx, entry, resolved.duration) {
        overlays.extend(widgets);
    }

    PreparedClip {
        label: entry.video.clone(),
        canvas: ctx.canvas,
        pieces,
        overlays,
        audio,
    }
}
