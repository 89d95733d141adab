//! Splicing the table of contents into the opening clip.
//!
//! The opening is shortened, a black filler segment is appended, and the TOC
//! overlay appears at the cut point — while the original, untruncated audio
//! keeps playing across the whole spliced result.

use tracing::debug;

use crate::error::SpliceError;
use crate::timeline::model::{
    AudioTrack, Layer, PieceSource, PreparedClip, VideoPiece, BLACK,
};

const SPLICE_FADE: f64 = 1.0;

/// Splice the TOC layer into a prepared opening clip.
///
/// `black_length = toc_fade_time - 1` and `trim_length = duration -
/// toc_fade_time` must both be positive; anything else is a configuration
/// error reported before any rendering.
pub fn splice_toc(
    clip: PreparedClip,
    toc: Layer,
    toc_fade_time: f64,
) -> Result<PreparedClip, SpliceError> {
    let total = clip.video_duration();
    let black_length = toc_fade_time - SPLICE_FADE;
    let trim_length = total - toc_fade_time;

    if black_length <= 0.0 || trim_length <= 0.0 {
        return Err(SpliceError::FadeExceedsDuration {
            fade_time: toc_fade_time,
            clip_duration: total,
        });
    }

    let PreparedClip {
        label,
        canvas,
        pieces,
        overlays,
        audio,
    } = clip;

    // Detach the full-length audio before the video is truncated.
    let audio = match audio {
        AudioTrack::FollowVideo => {
            let subclip = pieces.iter().find_map(|p| match &p.source {
                PieceSource::Subclip { source, start } => Some((source.clone(), *start)),
                PieceSource::Color { .. } => None,
            });
            match subclip {
                Some((source, start)) => AudioTrack::Detached {
                    source,
                    start,
                    duration: total,
                },
                None => AudioTrack::FollowVideo,
            }
        }
        detached => detached,
    };

    // Truncate the video at the cut point and fade the new end.
    let mut kept = Vec::with_capacity(pieces.len() + 1);
    let mut elapsed = 0.0;
    for mut piece in pieces {
        if elapsed >= trim_length {
            break;
        }
        let remaining = trim_length - elapsed;
        if piece.duration > remaining {
            piece.duration = remaining;
        }
        elapsed += piece.duration;
        kept.push(piece);
    }
    if let Some(last) = kept.last_mut() {
        last.fade_out = Some(SPLICE_FADE);
    }

    // Overlays cannot outlive the truncated video.
    let mut overlays: Vec<Layer> = overlays
        .into_iter()
        .filter(|layer| layer.start < trim_length)
        .map(|mut layer| {
            layer.duration = layer.duration.min(trim_length - layer.start);
            layer
        })
        .collect();

    kept.push(VideoPiece::color(BLACK, black_length));

    debug!(
        "spliced TOC into '{label}': trim {trim_length:.3}s + black {black_length:.3}s"
    );

    let mut toc = toc;
    toc.start = trim_length;
    overlays.push(toc);

    Ok(PreparedClip {
        label,
        canvas,
        pieces: kept,
        overlays,
        audio,
    })
}
