//! Chapter bookkeeping for the concatenated program.

use crate::timeline::model::PreparedClip;

/// Where one entry begins in the final video
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChapterEntry {
    pub index: usize,
    pub start: f64,
}

/// Accumulate chapter start offsets over the clips in output order. The first
/// entry starts at zero; each subsequent start is the sum of the video
/// durations before it. Returns the chapter list and the total duration.
pub fn concatenate(clips: &[PreparedClip]) -> (Vec<ChapterEntry>, f64) {
    let mut chapters = Vec::with_capacity(clips.len());
    let mut total = 0.0;

    for (index, clip) in clips.iter().enumerate() {
        chapters.push(ChapterEntry {
            index,
            start: total,
        });
        total += clip.video_duration();
    }

    (chapters, total)
}
