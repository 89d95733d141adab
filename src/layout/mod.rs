//! Pixel layout of overlay widgets and the table of contents.

pub mod overlay;
pub mod text;
pub mod toc;

pub use text::{ApproxMetrics, FontMetrics, TextExtent, TextMeasure};

use crate::timeline::model::Size;

/// Fixed margin between widgets and canvas edges, in pixels
pub const MARGIN: u32 = 5;
/// Padding added around text inside a badge
pub const TEXT_PAD: u32 = 6;
/// Border around a badge background
pub const BORDER: u32 = 1;
/// How long the description band stays visible
pub const DESCRIPTION_DURATION: f64 = 3.0;
/// Font size for centered title overlays
pub const TITLE_FONT_SIZE: u32 = 50;

/// Everything the layout passes need: the negotiated canvas, typography, and
/// the configured fade windows.
pub struct LayoutContext<'a> {
    pub canvas: Size,
    pub font_size: u32,
    pub fade_in: f64,
    pub fade_out: f64,
    pub measure: &'a dyn TextMeasure,
}

/// Full badge size for a text extent: padding plus border on each side.
pub fn badge_size(extent: TextExtent) -> (u32, u32) {
    (
        extent.width + TEXT_PAD + 2 * BORDER,
        extent.height + TEXT_PAD + 2 * BORDER,
    )
}

/// Fade durations of zero mean "no fade".
pub(crate) fn positive(value: f64) -> Option<f64> {
    (value > 0.0).then_some(value)
}
