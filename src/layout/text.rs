//! Text measurement for overlay layout.
//!
//! Rasterization happens in the external render backend, but the layout
//! engine needs pixel extents up front to size badges and align columns. The
//! `TextMeasure` capability provides them, either from real font metrics or
//! from a deterministic approximation when no font file is configured.

use std::path::Path;

use fontdue::{Font, FontSettings};

use crate::error::SourceError;

/// Rendered pixel extent of a text run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextExtent {
    pub width: u32,
    pub height: u32,
}

pub trait TextMeasure: Send + Sync {
    fn measure(&self, text: &str, font_size: u32) -> TextExtent;
}

/// Metrics backed by a real font file
pub struct FontMetrics {
    font: Font,
}

impl std::fmt::Debug for FontMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontMetrics").finish_non_exhaustive()
    }
}

impl FontMetrics {
    pub fn from_file(path: &Path) -> Result<Self, SourceError> {
        let bytes = std::fs::read(path).map_err(|_| SourceError::FontUnavailable {
            path: path.display().to_string(),
        })?;
        let font = Font::from_bytes(bytes, FontSettings::default()).map_err(|_| {
            SourceError::FontUnavailable {
                path: path.display().to_string(),
            }
        })?;
        Ok(Self { font })
    }
}

impl TextMeasure for FontMetrics {
    fn measure(&self, text: &str, font_size: u32) -> TextExtent {
        let px = font_size as f32;
        let mut width = 0.0f32;
        let mut max_ascent = 0i32;
        let mut max_descent = 0i32;

        for ch in text.chars() {
            let metrics = self.font.metrics(ch, px);
            let ascent = metrics.height as i32 + metrics.ymin;
            let descent = -metrics.ymin;
            max_ascent = max_ascent.max(ascent);
            max_descent = max_descent.max(descent);
            width += metrics.advance_width;
        }

        TextExtent {
            width: width.ceil() as u32,
            height: (max_ascent + max_descent).max(0) as u32,
        }
    }
}

/// Deterministic fixed-advance approximation: every glyph advances by 3/5 of
/// the font size, lines are 6/5 of the font size tall. Used when no font file
/// is configured, and by tests that need stable extents.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApproxMetrics;

impl TextMeasure for ApproxMetrics {
    fn measure(&self, text: &str, font_size: u32) -> TextExtent {
        let advance = (font_size * 3).div_ceil(5);
        let chars = text.chars().count() as u32;
        TextExtent {
            width: chars * advance,
            height: (font_size * 6).div_ceil(5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn approx_width_scales_with_text_length() {
        let m = ApproxMetrics;
        let short = m.measure("ab", 20);
        let long = m.measure("abcd", 20);
        assert_eq!(long.width, short.width * 2);
        assert_eq!(short.height, long.height);
    }

    #[test]
    fn approx_scales_with_font_size() {
        let m = ApproxMetrics;
        let small = m.measure("ticket", 10);
        let big = m.measure("ticket", 40);
        assert!(big.width > small.width);
        assert!(big.height > small.height);
    }

    #[test]
    fn approx_empty_text_has_zero_width() {
        let m = ApproxMetrics;
        let extent = m.measure("", 22);
        assert_eq!(extent.width, 0);
        assert!(extent.height > 0);
    }

    #[test]
    fn missing_font_file_is_reported() {
        let err = FontMetrics::from_file(Path::new("/no/such/font.ttf")).unwrap_err();
        assert!(matches!(err, SourceError::FontUnavailable { .. }));
    }
}
