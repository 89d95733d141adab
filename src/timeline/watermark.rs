//! Watermark layer placement.

use crate::config::Corner;
use crate::media::download::WatermarkImage;
use crate::timeline::model::{Layer, LayerContent, Size};

/// Scale the watermark to a fraction of the canvas height, preserving aspect
/// ratio, and pin it flush into the configured corner for the whole program.
pub fn watermark_layer(
    canvas: Size,
    image: &WatermarkImage,
    position: Corner,
    height_ratio: f64,
    total_duration: f64,
) -> Layer {
    let height = ((canvas.height as f64 * height_ratio).round() as u32).max(1);
    let width = (((image.width as f64) * height as f64 / image.height.max(1) as f64).round()
        as u32)
        .max(1);

    let x = match position {
        Corner::TopLeft | Corner::BottomLeft => 0,
        Corner::TopRight | Corner::BottomRight => canvas.width.saturating_sub(width) as i32,
    };
    let y = match position {
        Corner::TopLeft | Corner::TopRight => 0,
        Corner::BottomLeft | Corner::BottomRight => canvas.height.saturating_sub(height) as i32,
    };

    Layer {
        x,
        y,
        width,
        height,
        start: 0.0,
        duration: total_duration,
        fade_in: None,
        fade_out: None,
        content: LayerContent::Image {
            path: image.path.clone(),
        },
    }
}
