//! Per-clip overlay layout: ticket badge, description band, countdown timer.
//!
//! The three widgets share the bottom edge of the canvas and must never
//! overlap: the ticket badge sits at the left margin, the countdown at the
//! right margin, and the description band fills exactly the width left
//! between them.

use crate::config::VideoEntry;
use crate::timeline::model::{CountdownFrame, Layer, LayerContent, RED, WHITE};

use super::{badge_size, positive, LayoutContext, BORDER, DESCRIPTION_DURATION, MARGIN, TEXT_PAD};

/// Lay out the overlay widgets for one clip. Returns the layers back-to-front,
/// or `None` when no widget applies to this entry.
pub fn build_overlay(
    ctx: &LayoutContext,
    entry: &VideoEntry,
    clip_duration: f64,
) -> Option<Vec<Layer>> {
    let (ticket, ticket_width) = ticket_badge(ctx, entry, clip_duration);
    let (countdown, duration_width) = countdown_bar(ctx, entry, clip_duration);
    let description = description_band(ctx, entry, ticket_width, duration_width, clip_duration);

    let mut layers = Vec::new();
    layers.extend(ticket);
    layers.extend(description);
    layers.extend(countdown);

    if layers.is_empty() {
        None
    } else {
        Some(layers)
    }
}

/// Ticket badge, anchored left/bottom, visible for the whole clip with a
/// fade-out at the very end. The returned width spans from the canvas edge to
/// the badge's right edge; a bare margin when no ticket is set.
fn ticket_badge(
    ctx: &LayoutContext,
    entry: &VideoEntry,
    clip_duration: f64,
) -> (Option<Layer>, u32) {
    let Some(ticket) = entry.ticket.as_deref() else {
        return (None, MARGIN);
    };

    let extent = ctx.measure.measure(ticket, ctx.font_size);
    let (width, height) = badge_size(extent);
    let layer = Layer {
        x: MARGIN as i32,
        y: (ctx.canvas.height - MARGIN - height) as i32,
        width,
        height,
        start: 0.0,
        duration: clip_duration,
        fade_in: None,
        fade_out: positive(ctx.fade_out),
        content: LayerContent::Text {
            text: ticket.to_string(),
            font_size: ctx.font_size,
            color: RED,
            background: Some(WHITE),
        },
    };

    (Some(layer), width + MARGIN)
}

/// Countdown timer, anchored right/bottom: one-second frames counting down
/// from the rounded-up clip length to 1, formatted `MM:SS`. Values are
/// discrete per second, never interpolated.
fn countdown_bar(
    ctx: &LayoutContext,
    entry: &VideoEntry,
    clip_duration: f64,
) -> (Option<Layer>, u32) {
    if !entry.show_duration {
        return (None, 0);
    }

    let total = clip_duration.ceil() as u32;
    if total == 0 {
        return (None, 0);
    }

    let mut frames = Vec::with_capacity(total as usize);
    let mut max_width = 0;
    let mut max_height = 0;
    for remaining in (1..=total).rev() {
        let text = format!("{:02}:{:02}", remaining / 60, remaining % 60);
        let extent = ctx.measure.measure(&text, ctx.font_size);
        let (width, height) = badge_size(extent);
        max_width = max_width.max(width);
        max_height = max_height.max(height);
        frames.push(CountdownFrame {
            text,
            width,
            height,
        });
    }

    let layer = Layer {
        x: (ctx.canvas.width - MARGIN - max_width) as i32,
        y: (ctx.canvas.height - MARGIN - max_height) as i32,
        width: max_width,
        height: max_height,
        start: 0.0,
        duration: clip_duration,
        fade_in: None,
        fade_out: None,
        content: LayerContent::Countdown {
            font_size: ctx.font_size,
            color: WHITE,
            background: RED,
            frames,
        },
    };

    (Some(layer), max_width + MARGIN)
}

/// Description band: a white bar filling exactly the gap between ticket and
/// countdown, with the description text on top. Only visible for a short
/// window at the clip start so it does not obstruct the recording.
fn description_band(
    ctx: &LayoutContext,
    entry: &VideoEntry,
    ticket_width: u32,
    duration_width: u32,
    clip_duration: f64,
) -> Vec<Layer> {
    let Some(description) = entry.description.as_deref() else {
        return Vec::new();
    };

    let available = ctx.canvas.width as i64
        - ticket_width as i64
        - MARGIN as i64
        - duration_width as i64;
    if available <= 0 {
        return Vec::new();
    }

    let extent = ctx.measure.measure(description, ctx.font_size);
    let (text_width, text_height) = (extent.width + TEXT_PAD, extent.height + TEXT_PAD);
    let bar_height = badge_size(extent).1;
    let duration = DESCRIPTION_DURATION.min(clip_duration);
    let fade_in = positive(ctx.fade_in);

    // The bar width is independent of the text width: short text still yields
    // a uniform strip spanning the full gap.
    let bar = Layer {
        x: ticket_width as i32,
        y: (ctx.canvas.height - MARGIN - bar_height) as i32,
        width: available as u32,
        height: bar_height,
        start: 0.0,
        duration,
        fade_in,
        fade_out: None,
        content: LayerContent::Bar { color: WHITE },
    };

    let text = Layer {
        x: ticket_width as i32,
        y: (ctx.canvas.height - (MARGIN + BORDER) - text_height) as i32,
        width: text_width,
        height: text_height,
        start: 0.0,
        duration,
        fade_in,
        fade_out: None,
        content: LayerContent::Text {
            text: description.to_string(),
            font_size: ctx.font_size,
            color: crate::timeline::model::BLACK,
            background: Some(WHITE),
        },
    };

    vec![bar, text]
}
