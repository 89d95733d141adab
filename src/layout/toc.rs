//! Table-of-contents layout.
//!
//! Two passes over the visible entries: the first measures and places the
//! title, header, and per-row ticket/length cells while tracking the widest
//! ticket column; the second aligns every description cell to that shared
//! column boundary.

use crate::timeline::assembler::ResolvedEntry;
use crate::timeline::model::{Layer, LayerContent, Rgb, Size, ORANGE, WHITE, YELLOW};

use super::{LayoutContext, TextExtent, MARGIN};

const TOC_TITLE: &str = "List of demo videos";
const TOC_FADE: f64 = 1.0;

/// Build the TOC as a single composite layer at canvas size, visible for
/// `display_duration` with a one-second fade-in and fade-out applied exactly
/// once at the group level.
pub fn build_toc(
    ctx: &LayoutContext,
    entries: &[ResolvedEntry],
    display_duration: f64,
) -> Layer {
    let canvas = ctx.canvas;
    let mut children = Vec::new();

    // Title row at twice the base font size.
    let title_size = ctx.font_size * 2;
    let title_extent = ctx.measure.measure(TOC_TITLE, title_size);
    children.push(text_cell(
        TOC_TITLE,
        title_size,
        ORANGE,
        centered_x(canvas, title_extent),
        MARGIN as i32,
        title_extent,
        display_duration,
    ));
    let mut offset_y = title_extent.height * 2 + MARGIN;

    // Header row.
    let header_extent = ctx.measure.measure("Ticket", ctx.font_size);
    children.push(text_cell(
        "Ticket",
        ctx.font_size,
        ORANGE,
        MARGIN as i32,
        offset_y as i32,
        header_extent,
        display_duration,
    ));
    let desc_extent = ctx.measure.measure("Description", ctx.font_size);
    children.push(text_cell(
        "Description",
        ctx.font_size,
        ORANGE,
        centered_x(canvas, desc_extent),
        offset_y as i32,
        desc_extent,
        display_duration,
    ));
    let len_extent = ctx.measure.measure("Length", ctx.font_size);
    children.push(text_cell(
        "Length",
        ctx.font_size,
        ORANGE,
        right_x(canvas, len_extent),
        offset_y as i32,
        len_extent,
        display_duration,
    ));
    offset_y += header_extent.height * 2 + MARGIN;

    // Pass 1: place ticket and length cells, measure descriptions, and track
    // the widest ticket column.
    let mut pending_descriptions: Vec<Layer> = Vec::new();
    let mut offset_x_middle = 0u32;

    for resolved in entries {
        let entry = &resolved.entry;
        if !entry.is_middle() || !entry.show_on_toc {
            continue;
        }

        let ticket = entry.ticket.as_deref().unwrap_or("-");
        let ticket_extent = ctx.measure.measure(ticket, ctx.font_size);
        children.push(text_cell(
            ticket,
            ctx.font_size,
            YELLOW,
            MARGIN as i32,
            offset_y as i32,
            ticket_extent,
            display_duration,
        ));

        let length = format!("{} sec", resolved.duration as u64);
        let length_extent = ctx.measure.measure(&length, ctx.font_size);
        children.push(text_cell(
            &length,
            ctx.font_size,
            YELLOW,
            right_x(canvas, length_extent),
            offset_y as i32,
            length_extent,
            display_duration,
        ));

        let description = entry.description.as_deref().unwrap_or("-");
        let description_extent = ctx.measure.measure(description, ctx.font_size);
        pending_descriptions.push(text_cell(
            description,
            ctx.font_size,
            WHITE,
            0,
            offset_y as i32,
            description_extent,
            display_duration,
        ));

        let row_height = ticket_extent
            .height
            .max(length_extent.height)
            .max(description_extent.height);
        offset_x_middle = offset_x_middle.max(ticket_extent.width + 2 * MARGIN);
        offset_y += row_height * 2 + MARGIN;
    }

    // Pass 2: align every description to the shared column boundary.
    for mut description in pending_descriptions {
        description.x = offset_x_middle as i32;
        children.push(description);
    }

    Layer {
        x: 0,
        y: 0,
        width: canvas.width,
        height: canvas.height,
        start: 0.0,
        duration: display_duration,
        fade_in: Some(TOC_FADE),
        fade_out: Some(TOC_FADE),
        content: LayerContent::Group { children },
    }
}

fn text_cell(
    text: &str,
    font_size: u32,
    color: Rgb,
    x: i32,
    y: i32,
    extent: TextExtent,
    duration: f64,
) -> Layer {
    Layer {
        x,
        y,
        width: extent.width,
        height: extent.height,
        start: 0.0,
        duration,
        fade_in: None,
        fade_out: None,
        content: LayerContent::Text {
            text: text.to_string(),
            font_size,
            color,
            background: None,
        },
    }
}

fn centered_x(canvas: Size, extent: TextExtent) -> i32 {
    ((canvas.width - extent.width.min(canvas.width)) / 2) as i32
}

fn right_x(canvas: Size, extent: TextExtent) -> i32 {
    canvas.width as i32 - MARGIN as i32 - extent.width as i32
}
