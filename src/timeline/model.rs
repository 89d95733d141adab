//! Symbolic clip model for the composition pipeline.
//!
//! The pipeline never touches pixels. It assembles a value-level description
//! of the final video — clips made of trimmed or solid-color pieces, overlay
//! layers with concrete pixel rects and time windows — which the render
//! backend later lowers into a single encoder invocation.

use std::path::PathBuf;

/// Output frame dimensions in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

pub type Rgb = [u8; 3];

pub const WHITE: Rgb = [255, 255, 255];
pub const BLACK: Rgb = [0, 0, 0];
pub const RED: Rgb = [255, 0, 0];
pub const YELLOW: Rgb = [255, 255, 0];
pub const ORANGE: Rgb = [255, 165, 0];

/// Parse a color name or `#rrggbb` string; unknown values fall back to white.
pub fn parse_color(value: &str) -> Rgb {
    let value = value.trim();
    if let Some(hex) = value.strip_prefix('#') {
        if hex.len() == 6 {
            if let Ok(n) = u32::from_str_radix(hex, 16) {
                return [(n >> 16) as u8, (n >> 8) as u8, n as u8];
            }
        }
        return WHITE;
    }
    match value.to_ascii_lowercase().as_str() {
        "black" => BLACK,
        "red" => RED,
        "green" => [0, 128, 0],
        "blue" => [0, 0, 255],
        "yellow" => YELLOW,
        "orange" => ORANGE,
        _ => WHITE,
    }
}

/// One pre-rendered second of the countdown timer
#[derive(Debug, Clone, PartialEq)]
pub struct CountdownFrame {
    /// `MM:SS` of the remaining time at the start of this second
    pub text: String,
    pub width: u32,
    pub height: u32,
}

/// What a layer draws
#[derive(Debug, Clone, PartialEq)]
pub enum LayerContent {
    /// A text run, optionally on a solid badge background
    Text {
        text: String,
        font_size: u32,
        color: Rgb,
        background: Option<Rgb>,
    },
    /// A solid filled rectangle
    Bar { color: Rgb },
    /// An image file scaled to the layer rect
    Image { path: PathBuf },
    /// A sequence of one-second text badges sharing this layer's rect
    Countdown {
        font_size: u32,
        color: Rgb,
        background: Rgb,
        frames: Vec<CountdownFrame>,
    },
    /// Child layers positioned relative to this layer's origin, sharing its
    /// time window and fades
    Group { children: Vec<Layer> },
}

/// A positioned, time-bounded visual layer composited onto a clip.
///
/// Coordinates are canvas pixels with the origin at the top-left; `start` is
/// relative to the parent clip. Layers are composited back-to-front in list
/// order.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub start: f64,
    pub duration: f64,
    pub fade_in: Option<f64>,
    pub fade_out: Option<f64>,
    pub content: LayerContent,
}

impl Layer {
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

/// Where a video piece's frames come from
#[derive(Debug, Clone, PartialEq)]
pub enum PieceSource {
    /// A window of a source file, starting at `start` seconds into it
    Subclip { source: PathBuf, start: f64 },
    /// A solid color card
    Color { color: Rgb },
}

/// One contiguous stretch of video inside a prepared clip
#[derive(Debug, Clone, PartialEq)]
pub struct VideoPiece {
    pub source: PieceSource,
    pub duration: f64,
    pub fade_in: Option<f64>,
    pub fade_out: Option<f64>,
}

impl VideoPiece {
    pub fn subclip(source: PathBuf, start: f64, duration: f64) -> Self {
        Self {
            source: PieceSource::Subclip { source, start },
            duration,
            fade_in: None,
            fade_out: None,
        }
    }

    pub fn color(color: Rgb, duration: f64) -> Self {
        Self {
            source: PieceSource::Color { color },
            duration,
            fade_in: None,
            fade_out: None,
        }
    }
}

/// Audio for a prepared clip
#[derive(Debug, Clone, PartialEq)]
pub enum AudioTrack {
    /// Each subclip piece carries its own audio
    FollowVideo,
    /// A detached window of a single source laid over the whole clip; may be
    /// longer than the video after a splice
    Detached {
        source: PathBuf,
        start: f64,
        duration: f64,
    },
}

/// A fully laid-out entry: video pieces, overlay widgets, and audio, all at
/// canvas size. Built once per entry and never revisited.
#[derive(Debug, Clone)]
pub struct PreparedClip {
    /// Source file name, for logs and diagnostics
    pub label: String,
    pub canvas: Size,
    pub pieces: Vec<VideoPiece>,
    pub overlays: Vec<Layer>,
    pub audio: AudioTrack,
}

impl PreparedClip {
    pub fn video_duration(&self) -> f64 {
        self.pieces.iter().map(|p| p.duration).sum()
    }

    pub fn audio_duration(&self) -> f64 {
        match &self.audio {
            AudioTrack::FollowVideo => self
                .pieces
                .iter()
                .filter(|p| matches!(p.source, PieceSource::Subclip { .. }))
                .map(|p| p.duration)
                .sum(),
            AudioTrack::Detached { duration, .. } => *duration,
        }
    }
}

/// The concatenated program handed to the render backend
#[derive(Debug, Clone)]
pub struct FinalTimeline {
    pub canvas: Size,
    /// Clips in output order: opening, middles, closing
    pub clips: Vec<PreparedClip>,
    /// Optional watermark layer spanning the whole program
    pub watermark: Option<Layer>,
}

impl FinalTimeline {
    pub fn total_duration(&self) -> f64 {
        self.clips.iter().map(|c| c.video_duration()).sum()
    }
}
