//! Lowers a final timeline into a single ffmpeg `-filter_complex` invocation.
//!
//! Every clip becomes a chain of trimmed or generated pieces padded to the
//! canvas, its overlay widgets become drawtext/drawbox/overlay stages with
//! `enable` windows, clips are stream-concatenated, and the watermark goes on
//! top of the concatenated program. The compiler is pure string assembly;
//! running the result is the encoder's job.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::layout::{BORDER, TEXT_PAD};
use crate::timeline::model::{
    AudioTrack, CountdownFrame, FinalTimeline, Layer, LayerContent, PieceSource, PreparedClip,
    Rgb, Size, VideoPiece,
};

const OUTPUT_FPS: u32 = 30;
const AUDIO_RATE: u32 = 44100;

pub struct FfmpegCompiler {
    canvas: Size,
    fontfile: Option<PathBuf>,
}

/// Deduplicated `-i` inputs in first-use order
#[derive(Default)]
struct InputMap {
    paths: Vec<PathBuf>,
    index: HashMap<PathBuf, usize>,
}

impl InputMap {
    fn add(&mut self, path: &Path) -> usize {
        if let Some(&idx) = self.index.get(path) {
            return idx;
        }
        let idx = self.paths.len();
        self.paths.push(path.to_path_buf());
        self.index.insert(path.to_path_buf(), idx);
        idx
    }
}

/// A layer with group nesting resolved: absolute position, the effective time
/// window, and the fades that apply to it.
struct FlatLayer<'a> {
    x: i32,
    y: i32,
    width: u32,
    height: u32,
    start: f64,
    duration: f64,
    fade_in: Option<f64>,
    fade_out: Option<f64>,
    content: &'a LayerContent,
}

fn flatten_into<'a>(
    layer: &'a Layer,
    dx: i32,
    dy: i32,
    inherited: Option<(f64, f64, Option<f64>, Option<f64>)>,
    out: &mut Vec<FlatLayer<'a>>,
) {
    let (start, duration, fade_in, fade_out) =
        inherited.unwrap_or((layer.start, layer.duration, layer.fade_in, layer.fade_out));

    match &layer.content {
        LayerContent::Group { children } => {
            for child in children {
                flatten_into(
                    child,
                    dx + layer.x,
                    dy + layer.y,
                    Some((start, duration, fade_in, fade_out)),
                    out,
                );
            }
        }
        content => out.push(FlatLayer {
            x: dx + layer.x,
            y: dy + layer.y,
            width: layer.width,
            height: layer.height,
            start,
            duration,
            fade_in,
            fade_out,
            content,
        }),
    }
}

impl FfmpegCompiler {
    pub fn new(canvas: Size, fontfile: Option<PathBuf>) -> Self {
        Self { canvas, fontfile }
    }

    /// Compile the timeline into a full ffmpeg argument list.
    pub fn compile(&self, timeline: &FinalTimeline, output: &Path) -> Vec<String> {
        let mut inputs = InputMap::default();
        let mut filters: Vec<String> = Vec::new();
        let mut seq = 0usize;
        let mut pairs = Vec::with_capacity(timeline.clips.len());

        for (ci, clip) in timeline.clips.iter().enumerate() {
            let video = self.emit_clip_video(&mut filters, &mut inputs, ci, clip, &mut seq);
            let audio = self.emit_clip_audio(&mut filters, &mut inputs, ci, clip);
            pairs.push((video, audio));
        }

        let concat_inputs: String = pairs
            .iter()
            .map(|(v, a)| format!("[{v}][{a}]"))
            .collect();
        filters.push(format!(
            "{concat_inputs}concat=n={}:v=1:a=1[vcat][acat]",
            pairs.len()
        ));

        let mut final_video = "vcat".to_string();
        if let Some(watermark) = &timeline.watermark {
            let mut flat = Vec::new();
            flatten_into(watermark, 0, 0, None, &mut flat);
            for layer in &flat {
                final_video =
                    self.emit_layer(&mut filters, &mut inputs, &final_video, layer, &mut seq);
            }
        }

        let mut args: Vec<String> = Vec::new();
        for path in &inputs.paths {
            args.push("-i".to_string());
            args.push(path.display().to_string());
        }
        args.push("-filter_complex".to_string());
        args.push(filters.join(";"));
        args.push("-map".to_string());
        args.push(format!("[{final_video}]"));
        args.push("-map".to_string());
        args.push("[acat]".to_string());
        args.push("-c:v".to_string());
        args.push("libx264".to_string());
        args.push("-c:a".to_string());
        args.push("aac".to_string());
        args.push("-y".to_string());
        args.push(output.display().to_string());
        args
    }

    fn emit_clip_video(
        &self,
        filters: &mut Vec<String>,
        inputs: &mut InputMap,
        ci: usize,
        clip: &PreparedClip,
        seq: &mut usize,
    ) -> String {
        let Size { width, height } = self.canvas;
        let mut piece_labels = Vec::with_capacity(clip.pieces.len());

        for (pi, piece) in clip.pieces.iter().enumerate() {
            let label = format!("c{ci}p{pi}");
            let fades = piece_fades(piece);
            match &piece.source {
                PieceSource::Subclip { source, start } => {
                    let idx = inputs.add(source);
                    filters.push(format!(
                        "[{idx}:v]trim=start={start}:end={end},setpts=PTS-STARTPTS,\
                         fps={OUTPUT_FPS},format=yuv420p,pad={width}:{height}:0:0:color=black,\
                         setsar=1{fades}[{label}]",
                        end = start + piece.duration,
                    ));
                }
                PieceSource::Color { color } => {
                    filters.push(format!(
                        "color=c=0x{}:s={width}x{height}:r={OUTPUT_FPS}:d={duration},\
                         format=yuv420p{fades}[{label}]",
                        hex(*color),
                        duration = piece.duration,
                    ));
                }
            }
            piece_labels.push(label);
        }

        let mut current = if piece_labels.len() == 1 {
            piece_labels.remove(0)
        } else {
            let joined: String = piece_labels.iter().map(|l| format!("[{l}]")).collect();
            let label = format!("c{ci}v");
            filters.push(format!(
                "{joined}concat=n={}:v=1:a=0[{label}]",
                piece_labels.len()
            ));
            label
        };

        let mut flat = Vec::new();
        for layer in &clip.overlays {
            flatten_into(layer, 0, 0, None, &mut flat);
        }
        for layer in &flat {
            current = self.emit_layer(filters, inputs, &current, layer, seq);
        }

        current
    }

    fn emit_clip_audio(
        &self,
        filters: &mut Vec<String>,
        inputs: &mut InputMap,
        ci: usize,
        clip: &PreparedClip,
    ) -> String {
        let label = format!("c{ci}a");
        match &clip.audio {
            AudioTrack::Detached {
                source,
                start,
                duration,
            } => {
                let idx = inputs.add(source);
                filters.push(format!(
                    "[{idx}:a]atrim=start={start}:end={end},asetpts=PTS-STARTPTS,\
                     aformat=sample_rates={AUDIO_RATE}:channel_layouts=stereo[{label}]",
                    end = start + duration,
                ));
                label
            }
            AudioTrack::FollowVideo => {
                let mut part_labels = Vec::with_capacity(clip.pieces.len());
                for (pi, piece) in clip.pieces.iter().enumerate() {
                    let part = format!("c{ci}a{pi}");
                    match &piece.source {
                        PieceSource::Subclip { source, start } => {
                            let idx = inputs.add(source);
                            filters.push(format!(
                                "[{idx}:a]atrim=start={start}:end={end},asetpts=PTS-STARTPTS,\
                                 aformat=sample_rates={AUDIO_RATE}:channel_layouts=stereo[{part}]",
                                end = start + piece.duration,
                            ));
                        }
                        PieceSource::Color { .. } => {
                            filters.push(format!(
                                "anullsrc=r={AUDIO_RATE}:cl=stereo:d={duration}[{part}]",
                                duration = piece.duration,
                            ));
                        }
                    }
                    part_labels.push(part);
                }
                if part_labels.len() == 1 {
                    part_labels.remove(0)
                } else {
                    let joined: String = part_labels.iter().map(|l| format!("[{l}]")).collect();
                    filters.push(format!(
                        "{joined}concat=n={}:v=0:a=1[{label}]",
                        part_labels.len()
                    ));
                    label
                }
            }
        }
    }

    fn emit_layer(
        &self,
        filters: &mut Vec<String>,
        inputs: &mut InputMap,
        current: &str,
        layer: &FlatLayer,
        seq: &mut usize,
    ) -> String {
        *seq += 1;
        let out = format!("ov{seq}");
        let window = (layer.start, layer.start + layer.duration);

        match layer.content {
            LayerContent::Text {
                text,
                font_size,
                color,
                background,
            } => {
                let stage = self.drawtext(
                    text,
                    *font_size,
                    *color,
                    *background,
                    layer.x,
                    layer.y,
                    window,
                    layer.fade_in,
                    layer.fade_out,
                );
                filters.push(format!("[{current}]{stage}[{out}]"));
            }
            LayerContent::Bar { color } => {
                filters.push(format!(
                    "[{current}]drawbox=x={x}:y={y}:w={w}:h={h}:color=0x{color}@1:t=fill:\
                     enable='between(t,{s},{e})'[{out}]",
                    x = layer.x,
                    y = layer.y,
                    w = layer.width,
                    h = layer.height,
                    color = hex(*color),
                    s = window.0,
                    e = window.1,
                ));
            }
            LayerContent::Countdown {
                font_size,
                color,
                background,
                frames,
            } => {
                let stages = self.countdown_stages(
                    frames, *font_size, *color, *background, layer.x, layer.y, window,
                );
                filters.push(format!("[{current}]{}[{out}]", stages.join(",")));
            }
            LayerContent::Image { path } => {
                let idx = inputs.add(path);
                let scaled = format!("img{seq}");
                filters.push(format!(
                    "[{idx}:v]format=rgba,scale={w}:{h}[{scaled}]",
                    w = layer.width,
                    h = layer.height,
                ));
                filters.push(format!(
                    "[{current}][{scaled}]overlay=x={x}:y={y}:enable='between(t,{s},{e})'[{out}]",
                    x = layer.x,
                    y = layer.y,
                    s = window.0,
                    e = window.1,
                ));
            }
            // Groups were flattened before emission.
            LayerContent::Group { .. } => return current.to_string(),
        }

        out
    }

    fn countdown_stages(
        &self,
        frames: &[CountdownFrame],
        font_size: u32,
        color: Rgb,
        background: Rgb,
        x: i32,
        y: i32,
        window: (f64, f64),
    ) -> Vec<String> {
        let mut stages = Vec::with_capacity(frames.len());
        for (i, frame) in frames.iter().enumerate() {
            let frame_start = window.0 + i as f64;
            if frame_start >= window.1 {
                break;
            }
            let frame_end = (frame_start + 1.0).min(window.1);
            stages.push(self.drawtext(
                &frame.text,
                font_size,
                color,
                Some(background),
                x,
                y,
                (frame_start, frame_end),
                None,
                None,
            ));
        }
        stages
    }

    #[allow(clippy::too_many_arguments)]
    fn drawtext(
        &self,
        text: &str,
        font_size: u32,
        color: Rgb,
        background: Option<Rgb>,
        x: i32,
        y: i32,
        window: (f64, f64),
        fade_in: Option<f64>,
        fade_out: Option<f64>,
    ) -> String {
        let pad = (TEXT_PAD / 2 + BORDER) as i32;
        let (text_x, text_y) = if background.is_some() {
            (x + pad, y + pad)
        } else {
            (x, y)
        };

        let mut stage = format!("drawtext=text='{}'", escape_drawtext(text));
        if let Some(fontfile) = &self.fontfile {
            stage.push_str(&format!(":fontfile={}", fontfile.display()));
        }
        stage.push_str(&format!(":fontsize={font_size}:fontcolor=0x{}", hex(color)));
        if let Some(bg) = background {
            stage.push_str(&format!(":box=1:boxcolor=0x{}:boxborderw={pad}", hex(bg)));
        }
        if let Some(alpha) = fade_alpha(window, fade_in, fade_out) {
            stage.push_str(&format!(":alpha='{alpha}'"));
        }
        stage.push_str(&format!(
            ":x={text_x}:y={text_y}:enable='between(t,{},{})'",
            window.0, window.1
        ));
        stage
    }
}

fn piece_fades(piece: &VideoPiece) -> String {
    let mut fades = String::new();
    if let Some(f) = piece.fade_in {
        fades.push_str(&format!(",fade=t=in:st=0:d={f}"));
    }
    if let Some(f) = piece.fade_out {
        fades.push_str(&format!(
            ",fade=t=out:st={}:d={f}",
            (piece.duration - f).max(0.0)
        ));
    }
    fades
}

/// Per-frame opacity ramp for layer fades, evaluated by drawtext.
fn fade_alpha(
    window: (f64, f64),
    fade_in: Option<f64>,
    fade_out: Option<f64>,
) -> Option<String> {
    let (start, end) = window;
    let rise = fade_in.map(|f| format!("if(lt(t,{}),(t-{start})/{f},1)", start + f));
    let fall = fade_out.map(|f| format!("if(gt(t,{}),({end}-t)/{f},1)", end - f));
    match (rise, fall) {
        (Some(rise), Some(fall)) => Some(format!("min({rise},{fall})")),
        (Some(rise), None) => Some(rise),
        (None, Some(fall)) => Some(fall),
        (None, None) => None,
    }
}

fn hex(color: Rgb) -> String {
    format!("{:02x}{:02x}{:02x}", color[0], color[1], color[2])
}

fn escape_drawtext(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' | '\'' | ':' | ',' | '%' => {
                out.push('\\');
                out.push(ch);
            }
            _ => out.push(ch),
        }
    }
    out
}
