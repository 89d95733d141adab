use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;

const DEFAULT_FONT_SIZE: u32 = 22;
const DEFAULT_FADE: f64 = 1.0;
const DEFAULT_TOC_FADE_TIME: f64 = 5.0;

/// Explicit roles a video entry can take. Entries without a role are the
/// regular demo clips sandwiched between the opening and the closing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Opening,
    Closing,
}

/// One configured source clip and its metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct VideoEntry {
    /// Source file name, relative to the working directory
    pub video: String,

    /// Remote source; fetched when the local file is absent
    #[serde(rename = "youtube-url", default)]
    pub youtube_url: Option<String>,

    #[serde(rename = "type", default)]
    pub role: Option<Role>,

    #[serde(default)]
    pub ticket: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    /// Subclip start offset in seconds
    #[serde(default)]
    pub start: f64,

    /// Explicit subclip length in seconds; wins over the preview cap
    #[serde(default)]
    pub duration: Option<f64>,

    /// Render an audio-only entry as a solid color card of this RGB color
    #[serde(default)]
    pub background: Option<[u8; 3]>,

    #[serde(default)]
    pub title: Option<String>,

    /// Title text color; named color or #rrggbb
    #[serde(default)]
    pub color: Option<String>,

    #[serde(rename = "show duration", default = "default_true")]
    pub show_duration: bool,

    #[serde(rename = "show on toc", default = "default_true")]
    pub show_on_toc: bool,

    #[serde(rename = "show toc", default)]
    pub show_toc: bool,

    #[serde(default)]
    pub skip: bool,
}

impl VideoEntry {
    /// Entries without an explicit role make up the middle of the demo.
    pub fn is_middle(&self) -> bool {
        self.role.is_none()
    }
}

fn default_true() -> bool {
    true
}

fn default_height_ratio() -> f64 {
    0.1
}

/// Corner anchor for the watermark overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Corner {
    TopLeft,
    #[default]
    TopRight,
    BottomLeft,
    BottomRight,
}

/// Watermark descriptor: a remote or local image, its corner, and its size
/// relative to the canvas height.
#[derive(Debug, Clone, Deserialize)]
pub struct WatermarkConfig {
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub path: Option<String>,

    #[serde(default)]
    pub position: Corner,

    #[serde(rename = "height-ratio", default = "default_height_ratio")]
    pub height_ratio: f64,
}

/// On-disk configuration document, as written by the user.
#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(rename = "Sprint", default)]
    sprint: Option<String>,

    #[serde(rename = "Project", default)]
    project: Option<String>,

    #[serde(rename = "Author", default)]
    author: Option<String>,

    #[serde(rename = "Watermark", default)]
    watermark: Option<WatermarkConfig>,

    #[serde(rename = "Videos", default)]
    videos: Option<Vec<VideoEntry>>,

    #[serde(default)]
    txt_ticket_fontsize: Option<u32>,

    #[serde(default)]
    fadein: Option<f64>,

    #[serde(default)]
    fadeout: Option<f64>,

    #[serde(default)]
    toc_fade_time: Option<f64>,

    #[serde(default)]
    output: Option<String>,

    #[serde(default)]
    fontfile: Option<PathBuf>,
}

/// Validated run configuration. Built once before any media I/O and read-only
/// afterwards.
#[derive(Debug, Clone)]
pub struct Config {
    pub sprint: String,
    pub project: String,
    pub author: String,
    pub watermark: Option<WatermarkConfig>,
    pub font_size: u32,
    pub fadein: f64,
    pub fadeout: f64,
    pub toc_fade_time: f64,
    pub fontfile: Option<PathBuf>,
    pub output_file: String,
    /// Entries in document order, with skipped entries already removed
    pub entries: Vec<VideoEntry>,
}

impl Config {
    /// Load and validate the configuration document from the working directory.
    pub fn load(dir: &Path, file: &str) -> Result<Self, ConfigError> {
        let path = dir.join(file);
        let content =
            std::fs::read_to_string(&path).map_err(|_| ConfigError::FileNotFound {
                path: path.display().to_string(),
            })?;

        Self::from_yaml(&content, &path.display().to_string())
    }

    /// Parse and validate a configuration document.
    pub fn from_yaml(content: &str, origin: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig =
            serde_yaml::from_str(content).map_err(|e| ConfigError::ParseFailed {
                path: origin.to_string(),
                reason: e.to_string(),
            })?;

        let sprint = required_text(raw.sprint, "Sprint")?;
        let project = required_text(raw.project, "Project")?;
        let author = raw.author.unwrap_or_default();

        let entries: Vec<VideoEntry> = raw
            .videos
            .ok_or_else(|| ConfigError::MissingKey {
                key: "Videos".to_string(),
            })?
            .into_iter()
            .filter(|v| !v.skip)
            .collect();

        let output_file = raw
            .output
            .unwrap_or_else(|| output_file_name(&author, &sprint));

        let config = Self {
            sprint,
            project,
            author,
            watermark: raw.watermark,
            font_size: raw.txt_ticket_fontsize.unwrap_or(DEFAULT_FONT_SIZE),
            fadein: raw.fadein.unwrap_or(DEFAULT_FADE),
            fadeout: raw.fadeout.unwrap_or(DEFAULT_FADE),
            toc_fade_time: raw.toc_fade_time.unwrap_or(DEFAULT_TOC_FADE_TIME),
            fontfile: raw.fontfile,
            output_file,
            entries,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the run invariants: a non-empty entry list with exactly one
    /// opening and one closing video.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.entries.is_empty() {
            return Err(ConfigError::MissingKey {
                key: "Videos".to_string(),
            });
        }

        for (role, label) in [(Role::Opening, "opening"), (Role::Closing, "closing")] {
            let count = self
                .entries
                .iter()
                .filter(|v| v.role == Some(role))
                .count();
            if count != 1 {
                return Err(ConfigError::RoleCount {
                    role: label.to_string(),
                    count,
                });
            }
        }

        Ok(())
    }

    pub fn opening(&self) -> Option<&VideoEntry> {
        self.entries.iter().find(|v| v.role == Some(Role::Opening))
    }

    pub fn closing(&self) -> Option<&VideoEntry> {
        self.entries.iter().find(|v| v.role == Some(Role::Closing))
    }
}

fn required_text(value: Option<String>, key: &str) -> Result<String, ConfigError> {
    let value = value.ok_or_else(|| ConfigError::MissingKey {
        key: key.to_string(),
    })?;
    if value.trim().is_empty() {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value,
        });
    }
    Ok(value)
}

/// Derive the default output file name from author and sprint:
/// trimmed, lower-cased, spaces replaced with dashes.
pub fn output_file_name(author: &str, sprint: &str) -> String {
    let base = format!("{author}-sprint-demo-{sprint}");
    let base = base
        .trim()
        .trim_matches('-')
        .to_lowercase()
        .replace(' ', "-");
    format!("{base}.mp4")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_yaml() -> &'static str {
        r#"
Sprint: "S1"
Project: "P1"
Videos:
  - video: open.mp4
    type: opening
  - video: a.mp4
    ticket: T-1
    description: Did X
    duration: 5
  - video: close.mp4
    type: closing
"#
    }

    #[test]
    fn parses_minimal_config_with_defaults() {
        let config = Config::from_yaml(minimal_yaml(), "test").unwrap();
        assert_eq!(config.sprint, "S1");
        assert_eq!(config.project, "P1");
        assert_eq!(config.font_size, 22);
        assert_eq!(config.fadein, 1.0);
        assert_eq!(config.fadeout, 1.0);
        assert_eq!(config.toc_fade_time, 5.0);
        assert_eq!(config.entries.len(), 3);

        let middle = &config.entries[1];
        assert!(middle.is_middle());
        assert_eq!(middle.ticket.as_deref(), Some("T-1"));
        assert_eq!(middle.duration, Some(5.0));
        assert_eq!(middle.start, 0.0);
        assert!(middle.show_duration);
        assert!(middle.show_on_toc);
        assert!(!middle.show_toc);
    }

    #[test]
    fn flag_keys_with_spaces_are_honored() {
        let yaml = r#"
Sprint: S
Project: P
Videos:
  - video: open.mp4
    type: opening
    "show toc": true
  - video: a.mp4
    "show duration": false
    "show on toc": false
  - video: close.mp4
    type: closing
"#;
        let config = Config::from_yaml(yaml, "test").unwrap();
        assert!(config.entries[0].show_toc);
        assert!(!config.entries[1].show_duration);
        assert!(!config.entries[1].show_on_toc);
    }

    #[test]
    fn skipped_entries_are_removed_before_validation() {
        let yaml = r#"
Sprint: S
Project: P
Videos:
  - video: open.mp4
    type: opening
  - video: old-open.mp4
    type: opening
    skip: true
  - video: close.mp4
    type: closing
"#;
        let config = Config::from_yaml(yaml, "test").unwrap();
        assert_eq!(config.entries.len(), 2);
    }

    #[test]
    fn missing_opening_is_rejected() {
        let yaml = r#"
Sprint: S
Project: P
Videos:
  - video: a.mp4
  - video: close.mp4
    type: closing
"#;
        let err = Config::from_yaml(yaml, "test").unwrap_err();
        assert!(matches!(err, ConfigError::RoleCount { count: 0, .. }));
    }

    #[test]
    fn duplicate_closing_is_rejected() {
        let yaml = r#"
Sprint: S
Project: P
Videos:
  - video: open.mp4
    type: opening
  - video: close.mp4
    type: closing
  - video: close2.mp4
    type: closing
"#;
        let err = Config::from_yaml(yaml, "test").unwrap_err();
        assert!(matches!(err, ConfigError::RoleCount { count: 2, .. }));
    }

    #[test]
    fn blank_sprint_is_rejected() {
        let yaml = r#"
Sprint: "  "
Project: P
Videos:
  - video: open.mp4
    type: opening
  - video: close.mp4
    type: closing
"#;
        let err = Config::from_yaml(yaml, "test").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn missing_videos_key_is_rejected() {
        let err = Config::from_yaml("Sprint: S\nProject: P\n", "test").unwrap_err();
        assert!(matches!(err, ConfigError::MissingKey { .. }));
    }

    #[test]
    fn output_name_is_normalized() {
        assert_eq!(
            output_file_name("Team Rocket", "Sprint 42"),
            "team-rocket-sprint-demo-sprint-42.mp4"
        );
        assert_eq!(output_file_name("", "S1"), "sprint-demo-s1.mp4");
    }

    #[test]
    fn explicit_output_name_wins() {
        let yaml = r#"
Sprint: S
Project: P
output: final.mp4
Videos:
  - video: open.mp4
    type: opening
  - video: close.mp4
    type: closing
"#;
        let config = Config::from_yaml(yaml, "test").unwrap();
        assert_eq!(config.output_file, "final.mp4");
    }

    #[test]
    fn watermark_defaults() {
        let yaml = r#"
Sprint: S
Project: P
Watermark:
  url: https://example.com/logo.png
Videos:
  - video: open.mp4
    type: opening
  - video: close.mp4
    type: closing
"#;
        let config = Config::from_yaml(yaml, "test").unwrap();
        let wm = config.watermark.unwrap();
        assert_eq!(wm.position, Corner::TopRight);
        assert_eq!(wm.height_ratio, 0.1);
    }

    #[test]
    fn background_color_triple_is_parsed() {
        let yaml = r#"
Sprint: S
Project: P
Videos:
  - video: open.mp4
    type: opening
  - video: audio-only.mp4
    background: [16, 24, 32]
  - video: close.mp4
    type: closing
"#;
        let config = Config::from_yaml(yaml, "test").unwrap();
        assert_eq!(config.entries[1].background, Some([16, 24, 32]));
    }
}
