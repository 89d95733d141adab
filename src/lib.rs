//! # Sprint-Stitcher
//!
//! Assemble a sequence of short screen-recording clips into a single narrated
//! sprint demo video: per-clip metadata overlays (ticket, description,
//! countdown), a generated table of contents spliced into the opening clip,
//! chapter-aware concatenation, and a burned-in watermark.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sprint_stitcher::{config::Config, StitchEngine};
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let dir = std::path::PathBuf::from("videos/");
//! let config = Config::load(&dir, "config.yml")?;
//! let engine = StitchEngine::new(dir, config, None)?;
//! let report = engine.run().await?;
//! println!("wrote {}", report.output.display());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`config`] - YAML configuration loading and validation
//! - [`media`] - external collaborators: probing, transcoding, downloads
//! - [`layout`] - pixel layout of overlay widgets and the table of contents
//! - [`timeline`] - the symbolic clip model, canvas negotiation, TOC splice
//! - [`composition`] - the pipeline engine and chapter bookkeeping
//! - [`render`] - lowering the timeline into one external encoder run
//!
//! The pipeline itself never decodes or rasterizes anything; it builds a
//! value-level timeline and hands it to ffmpeg in a single invocation.

pub mod composition;
pub mod config;
pub mod error;
pub mod layout;
pub mod media;
pub mod render;
pub mod timeline;

// Re-export commonly used types for convenience
pub use crate::{
    composition::{StitchEngine, StitchReport},
    config::Config,
    error::{Result, StitchError},
};
