//! The symbolic timeline: clip model, canvas negotiation, TOC splice, and
//! watermark placement.

pub mod assembler;
pub mod model;
pub mod splice;
pub mod watermark;

pub use assembler::{prepare, resolve_entries, ResolvedEntry};
pub use model::{FinalTimeline, Layer, PreparedClip, Size};
