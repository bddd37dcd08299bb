//! Real-time audio-reactive visualizer engine.
//!
//! Audio is decoded and analysed into per-frame frequency snapshots
//! ([`audio`]), shaped and smoothed ([`signal`]), then drawn by one of the
//! render modes ([`render::modes`]) or the GPU tunnel ([`tunnel`]) with
//! background, particle and overlay layers around it ([`layers`]).
//! [`engine::EngineController`] drives all of it from an explicit frame
//! scheduler.

pub mod audio;
pub mod config;
pub mod engine;
pub mod error;
pub mod layers;
pub mod render;
pub mod signal;
pub mod tunnel;

pub use engine::{EngineConfig, EngineController};
pub use error::{GpuError, ImageLoadError, SettingsError, SourceError};
pub use render::RenderModeId;
