//! The engine: frame scheduling, layer compositing, settings stores and the
//! controller that ties the signal path to the renderers.

pub mod compositor;
pub mod controller;
pub mod scheduler;
pub mod settings;

pub use compositor::{Compositor, Scene};
pub use controller::{EngineConfig, EngineController, FALLBACK_MODE};
pub use scheduler::{FrameHandle, FrameScheduler, FrameTarget};
pub use settings::{
    AspectRatio, CanvasSettings, Preset, Resolution, SettingsStore, VisualizerSettings,
};
