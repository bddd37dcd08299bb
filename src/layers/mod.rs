//! Visual layers composited around the active render mode. Each layer's
//! config is plain serialisable data; the layer types hold the runtime state
//! (lazy images, particle positions, animation clock).

pub mod background;
pub mod overlay;
pub mod particles;

pub use background::{BackgroundConfig, BackgroundKind, BackgroundLayer, GradientStop, StoredBackgroundKind};
pub use overlay::{OverlayAnimation, OverlayConfig, OverlayLayer, OverlayPosition};
pub use particles::{Particle, ParticleConfig, ParticleField};
