//! Signal path between the analyser and the renderers: band shaping, then
//! temporal smoothing.

pub mod shaper;
pub mod smoother;

pub use shaper::{shape, shape_into, Band, BandWeights, MAX_MAGNITUDE};
pub use smoother::{TemporalSmoother, DEFAULT_SMOOTHING};
