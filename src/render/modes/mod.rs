//! Render mode registry: one stateless draw procedure per 2D visual style.
//!
//! Every procedure reads only the snapshot it is handed and writes only to
//! the surface it is handed. The 3D tunnel has no entry here; it is driven by
//! [`crate::tunnel::TunnelEngine`].

mod bars;
mod glow;
mod radial;
mod scatter;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::surface::Surface;

/// Signature shared by every 2D render mode: surface, final snapshot,
/// logical width and height.
pub type DrawFn = fn(&mut dyn Surface, &[u8], f32, f32);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RenderModeId {
    #[default]
    CircularSpectrum,
    BarHorizontal,
    BarVertical,
    Waveform,
    RadialNeon,
    Particles,
    LofiGlow,
    #[serde(rename = "3d-tunnel")]
    Tunnel3d,
}

impl RenderModeId {
    pub const ALL: [RenderModeId; 8] = [
        RenderModeId::CircularSpectrum,
        RenderModeId::BarHorizontal,
        RenderModeId::BarVertical,
        RenderModeId::Waveform,
        RenderModeId::RadialNeon,
        RenderModeId::Particles,
        RenderModeId::LofiGlow,
        RenderModeId::Tunnel3d,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RenderModeId::CircularSpectrum => "circular-spectrum",
            RenderModeId::BarHorizontal => "bar-horizontal",
            RenderModeId::BarVertical => "bar-vertical",
            RenderModeId::Waveform => "waveform",
            RenderModeId::RadialNeon => "radial-neon",
            RenderModeId::Particles => "particles",
            RenderModeId::LofiGlow => "lofi-glow",
            RenderModeId::Tunnel3d => "3d-tunnel",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RenderModeId::CircularSpectrum => "Circular Spectrum",
            RenderModeId::BarHorizontal => "Horizontal Bars",
            RenderModeId::BarVertical => "Vertical Bars",
            RenderModeId::Waveform => "Waveform Line",
            RenderModeId::RadialNeon => "Radial Neon Ring",
            RenderModeId::Particles => "Particle Reactive",
            RenderModeId::LofiGlow => "Minimal Lo-Fi Glow",
            RenderModeId::Tunnel3d => "3D Tunnel (Heavy)",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            RenderModeId::CircularSpectrum => "Radial frequency bars",
            RenderModeId::BarHorizontal => "Classic equalizer",
            RenderModeId::BarVertical => "Vertical equalizer",
            RenderModeId::Waveform => "Smooth waveform",
            RenderModeId::RadialNeon => "Neon ring particles",
            RenderModeId::Particles => "Reactive particles",
            RenderModeId::LofiGlow => "Soft ambient glow",
            RenderModeId::Tunnel3d => "GPU 3D tunnel",
        }
    }

    /// True for the GPU-backed mode that has no 2D draw procedure.
    pub fn is_gpu(self) -> bool {
        self == RenderModeId::Tunnel3d
    }

    /// The 2D draw procedure for this mode.
    pub fn renderer(self) -> Option<DrawFn> {
        match self {
            RenderModeId::CircularSpectrum => Some(radial::circular_spectrum),
            RenderModeId::BarHorizontal => Some(bars::horizontal),
            RenderModeId::BarVertical => Some(bars::vertical),
            RenderModeId::Waveform => Some(glow::waveform),
            RenderModeId::RadialNeon => Some(radial::neon_ring),
            RenderModeId::Particles => Some(scatter::particles),
            RenderModeId::LofiGlow => Some(glow::lofi_glow),
            RenderModeId::Tunnel3d => None,
        }
    }
}

impl fmt::Display for RenderModeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown render mode '{0}'")]
pub struct UnknownModeError(pub String);

impl FromStr for RenderModeId {
    type Err = UnknownModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RenderModeId::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| UnknownModeError(s.to_string()))
    }
}

/// Normalised intensity (0.0-1.0) of slot `i` out of `count` slots spread
/// evenly over the snapshot: sample index `floor(i / count * n)`.
pub(crate) fn sample(data: &[u8], i: usize, count: usize) -> f32 {
    if data.is_empty() || count == 0 {
        return 0.0;
    }
    let index = (i * data.len() / count).min(data.len() - 1);
    data[index] as f32 / 255.0
}

/// Mean intensity of the whole snapshot, 0.0 when empty.
pub(crate) fn mean(data: &[u8]) -> f32 {
    if data.is_empty() {
        return 0.0;
    }
    let sum: u64 = data.iter().map(|&v| v as u64).sum();
    sum as f32 / data.len() as f32 / 255.0
}
