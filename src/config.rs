use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::audio::analyser::DEFAULT_FFT_SIZE;
use crate::audio::source::SourceConfig;
use crate::engine::controller::EngineConfig;
use crate::render::modes::RenderModeId;
use crate::signal::smoother::DEFAULT_SMOOTHING;
use crate::tunnel::{GpuProvider, SoftwareProvider, UnavailableProvider, WgpuProvider};

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub canvas: CanvasConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub visualizer: VisualizerConfig,
    #[serde(default)]
    pub gpu: GpuConfig,
    #[serde(default)]
    pub fonts: FontsConfig,
}

#[derive(Debug, Deserialize)]
pub struct CanvasConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_dpr")]
    pub dpr: f32,
    #[serde(default = "default_fps")]
    pub fps: u32,
}

#[derive(Debug, Deserialize)]
pub struct AudioConfig {
    #[serde(default = "default_smoothing")]
    pub smoothing: f32,
    #[serde(default = "default_fft_size")]
    pub fft_size: usize,
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: u64,
}

#[derive(Debug, Deserialize)]
pub struct VisualizerConfig {
    #[serde(default)]
    pub mode: RenderModeId,
    #[serde(default = "default_gain")]
    pub sensitivity: f32,
    #[serde(default = "default_gain")]
    pub bass: f32,
    #[serde(default = "default_gain")]
    pub mid: f32,
    #[serde(default = "default_gain")]
    pub treble: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum GpuBackend {
    /// Hardware rendering through wgpu.
    #[default]
    Wgpu,
    /// CPU evaluation of the tunnel shader.
    Software,
    /// No 3D support.
    None,
}

impl GpuBackend {
    pub fn provider(self) -> Box<dyn GpuProvider> {
        match self {
            GpuBackend::Wgpu => Box::new(WgpuProvider),
            GpuBackend::Software => Box::new(SoftwareProvider),
            GpuBackend::None => Box::new(UnavailableProvider),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct GpuConfig {
    #[serde(default)]
    pub backend: GpuBackend,
}

#[derive(Debug, Default, Deserialize)]
pub struct FontsConfig {
    #[serde(default)]
    pub dirs: Vec<PathBuf>,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            dpr: default_dpr(),
            fps: default_fps(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            smoothing: default_smoothing(),
            fft_size: default_fft_size(),
            max_upload_mb: default_max_upload_mb(),
        }
    }
}

impl Default for VisualizerConfig {
    fn default() -> Self {
        Self {
            mode: RenderModeId::default(),
            sensitivity: default_gain(),
            bass: default_gain(),
            mid: default_gain(),
            treble: default_gain(),
        }
    }
}

fn default_width() -> u32 { 1280 }
fn default_height() -> u32 { 720 }
fn default_dpr() -> f32 { 1.0 }
fn default_fps() -> u32 { 30 }
fn default_smoothing() -> f32 { DEFAULT_SMOOTHING }
fn default_fft_size() -> usize { DEFAULT_FFT_SIZE }
fn default_max_upload_mb() -> u64 { 50 }
fn default_gain() -> f32 { 1.0 }

impl Config {
    /// Engine construction parameters from the file-level settings.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            width: self.canvas.width,
            height: self.canvas.height,
            dpr: self.canvas.dpr,
            source: SourceConfig {
                max_asset_bytes: self.audio.max_upload_mb.saturating_mul(1024 * 1024),
                fft_size: self.audio.fft_size,
            },
            smoothing: self.audio.smoothing,
            font_dirs: self.fonts.dirs.clone(),
        }
    }
}

pub fn load_config(path: &Path) -> Option<Config> {
    let content = std::fs::read_to_string(path).ok()?;
    toml::from_str(&content)
        .inspect_err(|e| log::warn!("Invalid config {}: {}", path.display(), e))
        .ok()
}

/// First existing config file: `./wavecraft.toml`, then
/// `~/.config/wavecraft/config.toml`, then the platform config directory.
pub fn find_config() -> Option<PathBuf> {
    let local = PathBuf::from("wavecraft.toml");
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("wavecraft").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("wavecraft").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}
