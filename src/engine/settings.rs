//! Configuration stores. The UI layer publishes changes; the engine keeps its
//! own authoritative copy. Each store round-trips through a JSON string that
//! an outer persistence layer stores opaquely.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::SettingsError;
use crate::layers::background::{BackgroundConfig, GradientStop, StoredBackgroundKind};
use crate::layers::overlay::{OverlayAnimation, OverlayConfig, OverlayPosition};
use crate::layers::particles::ParticleConfig;
use crate::render::color::Color;
use crate::render::modes::RenderModeId;
use crate::signal::shaper::BandWeights;
use crate::signal::smoother::DEFAULT_SMOOTHING;

/// JSON persistence for a settings store. A payload that fails to parse
/// leaves the store untouched.
pub trait SettingsStore: Serialize + DeserializeOwned {
    const NAME: &'static str;

    fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string(self)?)
    }

    fn apply_json(&mut self, data: &str) -> Result<(), SettingsError> {
        match serde_json::from_str::<Self>(data) {
            Ok(parsed) => {
                *self = parsed;
                Ok(())
            }
            Err(err) => {
                log::warn!("Failed to deserialize {} settings: {}", Self::NAME, err);
                Err(err.into())
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VisualizerSettings {
    pub mode: RenderModeId,
    pub sensitivity: f32,
    pub bass_multiplier: f32,
    pub mid_multiplier: f32,
    pub treble_multiplier: f32,
    pub smoothing: f32,
}

impl Default for VisualizerSettings {
    fn default() -> Self {
        Self {
            mode: RenderModeId::CircularSpectrum,
            sensitivity: 1.0,
            bass_multiplier: 1.0,
            mid_multiplier: 1.0,
            treble_multiplier: 1.0,
            smoothing: DEFAULT_SMOOTHING,
        }
    }
}

impl VisualizerSettings {
    pub fn weights(&self) -> BandWeights {
        BandWeights {
            bass: self.bass_multiplier,
            mid: self.mid_multiplier,
            treble: self.treble_multiplier,
            sensitivity: self.sensitivity,
        }
    }
}

impl SettingsStore for VisualizerSettings {
    const NAME: &'static str = "visualizer";
}

impl SettingsStore for BackgroundConfig {
    const NAME: &'static str = "background";
}

impl SettingsStore for OverlayConfig {
    const NAME: &'static str = "overlay";
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "9:16")]
    Portrait,
    #[serde(rename = "1:1")]
    Square,
}

impl AspectRatio {
    pub fn resolution(self) -> Resolution {
        match self {
            AspectRatio::Landscape => Resolution { width: 1280, height: 720 },
            AspectRatio::Portrait => Resolution { width: 1080, height: 1920 },
            AspectRatio::Square => Resolution { width: 1080, height: 1080 },
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

/// Output canvas shape. A stored aspect ratio without a resolution takes the
/// preset resolution for that ratio.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "StoredCanvas")]
pub struct CanvasSettings {
    pub aspect_ratio: AspectRatio,
    pub resolution: Resolution,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredCanvas {
    #[serde(default)]
    aspect_ratio: AspectRatio,
    resolution: Option<Resolution>,
}

impl From<StoredCanvas> for CanvasSettings {
    fn from(stored: StoredCanvas) -> Self {
        Self {
            aspect_ratio: stored.aspect_ratio,
            resolution: stored
                .resolution
                .unwrap_or_else(|| stored.aspect_ratio.resolution()),
        }
    }
}

impl Default for CanvasSettings {
    fn default() -> Self {
        AspectRatio::default().into()
    }
}

impl From<AspectRatio> for CanvasSettings {
    fn from(aspect_ratio: AspectRatio) -> Self {
        Self {
            aspect_ratio,
            resolution: aspect_ratio.resolution(),
        }
    }
}

impl CanvasSettings {
    pub fn set_aspect_ratio(&mut self, aspect_ratio: AspectRatio) {
        *self = aspect_ratio.into();
    }
}

impl SettingsStore for CanvasSettings {
    const NAME: &'static str = "canvas";
}

/// A partial settings bundle. Absent fields leave the current value alone.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preset {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visualizer: Option<VisualizerPreset>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<BackgroundPreset>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overlay: Option<OverlayPreset>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub particles: Option<ParticlesPreset>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualizerPreset {
    pub mode: RenderModeId,
    pub sensitivity: Option<f32>,
    pub bass_multiplier: Option<f32>,
    pub mid_multiplier: Option<f32>,
    pub treble_multiplier: Option<f32>,
}

impl VisualizerPreset {
    /// Gains only; the mode goes through the controller's fallback policy.
    pub fn apply_gains(&self, settings: &mut VisualizerSettings) {
        if let Some(v) = self.sensitivity {
            settings.sensitivity = v;
        }
        if let Some(v) = self.bass_multiplier {
            settings.bass_multiplier = v;
        }
        if let Some(v) = self.mid_multiplier {
            settings.mid_multiplier = v;
        }
        if let Some(v) = self.treble_multiplier {
            settings.treble_multiplier = v;
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackgroundPreset {
    #[serde(rename = "type")]
    pub kind: Option<StoredBackgroundKind>,
    pub solid_color: Option<Color>,
    pub gradient_stops: Option<Vec<GradientStop>>,
    pub gradient_angle: Option<f32>,
    pub particles_enabled: Option<bool>,
    pub particles_density: Option<u32>,
    pub particles_intensity: Option<u32>,
}

impl BackgroundPreset {
    pub fn apply_to(&self, config: &mut BackgroundConfig) {
        if let Some(kind) = self.kind {
            let (live, force_particles) = kind.resolve();
            config.kind = live;
            if force_particles {
                config.particles.enabled = true;
            }
        }
        if let Some(color) = self.solid_color {
            config.solid_color = color;
        }
        if let Some(stops) = &self.gradient_stops {
            config.gradient_stops = stops.clone();
            config
                .gradient_stops
                .sort_by(|a, b| a.position.total_cmp(&b.position));
        }
        if let Some(angle) = self.gradient_angle {
            config.gradient_angle = angle;
        }
        if let Some(enabled) = self.particles_enabled {
            config.particles.enabled = enabled;
        }
        if let Some(density) = self.particles_density {
            config.particles.density = density;
        }
        if let Some(intensity) = self.particles_intensity {
            config.particles.intensity = intensity;
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OverlayPreset {
    pub font: Option<String>,
    pub position: Option<OverlayPosition>,
    pub size: Option<f32>,
    pub animation: Option<OverlayAnimation>,
}

impl OverlayPreset {
    pub fn apply_to(&self, config: &mut OverlayConfig) {
        if let Some(font) = self.font.as_ref().filter(|f| !f.is_empty()) {
            config.font = font.clone();
        }
        if let Some(position) = self.position {
            config.position = position;
        }
        if let Some(size) = self.size {
            config.size = size;
        }
        if let Some(animation) = self.animation {
            config.animation = animation;
        }
    }
}

/// Shorthand particle block, applied after the background block.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParticlesPreset {
    pub enabled: bool,
    pub density: u32,
    pub intensity: u32,
}

impl ParticlesPreset {
    pub fn apply_to(&self, config: &mut ParticleConfig) {
        config.enabled = self.enabled;
        config.density = self.density;
        config.intensity = self.intensity;
    }
}

impl Preset {
    pub fn from_json(data: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::background::BackgroundKind;

    #[test]
    fn visualizer_settings_round_trip_in_camel_case() {
        let settings = VisualizerSettings {
            mode: RenderModeId::Tunnel3d,
            bass_multiplier: 2.0,
            ..VisualizerSettings::default()
        };
        let json = settings.to_json().unwrap();
        assert!(json.contains("\"mode\":\"3d-tunnel\""));
        assert!(json.contains("\"bassMultiplier\":2.0"));

        let mut restored = VisualizerSettings::default();
        restored.apply_json(&json).unwrap();
        assert_eq!(restored, settings);
        assert_eq!(restored.weights().bass, 2.0);
    }

    #[test]
    fn malformed_json_leaves_store_unchanged() {
        let mut overlay = OverlayConfig {
            title: "Keep".into(),
            ..OverlayConfig::default()
        };
        assert!(overlay.apply_json("{not json").is_err());
        assert_eq!(overlay.title, "Keep");

        let mut visualizer = VisualizerSettings::default();
        assert!(visualizer.apply_json(r#"{"mode":"hologram"}"#).is_err());
        assert_eq!(visualizer.mode, RenderModeId::CircularSpectrum);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let mut settings = VisualizerSettings {
            sensitivity: 2.5,
            ..VisualizerSettings::default()
        };
        settings.apply_json(r#"{"mode":"waveform"}"#).unwrap();
        assert_eq!(settings.mode, RenderModeId::Waveform);
        assert_eq!(settings.sensitivity, 1.0);
        assert_eq!(settings.smoothing, DEFAULT_SMOOTHING);
    }

    #[test]
    fn canvas_resolution_follows_aspect_preset() {
        let mut canvas = CanvasSettings::default();
        assert_eq!(canvas.resolution, Resolution { width: 1280, height: 720 });
        canvas.apply_json(r#"{"aspectRatio":"9:16"}"#).unwrap();
        assert_eq!(canvas.resolution, Resolution { width: 1080, height: 1920 });
        canvas
            .apply_json(r#"{"aspectRatio":"1:1","resolution":{"width":512,"height":512}}"#)
            .unwrap();
        assert_eq!(canvas.aspect_ratio, AspectRatio::Square);
        assert_eq!(canvas.resolution.width, 512);
        canvas.set_aspect_ratio(AspectRatio::Landscape);
        assert_eq!(canvas, CanvasSettings::default());
    }

    #[test]
    fn legacy_particles_preset_enables_overlay() {
        let preset = Preset::from_json(
            r##"{"background":{"type":"particles","solidColor":"#000000","particlesDensity":70}}"##,
        )
        .unwrap();
        let mut background = BackgroundConfig::default();
        preset.background.unwrap().apply_to(&mut background);
        assert_eq!(background.kind, BackgroundKind::Solid);
        assert!(background.particles.enabled);
        assert_eq!(background.particles.density, 70);
        assert_eq!(background.solid_color, Color::BLACK);
    }

    #[test]
    fn partial_overlay_preset_keeps_text() {
        let mut overlay = OverlayConfig {
            title: "Title".into(),
            ..OverlayConfig::default()
        };
        let preset = Preset::from_json(r#"{"overlay":{"position":"top-right","size":40}}"#).unwrap();
        preset.overlay.unwrap().apply_to(&mut overlay);
        assert_eq!(overlay.title, "Title");
        assert_eq!(overlay.position, OverlayPosition::TopRight);
        assert_eq!(overlay.size, 40.0);
        assert_eq!(overlay.font, "Inter");
    }

    #[test]
    fn visualizer_preset_applies_only_present_gains() {
        let preset = Preset::from_json(
            r#"{"visualizer":{"mode":"radial-neon","sensitivity":1.2,"bassMultiplier":1.5}}"#,
        )
        .unwrap();
        let visualizer = preset.visualizer.unwrap();
        assert_eq!(visualizer.mode, RenderModeId::RadialNeon);
        let mut settings = VisualizerSettings {
            treble_multiplier: 0.3,
            ..VisualizerSettings::default()
        };
        visualizer.apply_gains(&mut settings);
        assert_eq!(settings.sensitivity, 1.2);
        assert_eq!(settings.bass_multiplier, 1.5);
        assert_eq!(settings.treble_multiplier, 0.3);
    }
}
