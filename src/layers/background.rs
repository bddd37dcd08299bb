use glam::Vec2;
use image::RgbaImage;
use serde::{Deserialize, Serialize};

use super::particles::ParticleConfig;
use crate::render::color::Color;
use crate::render::image::ImageSlot;
use crate::render::surface::{ColorStop, Paint, Rect, Surface};

pub const MIN_GRADIENT_STOPS: usize = 2;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackgroundKind {
    #[default]
    Solid,
    Gradient,
    Image,
}

/// Background type as found in stored settings and presets, including the
/// retired `particles` type (now a solid background plus the particle overlay).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StoredBackgroundKind {
    Solid,
    Gradient,
    Image,
    Particles,
}

impl StoredBackgroundKind {
    /// The live kind and whether the particle overlay must be switched on.
    pub fn resolve(self) -> (BackgroundKind, bool) {
        match self {
            StoredBackgroundKind::Solid => (BackgroundKind::Solid, false),
            StoredBackgroundKind::Gradient => (BackgroundKind::Gradient, false),
            StoredBackgroundKind::Image => (BackgroundKind::Image, false),
            StoredBackgroundKind::Particles => (BackgroundKind::Solid, true),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GradientStop {
    #[serde(default)]
    pub id: String,
    /// 0-100 along the gradient axis.
    pub position: f32,
    pub color: Color,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "StoredBackground")]
pub struct BackgroundConfig {
    #[serde(rename = "type")]
    pub kind: BackgroundKind,
    pub solid_color: Color,
    pub gradient_stops: Vec<GradientStop>,
    /// Degrees, 0 pointing right, increasing clockwise.
    pub gradient_angle: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(flatten)]
    pub particles: ParticleConfig,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct StoredBackground {
    #[serde(rename = "type")]
    kind: StoredBackgroundKind,
    solid_color: Color,
    gradient_stops: Vec<GradientStop>,
    gradient_angle: f32,
    image_url: Option<String>,
    #[serde(flatten)]
    particles: ParticleConfig,
}

impl Default for StoredBackground {
    fn default() -> Self {
        let live = BackgroundConfig::default();
        Self {
            kind: StoredBackgroundKind::Solid,
            solid_color: live.solid_color,
            gradient_stops: live.gradient_stops,
            gradient_angle: live.gradient_angle,
            image_url: live.image_url,
            particles: live.particles,
        }
    }
}

impl From<StoredBackground> for BackgroundConfig {
    fn from(stored: StoredBackground) -> Self {
        let (kind, force_particles) = stored.kind.resolve();
        let mut particles = stored.particles;
        particles.enabled |= force_particles;
        let mut config = Self {
            kind,
            solid_color: stored.solid_color,
            gradient_stops: stored.gradient_stops,
            gradient_angle: stored.gradient_angle,
            image_url: stored.image_url,
            particles,
        };
        config.sort_stops();
        config
    }
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            kind: BackgroundKind::Solid,
            solid_color: default_solid_color(),
            gradient_stops: default_gradient_stops(),
            gradient_angle: 135.0,
            image_url: None,
            particles: ParticleConfig::default(),
        }
    }
}

fn default_solid_color() -> Color {
    Color::from_rgba8(0x0a, 0x0a, 0x0f, 0xff)
}

fn default_gradient_stops() -> Vec<GradientStop> {
    vec![
        GradientStop {
            id: "stop-1".into(),
            position: 0.0,
            color: Color::from_rgba8(0x1a, 0x1a, 0x2e, 0xff),
        },
        GradientStop {
            id: "stop-2".into(),
            position: 100.0,
            color: Color::from_rgba8(0x16, 0x21, 0x3e, 0xff),
        },
    ]
}

impl BackgroundConfig {
    /// Add a white stop in the middle and return its id.
    pub fn add_gradient_stop(&mut self) -> String {
        let next = self
            .gradient_stops
            .iter()
            .filter_map(|s| s.id.strip_prefix("stop-")?.parse::<u64>().ok())
            .max()
            .unwrap_or(0)
            + 1;
        let id = format!("stop-{next}");
        self.gradient_stops.push(GradientStop {
            id: id.clone(),
            position: 50.0,
            color: Color::WHITE,
        });
        self.sort_stops();
        id
    }

    /// Remove a stop by id. Refused when it would leave fewer than two stops.
    pub fn remove_gradient_stop(&mut self, id: &str) -> bool {
        if self.gradient_stops.len() <= MIN_GRADIENT_STOPS {
            return false;
        }
        let before = self.gradient_stops.len();
        self.gradient_stops.retain(|s| s.id != id);
        self.gradient_stops.len() != before
    }

    pub fn update_gradient_stop(
        &mut self,
        id: &str,
        position: Option<f32>,
        color: Option<Color>,
    ) -> bool {
        let Some(stop) = self.gradient_stops.iter_mut().find(|s| s.id == id) else {
            return false;
        };
        if let Some(position) = position {
            stop.position = position.clamp(0.0, 100.0);
        }
        if let Some(color) = color {
            stop.color = color;
        }
        self.sort_stops();
        true
    }

    fn sort_stops(&mut self) {
        self.gradient_stops
            .sort_by(|a, b| a.position.total_cmp(&b.position));
    }
}

pub fn draw_solid(surface: &mut dyn Surface, width: f32, height: f32, color: Color) {
    surface.fill_rect(Rect::new(0.0, 0.0, width, height), &Paint::Solid(color));
}

/// Linear gradient through the centre at `angle_degrees`, spanning the
/// canvas extent along each axis.
pub fn draw_gradient(
    surface: &mut dyn Surface,
    width: f32,
    height: f32,
    stops: &[GradientStop],
    angle_degrees: f32,
) {
    let dir = Vec2::from_angle(angle_degrees.to_radians());
    let center = Vec2::new(width / 2.0, height / 2.0);
    let half = Vec2::new(dir.x * width / 2.0, dir.y * height / 2.0);

    let mut color_stops: Vec<ColorStop> = stops
        .iter()
        .map(|s| ColorStop {
            offset: (s.position / 100.0).clamp(0.0, 1.0),
            color: s.color,
        })
        .collect();
    color_stops.sort_by(|a, b| a.offset.total_cmp(&b.offset));

    let paint = Paint::Linear {
        start: center - half,
        end: center + half,
        stops: color_stops,
    };
    surface.fill_rect(Rect::new(0.0, 0.0, width, height), &paint);
}

/// Scale `image` to cover the whole canvas, centred and cropped.
pub fn draw_image_cover(surface: &mut dyn Surface, width: f32, height: f32, image: &RgbaImage) {
    let (iw, ih) = image.dimensions();
    if iw == 0 || ih == 0 || width <= 0.0 || height <= 0.0 {
        return;
    }
    let image_aspect = iw as f32 / ih as f32;
    let canvas_aspect = width / height;
    let dest = if image_aspect > canvas_aspect {
        let w = height * image_aspect;
        Rect::new((width - w) / 2.0, 0.0, w, height)
    } else {
        let h = width / image_aspect;
        Rect::new(0.0, (height - h) / 2.0, width, h)
    };
    surface.draw_image(image, dest, 1.0);
}

/// Background layer runtime: the lazily loaded image for `image` backgrounds.
#[derive(Default)]
pub struct BackgroundLayer {
    image: ImageSlot,
}

impl BackgroundLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn image_slot(&mut self) -> &mut ImageSlot {
        &mut self.image
    }

    /// Fully repaint the canvas. Image backgrounds fall back to the solid
    /// color until the image is available.
    pub fn draw(&mut self, surface: &mut dyn Surface, config: &BackgroundConfig, width: f32, height: f32) {
        match config.kind {
            BackgroundKind::Solid => draw_solid(surface, width, height, config.solid_color),
            BackgroundKind::Gradient => {
                draw_gradient(surface, width, height, &config.gradient_stops, config.gradient_angle)
            }
            BackgroundKind::Image => {
                self.image.set_reference(config.image_url.as_deref());
                match self.image.poll() {
                    Some(image) => {
                        // Cover-fit may leave nothing uncovered, but a
                        // transparent image still needs a base.
                        draw_solid(surface, width, height, config.solid_color);
                        draw_image_cover(surface, width, height, &image);
                    }
                    None => draw_solid(surface, width, height, config.solid_color),
                }
            }
        }
    }
}
