use glam::Vec2;
use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::render::color::Color;
use crate::render::image::ImageSlot;
use crate::render::surface::{Rect, Shadow, Surface, TextAlign, TextBaseline, TextStyle};

const PADDING: f32 = 20.0;
const ANIMATION_SECONDS: f64 = 1.0;
const SLIDE_DISTANCE: f32 = 50.0;
const LOGO_MAX_FRACTION: f32 = 0.15;
pub const WATERMARK_TEXT: &str = "WaveCraft Pro";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverlayPosition {
    TopLeft,
    TopCenter,
    TopRight,
    #[default]
    BottomLeft,
    BottomCenter,
    BottomRight,
}

impl OverlayPosition {
    fn align(self) -> TextAlign {
        match self {
            OverlayPosition::TopLeft | OverlayPosition::BottomLeft => TextAlign::Left,
            OverlayPosition::TopCenter | OverlayPosition::BottomCenter => TextAlign::Center,
            OverlayPosition::TopRight | OverlayPosition::BottomRight => TextAlign::Right,
        }
    }

    fn is_bottom(self) -> bool {
        matches!(
            self,
            OverlayPosition::BottomLeft | OverlayPosition::BottomCenter | OverlayPosition::BottomRight
        )
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverlayAnimation {
    None,
    #[default]
    FadeIn,
    SlideIn,
    ZoomIn,
}

/// Opacity, vertical offset and scale of the text block at `progress`
/// (0.0-1.0) through the entrance animation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnimationFrame {
    pub opacity: f32,
    pub offset_y: f32,
    pub scale: f32,
}

impl OverlayAnimation {
    pub fn frame(self, progress: f32) -> AnimationFrame {
        let p = progress.clamp(0.0, 1.0);
        let mut frame = AnimationFrame {
            opacity: 1.0,
            offset_y: 0.0,
            scale: 1.0,
        };
        if p >= 1.0 {
            return frame;
        }
        match self {
            OverlayAnimation::None => {}
            OverlayAnimation::FadeIn => frame.opacity = p,
            OverlayAnimation::SlideIn => {
                frame.opacity = p;
                frame.offset_y = (1.0 - p) * SLIDE_DISTANCE;
            }
            OverlayAnimation::ZoomIn => {
                frame.opacity = p;
                frame.scale = 0.5 + 0.5 * p;
            }
        }
        frame
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OverlayConfig {
    pub title: String,
    pub artist: String,
    pub font: String,
    pub position: OverlayPosition,
    /// Title size in logical pixels.
    pub size: f32,
    pub animation: OverlayAnimation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    pub watermark_enabled: bool,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            title: String::new(),
            artist: String::new(),
            font: "Inter".into(),
            position: OverlayPosition::BottomLeft,
            size: 24.0,
            animation: OverlayAnimation::FadeIn,
            logo_url: None,
            watermark_enabled: false,
        }
    }
}

/// Title and artist lines. Nothing is drawn when both are empty.
pub fn draw_text_block(
    surface: &mut dyn Surface,
    width: f32,
    height: f32,
    config: &OverlayConfig,
    progress: f32,
) {
    if config.title.is_empty() && config.artist.is_empty() {
        return;
    }
    let anim = config.animation.frame(progress);
    if anim.opacity <= 0.0 {
        return;
    }

    let align = config.position.align();
    let x = match align {
        TextAlign::Left => PADDING,
        TextAlign::Center => width / 2.0,
        TextAlign::Right => width - PADDING,
    };
    let y = if config.position.is_bottom() {
        height - PADDING - config.size * 2.5
    } else {
        PADDING
    } + anim.offset_y;

    if !config.title.is_empty() {
        let style = TextStyle {
            family: config.font.clone(),
            size: config.size,
            bold: true,
            color: Color::WHITE.with_alpha(anim.opacity),
            align,
            baseline: TextBaseline::Top,
            shadow: Some(Shadow {
                color: Color::BLACK.with_alpha(0.8 * anim.opacity),
                offset_x: 2.0,
                offset_y: 2.0,
            }),
        };
        surface.draw_text(&config.title, Vec2::new(x, y), &style, anim.scale);
    }

    if !config.artist.is_empty() {
        let style = TextStyle {
            family: config.font.clone(),
            size: config.size * 0.7,
            bold: false,
            color: Color::WHITE.with_alpha(0.8 * anim.opacity),
            align,
            baseline: TextBaseline::Top,
            shadow: None,
        };
        // The zoom scales about the title anchor, so the line gap scales too.
        let anchor = Vec2::new(x, y + config.size * 1.3 * anim.scale);
        surface.draw_text(&config.artist, anchor, &style, anim.scale);
    }
}

/// Logo rectangle: fit inside 15% of each canvas dimension, keeping the
/// aspect ratio, placed at the overlay anchor.
pub fn logo_rect(width: f32, height: f32, image_w: u32, image_h: u32, position: OverlayPosition) -> Option<Rect> {
    if image_w == 0 || image_h == 0 {
        return None;
    }
    let aspect = image_w as f32 / image_h as f32;
    let max_w = width * LOGO_MAX_FRACTION;
    let max_h = height * LOGO_MAX_FRACTION;
    let (mut w, mut h) = (max_w, max_w / aspect);
    if h > max_h {
        h = max_h;
        w = h * aspect;
    }
    let x = match position.align() {
        TextAlign::Left => PADDING,
        TextAlign::Center => (width - w) / 2.0,
        TextAlign::Right => width - w - PADDING,
    };
    let y = if position.is_bottom() {
        height - h - PADDING
    } else {
        PADDING
    };
    let rect = Rect::new(x, y, w, h);
    (!rect.is_empty()).then_some(rect)
}

pub fn draw_logo(surface: &mut dyn Surface, width: f32, height: f32, logo: &RgbaImage, position: OverlayPosition) {
    let (iw, ih) = logo.dimensions();
    if let Some(rect) = logo_rect(width, height, iw, ih, position) {
        surface.draw_image(logo, rect, 1.0);
    }
}

pub fn draw_watermark(surface: &mut dyn Surface, width: f32, height: f32) {
    let style = TextStyle {
        family: "sans-serif".into(),
        size: 12.0,
        bold: false,
        color: Color::WHITE.with_alpha(0.3),
        align: TextAlign::Right,
        baseline: TextBaseline::Bottom,
        shadow: None,
    };
    surface.draw_text(WATERMARK_TEXT, Vec2::new(width - 10.0, height - 10.0), &style, 1.0);
}

/// Overlay layer runtime: the lazily loaded logo and the entrance animation
/// clock.
#[derive(Default)]
pub struct OverlayLayer {
    logo: ImageSlot,
    animation_start: Option<f64>,
}

impl OverlayLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn logo_slot(&mut self) -> &mut ImageSlot {
        &mut self.logo
    }

    /// Restart the entrance animation at `now`.
    pub fn restart_animation(&mut self, now: f64) {
        self.animation_start = Some(now);
    }

    /// Progress through the entrance animation. Complete when the loop has
    /// never started.
    pub fn progress(&self, now: f64) -> f32 {
        match self.animation_start {
            Some(start) => ((now - start) / ANIMATION_SECONDS).clamp(0.0, 1.0) as f32,
            None => 1.0,
        }
    }

    /// Text, then logo, then watermark.
    pub fn draw(&mut self, surface: &mut dyn Surface, config: &OverlayConfig, width: f32, height: f32, now: f64) {
        draw_text_block(surface, width, height, config, self.progress(now));

        self.logo.set_reference(config.logo_url.as_deref());
        if let Some(logo) = self.logo.poll() {
            draw_logo(surface, width, height, &logo, config.position);
        }

        if config.watermark_enabled {
            draw_watermark(surface, width, height);
        }
    }
}
