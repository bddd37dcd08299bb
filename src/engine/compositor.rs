use image::RgbaImage;

use crate::layers::background::{BackgroundConfig, BackgroundLayer};
use crate::layers::overlay::{OverlayConfig, OverlayLayer};
use crate::layers::particles::ParticleField;
use crate::render::modes::RenderModeId;
use crate::render::surface::{Rect, Surface};

/// Everything one compositor pass reads, borrowed from the controller.
pub struct Scene<'a> {
    pub mode: RenderModeId,
    pub background: &'a BackgroundConfig,
    pub overlay: &'a OverlayConfig,
    /// Latest 3D frame, already checked against the canvas size.
    pub tunnel_layer: Option<&'a RgbaImage>,
    /// Logical canvas size, re-read every pass.
    pub width: f32,
    pub height: f32,
    pub now: f64,
}

/// Per-tick layer orchestration: background, active mode, particles,
/// overlays. Owns the layer runtime state; holds no signal state.
#[derive(Default)]
pub struct Compositor {
    background: BackgroundLayer,
    particles: Option<ParticleField>,
    overlay: OverlayLayer,
}

impl Compositor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn background_layer(&mut self) -> &mut BackgroundLayer {
        &mut self.background
    }

    pub fn overlay_layer(&mut self) -> &mut OverlayLayer {
        &mut self.overlay
    }

    pub fn particles(&self) -> Option<&ParticleField> {
        self.particles.as_ref()
    }

    /// New logical bounds. The particle set is regenerated to match.
    pub fn resize(&mut self, width: f32, height: f32) {
        if let Some(field) = &mut self.particles {
            field.resize(width, height);
        }
    }

    pub fn restart_animation(&mut self, now: f64) {
        self.overlay.restart_animation(now);
    }

    /// One full pass. The background repaints the whole surface, so nothing
    /// is cleared first. In 3D mode the tunnel frame takes the place of the
    /// background and the 2D mode and particle passes are skipped.
    pub fn compose(&mut self, surface: &mut dyn Surface, scene: &Scene<'_>, snapshot: &[u8]) {
        let (width, height) = (scene.width, scene.height);

        if scene.mode.is_gpu() {
            match scene.tunnel_layer {
                Some(layer) => surface.draw_image(layer, Rect::new(0.0, 0.0, width, height), 1.0),
                None => self.background.draw(surface, scene.background, width, height),
            }
        } else {
            self.background.draw(surface, scene.background, width, height);
            if let Some(render) = scene.mode.renderer() {
                render(surface, snapshot, width, height);
            }
            self.draw_particles(surface, scene);
        }

        self.overlay.draw(surface, scene.overlay, width, height, scene.now);
    }

    fn draw_particles(&mut self, surface: &mut dyn Surface, scene: &Scene<'_>) {
        let config = &scene.background.particles;
        if !config.enabled {
            if self.particles.take().is_some() {
                log::debug!("Particle overlay released");
            }
            return;
        }
        let field = self
            .particles
            .get_or_insert_with(|| ParticleField::new(scene.width, scene.height, config.density));
        field.step(surface, config);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::surface::{DisplayList, DrawCommand};

    fn scene<'a>(
        mode: RenderModeId,
        background: &'a BackgroundConfig,
        overlay: &'a OverlayConfig,
        tunnel_layer: Option<&'a RgbaImage>,
    ) -> Scene<'a> {
        Scene {
            mode,
            background,
            overlay,
            tunnel_layer,
            width: 320.0,
            height: 180.0,
            now: 0.0,
        }
    }

    #[test]
    fn background_is_drawn_first_and_fills_the_frame() {
        let mut compositor = Compositor::new();
        let (background, overlay) = (BackgroundConfig::default(), OverlayConfig::default());
        let mut list = DisplayList::new();
        compositor.compose(
            &mut list,
            &scene(RenderModeId::BarVertical, &background, &overlay, None),
            &[128; 64],
        );
        assert!(matches!(
            list.commands[0],
            DrawCommand::FillRect { rect, .. } if rect == Rect::new(0.0, 0.0, 320.0, 180.0)
        ));
        assert!(list.len() > 1);
    }

    #[test]
    fn particles_follow_the_enabled_flag() {
        let mut compositor = Compositor::new();
        let mut background = BackgroundConfig::default();
        background.particles.enabled = true;
        background.particles.density = 12;
        let overlay = OverlayConfig::default();
        let mut list = DisplayList::new();

        compositor.compose(&mut list, &scene(RenderModeId::Waveform, &background, &overlay, None), &[]);
        assert_eq!(compositor.particles().map(|f| f.particles().len()), Some(12));

        compositor.resize(10.0, 10.0);
        let field = compositor.particles().unwrap();
        assert!(field.particles().iter().all(|p| p.pos.x <= 10.0 && p.pos.y <= 10.0));

        background.particles.enabled = false;
        compositor.compose(&mut list, &scene(RenderModeId::Waveform, &background, &overlay, None), &[]);
        assert!(compositor.particles().is_none());
    }

    #[test]
    fn tunnel_layer_replaces_background_and_mode() {
        let mut compositor = Compositor::new();
        let mut background = BackgroundConfig::default();
        background.particles.enabled = true;
        let overlay = OverlayConfig {
            watermark_enabled: true,
            ..OverlayConfig::default()
        };
        let layer = RgbaImage::new(320, 180);
        let mut list = DisplayList::new();
        compositor.compose(
            &mut list,
            &scene(RenderModeId::Tunnel3d, &background, &overlay, Some(&layer)),
            &[255; 32],
        );
        assert_eq!(list.len(), 2);
        assert!(matches!(
            list.commands[0],
            DrawCommand::DrawImage { width: 320, height: 180, .. }
        ));
        assert!(matches!(list.commands[1], DrawCommand::DrawText { .. }));
        assert!(compositor.particles().is_none());
    }

    #[test]
    fn missing_tunnel_frame_falls_back_to_background() {
        let mut compositor = Compositor::new();
        let (background, overlay) = (BackgroundConfig::default(), OverlayConfig::default());
        let mut list = DisplayList::new();
        compositor.compose(&mut list, &scene(RenderModeId::Tunnel3d, &background, &overlay, None), &[]);
        assert_eq!(list.len(), 1);
        assert!(matches!(list.commands[0], DrawCommand::FillRect { .. }));
    }
}
