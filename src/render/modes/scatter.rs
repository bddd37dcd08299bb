use glam::Vec2;
use rand::Rng;

use super::sample;
use crate::render::color::Color;
use crate::render::surface::{Paint, Surface};

const PARTICLE_COUNT: usize = 100;

/// A row of dots across the centre line, thrown vertically by a random
/// amount bounded by their intensity.
pub fn particles(surface: &mut dyn Surface, data: &[u8], width: f32, height: f32) {
    let mut rng = rand::thread_rng();
    for i in 0..PARTICLE_COUNT {
        let value = sample(data, i, PARTICLE_COUNT);
        let x = i as f32 / PARTICLE_COUNT as f32 * width;
        let jitter = if value > 0.0 {
            rng.gen_range(-0.5f32..0.5) * value * height * 0.6
        } else {
            0.0
        };
        let size = 2.0 + value * 8.0;

        let hue = i as f32 / PARTICLE_COUNT as f32 * 360.0;
        let color = Color::oklch(0.6 + value * 0.3, 0.2, hue, 0.5 + value * 0.5);
        surface.fill_circle(Vec2::new(x, height / 2.0 + jitter), size, &Paint::Solid(color));
    }
}
