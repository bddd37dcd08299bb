use glam::Vec2;
use rand::Rng;
use std::f32::consts::{FRAC_PI_2, TAU};

use super::sample;
use crate::render::color::Color;
use crate::render::surface::{Paint, Surface};

const SPECTRUM_BARS: usize = 128;
const NEON_RINGS: usize = 5;
const NEON_DOTS: usize = 64;
const NEON_RING_SPACING: f32 = 30.0;
/// Largest positional jitter of a neon dot at full intensity, in pixels.
const NEON_JITTER: f32 = 6.0;

/// Bars radiating from a ring at a quarter of the short side, starting at
/// twelve o'clock.
pub fn circular_spectrum(surface: &mut dyn Surface, data: &[u8], width: f32, height: f32) {
    let center = Vec2::new(width / 2.0, height / 2.0);
    let radius = width.min(height) * 0.25;

    for i in 0..SPECTRUM_BARS {
        let value = sample(data, i, SPECTRUM_BARS);
        let bar = value * radius * 0.8;
        let angle = i as f32 / SPECTRUM_BARS as f32 * TAU - FRAC_PI_2;
        let dir = Vec2::from_angle(angle);

        let hue = i as f32 / SPECTRUM_BARS as f32 * 360.0;
        surface.stroke_line(
            center + dir * radius,
            center + dir * (radius + bar),
            3.0,
            Color::oklch(0.6 + value * 0.3, 0.2, hue, 1.0),
        );
    }
}

/// Concentric rings of dots pushed outward by intensity, with jitter that
/// grows with intensity and vanishes at silence.
pub fn neon_ring(surface: &mut dyn Surface, data: &[u8], width: f32, height: f32) {
    let center = Vec2::new(width / 2.0, height / 2.0);
    let base = width.min(height) * 0.2;
    let mut rng = rand::thread_rng();

    for ring in 0..NEON_RINGS {
        let ring_radius = base + ring as f32 * NEON_RING_SPACING;
        for i in 0..NEON_DOTS {
            let value = sample(data, i, NEON_DOTS);
            let angle = i as f32 / NEON_DOTS as f32 * TAU;
            let mut pos = center + Vec2::from_angle(angle) * (ring_radius + value * 20.0);
            if value > 0.0 {
                let reach = value * NEON_JITTER;
                pos += Vec2::new(rng.gen_range(-reach..=reach), rng.gen_range(-reach..=reach));
            }

            let hue = ((ring * 72 + i) % 360) as f32;
            let color = Color::oklch(0.6 + value * 0.3, 0.25, hue, 1.0);
            surface.fill_circle(pos, 3.0, &Paint::Solid(color));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::surface::{DisplayList, DrawCommand};

    #[test]
    fn silent_spectrum_bars_have_zero_length() {
        let mut list = DisplayList::new();
        circular_spectrum(&mut list, &[0; 1024], 800.0, 600.0);
        for cmd in &list.commands {
            let DrawCommand::StrokeLine { from, to, .. } = cmd else {
                panic!("unexpected command {cmd:?}");
            };
            assert_eq!(from, to);
        }
    }

    #[test]
    fn silent_neon_dots_sit_on_their_rings() {
        let mut list = DisplayList::new();
        neon_ring(&mut list, &[0; 512], 500.0, 500.0);
        assert_eq!(list.len(), NEON_RINGS * NEON_DOTS);
        let center = Vec2::splat(250.0);
        for (n, cmd) in list.commands.iter().enumerate() {
            let DrawCommand::FillCircle { center: c, .. } = cmd else {
                panic!("unexpected command {cmd:?}");
            };
            let ring = n / NEON_DOTS;
            let expected = 100.0 + ring as f32 * NEON_RING_SPACING;
            assert!((c.distance(center) - expected).abs() < 1e-3);
        }
    }

    #[test]
    fn neon_jitter_stays_bounded() {
        let mut list = DisplayList::new();
        neon_ring(&mut list, &[255; 64], 500.0, 500.0);
        let center = Vec2::splat(250.0);
        for (n, cmd) in list.commands.iter().enumerate() {
            let DrawCommand::FillCircle { center: c, .. } = cmd else {
                continue;
            };
            let ring = n / NEON_DOTS;
            let nominal = 100.0 + ring as f32 * NEON_RING_SPACING + 20.0;
            let max_offset = (2.0f32).sqrt() * NEON_JITTER + 1e-3;
            assert!((c.distance(center) - nominal).abs() <= max_offset);
        }
    }
}
