use glam::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::render::color::Color;
use crate::render::surface::{Paint, Surface};

const MAX_SPEED: f32 = 0.25;

/// Ambient particle overlay settings. Stored alongside the background
/// settings, hence the prefixed field names.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleConfig {
    #[serde(rename = "particlesEnabled")]
    pub enabled: bool,
    /// 0-100; also the particle count.
    #[serde(rename = "particlesDensity")]
    pub density: u32,
    /// 0-100; scales particle opacity.
    #[serde(rename = "particlesIntensity")]
    pub intensity: u32,
}

impl Default for ParticleConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            density: 50,
            intensity: 50,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Particle {
    pub pos: Vec2,
    pub vel: Vec2,
    pub size: f32,
    pub opacity: f32,
}

/// Persistent particle set, independent of the audio signal. Regenerated
/// only when the density or the bounds change.
pub struct ParticleField {
    particles: Vec<Particle>,
    density: u32,
    bounds: Vec2,
    rng: StdRng,
}

impl ParticleField {
    pub fn new(width: f32, height: f32, density: u32) -> Self {
        Self::with_rng(width, height, density, StdRng::from_entropy())
    }

    /// Deterministic field for reproducible output.
    pub fn seeded(width: f32, height: f32, density: u32, seed: u64) -> Self {
        Self::with_rng(width, height, density, StdRng::seed_from_u64(seed))
    }

    fn with_rng(width: f32, height: f32, density: u32, rng: StdRng) -> Self {
        let mut field = Self {
            particles: Vec::new(),
            density: density.min(100),
            bounds: Vec2::new(width.max(0.0), height.max(0.0)),
            rng,
        };
        field.regenerate();
        field
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn bounds(&self) -> Vec2 {
        self.bounds
    }

    pub fn set_density(&mut self, density: u32) {
        let density = density.min(100);
        if density != self.density {
            self.density = density;
            self.regenerate();
        }
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        let bounds = Vec2::new(width.max(0.0), height.max(0.0));
        if bounds != self.bounds {
            self.bounds = bounds;
            self.regenerate();
        }
    }

    fn regenerate(&mut self) {
        let bounds = self.bounds;
        let rng = &mut self.rng;
        self.particles = (0..self.density)
            .map(|_| Particle {
                pos: Vec2::new(rng.gen::<f32>() * bounds.x, rng.gen::<f32>() * bounds.y),
                vel: Vec2::new(
                    rng.gen_range(-MAX_SPEED..MAX_SPEED),
                    rng.gen_range(-MAX_SPEED..MAX_SPEED),
                ),
                size: rng.gen_range(1.0..3.0),
                opacity: rng.gen_range(0.1..0.6),
            })
            .collect();
    }

    /// Move every particle one tick. Crossing an edge reflects the velocity
    /// component and pins the position to the edge.
    pub fn advance(&mut self) {
        let bounds = self.bounds;
        for p in &mut self.particles {
            p.pos += p.vel;
            if p.pos.x < 0.0 || p.pos.x > bounds.x {
                p.vel.x = -p.vel.x;
                p.pos.x = p.pos.x.clamp(0.0, bounds.x);
            }
            if p.pos.y < 0.0 || p.pos.y > bounds.y {
                p.vel.y = -p.vel.y;
                p.pos.y = p.pos.y.clamp(0.0, bounds.y);
            }
        }
    }

    pub fn draw(&self, surface: &mut dyn Surface, intensity: u32) {
        let factor = intensity.min(100) as f32 / 100.0;
        if factor <= 0.0 {
            return;
        }
        for p in &self.particles {
            let color = Color::WHITE.with_alpha(p.opacity * factor);
            surface.fill_circle(p.pos, p.size, &Paint::Solid(color));
        }
    }

    /// One overlay tick: apply config, advance, draw.
    pub fn step(&mut self, surface: &mut dyn Surface, config: &ParticleConfig) {
        self.set_density(config.density);
        self.advance();
        self.draw(surface, config.intensity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::surface::DisplayList;

    #[test]
    fn count_follows_density() {
        let mut field = ParticleField::seeded(100.0, 100.0, 30, 7);
        assert_eq!(field.particles().len(), 30);
        field.set_density(250);
        assert_eq!(field.particles().len(), 100);
    }

    #[test]
    fn generated_particles_respect_ranges() {
        let field = ParticleField::seeded(640.0, 360.0, 100, 1);
        for p in field.particles() {
            assert!((0.0..=640.0).contains(&p.pos.x));
            assert!((0.0..=360.0).contains(&p.pos.y));
            assert!(p.vel.x.abs() <= MAX_SPEED && p.vel.y.abs() <= MAX_SPEED);
            assert!((1.0..3.0).contains(&p.size));
            assert!((0.1..0.6).contains(&p.opacity));
        }
    }

    #[test]
    fn state_persists_across_ticks_with_unchanged_density() {
        let mut field = ParticleField::seeded(100.0, 100.0, 10, 3);
        let before = field.particles().to_vec();
        let mut list = DisplayList::new();
        field.step(&mut list, &ParticleConfig { enabled: true, density: 10, intensity: 50 });
        assert_eq!(field.particles().len(), 10);
        for (a, b) in before.iter().zip(field.particles()) {
            assert_eq!(a.size, b.size);
            assert!(a.pos.distance(b.pos) <= MAX_SPEED * 2.0f32.sqrt() + 1e-5);
        }
        assert_eq!(list.len(), 10);
    }

    #[test]
    fn edges_reflect_and_clamp() {
        let mut field = ParticleField::seeded(10.0, 10.0, 0, 0);
        field.particles.push(Particle {
            pos: Vec2::new(9.9, 0.1),
            vel: Vec2::new(0.25, -0.25),
            size: 1.0,
            opacity: 0.5,
        });
        field.advance();
        let p = field.particles()[0];
        assert_eq!(p.pos, Vec2::new(10.0, 0.0));
        assert_eq!(p.vel, Vec2::new(-0.25, 0.25));
        for _ in 0..1000 {
            field.advance();
            let p = field.particles()[0];
            assert!((0.0..=10.0).contains(&p.pos.x) && (0.0..=10.0).contains(&p.pos.y));
        }
    }

    #[test]
    fn resize_regenerates_within_new_bounds() {
        let mut field = ParticleField::seeded(1000.0, 1000.0, 50, 9);
        field.resize(10.0, 10.0);
        assert_eq!(field.bounds(), Vec2::new(10.0, 10.0));
        assert!(field.particles().iter().all(|p| p.pos.x <= 10.0 && p.pos.y <= 10.0));
    }

    #[test]
    fn zero_intensity_draws_nothing() {
        let field = ParticleField::seeded(10.0, 10.0, 5, 0);
        let mut list = DisplayList::new();
        field.draw(&mut list, 0);
        assert!(list.is_empty());
    }
}
