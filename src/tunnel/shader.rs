use glam::{Vec2, Vec3};

use super::device::ShaderSource;
use crate::render::pipeline::TunnelUniforms;

pub const TUNNEL_WGSL: &str = include_str!("../../shaders/tunnel.wgsl");

const NEAR_COLOR: Vec3 = Vec3::new(0.2, 0.6, 1.0);
const FAR_COLOR: Vec3 = Vec3::new(1.0, 0.3, 0.8);
const RING_PERIOD: f32 = 6.28;

pub fn tunnel_shader() -> ShaderSource {
    ShaderSource {
        label: "tunnel_shader",
        wgsl: TUNNEL_WGSL,
        fragment: tunnel_fragment,
    }
}

/// CPU evaluation of `fs_main` in `shaders/tunnel.wgsl`.
pub fn tunnel_fragment(frag: Vec2, u: &TunnelUniforms) -> [f32; 3] {
    let resolution = Vec2::from(u.resolution).max(Vec2::ONE);
    let p = (frag / resolution - 0.5) * 2.0;

    let dist = p.length();
    let angle = p.y.atan2(p.x);

    let tunnel = wrap(dist * 10.0 - u.time * 2.0, 1.0);
    let rings = wrap(angle * 8.0 + u.time, RING_PERIOD) / RING_PERIOD;

    let intensity = (1.0 - tunnel) * (1.0 - dist) * u.audio_level;
    let color = NEAR_COLOR.lerp(FAR_COLOR, rings) * intensity;
    color.clamp(Vec3::ZERO, Vec3::ONE).to_array()
}

fn wrap(x: f32, m: f32) -> f32 {
    x - m * (x / m).floor()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniforms(time: f32, audio_level: f32) -> TunnelUniforms {
        TunnelUniforms {
            time,
            audio_level,
            resolution: [100.0, 100.0],
        }
    }

    #[test]
    fn silence_renders_black() {
        for (x, y) in [(10.0, 10.0), (50.5, 50.5), (90.0, 20.0)] {
            assert_eq!(tunnel_fragment(Vec2::new(x, y), &uniforms(1.3, 0.0)), [0.0; 3]);
        }
    }

    #[test]
    fn corners_fall_outside_the_tunnel() {
        // dist > 1 makes the intensity negative, which clamps to black.
        let c = tunnel_fragment(Vec2::new(0.5, 0.5), &uniforms(0.0, 1.0));
        assert_eq!(c, [0.0; 3]);
    }

    #[test]
    fn louder_is_brighter() {
        let at = Vec2::new(60.5, 55.5);
        let quiet = tunnel_fragment(at, &uniforms(0.2, 0.2));
        let loud = tunnel_fragment(at, &uniforms(0.2, 0.8));
        let sum = |c: [f32; 3]| c.iter().sum::<f32>();
        assert!(sum(loud) > sum(quiet));
    }

    #[test]
    fn wrap_matches_glsl_mod() {
        assert!((wrap(-0.25, 1.0) - 0.75).abs() < 1e-6);
        assert!((wrap(2.5, 1.0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn wgsl_declares_both_entry_points() {
        assert!(TUNNEL_WGSL.contains("fn vs_main"));
        assert!(TUNNEL_WGSL.contains("fn fs_main"));
    }
}
