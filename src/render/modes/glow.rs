use glam::Vec2;

use super::{mean, sample};
use crate::render::color::Color;
use crate::render::surface::{ColorStop, Paint, Surface};

const LOFI_POINTS: usize = 64;

/// One polyline through every sample, centred vertically.
pub fn waveform(surface: &mut dyn Surface, data: &[u8], width: f32, height: f32) {
    if data.is_empty() {
        return;
    }
    let slice = width / data.len() as f32;
    let center_y = height / 2.0;
    let points: Vec<Vec2> = data
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            let value = v as f32 / 255.0 * 2.0 - 1.0;
            Vec2::new(i as f32 * slice, center_y + value * height * 0.4)
        })
        .collect();
    surface.stroke_polyline(&points, 3.0, Color::oklch(0.7, 0.25, 200.0, 1.0));
}

/// A soft glow whose size and opacity follow the mean level, under a
/// small 64-point line.
pub fn lofi_glow(surface: &mut dyn Surface, data: &[u8], width: f32, height: f32) {
    let center = Vec2::new(width / 2.0, height / 2.0);
    let avg = mean(data);

    let radius = 50.0 + avg * 150.0;
    let glow = Paint::Radial {
        center,
        radius,
        stops: vec![
            ColorStop {
                offset: 0.0,
                color: Color::oklch(0.7, 0.15, 280.0, 0.8 * avg),
            },
            ColorStop {
                offset: 0.5,
                color: Color::oklch(0.6, 0.12, 280.0, 0.4 * avg),
            },
            ColorStop {
                offset: 1.0,
                color: Color::oklch(0.5, 0.1, 280.0, 0.0),
            },
        ],
    };
    surface.fill_circle(center, radius, &glow);

    let slice = width / LOFI_POINTS as f32;
    let points: Vec<Vec2> = (0..LOFI_POINTS)
        .map(|i| {
            let value = sample(data, i, LOFI_POINTS) * 2.0 - 1.0;
            Vec2::new(i as f32 * slice, center.y + value * 40.0)
        })
        .collect();
    surface.stroke_polyline(
        &points,
        2.0,
        Color::oklch(0.8, 0.1, 280.0, 0.6 + avg * 0.4),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::surface::{DisplayList, DrawCommand};

    #[test]
    fn waveform_is_a_single_polyline_over_every_sample() {
        let mut list = DisplayList::new();
        waveform(&mut list, &[0; 300], 600.0, 400.0);
        assert_eq!(list.len(), 1);
        let DrawCommand::StrokePolyline { points, .. } = &list.commands[0] else {
            panic!("expected a polyline");
        };
        assert_eq!(points.len(), 300);
        // Silence maps every point to the same offset from the centre line.
        assert!(points.iter().all(|p| p.y == points[0].y));
    }

    #[test]
    fn silent_glow_is_fully_transparent() {
        let mut list = DisplayList::new();
        lofi_glow(&mut list, &[0; 128], 600.0, 400.0);
        let DrawCommand::FillCircle { radius, paint, .. } = &list.commands[0] else {
            panic!("expected the glow first");
        };
        assert_eq!(*radius, 50.0);
        let Paint::Radial { stops, .. } = paint else {
            panic!("expected a radial paint");
        };
        assert!(stops.iter().all(|s| s.color.a == 0.0));
    }
}
