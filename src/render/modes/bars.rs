use super::sample;
use crate::render::color::Color;
use crate::render::surface::{Paint, Rect, Surface};

const BAR_COUNT: usize = 64;
const BAR_GAP: f32 = 2.0;
const MAX_EXTENT: f32 = 0.7;

fn bar_color(i: usize, value: f32) -> Paint {
    let hue = i as f32 / BAR_COUNT as f32 * 360.0;
    Paint::Solid(Color::oklch(0.5 + value * 0.4, 0.2, hue, 1.0))
}

/// Equalizer bars rising from the bottom edge.
pub fn horizontal(surface: &mut dyn Surface, data: &[u8], width: f32, height: f32) {
    let slot = width / BAR_COUNT as f32;
    let max_height = height * MAX_EXTENT;
    for i in 0..BAR_COUNT {
        let value = sample(data, i, BAR_COUNT);
        let bar = value * max_height;
        let rect = Rect::new(i as f32 * slot, height - bar, slot - BAR_GAP, bar);
        if rect.is_empty() {
            continue;
        }
        surface.fill_rect(rect, &bar_color(i, value));
    }
}

/// Bars stacked top to bottom, growing symmetrically from the vertical centre line.
pub fn vertical(surface: &mut dyn Surface, data: &[u8], width: f32, height: f32) {
    let slot = height / BAR_COUNT as f32;
    let max_width = width * MAX_EXTENT;
    for i in 0..BAR_COUNT {
        let value = sample(data, i, BAR_COUNT);
        let bar = value * max_width;
        let rect = Rect::new((width - bar) / 2.0, i as f32 * slot, bar, slot - BAR_GAP);
        if rect.is_empty() {
            continue;
        }
        surface.fill_rect(rect, &bar_color(i, value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::surface::{DisplayList, DrawCommand};

    #[test]
    fn silence_draws_no_bars() {
        let mut list = DisplayList::new();
        horizontal(&mut list, &[0; 1024], 1280.0, 720.0);
        vertical(&mut list, &[0; 1024], 1280.0, 720.0);
        assert!(list.is_empty());
    }

    #[test]
    fn bar_height_is_proportional() {
        let mut list = DisplayList::new();
        horizontal(&mut list, &[255; 64], 640.0, 100.0);
        assert_eq!(list.len(), BAR_COUNT);
        let DrawCommand::FillRect { rect, .. } = &list.commands[3] else {
            panic!("expected a rect");
        };
        assert!((rect.h - 70.0).abs() < 1e-4);
        assert!((rect.y - 30.0).abs() < 1e-4);
        assert_eq!(rect.x, 30.0);
        assert_eq!(rect.w, 8.0);
    }

    #[test]
    fn vertical_bars_are_centred() {
        let mut list = DisplayList::new();
        vertical(&mut list, &[128; 64], 200.0, 640.0);
        for cmd in &list.commands {
            let DrawCommand::FillRect { rect, .. } = cmd else {
                panic!("expected a rect");
            };
            assert!((rect.x + rect.w / 2.0 - 100.0).abs() < 1e-3);
        }
    }
}
