use glam::Vec2;
use image::RgbaImage;
use rayon::prelude::*;
use std::path::Path;

use super::color::Color;
use super::surface::{Paint, Rect, Surface, TextAlign, TextBaseline, TextStyle};
use super::text::{rasterize_line, FontBook};

/// Regions smaller than this many device pixels are shaded on the calling thread.
const PARALLEL_MIN_PIXELS: usize = 64 * 1024;

/// CPU RGBA8 raster surface.
///
/// Draw calls take logical (CSS) pixels; the backing store is
/// `logical * dpr` device pixels. Pixels hold straight (non-premultiplied)
/// alpha and composite source-over.
pub struct Canvas {
    width: u32,
    height: u32,
    dpr: f32,
    pixels: Vec<u8>,
    fonts: FontBook,
}

impl Canvas {
    pub fn new(css_width: u32, css_height: u32, dpr: f32, fonts: FontBook) -> Self {
        let mut canvas = Self {
            width: 0,
            height: 0,
            dpr: 1.0,
            pixels: Vec::new(),
            fonts,
        };
        canvas.resize(css_width, css_height, dpr);
        canvas
    }

    /// Reallocate the backing store for a new logical size. Like a browser
    /// canvas, this clears the content. Returns whether anything changed.
    pub fn resize(&mut self, css_width: u32, css_height: u32, dpr: f32) -> bool {
        let dpr = if dpr.is_finite() && dpr > 0.0 { dpr } else { 1.0 };
        let width = (css_width as f32 * dpr).round() as u32;
        let height = (css_height as f32 * dpr).round() as u32;
        if width == self.width && height == self.height && dpr == self.dpr {
            return false;
        }
        self.width = width;
        self.height = height;
        self.dpr = dpr;
        self.pixels = vec![0; width as usize * height as usize * 4];
        log::debug!("Canvas resized to {}x{} (dpr {})", width, height, dpr);
        true
    }

    /// Backing store size in device pixels.
    pub fn device_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Drawing size in logical pixels.
    pub fn logical_size(&self) -> (f32, f32) {
        (self.width as f32 / self.dpr, self.height as f32 / self.dpr)
    }

    pub fn dpr(&self) -> f32 {
        self.dpr
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// RGBA at device pixel `(x, y)`, or `None` outside the canvas.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let px = self.pixels.get(i..i + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    pub fn fonts_mut(&mut self) -> &mut FontBook {
        &mut self.fonts
    }

    pub fn clear(&mut self, color: Color) {
        let rgba = color.to_rgba8();
        self.pixels
            .par_chunks_mut(4)
            .for_each(|px| px.copy_from_slice(&rgba));
    }

    /// Replace the whole backing store with `rgba` if it has the same device
    /// size. Returns false (and leaves the canvas untouched) otherwise.
    pub fn blit_rgba(&mut self, rgba: &[u8], width: u32, height: u32) -> bool {
        if width != self.width || height != self.height || rgba.len() != self.pixels.len() {
            return false;
        }
        self.pixels.copy_from_slice(rgba);
        true
    }

    pub fn to_image(&self) -> Option<RgbaImage> {
        RgbaImage::from_raw(self.width, self.height, self.pixels.clone())
    }

    pub fn save_png(&self, path: &Path) -> Result<(), image::ImageError> {
        image::save_buffer(
            path,
            &self.pixels,
            self.width,
            self.height,
            image::ColorType::Rgba8,
        )
    }

    /// Device-pixel bounds `[x0, x1) x [y0, y1)` of a logical box, clipped.
    fn device_bounds(&self, min: Vec2, max: Vec2) -> Option<(usize, usize, usize, usize)> {
        let clip = |v: f32, limit: u32| (v.floor().max(0.0) as usize).min(limit as usize);
        let x0 = clip(min.x * self.dpr, self.width);
        let y0 = clip(min.y * self.dpr, self.height);
        let x1 = clip((max.x * self.dpr).ceil(), self.width);
        let y1 = clip((max.y * self.dpr).ceil(), self.height);
        (x0 < x1 && y0 < y1).then_some((x0, y0, x1, y1))
    }

    /// Composite `shade` over every device pixel in the bounds. `shade`
    /// receives the pixel centre in device coordinates and returns the
    /// source color with its coverage.
    fn shade_region<F>(&mut self, (x0, y0, x1, y1): (usize, usize, usize, usize), shade: F)
    where
        F: Fn(Vec2) -> Option<(Color, f32)> + Sync,
    {
        let row_bytes = self.width as usize * 4;
        let shade_row = |y: usize, row: &mut [u8]| {
            for x in x0..x1 {
                let center = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                if let Some((color, coverage)) = shade(center) {
                    blend(&mut row[x * 4..x * 4 + 4], color, coverage);
                }
            }
        };

        if (x1 - x0) * (y1 - y0) >= PARALLEL_MIN_PIXELS {
            self.pixels
                .par_chunks_mut(row_bytes)
                .enumerate()
                .skip(y0)
                .take(y1 - y0)
                .for_each(|(y, row)| shade_row(y, row));
        } else {
            for (y, row) in self.pixels.chunks_mut(row_bytes).enumerate().skip(y0).take(y1 - y0) {
                shade_row(y, row);
            }
        }
    }

    fn draw_text_pass(&mut self, text: &str, anchor: Vec2, style: &TextStyle, scale: f32, color: Color) {
        let Some(font) = self.fonts.resolve(&style.family, style.bold) else {
            return;
        };
        let size = style.size * scale * self.dpr;
        if !(size > 0.0) {
            return;
        }
        let line = rasterize_line(&font, text, size);
        let anchor = anchor * self.dpr;
        let left = match style.align {
            TextAlign::Left => anchor.x,
            TextAlign::Center => anchor.x - line.width / 2.0,
            TextAlign::Right => anchor.x - line.width,
        };
        let baseline = match style.baseline {
            TextBaseline::Top => anchor.y + line.ascent,
            TextBaseline::Bottom => anchor.y + line.descent,
        };

        let (w, h) = (self.width as i64, self.height as i64);
        for glyph in &line.glyphs {
            let m = &glyph.metrics;
            let gx0 = (left + glyph.x + m.xmin as f32).round() as i64;
            let gy0 = (baseline - m.height as f32 - m.ymin as f32).round() as i64;
            for gy in 0..m.height {
                let py = gy0 + gy as i64;
                if py < 0 || py >= h {
                    continue;
                }
                for gx in 0..m.width {
                    let px = gx0 + gx as i64;
                    if px < 0 || px >= w {
                        continue;
                    }
                    let coverage = glyph.bitmap[gy * m.width + gx];
                    if coverage == 0 {
                        continue;
                    }
                    let i = (py as usize * self.width as usize + px as usize) * 4;
                    blend(&mut self.pixels[i..i + 4], color, coverage as f32 / 255.0);
                }
            }
        }
    }
}

/// Straight-alpha source-over.
fn blend(dst: &mut [u8], src: Color, coverage: f32) {
    let sa = (src.a * coverage).clamp(0.0, 1.0);
    if !(sa > 0.0) {
        return;
    }
    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    let mix = |s: f32, d: u8| {
        let d = d as f32 / 255.0;
        let v = (s.clamp(0.0, 1.0) * sa + d * da * (1.0 - sa)) / out_a;
        (v * 255.0).round().clamp(0.0, 255.0) as u8
    };
    dst[0] = mix(src.r, dst[0]);
    dst[1] = mix(src.g, dst[1]);
    dst[2] = mix(src.b, dst[2]);
    dst[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
}

impl Surface for Canvas {
    fn fill_rect(&mut self, rect: Rect, paint: &Paint) {
        if rect.is_empty() {
            return;
        }
        let Some(bounds) = self.device_bounds(
            Vec2::new(rect.x, rect.y),
            Vec2::new(rect.x + rect.w, rect.y + rect.h),
        ) else {
            return;
        };
        let (min, max) = (
            Vec2::new(rect.x, rect.y) * self.dpr,
            Vec2::new(rect.x + rect.w, rect.y + rect.h) * self.dpr,
        );
        let dpr = self.dpr;
        self.shade_region(bounds, |p| {
            let inside = p.x >= min.x && p.x < max.x && p.y >= min.y && p.y < max.y;
            inside.then(|| {
                let color = match paint {
                    Paint::Solid(color) => *color,
                    _ => paint.color_at(p / dpr),
                };
                (color, 1.0)
            })
        });
    }

    fn fill_circle(&mut self, center: Vec2, radius: f32, paint: &Paint) {
        if !(radius > 0.0) {
            return;
        }
        let Some(bounds) = self.device_bounds(
            center - Vec2::splat(radius + 1.0),
            center + Vec2::splat(radius + 1.0),
        ) else {
            return;
        };
        let c = center * self.dpr;
        let r = radius * self.dpr;
        let dpr = self.dpr;
        self.shade_region(bounds, |p| {
            let coverage = (r - p.distance(c) + 0.5).clamp(0.0, 1.0);
            (coverage > 0.0).then(|| {
                let color = match paint {
                    Paint::Solid(color) => *color,
                    _ => paint.color_at(p / dpr),
                };
                (color, coverage)
            })
        });
    }

    fn stroke_line(&mut self, from: Vec2, to: Vec2, width: f32, color: Color) {
        let a = from * self.dpr;
        let b = to * self.dpr;
        let axis = b - a;
        let len_sq = axis.length_squared();
        if len_sq < 1e-6 || !(width > 0.0) {
            return;
        }
        let half = (width * self.dpr / 2.0).max(0.5);
        let pad = Vec2::splat(width / 2.0 + 1.0);
        let Some(bounds) = self.device_bounds(from.min(to) - pad, from.max(to) + pad) else {
            return;
        };
        self.shade_region(bounds, |p| {
            let t = (p - a).dot(axis) / len_sq;
            if !(0.0..=1.0).contains(&t) {
                return None;
            }
            let dist = p.distance(a + axis * t);
            let coverage = (half - dist + 0.5).clamp(0.0, 1.0);
            (coverage > 0.0).then_some((color, coverage))
        });
    }

    fn draw_image(&mut self, image: &RgbaImage, dest: Rect, opacity: f32) {
        let (iw, ih) = image.dimensions();
        if dest.is_empty() || iw == 0 || ih == 0 || !(opacity > 0.0) {
            return;
        }
        let Some(bounds) = self.device_bounds(
            Vec2::new(dest.x, dest.y),
            Vec2::new(dest.x + dest.w, dest.y + dest.h),
        ) else {
            return;
        };
        let origin = Vec2::new(dest.x, dest.y) * self.dpr;
        let size = Vec2::new(dest.w, dest.h) * self.dpr;
        self.shade_region(bounds, |p| {
            let uv = (p - origin) / size;
            if !(0.0..1.0).contains(&uv.x) || !(0.0..1.0).contains(&uv.y) {
                return None;
            }
            let sx = ((uv.x * iw as f32) as u32).min(iw - 1);
            let sy = ((uv.y * ih as f32) as u32).min(ih - 1);
            let [r, g, b, a] = image.get_pixel(sx, sy).0;
            Some((Color::from_rgba8(r, g, b, a), opacity.min(1.0)))
        });
    }

    fn draw_text(&mut self, text: &str, anchor: Vec2, style: &TextStyle, scale: f32) {
        if text.is_empty() || style.color.a <= 0.0 {
            return;
        }
        if let Some(shadow) = style.shadow {
            let offset = Vec2::new(shadow.offset_x, shadow.offset_y);
            let color = shadow.color.with_alpha(shadow.color.a * style.color.a);
            self.draw_text_pass(text, anchor + offset, style, scale, color);
        }
        self.draw_text_pass(text, anchor, style, scale, style.color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::surface::ColorStop;

    fn canvas(w: u32, h: u32, dpr: f32) -> Canvas {
        Canvas::new(w, h, dpr, FontBook::empty())
    }

    #[test]
    fn resize_scales_and_clears() {
        let mut c = canvas(100, 50, 2.0);
        assert_eq!(c.device_size(), (200, 100));
        assert_eq!(c.logical_size(), (100.0, 50.0));
        c.clear(Color::WHITE);
        assert!(!c.resize(100, 50, 2.0));
        assert_eq!(c.pixel(0, 0), Some([255, 255, 255, 255]));
        assert!(c.resize(10, 10, 1.0));
        assert_eq!(c.pixel(0, 0), Some([0, 0, 0, 0]));
        assert_eq!(c.pixel(10, 0), None);
    }

    #[test]
    fn fill_rect_uses_logical_coordinates() {
        let mut c = canvas(10, 10, 2.0);
        c.fill_rect(Rect::new(0.0, 0.0, 5.0, 5.0), &Paint::Solid(Color::WHITE));
        assert_eq!(c.pixel(9, 9), Some([255, 255, 255, 255]));
        assert_eq!(c.pixel(10, 10), Some([0, 0, 0, 0]));
    }

    #[test]
    fn large_gradient_fill_runs_in_parallel_rows() {
        let mut c = canvas(400, 400, 1.0);
        let paint = Paint::Linear {
            start: Vec2::ZERO,
            end: Vec2::new(0.0, 400.0),
            stops: vec![
                ColorStop { offset: 0.0, color: Color::BLACK },
                ColorStop { offset: 1.0, color: Color::WHITE },
            ],
        };
        c.fill_rect(Rect::new(0.0, 0.0, 400.0, 400.0), &paint);
        let top = c.pixel(0, 0).unwrap();
        let bottom = c.pixel(0, 399).unwrap();
        assert!(top[0] < 5);
        assert!(bottom[0] > 250);
    }

    #[test]
    fn zero_length_line_draws_nothing() {
        let mut c = canvas(20, 20, 1.0);
        c.stroke_line(Vec2::new(10.0, 10.0), Vec2::new(10.0, 10.0), 4.0, Color::WHITE);
        assert!(c.pixels().iter().all(|&b| b == 0));
    }

    #[test]
    fn line_has_butt_caps() {
        let mut c = canvas(20, 20, 1.0);
        c.stroke_line(Vec2::new(5.0, 10.0), Vec2::new(15.0, 10.0), 4.0, Color::WHITE);
        assert_eq!(c.pixel(10, 10).unwrap()[3], 255);
        assert_eq!(c.pixel(3, 10).unwrap()[3], 0);
        assert_eq!(c.pixel(17, 10).unwrap()[3], 0);
    }

    #[test]
    fn circle_is_antialiased_at_the_rim() {
        let mut c = canvas(20, 20, 1.0);
        c.fill_circle(Vec2::new(10.0, 10.0), 5.0, &Paint::Solid(Color::WHITE));
        assert_eq!(c.pixel(10, 10).unwrap()[3], 255);
        assert_eq!(c.pixel(0, 0).unwrap()[3], 0);
    }

    #[test]
    fn half_transparent_over_opaque_mixes() {
        let mut c = canvas(1, 1, 1.0);
        c.clear(Color::BLACK);
        c.fill_rect(Rect::new(0.0, 0.0, 1.0, 1.0), &Paint::Solid(Color::WHITE.with_alpha(0.5)));
        let [r, _, _, a] = c.pixel(0, 0).unwrap();
        assert!((127..=128).contains(&r));
        assert_eq!(a, 255);
    }

    #[test]
    fn draw_image_stretches_into_dest() {
        let mut img = RgbaImage::new(2, 1);
        img.put_pixel(0, 0, image::Rgba([255, 0, 0, 255]));
        img.put_pixel(1, 0, image::Rgba([0, 0, 255, 255]));
        let mut c = canvas(10, 10, 1.0);
        c.draw_image(&img, Rect::new(0.0, 0.0, 10.0, 10.0), 1.0);
        assert_eq!(c.pixel(2, 5), Some([255, 0, 0, 255]));
        assert_eq!(c.pixel(7, 5), Some([0, 0, 255, 255]));
    }

    #[test]
    fn text_without_fonts_is_skipped() {
        let mut c = canvas(50, 20, 1.0);
        let style = TextStyle {
            family: "Inter".into(),
            size: 12.0,
            bold: false,
            color: Color::WHITE,
            align: TextAlign::Left,
            baseline: TextBaseline::Top,
            shadow: None,
        };
        c.draw_text("hello", Vec2::ZERO, &style, 1.0);
        assert!(c.pixels().iter().all(|&b| b == 0));
    }

    #[test]
    fn blit_requires_matching_size() {
        let mut c = canvas(2, 2, 1.0);
        assert!(!c.blit_rgba(&[255; 4], 1, 1));
        assert!(c.blit_rgba(&[255; 16], 2, 2));
        assert_eq!(c.pixel(1, 1), Some([255; 4]));
    }

    #[test]
    fn saves_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        let mut c = canvas(4, 4, 1.0);
        c.clear(Color::from_rgba8(10, 20, 30, 255));
        c.save_png(&path).unwrap();
        let back = image::open(&path).unwrap().to_rgba8();
        assert_eq!(back.get_pixel(3, 3).0, [10, 20, 30, 255]);
    }
}
