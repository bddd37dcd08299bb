use glam::Vec2;
use image::RgbaImage;
use serde::Serialize;

use super::color::Color;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Rect {
        Rect { x, y, w, h }
    }

    pub fn is_empty(&self) -> bool {
        !(self.w > 0.0 && self.h > 0.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ColorStop {
    /// Offset along the gradient, 0.0-1.0.
    pub offset: f32,
    pub color: Color,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Paint {
    Solid(Color),
    Linear {
        #[serde(serialize_with = "ser_vec2")]
        start: Vec2,
        #[serde(serialize_with = "ser_vec2")]
        end: Vec2,
        stops: Vec<ColorStop>,
    },
    Radial {
        #[serde(serialize_with = "ser_vec2")]
        center: Vec2,
        radius: f32,
        stops: Vec<ColorStop>,
    },
}

impl Paint {
    /// Color of this paint at logical position `p`.
    pub fn color_at(&self, p: Vec2) -> Color {
        match self {
            Paint::Solid(color) => *color,
            Paint::Linear { start, end, stops } => {
                let axis = *end - *start;
                let len_sq = axis.length_squared();
                let t = if len_sq > 0.0 {
                    (p - *start).dot(axis) / len_sq
                } else {
                    0.0
                };
                sample_stops(stops, t)
            }
            Paint::Radial {
                center,
                radius,
                stops,
            } => {
                let t = if *radius > 0.0 {
                    p.distance(*center) / radius
                } else {
                    1.0
                };
                sample_stops(stops, t)
            }
        }
    }
}

/// Stops must be sorted by offset. Outside the stop range the end colors extend.
pub fn sample_stops(stops: &[ColorStop], t: f32) -> Color {
    let (Some(first), Some(last)) = (stops.first(), stops.last()) else {
        return Color::TRANSPARENT;
    };
    if t <= first.offset {
        return first.color;
    }
    if t >= last.offset {
        return last.color;
    }
    for pair in stops.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if t <= b.offset {
            let span = b.offset - a.offset;
            let local = if span > 0.0 { (t - a.offset) / span } else { 1.0 };
            return a.color.lerp(b.color, local);
        }
    }
    last.color
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextBaseline {
    Top,
    Bottom,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Shadow {
    pub color: Color,
    pub offset_x: f32,
    pub offset_y: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TextStyle {
    pub family: String,
    pub size: f32,
    pub bold: bool,
    pub color: Color,
    pub align: TextAlign,
    pub baseline: TextBaseline,
    pub shadow: Option<Shadow>,
}

/// A 2D drawing target. All coordinates are logical (CSS) pixels; the
/// implementation owns any device-pixel scaling.
pub trait Surface {
    fn fill_rect(&mut self, rect: Rect, paint: &Paint);

    fn fill_circle(&mut self, center: Vec2, radius: f32, paint: &Paint);

    /// Stroke with butt caps: a zero-length line draws nothing.
    fn stroke_line(&mut self, from: Vec2, to: Vec2, width: f32, color: Color);

    fn stroke_polyline(&mut self, points: &[Vec2], width: f32, color: Color) {
        for pair in points.windows(2) {
            self.stroke_line(pair[0], pair[1], width, color);
        }
    }

    fn draw_image(&mut self, image: &RgbaImage, dest: Rect, opacity: f32);

    /// Draw `text` anchored at `anchor` according to the style's alignment
    /// and baseline, scaled about the anchor by `scale`.
    fn draw_text(&mut self, text: &str, anchor: Vec2, style: &TextStyle, scale: f32);
}

/// One recorded drawing call.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum DrawCommand {
    FillRect {
        rect: Rect,
        paint: Paint,
    },
    FillCircle {
        #[serde(serialize_with = "ser_vec2")]
        center: Vec2,
        radius: f32,
        paint: Paint,
    },
    StrokeLine {
        #[serde(serialize_with = "ser_vec2")]
        from: Vec2,
        #[serde(serialize_with = "ser_vec2")]
        to: Vec2,
        width: f32,
        color: Color,
    },
    StrokePolyline {
        #[serde(serialize_with = "ser_vec2s")]
        points: Vec<Vec2>,
        width: f32,
        color: Color,
    },
    DrawImage {
        width: u32,
        height: u32,
        dest: Rect,
        opacity: f32,
    },
    DrawText {
        text: String,
        #[serde(serialize_with = "ser_vec2")]
        anchor: Vec2,
        style: TextStyle,
        scale: f32,
    },
}

/// A surface that records draw calls instead of rasterising them.
#[derive(Debug, Default, Serialize)]
pub struct DisplayList {
    pub commands: Vec<DrawCommand>,
}

impl DisplayList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl Surface for DisplayList {
    fn fill_rect(&mut self, rect: Rect, paint: &Paint) {
        self.commands.push(DrawCommand::FillRect {
            rect,
            paint: paint.clone(),
        });
    }

    fn fill_circle(&mut self, center: Vec2, radius: f32, paint: &Paint) {
        self.commands.push(DrawCommand::FillCircle {
            center,
            radius,
            paint: paint.clone(),
        });
    }

    fn stroke_line(&mut self, from: Vec2, to: Vec2, width: f32, color: Color) {
        self.commands.push(DrawCommand::StrokeLine {
            from,
            to,
            width,
            color,
        });
    }

    fn stroke_polyline(&mut self, points: &[Vec2], width: f32, color: Color) {
        self.commands.push(DrawCommand::StrokePolyline {
            points: points.to_vec(),
            width,
            color,
        });
    }

    fn draw_image(&mut self, image: &RgbaImage, dest: Rect, opacity: f32) {
        self.commands.push(DrawCommand::DrawImage {
            width: image.width(),
            height: image.height(),
            dest,
            opacity,
        });
    }

    fn draw_text(&mut self, text: &str, anchor: Vec2, style: &TextStyle, scale: f32) {
        self.commands.push(DrawCommand::DrawText {
            text: text.to_string(),
            anchor,
            style: style.clone(),
            scale,
        });
    }
}

fn ser_vec2<S: serde::Serializer>(v: &Vec2, s: S) -> Result<S::Ok, S::Error> {
    [v.x, v.y].serialize(s)
}

fn ser_vec2s<S: serde::Serializer>(v: &[Vec2], s: S) -> Result<S::Ok, S::Error> {
    s.collect_seq(v.iter().map(|p| [p.x, p.y]))
}
