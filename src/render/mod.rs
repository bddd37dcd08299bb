//! 2D drawing: the surface seam, the CPU canvas, assets, and the render
//! mode registry. The wgpu plumbing used by the 3D tunnel lives here too.

pub mod canvas;
pub mod color;
pub mod frame;
pub mod gpu;
pub mod image;
pub mod modes;
pub mod pipeline;
pub mod surface;
pub mod text;

pub use self::canvas::Canvas;
pub use self::color::Color;
pub use self::image::{load_image, ImageSlot, ImageState};
pub use self::modes::{DrawFn, RenderModeId, UnknownModeError};
pub use self::surface::{
    ColorStop, DisplayList, DrawCommand, Paint, Rect, Shadow, Surface, TextAlign, TextBaseline,
    TextStyle,
};
pub use self::text::FontBook;
