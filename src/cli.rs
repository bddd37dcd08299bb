use clap::Parser;
use std::path::PathBuf;

use wavecraft::config::GpuBackend;
use wavecraft::RenderModeId;

#[derive(Parser, Debug)]
#[command(name = "wavecraft", about = "Audio-reactive visualizer frame renderer")]
pub struct Cli {
    /// Input audio file (WAV, MP3, FLAC, OGG, AAC)
    pub input: Option<PathBuf>,

    /// Output PNG. With --frames > 1 a frame number is appended to the name.
    #[arg(short, long, default_value = "frame.png")]
    pub output: PathBuf,

    /// Config file (defaults to wavecraft.toml or the user config dir)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Render mode, e.g. circular-spectrum or 3d-tunnel
    #[arg(short, long)]
    pub mode: Option<RenderModeId>,

    /// Canvas width in logical pixels
    #[arg(long)]
    pub width: Option<u32>,

    /// Canvas height in logical pixels
    #[arg(long)]
    pub height: Option<u32>,

    /// Device pixel ratio
    #[arg(long)]
    pub dpr: Option<f32>,

    /// Simulated frames per second
    #[arg(long)]
    pub fps: Option<u32>,

    /// Playback time of the (last) frame, in seconds after the trim start
    #[arg(long, default_value_t = 1.0)]
    pub at: f64,

    /// Number of consecutive frames to write, ending at --at
    #[arg(long, default_value_t = 1)]
    pub frames: usize,

    /// Global sensitivity
    #[arg(long)]
    pub sensitivity: Option<f32>,

    /// Bass band gain
    #[arg(long)]
    pub bass: Option<f32>,

    /// Mid band gain
    #[arg(long)]
    pub mid: Option<f32>,

    /// Treble band gain
    #[arg(long)]
    pub treble: Option<f32>,

    /// Temporal smoothing (0.0-1.0)
    #[arg(long)]
    pub smoothing: Option<f32>,

    /// Trim start in seconds
    #[arg(long)]
    pub trim_start: Option<f64>,

    /// Trim end in seconds
    #[arg(long)]
    pub trim_end: Option<f64>,

    /// Fade-in length in seconds
    #[arg(long)]
    pub fade_in: Option<f64>,

    /// Fade-out length in seconds
    #[arg(long)]
    pub fade_out: Option<f64>,

    /// GPU backend for the 3D tunnel
    #[arg(long, value_enum)]
    pub gpu: Option<GpuBackend>,

    /// Preset JSON file
    #[arg(long)]
    pub preset: Option<PathBuf>,

    /// Background settings JSON file
    #[arg(long)]
    pub background: Option<PathBuf>,

    /// Overlay settings JSON file
    #[arg(long)]
    pub overlay: Option<PathBuf>,

    /// Title text overlay
    #[arg(long)]
    pub title: Option<String>,

    /// Artist text overlay
    #[arg(long)]
    pub artist: Option<String>,

    /// Draw the watermark
    #[arg(long)]
    pub watermark: bool,

    /// Write the last frame's draw commands as JSON
    #[arg(long)]
    pub display_list: Option<PathBuf>,

    /// List available render modes and exit
    #[arg(long)]
    pub list_modes: bool,
}
