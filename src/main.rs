mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;

use cli::Cli;
use wavecraft::config::{self, Config};
use wavecraft::engine::{EngineController, Preset, SettingsStore};
use wavecraft::RenderModeId;

const IMAGE_TIMEOUT: Duration = Duration::from_secs(20);

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    if cli.list_modes {
        println!("Available modes:");
        for mode in RenderModeId::ALL {
            println!("  {:<20} {}", mode.as_str(), mode.description());
        }
        return Ok(());
    }

    // Explicit --config path, or auto-detect wavecraft.toml / global config
    let config_path = cli.config.clone().or_else(config::find_config);
    let cfg = match config_path {
        Some(ref path) => match config::load_config(path) {
            Some(cfg) => {
                log::info!("Loaded config from {}", path.display());
                cfg
            }
            None => {
                log::warn!("Failed to load config from {}", path.display());
                Config::default()
            }
        },
        None => Config::default(),
    };

    let input = cli.input.as_ref().context("Input audio file is required")?;
    if !input.exists() {
        anyhow::bail!("Input file not found: {}", input.display());
    }

    // CLI values win over the config file
    let mut engine_config = cfg.engine_config();
    engine_config.width = cli.width.unwrap_or(engine_config.width);
    engine_config.height = cli.height.unwrap_or(engine_config.height);
    engine_config.dpr = cli.dpr.unwrap_or(engine_config.dpr);
    let fps = cli.fps.unwrap_or(cfg.canvas.fps).max(1);
    let backend = cli.gpu.unwrap_or(cfg.gpu.backend);

    log::info!("wavecraft - audio-reactive visualizer");
    log::info!("Input: {}", input.display());
    log::info!(
        "Canvas: {}x{} @{}x, {}fps, GPU backend {:?}",
        engine_config.width,
        engine_config.height,
        engine_config.dpr,
        fps,
        backend
    );

    let mut engine = EngineController::new(engine_config, backend.provider());

    log::info!("Decoding audio...");
    pollster::block_on(engine.load_file(input))
        .with_context(|| format!("Failed to load {}", input.display()))?;

    // Visualizer: config file, then preset, then CLI
    engine.set_sensitivity(cfg.visualizer.sensitivity);
    engine.set_band_gains(cfg.visualizer.bass, cfg.visualizer.mid, cfg.visualizer.treble);
    engine.set_mode(cfg.visualizer.mode);

    if let Some(ref path) = cli.preset {
        let preset = Preset::from_json(&read_json(path)?)
            .with_context(|| format!("Invalid preset {}", path.display()))?;
        engine.apply_preset(&preset);
    }
    if let Some(ref path) = cli.background {
        engine
            .background_mut()
            .apply_json(&read_json(path)?)
            .with_context(|| format!("Invalid background settings {}", path.display()))?;
    }
    if let Some(ref path) = cli.overlay {
        engine
            .overlay_mut()
            .apply_json(&read_json(path)?)
            .with_context(|| format!("Invalid overlay settings {}", path.display()))?;
    }

    if let Some(v) = cli.sensitivity {
        engine.set_sensitivity(v);
    }
    if cli.bass.is_some() || cli.mid.is_some() || cli.treble.is_some() {
        let current = engine.visualizer().clone();
        engine.set_band_gains(
            cli.bass.unwrap_or(current.bass_multiplier),
            cli.mid.unwrap_or(current.mid_multiplier),
            cli.treble.unwrap_or(current.treble_multiplier),
        );
    }
    if let Some(v) = cli.smoothing {
        engine.set_smoothing(v);
    }
    if let Some(mode) = cli.mode {
        let effective = engine.set_mode(mode);
        if effective != mode {
            log::warn!("Requested mode {} unavailable, rendering {}", mode, effective);
        }
    }

    let overlay = engine.overlay_mut();
    if let Some(ref title) = cli.title {
        overlay.title = title.clone();
    }
    if let Some(ref artist) = cli.artist {
        overlay.artist = artist.clone();
    }
    overlay.watermark_enabled |= cli.watermark;

    let source = engine.source_mut();
    if let Some(v) = cli.trim_end {
        source.set_trim_end(v);
    }
    if let Some(v) = cli.trim_start {
        source.set_trim_start(v);
    }
    if let Some(v) = cli.fade_in {
        source.set_fade_in(v);
    }
    if let Some(v) = cli.fade_out {
        source.set_fade_out(v);
    }

    engine.preload_images(IMAGE_TIMEOUT);

    // Simulated playback: one engine frame per 1/fps seconds
    let step = 1.0 / fps as f64;
    let frames = cli.frames.max(1);
    let last = ((cli.at.max(0.0) * fps as f64).round() as usize).max(1) + frames - 1;
    let first_written = last + 1 - frames;

    log::info!("Mode: {}", engine.mode());
    log::info!("Simulating {} frames, writing {}", last, frames);

    let pb = ProgressBar::new(last as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} frames ({eta} remaining)")
            .context("Invalid progress bar template")?
            .progress_chars("=>-"),
    );

    engine.set_playing(true, 0.0);
    let mut now = 0.0;
    for index in 1..=last {
        now = index as f64 * step;
        engine.frame(now);
        if index == last && !engine.is_playing() {
            log::warn!("Playback ended before {:.2}s; the last drawn frame is kept", cli.at);
        }
        if index >= first_written {
            let path = frame_path(&cli.output, index - first_written, frames);
            engine
                .canvas()
                .save_png(&path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }
        pb.inc(1);
    }
    pb.finish_with_message("done");

    if let Some(ref path) = cli.display_list {
        let list = engine.record_frame(now);
        let json = serde_json::to_string_pretty(&list).context("Failed to serialise draw commands")?;
        std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        log::info!("Wrote {} draw commands to {}", list.len(), path.display());
    }

    engine.dispose();
    log::info!("Output: {}", cli.output.display());
    Ok(())
}

fn read_json(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// `frame.png` for a single frame, `frame_0000.png`, `frame_0001.png`, ...
/// otherwise.
fn frame_path(output: &Path, index: usize, total: usize) -> PathBuf {
    if total == 1 {
        return output.to_path_buf();
    }
    let stem = output
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("frame");
    output.with_file_name(format!("{stem}_{index:04}.png"))
}
