use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::audio::source::{SignalSource, SourceConfig};
use crate::engine::compositor::{Compositor, Scene};
use crate::engine::scheduler::{FrameHandle, FrameScheduler, FrameTarget};
use crate::engine::settings::{Preset, VisualizerSettings};
use crate::error::{GpuError, SourceError};
use crate::layers::background::{BackgroundConfig, BackgroundKind};
use crate::layers::overlay::OverlayConfig;
use crate::render::canvas::Canvas;
use crate::render::modes::{self, RenderModeId};
use crate::render::surface::DisplayList;
use crate::render::text::FontBook;
use crate::signal::shaper::shape_into;
use crate::signal::smoother::{TemporalSmoother, DEFAULT_SMOOTHING};
use crate::tunnel::{GpuDevice, GpuProvider, TunnelEngine, TunnelState};

/// Mode used whenever the 3D tunnel cannot run.
pub const FALLBACK_MODE: RenderModeId = RenderModeId::CircularSpectrum;

/// Tunnel audio level while no audio is loaded.
const IDLE_AUDIO_LEVEL: f32 = 0.5;

#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Canvas size in logical pixels.
    pub width: u32,
    pub height: u32,
    pub dpr: f32,
    pub source: SourceConfig,
    pub smoothing: f32,
    pub font_dirs: Vec<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            dpr: 1.0,
            source: SourceConfig::default(),
            smoothing: DEFAULT_SMOOTHING,
            font_dirs: Vec::new(),
        }
    }
}

/// Owns the signal path, the canvas, the layers and the 3D sub-engine, and
/// drives them from [`EngineController::frame`].
pub struct EngineController {
    source: SignalSource,
    visualizer: VisualizerSettings,
    background: BackgroundConfig,
    overlay: OverlayConfig,
    shaped: Vec<u8>,
    smoother: TemporalSmoother,
    canvas: Canvas,
    compositor: Compositor,
    scheduler: FrameScheduler,
    frame: Option<FrameHandle>,
    provider: Box<dyn GpuProvider>,
    gpu_supported: bool,
    device: Option<Box<dyn GpuDevice>>,
    tunnel: Option<TunnelEngine>,
    clock: f64,
    disposed: bool,
}

impl EngineController {
    pub fn new(config: EngineConfig, provider: Box<dyn GpuProvider>) -> Self {
        let gpu_supported = provider.probe();
        if gpu_supported {
            log::info!("GPU provider '{}' available", provider.name());
        } else {
            log::warn!("GPU provider '{}' unavailable, 3D tunnel disabled", provider.name());
        }

        let visualizer = VisualizerSettings {
            smoothing: config.smoothing,
            ..VisualizerSettings::default()
        };
        Self {
            source: SignalSource::new(config.source),
            visualizer,
            background: BackgroundConfig::default(),
            overlay: OverlayConfig::default(),
            shaped: Vec::new(),
            smoother: TemporalSmoother::new(config.smoothing),
            canvas: Canvas::new(config.width, config.height, config.dpr, FontBook::new(config.font_dirs)),
            compositor: Compositor::new(),
            scheduler: FrameScheduler::new(),
            frame: None,
            provider,
            gpu_supported,
            device: None,
            tunnel: None,
            clock: 0.0,
            disposed: false,
        }
    }

    // -- audio --

    /// Load an audio asset. Any running playback stops before decoding; the
    /// frame loops follow the playback flag.
    pub async fn load(&mut self, bytes: Vec<u8>, extension: Option<&str>) -> Result<(), SourceError> {
        let result = self.source.load(bytes, extension).await;
        self.after_load(result.is_ok());
        result
    }

    pub async fn load_file(&mut self, path: &Path) -> Result<(), SourceError> {
        let result = self.source.load_file(path).await;
        self.after_load(result.is_ok());
        result
    }

    fn after_load(&mut self, loaded: bool) {
        if !self.source.is_playing() {
            self.stop_loops();
        }
        if loaded {
            self.smoother.reset();
            log::info!("Loaded {:.2}s of audio", self.source.duration());
        }
    }

    pub fn source(&self) -> &SignalSource {
        &self.source
    }

    /// Transport access for trim and fade edits.
    pub fn source_mut(&mut self) -> &mut SignalSource {
        &mut self.source
    }

    /// Start or stop playback together with the frame loops. Stopping leaves
    /// the last frame on the canvas. Returns false when playback could not
    /// start because nothing is loaded.
    pub fn set_playing(&mut self, playing: bool, now: f64) -> bool {
        self.clock = now;
        if !playing {
            self.source.pause(now);
            self.stop_loops();
            return true;
        }
        if self.disposed || !self.source.play(now) {
            return false;
        }
        self.start_loops(now);
        true
    }

    pub fn is_playing(&self) -> bool {
        self.source.is_playing()
    }

    fn start_loops(&mut self, now: f64) {
        if self.frame.is_none() {
            self.frame = Some(self.scheduler.request(FrameTarget::Compositor));
        }
        self.compositor.restart_animation(now);
        if let Some(tunnel) = &mut self.tunnel {
            if let Err(err) = tunnel.start(&mut self.scheduler, now) {
                log::error!("Failed to start 3D tunnel loop: {}", err);
            }
        }
    }

    fn stop_loops(&mut self) {
        if let Some(handle) = self.frame.take() {
            self.scheduler.cancel(handle);
        }
        if let Some(tunnel) = &mut self.tunnel {
            if let Err(err) = tunnel.stop(&mut self.scheduler) {
                log::warn!("Failed to stop 3D tunnel loop: {}", err);
            }
        }
    }

    // -- settings --

    pub fn mode(&self) -> RenderModeId {
        self.visualizer.mode
    }

    pub fn visualizer(&self) -> &VisualizerSettings {
        &self.visualizer
    }

    /// Switch the active render mode and return the mode actually in effect.
    ///
    /// This is the single 3D fallback policy: a tunnel request without GPU
    /// support, or one whose initialisation fails, lands on
    /// [`FALLBACK_MODE`]. The signal path is never touched.
    pub fn set_mode(&mut self, requested: RenderModeId) -> RenderModeId {
        let mut mode = requested;
        if mode.is_gpu() && !self.gpu_supported {
            log::warn!("3D tunnel not supported, falling back to {}", FALLBACK_MODE);
            mode = FALLBACK_MODE;
        }
        if mode.is_gpu() && self.tunnel.is_none() {
            if let Err(err) = self.enter_tunnel() {
                log::warn!("3D tunnel unavailable ({}), falling back to {}", err, FALLBACK_MODE);
                if !matches!(err, GpuError::Disposed) {
                    self.gpu_supported = false;
                }
                mode = FALLBACK_MODE;
            }
        }
        if !mode.is_gpu() {
            self.leave_tunnel();
        }
        if mode != self.visualizer.mode {
            log::info!("Visualizer mode {} -> {}", self.visualizer.mode, mode);
        }
        self.visualizer.mode = mode;
        mode
    }

    fn enter_tunnel(&mut self) -> Result<(), GpuError> {
        if self.disposed {
            return Err(GpuError::Disposed);
        }
        if self.device.is_none() {
            let device = self.provider.create_device()?;
            log::info!("GPU device ready: {}", device.backend_name());
            self.device = Some(device);
        }
        let Some(device) = self.device.as_deref_mut() else {
            return Err(GpuError::Unsupported("no GPU device".into()));
        };

        let mut tunnel = TunnelEngine::new();
        tunnel.init(device)?;
        let (width, height) = self.canvas.device_size();
        tunnel.set_viewport(width, height);
        if self.frame.is_some() {
            if let Err(err) = tunnel.start(&mut self.scheduler, self.clock) {
                if let Err(cleanup) = tunnel.dispose(device, &mut self.scheduler) {
                    log::warn!("Failed to release 3D tunnel after error: {}", cleanup);
                }
                return Err(err);
            }
        }
        self.tunnel = Some(tunnel);
        Ok(())
    }

    fn leave_tunnel(&mut self) {
        let Some(mut tunnel) = self.tunnel.take() else {
            return;
        };
        let released = match self.device.as_deref_mut() {
            Some(device) => tunnel.dispose(device, &mut self.scheduler),
            None => tunnel.stop(&mut self.scheduler),
        };
        if let Err(err) = released {
            log::warn!("Failed to release 3D tunnel: {}", err);
        }
    }

    pub fn set_sensitivity(&mut self, sensitivity: f32) {
        self.visualizer.sensitivity = sensitivity;
    }

    pub fn set_band_gains(&mut self, bass: f32, mid: f32, treble: f32) {
        self.visualizer.bass_multiplier = bass;
        self.visualizer.mid_multiplier = mid;
        self.visualizer.treble_multiplier = treble;
    }

    pub fn set_smoothing(&mut self, smoothing: f32) {
        self.smoother.set_coefficient(smoothing);
        self.visualizer.smoothing = self.smoother.coefficient();
    }

    /// Replace all visualizer settings; the mode goes through [`set_mode`].
    ///
    /// [`set_mode`]: EngineController::set_mode
    pub fn set_visualizer(&mut self, settings: VisualizerSettings) {
        self.set_sensitivity(settings.sensitivity);
        self.set_band_gains(
            settings.bass_multiplier,
            settings.mid_multiplier,
            settings.treble_multiplier,
        );
        self.set_smoothing(settings.smoothing);
        self.set_mode(settings.mode);
    }

    pub fn background(&self) -> &BackgroundConfig {
        &self.background
    }

    pub fn background_mut(&mut self) -> &mut BackgroundConfig {
        &mut self.background
    }

    pub fn set_background(&mut self, config: BackgroundConfig) {
        self.background = config;
    }

    pub fn overlay(&self) -> &OverlayConfig {
        &self.overlay
    }

    pub fn overlay_mut(&mut self) -> &mut OverlayConfig {
        &mut self.overlay
    }

    pub fn set_overlay(&mut self, config: OverlayConfig) {
        self.overlay = config;
    }

    /// Block until the configured background and logo images have loaded
    /// or failed, up to `timeout` each. Frames render fine without this;
    /// it only matters for single-frame output.
    pub fn preload_images(&mut self, timeout: Duration) {
        if self.background.kind == BackgroundKind::Image {
            let slot = self.compositor.background_layer().image_slot();
            slot.set_reference(self.background.image_url.as_deref());
            slot.wait(timeout);
        }
        let slot = self.compositor.overlay_layer().logo_slot();
        slot.set_reference(self.overlay.logo_url.as_deref());
        slot.wait(timeout);
    }

    pub fn apply_preset(&mut self, preset: &Preset) {
        if let Some(visualizer) = &preset.visualizer {
            self.set_mode(visualizer.mode);
            visualizer.apply_gains(&mut self.visualizer);
        }
        if let Some(background) = &preset.background {
            background.apply_to(&mut self.background);
        }
        if let Some(overlay) = &preset.overlay {
            overlay.apply_to(&mut self.overlay);
        }
        if let Some(particles) = &preset.particles {
            particles.apply_to(&mut self.background.particles);
        }
    }

    // -- canvas --

    /// New canvas size. Takes effect before the next frame reads the size.
    pub fn resize(&mut self, css_width: u32, css_height: u32, dpr: f32) {
        if !self.canvas.resize(css_width, css_height, dpr) {
            return;
        }
        let (width, height) = self.canvas.logical_size();
        self.compositor.resize(width, height);
        if let Some(tunnel) = &mut self.tunnel {
            let (device_w, device_h) = self.canvas.device_size();
            tunnel.set_viewport(device_w, device_h);
        }
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn canvas_mut(&mut self) -> &mut Canvas {
        &mut self.canvas
    }

    // -- frame loop --

    /// One animation frame: advance the transport, then run every callback
    /// due this frame. Returns how many loop callbacks ran.
    pub fn frame(&mut self, now: f64) -> usize {
        if self.disposed {
            return 0;
        }
        self.clock = now;
        if self.source.update(now) {
            log::info!("Playback reached the trim end");
            self.stop_loops();
        }

        let mut ran = 0;
        for (handle, target) in self.scheduler.take_due() {
            let current = match target {
                FrameTarget::Compositor => self.compositor_tick(handle, now),
                FrameTarget::Tunnel => self.tunnel_tick(handle, now),
            };
            ran += usize::from(current);
        }
        ran
    }

    fn compositor_tick(&mut self, handle: FrameHandle, now: f64) -> bool {
        if self.frame != Some(handle) {
            return false;
        }
        self.frame = Some(self.scheduler.request(FrameTarget::Compositor));
        self.render(now);
        true
    }

    fn tunnel_tick(&mut self, handle: FrameHandle, now: f64) -> bool {
        let level = self.audio_level();
        let (Some(tunnel), Some(device)) = (self.tunnel.as_mut(), self.device.as_deref_mut()) else {
            return false;
        };
        if tunnel.frame_handle() != Some(handle) {
            return false;
        }
        if let Err(err) = tunnel.tick(device, &mut self.scheduler, handle, now, level) {
            log::error!("3D tunnel frame failed: {}", err);
        }
        true
    }

    /// Run the signal path and draw one frame onto the canvas. Nothing is
    /// drawn until audio is loaded.
    fn render(&mut self, now: f64) {
        if !self.source.is_loaded() {
            return;
        }
        let device_size = self.canvas.device_size();
        let layer = self
            .tunnel
            .as_ref()
            .and_then(TunnelEngine::layer)
            .filter(|layer| layer.dimensions() == device_size);
        let (width, height) = self.canvas.logical_size();

        let snapshot = self.source.snapshot(now);
        shape_into(snapshot, &self.visualizer.weights(), &mut self.shaped);
        let final_snapshot = self.smoother.smooth(&self.shaped);

        let scene = Scene {
            mode: self.visualizer.mode,
            background: &self.background,
            overlay: &self.overlay,
            tunnel_layer: layer.as_deref(),
            width,
            height,
            now,
        };
        self.compositor.compose(&mut self.canvas, &scene, final_snapshot);
    }

    /// Record the current scene as draw commands instead of pixels, using the
    /// last final snapshot. The signal path is not advanced.
    pub fn record_frame(&mut self, now: f64) -> DisplayList {
        let mut list = DisplayList::new();
        if !self.source.is_loaded() {
            return list;
        }
        let device_size = self.canvas.device_size();
        let layer = self
            .tunnel
            .as_ref()
            .and_then(TunnelEngine::layer)
            .filter(|layer| layer.dimensions() == device_size);
        let (width, height) = self.canvas.logical_size();
        let scene = Scene {
            mode: self.visualizer.mode,
            background: &self.background,
            overlay: &self.overlay,
            tunnel_layer: layer.as_deref(),
            width,
            height,
            now,
        };
        let snapshot = self.smoother.retained().unwrap_or(&[]);
        self.compositor.compose(&mut list, &scene, snapshot);
        list
    }

    /// Shaped snapshot of the last frame, before smoothing.
    pub fn shaped_snapshot(&self) -> &[u8] {
        &self.shaped
    }

    /// Snapshot handed to the renderers on the last frame.
    pub fn final_snapshot(&self) -> &[u8] {
        self.smoother.retained().unwrap_or(&[])
    }

    /// Tunnel audio uniform: mean of the final snapshot, 0.0-1.0.
    pub fn audio_level(&self) -> f32 {
        if !self.source.is_loaded() {
            return IDLE_AUDIO_LEVEL;
        }
        modes::mean(self.final_snapshot())
    }

    pub fn pending_frames(&self) -> usize {
        self.scheduler.pending_count()
    }

    // -- GPU --

    /// Whether the 3D mode can be offered.
    pub fn gpu_supported(&self) -> bool {
        self.gpu_supported
    }

    /// Live (programs, buffers) on the GPU device.
    pub fn gpu_resources(&self) -> (usize, usize) {
        self.device
            .as_deref()
            .map_or((0, 0), |d| (d.live_programs(), d.live_buffers()))
    }

    pub fn tunnel_state(&self) -> Option<TunnelState> {
        self.tunnel.as_ref().map(TunnelEngine::state)
    }

    // -- teardown --

    /// Stop playback, cancel the frame loops, then release GPU resources.
    /// Idempotent.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.source.pause(self.clock);
        self.stop_loops();
        self.leave_tunnel();
        self.device = None;
        self.smoother.reset();
        self.disposed = true;
        log::debug!("Engine disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}

impl Drop for EngineController {
    fn drop(&mut self) {
        self.dispose();
    }
}
