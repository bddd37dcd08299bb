//! The GPU-backed 3D tunnel mode.
//!
//! [`TunnelEngine`] owns the lifecycle of one shader program and one quad
//! buffer on a [`GpuDevice`] and runs its own frame loop on the shared
//! [`FrameScheduler`]. Each frame is rendered into a layer image that the
//! compositor places under the 2D overlays.

pub mod device;
pub mod shader;
pub mod software;
pub mod wgpu_device;

use image::RgbaImage;
use std::fmt;
use std::sync::Arc;

pub use device::{BufferId, FragmentFn, GpuDevice, GpuProvider, ProgramId, ShaderSource, UnavailableProvider};
pub use shader::{tunnel_shader, TUNNEL_WGSL};
pub use software::{SoftwareDevice, SoftwareProvider};
pub use wgpu_device::{WgpuDevice, WgpuProvider};

use crate::engine::scheduler::{FrameHandle, FrameScheduler, FrameTarget};
use crate::error::GpuError;
use crate::render::pipeline::TunnelUniforms;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TunnelState {
    Uninitialized,
    /// Program and buffer exist; no loop is scheduled.
    Ready,
    Running,
    /// Loop cancelled, resources kept.
    Stopped,
    /// Resources released. Terminal.
    Disposed,
}

impl TunnelState {
    pub fn as_str(self) -> &'static str {
        match self {
            TunnelState::Uninitialized => "uninitialized",
            TunnelState::Ready => "ready",
            TunnelState::Running => "running",
            TunnelState::Stopped => "stopped",
            TunnelState::Disposed => "disposed",
        }
    }
}

impl fmt::Display for TunnelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct TunnelEngine {
    state: TunnelState,
    program: Option<ProgramId>,
    buffer: Option<BufferId>,
    frame: Option<FrameHandle>,
    started_at: f64,
    viewport: (u32, u32),
    layer: Option<Arc<RgbaImage>>,
}

impl Default for TunnelEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TunnelEngine {
    pub fn new() -> Self {
        Self {
            state: TunnelState::Uninitialized,
            program: None,
            buffer: None,
            frame: None,
            started_at: 0.0,
            viewport: (0, 0),
            layer: None,
        }
    }

    pub fn state(&self) -> TunnelState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == TunnelState::Running
    }

    /// Outstanding frame request of the loop, if running.
    pub fn frame_handle(&self) -> Option<FrameHandle> {
        self.frame
    }

    /// Most recently rendered frame.
    pub fn layer(&self) -> Option<Arc<RgbaImage>> {
        self.layer.clone()
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    /// Compile the program and upload the quad. On failure anything already
    /// created is released and the engine stays uninitialised.
    pub fn init(&mut self, device: &mut dyn GpuDevice) -> Result<(), GpuError> {
        self.expect_state(&[TunnelState::Uninitialized], "initialise")?;

        let program = device.create_program(&tunnel_shader())?;
        let buffer = match device.create_quad_buffer() {
            Ok(buffer) => buffer,
            Err(err) => {
                if let Err(cleanup) = device.delete_program(program) {
                    log::warn!("Failed to release tunnel program after error: {}", cleanup);
                }
                return Err(err);
            }
        };

        self.program = Some(program);
        self.buffer = Some(buffer);
        self.state = TunnelState::Ready;
        log::info!("3D tunnel ready on {}", device.backend_name());
        Ok(())
    }

    /// Begin the frame loop. Starting a running engine does nothing.
    pub fn start(&mut self, scheduler: &mut FrameScheduler, now: f64) -> Result<(), GpuError> {
        if self.state == TunnelState::Running {
            return Ok(());
        }
        self.expect_state(&[TunnelState::Ready, TunnelState::Stopped], "start")?;
        self.started_at = now;
        self.frame = Some(scheduler.request(FrameTarget::Tunnel));
        self.state = TunnelState::Running;
        Ok(())
    }

    /// Cancel the frame loop, keeping GPU resources for a later `start`.
    pub fn stop(&mut self, scheduler: &mut FrameScheduler) -> Result<(), GpuError> {
        if self.state == TunnelState::Disposed {
            return Err(GpuError::Disposed);
        }
        if let Some(handle) = self.frame.take() {
            scheduler.cancel(handle);
        }
        if self.state == TunnelState::Running {
            self.state = TunnelState::Stopped;
        }
        Ok(())
    }

    /// New viewport size in device pixels, picked up by the next frame.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = (width, height);
    }

    pub fn uniforms(&self, now: f64, audio_level: f32) -> TunnelUniforms {
        TunnelUniforms {
            time: (now - self.started_at).max(0.0) as f32,
            audio_level,
            resolution: [self.viewport.0 as f32, self.viewport.1 as f32],
        }
    }

    /// One iteration of the loop. Ignores callbacks that are not the
    /// currently scheduled one, so a cancelled frame can never draw.
    pub fn tick(
        &mut self,
        device: &mut dyn GpuDevice,
        scheduler: &mut FrameScheduler,
        handle: FrameHandle,
        now: f64,
        audio_level: f32,
    ) -> Result<(), GpuError> {
        if self.state != TunnelState::Running || self.frame != Some(handle) {
            return Ok(());
        }
        self.frame = Some(scheduler.request(FrameTarget::Tunnel));

        let (Some(program), Some(buffer)) = (self.program, self.buffer) else {
            return Err(GpuError::UnknownResource);
        };
        let (width, height) = self.viewport;
        if width == 0 || height == 0 {
            return Ok(());
        }
        let uniforms = self.uniforms(now, audio_level);
        let pixels = device.draw(program, buffer, &uniforms, width, height)?;
        self.layer = RgbaImage::from_raw(width, height, pixels).map(Arc::new);
        Ok(())
    }

    /// Cancel the loop, then release the program and buffer. Idempotent.
    pub fn dispose(
        &mut self,
        device: &mut dyn GpuDevice,
        scheduler: &mut FrameScheduler,
    ) -> Result<(), GpuError> {
        if self.state == TunnelState::Disposed {
            return Ok(());
        }
        if let Some(handle) = self.frame.take() {
            scheduler.cancel(handle);
        }

        let mut result = Ok(());
        if let Some(program) = self.program.take() {
            result = device.delete_program(program);
        }
        if let Some(buffer) = self.buffer.take() {
            let released = device.delete_buffer(buffer);
            if result.is_ok() {
                result = released;
            }
        }
        self.layer = None;
        self.state = TunnelState::Disposed;
        log::debug!("3D tunnel disposed");
        result
    }

    fn expect_state(&self, allowed: &[TunnelState], operation: &'static str) -> Result<(), GpuError> {
        if self.state == TunnelState::Disposed {
            return Err(GpuError::Disposed);
        }
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(GpuError::InvalidState {
                state: self.state.as_str(),
                operation,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready() -> (TunnelEngine, SoftwareDevice, FrameScheduler) {
        let mut device = SoftwareDevice::new();
        let mut engine = TunnelEngine::new();
        engine.init(&mut device).unwrap();
        engine.set_viewport(16, 8);
        (engine, device, FrameScheduler::new())
    }

    #[test]
    fn full_lifecycle() {
        let (mut engine, mut device, mut scheduler) = ready();
        assert_eq!(engine.state(), TunnelState::Ready);

        engine.start(&mut scheduler, 10.0).unwrap();
        assert_eq!(engine.state(), TunnelState::Running);
        let (handle, target) = scheduler.take_due()[0];
        assert_eq!(target, FrameTarget::Tunnel);
        engine.tick(&mut device, &mut scheduler, handle, 11.5, 0.5).unwrap();
        let layer = engine.layer().unwrap();
        assert_eq!(layer.dimensions(), (16, 8));
        assert_eq!(scheduler.pending_count(), 1);

        engine.stop(&mut scheduler).unwrap();
        assert_eq!(engine.state(), TunnelState::Stopped);
        assert_eq!(scheduler.pending_count(), 0);
        assert_eq!(device.live_programs(), 1);

        engine.start(&mut scheduler, 20.0).unwrap();
        engine.dispose(&mut device, &mut scheduler).unwrap();
        assert_eq!(engine.state(), TunnelState::Disposed);
        assert_eq!((device.live_programs(), device.live_buffers()), (0, 0));
        assert_eq!(scheduler.pending_count(), 0);
        assert!(matches!(engine.start(&mut scheduler, 0.0), Err(GpuError::Disposed)));
    }

    #[test]
    fn uniforms_track_elapsed_time_and_viewport() {
        let (mut engine, _device, mut scheduler) = ready();
        engine.start(&mut scheduler, 100.0).unwrap();
        let u = engine.uniforms(102.5, 0.25);
        assert_eq!(u.time, 2.5);
        assert_eq!(u.audio_level, 0.25);
        assert_eq!(u.resolution, [16.0, 8.0]);
    }

    #[test]
    fn stale_frame_callbacks_do_not_draw() {
        let (mut engine, mut device, mut scheduler) = ready();
        engine.start(&mut scheduler, 0.0).unwrap();
        let (handle, _) = scheduler.take_due()[0];
        engine.stop(&mut scheduler).unwrap();
        engine.tick(&mut device, &mut scheduler, handle, 1.0, 1.0).unwrap();
        assert!(engine.layer().is_none());
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[test]
    fn start_before_init_is_rejected() {
        let mut engine = TunnelEngine::new();
        let mut scheduler = FrameScheduler::new();
        let err = engine.start(&mut scheduler, 0.0).unwrap_err();
        assert!(matches!(
            err,
            GpuError::InvalidState {
                state: "uninitialized",
                operation: "start"
            }
        ));
    }

    struct BufferlessDevice(SoftwareDevice);

    impl GpuDevice for BufferlessDevice {
        fn backend_name(&self) -> String {
            "bufferless".into()
        }
        fn create_program(&mut self, source: &ShaderSource) -> Result<ProgramId, GpuError> {
            self.0.create_program(source)
        }
        fn create_quad_buffer(&mut self) -> Result<BufferId, GpuError> {
            Err(GpuError::Unsupported("out of memory".into()))
        }
        fn draw(
            &mut self,
            program: ProgramId,
            buffer: BufferId,
            uniforms: &TunnelUniforms,
            width: u32,
            height: u32,
        ) -> Result<Vec<u8>, GpuError> {
            self.0.draw(program, buffer, uniforms, width, height)
        }
        fn delete_program(&mut self, program: ProgramId) -> Result<(), GpuError> {
            self.0.delete_program(program)
        }
        fn delete_buffer(&mut self, buffer: BufferId) -> Result<(), GpuError> {
            self.0.delete_buffer(buffer)
        }
        fn live_programs(&self) -> usize {
            self.0.live_programs()
        }
        fn live_buffers(&self) -> usize {
            self.0.live_buffers()
        }
    }

    #[test]
    fn failed_init_releases_partial_resources() {
        let mut device = BufferlessDevice(SoftwareDevice::new());
        let mut engine = TunnelEngine::new();
        assert!(engine.init(&mut device).is_err());
        assert_eq!(engine.state(), TunnelState::Uninitialized);
        assert_eq!(device.live_programs(), 0);
    }
}
