use std::collections::HashMap;

use super::device::{BufferId, GpuDevice, GpuProvider, ProgramId, ShaderSource};
use crate::error::GpuError;
use crate::render::frame::{FrameRenderer, TEXTURE_FORMAT};
use crate::render::gpu::GpuContext;
use crate::render::pipeline::{create_quad_buffer, RenderPipeline, TunnelUniforms};

/// Headless wgpu device: renders offscreen and reads frames back.
pub struct WgpuDevice {
    gpu: GpuContext,
    next_id: u64,
    programs: HashMap<ProgramId, RenderPipeline>,
    buffers: HashMap<BufferId, wgpu::Buffer>,
    target: Option<FrameRenderer>,
}

impl WgpuDevice {
    pub fn new() -> Result<Self, GpuError> {
        Ok(Self {
            gpu: GpuContext::new()?,
            next_id: 0,
            programs: HashMap::new(),
            buffers: HashMap::new(),
            target: None,
        })
    }

    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

impl GpuDevice for WgpuDevice {
    fn backend_name(&self) -> String {
        format!("wgpu/{:?} ({})", self.gpu.backend, self.gpu.adapter_name)
    }

    fn create_program(&mut self, source: &ShaderSource) -> Result<ProgramId, GpuError> {
        let pipeline =
            RenderPipeline::new(&self.gpu.device, source.label, source.wgsl, TEXTURE_FORMAT)?;
        let id = ProgramId(self.next());
        self.programs.insert(id, pipeline);
        log::debug!("Created GPU program {:?} ({})", id, source.label);
        Ok(id)
    }

    fn create_quad_buffer(&mut self) -> Result<BufferId, GpuError> {
        let buffer = create_quad_buffer(&self.gpu.device);
        let id = BufferId(self.next());
        self.buffers.insert(id, buffer);
        log::debug!("Created GPU buffer {:?}", id);
        Ok(id)
    }

    fn draw(
        &mut self,
        program: ProgramId,
        buffer: BufferId,
        uniforms: &TunnelUniforms,
        width: u32,
        height: u32,
    ) -> Result<Vec<u8>, GpuError> {
        if width == 0 || height == 0 {
            return Ok(Vec::new());
        }
        let pipeline = self.programs.get(&program).ok_or(GpuError::UnknownResource)?;
        let vertices = self.buffers.get(&buffer).ok_or(GpuError::UnknownResource)?;

        if !self.target.as_ref().is_some_and(|t| t.matches(width, height)) {
            if let Some(old) = self.target.take() {
                old.release();
            }
            self.target = Some(FrameRenderer::new(&self.gpu, width, height));
        }
        let target = self
            .target
            .as_ref()
            .ok_or_else(|| GpuError::Readback("no render target".into()))?;

        pipeline.write_uniforms(&self.gpu.queue, uniforms);
        target.render_and_readback(&self.gpu, pipeline, vertices)
    }

    fn delete_program(&mut self, program: ProgramId) -> Result<(), GpuError> {
        let pipeline = self.programs.remove(&program).ok_or(GpuError::UnknownResource)?;
        pipeline.release();
        log::debug!("Deleted GPU program {:?}", program);
        Ok(())
    }

    fn delete_buffer(&mut self, buffer: BufferId) -> Result<(), GpuError> {
        let vertices = self.buffers.remove(&buffer).ok_or(GpuError::UnknownResource)?;
        vertices.destroy();
        log::debug!("Deleted GPU buffer {:?}", buffer);
        Ok(())
    }

    fn live_programs(&self) -> usize {
        self.programs.len()
    }

    fn live_buffers(&self) -> usize {
        self.buffers.len()
    }
}

impl Drop for WgpuDevice {
    fn drop(&mut self) {
        if let Some(target) = self.target.take() {
            target.release();
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct WgpuProvider;

impl GpuProvider for WgpuProvider {
    fn name(&self) -> &'static str {
        "wgpu"
    }

    fn probe(&self) -> bool {
        GpuContext::probe()
    }

    fn create_device(&self) -> Result<Box<dyn GpuDevice>, GpuError> {
        Ok(Box::new(WgpuDevice::new()?))
    }
}
