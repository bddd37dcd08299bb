use glam::Vec2;
use rayon::prelude::*;
use std::collections::HashMap;

use super::device::{BufferId, FragmentFn, GpuDevice, GpuProvider, ProgramId, ShaderSource};
use crate::error::GpuError;
use crate::render::pipeline::{TunnelUniforms, QUAD_VERTICES};

/// Evaluates shader programs on the CPU, one rayon task per row.
#[derive(Default)]
pub struct SoftwareDevice {
    next_id: u64,
    programs: HashMap<ProgramId, FragmentFn>,
    buffers: HashMap<BufferId, Vec<[f32; 2]>>,
}

impl SoftwareDevice {
    pub fn new() -> Self {
        Self::default()
    }

    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

impl GpuDevice for SoftwareDevice {
    fn backend_name(&self) -> String {
        "software".into()
    }

    fn create_program(&mut self, source: &ShaderSource) -> Result<ProgramId, GpuError> {
        if !source.wgsl.contains("fn fs_main") || !source.wgsl.contains("fn vs_main") {
            return Err(GpuError::Shader(format!(
                "{} is missing a vs_main/fs_main entry point",
                source.label
            )));
        }
        let id = ProgramId(self.next());
        self.programs.insert(id, source.fragment);
        log::debug!("Created software program {:?} ({})", id, source.label);
        Ok(id)
    }

    fn create_quad_buffer(&mut self) -> Result<BufferId, GpuError> {
        let id = BufferId(self.next());
        self.buffers.insert(id, QUAD_VERTICES.to_vec());
        log::debug!("Created software buffer {:?}", id);
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
        let fragment = *self.programs.get(&program).ok_or(GpuError::UnknownResource)?;
        if !self.buffers.contains_key(&buffer) {
            return Err(GpuError::UnknownResource);
        }

        let row_bytes = width as usize * 4;
        let mut pixels = vec![0u8; row_bytes * height as usize];
        if row_bytes == 0 {
            return Ok(pixels);
        }
        pixels
            .par_chunks_mut(row_bytes)
            .enumerate()
            .for_each(|(row, out)| {
                let y = height as f32 - row as f32 - 0.5;
                for (x, px) in out.chunks_exact_mut(4).enumerate() {
                    let rgb = fragment(Vec2::new(x as f32 + 0.5, y), uniforms);
                    for (dst, v) in px.iter_mut().zip(rgb) {
                        *dst = (v.clamp(0.0, 1.0) * 255.0).round() as u8;
                    }
                    px[3] = 255;
                }
            });
        Ok(pixels)
    }

    fn delete_program(&mut self, program: ProgramId) -> Result<(), GpuError> {
        self.programs
            .remove(&program)
            .map(|_| log::debug!("Deleted software program {:?}", program))
            .ok_or(GpuError::UnknownResource)
    }

    fn delete_buffer(&mut self, buffer: BufferId) -> Result<(), GpuError> {
        self.buffers
            .remove(&buffer)
            .map(|_| log::debug!("Deleted software buffer {:?}", buffer))
            .ok_or(GpuError::UnknownResource)
    }

    fn live_programs(&self) -> usize {
        self.programs.len()
    }

    fn live_buffers(&self) -> usize {
        self.buffers.len()
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SoftwareProvider;

impl GpuProvider for SoftwareProvider {
    fn name(&self) -> &'static str {
        "software"
    }

    fn probe(&self) -> bool {
        true
    }

    fn create_device(&self) -> Result<Box<dyn GpuDevice>, GpuError> {
        Ok(Box::new(SoftwareDevice::new()))
    }
}
