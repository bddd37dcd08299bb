use glam::Vec2;

use crate::error::GpuError;
use crate::render::pipeline::TunnelUniforms;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ProgramId(pub(crate) u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BufferId(pub(crate) u64);

/// CPU reference of a fragment shader: fragment coordinate (bottom-left
/// origin, pixel centres at `.5`) and uniforms to linear RGB in 0.0-1.0.
pub type FragmentFn = fn(Vec2, &TunnelUniforms) -> [f32; 3];

/// A shader program in both forms a device may need.
#[derive(Clone, Copy, Debug)]
pub struct ShaderSource {
    pub label: &'static str,
    pub wgsl: &'static str,
    pub fragment: FragmentFn,
}

/// GPU resource owner behind the tunnel. Programs and buffers must be
/// deleted explicitly; dropping a handle does not release anything.
pub trait GpuDevice {
    fn backend_name(&self) -> String;

    fn create_program(&mut self, source: &ShaderSource) -> Result<ProgramId, GpuError>;

    /// Static vertex buffer holding one full-screen quad.
    fn create_quad_buffer(&mut self) -> Result<BufferId, GpuError>;

    /// Render one frame and return `width * height` RGBA8 pixels, top row first.
    fn draw(
        &mut self,
        program: ProgramId,
        buffer: BufferId,
        uniforms: &TunnelUniforms,
        width: u32,
        height: u32,
    ) -> Result<Vec<u8>, GpuError>;

    fn delete_program(&mut self, program: ProgramId) -> Result<(), GpuError>;

    fn delete_buffer(&mut self, buffer: BufferId) -> Result<(), GpuError>;

    fn live_programs(&self) -> usize;

    fn live_buffers(&self) -> usize;
}

/// Source of GPU devices, queried when the 3D mode is requested.
pub trait GpuProvider {
    fn name(&self) -> &'static str;

    /// Cheap capability check; does not create a device.
    fn probe(&self) -> bool;

    fn create_device(&self) -> Result<Box<dyn GpuDevice>, GpuError>;
}

/// A provider that never has a device, as on a machine without GPU support.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnavailableProvider;

impl GpuProvider for UnavailableProvider {
    fn name(&self) -> &'static str {
        "none"
    }

    fn probe(&self) -> bool {
        false
    }

    fn create_device(&self) -> Result<Box<dyn GpuDevice>, GpuError> {
        Err(GpuError::Unsupported("GPU rendering is disabled".into()))
    }
}
