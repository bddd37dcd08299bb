use super::gpu::GpuContext;
use super::pipeline::{RenderPipeline, QUAD_VERTICES};
use crate::error::GpuError;

/// The tunnel writes final display values, so no sRGB conversion on store.
pub const TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

const BYTES_PER_PIXEL: u32 = 4;

/// Offscreen colour target for the tunnel plus the mappable buffer its rows
/// are copied into. Sized once; a viewport change builds a new one.
pub struct FrameRenderer {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    readback: wgpu::Buffer,
    width: u32,
    height: u32,
    /// Row stride in `readback`, padded to the copy alignment.
    stride: u32,
}

impl FrameRenderer {
    pub fn new(gpu: &GpuContext, width: u32, height: u32) -> Self {
        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("tunnel_target"),
            size: extent(width, height),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TEXTURE_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let stride = padded_stride(width);
        let readback = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("tunnel_readback"),
            size: u64::from(stride) * u64::from(height),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        log::debug!("Tunnel target {}x{} (row stride {})", width, height, stride);

        Self {
            texture,
            view,
            readback,
            width,
            height,
            stride,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn matches(&self, width: u32, height: u32) -> bool {
        self.size() == (width, height)
    }

    /// Draw the quad with `pipeline` and return tightly packed RGBA8 rows.
    pub fn render_and_readback(
        &self,
        gpu: &GpuContext,
        pipeline: &RenderPipeline,
        vertex_buffer: &wgpu::Buffer,
    ) -> Result<Vec<u8>, GpuError> {
        let mut encoder = gpu.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("tunnel_encoder"),
        });
        self.encode_quad(&mut encoder, pipeline, vertex_buffer);
        self.encode_copy(&mut encoder);
        gpu.queue.submit(std::iter::once(encoder.finish()));
        self.read_rows(gpu)
    }

    fn encode_quad(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        pipeline: &RenderPipeline,
        vertex_buffer: &wgpu::Buffer,
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("tunnel_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &self.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(&pipeline.pipeline);
        pass.set_bind_group(0, &pipeline.bind_group, &[]);
        pass.set_vertex_buffer(0, vertex_buffer.slice(..));
        pass.draw(0..QUAD_VERTICES.len() as u32, 0..1);
    }

    fn encode_copy(&self, encoder: &mut wgpu::CommandEncoder) {
        encoder.copy_texture_to_buffer(
            self.texture.as_image_copy(),
            wgpu::TexelCopyBufferInfo {
                buffer: &self.readback,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(self.stride),
                    rows_per_image: Some(self.height),
                },
            },
            extent(self.width, self.height),
        );
    }

    /// Map the readback buffer, block until the copy lands, then drop the
    /// row padding.
    fn read_rows(&self, gpu: &GpuContext) -> Result<Vec<u8>, GpuError> {
        let slice = self.readback.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        gpu.device.poll(wgpu::Maintain::Wait);
        match rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(err)) => return Err(GpuError::Readback(err.to_string())),
            Err(err) => return Err(GpuError::Readback(err.to_string())),
        }

        let row_bytes = (self.width * BYTES_PER_PIXEL) as usize;
        let pixels = {
            let mapped = slice.get_mapped_range();
            mapped
                .chunks_exact(self.stride as usize)
                .take(self.height as usize)
                .flat_map(|row| &row[..row_bytes])
                .copied()
                .collect()
        };
        self.readback.unmap();
        Ok(pixels)
    }

    pub fn release(self) {
        self.readback.destroy();
        self.texture.destroy();
    }
}

fn extent(width: u32, height: u32) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    }
}

/// Bytes per row of a `width`-pixel RGBA8 image, rounded up to the
/// texture-to-buffer copy alignment.
fn padded_stride(width: u32) -> u32 {
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    (width * BYTES_PER_PIXEL).div_ceil(align) * align
}
