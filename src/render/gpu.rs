use crate::error::GpuError;

const BACKENDS: wgpu::Backends = wgpu::Backends::METAL
    .union(wgpu::Backends::VULKAN)
    .union(wgpu::Backends::DX12)
    .union(wgpu::Backends::GL);

pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub adapter_name: String,
    pub backend: wgpu::Backend,
}

impl GpuContext {
    pub fn new() -> Result<Self, GpuError> {
        pollster::block_on(Self::init_async())
    }

    /// Whether any adapter is available, without creating a device.
    pub fn probe() -> bool {
        pollster::block_on(request_adapter(&instance())).is_some()
    }

    async fn init_async() -> Result<Self, GpuError> {
        let instance = instance();
        let adapter = request_adapter(&instance)
            .await
            .ok_or_else(|| GpuError::Unsupported("no suitable GPU adapter".into()))?;

        let info = adapter.get_info();
        log::info!("Using GPU: {}", info.name);
        log::info!("Backend: {:?}", info.backend);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("wavecraft_device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::downlevel_webgl2_defaults()
                        .using_resolution(adapter.limits()),
                    ..Default::default()
                },
                None,
            )
            .await
            .map_err(|e| GpuError::Unsupported(format!("failed to create GPU device: {e}")))?;

        Ok(Self {
            device,
            queue,
            adapter_name: info.name,
            backend: info.backend,
        })
    }
}

fn instance() -> wgpu::Instance {
    wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: BACKENDS,
        ..Default::default()
    })
}

async fn request_adapter(instance: &wgpu::Instance) -> Option<wgpu::Adapter> {
    instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        })
        .await
}
