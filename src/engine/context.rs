//! Headless GPU context management using wgpu.
//!
//! The layout engine never presents to a surface; it only needs an
//! instance, an adapter, and a device/queue pair for compute work.

use wgpu::{
    Adapter, Backends, Device, DeviceDescriptor, Features, Instance, InstanceDescriptor, Limits,
    PowerPreference, Queue, RequestAdapterOptions,
};

use super::EngineError;

/// GPU context containing the core wgpu objects.
pub struct GpuContext {
    /// wgpu instance (entry point).
    pub instance: Instance,
    /// Physical GPU adapter.
    pub adapter: Adapter,
    /// Logical GPU device.
    pub device: Device,
    /// Command submission queue.
    pub queue: Queue,
}

impl GpuContext {
    /// Create a headless GPU context.
    ///
    /// Requests a high-performance adapter with no surface requirement and
    /// installs a fatal uncaptured-error hook: a post-dispatch device error
    /// means a kernel bug, not a transient failure, and silently corrupted
    /// state must not keep ticking.
    pub async fn new() -> Result<Self, EngineError> {
        let instance = Instance::new(&InstanceDescriptor {
            backends: Backends::all(),
            flags: wgpu::InstanceFlags::default(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&RequestAdapterOptions {
                power_preference: PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await?;

        log::info!("Using GPU: {:?}", adapter.get_info().name);
        log::info!("Backend: {:?}", adapter.get_info().backend);

        let (device, queue) = adapter
            .request_device(&DeviceDescriptor {
                label: Some("Layout Device"),
                required_features: Features::empty(),
                required_limits: Self::required_limits(&adapter),
                memory_hints: wgpu::MemoryHints::Performance,
                ..Default::default()
            })
            .await?;

        device.on_uncaptured_error(std::sync::Arc::new(|error| {
            panic!("fatal GPU error: {error}");
        }));

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
        })
    }

    /// Get required GPU limits for the layout pipeline.
    fn required_limits(adapter: &Adapter) -> Limits {
        let limits = adapter.limits();

        Limits {
            // Particle and edge stores for a few million entries.
            max_storage_buffer_binding_size: limits.max_storage_buffer_binding_size.max(128 << 20),
            // The relocation kernel binds eight storage buffers at once.
            max_storage_buffers_per_shader_stage: limits
                .max_storage_buffers_per_shader_stage
                .max(8),
            ..limits
        }
    }

    /// Create a command encoder for recording GPU commands.
    pub fn create_encoder(&self, label: &str) -> wgpu::CommandEncoder {
        self.device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(label) })
    }

    /// Submit a command buffer to the GPU.
    pub fn submit(&self, command_buffer: wgpu::CommandBuffer) {
        self.queue.submit(std::iter::once(command_buffer));
    }
}

#[cfg(test)]
mod tests {
    // Context creation needs a live adapter; covered by the integration
    // tests in tests/gpu_pipeline.rs, which skip when none is present.
}
