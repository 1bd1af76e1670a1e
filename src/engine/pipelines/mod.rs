//! Compute pipelines for the layout engine.
//!
//! One struct per pipeline family, each owning its pipelines and bind
//! group layouts and exposing bind-group constructors:
//!
//! - [`integrate`]: the physics integrator
//! - [`sort`]: sort encoder, reshuffle, and identity mirror
//! - [`csr`]: prefix-sum, coarse map, and edge relocation

mod csr;
mod integrate;
mod sort;

pub use csr::CsrPipelines;
pub use integrate::IntegratePipeline;
pub use sort::SortPipelines;

use wgpu::{
    BindGroupLayoutEntry, BindingType, BufferBindingType, Device, ShaderModuleDescriptor,
    ShaderSource, ShaderStages,
};

/// Load WGSL shader source into a module.
pub(crate) fn load_shader(device: &Device, label: &str, source: &str) -> wgpu::ShaderModule {
    device.create_shader_module(ShaderModuleDescriptor {
        label: Some(label),
        source: ShaderSource::Wgsl(std::borrow::Cow::Borrowed(source)),
    })
}

/// Layout entry for a storage buffer binding.
pub(crate) fn storage_entry(binding: u32, read_only: bool) -> BindGroupLayoutEntry {
    BindGroupLayoutEntry {
        binding,
        visibility: ShaderStages::COMPUTE,
        ty: BindingType::Buffer {
            ty: BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// Layout entry for a uniform buffer binding.
pub(crate) fn uniform_entry(binding: u32) -> BindGroupLayoutEntry {
    BindGroupLayoutEntry {
        binding,
        visibility: ShaderStages::COMPUTE,
        ty: BindingType::Buffer {
            ty: BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}
